use crate::cell::IntegratorCell;
use simbus_types::{BlockId, SimError, Tick};
use std::collections::VecDeque;
use strum::EnumString;

/// Clamps the rate of change of its own output to `[falling_rate, rising_rate]`
/// units per second, using the kernel's active `dt` as the local step size.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    pub rising_rate: f64,
    pub falling_rate: f64,
    output: f64,
    initialized: bool,
}

impl RateLimiter {
    pub fn new(rising_rate: f64, falling_rate: f64, initial_output: f64) -> Self {
        RateLimiter {
            rising_rate,
            falling_rate,
            output: initial_output,
            initialized: false,
        }
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if !self.initialized {
            self.output = input;
            self.initialized = true;
            return;
        }
        let max_step = self.rising_rate * tick.dt;
        let min_step = self.falling_rate * tick.dt;
        let delta = (input - self.output).clamp(min_step, max_step);
        self.output += delta;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Sampled moving average over a fixed window of samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    pub window_size: usize,
    pub sample_time: f64,
    window: VecDeque<f64>,
    last_sample_time: f64,
    output: f64,
}

impl MovingAverage {
    pub fn new(window_size: usize, sample_time: f64) -> Self {
        MovingAverage {
            window_size: window_size.max(1),
            sample_time,
            window: VecDeque::new(),
            last_sample_time: f64::NEG_INFINITY,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.window.clear();
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if tick.t - self.last_sample_time >= self.sample_time - 1e-9 {
            self.window.push_back(input);
            while self.window.len() > self.window_size {
                self.window.pop_front();
            }
            self.output = self.window.iter().sum::<f64>() / self.window.len() as f64;
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// First-order continuous low-pass, `wc / (s + wc)`.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    pub cutoff_freq: f64,
    cell: IntegratorCell,
}

impl LowPassFilter {
    pub fn new(cutoff_freq: f64, initial_output: f64) -> Self {
        LowPassFilter {
            cutoff_freq,
            cell: IntegratorCell::new(initial_output),
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        self.cell.xdot = self.cutoff_freq * (input - self.cell.x);
    }
    pub fn propagate(&mut self, tick: &Tick) {
        self.cell.propagate(tick);
    }
    pub fn get_output(&self) -> f64 {
        self.cell.x
    }
}

/// First-order continuous high-pass, derived as `input - low_pass(input)`.
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    pub cutoff_freq: f64,
    cell: IntegratorCell,
    output: f64,
}

impl HighPassFilter {
    pub fn new(cutoff_freq: f64) -> Self {
        HighPassFilter {
            cutoff_freq,
            cell: IntegratorCell::new(0.0),
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        self.cell.xdot = self.cutoff_freq * (input - self.cell.x);
        self.output = input - self.cell.x;
    }
    pub fn propagate(&mut self, tick: &Tick) {
        self.cell.propagate(tick);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Cascaded high-pass then low-pass, giving a band between `low_cutoff` and
/// `high_cutoff`.
#[derive(Debug, Clone)]
pub struct BandPassFilter {
    pub low_cutoff: f64,
    pub high_cutoff: f64,
    hp_cell: IntegratorCell,
    lp_cell: IntegratorCell,
    hp_output: f64,
}

impl BandPassFilter {
    pub fn new(low_cutoff: f64, high_cutoff: f64) -> Self {
        BandPassFilter {
            low_cutoff,
            high_cutoff,
            hp_cell: IntegratorCell::new(0.0),
            lp_cell: IntegratorCell::new(0.0),
            hp_output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        self.hp_cell.xdot = self.low_cutoff * (input - self.hp_cell.x);
        self.hp_output = input - self.hp_cell.x;
        self.lp_cell.xdot = self.high_cutoff * (self.hp_output - self.lp_cell.x);
    }
    pub fn propagate(&mut self, tick: &Tick) {
        self.hp_cell.propagate(tick);
        self.lp_cell.propagate(tick);
    }
    pub fn get_output(&self) -> f64 {
        self.lp_cell.x
    }
}

/// Dead-band-with-memory nonlinearity: the output only moves once the input
/// has traveled `width` past the current output.
#[derive(Debug, Clone)]
pub struct Backlash {
    pub width: f64,
    output: f64,
}

impl Backlash {
    pub fn new(width: f64, initial_output: f64) -> Self {
        Backlash {
            width: width.abs(),
            output: initial_output,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        let half = self.width / 2.0;
        if input > self.output + half {
            self.output = input - half;
        } else if input < self.output - half {
            self.output = input + half;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FilterDesign {
    Butterworth,
    Chebyshev1,
    Chebyshev2,
    Bessel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FilterResponse {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

fn butterworth_poles(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|k| {
            let theta = std::f64::consts::PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
            (theta.cos(), theta.sin())
        })
        .collect()
}

fn chebyshev1_poles(n: usize, ripple_db: f64) -> Vec<(f64, f64)> {
    let epsilon = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let v0 = (1.0 / epsilon).asinh() / n as f64;
    let (sinh_v0, cosh_v0) = (v0.sinh(), v0.cosh());
    (0..n)
        .map(|k| {
            let theta = std::f64::consts::PI * (2 * k + 1) as f64 / (2 * n) as f64;
            (-sinh_v0 * theta.sin(), cosh_v0 * theta.cos())
        })
        .collect()
}

fn chebyshev2_poles(n: usize, stopband_db: f64) -> Vec<(f64, f64)> {
    let epsilon = 1.0 / (10f64.powf(stopband_db / 10.0) - 1.0).sqrt();
    let v0 = (1.0 / epsilon).asinh() / n as f64;
    let (sinh_v0, cosh_v0) = (v0.sinh(), v0.cosh());
    (0..n)
        .map(|k| {
            let theta = std::f64::consts::PI * (2 * k + 1) as f64 / (2 * n) as f64;
            let sigma = -sinh_v0 * theta.sin();
            let omega = cosh_v0 * theta.cos();
            let denom = sigma * sigma + omega * omega;
            if denom.abs() > 1e-10 {
                (sigma / denom, -omega / denom)
            } else {
                (-1.0, 0.0)
            }
        })
        .collect()
}

/// Precomputed for orders 1-5 (normalized to unity delay at DC), matching the
/// original's table; higher orders fall back to a Butterworth-like spread
/// pushed further from the origin, same as the original's approximation.
fn bessel_poles(n: usize) -> Vec<(f64, f64)> {
    const TABLE: &[&[(f64, f64)]] = &[
        &[(-1.0, 0.0)],
        &[(-1.1030, 0.6368), (-1.1030, -0.6368)],
        &[(-1.0509, 0.9991), (-1.0509, -0.9991), (-1.3270, 0.0)],
        &[
            (-0.9952, 1.2571),
            (-0.9952, -1.2571),
            (-1.3700, 0.4103),
            (-1.3700, -0.4103),
        ],
        &[
            (-0.9576, 1.4711),
            (-0.9576, -1.4711),
            (-1.3809, 0.7179),
            (-1.3809, -0.7179),
            (-1.5023, 0.0),
        ],
    ];
    if let Some(poles) = TABLE.get(n.saturating_sub(1)) {
        if n >= 1 && n <= TABLE.len() {
            return poles.to_vec();
        }
    }
    (0..n)
        .map(|k| {
            let theta = std::f64::consts::PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
            let r = 1.0 + 0.2 * n as f64;
            (r * theta.cos(), r * theta.sin())
        })
        .collect()
}

/// Direct-Form-II-Transposed second-order section.
#[derive(Debug, Clone, Copy, Default)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn process(&mut self, x: f64) -> f64 {
        let y =
            self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Butterworth/Chebyshev-I/Chebyshev-II/Bessel IIR design, bilinear-
/// transformed pole-by-pole into a cascade of `Biquad` sections. Design is
/// deferred to the first macro-step (the analog prototype needs `dt`, which
/// isn't known at construction), mirroring the lazy `_design_filter` call in
/// its Python original.
#[derive(Debug, Clone)]
pub struct AnalogFilter {
    pub design: FilterDesign,
    pub response: FilterResponse,
    pub order: usize,
    pub cutoff_freq: f64,
    pub low_cutoff: f64,
    pub high_cutoff: f64,
    pub passband_ripple: f64,
    pub stopband_atten: f64,
    biquads: Vec<Biquad>,
    initialized: bool,
    output: f64,
}

impl AnalogFilter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        block: &BlockId,
        design: &str,
        response: &str,
        order: usize,
        cutoff_freq: f64,
        low_cutoff: f64,
        high_cutoff: f64,
        passband_ripple: f64,
        stopband_atten: f64,
    ) -> Result<Self, SimError> {
        let design = design.parse().map_err(|_| SimError::BadParameters {
            block: block.clone(),
            reason: format!("unknown analog filter design '{design}'"),
        })?;
        let response = response.parse().map_err(|_| SimError::BadParameters {
            block: block.clone(),
            reason: format!("unknown analog filter response '{response}'"),
        })?;
        Ok(AnalogFilter {
            design,
            response,
            order: order.clamp(1, 10),
            cutoff_freq,
            low_cutoff,
            high_cutoff,
            passband_ripple,
            stopband_atten,
            biquads: Vec::new(),
            initialized: false,
            output: 0.0,
        })
    }

    pub fn init(&mut self) {
        self.biquads.clear();
        self.initialized = false;
        self.output = 0.0;
    }

    fn design_filter(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let poles = match self.design {
            FilterDesign::Butterworth => butterworth_poles(self.order),
            FilterDesign::Chebyshev1 => chebyshev1_poles(self.order, self.passband_ripple),
            FilterDesign::Chebyshev2 => chebyshev2_poles(self.order, self.stopband_atten),
            FilterDesign::Bessel => bessel_poles(self.order),
        };

        let wc = match self.response {
            FilterResponse::Lowpass | FilterResponse::Highpass => {
                2.0 * std::f64::consts::PI * self.cutoff_freq
            }
            FilterResponse::Bandpass | FilterResponse::Bandstop => {
                let wc_low = 2.0 * std::f64::consts::PI * self.low_cutoff;
                let wc_high = 2.0 * std::f64::consts::PI * self.high_cutoff;
                (wc_low * wc_high).sqrt()
            }
        };

        self.biquads.clear();
        let k = 2.0 / dt;
        let mut i = 0;
        while i < poles.len() {
            let (re, im) = poles[i];
            if im.abs() < 1e-10 {
                let p = re * wc;
                let a0 = k - p;
                let a1 = -k - p;
                let (b0, b1) = if self.response == FilterResponse::Lowpass {
                    (-p, -p)
                } else {
                    (k, -k)
                };
                if a0.abs() > 1e-10 {
                    self.biquads.push(Biquad {
                        b0: b0 / a0,
                        b1: b1 / a0,
                        a1: a1 / a0,
                        ..Default::default()
                    });
                }
                i += 1;
            } else {
                let sigma = re * wc;
                let omega = im * wc;
                let w0_sq = sigma * sigma + omega * omega;
                let a0 = k * k - 2.0 * sigma * k + w0_sq;
                let a1 = 2.0 * w0_sq - 2.0 * k * k;
                let a2 = k * k + 2.0 * sigma * k + w0_sq;
                let (b0, b1, b2) = match self.response {
                    FilterResponse::Lowpass => (w0_sq, 2.0 * w0_sq, w0_sq),
                    FilterResponse::Highpass => (k * k, -2.0 * k * k, k * k),
                    _ => {
                        let bw = omega.abs() * 2.0;
                        (bw * k, 0.0, -bw * k)
                    }
                };
                if a0.abs() > 1e-10 {
                    self.biquads.push(Biquad {
                        b0: b0 / a0,
                        b1: b1 / a0,
                        b2: b2 / a0,
                        a1: a1 / a0,
                        a2: a2 / a0,
                        ..Default::default()
                    });
                }
                i += 2;
            }
        }

        if self.biquads.is_empty() {
            self.biquads.push(Biquad {
                b0: 1.0,
                ..Default::default()
            });
        }
        self.initialized = true;
    }

    /// Runs the biquad cascade once per macro-step (`tick.kpass == 0`). The
    /// block this is grounded on has no multi-pass concept at all — its
    /// `State.dt` is the macro-step itself — so advancing the cascade on
    /// every solver pass here would over-drive its memory under RK2/RK4/
    /// Merson; gating on the first pass reproduces "one recursive step per
    /// macro-step" instead.
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        if tick.kpass != 0 {
            return;
        }
        let input = inputs.first().copied().unwrap_or(0.0);
        if !self.initialized && tick.dtp > 0.0 {
            self.design_filter(tick.dtp);
        }
        let mut x = input;
        for bq in &mut self.biquads {
            x = bq.process(x);
        }
        self.output = x;
    }

    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Peaking-EQ biquad tuned to near-zero gain at `notch_freq`, for rejecting a
/// narrowband disturbance (line hum, a known mechanical resonance) without
/// otherwise touching the spectrum.
#[derive(Debug, Clone)]
pub struct NotchFilter {
    pub notch_freq: f64,
    pub bandwidth: f64,
    pub depth: f64,
    biquad: Biquad,
    initialized: bool,
    output: f64,
}

impl NotchFilter {
    pub fn new(notch_freq: f64, bandwidth: f64, depth: f64) -> Self {
        NotchFilter {
            notch_freq,
            bandwidth,
            depth,
            biquad: Biquad {
                b0: 1.0,
                b2: 1.0,
                ..Default::default()
            },
            initialized: false,
            output: 0.0,
        }
    }

    pub fn init(&mut self) {
        self.biquad = Biquad {
            b0: 1.0,
            b2: 1.0,
            ..Default::default()
        };
        self.initialized = false;
        self.output = 0.0;
    }

    fn design_notch(&mut self, dt: f64) {
        if dt <= 0.0 || self.notch_freq <= 0.0 {
            return;
        }
        let fs = 1.0 / dt;
        let w0 = 2.0 * std::f64::consts::PI * self.notch_freq / fs;
        let q = self.notch_freq / self.bandwidth.max(0.01);
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        self.biquad.b0 = 1.0 / a0;
        self.biquad.b1 = -2.0 * w0.cos() / a0;
        self.biquad.b2 = 1.0 / a0;
        self.biquad.a1 = -2.0 * w0.cos() / a0;
        self.biquad.a2 = (1.0 - alpha) / a0;
        self.initialized = true;
    }

    /// Same once-per-macro-step gating as `AnalogFilter::update`.
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        if tick.kpass != 0 {
            return;
        }
        let input = inputs.first().copied().unwrap_or(0.0);
        if !self.initialized && tick.dtp > 0.0 {
            self.design_notch(tick.dtp);
        }
        self.output = self.biquad.process(input);
    }

    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use simbus_types::SolverMethod;

    #[test]
    fn low_pass_settles_to_step_input() {
        let mut lp = LowPassFilter::new(5.0, 0.0);
        let mut tick = Tick::new(SolverMethod::Rk4, 0.01);
        for _ in 0..500 {
            for _ in 0..tick.method.passes() {
                lp.update(&[1.0]);
                lp.propagate(&tick);
                tick.advance();
            }
        }
        assert_relative_eq!(lp.get_output(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn backlash_holds_inside_dead_band() {
        let mut bl = Backlash::new(1.0, 0.0);
        bl.update(&[0.3]);
        assert_relative_eq!(bl.get_output(), 0.0, epsilon = 1e-12);
        bl.update(&[2.0]);
        assert_relative_eq!(bl.get_output(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn rate_limiter_clamps_rise() {
        let mut rl = RateLimiter::new(1.0, -1.0, 0.0);
        let tick = Tick::new(SolverMethod::Euler, 0.1);
        rl.update(&[0.0], &tick);
        rl.update(&[10.0], &tick);
        assert_relative_eq!(rl.get_output(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn analog_filter_butterworth_lowpass_settles_to_step_input() {
        let id: BlockId = "af".into();
        let mut af = AnalogFilter::new(&id, "butterworth", "lowpass", 2, 5.0, 1.0, 10.0, 1.0, 40.0)
            .expect("valid filter parameters");
        let mut tick = Tick::new(SolverMethod::Euler, 0.001);
        for _ in 0..5000 {
            af.update(&[1.0], &tick);
            tick.advance();
        }
        assert_relative_eq!(af.get_output(), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn analog_filter_rejects_unknown_design() {
        let id: BlockId = "af".into();
        assert!(AnalogFilter::new(&id, "not_a_design", "lowpass", 2, 5.0, 1.0, 10.0, 1.0, 40.0).is_err());
    }

    #[test]
    fn analog_filter_only_advances_on_first_pass() {
        let id: BlockId = "af".into();
        let mut af = AnalogFilter::new(&id, "butterworth", "lowpass", 2, 5.0, 1.0, 10.0, 1.0, 40.0)
            .expect("valid filter parameters");
        let mut tick = Tick::new(SolverMethod::Rk4, 0.01);
        af.update(&[1.0], &tick);
        let after_first_pass = af.get_output();
        tick.advance();
        af.update(&[1.0], &tick);
        assert_relative_eq!(af.get_output(), after_first_pass, epsilon = 1e-12);
    }

    #[test]
    fn notch_filter_passes_dc_unchanged() {
        let mut nf = NotchFilter::new(60.0, 4.0, 40.0);
        let tick = Tick::new(SolverMethod::Euler, 0.001);
        for _ in 0..50 {
            nf.update(&[2.0], &tick);
        }
        assert_relative_eq!(nf.get_output(), 2.0, epsilon = 1e-6);
    }
}
