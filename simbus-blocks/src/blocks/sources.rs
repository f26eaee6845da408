use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use simbus_types::Tick;

#[derive(Debug, Clone)]
pub struct Constant {
    pub value: f64,
    output: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Constant { value, output: 0.0 }
    }
    pub fn init(&mut self) {
        self.output = self.value;
    }
    pub fn update(&mut self, _tick: &Tick) {
        self.output = self.value;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub step_time: f64,
    pub initial_value: f64,
    pub final_value: f64,
    output: f64,
}

impl Step {
    pub fn new(step_time: f64, initial_value: f64, final_value: f64) -> Self {
        Step {
            step_time,
            initial_value,
            final_value,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.output = self.initial_value;
    }
    pub fn update(&mut self, tick: &Tick) {
        self.output = if tick.t >= self.step_time {
            self.final_value
        } else {
            self.initial_value
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct Ramp {
    pub slope: f64,
    pub start_time: f64,
    pub initial_output: f64,
    output: f64,
}

impl Ramp {
    pub fn new(slope: f64, start_time: f64, initial_output: f64) -> Self {
        Ramp {
            slope,
            start_time,
            initial_output,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.output = self.initial_output;
    }
    pub fn update(&mut self, tick: &Tick) {
        self.output = if tick.t >= self.start_time {
            self.initial_output + self.slope * (tick.t - self.start_time)
        } else {
            self.initial_output
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct SineWave {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
    pub bias: f64,
    output: f64,
}

impl SineWave {
    pub fn new(amplitude: f64, frequency: f64, phase: f64, bias: f64) -> Self {
        SineWave {
            amplitude,
            frequency,
            phase,
            bias,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.output = self.amplitude * self.phase.sin() + self.bias;
    }
    pub fn update(&mut self, tick: &Tick) {
        self.output = self.amplitude
            * (2.0 * std::f64::consts::PI * self.frequency * tick.t + self.phase).sin()
            + self.bias;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Default)]
pub struct Clock {
    output: f64,
}

impl Clock {
    pub fn new() -> Self {
        Clock::default()
    }
    pub fn init(&mut self) {
        self.output = 0.0;
    }
    pub fn update(&mut self, tick: &Tick) {
        self.output = tick.t;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct PulseGenerator {
    pub amplitude: f64,
    pub period: f64,
    /// Fraction of `period` spent high, already normalized from a percentage.
    pub duty_cycle: f64,
    pub phase_delay: f64,
    output: f64,
}

impl PulseGenerator {
    pub fn new(amplitude: f64, period: f64, duty_cycle_pct: f64, phase_delay: f64) -> Self {
        PulseGenerator {
            amplitude,
            period,
            duty_cycle: duty_cycle_pct / 100.0,
            phase_delay,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.output = 0.0;
    }
    pub fn update(&mut self, tick: &Tick) {
        self.output = if tick.t < self.phase_delay {
            0.0
        } else {
            let t_in_period = (tick.t - self.phase_delay).rem_euclid(self.period);
            if t_in_period < self.period * self.duty_cycle {
                self.amplitude
            } else {
                0.0
            }
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Additive Gaussian noise. A `seed` gives bit-for-bit reproducible runs; an
/// unseeded block draws from system entropy, matching `random.Random(None)`.
pub struct WhiteNoise {
    pub mean: f64,
    pub std_dev: f64,
    pub sample_time: f64,
    rng: SmallRng,
    dist: Normal<f64>,
    last_sample_time: f64,
    output: f64,
}

impl WhiteNoise {
    pub fn new(mean: f64, variance: f64, seed: Option<u64>, sample_time: f64) -> Self {
        let std_dev = variance.abs().sqrt();
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        };
        WhiteNoise {
            mean,
            std_dev,
            sample_time,
            rng,
            dist: Normal::new(mean, std_dev).unwrap_or_else(|_| Normal::new(0.0, 1.0).unwrap()),
            last_sample_time: f64::NEG_INFINITY,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.output = self.dist.sample(&mut self.rng);
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, tick: &Tick) {
        if self.sample_time <= 0.0 {
            self.output = self.dist.sample(&mut self.rng);
        } else if tick.t >= self.last_sample_time + self.sample_time {
            self.output = self.dist.sample(&mut self.rng);
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

impl std::fmt::Debug for WhiteNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhiteNoise")
            .field("mean", &self.mean)
            .field("std_dev", &self.std_dev)
            .finish()
    }
}

pub struct UniformNoise {
    pub minimum: f64,
    pub maximum: f64,
    pub sample_time: f64,
    rng: SmallRng,
    last_sample_time: f64,
    output: f64,
}

impl UniformNoise {
    pub fn new(minimum: f64, maximum: f64, seed: Option<u64>, sample_time: f64) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        };
        UniformNoise {
            minimum,
            maximum,
            sample_time,
            rng,
            last_sample_time: f64::NEG_INFINITY,
            output: 0.0,
        }
    }
    fn draw(&mut self) -> f64 {
        if self.maximum > self.minimum {
            Uniform::new(self.minimum, self.maximum).sample(&mut self.rng)
        } else {
            self.rng.gen_range(self.maximum..=self.minimum)
        }
    }
    pub fn init(&mut self) {
        self.output = self.draw();
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, tick: &Tick) {
        if self.sample_time <= 0.0 {
            self.output = self.draw();
        } else if tick.t >= self.last_sample_time + self.sample_time {
            self.output = self.draw();
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

impl std::fmt::Debug for UniformNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformNoise")
            .field("minimum", &self.minimum)
            .field("maximum", &self.maximum)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_holds_before_start() {
        let mut r = Ramp::new(2.0, 1.0, 0.5);
        r.init();
        let mut tick = Tick::new(simbus_types::SolverMethod::Euler, 0.1);
        tick.t = 0.5;
        r.update(&tick);
        assert_eq!(r.get_output(), 0.5);
        tick.t = 2.0;
        r.update(&tick);
        assert_eq!(r.get_output(), 0.5 + 2.0 * 1.0);
    }

    #[test]
    fn white_noise_is_reproducible_with_seed() {
        let mut a = WhiteNoise::new(0.0, 1.0, Some(42), 0.0);
        let mut b = WhiteNoise::new(0.0, 1.0, Some(42), 0.0);
        let tick = Tick::new(simbus_types::SolverMethod::Euler, 0.1);
        a.init();
        b.init();
        for _ in 0..5 {
            a.update(&tick);
            b.update(&tick);
            assert_eq!(a.get_output(), b.get_output());
        }
    }
}
