use simbus_types::{BlockId, SimError, Tick};
use std::collections::VecDeque;

fn interp_linear_extrapolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return ys[0];
    }
    if x <= xs[0] {
        let slope = (ys[1] - ys[0]) / (xs[1] - xs[0]);
        return ys[0] + slope * (x - xs[0]);
    }
    if x >= xs[n - 1] {
        let slope = (ys[n - 1] - ys[n - 2]) / (xs[n - 1] - xs[n - 2]);
        return ys[n - 1] + slope * (x - xs[n - 1]);
    }
    let idx = xs.partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);
    let t = (x - xs[idx]) / (xs[idx + 1] - xs[idx]);
    ys[idx] + t * (ys[idx + 1] - ys[idx])
}

/// 1-D table lookup with linear interpolation and linear extrapolation past
/// either end of the breakpoint table.
#[derive(Debug, Clone)]
pub struct LookupTable1D {
    breakpoints: Vec<f64>,
    table: Vec<f64>,
    output: f64,
}

impl LookupTable1D {
    pub fn new(
        block: &BlockId,
        breakpoints: Vec<f64>,
        table: Vec<f64>,
    ) -> Result<Self, SimError> {
        if breakpoints.len() != table.len() || breakpoints.is_empty() {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "lookup table breakpoints and values must be equal-length and nonempty"
                    .into(),
            });
        }
        Ok(LookupTable1D {
            breakpoints,
            table,
            output: 0.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        self.output = interp_linear_extrapolate(&self.breakpoints, &self.table, x);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// 2-D table lookup with bilinear interpolation. Unlike `LookupTable1D`, out
/// of range inputs clamp to the nearest edge rather than extrapolating; this
/// asymmetry is intentional, carried over from the original block library.
#[derive(Debug, Clone)]
pub struct LookupTable2D {
    row_breakpoints: Vec<f64>,
    col_breakpoints: Vec<f64>,
    table: Vec<Vec<f64>>,
    output: f64,
}

impl LookupTable2D {
    pub fn new(
        block: &BlockId,
        row_breakpoints: Vec<f64>,
        col_breakpoints: Vec<f64>,
        table: Vec<Vec<f64>>,
    ) -> Result<Self, SimError> {
        if row_breakpoints.is_empty()
            || col_breakpoints.is_empty()
            || table.len() != row_breakpoints.len()
            || table.iter().any(|row| row.len() != col_breakpoints.len())
        {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "2D lookup table dimensions do not match its breakpoints".into(),
            });
        }
        Ok(LookupTable2D {
            row_breakpoints,
            col_breakpoints,
            table,
            output: 0.0,
        })
    }
    fn locate(breakpoints: &[f64], x: f64) -> (usize, usize, f64) {
        let n = breakpoints.len();
        if x <= breakpoints[0] {
            return (0, 0.min(n - 1), 0.0);
        }
        if x >= breakpoints[n - 1] {
            return (n - 1, n - 1, 0.0);
        }
        let idx = breakpoints.partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);
        let t = (x - breakpoints[idx]) / (breakpoints[idx + 1] - breakpoints[idx]);
        (idx, idx + 1, t)
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        let y = inputs.get(1).copied().unwrap_or(0.0);
        let (r0, r1, tr) = Self::locate(&self.row_breakpoints, x);
        let (c0, c1, tc) = Self::locate(&self.col_breakpoints, y);
        let v00 = self.table[r0][c0];
        let v01 = self.table[r0][c1];
        let v10 = self.table[r1][c0];
        let v11 = self.table[r1][c1];
        let top = v00 + tc * (v01 - v00);
        let bottom = v10 + tc * (v11 - v10);
        self.output = top + tr * (bottom - top);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Rounds its input to the nearest multiple of `step`.
#[derive(Debug, Clone)]
pub struct Quantizer {
    pub step: f64,
    output: f64,
}

impl Quantizer {
    pub fn new(step: f64) -> Self {
        Quantizer { step, output: 0.0 }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        self.output = if self.step.abs() < f64::EPSILON {
            x
        } else {
            (x / self.step).round() * self.step
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Hysteresis switch: turns on past `on_threshold`, off past `off_threshold`,
/// and otherwise holds its previous state.
#[derive(Debug, Clone)]
pub struct Relay {
    pub on_threshold: f64,
    pub off_threshold: f64,
    pub on_value: f64,
    pub off_value: f64,
    active: bool,
    output: f64,
}

impl Relay {
    pub fn new(on_threshold: f64, off_threshold: f64, on_value: f64, off_value: f64) -> Self {
        Relay {
            on_threshold,
            off_threshold,
            on_value,
            off_value,
            active: false,
            output: off_value,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        if !self.active && x >= self.on_threshold {
            self.active = true;
        } else if self.active && x <= self.off_threshold {
            self.active = false;
        }
        self.output = if self.active {
            self.on_value
        } else {
            self.off_value
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Coulomb + viscous friction: `sign(v) * coulomb_gain + v * viscous_gain`,
/// with a dead zone below `break_away_velocity` to avoid chatter at v == 0.
#[derive(Debug, Clone)]
pub struct Coulomb {
    pub coulomb_gain: f64,
    pub viscous_gain: f64,
    pub break_away_velocity: f64,
    output: f64,
}

impl Coulomb {
    pub fn new(coulomb_gain: f64, viscous_gain: f64, break_away_velocity: f64) -> Self {
        Coulomb {
            coulomb_gain,
            viscous_gain,
            break_away_velocity: break_away_velocity.abs(),
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let v = inputs.first().copied().unwrap_or(0.0);
        let sign_term = if v.abs() < self.break_away_velocity {
            0.0
        } else {
            v.signum() * self.coulomb_gain
        };
        self.output = sign_term + self.viscous_gain * v;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Transport delay whose delay amount is itself a runtime input. Keeps a
/// pruned ring of `(t, value)` samples and linearly interpolates the output
/// at `t - delay`; samples older than the largest delay seen so far are
/// dropped each update to bound memory.
#[derive(Debug, Clone)]
pub struct VariableTransportDelay {
    pub initial_output: f64,
    history: VecDeque<(f64, f64)>,
    max_delay_seen: f64,
    output: f64,
}

impl VariableTransportDelay {
    pub fn new(initial_output: f64) -> Self {
        VariableTransportDelay {
            initial_output,
            history: VecDeque::new(),
            max_delay_seen: 0.0,
            output: initial_output,
        }
    }
    pub fn init(&mut self) {
        self.history.clear();
        self.max_delay_seen = 0.0;
        self.output = self.initial_output;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        let delay = inputs.get(1).copied().unwrap_or(0.0).max(0.0);
        self.history.push_back((tick.t, input));
        self.max_delay_seen = self.max_delay_seen.max(delay);
        let cutoff = tick.t - self.max_delay_seen;
        while self.history.len() > 2 && self.history[1].0 < cutoff {
            self.history.pop_front();
        }

        let target = tick.t - delay;
        if target <= self.history.front().map(|(t, _)| *t).unwrap_or(tick.t) {
            self.output = self.history.front().map(|(_, v)| *v).unwrap_or(self.initial_output);
            return;
        }
        let mut prev = self.history.front().copied().unwrap_or((tick.t, input));
        self.output = prev.1;
        for &(t, v) in self.history.iter() {
            if t >= target {
                let (t0, v0) = prev;
                if (t - t0).abs() < 1e-12 {
                    self.output = v;
                } else {
                    let frac = (target - t0) / (t - t0);
                    self.output = v0 + frac * (v - v0);
                }
                return;
            }
            prev = (t, v);
        }
        self.output = prev.1;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table_1d_extrapolates_past_both_ends() {
        let lut = LookupTable1D::new(
            &"l".to_string(),
            vec![0.0, 1.0, 2.0],
            vec![0.0, 10.0, 20.0],
        )
        .unwrap();
        let mut lut = lut;
        lut.update(&[-1.0]);
        assert!((lut.get_output() + 10.0).abs() < 1e-9);
        lut.update(&[3.0]);
        assert!((lut.get_output() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn lookup_table_2d_clamps_at_edges() {
        let mut lut = LookupTable2D::new(
            &"l".to_string(),
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![vec![0.0, 1.0], vec![2.0, 3.0]],
        )
        .unwrap();
        lut.update(&[-5.0, -5.0]);
        assert!((lut.get_output() - 0.0).abs() < 1e-9);
        lut.update(&[50.0, 50.0]);
        assert!((lut.get_output() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn relay_has_hysteresis() {
        let mut r = Relay::new(1.0, -1.0, 5.0, 0.0);
        r.update(&[0.5]);
        assert_eq!(r.get_output(), 0.0);
        r.update(&[1.5]);
        assert_eq!(r.get_output(), 5.0);
        r.update(&[0.0]);
        assert_eq!(r.get_output(), 5.0);
        r.update(&[-1.5]);
        assert_eq!(r.get_output(), 0.0);
    }
}
