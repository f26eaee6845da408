use simbus_types::{BlockId, SimError, Tick};
use strum::EnumString;

const EPS: f64 = 1e-9;

fn sample_due(t: f64, last_sample_time: f64, sample_time: f64) -> bool {
    t - last_sample_time >= sample_time - EPS
}

/// Holds the input from the previous sample instant; output only changes on
/// sample boundaries.
#[derive(Debug, Clone)]
pub struct UnitDelay {
    pub sample_time: f64,
    last_sample_time: f64,
    previous: f64,
    output: f64,
}

impl UnitDelay {
    pub fn new(sample_time: f64, initial_output: f64) -> Self {
        UnitDelay {
            sample_time,
            last_sample_time: f64::NEG_INFINITY,
            previous: initial_output,
            output: initial_output,
        }
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if sample_due(tick.t, self.last_sample_time, self.sample_time) {
            self.output = self.previous;
            self.previous = input;
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Samples its input on sample instants and holds the value between them.
#[derive(Debug, Clone)]
pub struct ZeroOrderHold {
    pub sample_time: f64,
    last_sample_time: f64,
    output: f64,
}

impl ZeroOrderHold {
    pub fn new(sample_time: f64) -> Self {
        ZeroOrderHold {
            sample_time,
            last_sample_time: f64::NEG_INFINITY,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if sample_due(tick.t, self.last_sample_time, self.sample_time) {
            self.output = input;
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DiscreteIntegrationMethod {
    Forward,
    Backward,
    Trapezoidal,
}

/// Discrete-time accumulator, sampled on the block's own `sample_time`
/// instead of the kernel's continuous passes.
#[derive(Debug, Clone)]
pub struct DiscreteIntegrator {
    pub gain: f64,
    pub sample_time: f64,
    pub method: DiscreteIntegrationMethod,
    last_sample_time: f64,
    previous_input: f64,
    output: f64,
}

impl DiscreteIntegrator {
    pub fn new(
        block: &BlockId,
        gain: f64,
        sample_time: f64,
        method: &str,
        initial_output: f64,
    ) -> Result<Self, SimError> {
        let method = method.parse().map_err(|_| SimError::BadParameters {
            block: block.clone(),
            reason: format!("unknown discrete integration method '{method}'"),
        })?;
        Ok(DiscreteIntegrator {
            gain,
            sample_time,
            method,
            last_sample_time: f64::NEG_INFINITY,
            previous_input: 0.0,
            output: initial_output,
        })
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if sample_due(tick.t, self.last_sample_time, self.sample_time) {
            let increment = match self.method {
                DiscreteIntegrationMethod::Forward => self.previous_input,
                DiscreteIntegrationMethod::Backward => input,
                DiscreteIntegrationMethod::Trapezoidal => 0.5 * (self.previous_input + input),
            };
            self.output += self.gain * self.sample_time * increment;
            self.previous_input = input;
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// `(u[n] - u[n-1]) / Ts`, evaluated only at sample instants.
#[derive(Debug, Clone)]
pub struct DiscreteDerivative {
    pub sample_time: f64,
    last_sample_time: f64,
    previous_input: f64,
    output: f64,
}

impl DiscreteDerivative {
    pub fn new(sample_time: f64) -> Self {
        DiscreteDerivative {
            sample_time,
            last_sample_time: f64::NEG_INFINITY,
            previous_input: 0.0,
            output: 0.0,
        }
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if sample_due(tick.t, self.last_sample_time, self.sample_time) {
            self.output = (input - self.previous_input) / self.sample_time;
            self.previous_input = input;
            self.last_sample_time = tick.t;
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Direct-form-II-transposed z-domain difference equation, sampled on its
/// own `sample_time`. `denominator[0]` normalizes all coefficients.
#[derive(Debug, Clone)]
pub struct DiscreteTransferFunction {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    pub sample_time: f64,
    state: Vec<f64>,
    last_sample_time: f64,
    output: f64,
}

impl DiscreteTransferFunction {
    pub fn new(
        block: &BlockId,
        numerator: &[f64],
        denominator: &[f64],
        sample_time: f64,
    ) -> Result<Self, SimError> {
        if denominator.is_empty() || denominator[0] == 0.0 {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "discrete transfer function denominator must be nonempty with nonzero leading coefficient".into(),
            });
        }
        let a0 = denominator[0];
        let order = denominator.len() - 1;
        let denominator: Vec<f64> = denominator.iter().map(|a| a / a0).collect();
        let num_pad = (order + 1).saturating_sub(numerator.len());
        let mut padded_num = vec![0.0; num_pad];
        padded_num.extend(numerator.iter().map(|b| b / a0));
        Ok(DiscreteTransferFunction {
            numerator: padded_num,
            denominator,
            sample_time,
            state: vec![0.0; order],
            last_sample_time: f64::NEG_INFINITY,
            output: 0.0,
        })
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if !sample_due(tick.t, self.last_sample_time, self.sample_time) {
            return;
        }
        self.last_sample_time = tick.t;
        if self.state.is_empty() {
            self.output = self.numerator.last().copied().unwrap_or(0.0) * input;
            return;
        }
        let w = input
            - self.denominator[1..]
                .iter()
                .zip(&self.state)
                .map(|(a, s)| a * s)
                .sum::<f64>();
        self.output = self.numerator[0] * w
            + self.numerator[1..]
                .iter()
                .zip(&self.state)
                .map(|(b, s)| b * s)
                .sum::<f64>();
        for i in (1..self.state.len()).rev() {
            self.state[i] = self.state[i - 1];
        }
        if !self.state.is_empty() {
            self.state[0] = w;
        }
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
    fn zero_order_hold_holds_between_samples() {
        let mut zoh = ZeroOrderHold::new(0.5);
        zoh.init();
        let mut tick = Tick::new(SolverMethod::Euler, 0.1);
        tick.t = 0.0;
        zoh.update(&[1.0], &tick);
        assert_relative_eq!(zoh.get_output(), 1.0, epsilon = 1e-12);
        tick.t = 0.2;
        zoh.update(&[9.0], &tick);
        assert_relative_eq!(zoh.get_output(), 1.0, epsilon = 1e-12);
        tick.t = 0.5;
        zoh.update(&[9.0], &tick);
        assert_relative_eq!(zoh.get_output(), 9.0, epsilon = 1e-12);
    }

    #[test]
    fn discrete_integrator_backward_euler_accumulates() {
        let mut di =
            DiscreteIntegrator::new(&"di".to_string(), 1.0, 1.0, "backward", 0.0).unwrap();
        di.init();
        let mut tick = Tick::new(SolverMethod::Euler, 1.0);
        for step in 0..3 {
            tick.t = step as f64;
            di.update(&[1.0], &tick);
        }
        assert_relative_eq!(di.get_output(), 3.0, epsilon = 1e-12);
    }
}
