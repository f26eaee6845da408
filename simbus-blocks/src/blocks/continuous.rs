use crate::cell::IntegratorCell;
use simbus_types::{BlockId, SimError, Tick};

/// `xdot = gain * input`, clamped to `[lower_limit, upper_limit]`. Contact
/// with a limit zeroes the derivative on that pass so the state does not
/// wind up past the boundary, mirroring `continuous.py::Integrator.update`.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub gain: f64,
    pub upper_limit: f64,
    pub lower_limit: f64,
    cell: IntegratorCell,
    output: f64,
}

impl Integrator {
    pub fn new(gain: f64, initial_value: f64, upper_limit: f64, lower_limit: f64) -> Self {
        Integrator {
            gain,
            upper_limit,
            lower_limit,
            cell: IntegratorCell::new(initial_value),
            output: initial_value.clamp(lower_limit, upper_limit),
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        let mut xdot = self.gain * input;
        if self.cell.x >= self.upper_limit && xdot > 0.0 {
            xdot = 0.0;
        }
        if self.cell.x <= self.lower_limit && xdot < 0.0 {
            xdot = 0.0;
        }
        self.cell.xdot = xdot;
        self.output = self.cell.x.clamp(self.lower_limit, self.upper_limit);
    }
    pub fn propagate(&mut self, tick: &Tick) {
        self.cell.propagate(tick);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Filtered derivative `N / (s + N)`. The single state tracks a lagged copy
/// of the input; the reported output is `N * (input - state)`, not the
/// state itself, per `continuous.py::Derivative`.
#[derive(Debug, Clone)]
pub struct Derivative {
    pub n: f64,
    cell: IntegratorCell,
    output: f64,
}

impl Derivative {
    pub fn new(n: f64) -> Self {
        Derivative {
            n,
            cell: IntegratorCell::new(0.0),
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        self.output = self.n * (input - self.cell.x);
        self.cell.xdot = self.output;
    }
    pub fn propagate(&mut self, tick: &Tick) {
        self.cell.propagate(tick);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Single-input single-output continuous transfer function in controllable
/// canonical form. `order == 0` degenerates to a static gain, matching
/// `continuous.py::TransferFunction`'s special case.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    cells: Vec<IntegratorCell>,
    output: f64,
}

impl TransferFunction {
    pub fn new(block: &BlockId, numerator: &[f64], denominator: &[f64]) -> Result<Self, SimError> {
        if denominator.is_empty() || denominator[0] == 0.0 {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "transfer function denominator must be nonempty with nonzero leading coefficient".into(),
            });
        }
        let a0 = denominator[0];
        let denominator: Vec<f64> = denominator.iter().map(|a| a / a0).collect();
        let numerator: Vec<f64> = numerator.iter().map(|b| b / a0).collect();
        let order = denominator.len() - 1;
        Ok(TransferFunction {
            numerator,
            denominator,
            cells: vec![IntegratorCell::new(0.0); order],
            output: 0.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let input = inputs.first().copied().unwrap_or(0.0);
        if self.cells.is_empty() {
            self.output = self.numerator.last().copied().unwrap_or(0.0) * input;
            return;
        }
        let order = self.cells.len();
        let states: Vec<f64> = self.cells.iter().map(|c| c.x).collect();
        let feedback: f64 = self.denominator[1..]
            .iter()
            .zip(&states)
            .map(|(a, x)| a * x)
            .sum();
        let xdot_last = input - feedback;
        for i in 0..order - 1 {
            self.cells[i].xdot = states[i + 1];
        }
        self.cells[order - 1].xdot = xdot_last;

        let num_pad = order + 1 - self.numerator.len();
        let leading_num = self.denominator.last().copied().unwrap_or(1.0);
        let _ = leading_num;
        self.output = (0..order)
            .map(|i| {
                let b = self
                    .numerator
                    .get(i + num_pad)
                    .copied()
                    .unwrap_or(0.0);
                b * states[i]
            })
            .sum::<f64>()
            + self
                .numerator
                .get(order + num_pad)
                .copied()
                .unwrap_or(0.0)
                * input;
    }
    pub fn propagate(&mut self, tick: &Tick) {
        for cell in &mut self.cells {
            cell.propagate(tick);
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Linear state space `x' = Ax + Bu`, `y = Cx + Du`, one scalar input, one
/// scalar output. Matrices are stored row-major.
#[derive(Debug, Clone)]
pub struct StateSpace {
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: f64,
    cells: Vec<IntegratorCell>,
    output: f64,
}

impl StateSpace {
    pub fn new(
        block: &BlockId,
        a: Vec<Vec<f64>>,
        b: Vec<f64>,
        c: Vec<f64>,
        d: f64,
        initial_states: &[f64],
    ) -> Result<Self, SimError> {
        let n = a.len();
        if a.iter().any(|row| row.len() != n) || b.len() != n || c.len() != n {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "state space matrices must agree on dimension n".into(),
            });
        }
        let cells = (0..n)
            .map(|i| IntegratorCell::new(initial_states.get(i).copied().unwrap_or(0.0)))
            .collect();
        Ok(StateSpace {
            a,
            b,
            c,
            d,
            cells,
            output: 0.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let u = inputs.first().copied().unwrap_or(0.0);
        let x: Vec<f64> = self.cells.iter().map(|c| c.x).collect();
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let ax: f64 = self.a[i].iter().zip(&x).map(|(a, xi)| a * xi).sum();
            cell.xdot = ax + self.b[i] * u;
        }
        self.output = self.c.iter().zip(&x).map(|(c, xi)| c * xi).sum::<f64>() + self.d * u;
    }
    pub fn propagate(&mut self, tick: &Tick) {
        for cell in &mut self.cells {
            cell.propagate(tick);
        }
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// PID with a filtered derivative term, `continuous.py::PIDController`.
#[derive(Debug, Clone)]
pub struct PidController {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub n: f64,
    integral: IntegratorCell,
    deriv: IntegratorCell,
    output: f64,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64, n: f64) -> Self {
        PidController {
            kp,
            ki,
            kd,
            n,
            integral: IntegratorCell::new(0.0),
            deriv: IntegratorCell::new(0.0),
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let error = inputs.first().copied().unwrap_or(0.0);
        self.integral.xdot = error;
        let deriv_term = self.n * (error - self.deriv.x);
        self.deriv.xdot = deriv_term;
        self.output = self.kp * error + self.ki * self.integral.x + self.kd * deriv_term;
    }
    pub fn propagate(&mut self, tick: &Tick) {
        self.integral.propagate(tick);
        self.deriv.propagate(tick);
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
    fn integrator_of_constant_one_reaches_one_after_unit_time_euler() {
        let mut tick = Tick::new(SolverMethod::Euler, 0.1);
        let mut integ = Integrator::new(1.0, 0.0, f64::INFINITY, f64::NEG_INFINITY);
        for _ in 0..10 {
            integ.update(&[1.0]);
            integ.propagate(&tick);
            tick.advance();
        }
        assert_relative_eq!(integ.get_output(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn integrator_respects_upper_limit() {
        let mut tick = Tick::new(SolverMethod::Euler, 0.1);
        let mut integ = Integrator::new(1.0, 0.0, 0.5, f64::NEG_INFINITY);
        for _ in 0..20 {
            integ.update(&[1.0]);
            integ.propagate(&tick);
            tick.advance();
        }
        assert!(integ.get_output() <= 0.5 + 1e-9);
    }

    #[test]
    fn static_gain_transfer_function_has_no_states() {
        let mut tf = TransferFunction::new(&"tf".to_string(), &[2.0], &[1.0]).unwrap();
        tf.update(&[3.0]);
        assert_relative_eq!(tf.get_output(), 6.0, epsilon = 1e-12);
    }
}
