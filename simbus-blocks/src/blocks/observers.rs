use crate::cell::IntegratorCell;
use simbus_types::{BlockId, SimError, Tick};

fn matvec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

/// Continuous-time state estimator `x_hat' = A x_hat + B u + L (y - C x_hat)`.
///
/// Unlike the reference implementation this block is grounded on (which
/// hardcodes explicit Euler for its state update regardless of the chosen
/// solver), each state owns a real `IntegratorCell` driven by the kernel's
/// configured method, so the observer's accuracy scales with the rest of the
/// model instead of silently downgrading to first order.
#[derive(Debug, Clone)]
pub struct LuenbergerObserver {
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    c: Vec<Vec<f64>>,
    l: Vec<f64>,
    cells: Vec<IntegratorCell>,
}

impl LuenbergerObserver {
    pub fn new(
        block: &BlockId,
        a: Vec<Vec<f64>>,
        b: Vec<f64>,
        c: Vec<Vec<f64>>,
        l: Vec<f64>,
        initial_states: &[f64],
    ) -> Result<Self, SimError> {
        let n = a.len();
        if a.iter().any(|row| row.len() != n) || b.len() != n || l.len() != n {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "luenberger observer matrices must agree on state dimension n".into(),
            });
        }
        let cells = (0..n)
            .map(|i| IntegratorCell::new(initial_states.get(i).copied().unwrap_or(0.0)))
            .collect();
        Ok(LuenbergerObserver { a, b, c, l, cells })
    }
    /// `inputs = [u, y_0, y_1, ...]`: plant input followed by measured outputs.
    pub fn update(&mut self, inputs: &[f64]) {
        let u = inputs.first().copied().unwrap_or(0.0);
        let y: Vec<f64> = inputs.get(1..).unwrap_or(&[]).to_vec();
        let x: Vec<f64> = self.cells.iter().map(|c| c.x).collect();
        let y_hat = matvec(&self.c, &x);
        let innovation: f64 = y
            .iter()
            .zip(&y_hat)
            .map(|(m, e)| m - e)
            .next()
            .unwrap_or(0.0);
        let ax = matvec(&self.a, &x);
        for (i, cell) in self.cells.iter_mut().enumerate() {
            cell.xdot = ax[i] + self.b[i] * u + self.l[i] * innovation;
        }
    }
    pub fn propagate(&mut self, tick: &Tick) {
        for cell in &mut self.cells {
            cell.propagate(tick);
        }
    }
    pub fn get_output(&self, port: usize) -> f64 {
        self.cells.get(port).map(|c| c.x).unwrap_or(0.0)
    }
    pub fn num_states(&self) -> usize {
        self.cells.len()
    }
}

fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = a.len();
    let cols = b.first().map(|r| r.len()).unwrap_or(0);
    let inner = b.len();
    (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| (0..inner).map(|k| a[i][k] * b[k][j]).sum())
                .collect()
        })
        .collect()
}

fn mat_transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if a.is_empty() {
        return Vec::new();
    }
    let rows = a.len();
    let cols = a[0].len();
    (0..cols)
        .map(|j| (0..rows).map(|i| a[i][j]).collect())
        .collect()
}

fn mat_add(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .zip(b)
        .map(|(ra, rb)| ra.iter().zip(rb).map(|(x, y)| x + y).collect())
        .collect()
}

fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// 1x1 measurement-model inverse with a zero-gain fallback when the scalar
/// innovation covariance is (numerically) singular.
fn safe_scalar_inverse(s: f64) -> f64 {
    if s.abs() < 1e-12 {
        0.0
    } else {
        1.0 / s
    }
}

/// Discrete-time Kalman filter with a scalar measurement, `x[k+1] = A x[k] +
/// B u[k]`, `y[k] = C x[k]`.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    c: Vec<Vec<f64>>,
    q: Vec<Vec<f64>>,
    r: f64,
    x: Vec<f64>,
    p: Vec<Vec<f64>>,
    pub sample_time: f64,
    last_sample_time: f64,
}

impl KalmanFilter {
    pub fn new(
        block: &BlockId,
        a: Vec<Vec<f64>>,
        b: Vec<f64>,
        c: Vec<Vec<f64>>,
        q: Vec<Vec<f64>>,
        r: f64,
        initial_states: Vec<f64>,
        sample_time: f64,
    ) -> Result<Self, SimError> {
        let n = a.len();
        if a.iter().any(|row| row.len() != n) || b.len() != n || initial_states.len() != n {
            return Err(SimError::BadParameters {
                block: block.clone(),
                reason: "kalman filter matrices must agree on state dimension n".into(),
            });
        }
        Ok(KalmanFilter {
            a,
            b,
            c,
            q,
            r,
            x: initial_states,
            p: identity(n),
            sample_time,
            last_sample_time: f64::NEG_INFINITY,
        })
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    /// `inputs = [u, y]`.
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        if tick.t - self.last_sample_time < self.sample_time - 1e-9 {
            return;
        }
        self.last_sample_time = tick.t;
        let u = inputs.first().copied().unwrap_or(0.0);
        let y = inputs.get(1).copied().unwrap_or(0.0);

        let x_pred = {
            let ax = matvec(&self.a, &self.x);
            ax.iter().zip(&self.b).map(|(a, b)| a + b * u).collect::<Vec<_>>()
        };
        let at = mat_transpose(&self.a);
        let p_pred = mat_add(&mat_mul(&mat_mul(&self.a, &self.p), &at), &self.q);

        let y_pred = matvec(&self.c, &x_pred).first().copied().unwrap_or(0.0);
        let innovation = y - y_pred;
        let ct = mat_transpose(&self.c);
        let pc = mat_mul(&p_pred, &ct);
        let s = mat_mul(&self.c, &pc)
            .first()
            .and_then(|row| row.first())
            .copied()
            .unwrap_or(0.0)
            + self.r;
        let s_inv = safe_scalar_inverse(s);
        let k: Vec<f64> = pc.iter().map(|row| row.first().copied().unwrap_or(0.0) * s_inv).collect();

        self.x = x_pred
            .iter()
            .zip(&k)
            .map(|(xp, ki)| xp + ki * innovation)
            .collect();
        let n = self.x.len();
        let kc = mat_mul(&k.iter().map(|v| vec![*v]).collect::<Vec<_>>(), &self.c);
        let i_minus_kc = mat_add(&identity(n), &kc.iter().map(|row| row.iter().map(|v| -v).collect()).collect::<Vec<_>>());
        self.p = mat_mul(&i_minus_kc, &p_pred);
    }
    pub fn get_output(&self, port: usize) -> f64 {
        self.x.get(port).copied().unwrap_or(0.0)
    }
    pub fn num_states(&self) -> usize {
        self.x.len()
    }
}

/// Extended Kalman filter using a single-integrator prediction model
/// (`F = I`, linearized about the current estimate) rather than a general
/// nonlinear plant callback, matching the scope of the reference
/// implementation this is grounded on.
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter {
    q: f64,
    r: f64,
    x: f64,
    p: f64,
    pub sample_time: f64,
    last_sample_time: f64,
}

impl ExtendedKalmanFilter {
    pub fn new(q: f64, r: f64, initial_state: f64, sample_time: f64) -> Self {
        ExtendedKalmanFilter {
            q,
            r,
            x: initial_state,
            p: 1.0,
            sample_time,
            last_sample_time: f64::NEG_INFINITY,
        }
    }
    pub fn init(&mut self) {
        self.last_sample_time = 0.0;
    }
    /// `inputs = [u, y]`; prediction model is `x_pred = x + dt * u`.
    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        if tick.t - self.last_sample_time < self.sample_time - 1e-9 {
            return;
        }
        let dt = self.sample_time.max(tick.dt);
        self.last_sample_time = tick.t;
        let u = inputs.first().copied().unwrap_or(0.0);
        let y = inputs.get(1).copied().unwrap_or(0.0);

        let x_pred = self.x + dt * u;
        let p_pred = self.p + self.q;

        let s = p_pred + self.r;
        let k = safe_scalar_inverse(s) * p_pred;
        self.x = x_pred + k * (y - x_pred);
        self.p = (1.0 - k) * p_pred;
    }
    pub fn get_output(&self, _port: usize) -> f64 {
        self.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbus_types::SolverMethod;

    #[test]
    fn luenberger_observer_tracks_constant_measurement() {
        let mut obs = LuenbergerObserver::new(
            &"obs".to_string(),
            vec![vec![0.0]],
            vec![1.0],
            vec![vec![1.0]],
            vec![5.0],
            &[0.0],
        )
        .unwrap();
        let mut tick = Tick::new(SolverMethod::Rk4, 0.01);
        for _ in 0..500 {
            for _ in 0..tick.method.passes() {
                obs.update(&[0.0, 1.0]);
                obs.propagate(&tick);
                tick.advance();
            }
        }
        assert!((obs.get_output(0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn kalman_filter_converges_on_constant_signal() {
        let mut kf = KalmanFilter::new(
            &"kf".to_string(),
            vec![vec![1.0]],
            vec![0.0],
            vec![vec![1.0]],
            vec![vec![1e-4]],
            1e-2,
            vec![0.0],
            0.1,
        )
        .unwrap();
        kf.init();
        let mut tick = Tick::new(SolverMethod::Euler, 0.1);
        for i in 0..50 {
            tick.t = i as f64 * 0.1;
            kf.update(&[0.0, 3.0], &tick);
        }
        assert!((kf.get_output(0) - 3.0).abs() < 0.2);
    }
}
