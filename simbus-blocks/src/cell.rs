use simbus_types::{SolverMethod, Tick};

/// One scalar state plus its derivative slot and the scratch storage a
/// multi-pass method needs across a primary step. Owned exclusively by the
/// block that created it; see `spec.md` §3 "Integrator cell" invariant.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegratorCell {
    pub x: f64,
    pub xdot: f64,
    x0: f64,
    k1: f64,
    k2: f64,
    k3: f64,
    k4: f64,
}

impl IntegratorCell {
    pub fn new(initial: f64) -> Self {
        IntegratorCell {
            x: initial,
            ..Default::default()
        }
    }

    pub fn reset(&mut self, initial: f64) {
        self.x = initial;
        self.xdot = 0.0;
        self.x0 = 0.0;
        self.k1 = 0.0;
        self.k2 = 0.0;
        self.k3 = 0.0;
        self.k4 = 0.0;
    }

    /// Advance `x` for the current pass using the method selected by `tick`.
    /// Mirrors `state.py`'s `_propagate_*` family exactly.
    pub fn propagate(&mut self, tick: &Tick) {
        match tick.method {
            SolverMethod::Euler => {
                if tick.kpass == 0 {
                    self.x += tick.dt * self.xdot;
                }
            }
            SolverMethod::Rk2 => match tick.kpass {
                0 => {
                    self.x0 = self.x;
                    self.k1 = self.xdot;
                    self.x = self.x0 + tick.dt / 2.0 * self.k1;
                }
                1 => {
                    self.k2 = self.xdot;
                    self.x = self.x0 + tick.dt * self.k2;
                }
                _ => unreachable!("RK2 has only 2 passes"),
            },
            SolverMethod::Rk4 => match tick.kpass {
                0 => {
                    self.x0 = self.x;
                    self.k1 = self.xdot;
                    self.x = self.x0 + tick.dt / 2.0 * self.k1;
                }
                1 => {
                    self.k2 = self.xdot;
                    self.x = self.x0 + tick.dt / 2.0 * self.k2;
                }
                2 => {
                    self.k3 = self.xdot;
                    self.x = self.x0 + tick.dt * self.k3;
                }
                3 => {
                    self.k4 = self.xdot;
                    self.x = self.x0
                        + tick.dt / 6.0 * (self.k1 + 2.0 * self.k2 + 2.0 * self.k3 + self.k4);
                }
                _ => unreachable!("RK4 has only 4 passes"),
            },
            SolverMethod::Merson => match tick.kpass {
                0 => {
                    self.x0 = self.x;
                    self.k1 = self.xdot;
                    self.x = self.x0 + tick.dt / 3.0 * self.k1;
                }
                1 => {
                    self.k2 = self.xdot;
                    self.x = self.x0 + tick.dt / 6.0 * (self.k1 + self.k2);
                }
                2 => {
                    self.k3 = self.xdot;
                    self.x = self.x0 + tick.dt / 8.0 * (self.k1 + 3.0 * self.k3);
                }
                3 => {
                    self.k4 = self.xdot;
                    self.x = self.x0 + tick.dt / 2.0 * (self.k1 - 3.0 * self.k3 + 4.0 * self.k4);
                }
                4 => {
                    let k5 = self.xdot;
                    self.x = self.x0 + tick.dt / 6.0 * (self.k1 + 4.0 * self.k4 + k5);
                }
                _ => unreachable!("Merson has only 5 passes"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// xdot == 1 under Euler over N steps of size h must give x(N*h) = x0 + N*h exactly.
    #[test]
    fn euler_linear_growth_is_exact() {
        let mut tick = Tick::new(SolverMethod::Euler, 0.1);
        let mut cell = IntegratorCell::new(0.0);
        for _ in 0..10 {
            cell.xdot = 1.0;
            cell.propagate(&tick);
            tick.advance();
        }
        assert_relative_eq!(cell.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rk4_linear_growth_matches_within_machine_epsilon() {
        let mut tick = Tick::new(SolverMethod::Rk4, 0.1);
        let mut cell = IntegratorCell::new(0.0);
        for _ in 0..10 {
            for _ in 0..tick.method.passes() {
                cell.xdot = 1.0;
                cell.propagate(&tick);
                tick.advance();
            }
        }
        assert_relative_eq!(cell.x, 1.0, epsilon = 1e-9);
    }
}
