//! Core types shared by the simbus workspace: block/port identifiers, the
//! fixed-step numerical `Tick`, the solver method enum and the error type
//! the rest of the crates propagate with `?`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier for a block instance within a (possibly flattened) model.
///
/// Flattened subsystem children get namespaced ids of the form
/// `"{subsystem_id}::{child_id}"`, so this is just an owned string rather
/// than an interned/numeric handle.
pub type BlockId = String;

/// A single input or output port on a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortIndex(pub usize);

impl fmt::Display for PortIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-step integration method. Each variant names how many derivative
/// passes `IntegratorCell::propagate` needs per macro-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SolverMethod {
    Euler,
    Rk2,
    Rk4,
    Merson,
}

impl SolverMethod {
    pub fn passes(self) -> u32 {
        match self {
            SolverMethod::Euler => 1,
            SolverMethod::Rk2 => 2,
            SolverMethod::Rk4 => 4,
            SolverMethod::Merson => 5,
        }
    }
}

impl Default for SolverMethod {
    fn default() -> Self {
        SolverMethod::Rk4
    }
}

/// The per-kernel clock driving a simulation. Scoped to one `Kernel`/`Runner`
/// instance rather than a process-wide global, so that more than one
/// simulation can run concurrently in the same process — a deliberate
/// deviation from the Python original's class-level `State` attributes.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub t: f64,
    /// The active step used by the integrator on the *current* pass. Varies
    /// within a macro-step for multi-pass methods; see `advance()`.
    pub dt: f64,
    /// The primary (macro-step) time step, fixed for the whole run.
    pub dtp: f64,
    pub kpass: u32,
    pub ready: bool,
    pub method: SolverMethod,
    pub eps: f64,
}

impl Tick {
    pub const DEFAULT_EPS: f64 = 1e-9;

    pub fn new(method: SolverMethod, dtp: f64) -> Self {
        Tick {
            t: 0.0,
            dt: dtp,
            dtp,
            kpass: 0,
            ready: true,
            method,
            eps: Self::DEFAULT_EPS,
        }
    }

    /// Equivalent of `Sim.clock.reset(dt)` at the start of a run.
    pub fn reset(&mut self, dtp: f64) {
        self.dtp = dtp;
        self.dt = dtp;
        self.kpass = 0;
        self.ready = true;
    }

    /// Force `ready` once the macro-step time reaches `tmax`, so the final
    /// partial step of a run is still reported even if its passes haven't
    /// naturally wrapped back to `ready`.
    pub fn sample(&mut self, tmax: f64) {
        if self.t >= tmax - self.eps {
            self.ready = true;
        }
    }

    /// Advance the pass counter (and, once a macro-step completes, `t`
    /// itself). Mirrors `state.py::updateclock` exactly, including the fact
    /// that `t` does not take on intermediate values between passes of a
    /// multi-pass method — only `dt` does.
    pub fn advance(&mut self) {
        let max_pass = self.method.passes();
        self.kpass += 1;

        if self.kpass >= max_pass {
            self.kpass = 0;
            self.t += self.dtp;
            self.ready = true;
        } else {
            self.ready = false;
            self.dt = match self.method {
                SolverMethod::Rk2 => {
                    if self.kpass == 0 {
                        self.dtp / 2.0
                    } else {
                        self.dtp
                    }
                }
                SolverMethod::Rk4 => {
                    if self.kpass == 0 || self.kpass == 1 {
                        self.dtp / 2.0
                    } else {
                        self.dtp
                    }
                }
                SolverMethod::Merson => self.dtp,
                SolverMethod::Euler => self.dtp,
            };
        }
    }
}

/// Errors surfaced by compilation and simulation, matching spec.md's
/// Error Handling Design one-for-one.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("model has no blocks")]
    EmptyModel,

    #[error("algebraic loop detected: {}", cycle.join(" -> "))]
    AlgebraicLoop { cycle: Vec<BlockId> },

    #[error("unknown block variant '{kind}'")]
    UnknownBlockVariant { kind: String },

    #[error("bad parameters for block '{block}': {reason}")]
    BadParameters { block: BlockId, reason: String },

    #[error("domain error in block '{block}': {reason}")]
    DomainError { block: BlockId, reason: String },

    #[error("internal compiler error: {0}")]
    InternalCompile(String),

    #[error("runtime failure: {0}")]
    RuntimeFailure(String),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn euler_single_pass_advances_immediately() {
        let mut tick = Tick::new(SolverMethod::Euler, 0.1);
        tick.advance();
        assert_eq!(tick.kpass, 0);
        assert!(tick.ready);
        assert_relative_eq!(tick.t, 0.1);
    }

    #[test]
    fn rk4_holds_t_across_intra_step_passes() {
        let mut tick = Tick::new(SolverMethod::Rk4, 0.1);
        tick.advance(); // kpass 0 -> 1
        assert_eq!(tick.kpass, 1);
        assert!(!tick.ready);
        assert_relative_eq!(tick.t, 0.0);
        assert_relative_eq!(tick.dt, 0.05);

        tick.advance(); // kpass 1 -> 2
        assert_relative_eq!(tick.t, 0.0);
        assert_relative_eq!(tick.dt, 0.1);

        tick.advance(); // kpass 2 -> 3
        assert_relative_eq!(tick.t, 0.0);
        assert_relative_eq!(tick.dt, 0.1);

        tick.advance(); // kpass 3 -> wraps, t advances
        assert_eq!(tick.kpass, 0);
        assert!(tick.ready);
        assert_relative_eq!(tick.t, 0.1);
    }
}
