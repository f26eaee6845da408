use crate::config::SimConfig;
use simbus_compiler::CompiledModel;
use simbus_types::{SimError, Tick};
use std::collections::HashMap;

/// One signal's recorded samples, keyed `"{block_id}:{port}"` to match
/// `runner.py`'s `_record_outputs` convention.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SignalTrace {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// The single in-process stage driver. Grounded on
/// `original_source/backend/src/osk/sim.py`'s `Sim.run`, collapsed to the
/// single stage this workspace's scope covers (no multi-rate execution).
pub struct Kernel {
    pub compiled: CompiledModel,
    pub tick: Tick,
    tmax: f64,
    scratch: Vec<f64>,
    pub traces: HashMap<String, SignalTrace>,
    started: bool,
}

impl Kernel {
    pub fn new(compiled: CompiledModel, config: &SimConfig) -> Self {
        let mut tick = Tick::new(config.solver, config.step_size);
        tick.t = config.start_time;
        Kernel {
            compiled,
            tick,
            tmax: config.stop_time,
            scratch: Vec::new(),
            traces: HashMap::new(),
            started: false,
        }
    }

    fn ensure_started(&mut self) {
        if self.started {
            return;
        }
        self.tick.reset(self.tick.dtp);
        for idx in &self.compiled.execution_order {
            self.compiled.blocks[*idx].init();
        }
        self.started = true;
    }

    /// Runs exactly one pass: one `update` over every block, a `report` +
    /// output record if this pass completes a macro-step, then `propagate`
    /// and `advance`. Returns `true` once the run has reached `tmax`.
    pub fn step_pass(&mut self, stop_requested: bool) -> bool {
        self.ensure_started();
        self.tick.sample(self.tmax);

        let order = self.compiled.execution_order.clone();
        for idx in order {
            self.compiled.gather_inputs(idx, &mut self.scratch);
            self.compiled.blocks[idx].update(&self.scratch, &self.tick);
        }

        let mut finished = false;
        if self.tick.ready {
            for &idx in &self.compiled.execution_order {
                self.compiled.blocks[idx].report(&self.tick);
            }
            self.record_outputs();
            finished = stop_requested || self.tick.t + self.tick.eps >= self.tmax;
        }

        if !finished {
            for &idx in &self.compiled.execution_order {
                self.compiled.blocks[idx].propagate(&self.tick);
            }
            self.tick.advance();
        }
        finished
    }

    /// Runs the kernel to completion, calling `should_stop` between
    /// macro-steps so a caller (the `Runner`) can request an early stop.
    pub fn run(&mut self, mut should_stop: impl FnMut() -> bool) -> Result<(), SimError> {
        loop {
            let stop_requested = should_stop();
            if self.step_pass(stop_requested) {
                return Ok(());
            }
        }
    }

    pub fn progress(&self) -> f64 {
        if self.tmax <= 0.0 {
            1.0
        } else {
            (self.tick.t / self.tmax).clamp(0.0, 1.0)
        }
    }

    fn record_outputs(&mut self) {
        for (i, id) in self.compiled.ids.iter().enumerate() {
            let block = &self.compiled.blocks[i];
            for port in 0..block.num_outputs() {
                let key = format!("{id}:{port}");
                let trace = self.traces.entry(key).or_default();
                trace.times.push(self.tick.t);
                trace.values.push(block.get_output(port));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;
    use simbus_compiler::{compile, BlockDef, ConnectionDef, ModelDef};
    use simbus_types::SolverMethod;

    fn block(id: &str, kind: &str, params: serde_json::Value) -> BlockDef {
        BlockDef {
            id: id.to_string(),
            kind: kind.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
            subsystem: None,
        }
    }

    /// `x' = 1 - x` via `Sum(+,-)` feeding `Integrator`, feedback closing
    /// through the integrator's own output. Matches spec.md §8's feedback
    /// loop scenario, expected `x(5) ~= 0.9932621`.
    #[test]
    fn feedback_loop_matches_known_closed_form() {
        let model = ModelDef {
            blocks: vec![
                block("one", "constant", json!({"value": 1.0})),
                block("sum", "sum", json!({"signs": "+-"})),
                block(
                    "integ",
                    "integrator",
                    json!({"gain": 1.0, "initial_value": 0.0}),
                ),
            ],
            connections: vec![
                ConnectionDef {
                    from_block: "one".into(),
                    from_port: 0,
                    to_block: "sum".into(),
                    to_port: 0,
                },
                ConnectionDef {
                    from_block: "integ".into(),
                    from_port: 0,
                    to_block: "sum".into(),
                    to_port: 1,
                },
                ConnectionDef {
                    from_block: "sum".into(),
                    from_port: 0,
                    to_block: "integ".into(),
                    to_port: 0,
                },
            ],
        };
        let compiled = compile(model).expect("model compiles");
        let config = SimConfig {
            solver: SolverMethod::Rk4,
            start_time: 0.0,
            stop_time: 5.0,
            step_size: 0.01,
        };
        let mut kernel = Kernel::new(compiled, &config);
        kernel.run(|| false).expect("run completes");

        let trace = &kernel.traces["integ:0"];
        let last = *trace.values.last().expect("at least one sample");
        assert_relative_eq!(last, 0.9932621, epsilon = 1e-5);
    }
}
