use approx::assert_relative_eq;
use serde_json::json;
use simbus_compiler::{compile, BlockDef, ConnectionDef, ModelDef};
use simbus_runtime::{Kernel, SimConfig};
use simbus_types::SimError;
use simbus_types::SolverMethod;

fn block(id: &str, kind: &str, params: serde_json::Value) -> BlockDef {
    BlockDef {
        id: id.to_string(),
        kind: kind.to_string(),
        params: params.as_object().cloned().unwrap_or_default(),
        subsystem: None,
    }
}

fn conn(from: &str, to: &str) -> ConnectionDef {
    ConnectionDef {
        from_block: from.into(),
        from_port: 0,
        to_block: to.into(),
        to_port: 0,
    }
}

#[test]
fn constant_into_scope_holds_its_value_under_rk4() {
    let model = ModelDef {
        blocks: vec![
            block("c", "constant", json!({"value": 4.25})),
            block("s", "scope", json!({"num_inputs": 1})),
        ],
        connections: vec![conn("c", "s")],
    };
    let compiled = compile(model).expect("compiles");
    let config = SimConfig {
        solver: SolverMethod::Rk4,
        start_time: 0.0,
        stop_time: 1.0,
        step_size: 0.1,
    };
    let mut kernel = Kernel::new(compiled, &config);
    kernel.run(|| false).expect("runs");
    let trace = &kernel.traces["s:0"];
    for &v in &trace.values {
        assert_relative_eq!(v, 4.25, epsilon = 1e-12);
    }
}

#[test]
fn step_into_integrator_ramps_after_step_time_under_euler() {
    let model = ModelDef {
        blocks: vec![
            block(
                "step",
                "step",
                json!({"step_time": 0.5, "initial_value": 0.0, "final_value": 2.0}),
            ),
            block(
                "integ",
                "integrator",
                json!({"gain": 1.0, "initial_value": 0.0}),
            ),
            block("s", "scope", json!({"num_inputs": 1})),
        ],
        connections: vec![conn("step", "integ"), conn("integ", "s")],
    };
    let compiled = compile(model).expect("compiles");
    let config = SimConfig {
        solver: SolverMethod::Euler,
        start_time: 0.0,
        stop_time: 1.0,
        step_size: 0.01,
    };
    let mut kernel = Kernel::new(compiled, &config);
    kernel.run(|| false).expect("runs");
    let trace = &kernel.traces["integ:0"];
    let last = *trace.values.last().unwrap();
    // integral of the step from 0.5..1.0 at rate 2.0 is ~= 1.0
    assert_relative_eq!(last, 1.0, epsilon = 1e-2);
}

#[test]
fn three_cascaded_gains_form_an_algebraic_loop() {
    let model = ModelDef {
        blocks: vec![
            block("g1", "gain", json!({"gain": 1.0})),
            block("g2", "gain", json!({"gain": 1.0})),
            block("g3", "gain", json!({"gain": 1.0})),
        ],
        connections: vec![conn("g1", "g2"), conn("g2", "g3"), conn("g3", "g1")],
    };
    match compile(model) {
        Err(SimError::AlgebraicLoop { cycle }) => assert!(cycle.len() >= 3),
        other => panic!("expected an algebraic loop, got {other:?}"),
    }
}

#[test]
fn sine_wave_matches_known_sample_points() {
    let model = ModelDef {
        blocks: vec![
            block(
                "sine",
                "sine_wave",
                json!({"amplitude": 1.0, "frequency": 1.0, "phase": 0.0, "bias": 0.0}),
            ),
            block("s", "scope", json!({"num_inputs": 1})),
        ],
        connections: vec![conn("sine", "s")],
    };
    let compiled = compile(model).expect("compiles");
    let config = SimConfig {
        solver: SolverMethod::Euler,
        start_time: 0.0,
        stop_time: 0.5,
        step_size: 0.25,
    };
    let mut kernel = Kernel::new(compiled, &config);
    kernel.run(|| false).expect("runs");
    let trace = &kernel.traces["sine:0"];
    assert_relative_eq!(trace.values[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(
        trace.values[1],
        (2.0 * std::f64::consts::PI * 0.25).sin(),
        epsilon = 1e-9
    );
}

#[test]
fn subsystem_equivalence_is_bit_identical() {
    let flat_model = ModelDef {
        blocks: vec![
            block("c", "constant", json!({"value": 2.0})),
            block("gain", "gain", json!({"gain": 3.0})),
            block("s", "scope", json!({"num_inputs": 1})),
        ],
        connections: vec![conn("c", "gain"), conn("gain", "s")],
    };

    let inner = ModelDef {
        blocks: vec![
            {
                let mut b = block("in", "inport", json!({}));
                b.params.insert("port".into(), json!(0));
                b
            },
            block("gain", "gain", json!({"gain": 3.0})),
            {
                let mut b = block("out", "outport", json!({}));
                b.params.insert("port".into(), json!(0));
                b
            },
        ],
        connections: vec![conn("in", "gain"), conn("gain", "out")],
    };
    let nested_model = ModelDef {
        blocks: vec![
            block("c", "constant", json!({"value": 2.0})),
            BlockDef {
                id: "sub".into(),
                kind: "subsystem".into(),
                params: Default::default(),
                subsystem: Some(Box::new(inner)),
            },
            block("s", "scope", json!({"num_inputs": 1})),
        ],
        connections: vec![conn("c", "sub"), conn("sub", "s")],
    };

    let config = SimConfig {
        solver: SolverMethod::Rk4,
        start_time: 0.0,
        stop_time: 1.0,
        step_size: 0.1,
    };

    let mut flat_kernel = Kernel::new(compile(flat_model).expect("flat compiles"), &config);
    flat_kernel.run(|| false).expect("flat runs");

    let mut nested_kernel = Kernel::new(compile(nested_model).expect("nested compiles"), &config);
    nested_kernel.run(|| false).expect("nested runs");

    assert_eq!(flat_kernel.traces["s:0"].values, nested_kernel.traces["s:0"].values);
}
