use serde::{Deserialize, Serialize};
use simbus_types::SolverMethod;

/// Run configuration for a single simulation, a direct translation of
/// `models/simulation.py`'s `SimulationConfig` Pydantic model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    #[serde(default)]
    pub solver: SolverMethod,
    #[serde(default)]
    pub start_time: f64,
    pub stop_time: f64,
    pub step_size: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            solver: SolverMethod::default(),
            start_time: 0.0,
            stop_time: 10.0,
            step_size: 0.01,
        }
    }
}
