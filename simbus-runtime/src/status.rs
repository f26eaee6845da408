use serde::{Deserialize, Serialize};

/// Mirrors `models/simulation.py`'s `SimulationStatus` enum one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    Idle,
    Compiling,
    Running,
    Paused,
    Completed,
    Error,
}
