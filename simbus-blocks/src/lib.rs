pub mod block;
pub mod cell;
pub mod params;

pub mod blocks {
    pub mod continuous;
    pub mod discrete;
    pub mod math_ops;
    pub mod nonlinear;
    pub mod observers;
    pub mod signal_processing;
    pub mod sinks;
    pub mod sources;
    pub mod subsystem;
}

pub use block::{is_state_holding, Block, STATE_HOLDING_BLOCKS};
pub use cell::IntegratorCell;
pub use params::ParamMap;
