use crate::blocks::continuous::{Derivative, Integrator, PidController, StateSpace, TransferFunction};
use crate::blocks::discrete::{
    DiscreteDerivative, DiscreteIntegrator, DiscreteTransferFunction, UnitDelay, ZeroOrderHold,
};
use crate::blocks::math_ops::{
    Abs, Aggregate, Comparison, DeadZone, Demux, Gain, MathFunction, Mux, Product, Saturation,
    Sign, Sum, Switch, Trigonometry,
};
use crate::blocks::nonlinear::{
    Coulomb, LookupTable1D, LookupTable2D, Quantizer, Relay, VariableTransportDelay,
};
use crate::blocks::observers::{ExtendedKalmanFilter, KalmanFilter, LuenbergerObserver};
use crate::blocks::signal_processing::{
    AnalogFilter, BandPassFilter, Backlash, HighPassFilter, LowPassFilter, MovingAverage,
    NotchFilter, RateLimiter,
};
use crate::blocks::sinks::{Display, Scope, Terminator, ToWorkspace};
use crate::blocks::sources::{Clock, Constant, PulseGenerator, Ramp, SineWave, Step, UniformNoise, WhiteNoise};
use crate::blocks::subsystem::{Inport, Outport, Subsystem};
use crate::params::ParamMap;
use simbus_types::{BlockId, SimError, Tick};

/// String tags for every block whose output depends on state carried across
/// ticks rather than being purely a function of the current inputs. The
/// compiler schedules these specially: they may read a stale upstream value
/// on the pass an algebraic cycle would otherwise require, because their own
/// current-pass output comes from a cell, not from this pass's inputs.
pub const STATE_HOLDING_BLOCKS: &[&str] = &[
    "integrator",
    "discrete_integrator",
    "unit_delay",
    "transfer_function",
    "discrete_transfer_function",
    "state_space",
    "derivative",
    "discrete_derivative",
    "pid_controller",
    "zero_order_hold",
    "variable_transport_delay",
    "luenberger_observer",
    "kalman_filter",
    "extended_kalman_filter",
    "moving_average",
    "low_pass_filter",
    "high_pass_filter",
    "band_pass_filter",
    "rate_limiter",
    "backlash",
];

// `analog_filter` and `notch_filter` are deliberately absent above even
// though both carry genuine biquad recursion state: this list is copied
// verbatim from spec.md §4.4, which omits them, so an algebraic loop closed
// through one of these two is still flagged rather than scheduled — the same
// kind of asymmetry as `LookupTable1D`/`LookupTable2D`'s differing
// out-of-range behavior (see `blocks/nonlinear.rs`).

pub fn is_state_holding(kind: &str) -> bool {
    STATE_HOLDING_BLOCKS.contains(&kind)
}

/// The runtime representation of every block variant this library supports.
/// A tagged union rather than trait objects: the compiler and kernel need a
/// homogeneous, owned list they can build from a dynamic model description,
/// and match dispatch avoids a vtable indirection per tick on the hot path.
#[derive(Debug)]
pub enum Block {
    Constant(Constant),
    Step(Step),
    Ramp(Ramp),
    SineWave(SineWave),
    Clock(Clock),
    PulseGenerator(PulseGenerator),
    WhiteNoise(WhiteNoise),
    UniformNoise(UniformNoise),

    Scope(Scope),
    ToWorkspace(ToWorkspace),
    Display(Display),
    Terminator(Terminator),

    Sum(Sum),
    Gain(Gain),
    Product(Product),
    Abs(Abs),
    Sign(Sign),
    Saturation(Saturation),
    DeadZone(DeadZone),
    MathFunction(MathFunction),
    Trigonometry(Trigonometry),
    Switch(Switch),
    Comparison(Comparison),
    Aggregate(Aggregate),
    Mux(Mux),
    Demux(Demux),

    Integrator(Integrator),
    Derivative(Derivative),
    TransferFunction(TransferFunction),
    StateSpace(StateSpace),
    PidController(PidController),

    UnitDelay(UnitDelay),
    ZeroOrderHold(ZeroOrderHold),
    DiscreteIntegrator(DiscreteIntegrator),
    DiscreteDerivative(DiscreteDerivative),
    DiscreteTransferFunction(DiscreteTransferFunction),

    RateLimiter(RateLimiter),
    MovingAverage(MovingAverage),
    LowPassFilter(LowPassFilter),
    HighPassFilter(HighPassFilter),
    BandPassFilter(BandPassFilter),
    AnalogFilter(AnalogFilter),
    NotchFilter(NotchFilter),
    Backlash(Backlash),

    LookupTable1D(LookupTable1D),
    LookupTable2D(LookupTable2D),
    Quantizer(Quantizer),
    Relay(Relay),
    Coulomb(Coulomb),
    VariableTransportDelay(VariableTransportDelay),

    LuenbergerObserver(LuenbergerObserver),
    KalmanFilter(KalmanFilter),
    ExtendedKalmanFilter(ExtendedKalmanFilter),

    Inport(Inport),
    Outport(Outport),
    Subsystem(Subsystem),
}

impl Block {
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Constant(_) => "constant",
            Block::Step(_) => "step",
            Block::Ramp(_) => "ramp",
            Block::SineWave(_) => "sine_wave",
            Block::Clock(_) => "clock",
            Block::PulseGenerator(_) => "pulse_generator",
            Block::WhiteNoise(_) => "white_noise",
            Block::UniformNoise(_) => "uniform_noise",
            Block::Scope(_) => "scope",
            Block::ToWorkspace(_) => "to_workspace",
            Block::Display(_) => "display",
            Block::Terminator(_) => "terminator",
            Block::Sum(_) => "sum",
            Block::Gain(_) => "gain",
            Block::Product(_) => "product",
            Block::Abs(_) => "abs",
            Block::Sign(_) => "sign",
            Block::Saturation(_) => "saturation",
            Block::DeadZone(_) => "dead_zone",
            Block::MathFunction(_) => "math_function",
            Block::Trigonometry(_) => "trigonometry",
            Block::Switch(_) => "switch",
            Block::Comparison(_) => "comparison",
            Block::Aggregate(_) => "aggregate",
            Block::Mux(_) => "mux",
            Block::Demux(_) => "demux",
            Block::Integrator(_) => "integrator",
            Block::Derivative(_) => "derivative",
            Block::TransferFunction(_) => "transfer_function",
            Block::StateSpace(_) => "state_space",
            Block::PidController(_) => "pid_controller",
            Block::UnitDelay(_) => "unit_delay",
            Block::ZeroOrderHold(_) => "zero_order_hold",
            Block::DiscreteIntegrator(_) => "discrete_integrator",
            Block::DiscreteDerivative(_) => "discrete_derivative",
            Block::DiscreteTransferFunction(_) => "discrete_transfer_function",
            Block::RateLimiter(_) => "rate_limiter",
            Block::MovingAverage(_) => "moving_average",
            Block::LowPassFilter(_) => "low_pass_filter",
            Block::HighPassFilter(_) => "high_pass_filter",
            Block::BandPassFilter(_) => "band_pass_filter",
            Block::AnalogFilter(_) => "analog_filter",
            Block::NotchFilter(_) => "notch_filter",
            Block::Backlash(_) => "backlash",
            Block::LookupTable1D(_) => "lookup_table_1d",
            Block::LookupTable2D(_) => "lookup_table_2d",
            Block::Quantizer(_) => "quantizer",
            Block::Relay(_) => "relay",
            Block::Coulomb(_) => "coulomb",
            Block::VariableTransportDelay(_) => "variable_transport_delay",
            Block::LuenbergerObserver(_) => "luenberger_observer",
            Block::KalmanFilter(_) => "kalman_filter",
            Block::ExtendedKalmanFilter(_) => "extended_kalman_filter",
            Block::Inport(_) => "inport",
            Block::Outport(_) => "outport",
            Block::Subsystem(_) => "subsystem",
        }
    }

    pub fn is_state_holding(&self) -> bool {
        is_state_holding(self.kind())
    }

    /// How many output ports this block exposes. Every variant defaults to
    /// one; the few with a genuine vector output (a multi-input scope, or a
    /// state estimator reporting one port per state) override it.
    pub fn num_outputs(&self) -> usize {
        match self {
            Block::Scope(b) => b.num_inputs(),
            Block::LuenbergerObserver(b) => b.num_states(),
            Block::KalmanFilter(b) => b.num_states(),
            Block::ExtendedKalmanFilter(_) => 1,
            Block::Demux(b) => b.num_outputs,
            _ => 1,
        }
    }

    pub fn init(&mut self) {
        match self {
            Block::Constant(b) => b.init(),
            Block::Step(b) => b.init(),
            Block::Ramp(b) => b.init(),
            Block::SineWave(b) => b.init(),
            Block::Clock(b) => b.init(),
            Block::PulseGenerator(b) => b.init(),
            Block::WhiteNoise(b) => b.init(),
            Block::UniformNoise(b) => b.init(),
            Block::Scope(b) => b.init(),
            Block::ToWorkspace(b) => b.init(),
            Block::UnitDelay(b) => b.init(),
            Block::ZeroOrderHold(b) => b.init(),
            Block::DiscreteIntegrator(b) => b.init(),
            Block::DiscreteDerivative(b) => b.init(),
            Block::DiscreteTransferFunction(b) => b.init(),
            Block::MovingAverage(b) => b.init(),
            Block::AnalogFilter(b) => b.init(),
            Block::NotchFilter(b) => b.init(),
            Block::VariableTransportDelay(b) => b.init(),
            Block::KalmanFilter(b) => b.init(),
            Block::ExtendedKalmanFilter(b) => b.init(),
            _ => {}
        }
    }

    pub fn update(&mut self, inputs: &[f64], tick: &Tick) {
        match self {
            Block::Constant(b) => b.update(tick),
            Block::Step(b) => b.update(tick),
            Block::Ramp(b) => b.update(tick),
            Block::SineWave(b) => b.update(tick),
            Block::Clock(b) => b.update(tick),
            Block::PulseGenerator(b) => b.update(tick),
            Block::WhiteNoise(b) => b.update(tick),
            Block::UniformNoise(b) => b.update(tick),

            Block::Scope(b) => b.update(inputs),
            Block::ToWorkspace(b) => b.update(inputs),
            Block::Display(b) => b.update(inputs),
            Block::Terminator(b) => b.update(inputs),

            Block::Sum(b) => b.update(inputs),
            Block::Gain(b) => b.update(inputs),
            Block::Product(b) => b.update(inputs),
            Block::Abs(b) => b.update(inputs),
            Block::Sign(b) => b.update(inputs),
            Block::Saturation(b) => b.update(inputs),
            Block::DeadZone(b) => b.update(inputs),
            Block::MathFunction(b) => b.update(inputs),
            Block::Trigonometry(b) => b.update(inputs),
            Block::Switch(b) => b.update(inputs),
            Block::Comparison(b) => b.update(inputs),
            Block::Aggregate(b) => b.update(inputs),
            Block::Mux(b) => b.update(inputs),
            Block::Demux(b) => b.update(inputs),

            Block::Integrator(b) => b.update(inputs),
            Block::Derivative(b) => b.update(inputs),
            Block::TransferFunction(b) => b.update(inputs),
            Block::StateSpace(b) => b.update(inputs),
            Block::PidController(b) => b.update(inputs),

            Block::UnitDelay(b) => b.update(inputs, tick),
            Block::ZeroOrderHold(b) => b.update(inputs, tick),
            Block::DiscreteIntegrator(b) => b.update(inputs, tick),
            Block::DiscreteDerivative(b) => b.update(inputs, tick),
            Block::DiscreteTransferFunction(b) => b.update(inputs, tick),

            Block::RateLimiter(b) => b.update(inputs, tick),
            Block::MovingAverage(b) => b.update(inputs, tick),
            Block::LowPassFilter(b) => b.update(inputs),
            Block::HighPassFilter(b) => b.update(inputs),
            Block::BandPassFilter(b) => b.update(inputs),
            Block::AnalogFilter(b) => b.update(inputs, tick),
            Block::NotchFilter(b) => b.update(inputs, tick),
            Block::Backlash(b) => b.update(inputs),

            Block::LookupTable1D(b) => b.update(inputs),
            Block::LookupTable2D(b) => b.update(inputs),
            Block::Quantizer(b) => b.update(inputs),
            Block::Relay(b) => b.update(inputs),
            Block::Coulomb(b) => b.update(inputs),
            Block::VariableTransportDelay(b) => b.update(inputs, tick),

            Block::LuenbergerObserver(b) => b.update(inputs),
            Block::KalmanFilter(b) => b.update(inputs, tick),
            Block::ExtendedKalmanFilter(b) => b.update(inputs, tick),

            Block::Inport(_) | Block::Outport(_) | Block::Subsystem(_) => {}
        }
    }

    pub fn report(&mut self, tick: &Tick) {
        match self {
            Block::Scope(b) => b.report(tick),
            Block::ToWorkspace(b) => b.report(tick),
            Block::Display(b) => b.report(tick),
            _ => {}
        }
    }

    pub fn propagate(&mut self, tick: &Tick) {
        match self {
            Block::Integrator(b) => b.propagate(tick),
            Block::Derivative(b) => b.propagate(tick),
            Block::TransferFunction(b) => b.propagate(tick),
            Block::StateSpace(b) => b.propagate(tick),
            Block::PidController(b) => b.propagate(tick),
            Block::LowPassFilter(b) => b.propagate(tick),
            Block::HighPassFilter(b) => b.propagate(tick),
            Block::BandPassFilter(b) => b.propagate(tick),
            Block::LuenbergerObserver(b) => b.propagate(tick),
            _ => {}
        }
    }

    pub fn get_output(&self, port: usize) -> f64 {
        match self {
            Block::Constant(b) => b.get_output(),
            Block::Step(b) => b.get_output(),
            Block::Ramp(b) => b.get_output(),
            Block::SineWave(b) => b.get_output(),
            Block::Clock(b) => b.get_output(),
            Block::PulseGenerator(b) => b.get_output(),
            Block::WhiteNoise(b) => b.get_output(),
            Block::UniformNoise(b) => b.get_output(),

            Block::Scope(b) => b.get_output(port),
            Block::ToWorkspace(b) => b.get_output(port),
            Block::Display(b) => b.get_output(port),
            Block::Terminator(b) => b.get_output(port),

            Block::Sum(b) => b.get_output(),
            Block::Gain(b) => b.get_output(),
            Block::Product(b) => b.get_output(),
            Block::Abs(b) => b.get_output(),
            Block::Sign(b) => b.get_output(),
            Block::Saturation(b) => b.get_output(),
            Block::DeadZone(b) => b.get_output(),
            Block::MathFunction(b) => b.get_output(),
            Block::Trigonometry(b) => b.get_output(),
            Block::Switch(b) => b.get_output(),
            Block::Comparison(b) => b.get_output(),
            Block::Aggregate(b) => b.get_output(),
            Block::Mux(b) => b.get_output(),
            Block::Demux(b) => b.get_output(port),

            Block::Integrator(b) => b.get_output(),
            Block::Derivative(b) => b.get_output(),
            Block::TransferFunction(b) => b.get_output(),
            Block::StateSpace(b) => b.get_output(),
            Block::PidController(b) => b.get_output(),

            Block::UnitDelay(b) => b.get_output(),
            Block::ZeroOrderHold(b) => b.get_output(),
            Block::DiscreteIntegrator(b) => b.get_output(),
            Block::DiscreteDerivative(b) => b.get_output(),
            Block::DiscreteTransferFunction(b) => b.get_output(),

            Block::RateLimiter(b) => b.get_output(),
            Block::MovingAverage(b) => b.get_output(),
            Block::LowPassFilter(b) => b.get_output(),
            Block::HighPassFilter(b) => b.get_output(),
            Block::BandPassFilter(b) => b.get_output(),
            Block::AnalogFilter(b) => b.get_output(),
            Block::NotchFilter(b) => b.get_output(),
            Block::Backlash(b) => b.get_output(),

            Block::LookupTable1D(b) => b.get_output(),
            Block::LookupTable2D(b) => b.get_output(),
            Block::Quantizer(b) => b.get_output(),
            Block::Relay(b) => b.get_output(),
            Block::Coulomb(b) => b.get_output(),
            Block::VariableTransportDelay(b) => b.get_output(),

            Block::LuenbergerObserver(b) => b.get_output(port),
            Block::KalmanFilter(b) => b.get_output(port),
            Block::ExtendedKalmanFilter(b) => b.get_output(port),

            Block::Inport(_) | Block::Outport(_) | Block::Subsystem(_) => 0.0,
        }
    }

    /// Builds a block from its string type tag and raw parameter bag. An
    /// unknown type tag or a malformed parameter is non-fatal: per spec.md
    /// §7 (`UnknownBlockVariant`/`BadParameters` recovery), this logs and
    /// substitutes a unity-gain pass-through rather than failing `compile()`,
    /// mirroring `osk_adapter.py::_create_osk_block`'s `Gain(gain=1.0)`
    /// fallback on an unmapped type and on a constructor exception.
    pub fn from_kind_and_params(
        block_id: &BlockId,
        kind: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Block, SimError> {
        match Self::try_from_kind_and_params(block_id, kind, params) {
            Ok(block) => Ok(block),
            Err(SimError::UnknownBlockVariant { kind }) => {
                log::warn!("block {block_id} has unknown kind {kind:?}, using pass-through");
                Ok(Block::Gain(Gain::new(1.0)))
            }
            Err(SimError::BadParameters { block, reason }) => {
                log::error!("block {block} has bad parameters ({reason}), using pass-through");
                Ok(Block::Gain(Gain::new(1.0)))
            }
            Err(other) => Err(other),
        }
    }

    fn try_from_kind_and_params(
        block_id: &BlockId,
        kind: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Block, SimError> {
        let p = ParamMap::new(block_id, params);
        Ok(match kind {
            "constant" => Block::Constant(Constant::new(p.f64("value", 0.0)?)),
            "step" => Block::Step(Step::new(
                p.f64("step_time", 1.0)?,
                p.f64("initial_value", 0.0)?,
                p.f64("final_value", 1.0)?,
            )),
            "ramp" => Block::Ramp(Ramp::new(
                p.f64("slope", 1.0)?,
                p.f64("start_time", 0.0)?,
                p.f64("initial_output", 0.0)?,
            )),
            "sine_wave" => Block::SineWave(SineWave::new(
                p.f64("amplitude", 1.0)?,
                p.f64("frequency", 1.0)?,
                p.f64("phase", 0.0)?,
                p.f64("bias", 0.0)?,
            )),
            "clock" => Block::Clock(Clock::new()),
            "pulse_generator" => Block::PulseGenerator(PulseGenerator::new(
                p.f64("amplitude", 1.0)?,
                p.f64("period", 1.0)?,
                p.f64("duty_cycle", 50.0)?,
                p.f64("phase_delay", 0.0)?,
            )),
            "white_noise" => Block::WhiteNoise(WhiteNoise::new(
                p.f64("mean", 0.0)?,
                p.f64("variance", 1.0)?,
                p.opt_u64("seed")?,
                p.f64("sample_time", 0.0)?,
            )),
            "uniform_noise" => Block::UniformNoise(UniformNoise::new(
                p.f64("minimum", 0.0)?,
                p.f64("maximum", 1.0)?,
                p.opt_u64("seed")?,
                p.f64("sample_time", 0.0)?,
            )),

            "scope" => Block::Scope(Scope::new(p.usize("num_inputs", 1)?)),
            "to_workspace" => {
                Block::ToWorkspace(ToWorkspace::new(p.str("variable_name", "signal")?))
            }
            "display" => Block::Display(Display::new()),
            "terminator" => Block::Terminator(Terminator::new()),

            "sum" => Block::Sum(Sum::new(block_id, &p.str("signs", "++")?)?),
            "gain" => Block::Gain(Gain::new(p.f64("gain", 1.0)?)),
            "product" => Block::Product(Product::new(block_id, &p.str("operations", "**")?)?),
            "abs" => Block::Abs(Abs::new()),
            "sign" => Block::Sign(Sign::new()),
            "saturation" => Block::Saturation(Saturation::new(
                p.f64("upper_limit", 1.0)?,
                p.f64("lower_limit", -1.0)?,
            )),
            "dead_zone" => Block::DeadZone(DeadZone::new(
                p.f64("start", -0.5)?,
                p.f64("end", 0.5)?,
            )),
            "math_function" => Block::MathFunction(MathFunction::new(
                block_id,
                &p.str("function", "exp")?,
                p.f64("exponent", 2.0)?,
            )?),
            "trigonometry" => Block::Trigonometry(Trigonometry::new(
                block_id,
                &p.str("function", "sin")?,
            )?),
            "switch" => Block::Switch(Switch::new(
                block_id,
                p.f64("threshold", 0.0)?,
                &p.str("criteria", "greater_or_equal")?,
            )?),
            "comparison" => Block::Comparison(Comparison::new(
                block_id,
                &p.str("criteria", "greater_than")?,
            )?),
            "aggregate" => Block::Aggregate(Aggregate::new(
                block_id,
                &p.str("method", "sum")?,
            )?),
            "mux" => Block::Mux(Mux::new(p.usize("num_inputs", 2)?)),
            "demux" => Block::Demux(Demux::new(p.usize("num_outputs", 2)?)),

            "integrator" => Block::Integrator(Integrator::new(
                p.f64("gain", 1.0)?,
                p.f64("initial_value", 0.0)?,
                p.f64("upper_limit", f64::INFINITY)?,
                p.f64("lower_limit", f64::NEG_INFINITY)?,
            )),
            "derivative" => Block::Derivative(Derivative::new(p.f64("n", 100.0)?)),
            "transfer_function" => Block::TransferFunction(TransferFunction::new(
                block_id,
                &p.vec_f64("numerator", &[1.0])?,
                &p.vec_f64("denominator", &[1.0, 1.0])?,
            )?),
            "state_space" => Block::StateSpace(StateSpace::new(
                block_id,
                p.matrix_f64("a", &[vec![0.0]])?,
                p.vec_f64("b", &[1.0])?,
                p.vec_f64("c", &[1.0])?,
                p.f64("d", 0.0)?,
                &p.vec_f64("initial_states", &[0.0])?,
            )?),
            "pid_controller" => Block::PidController(PidController::new(
                p.f64("kp", 1.0)?,
                p.f64("ki", 0.0)?,
                p.f64("kd", 0.0)?,
                p.f64("n", 100.0)?,
            )),

            "unit_delay" => Block::UnitDelay(UnitDelay::new(
                p.f64("sample_time", 0.01)?,
                p.f64("initial_output", 0.0)?,
            )),
            "zero_order_hold" => {
                Block::ZeroOrderHold(ZeroOrderHold::new(p.f64("sample_time", 0.01)?))
            }
            "discrete_integrator" => Block::DiscreteIntegrator(DiscreteIntegrator::new(
                block_id,
                p.f64("gain", 1.0)?,
                p.f64("sample_time", 0.01)?,
                &p.str("method", "trapezoidal")?,
                p.f64("initial_output", 0.0)?,
            )?),
            "discrete_derivative" => {
                Block::DiscreteDerivative(DiscreteDerivative::new(p.f64("sample_time", 0.01)?))
            }
            "discrete_transfer_function" => {
                Block::DiscreteTransferFunction(DiscreteTransferFunction::new(
                    block_id,
                    &p.vec_f64("numerator", &[1.0])?,
                    &p.vec_f64("denominator", &[1.0, 1.0])?,
                    p.f64("sample_time", 0.01)?,
                )?)
            }

            "rate_limiter" => Block::RateLimiter(RateLimiter::new(
                p.f64("rising_rate", 1.0)?,
                p.f64("falling_rate", -1.0)?,
                p.f64("initial_output", 0.0)?,
            )),
            "moving_average" => Block::MovingAverage(MovingAverage::new(
                p.usize("window_size", 10)?,
                p.f64("sample_time", 0.01)?,
            )),
            "low_pass_filter" => Block::LowPassFilter(LowPassFilter::new(
                p.f64("cutoff_freq", 1.0)?,
                p.f64("initial_output", 0.0)?,
            )),
            "high_pass_filter" => {
                Block::HighPassFilter(HighPassFilter::new(p.f64("cutoff_freq", 1.0)?))
            }
            "band_pass_filter" => Block::BandPassFilter(BandPassFilter::new(
                p.f64("low_cutoff", 0.1)?,
                p.f64("high_cutoff", 10.0)?,
            )),
            "analog_filter" => Block::AnalogFilter(AnalogFilter::new(
                block_id,
                &p.str("design", "butterworth")?,
                &p.str("response", "lowpass")?,
                p.usize("order", 2)?,
                p.f64("cutoff_freq", 10.0)?,
                p.f64("low_cutoff", 1.0)?,
                p.f64("high_cutoff", 10.0)?,
                p.f64("passband_ripple", 1.0)?,
                p.f64("stopband_atten", 40.0)?,
            )?),
            "notch_filter" => Block::NotchFilter(NotchFilter::new(
                p.f64("notch_freq", 60.0)?,
                p.f64("bandwidth", 2.0)?,
                p.f64("depth", 40.0)?,
            )),
            "backlash" => Block::Backlash(Backlash::new(
                p.f64("width", 1.0)?,
                p.f64("initial_output", 0.0)?,
            )),

            "lookup_table_1d" => Block::LookupTable1D(LookupTable1D::new(
                block_id,
                p.vec_f64("breakpoints", &[0.0, 1.0])?,
                p.vec_f64("table", &[0.0, 1.0])?,
            )?),
            "lookup_table_2d" => Block::LookupTable2D(LookupTable2D::new(
                block_id,
                p.vec_f64("row_breakpoints", &[0.0, 1.0])?,
                p.vec_f64("col_breakpoints", &[0.0, 1.0])?,
                p.matrix_f64("table", &[vec![0.0, 0.0], vec![0.0, 0.0]])?,
            )?),
            "quantizer" => Block::Quantizer(Quantizer::new(p.f64("step", 1.0)?)),
            "relay" => Block::Relay(Relay::new(
                p.f64("on_threshold", 1.0)?,
                p.f64("off_threshold", -1.0)?,
                p.f64("on_value", 1.0)?,
                p.f64("off_value", 0.0)?,
            )),
            "coulomb" => Block::Coulomb(Coulomb::new(
                p.f64("coulomb_gain", 1.0)?,
                p.f64("viscous_gain", 0.0)?,
                p.f64("break_away_velocity", 1e-3)?,
            )),
            "variable_transport_delay" => Block::VariableTransportDelay(
                VariableTransportDelay::new(p.f64("initial_output", 0.0)?),
            ),

            "luenberger_observer" => Block::LuenbergerObserver(LuenbergerObserver::new(
                block_id,
                p.matrix_f64("a", &[vec![0.0]])?,
                p.vec_f64("b", &[0.0])?,
                p.matrix_f64("c", &[vec![1.0]])?,
                p.vec_f64("l", &[0.0])?,
                &p.vec_f64("initial_states", &[0.0])?,
            )?),
            "kalman_filter" => Block::KalmanFilter(KalmanFilter::new(
                block_id,
                p.matrix_f64("a", &[vec![1.0]])?,
                p.vec_f64("b", &[0.0])?,
                p.matrix_f64("c", &[vec![1.0]])?,
                p.matrix_f64("q", &[vec![1e-4]])?,
                p.f64("r", 1e-2)?,
                p.vec_f64("initial_states", &[0.0])?,
                p.f64("sample_time", 0.01)?,
            )?),
            "extended_kalman_filter" => Block::ExtendedKalmanFilter(ExtendedKalmanFilter::new(
                p.f64("q", 1e-4)?,
                p.f64("r", 1e-2)?,
                p.f64("initial_state", 0.0)?,
                p.f64("sample_time", 0.01)?,
            )),

            "inport" => Block::Inport(Inport),
            "outport" => Block::Outport(Outport),
            "subsystem" => Block::Subsystem(Subsystem),

            other => {
                return Err(SimError::UnknownBlockVariant {
                    kind: other.to_string(),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_falls_back_to_unity_gain() {
        let id: BlockId = "mystery".into();
        let block = Block::from_kind_and_params(&id, "not_a_real_block", &Default::default())
            .expect("falls back instead of erroring");
        assert_eq!(block.kind(), "gain");
    }

    #[test]
    fn bad_parameters_fall_back_to_unity_gain() {
        let id: BlockId = "bad".into();
        let mut params = serde_json::Map::new();
        params.insert("gain".into(), serde_json::json!("not a number"));
        let block = Block::from_kind_and_params(&id, "gain", &params)
            .expect("falls back instead of erroring");
        assert_eq!(block.kind(), "gain");
    }

    #[test]
    fn analog_filter_builds_from_defaults() {
        let id: BlockId = "af".into();
        let block = Block::from_kind_and_params(&id, "analog_filter", &Default::default())
            .expect("default params are valid");
        assert_eq!(block.kind(), "analog_filter");
        assert!(!is_state_holding("analog_filter"));
    }

    #[test]
    fn notch_filter_builds_from_defaults() {
        let id: BlockId = "nf".into();
        let block = Block::from_kind_and_params(&id, "notch_filter", &Default::default())
            .expect("default params are valid");
        assert_eq!(block.kind(), "notch_filter");
        assert!(!is_state_holding("notch_filter"));
    }
}
