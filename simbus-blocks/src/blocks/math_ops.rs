use simbus_types::{BlockId, SimError, Tick};
use strum::EnumString;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Sum {
    pub signs: Vec<i8>,
    output: f64,
}

impl Sum {
    pub fn new(block: &BlockId, signs: &str) -> Result<Self, SimError> {
        let signs = signs
            .chars()
            .map(|c| match c {
                '+' => Ok(1),
                '-' => Ok(-1),
                other => Err(SimError::BadParameters {
                    block: block.clone(),
                    reason: format!("sum signs must be '+' or '-', got '{other}'"),
                }),
            })
            .collect::<Result<Vec<i8>, _>>()?;
        Ok(Sum { signs, output: 0.0 })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.output = inputs
            .iter()
            .zip(self.signs.iter().chain(std::iter::repeat(&1)))
            .map(|(v, s)| *s as f64 * v)
            .sum();
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct Gain {
    pub gain: f64,
    output: f64,
}

impl Gain {
    pub fn new(gain: f64) -> Self {
        Gain { gain, output: 0.0 }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.output = self.gain * inputs.first().copied().unwrap_or(0.0);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub operations: Vec<char>,
    output: f64,
}

impl Product {
    pub fn new(block: &BlockId, operations: &str) -> Result<Self, SimError> {
        let operations = operations
            .chars()
            .map(|c| match c {
                '*' | '/' => Ok(c),
                other => Err(SimError::BadParameters {
                    block: block.clone(),
                    reason: format!("product operations must be '*' or '/', got '{other}'"),
                }),
            })
            .collect::<Result<Vec<char>, _>>()?;
        Ok(Product {
            operations,
            output: 1.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let mut acc = 1.0;
        for (i, v) in inputs.iter().enumerate() {
            match self.operations.get(i).copied().unwrap_or('*') {
                '/' => {
                    let denom = if v.abs() < EPS { EPS.copysign(*v) } else { *v };
                    acc /= denom;
                }
                _ => acc *= v,
            }
        }
        self.output = acc;
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

macro_rules! elementwise_unary_block {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            output: f64,
        }
        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
            pub fn get_output(&self) -> f64 {
                self.output
            }
        }
    };
}

elementwise_unary_block!(Abs, "Absolute value.");
impl Abs {
    pub fn update(&mut self, inputs: &[f64]) {
        self.output = inputs.first().copied().unwrap_or(0.0).abs();
    }
}

elementwise_unary_block!(Sign, "Signum.");
impl Sign {
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        self.output = if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone)]
pub struct Saturation {
    pub upper_limit: f64,
    pub lower_limit: f64,
    output: f64,
}

impl Saturation {
    pub fn new(upper_limit: f64, lower_limit: f64) -> Self {
        Saturation {
            upper_limit,
            lower_limit,
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        self.output = x.clamp(self.lower_limit, self.upper_limit);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone)]
pub struct DeadZone {
    pub start: f64,
    pub end: f64,
    output: f64,
}

impl DeadZone {
    pub fn new(start: f64, end: f64) -> Self {
        DeadZone {
            start,
            end,
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        self.output = if x > self.end {
            x - self.end
        } else if x < self.start {
            x - self.start
        } else {
            0.0
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MathFn {
    Exp,
    Log,
    Log10,
    Sqrt,
    Square,
    Pow,
    Reciprocal,
}

#[derive(Debug, Clone)]
pub struct MathFunction {
    pub function: MathFn,
    pub exponent: f64,
    output: f64,
}

impl MathFunction {
    pub fn new(block: &BlockId, function: &str, exponent: f64) -> Result<Self, SimError> {
        let function = function
            .parse()
            .map_err(|_| SimError::BadParameters {
                block: block.clone(),
                reason: format!("unknown math function '{function}'"),
            })?;
        Ok(MathFunction {
            function,
            exponent,
            output: 0.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        self.output = match self.function {
            MathFn::Exp => x.exp(),
            MathFn::Log => x.max(EPS).ln(),
            MathFn::Log10 => x.max(EPS).log10(),
            MathFn::Sqrt => x.max(0.0).sqrt(),
            MathFn::Square => x * x,
            MathFn::Pow => x.powf(self.exponent),
            MathFn::Reciprocal => {
                let denom = if x.abs() < EPS { EPS.copysign(x) } else { x };
                1.0 / denom
            }
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TrigFn {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
}

#[derive(Debug, Clone)]
pub struct Trigonometry {
    pub function: TrigFn,
    output: f64,
}

impl Trigonometry {
    pub fn new(block: &BlockId, function: &str) -> Result<Self, SimError> {
        let function = function
            .parse()
            .map_err(|_| SimError::BadParameters {
                block: block.clone(),
                reason: format!("unknown trig function '{function}'"),
            })?;
        Ok(Trigonometry {
            function,
            output: 0.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let x = inputs.first().copied().unwrap_or(0.0);
        let y = match self.function {
            TrigFn::Sin => x.sin(),
            TrigFn::Cos => x.cos(),
            TrigFn::Tan => x.tan(),
            TrigFn::Asin => x.asin(),
            TrigFn::Acos => x.acos(),
            TrigFn::Atan => x.atan(),
            TrigFn::Sinh => x.sinh(),
            TrigFn::Cosh => x.cosh(),
            TrigFn::Tanh => x.tanh(),
        };
        self.output = if y.is_finite() { y } else { 0.0 };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

#[derive(Debug, Clone)]
pub struct Switch {
    pub threshold: f64,
    pub criteria: CompareOp,
    output: f64,
}

impl Switch {
    pub fn new(block: &BlockId, threshold: f64, criteria: &str) -> Result<Self, SimError> {
        let criteria = criteria.parse().map_err(|_| SimError::BadParameters {
            block: block.clone(),
            reason: format!("unknown switch criteria '{criteria}'"),
        })?;
        Ok(Switch {
            threshold,
            criteria,
            output: 0.0,
        })
    }
    /// `inputs = [candidate_a, control, candidate_b]`.
    pub fn update(&mut self, inputs: &[f64]) {
        let a = inputs.first().copied().unwrap_or(0.0);
        let control = inputs.get(1).copied().unwrap_or(0.0);
        let b = inputs.get(2).copied().unwrap_or(0.0);
        let take_a = match self.criteria {
            CompareOp::GreaterOrEqual => control >= self.threshold,
            CompareOp::GreaterThan => control > self.threshold,
            CompareOp::NotEqual => control != self.threshold,
            CompareOp::Equal => control == self.threshold,
            CompareOp::LessThan => control < self.threshold,
            CompareOp::LessOrEqual => control <= self.threshold,
        };
        self.output = if take_a { a } else { b };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Declared per spec.md's Routing category; this engine is scalar-port-only,
/// so "packing" N inputs into a vector is represented by just carrying the
/// first input through.
#[derive(Debug, Clone)]
pub struct Mux {
    pub num_inputs: usize,
    output: f64,
}

impl Mux {
    pub fn new(num_inputs: usize) -> Self {
        Mux {
            num_inputs,
            output: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.output = inputs.first().copied().unwrap_or(0.0);
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

/// Declared per spec.md's Routing category; "unpacking" a vector input is
/// represented by reflecting the single scalar input on output port 0 and
/// zeroing the rest.
#[derive(Debug, Clone)]
pub struct Demux {
    pub num_outputs: usize,
    input: f64,
}

impl Demux {
    pub fn new(num_outputs: usize) -> Self {
        Demux {
            num_outputs,
            input: 0.0,
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.input = inputs.first().copied().unwrap_or(0.0);
    }
    pub fn get_output(&self, port: usize) -> f64 {
        if port == 0 {
            self.input
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub criteria: CompareOp,
    output: f64,
}

impl Comparison {
    pub fn new(block: &BlockId, criteria: &str) -> Result<Self, SimError> {
        let criteria = criteria.parse().map_err(|_| SimError::BadParameters {
            block: block.clone(),
            reason: format!("unknown comparison criteria '{criteria}'"),
        })?;
        Ok(Comparison {
            criteria,
            output: 0.0,
        })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        let a = inputs.first().copied().unwrap_or(0.0);
        let b = inputs.get(1).copied().unwrap_or(0.0);
        let truth = match self.criteria {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::GreaterThan => a > b,
            CompareOp::GreaterOrEqual => a >= b,
            CompareOp::LessThan => a < b,
            CompareOp::LessOrEqual => a <= b,
        };
        self.output = if truth { 1.0 } else { 0.0 };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AggregateMethod {
    Min,
    Max,
    Sum,
    Mean,
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub method: AggregateMethod,
    output: f64,
}

impl Aggregate {
    pub fn new(block: &BlockId, method: &str) -> Result<Self, SimError> {
        let method = method.parse().map_err(|_| SimError::BadParameters {
            block: block.clone(),
            reason: format!("unknown aggregate method '{method}'"),
        })?;
        Ok(Aggregate { method, output: 0.0 })
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.output = match self.method {
            AggregateMethod::Min => inputs.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateMethod::Max => inputs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateMethod::Sum => inputs.iter().sum(),
            AggregateMethod::Mean => {
                if inputs.is_empty() {
                    0.0
                } else {
                    inputs.iter().sum::<f64>() / inputs.len() as f64
                }
            }
        };
    }
    pub fn get_output(&self) -> f64 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_applies_signs() {
        let mut s = Sum::new(&"b".to_string(), "+-").unwrap();
        s.update(&[5.0, 2.0]);
        assert_eq!(s.get_output(), 3.0);
    }

    #[test]
    fn reciprocal_guards_small_denominators() {
        let mut f = MathFunction::new(&"b".to_string(), "reciprocal", 0.0).unwrap();
        f.update(&[0.0]);
        assert!(f.get_output().is_finite());
    }

    #[test]
    fn product_division_guards_zero() {
        let mut p = Product::new(&"b".to_string(), "*/").unwrap();
        p.update(&[4.0, 0.0]);
        assert!(p.get_output().is_finite());
    }

    #[test]
    fn mux_packs_first_input() {
        let mut m = Mux::new(3);
        m.update(&[1.5, 2.5, 3.5]);
        assert_eq!(m.get_output(), 1.5);
    }

    #[test]
    fn demux_unpacks_onto_first_port_only() {
        let mut d = Demux::new(2);
        d.update(&[4.25]);
        assert_eq!(d.get_output(0), 4.25);
        assert_eq!(d.get_output(1), 0.0);
    }
}
