use simbus_types::Tick;

/// Records every connected input channel's `(t, value)` samples whenever the
/// tick is `ready`. A multi-input scope yields one recorded series per input.
#[derive(Debug, Clone)]
pub struct Scope {
    inputs: Vec<f64>,
    pub times: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl Scope {
    pub fn new(num_inputs: usize) -> Self {
        let n = num_inputs.max(1);
        Scope {
            inputs: vec![0.0; n],
            times: Vec::new(),
            values: vec![Vec::new(); n],
        }
    }
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
    pub fn init(&mut self) {
        self.times.clear();
        for v in &mut self.values {
            v.clear();
        }
    }
    pub fn update(&mut self, inputs: &[f64]) {
        for (slot, v) in self.inputs.iter_mut().zip(inputs) {
            *slot = *v;
        }
    }
    pub fn report(&mut self, tick: &Tick) {
        if tick.ready {
            self.times.push(tick.t);
            for (series, v) in self.values.iter_mut().zip(&self.inputs) {
                series.push(*v);
            }
        }
    }
    pub fn get_output(&self, port: usize) -> f64 {
        self.inputs.get(port).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ToWorkspace {
    pub variable_name: String,
    input: f64,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl ToWorkspace {
    pub fn new(variable_name: String) -> Self {
        ToWorkspace {
            variable_name,
            input: 0.0,
            times: Vec::new(),
            values: Vec::new(),
        }
    }
    pub fn init(&mut self) {
        self.times.clear();
        self.values.clear();
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.input = inputs.first().copied().unwrap_or(0.0);
    }
    pub fn report(&mut self, tick: &Tick) {
        if tick.ready {
            self.times.push(tick.t);
            self.values.push(self.input);
        }
    }
    pub fn get_output(&self, _port: usize) -> f64 {
        self.input
    }
}

#[derive(Debug, Clone, Default)]
pub struct Display {
    input: f64,
    current_value: f64,
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn update(&mut self, inputs: &[f64]) {
        self.input = inputs.first().copied().unwrap_or(0.0);
    }
    pub fn report(&mut self, tick: &Tick) {
        if tick.ready {
            self.current_value = self.input;
        }
    }
    pub fn get_output(&self, _port: usize) -> f64 {
        self.current_value
    }
}

#[derive(Debug, Clone, Default)]
pub struct Terminator;

impl Terminator {
    pub fn new() -> Self {
        Terminator
    }
    pub fn update(&mut self, _inputs: &[f64]) {}
    pub fn get_output(&self, _port: usize) -> f64 {
        0.0
    }
}
