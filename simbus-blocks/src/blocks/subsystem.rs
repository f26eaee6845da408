/// Pre-flatten placeholder tags. The compiler consumes `Subsystem`/`Inport`/
/// `Outport` entirely during flattening (see `simbus-compiler`); none of
/// these ever appear in a compiled execution plan, so they carry no runtime
/// behavior of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inport;

#[derive(Debug, Clone, Copy, Default)]
pub struct Outport;

#[derive(Debug, Clone, Copy, Default)]
pub struct Subsystem;
