use serde_json::Value;
use simbus_types::{BlockId, SimError};

/// Thin accessor over a block's raw parameter bag (`string -> value`), the
/// shape spec.md §3 describes a `Block instance` carrying. Typed getters
/// convert or fall back to a default; malformed values surface as
/// `BadParameters` rather than panicking, per spec.md §7.
pub struct ParamMap<'a> {
    block: &'a BlockId,
    raw: &'a serde_json::Map<String, Value>,
}

impl<'a> ParamMap<'a> {
    pub fn new(block: &'a BlockId, raw: &'a serde_json::Map<String, Value>) -> Self {
        ParamMap { block, raw }
    }

    pub fn f64(&self, key: &str, default: f64) -> Result<f64, SimError> {
        match self.raw.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| SimError::BadParameters {
                block: self.block.clone(),
                reason: format!("parameter '{key}' is not a number"),
            }),
        }
    }

    pub fn usize(&self, key: &str, default: usize) -> Result<usize, SimError> {
        match self.raw.get(key) {
            None => Ok(default),
            Some(v) => v.as_u64().map(|n| n as usize).ok_or_else(|| SimError::BadParameters {
                block: self.block.clone(),
                reason: format!("parameter '{key}' is not a non-negative integer"),
            }),
        }
    }

    pub fn str(&self, key: &str, default: &str) -> Result<String, SimError> {
        match self.raw.get(key) {
            None => Ok(default.to_string()),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| SimError::BadParameters {
                    block: self.block.clone(),
                    reason: format!("parameter '{key}' is not a string"),
                }),
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> Result<bool, SimError> {
        match self.raw.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| SimError::BadParameters {
                block: self.block.clone(),
                reason: format!("parameter '{key}' is not a boolean"),
            }),
        }
    }

    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>, SimError> {
        match self.raw.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_u64().map(Some).ok_or_else(|| SimError::BadParameters {
                block: self.block.clone(),
                reason: format!("parameter '{key}' is not an unsigned integer"),
            }),
        }
    }

    pub fn vec_f64(&self, key: &str, default: &[f64]) -> Result<Vec<f64>, SimError> {
        match self.raw.get(key) {
            None => Ok(default.to_vec()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| SimError::BadParameters {
                        block: self.block.clone(),
                        reason: format!("parameter '{key}' contains a non-numeric element"),
                    })
                })
                .collect(),
            Some(_) => Err(SimError::BadParameters {
                block: self.block.clone(),
                reason: format!("parameter '{key}' is not an array"),
            }),
        }
    }

    pub fn matrix_f64(&self, key: &str, default: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, SimError> {
        match self.raw.get(key) {
            None => Ok(default.to_vec()),
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|row| match row {
                    Value::Array(cols) => cols
                        .iter()
                        .map(|v| {
                            v.as_f64().ok_or_else(|| SimError::BadParameters {
                                block: self.block.clone(),
                                reason: format!("parameter '{key}' has a non-numeric entry"),
                            })
                        })
                        .collect(),
                    _ => Err(SimError::BadParameters {
                        block: self.block.clone(),
                        reason: format!("parameter '{key}' is not a matrix"),
                    }),
                })
                .collect(),
            Some(_) => Err(SimError::BadParameters {
                block: self.block.clone(),
                reason: format!("parameter '{key}' is not a matrix"),
            }),
        }
    }
}
