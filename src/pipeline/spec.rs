//! Stage specifications and their parameter maps.
//!
//! A pipeline configuration is an ordered sequence of single-key maps,
//! `{ "<Label>": { "<param>": <value>, ..., "active": bool } }`. Parsing
//! produces the working list: entries with `active: false` are dropped and
//! the `active` key never reaches a stage constructor.

use crate::pipeline::error::{PipelineError, PipelineResult};
use serde_json::{Map, Value};

/// One configured stage: a catalog label plus its parameters.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub label: String,
    pub params: ParamMap,
}

impl StageSpec {
    pub fn new(label: impl Into<String>, params: ParamMap) -> Self {
        Self {
            label: label.into(),
            params,
        }
    }

    /// A spec with no parameters.
    pub fn bare(label: impl Into<String>) -> Self {
        Self::new(label, ParamMap::default())
    }
}

/// Typed access over a stage's raw parameter map.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    inner: Map<String, Value>,
}

impl ParamMap {
    pub fn from_map(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    /// Build from any JSON value; must be an object.
    pub fn from_value(value: Value) -> PipelineResult<Self> {
        match value {
            Value::Object(inner) => Ok(Self { inner }),
            other => Err(PipelineError::Spec(format!(
                "parameter map must be an object, found {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn u64_or(&self, key: &str, default: u64) -> PipelineResult<u64> {
        match self.inner.get(key) {
            None => Ok(default),
            Some(value) => value.as_u64().ok_or_else(|| PipelineError::Parameter {
                key: key.to_string(),
                expected: "a non-negative integer",
            }),
        }
    }

    pub fn usize_or(&self, key: &str, default: usize) -> PipelineResult<usize> {
        Ok(self.u64_or(key, default as u64)? as usize)
    }

    pub fn str_required(&self, key: &str) -> PipelineResult<&str> {
        self.inner
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::Parameter {
                key: key.to_string(),
                expected: "a string",
            })
    }
}

/// Turn raw configuration entries into the working list of stage specs.
///
/// Each entry must be a map with exactly one key (the stage label) whose
/// value is the parameter map. Entries marked `active: false` are skipped
/// entirely.
pub fn parse_pipeline(entries: Vec<Value>) -> PipelineResult<Vec<StageSpec>> {
    let mut specs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let obj = match entry {
            Value::Object(map) => map,
            other => {
                return Err(PipelineError::Spec(format!(
                    "entry {index} must be a map, found {other}"
                )))
            }
        };
        if obj.len() != 1 {
            return Err(PipelineError::Spec(format!(
                "entry {index} must have exactly one stage label, found {}",
                obj.len()
            )));
        }
        let Some((label, raw_params)) = obj.into_iter().next() else {
            continue;
        };
        let mut params = match raw_params {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(PipelineError::Spec(format!(
                    "parameters of '{label}' must be a map, found {other}"
                )))
            }
        };
        match params.remove("active") {
            Some(Value::Bool(false)) => continue,
            Some(Value::Bool(true)) | None => {}
            Some(other) => {
                return Err(PipelineError::Spec(format!(
                    "'active' of '{label}' must be a boolean, found {other}"
                )))
            }
        }
        specs.push(StageSpec::new(label, ParamMap::from_map(params)));
    }
    Ok(specs)
}
