//! Pipeline configuration loading.
//!
//! A pipeline file is an ordered sequence of single-key maps. Two formats are
//! accepted, selected by file extension:
//!
//! JSON (the whole document is the list):
//!
//! ```json
//! [
//!   { "SyntheticReader": { "n_frames": 97 } },
//!   { "ParallelFork": { "n_workers": 3 } },
//!   { "Passthrough": {} },
//!   { "ParallelJoin": {} },
//!   { "TraceWriter": { "path": "frames.jsonl" } }
//! ]
//! ```
//!
//! TOML (the list is the `[[pipeline]]` array of tables):
//!
//! ```toml
//! [[pipeline]]
//! [pipeline.SyntheticReader]
//! n_frames = 97
//!
//! [[pipeline]]
//! [pipeline.TraceWriter]
//! path = "frames.jsonl"
//! ```

use crate::pipeline::{parse_pipeline, PipelineError, PipelineResult, StageSpec};
use serde_json::Value;
use std::path::Path;

/// Load and parse a pipeline file into the working list of stage specs.
pub fn load_pipeline_file(path: &Path) -> PipelineResult<Vec<StageSpec>> {
    let text = std::fs::read_to_string(path)?;
    let entries = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml_entries(&text)?,
        _ => json_entries(&text)?,
    };
    parse_pipeline(entries)
}

fn json_entries(text: &str) -> PipelineResult<Vec<Value>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PipelineError::Spec(format!("invalid JSON: {e}")))?;
    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(PipelineError::Spec(
            "top level must be a list of stage entries".to_string(),
        )),
    }
}

fn toml_entries(text: &str) -> PipelineResult<Vec<Value>> {
    let value: toml::Value =
        toml::from_str(text).map_err(|e| PipelineError::Spec(format!("invalid TOML: {e}")))?;
    let value = serde_json::to_value(value)
        .map_err(|e| PipelineError::Spec(format!("unrepresentable TOML value: {e}")))?;
    let Value::Object(mut root) = value else {
        return Err(PipelineError::Spec(
            "top level must be a table".to_string(),
        ));
    };
    match root.remove("pipeline") {
        Some(Value::Array(entries)) => Ok(entries),
        _ => Err(PipelineError::Spec(
            "TOML pipeline file needs a [[pipeline]] array of tables".to_string(),
        )),
    }
}
