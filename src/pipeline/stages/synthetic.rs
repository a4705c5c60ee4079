//! Deterministic frame source, useful as a demo reader and for tests.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::frame::Frame;
use crate::pipeline::spec::ParamMap;
use crate::pipeline::stage::Stage;

/// Produces `n_frames` frames with `n_values` deterministic payload values
/// each, numbered from 0.
pub struct SyntheticReader {
    n_frames: u64,
    n_values: usize,
    cursor: u64,
}

impl SyntheticReader {
    pub const LABEL: &'static str = "SyntheticReader";

    pub fn new(n_frames: u64, n_values: usize) -> Self {
        Self {
            n_frames,
            n_values,
            cursor: 0,
        }
    }

    pub fn from_params(params: &ParamMap) -> PipelineResult<Self> {
        Ok(Self::new(
            params.u64_or("n_frames", 3)?,
            params.usize_or("n_values", 8)?,
        ))
    }
}

impl Stage for SyntheticReader {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        if self.cursor == self.n_frames {
            return Ok(None);
        }
        let number = self.cursor;
        self.cursor += 1;
        let values = (0..self.n_values)
            .map(|v| (number * 31 + v as u64) as f64 / 7.0)
            .collect();
        let mut frame = Frame::new(number, values);
        frame.push_trace(Self::LABEL);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_produces_numbered_frames_then_none() {
        let mut reader = SyntheticReader::new(3, 2);
        for expected in 0..3 {
            let frame = reader.produce().unwrap().unwrap();
            assert_eq!(frame.number, expected);
            assert_eq!(frame.values.len(), 2);
            assert_eq!(frame.trace, vec![SyntheticReader::LABEL]);
        }
        assert!(reader.produce().unwrap().is_none());
        assert!(reader.produce().unwrap().is_none());
    }

    #[test]
    fn test_from_params_defaults() {
        let mut reader = SyntheticReader::from_params(&ParamMap::default()).unwrap();
        let mut count = 0;
        while reader.produce().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);

        let params = ParamMap::from_value(json!({"n_frames": 7, "n_values": 1})).unwrap();
        let mut reader = SyntheticReader::from_params(&params).unwrap();
        let frame = reader.produce().unwrap().unwrap();
        assert_eq!(frame.values.len(), 1);
    }
}
