//! Frame — the unit of data pulled through a pipeline chain.

use serde::{Deserialize, Serialize};

/// One data item flowing through the pipeline.
///
/// The payload is opaque to the engine. Each stage that touches a frame
/// appends its label to the trace, giving every frame a journal of the
/// pipeline it went through. Inside a parallel region the fork attaches a
/// sequence tag which the matching join strips again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Index assigned by the reader that produced this frame.
    pub number: u64,
    /// Opaque payload values.
    pub values: Vec<f64>,
    /// Sequence tag inside a parallel region, `None` outside of one.
    tag: Option<u64>,
    /// Labels of the stages this frame has passed through, in order.
    pub trace: Vec<String>,
}

impl Frame {
    pub fn new(number: u64, values: Vec<f64>) -> Self {
        Self {
            number,
            values,
            tag: None,
            trace: Vec::new(),
        }
    }

    /// Sequence tag, if the frame is currently inside a parallel region.
    pub fn tag(&self) -> Option<u64> {
        self.tag
    }

    pub fn set_tag(&mut self, tag: u64) {
        self.tag = Some(tag);
    }

    /// Remove the sequence tag when the frame leaves a parallel region.
    pub fn clear_tag(&mut self) {
        self.tag = None;
    }

    /// Record that `label` has processed this frame.
    pub fn push_trace(&mut self, label: &str) {
        self.trace.push(label.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lifecycle() {
        let mut frame = Frame::new(7, vec![1.0, 2.0]);
        assert_eq!(frame.tag(), None);

        frame.set_tag(3);
        assert_eq!(frame.tag(), Some(3));

        frame.clear_tag();
        assert_eq!(frame.tag(), None);
    }

    #[test]
    fn test_trace_accumulates_in_order() {
        let mut frame = Frame::new(0, vec![]);
        frame.push_trace("SyntheticReader");
        frame.push_trace("Passthrough");
        assert_eq!(frame.trace, vec!["SyntheticReader", "Passthrough"]);
    }

    #[test]
    fn test_frame_json_round_trip() {
        let mut frame = Frame::new(42, vec![0.5]);
        frame.push_trace("SyntheticReader");

        let json = serde_json::to_string(&frame).unwrap();
        let back: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}
