//! Identity filter — forwards every frame unchanged.
//!
//! Does nothing but record itself in the frame trace. Useful as a basis for
//! writing more complicated filters and for debugging pipelines.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::frame::Frame;
use crate::pipeline::stage::{BoxedStage, Stage};

pub struct Passthrough {
    source: BoxedStage,
}

impl Passthrough {
    pub const LABEL: &'static str = "Passthrough";

    pub fn new(source: BoxedStage) -> Self {
        Self { source }
    }
}

impl Stage for Passthrough {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        match self.source.produce()? {
            Some(mut frame) => {
                frame.push_trace(Self::LABEL);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}
