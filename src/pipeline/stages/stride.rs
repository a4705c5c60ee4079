//! Frame decimation — keeps every `step`-th frame and drops the rest.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::frame::Frame;
use crate::pipeline::spec::ParamMap;
use crate::pipeline::stage::{BoxedStage, Stage};

pub struct Stride {
    source: BoxedStage,
    step: u64,
    seen: u64,
}

impl Stride {
    pub const LABEL: &'static str = "Stride";

    pub fn new(source: BoxedStage, step: u64) -> Self {
        Self {
            source,
            step,
            seen: 0,
        }
    }

    pub fn from_params(source: BoxedStage, params: &ParamMap) -> PipelineResult<Self> {
        let step = params.u64_or("step", 1)?;
        if step == 0 {
            return Err(PipelineError::Parameter {
                key: "step".to_string(),
                expected: "a positive integer",
            });
        }
        Ok(Self::new(source, step))
    }
}

impl Stage for Stride {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        loop {
            match self.source.produce()? {
                None => return Ok(None),
                Some(mut frame) => {
                    let keep = self.seen % self.step == 0;
                    self.seen += 1;
                    if keep {
                        frame.push_trace(Self::LABEL);
                        return Ok(Some(frame));
                    }
                }
            }
        }
    }
}
