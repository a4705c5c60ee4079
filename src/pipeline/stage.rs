//! Stage abstraction — the polymorphic processing unit of a pipeline.
//!
//! Stages compose by explicit ownership: every non-initial stage owns a boxed
//! reference to its upstream, so a chain is a singly linked list whose tail is
//! the sink. Sources and filters implement `produce`, sinks (and the
//! channel-feeding sides of the parallel markers) implement `drive`.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::frame::Frame;

/// One pipeline processing unit (reader, filter, or sink).
pub trait Stage: Send {
    /// Catalog label of this stage.
    fn label(&self) -> &'static str;

    /// Labels of stages that must appear earlier in the pipeline.
    fn requires(&self) -> &[&'static str] {
        &[]
    }

    /// Labels of stages that must not appear earlier in the pipeline.
    fn conflicts(&self) -> &[&'static str] {
        &[]
    }

    /// Pull the next frame from this stage. `None` means the stream is
    /// exhausted; repeated calls after that keep returning `None`.
    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        Err(PipelineError::UnsupportedOperation {
            stage: self.label(),
            operation: "produce",
        })
    }

    /// Pull the upstream chain to exhaustion. Only the last stage of a
    /// segment is driven.
    fn drive(&mut self) -> PipelineResult<()> {
        Err(PipelineError::UnsupportedOperation {
            stage: self.label(),
            operation: "drive",
        })
    }
}

pub type BoxedStage = Box<dyn Stage>;

/// Capability facts captured at assembly time.
///
/// Ownership of each instance is folded into the chain as it is built, so the
/// validator scans these per-position facts instead of the instances.
#[derive(Debug, Clone)]
pub struct StageFacts {
    pub label: &'static str,
    pub requires: Vec<&'static str>,
    pub conflicts: Vec<&'static str>,
}

impl StageFacts {
    pub fn of(stage: &dyn Stage) -> Self {
        Self {
            label: stage.label(),
            requires: stage.requires().to_vec(),
            conflicts: stage.conflicts().to_vec(),
        }
    }
}
