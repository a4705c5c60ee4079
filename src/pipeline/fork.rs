//! ParallelFork — the opening marker of a data-parallel pipeline region.
//!
//! The segmenter places one instance on each side of the boundary. The
//! upstream instance is driven like a sink: it numbers every frame with a
//! contiguous sequence tag starting at 0 and pushes it onto the boundary
//! channel, blocking once the channel is full. The downstream instances (one
//! per worker) are sources: they pull parcels off the channel and stop at the
//! first sentinel, of which the upstream side sends exactly one per worker.

use crate::pipeline::channel::{ChannelBinding, Parcel, Side};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::frame::Frame;
use crate::pipeline::stage::{BoxedStage, Stage};

pub const FORK_LABEL: &str = "ParallelFork";

pub struct ParallelFork {
    source: Option<BoxedStage>,
    binding: ChannelBinding,
    worker_id: String,
    /// Next sequence tag to assign (upstream side only).
    counter: u64,
}

impl ParallelFork {
    pub fn new(source: Option<BoxedStage>, binding: ChannelBinding, worker_id: String) -> Self {
        Self {
            source,
            binding,
            worker_id,
            counter: 0,
        }
    }

    fn expect_side(&self, side: Side, operation: &'static str) -> PipelineResult<()> {
        if self.binding.side == side {
            Ok(())
        } else {
            Err(PipelineError::UnsupportedOperation {
                stage: FORK_LABEL,
                operation,
            })
        }
    }
}

impl Stage for ParallelFork {
    fn label(&self) -> &'static str {
        FORK_LABEL
    }

    /// Downstream side: yield parcels verbatim; a sentinel ends this worker's
    /// iteration.
    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        self.expect_side(Side::Downstream, "produce on the upstream side")?;
        loop {
            match self.binding.get()? {
                Some(Parcel::Frame(mut frame)) => {
                    frame.push_trace(FORK_LABEL);
                    return Ok(Some(frame));
                }
                Some(Parcel::Sentinel) => return Ok(None),
                // poll timeout; get() re-checks the shutdown flag
                None => continue,
            }
        }
    }

    /// Upstream side: tag and enqueue every frame, then one sentinel per
    /// downstream worker so each observes exactly one termination signal.
    fn drive(&mut self) -> PipelineResult<()> {
        self.expect_side(Side::Upstream, "drive on the downstream side")?;
        let source = self.source.as_mut().ok_or_else(|| {
            PipelineError::Spec(format!("'{FORK_LABEL}' has no upstream source"))
        })?;
        while let Some(mut frame) = source.produce()? {
            frame.set_tag(self.counter);
            self.counter += 1;
            frame.push_trace(FORK_LABEL);
            self.binding.put(Parcel::Frame(frame))?;
        }
        for _ in 0..self.binding.n_workers {
            self.binding.put(Parcel::Sentinel)?;
        }
        tracing::debug!(
            worker = %self.worker_id,
            frames = self.counter,
            "fork dump finished"
        );
        Ok(())
    }
}
