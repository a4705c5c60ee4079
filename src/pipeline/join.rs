//! ParallelJoin — the closing marker of a data-parallel pipeline region.
//!
//! The upstream instance runs inside each worker: it forwards every frame,
//! tag intact, onto the boundary channel and contributes exactly one sentinel
//! when its local chain ends. The downstream instance reconstructs the
//! original order: frames arrive off the channel in arbitrary interleaving,
//! are buffered by sequence tag, and are emitted strictly in tag order. The
//! dequeue loop terminates once it has observed one sentinel per worker.

use crate::pipeline::channel::{ChannelBinding, Parcel, Side};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::frame::Frame;
use crate::pipeline::stage::{BoxedStage, Stage};
use std::collections::BTreeMap;

pub const JOIN_LABEL: &str = "ParallelJoin";

pub struct ParallelJoin {
    source: Option<BoxedStage>,
    binding: ChannelBinding,
    worker_id: String,
    /// Re-ordering buffer keyed by sequence tag (downstream side only).
    buffer: BTreeMap<u64, Frame>,
    /// Lowest tag not yet emitted.
    next_tag: u64,
    sentinels_seen: usize,
}

impl ParallelJoin {
    pub fn new(source: Option<BoxedStage>, binding: ChannelBinding, worker_id: String) -> Self {
        Self {
            source,
            binding,
            worker_id,
            buffer: BTreeMap::new(),
            next_tag: 0,
            sentinels_seen: 0,
        }
    }

    fn expect_side(&self, side: Side, operation: &'static str) -> PipelineResult<()> {
        if self.binding.side == side {
            Ok(())
        } else {
            Err(PipelineError::UnsupportedOperation {
                stage: JOIN_LABEL,
                operation,
            })
        }
    }

    fn emit(&mut self, mut frame: Frame) -> PipelineResult<Option<Frame>> {
        frame.clear_tag();
        frame.push_trace(JOIN_LABEL);
        Ok(Some(frame))
    }
}

impl Stage for ParallelJoin {
    fn label(&self) -> &'static str {
        JOIN_LABEL
    }

    /// Downstream side: emit frames in strict tag order; never emits a frame
    /// before every smaller tag has been emitted.
    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        self.expect_side(Side::Downstream, "produce on the upstream side")?;
        loop {
            if let Some(frame) = self.buffer.remove(&self.next_tag) {
                self.next_tag += 1;
                return self.emit(frame);
            }
            if self.sentinels_seen == self.binding.n_workers {
                // Remainder path: only reachable if a tag never arrived, which
                // the fork's contiguous numbering rules out. Flush in tag order.
                if let Some((tag, frame)) = self.buffer.pop_first() {
                    tracing::warn!(
                        worker = %self.worker_id,
                        tag,
                        "frame buffered past all sentinels, flushing out of order"
                    );
                    self.next_tag = tag + 1;
                    return self.emit(frame);
                }
                return Ok(None);
            }
            match self.binding.get()? {
                Some(Parcel::Frame(frame)) => {
                    let tag = frame.tag().ok_or_else(|| {
                        PipelineError::Spec(format!(
                            "untagged frame crossed the '{JOIN_LABEL}' boundary"
                        ))
                    })?;
                    self.buffer.insert(tag, frame);
                }
                Some(Parcel::Sentinel) => self.sentinels_seen += 1,
                // poll timeout; get() re-checks the shutdown flag
                None => continue,
            }
        }
    }

    /// Upstream side, inside each worker: forward every frame tag-intact,
    /// then signal this worker's end of stream.
    fn drive(&mut self) -> PipelineResult<()> {
        self.expect_side(Side::Upstream, "drive on the downstream side")?;
        let source = self.source.as_mut().ok_or_else(|| {
            PipelineError::Spec(format!("'{JOIN_LABEL}' has no upstream source"))
        })?;
        let mut forwarded = 0u64;
        while let Some(mut frame) = source.produce()? {
            frame.push_trace(JOIN_LABEL);
            self.binding.put(Parcel::Frame(frame))?;
            forwarded += 1;
        }
        self.binding.put(Parcel::Sentinel)?;
        tracing::debug!(
            worker = %self.worker_id,
            frames = forwarded,
            "join forward finished"
        );
        Ok(())
    }
}
