//! Splitting a pipeline specification into per-worker segments.
//!
//! A parallel region is delimited by an opening `ParallelFork` and a closing
//! `ParallelJoin`. The segmenter scans the spec left to right: each marker
//! closes the current segment with the marker's upstream side attached and
//! opens the next one beginning with the marker's downstream side, both bound
//! to the same freshly allocated channel. A spec with `k` pairs therefore
//! decomposes into `2k + 1` segments.

use crate::pipeline::channel::ChannelBinding;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::fork::FORK_LABEL;
use crate::pipeline::join::JOIN_LABEL;
use crate::pipeline::spec::StageSpec;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// One stage spec inside a segment, with its channel binding when the spec is
/// a parallel marker.
#[derive(Clone)]
pub struct SegmentEntry {
    pub spec: StageSpec,
    pub binding: Option<ChannelBinding>,
}

/// A contiguous run of stage specs executed within one worker.
#[derive(Clone)]
pub struct Segment {
    pub entries: Vec<SegmentEntry>,
}

impl Segment {
    /// A single segment covering the whole spec (sequential execution).
    pub fn from_specs(specs: &[StageSpec]) -> Self {
        Self {
            entries: specs
                .iter()
                .cloned()
                .map(|spec| SegmentEntry { spec, binding: None })
                .collect(),
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.spec.label.as_str()).collect()
    }
}

/// Parallel structure of a pipeline spec.
#[derive(Debug, Clone)]
pub struct ParallelLayout {
    /// Number of fork/join pairs.
    pub pairs: usize,
    /// Worker replica count per segment: 1 for the reader-side and sink-side
    /// segments, the fork's `n_workers` for the segment inside each region.
    pub workers_per_segment: Vec<usize>,
}

impl ParallelLayout {
    pub fn is_parallel(&self) -> bool {
        self.pairs > 0
    }

    pub fn total_workers(&self) -> usize {
        self.workers_per_segment.iter().sum()
    }
}

/// Count the parallel regions of a spec and check their validity.
///
/// Nesting depth may only ever be 0 or 1, and the fork/join totals must
/// balance. A join observed before its fork is reported as a count mismatch.
pub fn parallel_layout(specs: &[StageSpec]) -> PipelineResult<ParallelLayout> {
    let mut forks = 0usize;
    let mut joins = 0usize;
    let mut workers_per_segment = vec![1usize];
    for spec in specs {
        match spec.label.as_str() {
            FORK_LABEL => {
                forks += 1;
                let n_workers = spec.params.usize_or("n_workers", 1)?;
                if n_workers == 0 {
                    return Err(PipelineError::Parameter {
                        key: "n_workers".to_string(),
                        expected: "a positive integer",
                    });
                }
                workers_per_segment.push(n_workers);
            }
            JOIN_LABEL => {
                joins += 1;
                workers_per_segment.push(1);
            }
            _ => {}
        }
        if forks > joins + 1 {
            return Err(PipelineError::ParallelNesting);
        }
        if joins > forks {
            return Err(PipelineError::ParallelCountMismatch { forks, joins });
        }
    }
    if forks != joins {
        return Err(PipelineError::ParallelCountMismatch { forks, joins });
    }
    Ok(ParallelLayout {
        pairs: forks,
        workers_per_segment,
    })
}

/// Split a validated spec into segments, allocating one bounded channel per
/// fork/join pair. The fork's `n_workers` is carried onto the matching join's
/// binding so the join knows how many sentinels to expect.
pub fn split_segments(
    specs: &[StageSpec],
    running: &Arc<AtomicBool>,
) -> PipelineResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current: Vec<SegmentEntry> = Vec::new();
    let mut region_workers = 0usize;
    for spec in specs {
        match spec.label.as_str() {
            FORK_LABEL => {
                region_workers = spec.params.usize_or("n_workers", 1)?;
                let (up, down) = ChannelBinding::new_pair(region_workers, running.clone());
                current.push(SegmentEntry {
                    spec: spec.clone(),
                    binding: Some(up),
                });
                segments.push(Segment {
                    entries: std::mem::take(&mut current),
                });
                current.push(SegmentEntry {
                    spec: spec.clone(),
                    binding: Some(down),
                });
            }
            JOIN_LABEL => {
                // layout validation guarantees a preceding fork
                let (up, down) = ChannelBinding::new_pair(region_workers, running.clone());
                region_workers = 0;
                current.push(SegmentEntry {
                    spec: spec.clone(),
                    binding: Some(up),
                });
                segments.push(Segment {
                    entries: std::mem::take(&mut current),
                });
                current.push(SegmentEntry {
                    spec: spec.clone(),
                    binding: Some(down),
                });
            }
            _ => current.push(SegmentEntry {
                spec: spec.clone(),
                binding: None,
            }),
        }
    }
    segments.push(Segment { entries: current });
    Ok(segments)
}
