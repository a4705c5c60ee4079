//! Top-level pipeline execution.
//!
//! A spec without parallel markers runs as one chain on the calling thread.
//! A spec with a fork/join pair is split into segments; every non-terminal
//! segment replica runs on its own supervised worker thread, while the
//! terminal segment (the one containing the final sink) always runs on the
//! invoking thread so the caller observes completion directly.

use crate::pipeline::assemble::{assemble, validate};
use crate::pipeline::catalog::StageCatalog;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::segment::{parallel_layout, split_segments, ParallelLayout, Segment};
use crate::pipeline::supervisor::Supervisor;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Run-wide settings for diagnostics.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Name used in worker log files: `pipeline_<module>_<worker_id>.log`.
    pub module: String,
    /// Directory receiving per-worker log files.
    pub log_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            module: "pipeline".to_string(),
            log_dir: PathBuf::from("."),
        }
    }
}

/// Build and run the pipeline described by `specs`.
pub fn run_pipeline(
    specs: &[crate::pipeline::spec::StageSpec],
    catalog: &Arc<StageCatalog>,
    options: &RunOptions,
) -> PipelineResult<()> {
    let layout = parallel_layout(specs)?;
    if !layout.is_parallel() {
        tracing::info!("running sequential pipeline");
        let segment = Segment::from_specs(specs);
        let (mut chain, manifest) = assemble(&segment, catalog, None)?;
        validate(&manifest, catalog)?;
        return chain.drive();
    }
    run_parallel(specs, catalog, options, &layout)
}

fn run_parallel(
    specs: &[crate::pipeline::spec::StageSpec],
    catalog: &Arc<StageCatalog>,
    options: &RunOptions,
    layout: &ParallelLayout,
) -> PipelineResult<()> {
    tracing::info!(
        workers = layout.total_workers(),
        "running parallel pipeline"
    );
    std::fs::create_dir_all(&options.log_dir)?;

    let running = Arc::new(AtomicBool::new(true));
    let segments = split_segments(specs, &running)?;
    let mut supervisor = Supervisor::new(
        Arc::clone(&running),
        options.log_dir.clone(),
        options.module.clone(),
    );

    let last = segments.len() - 1;
    for (index, segment) in segments[..last].iter().enumerate() {
        for replica in 0..layout.workers_per_segment[index] {
            let worker_id = format!("segment_{index}_worker_{replica}");
            if let Err(error) =
                supervisor.spawn_worker(segment.clone(), Arc::clone(catalog), worker_id)
            {
                supervisor.abort();
                supervisor.finish();
                return Err(error);
            }
        }
    }

    let master_id = format!("segment_{last}_worker_main");
    match run_segment(&segments[last], catalog, &master_id) {
        Ok(()) => match supervisor.finish() {
            None => Ok(()),
            Some(failure) => Err(failure.into_error()),
        },
        Err(error) => {
            // terminate every spawned worker before propagating
            supervisor.abort();
            match supervisor.finish() {
                // a worker failure is the root cause; the master only saw
                // the shutdown it triggered
                Some(failure) => Err(failure.into_error()),
                None => Err(PipelineError::MasterFailed(Box::new(error))),
            }
        }
    }
}

/// One worker's whole cycle: assemble its segment, validate it, drive it.
pub(crate) fn run_segment(
    segment: &Segment,
    catalog: &StageCatalog,
    worker_id: &str,
) -> PipelineResult<()> {
    let (mut chain, manifest) = assemble(segment, catalog, Some(worker_id))?;
    validate(&manifest, catalog)?;
    chain.drive()
}
