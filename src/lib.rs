//! # framepipe-rs: declarative filter-chain pipeline engine
//!
//! Assembles data-processing pipelines from an ordered configuration list and
//! runs them either sequentially or across multiple worker threads. When a
//! pipeline contains a parallel region, output order is guaranteed to match
//! what sequential execution would have produced, even though frames are
//! distributed across workers for concurrent processing.
//!
//! ## Architecture
//!
//! - **Stages**: pull-based processing units (readers, filters, writers) built
//!   from a label + parameter map through the stage catalog
//! - **Segments**: contiguous runs of stages, split at `ParallelFork` /
//!   `ParallelJoin` markers, each driven by its own worker
//! - **Channels**: bounded crossbeam channels at every fork/join boundary,
//!   providing backpressure and carrying the end-of-stream sentinel
//! - **Supervisor**: owns worker handles and a control channel; a failing
//!   worker triggers an emergency shutdown of the whole pipeline
//!
//! ## Example
//!
//! ```ignore
//! use framepipe_rs::config::load_pipeline_file;
//! use framepipe_rs::pipeline::{builtin_catalog, run_pipeline, RunOptions};
//! use std::sync::Arc;
//!
//! let specs = load_pipeline_file("pipeline.json".as_ref())?;
//! let catalog = Arc::new(builtin_catalog());
//! run_pipeline(&specs, &catalog, &RunOptions::default())?;
//! ```

pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use pipeline::{
    builtin_catalog, run_pipeline, Frame, PipelineError, PipelineResult, RunOptions, Stage,
    StageCatalog, StageSpec,
};
