//! Filter-chain pipeline engine.
//!
//! A pipeline is an ordered list of stage specifications. Data flows through
//! a singly linked chain of stages, tail = sink:
//!
//! ```text
//! [SyntheticReader] ──► [Stride] ──► [Passthrough] ──► [TraceWriter]
//! ```
//!
//! A `ParallelFork`/`ParallelJoin` pair delimits a data-parallel region. The
//! segmenter splits the spec at those markers, allocates one bounded channel
//! per pair, and the executor runs every non-terminal segment on its own
//! worker thread:
//!
//! ```text
//! [Reader]─[Fork]  ══channel══  [Fork]─[Filter]─[Join]  ══channel══  [Join]─[Writer]
//!  1 worker                      n_workers replicas                   invoking thread
//! ```
//!
//! # Design
//!
//! - **Pull contract** — `Stage::produce()` returns the next frame or `None`;
//!   sinks expose `drive()` which pulls upstream until exhaustion.
//! - **Order preservation** — the fork numbers frames with a contiguous
//!   sequence tag; the join re-orders by tag before emitting.
//! - **Backpressure** — channel capacity is fixed at 32; an upstream dump
//!   blocks once the channel is full.
//! - **Failure propagation** — a failing worker reports on the supervisor's
//!   control channel; the supervisor shuts the whole pipeline down once.

pub mod assemble;
pub mod catalog;
pub mod channel;
pub mod error;
pub mod executor;
pub mod fork;
pub mod frame;
pub mod join;
pub mod segment;
pub mod spec;
pub mod stage;
pub mod stages;
pub mod supervisor;

pub use assemble::{assemble, validate};
pub use catalog::{builtin_catalog, BuildContext, StageCatalog};
pub use channel::{ChannelBinding, Parcel, Side, CHANNEL_CAPACITY};
pub use error::{PipelineError, PipelineResult};
pub use executor::{run_pipeline, RunOptions};
pub use fork::{ParallelFork, FORK_LABEL};
pub use frame::Frame;
pub use join::{ParallelJoin, JOIN_LABEL};
pub use segment::{parallel_layout, split_segments, ParallelLayout, Segment, SegmentEntry};
pub use spec::{parse_pipeline, ParamMap, StageSpec};
pub use stage::{BoxedStage, Stage, StageFacts};
pub use supervisor::{Supervisor, WorkerFailure};
