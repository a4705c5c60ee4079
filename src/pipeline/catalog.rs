//! Stage catalog — explicit registry mapping labels to stage constructors.
//!
//! Every stage the engine can instantiate is registered under its label as a
//! constructor closure returning the common `Stage` interface. Unknown labels
//! produce a typed error instead of a reflective lookup failure.

use crate::pipeline::channel::ChannelBinding;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::fork::{ParallelFork, FORK_LABEL};
use crate::pipeline::join::{ParallelJoin, JOIN_LABEL};
use crate::pipeline::spec::ParamMap;
use crate::pipeline::stage::BoxedStage;
use crate::pipeline::stages::{NullWriter, Passthrough, Stride, SyntheticReader, TraceWriter};
use std::collections::HashMap;

/// Everything the assembler injects into a constructor besides the
/// configured parameters.
pub struct BuildContext {
    /// The previously instantiated stage, wired as this stage's source.
    pub source: Option<BoxedStage>,
    /// Diagnostic identifier, injected only for the parallel markers.
    pub worker_id: Option<String>,
    /// Channel binding, present only for the parallel markers of a
    /// segmented pipeline.
    pub binding: Option<ChannelBinding>,
}

impl BuildContext {
    pub fn leading() -> Self {
        Self {
            source: None,
            worker_id: None,
            binding: None,
        }
    }

    /// Claim the upstream stage; filters and sinks cannot be first.
    pub fn take_source(&mut self, stage: &'static str) -> PipelineResult<BoxedStage> {
        self.source.take().ok_or_else(|| {
            PipelineError::Spec(format!("stage '{stage}' needs an upstream source"))
        })
    }

    fn take_binding(&mut self, stage: &'static str) -> PipelineResult<ChannelBinding> {
        self.binding.take().ok_or_else(|| {
            PipelineError::Spec(format!(
                "stage '{stage}' can only be built from a segmented pipeline"
            ))
        })
    }
}

pub type StageConstructor =
    Box<dyn Fn(&ParamMap, BuildContext) -> PipelineResult<BoxedStage> + Send + Sync>;

/// Registry of stage constructors, keyed by label.
#[derive(Default)]
pub struct StageCatalog {
    constructors: HashMap<&'static str, StageConstructor>,
}

impl StageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, label: &'static str, constructor: F)
    where
        F: Fn(&ParamMap, BuildContext) -> PipelineResult<BoxedStage> + Send + Sync + 'static,
    {
        self.constructors.insert(label, Box::new(constructor));
    }

    pub fn contains(&self, label: &str) -> bool {
        self.constructors.contains_key(label)
    }

    /// Build a stage instance from its label and parameter map.
    pub fn construct(
        &self,
        label: &str,
        params: &ParamMap,
        ctx: BuildContext,
    ) -> PipelineResult<BoxedStage> {
        let constructor = self
            .constructors
            .get(label)
            .ok_or_else(|| PipelineError::UnknownStage(label.to_string()))?;
        constructor(params, ctx)
    }
}

/// Catalog with every built-in stage registered.
pub fn builtin_catalog() -> StageCatalog {
    let mut catalog = StageCatalog::new();
    catalog.register(SyntheticReader::LABEL, |params, ctx| {
        if ctx.source.is_some() {
            return Err(PipelineError::Spec(format!(
                "'{}' must be the first stage of its segment",
                SyntheticReader::LABEL
            )));
        }
        Ok(Box::new(SyntheticReader::from_params(params)?))
    });
    catalog.register(Passthrough::LABEL, |_params, mut ctx| {
        let source = ctx.take_source(Passthrough::LABEL)?;
        Ok(Box::new(Passthrough::new(source)))
    });
    catalog.register(Stride::LABEL, |params, mut ctx| {
        let source = ctx.take_source(Stride::LABEL)?;
        Ok(Box::new(Stride::from_params(source, params)?))
    });
    catalog.register(NullWriter::LABEL, |_params, mut ctx| {
        let source = ctx.take_source(NullWriter::LABEL)?;
        Ok(Box::new(NullWriter::new(source)))
    });
    catalog.register(TraceWriter::LABEL, |params, mut ctx| {
        let source = ctx.take_source(TraceWriter::LABEL)?;
        Ok(Box::new(TraceWriter::from_params(source, params)?))
    });
    catalog.register(FORK_LABEL, |_params, mut ctx| {
        let binding = ctx.take_binding(FORK_LABEL)?;
        let worker_id = ctx.worker_id.take().unwrap_or_default();
        Ok(Box::new(ParallelFork::new(ctx.source.take(), binding, worker_id)))
    });
    catalog.register(JOIN_LABEL, |_params, mut ctx| {
        let binding = ctx.take_binding(JOIN_LABEL)?;
        let worker_id = ctx.worker_id.take().unwrap_or_default();
        Ok(Box::new(ParallelJoin::new(ctx.source.take(), binding, worker_id)))
    });
    catalog
}
