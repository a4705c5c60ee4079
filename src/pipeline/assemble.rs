//! Chain assembly and pre-run validation.
//!
//! Assembly instantiates stages in spec order, wiring each stage's source to
//! the previously built instance. Validation then checks every stage's
//! declared predecessor requirements and conflicts against the positions
//! before it. Both run once, before any data flows; nothing is re-checked
//! mid-run.

use crate::pipeline::catalog::{BuildContext, StageCatalog};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::fork::FORK_LABEL;
use crate::pipeline::join::JOIN_LABEL;
use crate::pipeline::segment::Segment;
use crate::pipeline::stage::{BoxedStage, StageFacts};

/// Instantiate a segment's stages in order.
///
/// Returns the chain tail (the stage to drive) together with the per-position
/// capability facts the validator needs. The `worker_id` is injected only
/// into the parallel markers, for diagnostic tagging.
pub fn assemble(
    segment: &Segment,
    catalog: &StageCatalog,
    worker_id: Option<&str>,
) -> PipelineResult<(BoxedStage, Vec<StageFacts>)> {
    let mut chain: Option<BoxedStage> = None;
    let mut manifest = Vec::with_capacity(segment.entries.len());
    for entry in &segment.entries {
        let label = entry.spec.label.as_str();
        let ctx = BuildContext {
            source: chain.take(),
            worker_id: match label {
                FORK_LABEL | JOIN_LABEL => worker_id.map(str::to_string),
                _ => None,
            },
            binding: entry.binding.clone(),
        };
        let stage = catalog.construct(label, &entry.spec.params, ctx)?;
        tracing::info!(stage = %label, "instantiated");
        manifest.push(StageFacts::of(stage.as_ref()));
        chain = Some(stage);
    }
    let chain = chain
        .ok_or_else(|| PipelineError::Spec("pipeline specification is empty".to_string()))?;
    Ok((chain, manifest))
}

/// Check declared predecessor requirements and conflicts.
///
/// A required label must be satisfied by some earlier stage of that label; a
/// conflicting label must match none. Checks are only transitive through
/// direct declarations. A required label the catalog itself does not know is
/// a registration bug and reported as such; an unknown conflicting label is
/// skipped.
pub fn validate(manifest: &[StageFacts], catalog: &StageCatalog) -> PipelineResult<()> {
    for (position, facts) in manifest.iter().enumerate() {
        for &requirement in &facts.requires {
            if !catalog.contains(requirement) {
                return Err(PipelineError::UnknownStage(requirement.to_string()));
            }
            if !manifest[..position].iter().any(|f| f.label == requirement) {
                return Err(PipelineError::DependencyUnsatisfied {
                    stage: facts.label,
                    requirement,
                });
            }
        }
        for &conflict in &facts.conflicts {
            if !catalog.contains(conflict) {
                continue;
            }
            if manifest[..position].iter().any(|f| f.label == conflict) {
                return Err(PipelineError::ConflictDetected {
                    stage: facts.label,
                    conflict,
                });
            }
        }
    }
    Ok(())
}
