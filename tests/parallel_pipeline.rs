//! End-to-end pipeline runs: sequential, parallel, and failure paths.

use framepipe_rs::config::load_pipeline_file;
use framepipe_rs::pipeline::{
    builtin_catalog, parse_pipeline, run_pipeline, BoxedStage, Frame, PipelineError,
    PipelineResult, RunOptions, Stage, StageCatalog,
};
use proptest::prelude::*;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn parallel_entries(n_frames: u64, n_workers: u64, out: &Path) -> Vec<serde_json::Value> {
    vec![
        json!({"SyntheticReader": {"n_frames": n_frames, "n_values": 2}}),
        json!({"ParallelFork": {"n_workers": n_workers}}),
        json!({"Passthrough": {}}),
        json!({"ParallelJoin": {}}),
        json!({"TraceWriter": {"path": out.to_str().unwrap()}}),
    ]
}

fn run(entries: Vec<serde_json::Value>, module: &str, log_dir: &Path) -> PipelineResult<()> {
    let specs = parse_pipeline(entries)?;
    let catalog = Arc::new(builtin_catalog());
    let options = RunOptions {
        module: module.to_string(),
        log_dir: log_dir.to_path_buf(),
    };
    run_pipeline(&specs, &catalog, &options)
}

fn written_frames(path: &Path) -> Vec<Frame> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_97_frames_through_3_workers_in_original_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames.jsonl");
    run(parallel_entries(97, 3, &out), "e2e", dir.path()).unwrap();

    let frames = written_frames(&out);
    assert_eq!(frames.len(), 97);
    let numbers: Vec<u64> = frames.iter().map(|f| f.number).collect();
    assert_eq!(numbers, (0..97).collect::<Vec<_>>());

    for frame in &frames {
        // the sequence tag never leaves the parallel region
        assert_eq!(frame.tag(), None);
        assert_eq!(frame.trace.first().map(String::as_str), Some("SyntheticReader"));
        assert!(frame.trace.iter().any(|l| l == "ParallelFork"));
        assert!(frame.trace.iter().any(|l| l == "Passthrough"));
        assert!(frame.trace.iter().any(|l| l == "ParallelJoin"));
        assert_eq!(frame.trace.last().map(String::as_str), Some("TraceWriter"));
    }

    // one log per spawned worker; the terminal segment runs on this thread
    for name in [
        "pipeline_e2e_segment_0_worker_0.log",
        "pipeline_e2e_segment_1_worker_0.log",
        "pipeline_e2e_segment_1_worker_1.log",
        "pipeline_e2e_segment_1_worker_2.log",
    ] {
        let log = dir.path().join(name);
        assert!(log.exists(), "missing {name}");
        let text = std::fs::read_to_string(log).unwrap();
        assert!(text.contains("instantiated"), "{name} has no assembly trace");
    }
}

#[test]
fn test_parallel_output_matches_sequential_output() {
    let dir = tempfile::tempdir().unwrap();

    let seq_out = dir.path().join("sequential.jsonl");
    let entries = vec![
        json!({"SyntheticReader": {"n_frames": 40}}),
        json!({"Stride": {"step": 3}}),
        json!({"TraceWriter": {"path": seq_out.to_str().unwrap()}}),
    ];
    run(entries, "seq", dir.path()).unwrap();

    let par_out = dir.path().join("parallel.jsonl");
    let entries = vec![
        json!({"SyntheticReader": {"n_frames": 40}}),
        json!({"ParallelFork": {"n_workers": 4}}),
        json!({"Stride": {"step": 3, "active": false}}),
        json!({"Passthrough": {}}),
        json!({"ParallelJoin": {}}),
        json!({"Stride": {"step": 3}}),
        json!({"TraceWriter": {"path": par_out.to_str().unwrap()}}),
    ];
    run(entries, "par", dir.path()).unwrap();

    let sequential: Vec<u64> = written_frames(&seq_out).iter().map(|f| f.number).collect();
    let parallel: Vec<u64> = written_frames(&par_out).iter().map(|f| f.number).collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_segmenter_errors_surface_before_any_worker_runs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.jsonl");

    let entries = vec![
        json!({"SyntheticReader": {"n_frames": 5}}),
        json!({"ParallelFork": {"n_workers": 2}}),
        json!({"ParallelFork": {"n_workers": 2}}),
        json!({"ParallelJoin": {}}),
        json!({"ParallelJoin": {}}),
        json!({"TraceWriter": {"path": out.to_str().unwrap()}}),
    ];
    assert!(matches!(
        run(entries, "nested", dir.path()),
        Err(PipelineError::ParallelNesting)
    ));

    let entries = vec![
        json!({"SyntheticReader": {"n_frames": 5}}),
        json!({"ParallelFork": {"n_workers": 2}}),
        json!({"TraceWriter": {"path": out.to_str().unwrap()}}),
    ];
    assert!(matches!(
        run(entries, "unbalanced", dir.path()),
        Err(PipelineError::ParallelCountMismatch { .. })
    ));

    assert!(!out.exists(), "no data may flow on a rejected spec");
}

/// Filter that fails once it sees a frame number at or past its threshold.
struct FailAfter {
    source: BoxedStage,
    threshold: u64,
}

impl Stage for FailAfter {
    fn label(&self) -> &'static str {
        "FailAfter"
    }
    fn produce(&mut self) -> PipelineResult<Option<Frame>> {
        match self.source.produce()? {
            Some(frame) if frame.number >= self.threshold => {
                Err(PipelineError::Spec("injected worker failure".to_string()))
            }
            other => Ok(other),
        }
    }
}

fn catalog_with_fail_after() -> StageCatalog {
    let mut catalog = builtin_catalog();
    catalog.register("FailAfter", |params, mut ctx| {
        let source = ctx.take_source("FailAfter")?;
        let threshold = params.u64_or("threshold", 0)?;
        Ok(Box::new(FailAfter { source, threshold }))
    });
    catalog
}

#[test]
fn test_worker_failure_shuts_the_whole_pipeline_down() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("partial.jsonl");
    let entries = vec![
        json!({"SyntheticReader": {"n_frames": 200}}),
        json!({"ParallelFork": {"n_workers": 2}}),
        json!({"FailAfter": {"threshold": 10}}),
        json!({"ParallelJoin": {}}),
        json!({"TraceWriter": {"path": out.to_str().unwrap()}}),
    ];
    let specs = parse_pipeline(entries).unwrap();
    let catalog = Arc::new(catalog_with_fail_after());
    let options = RunOptions {
        module: "failing".to_string(),
        log_dir: dir.path().to_path_buf(),
    };

    match run_pipeline(&specs, &catalog, &options).unwrap_err() {
        PipelineError::WorkerFailed { worker_id, log_file } => {
            assert!(worker_id.starts_with("segment_1_worker_"));
            // the per-worker log carries the failure detail
            let log = std::fs::read_to_string(&log_file).unwrap();
            assert!(log.contains("injected worker failure"));
        }
        other => panic!("expected a worker failure, got {other}"),
    }
}

#[test]
fn test_pipeline_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("from_file.jsonl");
    let file = dir.path().join("pipeline.json");
    let entries = parallel_entries(20, 2, &out);
    std::fs::write(&file, serde_json::to_string_pretty(&entries).unwrap()).unwrap();

    let specs = load_pipeline_file(&file).unwrap();
    let catalog = Arc::new(builtin_catalog());
    let options = RunOptions {
        module: "file".to_string(),
        log_dir: dir.path().to_path_buf(),
    };
    run_pipeline(&specs, &catalog, &options).unwrap();
    assert_eq!(written_frames(&out).len(), 20);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    /// Any frame count and worker count: the join restores reader order.
    #[test]
    fn prop_order_preserved_for_any_worker_count(
        n_frames in 1u64..40,
        n_workers in 1u64..5,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames.jsonl");
        run(parallel_entries(n_frames, n_workers, &out), "prop", dir.path()).unwrap();

        let numbers: Vec<u64> = written_frames(&out).iter().map(|f| f.number).collect();
        prop_assert_eq!(numbers, (0..n_frames).collect::<Vec<_>>());
    }
}
