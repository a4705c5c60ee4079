//! Worker lifecycle and emergency shutdown.
//!
//! The supervisor owns the spawned worker handles plus a dedicated control
//! channel. Each worker runs a self-contained assemble + validate + drive
//! cycle against its own segment, with its diagnostics captured to a
//! dedicated log file. A worker that fails reports on the control channel; a
//! monitoring thread reacts exactly once: it waits briefly so the failing
//! worker's log drains, then clears the shared running flag, which every
//! blocking channel operation observes. There is no per-worker retry; the
//! whole pipeline fails fast.

use crate::pipeline::catalog::StageCatalog;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::executor::run_segment;
use crate::pipeline::segment::Segment;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Delay between a failure report and the shutdown flag, letting the failing
/// worker's log file drain.
const FLUSH_GRACE: Duration = Duration::from_millis(200);

/// Out-of-band message a worker sends when its run fails.
#[derive(Debug)]
pub enum WorkerEvent {
    Failed {
        worker_id: String,
        log_file: PathBuf,
        message: String,
    },
}

/// The first worker failure observed during a run.
#[derive(Debug, Clone)]
pub struct WorkerFailure {
    pub worker_id: String,
    pub log_file: PathBuf,
}

impl WorkerFailure {
    pub fn into_error(self) -> PipelineError {
        PipelineError::WorkerFailed {
            worker_id: self.worker_id,
            log_file: self.log_file.display().to_string(),
        }
    }
}

pub struct Supervisor {
    running: Arc<AtomicBool>,
    ctrl_tx: Option<Sender<WorkerEvent>>,
    workers: Vec<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
    failure: Arc<Mutex<Option<WorkerFailure>>>,
    log_dir: PathBuf,
    module: String,
}

impl Supervisor {
    pub fn new(running: Arc<AtomicBool>, log_dir: PathBuf, module: String) -> Self {
        let (ctrl_tx, ctrl_rx) = unbounded();
        let failure = Arc::new(Mutex::new(None));
        let monitor = std::thread::spawn({
            let failure = Arc::clone(&failure);
            let running = Arc::clone(&running);
            move || monitor(ctrl_rx, failure, running)
        });
        Self {
            running,
            ctrl_tx: Some(ctrl_tx),
            workers: Vec::new(),
            monitor: Some(monitor),
            failure,
            log_dir,
            module,
        }
    }

    /// Launch one worker thread driving `segment` to completion, with its
    /// diagnostics redirected to `pipeline_<module>_<worker_id>.log`.
    pub fn spawn_worker(
        &mut self,
        segment: Segment,
        catalog: Arc<StageCatalog>,
        worker_id: String,
    ) -> PipelineResult<()> {
        let ctrl_tx = match &self.ctrl_tx {
            Some(tx) => tx.clone(),
            None => {
                return Err(PipelineError::Spec(
                    "supervisor already finished".to_string(),
                ))
            }
        };
        let file_name = format!("pipeline_{}_{}.log", self.module, worker_id);
        let log_dir = self.log_dir.clone();
        let log_file = log_dir.join(&file_name);
        let handle = std::thread::Builder::new()
            .name(worker_id.clone())
            .spawn(move || {
                let appender = tracing_appender::rolling::never(&log_dir, &file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let subscriber = tracing_subscriber::fmt()
                    .with_writer(writer)
                    .with_ansi(false)
                    .finish();
                // scope all tracing from this thread to the worker's own log
                tracing::subscriber::with_default(subscriber, || {
                    tracing::info!(worker = %worker_id, "worker started");
                    match run_segment(&segment, &catalog, &worker_id) {
                        Ok(()) => tracing::info!(worker = %worker_id, "worker finished"),
                        Err(error) => {
                            tracing::error!(worker = %worker_id, %error, "worker failed");
                            let _ = ctrl_tx.send(WorkerEvent::Failed {
                                worker_id: worker_id.clone(),
                                log_file,
                                message: error.to_string(),
                            });
                        }
                    }
                });
                drop(guard);
            })?;
        self.workers.push(handle);
        Ok(())
    }

    /// Trigger the emergency shutdown flag directly (master-side failures).
    pub fn abort(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Join every spawned worker, stop the monitor, and report the first
    /// recorded failure, if any.
    pub fn finish(mut self) -> Option<WorkerFailure> {
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        // dropping the last control sender disconnects the monitor's loop
        self.ctrl_tx.take();
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.join();
        }
        self.failure.lock().ok().and_then(|mut slot| slot.take())
    }
}

fn monitor(
    ctrl_rx: Receiver<WorkerEvent>,
    failure: Arc<Mutex<Option<WorkerFailure>>>,
    running: Arc<AtomicBool>,
) {
    while let Ok(event) = ctrl_rx.recv() {
        let WorkerEvent::Failed {
            worker_id,
            log_file,
            message,
        } = event;
        let first = match failure.lock() {
            Ok(mut slot) => {
                if slot.is_none() {
                    *slot = Some(WorkerFailure {
                        worker_id: worker_id.clone(),
                        log_file,
                    });
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        };
        if first {
            tracing::error!(
                worker = %worker_id,
                %message,
                "worker failure reported, performing emergency shutdown"
            );
            std::thread::sleep(FLUSH_GRACE);
            running.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::catalog::builtin_catalog;
    use crate::pipeline::spec::{ParamMap, StageSpec};
    use crate::pipeline::stage::Stage;
    use serde_json::json;

    /// Sink that always fails its run.
    struct Explode;

    impl Stage for Explode {
        fn label(&self) -> &'static str {
            "Explode"
        }
        fn drive(&mut self) -> PipelineResult<()> {
            Err(PipelineError::Spec("synthetic worker failure".to_string()))
        }
    }

    fn catalog_with_explode() -> Arc<StageCatalog> {
        let mut catalog = builtin_catalog();
        catalog.register("Explode", |_params, _ctx| Ok(Box::new(Explode)));
        Arc::new(catalog)
    }

    #[test]
    fn test_worker_failure_triggers_shutdown_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let mut supervisor = Supervisor::new(
            running.clone(),
            dir.path().to_path_buf(),
            "demo".to_string(),
        );

        let segment = Segment::from_specs(&[StageSpec::bare("Explode")]);
        supervisor
            .spawn_worker(segment, catalog_with_explode(), "segment_0_worker_0".to_string())
            .unwrap();

        let failure = supervisor.finish().expect("failure must be recorded");
        assert_eq!(failure.worker_id, "segment_0_worker_0");
        assert!(!running.load(Ordering::Relaxed));

        let log_file = dir.path().join("pipeline_demo_segment_0_worker_0.log");
        assert!(log_file.exists());
        let log = std::fs::read_to_string(log_file).unwrap();
        assert!(log.contains("worker failed"));
    }

    #[test]
    fn test_clean_worker_leaves_flag_set() {
        let dir = tempfile::tempdir().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let mut supervisor = Supervisor::new(
            running.clone(),
            dir.path().to_path_buf(),
            "demo".to_string(),
        );

        let specs = vec![
            StageSpec::new(
                "SyntheticReader",
                ParamMap::from_value(json!({"n_frames": 3})).unwrap(),
            ),
            StageSpec::bare("NullWriter"),
        ];
        supervisor
            .spawn_worker(
                Segment::from_specs(&specs),
                Arc::new(builtin_catalog()),
                "segment_0_worker_0".to_string(),
            )
            .unwrap();
        assert_eq!(supervisor.worker_count(), 1);

        assert!(supervisor.finish().is_none());
        assert!(running.load(Ordering::Relaxed));
    }
}
