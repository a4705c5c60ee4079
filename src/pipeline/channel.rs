//! Bounded channel shared by the two sides of a fork/join pair.
//!
//! The channel is the only mutable resource shared between workers. All
//! access goes through `put`/`get`; both wake periodically so a blocked
//! worker observes an emergency shutdown promptly instead of hanging.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::frame::Frame;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Max frames held by a boundary channel before `put` blocks (backpressure).
pub const CHANNEL_CAPACITY: usize = 32;

/// How long a blocking channel operation waits before re-checking the
/// shutdown flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Message crossing a parallel-region boundary.
///
/// `Sentinel` is the reserved end-of-stream marker, distinct from every
/// payload frame.
#[derive(Debug, Clone)]
pub enum Parcel {
    Frame(Frame),
    Sentinel,
}

/// Which side of a parallel-region marker a stage instance is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Upstream,
    Downstream,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Upstream => write!(f, "upstream"),
            Side::Downstream => write!(f, "downstream"),
        }
    }
}

/// Channel endpoints plus the metadata a fork/join instance needs.
///
/// Both sides (and every worker replica) hold clones; the channel lives as
/// long as any binding does.
#[derive(Clone)]
pub struct ChannelBinding {
    tx: Sender<Parcel>,
    rx: Receiver<Parcel>,
    pub side: Side,
    pub n_workers: usize,
    running: Arc<AtomicBool>,
}

impl ChannelBinding {
    /// Allocate the channel for one fork/join pair and return its two
    /// role-tagged bindings.
    pub fn new_pair(n_workers: usize, running: Arc<AtomicBool>) -> (Self, Self) {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let upstream = Self {
            tx: tx.clone(),
            rx: rx.clone(),
            side: Side::Upstream,
            n_workers,
            running: running.clone(),
        };
        let downstream = Self {
            tx,
            rx,
            side: Side::Downstream,
            n_workers,
            running,
        };
        (upstream, downstream)
    }

    /// Blocking put with backpressure; honors the shutdown flag while full.
    pub fn put(&self, parcel: Parcel) -> PipelineResult<()> {
        let mut parcel = parcel;
        loop {
            if !self.running.load(Ordering::Relaxed) {
                return Err(PipelineError::Aborted);
            }
            match self.tx.send_timeout(parcel, POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => parcel = returned,
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(PipelineError::ChannelDisconnected("consumer side"))
                }
            }
        }
    }

    /// Bounded-wait get; `Ok(None)` when the poll interval elapsed with no
    /// data, so the caller can re-check its termination condition.
    pub fn get(&self) -> PipelineResult<Option<Parcel>> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(PipelineError::Aborted);
        }
        match self.rx.recv_timeout(POLL_INTERVAL) {
            Ok(parcel) => Ok(Some(parcel)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(PipelineError::ChannelDisconnected("producer side"))
            }
        }
    }

    /// Frames currently queued; used by tests and diagnostics.
    pub fn queued(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n_workers: usize) -> (ChannelBinding, ChannelBinding, Arc<AtomicBool>) {
        let running = Arc::new(AtomicBool::new(true));
        let (up, down) = ChannelBinding::new_pair(n_workers, running.clone());
        (up, down, running)
    }

    #[test]
    fn test_roles_and_shared_channel() {
        let (up, down, _) = pair(3);
        assert_eq!(up.side, Side::Upstream);
        assert_eq!(down.side, Side::Downstream);
        assert_eq!(up.n_workers, 3);

        up.put(Parcel::Frame(Frame::new(0, vec![]))).unwrap();
        assert!(matches!(down.get().unwrap(), Some(Parcel::Frame(_))));
    }

    #[test]
    fn test_put_fills_to_capacity_then_aborts_on_shutdown() {
        let (up, _down, running) = pair(1);
        for i in 0..CHANNEL_CAPACITY {
            up.put(Parcel::Frame(Frame::new(i as u64, vec![]))).unwrap();
        }
        assert_eq!(up.queued(), CHANNEL_CAPACITY);

        // channel full and nobody consuming: the next put must not succeed,
        // and must return once the shutdown flag is cleared
        running.store(false, Ordering::Relaxed);
        assert!(matches!(up.put(Parcel::Sentinel), Err(PipelineError::Aborted)));
        assert_eq!(up.queued(), CHANNEL_CAPACITY);
    }

    #[test]
    fn test_get_times_out_without_data() {
        let (_up, down, _) = pair(1);
        assert!(down.get().unwrap().is_none());
    }
}
