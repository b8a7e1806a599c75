//! Background snapshot polling.
//!
//! The worker thread owns the [`SnapshotSource`] and pushes results over a channel. The UI
//! drains the channel once per frame and keeps only the newest snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fleet_map::entity::FleetSnapshot;
use fleet_map::source::{SnapshotSource, SourceError};

/// Upper bound on how long the worker sleeps before checking for shutdown.
const STOP_CHECK_STEP: Duration = Duration::from_millis(50);

#[derive(Debug)]
enum WorkerMessage {
    Snapshot(FleetSnapshot),
    Failed(String),
    Exhausted,
}

/// Everything received since the previous poll.
#[derive(Debug, Default)]
pub struct WorkerPoll {
    pub latest: Option<FleetSnapshot>,
    /// Snapshots dropped because a newer one arrived in the same poll.
    pub superseded: usize,
    pub errors: Vec<String>,
    pub exhausted: bool,
}

pub struct SnapshotWorker {
    receiver: Receiver<WorkerMessage>,
    stop: Arc<AtomicBool>,
}

impl SnapshotWorker {
    /// Start polling `source` every `interval`. `wake` runs after each message is queued.
    pub fn spawn<W>(source: Box<dyn SnapshotSource>, interval: Duration, wake: W) -> Self
    where
        W: Fn() + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        thread::spawn(move || run(source, interval, sender, thread_stop, wake));
        Self { receiver, stop }
    }

    pub fn poll(&self) -> WorkerPoll {
        let mut poll = WorkerPoll::default();
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                WorkerMessage::Snapshot(snapshot) => {
                    if poll.latest.replace(snapshot).is_some() {
                        poll.superseded += 1;
                    }
                }
                WorkerMessage::Failed(error) => poll.errors.push(error),
                WorkerMessage::Exhausted => poll.exhausted = true,
            }
        }
        poll
    }
}

impl Drop for SnapshotWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn run<W: Fn()>(
    mut source: Box<dyn SnapshotSource>,
    interval: Duration,
    sender: Sender<WorkerMessage>,
    stop: Arc<AtomicBool>,
    wake: W,
) {
    while !stop.load(Ordering::Relaxed) {
        let message = match source.fetch() {
            Ok(snapshot) => WorkerMessage::Snapshot(snapshot),
            Err(SourceError::Exhausted) => WorkerMessage::Exhausted,
            Err(error) => {
                tracing::warn!(target: "fleet_map::source", %error, "snapshot.fetch_failed");
                WorkerMessage::Failed(error.to_string())
            }
        };
        let done = matches!(message, WorkerMessage::Exhausted);
        if sender.send(message).is_err() {
            return;
        }
        wake();
        if done {
            tracing::info!(target: "fleet_map::source", "snapshot.source_exhausted");
            return;
        }

        let deadline = Instant::now() + interval;
        while !stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(STOP_CHECK_STEP));
        }
    }
}
