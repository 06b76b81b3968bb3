//! Broadcast Dispatcher
//!
//! A bounded job queue drained by a fixed pool of worker tasks. Each job is
//! one payload headed for one connection.
//!
//! Enqueueing never waits: when the queue is full the job is dropped and
//! counted. Workers share a single receiver, so two jobs for the same
//! connection may be picked up by different workers and complete out of
//! enqueue order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::connection::Connection;
use super::messages::OutboundFrame;
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

/// Default number of pending jobs the queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// One payload paired with its target connection.
pub struct BroadcastJob {
    pub payload: Arc<OutboundFrame>,
    pub connection: Arc<dyn Connection>,
}

impl BroadcastJob {
    pub fn new(payload: Arc<OutboundFrame>, connection: Arc<dyn Connection>) -> Self {
        Self {
            payload,
            connection,
        }
    }
}

/// Bounded queue plus worker pool.
pub struct Dispatcher {
    sender: RwLock<Option<mpsc::Sender<BroadcastJob>>>,
    receiver: Arc<Mutex<mpsc::Receiver<BroadcastJob>>>,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    dropped: AtomicU64,
    capacity: usize,
}

impl Dispatcher {
    /// Create a dispatcher whose queue holds `capacity` pending jobs.
    ///
    /// No worker runs until [`Dispatcher::start`] is called.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            sender: RwLock::new(Some(tx)),
            receiver: Arc::new(Mutex::new(rx)),
            workers: parking_lot::Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Spawn `count` workers on the current runtime.
    pub fn start(&self, count: usize) {
        let mut workers = self.workers.lock();
        for worker_id in 0..count.max(1) {
            let receiver = self.receiver.clone();
            workers.push(tokio::spawn(run_worker(worker_id, receiver)));
        }
        tracing::info!(
            workers = workers.len(),
            capacity = self.capacity,
            "Broadcast dispatcher started"
        );
    }

    /// Queue a job without waiting.
    ///
    /// A full queue drops the job, bumps the drop counter and returns
    /// [`GatewayError::QueueFull`].
    pub fn enqueue(&self, job: BroadcastJob) -> Result<(), GatewayError> {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(GatewayError::DispatcherClosed);
        };

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_broadcast_job("dropped");
                tracing::warn!(
                    connection_id = %job.connection.id(),
                    user_id = %job.connection.user_id(),
                    kind = job.payload.kind(),
                    "Broadcast queue full, dropping job"
                );
                Err(GatewayError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(GatewayError::DispatcherClosed),
        }
    }

    /// Jobs dropped because the queue was full.
    pub fn dropped_jobs(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Close the queue and wait for the workers to drain it and exit.
    pub async fn shutdown(&self) {
        if self.sender.write().take().is_none() {
            return;
        }

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Broadcast worker panicked");
            }
        }
        tracing::info!(dropped = self.dropped_jobs(), "Broadcast dispatcher stopped");
    }
}

async fn run_worker(worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<BroadcastJob>>>) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(job) = job else {
            break;
        };

        match job.connection.send(&job.payload).await {
            Ok(()) => {
                metrics::record_broadcast_job("sent");
                tracing::trace!(
                    worker_id,
                    connection_id = %job.connection.id(),
                    kind = job.payload.kind(),
                    "Broadcast job sent"
                );
            }
            Err(e) => {
                metrics::record_broadcast_job("failed");
                tracing::warn!(
                    worker_id,
                    connection_id = %job.connection.id(),
                    user_id = %job.connection.user_id(),
                    error = %e,
                    "Broadcast send failed"
                );
            }
        }
    }

    tracing::debug!(worker_id, "Broadcast worker exiting");
}
