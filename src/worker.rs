//! Mailbox between background workers and the notification loop.
//!
//! Many producers push without blocking; a single consumer drains the
//! queue once per outer tick. Overflow drops the message with a warning
//! rather than applying backpressure, since messages are informational.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A message destined for the outward notification sink.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerMessage {
    pub channel: Option<String>,
    pub body: String,
    pub attachments: Vec<(PathBuf, String)>,
}

impl WorkerMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            channel: None,
            body: body.into(),
            attachments: Vec::new(),
        }
    }
}

/// Producer handle, cheap to clone into worker tasks.
#[derive(Clone)]
pub struct WorkerSender {
    tx: mpsc::Sender<WorkerMessage>,
}

impl WorkerSender {
    /// Never blocks. A full or closed queue drops the message.
    pub fn push(&self, message: WorkerMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!("worker queue full, dropping message: {}", dropped.body);
            }
            Err(TrySendError::Closed(dropped)) => {
                tracing::warn!("worker queue closed, dropping message: {}", dropped.body);
            }
        }
    }
}

/// Single-consumer end of the mailbox.
pub struct WorkerQueue {
    tx: mpsc::Sender<WorkerMessage>,
    rx: mpsc::Receiver<WorkerMessage>,
}

impl WorkerQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx }
    }

    pub fn sender(&self) -> WorkerSender {
        WorkerSender {
            tx: self.tx.clone(),
        }
    }

    /// Take everything currently queued. Per-producer order is
    /// preserved; interleaving across producers is not.
    pub fn drain(&mut self) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// Admission guard allowing one background job of a kind at a time.
///
/// A second request while a job is in flight is rejected synchronously
/// rather than queued.
#[derive(Clone, Default)]
pub struct TaskSlot {
    busy: Arc<AtomicBool>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Spawn the job unless one is already running. Returns whether the
    /// job was accepted.
    pub fn try_spawn<F>(&self, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let busy = self.busy.clone();
        tokio::spawn(async move {
            job.await;
            busy.store(false, Ordering::Release);
        });
        true
    }
}
