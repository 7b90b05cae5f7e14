use domain::DomainError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Inner {
    sender: mpsc::UnboundedSender<Task>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Single-worker FIFO executor for all hardware I/O.
///
/// Tasks run strictly one at a time in submission order, each to
/// completion. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<Inner>,
}

impl SerialQueue {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(Self::run(receiver, shutdown.clone()));
        Self {
            inner: Arc::new(Inner {
                sender,
                shutdown,
                worker: Mutex::new(Some(worker)),
            }),
        }
    }

    async fn run(mut receiver: mpsc::UnboundedReceiver<Task>, shutdown: CancellationToken) {
        info!("🧵 Serial queue worker started");
        let mut executed: u64 = 0;
        loop {
            let task = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                task = receiver.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            // Run on its own task so a panic stays contained
            if let Err(e) = tokio::spawn(task).await {
                error!("Queued task aborted: {}", e);
            }
            executed += 1;
        }

        receiver.close();
        let mut dropped = 0;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        info!(executed, dropped, "🛑 Serial queue worker stopped");
    }

    /// Append a task. Returns immediately; fails once the queue is stopped.
    pub fn submit<F>(&self, task: F) -> Result<(), DomainError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_stopped() {
            return Err(DomainError::NotAvailable("queue stopped".to_string()));
        }
        self.inner
            .sender
            .send(Box::pin(task))
            .map_err(|_| DomainError::NotAvailable("queue stopped".to_string()))
    }

    /// Halt the worker after the in-flight task and drop everything pending.
    /// Also cancels every token handed out by `child_token`.
    pub fn stop(&self) {
        if !self.inner.shutdown.is_cancelled() {
            debug!("Stopping serial queue");
        }
        self.inner.shutdown.cancel();
    }

    /// Run everything submitted so far, then stop and wait for the worker
    /// to exit. A task already queued that stops the queue ends it sooner.
    pub async fn shutdown(&self) {
        let queue = self.clone();
        if self.submit(async move { queue.stop() }).is_err() {
            debug!("Serial queue already stopped");
        }
        let worker = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Serial queue worker failed: {}", e);
            }
        }
    }

    /// Token cancelled when the queue stops
    pub fn child_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}
