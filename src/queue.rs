//! Bounded in-process worker pool for best-effort side effects.
//!
//! Request handlers never wait on these tasks: [`TaskSink::enqueue`] hands the task to a bounded
//! channel and returns immediately. Workers run the handler, log failures and keep the most recent
//! ones in a failure log so they can be inspected and reconciled.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::{
    sync::{Mutex as AsyncMutex, mpsc},
    task::JoinHandle,
};

use crate::models::{CreateEmailSubscriberEntity, OrderEntity, Product};

const FAILURE_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub enum Task {
    /// Adds a buyer of a free product to the creator's mailing list.
    UpsertSubscriber(CreateEmailSubscriberEntity),
    /// Confirmation email for an order that never touched the gateway.
    SendConfirmation { order: OrderEntity, product: Product },
    /// Post-settlement work: booking creation, download link and confirmation email.
    FulfilPaidOrder { order: OrderEntity },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpsertSubscriber(_) => "upsert_subscriber",
            Self::SendConfirmation { .. } => "send_confirmation",
            Self::FulfilPaidOrder { .. } => "fulfil_paid_order",
        }
    }
}

/// Where services drop fire-and-forget work.
pub trait TaskSink: Send + Sync {
    fn enqueue(&self, task: Task);
}

pub type TaskHandler = Arc<dyn Fn(Task) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct WorkerPool {
    tx: mpsc::Sender<Task>,
    failures: Arc<Mutex<VecDeque<TaskFailure>>>,
}

pub struct WorkerPoolHandle {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Waits for the workers to drain the queue. Only returns once every [`WorkerPool`] clone
    /// has been dropped.
    pub async fn shutdown(self) {
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

impl WorkerPool {
    pub fn start(workers: usize, capacity: usize, handler: TaskHandler) -> (Self, WorkerPoolHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let failures = Arc::new(Mutex::new(VecDeque::with_capacity(FAILURE_LOG_CAPACITY)));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                tokio::spawn(Self::run_worker(
                    worker_id,
                    rx.clone(),
                    handler.clone(),
                    failures.clone(),
                ))
            })
            .collect();

        (Self { tx, failures }, WorkerPoolHandle { workers })
    }

    /// Most recent task failures, oldest first.
    pub fn recent_failures(&self) -> Vec<TaskFailure> {
        match self.failures.lock() {
            Ok(failures) => failures.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    async fn run_worker(
        worker_id: usize,
        rx: Arc<AsyncMutex<mpsc::Receiver<Task>>>,
        handler: TaskHandler,
        failures: Arc<Mutex<VecDeque<TaskFailure>>>,
    ) {
        loop {
            // The receiver lock is released before the task runs.
            let task = { rx.lock().await.recv().await };
            let Some(task) = task else {
                break;
            };

            let name = task.name();
            if let Err(err) = handler(task).await {
                tracing::error!(worker_id, task = name, error = ?err, "Background task failed");
                record_failure(&failures, name, &err);
            }
        }
        tracing::debug!(worker_id, "Worker stopped");
    }
}

fn record_failure(failures: &Mutex<VecDeque<TaskFailure>>, task: &'static str, err: &anyhow::Error) {
    let mut failures = match failures.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if failures.len() == FAILURE_LOG_CAPACITY {
        failures.pop_front();
    }
    failures.push_back(TaskFailure {
        task,
        error: format!("{err:#}"),
        failed_at: Utc::now(),
    });
}

impl TaskSink for WorkerPool {
    fn enqueue(&self, task: Task) {
        let name = task.name();
        if let Err(err) = self.tx.try_send(task) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "queue closed",
            };
            tracing::error!(task = name, reason, "Dropped background task");
        }
    }
}
