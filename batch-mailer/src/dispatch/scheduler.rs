//! Batch scheduler.
//!
//! Rows are split into consecutive batches. Batches run one after another;
//! inside a batch a bounded pool of worker tasks pulls rows from a shared
//! queue and reports outcomes over a channel. The scheduler task is the only
//! consumer of that channel, so outcomes are handed to the caller one at a
//! time with no locking on the caller's side.

use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::types::DispatchOutcome;
use crate::data::RecipientRow;

/// Work performed for each row.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Per-worker state, created when a worker starts and dropped when it ends.
    type Worker: Default + Send;

    async fn dispatch(&self, worker: &mut Self::Worker, row: &RecipientRow) -> DispatchOutcome;
}

/// Throughput settings for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub max_workers: usize,
    /// Pause between consecutive batches.
    pub delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_workers: 10,
            delay: Duration::from_secs(6),
        }
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub rows: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    fn tally(&mut self, outcome: &DispatchOutcome) {
        self.rows += 1;
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Split `len` rows into consecutive ranges of at most `batch_size`.
pub fn partition(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

type RowQueue = Arc<Mutex<VecDeque<RecipientRow>>>;

/// Runs rows through a dispatcher batch by batch.
pub struct BatchScheduler<D: Dispatcher> {
    dispatcher: Arc<D>,
    settings: BatchSettings,
}

impl<D: Dispatcher> BatchScheduler<D> {
    pub fn new(dispatcher: D, settings: BatchSettings) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            settings,
        }
    }

    /// Dispatch every row exactly once.
    ///
    /// `on_outcome` is called once per row, in completion order. A failing
    /// row never stops its batch or the batches after it.
    pub async fn run<F>(&self, rows: Vec<RecipientRow>, mut on_outcome: F) -> RunSummary
    where
        F: FnMut(DispatchOutcome),
    {
        let batches = partition(rows.len(), self.settings.batch_size);
        let total_batches = batches.len();
        let mut summary = RunSummary {
            batches: total_batches,
            ..RunSummary::default()
        };

        info!(
            rows = rows.len(),
            batches = total_batches,
            batch_size = self.settings.batch_size,
            max_workers = self.settings.max_workers,
            delay_ms = self.settings.delay.as_millis() as u64,
            "scheduler_started"
        );

        let mut remaining = rows.into_iter();
        for (number, range) in batches.into_iter().enumerate() {
            let batch: Vec<RecipientRow> = remaining.by_ref().take(range.len()).collect();

            info!(
                batch = number + 1,
                batches = total_batches,
                size = batch.len(),
                "batch_started"
            );

            self.run_batch(batch, &mut on_outcome, &mut summary).await;

            info!(
                batch = number + 1,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "batch_completed"
            );

            if number + 1 < total_batches {
                info!(
                    delay_ms = self.settings.delay.as_millis() as u64,
                    "batch_pause"
                );
                sleep(self.settings.delay).await;
            }
        }

        info!(
            rows = summary.rows,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "scheduler_finished"
        );

        summary
    }

    async fn run_batch<F>(
        &self,
        batch: Vec<RecipientRow>,
        on_outcome: &mut F,
        summary: &mut RunSummary,
    ) where
        F: FnMut(DispatchOutcome),
    {
        if batch.is_empty() {
            return;
        }

        let mut pending: BTreeSet<usize> = batch.iter().map(RecipientRow::index).collect();
        let workers = self.settings.max_workers.max(1).min(batch.len());
        let queue: RowQueue = Arc::new(Mutex::new(batch.into()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let dispatcher = Arc::clone(&self.dispatcher);
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            pool.spawn(worker_loop(worker_id, dispatcher, queue, tx));
        }
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            if !pending.remove(&outcome.index) {
                warn!(index = outcome.index, "scheduler_unexpected_outcome");
                continue;
            }
            summary.tally(&outcome);
            on_outcome(outcome);
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker_task_failed");
            }
        }

        // A worker that died mid-row must not leave the row without an outcome.
        for index in pending {
            warn!(index = index, "scheduler_missing_outcome");
            let outcome = DispatchOutcome::failure(index, "Worker stopped before reporting an outcome");
            summary.tally(&outcome);
            on_outcome(outcome);
        }
    }
}

fn next_row(queue: &RowQueue) -> Option<RecipientRow> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

async fn worker_loop<D: Dispatcher>(
    worker_id: usize,
    dispatcher: Arc<D>,
    queue: RowQueue,
    tx: mpsc::UnboundedSender<DispatchOutcome>,
) {
    let mut state = D::Worker::default();
    let mut handled = 0usize;

    while let Some(row) = next_row(&queue) {
        let index = row.index();
        let result = AssertUnwindSafe(dispatcher.dispatch(&mut state, &row))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(worker = worker_id, index = index, reason = %reason, "dispatch_panicked");
                // The state may be half-updated; start the next row fresh.
                state = D::Worker::default();
                DispatchOutcome::failure(index, format!("Unexpected error: {reason}"))
            }
        };

        handled += 1;
        if tx.send(outcome).is_err() {
            break;
        }
    }

    info!(worker = worker_id, handled = handled, "worker_finished");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
