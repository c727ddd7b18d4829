//! The task distributor: the only surface the web layer talks to.

use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::failover::{FailoverPolicy, Mode};
use crate::mock::MockBroker;
use crate::sqs::SqsBroker;
use crate::{BrokerError, QueueStats, Task, TaskBroker, TaskKind, TaskMix};

/// Queue size at or below which `random_task` triggers a refill.
pub const LOW_WATER_MARK: u64 = 2;

/// Number of items enqueued by a low-water refill.
pub const REFILL_BATCH: usize = 10;

/// Default batch size for an explicit `fill_task` from the admin surface.
pub const DEFAULT_FILL: usize = 400;

/// Sentinel id and receipt handle on a synthesized task.
const SYNTHETIC_MARKER: &str = "mock";

/// Hands out study tasks from SQS, degrading permanently to an in-process
/// mock broker on the first operational failure.
///
/// Every public method contains its own failures: a broker outage never
/// reaches a participant as an error. `random_task` always produces a task
/// and `finish_task` always reports success.
pub struct TaskDistributor {
    remote: Option<Box<dyn TaskBroker>>,
    mock: MockBroker,
    failover: FailoverPolicy,
}

impl TaskDistributor {
    /// Build a distributor from configuration.
    ///
    /// `force_mock` pins the instance to the mock broker. Otherwise the SQS
    /// connection is probed once; a failed probe logs a warning and starts
    /// the instance degraded. Construction itself never fails.
    pub async fn connect(config: QueueConfig) -> Self {
        if config.force_mock {
            info!("Mock broker forced by configuration");
            return Self::from_parts(None, Mode::Degraded);
        }

        match SqsBroker::connect(&config).await {
            Ok(remote) => {
                info!(queue_url = %config.queue_url, "Task distributor connected to SQS");
                Self::from_parts(Some(Box::new(remote)), Mode::Normal)
            }
            Err(err) => {
                warn!(error = %err, "SQS connection failed, starting on mock broker");
                Self::from_parts(None, Mode::Degraded)
            }
        }
    }

    fn from_parts(remote: Option<Box<dyn TaskBroker>>, initial: Mode) -> Self {
        Self {
            remote,
            mock: MockBroker::new(),
            failover: FailoverPolicy::new(initial),
        }
    }

    /// Current operating mode. Degraded is permanent for this instance.
    pub fn mode(&self) -> Mode {
        self.failover.mode()
    }

    fn active(&self) -> &dyn TaskBroker {
        match &self.remote {
            Some(remote) if !self.failover.mode().is_degraded() => remote.as_ref(),
            _ => &self.mock,
        }
    }

    fn degrade(&self, operation: &str, err: &BrokerError) {
        warn!(operation, error = %err, "Broker call failed, degrading to mock broker");
        self.failover.record_failure();
    }

    /// Hand out one task, exclusively, to the caller.
    ///
    /// Refills the remote queue when it runs low. If no item can be received
    /// even then, a task with a uniformly random category and sentinel ids is
    /// synthesized: the caller is never blocked for lack of queued work.
    pub async fn random_task(&self) -> Task {
        // Keep the shared remote queue stocked for concurrent participants.
        // The mock broker synthesizes on empty instead, so it drains to
        // exactly what explicit fills put in.
        if !self.failover.mode().is_degraded() && self.queue_size().await <= LOW_WATER_MARK {
            self.fill_task(REFILL_BATCH).await;
        }

        match self.active().receive_one().await {
            Ok(Some(delivery)) => delivery.into(),
            Ok(None) => Self::synthesize(),
            Err(err) => {
                self.degrade("receive_one", &err);
                match self.mock.receive_one().await {
                    Ok(Some(delivery)) => delivery.into(),
                    _ => Self::synthesize(),
                }
            }
        }
    }

    fn synthesize() -> Task {
        let task_name = TaskKind::random();
        debug!(task = %task_name, "Queue empty, synthesizing task");
        Task {
            message_id: SYNTHETIC_MARKER.to_string(),
            receipt_handle: SYNTHETIC_MARKER.to_string(),
            task_name,
        }
    }

    /// Retire a completed task. Always reports success.
    ///
    /// A stale or foreign receipt handle means the delivery is already gone,
    /// so it is treated as completed. Any other failure degrades the
    /// instance; the participant's flow is never interrupted over it.
    pub async fn finish_task(&self, task: &Task) -> bool {
        match self
            .active()
            .delete(&task.message_id, &task.receipt_handle)
            .await
        {
            Ok(()) => true,
            Err(BrokerError::InvalidHandle(reason)) => {
                warn!(
                    message_id = %task.message_id,
                    reason = %reason,
                    "Invalid receipt handle, treating task as already completed"
                );
                true
            }
            Err(err) => {
                self.degrade("delete", &err);
                true
            }
        }
    }

    /// Enqueue `count` items, alternating categories by parity of a 1-based
    /// counter. On a broker error the rest of the batch, failed item
    /// included, goes to the mock broker and the instance degrades.
    pub async fn fill_task(&self, count: usize) {
        for i in 1..=count {
            if let Err(err) = self.active().enqueue(Self::parity_kind(i)).await {
                self.degrade("enqueue", &err);
                for j in i..=count {
                    let _ = self.mock.enqueue(Self::parity_kind(j)).await;
                }
                return;
            }
        }
        debug!(count, "Filled task queue");
    }

    fn parity_kind(index: usize) -> TaskKind {
        if index % 2 == 0 {
            TaskKind::ALL[0]
        } else {
            TaskKind::ALL[1]
        }
    }

    /// Enqueue an explicitly imbalanced population: the requested number of
    /// items per category, in uniformly shuffled order.
    pub async fn fill_task_imbalance(&self, mix: TaskMix) {
        use rand::seq::SliceRandom;

        let mut batch = Vec::with_capacity((mix.creative + mix.practical) as usize);
        batch.extend(std::iter::repeat(TaskKind::Creative).take(mix.creative as usize));
        batch.extend(std::iter::repeat(TaskKind::Practical).take(mix.practical as usize));
        batch.shuffle(&mut rand::thread_rng());

        for (i, kind) in batch.iter().enumerate() {
            if let Err(err) = self.active().enqueue(*kind).await {
                self.degrade("enqueue", &err);
                for kind in &batch[i..] {
                    let _ = self.mock.enqueue(*kind).await;
                }
                return;
            }
        }
        debug!(
            creative = mix.creative,
            practical = mix.practical,
            "Filled imbalanced task queue"
        );
    }

    /// Purge every queued item from the active broker.
    pub async fn clear_queue(&self) {
        if let Err(err) = self.active().purge().await {
            self.degrade("purge", &err);
            let _ = self.mock.purge().await;
        }
    }

    /// Approximate queue size. Exact when running on the mock broker.
    pub async fn queue_size(&self) -> u64 {
        match self.active().approximate_size().await {
            Ok(size) => size,
            Err(err) => {
                self.degrade("approximate_size", &err);
                self.mock.approximate_size().await.unwrap_or(0)
            }
        }
    }

    /// Refresh and return the queue counters.
    ///
    /// A failed stats refresh is a consistency warning, not an operational
    /// failure: mock-derived stats are returned and the mode is untouched.
    pub async fn queue_attributes(&self) -> QueueStats {
        match self.active().attributes().await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "Stats refresh failed, reporting mock-derived stats");
                self.mock.attributes().await.unwrap_or_default()
            }
        }
    }
}
