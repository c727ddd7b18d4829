//! In-process broker used when SQS is unreachable or explicitly disabled.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Delivery, QueueStats, Result, TaskBroker, TaskKind};

struct QueueItem {
    message_id: String,
    receipt_handle: String,
    kind: TaskKind,
}

/// FIFO list of queue items behind a single lock.
///
/// The lock is what gives concurrent callers the same exclusivity the SQS
/// visibility timeout gives them: a pop hands the item to exactly one
/// receiver. Counts are exact, unlike SQS.
pub struct MockBroker {
    items: Mutex<VecDeque<QueueItem>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn mock_id() -> String {
        format!("mock_{}", uuid::Uuid::new_v4())
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskBroker for MockBroker {
    async fn enqueue(&self, kind: TaskKind) -> Result<()> {
        let mut items = self.items.lock().await;
        items.push_back(QueueItem {
            message_id: Self::mock_id(),
            receipt_handle: Self::mock_id(),
            kind,
        });
        debug!(task = %kind, total = items.len(), "Enqueued mock task");
        Ok(())
    }

    async fn receive_one(&self) -> Result<Option<Delivery>> {
        let mut items = self.items.lock().await;
        Ok(items.pop_front().map(|item| Delivery {
            message_id: item.message_id,
            receipt_handle: item.receipt_handle,
            kind: item.kind,
        }))
    }

    async fn delete(&self, message_id: &str, _receipt_handle: &str) -> Result<()> {
        // The item left the list when it was received; deletion is a no-op.
        debug!(message_id = %message_id, "Mock task marked as finished");
        Ok(())
    }

    async fn purge(&self) -> Result<()> {
        self.items.lock().await.clear();
        info!("Mock queue cleared");
        Ok(())
    }

    async fn approximate_size(&self) -> Result<u64> {
        Ok(self.items.lock().await.len() as u64)
    }

    async fn attributes(&self) -> Result<QueueStats> {
        Ok(QueueStats {
            approx_visible: self.items.lock().await.len() as u64,
            approx_in_flight: 0,
            approx_delayed: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_and_receive_is_fifo() {
        let broker = MockBroker::new();
        broker.enqueue(TaskKind::Creative).await.unwrap();
        broker.enqueue(TaskKind::Practical).await.unwrap();

        let first = broker.receive_one().await.unwrap().unwrap();
        let second = broker.receive_one().await.unwrap().unwrap();
        assert_eq!(first.kind, TaskKind::Creative);
        assert_eq!(second.kind, TaskKind::Practical);
        assert!(broker.receive_one().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deliveries_get_distinct_handles() {
        let broker = MockBroker::new();
        broker.enqueue(TaskKind::Creative).await.unwrap();
        broker.enqueue(TaskKind::Creative).await.unwrap();

        let a = broker.receive_one().await.unwrap().unwrap();
        let b = broker.receive_one().await.unwrap().unwrap();
        assert_ne!(a.receipt_handle, b.receipt_handle);
        assert!(a.receipt_handle.starts_with("mock_"));
    }

    #[tokio::test]
    async fn delete_succeeds_for_any_handle() {
        let broker = MockBroker::new();
        broker.delete("no-such-id", "no-such-handle").await.unwrap();
    }

    #[tokio::test]
    async fn purge_empties_the_queue() {
        let broker = MockBroker::new();
        for _ in 0..5 {
            broker.enqueue(TaskKind::Practical).await.unwrap();
        }
        assert_eq!(broker.approximate_size().await.unwrap(), 5);

        broker.purge().await.unwrap();
        assert_eq!(broker.approximate_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn attributes_report_exact_counts() {
        let broker = MockBroker::new();
        broker.enqueue(TaskKind::Creative).await.unwrap();

        let stats = broker.attributes().await.unwrap();
        assert_eq!(stats.approx_visible, 1);
        assert_eq!(stats.approx_in_flight, 0);
        assert_eq!(stats.approx_delayed, 0);
    }
}
