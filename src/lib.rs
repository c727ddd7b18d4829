//! Task distribution queue for the study backend.
//!
//! Participants are handed one of two task categories (CREATIVE or PRACTICAL)
//! drawn from an SQS queue. When the queue runs low it is refilled; when SQS
//! is unreachable the distributor degrades to an in-process mock broker
//! without the caller noticing. The web layer only ever sees two operations:
//! "give me a task" ([`TaskDistributor::random_task`]) and "I finished this
//! task" ([`TaskDistributor::finish_task`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod distributor;
pub mod error;
pub mod failover;
pub mod logging;
pub mod mock;
pub mod sqs;

pub use config::QueueConfig;
pub use distributor::TaskDistributor;
pub use error::BrokerError;
pub use failover::Mode;

pub type Result<T> = std::result::Result<T, BrokerError>;

/// The two study task categories.
///
/// Ordering of [`TaskKind::ALL`] matters: `fill_task` assigns categories by
/// parity of a 1-based counter (even index -> `ALL[0]`, odd -> `ALL[1]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Creative,
    Practical,
}

impl TaskKind {
    pub const ALL: [TaskKind; 2] = [TaskKind::Creative, TaskKind::Practical];

    /// Uniformly random category, used when a task must be synthesized.
    pub fn random() -> Self {
        if rand::random::<bool>() {
            TaskKind::Creative
        } else {
            TaskKind::Practical
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Creative => write!(f, "CREATIVE"),
            TaskKind::Practical => write!(f, "PRACTICAL"),
        }
    }
}

/// A task assignment handed to the web layer.
///
/// `message_id` + `receipt_handle` identify one in-flight delivery; the
/// handle must come back unchanged in `finish_task` to retire that delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub message_id: String,
    pub receipt_handle: String,
    pub task_name: TaskKind,
}

/// One delivery received from a broker.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub receipt_handle: String,
    pub kind: TaskKind,
}

impl From<Delivery> for Task {
    fn from(delivery: Delivery) -> Self {
        Task {
            message_id: delivery.message_id,
            receipt_handle: delivery.receipt_handle,
            task_name: delivery.kind,
        }
    }
}

/// Queued item body on the wire: `{"task": "CREATIVE"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBody {
    pub task: TaskKind,
}

/// Category counts for `fill_task_imbalance`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TaskMix {
    #[serde(rename = "CREATIVE")]
    pub creative: u32,
    #[serde(rename = "PRACTICAL")]
    pub practical: u32,
}

/// Best-effort queue counters.
///
/// SQS counts are eventually consistent; the mock broker reports exact
/// values with zero in-flight and delayed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub approx_visible: u64,
    pub approx_in_flight: u64,
    pub approx_delayed: u64,
}

/// One queue backend: the real SQS adapter or the in-process mock.
///
/// Exclusivity of a received item against other receivers is the broker's
/// job (SQS visibility timeout, or the mock's lock), never the caller's.
#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Enqueue one item of the given category.
    async fn enqueue(&self, kind: TaskKind) -> Result<()>;

    /// Receive at most one item. `Ok(None)` means the queue looked empty.
    async fn receive_one(&self) -> Result<Option<Delivery>>;

    /// Delete the delivery identified by `message_id` + `receipt_handle`.
    async fn delete(&self, message_id: &str, receipt_handle: &str) -> Result<()>;

    /// Remove every queued item.
    async fn purge(&self) -> Result<()>;

    /// Approximate number of visible items.
    async fn approximate_size(&self) -> Result<u64>;

    /// Refresh and return the queue counters.
    async fn attributes(&self) -> Result<QueueStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_kind_wire_form() {
        assert_eq!(
            serde_json::to_string(&TaskBody { task: TaskKind::Creative }).unwrap(),
            r#"{"task":"CREATIVE"}"#
        );
        let body: TaskBody = serde_json::from_str(r#"{"task":"PRACTICAL"}"#).unwrap();
        assert_eq!(body.task, TaskKind::Practical);
    }

    #[test]
    fn task_serializes_for_web_layer() {
        let task = Task {
            message_id: "m-1".to_string(),
            receipt_handle: "r-1".to_string(),
            task_name: TaskKind::Practical,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["message_id"], "m-1");
        assert_eq!(json["receipt_handle"], "r-1");
        assert_eq!(json["task_name"], "PRACTICAL");
    }

    #[test]
    fn task_mix_uses_category_keys() {
        let mix: TaskMix = serde_json::from_str(r#"{"CREATIVE":3,"PRACTICAL":2}"#).unwrap();
        assert_eq!(mix.creative, 3);
        assert_eq!(mix.practical, 2);
    }
}
