//! AWS SQS adapter: the remote side of the broker capability.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::config::Credentials;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::QueueConfig;
use crate::{BrokerError, Delivery, QueueStats, Result, TaskBody, TaskBroker, TaskKind};

/// SQS-backed task broker.
///
/// Exclusivity of deliveries across concurrent receivers comes from the SQS
/// visibility timeout; this adapter only translates calls and errors.
pub struct SqsBroker {
    client: Client,
    queue_url: String,
    op_deadline: Duration,
}

impl SqsBroker {
    /// Deadline applied to every SQS call. Callers are study participants
    /// waiting on an HTTP response, so a hung call must fail fast and let
    /// the distributor degrade.
    pub const DEFAULT_OP_DEADLINE: Duration = Duration::from_secs(5);

    /// Build a client from static credentials and verify connectivity with
    /// one `get_queue_attributes` round trip.
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "study-queue",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let broker = Self {
            client: Client::new(&sdk_config),
            queue_url: config.queue_url.clone(),
            op_deadline: Self::DEFAULT_OP_DEADLINE,
        };

        // Connectivity probe; a queue we cannot describe is a config problem.
        broker
            .attributes()
            .await
            .map_err(|e| BrokerError::Config(e.to_string()))?;

        debug!(queue_url = %broker.queue_url, "Connected to SQS queue");
        Ok(broker)
    }

    pub fn with_op_deadline(mut self, deadline: Duration) -> Self {
        self.op_deadline = deadline;
        self
    }

    /// Run one SQS call under the operation deadline.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, BrokerError>>,
    {
        tokio::time::timeout(self.op_deadline, fut)
            .await
            .map_err(|_| BrokerError::Operational(format!("{operation} timed out")))?
    }
}

#[async_trait]
impl TaskBroker for SqsBroker {
    async fn enqueue(&self, kind: TaskKind) -> Result<()> {
        let body = serde_json::to_string(&TaskBody { task: kind })?;

        self.bounded("send_message", async {
            self.client
                .send_message()
                .queue_url(&self.queue_url)
                .message_body(body)
                .send()
                .await
                .map_err(|e| BrokerError::Operational(e.to_string()))
        })
        .await?;

        debug!(task = %kind, "Enqueued task to SQS");
        Ok(())
    }

    async fn receive_one(&self) -> Result<Option<Delivery>> {
        let result = self
            .bounded("receive_message", async {
                self.client
                    .receive_message()
                    .queue_url(&self.queue_url)
                    .max_number_of_messages(1)
                    .send()
                    .await
                    .map_err(|e| BrokerError::Operational(e.to_string()))
            })
            .await?;

        let Some(message) = result.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        let body = message
            .body()
            .ok_or_else(|| BrokerError::Operational("message body is empty".to_string()))?;
        let parsed: TaskBody = serde_json::from_str(body)?;

        let receipt_handle = message
            .receipt_handle()
            .ok_or_else(|| BrokerError::Operational("missing receipt handle".to_string()))?
            .to_string();
        let message_id = message
            .message_id()
            .ok_or_else(|| BrokerError::Operational("missing message id".to_string()))?
            .to_string();

        debug!(message_id = %message_id, task = %parsed.task, "Received task from SQS");
        Ok(Some(Delivery {
            message_id,
            receipt_handle,
            kind: parsed.task,
        }))
    }

    async fn delete(&self, message_id: &str, receipt_handle: &str) -> Result<()> {
        self.bounded("delete_message", async {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt_handle)
                .send()
                .await
                .map_err(|e| {
                    let service_error = e.into_service_error();
                    if service_error.is_receipt_handle_is_invalid() {
                        BrokerError::InvalidHandle(service_error.to_string())
                    } else {
                        BrokerError::Operational(service_error.to_string())
                    }
                })
        })
        .await?;

        debug!(message_id = %message_id, "Deleted task from SQS");
        Ok(())
    }

    async fn purge(&self) -> Result<()> {
        self.bounded("purge_queue", async {
            self.client
                .purge_queue()
                .queue_url(&self.queue_url)
                .send()
                .await
                .map_err(|e| BrokerError::Operational(e.to_string()))
        })
        .await?;

        debug!(queue_url = %self.queue_url, "Purged SQS queue");
        Ok(())
    }

    async fn approximate_size(&self) -> Result<u64> {
        Ok(self.attributes().await?.approx_visible)
    }

    async fn attributes(&self) -> Result<QueueStats> {
        let result = self
            .bounded("get_queue_attributes", async {
                self.client
                    .get_queue_attributes()
                    .queue_url(&self.queue_url)
                    .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
                    .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
                    .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesDelayed)
                    .send()
                    .await
                    .map_err(|e| BrokerError::Operational(e.to_string()))
            })
            .await?;

        let attributes = result.attributes();
        let count = |name: QueueAttributeName| {
            attributes
                .and_then(|attrs| attrs.get(&name))
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };

        Ok(QueueStats {
            approx_visible: count(QueueAttributeName::ApproximateNumberOfMessages),
            approx_in_flight: count(QueueAttributeName::ApproximateNumberOfMessagesNotVisible),
            approx_delayed: count(QueueAttributeName::ApproximateNumberOfMessagesDelayed),
        })
    }
}
