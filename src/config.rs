//! Construction-time configuration for the distributor.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::BrokerError;

/// Queue connection settings, supplied once at distributor construction.
///
/// `force_mock` pins the distributor to the in-process mock broker from the
/// start, regardless of connectivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub queue_url: String,
    /// Endpoint override, for LocalStack or VPC endpoints. None uses the
    /// regional AWS endpoint.
    pub endpoint_url: Option<String>,
    pub force_mock: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: "us-east-1".to_string(),
            queue_url: String::new(),
            endpoint_url: None,
            force_mock: false,
        }
    }
}

impl QueueConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Reads `AWS_SQS_ACCESS_KEY_ID`, `AWS_SQS_SECRET_ACCESS_KEY`,
    /// `AWS_REGION`, `AWS_SQS_URL`, `AWS_SQS_ENDPOINT` and `USE_MOCK_SQS`
    /// ("true"/"1").
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("AWS_SQS_ACCESS_KEY_ID") {
            config.access_key_id = val;
        }
        if let Ok(val) = env::var("AWS_SQS_SECRET_ACCESS_KEY") {
            config.secret_access_key = val;
        }
        if let Ok(val) = env::var("AWS_REGION") {
            config.region = val;
        }
        if let Ok(val) = env::var("AWS_SQS_URL") {
            config.queue_url = val;
        }
        if let Ok(val) = env::var("AWS_SQS_ENDPOINT") {
            config.endpoint_url = Some(val);
        }
        if let Ok(val) = env::var("USE_MOCK_SQS") {
            config.force_mock = val.eq_ignore_ascii_case("true") || val == "1";
        }

        config
    }

    /// A mock-only configuration, for tests and local development.
    pub fn mock() -> Self {
        Self {
            force_mock: true,
            ..Self::default()
        }
    }

    /// Validate the settings needed to reach a real queue.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.force_mock {
            return Ok(());
        }
        if self.queue_url.is_empty() {
            return Err(BrokerError::Config("queue_url is empty".to_string()));
        }
        if self.region.is_empty() {
            return Err(BrokerError::Config("region is empty".to_string()));
        }
        Ok(())
    }
}
