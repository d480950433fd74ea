//! Runtime configuration fetched from the config service.
//!
//! The loaded value lives in a single snapshot cell: the loader replaces
//! the whole value atomically and readers clone the current reference, so
//! nobody ever observes a partial update.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use splitup_storage::{with_exponential_backoff, RetryPolicy};

use crate::error::ServiceError;
use crate::models::SystemConfig;

/// Shared snapshot of the most recently loaded configuration.
pub type SharedConfig = Arc<RwLock<Option<SystemConfig>>>;

pub struct ConfigService {
    client: reqwest::Client,
    config_url: String,
    shared: SharedConfig,
    retry: RetryPolicy,
}

impl ConfigService {
    pub fn new(config_url: String, shared: SharedConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        Ok(Self {
            client,
            config_url,
            shared,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch the configuration and publish it as the new snapshot.
    pub async fn load_config(&self) -> Result<SystemConfig, ServiceError> {
        info!("Loading configuration from {}", self.config_url);
        let config = with_exponential_backoff(
            || async {
                let response = self.client.get(&self.config_url).send().await?;
                if !response.status().is_success() {
                    return Err(ServiceError::Http(format!(
                        "status {} from {}",
                        response.status().as_u16(),
                        self.config_url
                    )));
                }
                Ok(response.json::<SystemConfig>().await?)
            },
            "fetch configuration",
            self.retry,
        )
        .await?;

        *self.shared.write().await = Some(config.clone());
        Ok(config)
    }
}
