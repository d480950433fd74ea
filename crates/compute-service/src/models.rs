//! Wire models for the compute-service HTTP API and its outbound
//! notifications.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// System configuration fetched from the config service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub weights_data_key: String,
}

/// Worker state reported to the heartbeat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeState {
    Offline,
    Idle,
    Busy,
    Error,
}

/// Status update body sent to the heartbeat service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeStatus {
    pub status: ComputeState,
    #[serde(rename = "lastUpdated")]
    pub last_updated: u64,
}

/// Response to a status or completion notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub message: String,
    pub config: Option<SystemConfig>,
}

/// Request to schedule one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecutionRequest {
    pub execution_id: String,
    pub task_id: String,
    pub task_storage_key: String,
    #[serde(default)]
    pub input_storage_keys: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl TaskExecutionRequest {
    /// Every parameter must be an absolute URL.
    pub fn validate(&self) -> Result<(), ServiceError> {
        for url in &self.parameters {
            reqwest::Url::parse(url).map_err(|e| {
                ServiceError::InvalidRequest(format!("invalid URL {}: {}", url, e))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskScheduledData {
    pub execution_id: String,
    pub task_id: String,
    pub scheduled_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskScheduledResponse {
    pub success: bool,
    pub message: String,
    pub data: TaskScheduledData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

/// Terminal result of one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeResult {
    pub execution_id: String,
    pub task_id: String,
    pub tensor_urls: Vec<String>,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComputeResult {
    pub fn success(execution_id: &str, task_id: &str, tensor_urls: Vec<String>) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            task_id: task_id.to_string(),
            tensor_urls,
            status: ExecutionStatus::Success,
            error: None,
        }
    }

    pub fn failure(execution_id: &str, task_id: &str, error: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            task_id: task_id.to_string(),
            tensor_urls: Vec::new(),
            status: ExecutionStatus::Failure,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub uptime: u64,
    pub version: String,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub success: bool,
    pub message: String,
    pub health: HealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveExecutionsResponse {
    pub success: bool,
    pub message: String,
    pub data: HashMap<String, String>,
}
