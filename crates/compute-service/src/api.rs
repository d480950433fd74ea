//! HTTP API of the compute service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use crate::error::ServiceError;
use crate::models::{
    ActiveExecutionsResponse, BaseResponse, ComputeResult, ConfigResponse, ErrorResponse,
    HealthCheckResponse, HealthState, HealthStatus, TaskExecutionRequest, TaskScheduledResponse,
};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn not_found(message: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/task_execution", post(task_execution))
        .route("/execution/:execution_id/status", get(get_execution_status))
        .route("/execution/:execution_id/cancel", post(cancel_execution))
        .route("/executions/active", get(list_active_executions))
        .route("/load_config", post(load_config))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Schedule a task for execution.
pub async fn task_execution(
    State(state): State<AppState>,
    Json(request): Json<TaskExecutionRequest>,
) -> Result<Json<TaskScheduledResponse>, ApiError> {
    match state.execution.enqueue_task(request) {
        Ok(data) => Ok(Json(TaskScheduledResponse {
            success: true,
            message: "Task scheduled successfully".into(),
            data,
        })),
        Err(err) => {
            error!("Failed to schedule task: {}", err);
            Err(internal_error(err))
        }
    }
}

/// The terminal result of an execution, once it has one.
pub async fn get_execution_status(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<ComputeResult>, ApiError> {
    match state.execution.execution_status(&execution_id).await {
        Some(result) => Ok(Json(result)),
        None => Err(not_found("Task execution not found")),
    }
}

/// Cancel a running execution.
pub async fn cancel_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<BaseResponse>, ApiError> {
    match state.execution.cancel_execution(&execution_id).await {
        Ok(()) => Ok(Json(BaseResponse {
            success: true,
            message: format!("Task execution {} cancelled successfully", execution_id),
        })),
        Err(ServiceError::NotRunning) => Err(not_found(&ServiceError::NotRunning.to_string())),
        Err(err) => Err(internal_error(err)),
    }
}

/// Every currently running execution, id to task type.
pub async fn list_active_executions(
    State(state): State<AppState>,
) -> Result<Json<ActiveExecutionsResponse>, ApiError> {
    let data = state.execution.list_active().await;
    Ok(Json(ActiveExecutionsResponse {
        success: true,
        message: format!("Found {} active task executions", data.len()),
        data,
    }))
}

/// Re-fetch configuration from the config service.
pub async fn load_config(
    State(state): State<AppState>,
) -> Result<Json<ConfigResponse>, ApiError> {
    match state.config_service.load_config().await {
        Ok(config) => Ok(Json(ConfigResponse {
            success: true,
            message: "Configuration loaded successfully".into(),
            config: Some(config),
        })),
        Err(err) => {
            error!("Failed to load configuration: {}", err);
            Err(internal_error(err))
        }
    }
}

/// Service health; degraded until a configuration has been loaded.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthCheckResponse>, ApiError> {
    let config_loaded = state.shared_config.read().await.is_some();
    let status = if config_loaded {
        HealthState::Healthy
    } else {
        HealthState::Degraded
    };

    Ok(Json(HealthCheckResponse {
        success: true,
        message: "Service health check successful".into(),
        health: HealthStatus {
            status,
            uptime: state.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            details: json!({
                "system": std::env::consts::OS,
                "arch": std::env::consts::ARCH,
                "config_loaded": config_loaded,
                "start_time": state.started_at_unix,
            }),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigService, SharedConfig};
    use crate::execution::{ExecutionService, TaskPipeline};
    use crate::models::SystemConfig;
    use crate::notification::NotifierClient;
    use splitup_storage::RetryPolicy;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::RwLock;

    fn test_state() -> AppState {
        let pipeline: TaskPipeline = Arc::new(|request| {
            Box::pin(async move { Ok(vec![format!("s3://bucket/{}", request.execution_id)]) })
        });
        let notifier = Arc::new(
            NotifierClient::new("http://127.0.0.1:1".into(), "http://127.0.0.1:1".into())
                .unwrap()
                .with_retry(RetryPolicy::once()),
        );
        let shared_config: SharedConfig = Arc::new(RwLock::new(None));
        let config_service = Arc::new(
            ConfigService::new("http://127.0.0.1:1".into(), Arc::clone(&shared_config))
                .unwrap()
                .with_retry(RetryPolicy::once()),
        );
        AppState {
            execution: ExecutionService::start(pipeline, notifier),
            config_service,
            shared_config,
            started_at: Instant::now(),
            started_at_unix: crate::notification::unix_now(),
        }
    }

    #[tokio::test]
    async fn test_status_unknown_is_404() {
        let state = test_state();
        let err = get_execution_status(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_unknown_is_404() {
        let state = test_state();
        let err = cancel_execution(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_schedule_returns_scheduling_data() {
        let state = test_state();
        let request = TaskExecutionRequest {
            execution_id: "e1".into(),
            task_id: "add".into(),
            task_storage_key: "t/add".into(),
            input_storage_keys: vec!["i/a".into(), "i/b".into()],
            parameters: Vec::new(),
        };
        let response = task_execution(State(state), Json(request)).await.unwrap();
        assert!(response.0.success);
        assert_eq!(response.0.data.execution_id, "e1");
        assert_eq!(response.0.data.task_id, "add");
        assert!(response.0.data.scheduled_at > 0);
    }

    #[tokio::test]
    async fn test_health_degraded_until_config_loads() {
        let state = test_state();

        let response = health_check(State(state.clone())).await.unwrap();
        assert_eq!(response.0.health.status, HealthState::Degraded);

        *state.shared_config.write().await = Some(SystemConfig {
            weights_data_key: "weights/model.safetensors".into(),
        });
        let response = health_check(State(state)).await.unwrap();
        assert_eq!(response.0.health.status, HealthState::Healthy);
        assert_eq!(response.0.health.details["config_loaded"], true);
    }

    #[tokio::test]
    async fn test_active_listing_empty() {
        let state = test_state();
        let response = list_active_executions(State(state)).await.unwrap();
        assert!(response.0.data.is_empty());
        assert!(response.0.message.contains("0 active"));
    }
}
