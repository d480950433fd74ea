//! Outbound notifications: heartbeat status updates and completed-task
//! reports, both retried with exponential backoff. A `success: false`
//! response body counts as a failure and is retried like a transport
//! error.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::json;
use tracing::debug;

use splitup_storage::{with_exponential_backoff, RetryPolicy};

use crate::error::ServiceError;
use crate::models::{ComputeResult, ComputeState, ComputeStatus, StatusUpdateResponse};

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct NotifierClient {
    client: reqwest::Client,
    heartbeat_url: String,
    listener_url: String,
    retry: RetryPolicy,
}

impl NotifierClient {
    pub fn new(heartbeat_url: String, listener_url: String) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        Ok(Self {
            client,
            heartbeat_url,
            listener_url,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post_checked(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<(), ServiceError> {
        debug!("Sending notification to {}", url);
        let response = self.client.post(url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::Http(format!(
                "status {} from {}",
                response.status().as_u16(),
                url
            )));
        }
        let status: StatusUpdateResponse = response.json().await?;
        if status.success {
            Ok(())
        } else {
            Err(ServiceError::Rejected(status.message))
        }
    }

    /// Report the worker's state to the heartbeat service.
    pub async fn notify_status_update(&self, state: ComputeState) -> Result<(), ServiceError> {
        let status = ComputeStatus {
            status: state,
            last_updated: unix_now(),
        };
        let body = serde_json::to_value(&status)
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        with_exponential_backoff(
            || self.post_checked(&self.heartbeat_url, &body),
            &format!("notify status {:?}", state),
            self.retry,
        )
        .await
    }

    /// Report a terminal execution to the listener service.
    pub async fn notify_completed(
        &self,
        execution_id: &str,
        task_id: &str,
        result: &ComputeResult,
    ) -> Result<(), ServiceError> {
        let report_url = format!("{}/report_completed", self.listener_url);
        let body = json!({
            "execution_id": execution_id,
            "task_id": task_id,
            "result": result,
        });
        with_exponential_backoff(
            || self.post_checked(&report_url, &body),
            &format!("notify completed task {}", task_id),
            self.retry,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;

    /// Serve one response; forward the raw request for inspection.
    async fn serve_once(response_body: &'static str) -> (String, mpsc::Receiver<Vec<u8>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let n = stream.read(&mut request).await.unwrap();
            request.truncate(n);
            let _ = tx.send(request).await;
            let header = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                response_body.len()
            );
            stream.write_all(header.as_bytes()).await.unwrap();
            stream.write_all(response_body.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
        });
        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_heartbeat_accepted() {
        let (url, mut rx) = serve_once(r#"{"success":true,"message":"ok"}"#).await;
        let notifier = NotifierClient::new(url, "http://unused".into())
            .unwrap()
            .with_retry(RetryPolicy::once());

        notifier.notify_status_update(ComputeState::Idle).await.unwrap();

        let request = rx.recv().await.unwrap();
        let text = String::from_utf8_lossy(&request);
        assert!(text.contains(r#""status":"idle""#));
        assert!(text.contains("lastUpdated"));
    }

    #[tokio::test]
    async fn test_rejected_body_is_failure() {
        let (url, _rx) = serve_once(r#"{"success":false,"message":"unknown node"}"#).await;
        let notifier = NotifierClient::new(url, "http://unused".into())
            .unwrap()
            .with_retry(RetryPolicy::once());

        let err = notifier
            .notify_status_update(ComputeState::Offline)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(message) if message == "unknown node"));
    }

    #[tokio::test]
    async fn test_completed_report_targets_listener_path() {
        let (url, mut rx) = serve_once(r#"{"success":true,"message":"recorded"}"#).await;
        let notifier = NotifierClient::new("http://unused".into(), url)
            .unwrap()
            .with_retry(RetryPolicy::once());

        let result = ComputeResult::success("e1", "add", vec!["s3://bucket/key".into()]);
        notifier.notify_completed("e1", "add", &result).await.unwrap();

        let request = rx.recv().await.unwrap();
        let text = String::from_utf8_lossy(&request);
        assert!(text.starts_with("POST /report_completed"));
        assert!(text.contains(r#""execution_id":"e1""#));
    }

    #[tokio::test]
    async fn test_unreachable_listener_fails() {
        let notifier = NotifierClient::new("http://unused".into(), "http://127.0.0.1:1".into())
            .unwrap()
            .with_retry(RetryPolicy::once());
        let result = ComputeResult::failure("e1", "add", "boom");
        assert!(notifier.notify_completed("e1", "add", &result).await.is_err());
    }
}
