//! Task execution: a FIFO queue drained by a single worker, a cancellation
//! registry, a never-evicted result table, and the production pipeline
//! that turns one `TaskExecutionRequest` into an uploaded result tensor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, RwLock};
use tokio::task::AbortHandle;
use tracing::{error, info};
use uuid::Uuid;

use splitup_graph::{
    decode_program, execute_graph, load_safetensors, Accelerator, ActualTensors, CpuAccelerator,
    Tensor,
};
use splitup_storage::{
    ArtifactKind, ArtifactStore, ObjectClient, ObjectOperation, StorageError,
    DEFAULT_PRESIGN_EXPIRY_SECONDS,
};

use crate::config::SharedConfig;
use crate::environment::EnvConfig;
use crate::error::ServiceError;
use crate::models::{ComputeResult, TaskExecutionRequest, TaskScheduledData};
use crate::notification::{unix_now, NotifierClient};

/// One attempt at a task, from request to uploaded tensor URIs. Injected
/// so the queue and cancellation machinery run the same against the real
/// pipeline and against test stubs.
pub type TaskPipeline = Arc<
    dyn Fn(TaskExecutionRequest) -> BoxFuture<'static, Result<Vec<String>, String>> + Send + Sync,
>;

struct ActiveExecution {
    task_id: String,
    abort: AbortHandle,
}

pub struct ExecutionService {
    queue_tx: mpsc::UnboundedSender<TaskExecutionRequest>,
    active: Arc<RwLock<HashMap<String, ActiveExecution>>>,
    results: Arc<RwLock<HashMap<String, ComputeResult>>>,
}

impl ExecutionService {
    /// Create the service and start its worker.
    pub fn start(pipeline: TaskPipeline, notifier: Arc<NotifierClient>) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let active = Arc::new(RwLock::new(HashMap::new()));
        let results = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(worker_loop(
            queue_rx,
            pipeline,
            notifier,
            Arc::clone(&active),
            Arc::clone(&results),
        ));

        Arc::new(Self {
            queue_tx,
            active,
            results,
        })
    }

    /// Add a task to the execution queue.
    pub fn enqueue_task(
        &self,
        request: TaskExecutionRequest,
    ) -> Result<TaskScheduledData, ServiceError> {
        request.validate()?;
        let scheduled_at = unix_now();
        let data = TaskScheduledData {
            execution_id: request.execution_id.clone(),
            task_id: request.task_id.clone(),
            scheduled_at,
        };
        self.queue_tx
            .send(request)
            .map_err(|_| ServiceError::QueueClosed)?;
        info!(
            "Task execution {} of type {} queued",
            data.execution_id, data.task_id
        );
        Ok(data)
    }

    /// The terminal result for an execution, if it has reached one.
    pub async fn execution_status(&self, execution_id: &str) -> Option<ComputeResult> {
        self.results.read().await.get(execution_id).cloned()
    }

    /// Signal a running execution to abort at its next suspension point.
    /// Queued executions are not cancellable.
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<(), ServiceError> {
        let active = self.active.read().await;
        match active.get(execution_id) {
            Some(execution) => {
                execution.abort.abort();
                Ok(())
            }
            None => Err(ServiceError::NotRunning),
        }
    }

    /// Currently running executions, id to task type.
    pub async fn list_active(&self) -> HashMap<String, String> {
        self.active
            .read()
            .await
            .iter()
            .map(|(id, execution)| (id.clone(), execution.task_id.clone()))
            .collect()
    }
}

async fn worker_loop(
    mut queue_rx: mpsc::UnboundedReceiver<TaskExecutionRequest>,
    pipeline: TaskPipeline,
    notifier: Arc<NotifierClient>,
    active: Arc<RwLock<HashMap<String, ActiveExecution>>>,
    results: Arc<RwLock<HashMap<String, ComputeResult>>>,
) {
    while let Some(request) = queue_rx.recv().await {
        let execution_id = request.execution_id.clone();
        let task_id = request.task_id.clone();
        info!(
            "Processing task execution {} of type {}",
            execution_id, task_id
        );

        let handle = tokio::spawn((pipeline)(request));
        active.write().await.insert(
            execution_id.clone(),
            ActiveExecution {
                task_id: task_id.clone(),
                abort: handle.abort_handle(),
            },
        );

        let result = match handle.await {
            Ok(Ok(tensor_urls)) => ComputeResult::success(&execution_id, &task_id, tensor_urls),
            Ok(Err(message)) => {
                error!("Task execution {} failed: {}", execution_id, message);
                ComputeResult::failure(&execution_id, &task_id, message)
            }
            Err(join_error) if join_error.is_cancelled() => {
                info!("Task execution {} cancelled", execution_id);
                ComputeResult::failure(&execution_id, &task_id, "cancelled")
            }
            Err(join_error) => {
                error!("Task execution {} panicked: {}", execution_id, join_error);
                ComputeResult::failure(&execution_id, &task_id, join_error.to_string())
            }
        };

        // Record before notifying, so an observer that saw the
        // notification always finds the result via the status endpoint.
        results
            .write()
            .await
            .insert(execution_id.clone(), result.clone());

        if let Err(err) = notifier
            .notify_completed(&execution_id, &task_id, &result)
            .await
        {
            error!(
                "All attempts to notify completion of {} failed: {}",
                execution_id, err
            );
        }

        active.write().await.remove(&execution_id);
    }
}

/// Shared pieces of the production pipeline.
pub struct PipelineContext {
    object_client: ObjectClient,
    artifact_store: ArtifactStore,
    shared_config: SharedConfig,
    accelerator: Arc<dyn Accelerator>,
}

impl PipelineContext {
    pub fn new(env: &EnvConfig, shared_config: SharedConfig) -> Result<Self, ServiceError> {
        let object_client = ObjectClient::new(env.storage_config())
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        let artifact_store = ArtifactStore::new(ArtifactStore::default_root())
            .map_err(|e| ServiceError::Http(e.to_string()))?;
        Ok(Self {
            object_client,
            artifact_store,
            shared_config,
            accelerator: Arc::new(CpuAccelerator),
        })
    }

    /// Resolve a storage key to a local file. Keys whose basename is an
    /// artifact id go through the content-addressed cache (presign, then
    /// fetch-with-verify); anything else is a plain object download.
    async fn resolve_blob(&self, kind: ArtifactKind, key: &str) -> Result<PathBuf, StorageError> {
        let name = key.rsplit('/').next().unwrap_or(key);
        if is_artifact_id(name) {
            let url = self
                .object_client
                .presigned_url(key, ObjectOperation::Download, DEFAULT_PRESIGN_EXPIRY_SECONDS)
                .await?;
            self.artifact_store.fetch(kind, name, Some(&url)).await
        } else {
            self.object_client.get_object(key).await
        }
    }
}

fn is_artifact_id(name: &str) -> bool {
    (name.len() == 8 && name.chars().all(|c| c.is_ascii_hexdigit()))
        || Uuid::parse_str(name).is_ok()
}

/// Build the real pipeline over object storage and the accelerator.
pub fn production_pipeline(
    env: &EnvConfig,
    shared_config: SharedConfig,
) -> Result<TaskPipeline, ServiceError> {
    let context = Arc::new(PipelineContext::new(env, shared_config)?);
    Ok(Arc::new(move |request| {
        let context = Arc::clone(&context);
        Box::pin(async move { run_task(context, request).await })
    }))
}

/// The per-task pipeline: fetch the graph blob and inputs, decode, bind,
/// execute, upload.
async fn run_task(
    context: Arc<PipelineContext>,
    request: TaskExecutionRequest,
) -> Result<Vec<String>, String> {
    let task_path = context
        .resolve_blob(ArtifactKind::Task, &request.task_storage_key)
        .await
        .map_err(|e| format!("Failed to fetch task graph: {}", e))?;

    let mut input_paths = Vec::new();
    for key in &request.input_storage_keys {
        let path = context
            .object_client
            .get_object(key)
            .await
            .map_err(|e| format!("Failed to fetch input {}: {}", key, e))?;
        input_paths.push(path);
    }

    let graph_bytes = tokio::fs::read(&task_path)
        .await
        .map_err(|e| format!("Failed to read task graph: {}", e))?;
    let program =
        decode_program(&graph_bytes).map_err(|e| format!("Error importing task: {}", e))?;

    // Input tensors bind under their file stem.
    let mut inputs = ActualTensors::new();
    for path in &input_paths {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read input tensor: {}", e))?;
        let tensor = Tensor::from_wire_bytes(&bytes)
            .map_err(|e| format!("Error decoding input tensor: {}", e))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        inputs.insert(stem, tensor);
    }

    let weights = load_configured_weights(&context).await?;

    let result_tensor = execute_graph(
        &program,
        &inputs,
        weights.as_ref(),
        context.accelerator.as_ref(),
    )
    .map_err(|e| format!("Error executing task: {}", e))?;

    let tensor_file = std::env::temp_dir().join(format!("result_{}.tensor", request.execution_id));
    tokio::fs::write(&tensor_file, result_tensor.to_wire_bytes())
        .await
        .map_err(|e| format!("Failed to write result tensor: {}", e))?;

    let key = format!(
        "results/task_{}/{}/{}.pt",
        request.task_id,
        request.execution_id,
        Uuid::new_v4()
    );
    let uri = context
        .object_client
        .put_object(&key, &tensor_file, None)
        .await
        .map_err(|e| format!("Failed to upload result: {}", e))?;

    Ok(vec![uri])
}

/// Weight bindings named by the current configuration, if any.
async fn load_configured_weights(
    context: &PipelineContext,
) -> Result<Option<ActualTensors>, String> {
    let config = context.shared_config.read().await.clone();
    let Some(config) = config else {
        return Ok(None);
    };
    if config.weights_data_key.is_empty() {
        return Ok(None);
    }

    let path = context
        .resolve_blob(ArtifactKind::Safetensors, &config.weights_data_key)
        .await
        .map_err(|e| format!("Failed to fetch weights: {}", e))?;
    let weights =
        load_safetensors(&path).map_err(|e| format!("Failed to load weights: {}", e))?;
    Ok(Some(weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitup_storage::RetryPolicy;
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn test_notifier() -> Arc<NotifierClient> {
        // Nothing listens on port 1; completion reports fail fast.
        Arc::new(
            NotifierClient::new("http://127.0.0.1:1".into(), "http://127.0.0.1:1".into())
                .unwrap()
                .with_retry(RetryPolicy::once()),
        )
    }

    fn request(execution_id: &str, task_id: &str) -> TaskExecutionRequest {
        TaskExecutionRequest {
            execution_id: execution_id.into(),
            task_id: task_id.into(),
            task_storage_key: format!("t/{}", task_id),
            input_storage_keys: Vec::new(),
            parameters: Vec::new(),
        }
    }

    async fn wait_for<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..500 {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_fifo_completion_order() {
        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let order_ref = Arc::clone(&order);
        let pipeline: TaskPipeline = Arc::new(move |request| {
            let order = Arc::clone(&order_ref);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                order.lock().await.push(request.execution_id.clone());
                Ok(vec![format!("s3://bucket/{}", request.execution_id)])
            })
        });

        let service = ExecutionService::start(pipeline, test_notifier());
        service.enqueue_task(request("e-first", "add")).unwrap();
        service.enqueue_task(request("e-second", "add")).unwrap();

        assert!(
            wait_for(|| async {
                service.execution_status("e-second").await.is_some()
            })
            .await
        );

        assert_eq!(*order.lock().await, vec!["e-first", "e-second"]);
        let first = service.execution_status("e-first").await.unwrap();
        assert_eq!(first.status, crate::models::ExecutionStatus::Success);
        assert_eq!(first.tensor_urls, vec!["s3://bucket/e-first"]);
    }

    #[tokio::test]
    async fn test_pipeline_error_recorded_as_failure() {
        let pipeline: TaskPipeline = Arc::new(|_request| {
            Box::pin(async { Err("Error importing task: bad magic".to_string()) })
        });

        let service = ExecutionService::start(pipeline, test_notifier());
        service.enqueue_task(request("e-bad", "mul")).unwrap();

        assert!(
            wait_for(|| async { service.execution_status("e-bad").await.is_some() }).await
        );
        let result = service.execution_status("e-bad").await.unwrap();
        assert_eq!(result.status, crate::models::ExecutionStatus::Failure);
        assert!(result.error.unwrap().contains("bad magic"));
    }

    #[tokio::test]
    async fn test_cancel_running_execution() {
        let pipeline: TaskPipeline = Arc::new(|_request| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(300)).await;
                Ok(vec![])
            })
        });

        let service = ExecutionService::start(pipeline, test_notifier());
        service.enqueue_task(request("e-slow", "matmul")).unwrap();

        assert!(
            wait_for(|| async { service.list_active().await.contains_key("e-slow") }).await
        );
        assert_eq!(service.list_active().await["e-slow"], "matmul");

        service.cancel_execution("e-slow").await.unwrap();

        assert!(
            wait_for(|| async { service.execution_status("e-slow").await.is_some() }).await
        );
        let result = service.execution_status("e-slow").await.unwrap();
        assert_eq!(result.status, crate::models::ExecutionStatus::Failure);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
        assert!(!service.list_active().await.contains_key("e-slow"));
    }

    #[tokio::test]
    async fn test_cancel_unknown_execution() {
        let pipeline: TaskPipeline = Arc::new(|_request| Box::pin(async { Ok(vec![]) }));
        let service = ExecutionService::start(pipeline, test_notifier());
        assert!(matches!(
            service.cancel_execution("nope").await,
            Err(ServiceError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_status_unknown_execution() {
        let pipeline: TaskPipeline = Arc::new(|_request| Box::pin(async { Ok(vec![]) }));
        let service = ExecutionService::start(pipeline, test_notifier());
        assert!(service.execution_status("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_panicking_pipeline_recorded_as_failure() {
        let pipeline: TaskPipeline =
            Arc::new(|_request| Box::pin(async { panic!("kernel exploded") }));
        let service = ExecutionService::start(pipeline, test_notifier());
        service.enqueue_task(request("e-panic", "add")).unwrap();

        assert!(
            wait_for(|| async { service.execution_status("e-panic").await.is_some() }).await
        );
        let result = service.execution_status("e-panic").await.unwrap();
        assert_eq!(result.status, crate::models::ExecutionStatus::Failure);
    }

    #[test]
    fn test_artifact_id_detection() {
        assert!(is_artifact_id("a1b2c3d4"));
        assert!(is_artifact_id("01234567-89ab-cdef-0123-456789abcdef"));
        assert!(!is_artifact_id("add"));
        assert!(!is_artifact_id("model.safetensors"));
        assert!(!is_artifact_id("a1b2c3dZ"));
    }

    mod end_to_end {
        use super::*;
        use crate::config::SharedConfig;
        use crate::models::ExecutionStatus;
        use splitup_graph::{encode_program, DType, OpKind, TensorContext};
        use splitup_storage::{ObjectClient, RetryPolicy, StorageConfig};
        use std::collections::HashMap as StdHashMap;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::sync::Mutex;

        struct MockBackend {
            base: String,
            uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
            reports: Arc<Mutex<Vec<String>>>,
        }

        /// A tiny object-storage + listener backend: presigns by echoing a
        /// URL back onto itself, serves blobs, records uploads and
        /// completion reports.
        async fn spawn_mock_backend(blobs: StdHashMap<String, Vec<u8>>) -> MockBackend {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));
            let reports: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
            let blobs = Arc::new(blobs);

            {
                let base = base.clone();
                let uploads = Arc::clone(&uploads);
                let reports = Arc::clone(&reports);
                tokio::spawn(async move {
                    loop {
                        let Ok((stream, _)) = listener.accept().await else {
                            return;
                        };
                        let base = base.clone();
                        let blobs = Arc::clone(&blobs);
                        let uploads = Arc::clone(&uploads);
                        let reports = Arc::clone(&reports);
                        tokio::spawn(async move {
                            handle_request(stream, base, blobs, uploads, reports).await;
                        });
                    }
                });
            }

            MockBackend {
                base,
                uploads,
                reports,
            }
        }

        async fn handle_request(
            mut stream: TcpStream,
            base: String,
            blobs: Arc<StdHashMap<String, Vec<u8>>>,
            uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
            reports: Arc<Mutex<Vec<String>>>,
        ) {
            let Some((head, body)) = read_request(&mut stream).await else {
                return;
            };
            let request_line = head.lines().next().unwrap_or_default().to_string();
            let mut parts = request_line.split(' ');
            let method = parts.next().unwrap_or_default();
            let path = parts.next().unwrap_or_default();

            if method == "POST" && path == "/presign" {
                let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
                let key = parsed["key"].as_str().unwrap();
                let response = format!(r#"{{"url":"{}/object/{}"}}"#, base, key);
                respond(&mut stream, 200, response.as_bytes()).await;
            } else if method == "GET" && path.starts_with("/object/") {
                let key = &path["/object/".len()..];
                match blobs.get(key) {
                    Some(blob) => respond(&mut stream, 200, blob).await,
                    None => respond(&mut stream, 404, b"").await,
                }
            } else if method == "PUT" && path.starts_with("/object/") {
                let key = path["/object/".len()..].to_string();
                uploads.lock().await.push((key, body));
                respond(&mut stream, 200, b"").await;
            } else if method == "POST" && path == "/report_completed" {
                reports.lock().await.push(String::from_utf8_lossy(&body).to_string());
                respond(&mut stream, 200, br#"{"success":true,"message":"recorded"}"#).await;
            } else {
                respond(&mut stream, 404, b"").await;
            }
        }

        async fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.ok()?;
                if n == 0 {
                    return None;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(split) = find_blank_line(&buf) {
                    let head = String::from_utf8_lossy(&buf[..split]).to_string();
                    let content_length = head
                        .lines()
                        .find_map(|line| {
                            line.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    let body_start = split + 4;
                    while buf.len() < body_start + content_length {
                        let n = stream.read(&mut chunk).await.ok()?;
                        if n == 0 {
                            return None;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    let body = buf[body_start..body_start + content_length].to_vec();
                    return Some((head, body));
                }
            }
        }

        fn find_blank_line(buf: &[u8]) -> Option<usize> {
            buf.windows(4).position(|w| w == b"\r\n\r\n")
        }

        async fn respond(stream: &mut TcpStream, status: u16, body: &[u8]) {
            let reason = if status == 200 { "OK" } else { "Not Found" };
            let header = format!(
                "HTTP/1.1 {} {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                status,
                reason,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes()).await;
            let _ = stream.write_all(body).await;
            let _ = stream.flush().await;
        }

        #[tokio::test]
        async fn test_happy_task_through_real_pipeline() {
            // Graph: a + b over (2, 2) float32.
            let mut ctx = TensorContext::new();
            let a = ctx.add_graph_input("a", vec![2, 2], DType::Float32).unwrap();
            let b = ctx.add_graph_input("b", vec![2, 2], DType::Float32).unwrap();
            let root = ctx.op(OpKind::Add, vec![a, b]);
            let program = ctx.compile(root).unwrap();

            let blobs = StdHashMap::from([
                ("t/add".to_string(), encode_program(&program)),
                (
                    "i/a.tensor".to_string(),
                    Tensor::zeros(vec![2, 2], splitup_graph::DType::Float32).to_wire_bytes(),
                ),
                (
                    "i/b.tensor".to_string(),
                    Tensor::ones(vec![2, 2], splitup_graph::DType::Float32).to_wire_bytes(),
                ),
            ]);
            let backend = spawn_mock_backend(blobs).await;

            let objects_dir = tempfile::tempdir().unwrap();
            let store_root = tempfile::tempdir().unwrap();
            let shared_config: SharedConfig = Arc::new(RwLock::new(None));
            let context = Arc::new(PipelineContext {
                object_client: ObjectClient::new(StorageConfig {
                    api_endpoint: backend.base.clone(),
                    api_key: "test-key".into(),
                    region: "eu-west-2".into(),
                    bucket: "splitup-test".into(),
                })
                .unwrap()
                .with_objects_dir(objects_dir.path().to_path_buf())
                .with_retry(RetryPolicy::once()),
                artifact_store: ArtifactStore::new(store_root.path().to_path_buf()).unwrap(),
                shared_config,
                accelerator: Arc::new(CpuAccelerator),
            });
            let pipeline: TaskPipeline = Arc::new(move |request| {
                let context = Arc::clone(&context);
                Box::pin(run_task(context, request))
            });

            let notifier = Arc::new(
                NotifierClient::new("http://127.0.0.1:1".into(), backend.base.clone())
                    .unwrap()
                    .with_retry(RetryPolicy::once()),
            );
            let service = ExecutionService::start(pipeline, notifier);

            service
                .enqueue_task(TaskExecutionRequest {
                    execution_id: "e-s6".into(),
                    task_id: "add".into(),
                    task_storage_key: "t/add".into(),
                    input_storage_keys: vec!["i/a.tensor".into(), "i/b.tensor".into()],
                    parameters: Vec::new(),
                })
                .unwrap();

            assert!(
                wait_for(|| async { service.execution_status("e-s6").await.is_some() }).await
            );

            let result = service.execution_status("e-s6").await.unwrap();
            assert_eq!(result.status, ExecutionStatus::Success);
            assert_eq!(result.tensor_urls.len(), 1);
            assert!(result.tensor_urls[0].starts_with("s3://splitup-test/results/task_add/e-s6/"));
            assert!(result.tensor_urls[0].ends_with(".pt"));

            // Exactly one upload: zeros + ones = ones.
            let uploads = backend.uploads.lock().await;
            assert_eq!(uploads.len(), 1);
            let uploaded = Tensor::from_wire_bytes(&uploads[0].1).unwrap();
            assert_eq!(uploaded.shape(), &[2, 2]);
            assert_eq!(uploaded.to_f32s(), vec![1.0; 4]);
            assert_eq!(
                result.tensor_urls[0],
                format!("s3://splitup-test/{}", uploads[0].0)
            );

            // Exactly one completion report, for this execution.
            let reports = backend.reports.lock().await;
            assert_eq!(reports.len(), 1);
            assert!(reports[0].contains(r#""execution_id":"e-s6""#));
        }
    }
}
