use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::common::api::backend::TaskBackend;
use crate::common::api::models::task::SubmitResponse;

use super::error::TaskError;

const UNKNOWN_ERROR: &str = "unknown";

/// 检查必填输入，纯空白也视为缺失
pub fn validate(url: &str, credential: &str) -> Result<(), TaskError> {
    if url.trim().is_empty() {
        return Err(TaskError::Validation("请输入下载链接".to_string()));
    }
    if credential.trim().is_empty() {
        return Err(TaskError::Validation("请输入 ARL Cookie".to_string()));
    }
    Ok(())
}

/// 解释提交响应：task_id > error > message > unknown
pub fn interpret_submission(resp: &SubmitResponse) -> Result<String, TaskError> {
    if let Some(task_id) = resp.task_id() {
        return Ok(task_id.to_string());
    }

    let message = resp.error().or(resp.message()).unwrap_or(UNKNOWN_ERROR);
    Err(TaskError::Submission(message.to_string()))
}

// 任务提交器，不做重试
#[derive(Clone)]
pub struct TaskSubmitter {
    backend: Arc<dyn TaskBackend>,
}

impl TaskSubmitter {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    pub async fn submit(&self, url: &str, credential: &str) -> Result<String, TaskError> {
        validate(url, credential)?;

        debug!("提交下载任务: {}", url);
        let resp = self.backend.submit(url, credential).await.map_err(|e| {
            warn!("提交请求失败: {}", e);
            TaskError::Submission(e.to_string())
        })?;

        let task_id = interpret_submission(&resp)?;
        info!("任务已创建: {}", task_id);
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::api::error::ApiError;
    use crate::common::api::models::task::ProgressResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OneShot {
        calls: AtomicUsize,
        reply: fn() -> Result<SubmitResponse, ApiError>,
    }

    #[async_trait]
    impl TaskBackend for OneShot {
        async fn submit(&self, _url: &str, _credential: &str) -> Result<SubmitResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }

        async fn progress(&self, _task_id: &str) -> Result<ProgressResponse, ApiError> {
            unreachable!("submitter never polls")
        }

        fn zip_url(&self, task_id: &str) -> Result<url::Url, ApiError> {
            Ok(url::Url::parse("http://fake/download_zip/")?.join(task_id)?)
        }
    }

    fn submitter(reply: fn() -> Result<SubmitResponse, ApiError>) -> (TaskSubmitter, Arc<OneShot>) {
        let backend = Arc::new(OneShot {
            calls: AtomicUsize::new(0),
            reply,
        });
        (TaskSubmitter::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_missing_input_never_calls_backend() {
        let (submitter, backend) = submitter(|| Ok(SubmitResponse::default()));

        for (url, credential) in [("", "abc"), ("http://x", ""), ("  ", "abc"), ("", "")] {
            let result = submitter.submit(url, credential).await;
            assert!(matches!(result, Err(TaskError::Validation(_))));
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_task_id_returned() {
        let (submitter, backend) = submitter(|| {
            Ok(SubmitResponse {
                success: Some(true),
                task_id: Some("t1".into()),
                ..Default::default()
            })
        });
        assert_eq!(submitter.submit("http://x", "abc").await, Ok("t1".to_string()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_message() {
        let (submitter, _) = submitter(|| {
            Ok(SubmitResponse {
                error: Some("bad url".into()),
                ..Default::default()
            })
        });
        assert_eq!(
            submitter.submit("http://x", "abc").await,
            Err(TaskError::Submission("bad url".into()))
        );
    }

    #[test]
    fn test_message_and_unknown_fallbacks() {
        let with_message = SubmitResponse {
            message: Some("Task ID not received.".into()),
            ..Default::default()
        };
        assert_eq!(
            interpret_submission(&with_message),
            Err(TaskError::Submission("Task ID not received.".into()))
        );
        assert_eq!(
            interpret_submission(&SubmitResponse::default()),
            Err(TaskError::Submission("unknown".into()))
        );
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let (submitter, _) =
            submitter(|| Err(ApiError::InvalidResponse("connection refused".into())));
        match submitter.submit("http://x", "abc").await {
            Err(TaskError::Submission(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
