use async_trait::async_trait;
use url::Url;

use super::error::ApiError;
use super::models::task::{ProgressResponse, SubmitResponse};

/// 下载服务器的任务接口，提交器、轮询器和会话只依赖这个 trait
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// `POST /download`
    async fn submit(&self, url: &str, credential: &str) -> Result<SubmitResponse, ApiError>;

    /// `GET /progress?task_id=<id>`
    async fn progress(&self, task_id: &str) -> Result<ProgressResponse, ApiError>;

    /// `GET /download_zip/<id>` 的完整地址
    fn zip_url(&self, task_id: &str) -> Result<Url, ApiError>;
}
