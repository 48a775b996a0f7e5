use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, ClientBuilder, Response, Url,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::backend::TaskBackend;
use super::error::ApiError;
use super::models::task::{ProgressResponse, SubmitResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// 下载服务器客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub inner: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(server: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(server)?;
        // 保证 join 时追加而不是替换最后一段路径
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let inner = ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(Self::get_default_headers())
            .build()?;

        Ok(Self { inner, base_url })
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("dzdl/", env!("CARGO_PKG_VERSION"))),
        );
        headers
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn get_raw_response(&self, url: Url) -> Result<Response, ApiError> {
        let resp = self.inner.get(url).send().await.map_err(|e| {
            error!("请求失败: {}", e);
            ApiError::Reqwest(e)
        })?;
        Ok(resp)
    }

    // 服务器在 4xx/5xx 时同样返回 JSON，所以不看状态码，只要求正文是 JSON
    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        debug!("Response Status: {}", status);

        let raw_body = resp.bytes().await?;
        serde_json::from_slice::<T>(&raw_body).map_err(|e| {
            let text = String::from_utf8_lossy(&raw_body);
            let preview: String = text.chars().take(200).collect();
            ApiError::InvalidResponse(format!(
                "解析响应失败 ({}): {}. 原始响应: {}",
                status, e, preview
            ))
        })
    }
}

#[async_trait]
impl TaskBackend for ApiClient {
    async fn submit(&self, url: &str, credential: &str) -> Result<SubmitResponse, ApiError> {
        let endpoint = self.endpoint("download")?;
        debug!("提交下载任务: {}", endpoint);

        let resp = self
            .inner
            .post(endpoint)
            .form(&[("url", url), ("arl_cookie", credential)])
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    async fn progress(&self, task_id: &str) -> Result<ProgressResponse, ApiError> {
        let endpoint = self.endpoint("progress")?;

        let resp = self
            .inner
            .get(endpoint)
            .query(&[("task_id", task_id)])
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    // 任务 ID 按单个路径段编码
    fn zip_url(&self, task_id: &str) -> Result<Url, ApiError> {
        self.endpoint(&format!("download_zip/{}", urlencoding::encode(task_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_prefix() {
        let client = ApiClient::new("http://localhost:5000/dz").unwrap();
        assert_eq!(
            client.endpoint("progress").unwrap().as_str(),
            "http://localhost:5000/dz/progress"
        );
    }

    #[test]
    fn test_zip_url_encodes_task_id() {
        let client = ApiClient::new("http://localhost:5000").unwrap();
        assert_eq!(
            client.zip_url("a b/c").unwrap().as_str(),
            "http://localhost:5000/download_zip/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_server() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
