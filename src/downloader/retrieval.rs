use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::common::api::client::ApiClient;
use crate::common::api::error::ApiError;

/// 打包结果的获取动作，只在任务到达 FinishedWithPackage 后生成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalAction {
    pub task_id: String,
    pub url: Url,
}

impl RetrievalAction {
    pub fn new(task_id: impl Into<String>, url: Url) -> Self {
        Self {
            task_id: task_id.into(),
            url,
        }
    }

    /// 本地文件名，任务 ID 中不适合做文件名的字符替换为 `_`
    pub fn file_name(&self) -> String {
        let stem: String = self
            .task_id
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
                _ => '_',
            })
            .collect();
        format!("{}.zip", stem)
    }

    /// 一次性下载打包文件到 `output_dir`，返回保存路径
    pub async fn fetch(&self, client: &ApiClient, output_dir: &Path) -> Result<PathBuf, ApiError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let output_path = output_dir.join(self.file_name());

        let response = client.get_raw_response(self.url.clone()).await?;
        let status = response.status();
        if !status.is_success() {
            warn!("❌ 获取打包文件失败，状态码: {}", status);
            return Err(ApiError::HttpStatus(status));
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = if total_size > 0 {
            let pb = ProgressBar::new(total_size);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::new_spinner()
        };

        debug!("开始下载打包文件: {}", self.url);

        let stream = response.bytes_stream().map(|chunk| chunk.map_err(ApiError::from));
        let downloaded = match save_stream(stream, &output_path, &pb).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                pb.abandon_with_message("下载失败");
                return Err(e);
            }
        };

        pb.finish_with_message("下载完成");
        info!("打包文件已保存: {} ({} 字节)", output_path.display(), downloaded);
        Ok(output_path)
    }
}

/// 先写入 `<name>.part`，完整写完再改名为目标文件。
/// 中途失败时删除未完成的文件
async fn save_stream<S, B>(stream: S, output_path: &Path, pb: &ProgressBar) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<B, ApiError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut part_name = output_path.as_os_str().to_owned();
    part_name.push(".part");
    let part_path = PathBuf::from(part_name);

    match write_stream(stream, &part_path, pb).await {
        Ok(downloaded) => {
            tokio::fs::rename(&part_path, output_path).await?;
            Ok(downloaded)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&part_path).await {
                debug!("清理未完成的文件失败: {}", remove_err);
            }
            Err(e)
        }
    }
}

async fn write_stream<S, B>(mut stream: S, path: &Path, pb: &ProgressBar) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<B, ApiError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut downloaded = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        file.write_all(chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush().await?;
    Ok(downloaded)
}
