use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::errors::Result;

/// 凭据固定保存在这个键下
pub const CREDENTIAL_KEY: &str = "arlCookieValue";

/// 持久化单个命名凭据，最多保存一个值
pub trait CredentialStore: Send + Sync {
    /// 覆盖保存，不做任何校验
    fn save(&self, value: &str) -> Result<()>;

    /// 返回最后一次保存的值，没有则为 `None`
    fn load(&self) -> Result<Option<String>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    key: String,
    value: String,
    saved_at: DateTime<Utc>,
}

// 保存在本地 JSON 文件中的凭据
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let stored = StoredCredential {
            key: CREDENTIAL_KEY.to_string(),
            value: value.to_string(),
            saved_at: Utc::now(),
        };
        let data = serde_json::to_vec_pretty(&stored)?;

        // 先写临时文件再改名，避免写到一半留下损坏的文件
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;

        info!("凭据已保存: {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("凭据文件不存在: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let stored: StoredCredential = serde_json::from_slice(&data)?;
        if stored.key != CREDENTIAL_KEY {
            warn!("凭据文件中的键不匹配: {}", stored.key);
            return Ok(None);
        }

        debug!("已加载凭据，保存时间: {}", stored.saved_at);
        Ok(Some(stored.value))
    }
}

// 仅保存在内存中的凭据，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, value: &str) -> Result<()> {
        let mut guard = match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(value.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        let guard = match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone())
    }
}
