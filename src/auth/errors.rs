use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO操作失败: {0}")]
    IoError(#[from] std::io::Error),

    #[error("凭据文件格式错误: {0}")]
    Format(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CredentialError>;
