use thiserror::Error;

/// 任务流程中的错误，消息直接展示给用户
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// 缺少必填输入，不会发出任何请求
    #[error("{0}")]
    Validation(String),

    /// 服务器拒绝提交或提交请求失败
    #[error("{0}")]
    Submission(String),

    /// 轮询时服务器返回 `error`
    #[error("{0}")]
    Polling(String),

    /// 轮询时网络失败
    #[error("获取进度失败，请重试: {0}")]
    Transport(String),
}
