use thiserror::Error;
use std::io;

/// 上传错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("上传超时")]
    Timeout,

    #[error("服务器错误: {status}")]
    Server { status: u16 },

    #[error("无效的负载: {0}")]
    InvalidPayload(String),

    #[error("上传被取消")]
    Cancelled,

    #[error("IO错误: {0}")]
    Io(String),

    #[error("未知错误: {0}")]
    Unknown(String),
}

impl UploadError {
    /// 瞬时错误：网络类、超时、5xx，允许退避重试
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Network(_) | UploadError::Timeout => true,
            UploadError::Server { status } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// 永久错误：4xx、负载校验失败，重试无意义
    pub fn is_fatal(&self) -> bool {
        match self {
            UploadError::InvalidPayload(_) => true,
            UploadError::Server { status } => (400..=499).contains(status),
            _ => false,
        }
    }
}

impl From<io::Error> for UploadError {
    fn from(error: io::Error) -> Self {
        UploadError::Io(error.to_string())
    }
}

impl From<String> for UploadError {
    fn from(error: String) -> Self {
        UploadError::Unknown(error)
    }
}

impl From<&str> for UploadError {
    fn from(error: &str) -> Self {
        UploadError::Unknown(error.to_string())
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
