use serde::{Serialize, Deserialize};

/// 上传任务状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Uploading,
    Completed,
    Failed(String),
    Cancelled,
}

impl TaskStatus {
    /// 终态：不会再被调度器变迁（Failed 可经 RetryFailed 显式复位）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed(_) | TaskStatus::Cancelled
        )
    }
}
