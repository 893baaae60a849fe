//! Core: 上传任务的调度、传输驱动、重试与错误处理等核心逻辑模块

pub mod error;
pub mod events;
pub mod manager;
pub mod task;
pub mod transport;

// 只导出主流程和其它模块实际用到的类型
pub use error::{UploadError, UploadResult};
pub use events::{NullListener, UploadListener};
pub use manager::{
    CancelAllTasks, CancelTaskById, ListTasks, QueryStats, QueryTaskMetaById, QueueStats,
    RetryFailed, SubmitTasks, UploadManagerActor,
};
pub use task::{CancelHandle, TaskStatus, UploadPayload, UploadTaskMeta};
pub use transport::{HttpTransport, UploadTransport};
