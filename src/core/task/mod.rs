//! `task` 模块包含与单个上传任务相关的所有逻辑
//!
//! 主要包括：
//! - `record`: 任务记录 `UploadTask`、负载与取消句柄
//! - `state`: 任务状态 `TaskStatus`
//! - `retry`: 重试策略
//! - `chunk`: 分块计划
//! - `transfer`: 实际的上传驱动逻辑

pub mod chunk;
pub mod record;
pub mod retry;
pub mod state;
pub mod transfer;

// 导出核心组件，方便外部使用
pub use chunk::ChunkPlan;
pub use record::{CancelHandle, UploadPayload, UploadTask, UploadTaskMeta};
pub use retry::RetryStrategy;
pub use state::TaskStatus;
pub use transfer::{run_transfer, TransferSettings};
