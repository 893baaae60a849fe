use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use bytes::Bytes;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use super::state::TaskStatus;

/// 上传负载：name 为展示名，data 为零拷贝的数据引用，管理器从不复制内容
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub name: String,
    pub data: Bytes,
}

impl UploadPayload {
    pub fn new(name: impl Into<String>, data: Bytes) -> Self {
        Self { name: name.into(), data }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// 协作式取消句柄：传输层在发送间隙检查该标志并尽快停止
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 单个上传任务的记录
///
/// 所有字段只在管理器 actor 内部被修改；cancel 仅在 Uploading 期间存在。
pub struct UploadTask {
    pub id: Uuid,
    /// 提交顺序号，FIFO 准入依据
    pub seq: u64,
    pub payload: UploadPayload,
    pub status: TaskStatus,
    /// 0-100，Uploading 期间单调不减，重回 Pending 时清零
    pub progress: f32,
    pub error: Option<String>,
    pub retry_count: u32,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub cancel: Option<CancelHandle>,
}

impl UploadTask {
    pub fn new(seq: u64, payload: UploadPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            payload,
            status: TaskStatus::Pending,
            progress: 0.0,
            error: None,
            retry_count: 0,
            started_at: None,
            ended_at: None,
            cancel: None,
        }
    }

    /// 生成对外只读快照
    pub fn meta(&self) -> UploadTaskMeta {
        UploadTaskMeta {
            id: self.id,
            name: self.payload.name.clone(),
            size: self.payload.size(),
            status: self.status.clone(),
            progress: self.progress,
            retry_count: self.retry_count,
            error: self.error.clone(),
            elapsed_ms: match (self.started_at, self.ended_at) {
                (Some(start), Some(end)) => Some(end.duration_since(start).as_millis() as u64),
                _ => None,
            },
        }
    }
}

/// 任务元数据快照（对外只读）
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UploadTaskMeta {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub status: TaskStatus,
    pub progress: f32,
    pub retry_count: u32,
    pub error: Option<String>,
    pub elapsed_ms: Option<u64>,
}
