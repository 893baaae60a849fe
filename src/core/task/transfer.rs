use std::rc::Rc;

use crate::core::error::{UploadError, UploadResult};
use crate::core::transport::UploadTransport;
use super::chunk::ChunkPlan;
use super::record::{CancelHandle, UploadPayload};

/// 传输参数：块大小与分块阈值
#[derive(Debug, Clone, Copy)]
pub struct TransferSettings {
    pub chunk_size: u64,
    /// 负载超过该字节数时启用分块
    pub chunk_threshold: u64,
}

/// 驱动一次完整的上传
///
/// 超过阈值的负载按固定块大小顺序分块发送，否则单请求发送。
/// 进度通过 on_progress 上报（0-100），取消在每块发送前检查。
pub async fn run_transfer<F>(
    payload: UploadPayload,
    transport: Rc<dyn UploadTransport>,
    cancel: CancelHandle,
    settings: TransferSettings,
    on_progress: F,
) -> UploadResult<()>
where
    F: Fn(f32),
{
    if payload.size() > settings.chunk_threshold {
        upload_chunked(&payload, transport.as_ref(), &cancel, settings.chunk_size, &on_progress).await
    } else {
        transport.upload(&payload, &on_progress, &cancel).await
    }
}

async fn upload_chunked(
    payload: &UploadPayload,
    transport: &dyn UploadTransport,
    cancel: &CancelHandle,
    chunk_size: u64,
    on_progress: &dyn Fn(f32),
) -> UploadResult<()> {
    let plan = ChunkPlan::new(payload.size(), chunk_size);
    for index in 0..plan.total_chunks() {
        // 每块发送前检查取消信号
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let slice = plan.slice(&payload.data, index);
        transport
            .upload_chunk(payload, slice, index, plan.total_chunks(), cancel)
            .await?;
        on_progress(plan.progress_after(index + 1));
    }
    Ok(())
}
