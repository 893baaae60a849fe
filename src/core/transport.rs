use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::config::UploadConfig;
use crate::core::error::{UploadError, UploadResult};
use crate::core::task::record::{CancelHandle, UploadPayload};

/// 上传进度回调，参数为 0-100 的百分比
pub type ProgressFn<'a> = &'a dyn Fn(f32);

/// 传输层接口
///
/// 由宿主应用提供具体实现；管理器只通过这两个方法触达网络。
/// 实现方有义务在发送间隙观察 cancel 并尽快停止，管理器不会强杀 IO。
#[async_trait(?Send)]
pub trait UploadTransport {
    /// 单请求上传整个负载
    async fn upload(
        &self,
        payload: &UploadPayload,
        on_progress: ProgressFn<'_>,
        cancel: &CancelHandle,
    ) -> UploadResult<()>;

    /// 上传一个分块，index 从 0 开始
    async fn upload_chunk(
        &self,
        payload: &UploadPayload,
        slice: Bytes,
        index: usize,
        total: usize,
        cancel: &CancelHandle,
    ) -> UploadResult<()>;
}

/// 基于 awc 的 HTTP 传输实现
///
/// 整体负载走 POST，分块走 PATCH，块序号通过请求头携带。
pub struct HttpTransport {
    endpoint: String,
    timeout: Duration,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout),
            user_agent: config.user_agent.clone(),
        }
    }

    fn client(&self) -> awc::Client {
        awc::Client::builder()
            .timeout(self.timeout)
            .add_default_header(("User-Agent", self.user_agent.as_str()))
            .finish()
    }
}

#[async_trait(?Send)]
impl UploadTransport for HttpTransport {
    async fn upload(
        &self,
        payload: &UploadPayload,
        on_progress: ProgressFn<'_>,
        cancel: &CancelHandle,
    ) -> UploadResult<()> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        if payload.name.is_empty() {
            return Err(UploadError::InvalidPayload("负载名称为空".to_string()));
        }

        let response = self
            .client()
            .post(self.endpoint.as_str())
            .insert_header(("X-Upload-Name", payload.name.as_str()))
            .send_body(payload.data.clone())
            .await
            .map_err(map_send_error)?;

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        status_to_result(response.status().as_u16())?;
        // awc 不提供请求体发送进度，完成后一次性上报
        on_progress(100.0);
        Ok(())
    }

    async fn upload_chunk(
        &self,
        payload: &UploadPayload,
        slice: Bytes,
        index: usize,
        total: usize,
        cancel: &CancelHandle,
    ) -> UploadResult<()> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let response = self
            .client()
            .patch(self.endpoint.as_str())
            .insert_header(("X-Upload-Name", payload.name.as_str()))
            .insert_header(("X-Chunk-Index", index.to_string()))
            .insert_header(("X-Chunk-Total", total.to_string()))
            .send_body(slice)
            .await
            .map_err(map_send_error)?;

        status_to_result(response.status().as_u16())
    }
}

fn map_send_error(error: awc::error::SendRequestError) -> UploadError {
    match error {
        awc::error::SendRequestError::Timeout => UploadError::Timeout,
        other => UploadError::Network(format!("{:?}", other)),
    }
}

/// 2xx 视为成功，其余按状态码交给错误分类
pub(crate) fn status_to_result(status: u16) -> UploadResult<()> {
    match status {
        200..=299 => Ok(()),
        status => Err(UploadError::Server { status }),
    }
}
