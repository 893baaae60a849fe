use crate::core::error::UploadError;
use crate::core::task::record::UploadTaskMeta;

/// 上传事件监听器
///
/// 由调度器在状态变迁处同步调用；宿主负责把回调转交给自己的 UI 线程。
/// 所有方法都有空默认实现，按需覆盖。
pub trait UploadListener {
    /// 任务进度变化（仅 Uploading 期间）
    fn on_progress(&self, _task: &UploadTaskMeta) {}

    /// 任务完成
    fn on_complete(&self, _task: &UploadTaskMeta) {}

    /// 任务最终失败（重试耗尽或永久错误）；取消不会触发
    fn on_error(&self, _task: &UploadTaskMeta, _error: &UploadError) {}

    /// 队列整体变化（提交、准入、完成、取消、重试入队）
    fn on_queue_update(&self, _tasks: &[UploadTaskMeta]) {}
}

/// 空监听器
pub struct NullListener;

impl UploadListener for NullListener {}
