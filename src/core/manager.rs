use actix::prelude::*;
use futures::FutureExt;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::core::error::UploadError;
use crate::core::events::UploadListener;
use crate::core::task::record::{CancelHandle, UploadPayload, UploadTask, UploadTaskMeta};
use crate::core::task::retry::RetryStrategy;
use crate::core::task::state::TaskStatus;
use crate::core::task::transfer::{run_transfer, TransferSettings};
use crate::core::transport::UploadTransport;

/// ================== 队列统计 ==================

#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub uploading: usize,
    pub completed: usize,
    pub failed: usize,
    /// 所有任务 progress 字段的简单平均值，不按负载大小加权
    pub average_progress: f32,
}

/// ================== 消息定义 ==================

/// 提交一批上传任务，立即返回生成的任务ID（从不阻塞）
pub struct SubmitTasks {
    pub payloads: Vec<UploadPayload>,
}
impl Message for SubmitTasks { type Result = Vec<Uuid>; }

/// 取消指定任务；未知ID返回 false
pub struct CancelTaskById {
    pub task_id: Uuid,
}
impl Message for CancelTaskById { type Result = bool; }

/// 取消全部任务并清空注册表
pub struct CancelAllTasks;
impl Message for CancelAllTasks { type Result = (); }

/// 将所有 Failed 任务重新置为 Pending，返回重新入队的数量
pub struct RetryFailed;
impl Message for RetryFailed { type Result = usize; }

/// 查询队列统计
pub struct QueryStats;
impl Message for QueryStats { type Result = QueueStats; }

/// 查询指定任务元数据
pub struct QueryTaskMetaById {
    pub task_id: Uuid,
}
impl Message for QueryTaskMetaById { type Result = Option<UploadTaskMeta>; }

/// 查询所有任务ID（按提交顺序）
pub struct ListTasks;
impl Message for ListTasks { type Result = Vec<Uuid>; }

/// 内部：传输进度上报
pub(crate) struct UpdateTaskProgress {
    pub task_id: Uuid,
    pub progress: f32,
}
impl Message for UpdateTaskProgress { type Result = (); }

/// 内部：传输结束（成功/失败/取消）
pub(crate) struct TaskFinished {
    pub task_id: Uuid,
    pub outcome: Result<(), UploadError>,
}
impl Message for TaskFinished { type Result = (); }

/// ================== 上传管理器 Actor ==================

/// 上传任务管理器
///
/// 唯一的调度权威：注册表的全部状态变迁都在 actor 消息循环内串行执行，
/// 传输 IO 则以本地 future 并行推进，结束后经消息回报。
pub struct UploadManagerActor {
    config: UploadConfig,
    strategy: RetryStrategy,
    transport: Rc<dyn UploadTransport>,
    listener: Box<dyn UploadListener>,
    registry: HashMap<Uuid, UploadTask>,
    /// FIFO 待准入队列（提交顺序）
    pending: VecDeque<Uuid>,
    /// 已派发且传输尚未回报的任务；并发上限以此为准，
    /// 取消中的任务在传输退绕前仍占用并发槽
    active: HashSet<Uuid>,
    next_seq: u64,
}

impl Actor for UploadManagerActor {
    type Context = Context<Self>;
}

impl UploadManagerActor {
    pub fn new(
        config: UploadConfig,
        transport: Rc<dyn UploadTransport>,
        listener: Box<dyn UploadListener>,
    ) -> Self {
        let strategy = config.retry_strategy();
        Self {
            config,
            strategy,
            transport,
            listener,
            registry: HashMap::new(),
            pending: VecDeque::new(),
            active: HashSet::new(),
            next_seq: 0,
        }
    }

    /// 注册表快照，按提交顺序排序
    fn snapshot(&self) -> Vec<UploadTaskMeta> {
        let mut tasks: Vec<&UploadTask> = self.registry.values().collect();
        tasks.sort_by_key(|t| t.seq);
        tasks.iter().map(|t| t.meta()).collect()
    }

    /// 准入通道
    ///
    /// 只要有空闲并发槽且存在 Pending 任务就持续派发；
    /// 每次状态变迁后都会经由这里收口，并在结尾广播一次队列快照。
    fn dispatch(&mut self, ctx: &mut Context<Self>) {
        while self.active.len() < self.config.max_concurrent {
            let Some(id) = self.pending.pop_front() else { break };
            let Some(task) = self.registry.get_mut(&id) else { continue }; // 已被取消
            if task.status != TaskStatus::Pending {
                continue;
            }

            let cancel = CancelHandle::new();
            task.status = TaskStatus::Uploading;
            task.started_at = Some(Instant::now());
            task.ended_at = None;
            task.cancel = Some(cancel.clone());
            self.active.insert(id);
            log::debug!("任务 {} 开始上传: {}", id, task.payload.name);

            let payload = task.payload.clone();
            let transport = Rc::clone(&self.transport);
            let settings = TransferSettings {
                chunk_size: self.config.chunk_size,
                chunk_threshold: self.config.chunk_threshold(),
            };
            let addr = ctx.address();
            let progress_addr = addr.clone();
            let fut = run_transfer(payload, transport, cancel, settings, move |p| {
                progress_addr.do_send(UpdateTaskProgress { task_id: id, progress: p });
            });
            actix::spawn(fut.map(move |outcome| {
                addr.do_send(TaskFinished { task_id: id, outcome });
            }));
        }

        let snapshot = self.snapshot();
        self.listener.on_queue_update(&snapshot);
    }

    /// 退避计时器到期后重新入队
    fn readmit(&mut self, task_id: Uuid, ctx: &mut Context<Self>) {
        if let Some(task) = self.registry.get(&task_id) {
            if task.status == TaskStatus::Pending && !self.pending.contains(&task_id) {
                self.pending.push_back(task_id);
            }
        }
        self.dispatch(ctx);
    }

    /// Completed 任务滞留一段时间再移出注册表，让迟到的状态查询还能观察到结果
    fn schedule_removal(&self, task_id: Uuid, ctx: &mut Context<Self>) {
        let linger = Duration::from_millis(self.config.completed_linger_ms);
        ctx.run_later(linger, move |act, ctx| {
            if matches!(
                act.registry.get(&task_id).map(|t| &t.status),
                Some(TaskStatus::Completed)
            ) {
                act.registry.remove(&task_id);
                act.dispatch(ctx);
            }
        });
    }
}

/// ================== 消息处理 ==================

impl Handler<SubmitTasks> for UploadManagerActor {
    type Result = MessageResult<SubmitTasks>;
    fn handle(&mut self, msg: SubmitTasks, ctx: &mut Self::Context) -> Self::Result {
        let mut ids = Vec::with_capacity(msg.payloads.len());
        for payload in msg.payloads {
            let seq = self.next_seq;
            self.next_seq += 1;
            let task = UploadTask::new(seq, payload);
            let id = task.id;
            log::info!(
                "提交上传任务 {}: {} ({} 字节)",
                id,
                task.payload.name,
                task.payload.size()
            );
            self.registry.insert(id, task);
            self.pending.push_back(id);
            ids.push(id);
        }
        self.dispatch(ctx);
        MessageResult(ids)
    }
}

impl Handler<CancelTaskById> for UploadManagerActor {
    type Result = MessageResult<CancelTaskById>;
    fn handle(&mut self, msg: CancelTaskById, ctx: &mut Self::Context) -> Self::Result {
        let Some(task) = self.registry.get_mut(&msg.task_id) else {
            return MessageResult(false);
        };

        match task.status {
            TaskStatus::Uploading => {
                // 发出取消信号并立即移除；并发槽在传输实际退绕后才释放
                if let Some(cancel) = task.cancel.take() {
                    cancel.cancel();
                }
                self.registry.remove(&msg.task_id);
            }
            TaskStatus::Pending => {
                self.registry.remove(&msg.task_id);
                self.pending.retain(|id| *id != msg.task_id);
            }
            _ => {
                // 终态任务：直接移出注册表
                self.registry.remove(&msg.task_id);
            }
        }
        log::info!("取消任务 {}", msg.task_id);
        self.dispatch(ctx);
        MessageResult(true)
    }
}

impl Handler<CancelAllTasks> for UploadManagerActor {
    type Result = ();
    fn handle(&mut self, _msg: CancelAllTasks, ctx: &mut Self::Context) {
        for task in self.registry.values_mut() {
            if let Some(cancel) = task.cancel.take() {
                cancel.cancel();
            }
        }
        let cleared = self.registry.len();
        self.registry.clear();
        self.pending.clear();
        log::info!("已取消全部 {} 个任务", cleared);
        self.dispatch(ctx);
    }
}

impl Handler<RetryFailed> for UploadManagerActor {
    type Result = MessageResult<RetryFailed>;
    fn handle(&mut self, _msg: RetryFailed, ctx: &mut Self::Context) -> Self::Result {
        let mut failed: Vec<(u64, Uuid)> = self
            .registry
            .values()
            .filter(|t| matches!(t.status, TaskStatus::Failed(_)))
            .map(|t| (t.seq, t.id))
            .collect();
        // 按原始提交顺序重新入队
        failed.sort();

        for (_, id) in &failed {
            if let Some(task) = self.registry.get_mut(id) {
                task.status = TaskStatus::Pending;
                task.retry_count = 0;
                task.progress = 0.0;
                task.error = None;
                task.started_at = None;
                task.ended_at = None;
                self.pending.push_back(*id);
            }
        }

        let count = failed.len();
        if count > 0 {
            log::info!("重新入队 {} 个失败任务", count);
        }
        self.dispatch(ctx);
        MessageResult(count)
    }
}

impl Handler<QueryStats> for UploadManagerActor {
    type Result = MessageResult<QueryStats>;
    fn handle(&mut self, _msg: QueryStats, _ctx: &mut Self::Context) -> Self::Result {
        let mut stats = QueueStats {
            total: self.registry.len(),
            pending: 0,
            uploading: 0,
            completed: 0,
            failed: 0,
            average_progress: 0.0,
        };
        let mut progress_sum = 0.0f32;
        for task in self.registry.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Uploading => stats.uploading += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed(_) => stats.failed += 1,
                TaskStatus::Cancelled => {}
            }
            progress_sum += task.progress;
        }
        if stats.total > 0 {
            stats.average_progress = progress_sum / stats.total as f32;
        }
        MessageResult(stats)
    }
}

impl Handler<QueryTaskMetaById> for UploadManagerActor {
    type Result = MessageResult<QueryTaskMetaById>;
    fn handle(&mut self, msg: QueryTaskMetaById, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.registry.get(&msg.task_id).map(|t| t.meta()))
    }
}

impl Handler<ListTasks> for UploadManagerActor {
    type Result = MessageResult<ListTasks>;
    fn handle(&mut self, _msg: ListTasks, _ctx: &mut Self::Context) -> Self::Result {
        let mut tasks: Vec<(u64, Uuid)> =
            self.registry.values().map(|t| (t.seq, t.id)).collect();
        tasks.sort();
        MessageResult(tasks.into_iter().map(|(_, id)| id).collect())
    }
}

impl Handler<UpdateTaskProgress> for UploadManagerActor {
    type Result = ();
    fn handle(&mut self, msg: UpdateTaskProgress, _ctx: &mut Self::Context) {
        if let Some(task) = self.registry.get_mut(&msg.task_id) {
            // 进度只增不减，且只在 Uploading 期间有效
            if task.status == TaskStatus::Uploading && msg.progress > task.progress {
                task.progress = msg.progress.min(100.0);
                let meta = task.meta();
                self.listener.on_progress(&meta);
            }
        }
    }
}

impl Handler<TaskFinished> for UploadManagerActor {
    type Result = ();
    fn handle(&mut self, msg: TaskFinished, ctx: &mut Self::Context) {
        self.active.remove(&msg.task_id);

        let Some(task) = self.registry.get_mut(&msg.task_id) else {
            // 任务已被取消移除，这里只回收并发槽
            self.dispatch(ctx);
            return;
        };

        match msg.outcome {
            Ok(()) => {
                task.status = TaskStatus::Completed;
                task.progress = 100.0;
                task.ended_at = Some(Instant::now());
                task.cancel = None;
                let meta = task.meta();
                log::info!(
                    "任务 {} 上传完成: {} (耗时 {} 毫秒)",
                    msg.task_id,
                    meta.name,
                    meta.elapsed_ms.unwrap_or(0)
                );
                self.listener.on_complete(&meta);
                self.schedule_removal(msg.task_id, ctx);
            }
            Err(UploadError::Cancelled) => {
                // 取消不是失败：不重试、不上报 on_error，直接移除
                self.registry.remove(&msg.task_id);
            }
            Err(error) => {
                if self.strategy.should_retry(&error, task.retry_count) {
                    task.retry_count += 1;
                    task.status = TaskStatus::Pending;
                    task.progress = 0.0;
                    task.cancel = None;
                    let delay = self.strategy.get_delay(task.retry_count);
                    log::warn!(
                        "任务 {} 上传失败: {}，{} 毫秒后进行第 {} 次重试",
                        msg.task_id,
                        error,
                        delay.as_millis(),
                        task.retry_count
                    );
                    let task_id = msg.task_id;
                    ctx.run_later(delay, move |act, ctx| act.readmit(task_id, ctx));
                } else {
                    task.status = TaskStatus::Failed(error.to_string());
                    task.error = Some(error.to_string());
                    task.ended_at = Some(Instant::now());
                    task.cancel = None;
                    let meta = task.meta();
                    log::error!("任务 {} 上传失败（不再重试）: {}", msg.task_id, error);
                    self.listener.on_error(&meta, &error);
                }
            }
        }
        self.dispatch(ctx);
    }
}

/// ================== 测试 ==================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::cell::{Cell, RefCell};
    use tokio::sync::Semaphore;

    use crate::core::error::UploadResult;
    use crate::core::transport::ProgressFn;

    /// 可编排的假传输层
    ///
    /// - gated 中的名字会阻塞在信号量上，直到测试放行或任务被取消
    /// - fail_times 指定某名字先失败多少次瞬时错误
    /// - permanent 中的名字总是返回永久错误
    struct MockTransport {
        gate: Rc<Semaphore>,
        gated: Vec<String>,
        fail_times: RefCell<HashMap<String, u32>>,
        permanent: Vec<String>,
        upload_calls: RefCell<Vec<String>>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                gate: Rc::new(Semaphore::new(0)),
                gated: Vec::new(),
                fail_times: RefCell::new(HashMap::new()),
                permanent: Vec::new(),
                upload_calls: RefCell::new(Vec::new()),
            }
        }

        fn gated(mut self, names: &[&str]) -> Self {
            self.gated = names.iter().map(|s| s.to_string()).collect();
            self
        }

        fn failing(self, name: &str, times: u32) -> Self {
            self.fail_times.borrow_mut().insert(name.to_string(), times);
            self
        }

        fn permanent(mut self, name: &str) -> Self {
            self.permanent.push(name.to_string());
            self
        }
    }

    #[async_trait(?Send)]
    impl UploadTransport for MockTransport {
        async fn upload(
            &self,
            payload: &UploadPayload,
            on_progress: ProgressFn<'_>,
            cancel: &CancelHandle,
        ) -> UploadResult<()> {
            self.upload_calls.borrow_mut().push(payload.name.clone());

            if self.gated.contains(&payload.name) {
                loop {
                    if cancel.is_cancelled() {
                        return Err(UploadError::Cancelled);
                    }
                    match self.gate.try_acquire() {
                        Ok(permit) => {
                            permit.forget();
                            break;
                        }
                        Err(_) => tokio::time::sleep(Duration::from_millis(1)).await,
                    }
                }
            }

            if self.permanent.contains(&payload.name) {
                return Err(UploadError::InvalidPayload("服务器拒绝".to_string()));
            }
            if let Some(n) = self.fail_times.borrow_mut().get_mut(&payload.name) {
                if *n > 0 {
                    *n -= 1;
                    return Err(UploadError::Network("连接中断".to_string()));
                }
            }

            on_progress(100.0);
            Ok(())
        }

        async fn upload_chunk(
            &self,
            _payload: &UploadPayload,
            _slice: Bytes,
            _index: usize,
            _total: usize,
            _cancel: &CancelHandle,
        ) -> UploadResult<()> {
            Ok(())
        }
    }

    /// 记录监听器回调的共享状态
    #[derive(Default)]
    struct Recorded {
        completed: RefCell<Vec<String>>,
        errors: RefCell<Vec<String>>,
        queue_updates: Cell<usize>,
    }

    struct RecListener(Rc<Recorded>);

    impl UploadListener for RecListener {
        fn on_complete(&self, task: &UploadTaskMeta) {
            self.0.completed.borrow_mut().push(task.name.clone());
        }
        fn on_error(&self, task: &UploadTaskMeta, _error: &UploadError) {
            self.0.errors.borrow_mut().push(task.name.clone());
        }
        fn on_queue_update(&self, _tasks: &[UploadTaskMeta]) {
            self.0.queue_updates.set(self.0.queue_updates.get() + 1);
        }
    }

    fn test_config() -> UploadConfig {
        let mut config = UploadConfig::default();
        config.max_concurrent = 2;
        config.max_retries = 3;
        config.retry_base_delay_ms = 1;
        config.retry_max_delay_ms = 10;
        config.jitter_factor = 0.0;
        config.completed_linger_ms = 60_000;
        config
    }

    fn payload(name: &str) -> UploadPayload {
        UploadPayload::new(name, Bytes::from(vec![0u8; 16]))
    }

    fn start_manager(
        config: UploadConfig,
        transport: Rc<MockTransport>,
        recorded: Rc<Recorded>,
    ) -> Addr<UploadManagerActor> {
        UploadManagerActor::new(config, transport, Box::new(RecListener(recorded))).start()
    }

    /// 轮询统计直到满足条件，超时则带着最后一次统计 panic
    async fn wait_for(
        addr: &Addr<UploadManagerActor>,
        pred: impl Fn(&QueueStats) -> bool,
    ) -> QueueStats {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let stats = addr.send(QueryStats).await.unwrap();
            if pred(&stats) {
                return stats;
            }
            assert!(Instant::now() < deadline, "等待超时: {:?}", stats);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[actix_rt::test]
    async fn test_concurrency_ceiling_and_fifo_admission() {
        let transport = Rc::new(
            MockTransport::new().gated(&["t1", "t2", "t3", "t4", "t5"]),
        );
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded.clone());

        let payloads = (1..=5).map(|i| payload(&format!("t{}", i))).collect();
        let ids = addr.send(SubmitTasks { payloads }).await.unwrap();
        assert_eq!(ids.len(), 5);

        // 恰好 2 个进入 Uploading，3 个保持 Pending
        let stats = wait_for(&addr, |s| s.uploading == 2 && s.pending == 3).await;
        assert_eq!(stats.total, 5);

        // 前两个提交的先被准入（FIFO）；传输 future 的首次轮询可能稍晚于状态变迁
        let deadline = Instant::now() + Duration::from_secs(2);
        while transport.upload_calls.borrow().len() < 2 {
            assert!(Instant::now() < deadline, "等待传输启动超时");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(*transport.upload_calls.borrow(), vec!["t1", "t2"]);

        // 放行一个：完成一个即准入一个，上限始终是 2
        transport.gate.add_permits(1);
        wait_for(&addr, |s| s.completed == 1 && s.uploading == 2 && s.pending == 2).await;

        // 持续放行至全部完成；任意时刻 uploading 不超过上限
        transport.gate.add_permits(16);
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let stats = addr.send(QueryStats).await.unwrap();
            assert!(stats.uploading <= 2, "并发超限: {:?}", stats);
            if stats.completed == 5 {
                break;
            }
            assert!(Instant::now() < deadline, "等待超时: {:?}", stats);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(recorded.completed.borrow().len(), 5);
        assert!(recorded.errors.borrow().is_empty());
        assert!(recorded.queue_updates.get() > 0);
    }

    #[actix_rt::test]
    async fn test_transient_failures_then_success() {
        // 失败 2 次后第 3 次成功，max_retries = 3
        let transport = Rc::new(MockTransport::new().failing("a", 2));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded.clone());

        let ids = addr.send(SubmitTasks { payloads: vec![payload("a")] }).await.unwrap();

        wait_for(&addr, |s| s.completed == 1).await;
        let meta = addr
            .send(QueryTaskMetaById { task_id: ids[0] })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.status, TaskStatus::Completed);
        assert_eq!(meta.retry_count, 2);
        assert_eq!(meta.progress, 100.0);
        assert_eq!(transport.upload_calls.borrow().len(), 3);
        assert!(recorded.errors.borrow().is_empty());
    }

    #[actix_rt::test]
    async fn test_retries_exhausted_becomes_failed() {
        let transport = Rc::new(MockTransport::new().failing("a", 99));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded.clone());

        let ids = addr.send(SubmitTasks { payloads: vec![payload("a")] }).await.unwrap();

        wait_for(&addr, |s| s.failed == 1).await;
        let meta = addr
            .send(QueryTaskMetaById { task_id: ids[0] })
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(meta.status, TaskStatus::Failed(_)));
        // Failed 任务的 retry_count 等于 max_retries
        assert_eq!(meta.retry_count, 3);
        assert!(meta.error.is_some());
        // 初次尝试 + 3 次重试
        assert_eq!(transport.upload_calls.borrow().len(), 4);
        // on_error 恰好触发一次
        assert_eq!(*recorded.errors.borrow(), vec!["a"]);
        // 失败任务保留在统计中，不会悄悄消失
        let stats = addr.send(QueryStats).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total, 1);
    }

    #[actix_rt::test]
    async fn test_permanent_error_not_retried() {
        let transport = Rc::new(MockTransport::new().permanent("a"));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded.clone());

        let ids = addr.send(SubmitTasks { payloads: vec![payload("a")] }).await.unwrap();

        wait_for(&addr, |s| s.failed == 1).await;
        let meta = addr
            .send(QueryTaskMetaById { task_id: ids[0] })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.retry_count, 0);
        assert_eq!(transport.upload_calls.borrow().len(), 1);
    }

    #[actix_rt::test]
    async fn test_cancel_pending_removes_immediately() {
        let mut config = test_config();
        config.max_concurrent = 1;
        let transport = Rc::new(MockTransport::new().gated(&["a", "b"]));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(config, transport.clone(), recorded.clone());

        let ids = addr
            .send(SubmitTasks { payloads: vec![payload("a"), payload("b")] })
            .await
            .unwrap();
        wait_for(&addr, |s| s.uploading == 1 && s.pending == 1).await;

        // b 还在 Pending，取消立即生效
        assert!(addr.send(CancelTaskById { task_id: ids[1] }).await.unwrap());
        let stats = addr.send(QueryStats).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 0);

        // 未知ID返回 false
        assert!(!addr.send(CancelTaskById { task_id: Uuid::new_v4() }).await.unwrap());

        addr.send(CancelAllTasks).await.unwrap();
    }

    #[actix_rt::test]
    async fn test_cancel_uploading_frees_slot_without_on_error() {
        let mut config = test_config();
        config.max_concurrent = 1;
        let transport = Rc::new(MockTransport::new().gated(&["a"]));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(config, transport.clone(), recorded.clone());

        let ids = addr
            .send(SubmitTasks { payloads: vec![payload("a"), payload("b")] })
            .await
            .unwrap();
        wait_for(&addr, |s| s.uploading == 1).await;

        // 取消上传中的 a：注册表立即移除，槽位在传输退绕后释放，随后 b 被准入并完成
        assert!(addr.send(CancelTaskById { task_id: ids[0] }).await.unwrap());
        let stats = addr.send(QueryStats).await.unwrap();
        assert_eq!(stats.total, 1);

        wait_for(&addr, |s| s.completed == 1).await;
        assert_eq!(*recorded.completed.borrow(), vec!["b"]);
        // 取消不触发 on_error
        assert!(recorded.errors.borrow().is_empty());
    }

    #[actix_rt::test]
    async fn test_cancel_all_clears_everything() {
        let transport = Rc::new(MockTransport::new().gated(&["a", "b", "c", "d"]));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded.clone());

        let payloads = ["a", "b", "c", "d"].iter().map(|n| payload(n)).collect();
        addr.send(SubmitTasks { payloads }).await.unwrap();
        wait_for(&addr, |s| s.uploading == 2 && s.pending == 2).await;

        addr.send(CancelAllTasks).await.unwrap();
        let stats = addr.send(QueryStats).await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.uploading, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.failed, 0);
        assert!(recorded.errors.borrow().is_empty());
    }

    #[actix_rt::test]
    async fn test_retry_failed_resets_counters() {
        // 恰好失败 3 次：初次 + 2 次重试后耗尽 (max_retries = 2)，
        // RetryFailed 复位后第二轮首次尝试即成功
        let mut config = test_config();
        config.max_retries = 2;
        let transport = Rc::new(MockTransport::new().failing("a", 3));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(config, transport.clone(), recorded.clone());

        let ids = addr.send(SubmitTasks { payloads: vec![payload("a")] }).await.unwrap();
        wait_for(&addr, |s| s.failed == 1).await;
        let meta = addr
            .send(QueryTaskMetaById { task_id: ids[0] })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.retry_count, 2);

        let requeued = addr.send(RetryFailed).await.unwrap();
        assert_eq!(requeued, 1);

        wait_for(&addr, |s| s.completed == 1).await;
        let meta = addr
            .send(QueryTaskMetaById { task_id: ids[0] })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.status, TaskStatus::Completed);
        // RetryFailed 将计数清零，本轮未再失败
        assert_eq!(meta.retry_count, 0);
    }

    #[actix_rt::test]
    async fn test_progress_is_monotonic_while_uploading() {
        let transport = Rc::new(MockTransport::new().gated(&["a"]));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded.clone());

        let ids = addr.send(SubmitTasks { payloads: vec![payload("a")] }).await.unwrap();
        wait_for(&addr, |s| s.uploading == 1).await;
        let id = ids[0];

        addr.send(UpdateTaskProgress { task_id: id, progress: 40.0 }).await.unwrap();
        let meta = addr.send(QueryTaskMetaById { task_id: id }).await.unwrap().unwrap();
        assert_eq!(meta.progress, 40.0);

        // 回退的进度被丢弃
        addr.send(UpdateTaskProgress { task_id: id, progress: 25.0 }).await.unwrap();
        let meta = addr.send(QueryTaskMetaById { task_id: id }).await.unwrap().unwrap();
        assert_eq!(meta.progress, 40.0);

        // 越界的进度被钳制到 100
        addr.send(UpdateTaskProgress { task_id: id, progress: 120.0 }).await.unwrap();
        let meta = addr.send(QueryTaskMetaById { task_id: id }).await.unwrap().unwrap();
        assert_eq!(meta.progress, 100.0);

        addr.send(CancelAllTasks).await.unwrap();
    }

    #[actix_rt::test]
    async fn test_completed_task_removed_after_linger() {
        let mut config = test_config();
        config.completed_linger_ms = 20;
        let transport = Rc::new(MockTransport::new());
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(config, transport, recorded.clone());

        addr.send(SubmitTasks { payloads: vec![payload("a")] }).await.unwrap();
        wait_for(&addr, |s| s.completed == 1).await;

        // 滞留期过后从注册表消失
        wait_for(&addr, |s| s.total == 0).await;
        assert_eq!(recorded.completed.borrow().len(), 1);
    }

    #[actix_rt::test]
    async fn test_average_progress_is_simple_mean() {
        let transport = Rc::new(MockTransport::new().gated(&["slow"]));
        let recorded = Rc::new(Recorded::default());
        let addr = start_manager(test_config(), transport.clone(), recorded);

        addr.send(SubmitTasks { payloads: vec![payload("fast"), payload("slow")] })
            .await
            .unwrap();
        wait_for(&addr, |s| s.completed == 1 && s.uploading == 1).await;

        // (100 + 0) / 2，不按负载大小加权
        let stats = addr.send(QueryStats).await.unwrap();
        assert!((stats.average_progress - 50.0).abs() < f32::EPSILON);

        addr.send(CancelAllTasks).await.unwrap();
    }
}
