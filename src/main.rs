use actix::prelude::*;
use bytes::Bytes;
use crossterm::{
    cursor, execute, terminal,
    event::{self, Event, KeyCode},
};
use log::LevelFilter;
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use multiup::cli;
use multiup::core::{
    CancelAllTasks, HttpTransport, QueryStats, RetryFailed, SubmitTasks, UploadError,
    UploadListener, UploadManagerActor, UploadPayload, UploadTaskMeta,
};
use multiup::ui::{self, ProgressManager, UploadSummary};
use multiup::utils::logger::{LoggerActor, LoggerExt};
use multiup::utils::validator;

const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(100);
const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 终端侧的完成/失败计数，退出判定与最终汇总都依赖它
struct CliCounters {
    completed: Cell<usize>,
    failed: Cell<usize>,
}

/// 把管理器回调转成计数与文件日志
struct CliListener {
    counters: Rc<CliCounters>,
    logger: Addr<LoggerActor>,
}

impl UploadListener for CliListener {
    fn on_complete(&self, task: &UploadTaskMeta) {
        self.counters.completed.set(self.counters.completed.get() + 1);
        self.logger.info(&format!("上传完成: {}", task.name));
    }

    fn on_error(&self, task: &UploadTaskMeta, error: &UploadError) {
        self.counters.failed.set(self.counters.failed.get() + 1);
        self.logger.error(&format!("上传失败: {} - {}", task.name, error));
    }
}

#[actix::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let logger = LoggerActor::new("logs/app.log", LevelFilter::Info, 10 * 1024 * 1024)?.start();
    logger.info("程序启动");

    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok((args, config)) => (args, config),
        Err(e) => {
            logger.error(&format!("参数解析失败: {}", e));
            eprintln!("参数解析失败: {}", e);
            std::process::exit(1);
        }
    };

    // 获取上传文件列表
    let files = match args.get_files() {
        Ok(files) => files,
        Err(e) => {
            logger.error(&format!("获取文件列表失败: {}", e));
            eprintln!("获取文件列表失败: {}", e);
            std::process::exit(1);
        }
    };

    logger.info(&format!("解析到的文件: {:?}", files));
    logger.info(&format!("配置文件路径: {}", args.config));
    logger.info(&format!("配置摘要:\n{}", config.get_summary()));

    println!("配置加载成功");
    println!("{}", config.get_summary());

    // 读取文件内容构造上传负载
    let payloads = build_payloads(&files, &logger);
    if payloads.is_empty() {
        eprintln!("没有可上传的文件");
        return Ok(());
    }

    let total_files = payloads.len();
    let total_bytes: u64 = payloads.iter().map(|p| p.size()).sum();

    // 创建上传管理器
    let counters = Rc::new(CliCounters { completed: Cell::new(0), failed: Cell::new(0) });
    let listener = CliListener { counters: Rc::clone(&counters), logger: logger.clone() };
    let transport = Rc::new(HttpTransport::new(&config));
    let use_json = args.json;
    let manager = UploadManagerActor::new(config, transport, Box::new(listener)).start();
    logger.info("上传管理器已启动");

    // 提交全部任务
    let task_ids = manager.send(SubmitTasks { payloads }).await?;
    println!("\n开始上传... (按 'c' 取消全部, 'r' 重试失败, 'q' 退出)");
    logger.info(&format!("开始上传 {} 个任务", task_ids.len()));

    let started = Instant::now();

    // 主循环：处理键盘输入和更新进度
    run_upload_loop(&manager, total_files, &logger).await?;

    // 显示最终统计
    let final_stats = manager.send(QueryStats).await?;
    if use_json {
        println!("{}", serde_json::to_string_pretty(&final_stats)?);
    } else {
        let summary = UploadSummary {
            total_files,
            total_bytes,
            elapsed_time: started.elapsed(),
            success_count: counters.completed.get(),
            failed_count: final_stats.failed,
        };
        println!("{}", summary);
    }

    logger.info(&format!(
        "上传结束 - 成功: {}, 失败: {}",
        counters.completed.get(),
        final_stats.failed
    ));

    Ok(())
}

/// 逐个读取文件并构造负载，读取失败的文件跳过
fn build_payloads(files: &[String], logger: &Addr<LoggerActor>) -> Vec<UploadPayload> {
    let mut payloads = Vec::new();
    for path in files {
        match std::fs::read(path) {
            Ok(data) => {
                let name = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.clone());
                let name = validator::sanitize_name(&name);
                ui::print_success(&format!("加入上传队列: {}", path));
                logger.info(&format!("加入上传队列: {} -> {}", path, name));
                payloads.push(UploadPayload::new(name, Bytes::from(data)));
            }
            Err(e) => {
                ui::print_error(&format!("无法读取文件: {} - {}", path, e));
                logger.error(&format!("无法读取文件: {} - {}", path, e));
            }
        }
    }
    payloads
}

/// 运行上传主循环
async fn run_upload_loop(
    manager: &Addr<UploadManagerActor>,
    total_files: usize,
    logger: &Addr<LoggerActor>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut last_update = Instant::now();

    // 设置终端
    terminal::enable_raw_mode()?;
    execute!(std::io::stdout(), cursor::Hide)?;

    // 创建UI进度管理器
    let progress = ProgressManager::new(total_files);

    loop {
        // 处理键盘输入
        if let Ok(true) = event::poll(KEYBOARD_POLL_INTERVAL) {
            if let Ok(Event::Key(key_event)) = event::read() {
                match key_event.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => {
                        println!("\n用户退出");
                        logger.info("用户主动退出上传");
                        break;
                    }
                    KeyCode::Char('c') | KeyCode::Char('C') => {
                        manager.send(CancelAllTasks).await?;
                        println!("\n已取消所有上传任务");
                        logger.info("用户取消所有上传任务");
                        break;
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        let requeued = manager.send(RetryFailed).await?;
                        println!("\n重新入队 {} 个失败任务", requeued);
                        logger.info(&format!("用户重试 {} 个失败任务", requeued));
                    }
                    _ => {}
                }
            }
        }

        // 更新进度
        if last_update.elapsed() >= PROGRESS_UPDATE_INTERVAL {
            let stats = manager.send(QueryStats).await?;
            progress.update(&stats, total_files);

            // 没有待处理也没有传输中的任务即结束
            if stats.pending == 0 && stats.uploading == 0 {
                break;
            }

            last_update = Instant::now();
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // 恢复终端
    execute!(std::io::stdout(), cursor::Show)?;
    terminal::disable_raw_mode()?;
    progress.finish();

    Ok(())
}
