use actix::prelude::*;
use chrono::Local;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// 日志消息
pub struct LogMsg {
    pub level: LevelFilter,
    pub message: String,
}
impl Message for LogMsg { type Result = (); }

/// 日志Actor：带大小轮转的文件日志
pub struct LoggerActor {
    writer: BufWriter<File>,
    level: LevelFilter,
    file_path: String,
    max_size: u64, // 最大文件大小 (bytes)
    current_size: u64,
    unflushed: u64,
}

/// 累积多少字节后强制刷盘
const FLUSH_THRESHOLD: u64 = 4 * 1024;

impl LoggerActor {
    /// 创建新的日志Actor
    pub fn new(file_path: &str, level: LevelFilter, max_size: u64) -> Result<Self, std::io::Error> {
        // 确保日志目录存在
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(file_path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            writer: BufWriter::new(file),
            level,
            file_path: file_path.to_string(),
            max_size,
            current_size,
            unflushed: 0,
        })
    }

    /// 超过上限时把当前文件转存为 .1 并重新开始
    fn check_rotation(&mut self) -> Result<(), std::io::Error> {
        if self.current_size <= self.max_size {
            return Ok(());
        }
        self.writer.flush()?;

        let backup_path = format!("{}.1", self.file_path);
        if Path::new(&backup_path).exists() {
            std::fs::remove_file(&backup_path)?;
        }
        std::fs::rename(&self.file_path, &backup_path)?;

        let file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
        self.writer = BufWriter::new(file);
        self.current_size = 0;
        self.unflushed = 0;
        Ok(())
    }

    fn write_log(&mut self, level: LevelFilter, message: &str) -> Result<(), std::io::Error> {
        if level > self.level {
            return Ok(());
        }
        let log_entry = format!(
            "{} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );

        self.check_rotation()?;

        self.writer.write_all(log_entry.as_bytes())?;
        self.current_size += log_entry.len() as u64;
        self.unflushed += log_entry.len() as u64;

        // 错误日志立即落盘，普通日志按阈值批量刷
        if level <= LevelFilter::Error || self.unflushed >= FLUSH_THRESHOLD {
            self.writer.flush()?;
            self.unflushed = 0;
        }
        Ok(())
    }
}

impl Actor for LoggerActor {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let _ = self.writer.flush();
    }
}

impl Handler<LogMsg> for LoggerActor {
    type Result = ();
    fn handle(&mut self, msg: LogMsg, _ctx: &mut Self::Context) {
        if let Err(e) = self.write_log(msg.level, &msg.message) {
            eprintln!("日志写入失败: {}", e);
        }
    }
}

// 便捷的日志方法 - 为Addr<LoggerActor>提供扩展方法
pub trait LoggerExt {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

impl LoggerExt for Addr<LoggerActor> {
    fn info(&self, message: &str) {
        self.do_send(LogMsg { level: LevelFilter::Info, message: message.to_string() });
    }

    fn error(&self, message: &str) {
        self.do_send(LogMsg { level: LevelFilter::Error, message: message.to_string() });
    }

    fn warn(&self, message: &str) {
        self.do_send(LogMsg { level: LevelFilter::Warn, message: message.to_string() });
    }

    fn debug(&self, message: &str) {
        self.do_send(LogMsg { level: LevelFilter::Debug, message: message.to_string() });
    }
}
