//! MultiUp: 一个用 Rust 编写的并发上传任务管理器
//!
//! 核心入口是 [`core::manager::UploadManagerActor`]：接收一批上传任务，
//! 在并发上限内调度传输、失败退避重试、支持取消与大文件分块，并通过
//! [`core::events::UploadListener`] 向宿主同步上报进度与结果。

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;
pub mod utils;
