//! CLI: 命令行接口和参数解析模块
//!
//! ## 主要功能
//!
//! - 命令行参数解析和验证
//! - 配置文件路径管理
//! - 上传文件列表处理（命令行参数和清单文件）
//! - 平台特定的路径处理
//! - 配置文件编辑器集成
//!
//! ## 支持的命令
//!
//! - 基本上传：`multiup <file>`
//! - 批量上传：`multiup -f files.txt`
//! - 编辑配置：`multiup -e`
//! - 指定配置：`multiup -c config.conf <file>`
//! - 指定端点：`multiup -u https://example.com/upload <file>`
//!
//! ## 平台支持
//!
//! - Windows: `%APPDATA%/multiup/multiup.conf`
//! - macOS: `~/Library/Application Support/multiup/multiup.conf`
//! - Linux: `~/.config/multiup/multiup.conf`

use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;

use crate::config::UploadConfig;
use crate::core::error::UploadError;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/multiup/multiup.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/multiup/multiup.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/multiup/multiup.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// MultiUp 命令行参数
///
/// 示例用法：
///   multiup photo.jpg video.mp4
///   multiup -e  # 编辑配置文件
///   multiup -c /path/to/config.conf report.pdf
///   multiup -u https://example.com/upload big.iso
///
/// 更多用法请加 --help 查看
#[derive(Parser, Debug, Clone)]
#[command(
    name = "multiup",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "一个用 Rust 编写的并发上传任务管理器",
    long_about = "支持并发上传、自动重试、大文件分块与实时进度显示的上传管理器。\n\n示例：\n  multiup photo.jpg video.mp4\n  multiup -e\n  multiup -c /path/to/config.conf report.pdf\n  multiup -u https://example.com/upload -j 5 big.iso\n"
)]
pub struct Args {
    /// 要上传的文件列表（可同时指定多个）
    #[arg(required = false, help = "要上传的文件路径列表，可以同时指定多个。")]
    pub files: Vec<String>,

    /// 包含文件路径列表的清单文件
    #[arg(short = 'f', long, help = "包含文件路径列表的清单文件，每行一个路径。")]
    pub list: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 上传端点，覆盖配置文件
    #[arg(short = 'u', long, help = "上传端点 URL，覆盖配置文件中的设置。")]
    pub endpoint: Option<String>,

    /// 最大并发上传数，覆盖配置文件
    #[arg(short = 'j', long, help = "最大并发上传数，覆盖配置文件中的设置。")]
    pub max_concurrent: Option<usize>,

    /// 以 JSON 输出最终统计
    #[arg(long, help = "以 JSON 格式输出最终统计。")]
    pub json: bool,
}

impl Args {
    /// 解析命令行参数并加载配置
    pub fn parse_args() -> Result<(Self, UploadConfig), UploadError> {
        let args = Args::parse();

        // --edit 逻辑
        if args.edit_config {
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        // 加载或创建配置文件
        let mut config = UploadConfig::load(&args.config)?;

        // 合并命令行参数到配置
        config.merge_from_args(&args);

        // 验证配置
        config.validate()?;

        Ok((args, config))
    }

    /// 汇总要上传的文件路径（命令行参数 + 清单文件）
    pub fn get_files(&self) -> Result<Vec<String>, UploadError> {
        let mut files = Vec::new();
        files.extend_from_slice(&self.files);

        // 如果提供了清单文件，从中逐行读取路径
        if let Some(list_path) = &self.list {
            if !Path::new(list_path).exists() {
                return Err(UploadError::Io(format!("清单文件不存在: {}", list_path)));
            }
            let content = fs::read_to_string(list_path)?;

            // 按行读取路径，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    files.push(line.to_string());
                }
            }
        }

        crate::utils::validator::validate_files(&files)
            .map_err(|e| UploadError::InvalidPayload(e.to_string()))?;

        Ok(files)
    }
}
