use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::UploadError;
use crate::core::task::retry::RetryStrategy;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadConfig {
    /// 上传端点 URL
    pub endpoint: String,
    /// 最大并发上传数
    pub max_concurrent: usize,
    /// 最大重试次数
    pub max_retries: u32,
    /// 首次重试延迟（毫秒）
    pub retry_base_delay_ms: u64,
    /// 最大重试延迟（毫秒）
    pub retry_max_delay_ms: u64,
    /// 重试抖动因子（0-1）
    pub jitter_factor: f64,
    /// 分块大小（字节）
    pub chunk_size: u64,
    /// 分块阈值倍数：负载超过 chunk_size * 倍数 时启用分块
    pub chunk_threshold_multiplier: u64,
    /// Completed 任务在注册表中的滞留时间（毫秒）
    pub completed_linger_ms: u64,
    /// 网络超时时间（秒）
    pub timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 未知错误中按消息子串判定可重试的白名单（默认为空：未知错误不重试）
    pub retryable_unknown: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/upload".to_string(),
            max_concurrent: 3,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 60_000,
            jitter_factor: 0.1,
            chunk_size: 1024 * 1024, // 1 MiB
            chunk_threshold_multiplier: 5,
            completed_linger_ms: 3000,
            timeout: 30,
            user_agent: "MultiUp/1.0".to_string(),
            retryable_unknown: Vec::new(),
        }
    }
}

impl UploadConfig {
    /// 加载配置文件；不存在或格式错误时落回默认配置并写回
    pub fn load(path: &str) -> Result<Self, UploadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    eprintln!("配置文件格式错误: {}，将使用默认配置", e);
                    let config = UploadConfig::default();
                    config.save_with_tutorial(path)?;
                    Ok(config)
                }
            }
        } else {
            let config = UploadConfig::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), UploadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let tutorial_content = UploadConfig::generate_tutorial_content();
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| UploadError::Unknown(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n\n{}", tutorial_content, config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    /// 生成配置文件教程内容（静态方法）
    fn generate_tutorial_content() -> String {
        r#"# MultiUp 配置文件
# ====================
#
# 这是一个 TOML 格式的配置文件，用于配置 MultiUp 上传管理器的行为。
# 命令行参数会覆盖配置文件中的设置，优先级：命令行 > 配置文件 > 默认值
#
# 配置文件位置：
# - Windows: %APPDATA%/multiup/multiup.conf
# - macOS: ~/Library/Application Support/multiup/multiup.conf
# - Linux: ~/.config/multiup/multiup.conf
#
# 使用示例：
#   multiup photo.jpg video.mp4                 # 使用默认配置上传
#   multiup -u https://example.com/upload *.log # 指定上传端点
#   multiup -j 5 big.iso                        # 最多 5 个并发上传
#   multiup -f files.txt                        # 从清单文件批量上传
#
# ==================== 上传设置 ====================
#
# endpoint: 上传端点 URL
# max_concurrent: 同时进行的上传任务数，建议 1-5
# chunk_size: 分块大小（字节），大负载按此切块顺序发送
# chunk_threshold_multiplier: 负载超过 chunk_size * 倍数 时启用分块
#
# ==================== 重试设置 ====================
#
# max_retries: 瞬时错误（网络、超时、5xx）的最大重试次数
# retry_base_delay_ms: 首次重试延迟，之后按指数退避翻倍
# retry_max_delay_ms: 退避延迟上限
# jitter_factor: 退避抖动因子，避免大批任务同步重试
# retryable_unknown: 未知错误中按消息子串判定可重试的白名单
#
# ==================== 网络设置 ====================
#
# timeout: 单次请求超时时间（秒）
# user_agent: User-Agent 请求头
#
# ==================== 配置项 ===================="#
            .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), UploadError> {
        if !crate::utils::validator::is_valid_endpoint(&self.endpoint) {
            return Err(UploadError::Unknown(format!(
                "无效的上传端点: {}",
                self.endpoint
            )));
        }

        crate::utils::validator::validate_concurrency(self.max_concurrent)
            .map_err(|e| UploadError::Unknown(e.to_string()))?;

        if self.chunk_size == 0 {
            return Err(UploadError::Unknown("分块大小必须大于0".to_string()));
        }

        if self.chunk_threshold_multiplier == 0 {
            return Err(UploadError::Unknown("分块阈值倍数必须大于0".to_string()));
        }

        if self.timeout == 0 {
            return Err(UploadError::Unknown("超时时间必须大于0".to_string()));
        }

        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        // 命令行参数覆盖配置文件
        if let Some(endpoint) = &args.endpoint {
            self.endpoint = endpoint.clone();
        }

        if let Some(max_concurrent) = args.max_concurrent {
            self.max_concurrent = max_concurrent;
        }
    }

    /// 由配置派生重试策略
    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            backoff_multiplier: 2.0,
            jitter_factor: self.jitter_factor,
            retryable_unknown: self.retryable_unknown.clone(),
        }
    }

    /// 分块阈值（字节）
    pub fn chunk_threshold(&self) -> u64 {
        self.chunk_size * self.chunk_threshold_multiplier
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 上传端点: {}\n\
            - 并发数: {}\n\
            - 重试次数: {}\n\
            - 首次重试延迟: {} 毫秒\n\
            - 分块大小: {} 字节\n\
            - 分块阈值: {} 字节\n\
            - 超时时间: {} 秒",
            self.endpoint,
            self.max_concurrent,
            self.max_retries,
            self.retry_base_delay_ms,
            self.chunk_size,
            self.chunk_threshold(),
            self.timeout
        )
    }
}
