use std::time::Duration;
use crate::core::error::UploadError;

/// 重试策略
///
/// 纯函数集合：判定错误是否可重试、计算第 n 次重试前的退避延迟。
/// 调度器不感知具体错误类型，分类规则全部收敛在这里。
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64, // 抖动因子，避免大批任务同步重试形成风暴
    /// 未知/IO 错误中按消息子串判定可重试的白名单；默认留空，未知错误一律不重试
    pub retryable_unknown: Vec<String>,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            retryable_unknown: Vec::new(),
        }
    }
}

impl RetryStrategy {
    /// 错误分类 + 次数上限判定
    pub fn should_retry(&self, error: &UploadError, retry_count: u32) -> bool {
        if retry_count >= self.max_retries {
            return false;
        }

        match error {
            UploadError::Network(_) | UploadError::Timeout => true,
            UploadError::Server { status } => (500..=599).contains(status),
            // 取消不属于失败，永远不重试
            UploadError::Cancelled => false,
            UploadError::InvalidPayload(_) => false,
            UploadError::Io(msg) | UploadError::Unknown(msg) => {
                let msg = msg.to_lowercase();
                self.retryable_unknown.iter().any(|s| msg.contains(s.as_str()))
            }
        }
    }

    /// 第 retry_count 次重试前的延迟：base * multiplier^(n-1)，叠加抖动后收敛到 [100ms, max_delay]
    pub fn get_delay(&self, retry_count: u32) -> Duration {
        let attempt = retry_count.max(1);
        let delay_secs = self.base_delay.as_secs_f64()
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let jitter = delay_secs * self.jitter_factor * (rand::random::<f64>() - 0.5);
        let final_delay = (delay_secs + jitter).max(0.1);

        Duration::from_secs_f64(final_delay).min(self.max_delay)
    }
}
