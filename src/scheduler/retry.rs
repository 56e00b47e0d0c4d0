//! 每任务重试状态机
//!
//! Pending → InFlight → (Succeeded | RetryPending → InFlight | FailedTerminal)
//!
//! 只有临时错误（限流、超时、5xx）进入 RetryPending；退避延迟按
//! 尝试次数翻倍并封顶，限流响应给出的等待时间优先于计算值。

use std::time::Duration;

use tokio::time::sleep;

use crate::config::Config;
use crate::error::SolveError;

/// 任务执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// 尚未开始
    Pending,
    /// 第 attempt 次尝试进行中
    InFlight { attempt: u32 },
    /// 等待退避后重试
    RetryPending { attempt: u32, delay: Duration },
    /// 成功（终态）
    Succeeded,
    /// 失败（终态），重试预算耗尽或遇到不可重试错误
    FailedTerminal,
}

/// 重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub budget: u32,
    /// 退避基础延迟
    pub base: Duration,
    /// 退避延迟上限
    pub cap: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            budget: config.retry_budget,
            base: Duration::from_millis(config.backoff_base_ms),
            cap: Duration::from_millis(config.backoff_cap_ms),
        }
    }

    /// 第 attempt 次失败后的退避延迟：base * 2^(attempt-1)，封顶 cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(multiplier).min(self.cap)
    }

    /// 结合错误信息的实际延迟：限流响应的 Retry-After 优先
    pub fn delay_after(&self, attempt: u32, err: &SolveError) -> Duration {
        let backoff = self.backoff(attempt);
        if let SolveError::RateLimited {
            retry_after: Some(secs),
        } = err
        {
            backoff.max(Duration::from_secs(*secs))
        } else {
            backoff
        }
    }

    /// 驱动状态机执行一次远程调用，直到成功或终态失败
    ///
    /// `op` 每次尝试被调用一次并返回本次调用的 Future；
    /// `on_retry` 在每次进入 RetryPending 时调用（用于日志和进度广播）。
    pub async fn run<T, F, Fut>(
        &self,
        mut op: F,
        mut on_retry: impl FnMut(u32, Duration, &SolveError),
    ) -> Result<T, SolveError>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, SolveError>>,
    {
        let budget = self.budget.max(1);
        let mut outcome: Option<Result<T, SolveError>> = None;
        let mut state = TaskState::Pending;

        loop {
            state = match state {
                TaskState::Pending => TaskState::InFlight { attempt: 1 },
                TaskState::InFlight { attempt } => match op(attempt).await {
                    Ok(value) => {
                        outcome = Some(Ok(value));
                        TaskState::Succeeded
                    }
                    Err(err) if err.is_retryable() && attempt < budget => {
                        let delay = self.delay_after(attempt, &err);
                        on_retry(attempt, delay, &err);
                        TaskState::RetryPending { attempt, delay }
                    }
                    Err(err) => {
                        outcome = Some(Err(err));
                        TaskState::FailedTerminal
                    }
                },
                TaskState::RetryPending { attempt, delay } => {
                    sleep(delay).await;
                    TaskState::InFlight {
                        attempt: attempt + 1,
                    }
                }
                TaskState::Succeeded | TaskState::FailedTerminal => break,
            };
        }

        match outcome {
            Some(result) => result,
            None => Err(SolveError::Fatal("重试状态机未产生结果".to_string())),
        }
    }
}
