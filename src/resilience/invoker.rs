//! 弹性调用器：熔断检查 → 错误分类 → 指数退避重试
//!
//! 分类规则：429 或消息含 quota/limit/exhausted 为配额类；状态码 ≥500 与
//! 传输层故障为瞬时类；其余（含响应结构错误）为致命类，立即传播。
//! 配额类错误按策略触发熔断（星座路径触发，助手路径不触发），触发后
//! 本次调用不再重试。重试用显式循环与尝试计数器，退避每次 ×2。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::remote::RemoteError;
use crate::resilience::CircuitBreaker;

/// 弹性层对外的失败类型
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// 熔断已打开，未发起网络请求
    #[error("API quota cooldown in effect")]
    QuotaCooldown,

    /// 本次调用命中配额上限并触发了熔断
    #[error("API quota exhausted")]
    QuotaExhausted,

    /// 重试耗尽或不可重试的底层错误
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl InvokeError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaCooldown | Self::QuotaExhausted)
    }
}

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// 配额类错误是否触发熔断
    pub trips_breaker: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_secs(5),
            trips_breaker: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    Quota,
    Transient,
    Fatal,
}

fn classify(err: &RemoteError) -> ErrorClass {
    match err {
        RemoteError::Http { status, message } => {
            let message = message.to_lowercase();
            if *status == 429
                || message.contains("quota")
                || message.contains("limit")
                || message.contains("exhausted")
            {
                ErrorClass::Quota
            } else if *status >= 500 {
                ErrorClass::Transient
            } else {
                ErrorClass::Fatal
            }
        }
        RemoteError::Network(_) => ErrorClass::Transient,
        RemoteError::InvalidResponse(_) => ErrorClass::Fatal,
    }
}

/// 弹性调用器：包装单次远程操作
pub struct ResilientInvoker {
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(breaker: Arc<CircuitBreaker>, policy: RetryPolicy) -> Self {
        Self { breaker, policy }
    }

    /// 执行 op；熔断打开时立即失败，瞬时错误退避重试，致命错误直接传播。
    /// 除熔断时间戳外无任何副作用（缓存不在这一层）。
    pub async fn invoke<T, F, Fut>(&self, op: F) -> Result<T, InvokeError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        if self.breaker.is_open() {
            return Err(InvokeError::QuotaCooldown);
        }

        let mut delay = self.policy.initial_delay;
        let mut attempts_left = self.policy.max_retries;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            match classify(&err) {
                ErrorClass::Quota if self.policy.trips_breaker => {
                    self.breaker.trip();
                    return Err(InvokeError::QuotaExhausted);
                }
                ErrorClass::Fatal => return Err(err.into()),
                // 配额类在不触发熔断的路径上与瞬时类同样退避重试
                ErrorClass::Quota | ErrorClass::Transient => {
                    if attempts_left == 0 {
                        return Err(err.into());
                    }
                    attempts_left -= 1;
                    tracing::warn!(
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}
