//! 熔断器：配额耗尽后的冷却窗口
//!
//! blocked_until 毫秒时间戳持久化在 Store（跨进程、跨重启生效）。
//! 当前时间早于该时刻时所有远程调用直接短路，不发起网络请求；
//! 过期或无法解析的时间戳顺手清除。

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::store::Store;

/// 熔断时间戳的存储键
pub const BLOCKED_UNTIL_KEY: &str = "aura_api_blocked_until";

/// 配额熔断的默认冷却时长
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// 持久化熔断器
pub struct CircuitBreaker {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    cooldown_ms: i64,
}

impl CircuitBreaker {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            store,
            clock,
            cooldown_ms: cooldown.as_millis() as i64,
        }
    }

    /// 是否处于冷却期
    pub fn is_open(&self) -> bool {
        let Some(raw) = self.store.get(BLOCKED_UNTIL_KEY) else {
            return false;
        };
        match raw.parse::<i64>() {
            Ok(until) if self.clock.now_ms() < until => {
                tracing::debug!(blocked_until = until, "API is in cooldown, skipping request");
                true
            }
            _ => {
                self.store.remove(BLOCKED_UNTIL_KEY);
                false
            }
        }
    }

    /// 触发熔断：冷却到 now + cooldown
    pub fn trip(&self) {
        let until = self.clock.now_ms() + self.cooldown_ms;
        self.store.set(BLOCKED_UNTIL_KEY, &until.to_string());
        tracing::warn!(blocked_until = until, "Quota exhausted, circuit breaker tripped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn breaker() -> (Arc<MemoryStore>, Arc<FixedClock>, CircuitBreaker) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            1_000_000,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        ));
        let cb = CircuitBreaker::new(
            store.clone(),
            clock.clone(),
            Duration::from_secs(3600),
        );
        (store, clock, cb)
    }

    #[test]
    fn test_closed_by_default() {
        let (_, _, cb) = breaker();
        assert!(!cb.is_open());
    }

    #[test]
    fn test_trip_opens_until_cooldown_elapses() {
        let (store, clock, cb) = breaker();

        cb.trip();
        assert!(cb.is_open());
        assert!(store.get(BLOCKED_UNTIL_KEY).is_some());

        clock.advance_ms(3600 * 1000 - 1);
        assert!(cb.is_open());

        clock.advance_ms(2);
        assert!(!cb.is_open());
        // 过期时间戳被清除
        assert!(store.get(BLOCKED_UNTIL_KEY).is_none());
    }

    #[test]
    fn test_malformed_timestamp_is_discarded() {
        let (store, _, cb) = breaker();
        store.set(BLOCKED_UNTIL_KEY, "not-a-number");
        assert!(!cb.is_open());
        assert!(store.get(BLOCKED_UNTIL_KEY).is_none());
    }
}
