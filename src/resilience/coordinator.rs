//! 请求去重：按缓存键的进程内在途锁
//!
//! 同键请求在途时不发起第二次远程调用。完成后延迟一个宽限期（默认 5 秒）
//! 才释放标记，吸收短时间内的重复触发（UI 重渲染风暴会在锁释放瞬间
//! 抢跑）。仅进程内 best-effort，不保证多进程下的全局至多一次。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 在途锁的默认释放宽限期
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// 在途请求注册表（进程内，不持久化）
#[derive(Clone)]
pub struct InFlightRegistry {
    keys: Arc<Mutex<HashSet<String>>>,
    grace: Duration,
}

impl Default for InFlightRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

impl InFlightRegistry {
    pub fn new(grace: Duration) -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashSet::new())),
            grace,
        }
    }

    /// 尝试标记 key 在途；已在途返回 false
    pub fn try_acquire(&self, key: &str) -> bool {
        self.keys.lock().unwrap().insert(key.to_string())
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }

    /// 请求完成（无论成败）后调用：宽限期过后释放在途标记
    pub fn release_after_grace(&self, key: &str) {
        let keys = Arc::clone(&self.keys);
        let key = key.to_string();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            keys.lock().unwrap().remove(&key);
            tracing::debug!(key = %key, "In-flight lock released");
        });
    }
}
