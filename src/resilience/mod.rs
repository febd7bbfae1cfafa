//! 弹性层：熔断、退避重试、在途去重与日界缓存
//!
//! 所有远程生成调用都从这里经过：InFlightRegistry 避免同键并发，
//! ResilientInvoker 做熔断与退避，ResponseCache 按日缓存结果。

pub mod cache;
pub mod circuit;
pub mod coordinator;
pub mod invoker;

pub use cache::ResponseCache;
pub use circuit::{CircuitBreaker, BLOCKED_UNTIL_KEY, DEFAULT_COOLDOWN};
pub use coordinator::{InFlightRegistry, DEFAULT_GRACE};
pub use invoker::{InvokeError, ResilientInvoker, RetryPolicy};
