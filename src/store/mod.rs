//! 键值存储层
//!
//! 所有持久化状态（仪表盘状态、日界缓存、熔断时间戳）都走同一个最小
//! Store 能力：字符串进出，实现决定落盘方式。内存实现供测试，SQLite
//! 实现供正式使用。

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 最小键值存储能力
///
/// 写入是 best-effort：实现内部处理并记录失败，不向调用方抛错（持久层
/// 故障不应打断仪表盘逻辑）。
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}
