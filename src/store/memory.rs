//! 内存键值存储（测试用，不落盘）

use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::Store;

/// 内存存储：HashMap + Mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前条目数（测试断言用）
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("missing").is_none());

        store.set("k", "v1");
        assert_eq!(store.get("k").as_deref(), Some("v1"));

        store.set("k", "v2");
        assert_eq!(store.get("k").as_deref(), Some("v2"));

        store.remove("k");
        assert!(store.get("k").is_none());
        assert!(store.is_empty());
    }
}
