//! SQLite 键值存储
//!
//! 单表 kv(key PRIMARY KEY, value)，INSERT OR REPLACE 写入。
//! 读写失败只记日志不抛错（Store 契约是 best-effort）。

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};

use crate::store::Store;

/// SQLite 存储：单连接 + Mutex（访问模式为单写者，无需连接池）
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件并建表；父目录不存在时自动创建
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create store directory {:?}", parent))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store at {:?}", path))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create kv table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock().unwrap();
        match conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Store read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            [key, value],
        ) {
            tracing::warn!(key, error = %e, "Store write failed");
        }
    }

    fn remove(&self, key: &str) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute("DELETE FROM kv WHERE key = ?1", [key]) {
            tracing::warn!(key, error = %e, "Store delete failed");
        }
    }
}
