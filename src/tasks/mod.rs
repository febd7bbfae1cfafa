//! 任务层：任务模型与日滚动引擎

pub mod rollover;

pub use rollover::{rollover, DayWatcher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 任务优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// 待办任务。original_date 在第一次滚动时记录原始创建日，之后不再覆盖。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_date: Option<NaiveDate>,
}

impl Task {
    pub fn new(text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: format!("task_{}", uuid::Uuid::new_v4()),
            text: text.into(),
            completed: false,
            priority: Priority::default(),
            date,
            original_date: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
