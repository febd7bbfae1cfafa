//! 日滚动引擎：跨日时把过期的未完成任务迁移到今天
//!
//! 纯状态转换，由外部定时驱动。已完成任务与日期不早于今天的任务不动；
//! original_date 只在第一次滚动时记录。对同一天重复应用是幂等的。
//! 宿主进程休眠任意久后恢复，下一次检查一步追到今天，无需逐日回放。

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::tasks::Task;

/// 把所有 date < today 的未完成任务改到 today；有改动返回 true
pub fn rollover(tasks: &mut [Task], today: NaiveDate) -> bool {
    let mut changed = false;
    for task in tasks.iter_mut() {
        if !task.completed && task.date < today {
            task.original_date = task.original_date.or(Some(task.date));
            task.date = today;
            changed = true;
        }
    }
    if changed {
        tracing::info!(%today, "Rolled over stale incomplete tasks");
    }
    changed
}

/// 日界检测：记住上次看到的 day key，变化时报告新的日历日
#[derive(Debug)]
pub struct DayWatcher {
    day_key: String,
}

impl DayWatcher {
    pub fn new(clock: &dyn Clock) -> Self {
        Self {
            day_key: clock.day_key(),
        }
    }

    /// day key 与记忆不符时更新记忆并返回新日期；未跨日返回 None
    pub fn check(&mut self, clock: &dyn Clock) -> Option<NaiveDate> {
        let current = clock.day_key();
        if current == self.day_key {
            return None;
        }
        tracing::info!(from = %self.day_key, to = %current, "Day boundary crossed");
        self.day_key = current;
        Some(clock.today())
    }
}
