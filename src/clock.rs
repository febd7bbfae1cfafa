//! 时间源抽象
//!
//! 熔断窗口、日界缓存键与日滚动都依赖「当前时间」；抽象为 Clock trait 后，
//! 测试可注入任意时刻（FixedClock），生产用本地时区的 SystemClock。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// 时间源：毫秒时间戳 + 本地日历日
pub trait Clock: Send + Sync {
    /// 当前 Unix 毫秒时间戳
    fn now_ms(&self) -> i64;

    /// 当前本地日历日
    fn today(&self) -> NaiveDate;

    /// 当前本地日期时间（助手上下文的时间分解用）
    fn now(&self) -> NaiveDateTime;

    /// 日界检测与缓存键用的 day key（YYYY-MM-DD）
    fn day_key(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }
}

/// 系统时钟（本地时区）
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// 测试时钟：毫秒时刻与日历日都可设定、可推进
#[derive(Debug)]
pub struct FixedClock {
    ms: AtomicI64,
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(ms: i64, today: NaiveDate) -> Self {
        Self {
            ms: AtomicI64::new(ms),
            today: Mutex::new(today),
        }
    }

    /// 推进毫秒时刻（不改变日历日）
    pub fn advance_ms(&self, delta: i64) {
        self.ms.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_today(&self, date: NaiveDate) {
        *self.today.lock().unwrap() = date;
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.ms.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }

    // 测试夹具：时刻按 UTC 解释
    fn now(&self) -> NaiveDateTime {
        DateTime::from_timestamp_millis(self.now_ms())
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}
