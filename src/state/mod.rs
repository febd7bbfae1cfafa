//! 仪表盘持久化状态
//!
//! events / tasks / periods / 健康面板可见性 / 国家偏好 / 背景图 / 生日，
//! 列表与布尔值以 JSON 存入 Store，字符串偏好按原样存取。载入完成前抑制
//! 持久化，避免「加载 → 写回刚加载的数据」自反馈；损坏的条目丢弃并回退
//! 默认值。日界守护在这里驱动任务滚动并推进当前查看日期。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::store::Store;
use crate::tasks::{rollover, DayWatcher, Task};

/// 持久化键（逻辑名，与存储引擎无关）
pub mod keys {
    pub const EVENTS: &str = "aura_events";
    pub const TASKS: &str = "aura_todos";
    pub const PERIODS: &str = "aura_periods";
    pub const SHOW_HEALTH: &str = "aura_show_health";
    pub const COUNTRY: &str = "aura_selected_country";
    pub const BACKGROUND: &str = "aura_bg";
    pub const BIRTH_DATE: &str = "aura_birthdate";
}

const DEFAULT_COUNTRY: &str = "Australia";
const DEFAULT_BACKGROUND: &str =
    "https://images.pexels.com/photos/417074/pexels-photo-417074.jpeg?auto=compress&cs=tinysrgb&w=2560";

/// 事件分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Work,
    Personal,
    Holiday,
    Health,
}

/// 日历事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: EventCategory,
}

/// 周期记录的端点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Start,
    End,
}

/// 周期追踪记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: PeriodKind,
}

/// 内存中的仪表盘状态
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub events: Vec<CalendarEvent>,
    pub tasks: Vec<Task>,
    pub periods: Vec<PeriodRecord>,
    pub show_health: bool,
    pub selected_country: String,
    pub background_image: String,
    pub birth_date: String,
    /// UI 当前查看的日期；跨日时推进，避免界面停在昨天
    pub viewed_date: NaiveDate,
}

impl DashboardState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            events: Vec::new(),
            tasks: Vec::new(),
            periods: Vec::new(),
            show_health: false,
            selected_country: DEFAULT_COUNTRY.to_string(),
            background_image: DEFAULT_BACKGROUND.to_string(),
            birth_date: String::new(),
            viewed_date: today,
        }
    }
}

/// 状态仓库：内存状态 + Store 持久化 + 水合守卫
pub struct StateStore {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    state: Mutex<DashboardState>,
    hydrated: AtomicBool,
}

impl StateStore {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let state = DashboardState::new(clock.today());
        Self {
            store,
            clock,
            state: Mutex::new(state),
            hydrated: AtomicBool::new(false),
        }
    }

    /// 从 Store 载入全部状态并对任务做一次追赶滚动。
    /// 载入期间不触发持久化；滚动确有改动时，仅任务表写回。
    pub fn hydrate(&self) {
        let today = self.clock.today();
        let rolled = {
            let mut state = self.state.lock().unwrap();
            state.events = self.load_json(keys::EVENTS);
            state.tasks = self.load_json(keys::TASKS);
            state.periods = self.load_json(keys::PERIODS);
            state.show_health = self.load_json(keys::SHOW_HEALTH);
            state.selected_country = self
                .store
                .get(keys::COUNTRY)
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
            state.background_image = self
                .store
                .get(keys::BACKGROUND)
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());
            state.birth_date = self.store.get(keys::BIRTH_DATE).unwrap_or_default();
            state.viewed_date = today;
            rollover(&mut state.tasks, today)
        };
        self.hydrated.store(true, Ordering::SeqCst);
        if rolled {
            let state = self.state.lock().unwrap();
            self.put_json(keys::TASKS, &state.tasks);
        }
        tracing::info!("Dashboard state hydrated");
    }

    /// 读取状态快照
    pub fn snapshot(&self) -> DashboardState {
        self.state.lock().unwrap().clone()
    }

    /// 修改状态；水合完成后每次修改都整体持久化
    pub fn update<F: FnOnce(&mut DashboardState)>(&self, mutate: F) {
        let mut state = self.state.lock().unwrap();
        mutate(&mut state);
        if self.hydrated.load(Ordering::SeqCst) {
            self.persist(&state);
        }
    }

    /// 跨日处理：滚动过期任务并把查看日期推进到新的一天
    pub fn on_day_change(&self, today: NaiveDate) {
        self.update(|state| {
            rollover(&mut state.tasks, today);
            state.viewed_date = today;
        });
    }

    fn persist(&self, state: &DashboardState) {
        self.put_json(keys::EVENTS, &state.events);
        self.put_json(keys::TASKS, &state.tasks);
        self.put_json(keys::PERIODS, &state.periods);
        self.put_json(keys::SHOW_HEALTH, &state.show_health);
        self.store.set(keys::COUNTRY, &state.selected_country);
        self.store.set(keys::BACKGROUND, &state.background_image);
        self.store.set(keys::BIRTH_DATE, &state.birth_date);
    }

    fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.store.get(key) else {
            return T::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Discarding malformed persisted state");
            T::default()
        })
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, &raw),
            Err(e) => tracing::warn!(key, error = %e, "Failed to serialize state"),
        }
    }
}

/// 周期性日界检查（约一分钟一次）：跨日时滚动任务并推进查看日期
pub fn spawn_midnight_watch(
    clock: Arc<dyn Clock>,
    state: Arc<StateStore>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    let mut watcher = DayWatcher::new(clock.as_ref());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // 首次 tick 立即返回，跳过
        loop {
            ticker.tick().await;
            if let Some(today) = watcher.check(clock.as_ref()) {
                state.on_day_change(today);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use std::sync::atomic::AtomicUsize;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn harness(today: NaiveDate) -> (Arc<MemoryStore>, Arc<FixedClock>, StateStore) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(0, today));
        let state = StateStore::new(store.clone(), clock.clone());
        (store, clock, state)
    }

    /// 记录写入次数的包装存储
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl Store for CountingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value);
        }
        fn remove(&self, key: &str) {
            self.inner.remove(key);
        }
    }

    #[test]
    fn test_hydrate_does_not_write_back_loaded_data() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            writes: AtomicUsize::new(0),
        });
        store.inner.set(keys::COUNTRY, "Japan");
        store
            .inner
            .set(keys::TASKS, "[]");

        let clock = Arc::new(FixedClock::new(0, day(1)));
        let state = StateStore::new(store.clone(), clock);
        state.hydrate();

        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(state.snapshot().selected_country, "Japan");

        // 水合之后的修改正常持久化
        state.update(|s| s.show_health = true);
        assert!(store.writes.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_hydrate_discards_malformed_entries() {
        let (store, _, state) = harness(day(1));
        store.set(keys::EVENTS, "{broken json");
        store.set(keys::SHOW_HEALTH, "true");

        state.hydrate();
        let snapshot = state.snapshot();
        assert!(snapshot.events.is_empty());
        assert!(snapshot.show_health);
    }

    #[test]
    fn test_hydrate_applies_catchup_rollover_and_persists_it() {
        let (store, _, state) = harness(day(5));
        let stale = vec![Task::new("stale", day(1))];
        store.set(keys::TASKS, &serde_json::to_string(&stale).unwrap());

        state.hydrate();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.tasks[0].date, day(5));
        assert_eq!(snapshot.tasks[0].original_date, Some(day(1)));
        // 滚动结果写回了存储
        assert!(store.get(keys::TASKS).unwrap().contains("2024-06-05"));
    }

    #[test]
    fn test_update_persists_roundtrippable_state() {
        let (store, clock, state) = harness(day(1));
        state.hydrate();
        state.update(|s| {
            s.events.push(CalendarEvent {
                id: "e1".into(),
                title: "Dentist".into(),
                date: day(2),
                start_time: "09:00".into(),
                end_time: "10:00".into(),
                description: None,
                category: EventCategory::Health,
            });
            s.birth_date = "1995-07-14".into();
        });

        // 新实例从同一存储水合出相同内容
        let fresh = StateStore::new(store, clock);
        fresh.hydrate();
        let snapshot = fresh.snapshot();
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.events[0].title, "Dentist");
        assert_eq!(snapshot.birth_date, "1995-07-14");
    }

    #[test]
    fn test_on_day_change_rolls_tasks_and_advances_viewed_date() {
        let (_, clock, state) = harness(day(1));
        state.hydrate();
        state.update(|s| s.tasks.push(Task::new("open", day(1))));

        clock.set_today(day(2));
        state.on_day_change(day(2));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.viewed_date, day(2));
        assert_eq!(snapshot.tasks[0].date, day(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_midnight_watch_triggers_rollover() {
        let (_, clock, state) = harness(day(1));
        state.hydrate();
        state.update(|s| s.tasks.push(Task::new("open", day(1))));
        let state = Arc::new(state);

        let handle = spawn_midnight_watch(
            clock.clone(),
            state.clone(),
            Duration::from_secs(60),
        );

        clock.set_today(day(2));
        tokio::time::sleep(Duration::from_secs(61)).await;

        let snapshot = state.snapshot();
        assert_eq!(snapshot.tasks[0].date, day(2));
        assert_eq!(snapshot.viewed_date, day(2));
        handle.abort();
    }

    #[test]
    fn test_period_record_wire_format() {
        let record = PeriodRecord {
            id: "p1".into(),
            date: day(3),
            kind: PeriodKind::Start,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"start\""));
    }
}
