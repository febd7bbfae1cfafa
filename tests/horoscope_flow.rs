//! 端到端流程测试：运势缓存跨日失效 + 配额熔断对助手路径的影响

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use aura::assistant::{AssistantAction, AssistantContext, AssistantService};
use aura::clock::FixedClock;
use aura::horoscope::{HoroscopeService, ZodiacSign};
use aura::remote::{MockGenerativeClient, RemoteError};
use aura::resilience::{CircuitBreaker, InFlightRegistry, RetryPolicy};
use aura::store::MemoryStore;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        initial_delay: Duration::from_millis(10),
        trips_breaker: true,
    }
}

struct Harness {
    client: Arc<MockGenerativeClient>,
    clock: Arc<FixedClock>,
    horoscope: HoroscopeService,
    assistant: AssistantService,
}

fn harness() -> Harness {
    let client = Arc::new(MockGenerativeClient::new());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(0, day(1)));
    let breaker = Arc::new(CircuitBreaker::new(
        store.clone(),
        clock.clone(),
        Duration::from_secs(3600),
    ));

    let horoscope = HoroscopeService::new(
        client.clone(),
        breaker.clone(),
        store,
        InFlightRegistry::new(Duration::from_millis(10)),
        clock.clone(),
        policy(),
    );
    let assistant = AssistantService::new(client.clone(), breaker, policy());

    Harness {
        client,
        clock,
        horoscope,
        assistant,
    }
}

fn horoscope_json(summary: &str) -> String {
    format!(
        r#"{{"summary":"{}","prediction":"A fine day.","luckyNumber":"3","luckyColor":"Green","ratings":{{"love":4,"work":4,"health":4,"wealth":4}}}}"#,
        summary
    )
}

#[tokio::test]
async fn horoscope_cache_expires_at_day_boundary() {
    let h = harness();
    h.client.push_ok(&horoscope_json("Bold"));
    h.client.push_ok(&horoscope_json("Quiet"));

    let first = h.horoscope.fetch(ZodiacSign::Leo, false).await.unwrap();
    assert_eq!(first.payload.summary, "Bold");
    assert_eq!(h.client.call_count(), 1);

    // 同一天重复取走缓存
    let again = h.horoscope.fetch(ZodiacSign::Leo, false).await.unwrap();
    assert_eq!(again.payload.summary, "Bold");
    assert_eq!(h.client.call_count(), 1);

    // 跨日后缓存键改变，重新生成
    h.clock.set_today(day(2));
    let next = h.horoscope.fetch(ZodiacSign::Leo, false).await.unwrap();
    assert_eq!(next.payload.summary, "Quiet");
    assert_eq!(h.client.call_count(), 2);
}

#[tokio::test]
async fn quota_trip_on_horoscope_blocks_assistant_too() {
    let h = harness();
    h.client.push_err(RemoteError::Http {
        status: 429,
        message: "RESOURCE_EXHAUSTED".into(),
    });

    // 运势路径的配额失败触发熔断，返回哨兵记录
    let record = h.horoscope.fetch(ZodiacSign::Aries, false).await.unwrap();
    assert_eq!(record.payload.summary, "Limit Reached");
    assert_eq!(h.client.call_count(), 1);

    // 熔断是共享的：助手提问被短路为回退回复，不发网络请求
    let context = AssistantContext::build(h.clock.as_ref(), &[], "Australia", None);
    let reply = h.assistant.query("hello there", &context).await;
    assert_eq!(reply.action, AssistantAction::None);
    assert_eq!(h.client.call_count(), 1);

    // 冷却期过后恢复
    h.clock.advance_ms(3_600_001);
    h.client
        .push_ok(r#"{"reply":"Back online.","action":{"type":"NONE"}}"#);
    let reply = h.assistant.query("hello again", &context).await;
    assert_eq!(reply.reply, "Back online.");
    assert_eq!(h.client.call_count(), 2);
}

#[tokio::test]
async fn force_refresh_replaces_cached_entry() {
    let h = harness();
    h.client.push_ok(&horoscope_json("Stale"));
    h.client.push_ok(&horoscope_json("Fresh"));

    h.horoscope.fetch(ZodiacSign::Gemini, false).await.unwrap();
    let refreshed = h.horoscope.fetch(ZodiacSign::Gemini, true).await.unwrap();
    assert_eq!(refreshed.payload.summary, "Fresh");
    assert_eq!(h.client.call_count(), 2);

    // 刷新结果落进当日缓存
    let cached = h.horoscope.fetch(ZodiacSign::Gemini, false).await.unwrap();
    assert_eq!(cached.payload.summary, "Fresh");
    assert_eq!(h.client.call_count(), 2);
}
