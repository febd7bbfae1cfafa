//! Aura - 个人仪表盘核心
//!
//! 入口：初始化日志与配置，水合仪表盘状态，启动日界守护，
//! 然后进入一个简易的命令行助手循环（每行输入作为一次提问）。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use aura::assistant::{AssistantAction, AssistantContext, AssistantService};
use aura::clock::{Clock, SystemClock};
use aura::config::load_config;
use aura::horoscope::{zodiac_sign, HoroscopeService};
use aura::remote::GeminiClient;
use aura::resilience::{CircuitBreaker, InFlightRegistry};
use aura::state::{spawn_midnight_watch, CalendarEvent, EventCategory, StateStore};
use aura::store::SqliteStore;
use aura::weather::WeatherService;

// 天气默认坐标：悉尼
const DEFAULT_LAT: f64 = -33.8688;
const DEFAULT_LON: f64 = 151.2093;
const DEFAULT_LOCATION: &str = "Sydney";

const DAY_CHECK_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aura::observability::init();

    let cfg = load_config(None).context("Failed to load configuration")?;
    let api_key = cfg
        .llm
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .context("No API key: set llm.api_key or GEMINI_API_KEY")?;

    let store = Arc::new(
        SqliteStore::open(&cfg.storage.db_path).context("Failed to open state store")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = Arc::new(StateStore::new(store.clone(), clock.clone()));
    state.hydrate();
    let watch = spawn_midnight_watch(clock.clone(), state.clone(), DAY_CHECK_PERIOD);

    let client = Arc::new(GeminiClient::new(
        &api_key,
        &cfg.llm.model,
        cfg.llm.base_url.as_deref(),
    ));
    let breaker = Arc::new(CircuitBreaker::new(
        store.clone(),
        clock.clone(),
        cfg.resilience.cooldown(),
    ));
    let horoscope = HoroscopeService::new(
        client.clone(),
        breaker.clone(),
        store.clone(),
        InFlightRegistry::new(cfg.resilience.lock_grace()),
        clock.clone(),
        cfg.resilience.retry_policy(),
    );
    let assistant = AssistantService::new(client, breaker, cfg.resilience.retry_policy());
    let weather_service = WeatherService::new(cfg.weather.base_url.as_deref(), cfg.weather.retries);

    let weather = match weather_service
        .current(DEFAULT_LAT, DEFAULT_LON, DEFAULT_LOCATION)
        .await
    {
        Ok(report) => {
            println!(
                "Weather in {}: {}°C, {}",
                report.location, report.temp, report.condition
            );
            Some(report)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Weather unavailable");
            None
        }
    };

    let snapshot = state.snapshot();
    if !snapshot.birth_date.is_empty() {
        let sign = zodiac_sign(&snapshot.birth_date);
        if let Some(record) = horoscope.fetch(sign, false).await {
            println!(
                "{} today: {} — {}",
                record.sign, record.payload.summary, record.payload.prediction
            );
        }
    }

    println!("Ask Aura anything (Ctrl-D to quit):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        let snapshot = state.snapshot();
        let context = AssistantContext::build(
            clock.as_ref(),
            &snapshot.events,
            &snapshot.selected_country,
            weather.clone(),
        );
        let reply = assistant.query(query, &context).await;
        println!("{}", reply.reply);

        match reply.action {
            AssistantAction::AddEvent(draft) => {
                let date = draft
                    .date
                    .as_deref()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or_else(|| clock.today());
                let event = CalendarEvent {
                    id: format!("event_{}", uuid::Uuid::new_v4()),
                    title: draft.title.unwrap_or_else(|| "Untitled".to_string()),
                    date,
                    start_time: draft.start_time.unwrap_or_else(|| "09:00".to_string()),
                    end_time: draft.end_time.unwrap_or_else(|| "10:00".to_string()),
                    description: None,
                    category: EventCategory::Personal,
                };
                println!("Added event: {} on {}", event.title, event.date);
                state.update(|s| s.events.push(event));
            }
            AssistantAction::ChangeCountry(change) => {
                if let Some(country) = change.country {
                    println!("Holiday region set to {}", country);
                    state.update(|s| s.selected_country = country);
                }
            }
            AssistantAction::None => {}
        }
    }

    watch.abort();
    Ok(())
}
