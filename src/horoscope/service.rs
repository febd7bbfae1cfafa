//! 每日运势服务：缓存 → 在途锁 → 弹性调用 → 降级回退
//!
//! 失败永不向调用方抛错：配额类失败返回「Limit Reached」哨兵记录，
//! 其余失败返回中性评分的软回退记录。None 只出现在「同键请求在途且
//! 无缓存」的抑制场景。回退记录不写缓存。

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::clock::Clock;
use crate::horoscope::{daily_seed, ZodiacSign};
use crate::remote::{strip_code_fence, GenerateRequest, GenerativeClient, GroundingSource, RemoteError};
use crate::resilience::{
    CircuitBreaker, InFlightRegistry, InvokeError, ResilientInvoker, ResponseCache, RetryPolicy,
};
use crate::store::Store;

/// 运势缓存命名空间（键形如 aura_horoscope_v9_Leo_2024-06-01）
pub const HOROSCOPE_NAMESPACE: &str = "aura_horoscope_v9";

const HOROSCOPE_TEMPERATURE: f32 = 0.7;

/// 四项 0–5 评分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub love: u8,
    pub work: u8,
    pub health: u8,
    pub wealth: u8,
}

impl Ratings {
    pub fn uniform(value: u8) -> Self {
        Self {
            love: value,
            work: value,
            health: value,
            wealth: value,
        }
    }
}

/// 缓存的运势记录（不含 sign，身份在键里）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoroscopePayload {
    /// 单词主题（客户端强制截断到第一个词）
    pub summary: String,
    pub prediction: String,
    pub lucky_number: String,
    pub lucky_color: String,
    pub ratings: Ratings,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
}

/// 对外的运势记录：sign + 当日内容
#[derive(Debug, Clone, PartialEq)]
pub struct HoroscopeRecord {
    pub sign: ZodiacSign,
    pub payload: HoroscopePayload,
}

/// 每日运势服务
pub struct HoroscopeService {
    client: Arc<dyn GenerativeClient>,
    invoker: ResilientInvoker,
    cache: ResponseCache,
    locks: InFlightRegistry,
    clock: Arc<dyn Clock>,
}

impl HoroscopeService {
    /// 配额类失败在这条路径上触发熔断（policy.trips_breaker 被强制为 true）
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        breaker: Arc<CircuitBreaker>,
        store: Arc<dyn Store>,
        locks: InFlightRegistry,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        let policy = RetryPolicy {
            trips_breaker: true,
            ..policy
        };
        Self {
            client,
            invoker: ResilientInvoker::new(breaker, policy),
            cache: ResponseCache::new(store),
            locks,
            clock,
        }
    }

    /// 取 sign 在今天的运势。None 仅在同键请求在途且无缓存时出现。
    pub async fn fetch(&self, sign: ZodiacSign, force_refresh: bool) -> Option<HoroscopeRecord> {
        let today = self.clock.today();
        let key = ResponseCache::day_key(HOROSCOPE_NAMESPACE, sign.as_str(), today);

        if !force_refresh {
            if let Some(payload) = self.cache.get::<HoroscopePayload>(&key) {
                return Some(HoroscopeRecord { sign, payload });
            }
        }

        let acquired = self.locks.try_acquire(&key);
        if !acquired && !force_refresh {
            tracing::debug!(key = %key, "Horoscope request already in flight");
            return self
                .cache
                .get(&key)
                .map(|payload| HoroscopeRecord { sign, payload });
        }

        let result = self
            .cache
            .get_or_fetch(&key, force_refresh, || {
                self.generate(sign, today, force_refresh)
            })
            .await;
        if acquired {
            self.locks.release_after_grace(&key);
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(err) if err.is_quota() => {
                tracing::warn!(sign = %sign, error = %err, "Horoscope quota hit, returning sentinel record");
                quota_fallback()
            }
            Err(err) => {
                tracing::warn!(sign = %sign, error = %err, "Horoscope generation failed, returning soft fallback");
                soft_fallback()
            }
        };
        Some(HoroscopeRecord { sign, payload })
    }

    /// 经弹性层发起远程生成并做后处理（围栏剥离、单词主题截断、来源附加）
    async fn generate(
        &self,
        sign: ZodiacSign,
        today: NaiveDate,
        grounding: bool,
    ) -> Result<HoroscopePayload, InvokeError> {
        let request = GenerateRequest {
            prompt: format!(
                "Today is {}. Provide daily horoscope for {}. Short & Insightful.",
                today.format("%Y-%m-%d"),
                sign
            ),
            temperature: HOROSCOPE_TEMPERATURE,
            seed: Some(daily_seed(sign, today)),
            response_schema: horoscope_schema(),
            // 仅强制刷新时请求检索接地，节省配额
            grounding,
        };

        let response = self
            .invoker
            .invoke(|| {
                let client = Arc::clone(&self.client);
                let request = request.clone();
                async move { client.generate(request).await }
            })
            .await?;

        let mut payload: HoroscopePayload = serde_json::from_str(strip_code_fence(&response.text))
            .map_err(|e| InvokeError::Remote(RemoteError::InvalidResponse(e.to_string())))?;
        // 单词主题不变量在客户端强制执行，不信任远端
        if let Some(first) = payload.summary.split_whitespace().next() {
            payload.summary = first.to_string();
        }
        payload.sources = response.sources;
        Ok(payload)
    }
}

fn horoscope_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "prediction": { "type": "STRING" },
            "luckyNumber": { "type": "STRING" },
            "luckyColor": { "type": "STRING" },
            "ratings": {
                "type": "OBJECT",
                "properties": {
                    "love": { "type": "NUMBER" },
                    "work": { "type": "NUMBER" },
                    "health": { "type": "NUMBER" },
                    "wealth": { "type": "NUMBER" }
                },
                "required": ["love", "work", "health", "wealth"]
            }
        },
        "required": ["summary", "prediction", "luckyNumber", "luckyColor", "ratings"]
    })
}

/// 配额哨兵记录：零评分 + 说明文案
fn quota_fallback() -> HoroscopePayload {
    HoroscopePayload {
        summary: "Limit Reached".to_string(),
        prediction: "API Daily Limit Reached. Aura is resting to save energy. \
                     Reset happens at PT Midnight (16:00 Local)."
            .to_string(),
        lucky_number: "--".to_string(),
        lucky_color: "Gray".to_string(),
        ratings: Ratings::uniform(0),
        sources: Vec::new(),
    }
}

/// 非配额失败的软回退：中性评分的有效记录
fn soft_fallback() -> HoroscopePayload {
    HoroscopePayload {
        summary: "Steady".to_string(),
        prediction: "The stars are quiet right now. Check back a little later.".to_string(),
        lucky_number: "7".to_string(),
        lucky_color: "Blue".to_string(),
        ratings: Ratings::uniform(3),
        sources: Vec::new(),
    }
}
