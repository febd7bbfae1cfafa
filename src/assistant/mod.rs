//! 对话助手服务
//!
//! 每次提问都是新鲜请求：不缓存、不去重（并发的不同问题是合法的）。
//! 远程调用经弹性层（配额错误不触发熔断，但熔断打开时同样短路）。
//! 任何失败都降级为安全回退回复，永不向调用方抛错。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::clock::Clock;
use crate::remote::{strip_code_fence, GenerateRequest, GenerativeClient};
use crate::resilience::{CircuitBreaker, ResilientInvoker, RetryPolicy};
use crate::state::CalendarEvent;
use crate::weather::WeatherReport;

const ASSISTANT_TEMPERATURE: f32 = 0.2;
/// 短问题不请求检索接地，节省配额
const GROUNDING_MIN_QUERY_CHARS: usize = 15;

const FALLBACK_REPLY: &str =
    "The assistant is currently unavailable. Please try again a little later.";

/// 助手回复中的结构化动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AssistantAction {
    #[serde(rename = "ADD_EVENT")]
    AddEvent(EventDraft),
    #[serde(rename = "CHANGE_COUNTRY")]
    ChangeCountry(CountryChange),
    #[serde(rename = "NONE")]
    None,
}

/// ADD_EVENT 动作的字段（模型可能缺省部分字段，全部可选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryChange {
    #[serde(default)]
    pub country: Option<String>,
}

/// 助手回复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub reply: String,
    pub action: AssistantAction,
}

impl AssistantReply {
    fn fallback() -> Self {
        Self {
            reply: FALLBACK_REPLY.to_string(),
            action: AssistantAction::None,
        }
    }
}

/// 助手上下文：日期时间分解、近期事件、国家偏好、当前天气
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    pub date: String,
    pub time: String,
    pub weekday: String,
    pub recent_events: Vec<CalendarEvent>,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherReport>,
}

impl AssistantContext {
    pub fn build(
        clock: &dyn Clock,
        recent_events: &[CalendarEvent],
        country: &str,
        weather: Option<WeatherReport>,
    ) -> Self {
        let now = clock.now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M").to_string(),
            weekday: now.format("%A").to_string(),
            recent_events: recent_events.to_vec(),
            country: country.to_string(),
            weather,
        }
    }
}

/// 对话助手
pub struct AssistantService {
    client: Arc<dyn GenerativeClient>,
    invoker: ResilientInvoker,
}

impl AssistantService {
    /// 配额类失败在这条路径上不触发熔断（policy.trips_breaker 被强制为 false）
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        breaker: Arc<CircuitBreaker>,
        policy: RetryPolicy,
    ) -> Self {
        let policy = RetryPolicy {
            trips_breaker: false,
            ..policy
        };
        Self {
            client,
            invoker: ResilientInvoker::new(breaker, policy),
        }
    }

    /// 回答自由文本提问；失败时返回回退回复，永不报错
    pub async fn query(&self, text: &str, context: &AssistantContext) -> AssistantReply {
        let context_json = serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());
        let request = GenerateRequest {
            prompt: format!(
                "Assistant Context: {}. User Query: \"{}\"",
                context_json, text
            ),
            temperature: ASSISTANT_TEMPERATURE,
            seed: None,
            response_schema: assistant_schema(),
            grounding: text.chars().count() > GROUNDING_MIN_QUERY_CHARS,
        };

        let result = self
            .invoker
            .invoke(|| {
                let client = Arc::clone(&self.client);
                let request = request.clone();
                async move { client.generate(request).await }
            })
            .await;

        match result {
            Ok(response) => {
                match serde_json::from_str(strip_code_fence(&response.text)) {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::warn!(error = %e, "Assistant reply did not match schema");
                        AssistantReply::fallback()
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Assistant query failed");
                AssistantReply::fallback()
            }
        }
    }
}

fn assistant_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "reply": { "type": "STRING" },
            "action": {
                "type": "OBJECT",
                "properties": {
                    "type": { "type": "STRING", "enum": ["ADD_EVENT", "CHANGE_COUNTRY", "NONE"] },
                    "data": { "type": "OBJECT" }
                },
                "required": ["type"]
            }
        },
        "required": ["reply", "action"]
    })
}
