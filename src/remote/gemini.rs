//! Gemini REST 客户端
//!
//! 直接走 generateContent REST 端点：responseSchema 结构化输出 +
//! google_search 接地工具 + generationConfig.seed，与 OpenAI 兼容层
//! 无法表达，故不经 SDK、用 reqwest 手写请求。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::remote::{GenerateRequest, GenerateResponse, GenerativeClient, GroundingSource, RemoteError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 60;
/// 错误响应体写进日志与错误消息时的截断长度
const ERROR_BODY_LIMIT: usize = 512;

/// Gemini 客户端：持有 reqwest Client、模型名与 API key
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn build_body(&self, request: &GenerateRequest) -> Value {
        let mut generation_config = json!({
            "temperature": request.temperature,
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        });
        if let Some(seed) = request.seed {
            generation_config["seed"] = json!(seed);
        }

        let tools: Vec<Value> = if request.grounding {
            vec![json!({ "google_search": {} })]
        } else {
            Vec::new()
        };

        json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "tools": tools,
            "generationConfig": generation_config,
        })
    }

    /// 从首个 candidate 取文本与接地来源
    fn parse_response(value: &Value) -> Result<GenerateResponse, RemoteError> {
        let candidate = value
            .get("candidates")
            .and_then(|c| c.get(0))
            .ok_or_else(|| RemoteError::InvalidResponse("no candidates in response".into()))?;

        let text = candidate
            .pointer("/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::InvalidResponse("candidate has no text part".into()))?
            .to_string();

        let sources = candidate
            .pointer("/groundingMetadata/groundingChunks")
            .and_then(Value::as_array)
            .map(|chunks| {
                chunks
                    .iter()
                    .filter_map(|chunk| {
                        let web = chunk.get("web")?;
                        Some(GroundingSource {
                            title: web.get("title")?.as_str()?.to_string(),
                            uri: web.get("uri")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerateResponse { text, sources })
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, RemoteError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = self.build_body(&request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(ERROR_BODY_LIMIT);
            tracing::warn!(status = status.as_u16(), "Generate call failed");
            return Err(RemoteError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Self::parse_response(&value)
    }
}
