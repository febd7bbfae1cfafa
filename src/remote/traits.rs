//! 生成式 AI 客户端抽象
//!
//! 所有后端（Gemini / Mock）实现 GenerativeClient：一次 generate 携带提示词、
//! 结构化输出 schema、温度、可选确定性种子与可选检索接地。错误在这里只描述
//! 「线上发生了什么」，分类（配额 / 瞬时 / 致命）交给弹性层。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 远程调用错误（未分类）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// 非 2xx 响应；status + 响应体摘要
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 连接 / 超时等传输层故障
    #[error("Network error: {0}")]
    Network(String),

    /// 响应无法按约定结构解析
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 引用来源：provider 接地元数据中的 title + uri
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// 一次生成请求
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub temperature: f32,
    /// 确定性提示：同一 (sign, day) 的重复生成趋向一致输出
    pub seed: Option<u32>,
    /// provider 的结构化输出 schema（OpenAPI 子集）
    pub response_schema: serde_json::Value,
    /// 是否请求检索接地（googleSearch 工具）
    pub grounding: bool,
}

/// 生成结果：模型文本 + 引用来源
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// 生成式 AI 客户端 trait
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, RemoteError>;
}

/// 去掉模型输出外层的 Markdown 代码围栏（```json ... ```）
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}
