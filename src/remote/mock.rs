//! Mock 生成客户端（测试用，无需网络）
//!
//! 按脚本依次返回预设结果，记录每次收到的请求与调用次数，
//! 可选延迟用于并发去重测试。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::remote::{GenerateRequest, GenerateResponse, GenerativeClient, RemoteError};

/// Mock 客户端：脚本化结果 + 调用计数 + 请求记录
#[derive(Default)]
pub struct MockGenerativeClient {
    script: Mutex<VecDeque<Result<GenerateResponse, RemoteError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockGenerativeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次 generate 先等待 delay 再返回（模拟在途请求）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 追加一次成功结果（模型文本）
    pub fn push_ok(&self, text: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(GenerateResponse {
                text: text.to_string(),
                sources: Vec::new(),
            }));
    }

    /// 追加一次失败结果
    pub fn push_err(&self, err: RemoteError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 最后一次收到的请求（未被调用过则 None）
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerativeClient for MockGenerativeClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        // 脚本耗尽时返回空 JSON 对象，便于多余调用被计数器发现
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateResponse {
                text: "{}".to_string(),
                sources: Vec::new(),
            }))
    }
}
