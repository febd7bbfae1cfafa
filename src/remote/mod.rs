//! 远程生成层：生成式 AI 客户端抽象与实现（Gemini / Mock）

pub mod gemini;
pub mod mock;
pub mod traits;

pub use gemini::GeminiClient;
pub use mock::MockGenerativeClient;
pub use traits::{
    strip_code_fence, GenerateRequest, GenerateResponse, GenerativeClient, GroundingSource,
    RemoteError,
};
