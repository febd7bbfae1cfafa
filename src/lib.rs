//! Aura - 个人仪表盘核心
//!
//! 模块划分：
//! - **assistant**: 对话助手（结构化回复 + 动作）
//! - **clock**: 可注入时间源（系统时钟 / 测试时钟）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **horoscope**: 星座推导与每日运势服务
//! - **observability**: tracing 初始化
//! - **remote**: 生成式 AI 客户端抽象与实现（Gemini / Mock）
//! - **resilience**: 弹性层（熔断、退避重试、在途去重、日界缓存）
//! - **state**: 仪表盘持久化状态与日界守护
//! - **store**: 键值存储（内存 / SQLite）
//! - **tasks**: 任务模型与日滚动引擎
//! - **weather**: 天气查询与天气码分桶

pub mod assistant;
pub mod clock;
pub mod config;
pub mod horoscope;
pub mod observability;
pub mod remote;
pub mod resilience;
pub mod state;
pub mod store;
pub mod tasks;
pub mod weather;
