//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AURA__*` 覆盖（双下划线表示
//! 嵌套，如 `AURA__LLM__MODEL=gemini-3-flash-preview`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::resilience::RetryPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub resilience: ResilienceSection,
    pub storage: StorageSection,
    pub weather: WeatherSection,
}

/// [llm] 段：模型与端点；api_key 未配置时运行期回退 GEMINI_API_KEY 环境变量
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

/// [resilience] 段：重试、熔断冷却与在途锁宽限期
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResilienceSection {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub cooldown_secs: u64,
    pub lock_grace_secs: u64,
}

impl Default for ResilienceSection {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay_ms: 5000,
            cooldown_secs: 3600,
            lock_grace_secs: 5,
        }
    }
}

impl ResilienceSection {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn lock_grace(&self) -> Duration {
        Duration::from_secs(self.lock_grace_secs)
    }

    /// 转为调用策略；trips_breaker 由各服务自行决定
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            trips_breaker: true,
        }
    }
}

/// [storage] 段：SQLite 数据库路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub db_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("aura.db"),
        }
    }
}

/// [weather] 段：端点与重试次数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub base_url: Option<String>,
    pub retries: u32,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            base_url: None,
            retries: 3,
        }
    }
}

/// 从 config 目录加载配置，环境变量 AURA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AURA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AURA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
