//! 天气查询：open-meteo 当前天气 + 天气码分桶
//!
//! 天气码按固定区间映射到 {Clear, Cloudy, Rain, Snow}；
//! 请求失败时线性间隔（1.5 秒 × 次数）重试，默认 3 次。

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const RETRY_STEP: Duration = Duration::from_millis(1500);

/// 天气状况（分桶后）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Clear,
    Cloudy,
    Rain,
    Snow,
}

impl Condition {
    /// WMO 天气码分桶：1–3 Cloudy，51–67 Rain，71–77 Snow，≥80 Rain，其余 Clear
    pub fn from_code(code: u32) -> Self {
        match code {
            1..=3 => Self::Cloudy,
            51..=67 => Self::Rain,
            71..=77 => Self::Snow,
            80.. => Self::Rain,
            _ => Self::Clear,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clear => "Clear",
            Self::Cloudy => "Cloudy",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
        };
        f.write_str(s)
    }
}

/// 当前天气
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temp: i32,
    pub code: u32,
    pub condition: Condition,
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: u32,
}

/// 天气服务
pub struct WeatherService {
    client: Client,
    base_url: String,
    retries: u32,
}

impl WeatherService {
    pub fn new(base_url: Option<&str>, retries: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            retries: retries.max(1),
        }
    }

    /// 取坐标处的当前天气；全部尝试失败时返回最后一次错误
    pub async fn current(
        &self,
        lat: f64,
        lon: f64,
        location: &str,
    ) -> anyhow::Result<WeatherReport> {
        let url = format!(
            "{}?latitude={}&longitude={}&current_weather=true",
            self.base_url, lat, lon
        );

        let mut last_err = None;
        for attempt in 1..=self.retries {
            match self.try_fetch(&url).await {
                Ok(current) => {
                    return Ok(WeatherReport {
                        temp: current.temperature.round() as i32,
                        code: current.weathercode,
                        condition: Condition::from_code(current.weathercode),
                        location: location.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Weather fetch failed");
                    if attempt < self.retries {
                        tokio::time::sleep(RETRY_STEP * attempt).await;
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("weather fetch failed")))
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<CurrentWeather> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }
        let forecast: ForecastResponse = response.json().await?;
        Ok(forecast.current_weather)
    }
}
