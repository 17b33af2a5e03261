//! getWeather：OpenWeatherMap 当前 / 预报天气，无 key 或请求失败时回退到季节性天气
//!
//! 回退数据由 (城市, 日期) 确定性生成，同一请求总得到同一结果。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::config::WeatherSection;
use crate::perception::embedding::stable_hash;
use crate::tools::{Tool, ToolCall, ToolName, ToolOutput, WeatherData};

pub struct WeatherTool {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherTool {
    pub fn new(config: &WeatherSection) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.resolved_api_key(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 不访问网络，始终使用季节性回退
    pub fn offline() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            base_url: String::new(),
        }
    }

    pub async fn get_weather(&self, city: &str, date: &str) -> WeatherData {
        let target = parse_target_date(date);
        let Some(api_key) = self.api_key.as_deref() else {
            return fallback_weather(city, target);
        };
        match self.fetch(city, target, api_key).await {
            Ok(weather) => weather,
            Err(e) => {
                tracing::warn!(city, "Weather API failed, using fallback: {}", e);
                fallback_weather(city, target)
            }
        }
    }

    async fn fetch(&self, city: &str, target: DateTime<Utc>, api_key: &str) -> Result<WeatherData, reqwest::Error> {
        let is_today = target.date_naive() == Utc::now().date_naive();
        let endpoint = if is_today { "weather" } else { "forecast" };
        let request = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&[("q", city), ("appid", api_key), ("units", "metric")]);
        let response = request.send().await?.error_for_status()?;

        if is_today {
            let current: OwmReading = response.json().await?;
            Ok(current.into_weather("1h"))
        } else {
            let forecast: OwmForecast = response.json().await?;
            let target_ts = target.timestamp();
            let closest = forecast
                .list
                .into_iter()
                .min_by_key(|reading| (reading.dt - target_ts).abs());
            Ok(match closest {
                Some(reading) => reading.into_weather("3h"),
                None => fallback_weather(city, target),
            })
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> ToolName {
        ToolName::GetWeather
    }

    fn description(&self) -> &str {
        "Weather for a city on a date (current or forecast), seasonal fallback when unavailable"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::GetWeather { city, date } => Ok(ToolOutput::Weather(self.get_weather(&city, &date).await)),
            other => Err(other.mismatch(ToolName::GetWeather)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwmForecast {
    list: Vec<OwmReading>,
}

#[derive(Debug, Deserialize)]
struct OwmReading {
    dt: i64,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
    #[serde(default)]
    rain: Option<HashMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

impl OwmReading {
    fn into_weather(self, rain_window: &str) -> WeatherData {
        WeatherData {
            temperature: self.main.temp.round(),
            condition: self
                .weather
                .first()
                .map(|c| c.main.to_lowercase())
                .unwrap_or_else(|| "clear".to_string()),
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            precipitation: self
                .rain
                .and_then(|r| r.get(rain_window).copied())
                .unwrap_or(0.0),
            timestamp: DateTime::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// RFC 3339 时间或 YYYY-MM-DD 日期；无法解析时取当前时间
fn parse_target_date(date: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return dt.with_timezone(&Utc);
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    fn temperature_range(&self) -> (i64, i64) {
        match self {
            Season::Spring => (10, 20),
            Season::Summer => (20, 30),
            Season::Fall => (5, 15),
            Season::Winter => (-5, 10),
        }
    }

    fn conditions(&self) -> &'static [&'static str] {
        match self {
            Season::Spring => &["clear", "partly_cloudy", "rain"],
            Season::Summer => &["clear", "partly_cloudy", "hot"],
            Season::Fall => &["clear", "cloudy", "rain"],
            Season::Winter => &["clear", "cloudy", "snow", "cold"],
        }
    }
}

fn fallback_weather(city: &str, target: DateTime<Utc>) -> WeatherData {
    let season = Season::from_month(target.month());
    let seed = stable_hash((city.to_lowercase(), target.date_naive()));
    let pick = |salt: u64, modulo: u64| stable_hash((seed, salt)) % modulo;

    let (min, max) = season.temperature_range();
    let temperature = (min + pick(1, (max - min + 1) as u64) as i64) as f64;
    let conditions = season.conditions();
    let condition = conditions[pick(2, conditions.len() as u64) as usize];
    let precipitation = if condition == "rain" || condition == "snow" {
        pick(5, 11) as f64
    } else {
        0.0
    };

    WeatherData {
        temperature,
        condition: condition.to_string(),
        humidity: (30 + pick(3, 51)) as f64,
        wind_speed: pick(4, 16) as f64,
        precipitation,
        timestamp: target,
    }
}
