//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DRESSER__*` 覆盖（双下划线表示嵌套，如 `DRESSER__AGENT__MAX_RETRIES=5`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::agents::AgentConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    /// 三个 Agent 共用的运行参数
    pub agent: AgentConfig,
    pub tools: ToolsSection,
    pub perception: PerceptionSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [tools] 段：单次工具调用超时与天气接口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒），Agent 未指定 deadline 时使用
    pub tool_timeout_secs: u64,
    pub weather: WeatherSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            weather: WeatherSection::default(),
        }
    }
}

/// [tools.weather] 段；未配置 api_key 时读 WEATHER_API_KEY，仍没有则使用季节性回退数据
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_city: String,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            default_city: "New York".to_string(),
        }
    }
}

impl WeatherSection {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("WEATHER_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// [perception] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerceptionSection {
    /// 本地优先：重复图片不再上传
    pub enable_client_side: bool,
    pub similarity_threshold: f32,
    /// 上传大小上限（字节）
    pub max_file_size: usize,
    pub embedding_dimension: usize,
}

impl Default for PerceptionSection {
    fn default() -> Self {
        Self {
            enable_client_side: false,
            similarity_threshold: 0.8,
            max_file_size: 10 * 1024 * 1024,
            embedding_dimension: 384,
        }
    }
}

/// 从 config 目录加载配置，环境变量 DRESSER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DRESSER__*（双下划线表示嵌套键）
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
        config::Environment::with_prefix("DRESSER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
