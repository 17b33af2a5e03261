//! 工具调用与结果的强类型定义
//!
//! ToolCall / ToolOutput 是按工具名区分的带标签联合体，每个工具有自己的参数与结果形状；
//! ToolResult 是执行器对外统一的 `{success, data|error, metadata}` 信封。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::Constraints;
use crate::perception::{DuplicateDetection, EnrichedItem, ImageAnalysis};
use crate::store::{Category, ColorUsage, Formality, Item, WearCount};

/// 注册表中的工具名（扁平命名空间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    GetWeather,
    SearchWardrobe,
    GetLaundryStatus,
    MarkWorn,
    MarkClean,
    ScoreOutfit,
    AnalyzeWearFrequency,
    DetectGaps,
    SuggestOptimizations,
    AnalyzeImage,
    DetectDuplicates,
    EnrichItem,
}

impl ToolName {
    pub const ALL: [ToolName; 12] = [
        ToolName::GetWeather,
        ToolName::SearchWardrobe,
        ToolName::GetLaundryStatus,
        ToolName::MarkWorn,
        ToolName::MarkClean,
        ToolName::ScoreOutfit,
        ToolName::AnalyzeWearFrequency,
        ToolName::DetectGaps,
        ToolName::SuggestOptimizations,
        ToolName::AnalyzeImage,
        ToolName::DetectDuplicates,
        ToolName::EnrichItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetWeather => "getWeather",
            ToolName::SearchWardrobe => "searchWardrobe",
            ToolName::GetLaundryStatus => "getLaundryStatus",
            ToolName::MarkWorn => "markWorn",
            ToolName::MarkClean => "markClean",
            ToolName::ScoreOutfit => "scoreOutfit",
            ToolName::AnalyzeWearFrequency => "analyzeWearFrequency",
            ToolName::DetectGaps => "detectGaps",
            ToolName::SuggestOptimizations => "suggestOptimizations",
            ToolName::AnalyzeImage => "analyzeImage",
            ToolName::DetectDuplicates => "detectDuplicates",
            ToolName::EnrichItem => "enrichItem",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("Unknown tool: {s}"))
    }
}

/// 天气数据（摄氏度、百分比湿度、m/s 风速、mm 降水）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub temperature: f64,
    pub condition: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
    pub timestamp: DateTime<Utc>,
}

/// 衣橱检索条件；None 表示不过滤
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formality: Option<Formality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_clean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wear_count: Option<u32>,
}

/// 检索结果中的单品摘要（不含向量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub colors: Vec<String>,
    #[serde(default)]
    pub fabric: String,
    #[serde(default)]
    pub seasons: Vec<String>,
    pub formality: Formality,
    #[serde(default)]
    pub image_url: String,
    pub is_clean: bool,
    pub wear_count: u32,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            category: item.category,
            colors: item.colors.clone(),
            fabric: item.fabric.clone(),
            seasons: item.seasons.clone(),
            formality: item.formality,
            image_url: item.image_url.clone(),
            is_clean: item.is_clean,
            wear_count: item.wear_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeSearchResult {
    pub items: Vec<ItemSummary>,
    pub total_count: usize,
    pub filters: WardrobeFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaundryStatus {
    pub item_id: String,
    pub is_clean: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_worn: Option<DateTime<Utc>>,
    pub wear_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub weather: f64,
    pub formality: f64,
    pub color_harmony: f64,
    pub seasonality: f64,
    pub wear_frequency: f64,
}

impl ScoreBreakdown {
    /// (维度名, 分数)，按固定顺序
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("weather", self.weather),
            ("formality", self.formality),
            ("colorHarmony", self.color_harmony),
            ("seasonality", self.seasonality),
            ("wearFrequency", self.wear_frequency),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitScore {
    pub score: f64,
    pub rationale: String,
    pub breakdown: ScoreBreakdown,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearSummary {
    pub total_items: usize,
    pub avg_wear_count: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_worn_item: Option<WearCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub least_worn_item: Option<WearCount>,
}

/// 穿着频率分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearAnalysis {
    pub wear_frequency: Vec<WearCount>,
    pub most_used_colors: Vec<ColorUsage>,
    pub analysis: WearSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedSpecs {
    pub colors: Vec<String>,
    pub formality: Formality,
    pub seasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysis {
    pub category: Category,
    pub priority: Priority,
    pub description: String,
    pub suggested_specs: SuggestedSpecs,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapSummary {
    pub total_gaps: usize,
    pub high_priority_gaps: usize,
    pub medium_priority_gaps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapReport {
    pub gaps: Vec<GapAnalysis>,
    pub summary: GapSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationKind {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSuggestion {
    #[serde(rename = "type")]
    pub kind: OptimizationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub reason: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<SuggestedSpecs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSummary {
    pub total_suggestions: usize,
    pub add_suggestions: usize,
    pub remove_suggestions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub suggestions: Vec<OptimizationSuggestion>,
    pub summary: OptimizationSummary,
}

/// 工具调用：工具名 + 该工具的强类型参数
///
/// 依赖上游结果的字段（Option / 空 Vec）在计划阶段是占位，由调度器在派发前填充。
/// JSON 形状为 `{"tool": "getWeather", "parameters": {...}}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "tool",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ToolCall {
    GetWeather {
        city: String,
        date: String,
    },
    SearchWardrobe {
        user_id: String,
        #[serde(default)]
        filters: WardrobeFilters,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        embedding_query: Option<Vec<f32>>,
    },
    GetLaundryStatus {
        user_id: String,
        #[serde(default)]
        item_ids: Vec<String>,
    },
    MarkWorn {
        user_id: String,
        item_id: String,
    },
    MarkClean {
        user_id: String,
        item_id: String,
    },
    ScoreOutfit {
        goal: String,
        #[serde(default)]
        constraints: Constraints,
        #[serde(default)]
        weather: Option<WeatherData>,
        #[serde(default)]
        items: Option<Vec<ItemSummary>>,
    },
    AnalyzeWearFrequency {
        user_id: String,
        days: u32,
    },
    DetectGaps {
        user_id: String,
        capsule_goal: String,
    },
    SuggestOptimizations {
        user_id: String,
        #[serde(default)]
        wear_data: Option<WearAnalysis>,
        #[serde(default)]
        gaps: Option<GapReport>,
    },
    AnalyzeImage {
        image_url: String,
        user_id: String,
    },
    DetectDuplicates {
        #[serde(default)]
        analysis: Option<ImageAnalysis>,
        user_id: String,
    },
    EnrichItem {
        item_id: String,
        user_id: String,
        #[serde(default)]
        analysis: Option<ImageAnalysis>,
    },
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::GetWeather { .. } => ToolName::GetWeather,
            ToolCall::SearchWardrobe { .. } => ToolName::SearchWardrobe,
            ToolCall::GetLaundryStatus { .. } => ToolName::GetLaundryStatus,
            ToolCall::MarkWorn { .. } => ToolName::MarkWorn,
            ToolCall::MarkClean { .. } => ToolName::MarkClean,
            ToolCall::ScoreOutfit { .. } => ToolName::ScoreOutfit,
            ToolCall::AnalyzeWearFrequency { .. } => ToolName::AnalyzeWearFrequency,
            ToolCall::DetectGaps { .. } => ToolName::DetectGaps,
            ToolCall::SuggestOptimizations { .. } => ToolName::SuggestOptimizations,
            ToolCall::AnalyzeImage { .. } => ToolName::AnalyzeImage,
            ToolCall::DetectDuplicates { .. } => ToolName::DetectDuplicates,
            ToolCall::EnrichItem { .. } => ToolName::EnrichItem,
        }
    }

    /// 参数的 JSON 形式（不含工具名），用于日志与审计
    pub fn parameters(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => map.remove("parameters").unwrap_or_default(),
            _ => serde_json::Value::Null,
        }
    }

    /// 工具收到不属于自己的参数时的错误信息
    pub fn mismatch(&self, expected: ToolName) -> String {
        format!("{expected} received parameters for {}", self.name())
    }
}

/// 工具结果：按工具区分的强类型数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ToolOutput {
    Weather(WeatherData),
    Wardrobe(WardrobeSearchResult),
    Laundry(Vec<LaundryStatus>),
    /// 无数据返回的写操作（markWorn / markClean）
    Ack,
    OutfitScore(OutfitScore),
    WearFrequency(WearAnalysis),
    Gaps(GapReport),
    Optimizations(OptimizationReport),
    ImageAnalysis(ImageAnalysis),
    Duplicates(DuplicateDetection),
    Enriched(EnrichedItem),
}

impl ToolOutput {
    /// 结果种类名，用于参数传递失败时的诊断
    pub fn kind(&self) -> &'static str {
        match self {
            ToolOutput::Weather(_) => "weather",
            ToolOutput::Wardrobe(_) => "wardrobe",
            ToolOutput::Laundry(_) => "laundry",
            ToolOutput::Ack => "ack",
            ToolOutput::OutfitScore(_) => "outfitScore",
            ToolOutput::WearFrequency(_) => "wearFrequency",
            ToolOutput::Gaps(_) => "gaps",
            ToolOutput::Optimizations(_) => "optimizations",
            ToolOutput::ImageAnalysis(_) => "imageAnalysis",
            ToolOutput::Duplicates(_) => "duplicates",
            ToolOutput::Enriched(_) => "enriched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    pub execution_time_ms: u64,
    pub tool_name: String,
    pub timestamp: DateTime<Utc>,
}

/// 统一结果信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ToolOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ToolMetadata,
}

impl ToolResult {
    pub fn ok(tool_name: impl Into<String>, data: ToolOutput, elapsed: Duration) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: ToolMetadata::new(tool_name, elapsed),
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: ToolMetadata::new(tool_name, elapsed),
        }
    }

    /// 信封转 Result；失败时保留工具给出的错误信息
    pub fn into_result(self) -> Result<ToolOutput, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(format!("{} returned no data", self.metadata.tool_name)),
            (false, _) => Err(self.error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

impl ToolMetadata {
    fn new(tool_name: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            execution_time_ms: elapsed.as_millis() as u64,
            tool_name: tool_name.into(),
            timestamp: Utc::now(),
        }
    }
}
