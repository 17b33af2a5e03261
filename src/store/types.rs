//! 衣橱持久化数据类型：单品、搭配、偏好、反馈与查询条件

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tools::WeatherData;

/// 单品品类；Unknown 用于感知服务无法识别的图片
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shirt,
    Pants,
    Jacket,
    Dress,
    Shoes,
    Accessory,
    #[default]
    Unknown,
}

impl Category {
    /// 缺口分析覆盖的六个固定品类（顺序即输出顺序）
    pub const CAPSULE: [Category; 6] = [
        Category::Shirt,
        Category::Pants,
        Category::Jacket,
        Category::Dress,
        Category::Shoes,
        Category::Accessory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shirt => "shirt",
            Category::Pants => "pants",
            Category::Jacket => "jacket",
            Category::Dress => "dress",
            Category::Shoes => "shoes",
            Category::Accessory => "accessory",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 正式程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    #[default]
    Casual,
    Business,
    Formal,
    Sport,
    Party,
    Outdoor,
}

impl Formality {
    pub const ALL: [Formality; 6] = [
        Formality::Casual,
        Formality::Business,
        Formality::Formal,
        Formality::Sport,
        Formality::Party,
        Formality::Outdoor,
    ];

    /// 打分用的正式度数值
    pub fn level(&self) -> f64 {
        match self {
            Formality::Casual => 0.2,
            Formality::Business => 0.6,
            Formality::Formal => 0.9,
            Formality::Sport => 0.1,
            Formality::Party => 0.8,
            Formality::Outdoor => 0.3,
        }
    }
}

/// 衣橱单品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: Category,
    pub colors: Vec<String>,
    pub patterns: Vec<String>,
    pub fabric: String,
    pub seasons: Vec<String>,
    pub formality: Formality,
    pub image_url: String,
    pub wear_count: u32,
    pub is_clean: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// 新建单品（id 与 created_at 由存储生成）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub user_id: String,
    pub title: String,
    pub category: Category,
    pub colors: Vec<String>,
    pub patterns: Vec<String>,
    pub fabric: String,
    pub seasons: Vec<String>,
    pub formality: Formality,
    pub image_url: String,
    pub wear_count: u32,
    pub is_clean: bool,
    pub embedding: Option<Vec<f32>>,
}

/// 局部更新：None 表示保持原值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub colors: Option<Vec<String>>,
    pub patterns: Option<Vec<String>>,
    pub fabric: Option<String>,
    pub seasons: Option<Vec<String>>,
    pub formality: Option<Formality>,
    pub wear_count: Option<u32>,
    pub is_clean: Option<bool>,
    pub embedding: Option<Vec<f32>>,
}

impl ItemUpdate {
    pub fn apply(self, item: &mut Item) {
        if let Some(v) = self.title {
            item.title = v;
        }
        if let Some(v) = self.category {
            item.category = v;
        }
        if let Some(v) = self.colors {
            item.colors = v;
        }
        if let Some(v) = self.patterns {
            item.patterns = v;
        }
        if let Some(v) = self.fabric {
            item.fabric = v;
        }
        if let Some(v) = self.seasons {
            item.seasons = v;
        }
        if let Some(v) = self.formality {
            item.formality = v;
        }
        if let Some(v) = self.wear_count {
            item.wear_count = v;
        }
        if let Some(v) = self.is_clean {
            item.is_clean = v;
        }
        if let Some(v) = self.embedding {
            item.embedding = Some(v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitContext {
    pub occasion: String,
    pub date: String,
    pub city: String,
    pub weather: WeatherData,
}

/// 已保存的搭配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: String,
    pub user_id: String,
    pub item_ids: Vec<String>,
    pub context: OutfitContext,
    pub rationale: String,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOutfit {
    pub user_id: String,
    pub item_ids: Vec<String>,
    pub context: OutfitContext,
    pub rationale: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormalityPreference {
    #[default]
    Casual,
    Business,
    Formal,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StylePreferences {
    pub preferred_colors: Vec<String>,
    pub avoided_colors: Vec<String>,
    pub preferred_silhouettes: Vec<String>,
    pub comfort_constraints: Vec<String>,
    pub formality_preference: FormalityPreference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleConstraints {
    pub budget: f64,
    pub climate: String,
    pub lifestyle: Vec<String>,
}

/// 用户偏好；不存在时以默认值为基础合并更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub user_id: String,
    pub style: StylePreferences,
    pub constraints: LifestyleConstraints,
}

impl Preferences {
    pub fn defaults_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            style: StylePreferences::default(),
            constraints: LifestyleConstraints::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub style: Option<StylePreferences>,
    pub constraints: Option<LifestyleConstraints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub outfit_id: Option<String>,
    pub decision: Decision,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub user_id: String,
    pub outfit_id: Option<String>,
    pub decision: Decision,
    pub reason: String,
}

/// 条件检索；user_id 必填，其余为 None 时不过滤
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    pub user_id: String,
    pub category: Option<Category>,
    pub colors: Option<Vec<String>>,
    pub seasons: Option<Vec<String>>,
    pub formality: Option<Formality>,
    pub is_clean: Option<bool>,
}

impl QueryFilters {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        if item.user_id != self.user_id {
            return false;
        }
        if let Some(category) = self.category {
            if item.category != category {
                return false;
            }
        }
        if let Some(colors) = &self.colors {
            if !colors.iter().any(|c| item.colors.contains(c)) {
                return false;
            }
        }
        if let Some(seasons) = &self.seasons {
            if !seasons.iter().any(|s| item.seasons.contains(s)) {
                return false;
            }
        }
        if let Some(formality) = self.formality {
            if item.formality != formality {
                return false;
            }
        }
        if let Some(is_clean) = self.is_clean {
            if item.is_clean != is_clean {
                return false;
            }
        }
        true
    }
}

/// 向量相似检索
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityQuery {
    pub embedding: Vec<f32>,
    pub threshold: f32,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearCount {
    pub item_id: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorUsage {
    pub color: String,
    pub count: u32,
}
