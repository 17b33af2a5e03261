use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Decision, Formality, FormalityPreference};

/// 反馈倾向：接受的搭配里出现的特征记为 Prefer，拒绝的记为 Avoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leaning {
    Prefer,
    Avoid,
}

impl Leaning {
    pub fn from_decision(decision: Decision) -> Self {
        match decision {
            Decision::Accepted => Leaning::Prefer,
            Decision::Rejected => Leaning::Avoid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Leaning::Prefer => "prefer",
            Leaning::Avoid => "avoid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorInsight {
    pub color: String,
    pub leaning: Leaning,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalityInsight {
    pub formality: Formality,
    pub leaning: Leaning,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortInsight {
    pub constraint: String,
    pub leaning: Leaning,
    pub confidence: f64,
}

/// 单条反馈理由中提取出的信号
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInsights {
    pub colors: Vec<ColorInsight>,
    pub formalities: Vec<FormalityInsight>,
    pub comfort: Vec<ComfortInsight>,
}

impl FeedbackInsights {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.formalities.is_empty() && self.comfort.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Color,
    Formality,
    Category,
    Fabric,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub value: String,
    pub operator: ConditionOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleActionKind {
    Boost,
    Penalize,
    Avoid,
    Prefer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: RuleActionKind,
    pub weight: f64,
    pub reason: String,
}

/// 学习规则；同一 (颜色, 倾向) 只有一条，重复命中时加权
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRule {
    pub id: String,
    pub user_id: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub last_applied: DateTime<Utc>,
    pub usage_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCount {
    pub reason: String,
    pub count: u32,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonHistory {
    pub rejected_reasons: Vec<String>,
    pub accepted_reasons: Vec<String>,
    pub common_rejections: Vec<ReasonCount>,
    pub common_acceptances: Vec<ReasonCount>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternInsights {
    pub preferred_colors: Vec<String>,
    pub avoided_colors: Vec<String>,
    pub preferred_formality: FormalityPreference,
    pub comfort_constraints: Vec<String>,
    pub style_preferences: Vec<String>,
}

/// 某用户的反馈累计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPattern {
    pub user_id: String,
    pub pattern: ReasonHistory,
    pub insights: PatternInsights,
    pub last_updated: DateTime<Utc>,
}

impl FeedbackPattern {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            pattern: ReasonHistory::default(),
            insights: PatternInsights::default(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningMetrics {
    pub total_feedback: usize,
    /// 百分比，保留两位小数
    pub acceptance_rate: f64,
    pub learning_rules: usize,
    /// 最近 10 条与之前 10 条接受率之差（百分点）
    pub accuracy_improvement: i64,
    /// 最近 20 条的接受率（百分比取整）
    pub user_satisfaction: i64,
    pub last_learning_update: Option<DateTime<Utc>>,
}
