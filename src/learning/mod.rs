//! 反馈学习：从用户对搭配的接受 / 拒绝理由中提取颜色、正式程度、舒适度信号，
//! 累积为学习规则与反馈模式，并回写到用户偏好。
//!
//! 规则与模式只保存在处理器内存中；反馈本身与偏好经 WardrobeStore 持久化。
//! `enabled = false` 时只记录反馈，不做任何学习。

pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::store::{
    Decision, Feedback, Formality, FormalityPreference, NewFeedback, Preferences, PreferencesUpdate, StoreError,
    WardrobeStore,
};

pub use types::*;

const COLORS: [&str; 12] = [
    "red", "blue", "green", "yellow", "purple", "pink", "orange", "black", "white", "gray", "brown", "navy",
];

const FORMALITY_KEYWORDS: [(Formality, &[&str]); 5] = [
    (Formality::Formal, &["formal", "dress", "suit", "elegant", "sophisticated"]),
    (Formality::Business, &["business", "office", "work", "professional"]),
    (Formality::Casual, &["casual", "relaxed", "comfortable", "everyday"]),
    (Formality::Sport, &["sport", "gym", "workout", "athletic"]),
    (Formality::Party, &["party", "night", "celebration", "fun"]),
];

/// 反馈模式推断正式程度偏好时使用的关键词（后出现的优先）
const PATTERN_FORMALITY_KEYWORDS: [(FormalityPreference, &[&str]); 3] = [
    (FormalityPreference::Formal, &["formal", "dress", "suit"]),
    (FormalityPreference::Business, &["business", "office", "work"]),
    (FormalityPreference::Casual, &["casual", "relaxed", "comfortable"]),
];

const COMFORT_KEYWORDS: [&str; 7] = ["tight", "loose", "uncomfortable", "itchy", "heavy", "light", "breathable"];

const COLOR_CONFIDENCE: f64 = 0.8;
const FORMALITY_CONFIDENCE: f64 = 0.7;
const COMFORT_CONFIDENCE: f64 = 0.9;

const NEW_RULE_WEIGHT: f64 = 0.3;
const RULE_WEIGHT_STEP: f64 = 0.1;
const RULE_CONFIDENCE_STEP: f64 = 0.05;

/// 理由中长度超过该值的词才计入常见理由
const MIN_REASON_WORD_LEN: usize = 3;
const COMMON_REASONS_KEPT: usize = 10;

const SATISFACTION_WINDOW: usize = 20;
const ACCURACY_WINDOW: usize = 10;

/// 一次反馈处理的结果
#[derive(Debug, Clone, PartialEq)]
pub struct LearningOutcome {
    pub feedback: Feedback,
    pub insights: FeedbackInsights,
    /// 学习关闭时为 false
    pub learned: bool,
}

pub struct FeedbackProcessor {
    store: Arc<dyn WardrobeStore>,
    enabled: bool,
    rules: RwLock<HashMap<String, Vec<LearningRule>>>,
    patterns: RwLock<HashMap<String, FeedbackPattern>>,
}

impl FeedbackProcessor {
    pub fn new(store: Arc<dyn WardrobeStore>, enabled: bool) -> Self {
        Self {
            store,
            enabled,
            rules: RwLock::new(HashMap::new()),
            patterns: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 记录反馈；学习开启时依次更新规则、反馈模式与用户偏好
    pub async fn process_feedback(&self, feedback: NewFeedback) -> Result<LearningOutcome, StoreError> {
        let feedback = self.store.create_feedback(feedback).await?;
        if !self.enabled {
            tracing::debug!(user_id = %feedback.user_id, "Learning disabled; feedback recorded only");
            return Ok(LearningOutcome {
                feedback,
                insights: FeedbackInsights::default(),
                learned: false,
            });
        }

        let insights = extract_insights(&feedback.reason, feedback.decision);
        self.update_rules(&feedback.user_id, &insights).await;
        self.update_pattern(&feedback.user_id, feedback.decision, &feedback.reason)
            .await;
        if !insights.is_empty() {
            self.update_preferences(&feedback.user_id, &insights).await?;
        }
        tracing::info!(
            user_id = %feedback.user_id,
            colors = insights.colors.len(),
            formalities = insights.formalities.len(),
            comfort = insights.comfort.len(),
            "Feedback processed"
        );
        Ok(LearningOutcome {
            feedback,
            insights,
            learned: true,
        })
    }

    pub async fn rules_for(&self, user_id: &str) -> Vec<LearningRule> {
        self.rules.read().await.get(user_id).cloned().unwrap_or_default()
    }

    pub async fn pattern_for(&self, user_id: &str) -> Option<FeedbackPattern> {
        self.patterns.read().await.get(user_id).cloned()
    }

    pub async fn learning_metrics(&self, user_id: &str) -> Result<LearningMetrics, StoreError> {
        let feedback = self.store.get_user_feedback(user_id, Some(usize::MAX)).await?;
        let total = feedback.len();
        let acceptance_rate = if total == 0 {
            0.0
        } else {
            (accepted_ratio(&feedback) * 100.0 * 100.0).round() / 100.0
        };
        Ok(LearningMetrics {
            total_feedback: total,
            acceptance_rate,
            learning_rules: self.rules_for(user_id).await.len(),
            accuracy_improvement: accuracy_improvement(&feedback),
            user_satisfaction: user_satisfaction(&feedback),
            last_learning_update: self.pattern_for(user_id).await.map(|p| p.last_updated),
        })
    }

    async fn update_rules(&self, user_id: &str, insights: &FeedbackInsights) {
        if insights.colors.is_empty() {
            return;
        }
        let now = Utc::now();
        let mut rules = self.rules.write().await;
        let rules = rules.entry(user_id.to_string()).or_default();
        for pref in &insights.colors {
            let rule_id = format!("color_{}_{}", pref.color, pref.leaning.as_str());
            if let Some(rule) = rules.iter_mut().find(|r| r.id == rule_id) {
                rule.action.weight = (rule.action.weight + RULE_WEIGHT_STEP).min(1.0);
                rule.confidence = (rule.confidence + RULE_CONFIDENCE_STEP).min(1.0);
                rule.usage_count += 1;
                rule.last_applied = now;
                continue;
            }
            let kind = match pref.leaning {
                Leaning::Prefer => RuleActionKind::Boost,
                Leaning::Avoid => RuleActionKind::Penalize,
            };
            rules.push(LearningRule {
                id: rule_id,
                user_id: user_id.to_string(),
                condition: RuleCondition {
                    kind: ConditionKind::Color,
                    value: pref.color.clone(),
                    operator: ConditionOperator::Equals,
                },
                action: RuleAction {
                    kind,
                    weight: NEW_RULE_WEIGHT,
                    reason: format!("User {}s {} colors", pref.leaning.as_str(), pref.color),
                },
                confidence: pref.confidence,
                created_at: now,
                last_applied: now,
                usage_count: 1,
            });
        }
    }

    async fn update_pattern(&self, user_id: &str, decision: Decision, reason: &str) {
        let mut patterns = self.patterns.write().await;
        let pattern = patterns
            .entry(user_id.to_string())
            .or_insert_with(|| FeedbackPattern::empty(user_id));

        match decision {
            Decision::Rejected => pattern.pattern.rejected_reasons.push(reason.to_string()),
            Decision::Accepted => pattern.pattern.accepted_reasons.push(reason.to_string()),
        }
        let common = match decision {
            Decision::Rejected => &mut pattern.pattern.common_rejections,
            Decision::Accepted => &mut pattern.pattern.common_acceptances,
        };
        count_reason_words(common, reason);
        refresh_pattern_insights(pattern);
        pattern.last_updated = Utc::now();
    }

    async fn update_preferences(&self, user_id: &str, insights: &FeedbackInsights) -> Result<Preferences, StoreError> {
        let current = self
            .store
            .get_preferences(user_id)
            .await?
            .unwrap_or_else(|| Preferences::defaults_for(user_id));
        let mut style = current.style;

        for pref in &insights.colors {
            let list = match pref.leaning {
                Leaning::Prefer => &mut style.preferred_colors,
                Leaning::Avoid => &mut style.avoided_colors,
            };
            push_unique(list, &pref.color);
        }
        // 只采纳最后一个被接受的正式程度；sport / party 没有对应的偏好档位
        if let Some(latest) = insights.formalities.last() {
            if latest.leaning == Leaning::Prefer {
                if let Some(preference) = formality_preference(latest.formality) {
                    style.formality_preference = preference;
                }
            }
        }
        for constraint in insights.comfort.iter().filter(|c| c.leaning == Leaning::Avoid) {
            push_unique(&mut style.comfort_constraints, &constraint.constraint);
        }

        self.store
            .update_preferences(
                user_id,
                PreferencesUpdate {
                    style: Some(style),
                    constraints: None,
                },
            )
            .await
    }
}

/// 从理由文本中提取信号；按词匹配，颜色需整词相同，其余关键词按词首匹配
pub fn extract_insights(reason: &str, decision: Decision) -> FeedbackInsights {
    let words = reason_words(reason);
    let leaning = Leaning::from_decision(decision);
    let mentions = |keyword: &str| words.iter().any(|w| w.starts_with(keyword));

    FeedbackInsights {
        colors: COLORS
            .iter()
            .filter(|color| words.iter().any(|w| w.as_str() == **color))
            .map(|color| ColorInsight {
                color: color.to_string(),
                leaning,
                confidence: COLOR_CONFIDENCE,
            })
            .collect(),
        formalities: FORMALITY_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| mentions(*k)))
            .map(|(formality, _)| FormalityInsight {
                formality: *formality,
                leaning,
                confidence: FORMALITY_CONFIDENCE,
            })
            .collect(),
        comfort: COMFORT_KEYWORDS
            .iter()
            .filter(|k| mentions(**k))
            .map(|k| ComfortInsight {
                constraint: k.to_string(),
                leaning,
                confidence: COMFORT_CONFIDENCE,
            })
            .collect(),
    }
}

fn reason_words(reason: &str) -> Vec<String> {
    reason
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn count_reason_words(common: &mut Vec<ReasonCount>, reason: &str) {
    for word in reason_words(reason)
        .into_iter()
        .filter(|w| w.chars().count() > MIN_REASON_WORD_LEN)
    {
        match common.iter_mut().find(|r| r.reason == word) {
            Some(existing) => existing.count += 1,
            None => common.push(ReasonCount {
                reason: word,
                count: 1,
                items: Vec::new(),
            }),
        }
    }
    // 稳定排序：同次数时先出现的在前
    common.sort_by(|a, b| b.count.cmp(&a.count));
    common.truncate(COMMON_REASONS_KEPT);
}

fn refresh_pattern_insights(pattern: &mut FeedbackPattern) {
    let history = &pattern.pattern;
    let insights = &mut pattern.insights;
    for color in COLORS {
        let rejections = history.common_rejections.iter().filter(|r| r.reason.contains(color)).count();
        let acceptances = history.common_acceptances.iter().filter(|r| r.reason.contains(color)).count();
        if rejections > acceptances {
            push_unique(&mut insights.avoided_colors, color);
        } else if acceptances > rejections {
            push_unique(&mut insights.preferred_colors, color);
        }
    }
    for (preference, keywords) in PATTERN_FORMALITY_KEYWORDS {
        if history
            .common_acceptances
            .iter()
            .any(|r| keywords.iter().any(|k| r.reason.contains(k)))
        {
            insights.preferred_formality = preference;
        }
    }
}

fn formality_preference(formality: Formality) -> Option<FormalityPreference> {
    match formality {
        Formality::Formal => Some(FormalityPreference::Formal),
        Formality::Business => Some(FormalityPreference::Business),
        Formality::Casual => Some(FormalityPreference::Casual),
        Formality::Sport | Formality::Party | Formality::Outdoor => None,
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn accepted_ratio(feedback: &[Feedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }
    let accepted = feedback.iter().filter(|f| f.decision == Decision::Accepted).count();
    accepted as f64 / feedback.len() as f64
}

/// feedback 按时间升序；不足 10 条时为 0
fn accuracy_improvement(feedback: &[Feedback]) -> i64 {
    if feedback.len() < ACCURACY_WINDOW {
        return 0;
    }
    let (older, recent) = feedback.split_at(feedback.len() - ACCURACY_WINDOW);
    let older = &older[older.len().saturating_sub(ACCURACY_WINDOW)..];
    if older.is_empty() {
        return 0;
    }
    ((accepted_ratio(recent) - accepted_ratio(older)) * 100.0).round() as i64
}

fn user_satisfaction(feedback: &[Feedback]) -> i64 {
    let recent = &feedback[feedback.len().saturating_sub(SATISFACTION_WINDOW)..];
    (accepted_ratio(recent) * 100.0).round() as i64
}
