//! 库存分析工具：analyzeWearFrequency / detectGaps / suggestOptimizations
//!
//! 缺口与优化建议是纯函数，工具只负责取数。

use std::sync::Arc;

use async_trait::async_trait;

use crate::store::{Category, ColorUsage, Formality, Item, QueryFilters, WardrobeStore, WearCount};
use crate::tools::{
    GapAnalysis, GapReport, GapSummary, OptimizationKind, OptimizationReport, OptimizationSuggestion,
    OptimizationSummary, Priority, SuggestedSpecs, Tool, ToolCall, ToolName, ToolOutput, WearAnalysis, WearSummary,
};

/// 最常穿单品超过该次数时建议替换
const OVERWORN_THRESHOLD: u32 = 10;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// 品类的默认补充规格；capsule_goal 目前不影响规格
pub fn default_specs(category: Category, _capsule_goal: &str) -> SuggestedSpecs {
    let mut specs = SuggestedSpecs {
        colors: strings(&["black", "white", "navy"]),
        formality: Formality::Casual,
        seasons: strings(&["Spring", "Summer", "Fall", "Winter"]),
        fabric: None,
    };
    match category {
        Category::Shirt => specs.colors = strings(&["white", "blue", "gray"]),
        Category::Pants => specs.colors = strings(&["black", "navy", "khaki"]),
        Category::Jacket => {
            specs.colors = strings(&["black", "navy"]);
            specs.fabric = Some("wool".to_string());
        }
        _ => {}
    }
    specs
}

/// 六个固定品类：0 件为 high，1 件为 medium，≥ 2 件无缺口
pub fn analyze_wardrobe_gaps(items: &[Item], capsule_goal: &str) -> Vec<GapAnalysis> {
    Category::CAPSULE
        .iter()
        .filter_map(|&category| {
            let count = items.iter().filter(|i| i.category == category).count();
            let (priority, description, reasoning) = match count {
                0 => (
                    Priority::High,
                    format!("No {category} items found"),
                    format!("Essential {category} needed for a complete wardrobe"),
                ),
                1 => (
                    Priority::Medium,
                    format!("Limited {category} options"),
                    format!("More variety in {category} would increase outfit combinations"),
                ),
                _ => return None,
            };
            Some(GapAnalysis {
                category,
                priority,
                description,
                suggested_specs: default_specs(category, capsule_goal),
                reasoning,
            })
        })
        .collect()
}

pub fn gap_report(gaps: Vec<GapAnalysis>) -> GapReport {
    let count = |p: Priority| gaps.iter().filter(|g| g.priority == p).count();
    let summary = GapSummary {
        total_gaps: gaps.len(),
        high_priority_gaps: count(Priority::High),
        medium_priority_gaps: count(Priority::Medium),
    };
    GapReport { gaps, summary }
}

/// wear_frequency 需已按次数降序
pub fn wear_analysis(wear_frequency: Vec<WearCount>, most_used_colors: Vec<ColorUsage>) -> WearAnalysis {
    let total: u32 = wear_frequency.iter().map(|w| w.count).sum();
    let analysis = WearSummary {
        total_items: wear_frequency.len(),
        avg_wear_count: if wear_frequency.is_empty() {
            0.0
        } else {
            total as f64 / wear_frequency.len() as f64
        },
        most_worn_item: wear_frequency.first().cloned(),
        least_worn_item: wear_frequency.last().cloned(),
    };
    WearAnalysis {
        wear_frequency,
        most_used_colors,
        analysis,
    }
}

/// 过度穿着的单品建议替换；每个 high 缺口建议补充
pub fn suggest_optimizations(wear_data: Option<&WearAnalysis>, gaps: Option<&GapReport>) -> OptimizationReport {
    let mut suggestions = Vec::new();

    if let Some(most_worn) = wear_data.and_then(|w| w.analysis.most_worn_item.as_ref()) {
        if most_worn.count > OVERWORN_THRESHOLD {
            suggestions.push(OptimizationSuggestion {
                kind: OptimizationKind::Remove,
                item_id: Some(most_worn.item_id.clone()),
                category: None,
                reason: "Item has been worn too frequently and may need replacement".to_string(),
                priority: Priority::Medium,
                specs: None,
            });
        }
    }

    for gap in gaps.iter().flat_map(|g| &g.gaps) {
        if gap.priority == Priority::High {
            suggestions.push(OptimizationSuggestion {
                kind: OptimizationKind::Add,
                item_id: None,
                category: Some(gap.category),
                reason: gap.reasoning.clone(),
                priority: Priority::High,
                specs: Some(gap.suggested_specs.clone()),
            });
        }
    }

    let count = |k: OptimizationKind| suggestions.iter().filter(|s| s.kind == k).count();
    let summary = OptimizationSummary {
        total_suggestions: suggestions.len(),
        add_suggestions: count(OptimizationKind::Add),
        remove_suggestions: count(OptimizationKind::Remove),
    };
    OptimizationReport { suggestions, summary }
}

pub struct WearFrequencyTool {
    store: Arc<dyn WardrobeStore>,
}

impl WearFrequencyTool {
    pub fn new(store: Arc<dyn WardrobeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WearFrequencyTool {
    fn name(&self) -> ToolName {
        ToolName::AnalyzeWearFrequency
    }

    fn description(&self) -> &str {
        "Per-item wear counts, most used colors and summary statistics"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let (user_id, days) = match call {
            ToolCall::AnalyzeWearFrequency { user_id, days } => (user_id, days),
            other => return Err(other.mismatch(ToolName::AnalyzeWearFrequency)),
        };
        let frequency = self
            .store
            .get_wear_frequency(&user_id, days)
            .await
            .map_err(|e| format!("Wear frequency analysis failed: {e}"))?;
        let colors = self
            .store
            .get_most_used_colors(&user_id)
            .await
            .map_err(|e| format!("Wear frequency analysis failed: {e}"))?;
        Ok(ToolOutput::WearFrequency(wear_analysis(frequency, colors)))
    }
}

pub struct DetectGapsTool {
    store: Arc<dyn WardrobeStore>,
}

impl DetectGapsTool {
    pub fn new(store: Arc<dyn WardrobeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DetectGapsTool {
    fn name(&self) -> ToolName {
        ToolName::DetectGaps
    }

    fn description(&self) -> &str {
        "Missing or thin categories in the wardrobe for a capsule goal"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let (user_id, capsule_goal) = match call {
            ToolCall::DetectGaps { user_id, capsule_goal } => (user_id, capsule_goal),
            other => return Err(other.mismatch(ToolName::DetectGaps)),
        };
        let items = self
            .store
            .search_items(&QueryFilters::for_user(user_id))
            .await
            .map_err(|e| format!("Gap analysis failed: {e}"))?;
        Ok(ToolOutput::Gaps(gap_report(analyze_wardrobe_gaps(&items, &capsule_goal))))
    }
}

#[derive(Default)]
pub struct SuggestOptimizationsTool;

impl SuggestOptimizationsTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for SuggestOptimizationsTool {
    fn name(&self) -> ToolName {
        ToolName::SuggestOptimizations
    }

    fn description(&self) -> &str {
        "Add / remove suggestions from wear data and gap analysis"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::SuggestOptimizations { wear_data, gaps, .. } => Ok(ToolOutput::Optimizations(
                suggest_optimizations(wear_data.as_ref(), gaps.as_ref()),
            )),
            other => Err(other.mismatch(ToolName::SuggestOptimizations)),
        }
    }
}
