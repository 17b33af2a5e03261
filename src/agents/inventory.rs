//! Inventory：穿着频率 + 缺口分析 → 优化建议

use serde::{Deserialize, Serialize};

use crate::agents::base::{shape_mismatch, AgentBehavior, BaseAgent, Binding, CritiqueProfile};
use crate::agents::{Constraints, StepTemplate};
use crate::tools::{ToolCall, ToolName, ToolOutput};

const DEFAULT_DAYS: u32 = 30;
const DEFAULT_CAPSULE_GOAL: &str = "versatile";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryContext {
    pub user_id: String,
}

static INVENTORY_PROFILE: CritiqueProfile = CritiqueProfile {
    success_score: 0.85,
    failure_score: 0.15,
    threshold: 0.7,
    success_feedback: "Inventory step completed successfully",
    failure_feedback: "Inventory step failed",
    suggestions: &["Check database connectivity", "Verify user data availability"],
};

static INVENTORY_BINDINGS: [Binding; 2] = [
    Binding {
        from: ToolName::AnalyzeWearFrequency,
        to: ToolName::SuggestOptimizations,
        project: wear_into_optimizations,
    },
    Binding {
        from: ToolName::DetectGaps,
        to: ToolName::SuggestOptimizations,
        project: gaps_into_optimizations,
    },
];

fn wear_into_optimizations(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
    match (output, call) {
        (ToolOutput::WearFrequency(analysis), ToolCall::SuggestOptimizations { wear_data, .. }) => {
            *wear_data = Some(analysis.clone());
            Ok(())
        }
        (output, call) => Err(shape_mismatch(output, call)),
    }
}

fn gaps_into_optimizations(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
    match (output, call) {
        (ToolOutput::Gaps(report), ToolCall::SuggestOptimizations { gaps, .. }) => {
            *gaps = Some(report.clone());
            Ok(())
        }
        (output, call) => Err(shape_mismatch(output, call)),
    }
}

pub struct Inventory;

impl AgentBehavior for Inventory {
    type Context = InventoryContext;

    fn name(&self) -> &'static str {
        "Inventory"
    }

    fn plan_steps(&self, _goal: &str, constraints: &Constraints, context: &InventoryContext) -> Vec<StepTemplate> {
        let user_id = &context.user_id;
        vec![
            StepTemplate::new(
                ToolCall::AnalyzeWearFrequency {
                    user_id: user_id.clone(),
                    days: constraints.days.unwrap_or(DEFAULT_DAYS),
                },
                "Wear frequency analysis",
            ),
            StepTemplate::new(
                ToolCall::DetectGaps {
                    user_id: user_id.clone(),
                    capsule_goal: constraints
                        .capsule_goal
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CAPSULE_GOAL.to_string()),
                },
                "Wardrobe gap analysis",
            ),
            StepTemplate::new(
                ToolCall::SuggestOptimizations {
                    user_id: user_id.clone(),
                    wear_data: None,
                    gaps: None,
                },
                "Inventory optimization suggestions",
            )
            .after(&[ToolName::AnalyzeWearFrequency, ToolName::DetectGaps]),
        ]
    }

    fn bindings(&self) -> &'static [Binding] {
        &INVENTORY_BINDINGS
    }

    fn critique_profile(&self) -> &'static CritiqueProfile {
        &INVENTORY_PROFILE
    }
}

pub type InventoryAgent = BaseAgent<Inventory>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_defaults() {
        let steps = Inventory.plan_steps(
            "audit",
            &Constraints::default(),
            &InventoryContext {
                user_id: "u1".to_string(),
            },
        );
        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[0].call, ToolCall::AnalyzeWearFrequency { days: 30, .. }));
        assert!(matches!(&steps[1].call, ToolCall::DetectGaps { capsule_goal, .. } if capsule_goal == "versatile"));
        assert_eq!(
            steps[2].depends_on,
            vec![ToolName::AnalyzeWearFrequency, ToolName::DetectGaps]
        );
    }

    #[test]
    fn test_plan_honours_constraints() {
        let constraints = Constraints {
            days: Some(7),
            capsule_goal: Some("travel".to_string()),
            ..Default::default()
        };
        let steps = Inventory.plan_steps("audit", &constraints, &InventoryContext::default());
        assert!(matches!(steps[0].call, ToolCall::AnalyzeWearFrequency { days: 7, .. }));
        assert!(matches!(&steps[1].call, ToolCall::DetectGaps { capsule_goal, .. } if capsule_goal == "travel"));
    }

    #[test]
    fn test_gap_binding_fills_report() {
        let report = crate::tools::inventory::gap_report(Vec::new());
        let mut call = ToolCall::SuggestOptimizations {
            user_id: "u1".to_string(),
            wear_data: None,
            gaps: None,
        };
        gaps_into_optimizations(&ToolOutput::Gaps(report.clone()), &mut call).unwrap();
        assert!(matches!(call, ToolCall::SuggestOptimizations { gaps: Some(ref g), .. } if *g == report));
        assert!(wear_into_optimizations(&ToolOutput::Gaps(report), &mut call).is_err());
    }
}
