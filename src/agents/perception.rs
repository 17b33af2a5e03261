//! Perception 包装：分析图片 → 重复检测 → 回写单品；上传处理直接转发给感知服务

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agents::base::{shape_mismatch, AgentBehavior, BaseAgent, Binding, CritiqueProfile};
use crate::agents::{Constraints, StepTemplate};
use crate::core::AgentError;
use crate::perception::{ClientCapabilities, ImageUpload, PerceptionService, UploadOutcome};
use crate::tools::{ToolCall, ToolName, ToolOutput};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerceptionContext {
    pub user_id: String,
    pub image_url: String,
    pub item_id: String,
}

static PERCEPTION_PROFILE: CritiqueProfile = CritiqueProfile {
    success_score: 0.9,
    failure_score: 0.1,
    threshold: 0.8,
    success_feedback: "Perception step completed successfully",
    failure_feedback: "Perception step failed",
    suggestions: &["Check image quality and format", "Verify perception service availability"],
};

static PERCEPTION_BINDINGS: [Binding; 2] = [
    Binding {
        from: ToolName::AnalyzeImage,
        to: ToolName::DetectDuplicates,
        project: analysis_into_call,
    },
    Binding {
        from: ToolName::AnalyzeImage,
        to: ToolName::EnrichItem,
        project: analysis_into_call,
    },
];

fn analysis_into_call(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
    match (output, call) {
        (ToolOutput::ImageAnalysis(result), ToolCall::DetectDuplicates { analysis, .. })
        | (ToolOutput::ImageAnalysis(result), ToolCall::EnrichItem { analysis, .. }) => {
            *analysis = Some(result.clone());
            Ok(())
        }
        (output, call) => Err(shape_mismatch(output, call)),
    }
}

/// 感知行为，持有感知服务供上传处理使用
pub struct Perception {
    service: Arc<dyn PerceptionService>,
}

impl Perception {
    pub fn new(service: Arc<dyn PerceptionService>) -> Self {
        Self { service }
    }
}

impl AgentBehavior for Perception {
    type Context = PerceptionContext;

    fn name(&self) -> &'static str {
        "Perception"
    }

    fn plan_steps(&self, _goal: &str, _constraints: &Constraints, context: &PerceptionContext) -> Vec<StepTemplate> {
        vec![
            StepTemplate::new(
                ToolCall::AnalyzeImage {
                    image_url: context.image_url.clone(),
                    user_id: context.user_id.clone(),
                },
                "Image analysis with attributes and embedding",
            ),
            StepTemplate::new(
                ToolCall::DetectDuplicates {
                    analysis: None,
                    user_id: context.user_id.clone(),
                },
                "Duplicate detection results",
            )
            .after(&[ToolName::AnalyzeImage]),
            StepTemplate::new(
                ToolCall::EnrichItem {
                    item_id: context.item_id.clone(),
                    user_id: context.user_id.clone(),
                    analysis: None,
                },
                "Enriched item data",
            )
            .after(&[ToolName::AnalyzeImage, ToolName::DetectDuplicates]),
        ]
    }

    fn bindings(&self) -> &'static [Binding] {
        &PERCEPTION_BINDINGS
    }

    fn critique_profile(&self) -> &'static CritiqueProfile {
        &PERCEPTION_PROFILE
    }
}

pub type PerceptionAgent = BaseAgent<Perception>;

impl BaseAgent<Perception> {
    pub async fn process_upload(&self, upload: &ImageUpload, user_id: &str) -> Result<UploadOutcome, AgentError> {
        Ok(self.behavior().service.process_upload(upload, user_id).await?)
    }

    pub fn capabilities(&self) -> ClientCapabilities {
        self.behavior().service.capabilities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerceptionSection;
    use crate::perception::LocalPerception;
    use crate::store::InMemoryStore;

    fn behavior() -> Perception {
        Perception::new(Arc::new(LocalPerception::new(
            Arc::new(InMemoryStore::new()),
            PerceptionSection::default(),
        )))
    }

    #[test]
    fn test_enrich_depends_on_analysis_and_duplicates() {
        let context = PerceptionContext {
            user_id: "u1".to_string(),
            image_url: "https://img/1.jpg".to_string(),
            item_id: "item_1".to_string(),
        };
        let steps = behavior().plan_steps("enrich", &Constraints::default(), &context);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].depends_on, vec![ToolName::AnalyzeImage]);
        assert_eq!(
            steps[2].depends_on,
            vec![ToolName::AnalyzeImage, ToolName::DetectDuplicates]
        );
    }

    #[test]
    fn test_analysis_binding_rejects_other_calls() {
        let mut call = ToolCall::MarkClean {
            user_id: "u".to_string(),
            item_id: "i".to_string(),
        };
        assert!(analysis_into_call(&ToolOutput::Ack, &mut call).is_err());
    }
}
