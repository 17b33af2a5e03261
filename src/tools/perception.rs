//! 感知工具：analyzeImage / detectDuplicates / enrichItem，转发给 PerceptionService

use std::sync::Arc;

use async_trait::async_trait;

use crate::perception::PerceptionService;
use crate::tools::{Tool, ToolCall, ToolName, ToolOutput};

pub struct AnalyzeImageTool {
    service: Arc<dyn PerceptionService>,
}

impl AnalyzeImageTool {
    pub fn new(service: Arc<dyn PerceptionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for AnalyzeImageTool {
    fn name(&self) -> ToolName {
        ToolName::AnalyzeImage
    }

    fn description(&self) -> &str {
        "Classify a clothing image and compute its embedding"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::AnalyzeImage { image_url, .. } => self
                .service
                .analyze_image(&image_url)
                .await
                .map(ToolOutput::ImageAnalysis)
                .map_err(|e| e.to_string()),
            other => Err(other.mismatch(ToolName::AnalyzeImage)),
        }
    }
}

pub struct DetectDuplicatesTool {
    service: Arc<dyn PerceptionService>,
}

impl DetectDuplicatesTool {
    pub fn new(service: Arc<dyn PerceptionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for DetectDuplicatesTool {
    fn name(&self) -> ToolName {
        ToolName::DetectDuplicates
    }

    fn description(&self) -> &str {
        "Find existing items of the same user that look like the analysed image"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::DetectDuplicates { analysis, user_id } => {
                let analysis = analysis.ok_or_else(|| "Duplicate detection requires an image analysis".to_string())?;
                Ok(ToolOutput::Duplicates(
                    self.service.detect_duplicates(&analysis, &user_id).await,
                ))
            }
            other => Err(other.mismatch(ToolName::DetectDuplicates)),
        }
    }
}

pub struct EnrichItemTool {
    service: Arc<dyn PerceptionService>,
}

impl EnrichItemTool {
    pub fn new(service: Arc<dyn PerceptionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for EnrichItemTool {
    fn name(&self) -> ToolName {
        ToolName::EnrichItem
    }

    fn description(&self) -> &str {
        "Write analysed attributes and embedding back onto an item"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::EnrichItem {
                item_id,
                user_id,
                analysis,
            } => self
                .service
                .enrich_item(&item_id, &user_id, analysis.as_ref())
                .await
                .map(ToolOutput::Enriched)
                .map_err(|e| e.to_string()),
            other => Err(other.mismatch(ToolName::EnrichItem)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerceptionSection;
    use crate::perception::LocalPerception;
    use crate::store::InMemoryStore;

    fn service() -> Arc<dyn PerceptionService> {
        Arc::new(LocalPerception::new(
            Arc::new(InMemoryStore::new()),
            PerceptionSection::default(),
        ))
    }

    #[tokio::test]
    async fn test_detect_duplicates_needs_analysis() {
        let err = DetectDuplicatesTool::new(service())
            .execute(ToolCall::DetectDuplicates {
                analysis: None,
                user_id: "u1".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, "Duplicate detection requires an image analysis");
    }

    #[tokio::test]
    async fn test_enrich_missing_item_is_denied() {
        let err = EnrichItemTool::new(service())
            .execute(ToolCall::EnrichItem {
                item_id: "nope".to_string(),
                user_id: "u1".to_string(),
                analysis: None,
            })
            .await
            .unwrap_err();
        assert!(err.contains("Item not found or access denied"));
    }

    #[tokio::test]
    async fn test_analyze_image_output() {
        let out = AnalyzeImageTool::new(service())
            .execute(ToolCall::AnalyzeImage {
                image_url: "https://img/3.jpg".to_string(),
                user_id: "u1".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(out, ToolOutput::ImageAnalysis(a) if a.embedding.len() == 384));
    }
}
