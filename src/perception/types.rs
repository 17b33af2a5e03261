use serde::{Deserialize, Serialize};

use crate::store::{Category, Formality};

/// 图片分析结果：类别属性 + 向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub colors: Vec<String>,
    pub patterns: Vec<String>,
    pub fabric: String,
    pub category: Category,
    pub formality: Formality,
    pub confidence: f32,
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub perceptual_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarItem {
    pub id: String,
    pub similarity: f32,
    pub perceptual_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDetection {
    pub is_duplicate: bool,
    pub similar_items: Vec<SimilarItem>,
    pub confidence: f32,
}

impl DuplicateDetection {
    pub fn none() -> Self {
        Self {
            is_duplicate: false,
            similar_items: Vec::new(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedItem {
    pub item_id: String,
    pub message: String,
}

/// 上传的图片文件
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub analysis: ImageAnalysis,
    pub duplicate_detection: DuplicateDetection,
    pub should_upload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    pub has_clip: bool,
    pub has_image_processing: bool,
    pub has_local_storage: bool,
}
