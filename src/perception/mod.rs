//! 感知服务：图片 → 属性 + 向量，重复检测，单品补全
//!
//! PerceptionService 是 Perception Agent 背后的黑盒；LocalPerception 是不依赖视觉 API 的
//! 确定性实现（同一图片引用总得到同一分析结果），重复检测走存储的相似检索。

pub mod embedding;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::PerceptionSection;
use crate::store::{owned_item, Category, Formality, ItemUpdate, SimilarityQuery, StoreError, WardrobeStore};
use embedding::{cosine_similarity, seeded_embedding, stable_hash};
pub use types::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerceptionError {
    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("Image analysis failed: {0}")]
    AnalysisFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait PerceptionService: Send + Sync {
    async fn analyze_image(&self, image_url: &str) -> Result<ImageAnalysis, PerceptionError>;

    async fn detect_duplicates(&self, analysis: &ImageAnalysis, user_id: &str) -> DuplicateDetection;

    /// 用分析结果回写单品属性；analysis 为 None 时按单品图片重新分析
    async fn enrich_item(
        &self,
        item_id: &str,
        user_id: &str,
        analysis: Option<&ImageAnalysis>,
    ) -> Result<EnrichedItem, PerceptionError>;

    async fn process_upload(&self, upload: &ImageUpload, user_id: &str) -> Result<UploadOutcome, PerceptionError>;

    fn capabilities(&self) -> ClientCapabilities;
}

const COLORS: [&str; 11] = [
    "black", "white", "blue", "red", "green", "yellow", "purple", "pink", "orange", "brown", "gray",
];
const PATTERNS: [&str; 6] = ["solid", "striped", "polka-dot", "floral", "geometric", "plaid"];
const FABRICS: [&str; 6] = ["cotton", "polyester", "wool", "silk", "denim", "leather"];
const DUPLICATE_SEARCH_LIMIT: usize = 5;

/// 本地确定性感知实现
pub struct LocalPerception {
    store: Arc<dyn WardrobeStore>,
    config: PerceptionSection,
}

impl LocalPerception {
    pub fn new(store: Arc<dyn WardrobeStore>, config: PerceptionSection) -> Self {
        Self { store, config }
    }

    fn analyze_seed(&self, seed: u64) -> ImageAnalysis {
        let pick = |salt: u64, len: usize| (stable_hash((seed, salt)) % len as u64) as usize;
        let categories = &Category::CAPSULE;
        ImageAnalysis {
            colors: vec![COLORS[pick(1, COLORS.len())].to_string()],
            patterns: vec![PATTERNS[pick(2, PATTERNS.len())].to_string()],
            fabric: FABRICS[pick(3, FABRICS.len())].to_string(),
            category: categories[pick(4, categories.len())],
            formality: Formality::ALL[pick(5, Formality::ALL.len())],
            confidence: 0.7 + (pick(6, 300) as f32) / 1000.0,
            embedding: seeded_embedding(seed, self.config.embedding_dimension),
            perceptual_hash: format!("{:016x}", stable_hash((seed, "phash"))),
        }
    }
}

#[async_trait]
impl PerceptionService for LocalPerception {
    async fn analyze_image(&self, image_url: &str) -> Result<ImageAnalysis, PerceptionError> {
        if image_url.trim().is_empty() {
            return Err(PerceptionError::AnalysisFailed("empty image reference".to_string()));
        }
        Ok(self.analyze_seed(stable_hash(image_url)))
    }

    async fn detect_duplicates(&self, analysis: &ImageAnalysis, user_id: &str) -> DuplicateDetection {
        if analysis.embedding.is_empty() {
            return DuplicateDetection::none();
        }
        let threshold = self.config.similarity_threshold;
        let query = SimilarityQuery {
            embedding: analysis.embedding.clone(),
            threshold,
            limit: DUPLICATE_SEARCH_LIMIT,
        };
        let candidates = match self.store.find_similar_items(&query).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Duplicate detection failed: {}", e);
                return DuplicateDetection::none();
            }
        };

        let similar_items: Vec<SimilarItem> = candidates
            .into_iter()
            .filter(|item| item.user_id == user_id)
            .map(|item| SimilarItem {
                similarity: cosine_similarity(&analysis.embedding, item.embedding.as_deref().unwrap_or_default()),
                id: item.id,
                perceptual_hash: analysis.perceptual_hash.clone(),
            })
            .filter(|s| s.similarity > threshold)
            .collect();

        let confidence = similar_items.iter().map(|s| s.similarity).fold(0.0f32, f32::max);
        DuplicateDetection {
            is_duplicate: !similar_items.is_empty(),
            similar_items,
            confidence,
        }
    }

    async fn enrich_item(
        &self,
        item_id: &str,
        user_id: &str,
        analysis: Option<&ImageAnalysis>,
    ) -> Result<EnrichedItem, PerceptionError> {
        let item = owned_item(self.store.as_ref(), user_id, item_id).await?;
        let analysis = match analysis {
            Some(a) => a.clone(),
            None => self.analyze_image(&item.image_url).await?,
        };
        self.store
            .update_item(
                item_id,
                ItemUpdate {
                    colors: Some(analysis.colors),
                    patterns: Some(analysis.patterns),
                    fabric: Some(analysis.fabric),
                    formality: Some(analysis.formality),
                    embedding: Some(analysis.embedding),
                    ..Default::default()
                },
            )
            .await?;
        Ok(EnrichedItem {
            item_id: item_id.to_string(),
            message: "Item enriched successfully".to_string(),
        })
    }

    async fn process_upload(&self, upload: &ImageUpload, user_id: &str) -> Result<UploadOutcome, PerceptionError> {
        if upload.size() > self.config.max_file_size {
            return Err(PerceptionError::FileTooLarge {
                size: upload.size(),
                max: self.config.max_file_size,
            });
        }
        let analysis = self.analyze_seed(stable_hash(&upload.bytes));
        let duplicate_detection = self.detect_duplicates(&analysis, user_id).await;
        let should_upload = !self.config.enable_client_side || !duplicate_detection.is_duplicate;
        Ok(UploadOutcome {
            analysis,
            duplicate_detection,
            should_upload,
        })
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            has_clip: false,
            has_image_processing: self.config.enable_client_side,
            has_local_storage: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, NewItem};

    fn perception(store: Arc<InMemoryStore>, client_side: bool) -> LocalPerception {
        LocalPerception::new(
            store,
            PerceptionSection {
                enable_client_side: client_side,
                max_file_size: 16,
                ..Default::default()
            },
        )
    }

    fn upload(bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            file_name: "shirt.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_analysis_is_deterministic_per_url() {
        let p = perception(Arc::new(InMemoryStore::new()), false);
        let a = p.analyze_image("https://img/1.jpg").await.unwrap();
        let b = p.analyze_image("https://img/1.jpg").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.embedding.len(), 384);
        assert!(a.confidence >= 0.7 && a.confidence < 1.0);
        assert!(p.analyze_image("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_too_large_is_rejected() {
        let p = perception(Arc::new(InMemoryStore::new()), false);
        let err = p.process_upload(&upload(&[0u8; 32]), "u1").await.unwrap_err();
        assert_eq!(err, PerceptionError::FileTooLarge { size: 32, max: 16 });
    }

    #[tokio::test]
    async fn test_duplicate_upload_detected_for_same_user() {
        let store = Arc::new(InMemoryStore::new());
        let p = perception(store.clone(), true);
        let first = p.process_upload(&upload(b"pixels"), "u1").await.unwrap();
        assert!(!first.duplicate_detection.is_duplicate);
        assert!(first.should_upload);

        store
            .create_item(NewItem {
                user_id: "u1".to_string(),
                embedding: Some(first.analysis.embedding.clone()),
                ..Default::default()
            })
            .await
            .unwrap();

        let second = p.process_upload(&upload(b"pixels"), "u1").await.unwrap();
        assert!(second.duplicate_detection.is_duplicate);
        assert!(!second.should_upload);

        let other_user = p.process_upload(&upload(b"pixels"), "u2").await.unwrap();
        assert!(!other_user.duplicate_detection.is_duplicate);
    }

    #[tokio::test]
    async fn test_enrich_item_writes_analysis_back() {
        let store = Arc::new(InMemoryStore::new());
        let p = perception(store.clone(), false);
        let item = store
            .create_item(NewItem {
                user_id: "u1".to_string(),
                image_url: "https://img/2.jpg".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let analysis = p.analyze_image(&item.image_url).await.unwrap();
        p.enrich_item(&item.id, "u1", Some(&analysis)).await.unwrap();
        let updated = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(updated.colors, analysis.colors);
        assert_eq!(updated.embedding, Some(analysis.embedding));

        let denied = p.enrich_item(&item.id, "u2", None).await.unwrap_err();
        assert_eq!(denied, PerceptionError::Store(StoreError::AccessDenied));
    }
}
