//! 衣橱持久化：WardrobeStore 契约 + 内存实现
//!
//! 工具实现通过 `Arc<dyn WardrobeStore>` 访问数据；Agent 本身从不直接读写存储。

pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use types::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Item not found or access denied")]
    AccessDenied,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// 存储契约：单品 / 搭配 / 偏好 / 反馈 CRUD 与简单统计
#[async_trait]
pub trait WardrobeStore: Send + Sync {
    async fn create_item(&self, item: NewItem) -> Result<Item, StoreError>;
    async fn get_item(&self, id: &str) -> Result<Option<Item>, StoreError>;
    async fn update_item(&self, id: &str, update: ItemUpdate) -> Result<Item, StoreError>;
    async fn delete_item(&self, id: &str) -> Result<(), StoreError>;
    async fn search_items(&self, filters: &QueryFilters) -> Result<Vec<Item>, StoreError>;
    /// 按相似度降序返回，至多 limit 条，相似度低于 threshold 的不返回
    async fn find_similar_items(&self, query: &SimilarityQuery) -> Result<Vec<Item>, StoreError>;

    async fn create_outfit(&self, outfit: NewOutfit) -> Result<Outfit, StoreError>;
    async fn get_outfit(&self, id: &str) -> Result<Option<Outfit>, StoreError>;
    async fn get_user_outfits(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Outfit>, StoreError>;

    async fn get_preferences(&self, user_id: &str) -> Result<Option<Preferences>, StoreError>;
    async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<Preferences, StoreError>;

    async fn create_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError>;
    async fn get_feedback_by_outfit(&self, outfit_id: &str) -> Result<Vec<Feedback>, StoreError>;
    async fn get_user_feedback(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Feedback>, StoreError>;

    /// 每件单品的穿着次数，降序
    async fn get_wear_frequency(&self, user_id: &str, days: u32) -> Result<Vec<WearCount>, StoreError>;
    /// 颜色使用次数（按穿着次数加权），降序
    async fn get_most_used_colors(&self, user_id: &str) -> Result<Vec<ColorUsage>, StoreError>;

    async fn is_connected(&self) -> bool;
}

/// 读取单品并校验归属
pub async fn owned_item(store: &dyn WardrobeStore, user_id: &str, item_id: &str) -> Result<Item, StoreError> {
    match store.get_item(item_id).await? {
        Some(item) if item.user_id == user_id => Ok(item),
        _ => Err(StoreError::AccessDenied),
    }
}
