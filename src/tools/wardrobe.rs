//! 衣橱工具：searchWardrobe / getLaundryStatus / markWorn / markClean

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::store::{owned_item, ItemUpdate, QueryFilters, SimilarityQuery, WardrobeStore};
use crate::tools::{
    ItemSummary, LaundryStatus, Tool, ToolCall, ToolName, ToolOutput, WardrobeFilters, WardrobeSearchResult,
};

const SEMANTIC_THRESHOLD: f32 = 0.7;
const SEMANTIC_LIMIT: usize = 50;

pub struct SearchWardrobeTool {
    store: Arc<dyn WardrobeStore>,
}

impl SearchWardrobeTool {
    pub fn new(store: Arc<dyn WardrobeStore>) -> Self {
        Self { store }
    }

    /// 有 embedding 时走相似检索（只保留本人单品），否则按条件检索；
    /// 结果干净的在前，同组按穿着次数升序
    pub async fn search(
        &self,
        user_id: &str,
        filters: WardrobeFilters,
        embedding_query: Option<Vec<f32>>,
    ) -> Result<WardrobeSearchResult, String> {
        let mut items = match embedding_query.filter(|e| !e.is_empty()) {
            Some(embedding) => {
                let query = SimilarityQuery {
                    embedding,
                    threshold: SEMANTIC_THRESHOLD,
                    limit: SEMANTIC_LIMIT,
                };
                self.store
                    .find_similar_items(&query)
                    .await
                    .map_err(|e| format!("Wardrobe search failed: {e}"))?
                    .into_iter()
                    .filter(|item| item.user_id == user_id)
                    .collect::<Vec<_>>()
            }
            None => {
                let query = QueryFilters {
                    user_id: user_id.to_string(),
                    category: filters.category,
                    colors: filters.colors.clone(),
                    seasons: filters.seasons.clone(),
                    formality: filters.formality,
                    is_clean: filters.is_clean,
                };
                self.store
                    .search_items(&query)
                    .await
                    .map_err(|e| format!("Wardrobe search failed: {e}"))?
            }
        };

        if let Some(max) = filters.max_wear_count {
            items.retain(|item| item.wear_count <= max);
        }
        items.sort_by(|a, b| b.is_clean.cmp(&a.is_clean).then(a.wear_count.cmp(&b.wear_count)));

        let items: Vec<ItemSummary> = items.iter().map(ItemSummary::from).collect();
        Ok(WardrobeSearchResult {
            total_count: items.len(),
            items,
            filters,
        })
    }
}

#[async_trait]
impl Tool for SearchWardrobeTool {
    fn name(&self) -> ToolName {
        ToolName::SearchWardrobe
    }

    fn description(&self) -> &str {
        "Search a user's wardrobe by filters or embedding similarity"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::SearchWardrobe {
                user_id,
                filters,
                embedding_query,
            } => self
                .search(&user_id, filters, embedding_query)
                .await
                .map(ToolOutput::Wardrobe),
            other => Err(other.mismatch(ToolName::SearchWardrobe)),
        }
    }
}

pub struct LaundryStatusTool {
    store: Arc<dyn WardrobeStore>,
}

impl LaundryStatusTool {
    pub fn new(store: Arc<dyn WardrobeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for LaundryStatusTool {
    fn name(&self) -> ToolName {
        ToolName::GetLaundryStatus
    }

    fn description(&self) -> &str {
        "Clean / dirty status and wear count of the given items"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let (user_id, item_ids) = match call {
            ToolCall::GetLaundryStatus { user_id, item_ids } => (user_id, item_ids),
            other => return Err(other.mismatch(ToolName::GetLaundryStatus)),
        };
        let mut statuses = Vec::with_capacity(item_ids.len());
        for item_id in &item_ids {
            let item = self
                .store
                .get_item(item_id)
                .await
                .map_err(|e| format!("Laundry status check failed: {e}"))?;
            // 他人或不存在的单品直接跳过
            if let Some(item) = item.filter(|i| i.user_id == user_id) {
                statuses.push(LaundryStatus {
                    item_id: item.id,
                    is_clean: item.is_clean,
                    last_worn: (item.wear_count > 0).then(Utc::now),
                    wear_count: item.wear_count,
                });
            }
        }
        Ok(ToolOutput::Laundry(statuses))
    }
}

pub struct MarkWornTool {
    store: Arc<dyn WardrobeStore>,
}

impl MarkWornTool {
    pub fn new(store: Arc<dyn WardrobeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MarkWornTool {
    fn name(&self) -> ToolName {
        ToolName::MarkWorn
    }

    fn description(&self) -> &str {
        "Record one wear of an item and mark it dirty"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let (user_id, item_id) = match call {
            ToolCall::MarkWorn { user_id, item_id } => (user_id, item_id),
            other => return Err(other.mismatch(ToolName::MarkWorn)),
        };
        let item = owned_item(self.store.as_ref(), &user_id, &item_id)
            .await
            .map_err(|e| format!("Mark worn failed: {e}"))?;
        self.store
            .update_item(
                &item_id,
                ItemUpdate {
                    wear_count: Some(item.wear_count + 1),
                    is_clean: Some(false),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| format!("Mark worn failed: {e}"))?;
        Ok(ToolOutput::Ack)
    }
}

pub struct MarkCleanTool {
    store: Arc<dyn WardrobeStore>,
}

impl MarkCleanTool {
    pub fn new(store: Arc<dyn WardrobeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MarkCleanTool {
    fn name(&self) -> ToolName {
        ToolName::MarkClean
    }

    fn description(&self) -> &str {
        "Mark an item clean"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let (user_id, item_id) = match call {
            ToolCall::MarkClean { user_id, item_id } => (user_id, item_id),
            other => return Err(other.mismatch(ToolName::MarkClean)),
        };
        owned_item(self.store.as_ref(), &user_id, &item_id)
            .await
            .map_err(|e| format!("Mark clean failed: {e}"))?;
        self.store
            .update_item(
                &item_id,
                ItemUpdate {
                    is_clean: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| format!("Mark clean failed: {e}"))?;
        Ok(ToolOutput::Ack)
    }
}
