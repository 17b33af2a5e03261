//! 内存存储（无数据库时的本地回退）
//!
//! 四张表各用一个 RwLock<HashMap>；进程退出即丢失。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::perception::embedding::cosine_similarity;
use crate::store::{
    ColorUsage, Feedback, Item, ItemUpdate, NewFeedback, NewItem, NewOutfit, Outfit, Preferences,
    PreferencesUpdate, QueryFilters, SimilarityQuery, StoreError, WardrobeStore, WearCount,
};

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Default)]
pub struct InMemoryStore {
    items: RwLock<HashMap<String, Item>>,
    outfits: RwLock<HashMap<String, Outfit>>,
    preferences: RwLock<HashMap<String, Preferences>>,
    feedback: RwLock<HashMap<String, Feedback>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_creation<T, K: Ord>(mut values: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    values.sort_by_key(|v| key(v));
    values
}

#[async_trait]
impl WardrobeStore for InMemoryStore {
    async fn create_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let item = Item {
            id: format!("item_{}", uuid::Uuid::new_v4()),
            user_id: item.user_id,
            title: item.title,
            category: item.category,
            colors: item.colors,
            patterns: item.patterns,
            fabric: item.fabric,
            seasons: item.seasons,
            formality: item.formality,
            image_url: item.image_url,
            wear_count: item.wear_count,
            is_clean: item.is_clean,
            created_at: Utc::now(),
            embedding: item.embedding,
        };
        self.items.write().await.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn update_item(&self, id: &str, update: ItemUpdate) -> Result<Item, StoreError> {
        let mut items = self.items.write().await;
        let item = items.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "item",
            id: id.to_string(),
        })?;
        update.apply(item);
        Ok(item.clone())
    }

    async fn delete_item(&self, id: &str) -> Result<(), StoreError> {
        self.items.write().await.remove(id);
        Ok(())
    }

    async fn search_items(&self, filters: &QueryFilters) -> Result<Vec<Item>, StoreError> {
        let items: Vec<Item> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| filters.matches(item))
            .cloned()
            .collect();
        Ok(sorted_by_creation(items, |i| (i.created_at, i.id.clone())))
    }

    async fn find_similar_items(&self, query: &SimilarityQuery) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().await;
        let mut scored: Vec<(f32, Item)> = items
            .values()
            .filter_map(|item| {
                let embedding = item.embedding.as_ref()?;
                let similarity = cosine_similarity(&query.embedding, embedding);
                (similarity >= query.threshold).then(|| (similarity, item.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(query.limit).map(|(_, item)| item).collect())
    }

    async fn create_outfit(&self, outfit: NewOutfit) -> Result<Outfit, StoreError> {
        let outfit = Outfit {
            id: format!("outfit_{}", uuid::Uuid::new_v4()),
            user_id: outfit.user_id,
            item_ids: outfit.item_ids,
            context: outfit.context,
            rationale: outfit.rationale,
            score: outfit.score,
            created_at: Utc::now(),
        };
        self.outfits.write().await.insert(outfit.id.clone(), outfit.clone());
        Ok(outfit)
    }

    async fn get_outfit(&self, id: &str) -> Result<Option<Outfit>, StoreError> {
        Ok(self.outfits.read().await.get(id).cloned())
    }

    async fn get_user_outfits(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Outfit>, StoreError> {
        let outfits: Vec<Outfit> = self
            .outfits
            .read()
            .await
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        let mut outfits = sorted_by_creation(outfits, |o| (o.created_at, o.id.clone()));
        outfits.truncate(limit.unwrap_or(DEFAULT_LIST_LIMIT));
        Ok(outfits)
    }

    async fn get_preferences(&self, user_id: &str) -> Result<Option<Preferences>, StoreError> {
        Ok(self.preferences.read().await.get(user_id).cloned())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<Preferences, StoreError> {
        let mut preferences = self.preferences.write().await;
        let entry = preferences
            .entry(user_id.to_string())
            .or_insert_with(|| Preferences::defaults_for(user_id));
        if let Some(style) = update.style {
            entry.style = style;
        }
        if let Some(constraints) = update.constraints {
            entry.constraints = constraints;
        }
        Ok(entry.clone())
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError> {
        let feedback = Feedback {
            id: format!("feedback_{}", uuid::Uuid::new_v4()),
            user_id: feedback.user_id,
            outfit_id: feedback.outfit_id,
            decision: feedback.decision,
            reason: feedback.reason,
            created_at: Utc::now(),
        };
        self.feedback.write().await.insert(feedback.id.clone(), feedback.clone());
        Ok(feedback)
    }

    async fn get_feedback_by_outfit(&self, outfit_id: &str) -> Result<Vec<Feedback>, StoreError> {
        let feedback: Vec<Feedback> = self
            .feedback
            .read()
            .await
            .values()
            .filter(|f| f.outfit_id.as_deref() == Some(outfit_id))
            .cloned()
            .collect();
        Ok(sorted_by_creation(feedback, |f| (f.created_at, f.id.clone())))
    }

    async fn get_user_feedback(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Feedback>, StoreError> {
        let feedback: Vec<Feedback> = self
            .feedback
            .read()
            .await
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        let mut feedback = sorted_by_creation(feedback, |f| (f.created_at, f.id.clone()));
        feedback.truncate(limit.unwrap_or(DEFAULT_LIST_LIMIT));
        Ok(feedback)
    }

    // 内存实现不记录穿着时间，days 不参与过滤
    async fn get_wear_frequency(&self, user_id: &str, _days: u32) -> Result<Vec<WearCount>, StoreError> {
        let mut counts: Vec<WearCount> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.user_id == user_id)
            .map(|item| WearCount {
                item_id: item.id.clone(),
                count: item.wear_count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.item_id.cmp(&b.item_id)));
        Ok(counts)
    }

    async fn get_most_used_colors(&self, user_id: &str) -> Result<Vec<ColorUsage>, StoreError> {
        let mut totals: HashMap<String, u32> = HashMap::new();
        for item in self.items.read().await.values().filter(|i| i.user_id == user_id) {
            for color in &item.colors {
                *totals.entry(color.clone()).or_insert(0) += item.wear_count;
            }
        }
        let mut usage: Vec<ColorUsage> = totals
            .into_iter()
            .map(|(color, count)| ColorUsage { color, count })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.color.cmp(&b.color)));
        Ok(usage)
    }

    async fn is_connected(&self) -> bool {
        true
    }
}
