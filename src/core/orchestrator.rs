//! Agent 编排器：持有三个 Agent 与共享的工具执行器
//!
//! 每个请求方法只做「调用 Agent → 包装结果」，错误从不向外传播，
//! 统一转为 success=false 的响应（"<Agent> agent failed: ..."）。

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agents::{
    AgentBehavior, BaseAgent, Constraints, Critique, Execution, Inventory, InventoryAgent, InventoryContext,
    OutfitSuggestion, Perception, PerceptionAgent, PerceptionContext, Plan, Stylist, StylistAgent, StylistContext,
};
use crate::config::AppConfig;
use crate::core::state::{AgentHealth, AgentStatusReport};
use crate::core::AgentError;
use crate::learning::{FeedbackInsights, FeedbackProcessor, LearningMetrics};
use crate::perception::{ImageUpload, PerceptionService, UploadOutcome};
use crate::store::{Feedback, NewFeedback, StoreError, WardrobeStore};
use crate::tools::{default_registry, ToolExecutor};

/// 响应元数据；execution_time_ms 只在成功时给出
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub agent: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl RequestMetadata {
    fn succeeded(agent: &'static str, started: Instant) -> Self {
        Self {
            agent,
            timestamp: Utc::now(),
            execution_time_ms: Some(started.elapsed().as_millis() as u64),
        }
    }

    fn failed(agent: &'static str) -> Self {
        Self {
            agent,
            timestamp: Utc::now(),
            execution_time_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StylistResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<OutfitSuggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerceptionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<FeedbackInsights>,
    pub learned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: RequestMetadata,
}

/// 计划 + 执行 + 评估 的完整结果（库存分析与图片补全共用）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRunResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<Execution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<Critique>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: RequestMetadata,
}

impl PlanRunResponse {
    fn failed(agent: &'static str, label: &str, error: AgentError) -> Self {
        Self {
            success: false,
            plan: None,
            execution: None,
            critique: None,
            error: Some(format!("{} agent failed: {}", label, error)),
            metadata: RequestMetadata::failed(agent),
        }
    }
}

pub struct AgentOrchestrator {
    stylist: StylistAgent,
    inventory: InventoryAgent,
    perception: PerceptionAgent,
    learning: FeedbackProcessor,
    tools: Arc<ToolExecutor>,
}

impl AgentOrchestrator {
    /// 注册全部工具并创建三个 Agent
    pub fn new(config: &AppConfig, store: Arc<dyn WardrobeStore>, perception: Arc<dyn PerceptionService>) -> Self {
        let registry = default_registry(&config.tools, store.clone(), perception.clone());
        let tools = Arc::new(ToolExecutor::new(registry, config.tools.tool_timeout_secs));
        Self::with_tools(config, tools, store, perception)
    }

    /// 使用外部构造的工具执行器（测试中注入桩工具）
    pub fn with_tools(
        config: &AppConfig,
        tools: Arc<ToolExecutor>,
        store: Arc<dyn WardrobeStore>,
        perception: Arc<dyn PerceptionService>,
    ) -> Self {
        let agent_config = config.agent.clone();
        tracing::info!(
            tools = tools.tool_names().len(),
            max_retries = agent_config.max_retries,
            timeout_ms = agent_config.timeout_ms,
            learning = agent_config.enable_learning,
            "Agent orchestrator ready"
        );
        let learning = FeedbackProcessor::new(store, agent_config.enable_learning);
        Self {
            stylist: BaseAgent::new(
                Stylist::new(config.tools.weather.default_city.clone()),
                tools.clone(),
                agent_config.clone(),
            ),
            inventory: BaseAgent::new(Inventory, tools.clone(), agent_config.clone()),
            perception: BaseAgent::new(Perception::new(perception), tools.clone(), agent_config),
            learning,
            tools,
        }
    }

    pub fn stylist(&self) -> &StylistAgent {
        &self.stylist
    }

    pub fn inventory(&self) -> &InventoryAgent {
        &self.inventory
    }

    pub fn perception(&self) -> &PerceptionAgent {
        &self.perception
    }

    pub fn tools(&self) -> &Arc<ToolExecutor> {
        &self.tools
    }

    pub fn learning(&self) -> &FeedbackProcessor {
        &self.learning
    }

    pub async fn execute_stylist_request(&self, context: &StylistContext) -> StylistResponse {
        let started = Instant::now();
        match self.stylist.generate_outfit_suggestions(context).await {
            Ok(suggestions) => StylistResponse {
                success: true,
                suggestions: Some(suggestions),
                error: None,
                metadata: RequestMetadata::succeeded("stylist", started),
            },
            Err(e) => {
                tracing::warn!(user_id = %context.user_id, "Stylist request failed: {}", e);
                StylistResponse {
                    success: false,
                    suggestions: None,
                    error: Some(format!("Stylist agent failed: {}", e)),
                    metadata: RequestMetadata::failed("stylist"),
                }
            }
        }
    }

    pub async fn execute_perception_request(&self, upload: &ImageUpload, user_id: &str) -> PerceptionResponse {
        let started = Instant::now();
        match self.perception.process_upload(upload, user_id).await {
            Ok(result) => PerceptionResponse {
                success: true,
                result: Some(result),
                error: None,
                metadata: RequestMetadata::succeeded("perception", started),
            },
            Err(e) => {
                tracing::warn!(user_id, file = %upload.file_name, "Perception request failed: {}", e);
                PerceptionResponse {
                    success: false,
                    result: None,
                    error: Some(format!("Perception agent failed: {}", e)),
                    metadata: RequestMetadata::failed("perception"),
                }
            }
        }
    }

    pub async fn execute_inventory_request(
        &self,
        user_id: &str,
        goal: &str,
        constraints: Constraints,
    ) -> PlanRunResponse {
        let context = InventoryContext {
            user_id: user_id.to_string(),
        };
        run_plan(&self.inventory, "inventory", goal, constraints, &context).await
    }

    /// 对已上传单品跑完整的感知计划（分析 → 查重 → 回写）
    pub async fn execute_enrichment_request(&self, user_id: &str, image_url: &str, item_id: &str) -> PlanRunResponse {
        let context = PerceptionContext {
            user_id: user_id.to_string(),
            image_url: image_url.to_string(),
            item_id: item_id.to_string(),
        };
        run_plan(
            &self.perception,
            "perception",
            "Enrich uploaded item",
            Constraints::default(),
            &context,
        )
        .await
    }

    /// 记录用户对搭配的反馈，学习开启时更新规则与偏好
    pub async fn execute_feedback_request(&self, feedback: NewFeedback) -> FeedbackResponse {
        let started = Instant::now();
        let user_id = feedback.user_id.clone();
        match self.learning.process_feedback(feedback).await {
            Ok(outcome) => FeedbackResponse {
                success: true,
                feedback: Some(outcome.feedback),
                insights: outcome.learned.then_some(outcome.insights),
                learned: outcome.learned,
                error: None,
                metadata: RequestMetadata::succeeded("learning", started),
            },
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Feedback request failed: {}", e);
                FeedbackResponse {
                    success: false,
                    feedback: None,
                    insights: None,
                    learned: false,
                    error: Some(format!("Failed to process feedback: {}", e)),
                    metadata: RequestMetadata::failed("learning"),
                }
            }
        }
    }

    pub async fn get_learning_metrics(&self, user_id: &str) -> Result<LearningMetrics, StoreError> {
        self.learning.learning_metrics(user_id).await
    }

    /// 三个 Agent 的全部执行记录
    pub async fn get_all_executions(&self) -> Vec<Execution> {
        let mut all = self.stylist.all_executions().await;
        all.extend(self.inventory.all_executions().await);
        all.extend(self.perception.all_executions().await);
        all
    }

    pub async fn get_agent_status(&self) -> AgentStatusReport {
        AgentStatusReport {
            stylist: AgentHealth::project(&self.stylist.all_executions().await),
            perception: AgentHealth::project(&self.perception.all_executions().await)
                .with_capabilities(self.perception.capabilities()),
            inventory: AgentHealth::project(&self.inventory.all_executions().await),
        }
    }
}

/// plan → execute → critique
async fn run_plan<B: AgentBehavior>(
    agent: &BaseAgent<B>,
    tag: &'static str,
    goal: &str,
    constraints: Constraints,
    context: &B::Context,
) -> PlanRunResponse {
    let started = Instant::now();
    let plan = agent.plan(goal, constraints, context);
    let execution = match agent.execute(&plan).await {
        Ok(execution) => execution,
        Err(e) => {
            tracing::warn!(agent = agent.name(), plan_id = %plan.id, "Request failed: {}", e);
            return PlanRunResponse::failed(tag, agent.name(), e);
        }
    };
    let critique = Some(agent.critique(&execution));

    PlanRunResponse {
        success: true,
        plan: Some(plan),
        execution: Some(execution),
        critique,
        error: None,
        metadata: RequestMetadata::succeeded(tag, started),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ExecutionStatus;
    use crate::config::PerceptionSection;
    use crate::perception::LocalPerception;
    use crate::store::{Category, Decision, InMemoryStore, NewItem, WardrobeStore};

    async fn orchestrator() -> (AgentOrchestrator, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let perception = Arc::new(LocalPerception::new(store.clone(), PerceptionSection::default()));
        let mut config = AppConfig::default();
        config.agent.retry_base_delay_ms = 1;
        (AgentOrchestrator::new(&config, store.clone(), perception), store)
    }

    #[tokio::test]
    async fn test_inventory_request_on_empty_wardrobe() {
        let (orch, _) = orchestrator().await;
        let response = orch
            .execute_inventory_request("u1", "audit", Constraints::default())
            .await;
        assert!(response.success);
        let execution = response.execution.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        let critique = response.critique.unwrap();
        assert!((critique.overall_score - 0.85).abs() < 1e-9);
        assert!(response.metadata.execution_time_ms.is_some());
        assert_eq!(orch.get_all_executions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stylist_request_with_offline_weather() {
        let (orch, store) = orchestrator().await;
        for (title, category) in [("Tee", Category::Shirt), ("Chinos", Category::Pants)] {
            store
                .create_item(NewItem {
                    user_id: "u1".to_string(),
                    title: title.to_string(),
                    category,
                    colors: vec!["navy".to_string()],
                    is_clean: true,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let context = StylistContext {
            user_id: "u1".to_string(),
            goal: "weekend".to_string(),
            constraints: Constraints::default(),
        };
        let response = orch.execute_stylist_request(&context).await;
        assert!(response.success, "{:?}", response.error);
        let suggestions = response.suggestions.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].items.len(), 2);
    }

    #[tokio::test]
    async fn test_perception_request_rejects_large_file() {
        let (orch, _) = orchestrator().await;
        let upload = ImageUpload {
            file_name: "big.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0u8; 10 * 1024 * 1024 + 1],
        };
        let response = orch.execute_perception_request(&upload, "u1").await;
        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.starts_with("Perception agent failed:"));
        assert!(error.contains("File too large"));
        assert!(response.metadata.execution_time_ms.is_none());
    }

    #[tokio::test]
    async fn test_feedback_request_learns_preferences() {
        let (orch, store) = orchestrator().await;
        let response = orch
            .execute_feedback_request(NewFeedback {
                user_id: "u1".to_string(),
                outfit_id: None,
                decision: Decision::Rejected,
                reason: "Green is not my color".to_string(),
            })
            .await;
        assert!(response.success, "{:?}", response.error);
        assert!(response.learned);
        assert_eq!(response.insights.unwrap().colors[0].color, "green");
        let prefs = store.get_preferences("u1").await.unwrap().unwrap();
        assert_eq!(prefs.style.avoided_colors, vec!["green".to_string()]);

        let metrics = orch.get_learning_metrics("u1").await.unwrap();
        assert_eq!(metrics.total_feedback, 1);
        assert_eq!(metrics.learning_rules, 1);
    }

    #[tokio::test]
    async fn test_feedback_request_without_learning() {
        let store = Arc::new(InMemoryStore::new());
        let perception = Arc::new(LocalPerception::new(store.clone(), PerceptionSection::default()));
        let mut config = AppConfig::default();
        config.agent.enable_learning = false;
        let orch = AgentOrchestrator::new(&config, store.clone(), perception);
        let response = orch
            .execute_feedback_request(NewFeedback {
                user_id: "u1".to_string(),
                outfit_id: Some("outfit_9".to_string()),
                decision: Decision::Accepted,
                reason: "Blue works".to_string(),
            })
            .await;
        assert!(response.success);
        assert!(!response.learned);
        assert!(response.insights.is_none());
        assert!(store.get_preferences("u1").await.unwrap().is_none());
        assert_eq!(store.get_feedback_by_outfit("outfit_9").await.unwrap().len(), 1);
        assert_eq!(orch.get_learning_metrics("u1").await.unwrap().learning_rules, 0);
    }

    #[tokio::test]
    async fn test_agent_status_reports_capabilities() {
        let (orch, _) = orchestrator().await;
        orch.execute_inventory_request("u1", "audit", Constraints::default())
            .await;
        let status = orch.get_agent_status().await;
        assert_eq!(status.inventory.execution_count, 1);
        assert!(status.inventory.last_execution.is_some());
        assert_eq!(status.stylist.execution_count, 0);
        assert!(status.perception.capabilities.is_some());
    }
}
