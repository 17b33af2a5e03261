//! Agent 数据模型：计划、步骤、执行记录、日志、评估与 Agent 配置

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Category, Formality};
use crate::tools::{ToolCall, ToolName, ToolOutput};

/// 请求约束：常用字段强类型，其余字段原样透传
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formality: Option<Formality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avoid_colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comfort: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Vec<String>>,
    /// 天气查询城市
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// 目标日期（RFC 3339 或 YYYY-MM-DD）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// 库存分析的时间窗口（天）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capsule_goal: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// 计划中的一步：一次工具调用 + 依赖的步骤 id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub call: ToolCall,
    pub expected_output: String,
    pub dependencies: Vec<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Step {
    pub fn tool(&self) -> ToolName {
        self.call.name()
    }
}

/// 计划模板中的一步：依赖按工具名声明，create_plan 时解析为步骤 id
#[derive(Debug, Clone)]
pub struct StepTemplate {
    pub call: ToolCall,
    pub expected_output: &'static str,
    pub depends_on: Vec<ToolName>,
}

impl StepTemplate {
    pub fn new(call: ToolCall, expected_output: &'static str) -> Self {
        Self {
            call,
            expected_output,
            depends_on: Vec::new(),
        }
    }

    pub fn after(mut self, tools: &[ToolName]) -> Self {
        self.depends_on.extend_from_slice(tools);
        self
    }
}

/// 不可变计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub goal: String,
    pub constraints: Constraints,
    pub steps: Vec<Step>,
    pub estimated_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

/// 一次计划运行的可变记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub plan_id: String,
    pub steps: Vec<Step>,
    /// 已结算的步骤数（仅供展示）
    pub current_step: usize,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub logs: Vec<ExecutionLog>,
}

impl Execution {
    pub fn step_for(&self, tool: ToolName) -> Option<&Step> {
        self.steps.iter().find(|s| s.tool() == tool)
    }

    /// 指定工具步骤的结果（仅已完成的步骤）
    pub fn completed_output(&self, tool: ToolName) -> Option<&ToolOutput> {
        self.step_for(tool)
            .filter(|s| s.status == StepStatus::Completed)
            .and_then(|s| s.result.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepScore {
    pub step_id: String,
    pub score: f64,
    pub feedback: String,
}

/// 执行评估
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Critique {
    pub id: String,
    pub execution_id: String,
    pub overall_score: f64,
    pub step_scores: Vec<StepScore>,
    pub suggestions: Vec<String>,
    pub should_retry: bool,
}

/// Agent 运行参数（对应配置的 [agent] 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_retries: u32,
    /// 单次工具调用的 deadline（毫秒）
    pub timeout_ms: u64,
    /// 仅作记录：评估与 Stylist 的重试判断总会执行
    pub enable_critique: bool,
    /// 关闭时反馈只落库，不更新学习规则与偏好
    pub enable_learning: bool,
    /// 低于该级别的执行日志只保留在 Execution 中，不输出到 tracing
    pub log_level: LogLevel,
    /// 退避基数（毫秒）
    pub retry_base_delay_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_ms: 30_000,
            enable_critique: true,
            enable_learning: true,
            log_level: LogLevel::Info,
            retry_base_delay_ms: 1_000,
        }
    }
}
