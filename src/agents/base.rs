//! 通用 Agent：计划生成、依赖调度执行、执行日志、自我评估
//!
//! 具体 Agent 只提供 AgentBehavior（计划模板、参数传递表、评估参数、可重试工具），
//! 调度算法对三个 Agent 完全相同：
//! 1. 每一轮收集所有依赖已完成的 pending 步骤，按传递表填充参数后并发派发，全部返回后再进入下一轮；
//! 2. 某一轮没有可执行步骤即终止（全部完成或死锁）；
//! 3. 步骤失败只阻塞依赖它的步骤。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::json;
use tokio::sync::RwLock;

use crate::agents::graph::validate_plan;
use crate::agents::{
    AgentConfig, Constraints, Critique, Execution, ExecutionLog, ExecutionStatus, LogLevel, Plan, Step, StepScore,
    StepStatus, StepTemplate,
};
use crate::core::retry::retry_with_backoff;
use crate::core::AgentError;
use crate::tools::{ToolCall, ToolExecutor, ToolName, ToolOutput};

/// 计划估时：每步 2 秒
const STEP_ESTIMATE_MS: u64 = 2_000;

/// 把上游结果投影到下游调用参数；结果形状不符时返回 Err
pub type Projection = fn(&ToolOutput, &mut ToolCall) -> Result<(), String>;

/// 参数传递表中的一项：from 工具的结果经 project 写入 to 工具的参数
pub struct Binding {
    pub from: ToolName,
    pub to: ToolName,
    pub project: Projection,
}

/// 投影函数遇到意外形状时的统一错误信息
pub fn shape_mismatch(output: &ToolOutput, call: &ToolCall) -> String {
    format!("cannot project {} result into {} parameters", output.kind(), call.name())
}

/// 评估参数：完成 / 失败步骤的分数、阈值与低分建议
pub struct CritiqueProfile {
    pub success_score: f64,
    pub failure_score: f64,
    pub threshold: f64,
    pub success_feedback: &'static str,
    /// 失败反馈前缀，后接步骤错误
    pub failure_feedback: &'static str,
    pub suggestions: &'static [&'static str],
}

/// 具体 Agent 的能力描述
pub trait AgentBehavior: Send + Sync {
    /// 计划上下文（用户、图片等）
    type Context: Send + Sync;

    fn name(&self) -> &'static str;

    fn plan_steps(&self, goal: &str, constraints: &Constraints, context: &Self::Context) -> Vec<StepTemplate>;

    fn bindings(&self) -> &'static [Binding];

    fn critique_profile(&self) -> &'static CritiqueProfile;

    /// 该工具的调用是否走指数退避重试
    fn retryable(&self, _tool: ToolName) -> bool {
        false
    }
}

/// 由模板生成计划：分配步骤 id，并把按工具名声明的依赖解析为步骤 id
///
/// 模板依赖了计划中不存在的工具时，保留工具名作为依赖 id，交给执行前校验拒绝。
pub fn create_plan(goal: &str, constraints: Constraints, templates: Vec<StepTemplate>) -> Plan {
    let ids: Vec<String> = templates
        .iter()
        .map(|_| format!("step_{}", uuid::Uuid::new_v4()))
        .collect();
    let mut by_tool: HashMap<ToolName, &str> = HashMap::new();
    for (template, id) in templates.iter().zip(&ids) {
        by_tool.entry(template.call.name()).or_insert(id.as_str());
    }

    let steps: Vec<Step> = templates
        .iter()
        .zip(&ids)
        .map(|(template, id)| Step {
            id: id.clone(),
            call: template.call.clone(),
            expected_output: template.expected_output.to_string(),
            dependencies: template
                .depends_on
                .iter()
                .map(|tool| {
                    by_tool
                        .get(tool)
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| tool.to_string())
                })
                .collect(),
            status: StepStatus::Pending,
            result: None,
            error: None,
        })
        .collect();

    Plan {
        id: format!("plan_{}", uuid::Uuid::new_v4()),
        goal: goal.to_string(),
        constraints,
        estimated_time_ms: steps.len() as u64 * STEP_ESTIMATE_MS,
        steps,
        created_at: Utc::now(),
    }
}

/// 通用 Agent：持有行为、共享工具执行器与本 Agent 的执行记录
pub struct BaseAgent<B: AgentBehavior> {
    behavior: B,
    tools: Arc<ToolExecutor>,
    config: AgentConfig,
    executions: RwLock<HashMap<String, Execution>>,
}

impl<B: AgentBehavior> BaseAgent<B> {
    pub fn new(behavior: B, tools: Arc<ToolExecutor>, config: AgentConfig) -> Self {
        Self {
            behavior,
            tools,
            config,
            executions: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.behavior.name()
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// 生成计划（纯函数，不执行任何工具）
    pub fn plan(&self, goal: &str, constraints: Constraints, context: &B::Context) -> Plan {
        tracing::info!(agent = self.name(), "Planning for goal: {}", goal);
        let templates = self.behavior.plan_steps(goal, &constraints, context);
        create_plan(goal, constraints, templates)
    }

    /// 执行计划
    ///
    /// 计划非法（环、未知依赖、重复 id）时返回 Err 且不执行任何步骤；
    /// 其余情况总是返回 Execution，全部步骤完成则为 completed，否则为 failed。
    pub async fn execute(&self, plan: &Plan) -> Result<Execution, AgentError> {
        if let Err(e) = validate_plan(&plan.steps) {
            tracing::warn!(agent = self.name(), plan_id = %plan.id, "Plan rejected: {}", e);
            return Err(e);
        }

        let mut execution = Execution {
            id: format!("exec_{}", uuid::Uuid::new_v4()),
            plan_id: plan.id.clone(),
            steps: plan.steps.clone(),
            current_step: 0,
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            logs: Vec::new(),
        };
        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        self.log(
            &mut execution,
            LogLevel::Debug,
            format!("Starting execution of plan {}", plan.id),
            None,
            None,
        );

        match self.run_steps(&mut execution).await {
            Ok(status) => execution.status = status,
            Err(e) => {
                self.log(
                    &mut execution,
                    LogLevel::Error,
                    format!("{} execution failed: {}", self.name(), e),
                    None,
                    None,
                );
                execution.status = ExecutionStatus::Failed;
            }
        }
        execution.end_time = Some(Utc::now());

        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        Ok(execution)
    }

    /// 按轮调度，返回最终状态；参数传递缺陷以 Err 返回
    async fn run_steps(&self, execution: &mut Execution) -> Result<ExecutionStatus, AgentError> {
        let label = self.name().to_lowercase();
        let total = execution.steps.len();
        let mut completed: HashSet<String> = HashSet::new();

        while completed.len() < total {
            let eligible: Vec<usize> = execution
                .steps
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    s.status == StepStatus::Pending && s.dependencies.iter().all(|d| completed.contains(d))
                })
                .map(|(i, _)| i)
                .collect();
            if eligible.is_empty() {
                break;
            }

            // 先完成本轮全部参数传递，任一失败时没有步骤处于 running
            for &i in &eligible {
                self.propagate(&mut execution.steps, i)?;
            }
            for &i in &eligible {
                execution.steps[i].status = StepStatus::Running;
                let step_id = execution.steps[i].id.clone();
                let message = format!("Executing {} step: {}", label, execution.steps[i].tool());
                self.log(execution, LogLevel::Info, message, Some(json!({ "stepId": step_id })), Some(&step_id));
            }

            let calls: Vec<ToolCall> = eligible.iter().map(|&i| execution.steps[i].call.clone()).collect();
            let outcomes = join_all(calls.into_iter().map(|call| self.dispatch(call))).await;

            for (&i, outcome) in eligible.iter().zip(outcomes) {
                execution.current_step += 1;
                let step_id = execution.steps[i].id.clone();
                match outcome {
                    Ok(output) => {
                        let data = json!({ "stepId": step_id, "result": output });
                        let step = &mut execution.steps[i];
                        step.status = StepStatus::Completed;
                        step.result = Some(output);
                        completed.insert(step_id.clone());
                        self.log(
                            execution,
                            LogLevel::Info,
                            "Step completed successfully",
                            Some(data),
                            Some(&step_id),
                        );
                    }
                    Err(error) => {
                        let message = format!("Step failed: {}", error);
                        let step = &mut execution.steps[i];
                        step.status = StepStatus::Failed;
                        step.error = Some(error);
                        self.log(
                            execution,
                            LogLevel::Error,
                            message,
                            Some(json!({ "stepId": step_id })),
                            Some(&step_id),
                        );
                    }
                }
            }
        }

        if completed.len() == total {
            return Ok(ExecutionStatus::Completed);
        }
        let blocked: Vec<String> = execution
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .map(|s| s.id.clone())
            .collect();
        if !blocked.is_empty() {
            self.log(
                execution,
                LogLevel::Warn,
                format!("No further progress possible; {} step(s) blocked", blocked.len()),
                Some(json!({ "blockedSteps": blocked })),
                None,
            );
        }
        Ok(ExecutionStatus::Failed)
    }

    /// 按传递表把已完成依赖步骤的结果写入第 idx 步的参数；重复调用结果相同
    fn propagate(&self, steps: &mut [Step], idx: usize) -> Result<(), AgentError> {
        let consumer = steps[idx].tool();
        for binding in self.behavior.bindings().iter().filter(|b| b.to == consumer) {
            let source = steps
                .iter()
                .find(|s| {
                    s.tool() == binding.from
                        && s.status == StepStatus::Completed
                        && steps[idx].dependencies.contains(&s.id)
                })
                .and_then(|s| s.result.clone());
            let Some(output) = source else {
                continue;
            };
            let step = &mut steps[idx];
            (binding.project)(&output, &mut step.call).map_err(|reason| AgentError::Propagation {
                step: step.id.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// 派发一次工具调用；可重试的工具走指数退避
    async fn dispatch(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let deadline = Duration::from_millis(self.config.timeout_ms);
        if !self.behavior.retryable(call.name()) {
            return self.tools.execute_within(call, deadline).await.into_result();
        }
        retry_with_backoff(
            || self.tools.execute_checked(call.clone(), deadline),
            self.config.max_retries,
            Duration::from_millis(self.config.retry_base_delay_ms),
        )
        .await
        .map_err(|e| match e {
            AgentError::ToolExecutionFailed(message) => message,
            other => other.to_string(),
        })
    }

    /// 评估执行：只看步骤状态，不访问任何外部服务
    pub fn critique(&self, execution: &Execution) -> Critique {
        let profile = self.behavior.critique_profile();
        let step_scores: Vec<StepScore> = execution
            .steps
            .iter()
            .map(|step| {
                if step.status == StepStatus::Completed {
                    StepScore {
                        step_id: step.id.clone(),
                        score: profile.success_score,
                        feedback: profile.success_feedback.to_string(),
                    }
                } else {
                    StepScore {
                        step_id: step.id.clone(),
                        score: profile.failure_score,
                        feedback: format!(
                            "{}: {}",
                            profile.failure_feedback,
                            step.error.as_deref().unwrap_or("Unknown error")
                        ),
                    }
                }
            })
            .collect();

        let overall_score = if step_scores.is_empty() {
            0.0
        } else {
            step_scores.iter().map(|s| s.score).sum::<f64>() / step_scores.len() as f64
        };
        let suggestions = if overall_score < profile.threshold {
            profile.suggestions.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };

        Critique {
            id: format!("critique_{}", uuid::Uuid::new_v4()),
            execution_id: execution.id.clone(),
            overall_score,
            step_scores,
            suggestions,
            should_retry: overall_score < 0.5 && execution.status == ExecutionStatus::Failed,
        }
    }

    pub async fn get_execution(&self, id: &str) -> Option<Execution> {
        self.executions.read().await.get(id).cloned()
    }

    /// 全部执行记录，按开始时间排序
    pub async fn all_executions(&self) -> Vec<Execution> {
        let mut all: Vec<Execution> = self.executions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    /// 追加执行日志；达到配置级别的同时输出到 tracing
    fn log(
        &self,
        execution: &mut Execution,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
        step_id: Option<&str>,
    ) {
        let entry = ExecutionLog {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
            step_id: step_id.map(str::to_string),
        };
        if level >= self.config.log_level {
            let agent = self.name();
            let execution_id = execution.id.as_str();
            let step_id = entry.step_id.as_deref().unwrap_or("-");
            match level {
                LogLevel::Debug => tracing::debug!(agent, execution_id, step_id, "{}", entry.message),
                LogLevel::Info => tracing::info!(agent, execution_id, step_id, "{}", entry.message),
                LogLevel::Warn => tracing::warn!(agent, execution_id, step_id, "{}", entry.message),
                LogLevel::Error => tracing::error!(agent, execution_id, step_id, "{}", entry.message),
            }
        }
        execution.logs.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolRegistry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 测试用：两步 markWorn → markClean，无参数传递
    struct Chores;

    static CHORES_PROFILE: CritiqueProfile = CritiqueProfile {
        success_score: 1.0,
        failure_score: 0.0,
        threshold: 0.6,
        success_feedback: "done",
        failure_feedback: "not done",
        suggestions: &["try again"],
    };

    impl AgentBehavior for Chores {
        type Context = ();

        fn name(&self) -> &'static str {
            "Chores"
        }

        fn plan_steps(&self, _goal: &str, _constraints: &Constraints, _context: &()) -> Vec<StepTemplate> {
            let ids = || ("u1".to_string(), "i1".to_string());
            let (user_id, item_id) = ids();
            let worn = ToolCall::MarkWorn { user_id, item_id };
            let (user_id, item_id) = ids();
            let clean = ToolCall::MarkClean { user_id, item_id };
            vec![
                StepTemplate::new(worn, "worn"),
                StepTemplate::new(clean, "clean").after(&[ToolName::MarkWorn]),
            ]
        }

        fn bindings(&self) -> &'static [Binding] {
            &[]
        }

        fn critique_profile(&self) -> &'static CritiqueProfile {
            &CHORES_PROFILE
        }

        fn retryable(&self, tool: ToolName) -> bool {
            tool == ToolName::MarkWorn
        }
    }

    /// 前 fail_times 次失败，之后成功
    struct Flaky {
        name: ToolName,
        calls: Arc<AtomicU32>,
        fail_times: u32,
    }

    #[async_trait]
    impl Tool for Flaky {
        fn name(&self) -> ToolName {
            self.name
        }

        fn description(&self) -> &str {
            "flaky"
        }

        async fn execute(&self, _call: ToolCall) -> Result<ToolOutput, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(format!("{} attempt {} failed", self.name, n))
            } else {
                Ok(ToolOutput::Ack)
            }
        }
    }

    fn agent(worn_failures: u32, max_retries: u32) -> (BaseAgent<Chores>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Flaky {
            name: ToolName::MarkWorn,
            calls: calls.clone(),
            fail_times: worn_failures,
        });
        registry.register(Flaky {
            name: ToolName::MarkClean,
            calls: Arc::new(AtomicU32::new(0)),
            fail_times: 0,
        });
        let config = AgentConfig {
            max_retries,
            retry_base_delay_ms: 1,
            ..Default::default()
        };
        let executor = Arc::new(ToolExecutor::new(registry, 5));
        (BaseAgent::new(Chores, executor, config), calls)
    }

    /// 测试用：markWorn 之后并列 markClean 与 getWeather，后者的参数传递总是失败
    struct Fanout;

    fn pass_through(_output: &ToolOutput, _call: &mut ToolCall) -> Result<(), String> {
        Ok(())
    }

    static FANOUT_BINDINGS: [Binding; 2] = [
        Binding {
            from: ToolName::MarkWorn,
            to: ToolName::MarkClean,
            project: pass_through,
        },
        Binding {
            from: ToolName::MarkWorn,
            to: ToolName::GetWeather,
            project: shape_mismatch_always,
        },
    ];

    fn shape_mismatch_always(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
        Err(shape_mismatch(output, call))
    }

    impl AgentBehavior for Fanout {
        type Context = ();

        fn name(&self) -> &'static str {
            "Fanout"
        }

        fn plan_steps(&self, _goal: &str, _constraints: &Constraints, _context: &()) -> Vec<StepTemplate> {
            let worn = ToolCall::MarkWorn {
                user_id: "u1".to_string(),
                item_id: "i1".to_string(),
            };
            let clean = ToolCall::MarkClean {
                user_id: "u1".to_string(),
                item_id: "i1".to_string(),
            };
            let weather = ToolCall::GetWeather {
                city: "Paris".to_string(),
                date: "2024-07-15".to_string(),
            };
            vec![
                StepTemplate::new(worn, "worn"),
                StepTemplate::new(clean, "clean").after(&[ToolName::MarkWorn]),
                StepTemplate::new(weather, "weather").after(&[ToolName::MarkWorn]),
            ]
        }

        fn bindings(&self) -> &'static [Binding] {
            &FANOUT_BINDINGS
        }

        fn critique_profile(&self) -> &'static CritiqueProfile {
            &CHORES_PROFILE
        }
    }

    #[tokio::test]
    async fn test_failed_projection_leaves_no_step_running() {
        let mut registry = ToolRegistry::new();
        let clean_calls = Arc::new(AtomicU32::new(0));
        for (name, calls) in [
            (ToolName::MarkWorn, Arc::new(AtomicU32::new(0))),
            (ToolName::MarkClean, clean_calls.clone()),
            (ToolName::GetWeather, Arc::new(AtomicU32::new(0))),
        ] {
            registry.register(Flaky {
                name,
                calls,
                fail_times: 0,
            });
        }
        let executor = Arc::new(ToolExecutor::new(registry, 5));
        let agent = BaseAgent::new(Fanout, executor, AgentConfig::default());

        let plan = agent.plan("fanout", Constraints::default(), &());
        let execution = agent.execute(&plan).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
        let statuses: Vec<StepStatus> = execution.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Completed, StepStatus::Pending, StepStatus::Pending]
        );
        assert_eq!(clean_calls.load(Ordering::SeqCst), 0);
        assert!(execution
            .logs
            .iter()
            .any(|l| l.level == LogLevel::Error && l.message.contains("cannot project ack result into getWeather")));

        let stored = agent.get_execution(&execution.id).await.unwrap();
        assert!(stored.steps.iter().all(|s| s.status != StepStatus::Running));
    }

    #[test]
    fn test_create_plan_resolves_tool_dependencies() {
        let (agent, _) = agent(0, 0);
        let plan = agent.plan("chores", Constraints::default(), &());
        assert!(plan.id.starts_with("plan_"));
        assert_eq!(plan.estimated_time_ms, 4_000);
        assert_eq!(plan.steps[1].dependencies, vec![plan.steps[0].id.clone()]);
        assert!(plan.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_ne!(plan.steps[0].id, plan.steps[1].id);
    }

    #[test]
    fn test_unresolvable_template_dependency_is_kept_by_name() {
        let templates = vec![StepTemplate::new(
            ToolCall::MarkClean {
                user_id: "u".to_string(),
                item_id: "i".to_string(),
            },
            "clean",
        )
        .after(&[ToolName::GetWeather])];
        let plan = create_plan("x", Constraints::default(), templates);
        assert_eq!(plan.steps[0].dependencies, vec!["getWeather".to_string()]);
        assert!(matches!(
            validate_plan(&plan.steps),
            Err(AgentError::UnknownDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_retryable_step_recovers_with_backoff() {
        let (agent, calls) = agent(2, 3);
        let plan = agent.plan("chores", Constraints::default(), &());
        let execution = agent.execute(&plan).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(execution.current_step, 2);
        assert!(execution.end_time.is_some());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_step_and_blocks_dependent() {
        let (agent, calls) = agent(10, 1);
        let plan = agent.plan("chores", Constraints::default(), &());
        let execution = agent.execute(&plan).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.steps[0].status, StepStatus::Failed);
        assert_eq!(execution.steps[0].error.as_deref(), Some("markWorn attempt 1 failed"));
        assert_eq!(execution.steps[1].status, StepStatus::Pending);
        assert!(execution.logs.iter().any(|l| l.level == LogLevel::Warn));

        let critique = agent.critique(&execution);
        assert_eq!(critique.overall_score, 0.0);
        assert!(critique.should_retry);
        assert_eq!(critique.suggestions, vec!["try again".to_string()]);
        assert_eq!(critique.step_scores[0].feedback, "not done: markWorn attempt 1 failed");
        assert_eq!(critique.step_scores[1].feedback, "not done: Unknown error");
    }

    #[tokio::test]
    async fn test_executions_are_stored_and_logs_retained_below_level() {
        let (agent, _) = agent(0, 0);
        let plan = agent.plan("chores", Constraints::default(), &());
        let first = agent.execute(&plan).await.unwrap();
        let second = agent.execute(&plan).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(agent.execution_count().await, 2);
        assert_eq!(agent.get_execution(&first.id).await, Some(first.clone()));
        assert_eq!(agent.all_executions().await.len(), 2);
        // debug 级别日志低于配置的 info，但仍保留在执行记录中
        assert_eq!(first.logs[0].level, LogLevel::Debug);
    }

    #[tokio::test]
    async fn test_empty_execution_critique_scores_zero() {
        let (agent, _) = agent(0, 0);
        let empty = Plan {
            id: "plan_empty".to_string(),
            goal: String::new(),
            constraints: Constraints::default(),
            steps: Vec::new(),
            estimated_time_ms: 0,
            created_at: Utc::now(),
        };
        let execution = agent.execute(&empty).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        let critique = agent.critique(&execution);
        assert_eq!(critique.overall_score, 0.0);
        assert!(!critique.should_retry);
    }
}
