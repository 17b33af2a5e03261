//! 工具执行器
//!
//! 持有 ToolRegistry 与默认超时，execute(call) 在超时内调用 registry.execute，
//! 成功、失败、超时一律包装为 ToolResult 信封（从不 panic）；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{Tool, ToolCall, ToolName, ToolOutput, ToolRegistry, ToolResult};

/// 工具执行器：对每次调用施加超时，结果统一为信封
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self::with_timeout(registry, Duration::from_secs(timeout_secs))
    }

    pub fn with_timeout(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// 以默认超时执行
    pub async fn execute(&self, call: ToolCall) -> ToolResult {
        self.execute_within(call, self.timeout).await
    }

    /// 以指定超时执行；超时与工具错误都转为 success=false 的信封
    pub async fn execute_within(&self, call: ToolCall, deadline: Duration) -> ToolResult {
        let tool_name = call.name();
        let (result, elapsed) = self.dispatch(call, deadline).await;
        match result {
            Ok(output) => ToolResult::ok(tool_name.as_str(), output, elapsed),
            Err(AgentError::ToolExecutionFailed(e)) => ToolResult::failure(tool_name.as_str(), e, elapsed),
            Err(e) => ToolResult::failure(tool_name.as_str(), e.to_string(), elapsed),
        }
    }

    /// 执行并返回 Result：工具错误为 ToolExecutionFailed，超时为 ToolTimeout（供重试路径使用）
    pub async fn execute_checked(&self, call: ToolCall, deadline: Duration) -> Result<ToolOutput, AgentError> {
        self.dispatch(call, deadline).await.0
    }

    async fn dispatch(&self, call: ToolCall, deadline: Duration) -> (Result<ToolOutput, AgentError>, Duration) {
        let tool_name = call.name();
        let start = Instant::now();
        let args_preview = args_preview(&call.parameters());
        let result = timeout(deadline, self.registry.execute(call)).await;
        let elapsed = start.elapsed();

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name.as_str(),
            "ok": ok,
            "outcome": outcome,
            "duration_ms": elapsed.as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        let result = match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        };
        (result, elapsed)
    }

    /// 按名称 + JSON 参数调用（外部入口）；未知工具或参数不合法时返回失败信封
    pub async fn execute_named(&self, name: &str, args: serde_json::Value) -> ToolResult {
        let tool_name = match name.parse::<ToolName>() {
            Ok(n) => n,
            Err(e) => return ToolResult::failure(name, e, Duration::ZERO),
        };
        let envelope = serde_json::json!({ "tool": tool_name.as_str(), "parameters": args });
        match serde_json::from_value::<ToolCall>(envelope) {
            Ok(call) => self.execute(call).await,
            Err(e) => ToolResult::failure(
                name,
                format!("Invalid parameters for {tool_name}: {e}"),
                Duration::ZERO,
            ),
        }
    }

    pub fn get_tool(&self, name: ToolName) -> Option<std::sync::Arc<dyn Tool>> {
        self.registry.get(name)
    }

    pub fn tool_names(&self) -> Vec<ToolName> {
        self.registry.tool_names()
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
