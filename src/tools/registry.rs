//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry 按 ToolName 注册与查找；
//! ToolExecutor 在调用时加超时并统一包装为 ToolResult 信封。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::{ToolCall, ToolName, ToolOutput};

/// 工具 trait：名称、描述、异步执行（参数为强类型 ToolCall）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（注册表中的键）
    fn name(&self) -> ToolName;

    fn description(&self) -> &str;

    /// 执行工具；收到其他工具的参数时返回 Err
    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，构造完成后只读
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具后注册者覆盖先注册者
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: ToolName) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name).cloned()
    }

    pub fn contains(&self, name: ToolName) -> bool {
        self.tools.contains_key(&name)
    }

    pub async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        let name = call.name();
        let tool = self.tools.get(&name).ok_or_else(|| format!("Unknown tool: {name}"))?;
        tool.execute(call).await
    }

    /// 已注册工具名（有序）
    pub fn tool_names(&self) -> Vec<ToolName> {
        let mut names: Vec<ToolName> = self.tools.keys().copied().collect();
        names.sort();
        names
    }

    /// 返回 (name, description) 列表
    pub fn tool_descriptions(&self) -> Vec<(ToolName, String)> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                self.tools
                    .get(&name)
                    .map(|tool| (name, tool.description().to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AckTool(ToolName);

    #[async_trait]
    impl Tool for AckTool {
        fn name(&self) -> ToolName {
            self.0
        }

        fn description(&self) -> &str {
            "acknowledges"
        }

        async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
            if call.name() != self.0 {
                return Err(call.mismatch(self.0));
            }
            Ok(ToolOutput::Ack)
        }
    }

    fn mark_worn() -> ToolCall {
        ToolCall::MarkWorn {
            user_id: "u1".to_string(),
            item_id: "i1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_call_name() {
        let mut registry = ToolRegistry::new();
        registry.register(AckTool(ToolName::MarkWorn));
        assert!(registry.contains(ToolName::MarkWorn));
        assert_eq!(registry.execute(mark_worn()).await, Ok(ToolOutput::Ack));
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.execute(mark_worn()).await,
            Err("Unknown tool: markWorn".to_string())
        );
    }

    #[test]
    fn test_tool_names_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(AckTool(ToolName::MarkClean));
        registry.register(AckTool(ToolName::GetWeather));
        assert_eq!(registry.tool_names(), vec![ToolName::GetWeather, ToolName::MarkClean]);
        assert_eq!(registry.tool_descriptions()[0].1, "acknowledges");
    }
}
