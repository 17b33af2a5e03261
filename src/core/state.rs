//! 状态投影：由各 Agent 的执行记录得到轻量的健康状态

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agents::Execution;
use crate::perception::ClientCapabilities;

/// 单个 Agent 的健康状态
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
    pub execution_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ClientCapabilities>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

impl AgentHealth {
    /// 将执行记录（按开始时间排序）投影为健康状态
    pub fn project(executions: &[Execution]) -> Self {
        Self {
            status: HealthStatus::Healthy,
            last_execution: executions.last().map(|e| e.start_time),
            execution_count: executions.len(),
            capabilities: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }
}

/// 三个 Agent 的状态汇总
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentStatusReport {
    pub stylist: AgentHealth,
    pub perception: AgentHealth,
    pub inventory: AgentHealth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ExecutionStatus;

    #[test]
    fn test_project_empty_and_latest() {
        let empty = AgentHealth::project(&[]);
        assert_eq!(empty.execution_count, 0);
        assert!(empty.last_execution.is_none());
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json.get("lastExecution").is_none());

        let started = Utc::now();
        let execution = Execution {
            id: "exec_1".to_string(),
            plan_id: "plan_1".to_string(),
            steps: vec![],
            current_step: 0,
            status: ExecutionStatus::Completed,
            start_time: started,
            end_time: Some(started),
            logs: vec![],
        };
        let health = AgentHealth::project(&[execution]);
        assert_eq!(health.execution_count, 1);
        assert_eq!(health.last_execution, Some(started));
    }
}
