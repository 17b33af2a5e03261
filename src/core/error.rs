//! Agent 错误类型
//!
//! 步骤级失败不走这里（记录在 Step 上）；这里只放计划非法、参数传递缺陷、
//! 工具超时、生成失败以及来自存储 / 感知服务的错误。

use thiserror::Error;

use crate::perception::PerceptionError;
use crate::store::StoreError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 计划依赖图中存在环，调度前即拒绝
    #[error("Cyclic dependency detected at step {0}")]
    CyclicDependency(String),

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    /// 依赖结果无法投影到下游步骤参数（结果形状不符合预期）
    #[error("Parameter propagation failed for step {step}: {reason}")]
    Propagation { step: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("{0}")]
    GenerationFailed(String),

    #[error("Perception error: {0}")]
    Perception(#[from] PerceptionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 计划校验类错误（环、未知依赖、重复 id）
    pub fn is_plan_invalid(&self) -> bool {
        matches!(
            self,
            AgentError::CyclicDependency(_)
                | AgentError::UnknownDependency { .. }
                | AgentError::DuplicateStep(_)
        )
    }
}
