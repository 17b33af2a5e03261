//! Dresser - 衣橱智能体的计划 / 执行 / 评估引擎
//!
//! 模块划分：
//! - **agents**: 计划、步骤、执行记录与评估；依赖图校验；通用调度器与 Stylist / Inventory / Perception
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、指数退避、编排器、状态投影
//! - **learning**: 反馈学习（规则、反馈模式、偏好回写与学习指标）
//! - **observability**: tracing 初始化
//! - **perception**: 图片分析、重复检测与单品补全服务
//! - **store**: 衣橱持久化接口与内存实现
//! - **tools**: 强类型工具调用、注册表、执行器与衣橱领域工具

pub mod agents;
pub mod config;
pub mod core;
pub mod learning;
pub mod observability;
pub mod perception;
pub mod store;
pub mod tools;

pub use agents::{BaseAgent, Constraints, Critique, Execution, Plan};
pub use crate::core::{AgentError, AgentOrchestrator};
