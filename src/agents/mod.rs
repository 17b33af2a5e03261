//! Agent 层：计划 / 执行 / 评估的数据模型、依赖图校验、通用调度器与三个具体 Agent

pub mod base;
pub mod graph;
pub mod inventory;
pub mod perception;
pub mod stylist;
pub mod types;

pub use base::{create_plan, AgentBehavior, BaseAgent, Binding, CritiqueProfile};
pub use graph::validate_plan;
pub use inventory::{Inventory, InventoryAgent, InventoryContext};
pub use perception::{Perception, PerceptionAgent, PerceptionContext};
pub use stylist::{OutfitSuggestion, Stylist, StylistAgent, StylistContext};
pub use types::*;
