//! 核心层：错误类型、指数退避、编排器与状态投影

pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{
    AgentOrchestrator, FeedbackResponse, PerceptionResponse, PlanRunResponse, RequestMetadata, StylistResponse,
};
pub use retry::{backoff_delay, retry_with_backoff};
pub use state::{AgentHealth, AgentStatusReport, HealthStatus};
