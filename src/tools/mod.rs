//! 工具箱：强类型调用 / 结果、注册表、执行器与衣橱领域工具

pub mod executor;
pub mod inventory;
pub mod perception;
pub mod registry;
pub mod scoring;
pub mod types;
pub mod wardrobe;
pub mod weather;

use std::sync::Arc;

pub use executor::ToolExecutor;
pub use inventory::{DetectGapsTool, SuggestOptimizationsTool, WearFrequencyTool};
pub use perception::{AnalyzeImageTool, DetectDuplicatesTool, EnrichItemTool};
pub use registry::{Tool, ToolRegistry};
pub use scoring::ScoreOutfitTool;
pub use types::*;
pub use wardrobe::{LaundryStatusTool, MarkCleanTool, MarkWornTool, SearchWardrobeTool};
pub use weather::WeatherTool;

use crate::config::ToolsSection;
use crate::perception::PerceptionService;
use crate::store::WardrobeStore;

/// 注册全部十二个工具
pub fn default_registry(
    config: &ToolsSection,
    store: Arc<dyn WardrobeStore>,
    perception: Arc<dyn PerceptionService>,
) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(WeatherTool::new(&config.weather));
    tools.register(SearchWardrobeTool::new(store.clone()));
    tools.register(LaundryStatusTool::new(store.clone()));
    tools.register(MarkWornTool::new(store.clone()));
    tools.register(MarkCleanTool::new(store.clone()));
    tools.register(ScoreOutfitTool::new());
    tools.register(WearFrequencyTool::new(store.clone()));
    tools.register(DetectGapsTool::new(store));
    tools.register(SuggestOptimizationsTool::new());
    tools.register(AnalyzeImageTool::new(perception.clone()));
    tools.register(DetectDuplicatesTool::new(perception.clone()));
    tools.register(EnrichItemTool::new(perception));
    tools
}
