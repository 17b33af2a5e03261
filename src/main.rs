//! Dresser 演示入口
//!
//! 初始化日志与配置，向内存衣橱写入一组示例单品，依次运行一次穿搭请求、一次反馈学习与一次库存分析，输出 JSON。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dresser::agents::{Constraints, StylistContext};
use dresser::config::{load_config, AppConfig};
use dresser::core::AgentOrchestrator;
use dresser::observability;
use dresser::perception::LocalPerception;
use dresser::store::{Category, Decision, Formality, InMemoryStore, NewFeedback, NewItem, WardrobeStore};

const DEMO_USER: &str = "demo-user";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let store = Arc::new(InMemoryStore::new());
    seed_wardrobe(store.as_ref())
        .await
        .context("Failed to seed demo wardrobe")?;
    let perception = Arc::new(LocalPerception::new(store.clone(), cfg.perception.clone()));
    let orchestrator = AgentOrchestrator::new(&cfg, store, perception);

    let context = StylistContext {
        user_id: DEMO_USER.to_string(),
        goal: "Smart casual outfit for a client lunch".to_string(),
        constraints: Constraints {
            occasion: Some("lunch".to_string()),
            ..Default::default()
        },
    };
    let outfits = orchestrator.execute_stylist_request(&context).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&outfits).context("Failed to serialize stylist response")?
    );

    let feedback = orchestrator
        .execute_feedback_request(NewFeedback {
            user_id: DEMO_USER.to_string(),
            outfit_id: None,
            decision: Decision::Accepted,
            reason: "Navy blazer feels professional".to_string(),
        })
        .await;
    println!(
        "{}",
        serde_json::to_string_pretty(&feedback).context("Failed to serialize feedback response")?
    );

    let inventory = orchestrator
        .execute_inventory_request(DEMO_USER, "Audit my wardrobe", Constraints::default())
        .await;
    println!(
        "{}",
        serde_json::to_string_pretty(&inventory).context("Failed to serialize inventory response")?
    );

    let status = orchestrator.get_agent_status().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&status).context("Failed to serialize agent status")?
    );
    Ok(())
}

async fn seed_wardrobe(store: &dyn WardrobeStore) -> anyhow::Result<()> {
    let items = [
        ("Oxford shirt", Category::Shirt, "white", Formality::Business, 2),
        ("Linen shirt", Category::Shirt, "blue", Formality::Casual, 5),
        ("Chinos", Category::Pants, "khaki", Formality::Casual, 3),
        ("Wool trousers", Category::Pants, "navy", Formality::Business, 1),
        ("Blazer", Category::Jacket, "navy", Formality::Business, 4),
        ("Loafers", Category::Shoes, "brown", Formality::Business, 12),
        ("Sneakers", Category::Shoes, "white", Formality::Casual, 8),
    ];
    for (title, category, color, formality, wear_count) in items {
        store
            .create_item(NewItem {
                user_id: DEMO_USER.to_string(),
                title: title.to_string(),
                category,
                colors: vec![color.to_string()],
                fabric: "cotton".to_string(),
                seasons: vec!["spring".to_string(), "fall".to_string()],
                formality,
                image_url: format!("https://images.example/{}.jpg", title.to_lowercase().replace(' ', "-")),
                wear_count,
                is_clean: true,
                ..Default::default()
            })
            .await
            .with_context(|| format!("Failed to create {}", title))?;
    }
    Ok(())
}
