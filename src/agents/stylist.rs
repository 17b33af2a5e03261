//! Stylist：查天气 + 搜衣橱 + 洗衣状态 + 打分，生成穿搭建议

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::agents::base::{shape_mismatch, AgentBehavior, BaseAgent, Binding, CritiqueProfile};
use crate::agents::{Constraints, Execution, ExecutionStatus, StepTemplate};
use crate::core::AgentError;
use crate::store::Category;
use crate::tools::{ItemSummary, ToolCall, ToolName, ToolOutput, WardrobeFilters};

/// 搜索衣橱时排除穿着次数超过该值的单品
const MAX_WEAR_COUNT: u32 = 10;
const MAX_COMBINATIONS: usize = 3;
const FALLBACK_SCORE: f64 = 0.7;
const FALLBACK_RATIONALE: &str = "Generated outfit suggestion";
const SUGGESTION_CONFIDENCE: f64 = 0.8;
const ALTERNATIVES: [&str; 3] = [
    "Try a different color combination",
    "Consider adding an accessory",
    "Switch to a different style",
];

/// 一次穿搭请求的上下文
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylistContext {
    pub user_id: String,
    pub goal: String,
    #[serde(default)]
    pub constraints: Constraints,
}

/// 一套穿搭建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitSuggestion {
    pub id: String,
    pub items: Vec<ItemSummary>,
    pub rationale: String,
    pub score: f64,
    pub confidence: f64,
    pub alternatives: Vec<String>,
}

static STYLIST_PROFILE: CritiqueProfile = CritiqueProfile {
    success_score: 0.8,
    failure_score: 0.2,
    threshold: 0.7,
    success_feedback: "Step executed successfully",
    failure_feedback: "Step failed",
    suggestions: &[
        "Consider retrying with different parameters",
        "Check if all required tools are available",
    ],
};

static STYLIST_BINDINGS: [Binding; 3] = [
    Binding {
        from: ToolName::SearchWardrobe,
        to: ToolName::GetLaundryStatus,
        project: search_into_laundry,
    },
    Binding {
        from: ToolName::GetWeather,
        to: ToolName::ScoreOutfit,
        project: weather_into_score,
    },
    Binding {
        from: ToolName::SearchWardrobe,
        to: ToolName::ScoreOutfit,
        project: search_into_score,
    },
];

fn search_into_laundry(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
    match (output, call) {
        (ToolOutput::Wardrobe(found), ToolCall::GetLaundryStatus { item_ids, .. }) => {
            *item_ids = found.items.iter().map(|i| i.id.clone()).collect();
            Ok(())
        }
        (output, call) => Err(shape_mismatch(output, call)),
    }
}

fn weather_into_score(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
    match (output, call) {
        (ToolOutput::Weather(data), ToolCall::ScoreOutfit { weather, .. }) => {
            *weather = Some(data.clone());
            Ok(())
        }
        (output, call) => Err(shape_mismatch(output, call)),
    }
}

fn search_into_score(output: &ToolOutput, call: &mut ToolCall) -> Result<(), String> {
    match (output, call) {
        (ToolOutput::Wardrobe(found), ToolCall::ScoreOutfit { items, .. }) => {
            *items = Some(found.items.clone());
            Ok(())
        }
        (output, call) => Err(shape_mismatch(output, call)),
    }
}

/// 穿搭行为；default_city 来自 [tools.weather] 配置
pub struct Stylist {
    default_city: String,
}

impl Stylist {
    pub fn new(default_city: impl Into<String>) -> Self {
        Self {
            default_city: default_city.into(),
        }
    }
}

impl AgentBehavior for Stylist {
    type Context = StylistContext;

    fn name(&self) -> &'static str {
        "Stylist"
    }

    fn plan_steps(&self, goal: &str, constraints: &Constraints, context: &StylistContext) -> Vec<StepTemplate> {
        let city = constraints
            .city
            .clone()
            .or_else(|| context.constraints.city.clone())
            .unwrap_or_else(|| self.default_city.clone());
        let date = constraints
            .date
            .clone()
            .or_else(|| context.constraints.date.clone())
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let filters = WardrobeFilters {
            category: constraints.category,
            colors: constraints.colors.clone(),
            seasons: constraints.seasons.clone(),
            formality: constraints.formality.or(context.constraints.formality),
            is_clean: Some(true),
            max_wear_count: Some(MAX_WEAR_COUNT),
        };

        vec![
            StepTemplate::new(ToolCall::GetWeather { city, date }, "Weather data for outfit planning"),
            StepTemplate::new(
                ToolCall::SearchWardrobe {
                    user_id: context.user_id.clone(),
                    filters,
                    embedding_query: None,
                },
                "Available wardrobe items",
            ),
            StepTemplate::new(
                ToolCall::GetLaundryStatus {
                    user_id: context.user_id.clone(),
                    item_ids: Vec::new(),
                },
                "Laundry status of items",
            )
            .after(&[ToolName::SearchWardrobe]),
            StepTemplate::new(
                ToolCall::ScoreOutfit {
                    goal: goal.to_string(),
                    constraints: constraints.clone(),
                    weather: None,
                    items: None,
                },
                "Outfit score and rationale",
            )
            .after(&[ToolName::GetWeather, ToolName::SearchWardrobe, ToolName::GetLaundryStatus]),
        ]
    }

    fn bindings(&self) -> &'static [Binding] {
        &STYLIST_BINDINGS
    }

    fn critique_profile(&self) -> &'static CritiqueProfile {
        &STYLIST_PROFILE
    }

    fn retryable(&self, tool: ToolName) -> bool {
        tool == ToolName::GetWeather
    }
}

pub type StylistAgent = BaseAgent<Stylist>;

impl BaseAgent<Stylist> {
    /// 计划 + 执行；未完成时评估，建议重试则原计划再跑一次
    pub async fn generate_outfit_suggestions(
        &self,
        context: &StylistContext,
    ) -> Result<Vec<OutfitSuggestion>, AgentError> {
        let plan = self.plan(&context.goal, context.constraints.clone(), context);
        let execution = self.execute(&plan).await?;
        if execution.status == ExecutionStatus::Completed {
            return Ok(extract_outfit_suggestions(&execution));
        }

        if self.critique(&execution).should_retry {
            tracing::info!(execution_id = %execution.id, "Retrying outfit plan after critique");
            let retry = self.execute(&plan).await?;
            return Ok(extract_outfit_suggestions(&retry));
        }
        Err(AgentError::GenerationFailed(
            "Failed to generate outfit suggestions".to_string(),
        ))
    }
}

/// 从执行结果组合穿搭：衬衫（前 3）× 裤子（前 3），最多 3 套，
/// 有外套 / 鞋时按组合序号轮换加入一件
pub fn extract_outfit_suggestions(execution: &Execution) -> Vec<OutfitSuggestion> {
    let Some(ToolOutput::Wardrobe(found)) = execution.completed_output(ToolName::SearchWardrobe) else {
        return Vec::new();
    };
    let (score, rationale) = match execution.completed_output(ToolName::ScoreOutfit) {
        Some(ToolOutput::OutfitScore(s)) => (s.score, s.rationale.clone()),
        _ => (FALLBACK_SCORE, FALLBACK_RATIONALE.to_string()),
    };

    outfit_combinations(&found.items)
        .into_iter()
        .enumerate()
        .map(|(index, items)| OutfitSuggestion {
            id: format!("outfit_{}_{}", uuid::Uuid::new_v4(), index),
            items,
            rationale: rationale.clone(),
            score,
            confidence: SUGGESTION_CONFIDENCE,
            alternatives: ALTERNATIVES.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

fn outfit_combinations(items: &[ItemSummary]) -> Vec<Vec<ItemSummary>> {
    let of = |category: Category| items.iter().filter(move |i| i.category == category);
    let shirts: Vec<&ItemSummary> = of(Category::Shirt).take(MAX_COMBINATIONS).collect();
    let pants: Vec<&ItemSummary> = of(Category::Pants).take(MAX_COMBINATIONS).collect();
    let jackets: Vec<&ItemSummary> = of(Category::Jacket).collect();
    let shoes: Vec<&ItemSummary> = of(Category::Shoes).collect();

    shirts
        .iter()
        .flat_map(|shirt| pants.iter().map(move |pant| (*shirt, *pant)))
        .take(MAX_COMBINATIONS)
        .enumerate()
        .map(|(index, (shirt, pant))| {
            let mut outfit = vec![shirt.clone(), pant.clone()];
            if !jackets.is_empty() {
                outfit.push(jackets[index % jackets.len()].clone());
            }
            if !shoes.is_empty() {
                outfit.push(shoes[index % shoes.len()].clone());
            }
            outfit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Step, StepStatus};
    use crate::store::Formality;
    use crate::tools::{WardrobeSearchResult, WeatherData};

    fn summary(id: &str, category: Category) -> ItemSummary {
        ItemSummary {
            id: id.to_string(),
            title: id.to_string(),
            category,
            colors: vec!["black".to_string()],
            fabric: "cotton".to_string(),
            seasons: vec![],
            formality: Formality::Casual,
            image_url: String::new(),
            is_clean: true,
            wear_count: 0,
        }
    }

    fn context() -> StylistContext {
        StylistContext {
            user_id: "u1".to_string(),
            goal: "office".to_string(),
            constraints: Constraints {
                formality: Some(Formality::Business),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_plan_shape_and_filters() {
        let stylist = Stylist::new("Paris");
        let steps = stylist.plan_steps("office", &Constraints::default(), &context());
        let tools: Vec<ToolName> = steps.iter().map(|s| s.call.name()).collect();
        assert_eq!(
            tools,
            vec![
                ToolName::GetWeather,
                ToolName::SearchWardrobe,
                ToolName::GetLaundryStatus,
                ToolName::ScoreOutfit
            ]
        );
        assert!(matches!(&steps[0].call, ToolCall::GetWeather { city, .. } if city == "Paris"));
        match &steps[1].call {
            ToolCall::SearchWardrobe { filters, .. } => {
                assert_eq!(filters.formality, Some(Formality::Business));
                assert_eq!(filters.is_clean, Some(true));
                assert_eq!(filters.max_wear_count, Some(10));
            }
            other => panic!("unexpected call {other:?}"),
        }
        assert_eq!(steps[3].depends_on.len(), 3);
    }

    #[test]
    fn test_bindings_are_idempotent() {
        let found = ToolOutput::Wardrobe(WardrobeSearchResult {
            items: vec![summary("a", Category::Shirt), summary("b", Category::Pants)],
            total_count: 2,
            filters: WardrobeFilters::default(),
        });
        let mut call = ToolCall::GetLaundryStatus {
            user_id: "u1".to_string(),
            item_ids: vec![],
        };
        search_into_laundry(&found, &mut call).unwrap();
        let once = call.clone();
        search_into_laundry(&found, &mut call).unwrap();
        assert_eq!(call, once);
        assert!(matches!(call, ToolCall::GetLaundryStatus { ref item_ids, .. } if item_ids == &["a", "b"]));
    }

    #[test]
    fn test_binding_rejects_wrong_shape() {
        let mut call = ToolCall::ScoreOutfit {
            goal: String::new(),
            constraints: Constraints::default(),
            weather: None,
            items: None,
        };
        let err = weather_into_score(&ToolOutput::Ack, &mut call).unwrap_err();
        assert_eq!(err, "cannot project ack result into scoreOutfit parameters");
    }

    fn execution_with(items: Vec<ItemSummary>, score: Option<ToolOutput>) -> Execution {
        let search = Step {
            id: "s1".to_string(),
            call: ToolCall::SearchWardrobe {
                user_id: "u1".to_string(),
                filters: WardrobeFilters::default(),
                embedding_query: None,
            },
            expected_output: String::new(),
            dependencies: vec![],
            status: StepStatus::Completed,
            result: Some(ToolOutput::Wardrobe(WardrobeSearchResult {
                total_count: items.len(),
                items,
                filters: WardrobeFilters::default(),
            })),
            error: None,
        };
        let mut steps = vec![search];
        if let Some(output) = score {
            steps.push(Step {
                id: "s2".to_string(),
                call: ToolCall::ScoreOutfit {
                    goal: String::new(),
                    constraints: Constraints::default(),
                    weather: None,
                    items: None,
                },
                expected_output: String::new(),
                dependencies: vec!["s1".to_string()],
                status: StepStatus::Completed,
                result: Some(output),
                error: None,
            });
        }
        Execution {
            id: "exec".to_string(),
            plan_id: "plan".to_string(),
            steps,
            current_step: 0,
            status: ExecutionStatus::Completed,
            start_time: Utc::now(),
            end_time: None,
            logs: vec![],
        }
    }

    #[test]
    fn test_extract_combinations_rotate_extras() {
        let items = vec![
            summary("s1", Category::Shirt),
            summary("s2", Category::Shirt),
            summary("p1", Category::Pants),
            summary("p2", Category::Pants),
            summary("j1", Category::Jacket),
            summary("j2", Category::Jacket),
            summary("sh1", Category::Shoes),
        ];
        let suggestions = extract_outfit_suggestions(&execution_with(items, None));
        assert_eq!(suggestions.len(), 3);
        let ids = |i: usize| suggestions[i].items.iter().map(|x| x.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids(0), vec!["s1", "p1", "j1", "sh1"]);
        assert_eq!(ids(1), vec!["s1", "p2", "j2", "sh1"]);
        assert_eq!(ids(2), vec!["s2", "p1", "j1", "sh1"]);
        assert_eq!(suggestions[0].score, 0.7);
        assert_eq!(suggestions[0].rationale, "Generated outfit suggestion");
        assert_eq!(suggestions[0].confidence, 0.8);
        assert_eq!(suggestions[0].alternatives.len(), 3);
    }

    #[test]
    fn test_extract_uses_score_step() {
        let score = crate::tools::scoring::score_outfit(
            "office",
            &Constraints::default(),
            &WeatherData {
                temperature: 20.0,
                condition: "clear".to_string(),
                humidity: 50.0,
                wind_speed: 1.0,
                precipitation: 0.0,
                timestamp: Utc::now(),
            },
            &[],
        );
        let expected = score.score;
        let items = vec![summary("s1", Category::Shirt), summary("p1", Category::Pants)];
        let suggestions = extract_outfit_suggestions(&execution_with(items, Some(ToolOutput::OutfitScore(score))));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].score, expected);
        assert_eq!(suggestions[0].items.len(), 2);
    }

    #[test]
    fn test_no_shirts_means_no_suggestions() {
        let items = vec![summary("p1", Category::Pants)];
        assert!(extract_outfit_suggestions(&execution_with(items, None)).is_empty());
    }
}
