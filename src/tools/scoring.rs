//! scoreOutfit：按天气、正式度、配色、季节、穿着频率五个维度给搭配打分

use async_trait::async_trait;

use crate::agents::Constraints;
use crate::store::{Category, Formality};
use crate::tools::{ItemSummary, OutfitScore, ScoreBreakdown, Tool, ToolCall, ToolName, ToolOutput, WeatherData};

const NEUTRAL_COLORS: [&str; 6] = ["black", "white", "gray", "brown", "beige", "navy"];

/// 从目标描述中的关键词推断正式度
const GOAL_KEYWORDS: [(Formality, &[&str]); 6] = [
    (Formality::Formal, &["formal", "dress", "suit"]),
    (Formality::Business, &["business", "office", "work"]),
    (Formality::Casual, &["casual", "relaxed", "comfortable"]),
    (Formality::Sport, &["sport", "gym", "workout"]),
    (Formality::Party, &["party", "night", "celebration"]),
    (Formality::Outdoor, &["outdoor", "hiking", "camping"]),
];

#[derive(Default)]
pub struct ScoreOutfitTool;

impl ScoreOutfitTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ScoreOutfitTool {
    fn name(&self) -> ToolName {
        ToolName::ScoreOutfit
    }

    fn description(&self) -> &str {
        "Score an outfit against the goal, the weather and the wear history"
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolOutput, String> {
        match call {
            ToolCall::ScoreOutfit {
                goal,
                constraints,
                weather,
                items,
            } => {
                let weather = weather.ok_or_else(|| "Outfit scoring failed: weather data is required".to_string())?;
                let items = items.unwrap_or_default();
                Ok(ToolOutput::OutfitScore(score_outfit(&goal, &constraints, &weather, &items)))
            }
            other => Err(other.mismatch(ToolName::ScoreOutfit)),
        }
    }
}

pub fn score_outfit(goal: &str, constraints: &Constraints, weather: &WeatherData, items: &[ItemSummary]) -> OutfitScore {
    let breakdown = ScoreBreakdown {
        weather: score_weather(items, weather),
        formality: score_formality(items, goal, constraints),
        color_harmony: score_color_harmony(items),
        seasonality: score_seasonality(items, weather),
        wear_frequency: score_wear_frequency(items),
    };
    let entries = breakdown.entries();
    let overall = entries.iter().map(|(_, s)| s).sum::<f64>() / entries.len() as f64;

    OutfitScore {
        score: (overall * 100.0).round() / 100.0,
        rationale: rationale(&breakdown, overall, goal, weather),
        suggestions: suggestions(&breakdown),
        breakdown,
    }
}

fn score_weather(items: &[ItemSummary], weather: &WeatherData) -> f64 {
    let temp = weather.temperature;
    let mut score = 0.5;
    for item in items {
        if item.category == Category::Jacket && temp < 15.0 {
            score += 0.1;
        }
        if item.category == Category::Shirt && temp > 20.0 {
            score += 0.1;
        }
        if item.fabric == "wool" && temp < 10.0 {
            score += 0.1;
        }
        if item.fabric == "cotton" && temp > 25.0 {
            score += 0.1;
        }
    }
    if weather.precipitation > 0.0
        && items
            .iter()
            .any(|item| item.fabric == "leather" || item.category == Category::Jacket)
    {
        score += 0.2;
    }
    f64::clamp(score, 0.0, 1.0)
}

fn formality_from_goal(goal: &str) -> Option<Formality> {
    let goal = goal.to_lowercase();
    GOAL_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| goal.contains(w)))
        .map(|(formality, _)| *formality)
}

fn score_formality(items: &[ItemSummary], goal: &str, constraints: &Constraints) -> f64 {
    if items.is_empty() {
        return 0.5;
    }
    let target = formality_from_goal(goal)
        .or(constraints.formality)
        .unwrap_or(Formality::Casual)
        .level();
    let avg = items.iter().map(|i| i.formality.level()).sum::<f64>() / items.len() as f64;
    (1.0 - (target - avg).abs() * 2.0).max(0.0)
}

fn score_color_harmony(items: &[ItemSummary]) -> f64 {
    if items.len() < 2 {
        return 0.5;
    }
    let colors: Vec<&str> = items.iter().flat_map(|i| i.colors.iter().map(String::as_str)).collect();
    let neutral = colors.iter().filter(|c| NEUTRAL_COLORS.contains(*c)).count();
    let bright = colors.len() - neutral;
    if neutral > 0 && bright <= 2 {
        0.8
    } else {
        0.4
    }
}

fn season_from_temperature(temp: f64) -> &'static str {
    if temp < 5.0 {
        "winter"
    } else if temp < 15.0 {
        "fall"
    } else if temp < 25.0 {
        "spring"
    } else {
        "summer"
    }
}

fn score_seasonality(items: &[ItemSummary], weather: &WeatherData) -> f64 {
    let season = season_from_temperature(weather.temperature);
    let matching = items
        .iter()
        .filter(|item| item.seasons.iter().any(|s| s.eq_ignore_ascii_case(season)))
        .count();
    (0.5 + 0.1 * matching as f64).min(1.0)
}

fn score_wear_frequency(items: &[ItemSummary]) -> f64 {
    if items.is_empty() {
        return 0.5;
    }
    let avg = items.iter().map(|i| i.wear_count as f64).sum::<f64>() / items.len() as f64;
    if avg < 3.0 {
        0.8
    } else if avg < 7.0 {
        0.6
    } else {
        0.3
    }
}

fn suggestions(breakdown: &ScoreBreakdown) -> Vec<String> {
    let mut out = Vec::new();
    if breakdown.weather < 0.6 {
        out.push("Consider adding a jacket or adjusting layers for the weather".to_string());
    }
    if breakdown.formality < 0.6 {
        out.push("Try adding more formal pieces or adjusting the formality level".to_string());
    }
    if breakdown.color_harmony < 0.6 {
        out.push("Consider adding neutral colors to balance the outfit".to_string());
    }
    if breakdown.wear_frequency < 0.5 {
        out.push("Try incorporating some less-worn items to refresh your look".to_string());
    }
    out
}

fn rationale(breakdown: &ScoreBreakdown, overall: f64, goal: &str, weather: &WeatherData) -> String {
    let entries = breakdown.entries();
    let strengths: Vec<&str> = entries.iter().filter(|(_, s)| *s > 0.7).map(|(k, _)| *k).collect();
    let weaknesses: Vec<&str> = entries.iter().filter(|(_, s)| *s < 0.5).map(|(k, _)| *k).collect();

    let mut text = format!("This outfit scores {}% for your {} goal. ", (overall * 100.0).round(), goal);
    if !strengths.is_empty() {
        text.push_str(&format!("Strengths include {}. ", strengths.join(", ")));
    }
    if !weaknesses.is_empty() {
        text.push_str(&format!("Areas for improvement: {}. ", weaknesses.join(", ")));
    }
    text.push_str(&format!(
        "Weather conditions: {}°C, {}.",
        weather.temperature, weather.condition
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn weather(temperature: f64, precipitation: f64) -> WeatherData {
        WeatherData {
            temperature,
            condition: "rain".to_string(),
            humidity: 60.0,
            wind_speed: 3.0,
            precipitation,
            timestamp: Utc::now(),
        }
    }

    fn item(category: Category, colors: &[&str], fabric: &str, wear_count: u32) -> ItemSummary {
        ItemSummary {
            id: format!("{category}-{wear_count}"),
            title: category.to_string(),
            category,
            colors: colors.iter().map(|c| c.to_string()).collect(),
            fabric: fabric.to_string(),
            seasons: vec!["Fall".to_string()],
            formality: Formality::Business,
            image_url: String::new(),
            is_clean: true,
            wear_count,
        }
    }

    #[test]
    fn test_goal_keywords_take_precedence() {
        assert_eq!(formality_from_goal("Office meeting"), Some(Formality::Business));
        assert_eq!(formality_from_goal("Weekend HIKING trip"), Some(Formality::Outdoor));
        assert_eq!(formality_from_goal("something"), None);
    }

    #[test]
    fn test_cold_rainy_day_with_jacket() {
        let items = vec![
            item(Category::Jacket, &["black"], "wool", 1),
            item(Category::Pants, &["navy"], "denim", 1),
        ];
        let score = score_outfit("work", &Constraints::default(), &weather(8.0, 2.0), &items);
        // jacket < 15°C, wool < 10°C, 雨天有外套
        assert!((score.breakdown.weather - 0.9).abs() < 1e-9);
        assert_eq!(score.breakdown.formality, 1.0);
        assert_eq!(score.breakdown.color_harmony, 0.8);
        assert!((score.breakdown.seasonality - 0.7).abs() < 1e-9);
        assert_eq!(score.breakdown.wear_frequency, 0.8);
        assert_eq!(score.score, 0.84);
        assert!(score.suggestions.is_empty());
        assert!(score.rationale.starts_with("This outfit scores 84% for your work goal."));
        assert!(score.rationale.ends_with("Weather conditions: 8°C, rain."));
    }

    #[test]
    fn test_weak_dimensions_produce_suggestions() {
        let items = vec![item(Category::Shirt, &["red", "green", "pink"], "silk", 9)];
        let constraints = Constraints {
            formality: Some(Formality::Formal),
            ..Default::default()
        };
        let score = score_outfit("anything", &constraints, &weather(18.0, 0.0), &items);
        assert_eq!(score.breakdown.color_harmony, 0.5);
        assert_eq!(score.breakdown.wear_frequency, 0.3);
        assert!(score
            .suggestions
            .contains(&"Try incorporating some less-worn items to refresh your look".to_string()));
        assert!(score.rationale.contains("Areas for improvement: formality, wearFrequency."));
    }

    #[tokio::test]
    async fn test_missing_weather_fails() {
        let err = ScoreOutfitTool::new()
            .execute(ToolCall::ScoreOutfit {
                goal: "x".to_string(),
                constraints: Constraints::default(),
                weather: None,
                items: None,
            })
            .await
            .unwrap_err();
        assert!(err.contains("weather data is required"));
    }
}
