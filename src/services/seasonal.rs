use crate::error::{AdvisorError, Result};
use crate::ml::{complete_with_timeout, CompletionBackend};
use crate::models::{MonthlyWeather, SeasonalPlan};
use crate::services::context_builder::render_weather;
use crate::services::output_parser::parse_with_stage;
use std::{sync::Arc, time::Duration};
use tracing::info;

pub const DEFAULT_SEASON_LENGTH: usize = 4;

/// `length` consecutive entries starting at `anchor`, wrapping past the end of the table.
pub fn seasonal_window(
    entries: &[MonthlyWeather],
    anchor: &str,
    length: usize,
) -> Result<Vec<MonthlyWeather>> {
    if entries.is_empty() {
        return Err(AdvisorError::InvalidInput(
            "weather table is empty".to_string(),
        ));
    }

    let start = entries
        .iter()
        .position(|e| e.month.trim().eq_ignore_ascii_case(anchor.trim()))
        .ok_or_else(|| {
            AdvisorError::InvalidInput(format!("month '{}' not found in weather table", anchor))
        })?;

    Ok((0..length)
        .map(|offset| entries[(start + offset) % entries.len()].clone())
        .collect())
}

pub fn build_seasonal_prompt(months: &[MonthlyWeather]) -> String {
    let names = months
        .iter()
        .map(|m| m.month.trim())
        .collect::<Vec<_>>()
        .join(", ");
    let conditions = months
        .iter()
        .map(render_weather)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Based on the weather conditions for the next {count} months: {names},
and their weather conditions: {conditions},

List the packaging materials required for inventory, considering:
1. Weather protection needs (rain, heat, humidity)
2. Common product types in our inventory
3. Seasonal variations in packaging requirements

Return a JSON array of material names only. Example format:
[
    {{"material": "Waterproof Bubble Wrap"}},
    {{"material": "Insulated Boxes"}},
    {{"material": "Moisture Absorbent Packets"}}
]

Important:
- Each item MUST have only the "material" field
- The "material" field must be a descriptive string
- Return ONLY the JSON array, no other text"#,
        count = months.len(),
    )
}

/// Seasonal stock list: one combined prompt, no retrieval.
#[derive(Clone)]
pub struct SeasonalPlanner {
    generator: Arc<dyn CompletionBackend>,
    anchor_month: String,
    season_length: usize,
    generation_timeout: Duration,
}

impl SeasonalPlanner {
    pub fn new(
        generator: Arc<dyn CompletionBackend>,
        anchor_month: impl Into<String>,
        season_length: usize,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            anchor_month: anchor_month.into(),
            season_length: season_length.max(1),
            generation_timeout,
        }
    }

    pub async fn plan(&self, weather: &[MonthlyWeather]) -> Result<SeasonalPlan> {
        self.plan_from(weather, &self.anchor_month).await
    }

    pub async fn plan_from(&self, weather: &[MonthlyWeather], anchor: &str) -> Result<SeasonalPlan> {
        let months = seasonal_window(weather, anchor, self.season_length)?;
        let prompt = build_seasonal_prompt(&months);

        let raw = complete_with_timeout(self.generator.as_ref(), &prompt, self.generation_timeout)
            .await?;
        let parsed = parse_with_stage(&raw);

        info!(
            "Seasonal list for {:?}: {} materials (parse stage {:?})",
            months.iter().map(|m| m.month.as_str()).collect::<Vec<_>>(),
            parsed.items.len(),
            parsed.stage
        );

        Ok(SeasonalPlan {
            months,
            packaging_list: parsed.items,
        })
    }
}
