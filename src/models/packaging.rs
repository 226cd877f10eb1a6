use serde::{Deserialize, Serialize};

/// A retrieved neighbor handed back alongside a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub id: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommended_material: String,
    /// Full narrative returned by the generation backend.
    pub explanation: String,
    pub source_snippets: Vec<SourceSnippet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingListItem {
    pub material: String,
}

impl PackagingListItem {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
        }
    }
}

/// One row of the monthly weather table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyWeather {
    pub month: String,
    pub weather: String,
}

impl MonthlyWeather {
    pub fn new(month: impl Into<String>, weather: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            weather: weather.into(),
        }
    }
}

/// Seasonal output: the months considered and the materials to stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPlan {
    pub months: Vec<MonthlyWeather>,
    pub packaging_list: Vec<PackagingListItem>,
}

impl SeasonalPlan {
    pub fn month_names(&self) -> Vec<&str> {
        self.months.iter().map(|m| m.month.as_str()).collect()
    }
}
