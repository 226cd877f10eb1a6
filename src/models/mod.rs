use serde::{Deserialize, Serialize};

pub use packaging::{
    MonthlyWeather, PackagingListItem, RecommendationResult, SeasonalPlan, SourceSnippet,
};
pub use record::{parse_fragile, PackagingRecord, ProductProfile, ProductQuery};

mod packaging;
mod record;

/// Payload printed after a seasonal run, mirroring the packaging-list API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPlanResponse {
    /// Always "success"; failures are reported as an error payload instead
    pub status: String,
    pub message: String,
    pub weather_data: Vec<MonthlyWeather>,
    pub packaging_list: Vec<PackagingListItem>,
}

impl SeasonalPlanResponse {
    pub fn success(plan: SeasonalPlan, message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            weather_data: plan.months,
            packaging_list: plan.packaging_list,
        }
    }
}

/// Output of the `test-package` command: the product echoed back with its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPackageResponse {
    pub product: ProductQuery,
    pub result: RecommendationResult,
}
