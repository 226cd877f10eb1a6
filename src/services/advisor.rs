use crate::error::{AdvisorError, ErrorResponse, Result};
use crate::models::{MonthlyWeather, ProductProfile, RecommendationResult, SeasonalPlan};
use crate::services::notifier::PackagingListNotifier;
use crate::services::recommendation::RecommendationService;
use crate::services::seasonal::SeasonalPlanner;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Entry points for both use cases. Errors pass through untouched; callers
/// shape them with [`outcome_payload`].
///
/// The seasonal path never touches the embedding index, so an advisor can be
/// built without one and given a [`RecommendationService`] only when product
/// recommendations are needed.
#[derive(Clone)]
pub struct PackagingAdvisor {
    recommendations: Option<RecommendationService>,
    seasonal: SeasonalPlanner,
    notifier: Arc<dyn PackagingListNotifier>,
}

impl PackagingAdvisor {
    pub fn new(seasonal: SeasonalPlanner, notifier: Arc<dyn PackagingListNotifier>) -> Self {
        Self {
            recommendations: None,
            seasonal,
            notifier,
        }
    }

    pub fn with_recommendations(mut self, recommendations: RecommendationService) -> Self {
        self.recommendations = Some(recommendations);
        self
    }

    pub async fn recommend_for_product(
        &self,
        profile: &ProductProfile,
    ) -> Result<RecommendationResult> {
        let recommendations = self.recommendations.as_ref().ok_or_else(|| {
            AdvisorError::Configuration(
                "product recommendations need an initialized index".to_string(),
            )
        })?;
        recommendations.recommend(profile).await
    }

    /// Uses the configured anchor month.
    pub async fn generate_seasonal_list(&self, weather: &[MonthlyWeather]) -> Result<SeasonalPlan> {
        self.seasonal.plan(weather).await
    }

    pub async fn generate_seasonal_list_from(
        &self,
        weather: &[MonthlyWeather],
        anchor: &str,
    ) -> Result<SeasonalPlan> {
        self.seasonal.plan_from(weather, anchor).await
    }

    pub async fn dispatch_packaging_list(&self, plan: &SeasonalPlan) -> Result<()> {
        self.notifier.dispatch(&plan.packaging_list).await?;
        info!(
            "Dispatched {} materials for {:?}",
            plan.packaging_list.len(),
            plan.month_names()
        );
        Ok(())
    }
}

/// Success value as JSON, or an [`ErrorResponse`] holding only the message.
pub fn outcome_payload<T: Serialize>(outcome: &Result<T>) -> Value {
    let response = match outcome {
        Ok(value) => serde_json::to_value(value),
        Err(e) => {
            error!("Request failed: {}", e);
            serde_json::to_value(ErrorResponse::from(e))
        }
    };
    response.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}
