use crate::{
    config::Config,
    error::Result,
    ml::{CompletionBackend, Embedder, OllamaEmbedder, OllamaGenerator},
    models::{
        parse_fragile, MonthlyWeather, ProductProfile, ProductQuery, SeasonalPlanResponse,
        TestPackageResponse,
    },
    services::{
        context_builder::corpus_documents,
        dataset::{load_monthly_weather, load_product_queries, load_training_records},
        EmbeddingIndex, JsonFileExporter, PackagingAdvisor, RecommendationService,
        SeasonalPlanner,
    },
    AdvisorError,
};
use clap::{Args, Subcommand};
use log::info;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recommend a packaging material for one product
    Recommend(ProductArgs),
    /// Recommend for the first product in the test dataset
    TestPackage,
    /// Generate the seasonal packaging list and export it
    Seasonal {
        /// First month of the window (defaults to the configured anchor)
        #[arg(long)]
        anchor: Option<String>,
        /// Skip writing the export file
        #[arg(long, default_value_t = false)]
        no_export: bool,
    },
    /// Rebuild the stored index from the training dataset
    RebuildIndex,
}

#[derive(Args, Debug)]
pub struct ProductArgs {
    #[arg(long)]
    pub product_type: String,
    /// Weight in kilograms
    #[arg(long)]
    pub weight: f64,
    /// Yes/No, true/false or 1/0
    #[arg(long, value_parser = parse_fragile_arg, action = clap::ArgAction::Set)]
    pub fragile: bool,
    #[arg(long)]
    pub temp_condition: String,
    #[arg(long)]
    pub humidity_level: String,
}

impl ProductArgs {
    pub fn profile(&self) -> ProductProfile {
        ProductProfile::new(
            &self.product_type,
            self.weight,
            self.fragile,
            &self.temp_condition,
            &self.humidity_level,
        )
    }
}

fn parse_fragile_arg(value: &str) -> std::result::Result<bool, String> {
    parse_fragile(value).ok_or_else(|| format!("expected yes/no, got '{}'", value))
}

pub struct Application {
    config: Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn CompletionBackend>,
}

impl Application {
    /// Wires the Ollama adapters named in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let embedder = Arc::new(OllamaEmbedder::new(
            &config.ollama_base_url,
            &config.embedding_model,
            config.embedding_timeout(),
        )?);
        let generator = Arc::new(OllamaGenerator::new(
            &config.ollama_base_url,
            &config.generation_model,
            config.generation_temperature,
            config.generation_timeout(),
        )?);
        Ok(Self::with_backends(config, embedder, generator))
    }

    pub fn with_backends(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            config: config.clone(),
            embedder,
            generator,
        }
    }

    pub async fn run(&self, command: Command) -> Result<Value> {
        match command {
            Command::Recommend(args) => {
                let advisor = self.build_advisor().await?;
                let result = advisor.recommend_for_product(&args.profile()).await?;
                Ok(serde_json::to_value(result)?)
            }
            Command::TestPackage => {
                let product = self.test_product()?;
                let advisor = self.build_advisor().await?;
                let result = advisor.recommend_for_product(&product.profile).await?;
                Ok(serde_json::to_value(TestPackageResponse { product, result })?)
            }
            Command::Seasonal { anchor, no_export } => {
                let weather = self.weather()?;
                let advisor = self.seasonal_advisor();
                let plan = match anchor {
                    Some(anchor) => advisor.generate_seasonal_list_from(&weather, &anchor).await?,
                    None => advisor.generate_seasonal_list(&weather).await?,
                };

                let message = if no_export {
                    "Packaging list generated".to_string()
                } else {
                    advisor.dispatch_packaging_list(&plan).await?;
                    format!(
                        "Packaging list generated and exported to {}",
                        self.config.export_path.display()
                    )
                };
                Ok(serde_json::to_value(SeasonalPlanResponse::success(plan, message))?)
            }
            Command::RebuildIndex => {
                let index = self.rebuild_index().await?;
                Ok(json!({
                    "status": "success",
                    "location": index.location().display().to_string(),
                    "build_id": index.manifest().build_id,
                    "entries": index.len(),
                    "dimensions": index.manifest().dimensions,
                }))
            }
        }
    }

    /// Generator, planner and exporter only. No index is loaded.
    pub fn seasonal_advisor(&self) -> PackagingAdvisor {
        let seasonal = SeasonalPlanner::new(
            self.generator.clone(),
            self.config.anchor_month.clone(),
            self.config.season_length,
            self.config.generation_timeout(),
        );
        let notifier = Arc::new(JsonFileExporter::new(self.config.export_path.clone()));
        PackagingAdvisor::new(seasonal, notifier)
    }

    /// Loads or builds the index, then attaches recommendations to the seasonal wiring.
    pub async fn build_advisor(&self) -> Result<PackagingAdvisor> {
        let training_path = self.config.training_data_path.clone();

        info!(
            "Initializing recommendation service (index: {})",
            self.config.index_path.display()
        );
        let recommendations = RecommendationService::initialize(
            &self.config.index_path,
            self.embedder.clone(),
            self.generator.clone(),
            move || load_training_records(&training_path).map(|records| corpus_documents(&records)),
            self.config.top_k,
            self.config.generation_timeout(),
        )
        .await?;

        Ok(self.seasonal_advisor().with_recommendations(recommendations))
    }

    pub async fn rebuild_index(&self) -> Result<EmbeddingIndex> {
        let records = load_training_records(&self.config.training_data_path)?;
        info!("Rebuilding index from {} records", records.len());
        EmbeddingIndex::build(
            &self.config.index_path,
            self.embedder.clone(),
            corpus_documents(&records),
        )
        .await
    }

    pub fn weather(&self) -> Result<Vec<MonthlyWeather>> {
        load_monthly_weather(&self.config.weather_data_path)
    }

    pub fn test_product(&self) -> Result<ProductQuery> {
        load_product_queries(&self.config.test_data_path)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AdvisorError::InvalidInput(format!(
                    "{} contains no products",
                    self.config.test_data_path.display()
                ))
            })
    }
}
