use crate::error::{AdvisorError, Result};
use crate::services::{recommendation::DEFAULT_TOP_K, seasonal::DEFAULT_SEASON_LENGTH};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

const CONFIG_FILE: &str = "advisor";
const ENV_PREFIX: &str = "APP";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ollama_base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub embedding_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub generation_temperature: f32,
    pub index_path: PathBuf,
    pub top_k: usize,
    pub training_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub weather_data_path: PathBuf,
    pub anchor_month: String,
    pub season_length: usize,
    pub export_path: PathBuf,
}

impl Config {
    /// Loads defaults, then `advisor.toml` if present, then `APP_*` variables.
    pub fn load() -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("ollama_base_url", "http://localhost:11434")?
            .set_default("embedding_model", "mxbai-embed-large")?
            .set_default("generation_model", "llama3.2")?
            .set_default("embedding_timeout_secs", 30_i64)?
            .set_default("generation_timeout_secs", 120_i64)?
            .set_default("generation_temperature", 0.0_f64)?
            .set_default("index_path", "vector_store")?
            .set_default("top_k", DEFAULT_TOP_K as i64)?
            .set_default("training_data_path", "Product_Dataset.csv")?
            .set_default("test_data_path", "test_package.csv")?
            .set_default("weather_data_path", "dubai_2024_monthly_weather.csv")?
            .set_default("anchor_month", "May")?
            .set_default("season_length", DEFAULT_SEASON_LENGTH as i64)?
            .set_default("export_path", "packaging_materials_list.json")?)
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(AdvisorError::Configuration(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.season_length == 0 {
            return Err(AdvisorError::Configuration(
                "season_length must be at least 1".to_string(),
            ));
        }
        if self.embedding_timeout_secs == 0 || self.generation_timeout_secs == 0 {
            return Err(AdvisorError::Configuration(
                "backend timeouts must be greater than zero".to_string(),
            ));
        }
        if self.ollama_base_url.trim().is_empty() {
            return Err(AdvisorError::Configuration(
                "ollama_base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}
