use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Deserializer, Serialize};

fn deserialize_fragile<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrBool {
        Bool(bool),
        String(String),
    }

    match StringOrBool::deserialize(deserializer)? {
        StringOrBool::Bool(b) => Ok(b),
        StringOrBool::String(s) => parse_fragile(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognised fragile value '{}'", s))
        }),
    }
}

/// Accepts the spellings found in spreadsheets exported by hand.
pub fn parse_fragile(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// The five product attributes shared by training rows and live queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfile {
    pub product_type: String,
    #[serde(alias = "weight")]
    pub weight_kg: f64,
    #[serde(deserialize_with = "deserialize_fragile")]
    pub fragile: bool,
    pub temp_condition: String,
    pub humidity_level: String,
}

impl ProductProfile {
    pub fn new(
        product_type: impl Into<String>,
        weight_kg: f64,
        fragile: bool,
        temp_condition: impl Into<String>,
        humidity_level: impl Into<String>,
    ) -> Self {
        Self {
            product_type: product_type.into(),
            weight_kg,
            fragile,
            temp_condition: temp_condition.into(),
            humidity_level: humidity_level.into(),
        }
    }

    /// Rejects blank categorical fields and negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("product type", &self.product_type),
            ("temperature condition", &self.temp_condition),
            ("humidity level", &self.humidity_level),
        ] {
            if value.trim().is_empty() {
                return Err(AdvisorError::InvalidInput(format!("{} is required", name)));
            }
        }

        if !self.weight_kg.is_finite() || self.weight_kg < 0.0 {
            return Err(AdvisorError::InvalidInput(format!(
                "weight must be a non-negative number of kilograms, got {}",
                self.weight_kg
            )));
        }

        Ok(())
    }
}

/// A historical packaging example with its ground-truth material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(flatten)]
    pub profile: ProductProfile,
    pub packaging_material: String,
}

impl PackagingRecord {
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        if self.packaging_material.trim().is_empty() {
            return Err(AdvisorError::InvalidInput(
                "packaging material is required for training records".to_string(),
            ));
        }
        Ok(())
    }
}

/// A product awaiting a recommendation; carries no material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(flatten)]
    pub profile: ProductProfile,
}
