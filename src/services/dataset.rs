//! CSV ingestion. Rows are validated here so the pipeline only ever sees complete records.

use crate::error::{AdvisorError, Result};
use crate::models::{parse_fragile, MonthlyWeather, PackagingRecord, ProductProfile, ProductQuery};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};
use tracing::info;

#[derive(Debug, Deserialize)]
struct ProductCsvRecord {
    #[serde(alias = "Product_ID", default)]
    product_id: Option<String>,
    #[serde(alias = "Product_Type")]
    product_type: Option<String>,
    #[serde(alias = "Weight_kg")]
    weight_kg: Option<String>,
    #[serde(alias = "Fragile")]
    fragile: Option<String>,
    #[serde(alias = "Temp_Condition")]
    temp_condition: Option<String>,
    #[serde(alias = "Humidity_Level")]
    humidity_level: Option<String>,
    #[serde(alias = "Packaging_Material", default)]
    packaging_material: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeatherCsvRecord {
    #[serde(alias = "Month")]
    month: Option<String>,
    #[serde(alias = "Weather")]
    weather: Option<String>,
}

fn required(value: Option<String>, field: &str, row: usize) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AdvisorError::InvalidInput(format!("row {}: missing {}", row, field)))
}

fn validate_profile(record: &mut ProductCsvRecord, row: usize) -> Result<ProductProfile> {
    let weight_raw = required(record.weight_kg.take(), "Weight_kg", row)?;
    let weight_kg: f64 = weight_raw.parse().map_err(|_| {
        AdvisorError::InvalidInput(format!("row {}: invalid weight '{}'", row, weight_raw))
    })?;

    let fragile_raw = required(record.fragile.take(), "Fragile", row)?;
    let fragile = parse_fragile(&fragile_raw).ok_or_else(|| {
        AdvisorError::InvalidInput(format!(
            "row {}: invalid fragile value '{}'",
            row, fragile_raw
        ))
    })?;

    let profile = ProductProfile {
        product_type: required(record.product_type.take(), "Product_Type", row)?,
        weight_kg,
        fragile,
        temp_condition: required(record.temp_condition.take(), "Temp_Condition", row)?,
        humidity_level: required(record.humidity_level.take(), "Humidity_Level", row)?,
    };
    profile
        .validate()
        .map_err(|e| AdvisorError::InvalidInput(format!("row {}: {}", row, e)))?;
    Ok(profile)
}

fn product_id(record: &mut ProductCsvRecord) -> Option<String> {
    record
        .product_id
        .take()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Training rows: all six fields required.
pub fn read_training_records<R: Read>(reader: R) -> Result<Vec<PackagingRecord>> {
    let mut csv = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (i, row) in csv.deserialize::<ProductCsvRecord>().enumerate() {
        let row_number = i + 1;
        let mut raw = row?;
        let profile = validate_profile(&mut raw, row_number)?;
        let packaging_material =
            required(raw.packaging_material.take(), "Packaging_Material", row_number)?;
        records.push(PackagingRecord {
            product_id: product_id(&mut raw),
            profile,
            packaging_material,
        });
    }

    Ok(records)
}

/// Query rows: the material column is ignored if present.
pub fn read_product_queries<R: Read>(reader: R) -> Result<Vec<ProductQuery>> {
    let mut csv = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut queries = Vec::new();

    for (i, row) in csv.deserialize::<ProductCsvRecord>().enumerate() {
        let mut raw = row?;
        let profile = validate_profile(&mut raw, i + 1)?;
        queries.push(ProductQuery {
            product_id: product_id(&mut raw),
            profile,
        });
    }

    Ok(queries)
}

pub fn read_monthly_weather<R: Read>(reader: R) -> Result<Vec<MonthlyWeather>> {
    let mut csv = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries = Vec::new();

    for (i, row) in csv.deserialize::<WeatherCsvRecord>().enumerate() {
        let raw = row?;
        entries.push(MonthlyWeather {
            month: required(raw.month, "month", i + 1)?,
            weather: required(raw.weather, "weather", i + 1)?,
        });
    }

    Ok(entries)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        AdvisorError::InvalidInput(format!("cannot open {}: {}", path.display(), e))
    })
}

pub fn load_training_records(path: impl AsRef<Path>) -> Result<Vec<PackagingRecord>> {
    let path = path.as_ref();
    let records = read_training_records(open(path)?)?;
    info!("Loaded {} training records from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_product_queries(path: impl AsRef<Path>) -> Result<Vec<ProductQuery>> {
    read_product_queries(open(path.as_ref())?)
}

pub fn load_monthly_weather(path: impl AsRef<Path>) -> Result<Vec<MonthlyWeather>> {
    let path = path.as_ref();
    let entries = read_monthly_weather(open(path)?)?;
    info!("Loaded {} weather entries from {}", entries.len(), path.display());
    Ok(entries)
}
