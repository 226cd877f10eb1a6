//! Fixed-order text renderings of records, used both for the index corpus and for live queries.

use crate::models::{MonthlyWeather, PackagingRecord, ProductProfile};
use crate::services::embedding_index::CorpusDocument;

pub const PRODUCT_QUESTION: &str =
    "What is the most appropriate packaging material for this product?";

pub const MATERIAL_LABEL: &str = "Packaging Material";

/// Renders the product fields, and the material when rendering a training row.
pub fn render(profile: &ProductProfile, material: Option<&str>) -> String {
    let mut lines = vec![
        format!("Product Type: {}", profile.product_type.trim()),
        format!("Weight: {:?} kg", profile.weight_kg),
        format!("Fragile: {}", if profile.fragile { "Yes" } else { "No" }),
        format!("Temperature Condition: {}", profile.temp_condition.trim()),
        format!("Humidity Level: {}", profile.humidity_level.trim()),
    ];
    if let Some(material) = material {
        lines.push(format!("{}: {}", MATERIAL_LABEL, material.trim()));
    }
    lines.join("\n")
}

pub fn render_record(record: &PackagingRecord) -> String {
    render(&record.profile, Some(&record.packaging_material))
}

/// The query context line followed by the fixed question.
pub fn render_question(profile: &ProductProfile) -> String {
    format!("{}\n\n{}", render(profile, None), PRODUCT_QUESTION)
}

/// One snippet per record; ids come from the product id or the row position.
pub fn corpus_documents(records: &[PackagingRecord]) -> Vec<CorpusDocument> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| CorpusDocument {
            id: record
                .product_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("record-{}", row)),
            text: render_record(record),
        })
        .collect()
}

pub fn render_weather(entry: &MonthlyWeather) -> String {
    format!("{}: {}", entry.month.trim(), entry.weather.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{electronics_query, electronics_record, food_record};

    #[test]
    fn test_render_is_deterministic() {
        let record = electronics_record();
        let first = render_record(&record);
        let second = render_record(&record);

        assert_eq!(first, second);
        assert_eq!(
            first,
            "Product Type: Electronics\nWeight: 1.2 kg\nFragile: Yes\n\
             Temperature Condition: Cold\nHumidity Level: Low\n\
             Packaging Material: Bubble Wrap"
        );
    }

    #[test]
    fn test_query_rendering_omits_material() {
        let rendered = render(&electronics_query(), None);

        assert!(!rendered.contains(MATERIAL_LABEL));
        assert!(rendered.starts_with("Product Type: Electronics"));
        assert!(rendered.ends_with("Humidity Level: Low"));
    }

    #[test]
    fn test_whole_weights_keep_decimal_point() {
        let rendered = render(&electronics_query(), None);
        assert!(rendered.contains("Weight: 1.0 kg"));
    }

    #[test]
    fn test_question_follows_fields() {
        let question = render_question(&electronics_query());
        assert!(question.ends_with(PRODUCT_QUESTION));
        assert!(question.contains("Fragile: Yes"));
    }

    #[test]
    fn test_corpus_ids_fall_back_to_row() {
        let mut unnamed = food_record();
        unnamed.product_id = None;
        let documents = corpus_documents(&[electronics_record(), unnamed]);

        assert_eq!(documents[0].id, "P001");
        assert_eq!(documents[1].id, "record-1");
        assert!(documents[1].text.contains("Vacuum Seal"));
    }

    #[test]
    fn test_render_weather_pair() {
        let entry = MonthlyWeather::new("May", " Hot and dry ");
        assert_eq!(render_weather(&entry), "May: Hot and dry");
    }
}
