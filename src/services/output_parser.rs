//! Turns free-form model output into a packaging list.
//!
//! Stages run in order until one yields a non-empty JSON array: the whole
//! response, then embedded fenced blocks or bracketed spans, then
//! [`DEFAULT_PACKAGING_MATERIALS`]. Parsing never fails and never shrinks the
//! array it parsed.

use crate::models::PackagingListItem;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

pub const UNKNOWN_MATERIAL: &str = "Unknown Material";

/// Weather-resilient stock used when the model output cannot be read.
pub const DEFAULT_PACKAGING_MATERIALS: [&str; 6] = [
    "Waterproof Bubble Wrap",
    "Insulated Boxes",
    "Moisture Absorbent Packets",
    "Weather-resistant Tape",
    "Thermal Insulation Sheets",
    "Desiccant Packs",
];

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n?(.*?)```").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Direct,
    Embedded,
    Default,
}

#[derive(Debug, Clone)]
pub struct ParsedPackagingList {
    pub items: Vec<PackagingListItem>,
    pub stage: ParseStage,
}

pub fn default_packaging_list() -> Vec<PackagingListItem> {
    DEFAULT_PACKAGING_MATERIALS
        .iter()
        .map(|m| PackagingListItem::new(*m))
        .collect()
}

pub fn parse_packaging_list(raw: &str) -> Vec<PackagingListItem> {
    parse_with_stage(raw).items
}

pub fn parse_with_stage(raw: &str) -> ParsedPackagingList {
    if let Some(elements) = parse_array(raw) {
        debug!("Parsed packaging list directly ({} items)", elements.len());
        return ParsedPackagingList {
            items: repair(elements),
            stage: ParseStage::Direct,
        };
    }

    if let Some(elements) = embedded_candidates(raw).find_map(parse_array) {
        debug!(
            "Parsed packaging list from embedded block ({} items)",
            elements.len()
        );
        return ParsedPackagingList {
            items: repair(elements),
            stage: ParseStage::Embedded,
        };
    }

    warn!(
        "Could not parse packaging list from model output ({} bytes), using defaults",
        raw.len()
    );
    ParsedPackagingList {
        items: default_packaging_list(),
        stage: ParseStage::Default,
    }
}

/// Only a non-empty top-level array counts as a successful stage.
fn parse_array(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Array(elements)) if !elements.is_empty() => Some(elements),
        _ => None,
    }
}

fn embedded_candidates(raw: &str) -> impl Iterator<Item = &str> {
    let fenced = FENCED_BLOCK
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

    let bracketed = match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if start < end => Some(&raw[start..=end]),
        _ => None,
    };

    fenced.chain(bracketed)
}

/// Keeps one item per element. Anything without a usable material becomes
/// [`UNKNOWN_MATERIAL`].
fn repair(elements: Vec<Value>) -> Vec<PackagingListItem> {
    elements
        .into_iter()
        .map(|element| {
            let material = match &element {
                Value::Object(map) => map.get("material").and_then(Value::as_str),
                Value::String(s) => Some(s.as_str()),
                _ => None,
            }
            .map(str::trim)
            .filter(|m| !m.is_empty());

            match material {
                Some(m) => PackagingListItem::new(m),
                None => {
                    debug!("Replacing unusable list element {} with sentinel", element);
                    PackagingListItem::new(UNKNOWN_MATERIAL)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materials(items: &[PackagingListItem]) -> Vec<&str> {
        items.iter().map(|i| i.material.as_str()).collect()
    }

    #[test]
    fn test_direct_json_preserves_order_and_values() {
        let raw = r#"[{"material":"Foam"},{"material":"Foam"},{"material":"Insulated Boxes"}]"#;
        let parsed = parse_with_stage(raw);

        assert_eq!(parsed.stage, ParseStage::Direct);
        assert_eq!(
            materials(&parsed.items),
            vec!["Foam", "Foam", "Insulated Boxes"]
        );
    }

    #[test]
    fn test_fenced_block_in_prose() {
        let raw = "Here you go:\n```json\n[{\"material\":\"Foam\"}]\n```";
        let parsed = parse_with_stage(raw);

        assert_eq!(parsed.stage, ParseStage::Embedded);
        assert_eq!(parsed.items, vec![PackagingListItem::new("Foam")]);
    }

    #[test]
    fn test_unlabelled_fence_and_bare_brackets() {
        let fenced = "```\n[{\"material\":\"Cardboard\"}]\n```\nHope this helps";
        assert_eq!(materials(&parse_packaging_list(fenced)), vec!["Cardboard"]);

        let bracketed = "Sure! [{\"material\":\"Desiccant Packs\"}] Let me know.";
        let parsed = parse_with_stage(bracketed);
        assert_eq!(parsed.stage, ParseStage::Embedded);
        assert_eq!(materials(&parsed.items), vec!["Desiccant Packs"]);
    }

    #[test]
    fn test_unparseable_output_uses_defaults() {
        for raw in ["", "I cannot help with that.", "```json\n[{oops\n```", "{\"a\": 1}"] {
            let parsed = parse_with_stage(raw);
            assert_eq!(parsed.stage, ParseStage::Default);
            assert_eq!(parsed.items.len(), DEFAULT_PACKAGING_MATERIALS.len());
            assert_eq!(parsed.items, default_packaging_list());
        }
    }

    #[test]
    fn test_empty_array_falls_back_to_defaults() {
        let parsed = parse_with_stage("[]");
        assert_eq!(parsed.stage, ParseStage::Default);
        assert_eq!(parsed.items.len(), 6);
    }

    #[test]
    fn test_missing_material_is_repaired_not_dropped() {
        let raw = r#"[{"material":"Foam"},{"name":"Tape"},{"material":""},42,"Shrink Wrap"]"#;
        let items = parse_packaging_list(raw);

        assert_eq!(items.len(), 5);
        assert_eq!(
            materials(&items),
            vec![
                "Foam",
                UNKNOWN_MATERIAL,
                UNKNOWN_MATERIAL,
                UNKNOWN_MATERIAL,
                "Shrink Wrap"
            ]
        );
        assert!(items.iter().all(|i| !i.material.is_empty()));
    }
}
