//! Permissive parser for delimiter-separated extraction output.
//!
//! Records look like `("entity"|name|type|description)` joined by the record
//! delimiter. Anything that does not fit a known shape is dropped so that one
//! malformed record never hides its well-formed siblings.

use crate::models::{ExtractedEntity, ExtractedRelation, Extraction, QueryEntity};

/// Splits raw output into records, each already split into trimmed fields.
fn records<'a>(
    raw: &'a str,
    tuple_delimiter: &'a str,
    record_delimiter: &'a str,
) -> impl Iterator<Item = Vec<&'a str>> + 'a {
    let pieces: Box<dyn Iterator<Item = &'a str>> = if record_delimiter.is_empty() {
        Box::new(std::iter::once(raw))
    } else {
        Box::new(raw.split(record_delimiter))
    };

    pieces.filter_map(move |record| {
        let record = record.trim().trim_matches(',');
        if record.is_empty() || tuple_delimiter.is_empty() {
            return None;
        }
        let record = record.trim_matches(|c| matches!(c, '(' | ')' | ' '));
        Some(
            record
                .split(tuple_delimiter)
                .map(|part| part.trim().trim_matches('"'))
                .collect(),
        )
    })
}

/// Parses chunk extraction output into entities and relations.
pub fn parse_extraction(raw: &str, tuple_delimiter: &str, record_delimiter: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for parts in records(raw, tuple_delimiter, record_delimiter) {
        match parts.as_slice() {
            ["entity", name, entity_type, description, ..] => extraction
                .entities
                .push(ExtractedEntity::new(*name, *entity_type, *description)),
            ["entity", name, entity_type] => extraction
                .entities
                .push(ExtractedEntity::new(*name, *entity_type, "")),
            ["relationship" | "event", timestamp, source, target, description, ..] => {
                extraction.relations.push(ExtractedRelation {
                    timestamp_name: timestamp.to_string(),
                    source_name: source.to_string(),
                    target_name: target.to_string(),
                    description: description.to_string(),
                })
            }
            _ => {}
        }
    }

    extraction
}

/// Parses question-understanding output into query entities.
///
/// Only `entity` records with at least a name and a type are kept.
pub fn parse_query_entities(
    raw: &str,
    tuple_delimiter: &str,
    record_delimiter: &str,
) -> Vec<QueryEntity> {
    records(raw, tuple_delimiter, record_delimiter)
        .filter_map(|parts| match parts.as_slice() {
            ["entity", name, entity_type, ..] => Some(QueryEntity::new(*name, *entity_type)),
            _ => None,
        })
        .collect()
}
