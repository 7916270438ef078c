// Treatment-field table recovery from a flat run of text tokens
//
// The plan report prints its field-parameter table as one token per line.
// A token that is a modality keyword or a pure numeral opens a new record;
// every other token is a positional value of the open record.
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::FieldTableLayout;

/// One beam: identifier plus its positional values (technique, machine,
/// energy, jaws, angles, isocentre, SSD, MU) in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreatmentField {
    pub identifier: String,
    pub values: Vec<String>,
}

/// A record dropped by the plausibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedField {
    /// Encounter position before rejection
    pub position: usize,
    pub field: TreatmentField,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldTable {
    pub fields: Vec<TreatmentField>,
    pub rejected: Vec<RejectedField>,
}

/// Lines strictly between the start marker and the first end marker.
///
/// Without a start marker there is no table and the result is empty.
pub fn section_tokens<'t>(text: &'t str, layout: &FieldTableLayout) -> Vec<&'t str> {
    let mut lines = text.lines().map(str::trim);
    if !lines.any(|line| line.starts_with(layout.start_marker.as_str())) {
        debug!(marker = %layout.start_marker, "field table start marker not found");
        return Vec::new();
    }
    lines
        .take_while(|line| !layout.end_markers.iter().any(|end| line.starts_with(end.as_str())))
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn is_identifier(token: &str, layout: &FieldTableLayout) -> bool {
    let is_numeral = !token.is_empty() && token.chars().all(|c| c.is_ascii_digit());
    is_numeral || layout.identifier_keywords.iter().any(|k| k == token)
}

/// Split a token run into records. Tokens before the first identifier
/// (column headers) are ignored; separator tokens are dropped.
pub fn classify_tokens(tokens: &[&str], layout: &FieldTableLayout) -> Vec<TreatmentField> {
    let mut fields = Vec::new();
    let mut current: Option<TreatmentField> = None;
    let mut skipped = 0usize;

    for token in tokens.iter().map(|t| t.trim()) {
        if token.is_empty() || token == layout.separator {
            continue;
        }
        if is_identifier(token, layout) {
            if let Some(done) = current.take() {
                debug!(id = %done.identifier, values = done.values.len(), "field record flushed");
                fields.push(done);
            }
            current = Some(TreatmentField {
                identifier: token.to_string(),
                values: Vec::new(),
            });
            continue;
        }
        match current.as_mut() {
            Some(field) => field.values.push(token.to_string()),
            None => skipped += 1,
        }
    }

    if let Some(done) = current {
        debug!(id = %done.identifier, values = done.values.len(), "field record flushed");
        fields.push(done);
    }
    if skipped > 0 {
        debug!(skipped, "tokens before first field identifier ignored");
    }
    fields
}

/// Reject records whose value count falls outside the configured bounds.
pub fn validate_fields(fields: Vec<TreatmentField>, layout: &FieldTableLayout) -> FieldTable {
    let bounds = layout.min_values..=layout.max_values;
    let mut table = FieldTable::default();

    for (position, field) in fields.into_iter().enumerate() {
        if bounds.contains(&field.values.len()) {
            table.fields.push(field);
        } else {
            let reason = format!(
                "{} values, expected {}..={}",
                field.values.len(),
                layout.min_values,
                layout.max_values
            );
            warn!(id = %field.identifier, position, %reason, "rejecting implausible field record");
            table.rejected.push(RejectedField {
                position,
                field,
                reason,
            });
        }
    }
    table
}

pub fn recover_fields(text: &str, layout: &FieldTableLayout) -> FieldTable {
    let tokens = section_tokens(text, layout);
    validate_fields(classify_tokens(&tokens, layout), layout)
}
