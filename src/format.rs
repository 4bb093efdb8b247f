//! Rendering of result sets into chat display text and export rows.
//!
//! Every template field is always emitted: a missing value renders as an
//! explicit "unknown" (or "none" for the keyword and summary fields) so
//! field positions stay stable for anything parsing the output downstream.

use chrono::{DateTime, Utc};

use crate::models::{ResultRecord, ResultSet};
use crate::session::{ExportRow, ExportTable};

/// Separator between record blocks in the chat display. Multi-character so
/// it cannot collide with field values.
pub const RECORD_SEPARATOR: &str = "\n***\n";

const UNKNOWN: &str = "unknown";
const NONE: &str = "none";

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn bool_or_unknown(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => UNKNOWN,
    }
}

/// `Friday, 17 January, 2025 at 09:30 (3 days ago).` computed against an
/// injected `now` so rendering is reproducible.
fn render_updated_at(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match updated_at {
        Some(ts) => {
            let days_ago = (now - ts).num_days();
            format!("{} ({days_ago} days ago).", ts.format("%A, %d %B, %Y at %H:%M"))
        }
        None => UNKNOWN.to_string(),
    }
}

fn render_keywords(keywords: &[String]) -> String {
    if keywords.is_empty() {
        NONE.to_string()
    } else {
        keywords.join(", ")
    }
}

/// Fill the fixed-field display template for one record.
pub fn render_record(record: &ResultRecord, now: DateTime<Utc>) -> String {
    format!(
        "Organization: {org}\n\
         Repo Name: {name}\n\
         Repo Description: {desc}\n\
         Repo URL: {url}\n\
         Is Private: {private}\n\
         Is Archived: {archived}\n\
         Updated At: {updated}\n\
         Programming Language: {lang}\n\
         Distance: {dist:.4}\n\
         Matched Terms: {terms}\n\
         AI Summary: {summary}",
        org = or_unknown(&record.organization),
        name = or_unknown(&record.repository),
        desc = or_unknown(&record.description),
        url = or_unknown(&record.url),
        private = bool_or_unknown(record.is_private),
        archived = bool_or_unknown(record.is_archived),
        updated = render_updated_at(record.updated_at, now),
        lang = or_unknown(&record.language),
        dist = record.distance,
        terms = render_keywords(&record.matched_keywords),
        summary = record.ai_summary.as_deref().unwrap_or(NONE),
    )
}

/// Join record blocks in the set's iteration order. Empty set renders as
/// an empty string; the caller decides what notice to show.
pub fn render_result_set(set: &ResultSet, now: DateTime<Utc>) -> String {
    set.records()
        .iter()
        .map(|r| render_record(r, now))
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}

/// Flatten one record into an export row using the same fallbacks as the
/// display template.
pub fn export_row(record: &ResultRecord, now: DateTime<Utc>) -> ExportRow {
    ExportRow {
        id: record.id.clone(),
        organization: or_unknown(&record.organization).to_string(),
        repository: or_unknown(&record.repository).to_string(),
        url: or_unknown(&record.url).to_string(),
        description: or_unknown(&record.description).to_string(),
        is_private: bool_or_unknown(record.is_private).to_string(),
        is_archived: bool_or_unknown(record.is_archived).to_string(),
        language: or_unknown(&record.language).to_string(),
        updated_at: render_updated_at(record.updated_at, now),
        ai_summary: record.ai_summary.as_deref().unwrap_or(NONE).to_string(),
        distance: format!("{:.4}", record.distance),
        matched_keywords: render_keywords(&record.matched_keywords),
    }
}

/// Append one row per record to the session's export table, preserving the
/// set's order. Does not mutate the set.
pub fn append_to_export(table: &mut ExportTable, set: &ResultSet, now: DateTime<Utc>) {
    for record in set.records() {
        table.append(export_row(record, now));
    }
}
