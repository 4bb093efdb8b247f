//! Per-session conversational state.
//!
//! Each session exclusively owns its chat history and export table; no
//! state is ambient or shared between sessions. Turns within a session run
//! to completion one at a time, enforced by the session lock in `AppState`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::ChatMessage;
use crate::prompts::{SYSTEM_PROMPT, WELCOME_MSG};

/// One flattened result row, columns ordered to match the record's
/// attribute list. All cells are pre-rendered strings so the table can be
/// serialized without consulting the formatter again.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub id: String,
    pub organization: String,
    pub repository: String,
    pub url: String,
    pub description: String,
    pub is_private: String,
    pub is_archived: String,
    pub language: String,
    pub updated_at: String,
    pub ai_summary: String,
    pub distance: String,
    pub matched_keywords: String,
}

const EXPORT_COLUMNS: [&str; 12] = [
    "id",
    "organization",
    "repository",
    "url",
    "description",
    "is_private",
    "is_archived",
    "language",
    "updated_at",
    "ai_summary",
    "distance",
    "matched_keywords",
];

/// Session-scoped, append-only accumulation of every record shown to the
/// user. Cleared only by an explicit reset.
#[derive(Debug, Default)]
pub struct ExportTable {
    rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn append(&mut self, row: ExportRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Render the whole table as tab-separated values with a header row.
    /// Tabs and newlines inside cells are flattened to spaces so the row
    /// structure survives any spreadsheet import.
    pub fn to_tsv(&self) -> String {
        let mut out = EXPORT_COLUMNS.join("\t");
        out.push('\n');
        for row in &self.rows {
            let cells = [
                &row.id,
                &row.organization,
                &row.repository,
                &row.url,
                &row.description,
                &row.is_private,
                &row.is_archived,
                &row.language,
                &row.updated_at,
                &row.ai_summary,
                &row.distance,
                &row.matched_keywords,
            ];
            let line: Vec<String> = cells
                .iter()
                .map(|c| c.replace(['\t', '\n', '\r'], " "))
                .collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// One user's conversation: chat history plus the cumulative export table.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub history: Vec<ChatMessage>,
    pub export_table: ExportTable,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            history: seed_history(),
            export_table: ExportTable::default(),
        }
    }

    /// Reset to the just-created state: history re-seeded, export table
    /// emptied.
    pub fn reset(&mut self) {
        self.history = seed_history();
        self.export_table.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::assistant(WELCOME_MSG),
    ]
}
