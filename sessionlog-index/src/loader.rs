// Copyright 2025 Sessionlog (https://github.com/sessionlog)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Filtered corpus loading.
//!
//! Walks `<log-root>/<date>/*.jsonl`, pruning date directories outside the
//! requested range, and builds ephemeral [`SearchDocument`]s for records
//! matching the filter. Unparseable lines are skipped and counted so the
//! caller can audit result completeness; they never abort the build.

use chrono::{DateTime, NaiveDate, Utc};
use sessionlog_core::{EventKind, EventRecord, Result, SessionlogError};
use sessionlog_storage::event_store::{parse_date_dir, read_records};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inclusive date range, parsed from `YYYY-MM-DD..YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse the `start..end` form. An inverted range is a validation
    /// error surfaced to the caller, not a silent empty result.
    pub fn parse(raw: &str) -> Result<Self> {
        let (start, end) = raw.split_once("..").ok_or_else(|| {
            SessionlogError::InvalidQuery(format!(
                "date range must be YYYY-MM-DD..YYYY-MM-DD, got: {raw}"
            ))
        })?;
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|e| SessionlogError::InvalidQuery(format!("bad start date {start}: {e}")))?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .map_err(|e| SessionlogError::InvalidQuery(format!("bad end date {end}: {e}")))?;
        if start > end {
            return Err(SessionlogError::InvalidQuery(format!(
                "inverted date range: {start} > {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Multi-dimensional record filter applied while loading.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub kinds: Option<Vec<EventKind>>,
    pub date_range: Option<DateRange>,
    pub session_id: Option<String>,
}

impl SearchFilter {
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&record.kind()) {
                return false;
            }
        }
        if let Some(range) = &self.date_range {
            if !range.contains(record.timestamp.date_naive()) {
                return false;
            }
        }
        if let Some(session_id) = &self.session_id {
            if record.session_id != *session_id {
                return false;
            }
        }
        true
    }
}

/// Ephemeral per-query view of one record. Never persisted.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub content: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub source_file: PathBuf,
}

/// A filtered document set plus the audit count of skipped lines.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<SearchDocument>,
    pub skipped_lines: usize,
}

/// Load all records under `log_root` matching `filter`, in deterministic
/// (date, file, line) order.
pub fn load_corpus(log_root: &Path, filter: &SearchFilter) -> Result<Corpus> {
    let mut corpus = Corpus::default();

    if !log_root.exists() {
        return Ok(corpus);
    }

    let mut date_dirs: Vec<(NaiveDate, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(log_root)? {
        let path = entry?.path();
        if let Some(date) = parse_date_dir(&path) {
            // A directory is named for its sessions' start date, so a
            // directory before the range can still hold in-range records
            // written past midnight. Only directories past the range end are
            // safe to prune (no record predates its file's date); everything
            // else is left to the per-record check below.
            if let Some(range) = &filter.date_range {
                if date > range.end {
                    continue;
                }
            }
            date_dirs.push((date, path));
        }
    }
    date_dirs.sort();

    let session_suffix = filter
        .session_id
        .as_ref()
        .map(|id| format!("-{id}.jsonl"));

    for (_, dir) in date_dirs {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();

        for file in files {
            if let Some(suffix) = &session_suffix {
                if !file.to_string_lossy().ends_with(suffix.as_str()) {
                    continue;
                }
            }

            let session = read_records(&file)?;
            corpus.skipped_lines += session.skipped_lines;
            for record in session.records {
                if !filter.matches(&record) {
                    continue;
                }
                corpus.documents.push(SearchDocument {
                    content: record.event.search_text(),
                    kind: record.kind(),
                    timestamp: record.timestamp,
                    session_id: record.session_id,
                    source_file: file.clone(),
                });
            }
        }
    }

    debug!(
        documents = corpus.documents.len(),
        skipped = corpus.skipped_lines,
        "corpus loaded"
    );
    Ok(corpus)
}
