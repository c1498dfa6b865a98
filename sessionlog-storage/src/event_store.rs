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

//! Append-only event store.
//!
//! One session materializes as `<log-root>/<YYYY-MM-DD>/<HHMMSS>-<session_id>.jsonl`,
//! named for the session's *start* time. A session may span a date boundary,
//! so the path is resolved from the existing file on disk, never recomputed
//! from "today". Existing lines are never rewritten; the append path needs
//! no locking because the host serializes writes per session.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use sessionlog_core::{agent_session_number, Event, EventRecord, Result, SessionState, SessionlogError};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const LOG_EXT: &str = "jsonl";
const REPORT_EXT: &str = "md";
const SUMMARIES_EXT: &str = "summaries.json";

/// The three paired artifact paths of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    /// Source of truth.
    pub log: PathBuf,
    /// Derived report, regenerated on every triggering event.
    pub report: PathBuf,
    /// Optional, regenerable summary cache.
    pub summaries: PathBuf,
}

impl SessionPaths {
    fn from_stem(dir: &Path, stem: &str) -> Self {
        Self {
            log: dir.join(format!("{stem}.{LOG_EXT}")),
            report: dir.join(format!("{stem}.{REPORT_EXT}")),
            summaries: dir.join(format!("{stem}.{SUMMARIES_EXT}")),
        }
    }
}

/// A session's ordered records plus the count of lines that failed to parse.
///
/// Corrupt lines are skipped, never fatal; the count makes result
/// completeness auditable for callers.
#[derive(Debug, Clone)]
pub struct SessionRecords {
    pub records: Vec<EventRecord>,
    pub skipped_lines: usize,
}

/// Append-only store over the log root directory.
pub struct EventStore {
    log_root: PathBuf,
    // session_id -> resolved artifact paths; purely a scan-avoidance cache
    sessions: RwLock<HashMap<String, SessionPaths>>,
}

impl EventStore {
    /// Open or create a store rooted at `log_root`.
    pub fn open(log_root: impl AsRef<Path>) -> Result<Self> {
        let log_root = log_root.as_ref().to_path_buf();
        std::fs::create_dir_all(&log_root)?;
        Ok(Self {
            log_root,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    /// Append exactly one record for `session_id`, deriving its agent
    /// session number from the context-reset markers already on disk.
    pub fn append(
        &self,
        session_id: &str,
        event: Event,
        timestamp: DateTime<Utc>,
    ) -> Result<EventRecord> {
        let paths = self.resolve(session_id, Some(timestamp))?;

        let prior_kinds: Vec<_> = if paths.log.exists() {
            let existing = read_records(&paths.log)?;
            existing.records.iter().map(|r| r.kind()).collect()
        } else {
            Vec::new()
        };

        // lifecycle violations are flagged, never rejected
        if let Err(error) = SessionState::replay(&prior_kinds).transition(event.kind()) {
            warn!(session_id, %error, "event violates session lifecycle, recorded anyway");
        }
        let number = agent_session_number(&prior_kinds);

        let record = EventRecord {
            event,
            timestamp,
            session_id: session_id.to_string(),
            agent_session_number: number,
        };

        let line = serde_json::to_string(&record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&paths.log)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        Ok(record)
    }

    /// Read a session's full ordered record list.
    pub fn read_session(&self, session_id: &str) -> Result<SessionRecords> {
        let paths = self.session_paths(session_id)?;
        read_records(&paths.log)
    }

    /// Artifact paths for an existing session.
    pub fn session_paths(&self, session_id: &str) -> Result<SessionPaths> {
        let paths = self.resolve(session_id, None)?;
        if paths.log.exists() {
            Ok(paths)
        } else {
            Err(SessionlogError::UnknownSession(session_id.to_string()))
        }
    }

    /// Resolve (and cache) the artifact paths for a session.
    ///
    /// An existing on-disk file always wins; a new path is derived from the
    /// event timestamp only when no file exists yet, which is what pins the
    /// session to its start date across midnight.
    fn resolve(
        &self,
        session_id: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<SessionPaths> {
        if let Some(paths) = self.sessions.read().get(session_id) {
            return Ok(paths.clone());
        }

        let resolved = match self.find_existing(session_id)? {
            Some(paths) => paths,
            None => {
                let Some(timestamp) = timestamp else {
                    return Err(SessionlogError::UnknownSession(session_id.to_string()));
                };
                let dir = self.log_root.join(timestamp.format("%Y-%m-%d").to_string());
                std::fs::create_dir_all(&dir)?;
                let stem = format!("{}-{}", timestamp.format("%H%M%S"), session_id);
                SessionPaths::from_stem(&dir, &stem)
            }
        };

        self.sessions
            .write()
            .insert(session_id.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Scan the date directories for an existing session log.
    ///
    /// Ties (which cannot occur for a well-formed log) resolve to the
    /// lexically smallest path, i.e. the earliest date and start time.
    fn find_existing(&self, session_id: &str) -> Result<Option<SessionPaths>> {
        let suffix = format!("-{session_id}.{LOG_EXT}");
        let mut candidates = Vec::new();

        for entry in std::fs::read_dir(&self.log_root)? {
            let entry = entry?;
            let dir = entry.path();
            if !dir.is_dir() || parse_date_dir(&dir).is_none() {
                continue;
            }
            for file in std::fs::read_dir(&dir)? {
                let file = file?;
                let name = file.file_name();
                let name = name.to_string_lossy();
                if name.ends_with(&suffix) {
                    let stem = name.trim_end_matches(&format!(".{LOG_EXT}")).to_string();
                    candidates.push((file.path(), dir.clone(), stem));
                }
            }
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(candidates
            .into_iter()
            .next()
            .map(|(_, dir, stem)| SessionPaths::from_stem(&dir, &stem)))
    }
}

/// Parse a directory name as a `YYYY-MM-DD` date, if it is one.
pub fn parse_date_dir(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

/// Read every parseable record from a session log.
pub fn read_records(path: &Path) -> Result<SessionRecords> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut skipped_lines = 0usize;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventRecord>(&line) {
            Ok(record) => records.push(record),
            Err(error) => {
                skipped_lines += 1;
                warn!(
                    path = %path.display(),
                    line = line_number + 1,
                    %error,
                    "skipping unparseable record"
                );
            }
        }
    }

    Ok(SessionRecords {
        records,
        skipped_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sessionlog_core::EventKind;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap()
    }

    fn user(text: &str) -> Event {
        Event::UserTurn {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_append_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        store
            .append("s1", Event::SessionStart {}, ts(9, 0, 0))
            .unwrap();
        store.append("s1", user("hello"), ts(9, 0, 5)).unwrap();

        let session = store.read_session("s1").unwrap();
        assert_eq!(session.records.len(), 2);
        assert_eq!(session.skipped_lines, 0);
        assert_eq!(session.records[0].kind(), EventKind::SessionStart);
        assert_eq!(session.records[1].kind(), EventKind::UserTurn);

        let paths = store.session_paths("s1").unwrap();
        assert!(paths
            .log
            .to_string_lossy()
            .ends_with("2025-06-01/090000-s1.jsonl"));
    }

    #[test]
    fn test_agent_session_number_after_resets() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        store
            .append("s1", Event::SessionStart {}, ts(9, 0, 0))
            .unwrap();
        store
            .append("s1", Event::ContextReset {}, ts(9, 1, 0))
            .unwrap();
        store
            .append("s1", Event::ContextReset {}, ts(9, 2, 0))
            .unwrap();
        let record = store.append("s1", user("after"), ts(9, 3, 0)).unwrap();
        assert_eq!(record.agent_session_number, 3);

        let next = store.append("s1", user("still"), ts(9, 4, 0)).unwrap();
        assert_eq!(next.agent_session_number, 3);
    }

    #[test]
    fn test_session_pinned_to_start_date_across_midnight() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        let late = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 50).unwrap();
        store.append("night", Event::SessionStart {}, late).unwrap();

        // new process: fresh store, event after midnight
        let store = EventStore::open(dir.path()).unwrap();
        let past_midnight = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 30).unwrap();
        store.append("night", user("late"), past_midnight).unwrap();

        let session = store.read_session("night").unwrap();
        assert_eq!(session.records.len(), 2);
        let paths = store.session_paths("night").unwrap();
        assert!(paths.log.to_string_lossy().contains("2025-06-01"));
    }

    #[test]
    fn test_corrupt_line_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        store
            .append("s1", Event::SessionStart {}, ts(9, 0, 0))
            .unwrap();
        store.append("s1", user("ok"), ts(9, 0, 1)).unwrap();

        let paths = store.session_paths("s1").unwrap();
        let mut file = OpenOptions::new().append(true).open(&paths.log).unwrap();
        writeln!(file, "{{not json").unwrap();

        store.append("s1", user("more"), ts(9, 0, 2)).unwrap();

        let session = store.read_session("s1").unwrap();
        assert_eq!(session.records.len(), 3);
        assert_eq!(session.skipped_lines, 1);
    }

    #[test]
    fn test_events_after_end_are_still_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        store
            .append("s1", Event::SessionStart {}, ts(9, 0, 0))
            .unwrap();
        store
            .append("s1", Event::SessionEnd {}, ts(9, 0, 1))
            .unwrap();
        // lifecycle violation, but an append-only log never drops data
        store.append("s1", user("straggler"), ts(9, 0, 2)).unwrap();

        let session = store.read_session("s1").unwrap();
        assert_eq!(session.records.len(), 3);
    }

    #[test]
    fn test_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.read_session("ghost"),
            Err(SessionlogError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_append_only_growth() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        let mut seen: Vec<EventRecord> = Vec::new();
        for i in 0..20u32 {
            store
                .append("s1", user(&format!("turn {i}")), ts(9, 0, i))
                .unwrap();
            let now = store.read_session("s1").unwrap().records;
            // previously written records are an unmutated prefix
            assert_eq!(&now[..seen.len()], &seen[..]);
            seen = now;
        }
        assert_eq!(seen.len(), 20);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]
        #[test]
        fn prop_append_preserves_prefix(texts in proptest::collection::vec("[ -~]{0,80}", 1..8)) {
            let dir = tempfile::tempdir().unwrap();
            let store = EventStore::open(dir.path()).unwrap();

            let mut seen: Vec<EventRecord> = Vec::new();
            for (i, text) in texts.iter().enumerate() {
                store.append("s1", user(text), ts(9, 0, i as u32)).unwrap();
                let now = store.read_session("s1").unwrap().records;
                proptest::prop_assert_eq!(&now[..seen.len()], &seen[..]);
                proptest::prop_assert_eq!(now.last().unwrap().event.primary_text(), Some(text.as_str()));
                seen = now;
            }
        }
    }
}
