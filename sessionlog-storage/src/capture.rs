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

//! Fail-open capture pipeline.
//!
//! One call per host notification: append the record, attempt a summary
//! fill for text-bearing kinds, then regenerate the report. Every fault is
//! logged and swallowed; the host's interactive flow is never aborted or
//! delayed by its own logging. A render fault
//! is self-healing: the next triggering event rebuilds the report from the
//! unaffected event log.

use chrono::{DateTime, Utc};
use sessionlog_core::{fingerprint, Event, LogConfig, Result};
use tracing::warn;

use crate::event_store::EventStore;
use crate::report;
use crate::summary_cache::{HttpSummarizer, Summarizer, SummaryCache};

/// What the pipeline managed to do for one event. Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub appended: bool,
    pub summary_attached: bool,
    pub report_rendered: bool,
}

/// Capture entry point owned by the host-facing process.
pub struct CapturePipeline {
    store: EventStore,
    summarizer: Option<Box<dyn Summarizer>>,
}

impl CapturePipeline {
    /// Build from config: opens the store at the resolved log root and wires
    /// the HTTP summarizer when credentials are present.
    pub fn new(config: &LogConfig) -> Result<Self> {
        let store = EventStore::open(config.resolved_root())?;
        let summarizer = HttpSummarizer::from_config(config)
            .map(|s| Box::new(s) as Box<dyn Summarizer>);
        Ok(Self { store, summarizer })
    }

    /// Build from parts. Tests use this to substitute summarizer stubs.
    pub fn with_store(store: EventStore, summarizer: Option<Box<dyn Summarizer>>) -> Self {
        Self { store, summarizer }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Capture one event with the current time.
    pub fn capture(&self, session_id: &str, event: Event) -> CaptureOutcome {
        self.capture_at(session_id, event, Utc::now())
    }

    /// Capture one event at an explicit timestamp. Never fails.
    pub fn capture_at(
        &self,
        session_id: &str,
        event: Event,
        timestamp: DateTime<Utc>,
    ) -> CaptureOutcome {
        match self.capture_inner(session_id, event, timestamp) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(session_id, %error, "capture fault, continuing (fail-open)");
                CaptureOutcome::default()
            }
        }
    }

    fn capture_inner(
        &self,
        session_id: &str,
        event: Event,
        timestamp: DateTime<Utc>,
    ) -> Result<CaptureOutcome> {
        let mut outcome = CaptureOutcome::default();

        let record = self.store.append(session_id, event, timestamp)?;
        outcome.appended = true;

        let paths = self.store.session_paths(session_id)?;
        let cache = SummaryCache::load(&paths.summaries);

        // Summary fill runs after the append is durable, before the render
        // that may display it. Failures here degrade to "no summary".
        if let (Some(summarizer), Some(text)) =
            (self.summarizer.as_deref(), record.event.primary_text())
        {
            let key = fingerprint(record.kind(), &record.timestamp, text);
            outcome.summary_attached = cache.get_or_generate(&key, text, summarizer).is_some();
        }

        let session = self.store.read_session(session_id)?;
        let content = report::render(&session.records, Some(&cache));
        report::write_report(&paths.report, &content)?;
        outcome.report_rendered = true;

        Ok(outcome)
    }
}
