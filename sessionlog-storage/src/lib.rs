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

//! Sessionlog Storage Layer
//!
//! Append-only JSONL event store plus the two derived artifacts that live
//! beside each session log:
//!
//! - **Event log** (`.jsonl`): the sole source of truth, one record per line.
//! - **Report** (`.md`): fully regenerated projection, overwritten atomically.
//! - **Summary cache** (`.summaries.json`): optional memoized annotations.
//!
//! The capture pipeline ties the three together fail-open: no fault in this
//! layer may propagate into the host's interactive flow.

pub mod capture;
pub mod event_store;
pub mod report;
pub mod summary_cache;

pub use capture::{CaptureOutcome, CapturePipeline};
pub use event_store::{EventStore, SessionPaths, SessionRecords};
pub use report::{render, write_report, FOLD_THRESHOLD_CHARS};
pub use summary_cache::{HttpSummarizer, Summarizer, SummaryCache};
