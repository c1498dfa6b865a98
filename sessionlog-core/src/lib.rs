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

//! Sessionlog Core
//!
//! Fundamental data structures for the conversation event log: event kinds
//! and payloads, the on-disk record format, session lifecycle, cache
//! fingerprints, and configuration.

pub mod config;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod session;

pub use config::{EmbeddingConfig, LogConfig, SummaryConfig};
pub use error::{Result, SessionlogError};
pub use event::{Event, EventKind, EventRecord};
pub use fingerprint::fingerprint;
pub use session::{agent_session_number, InvalidTransition, SessionState};
