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

//! Shared error type for the sessionlog crates.
//!
//! There are no fatal conditions in this subsystem: capture swallows every
//! variant fail-open, queries surface `InvalidQuery` to the caller and skip
//! corrupt input with an audit count, and summary/embedding faults degrade
//! to absence.

use thiserror::Error;

/// Errors produced by the sessionlog crates.
#[derive(Error, Debug)]
pub enum SessionlogError {
    /// Filesystem failure while appending, reading, or rewriting artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or cache (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// User-facing query validation failure (e.g. malformed date range).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// No log file exists for the requested session.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// External summarization call failed. Degrades to "no summary".
    #[error("summary generation failed: {0}")]
    Summary(String),

    /// Embedding backend failed. Degrades to pure lexical ranking.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, SessionlogError>;
