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

//! Deterministic fingerprints for the summary cache.
//!
//! Two records with the same `(kind, timestamp, primary_text)` triple always
//! hash to the same key, so reruns and re-executions share one cache entry.

use crate::event::EventKind;
use chrono::{DateTime, SecondsFormat, Utc};

/// Hex-encoded blake3 fingerprint over the event's defining fields.
///
/// Fields are separated by a 0x1f unit separator so that no concatenation
/// of adjacent fields can collide.
pub fn fingerprint(kind: EventKind, timestamp: &DateTime<Utc>, primary_text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(&[0x1f]);
    hasher.update(
        timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .as_bytes(),
    );
    hasher.update(&[0x1f]);
    hasher.update(primary_text.as_bytes());
    hasher.finalize().to_hex().to_string()
}
