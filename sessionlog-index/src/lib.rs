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

//! Sessionlog Index
//!
//! On-demand BM25 indexing over a filtered subset of the event log. No
//! index is ever persisted: every query rebuilds from the log files,
//! trading query latency for a zero-invalidation write path.

pub mod bm25;
pub mod loader;
pub mod tokenize;

pub use bm25::{Bm25Index, BM25_B, BM25_K1};
pub use loader::{load_corpus, Corpus, DateRange, SearchDocument, SearchFilter};
pub use tokenize::{tokenize, STOP_WORDS};
