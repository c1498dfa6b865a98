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

//! Sessionlog Query
//!
//! Read-only query surface over the event log: BM25 ranking with a stable
//! tie-break, snippet extraction and highlighting, prompt/response pairing,
//! statistics aggregation, optional hybrid semantic re-ranking, and output
//! formatting. Queries never write anything, so they are trivially
//! cancellable and safe to run beside live capture.

pub mod engine;
pub mod output;
pub mod semantic;
pub mod snippet;

pub use engine::{QueryEngine, QueryHit, QueryRequest, QueryResponse, StatsReport, DEFAULT_LIMIT};
pub use output::{format_response, format_stats, OutputFormat};
pub use semantic::{
    cosine_similarity, EmbeddingProvider, HttpEmbeddingProvider, LEXICAL_WEIGHT, SEMANTIC_WEIGHT,
};
pub use snippet::{extract, highlight, SNIPPET_CONTEXT_CHARS};
