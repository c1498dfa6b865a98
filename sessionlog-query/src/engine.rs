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

//! Query engine.
//!
//! Each query rebuilds its index from the log files, so the write path never
//! has to invalidate anything. Ranking is BM25 with a total tie-break order:
//! score descending, then timestamp descending (most recent first), then
//! source path ascending. Nothing depends on incidental map iteration order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sessionlog_core::{EventKind, Result, SessionlogError};
use sessionlog_index::{load_corpus, tokenize, Bm25Index, Corpus, SearchDocument, SearchFilter};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::semantic::{self, EmbeddingProvider};
use crate::snippet;

/// Default result limit for snippet mode.
pub const DEFAULT_LIMIT: usize = 10;

/// A search request plus presentation options.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub filter: SearchFilter,
    pub limit: usize,
    /// Return the entire document text, with no truncation whatsoever.
    pub full_content: bool,
    /// Pair each user-turn hit with the nearest subsequent assistant turn
    /// in the same session.
    pub pairs: bool,
    /// Wrap matched terms in `**..**`.
    pub highlight: bool,
    /// Blend embedding similarity into the ranking when a backend exists.
    pub hybrid: bool,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filter: SearchFilter::default(),
            limit: DEFAULT_LIMIT,
            full_content: false,
            pairs: false,
            highlight: false,
            hybrid: false,
        }
    }
}

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    pub score: f64,
    pub kind: EventKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub source_file: PathBuf,
    /// Present only in pairing mode, for user-turn hits with a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_response: Option<Box<QueryHit>>,
}

/// Ranked results plus audit counters.
///
/// Zero results is success, distinct from a query error; `skipped_lines`
/// reports corrupt source lines excluded from `total_indexed`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub results: Vec<QueryHit>,
    pub total_indexed: usize,
    pub skipped_lines: usize,
}

/// Counts by kind, session, and date bucket over a filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub total: usize,
    pub skipped_lines: usize,
    pub by_kind: std::collections::BTreeMap<String, usize>,
    pub by_session: std::collections::BTreeMap<String, usize>,
    pub by_date: std::collections::BTreeMap<String, usize>,
}

/// Read-only query surface over one log root.
pub struct QueryEngine {
    log_root: PathBuf,
    embedder: Option<Box<dyn EmbeddingProvider>>,
}

impl QueryEngine {
    pub fn new(log_root: impl Into<PathBuf>) -> Self {
        Self {
            log_root: log_root.into(),
            embedder: None,
        }
    }

    /// Attach an embedding backend for hybrid ranking.
    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    /// Execute a ranked search.
    pub fn search(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SessionlogError::InvalidQuery(
                "query text must not be empty".to_string(),
            ));
        }

        let corpus = load_corpus(&self.log_root, &request.filter)?;
        let terms = tokenize(query);
        debug!(
            documents = corpus.documents.len(),
            terms = terms.len(),
            "index built for query"
        );

        if terms.is_empty() {
            // every query token was a stop word: no matches, not an error
            return Ok(QueryResponse {
                results: Vec::new(),
                total_indexed: corpus.documents.len(),
                skipped_lines: corpus.skipped_lines,
            });
        }

        let index = Bm25Index::build(corpus.documents.iter().map(|d| d.content.as_str()));
        let scores = index.score_all(&terms);

        let mut candidates: Vec<(usize, f64)> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > 0.0)
            .map(|(i, s)| (i, *s))
            .collect();

        if request.hybrid {
            self.apply_hybrid(query, &corpus, &mut candidates);
        }

        candidates.sort_by(|a, b| rank_order(&corpus, a, b));
        candidates.truncate(request.limit);

        let response_corpus = if request.pairs {
            self.response_corpus(&request.filter)?
        } else {
            None
        };
        let responses = response_corpus.as_ref().unwrap_or(&corpus);

        let results = candidates
            .into_iter()
            .map(|(i, score)| self.build_hit(request, &corpus, responses, &terms, i, score))
            .collect();

        Ok(QueryResponse {
            results,
            total_indexed: corpus.documents.len(),
            skipped_lines: corpus.skipped_lines,
        })
    }

    /// Aggregate counts over the filtered set. No query text required.
    pub fn stats(&self, filter: &SearchFilter) -> Result<StatsReport> {
        let corpus = load_corpus(&self.log_root, filter)?;

        let mut report = StatsReport {
            total: corpus.documents.len(),
            skipped_lines: corpus.skipped_lines,
            by_kind: Default::default(),
            by_session: Default::default(),
            by_date: Default::default(),
        };

        for doc in &corpus.documents {
            *report.by_kind.entry(doc.kind.to_string()).or_default() += 1;
            *report.by_session.entry(doc.session_id.clone()).or_default() += 1;
            *report
                .by_date
                .entry(doc.timestamp.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }

        Ok(report)
    }

    /// Re-rank candidates with the embedding backend, if one is attached.
    ///
    /// Backend failure or absence degrades to pure BM25: identical external
    /// behavior, never an error.
    fn apply_hybrid(&self, query: &str, corpus: &Corpus, candidates: &mut [(usize, f64)]) {
        let Some(provider) = self.embedder.as_deref() else {
            debug!("no embedding backend, ranking stays lexical");
            return;
        };

        let texts: Vec<&str> = candidates
            .iter()
            .map(|(i, _)| corpus.documents[*i].content.as_str())
            .collect();
        let bm25: Vec<f64> = candidates.iter().map(|(_, s)| *s).collect();

        match semantic::blend(provider, query, &texts, &bm25) {
            Ok(blended) => {
                for (candidate, score) in candidates.iter_mut().zip(blended) {
                    candidate.1 = score;
                }
            }
            Err(error) => {
                warn!(%error, "embedding backend failed, falling back to BM25");
            }
        }
    }

    /// Load assistant turns the active kind filter would otherwise exclude.
    ///
    /// Pairing looks up responses regardless of the filter, so `--kind
    /// user_turn` still pairs. Returns `None` when the main corpus already
    /// contains the assistant turns.
    fn response_corpus(&self, filter: &SearchFilter) -> Result<Option<Corpus>> {
        match &filter.kinds {
            Some(kinds) if !kinds.contains(&EventKind::AssistantTurn) => {
                let response_filter = SearchFilter {
                    kinds: Some(vec![EventKind::AssistantTurn]),
                    ..filter.clone()
                };
                Ok(Some(load_corpus(&self.log_root, &response_filter)?))
            }
            _ => Ok(None),
        }
    }

    fn build_hit(
        &self,
        request: &QueryRequest,
        corpus: &Corpus,
        responses: &Corpus,
        terms: &[String],
        doc: usize,
        score: f64,
    ) -> QueryHit {
        let document = &corpus.documents[doc];

        let mut content = if request.full_content {
            document.content.clone()
        } else {
            snippet::extract(&document.content, terms)
        };
        if request.highlight {
            content = snippet::highlight(&content, terms);
        }

        let paired_response = (request.pairs && document.kind == EventKind::UserTurn)
            .then(|| self.find_response(request, document, responses, terms))
            .flatten();

        QueryHit {
            score,
            kind: document.kind,
            content,
            timestamp: document.timestamp,
            session_id: document.session_id.clone(),
            source_file: document.source_file.clone(),
            paired_response,
        }
    }

    /// Nearest subsequent assistant turn sharing the hit's session.
    fn find_response(
        &self,
        request: &QueryRequest,
        prompt: &SearchDocument,
        responses: &Corpus,
        terms: &[String],
    ) -> Option<Box<QueryHit>> {
        let response = responses
            .documents
            .iter()
            .filter(|d| {
                d.kind == EventKind::AssistantTurn
                    && d.session_id == prompt.session_id
                    && d.timestamp > prompt.timestamp
            })
            .min_by_key(|d| d.timestamp)?;

        let mut content = if request.full_content {
            response.content.clone()
        } else {
            snippet::extract(&response.content, terms)
        };
        if request.highlight {
            content = snippet::highlight(&content, terms);
        }

        Some(Box::new(QueryHit {
            score: 0.0,
            kind: response.kind,
            content,
            timestamp: response.timestamp,
            session_id: response.session_id.clone(),
            source_file: response.source_file.clone(),
            paired_response: None,
        }))
    }
}

/// Total rank order: score desc, timestamp desc, source path asc.
fn rank_order(corpus: &Corpus, a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| {
            let da = &corpus.documents[a.0];
            let db = &corpus.documents[b.0];
            db.timestamp
                .cmp(&da.timestamp)
                .then_with(|| da.source_file.cmp(&db.source_file))
        })
}
