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

//! From-scratch BM25 over an in-memory corpus.
//!
//! ```text
//! score(q, d) = sum over t in q of
//!     idf(t) * tf(t,d) * (k1 + 1) / (tf(t,d) + k1 * (1 - b + b * |d| / avg_len))
//! idf(t) = ln((N - n_t + 0.5) / (n_t + 0.5) + 1)
//! ```
//!
//! A query term matches every document token it is a prefix of, so "auth"
//! reaches "authentication" without a stemmer; tf and n_t aggregate over the
//! matched tokens. Scores are a pure function of the corpus and query, so
//! repeated executions over a fixed corpus return identical rankings.

use crate::tokenize::tokenize;
use std::collections::HashMap;

/// Term-frequency saturation parameter.
pub const BM25_K1: f64 = 1.5;

/// Document-length normalization parameter.
pub const BM25_B: f64 = 0.75;

#[derive(Debug, Clone, Default)]
struct DocStats {
    term_freq: HashMap<String, usize>,
    len: usize,
}

/// In-memory BM25 statistics for one filtered corpus.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    docs: Vec<DocStats>,
    avg_len: f64,
}

impl Bm25Index {
    /// Build index statistics from document texts, in corpus order.
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut docs = Vec::new();

        for text in texts {
            let tokens = tokenize(text);
            let mut term_freq: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *term_freq.entry(token.clone()).or_default() += 1;
            }
            docs.push(DocStats {
                len: tokens.len(),
                term_freq,
            });
        }

        let total_len: usize = docs.iter().map(|d| d.len).sum();
        let avg_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };

        Self { docs, avg_len }
    }

    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    /// Total frequency of tokens matched by `term` in one document.
    fn term_frequency(stats: &DocStats, term: &str) -> usize {
        stats
            .term_freq
            .iter()
            .filter(|(token, _)| token.starts_with(term))
            .map(|(_, count)| count)
            .sum()
    }

    /// Inverse document frequency of a term over this corpus, counting a
    /// document once however many of its tokens the term matches.
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let n_t = self
            .docs
            .iter()
            .filter(|d| d.term_freq.keys().any(|token| token.starts_with(term)))
            .count() as f64;
        ((n - n_t + 0.5) / (n_t + 0.5) + 1.0).ln()
    }

    /// BM25 score of one document against pre-tokenized query terms.
    ///
    /// Zero when no query term matches a token of the document.
    pub fn score(&self, query_terms: &[String], doc: usize) -> f64 {
        let Some(stats) = self.docs.get(doc) else {
            return 0.0;
        };
        if stats.len == 0 {
            return 0.0;
        }

        let norm = 1.0 - BM25_B + BM25_B * stats.len as f64 / self.avg_len;
        query_terms
            .iter()
            .map(|term| {
                let tf = Self::term_frequency(stats, term) as f64;
                if tf == 0.0 {
                    return 0.0;
                }
                self.idf(term) * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * norm)
            })
            .sum()
    }

    /// Score every document, in corpus order.
    pub fn score_all(&self, query_terms: &[String]) -> Vec<f64> {
        (0..self.docs.len())
            .map(|doc| self.score(query_terms, doc))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn test_matching_docs_outscore_non_matching() {
        let index = Bm25Index::build([
            "fix auth bug",
            "Fixed the authentication issue by updating the token validator",
            "deploy to prod",
        ]);
        let scores = index.score_all(&query("auth"));
        // "auth" reaches both the exact token and "authentication"
        assert!(scores[0] > scores[2]);
        assert!(scores[1] > scores[2]);
        assert!(scores[0] > 0.0);
        assert!(scores[1] > 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_prefix_matching_is_not_substring_matching() {
        let index = Bm25Index::build(["reauthorize the deploy"]);
        // "auth" occurs mid-token only
        assert_eq!(index.score_all(&query("auth")), vec![0.0]);
        assert!(index.score_all(&query("reauth"))[0] > 0.0);
    }

    #[test]
    fn test_deterministic_scores() {
        let corpus = ["alpha beta gamma", "beta beta delta", "gamma delta"];
        let a = Bm25Index::build(corpus).score_all(&query("beta gamma"));
        let b = Bm25Index::build(corpus).score_all(&query("beta gamma"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let index = Bm25Index::build([
            "common rare",
            "common other",
            "common thing",
            "common stuff",
        ]);
        // both terms appear once in doc 0, but "rare" is corpus-rare
        assert!(index.idf("rare") > index.idf("common"));
        assert!(
            index.score(&query("rare"), 0) > index.score(&query("common"), 0),
            "rarer term should contribute a higher score"
        );
    }

    #[test]
    fn test_length_normalization() {
        let index = Bm25Index::build([
            "needle",
            "needle plus quite many additional words padding out document length considerably",
        ]);
        let scores = index.score_all(&query("needle"));
        assert!(scores[0] > scores[1], "shorter match should score higher");
    }

    #[test]
    fn test_idf_formula() {
        let index = Bm25Index::build(["x y", "x z", "w v"]);
        // N=3, n_t=2 for "x": ln((3-2+0.5)/(2+0.5)+1)
        let expected = ((3.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0_f64).ln();
        assert!((index.idf("x") - expected).abs() < 1e-12);
        // unseen term: n_t=0
        let unseen = ((3.0 + 0.5) / 0.5 + 1.0_f64).ln();
        assert!((index.idf("absent") - unseen).abs() < 1e-12);
    }

    #[test]
    fn test_empty_corpus_and_empty_doc() {
        let index = Bm25Index::build([]);
        assert_eq!(index.doc_count(), 0);
        assert_eq!(index.score(&query("x"), 0), 0.0);

        let index = Bm25Index::build(["", "has content"]);
        assert_eq!(index.score(&query("content"), 0), 0.0);
        assert!(index.score(&query("content"), 1) > 0.0);
    }
}
