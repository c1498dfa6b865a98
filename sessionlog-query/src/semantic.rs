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

//! Hybrid semantic extension.
//!
//! Capability negotiation, not a hard dependency: when an embedding backend
//! is configured, BM25 scores are min-max normalized, cosine similarity is
//! mapped from [-1, 1] to [0, 1], and the two are combined by the documented
//! weighted sum. When no backend is available the engine falls back to pure
//! BM25 with identical external behavior, and this is never an error.

use sessionlog_core::{LogConfig, Result, SessionlogError};
use std::time::Duration;

/// Weight of the normalized lexical (BM25) score in the blend.
pub const LEXICAL_WEIGHT: f64 = 0.6;

/// Weight of the normalized embedding similarity in the blend.
pub const SEMANTIC_WEIGHT: f64 = 0.4;

/// Embedding backend seam.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Blocking client for an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbeddingProvider {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    /// Build from config, or `None` when no credentials are configured.
    pub fn from_config(config: &LogConfig) -> Option<Self> {
        let api_key = config.embedding_api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.embedding.timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            client,
            api_url: config.embedding.api_url.clone(),
            api_key,
            model: config.embedding.model.clone(),
            dimension: 1536,
        })
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({ "model": self.model, "input": text });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SessionlogError::Embedding(e.to_string()))?
            .error_for_status()
            .map_err(|e| SessionlogError::Embedding(e.to_string()))?;

        let value: serde_json::Value = response
            .json()
            .map_err(|e| SessionlogError::Embedding(e.to_string()))?;

        value["data"][0]["embedding"]
            .as_array()
            .map(|xs| {
                xs.iter()
                    .filter_map(|x| x.as_f64())
                    .map(|x| x as f32)
                    .collect()
            })
            .ok_or_else(|| SessionlogError::Embedding("missing embedding in response".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity between two vectors. Zero on mismatched or degenerate
/// input rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a < 1e-8 || norm_b < 1e-8 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Blend BM25 and embedding similarity over one candidate set.
///
/// `texts` and `bm25_scores` are parallel. BM25 is min-max normalized over
/// the candidates (a flat set normalizes to 1.0); cosine is mapped from
/// [-1, 1] to [0, 1]. Result is `0.6 * lexical + 0.4 * semantic`.
pub fn blend(
    provider: &dyn EmbeddingProvider,
    query: &str,
    texts: &[&str],
    bm25_scores: &[f64],
) -> Result<Vec<f64>> {
    debug_assert_eq!(texts.len(), bm25_scores.len());
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = provider.embed(query)?;

    let min = bm25_scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = bm25_scores
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let mut blended = Vec::with_capacity(texts.len());
    for (text, &bm25) in texts.iter().zip(bm25_scores) {
        let doc_vec = provider.embed(text)?;
        let cosine = cosine_similarity(&query_vec, &doc_vec) as f64;
        let semantic = (cosine + 1.0) / 2.0;
        let lexical = if range > 0.0 { (bm25 - min) / range } else { 1.0 };
        blended.push(LEXICAL_WEIGHT * lexical + SEMANTIC_WEIGHT * semantic);
    }
    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic provider: counts occurrences of three probe words.
    struct ProbeProvider;

    impl EmbeddingProvider for ProbeProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("auth").count() as f32,
                lower.matches("deploy").count() as f32,
                1.0,
            ])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct BrokenProvider;

    impl EmbeddingProvider for BrokenProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(SessionlogError::Embedding("offline".to_string()))
        }

        fn dimension(&self) -> usize {
            0
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_blend_prefers_semantic_neighbors() {
        let texts = ["auth auth related", "deploy pipeline"];
        let bm25 = [1.0, 1.0]; // lexical tie
        let blended = blend(&ProbeProvider, "auth problem", &texts, &bm25).unwrap();
        assert!(blended[0] > blended[1]);
    }

    #[test]
    fn test_blend_respects_weights() {
        let texts = ["x"];
        let blended = blend(&ProbeProvider, "y", &texts, &[2.5]).unwrap();
        // single candidate: lexical normalizes to 1.0
        let cosine = {
            let q = ProbeProvider.embed("y").unwrap();
            let d = ProbeProvider.embed("x").unwrap();
            cosine_similarity(&q, &d) as f64
        };
        let expected = LEXICAL_WEIGHT + SEMANTIC_WEIGHT * (cosine + 1.0) / 2.0;
        assert!((blended[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_blend_failure_is_an_error_for_caller_to_downgrade() {
        let result = blend(&BrokenProvider, "q", &["doc"], &[1.0]);
        assert!(matches!(result, Err(SessionlogError::Embedding(_))));
    }

    #[test]
    fn test_blend_empty_candidates() {
        assert!(blend(&ProbeProvider, "q", &[], &[]).unwrap().is_empty());
    }
}
