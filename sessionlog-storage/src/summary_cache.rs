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

//! Content-hash-keyed summary memoization.
//!
//! The cache is a pure optimization: absence is always safe, entries are
//! immutable once written for a given fingerprint, and a miss triggers
//! exactly one generation call. It is an explicit object passed into the
//! capture pipeline and renderer, never a hidden singleton; state lives in
//! a per-session JSON file beside the event log.

use parking_lot::RwLock;
use sessionlog_core::{LogConfig, Result, SessionlogError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Instruction sent with every summarization request.
const SUMMARY_PROMPT: &str =
    "Summarize the following exchange from an agent session in one short sentence.";

/// External summary generation seam.
///
/// Production uses [`HttpSummarizer`]; tests substitute deterministic stubs.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> Result<String>;
}

/// Blocking client for an OpenAI-compatible chat-completions endpoint.
///
/// Constructed only when an API key is present; the request timeout is a
/// hard bound so a slow backend can never stall capture.
pub struct HttpSummarizer {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpSummarizer {
    /// Build from config, or `None` when no credentials are configured.
    pub fn from_config(config: &LogConfig) -> Option<Self> {
        let api_key = config.summary_api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.summary.timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            client,
            api_url: config.summary.api_url.clone(),
            api_key,
            model: config.summary.model.clone(),
        })
    }
}

impl Summarizer for HttpSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SUMMARY_PROMPT},
                {"role": "user", "content": text},
            ],
            "max_tokens": 60,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SessionlogError::Summary(e.to_string()))?
            .error_for_status()
            .map_err(|e| SessionlogError::Summary(e.to_string()))?;

        let value: serde_json::Value = response
            .json()
            .map_err(|e| SessionlogError::Summary(e.to_string()))?;

        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SessionlogError::Summary("empty completion".to_string()))
    }
}

/// File-backed memoization store keyed by event fingerprint.
pub struct SummaryCache {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl SummaryCache {
    /// Load the cache file if present. A missing or malformed file yields an
    /// empty cache; the store is regenerable and never worth failing over.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(path = %path.display(), %error, "malformed summary cache, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stored summary for a fingerprint, if any.
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        self.entries.read().get(fingerprint).cloned()
    }

    /// Memoized summary lookup.
    ///
    /// On a hit the stored value is returned and the summarizer is not
    /// called. On a miss the summarizer is invoked exactly once; success is
    /// stored and persisted, any failure degrades to `None` without
    /// propagating.
    pub fn get_or_generate(
        &self,
        fingerprint: &str,
        text: &str,
        summarizer: &dyn Summarizer,
    ) -> Option<String> {
        if let Some(existing) = self.get(fingerprint) {
            return Some(existing);
        }

        match summarizer.summarize(text) {
            Ok(summary) => {
                self.entries
                    .write()
                    .insert(fingerprint.to_string(), summary.clone());
                if let Err(error) = self.persist() {
                    // entry stays usable in memory; the file is best-effort
                    warn!(path = %self.path.display(), %error, "failed to persist summary cache");
                }
                Some(summary)
            }
            Err(error) => {
                debug!(%error, "summary generation failed, continuing without");
                None
            }
        }
    }

    /// Drop every entry and remove the cache file.
    pub fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let entries = self.entries.read();
        let raw = serde_json::to_string_pretty(&*entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSummarizer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSummarizer {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl Summarizer for CountingSummarizer {
        fn summarize(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SessionlogError::Summary("no backend".to_string()))
            } else {
                Ok(format!("summary of: {text}"))
            }
        }
    }

    #[test]
    fn test_miss_generates_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SummaryCache::load(dir.path().join("c.summaries.json"));
        let summarizer = CountingSummarizer::new(false);

        let first = cache.get_or_generate("fp1", "hello", &summarizer);
        let second = cache.get_or_generate("fp1", "hello", &summarizer);

        assert_eq!(first.as_deref(), Some("summary of: hello"));
        assert_eq!(first, second);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SummaryCache::load(dir.path().join("c.summaries.json"));
        let summarizer = CountingSummarizer::new(true);

        assert!(cache.get_or_generate("fp1", "hello", &summarizer).is_none());
        assert!(cache.is_empty());
        // a later retry is allowed: failure is not memoized
        assert!(cache.get_or_generate("fp1", "hello", &summarizer).is_none());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.summaries.json");
        let summarizer = CountingSummarizer::new(false);

        let cache = SummaryCache::load(&path);
        cache.get_or_generate("fp1", "hello", &summarizer);

        let reloaded = SummaryCache::load(&path);
        assert_eq!(reloaded.get("fp1").as_deref(), Some("summary of: hello"));
        // reload serves from the store, not the summarizer
        reloaded.get_or_generate("fp1", "hello", &summarizer);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.summaries.json");
        std::fs::write(&path, "not json at all").unwrap();
        let cache = SummaryCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.summaries.json");
        let cache = SummaryCache::load(&path);
        cache.get_or_generate("fp1", "hi", &CountingSummarizer::new(false));
        assert!(path.exists());

        cache.clear().unwrap();
        assert!(!path.exists());
        assert!(cache.is_empty());
        // clearing an already-clear cache is fine
        cache.clear().unwrap();
    }
}
