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

//! Configuration for the event log and its best-effort annotators.
//!
//! Defaults always work with no file present. A `sessionlog.toml` in the log
//! root can override the annotator endpoints; API keys come from the
//! environment only and are never written to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the log root directory.
pub const ROOT_ENV: &str = "SESSIONLOG_ROOT";

/// Environment variable holding the summarization API key.
pub const SUMMARY_KEY_ENV: &str = "SESSIONLOG_SUMMARY_API_KEY";

/// Environment variable holding the embedding API key.
pub const EMBEDDING_KEY_ENV: &str = "SESSIONLOG_EMBEDDING_API_KEY";

/// Default log root, relative to the working directory.
pub const DEFAULT_LOG_ROOT: &str = "sessionlog-data";

fn default_summary_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_summary_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// External summarization endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_url")]
    pub api_url: String,
    #[serde(default = "default_summary_model")]
    pub model: String,
    /// Hard request timeout. Summary generation must never stall capture.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_url: default_summary_url(),
            model: default_summary_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Optional embedding backend settings for hybrid ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub api_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_url(),
            model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Root directory holding `<date>/<start-time>-<session_id>.*` artifacts.
    #[serde(default)]
    pub log_root: Option<PathBuf>,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl LogConfig {
    /// Resolve the effective log root: explicit config, then `SESSIONLOG_ROOT`,
    /// then [`DEFAULT_LOG_ROOT`].
    pub fn resolved_root(&self) -> PathBuf {
        if let Some(root) = &self.log_root {
            return root.clone();
        }
        if let Ok(root) = std::env::var(ROOT_ENV) {
            if !root.is_empty() {
                return PathBuf::from(root);
            }
        }
        PathBuf::from(DEFAULT_LOG_ROOT)
    }

    /// Load `sessionlog.toml` from the given root if present; otherwise
    /// defaults. A malformed file is a hard error so misconfiguration is
    /// visible rather than silently ignored.
    pub fn load(root: &Path) -> Result<Self, toml::de::Error> {
        let path = root.join("sessionlog.toml");
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let mut config: LogConfig = toml::from_str(&raw)?;
                if config.log_root.is_none() {
                    config.log_root = Some(root.to_path_buf());
                }
                Ok(config)
            }
            Err(_) => Ok(Self {
                log_root: Some(root.to_path_buf()),
                ..Self::default()
            }),
        }
    }

    /// Summarization API key from the environment, if configured.
    pub fn summary_api_key(&self) -> Option<String> {
        std::env::var(SUMMARY_KEY_ENV).ok().filter(|k| !k.is_empty())
    }

    /// Embedding API key from the environment, if configured.
    pub fn embedding_api_key(&self) -> Option<String> {
        std::env::var(EMBEDDING_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
    }
}
