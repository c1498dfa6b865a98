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

//! Sessionlog CLI
//!
//! Command-line surface over the event log: `capture` is the host's ingestion
//! channel and must never fail it, the remaining subcommands are read-side
//! tooling for the stored sessions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sessionlog_core::{Event, EventKind, LogConfig};
use sessionlog_index::{DateRange, SearchFilter};
use sessionlog_query::{
    format_response, format_stats, HttpEmbeddingProvider, OutputFormat, QueryEngine, QueryRequest,
    DEFAULT_LIMIT,
};
use sessionlog_storage::{render, write_report, CapturePipeline, EventStore, SummaryCache};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sessionlog")]
#[command(about = "Append-only conversation event log with search", long_about = None)]
struct Cli {
    /// Log root directory (falls back to SESSIONLOG_ROOT, then ./sessionlog-data)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one event. Never fails the caller: faults are logged and
    /// swallowed, exit code is always 0.
    Capture {
        /// Session identifier
        #[arg(long)]
        session: String,

        /// Event kind (e.g. user_turn, tool_invocation_start, context_reset)
        kind: EventKind,

        /// Payload as a JSON object; reads stdin when omitted and stdin is
        /// not a terminal, otherwise defaults to an empty payload
        #[arg(long)]
        payload: Option<String>,
    },

    /// Rank stored events against a query
    Search {
        /// Query text
        query: String,

        /// Restrict to event kinds (repeatable)
        #[arg(long = "kind")]
        kinds: Vec<EventKind>,

        /// Inclusive date range, `YYYY-MM-DD..YYYY-MM-DD`
        #[arg(long)]
        date_range: Option<String>,

        /// Restrict to one session
        #[arg(long)]
        session: Option<String>,

        /// Maximum results
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Return complete event text instead of snippets
        #[arg(long)]
        full_content: bool,

        /// Pair user turns with the following assistant turn
        #[arg(long)]
        pairs: bool,

        /// Mark matched terms in the output
        #[arg(long)]
        highlight: bool,

        /// Blend embedding similarity into the ranking when a backend is
        /// configured; silently stays lexical otherwise
        #[arg(long)]
        hybrid: bool,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Aggregate counts over stored events
    Stats {
        #[arg(long = "kind")]
        kinds: Vec<EventKind>,

        #[arg(long)]
        date_range: Option<String>,

        #[arg(long)]
        session: Option<String>,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Regenerate a session's markdown report from its log
    Render {
        #[arg(long)]
        session: String,
    },

    /// Summary cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Delete a session's summary cache; summaries regenerate on demand
    Clear {
        #[arg(long)]
        session: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => LogConfig::default().resolved_root(),
    };

    if let Commands::Capture {
        session,
        kind,
        payload,
    } = &cli.command
    {
        // capture is fail-open end to end, exit code included
        run_capture(&root, session, *kind, payload.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = LogConfig::load(&root).context("malformed sessionlog.toml")?;

    match cli.command {
        Commands::Capture { .. } => unreachable!(), // handled above
        Commands::Search {
            query,
            kinds,
            date_range,
            session,
            limit,
            full_content,
            pairs,
            highlight,
            hybrid,
            json,
        } => {
            let mut engine = QueryEngine::new(&root);
            if hybrid {
                match HttpEmbeddingProvider::from_config(&config) {
                    Some(provider) => engine = engine.with_embedder(Box::new(provider)),
                    None => debug!("no embedding backend configured, ranking stays lexical"),
                }
            }

            let request = QueryRequest {
                query,
                filter: build_filter(kinds, date_range, session)?,
                limit,
                full_content,
                pairs,
                highlight,
                hybrid,
            };
            let response = engine.search(&request)?;
            print!("{}", format_response(&response, output_format(json))?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Stats {
            kinds,
            date_range,
            session,
            json,
        } => {
            let engine = QueryEngine::new(&root);
            let filter = build_filter(kinds, date_range, session)?;
            let report = engine.stats(&filter)?;
            print!("{}", format_stats(&report, output_format(json))?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Render { session } => {
            let store = EventStore::open(&root)?;
            let paths = store.session_paths(&session)?;
            let records = store.read_session(&session)?;
            if records.skipped_lines > 0 {
                warn!(
                    skipped = records.skipped_lines,
                    "corrupt lines excluded from report"
                );
            }

            let cache = SummaryCache::load(&paths.summaries);
            let report = render(&records.records, Some(&cache));
            write_report(&paths.report, &report)?;
            println!("✓ Rendered {}", paths.report.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Cache {
            command: CacheCommands::Clear { session },
        } => {
            let store = EventStore::open(&root)?;
            let paths = store.session_paths(&session)?;
            SummaryCache::load(&paths.summaries).clear()?;
            println!("✓ Cleared summary cache for session {session}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the ingestion path. All faults are logged and swallowed so the host
/// conversation never sees an error from its own logging.
fn run_capture(root: &std::path::Path, session: &str, kind: EventKind, payload: Option<&str>) {
    let payload = match payload_value(payload) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "unparseable payload, event dropped");
            return;
        }
    };

    let event = match event_from_parts(kind, payload) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, kind = %kind, "payload does not match event kind, event dropped");
            return;
        }
    };

    let config = match LogConfig::load(root) {
        Ok(config) => config,
        Err(error) => {
            warn!(%error, "malformed config, using defaults");
            LogConfig {
                log_root: Some(root.to_path_buf()),
                ..LogConfig::default()
            }
        }
    };

    let pipeline = match CapturePipeline::new(&config) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            warn!(%error, "log root unavailable, event dropped");
            return;
        }
    };

    let outcome = pipeline.capture(session, event);
    debug!(
        appended = outcome.appended,
        summary = outcome.summary_attached,
        report = outcome.report_rendered,
        "capture finished"
    );
}

/// Resolve the payload JSON: explicit flag, else stdin when piped, else `{}`.
///
/// An interactive terminal is never read; blocking on it would stall the
/// host turn this command is supposed to log.
fn payload_value(payload: Option<&str>) -> Result<serde_json::Value> {
    match payload {
        Some(raw) => parse_payload(raw),
        None => {
            if std::io::stdin().is_terminal() {
                return parse_payload("");
            }
            let mut buffer = String::new();
            // ignore read errors from a closed stdin
            let _ = std::io::stdin().read_to_string(&mut buffer);
            parse_payload(&buffer)
        }
    }
}

/// Parse payload text; blank input means an empty payload.
fn parse_payload(raw: &str) -> Result<serde_json::Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(trimmed).context("payload is not valid JSON")
}

/// Assemble the tagged event representation and let serde check the payload
/// shape against the kind.
fn event_from_parts(kind: EventKind, payload: serde_json::Value) -> Result<Event> {
    let tagged = serde_json::json!({
        "kind": kind,
        "payload": payload,
    });
    serde_json::from_value(tagged).context("invalid event")
}

fn build_filter(
    kinds: Vec<EventKind>,
    date_range: Option<String>,
    session: Option<String>,
) -> Result<SearchFilter> {
    Ok(SearchFilter {
        kinds: if kinds.is_empty() { None } else { Some(kinds) },
        date_range: date_range.as_deref().map(DateRange::parse).transpose()?,
        session_id: session,
    })
}

fn output_format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_parts_user_turn() {
        let event = event_from_parts(
            EventKind::UserTurn,
            serde_json::json!({"text": "hello there"}),
        )
        .unwrap();
        assert_eq!(event.kind(), EventKind::UserTurn);
        assert_eq!(event.primary_text(), Some("hello there"));
    }

    #[test]
    fn test_event_from_parts_marker_takes_empty_payload() {
        let event = event_from_parts(EventKind::ContextReset, serde_json::json!({})).unwrap();
        assert_eq!(event.kind(), EventKind::ContextReset);
    }

    #[test]
    fn test_event_from_parts_rejects_mismatched_payload() {
        // user_turn requires a text field
        assert!(event_from_parts(EventKind::UserTurn, serde_json::json!({})).is_err());
    }

    #[test]
    fn test_payload_value_explicit() {
        let value = payload_value(Some(r#"{"text": "x"}"#)).unwrap();
        assert_eq!(value["text"], "x");
    }

    #[test]
    fn test_payload_value_rejects_garbage() {
        assert!(payload_value(Some("not json")).is_err());
    }

    #[test]
    fn test_parse_payload_blank_is_empty_object() {
        assert_eq!(parse_payload("").unwrap(), serde_json::json!({}));
        assert_eq!(parse_payload("  \n\t").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_build_filter_bad_range() {
        assert!(build_filter(Vec::new(), Some("nonsense".to_string()), None).is_err());
    }
}
