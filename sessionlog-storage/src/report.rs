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

//! Derived report renderer.
//!
//! Pure function from a session's ordered event list to a markdown
//! document. The report is never authoritative: it is fully regenerated
//! from the event log on every triggering event and overwritten atomically,
//! so rendering twice on the same input is byte-identical by construction.
//! There is no incremental patching against a previous render.

use chrono::{DateTime, Utc};
use sessionlog_core::{fingerprint, Event, EventRecord, Result};
use std::path::Path;

use crate::summary_cache::SummaryCache;

/// Free-text bodies longer than this are folded behind `<details>`.
pub const FOLD_THRESHOLD_CHARS: usize = 400;

fn stamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn fold(label: &str, body: &str) -> String {
    format!("<details>\n<summary>{label}</summary>\n\n{body}\n\n</details>\n")
}

fn folded_text(text: &str) -> String {
    if text.chars().count() > FOLD_THRESHOLD_CHARS {
        fold(&format!("Response ({} chars)", text.chars().count()), text)
    } else {
        format!("{text}\n")
    }
}

/// Render one session's ordered records as markdown.
///
/// The summary cache is consulted read-only; a missing summary renders
/// nothing extra. Tool invocations between two turns are grouped into a
/// single folded block under the turn that preceded them.
pub fn render(records: &[EventRecord], cache: Option<&SummaryCache>) -> String {
    let mut out = String::new();

    match records.first() {
        Some(first) => {
            out.push_str(&format!("# Session {}\n\n", first.session_id));
        }
        None => {
            out.push_str("# Session\n\n_No events recorded._\n");
            return out;
        }
    }

    // Pending tool lines, flushed as one folded block at each turn boundary.
    let mut tool_lines: Vec<String> = Vec::new();
    let mut tool_invocations = 0usize;

    for record in records {
        if !matches!(
            record.event,
            Event::ToolInvocationStart { .. } | Event::ToolInvocationEnd { .. }
        ) {
            flush_tools(&mut out, &mut tool_lines, &mut tool_invocations);
        }

        match &record.event {
            Event::SessionStart {} => {
                out.push_str(&format!(
                    "_Session started at {} (agent session {})_\n\n",
                    stamp(&record.timestamp),
                    record.agent_session_number
                ));
            }
            Event::SessionEnd {} => {
                out.push_str(&format!(
                    "_Session ended at {}_\n\n",
                    stamp(&record.timestamp)
                ));
            }
            Event::UserTurn { text } => {
                out.push_str(&format!("## {} — User\n\n", stamp(&record.timestamp)));
                out.push_str(&format!("{text}\n"));
                push_summary(&mut out, cache, record, text);
                out.push('\n');
            }
            Event::AssistantTurn { text } => {
                out.push_str(&format!("## {} — Assistant\n\n", stamp(&record.timestamp)));
                out.push_str(&folded_text(text));
                push_summary(&mut out, cache, record, text);
                out.push('\n');
            }
            Event::ToolInvocationStart {
                tool_name,
                tool_input,
            } => {
                tool_invocations += 1;
                tool_lines.push(format!(
                    "- `{}` → `{}` {}",
                    stamp(&record.timestamp),
                    tool_name,
                    tool_input
                ));
            }
            Event::ToolInvocationEnd { tool_name, result } => {
                tool_lines.push(format!(
                    "- `{}` ← `{}` {}",
                    stamp(&record.timestamp),
                    tool_name,
                    result
                ));
            }
            Event::SubAgentCompleted {
                agent_id,
                model,
                tools_used,
                response,
            } => {
                out.push_str(&format!(
                    "### {} — Sub-agent `{}`\n\n",
                    stamp(&record.timestamp),
                    agent_id
                ));
                out.push_str(&format!("- model: `{model}`\n"));
                out.push_str(&format!("- tools: {}\n\n", tools_used.join(", ")));
                out.push_str(&folded_text(response));
                push_summary(&mut out, cache, record, response);
                out.push('\n');
            }
            Event::ContextReset {} => {
                out.push_str(&format!(
                    "---\n\n_{} Context reset — agent session {} begins_\n\n",
                    stamp(&record.timestamp),
                    record.agent_session_number + 1
                ));
            }
            Event::Notification { text } => {
                out.push_str(&format!("> {} — {}\n\n", stamp(&record.timestamp), text));
            }
            Event::PermissionRequested { kind } => {
                out.push_str(&format!(
                    "> {} — permission requested: {}\n\n",
                    stamp(&record.timestamp),
                    kind
                ));
            }
        }
    }

    flush_tools(&mut out, &mut tool_lines, &mut tool_invocations);
    out
}

fn flush_tools(out: &mut String, lines: &mut Vec<String>, invocations: &mut usize) {
    if lines.is_empty() {
        return;
    }
    let label = format!("Tool activity ({} invocations)", invocations);
    out.push_str(&fold(&label, &lines.join("\n")));
    out.push('\n');
    lines.clear();
    *invocations = 0;
}

fn push_summary(
    out: &mut String,
    cache: Option<&SummaryCache>,
    record: &EventRecord,
    text: &str,
) {
    let Some(cache) = cache else { return };
    let key = fingerprint(record.kind(), &record.timestamp, text);
    if let Some(summary) = cache.get(&key) {
        out.push_str(&format!("\n> {summary}\n"));
    }
}

/// Overwrite the report atomically: write a temp file beside the target,
/// then rename over it.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
