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

//! Result formatting for the CLI: human-readable text or line-stable JSON.

use sessionlog_core::Result;

use crate::engine::{QueryHit, QueryResponse, StatsReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a search response in the requested format.
pub fn format_response(response: &QueryResponse, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        OutputFormat::Text => Ok(format_text(response)),
    }
}

fn format_text(response: &QueryResponse) -> String {
    let mut out = String::new();

    if response.results.is_empty() {
        out.push_str("no results\n");
    }
    for (rank, hit) in response.results.iter().enumerate() {
        out.push_str(&format_hit(rank + 1, hit));
        if let Some(paired) = &hit.paired_response {
            out.push_str(&format!("   ↳ response: {}\n", paired.content));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{} results over {} indexed events",
        response.results.len(),
        response.total_indexed
    ));
    if response.skipped_lines > 0 {
        out.push_str(&format!(" ({} corrupt lines skipped)", response.skipped_lines));
    }
    out.push('\n');
    out
}

fn format_hit(rank: usize, hit: &QueryHit) -> String {
    format!(
        "{rank}. [{score:.4}] {kind} {timestamp} session={session}\n   {content}\n   {source}\n",
        score = hit.score,
        kind = hit.kind,
        timestamp = hit.timestamp.format("%Y-%m-%d %H:%M:%S"),
        session = hit.session_id,
        content = hit.content,
        source = hit.source_file.display(),
    )
}

/// Render a stats report in the requested format.
pub fn format_stats(report: &StatsReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("total events: {}\n", report.total));
            if report.skipped_lines > 0 {
                out.push_str(&format!("corrupt lines skipped: {}\n", report.skipped_lines));
            }

            out.push_str("\nby kind:\n");
            for (kind, count) in &report.by_kind {
                out.push_str(&format!("  {kind:<24} {count}\n"));
            }
            out.push_str("\nby session:\n");
            for (session, count) in &report.by_session {
                out.push_str(&format!("  {session:<24} {count}\n"));
            }
            out.push_str("\nby date:\n");
            for (date, count) in &report.by_date {
                out.push_str(&format!("  {date:<24} {count}\n"));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sessionlog_core::EventKind;
    use std::path::PathBuf;

    fn sample_response() -> QueryResponse {
        QueryResponse {
            results: vec![QueryHit {
                score: 1.2345,
                kind: EventKind::UserTurn,
                content: "fix **auth** bug".to_string(),
                timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
                session_id: "s1".to_string(),
                source_file: PathBuf::from("2025-06-01/090000-s1.jsonl"),
                paired_response: None,
            }],
            total_indexed: 3,
            skipped_lines: 1,
        }
    }

    #[test]
    fn test_text_format_mentions_counters() {
        let text = format_response(&sample_response(), OutputFormat::Text).unwrap();
        assert!(text.contains("1 results over 3 indexed events"));
        assert!(text.contains("1 corrupt lines skipped"));
        assert!(text.contains("fix **auth** bug"));
        assert!(text.contains("session=s1"));
    }

    #[test]
    fn test_json_format_round_trips() {
        let json = format_response(&sample_response(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_indexed"], 3);
        assert_eq!(value["skipped_lines"], 1);
        assert_eq!(value["results"][0]["kind"], "user_turn");
        // absent pairing never serializes
        assert!(value["results"][0].get("paired_response").is_none());
    }

    #[test]
    fn test_empty_response_text() {
        let response = QueryResponse {
            results: Vec::new(),
            total_indexed: 0,
            skipped_lines: 0,
        };
        let text = format_response(&response, OutputFormat::Text).unwrap();
        assert!(text.contains("no results"));
    }

    #[test]
    fn test_stats_text() {
        let mut report = StatsReport {
            total: 3,
            skipped_lines: 0,
            by_kind: Default::default(),
            by_session: Default::default(),
            by_date: Default::default(),
        };
        report.by_kind.insert("user_turn".to_string(), 2);
        report.by_session.insert("s1".to_string(), 3);
        report.by_date.insert("2025-06-01".to_string(), 3);

        let text = format_stats(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("total events: 3"));
        assert!(text.contains("user_turn"));
        assert!(!text.contains("corrupt lines"));
    }
}
