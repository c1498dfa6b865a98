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

//! Snippet extraction and term highlighting.
//!
//! Snippets are centered on the first matched term, not a naive prefix, and
//! bounded by the documented [`SNIPPET_CONTEXT_CHARS`] constant. This is the
//! only place result text is ever shortened; full-content mode bypasses it
//! entirely. Matching uses the same token-prefix rule as the index, so a
//! term that scored cannot fail to highlight.

/// Characters of context kept on each side of the first matched term.
pub const SNIPPET_CONTEXT_CHARS: usize = 120;

fn token_matches(token: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| token.starts_with(t.as_str()))
}

/// Find the char-index range of the first token a query term is a prefix of.
fn first_match(chars: &[char], terms: &[String]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_alphanumeric() {
            let start = i;
            while i < chars.len() && chars[i].is_alphanumeric() {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect::<String>().to_lowercase();
            if token_matches(&token, terms) {
                return Some((start, i));
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Extract a snippet centered on the first match location.
///
/// Without a match (e.g. highlighting a paired response that did not itself
/// score) the snippet falls back to a bounded prefix. Cut edges are marked
/// with an ellipsis; nothing is dropped silently.
pub fn extract(content: &str, terms: &[String]) -> String {
    let chars: Vec<char> = content.chars().collect();

    let (start, end) = match first_match(&chars, terms) {
        Some((s, e)) => (
            s.saturating_sub(SNIPPET_CONTEXT_CHARS),
            (e + SNIPPET_CONTEXT_CHARS).min(chars.len()),
        ),
        None => (0, (2 * SNIPPET_CONTEXT_CHARS).min(chars.len())),
    };

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}

/// Wrap every token a query term is a prefix of in `**..**`.
pub fn highlight(text: &str, terms: &[String]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_alphanumeric() {
            let start = i;
            while i < chars.len() && chars[i].is_alphanumeric() {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            if token_matches(&token.to_lowercase(), terms) {
                out.push_str("**");
                out.push_str(&token);
                out.push_str("**");
            } else {
                out.push_str(&token);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
