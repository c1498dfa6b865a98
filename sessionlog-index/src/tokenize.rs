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

//! Tokenizer for indexing and queries.
//!
//! Normalization is deliberately minimal: case-fold, split on
//! non-alphanumeric characters, drop a fixed stop-word set. There is no
//! stemming; "token" and "tokens" stay distinct terms, and the prefix rule
//! applied at scoring time is the only widening.

/// Fixed stop-word set removed from both documents and queries.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Tokenize text for indexing or querying.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_folding_and_splitting() {
        assert_eq!(
            tokenize("Fix the Auth-Bug, please!"),
            vec!["fix", "auth", "bug", "please"]
        );
    }

    #[test]
    fn test_stop_words_removed() {
        assert_eq!(tokenize("the cat and the hat"), vec!["cat", "hat"]);
    }

    #[test]
    fn test_no_stemming() {
        // exact post-lowercase equality: plural stays distinct
        assert_eq!(tokenize("token tokens"), vec!["token", "tokens"]);
    }

    #[test]
    fn test_numbers_kept() {
        assert_eq!(tokenize("error 404 went away"), vec!["error", "404", "went", "away"]);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("--- ... !!!").is_empty());
    }
}
