//! SQL forms of a parsed query for the index store.

use super::tokens::{QueryToken, TokenKind};
use crate::config::StoreConfig;

/// Quote a fragment for an FTS5 MATCH expression.
///
/// Always quoted: the trigram tokenizer treats the quoted string as a
/// literal substring, punctuation included.
pub fn escape_fts5_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Escape `\`, `%` and `_` for a `LIKE … ESCAPE '\'` pattern.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Anchored LIKE pattern for a wildcard token.
pub fn glob_to_like(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len());
    for ch in glob.chars() {
        match ch {
            '*' => out.push('%'),
            '?' => out.push('_'),
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// Build the FTS5 prefilter: every literal fragment long enough for the
/// trigram tokenizer, ANDed. `None` when no fragment qualifies.
pub fn build_fts5_query(tokens: &[QueryToken]) -> Option<String> {
    let parts: Vec<String> = tokens
        .iter()
        .flat_map(|token| token.fragments())
        .filter(|fragment| fragment.chars().count() >= StoreConfig::FTS_MIN_FRAGMENT_CHARS)
        .map(escape_fts5_term)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

/// SQL scalar function that lower-cases with full Unicode rules. SQLite's
/// own `LIKE` folds ASCII only, so both sides of every pattern go through it.
pub const CASEFOLD_FUNCTION: &str = "casefold";

/// A `WHERE` fragment over the `name` and `path` columns plus its
/// positional parameters. Patterns are already folded; the stored columns
/// are folded with [`CASEFOLD_FUNCTION`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeFilter {
    pub clause: String,
    pub params: Vec<String>,
}

impl LikeFilter {
    pub fn from_tokens(tokens: &[QueryToken]) -> Self {
        if tokens.is_empty() {
            return Self {
                clause: "1=1".to_string(),
                params: Vec::new(),
            };
        }

        let mut clauses = Vec::with_capacity(tokens.len());
        let mut params = Vec::with_capacity(tokens.len() * 2);
        for token in tokens {
            let text = token.text.to_lowercase();
            let pattern = match token.kind {
                TokenKind::Glob => glob_to_like(&text),
                TokenKind::Term | TokenKind::Phrase => format!("%{}%", escape_like(&text)),
            };
            clauses.push(format!(
                "({f}(name) LIKE ? ESCAPE '\\' OR {f}(path) LIKE ? ESCAPE '\\')",
                f = CASEFOLD_FUNCTION
            ));
            params.push(pattern.clone());
            params.push(pattern);
        }

        Self {
            clause: clauses.join(" AND "),
            params,
        }
    }
}
