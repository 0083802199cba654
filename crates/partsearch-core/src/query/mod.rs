//! Query translation.
//!
//! A raw query string is parsed once into [`ParsedQuery`] and then rendered
//! into whatever each backend needs:
//! - an FTS5 trigram prefilter plus exact `LIKE` clauses for the index store
//! - a prefix-term [`HostQuery`] for operating-system search
//! - a regex [`NameMatcher`] for the live crawl and host post-filtering
//!
//! Token semantics are the same on every path. A bare word is a substring
//! of the name or path, a word with `*`/`?` is an anchored wildcard match
//! against the whole name or the whole path, and a quoted phrase is a
//! literal substring.

mod host;
mod matcher;
mod sql;
mod tokens;

pub use host::HostQuery;
pub use matcher::NameMatcher;
pub use sql::{
    build_fts5_query, escape_fts5_term, escape_like, glob_to_like, LikeFilter, CASEFOLD_FUNCTION,
};
pub use tokens::{tokenize, QueryToken, TokenKind};

use crate::Result;
use std::path::PathBuf;

/// A tokenized query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    raw: String,
    tokens: Vec<QueryToken>,
}

impl ParsedQuery {
    /// Parse a raw query.
    ///
    /// In ordered mode the words are folded, wildcards removed, into a
    /// single phrase so they must appear adjacent and in order.
    pub fn parse(raw: &str, ordered: bool) -> Self {
        let mut tokens = tokenize(raw);
        if ordered {
            let words: Vec<String> = tokens
                .iter()
                .map(|t| t.stripped())
                .filter(|w| !w.trim().is_empty())
                .collect();
            tokens = if words.is_empty() {
                Vec::new()
            } else {
                vec![QueryToken::phrase(words.join(" "))]
            };
        }
        Self {
            raw: raw.trim().to_string(),
            tokens,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[QueryToken] {
        &self.tokens
    }

    /// An empty query matches everything, most recently modified first.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// FTS5 MATCH expression, or `None` when no fragment is long enough.
    pub fn to_fts5(&self) -> Option<String> {
        build_fts5_query(&self.tokens)
    }

    pub fn to_like(&self) -> LikeFilter {
        LikeFilter::from_tokens(&self.tokens)
    }

    pub fn to_host(&self, scope: &[PathBuf]) -> HostQuery {
        HostQuery::from_tokens(&self.tokens, scope)
    }

    pub fn matcher(&self) -> Result<NameMatcher> {
        NameMatcher::new(&self.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unordered() {
        let q = ParsedQuery::parse(" motor housing ", false);
        assert_eq!(q.raw(), "motor housing");
        assert_eq!(q.tokens().len(), 2);
        assert!(!q.is_empty());
    }

    #[test]
    fn test_parse_ordered_folds_into_phrase() {
        let q = ParsedQuery::parse(r#"motor* "left housing""#, true);
        assert_eq!(q.tokens(), &[QueryToken::phrase("motor left housing")]);
    }

    #[test]
    fn test_empty_query() {
        let q = ParsedQuery::parse("   ", false);
        assert!(q.is_empty());
        assert_eq!(q.to_fts5(), None);
        assert_eq!(q.to_like().clause, "1=1");
        assert!(ParsedQuery::parse("* ?", true).is_empty());
    }

    #[test]
    fn test_ordered_matcher() {
        let m = ParsedQuery::parse("motor housing", true).matcher().unwrap();
        assert!(m.matches("motor housing.pdf", "/x/motor housing.pdf"));
        assert!(!m.matches("housing motor.pdf", "/x/housing motor.pdf"));
    }
}
