//! In-memory matching for providers that see names before filtering.

use super::tokens::{QueryToken, TokenKind};
use crate::{PartSearchError, Result};
use regex::Regex;

/// Compiled form of a query, applying the same token semantics as the
/// index store's `LIKE` clauses.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    patterns: Vec<Regex>,
}

impl NameMatcher {
    pub fn new(tokens: &[QueryToken]) -> Result<Self> {
        let patterns = tokens
            .iter()
            .map(|token| {
                let source = match token.kind {
                    TokenKind::Glob => format!("(?i)^{}$", glob_to_regex(&token.text)),
                    TokenKind::Term | TokenKind::Phrase => {
                        format!("(?i){}", regex::escape(&token.text))
                    }
                };
                Regex::new(&source).map_err(|e| {
                    PartSearchError::Other(format!("Invalid query pattern {:?}: {}", token.text, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// True when every token matches the name or the full path.
    pub fn matches(&self, name: &str, path: &str) -> bool {
        self.patterns
            .iter()
            .all(|re| re.is_match(name) || re.is_match(path))
    }

    pub fn matches_everything(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut literal = String::new();
    for ch in glob.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { "(?s:.*)" } else { "(?s:.)" });
            }
            c => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::tokenize;

    fn matcher(query: &str) -> NameMatcher {
        NameMatcher::new(&tokenize(query)).unwrap()
    }

    #[test]
    fn test_prefix_glob_is_anchored() {
        let m = matcher("motor*");
        assert!(m.matches("motorhousing.sldprt", "/cad/motorhousing.sldprt"));
        assert!(!m.matches("housingmotor.pdf", "/cad/housingmotor.pdf"));
    }

    #[test]
    fn test_terms_are_unordered_substrings() {
        let m = matcher("motor housing");
        assert!(m.matches("housing_for_motor.pdf", "/x/housing_for_motor.pdf"));
        assert!(m.matches("MOTOR HOUSING.step", "/x/MOTOR HOUSING.step"));
        assert!(!m.matches("motor.pdf", "/x/motor.pdf"));
    }

    #[test]
    fn test_phrase_requires_adjacency() {
        let m = matcher(r#""motor housing""#);
        assert!(m.matches("Motor Housing rev2.pdf", "/x/Motor Housing rev2.pdf"));
        assert!(!m.matches("housing motor.pdf", "/x/housing motor.pdf"));
    }

    #[test]
    fn test_term_can_match_path() {
        let m = matcher("bracket");
        assert!(m.matches("rev2.pdf", "/projects/Bracket/rev2.pdf"));
    }

    #[test]
    fn test_question_mark_and_regex_metacharacters() {
        let m = matcher("part-?.s*");
        assert!(m.matches("part-1.sldprt", "/x/part-1.sldprt"));
        assert!(!m.matches("part-12.sldprt", "/x/part-12.sldprt"));
        assert!(matcher("(v2)").matches("bolt (v2).step", "/x/bolt (v2).step"));
    }

    #[test]
    fn test_empty_matches_everything() {
        let m = matcher("");
        assert!(m.matches_everything());
        assert!(m.matches("anything", "/anything"));
    }
}
