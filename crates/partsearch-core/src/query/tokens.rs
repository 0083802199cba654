//! Query tokenization.

/// How a token matches a name or path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: case-insensitive substring.
    Term,
    /// Word containing `*` or `?`: anchored wildcard match against the whole
    /// name or the whole path.
    Glob,
    /// Double-quoted text: literal substring, words adjacent and in order.
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    pub kind: TokenKind,
    pub text: String,
}

impl QueryToken {
    pub fn phrase(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Phrase,
            text: text.into(),
        }
    }

    /// Classify an unquoted word.
    pub fn word(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if text.contains(['*', '?']) {
            TokenKind::Glob
        } else {
            TokenKind::Term
        };
        Self { kind, text }
    }

    /// Literal runs between wildcards. Terms and phrases are one run.
    pub fn fragments(&self) -> Vec<&str> {
        match self.kind {
            TokenKind::Glob => self
                .text
                .split(['*', '?'])
                .filter(|f| !f.is_empty())
                .collect(),
            TokenKind::Term | TokenKind::Phrase => vec![self.text.as_str()],
        }
    }

    /// Token text with wildcard characters removed.
    pub fn stripped(&self) -> String {
        self.text.replace(['*', '?'], "")
    }
}

/// Split on whitespace, keeping double-quoted runs together as phrases.
///
/// An unterminated quote runs to the end of the input. Empty phrases are
/// dropped.
pub fn tokenize(raw: &str) -> Vec<QueryToken> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in raw.chars() {
        match ch {
            '"' if in_quote => {
                push_phrase(&mut tokens, &current);
                current.clear();
                in_quote = false;
            }
            '"' => {
                push_word(&mut tokens, &current);
                current.clear();
                in_quote = true;
            }
            c if c.is_whitespace() && !in_quote => {
                push_word(&mut tokens, &current);
                current.clear();
            }
            c => current.push(c),
        }
    }

    if in_quote {
        push_phrase(&mut tokens, &current);
    } else {
        push_word(&mut tokens, &current);
    }
    tokens
}

fn push_word(tokens: &mut Vec<QueryToken>, word: &str) {
    if !word.is_empty() {
        tokens.push(QueryToken::word(word));
    }
}

fn push_phrase(tokens: &mut Vec<QueryToken>, phrase: &str) {
    let phrase = phrase.trim();
    if !phrase.is_empty() {
        tokens.push(QueryToken::phrase(phrase));
    }
}
