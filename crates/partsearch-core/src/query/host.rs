//! Query forms for operating-system search facilities.

use super::tokens::QueryToken;
use std::path::PathBuf;

/// Prefix terms plus an optional scope, rendered per host backend.
///
/// Host facilities only understand word prefixes, so results are broader
/// than the query; providers post-filter with a [`super::NameMatcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostQuery {
    pub terms: Vec<String>,
    pub scope: Vec<PathBuf>,
}

impl HostQuery {
    pub fn from_tokens(tokens: &[QueryToken], scope: &[PathBuf]) -> Self {
        let terms = tokens
            .iter()
            .map(|token| token.stripped().trim().to_string())
            .filter(|term| !term.is_empty())
            .collect();
        Self {
            terms,
            scope: scope.to_vec(),
        }
    }

    /// Windows Search SQL against `SYSTEMINDEX`.
    pub fn to_windows_sql(&self, limit: usize) -> String {
        let mut clauses: Vec<String> = self
            .terms
            .iter()
            .map(|term| {
                let term = term.replace('"', "").replace('\'', "''");
                format!("CONTAINS(System.FileName, '\"{}*\"')", term)
            })
            .collect();
        if clauses.is_empty() {
            clauses.push("1=1".to_string());
        }

        let mut sql = format!(
            "SELECT TOP {} System.ItemPathDisplay, System.ItemNameDisplay, System.ItemTypeText, \
             System.Size, System.DateModified FROM SYSTEMINDEX WHERE {}",
            limit,
            clauses.join(" AND ")
        );
        if !self.scope.is_empty() {
            let scopes: Vec<String> = self
                .scope
                .iter()
                .map(|root| format!("SCOPE='file:{}'", root.display().to_string().replace('\'', "''")))
                .collect();
            sql.push_str(&format!(" AND ({})", scopes.join(" OR ")));
        }
        sql.push_str(" ORDER BY System.DateModified DESC");
        sql
    }

    /// Arguments for macOS `mdfind`.
    pub fn to_mdfind_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for root in &self.scope {
            args.push("-onlyin".to_string());
            args.push(root.display().to_string());
        }
        let expr = if self.terms.is_empty() {
            "kMDItemFSName == \"*\"".to_string()
        } else {
            self.terms
                .iter()
                .map(|term| format!("kMDItemFSName == \"*{}*\"cd", term.replace('"', "")))
                .collect::<Vec<_>>()
                .join(" && ")
        };
        args.push(expr);
        args
    }

    /// Arguments for `locate`/`plocate`: case-insensitive, every term
    /// required, capped at `limit`.
    pub fn to_locate_args(&self, limit: usize) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            "-l".to_string(),
            limit.to_string(),
            "-A".to_string(),
        ];
        if self.terms.is_empty() {
            args.push("/".to_string());
        } else {
            args.extend(self.terms.iter().cloned());
        }
        args
    }
}
