//! Sanitized SQL identifiers.
//!
//! Every table and column name handed to the builder goes through [`Ident::sanitized`]:
//! the raw text is passed through [`sanitize`](crate::sanitize::sanitize), then parsed as
//! a (possibly dotted, possibly quoted) identifier, and finally rendered with every part
//! double-quoted so the engine never sees an unescaped name.
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts (`"Mixed Case"`) allow anything except NUL; `""` escapes a quote
//!
//! Sanitization escapes `"`, so names reaching the builder through [`Ident::sanitized`]
//! are plain (possibly dotted) identifiers; quoted forms only come from [`Ident::parse`].
//!
//! ```ignore
//! let t = Ident::sanitized("public.users")?;
//! assert_eq!(t.to_sql(), r#""public"."users""#);
//! ```

use crate::error::{ChainError, ChainResult};
use crate::sanitize::sanitize;

/// A validated SQL identifier (`table`, `schema.table`, `"Odd Name"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Sanitize `raw`, then parse it as an identifier.
    pub fn sanitized(raw: &str) -> ChainResult<Self> {
        Self::parse(&sanitize(raw.trim()))
    }

    /// Parse an identifier string, supporting dotted and quoted forms.
    pub fn parse(s: &str) -> ChainResult<Self> {
        if s.is_empty() {
            return Err(ChainError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(ChainError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = if rest.starts_with('"') {
                parse_quoted(rest)?
            } else {
                parse_unquoted(rest)?
            };
            parts.push(part);

            match tail.strip_prefix('.') {
                Some("") => return Err(ChainError::validation("Trailing '.' in identifier")),
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    return Err(ChainError::validation(format!(
                        "Unexpected text after identifier: '{tail}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// Render as SQL, quoting every part.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.parts.iter().map(|p| p.len() + 3).sum());
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push('"');
            out.push_str(&part.replace('"', "\"\""));
            out.push('"');
        }
        out
    }

    /// The last part of the identifier reduced to `[A-Za-z0-9_]`, used to name placeholders.
    pub fn placeholder_seed(&self) -> String {
        let last = self.parts.last().map(String::as_str).unwrap_or_default();
        let seed: String = last
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if seed.is_empty() { "p".to_string() } else { seed }
    }
}

fn parse_quoted(s: &str) -> ChainResult<(String, &str)> {
    let mut name = String::new();
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            name.push('"');
            continue;
        }
        if name.is_empty() {
            return Err(ChainError::validation("Empty quoted identifier"));
        }
        return Ok((name, &s[i + 1..]));
    }
    Err(ChainError::validation("Unclosed quoted identifier"))
}

fn parse_unquoted(s: &str) -> ChainResult<(String, &str)> {
    let end = s.find('.').unwrap_or(s.len());
    let name = &s[..end];
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(ChainError::validation("Empty identifier segment")),
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(ChainError::validation(format!(
                "Invalid identifier start character: '{c}'"
            )));
        }
    }
    if let Some(c) = chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        return Err(ChainError::validation(format!(
            "Invalid character in identifier: '{c}'"
        )));
    }
    Ok((name.to_string(), &s[end..]))
}
