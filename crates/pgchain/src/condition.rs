//! Condition-string parsing.
//!
//! A condition is a comma-separated list of simple comparisons, all of which are
//! AND-conjoined:
//!
//! ```text
//! condition := predicate ("," predicate)*
//! predicate := column op value
//! column    := [A-Za-z_][A-Za-z0-9_]*
//! op        := "!=" | ">=" | "<=" | "<>" | "=" | ">" | "<"
//! value     := quoted | any text up to the next ","  (trimmed, non-empty)
//! quoted    := "'" text "'" | '"' text '"'   (closing quote ends the value)
//! ```
//!
//! Commas inside a quoted value do not split predicates. A quote anywhere else in a
//! value, as in `name = O'Neil`, is ordinary text. There is no OR and no
//! grouping. Values are kept as raw text; typing and sanitization happen at bind time.
//!
//! # Example
//! ```ignore
//! use pgchain::condition::{parse, Op};
//!
//! let triples = parse("age >= 18, status = active")?;
//! assert_eq!(triples[0].op, Op::Gte);
//! assert_eq!(triples[1].value, "active");
//! ```

use thiserror::Error;

/// Comparison operator.
///
/// Variants are listed in matching precedence: longer tokens first, so `>=` is never read
/// as `>` followed by a value starting with `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `!=`
    Ne,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
    /// `<>`
    LtGt,
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

impl Op {
    /// All operators in matching precedence.
    pub const PRECEDENCE: [Op; 7] = [
        Op::Ne,
        Op::Gte,
        Op::Lte,
        Op::LtGt,
        Op::Eq,
        Op::Gt,
        Op::Lt,
    ];

    /// SQL token for this operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Ne => "!=",
            Op::Gte => ">=",
            Op::Lte => "<=",
            Op::LtGt => "<>",
            Op::Eq => "=",
            Op::Gt => ">",
            Op::Lt => "<",
        }
    }

    fn match_prefix(s: &str) -> Option<Op> {
        Self::PRECEDENCE
            .into_iter()
            .find(|op| s.starts_with(op.as_sql()))
    }
}

/// One parsed comparison: `(column, operator, raw value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub column: String,
    pub op: Op,
    pub value: String,
}

/// Why a condition (or one of its fragments) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition is empty")]
    Empty,

    #[error("empty predicate at position {position}")]
    EmptyPredicate { position: usize },

    #[error("missing column name in '{fragment}'")]
    MissingColumn { fragment: String },

    #[error("no comparison operator in '{fragment}'")]
    MissingOperator { fragment: String },

    #[error("missing value in '{fragment}'")]
    MissingValue { fragment: String },

    #[error("unterminated quote in '{fragment}'")]
    UnterminatedQuote { fragment: String },

    #[error("no valid predicate in condition ({skipped} fragment(s) skipped)")]
    NothingAccepted { skipped: usize },
}

/// A fragment dropped by [`parse_lenient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub fragment: String,
    pub error: ConditionError,
}

/// Result of [`parse_lenient`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCondition {
    pub triples: Vec<Triple>,
    pub skipped: Vec<Skipped>,
}

/// Parse a condition, failing on the first malformed predicate.
pub fn parse(input: &str) -> Result<Vec<Triple>, ConditionError> {
    split_predicates(input)?
        .iter()
        .enumerate()
        .map(|(i, fragment)| parse_predicate(i, fragment))
        .collect()
}

/// Parse a condition, skipping malformed predicates.
///
/// Only a completely empty input is an error here; callers decide what to do with
/// [`ParsedCondition::skipped`].
pub fn parse_lenient(input: &str) -> Result<ParsedCondition, ConditionError> {
    let mut parsed = ParsedCondition::default();
    for (i, fragment) in split_predicates(input)?.iter().enumerate() {
        match parse_predicate(i, fragment) {
            Ok(triple) => parsed.triples.push(triple),
            Err(error) => parsed.skipped.push(Skipped {
                fragment: fragment.text.trim().to_string(),
                error,
            }),
        }
    }
    Ok(parsed)
}

/// One comma-separated piece of a condition.
struct Fragment<'a> {
    text: &'a str,
    /// The value opened a quote that never closed at the end of a value.
    unterminated: bool,
}

/// Split on commas, except inside a quoted value.
///
/// A quote only opens when it is the first character of a value, and only closes when
/// the next non-space character is a comma or the end of input. Any other quote is
/// ordinary text.
fn split_predicates(input: &str) -> Result<Vec<Fragment<'_>>, ConditionError> {
    if input.trim().is_empty() {
        return Err(ConditionError::Empty);
    }

    let mut fragments = Vec::new();
    let mut rest = input;
    loop {
        let next_comma = rest.find(',').unwrap_or(rest.len());
        let (len, unterminated) = match quoted_value_start(rest) {
            Some((open, quote)) => match closing_quote(rest, open, quote) {
                Some(end) => (end, false),
                None => (next_comma, true),
            },
            None => (next_comma, false),
        };
        fragments.push(Fragment {
            text: &rest[..len],
            unterminated,
        });
        if len == rest.len() {
            return Ok(fragments);
        }
        rest = &rest[len + 1..];
    }
}

/// Byte offset and quote character of a value that starts with `'` or `"`.
fn quoted_value_start(rest: &str) -> Option<(usize, char)> {
    let (column, after) = split_column(rest.trim_start());
    if column.is_empty() {
        return None;
    }
    let after = after.trim_start();
    let op = Op::match_prefix(after)?;
    let value = after[op.as_sql().len()..].trim_start();
    let quote = value.chars().next().filter(|&c| matches!(c, '\'' | '"'))?;
    Some((rest.len() - value.len(), quote))
}

/// End of a quoted value: the offset of the comma after the closing quote, or the
/// input length.
fn closing_quote(rest: &str, open: usize, quote: char) -> Option<usize> {
    let body = open + quote.len_utf8();
    rest[body..].match_indices(quote).find_map(|(i, _)| {
        let tail = rest[body + i + quote.len_utf8()..].trim_start();
        (tail.is_empty() || tail.starts_with(',')).then_some(rest.len() - tail.len())
    })
}

fn split_column(s: &str) -> (&str, &str) {
    let len = s
        .char_indices()
        .take_while(|&(i, c)| match c {
            '_' => true,
            c if i == 0 => c.is_ascii_alphabetic(),
            c => c.is_ascii_alphanumeric(),
        })
        .count();
    s.split_at(len)
}

fn parse_predicate(position: usize, fragment: &Fragment<'_>) -> Result<Triple, ConditionError> {
    let trimmed = fragment.text.trim();
    if trimmed.is_empty() {
        return Err(ConditionError::EmptyPredicate { position });
    }

    let (column, rest) = split_column(trimmed);
    if column.is_empty() {
        return Err(ConditionError::MissingColumn {
            fragment: trimmed.to_string(),
        });
    }

    let rest = rest.trim_start();
    let op = Op::match_prefix(rest).ok_or_else(|| ConditionError::MissingOperator {
        fragment: trimmed.to_string(),
    })?;

    let value = rest[op.as_sql().len()..].trim();
    if value.is_empty() {
        return Err(ConditionError::MissingValue {
            fragment: trimmed.to_string(),
        });
    }
    if fragment.unterminated {
        return Err(ConditionError::UnterminatedQuote {
            fragment: trimmed.to_string(),
        });
    }

    Ok(Triple {
        column: column.to_string(),
        op,
        value: value.to_string(),
    })
}
