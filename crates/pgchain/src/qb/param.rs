//! Named parameter accumulation and compilation to PostgreSQL positional parameters.

use crate::error::{ChainError, ChainResult};
use crate::value::Value;

/// The clause a placeholder was registered for. Determines the name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    /// `WHERE` predicates: `:column_where`
    Where,
    /// `UPDATE ... SET`: `:column_set`
    Set,
    /// `INSERT ... VALUES`: `:column`
    Insert,
}

impl Clause {
    fn suffix(self) -> &'static str {
        match self {
            Clause::Where => "_where",
            Clause::Set => "_set",
            Clause::Insert => "",
        }
    }
}

/// One `(placeholder, raw value)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Placeholder including the leading `:`.
    pub name: String,
    pub clause: Clause,
    /// Raw (unsanitized) value.
    pub value: Value,
}

/// Ordered list of named bindings for one statement.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    bindings: Vec<Binding>,
}

/// A statement ready for the driver: `$n` placeholders plus sanitized values in `$n` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub params: Vec<Value>,
    /// Placeholder names, index-aligned with `params`.
    pub names: Vec<String>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Forget every binding (start of a new logical query).
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Drop every binding registered for `clause`.
    pub fn remove_clause(&mut self, clause: Clause) {
        self.bindings.retain(|b| b.clause != clause);
    }

    /// Register a value and return its placeholder (`:seed_suffix`).
    ///
    /// If that name is already taken, `_2`, `_3`, ... is appended until it is unique.
    pub fn register(&mut self, clause: Clause, seed: &str, value: Value) -> String {
        let base = format!(":{}{}", seed, clause.suffix());
        let mut name = base.clone();
        let mut n = 2;
        while self.bindings.iter().any(|b| b.name == name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        self.bindings.push(Binding {
            name: name.clone(),
            clause,
            value,
        });
        name
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.bindings.iter().position(|b| &b.name[1..] == name)
    }

    /// Rewrite `:name` placeholders in `sql` to `$n` and collect sanitized values.
    ///
    /// Only bindings referenced by `sql` are sent; they are numbered in accumulation order.
    /// Text inside `'...'` literals and `"..."` identifiers is left alone, as are `::` casts.
    pub fn compile(&self, sql: &str) -> ChainResult<Compiled> {
        let mut pieces = Vec::new();
        let mut referenced = vec![false; self.bindings.len()];
        for seg in scan(sql) {
            match seg {
                Segment::Text(text) => pieces.push(Err(text)),
                Segment::Name(name) => {
                    let idx = self.lookup(name).ok_or_else(|| {
                        ChainError::Binding(format!("no value bound for placeholder :{name}"))
                    })?;
                    referenced[idx] = true;
                    pieces.push(Ok(idx));
                }
            }
        }

        let mut position = vec![0usize; self.bindings.len()];
        let mut params = Vec::new();
        let mut names = Vec::new();
        for (idx, binding) in self.bindings.iter().enumerate() {
            if referenced[idx] {
                params.push(binding.value.sanitized());
                names.push(binding.name.clone());
                position[idx] = params.len();
            }
        }

        let mut out = String::with_capacity(sql.len());
        for piece in pieces {
            match piece {
                Err(text) => out.push_str(text),
                Ok(idx) => {
                    out.push('$');
                    out.push_str(&position[idx].to_string());
                }
            }
        }

        Ok(Compiled {
            sql: out,
            params,
            names,
        })
    }
}

enum Segment<'a> {
    Text(&'a str),
    Name(&'a str),
}

fn is_name_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_name_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

fn scan(sql: &str) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
                i += 1;
            }
            None if b == b'\'' || b == b'"' => {
                quote = Some(b);
                i += 1;
            }
            None if b == b':' && bytes.get(i + 1) == Some(&b':') => i += 2,
            None if b == b':' && bytes.get(i + 1).copied().is_some_and(is_name_start) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_name_char(bytes[end]) {
                    end += 1;
                }
                segments.push(Segment::Text(&sql[text_start..i]));
                segments.push(Segment::Name(&sql[start..end]));
                text_start = end;
                i = end;
            }
            None => i += 1,
        }
    }
    segments.push(Segment::Text(&sql[text_start..]));
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_carry_clause_suffix() {
        let mut binder = Binder::new();
        assert_eq!(binder.register(Clause::Where, "age", 18.into()), ":age_where");
        assert_eq!(binder.register(Clause::Set, "age", 30.into()), ":age_set");
        assert_eq!(binder.register(Clause::Insert, "age", 30.into()), ":age");
    }

    #[test]
    fn repeated_names_get_numbered() {
        let mut binder = Binder::new();
        assert_eq!(binder.register(Clause::Where, "age", 1.into()), ":age_where");
        assert_eq!(binder.register(Clause::Where, "age", 9.into()), ":age_where_2");
        assert_eq!(binder.register(Clause::Where, "age", 5.into()), ":age_where_3");
    }

    #[test]
    fn remove_clause_keeps_others() {
        let mut binder = Binder::new();
        binder.register(Clause::Where, "id", 1.into());
        binder.register(Clause::Set, "name", "x".into());
        binder.remove_clause(Clause::Where);
        let names: Vec<_> = binder.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec![":name_set"]);
    }

    #[test]
    fn compile_numbers_in_accumulation_order() {
        let mut binder = Binder::new();
        binder.register(Clause::Where, "id", 7.into());
        binder.register(Clause::Set, "name", "Ann".into());

        let compiled = binder
            .compile(r#"UPDATE "users" SET "name" = :name_set WHERE "id" = :id_where"#)
            .unwrap();
        assert_eq!(
            compiled.sql,
            r#"UPDATE "users" SET "name" = $2 WHERE "id" = $1"#
        );
        assert_eq!(compiled.params, vec![Value::Int(7), Value::Text("Ann".into())]);
        assert_eq!(compiled.names, vec![":id_where", ":name_set"]);
    }

    #[test]
    fn compile_skips_unreferenced_and_sanitizes() {
        let mut binder = Binder::new();
        binder.register(Clause::Where, "id", 7.into());
        binder.register(Clause::Insert, "name", "<i>Ann</i> & co".into());

        let compiled = binder
            .compile(r#"INSERT INTO "users" ("name") VALUES (:name)"#)
            .unwrap();
        assert_eq!(compiled.sql, r#"INSERT INTO "users" ("name") VALUES ($1)"#);
        assert_eq!(compiled.params, vec![Value::Text("Ann &amp; co".into())]);
    }

    #[test]
    fn compile_ignores_literals_and_casts() {
        let mut binder = Binder::new();
        binder.register(Clause::Where, "a", 1.into());
        let compiled = binder
            .compile(r#"SELECT ':a', ":a", x::text FROM t WHERE "a" = :a_where"#)
            .unwrap();
        assert_eq!(
            compiled.sql,
            r#"SELECT ':a', ":a", x::text FROM t WHERE "a" = $1"#
        );
    }

    #[test]
    fn compile_rejects_unbound_placeholder() {
        let binder = Binder::new();
        let err = binder.compile("SELECT * FROM t WHERE a = :a_where").unwrap_err();
        assert!(matches!(err, ChainError::Binding(_)));
    }

    #[test]
    fn empty_binder_is_a_noop() {
        let binder = Binder::new();
        let compiled = binder.compile(r#"SELECT * FROM "users""#).unwrap();
        assert_eq!(compiled.sql, r#"SELECT * FROM "users""#);
        assert!(compiled.params.is_empty());
    }
}
