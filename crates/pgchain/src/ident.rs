//! SQL identifier validation.
//!
//! Table names, column names and sort/group keys are the only caller strings
//! that end up in SQL text rather than in the parameter list, so every one of
//! them goes through this module first.
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any character except NUL; `"` is escaped as `""`
//! - Parts are joined with `.` (`public."UserTable".id`)
//!
//! On top of plain identifiers, [`column_or_aggregate`] accepts a single
//! aggregate call such as `COUNT(*)` or `SUM(DISTINCT score)`, and
//! [`table_ref`] accepts a table followed by an optional alias.

use crate::error::{OrmError, OrmResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

/// A validated, possibly dotted SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse `schema.table.column`, `"CamelCase"` or mixed forms.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(invalid("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(invalid("identifier cannot contain NUL character"));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(invalid(format!("trailing '.' in identifier '{s}'")));
                        }
                    }
                    Some(c) => {
                        return Err(invalid(format!(
                            "expected '.' between identifier parts in '{s}', got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(invalid(format!("unclosed quoted identifier in '{s}'")));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(invalid("empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(invalid(format!("invalid character '{c}' in identifier '{s}'")));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(invalid(format!("empty identifier segment in '{s}'")));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        Ok(Self { parts })
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) => out.push_str(s),
                IdentPart::Quoted(s) => {
                    out.push('"');
                    for ch in s.chars() {
                        if ch == '"' {
                            out.push_str("\"\"");
                        } else {
                            out.push(ch);
                        }
                    }
                    out.push('"');
                }
            }
        }
    }

    fn is_single_unquoted(&self) -> bool {
        matches!(self.parts.as_slice(), [IdentPart::Unquoted(_)])
    }
}

fn invalid(message: impl Into<String>) -> OrmError {
    OrmError::invalid_query(message)
}

/// Keywords that would change the statement if accepted as an unquoted alias.
const RESERVED_ALIASES: &[&str] = &[
    "AS", "CROSS", "FROM", "FULL", "GROUP", "HAVING", "INNER", "JOIN", "LEFT", "LIMIT",
    "NATURAL", "OFFSET", "ON", "ORDER", "RETURNING", "RIGHT", "SELECT", "SET", "UNION",
    "USING", "VALUES", "WHERE",
];

/// A column name. Returns the canonical SQL rendering.
pub fn column(s: &str) -> OrmResult<String> {
    Ident::parse(s.trim()).map(|ident| ident.to_sql())
}

/// A column name or one aggregate call: `COUNT(*)`, `SUM(score)`,
/// `COUNT(DISTINCT t.user_id)`.
pub fn column_or_aggregate(s: &str) -> OrmResult<String> {
    let s = s.trim();
    let Some(open) = s.find('(') else {
        return column(s);
    };
    let Some(inner) = s[open + 1..].strip_suffix(')') else {
        return Err(invalid(format!("malformed aggregate expression '{s}'")));
    };

    let func = Ident::parse(&s[..open])?;
    if !func.is_single_unquoted() {
        return Err(invalid(format!("invalid aggregate function in '{s}'")));
    }

    let inner = inner.trim();
    let arg = if inner == "*" {
        "*".to_string()
    } else if let Some(rest) = strip_keyword(inner, "DISTINCT") {
        format!("DISTINCT {}", column(rest)?)
    } else {
        column(inner)?
    };
    Ok(format!("{}({})", func.to_sql(), arg))
}

/// A SELECT list entry: `*`, `alias.*`, a column or an aggregate call.
pub fn select_item(s: &str) -> OrmResult<String> {
    let s = s.trim();
    if s == "*" {
        return Ok(s.to_string());
    }
    if let Some(prefix) = s.strip_suffix(".*") {
        return Ok(format!("{}.*", column(prefix)?));
    }
    column_or_aggregate(s)
}

/// A table reference: `users`, `public.users`, `users u` or `users AS u`.
///
/// The alias is rendered without `AS`.
pub fn table_ref(s: &str) -> OrmResult<String> {
    let s = s.trim();
    let (name, rest) = split_ident(s);
    let name = Ident::parse(name)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Ok(name.to_sql());
    }

    let alias = strip_keyword(rest, "AS").unwrap_or(rest);
    let alias = Ident::parse(alias.trim())?;
    if alias.parts.len() != 1 {
        return Err(invalid(format!("table alias in '{s}' must be a single name")));
    }
    if let [IdentPart::Unquoted(a)] = alias.parts.as_slice()
        && RESERVED_ALIASES.iter().any(|k| k.eq_ignore_ascii_case(a))
    {
        return Err(invalid(format!("'{a}' cannot be used as a table alias")));
    }
    Ok(format!("{} {}", name.to_sql(), alias.to_sql()))
}

/// Split at the first whitespace outside double quotes.
fn split_ident(s: &str) -> (&str, &str) {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => return (&s[..i], &s[i..]),
            _ => {}
        }
    }
    (s, "")
}

/// `KEYWORD rest` (case-insensitive, at least one space) → `rest`.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    let rest = &s[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}
