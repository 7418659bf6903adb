//! Query intent → parameterized SQL.
//!
//! Compilation is a pure function of its inputs. Clauses are always rendered in
//! the same order regardless of how the intent was built, and operands are
//! always bound as `$n` placeholders numbered by textual position.

use crate::error::{OrmError, OrmResult};
use crate::hook::Operation;
use crate::ident;
use crate::intent::{Columns, Direction, QueryIntent};
use crate::meta::TableMeta;
use crate::value::{ParamList, Payload, Value};

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub params: Vec<Value>,
    /// `true` for an UPDATE or DELETE without a WHERE clause.
    pub unscoped: bool,
}

/// Compile `intent` for `op`.
///
/// `payload` is required for [`Operation::Insert`] and [`Operation::Update`]
/// and ignored otherwise. When `meta` is given, `LIKE`/`IN` operands are
/// checked against the declared column types.
pub fn compile(
    intent: &QueryIntent,
    op: Operation,
    payload: Option<&Payload>,
    meta: Option<&TableMeta>,
) -> OrmResult<Compiled> {
    if let Some(err) = intent.build_error() {
        return Err(OrmError::invalid_query(err));
    }
    if let Some(meta) = meta {
        intent.filter().check_types(meta)?;
        intent.having().check_types(meta)?;
    }

    match op {
        Operation::Select => Ok(compile_select(intent)),
        Operation::Insert => {
            reject_select_clauses(intent, op)?;
            if intent.is_scoped() {
                return Err(OrmError::invalid_query("INSERT does not accept a WHERE clause"));
            }
            compile_insert(intent, require_payload(payload, op)?)
        }
        Operation::Update => {
            reject_select_clauses(intent, op)?;
            compile_update(intent, require_payload(payload, op)?)
        }
        Operation::Delete => {
            reject_select_clauses(intent, op)?;
            Ok(compile_delete(intent))
        }
    }
}

/// Payload columns, validated and rendered, paired with their values.
fn require_payload(
    payload: Option<&Payload>,
    op: Operation,
) -> OrmResult<Vec<(String, &Value)>> {
    match payload {
        Some(p) if !p.is_empty() => p
            .iter()
            .map(|(column, value)| {
                if column.trim().is_empty() {
                    return Err(OrmError::invalid_query(format!(
                        "{op} payload contains an empty column name"
                    )));
                }
                Ok((ident::column(column)?, value))
            })
            .collect(),
        _ => Err(OrmError::invalid_query(format!("{op} requires a non-empty payload"))),
    }
}

fn reject_select_clauses(intent: &QueryIntent, op: Operation) -> OrmResult<()> {
    let present = intent.select_only_clauses();
    if present.is_empty() {
        return Ok(());
    }
    Err(OrmError::invalid_query(format!(
        "{op} does not support {}",
        present.join(", ")
    )))
}

fn compile_select(intent: &QueryIntent) -> Compiled {
    let mut params = ParamList::new();

    let cols = match intent.columns() {
        Columns::All => "*".to_string(),
        Columns::Fields(fields) => fields.join(", "),
    };
    let mut sql = if intent.is_distinct() {
        format!("SELECT DISTINCT {} FROM {}", cols, intent.table())
    } else {
        format!("SELECT {} FROM {}", cols, intent.table())
    };

    for join in intent.joins() {
        sql.push_str(&format!(" {} {} ON {}", join.kind.as_sql(), join.table, join.on));
    }

    push_where(&mut sql, intent, &mut params);

    if !intent.group_by().is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&intent.group_by().join(", "));
    }

    if !intent.having().is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&intent.having().render(&mut params));
    }

    if !intent.order_by().is_empty() {
        let keys: Vec<String> = intent
            .order_by()
            .iter()
            .map(|k| match k.direction {
                Direction::Asc => k.field.clone(),
                Direction::Desc => format!("{} DESC", k.field),
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    if let Some(limit) = intent.limit() {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = intent.offset() {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    for union in intent.unions() {
        sql.push(' ');
        sql.push_str(union.mode.as_sql());
        sql.push(' ');
        sql.push_str(&union.query);
    }

    Compiled {
        sql,
        params: params.into_vec(),
        unscoped: false,
    }
}

fn compile_insert(
    intent: &QueryIntent,
    payload: Vec<(String, &Value)>,
) -> OrmResult<Compiled> {
    let mut params = ParamList::new();
    let mut columns = Vec::with_capacity(payload.len());
    let mut placeholders = Vec::with_capacity(payload.len());
    for (column, value) in payload {
        columns.push(column);
        placeholders.push(format!("${}", params.push(value.clone())));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        intent.table(),
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(Compiled {
        sql,
        params: params.into_vec(),
        unscoped: false,
    })
}

fn compile_update(
    intent: &QueryIntent,
    payload: Vec<(String, &Value)>,
) -> OrmResult<Compiled> {
    let mut params = ParamList::new();
    let sets: Vec<String> = payload
        .into_iter()
        .map(|(column, value)| format!("{} = ${}", column, params.push(value.clone())))
        .collect();

    let mut sql = format!("UPDATE {} SET {}", intent.table(), sets.join(", "));
    push_where(&mut sql, intent, &mut params);

    Ok(Compiled {
        sql,
        params: params.into_vec(),
        unscoped: !intent.is_scoped(),
    })
}

fn compile_delete(intent: &QueryIntent) -> Compiled {
    let mut params = ParamList::new();
    let mut sql = format!("DELETE FROM {}", intent.table());
    push_where(&mut sql, intent, &mut params);

    Compiled {
        sql,
        params: params.into_vec(),
        unscoped: !intent.is_scoped(),
    }
}

fn push_where(sql: &mut String, intent: &QueryIntent, params: &mut ParamList) {
    if intent.filter().is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    sql.push_str(&intent.filter().render(params));
}
