//! Clause facades returned by `Chain::filter()`, `Chain::select()`, ...
//!
//! Each facade mutates the chain's intent as soon as one of its methods is
//! called and hands the chain back, so families can be mixed in any order.

use super::{Chain, Scoped};
use crate::condition::{ConditionTree, Connector, FieldKind, Operand, Operator};
use crate::error::OrmError;
use crate::intent::{Direction, JoinKind, UnionMode};
use crate::value::Value;

/// Receiver of conditions built through [`FieldStep`].
pub trait ConditionSink: Sized {
    /// What the chain becomes after the condition is added.
    type Next;

    fn push(self, field: String, operator: Operator, operand: Operand) -> Self::Next;
}

/// Operator step for one field: `.field("age").gte(18)`.
#[derive(Debug)]
#[must_use]
pub struct FieldStep<K> {
    sink: K,
    field: String,
}

impl<K: ConditionSink> FieldStep<K> {
    fn new(sink: K, field: impl Into<String>) -> Self {
        Self {
            sink,
            field: field.into(),
        }
    }

    fn single(self, operator: Operator, value: impl Into<Value>) -> K::Next {
        self.sink
            .push(self.field, operator, Operand::Single(value.into()))
    }

    fn list<I, V>(self, operator: Operator, values: I) -> K::Next
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.sink.push(self.field, operator, Operand::List(values))
    }

    /// `field = $n`
    pub fn is(self, value: impl Into<Value>) -> K::Next {
        self.single(Operator::Eq, value)
    }

    /// `field != $n`
    pub fn ne(self, value: impl Into<Value>) -> K::Next {
        self.single(Operator::Ne, value)
    }

    /// `field > $n`
    pub fn gt(self, value: impl Into<Value>) -> K::Next {
        self.single(Operator::Gt, value)
    }

    /// `field >= $n`
    pub fn gte(self, value: impl Into<Value>) -> K::Next {
        self.single(Operator::Gte, value)
    }

    /// `field < $n`
    pub fn lt(self, value: impl Into<Value>) -> K::Next {
        self.single(Operator::Lt, value)
    }

    /// `field <= $n`
    pub fn lte(self, value: impl Into<Value>) -> K::Next {
        self.single(Operator::Lte, value)
    }

    /// `field LIKE $n`
    pub fn like(self, pattern: impl Into<Value>) -> K::Next {
        self.single(Operator::Like, pattern)
    }

    /// `field NOT LIKE $n`
    pub fn not_like(self, pattern: impl Into<Value>) -> K::Next {
        self.single(Operator::NotLike, pattern)
    }

    /// `field IN ($n, ...)`. An empty list never matches.
    pub fn in_list<I, V>(self, values: I) -> K::Next
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.list(Operator::In, values)
    }

    /// `field NOT IN ($n, ...)`. An empty list always matches.
    pub fn not_in<I, V>(self, values: I) -> K::Next
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.list(Operator::NotIn, values)
    }

    pub fn is_null(self) -> K::Next {
        self.sink.push(self.field, Operator::IsNull, Operand::None)
    }

    pub fn is_not_null(self) -> K::Next {
        self.sink.push(self.field, Operator::IsNotNull, Operand::None)
    }
}

// ==================== WHERE ====================

/// Sink adding to the WHERE tree.
#[derive(Debug)]
pub struct WhereSink<'t, S>(Chain<'t, S>);

impl<'t, S> ConditionSink for WhereSink<'t, S> {
    type Next = Chain<'t, Scoped>;

    fn push(self, field: String, operator: Operator, operand: Operand) -> Self::Next {
        let mut chain = self.0;
        let connector = chain.pending.take();
        if let Err(err) = chain
            .intent
            .filter_mut()
            .add_condition(&field, operator, operand, connector)
        {
            chain.intent.record_error(err);
        }
        chain.into_state()
    }
}

/// Returned by `Chain::filter()`.
#[derive(Debug)]
#[must_use]
pub struct Filter<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Filter<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    pub fn field(self, name: impl Into<String>) -> FieldStep<WhereSink<'t, S>> {
        FieldStep::new(WhereSink(self.chain), name)
    }

    /// Add a parenthesized group. Empty groups are dropped.
    pub fn grouped<F>(self, build: F) -> Chain<'t, Scoped>
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        let mut chain = self.chain;
        let connector = chain.pending.take();
        let group = build(GroupBuilder::default());
        if let Some(err) = group.error {
            chain.intent.record_error(err);
        }
        chain.intent.filter_mut().add_group(group.tree, connector);
        chain.into_state()
    }
}

// ==================== HAVING ====================

/// Sink adding to the HAVING tree.
#[derive(Debug)]
pub struct HavingSink<'t, S> {
    chain: Chain<'t, S>,
    kind: FieldKind,
}

impl<'t, S> ConditionSink for HavingSink<'t, S> {
    type Next = Chain<'t, S>;

    fn push(self, field: String, operator: Operator, operand: Operand) -> Self::Next {
        let mut chain = self.chain;
        let connector = chain.pending.take();
        if let Err(err) = chain.intent.having_mut().add_condition_as(
            self.kind, &field, operator, operand, connector,
        ) {
            chain.intent.record_error(err);
        }
        chain
    }
}

/// Returned by `Chain::having()`.
#[derive(Debug)]
#[must_use]
pub struct Having<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Having<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    /// A column or one aggregate call such as `COUNT(*)` or `SUM(score)`.
    pub fn field(self, name: impl Into<String>) -> FieldStep<HavingSink<'t, S>> {
        let sink = HavingSink {
            chain: self.chain,
            kind: FieldKind::Aggregate,
        };
        FieldStep::new(sink, name)
    }

    /// An arbitrary left-hand expression, inserted verbatim:
    /// `.raw("SUM(price * qty)").gt(100)`. Never pass user input here.
    pub fn raw(self, expr: impl Into<String>) -> FieldStep<HavingSink<'t, S>> {
        let sink = HavingSink {
            chain: self.chain,
            kind: FieldKind::Raw,
        };
        FieldStep::new(sink, expr)
    }

    /// Group fields accept the same forms as [`Having::field`].
    pub fn grouped<F>(self, build: F) -> Chain<'t, S>
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        let mut chain = self.chain;
        let connector = chain.pending.take();
        let group = build(GroupBuilder::with_kind(FieldKind::Aggregate));
        if let Some(err) = group.error {
            chain.intent.record_error(err);
        }
        chain.intent.having_mut().add_group(group.tree, connector);
        chain
    }
}

// ==================== Groups ====================

/// Builds the contents of one parenthesized group.
#[derive(Debug, Default)]
#[must_use]
pub struct GroupBuilder {
    tree: ConditionTree,
    pending: Option<Connector>,
    error: Option<OrmError>,
    kind: FieldKind,
}

impl GroupBuilder {
    fn with_kind(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn field(self, name: impl Into<String>) -> FieldStep<GroupBuilder> {
        FieldStep::new(self, name)
    }

    pub fn and(mut self) -> Self {
        self.pending = Some(Connector::And);
        self
    }

    pub fn or(mut self) -> Self {
        self.pending = Some(Connector::Or);
        self
    }

    /// Nested group.
    pub fn grouped<F>(mut self, build: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        let connector = self.pending.take();
        let inner = build(GroupBuilder::with_kind(self.kind));
        if let Some(err) = inner.error {
            self.error.get_or_insert(err);
        }
        self.tree.add_group(inner.tree, connector);
        self
    }
}

impl ConditionSink for GroupBuilder {
    type Next = GroupBuilder;

    fn push(mut self, field: String, operator: Operator, operand: Operand) -> Self {
        let connector = self.pending.take();
        if let Err(err) = self
            .tree
            .add_condition_as(self.kind, &field, operator, operand, connector)
        {
            self.error.get_or_insert(err);
        }
        self
    }
}

// ==================== SELECT ====================

/// Returned by `Chain::select()`.
#[derive(Debug)]
#[must_use]
pub struct Select<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Select<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    /// `SELECT *`
    pub fn all(mut self) -> Chain<'t, S> {
        self.chain.intent.select_all();
        self.chain
    }

    /// Replace the column list. Duplicates are dropped, first position wins.
    pub fn fields<I, C>(mut self, fields: I) -> Chain<'t, S>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.chain.intent.select_fields(fields);
        self.chain
    }

    /// `SELECT DISTINCT` over whichever columns are selected at compile time.
    pub fn distinct(mut self) -> Chain<'t, S> {
        self.chain.intent.set_distinct(true);
        self.chain
    }
}

// ==================== GROUP BY ====================

/// Returned by `Chain::group()`.
#[derive(Debug)]
#[must_use]
pub struct Group<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Group<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    /// Replace GROUP BY.
    pub fn by<I, C>(mut self, fields: I) -> Chain<'t, S>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.chain.intent.set_group_by(fields);
        self.chain
    }
}

// ==================== ORDER BY ====================

/// Returned by `Chain::order()`.
#[derive(Debug)]
#[must_use]
pub struct Order<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Order<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    /// Replace ORDER BY with one ascending key.
    pub fn by(mut self, field: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.set_order(field.into(), Direction::Asc);
        self.chain
    }

    /// Replace ORDER BY with one descending key.
    pub fn by_desc(mut self, field: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.set_order(field.into(), Direction::Desc);
        self.chain
    }

    /// Append an ascending key.
    pub fn then_by(mut self, field: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.push_order(field.into(), Direction::Asc);
        self.chain
    }

    /// Append a descending key.
    pub fn then_by_desc(mut self, field: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.push_order(field.into(), Direction::Desc);
        self.chain
    }
}

// ==================== LIMIT / OFFSET ====================

/// Returned by `Chain::limit()`.
#[derive(Debug)]
#[must_use]
pub struct Limit<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Limit<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    pub fn to(mut self, limit: u64) -> Chain<'t, S> {
        self.chain.intent.set_limit(limit);
        self.chain
    }

    pub fn offset(mut self, offset: u64) -> Chain<'t, S> {
        self.chain.intent.set_offset(offset);
        self.chain
    }
}

// ==================== UNION ====================

/// Returned by `Chain::union()`.
#[derive(Debug)]
#[must_use]
pub struct Union<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Union<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    /// Append `UNION <sql>`. The query is inserted verbatim.
    pub fn query(mut self, sql: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.push_union(UnionMode::Distinct, sql.into());
        self.chain
    }

    /// Append `UNION ALL <sql>`.
    pub fn all(mut self, sql: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.push_union(UnionMode::All, sql.into());
        self.chain
    }
}

// ==================== JOIN ====================

/// Returned by `Chain::join()`.
#[derive(Debug)]
#[must_use]
pub struct Join<'t, S> {
    chain: Chain<'t, S>,
}

impl<'t, S> Join<'t, S> {
    pub(super) fn new(chain: Chain<'t, S>) -> Self {
        Self { chain }
    }

    fn push(mut self, kind: JoinKind, table: impl Into<String>, on: impl Into<String>) -> Chain<'t, S> {
        self.chain.intent.push_join(kind, table.into(), on.into());
        self.chain
    }

    pub fn inner(self, table: impl Into<String>, on: impl Into<String>) -> Chain<'t, S> {
        self.push(JoinKind::Inner, table, on)
    }

    pub fn left(self, table: impl Into<String>, on: impl Into<String>) -> Chain<'t, S> {
        self.push(JoinKind::Left, table, on)
    }

    pub fn right(self, table: impl Into<String>, on: impl Into<String>) -> Chain<'t, S> {
        self.push(JoinKind::Right, table, on)
    }

    pub fn full(self, table: impl Into<String>, on: impl Into<String>) -> Chain<'t, S> {
        self.push(JoinKind::Full, table, on)
    }
}
