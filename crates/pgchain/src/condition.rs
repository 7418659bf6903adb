//! Condition trees for WHERE and HAVING clauses.
//!
//! A [`ConditionTree`] is an ordered list of nodes. Each node is either a single
//! predicate or a nested tree rendered in parentheses. Connectors are stored on
//! the node they precede and rendered literally, left to right: no operator
//! precedence is applied beyond the explicit groups.
//!
//! Invariant: the first node of any (sub-)tree carries [`Connector::None`], and
//! every later node carries `And` or `Or`.

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::meta::{ColumnType, TableMeta};
use crate::value::{ParamList, Value};

/// Connector joining a node to the node before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// First node of a tree.
    None,
    And,
    Or,
}

impl Connector {
    fn as_sql(&self) -> &'static str {
        match self {
            Connector::None => "",
            Connector::And => " AND ",
            Connector::Or => " OR ",
        }
    }
}

/// What the left-hand side of a predicate may contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldKind {
    /// A (possibly dotted or quoted) column name.
    #[default]
    Column,
    /// A column name or a single aggregate call such as `COUNT(*)`.
    Aggregate,
    /// An expression inserted verbatim.
    Raw,
}

impl FieldKind {
    fn validate(self, field: &str) -> OrmResult<String> {
        match self {
            FieldKind::Column => ident::column(field),
            FieldKind::Aggregate => ident::column_or_aggregate(field),
            FieldKind::Raw => Ok(field.to_string()),
        }
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    fn expects(&self) -> OperandShape {
        match self {
            Operator::In | Operator::NotIn => OperandShape::List,
            Operator::IsNull | Operator::IsNotNull => OperandShape::Empty,
            _ => OperandShape::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandShape {
    Empty,
    Single,
    List,
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Single(Value),
    List(Vec<Value>),
}

impl Operand {
    fn shape(&self) -> OperandShape {
        match self {
            Operand::None => OperandShape::Empty,
            Operand::Single(_) => OperandShape::Single,
            Operand::List(_) => OperandShape::List,
        }
    }
}

/// One entry of a [`ConditionTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition {
        connector: Connector,
        field: String,
        operator: Operator,
        operand: Operand,
    },
    Group {
        connector: Connector,
        tree: ConditionTree,
    },
}

impl Node {
    pub fn connector(&self) -> Connector {
        match self {
            Node::Condition { connector, .. } | Node::Group { connector, .. } => *connector,
        }
    }
}

/// Ordered predicates with explicit connectors and grouping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionTree {
    nodes: Vec<Node>,
}

impl ConditionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of operand values the tree will bind.
    pub fn param_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Condition {
                    operand: Operand::Single(_),
                    ..
                } => 1,
                Node::Condition {
                    operand: Operand::List(values),
                    ..
                } => values.len(),
                Node::Condition { .. } => 0,
                Node::Group { tree, .. } => tree.param_count(),
            })
            .sum()
    }

    /// Append a predicate on a column.
    ///
    /// `connector` is the connector requested for this node; `None` means no
    /// explicit call was made and defaults to `AND`. The first node of the tree
    /// always stores [`Connector::None`].
    pub fn add_condition(
        &mut self,
        field: &str,
        operator: Operator,
        operand: Operand,
        connector: Option<Connector>,
    ) -> OrmResult<()> {
        self.add_condition_as(FieldKind::Column, field, operator, operand, connector)
    }

    /// Append a predicate whose left-hand side is validated as `kind`.
    pub fn add_condition_as(
        &mut self,
        kind: FieldKind,
        field: &str,
        operator: Operator,
        operand: Operand,
        connector: Option<Connector>,
    ) -> OrmResult<()> {
        let field = field.trim();
        if field.is_empty() {
            return Err(OrmError::invalid_query("condition field name cannot be empty"));
        }
        let field = kind.validate(field)?;
        if operand.shape() != operator.expects() {
            return Err(OrmError::invalid_query(format!(
                "operator {} does not take a {:?} operand on '{field}'",
                operator.as_sql(),
                operand.shape()
            )));
        }

        let connector = self.resolve(connector);
        self.nodes.push(Node::Condition {
            connector,
            field,
            operator,
            operand,
        });
        Ok(())
    }

    /// Append a parenthesized sub-tree. Empty groups are dropped.
    pub fn add_group(&mut self, tree: ConditionTree, connector: Option<Connector>) {
        if tree.is_empty() {
            return;
        }
        let connector = self.resolve(connector);
        self.nodes.push(Node::Group { connector, tree });
    }

    fn resolve(&self, requested: Option<Connector>) -> Connector {
        if self.nodes.is_empty() {
            if let Some(connector) = requested {
                tracing::debug!(
                    target: "pgchain.pipeline",
                    ?connector,
                    "connector dropped: it precedes the first condition of its clause"
                );
            }
            return Connector::None;
        }
        match requested {
            Some(Connector::Or) => Connector::Or,
            _ => Connector::And,
        }
    }

    /// Render the tree, pushing operands into `params` in textual order.
    ///
    /// Returns an empty string for an empty tree.
    pub fn render(&self, params: &mut ParamList) -> String {
        let mut sql = String::new();
        for node in &self.nodes {
            sql.push_str(node.connector().as_sql());
            match node {
                Node::Condition {
                    field,
                    operator,
                    operand,
                    ..
                } => sql.push_str(&render_condition(field, *operator, operand, params)),
                Node::Group { tree, .. } => {
                    sql.push('(');
                    sql.push_str(&tree.render(params));
                    sql.push(')');
                }
            }
        }
        sql
    }

    /// Check `LIKE` / `IN` operands against declared column types.
    ///
    /// Columns missing from `meta` are not checked.
    pub fn check_types(&self, meta: &TableMeta) -> OrmResult<()> {
        for node in &self.nodes {
            match node {
                Node::Group { tree, .. } => tree.check_types(meta)?,
                Node::Condition {
                    field,
                    operator,
                    operand,
                    ..
                } => {
                    let Some(ty) = meta.column_type(field) else {
                        continue;
                    };
                    match (operator, operand) {
                        (Operator::Like | Operator::NotLike, Operand::Single(value)) => {
                            if ty != ColumnType::Text {
                                return Err(OrmError::invalid_query(format!(
                                    "{} requires a text column, '{field}' is {ty:?}",
                                    operator.as_sql()
                                )));
                            }
                            check_value(field, *operator, ty, value)?;
                        }
                        (Operator::In | Operator::NotIn, Operand::List(values)) => {
                            for value in values {
                                check_value(field, *operator, ty, value)?;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_value(field: &str, operator: Operator, ty: ColumnType, value: &Value) -> OrmResult<()> {
    if ty.accepts(value) {
        return Ok(());
    }
    Err(OrmError::invalid_query(format!(
        "{} operand of type {} does not match column '{field}' ({ty:?})",
        operator.as_sql(),
        value.type_name()
    )))
}

fn render_condition(
    field: &str,
    operator: Operator,
    operand: &Operand,
    params: &mut ParamList,
) -> String {
    match operand {
        Operand::None => format!("{} {}", field, operator.as_sql()),
        Operand::Single(value) => {
            let idx = params.push(value.clone());
            format!("{} {} ${}", field, operator.as_sql(), idx)
        }
        Operand::List(values) => {
            if values.is_empty() {
                // Empty IN list - always false / true
                return if operator == Operator::In {
                    "1=0".to_string()
                } else {
                    "1=1".to_string()
                };
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| format!("${}", params.push(v.clone())))
                .collect();
            format!("{} {} ({})", field, operator.as_sql(), placeholders.join(", "))
        }
    }
}
