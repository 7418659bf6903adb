use crate::compiler::Compiled;
use crate::error::OrmResult;
use crate::intent::QueryIntent;
use crate::value::Payload;
use async_trait::async_trait;
use std::fmt;

/// The data operation a terminal call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// All operations, in event-name order.
    pub const ALL: [Operation; 4] = [
        Operation::Select,
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
    ];

    fn event_name(&self) -> &'static str {
        match self {
            Operation::Select => "Select",
            Operation::Insert => "Insert",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Select => "SELECT",
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Whether a hook runs before or after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    After,
}

/// An `(operation, phase)` pair, displayed as `beforeSelect` … `afterDelete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookEvent {
    pub operation: Operation,
    pub phase: Phase,
}

impl HookEvent {
    pub const fn new(operation: Operation, phase: Phase) -> Self {
        Self { operation, phase }
    }

    pub const fn before(operation: Operation) -> Self {
        Self::new(operation, Phase::Before)
    }

    pub const fn after(operation: Operation) -> Self {
        Self::new(operation, Phase::After)
    }

    /// All eight events.
    pub fn all() -> impl Iterator<Item = HookEvent> {
        Operation::ALL
            .into_iter()
            .flat_map(|op| [HookEvent::before(op), HookEvent::after(op)])
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Before => "before",
            Phase::After => "after",
        };
        write!(f, "{phase}{}", self.operation.event_name())
    }
}

/// What a hook is looking at. Insert and update carry their payload.
#[derive(Debug, Clone, Copy)]
pub enum HookTarget<'a> {
    Select {
        intent: &'a QueryIntent,
    },
    Insert {
        intent: &'a QueryIntent,
        payload: &'a Payload,
    },
    Update {
        intent: &'a QueryIntent,
        payload: &'a Payload,
    },
    Delete {
        intent: &'a QueryIntent,
    },
}

impl<'a> HookTarget<'a> {
    pub fn operation(&self) -> Operation {
        match self {
            HookTarget::Select { .. } => Operation::Select,
            HookTarget::Insert { .. } => Operation::Insert,
            HookTarget::Update { .. } => Operation::Update,
            HookTarget::Delete { .. } => Operation::Delete,
        }
    }

    pub fn intent(&self) -> &'a QueryIntent {
        match self {
            HookTarget::Select { intent }
            | HookTarget::Insert { intent, .. }
            | HookTarget::Update { intent, .. }
            | HookTarget::Delete { intent } => intent,
        }
    }

    pub fn payload(&self) -> Option<&'a Payload> {
        match self {
            HookTarget::Insert { payload, .. } | HookTarget::Update { payload, .. } => {
                Some(payload)
            }
            _ => None,
        }
    }
}

/// Lifecycle of one terminal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    BeforeHooks,
    Compiling,
    Executing,
    AfterHooks,
    Done,
    Failed,
}

/// Context passed to every hook invocation.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub target: HookTarget<'a>,
    pub event: HookEvent,
    pub stage: Stage,
    /// Compiled statement. `None` during before-hooks.
    pub compiled: Option<&'a Compiled>,
}

impl<'a> HookContext<'a> {
    pub fn operation(&self) -> Operation {
        self.target.operation()
    }

    pub fn table(&self) -> &'a str {
        self.target.intent().table()
    }

    pub fn intent(&self) -> &'a QueryIntent {
        self.target.intent()
    }

    pub fn payload(&self) -> Option<&'a Payload> {
        self.target.payload()
    }

    /// Whether this is an UPDATE or DELETE without a WHERE clause.
    pub fn is_unscoped(&self) -> bool {
        if let Some(compiled) = self.compiled {
            return compiled.unscoped;
        }
        matches!(
            self.target,
            HookTarget::Update { .. } | HookTarget::Delete { .. }
        ) && !self.target.intent().is_scoped()
    }
}

/// Result summary handed to after-hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResult {
    /// Rows returned by a SELECT.
    Rows(usize),
    /// Rows affected by a mutation.
    Affected(u64),
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
        }
    }
}

/// A callback around data operations.
///
/// Hooks registered for a before-event get [`Hook::on_before`]; hooks
/// registered for an after-event get [`Hook::on_after`]. Returning an error
/// from `on_before` aborts the operation before any SQL is compiled.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn on_before(&self, ctx: &HookContext<'_>) -> OrmResult<()> {
        let _ = ctx;
        Ok(())
    }

    async fn on_after(&self, ctx: &HookContext<'_>, result: &QueryResult) -> OrmResult<()> {
        let _ = (ctx, result);
        Ok(())
    }
}

/// Adapts a synchronous closure into a before-hook.
pub(crate) struct BeforeFn<F>(pub(crate) F);

#[async_trait]
impl<F> Hook for BeforeFn<F>
where
    F: Fn(&HookContext<'_>) -> OrmResult<()> + Send + Sync,
{
    async fn on_before(&self, ctx: &HookContext<'_>) -> OrmResult<()> {
        (self.0)(ctx)
    }
}

/// Adapts a synchronous closure into an after-hook.
pub(crate) struct AfterFn<F>(pub(crate) F);

#[async_trait]
impl<F> Hook for AfterFn<F>
where
    F: Fn(&HookContext<'_>, &QueryResult) -> OrmResult<()> + Send + Sync,
{
    async fn on_after(&self, ctx: &HookContext<'_>, result: &QueryResult) -> OrmResult<()> {
        (self.0)(ctx, result)
    }
}
