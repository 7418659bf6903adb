use super::types::{AfterFn, BeforeFn, Hook, HookContext, HookEvent, Operation, QueryResult};
use crate::error::OrmResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Handle returned by registration, used to remove a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Entry {
    id: HookId,
    hook: Arc<dyn Hook>,
}

/// Ordered hooks per [`HookEvent`].
///
/// Registration order is invocation order. The registry can be shared across
/// tasks; the pipeline takes a snapshot of the relevant list before awaiting
/// any hook, so registrations made mid-operation apply to the next call.
#[derive(Default)]
pub struct HookRegistry {
    next_id: AtomicU64,
    entries: RwLock<HashMap<HookEvent, Vec<Entry>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<HookEvent, Vec<Entry>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<HookEvent, Vec<Entry>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a hook for one event.
    pub fn register<H: Hook + 'static>(&self, event: HookEvent, hook: H) -> HookId {
        self.register_arc(event, Arc::new(hook))
    }

    /// Register an Arc-wrapped hook for one event.
    pub fn register_arc(&self, event: HookEvent, hook: Arc<dyn Hook>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write()
            .entry(event)
            .or_default()
            .push(Entry { id, hook });
        id
    }

    /// Register a closure that runs before `op`.
    pub fn before<F>(&self, op: Operation, f: F) -> HookId
    where
        F: Fn(&HookContext<'_>) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.register(HookEvent::before(op), BeforeFn(f))
    }

    /// Register a closure that runs after `op` succeeds.
    pub fn after<F>(&self, op: Operation, f: F) -> HookId
    where
        F: Fn(&HookContext<'_>, &QueryResult) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.register(HookEvent::after(op), AfterFn(f))
    }

    /// Register one hook for all eight events.
    pub fn register_global<H: Hook + 'static>(&self, hook: H) -> Vec<HookId> {
        self.register_global_arc(Arc::new(hook))
    }

    /// Register a shared hook for all eight events, keeping a handle to it
    /// (for reading [`StatsHook`](super::StatsHook) counters, say).
    pub fn register_global_arc(&self, hook: Arc<dyn Hook>) -> Vec<HookId> {
        HookEvent::all()
            .map(|event| self.register_arc(event, hook.clone()))
            .collect()
    }

    /// Remove a hook. Returns `false` if it was already gone.
    pub fn remove(&self, id: HookId) -> bool {
        let mut entries = self.write();
        for list in entries.values_mut() {
            if let Some(pos) = list.iter().position(|e| e.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every hook.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Snapshot of the hooks for `event`, in registration order.
    pub fn hooks_for(&self, event: HookEvent) -> Vec<Arc<dyn Hook>> {
        self.read()
            .get(&event)
            .map(|list| list.iter().map(|e| e.hook.clone()).collect())
            .unwrap_or_default()
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<String, usize> = self
            .read()
            .iter()
            .map(|(event, list)| (event.to_string(), list.len()))
            .collect();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}
