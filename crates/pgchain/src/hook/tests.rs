use super::*;
use crate::builder::Table;
use crate::error::{OrmError, OrmResult};
use crate::gateway::MemoryGateway;
use crate::row::Record;
use crate::value::{Payload, Value};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Records every invocation as `<name>:<event>`.
struct Recorder {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl Hook for Recorder {
    async fn on_before(&self, ctx: &HookContext<'_>) -> OrmResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, ctx.event));
        Ok(())
    }

    async fn on_after(&self, ctx: &HookContext<'_>, result: &QueryResult) -> OrmResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", self.name, ctx.event, result));
        Ok(())
    }
}

fn users() -> Table {
    Table::new("users").unwrap()
}

#[test]
fn test_event_names() {
    let names: Vec<String> = HookEvent::all().map(|e| e.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "beforeSelect",
            "afterSelect",
            "beforeInsert",
            "afterInsert",
            "beforeUpdate",
            "afterUpdate",
            "beforeDelete",
            "afterDelete",
        ]
    );
}

#[test]
fn test_registry_remove_is_idempotent() {
    let registry = HookRegistry::new();
    let a = registry.before(Operation::Select, |_| Ok(()));
    let b = registry.after(Operation::Select, |_, _| Ok(()));
    assert_eq!(registry.len(), 2);

    assert!(registry.remove(a));
    assert!(!registry.remove(a));
    assert_eq!(registry.hooks_for(HookEvent::before(Operation::Select)).len(), 0);
    assert_eq!(registry.hooks_for(HookEvent::after(Operation::Select)).len(), 1);

    registry.clear();
    assert!(registry.is_empty());
    assert!(!registry.remove(b));
}

#[test]
fn test_register_global_covers_every_event() {
    let registry = HookRegistry::new();
    let ids = registry.register_global(StatsHook::new());
    assert_eq!(ids.len(), 8);
    for event in HookEvent::all() {
        assert_eq!(registry.hooks_for(event).len(), 1);
    }
}

#[test]
fn test_pipeline_config_truncates_logged_sql() {
    let config = PipelineConfig::new().with_max_logged_sql_length(6);
    assert_eq!(config.loggable_sql("SELECT * FROM users"), "SELECT...");
    assert_eq!(
        config.no_sql_truncation().loggable_sql("SELECT * FROM users"),
        "SELECT * FROM users"
    );
    assert!(PipelineConfig::default().warn_on_unscoped);
}

#[test]
fn test_truncate_sql_bytes_respects_char_boundary() {
    assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    assert_eq!(truncate_sql_bytes("abc", 10), "abc");
}

#[tokio::test]
async fn test_hooks_run_in_registration_order() {
    let t = users();
    let log = new_log();
    t.hooks().register_global(Recorder {
        name: "first",
        log: log.clone(),
    });
    t.hooks().register_global(Recorder {
        name: "second",
        log: log.clone(),
    });

    let gw = MemoryGateway::new().with_rows(vec![Record::new().with("id", 1)]);
    let rows: Vec<Record> = t
        .query()
        .all(&gw)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(rows.len(), 1);

    assert_eq!(
        entries(&log),
        vec![
            "first:beforeSelect",
            "second:beforeSelect",
            "first:afterSelect:1 rows",
            "second:afterSelect:1 rows",
        ]
    );
}

#[tokio::test]
async fn test_failing_before_insert_blocks_everything() {
    let t = users();
    let log = new_log();
    t.hooks().before(Operation::Insert, |_| {
        Err(OrmError::invalid_query("name is reserved"))
    });
    let after_log = log.clone();
    t.hooks().after(Operation::Insert, move |ctx, _| {
        after_log.lock().unwrap().push(ctx.event.to_string());
        Ok(())
    });

    let gw = MemoryGateway::new().with_affected(1);
    let err = t
        .query()
        .insert(&gw, &Payload::new().set("name", "root"))
        .await
        .unwrap_err();

    assert!(err.is_hook());
    assert_eq!(err.to_string(), "Hook error in beforeInsert: Invalid query: name is reserved");
    assert_eq!(gw.call_count(), 0);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_before_hook_sees_insert_payload() {
    let t = users();
    let seen = new_log();
    let sink = seen.clone();
    t.hooks().before(Operation::Insert, move |ctx| {
        let payload = ctx.payload().expect("insert carries a payload");
        let cols: Vec<&str> = payload.columns().collect();
        sink.lock().unwrap().push(cols.join(","));
        assert!(ctx.compiled.is_none());
        assert_eq!(ctx.stage, Stage::BeforeHooks);
        Ok(())
    });

    let gw = MemoryGateway::new().with_affected(1);
    let done = t
        .query()
        .insert(&gw, &Payload::new().set("name", "a").set("email", "a@x"))
        .await
        .unwrap();
    assert!(done.is_clean());
    assert_eq!(entries(&seen), vec!["name,email"]);
}

#[tokio::test]
async fn test_gateway_failure_skips_after_hooks() {
    let t = users();
    let log = new_log();
    t.hooks().register_global(Recorder {
        name: "r",
        log: log.clone(),
    });

    let gw = MemoryGateway::new().failing("relation \"users\" does not exist");
    let err = t.query().all::<Record, _>(&gw).await.unwrap_err();

    assert!(matches!(err, OrmError::QueryExecution { .. }));
    assert_eq!(entries(&log), vec!["r:beforeSelect"]);
}

#[tokio::test]
async fn test_after_hook_failure_keeps_result() {
    let t = users();
    t.hooks()
        .after(Operation::Update, |_, _| Err(OrmError::invalid_query("audit down")));

    let gw = MemoryGateway::new().with_affected(3);
    let done = t
        .query()
        .filter()
        .field("team_id")
        .is(1)
        .update(&gw, &Payload::new().set("active", false))
        .await
        .unwrap();

    assert_eq!(done.value, 3);
    let err = done.after_hook_error.as_ref().unwrap();
    assert!(err.is_hook());
    assert!(done.suppressed.is_none());

    let err = done.into_result().unwrap_err();
    assert!(err.to_string().contains("afterUpdate"));
}

#[tokio::test]
async fn test_after_hook_failure_stops_later_after_hooks() {
    let t = users();
    let log = new_log();
    t.hooks()
        .after(Operation::Select, |_, _| Err(OrmError::invalid_query("boom")));
    t.hooks().register(
        HookEvent::after(Operation::Select),
        Recorder {
            name: "late",
            log: log.clone(),
        },
    );

    let gw = MemoryGateway::new();
    let done = t.query().all::<Record, _>(&gw).await.unwrap();
    assert!(done.after_hook_error.is_some());
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_error_handler_can_suppress() {
    let contexts = new_log();
    let sink = contexts.clone();
    let t = users().with_error_handler(move |_: &OrmError, context: &str| {
        sink.lock().unwrap().push(context.to_string());
        ErrorDisposition::Suppress
    });

    let gw = MemoryGateway::new().failing("connection reset");
    let done = t
        .query()
        .filter()
        .field("id")
        .is(1)
        .fetch::<Record, _>(&gw)
        .await
        .unwrap();

    assert!(done.value.is_none());
    assert!(done.suppressed.is_some());
    assert_eq!(entries(&contexts), vec!["execute SELECT on users"]);
}

#[tokio::test]
async fn test_error_handler_can_replace() {
    let t = users().with_error_handler(|err: &OrmError, _: &str| {
        ErrorDisposition::Replace(OrmError::Connection(format!("wrapped: {err}")))
    });
    t.hooks()
        .before(Operation::Delete, |_| Err(OrmError::invalid_query("read only")));

    let gw = MemoryGateway::new();
    let err = t
        .query()
        .filter()
        .field("id")
        .is(1)
        .delete(&gw)
        .await
        .unwrap_err();
    assert!(err.is_connection());
    assert!(err.to_string().contains("beforeDelete"));
}

#[tokio::test]
async fn test_invalid_query_bypasses_error_handler() {
    let calls = new_log();
    let sink = calls.clone();
    let t = users().with_error_handler(move |_: &OrmError, context: &str| {
        sink.lock().unwrap().push(context.to_string());
        ErrorDisposition::Suppress
    });

    let gw = MemoryGateway::new();
    let err = t
        .query()
        .filter()
        .field(" ")
        .is(1)
        .delete(&gw)
        .await
        .unwrap_err();

    assert!(err.is_invalid_query());
    assert!(entries(&calls).is_empty());
    assert_eq!(gw.call_count(), 0);
}

#[tokio::test]
async fn test_unscoped_delete_is_flagged() {
    let t = users();
    let flags = Arc::new(Mutex::new(Vec::new()));
    let before = flags.clone();
    t.hooks().before(Operation::Delete, move |ctx| {
        before.lock().unwrap().push(ctx.is_unscoped());
        Ok(())
    });
    let after = flags.clone();
    t.hooks().after(Operation::Delete, move |ctx, _| {
        after.lock().unwrap().push(ctx.is_unscoped());
        Ok(())
    });

    let gw = MemoryGateway::new().with_affected(42);
    let done = t.query().delete_all(&gw).await.unwrap();

    assert_eq!(done.value, 42);
    assert_eq!(gw.last().unwrap().sql, "DELETE FROM users");
    assert_eq!(*flags.lock().unwrap(), vec![true, true]);
}

#[tokio::test]
async fn test_unscoped_guard() {
    let t = users();
    t.hooks().register_global(UnscopedGuard::new().allow_update());
    let gw = MemoryGateway::new().with_affected(1);

    let err = t.query().delete_all(&gw).await.unwrap_err();
    assert!(err.is_hook());
    assert_eq!(gw.call_count(), 0);

    let ok = t
        .query()
        .update_all(&gw, &Payload::new().set("active", true))
        .await
        .unwrap();
    assert_eq!(ok.value, 1);

    let ok = t
        .query()
        .filter()
        .field("id")
        .is(1)
        .delete(&gw)
        .await
        .unwrap();
    assert_eq!(ok.value, 1);
}

#[tokio::test]
async fn test_stats_hook_counts_operations() {
    let t = users();
    let stats = Arc::new(StatsHook::new());
    let ids = t.hooks().register_global_arc(stats.clone());
    assert_eq!(ids.len(), 8);

    let gw = MemoryGateway::new()
        .with_rows(vec![Record::new(), Record::new()])
        .with_affected(2);
    let _ = t.query().all::<Record, _>(&gw).await.unwrap();
    let _ = t.query().delete_all(&gw).await.unwrap();
    let _ = t
        .query()
        .insert(&gw, &Payload::new().set("name", "x"))
        .await
        .unwrap();

    let s = stats.stats();
    assert_eq!(s.select_count, 1);
    assert_eq!(s.delete_count, 1);
    assert_eq!(s.insert_count, 1);
    assert_eq!(s.rows_returned, 2);
    assert_eq!(s.rows_affected, 4);
    assert_eq!(s.unscoped_count, 1);
    assert_eq!(s.total(), 3);

    stats.reset();
    assert_eq!(stats.stats(), HookStats::default());
}

#[tokio::test]
async fn test_tracing_hook_is_transparent() {
    let t = users();
    t.hooks()
        .register_global(TracingSqlHook::new().level(tracing::Level::INFO).max_sql_length(10));

    let gw = MemoryGateway::new().with_rows(vec![Record::new().with("id", 1)]);
    let done = t
        .query()
        .filter()
        .field("id")
        .in_list([1, 2])
        .all::<Record, _>(&gw)
        .await
        .unwrap();
    assert!(done.is_clean());
    assert_eq!(
        gw.last().unwrap().params,
        vec![Value::Int(1), Value::Int(2)]
    );
}

#[tokio::test]
async fn test_mapping_failure_goes_through_handler() {
    let contexts = new_log();
    let sink = contexts.clone();
    let t = users().with_error_handler(move |err: &OrmError, context: &str| {
        sink.lock().unwrap().push(context.to_string());
        assert!(matches!(err, OrmError::Mapping { .. }));
        ErrorDisposition::Rethrow
    });

    let gw = MemoryGateway::new().with_rows(vec![Record::new().with("id", "x")]);
    let err = t
        .query()
        .all_with(&gw, |row: &Record| row.try_get::<i64>("id"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrmError::Mapping { .. }));
    assert_eq!(entries(&contexts), vec!["map rows of users"]);
}

#[tokio::test]
async fn test_mapping_failure_keeps_after_hook_error() {
    let t = users();
    t.hooks()
        .after(Operation::Select, |_, _| Err(OrmError::invalid_query("audit down")));

    let gw = MemoryGateway::new().with_rows(vec![Record::new().with("id", "x")]);
    let err = t
        .query()
        .all_with(&gw, |row: &Record| row.try_get::<i64>("id"))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), OrmError::Mapping { .. }));
    let after = err.after_hook_error().unwrap();
    assert!(after.is_hook());
    assert!(after.to_string().contains("audit down"));
    assert!(err.to_string().contains("audit down"));
}

#[tokio::test]
async fn test_suppressed_mapping_failure_keeps_after_hook_error() {
    let t = users().with_error_handler(|err: &OrmError, _: &str| {
        if err.is_hook() {
            ErrorDisposition::Rethrow
        } else {
            ErrorDisposition::Suppress
        }
    });
    t.hooks()
        .after(Operation::Select, |_, _| Err(OrmError::invalid_query("audit down")));

    let gw = MemoryGateway::new().with_rows(vec![Record::new().with("id", "x")]);
    let done = t
        .query()
        .all_with(&gw, |row: &Record| row.try_get::<i64>("id"))
        .await
        .unwrap();

    assert!(done.value.is_empty());
    assert!(matches!(done.suppressed, Some(OrmError::Mapping { .. })));
    let after = done.after_hook_error.as_ref().unwrap();
    assert!(after.to_string().contains("audit down"));
}
