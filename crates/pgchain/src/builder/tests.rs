use super::*;
use crate::gateway::MemoryGateway;
use crate::row::Record;
use crate::value::Value;

fn users() -> Table {
    Table::new("users").unwrap()
}

#[test]
fn test_empty_table_name_is_rejected() {
    assert!(Table::new("").unwrap_err().is_invalid_query());
    assert!(Table::new(" \t").is_err());
}

#[test]
fn test_simple_select() {
    let t = users();
    assert_eq!(t.query().to_sql().unwrap(), "SELECT * FROM users");
}

#[test]
fn test_where_with_and() {
    let t = users();
    let c = t
        .query()
        .filter()
        .field("age")
        .is(30)
        .and()
        .filter()
        .field("name")
        .like("%John%")
        .compile(Operation::Select, None)
        .unwrap();

    assert_eq!(c.sql, "SELECT * FROM users WHERE age = $1 AND name LIKE $2");
    assert_eq!(c.params, vec![Value::Int(30), Value::from("%John%")]);
}

#[test]
fn test_clause_order_does_not_matter() {
    let t = users();
    let expected = "SELECT id, name FROM users WHERE age = $1 ORDER BY name LIMIT 5";

    let a = t
        .query()
        .select()
        .fields(["id", "name"])
        .filter()
        .field("age")
        .is(30)
        .limit()
        .to(5)
        .order()
        .by("name")
        .compile(Operation::Select, None)
        .unwrap();
    let b = t
        .query()
        .limit()
        .to(5)
        .order()
        .by("name")
        .filter()
        .field("age")
        .is(30)
        .select()
        .fields(["id", "name"])
        .compile(Operation::Select, None)
        .unwrap();
    let c = t
        .query()
        .order()
        .by("name")
        .select()
        .fields(["id", "name"])
        .limit()
        .to(5)
        .filter()
        .field("age")
        .is(30)
        .compile(Operation::Select, None)
        .unwrap();

    for compiled in [&a, &b, &c] {
        assert_eq!(compiled.sql, expected);
        assert_eq!(compiled.params, vec![Value::Int(30)]);
    }
}

#[test]
fn test_last_write_wins_within_a_family() {
    let t = users();
    let sql = t
        .query()
        .select()
        .fields(["id", "name"])
        .select()
        .all()
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users");

    let sql = t
        .query()
        .limit()
        .to(10)
        .limit()
        .to(3)
        .order()
        .by("name")
        .order()
        .by_desc("age")
        .group()
        .by(["a"])
        .group()
        .by(["b"])
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users GROUP BY b ORDER BY age DESC LIMIT 3");
}

#[test]
fn test_then_by_appends() {
    let t = users();
    let sql = t
        .query()
        .order()
        .by("last_name")
        .order()
        .then_by("first_name")
        .order()
        .then_by_desc("id")
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM users ORDER BY last_name, first_name, id DESC"
    );
}

#[test]
fn test_distinct_applies_to_active_columns() {
    let t = users();
    let sql = t
        .query()
        .select()
        .distinct()
        .select()
        .fields(["city", "city", "country"])
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT DISTINCT city, country FROM users");
}

#[test]
fn test_connector_affects_only_next_condition() {
    let t = users();
    let sql = t
        .query()
        .filter()
        .field("a")
        .is(1)
        .or()
        .filter()
        .field("b")
        .is(2)
        .filter()
        .field("c")
        .is(3)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users WHERE a = $1 OR b = $2 AND c = $3");
}

#[test]
fn test_dangling_connector_is_dropped() {
    let t = users();
    let sql = t
        .query()
        .filter()
        .field("a")
        .is(1)
        .or()
        .limit()
        .to(1)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users WHERE a = $1 LIMIT 1");

    let sql = t.query().or().to_sql().unwrap();
    assert_eq!(sql, "SELECT * FROM users");
}

#[test]
fn test_leading_connector_is_not_rendered() {
    let t = users();
    let sql = t
        .query()
        .or()
        .filter()
        .field("a")
        .is(1)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users WHERE a = $1");
}

#[test]
fn test_pending_connector_is_shared_with_having() {
    let t = users();
    let c = t
        .query()
        .group()
        .by(["team_id"])
        .having()
        .field("COUNT(*)")
        .gt(5)
        .or()
        .having()
        .field("SUM(score)")
        .gte(100)
        .filter()
        .field("active")
        .is(true)
        .compile(Operation::Select, None)
        .unwrap();

    assert_eq!(
        c.sql,
        "SELECT * FROM users WHERE active = $1 GROUP BY team_id \
         HAVING COUNT(*) > $2 OR SUM(score) >= $3"
    );
    assert_eq!(
        c.params,
        vec![Value::Bool(true), Value::Int(5), Value::Int(100)]
    );
}

#[test]
fn test_grouped_conditions() {
    let t = users();
    let sql = t
        .query()
        .filter()
        .field("active")
        .is(true)
        .filter()
        .grouped(|g| {
            g.field("role")
                .is("admin")
                .or()
                .grouped(|g| g.field("role").is("owner").field("verified").is(true))
        })
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM users WHERE active = $1 AND (role = $2 OR (role = $3 AND verified = $4))"
    );
}

#[test]
fn test_empty_group_is_dropped() {
    let t = users();
    let sql = t
        .query()
        .filter()
        .field("a")
        .is(1)
        .or()
        .filter()
        .grouped(|g| g)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM users WHERE a = $1");
}

#[test]
fn test_in_list_and_null_checks() {
    let t = users();
    let c = t
        .query()
        .filter()
        .field("id")
        .in_list([1, 2, 3])
        .filter()
        .field("deleted_at")
        .is_null()
        .filter()
        .field("status")
        .not_in(Vec::<String>::new())
        .compile(Operation::Select, None)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT * FROM users WHERE id IN ($1, $2, $3) AND deleted_at IS NULL AND 1=1"
    );
    assert_eq!(c.params.len(), 3);
}

#[test]
fn test_placeholders_are_contiguous() {
    let t = users();
    let c = t
        .query()
        .having()
        .field("COUNT(*)")
        .lt(10)
        .filter()
        .field("a")
        .ne(1)
        .filter()
        .field("b")
        .in_list(["x", "y"])
        .group()
        .by(["a"])
        .compile(Operation::Select, None)
        .unwrap();

    let placeholders = c.sql.matches('$').count();
    assert_eq!(placeholders, c.params.len());
    for n in 1..=c.params.len() {
        assert!(c.sql.contains(&format!("${n}")), "missing ${n} in {}", c.sql);
    }
}

#[test]
fn test_empty_field_surfaces_at_compile() {
    let t = users();
    let chain = t.query().filter().field("").is(1);
    assert!(chain.intent().build_error().is_some());
    let err = chain.to_sql().unwrap_err();
    assert!(err.is_invalid_query());
}

#[test]
fn test_joins_and_unions() {
    let t = Table::new("users u").unwrap();
    let sql = t
        .query()
        .union()
        .all("SELECT * FROM admins a")
        .join()
        .left("teams t", "t.id = u.team_id")
        .join()
        .inner("orgs o", "o.id = t.org_id")
        .select()
        .fields(["u.id", "t.name"])
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT u.id, t.name FROM users u LEFT JOIN teams t ON t.id = u.team_id \
         INNER JOIN orgs o ON o.id = t.org_id UNION ALL SELECT * FROM admins a"
    );
}

#[test]
fn test_table_names_must_be_table_references() {
    for bad in ["users; DROP TABLE users; --", "users WHERE 1=1", "users -- comment"] {
        assert!(Table::new(bad).unwrap_err().is_invalid_query(), "{bad:?}");
    }
    let t = Table::new(r#"public."UserAccounts" AS ua"#).unwrap();
    assert_eq!(t.name(), r#"public."UserAccounts" ua"#);
}

#[test]
fn test_non_identifiers_are_build_errors() {
    let t = users();

    let chain = t.query().filter().field("1=1 OR id").is(5);
    assert!(chain.intent().filter().is_empty());
    assert!(chain.to_sql().unwrap_err().is_invalid_query());

    let err = t
        .query()
        .select()
        .fields(["id FROM secrets --"])
        .to_sql()
        .unwrap_err();
    assert!(err.is_invalid_query());

    let err = t
        .query()
        .order()
        .by("(SELECT pg_sleep(10))")
        .to_sql()
        .unwrap_err();
    assert!(err.is_invalid_query());

    let err = t
        .query()
        .group()
        .by(["team_id; DELETE FROM users"])
        .to_sql()
        .unwrap_err();
    assert!(err.is_invalid_query());

    let err = t
        .query()
        .join()
        .inner("teams t; --", "t.id = users.team_id")
        .to_sql()
        .unwrap_err();
    assert!(err.is_invalid_query());

    let err = t
        .query()
        .having()
        .field("COUNT(*) > 0 OR 1")
        .gt(1)
        .to_sql()
        .unwrap_err();
    assert!(err.is_invalid_query());
}

#[test]
fn test_having_raw_expression() {
    let t = users();
    let c = t
        .query()
        .group()
        .by(["team_id"])
        .having()
        .raw("SUM(price * qty)")
        .gt(100)
        .and()
        .having()
        .grouped(|g| {
            g.field("COUNT(DISTINCT user_id)")
                .gte(2)
                .or()
                .field("MAX(score)")
                .is(10)
        })
        .compile(Operation::Select, None)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT * FROM users GROUP BY team_id \
         HAVING SUM(price * qty) > $1 AND (COUNT(DISTINCT user_id) >= $2 OR MAX(score) = $3)"
    );
}

#[test]
fn test_connector_before_an_empty_clause_is_dropped() {
    let t = users();
    let c = t
        .query()
        .filter()
        .field("a")
        .is(1)
        .or()
        .having()
        .field("COUNT(*)")
        .gt(1)
        .filter()
        .field("b")
        .is(2)
        .compile(Operation::Select, None)
        .unwrap();
    assert_eq!(
        c.sql,
        "SELECT * FROM users WHERE a = $1 AND b = $2 HAVING COUNT(*) > $3"
    );
}

#[test]
fn test_each_query_call_starts_fresh() {
    let t = users();
    let first = t.query().filter().field("id").is(1);
    let second = t.query();
    assert!(first.intent().is_scoped());
    assert!(!second.intent().is_scoped());
}

#[test]
fn test_delete_on_open_chain_is_unscoped() {
    let t = users();
    let c = t.query().compile(Operation::Delete, None).unwrap();
    assert_eq!(c.sql, "DELETE FROM users");
    assert!(c.unscoped);
}

#[tokio::test]
async fn test_all_maps_rows() {
    let t = users();
    let gw = MemoryGateway::new().with_rows(vec![
        Record::new().with("id", 1).with("name", "ann"),
        Record::new().with("id", 2).with("name", "bob"),
    ]);

    let names = t
        .query()
        .select()
        .fields(["id", "name"])
        .all_with(&gw, |row: &Record| row.try_get::<String>("name"))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(names, vec!["ann".to_string(), "bob".to_string()]);
    assert_eq!(gw.last().unwrap().sql, "SELECT id, name FROM users");
}

#[tokio::test]
async fn test_fetch_returns_first_row() {
    let t = users();
    let gw = MemoryGateway::new().with_rows(vec![
        Record::new().with("id", 1),
        Record::new().with("id", 2),
    ]);

    let row: Option<Record> = t
        .query()
        .filter()
        .field("id")
        .gt(0)
        .fetch(&gw)
        .await
        .unwrap()
        .value;
    assert_eq!(row.unwrap().get::<i64>("id"), Some(1));

    let empty = MemoryGateway::new();
    let row: Option<Record> = t.query().fetch(&empty).await.unwrap().value;
    assert!(row.is_none());
}

#[tokio::test]
async fn test_insert_update_delete() {
    let t = users();
    let gw = MemoryGateway::new().with_affected(1);
    let payload = Payload::new().set("name", "alice").set("age", 30);

    let n = t.query().insert(&gw, &payload).await.unwrap().value;
    assert_eq!(n, 1);

    let updated = t
        .query()
        .filter()
        .field("id")
        .is(9)
        .update(&gw, &Payload::new().set("age", 31))
        .await
        .unwrap();
    assert!(updated.is_clean());

    let deleted = t
        .query()
        .filter()
        .field("id")
        .is(9)
        .delete(&gw)
        .await
        .unwrap();
    assert_eq!(deleted.value, 1);

    let sqls: Vec<String> = gw.executed().into_iter().map(|e| e.sql).collect();
    assert_eq!(
        sqls,
        vec![
            "INSERT INTO users (name, age) VALUES ($1, $2)",
            "UPDATE users SET age = $1 WHERE id = $2",
            "DELETE FROM users WHERE id = $1",
        ]
    );
}

#[tokio::test]
async fn test_invalid_query_never_reaches_gateway() {
    let t = users();
    let gw = MemoryGateway::new();

    let err = t
        .query()
        .limit()
        .to(1)
        .delete_all(&gw)
        .await
        .unwrap_err();
    assert!(err.is_invalid_query());

    let err = t
        .query()
        .insert(&gw, &Payload::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_query());

    assert_eq!(gw.call_count(), 0);
}

#[tokio::test]
async fn test_injected_field_cannot_widen_a_delete() {
    let t = users();
    let gw = MemoryGateway::new().with_affected(100);

    let err = t
        .query()
        .filter()
        .field("1=1 OR id")
        .is(5)
        .delete(&gw)
        .await
        .unwrap_err();
    assert!(err.is_invalid_query());
    assert_eq!(gw.call_count(), 0);
}
