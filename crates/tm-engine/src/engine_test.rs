use super::*;
use crate::ledger::LEDGER_TABLE;
use tm_core::{fingerprint, CoreError};
use tm_db::test_utils::{Call, RecordingConnector, RecordingHandle};
use tm_db::SqlValue;

fn task(name: &str, order: i64, text: &str) -> Task {
    Task::new(name, Some(order), text, None)
}

/// Connector whose ledger table already has the current schema.
fn connector_with_ledger() -> (RecordingConnector, RecordingHandle) {
    let conn = RecordingConnector::new();
    let handle = conn.handle();
    handle.with_table(LEDGER_TABLE, &["version", "task", "query_hash", "applied"]);
    (conn, handle)
}

fn sample_changes() -> Vec<Change> {
    vec![
        Change::new(
            "1.0.1",
            vec![
                task("second", 2, "INSERT INTO t VALUES (2)"),
                task("first", 1, "INSERT INTO t VALUES (1)"),
            ],
        ),
        Change::new("1.0.0", vec![task("create", 1, "CREATE TABLE t (id INT)")]),
    ]
}

#[test]
fn test_run_applies_in_version_then_task_order() {
    let (conn, handle) = connector_with_ledger();

    let summary = Engine::new(conn).run(sample_changes()).unwrap();

    assert_eq!(
        handle.committed_statements(),
        [
            "CREATE TABLE t (id INT)",
            "INSERT INTO t VALUES (1)",
            "INSERT INTO t VALUES (2)"
        ]
    );
    let rows = handle.committed_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], SqlValue::from("1.0.0"));
    assert_eq!(rows[1][1], SqlValue::from("first"));
    assert_eq!(
        rows[2][2],
        SqlValue::BigInt(fingerprint("INSERT INTO t VALUES (2)"))
    );

    assert_eq!(handle.count(&Call::Commit), 1);
    assert_eq!(handle.count(&Call::Close), 1);
    assert_eq!(handle.count(&Call::RollBack), 0);
    assert_eq!(handle.calls().last(), Some(&Call::Close));

    assert_eq!(summary.schema, SchemaStatus::Current);
    assert_eq!(summary.applied.len(), 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.statements_executed, 3);
}

#[test]
fn test_run_creates_ledger_on_empty_database() {
    let conn = RecordingConnector::new();
    let handle = conn.handle();

    let summary = Engine::new(conn).run(sample_changes()).unwrap();

    assert_eq!(summary.schema, SchemaStatus::Created);
    assert_eq!(handle.committed_rows().len(), 3);
    // schema DDL commit plus the final commit
    assert_eq!(handle.count(&Call::Commit), 2);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn test_recorded_tasks_are_skipped() {
    let (conn, handle) = connector_with_ledger();
    handle.with_row(vec![
        "1.0.0".into(),
        "create".into(),
        SqlValue::BigInt(fingerprint("CREATE TABLE t (id INT)")),
        SqlValue::Null,
    ]);

    let summary = Engine::new(conn).run(sample_changes()).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.statements_executed, 2);
    assert!(!handle
        .executed_statements()
        .contains(&"CREATE TABLE t (id INT)".to_string()));
    assert_eq!(handle.committed_rows().len(), 3);
}

#[test]
fn test_legacy_row_without_fingerprint_is_skipped() {
    let (conn, handle) = connector_with_ledger();
    handle.with_row(vec![
        "1.0.0".into(),
        "create".into(),
        SqlValue::Null,
        SqlValue::Null,
    ]);

    let summary = Engine::new(conn)
        .run(vec![Change::new(
            "1.0.0",
            vec![task("create", 1, "CREATE TABLE changed (id INT)")],
        )])
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(handle.executed_statements().is_empty());
}

#[test]
fn test_changed_statements_are_reapplied() {
    let (conn, handle) = connector_with_ledger();
    handle.with_row(vec![
        "1.0.0".into(),
        "create".into(),
        SqlValue::BigInt(fingerprint("CREATE TABLE old (id INT)")),
        SqlValue::Null,
    ]);

    let summary = Engine::new(conn)
        .run(vec![Change::new(
            "1.0.0",
            vec![task("create", 1, "CREATE TABLE new (id INT)")],
        )])
        .unwrap();

    assert_eq!(summary.applied.len(), 1);
    assert_eq!(handle.executed_statements(), ["CREATE TABLE new (id INT)"]);
    assert_eq!(handle.committed_rows().len(), 2);
}

#[test]
fn test_failed_statement_rolls_back_everything() {
    let (conn, handle) = connector_with_ledger();
    handle.fail_statement("INSERT INTO t VALUES (1)");

    let err = Engine::new(conn).run(sample_changes()).unwrap_err();

    match err {
        EngineError::StatementExecution {
            version,
            task,
            statement,
            ..
        } => {
            assert_eq!(version, "1.0.1");
            assert_eq!(task, "first");
            assert_eq!(statement, "INSERT INTO t VALUES (1)");
        }
        other => panic!("unexpected error: {other}"),
    }

    // first change ran but nothing survived
    assert!(handle
        .executed_statements()
        .contains(&"CREATE TABLE t (id INT)".to_string()));
    assert!(handle.committed_statements().is_empty());
    assert!(handle.committed_rows().is_empty());
    // the failing task stops the run
    assert!(!handle
        .executed_statements()
        .contains(&"INSERT INTO t VALUES (2)".to_string()));

    assert_eq!(handle.count(&Call::Commit), 0);
    assert_eq!(handle.count(&Call::RollBack), 1);
    assert_eq!(handle.count(&Call::Close), 1);
    assert!(handle.is_closed());
}

#[test]
fn test_second_statement_failure_in_one_task() {
    let (conn, handle) = connector_with_ledger();
    handle.fail_statement("bad");

    let err = Engine::new(conn)
        .run(vec![Change::new(
            "1",
            vec![task("pair", 1, "CREATE TABLE a (id INT); bad")],
        )])
        .unwrap_err();

    assert!(matches!(err, EngineError::StatementExecution { .. }));
    assert!(handle.committed_statements().is_empty());
    assert!(handle.committed_rows().is_empty());
}

#[test]
fn test_duplicate_version_fails_before_any_database_call() {
    let conn = RecordingConnector::new();
    let handle = conn.handle();

    let err = Engine::new(conn)
        .run(vec![
            Change::new("1", vec![task("a", 1, "SELECT 1")]),
            Change::new("1", vec![task("b", 1, "SELECT 2")]),
        ])
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Core(CoreError::DuplicateVersion { ref version }) if version == "1"
    ));
    assert!(err.is_pre_execution());
    assert_eq!(handle.calls(), [Call::Close]);
}

#[test]
fn test_malformed_version_fails_before_any_database_call() {
    let conn = RecordingConnector::new();
    let handle = conn.handle();

    let err = Engine::new(conn)
        .run(vec![Change::new("1.x", vec![task("a", 1, "SELECT 1")])])
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Core(CoreError::MalformedVersion { .. })
    ));
    assert_eq!(handle.calls(), [Call::Close]);
}

#[test]
fn test_schema_failure_rolls_back_and_closes() {
    let conn = RecordingConnector::new();
    let handle = conn.handle();
    handle.fail_inspection();

    let err = Engine::new(conn).run(sample_changes()).unwrap_err();

    assert!(matches!(err, EngineError::Schema { .. }));
    assert!(handle.executed_statements().is_empty());
    assert_eq!(handle.count(&Call::RollBack), 1);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn test_commit_failure_rolls_back() {
    let (conn, handle) = connector_with_ledger();
    handle.fail_commit();

    let err = Engine::new(conn).run(sample_changes()).unwrap_err();

    assert!(matches!(err, EngineError::Commit { .. }));
    assert!(handle.committed_rows().is_empty());
    assert_eq!(handle.count(&Call::RollBack), 1);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn test_close_failure_after_commit_is_not_an_error() {
    let (conn, handle) = connector_with_ledger();
    handle.fail_close();

    let summary = Engine::new(conn).run(sample_changes()).unwrap();

    assert_eq!(summary.applied.len(), 3);
    assert_eq!(handle.committed_rows().len(), 3);
}

#[test]
fn test_empty_batch_commits_and_closes() {
    let (conn, handle) = connector_with_ledger();

    let summary = Engine::new(conn).run(Vec::new()).unwrap();

    assert!(summary.applied.is_empty());
    assert_eq!(handle.count(&Call::Commit), 1);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn test_equal_orders_keep_declaration_order() {
    let (conn, handle) = connector_with_ledger();

    Engine::new(conn)
        .run(vec![Change::new(
            "1",
            vec![
                task("b", 5, "SELECT 'b'"),
                task("a", 5, "SELECT 'a'"),
                Task::new("last", None, "SELECT 'last'", None),
                task("early", 1, "SELECT 'early'"),
            ],
        )])
        .unwrap();

    assert_eq!(
        handle.committed_statements(),
        ["SELECT 'early'", "SELECT 'b'", "SELECT 'a'", "SELECT 'last'"]
    );
}

#[test]
fn test_summary_serializes_duration_in_millis() {
    let (conn, _) = connector_with_ledger();
    let summary = Engine::new(conn).run(sample_changes()).unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert!(json["duration_ms"].is_u64());
    assert_eq!(json["schema"], "current");
    assert_eq!(json["applied"][0]["version"], "1.0.0");
    assert_eq!(json["statements_executed"], 3);
}
