//! End-to-end runs against DuckDB database files.

use std::path::Path;
use tm_core::{Change, ChangeSetFormat, CoreError, Task};
use tm_db::{Connector, DbError, DuckDbConnector, SqlValue};
use tm_engine::{Engine, EngineError, Ledger, Migrator, RunOutcome, SchemaStatus, LEDGER_TABLE};

// ── Helpers ────────────────────────────────────────────────────────────

fn open(path: &Path) -> DuckDbConnector {
    DuckDbConnector::from_path(path).unwrap()
}

fn count(path: &Path, sql: &str) -> i64 {
    let mut db = open(path);
    let rows = db.query_rows(sql, &[]).unwrap();
    db.close().unwrap();
    rows[0][0].as_i64().unwrap()
}

fn table_exists(path: &Path, table: &str) -> bool {
    let mut db = open(path);
    let exists = db.table_exists(table).unwrap();
    db.close().unwrap();
    exists
}

fn task(name: &str, order: i64, text: &str) -> Task {
    Task::new(name, Some(order), text, None)
}

fn scenario() -> Vec<Change> {
    vec![
        Change::new(
            "1.0.1",
            vec![
                task("load", 2, "INSERT INTO users VALUES (1, 'ada')"),
                task("index", 1, "CREATE INDEX users_name ON users (name)"),
            ],
        ),
        Change::new(
            "1.0.0",
            vec![task("create", 1, "CREATE TABLE users (id INT, name VARCHAR)")],
        ),
    ]
}

// ── Runs ───────────────────────────────────────────────────────────────

#[test]
fn fresh_database_gets_all_tasks_and_three_ledger_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("app.duckdb");

    let summary = Engine::new(open(&db)).run(scenario()).unwrap();

    assert_eq!(summary.schema, SchemaStatus::Created);
    let applied: Vec<(&str, &str)> = summary
        .applied
        .iter()
        .map(|a| (a.version.as_str(), a.task.as_str()))
        .collect();
    assert_eq!(
        applied,
        [("1.0.0", "create"), ("1.0.1", "index"), ("1.0.1", "load")]
    );
    assert_eq!(count(&db, "SELECT COUNT(*) FROM change_set"), 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users"), 1);

    let records = Ledger::records(&mut open(&db)).unwrap();
    assert!(records.iter().all(|r| r.query_hash.is_some()));
    assert!(records.iter().all(|r| r.applied.is_some()));
}

#[test]
fn second_run_executes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("app.duckdb");

    Engine::new(open(&db)).run(scenario()).unwrap();
    let again = Engine::new(open(&db)).run(scenario()).unwrap();

    assert_eq!(again.schema, SchemaStatus::Current);
    assert!(again.applied.is_empty());
    assert_eq!(again.skipped, 3);
    assert_eq!(again.statements_executed, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM change_set"), 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users"), 1);
}

#[test]
fn failing_statement_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("app.duckdb");

    let err = Engine::new(open(&db))
        .run(vec![
            Change::new("1", vec![task("first", 1, "CREATE TABLE first (id INT)")]),
            Change::new(
                "2",
                vec![task(
                    "broken",
                    1,
                    "CREATE TABLE second (id INT); INSERT INTO nowhere VALUES (1)",
                )],
            ),
        ])
        .unwrap_err();

    match err {
        EngineError::StatementExecution {
            version,
            task,
            statement,
            source,
        } => {
            assert_eq!(version, "2");
            assert_eq!(task, "broken");
            assert_eq!(statement, "INSERT INTO nowhere VALUES (1)");
            assert!(matches!(source, DbError::TableNotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(!table_exists(&db, "first"));
    assert!(!table_exists(&db, "second"));
    // the ledger table itself was committed before any task ran
    assert!(table_exists(&db, LEDGER_TABLE));
    assert_eq!(count(&db, "SELECT COUNT(*) FROM change_set"), 0);
}

#[test]
fn legacy_ledger_gains_fingerprint_column_and_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("legacy.duckdb");
    {
        let mut conn = open(&db);
        conn.execute_statement(
            "CREATE TABLE change_set (version VARCHAR(255), task VARCHAR(255), applied DATE)",
        )
        .unwrap();
        conn.execute_statement("CREATE TABLE users (id INT, name VARCHAR)")
            .unwrap();
        conn.execute_statement(
            "INSERT INTO change_set VALUES ('1.0.0', 'create', DATE '2019-06-01')",
        )
        .unwrap();
        conn.commit().unwrap();
        conn.close().unwrap();
    }

    let summary = Engine::new(open(&db)).run(scenario()).unwrap();

    assert_eq!(summary.schema, SchemaStatus::Evolved(vec!["query_hash"]));
    // the NULL-fingerprint row counts as applied
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.applied.len(), 2);

    let mut conn = open(&db);
    assert!(conn.column_exists(LEDGER_TABLE, "query_hash").unwrap());
    let legacy = conn
        .query_rows(
            "SELECT query_hash FROM change_set WHERE version = ? AND task = ?",
            &["1.0.0".into(), "create".into()],
        )
        .unwrap();
    assert_eq!(legacy, vec![vec![SqlValue::Null]]);
}

#[test]
fn duplicate_version_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("app.duckdb");

    let err = Engine::new(open(&db))
        .run(vec![
            Change::new("1", vec![task("a", 1, "CREATE TABLE a (id INT)")]),
            Change::new("1", vec![task("b", 1, "CREATE TABLE b (id INT)")]),
        ])
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Core(CoreError::DuplicateVersion { .. })
    ));
    assert!(!table_exists(&db, LEDGER_TABLE));
    assert!(!table_exists(&db, "a"));
}

#[test]
fn migrator_runs_a_changeset_directory() {
    let dir = tempfile::tempdir().unwrap();
    let changes = dir.path().join("changes");
    for (path, sql) in [
        ("1.0.0/01 - create.sql", "CREATE TABLE items (id INT, label VARCHAR)"),
        ("1.0.0/02 - seed.sql", "INSERT INTO items VALUES (1, 'a'); INSERT INTO items VALUES (2, 'b')"),
        ("1.2/01 - more.sql", "INSERT INTO items VALUES (3, 'c')"),
        ("1.10/01 - last.sql", "DELETE FROM items WHERE id = 1"),
    ] {
        let file = changes.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, sql).unwrap();
    }
    let db = dir.path().join("app.duckdb");

    let outcome = Migrator::new().with_path(&changes).run(open(&db)).unwrap();

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.statements_executed, 5);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM items"), 2);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM change_set"), 4);
}

#[test]
fn migrator_in_memory_text_source() {
    let mut migrator = Migrator::new().with_text(
        "changes:\n  - version: \"3\"\n    tasks:\n      - name: t\n        script: CREATE TABLE x (id INT); INSERT INTO x VALUES (1)\n",
        ChangeSetFormat::Yaml,
    );

    let outcome = migrator.run(DuckDbConnector::in_memory().unwrap()).unwrap();

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.applied[0].statements, 2);
}
