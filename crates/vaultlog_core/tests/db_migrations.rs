use rusqlite::Connection;
use vaultlog_core::db::migrations::latest_version;
use vaultlog_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "vault_structures");
    assert_table_exists(&conn, "records");
}

#[test]
fn reopening_a_vault_file_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO vault_structures (kind, created_at) VALUES ('property', 1);",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let structures: i64 = conn
        .query_row("SELECT COUNT(*) FROM vault_structures;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(structures, 1);
}

#[test]
fn opening_vault_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_migration_reports_step_and_leaves_schema_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE records (id INTEGER PRIMARY KEY);")
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::Migration { version, .. } => assert_eq!(version, 1),
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let structures: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'vault_structures';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(structures, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
