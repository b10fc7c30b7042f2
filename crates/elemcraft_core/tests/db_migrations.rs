use elemcraft_core::db::migrations::latest_version;
use elemcraft_core::db::{open_db, open_db_in_memory, open_db_read_only, DbError};
use elemcraft_core::{canonicalize, PairRepository, RepoError, SqlitePairRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "pair_records");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("elemcraft.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO pair_records (word1, word2, emoji, text) VALUES ('fire', 'water', '💨', 'steam');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM pair_records;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
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
fn schema_rejects_non_canonical_and_blank_rows() {
    let conn = open_db_in_memory().unwrap();

    let reversed = conn.execute(
        "INSERT INTO pair_records (word1, word2, emoji, text) VALUES ('water', 'fire', '💨', 'steam');",
        [],
    );
    assert!(reversed.is_err());

    let blank = conn.execute(
        "INSERT INTO pair_records (word1, word2, emoji, text) VALUES ('fire', 'water', '', 'steam');",
        [],
    );
    assert!(blank.is_err());
}

#[test]
fn read_only_open_never_creates_a_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo.db");

    let err = open_db_read_only(&path).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
    assert!(!path.exists());
}

#[test]
fn read_only_open_reads_migrated_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elemcraft.db");
    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO pair_records (word1, word2, emoji, text) VALUES ('fire', 'water', '💨', 'steam');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db_read_only(&path).unwrap();
    assert!(conn
        .execute("DELETE FROM pair_records;", [])
        .is_err());
    let repo = SqlitePairRepository::try_new(conn).unwrap();
    let record = repo
        .find_by_pair(&canonicalize("water", "fire"))
        .unwrap()
        .unwrap();
    assert_eq!(record.text, "steam");
}

#[test]
fn read_only_open_leaves_unmigrated_file_to_repository_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (id INTEGER);")
        .unwrap();

    let conn = open_db_read_only(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let err = SqlitePairRepository::try_new(conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
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
