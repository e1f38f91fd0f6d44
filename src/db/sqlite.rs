use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::StoreError;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| StoreError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, StoreError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + users + user_names + user_given_names + user_contacts
        // + appointments + appointment_reasons + diagnoses + diagnosis_codes
        // + diagnosis_details + surveys = 11
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 11, "Expected 11 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again — should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn database_opens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careledger.db");
        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 11);

        // Re-open — should be idempotent
        let conn2 = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn2).unwrap(), 11);
    }

    #[test]
    fn cascade_delete_removes_name_children() {
        let conn = open_memory_database().unwrap();

        conn.execute("INSERT INTO users (id, role) VALUES ('u-1', 'patient')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO user_names (id, user_id, family_name) VALUES (1, 'u-1', 'Reyes')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO user_given_names (user_name_id, given_name) VALUES (1, 'Ana')",
            [],
        )
        .unwrap();

        // Delete user — cascade should remove names and given names
        conn.execute("DELETE FROM users WHERE id = 'u-1'", []).unwrap();

        let names: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_names", [], |row| row.get(0))
            .unwrap();
        let given: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_given_names", [], |row| row.get(0))
            .unwrap();
        assert_eq!(names, 0);
        assert_eq!(given, 0);
    }

    #[test]
    fn doctor_reference_nulled_on_user_delete() {
        let conn = open_memory_database().unwrap();

        conn.execute("INSERT INTO users (id, role) VALUES ('d-1', 'doctor')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO appointments (id, start_time_ts, doctor_id) VALUES ('a-1', 1700000000, 'd-1')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM users WHERE id = 'd-1'", []).unwrap();

        let doctor_id: Option<String> = conn
            .query_row("SELECT doctor_id FROM appointments WHERE id = 'a-1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(doctor_id.is_none());
    }

    #[test]
    fn status_check_constraint() {
        let conn = open_memory_database().unwrap();

        let result = conn.execute(
            "INSERT INTO appointments (id, start_time_ts, status) VALUES ('a-1', 0, 'cancelled')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn diagnosis_code_unique_constraint() {
        let conn = open_memory_database().unwrap();

        conn.execute(
            "INSERT INTO diagnosis_codes (code, name) VALUES ('J20', 'Bronchitis')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO diagnosis_codes (code, name) VALUES ('J20', 'Other name')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rating_range_check_constraint() {
        let conn = open_memory_database().unwrap();

        let result = conn.execute(
            "INSERT INTO surveys (id, recommendation_rating) VALUES ('s-1', 11)",
            [],
        );
        assert!(result.is_err());
    }
}
