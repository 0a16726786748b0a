use anyhow::{Context, Result};
use rusqlite::Connection;

/// Ordered schema steps. `PRAGMA user_version` records how many have been applied.
const MIGRATIONS: &[(&str, &str)] = &[("initial", include_str!("migrations/001_initial.sql"))];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let applied = schema_version(conn)?;

    for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied) {
        let version = index + 1;
        tracing::info!(version, name = %name, "Applying migration");
        conn.execute_batch(&format!(
            "BEGIN TRANSACTION; {} PRAGMA user_version = {}; COMMIT;",
            sql, version
        ))
        .with_context(|| format!("Failed to apply migration {}: {}", version, name))?;
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("Failed to read schema version")?;
    Ok(version.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_the_kv_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='kv_store'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(schema_version(&conn).unwrap(), MIGRATIONS.len());
    }

    #[test]
    fn running_twice_is_harmless() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO kv_store (key, value, updated_at) VALUES ('k', 'v', 'now')", [])
            .unwrap();
        run_migrations(&conn).unwrap();

        let value: String = conn
            .query_row("SELECT value FROM kv_store WHERE key = 'k'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "v");
    }
}
