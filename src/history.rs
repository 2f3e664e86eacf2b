use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

/// One Safari history visit. `id` identifies the page/URL entity; `visit_id`
/// identifies the visit event itself (one URL may be visited many times).
/// Records are built once by [`load`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRecord {
    pub id: i64,
    pub url: String,
    pub visit_id: i64,
    /// Raw Safari Core Data timestamp (seconds since 2001-01-01 UTC).
    pub timestamp: f64,
    /// `timestamp` normalized to an ISO-8601 UTC string; derived, never set
    /// independently.
    pub iso_timestamp: String,
    pub redirect_source: Option<i64>,
    pub redirect_destination: Option<i64>,
}

/// Safari Core Data time: seconds since 2001-01-01 UTC.
pub fn mac_time_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if seconds == 0.0 || !seconds.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(2001, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let micros = (seconds * 1_000_000.0) as i64;
    let dt = epoch + Duration::microseconds(micros);
    Some(DateTime::from_naive_utc_and_offset(dt, Utc))
}

/// Normalize a Core Data timestamp to an ISO-8601 UTC string.
/// Pure: equal inputs always produce equal output.
pub fn mac_time_to_iso(seconds: f64) -> Option<String> {
    mac_time_to_datetime(seconds).map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
}

/// Load all visits from a Safari `History.db` SQLite file, ordered by visit
/// time ascending. An empty history is not an error; a missing or
/// structurally incompatible database is.
///
/// Opens the database read-only directly. Falls back to copying to a temp dir
/// if the direct open fails (e.g., locked by a running browser).
pub fn load(db_path: &Path) -> Result<Vec<VisitRecord>> {
    let db_str = db_path.to_string_lossy().to_string();

    // Try opening read-only directly first (avoids needing copy permissions)
    let (conn, _tmp_dir) = match Connection::open_with_flags(
        db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    ) {
        Ok(c) => (c, None),
        Err(_) => {
            // Fallback: copy to temp (handles locked DBs on live systems)
            let tmp_dir = TempDir::new().context("Failed to create temp directory")?;
            let tmp_db = tmp_dir.path().join("History.db");
            std::fs::copy(db_path, &tmp_db)
                .with_context(|| format!("Failed to copy Safari database: {}", db_str))?;
            for ext in &["-wal", "-shm"] {
                let aux_name = format!("History.db{ext}");
                let aux = db_path.parent().unwrap_or(Path::new(".")).join(&aux_name);
                if aux.exists() {
                    let _ = std::fs::copy(&aux, tmp_dir.path().join(&aux_name));
                }
            }
            let c = Connection::open(&tmp_db)
                .with_context(|| format!("Failed to open Safari database: {}", db_str))?;
            (c, Some(tmp_dir))
        }
    };

    let mut stmt = conn
        .prepare(
            "SELECT hi.id, hi.url, hv.id, hv.visit_time, \
                    hv.redirect_source, hv.redirect_destination \
             FROM history_items hi \
             JOIN history_visits hv ON hv.history_item = hi.id \
             ORDER BY hv.visit_time ASC",
        )
        .with_context(|| {
            format!("Missing history_items/history_visits tables — not a Safari History.db? ({db_str})")
        })?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, Option<i64>>(4)?,
            row.get::<_, Option<i64>>(5)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, url, visit_id, timestamp, redirect_source, redirect_destination) = row?;

        if url.is_empty() {
            continue;
        }

        let iso_timestamp = match mac_time_to_iso(timestamp) {
            Some(iso) => iso,
            None => continue,
        };

        records.push(VisitRecord {
            id,
            url,
            visit_id,
            timestamp,
            iso_timestamp,
            redirect_source,
            redirect_destination,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_db(dir: &TempDir) -> std::path::PathBuf {
        let db = dir.path().join("History.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE history_items (id INTEGER PRIMARY KEY, url TEXT);
             CREATE TABLE history_visits (
                 id INTEGER PRIMARY KEY,
                 history_item INTEGER,
                 visit_time REAL,
                 redirect_source INTEGER,
                 redirect_destination INTEGER
             );
             INSERT INTO history_items VALUES (1, 'http://example.com/');
             INSERT INTO history_items VALUES (2, 'https://example.com/');
             INSERT INTO history_visits VALUES (101, 1, 727012800.0, NULL, 102);
             INSERT INTO history_visits VALUES (102, 2, 727012800.5, 101, NULL);",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_mac_time_conversion() {
        let dt = mac_time_to_datetime(727012800.0);
        assert!(dt.is_some());
        let dt = dt.unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn test_mac_time_zero() {
        assert!(mac_time_to_datetime(0.0).is_none());
        assert!(mac_time_to_iso(0.0).is_none());
    }

    #[test]
    fn test_iso_is_pure() {
        assert_eq!(
            mac_time_to_iso(727012800.0),
            Some("2024-01-15 12:00:00.000000".to_string())
        );
        assert_eq!(mac_time_to_iso(727012800.0), mac_time_to_iso(727012800.0));
    }

    #[test]
    fn test_load_orders_and_links_visits() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let records = load(&db).unwrap();
        assert_eq!(records.len(), 2);

        let origin = &records[0];
        assert_eq!(origin.id, 1);
        assert_eq!(origin.url, "http://example.com/");
        assert_eq!(origin.visit_id, 101);
        assert_eq!(origin.redirect_source, None);
        assert_eq!(origin.redirect_destination, Some(102));
        assert_eq!(origin.iso_timestamp, "2024-01-15 12:00:00.000000");

        let redirect = &records[1];
        assert_eq!(redirect.visit_id, 102);
        assert_eq!(redirect.redirect_source, Some(101));
        assert_eq!(redirect.redirect_destination, None);
        assert!(redirect.timestamp > origin.timestamp);
    }

    #[test]
    fn test_load_empty_history_is_ok() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("History.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE history_items (id INTEGER PRIMARY KEY, url TEXT);
             CREATE TABLE history_visits (
                 id INTEGER PRIMARY KEY,
                 history_item INTEGER,
                 visit_time REAL,
                 redirect_source INTEGER,
                 redirect_destination INTEGER
             );",
        )
        .unwrap();
        drop(conn);

        let records = load(&db).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_load_incompatible_schema_fails() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("History.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE something_else (id INTEGER);")
            .unwrap();
        drop(conn);

        assert!(load(&db).is_err());
    }
}
