use std::path::{Path, PathBuf};

use rusqlite::types::{Null, ToSqlOutput, ValueRef};
use rusqlite::{Connection as SqliteConn, ErrorCode};
use tracing::debug;

use crate::connection::Connection;
use crate::db::{format_timestamp, DBBehavior, Dialect, Records, SqlValue};
use crate::error::{SeedError, SeedResult};

pub struct Sqlite {
    conn: SqliteConn,
}

impl Sqlite {
    pub fn connect(conn: &Connection) -> SeedResult<Self> {
        let path = conn
            .path
            .as_ref()
            .ok_or_else(|| SeedError::config("type sqlite needs the path field"))?;
        let path = expand_path(path).ok_or_else(|| SeedError::config("cannot expand file path"))?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> SeedResult<Self> {
        debug!(path = %path.display(), "sqlite: opening file");
        let conn = SqliteConn::open(path)
            .map_err(|e| SeedError::ConnectionFailure(format!("{}: {e}", path.display())))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> SeedResult<Self> {
        let conn = SqliteConn::open_in_memory()
            .map_err(|e| SeedError::ConnectionFailure(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: SqliteConn) -> SeedResult<Self> {
        // SQLite leaves foreign keys unenforced unless asked per connection.
        conn.pragma_update(None, "foreign_keys", true).map_err(classify)?;
        Ok(Self { conn })
    }
}

impl DBBehavior for Sqlite {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute_batch(&mut self, sql: &str) -> SeedResult<()> {
        self.conn.execute_batch(sql).map_err(classify)
    }

    fn upsert_rows(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> SeedResult<u64> {
        let tx = self.conn.transaction().map_err(classify)?;
        let mut affected = 0u64;
        {
            let mut stmt = tx.prepare(sql).map_err(classify)?;
            for row in rows {
                affected += stmt
                    .execute(rusqlite::params_from_iter(row.iter()))
                    .map_err(classify)? as u64;
            }
        }
        tx.commit().map_err(classify)?;
        Ok(affected)
    }

    fn fetch_records(&mut self, sql: &str, params: &[SqlValue]) -> SeedResult<Records> {
        let mut stmt = self.conn.prepare(sql).map_err(classify)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let col_count = columns.len();

        let mut rows_vec = Vec::new();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(classify)?;
        while let Some(row) = rows.next().map_err(classify)? {
            let mut v = Vec::with_capacity(col_count);
            for i in 0..col_count {
                let s = match row.get_ref(i).map_err(classify)? {
                    ValueRef::Null => None,
                    ValueRef::Integer(i) => Some(i.to_string()),
                    ValueRef::Real(f) => Some(f.to_string()),
                    ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => Some(format!("<blob {} bytes>", b.len())),
                };
                v.push(s);
            }
            rows_vec.push(v);
        }

        Ok(Records { columns, rows: rows_vec })
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Text(Some(s)) => ToSqlOutput::from(s.as_str()),
            SqlValue::Text(None) | SqlValue::Timestamp(None) => ToSqlOutput::from(Null),
            SqlValue::Int(i) => ToSqlOutput::from(*i),
            SqlValue::Bool(b) => ToSqlOutput::from(*b),
            SqlValue::Timestamp(Some(t)) => ToSqlOutput::from(format_timestamp(t)),
        })
    }
}

fn classify(err: rusqlite::Error) -> SeedError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => SeedError::ConstraintViolation(err.to_string()),
        Some(ErrorCode::CannotOpen) | Some(ErrorCode::NotADatabase) => {
            SeedError::ConnectionFailure(err.to_string())
        }
        _ => SeedError::Storage(err.to_string()),
    }
}

fn expand_path(path: &Path) -> Option<PathBuf> {
    let mut expanded_path = PathBuf::new();
    let mut path_iter = path.iter();
    if path.starts_with("~") {
        path_iter.next()?;
        expanded_path = expanded_path.join(dirs_next::home_dir()?);
    }
    for path in path_iter {
        let path = path.to_str()?;
        expanded_path = if cfg!(unix) && path.starts_with('$') {
            expanded_path.join(std::env::var(path.strip_prefix('$')?).unwrap_or_default())
        } else if cfg!(windows) && path.starts_with('%') && path.ends_with('%') {
            expanded_path
                .join(std::env::var(path.strip_prefix('%')?.strip_suffix('%')?).unwrap_or_default())
        } else {
            expanded_path.join(path)
        }
    }
    Some(expanded_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn store() -> Sqlite {
        let mut db = Sqlite::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE parent (id TEXT PRIMARY KEY, label TEXT, seen_at TEXT);
             CREATE TABLE child (id TEXT PRIMARY KEY REFERENCES parent(id));",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_upsert_rows_overwrites_in_place() {
        let mut db = store();
        let sql = "INSERT INTO parent (id, label, seen_at) VALUES (?1, ?2, ?3) \
                   ON CONFLICT (id) DO UPDATE SET label = excluded.label, seen_at = excluded.seen_at";
        let at = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let row = |label: &str| vec![SqlValue::text("p1"), SqlValue::text(label), SqlValue::timestamp(at)];

        assert_eq!(db.upsert_rows(sql, &[row("first")]).unwrap(), 1);
        assert_eq!(db.upsert_rows(sql, &[row("second")]).unwrap(), 1);

        let records = db
            .fetch_records("SELECT label, seen_at FROM parent", &[])
            .unwrap();
        assert_eq!(records.columns, vec!["label", "seen_at"]);
        assert_eq!(
            records.rows,
            vec![vec![Some("second".to_string()), Some("2026-01-02 03:04:05".to_string())]]
        );
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let mut db = store();
        let err = db
            .upsert_rows("INSERT INTO child (id) VALUES (?1)", &[vec![SqlValue::text("nope")]])
            .unwrap_err();
        assert!(err.is_constraint_violation(), "{err}");
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut db = store();
        let sql = "INSERT INTO child (id) VALUES (?1)";
        db.upsert_rows(
            "INSERT INTO parent (id) VALUES (?1)",
            &[vec![SqlValue::text("p1")]],
        )
        .unwrap();
        let rows = vec![vec![SqlValue::text("p1")], vec![SqlValue::text("missing")]];
        assert!(db.upsert_rows(sql, &rows).is_err());

        let records = db.fetch_records("SELECT COUNT(*) FROM child", &[]).unwrap();
        assert_eq!(records.scalar(), Some("0"));
    }

    #[test]
    fn test_nulls_and_params() {
        let mut db = store();
        db.upsert_rows(
            "INSERT INTO parent (id, label, seen_at) VALUES (?1, ?2, ?3)",
            &[vec![SqlValue::text("p1"), SqlValue::Text(None), SqlValue::Timestamp(None)]],
        )
        .unwrap();
        let records = db
            .fetch_records("SELECT label, seen_at FROM parent WHERE id = ?1", &[SqlValue::text("p1")])
            .unwrap();
        assert_eq!(records.rows, vec![vec![None, None]]);
    }

    #[test]
    fn test_missing_path_is_config_error() {
        let conn = Connection {
            r#type: crate::db::DatabaseType::Sqlite,
            name: None,
            user: None,
            host: None,
            port: None,
            path: None,
            password: None,
            database: None,
        };
        assert!(matches!(Sqlite::connect(&conn), Err(SeedError::Config(_))));
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(
            expand_path(Path::new("dev/sqlite/crm.db")),
            Some(PathBuf::from("dev/sqlite/crm.db"))
        );
    }
}
