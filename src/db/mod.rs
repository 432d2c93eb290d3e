mod mysql;
mod postgres;
pub mod schema;
mod sqlite;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::info;

use crate::connection::Connection;
use crate::error::SeedResult;

pub use mysql::Mysql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

/// Wire format for timestamps on backends that take them as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "sqlite")]
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    UserFeatures,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::UserFeatures => "user_features",
        }
    }
}

/// SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Bind marker for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{index}"),
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    pub fn text_cast(self, expr: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({expr} AS CHAR)"),
            Dialect::Sqlite | Dialect::Postgres => format!("CAST({expr} AS TEXT)"),
        }
    }

    /// `INSERT` that overwrites every non-key column when `key` already exists.
    pub fn upsert_sql(self, table: Table, key: &str, columns: &[&str]) -> String {
        let placeholders = (1..=columns.len())
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = columns
            .iter()
            .filter(|c| **c != key)
            .map(|c| match self {
                Dialect::Sqlite => format!("{c} = excluded.{c}"),
                Dialect::Postgres => format!("{c} = EXCLUDED.{c}"),
                Dialect::MySql => format!("{c} = VALUES({c})"),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let insert = format!(
            "INSERT INTO {table} ({columns}) VALUES ({placeholders})",
            table = table.name(),
            columns = columns.join(", "),
        );
        match self {
            Dialect::Sqlite | Dialect::Postgres => {
                format!("{insert} ON CONFLICT ({key}) DO UPDATE SET {updates}")
            }
            Dialect::MySql => format!("{insert} ON DUPLICATE KEY UPDATE {updates}"),
        }
    }
}

/// Backend-neutral bind value. Nulls are typed so PostgreSQL can check them.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int(i32),
    Bool(bool),
    Timestamp(Option<NaiveDateTime>),
}

impl SqlValue {
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(Some(s.into()))
    }

    pub fn timestamp(t: NaiveDateTime) -> Self {
        SqlValue::Timestamp(Some(t))
    }
}

pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Default)]
pub struct Records {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>, // stringified cells, None for NULL
}

impl Records {
    /// First cell of the first row, if any.
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

pub trait DBBehavior {
    fn dialect(&self) -> Dialect;
    fn execute_batch(&mut self, sql: &str) -> SeedResult<()>;
    /// Run `sql` once per row inside a single transaction; returns affected rows.
    fn upsert_rows(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> SeedResult<u64>;
    fn fetch_records(&mut self, sql: &str, params: &[SqlValue]) -> SeedResult<Records>;
}

pub struct DB;

impl DB {
    pub fn open(conn: &Connection) -> SeedResult<Box<dyn DBBehavior>> {
        info!(
            db_type = ?conn.r#type,
            name = conn.name.as_deref().unwrap_or("-"),
            "opening database"
        );
        let db: Box<dyn DBBehavior> = match conn.r#type {
            DatabaseType::MySql => Box::new(Mysql::connect(conn)?),
            DatabaseType::Postgres => Box::new(Postgres::connect(conn)?),
            DatabaseType::Sqlite => Box::new(Sqlite::connect(conn)?),
        };
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?3");
        assert_eq!(Dialect::MySql.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[test]
    fn test_upsert_sql_sqlite() {
        let sql = Dialect::Sqlite.upsert_sql(Table::Users, "user_id", &["user_id", "gender", "region"]);
        assert_eq!(
            sql,
            "INSERT INTO users (user_id, gender, region) VALUES (?1, ?2, ?3) \
             ON CONFLICT (user_id) DO UPDATE SET gender = excluded.gender, region = excluded.region"
        );
    }

    #[test]
    fn test_upsert_sql_postgres() {
        let sql = Dialect::Postgres.upsert_sql(Table::UserFeatures, "user_id", &["user_id", "skin_type"]);
        assert_eq!(
            sql,
            "INSERT INTO user_features (user_id, skin_type) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET skin_type = EXCLUDED.skin_type"
        );
    }

    #[test]
    fn test_upsert_sql_mysql() {
        let sql = Dialect::MySql.upsert_sql(Table::Users, "user_id", &["user_id", "gender"]);
        assert_eq!(
            sql,
            "INSERT INTO users (user_id, gender) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE gender = VALUES(gender)"
        );
    }

    #[test]
    fn test_text_cast() {
        assert_eq!(Dialect::MySql.text_cast("COUNT(*)"), "CAST(COUNT(*) AS CHAR)");
        assert_eq!(Dialect::Postgres.text_cast("u.birth_year"), "CAST(u.birth_year AS TEXT)");
    }

    #[test]
    fn test_records_scalar() {
        let records = Records {
            columns: vec!["n".into()],
            rows: vec![vec![Some("50".into())]],
        };
        assert_eq!(records.scalar(), Some("50"));
        assert_eq!(Records::default().scalar(), None);
    }
}
