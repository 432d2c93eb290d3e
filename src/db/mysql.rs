use mysql::prelude::Queryable;
use mysql::{Conn, Opts, Params, TxOpts, Value};
use tracing::debug;

use crate::connection::Connection;
use crate::db::{format_timestamp, DBBehavior, Dialect, Records, SqlValue};
use crate::error::{SeedError, SeedResult};

/// Server error codes that mean a constraint rejected the write.
const CONSTRAINT_CODES: [u16; 6] = [1048, 1062, 1216, 1217, 1451, 1452];

pub struct Mysql {
    conn: Conn,
}

impl Mysql {
    pub fn database_url(conn: &Connection) -> SeedResult<String> {
        let user = conn
            .user
            .as_ref()
            .ok_or_else(|| SeedError::config("type mysql needs the user field"))?;
        let host = conn
            .host
            .as_ref()
            .ok_or_else(|| SeedError::config("type mysql needs the host field"))?;
        let port = conn
            .port
            .as_ref()
            .ok_or_else(|| SeedError::config("type mysql needs the port field"))?;
        let password = conn
            .password
            .as_ref()
            .map_or(String::new(), |p| p.to_string());

        match conn.database.as_ref() {
            Some(database) => Ok(format!(
                "mysql://{user}:{password}@{host}:{port}/{database}",
                user = user,
                password = password,
                host = host,
                port = port,
                database = database
            )),
            None => Ok(format!(
                "mysql://{user}:{password}@{host}:{port}",
                user = user,
                password = password,
                host = host,
                port = port,
            )),
        }
    }

    pub fn connect(conn: &Connection) -> SeedResult<Self> {
        let url = Self::database_url(conn)?;
        let opts = Opts::from_url(&url).map_err(|e| SeedError::config(e.to_string()))?;
        debug!("mysql: connecting");
        let conn = Conn::new(opts).map_err(|e| SeedError::ConnectionFailure(e.to_string()))?;
        debug!("mysql: connected");
        Ok(Self { conn })
    }
}

impl DBBehavior for Mysql {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn execute_batch(&mut self, sql: &str) -> SeedResult<()> {
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            self.conn.query_drop(statement).map_err(classify)?;
        }
        Ok(())
    }

    fn upsert_rows(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> SeedResult<u64> {
        let mut tx = self.conn.start_transaction(TxOpts::default()).map_err(classify)?;
        let stmt = tx.prep(sql).map_err(classify)?;
        let mut affected = 0u64;
        for row in rows {
            tx.exec_drop(&stmt, to_params(row)).map_err(classify)?;
            // 1 for an insert, 2 for an update, 0 when nothing changed
            affected += tx.affected_rows();
        }
        tx.commit().map_err(classify)?;
        Ok(affected)
    }

    fn fetch_records(&mut self, sql: &str, params: &[SqlValue]) -> SeedResult<Records> {
        let stmt = self.conn.prep(sql).map_err(classify)?;
        let columns = stmt
            .columns()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        let rows: Vec<mysql::Row> = self.conn.exec(&stmt, to_params(params)).map_err(classify)?;
        let rows = rows
            .into_iter()
            .map(|row| row.unwrap().into_iter().map(stringify).collect())
            .collect();
        Ok(Records { columns, rows })
    }
}

fn to_params(values: &[SqlValue]) -> Params {
    if values.is_empty() {
        return Params::Empty;
    }
    Params::Positional(values.iter().map(to_value).collect())
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Text(Some(s)) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Text(None) | SqlValue::Timestamp(None) => Value::NULL,
        SqlValue::Int(i) => Value::Int(i64::from(*i)),
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::Timestamp(Some(t)) => Value::Bytes(format_timestamp(t).into_bytes()),
    }
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(b) => Some(String::from_utf8_lossy(&b).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(y, mo, d, h, mi, s, _) => Some(format!(
            "{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}"
        )),
        Value::Time(neg, days, h, mi, s, _) => {
            let hours = days * 24 + u32::from(h);
            let sign = if neg { "-" } else { "" };
            Some(format!("{sign}{hours:02}:{mi:02}:{s:02}"))
        }
    }
}

fn classify(err: mysql::Error) -> SeedError {
    match &err {
        mysql::Error::MySqlError(e) if e.state.starts_with("23") || CONSTRAINT_CODES.contains(&e.code) => {
            SeedError::ConstraintViolation(err.to_string())
        }
        mysql::Error::IoError(_) | mysql::Error::DriverError(_) => {
            SeedError::ConnectionFailure(err.to_string())
        }
        _ => SeedError::Storage(err.to_string()),
    }
}
