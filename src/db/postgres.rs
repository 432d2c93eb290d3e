use postgres::types::ToSql;
use postgres::{Client, NoTls};
use tracing::debug;

use crate::connection::Connection;
use crate::db::{DBBehavior, Dialect, Records, SqlValue};
use crate::error::{SeedError, SeedResult};

pub struct Postgres {
    client: Client,
}

impl Postgres {
    pub fn database_url(conn: &Connection) -> SeedResult<String> {
        let user = conn
            .user
            .as_ref()
            .ok_or_else(|| SeedError::config("type postgres needs the user field"))?;
        let host = conn
            .host
            .as_ref()
            .ok_or_else(|| SeedError::config("type postgres needs the host field"))?;
        let port = conn
            .port
            .as_ref()
            .ok_or_else(|| SeedError::config("type postgres needs the port field"))?;
        let password = conn
            .password
            .as_ref()
            .map_or(String::new(), |p| p.to_string());

        match conn.database.as_ref() {
            Some(database) => Ok(format!(
                "postgres://{user}:{password}@{host}:{port}/{database}",
                user = user,
                password = password,
                host = host,
                port = port,
                database = database
            )),
            None => Ok(format!(
                "postgres://{user}:{password}@{host}:{port}",
                user = user,
                password = password,
                host = host,
                port = port,
            )),
        }
    }

    pub fn connect(conn: &Connection) -> SeedResult<Self> {
        debug!("postgres: connecting");
        let url = Postgres::database_url(conn)?;
        let client = Client::connect(&url, NoTls)
            .map_err(|e| SeedError::ConnectionFailure(e.to_string()))?;
        debug!("postgres: connected");
        Ok(Self { client })
    }
}

impl DBBehavior for Postgres {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute_batch(&mut self, sql: &str) -> SeedResult<()> {
        self.client.batch_execute(sql).map_err(classify)
    }

    fn upsert_rows(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> SeedResult<u64> {
        let mut tx = self.client.transaction().map_err(classify)?;
        let stmt = tx.prepare(sql).map_err(classify)?;
        let mut affected = 0u64;
        for row in rows {
            let boxed = to_params(row);
            affected += tx.execute(&stmt, &as_refs(&boxed)).map_err(classify)?;
        }
        tx.commit().map_err(classify)?;
        Ok(affected)
    }

    fn fetch_records(&mut self, sql: &str, params: &[SqlValue]) -> SeedResult<Records> {
        let stmt = self.client.prepare(sql).map_err(classify)?;
        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let boxed = to_params(params);
        let rows = self
            .client
            .query(&stmt, &as_refs(&boxed))
            .map_err(classify)?;

        // Callers cast every selected column to text.
        let mut rows_vec = Vec::with_capacity(rows.len());
        for r in rows {
            let mut row_vec = Vec::with_capacity(columns.len());
            for i in 0..r.len() {
                let v: Option<String> = r.try_get(i).map_err(classify)?;
                row_vec.push(v);
            }
            rows_vec.push(row_vec);
        }
        Ok(Records { columns, rows: rows_vec })
    }
}

type BoxedParam = Box<dyn ToSql + Sync>;

fn to_params(values: &[SqlValue]) -> Vec<BoxedParam> {
    values
        .iter()
        .map(|v| -> BoxedParam {
            match v {
                SqlValue::Text(s) => Box::new(s.clone()),
                SqlValue::Int(i) => Box::new(*i),
                SqlValue::Bool(b) => Box::new(*b),
                SqlValue::Timestamp(t) => Box::new(*t),
            }
        })
        .collect()
}

fn as_refs(boxed: &[BoxedParam]) -> Vec<&(dyn ToSql + Sync)> {
    boxed.iter().map(|b| b.as_ref()).collect()
}

fn classify(err: postgres::Error) -> SeedError {
    if let Some(state) = err.code() {
        // SQLSTATE class 23: integrity constraint violation
        if state.code().starts_with("23") {
            return SeedError::ConstraintViolation(err.to_string());
        }
        return SeedError::Storage(err.to_string());
    }
    if err.is_closed() {
        return SeedError::ConnectionFailure(err.to_string());
    }
    SeedError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseType;

    #[test]
    fn test_database_url() {
        let conn = Connection {
            r#type: DatabaseType::Postgres,
            name: None,
            user: Some("crm".into()),
            host: Some("localhost".into()),
            port: Some(5432),
            path: None,
            password: None,
            database: Some("crm".into()),
        };
        assert_eq!(
            Postgres::database_url(&conn).unwrap(),
            "postgres://crm:@localhost:5432/crm"
        );
    }

    #[test]
    fn test_params_keep_arity() {
        let params = to_params(&[
            SqlValue::text("u_001"),
            SqlValue::Int(1987),
            SqlValue::Bool(true),
            SqlValue::Timestamp(None),
        ]);
        assert_eq!(as_refs(&params).len(), 4);
    }
}
