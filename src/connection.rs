use serde::Deserialize;

use crate::{config::Config, db::DatabaseType, error::SeedError, error::SeedResult};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Connection {
    pub r#type: DatabaseType,
    pub name: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u64>,
    pub path: Option<std::path::PathBuf>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Connection {
    /// MySQL connection described by `MYSQL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Connection {
            r#type: DatabaseType::MySql,
            name: Some("env".to_string()),
            user: Some(var("MYSQL_USER", "crm_user")),
            host: Some(var("MYSQL_HOST", "127.0.0.1")),
            port: var("MYSQL_PORT", "3307").parse().ok().or(Some(3307)),
            path: None,
            password: lookup("MYSQL_PASSWORD"),
            database: Some(var("MYSQL_DB", "crm")),
        }
    }
}

/// Pick a connection by name, else the first configured one, else the environment.
pub fn select_connection(config: &Config, name: Option<&str>) -> SeedResult<Connection> {
    match name {
        Some(name) => config
            .conn
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| SeedError::config(format!("no connection named '{name}'"))),
        None => Ok(config
            .conn
            .first()
            .cloned()
            .unwrap_or_else(Connection::from_env)),
    }
}
