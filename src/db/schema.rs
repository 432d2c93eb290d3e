//! Column layout of the seeded tables and the development DDL.
//!
//! The tables are normally owned by the CRM application; the DDL here is only
//! applied when asked for (`seed --create-tables`, `seed_sqlite`).

use super::Dialect;

pub const KEY_COLUMN: &str = "user_id";

pub const USER_COLUMNS: [&str; 15] = [
    "user_id",
    "customer_name",
    "gender",
    "birth_year",
    "region",
    "preferred_channel",
    "sms_opt_in",
    "kakao_opt_in",
    "push_opt_in",
    "email_opt_in",
    "phone_e164",
    "kakao_user_key",
    "push_token",
    "email",
    "updated_at",
];

pub const USER_FEATURE_COLUMNS: [&str; 12] = [
    "user_id",
    "lifecycle_stage",
    "last_browse_at",
    "last_cart_at",
    "last_purchase_at",
    "cart_items_count",
    "persona_id",
    "skin_type",
    "skin_concern_primary",
    "sensitivity_level",
    "top_category_30d",
    "updated_at",
];

const SQLITE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    customer_name TEXT,
    gender TEXT,
    birth_year INTEGER,
    region TEXT,
    preferred_channel TEXT,
    sms_opt_in INTEGER NOT NULL DEFAULT 0,
    kakao_opt_in INTEGER NOT NULL DEFAULT 0,
    push_opt_in INTEGER NOT NULL DEFAULT 0,
    email_opt_in INTEGER NOT NULL DEFAULT 0,
    phone_e164 TEXT,
    kakao_user_key TEXT,
    push_token TEXT,
    email TEXT,
    updated_at TEXT
);
CREATE TABLE IF NOT EXISTS user_features (
    user_id TEXT PRIMARY KEY REFERENCES users(user_id),
    lifecycle_stage TEXT,
    last_browse_at TEXT,
    last_cart_at TEXT,
    last_purchase_at TEXT,
    cart_items_count INTEGER NOT NULL DEFAULT 0,
    persona_id TEXT,
    skin_type TEXT,
    skin_concern_primary TEXT,
    sensitivity_level TEXT,
    top_category_30d TEXT,
    updated_at TEXT
);
"#;

const MYSQL_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id VARCHAR(64) NOT NULL PRIMARY KEY,
    customer_name VARCHAR(100),
    gender CHAR(1),
    birth_year INT,
    region VARCHAR(50),
    preferred_channel VARCHAR(10),
    sms_opt_in TINYINT(1) NOT NULL DEFAULT 0,
    kakao_opt_in TINYINT(1) NOT NULL DEFAULT 0,
    push_opt_in TINYINT(1) NOT NULL DEFAULT 0,
    email_opt_in TINYINT(1) NOT NULL DEFAULT 0,
    phone_e164 VARCHAR(20),
    kakao_user_key VARCHAR(128),
    push_token VARCHAR(255),
    email VARCHAR(255),
    updated_at DATETIME
) DEFAULT CHARSET = utf8mb4;
CREATE TABLE IF NOT EXISTS user_features (
    user_id VARCHAR(64) NOT NULL PRIMARY KEY,
    lifecycle_stage VARCHAR(16),
    last_browse_at DATETIME,
    last_cart_at DATETIME,
    last_purchase_at DATETIME,
    cart_items_count INT NOT NULL DEFAULT 0,
    persona_id VARCHAR(32),
    skin_type VARCHAR(16),
    skin_concern_primary VARCHAR(32),
    sensitivity_level VARCHAR(8),
    top_category_30d VARCHAR(32),
    updated_at DATETIME,
    CONSTRAINT fk_user_features_user FOREIGN KEY (user_id) REFERENCES users (user_id)
) DEFAULT CHARSET = utf8mb4;
"#;

const POSTGRES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id VARCHAR(64) PRIMARY KEY,
    customer_name VARCHAR(100),
    gender VARCHAR(1),
    birth_year INTEGER,
    region VARCHAR(50),
    preferred_channel VARCHAR(10),
    sms_opt_in BOOLEAN NOT NULL DEFAULT FALSE,
    kakao_opt_in BOOLEAN NOT NULL DEFAULT FALSE,
    push_opt_in BOOLEAN NOT NULL DEFAULT FALSE,
    email_opt_in BOOLEAN NOT NULL DEFAULT FALSE,
    phone_e164 VARCHAR(20),
    kakao_user_key VARCHAR(128),
    push_token VARCHAR(255),
    email VARCHAR(255),
    updated_at TIMESTAMP
);
CREATE TABLE IF NOT EXISTS user_features (
    user_id VARCHAR(64) PRIMARY KEY REFERENCES users (user_id),
    lifecycle_stage VARCHAR(16),
    last_browse_at TIMESTAMP,
    last_cart_at TIMESTAMP,
    last_purchase_at TIMESTAMP,
    cart_items_count INTEGER NOT NULL DEFAULT 0,
    persona_id VARCHAR(32),
    skin_type VARCHAR(16),
    skin_concern_primary VARCHAR(32),
    sensitivity_level VARCHAR(8),
    top_category_30d VARCHAR(32),
    updated_at TIMESTAMP
);
"#;

pub fn create_tables_sql(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => SQLITE_DDL,
        Dialect::MySql => MYSQL_DDL,
        Dialect::Postgres => POSTGRES_DDL,
    }
}
