//! Idempotent demo data seeder for the CRM `users` / `user_features` tables.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logger;
pub mod model;
pub mod repo;
pub mod seeder;
pub mod target;
pub mod verify;

pub use error::{SeedError, SeedResult};
