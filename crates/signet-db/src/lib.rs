//! Persistence layer for signet.
//!
//! Entity models for the local identity store (users, provider account
//! linkages, email address records) with `sqlx` Postgres access methods,
//! plus embedded schema migrations.

pub mod error;
pub mod migrations;
pub mod models;

pub use error::DbError;
pub use models::{
    Account, CreateAccount, CreateEmail, CreateUser, User, UserEmail, UserStatus,
};
