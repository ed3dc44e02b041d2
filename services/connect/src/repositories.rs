//! Repositories for database operations

pub mod user;

pub use user::{MemoryUserDirectory, PgUserDirectory, SyncedUser, UserDirectory};
