//! Common library for the ATOM Connect workspace
//!
//! Shared infrastructure used by the connect service: the Postgres pool that
//! backs user sync, the Redis pool that backs token persistence, and the
//! error types both of them report.

pub mod cache;
pub mod database;
pub mod error;
