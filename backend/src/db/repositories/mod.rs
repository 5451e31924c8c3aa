//! Repository backends.
//!
//! - `local`: in-memory store for development and tests
//! - `postgres`: Diesel + r2d2 store (feature `postgres-repo`)
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use postgres::{PoolStats, PostgresConfig, PostgresRepository};
