//! Durable key/value persistence.
//!
//! The enrollment service keeps a small amount of state across restarts, most
//! importantly the number of enrolled templates. This crate provides:
//!
//! - [`Database`] - SQLite connection pool with automatic migrations
//! - [`DurableStore`] - unsigned integer get/put by key
//! - [`SqliteStore`] - the SQLite-backed store
//! - [`MemoryStore`] - a process-local store for tests and `--mock` runs
//!
//! # Example
//!
//! ```no_run
//! use fingerlink_storage::{Database, DatabaseConfig, DurableStore, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("fingerlink.db")).await?;
//! let store = SqliteStore::new(db.pool().clone());
//!
//! store.put_uint("enrolledCount", 4).await?;
//! assert_eq!(store.get_uint("enrolledCount").await?, Some(4));
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod kv;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use kv::{DurableStore, MemoryStore, SqliteStore};
