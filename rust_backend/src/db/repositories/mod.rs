//! Repository implementations module.
//!
//! - `local`: In-memory implementation for unit testing and local development
//! - `sqlite`: LMT SQLite databases, behind the `sqlite-repo` feature

pub mod local;
#[cfg(feature = "sqlite-repo")]
pub mod sqlite;

pub use local::LocalRepository;
#[cfg(feature = "sqlite-repo")]
pub use sqlite::SqliteRepository;
