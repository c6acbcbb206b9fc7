//! Data access for LMT recordings.
//!
//! Access goes through the Repository pattern so the analysis code never
//! depends on a concrete store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Analysis layer (services: session, aggregator)         │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ SQLite Repository│     │  Local Repository       │
//! │ (LMT database)   │     │  (in-memory)            │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! - `repository`: Trait definitions and error types
//! - `repositories::sqlite`: LMT SQLite files (`sqlite-repo` feature)
//! - `repositories::local`: In-memory implementation for tests and development
//! - `factory`: Creates a repository from the `[repository]` settings

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositorySettings;
pub use repositories::LocalRepository;
#[cfg(feature = "sqlite-repo")]
pub use repositories::SqliteRepository;
pub use repository::{
    AnimalRepository, EventRepository, FrameRepository, FullRepository, RepositoryError,
    RepositoryResult,
};
