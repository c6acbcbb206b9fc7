//! Repository factory for dependency injection.
//!
//! Creates repository instances from runtime configuration.

use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositorySettings;
use super::repositories::LocalRepository;
#[cfg(feature = "sqlite-repo")]
use super::repositories::SqliteRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory repository
    Local,
    /// LMT SQLite database file
    Sqlite,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string ("local", "sqlite").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(format!(
                "Unknown repository type: '{}'. Valid options: local, sqlite",
                s
            )),
        }
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```
/// use lmt_rust::db::{RepositoryFactory, RepositorySettings};
///
/// let repo = RepositoryFactory::create(&RepositorySettings::default()).unwrap();
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository from the `[repository]` settings.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn FullRepository>)` - Repository instance
    /// * `Err(RepositoryError::ConfigurationError)` - On an unknown or
    ///   unavailable backend
    pub fn create(settings: &RepositorySettings) -> RepositoryResult<Arc<dyn FullRepository>> {
        match settings.repository_type()? {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Sqlite => Self::create_sqlite(settings),
        }
    }

    /// Create an empty in-memory repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    #[cfg(feature = "sqlite-repo")]
    fn create_sqlite(settings: &RepositorySettings) -> RepositoryResult<Arc<dyn FullRepository>> {
        let path = settings.path.as_ref().ok_or_else(|| {
            RepositoryError::ConfigurationError("SQLite repository requires a `path`".to_string())
        })?;
        Ok(Arc::new(SqliteRepository::open(path)?))
    }

    #[cfg(not(feature = "sqlite-repo"))]
    fn create_sqlite(_settings: &RepositorySettings) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(RepositoryError::ConfigurationError(
            "SQLite support not compiled in (enable the `sqlite-repo` feature)".to_string(),
        ))
    }
}
