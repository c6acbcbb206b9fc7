//! `[repository]` section of the analysis configuration file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::factory::RepositoryType;
use super::repository::RepositoryError;

/// Which store to read the recording from.
///
/// ```toml
/// [repository]
/// type = "sqlite"
/// path = "data/cage1.sqlite"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
    /// Database file, required by the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_repo_type() -> String {
    "local".to_string()
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
            path: None,
        }
    }
}

impl RepositorySettings {
    /// Parse the backend name.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConfigurationError)` for an unknown name or a
    ///   sqlite backend without a path
    pub fn repository_type(&self) -> Result<RepositoryType, RepositoryError> {
        let repo_type: RepositoryType = self
            .repo_type
            .parse()
            .map_err(RepositoryError::ConfigurationError)?;

        if repo_type == RepositoryType::Sqlite && self.path.is_none() {
            return Err(RepositoryError::ConfigurationError(
                "SQLite repository requires a `path`".to_string(),
            ));
        }
        Ok(repo_type)
    }
}
