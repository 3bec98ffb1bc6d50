use std::path::PathBuf;

/// Connection settings for the staging database.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// DuckDB database file; unset means no staging destination is configured
    pub database: Option<PathBuf>,
    /// DuckDB memory limit (e.g. "4GB")
    pub memory_limit: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            database: None,
            memory_limit: "4GB".to_string(),
        }
    }
}
