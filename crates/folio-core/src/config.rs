//! Repository and query engine configuration.

use std::time::Duration;

use crate::storage::StorageConfig;

/// Query engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Runs slower than this are logged at warn level. None disables the
    /// warning.
    pub slow_query_threshold: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold: Some(Duration::from_millis(500)),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slow query threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Never warn about slow queries.
    pub fn without_slow_query_warning(mut self) -> Self {
        self.slow_query_threshold = None;
        self
    }
}

/// Configuration for a [`Repository`](crate::Repository).
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: usize,
    /// Upper bound on any requested page size.
    pub max_page_size: usize,
    /// Flush the store when a commit reaches it.
    pub flush_on_commit: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            engine: EngineConfig::default(),
            default_page_size: 100,
            max_page_size: 1000,
            flush_on_commit: true,
        }
    }
}

impl RepositoryConfig {
    /// Create a configuration storing data under `storage`.
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            ..Default::default()
        }
    }

    /// A configuration backed by a temporary store, for tests.
    pub fn temporary() -> Self {
        Self::new(StorageConfig::temporary())
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set the default page size.
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the maximum page size.
    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_flush_on_commit(mut self, flush: bool) -> Self {
        self.flush_on_commit = flush;
        self
    }
}
