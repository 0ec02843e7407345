use serde::{Deserialize, Serialize};

pub const IN_MEMORY: &str = ":memory:";

/// Database and engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    /// Trace every generated statement at `info` level
    pub verbose: bool,
    /// Reopen a stale connection instead of failing with `Disconnected`
    pub reconnect: bool,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            db_path: IN_MEMORY.to_string(),
            verbose: false,
            reconnect: true,
        }
    }
}

impl OrmConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY
    }
}
