//! Migration and cursor configuration.

use serde_json::{json, Value};
use std::time::Duration;

/// Default number of documents fetched per scroll page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default scroll keep-alive window (1 minute).
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Default number of source documents between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// The query that selects every document.
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

/// Scroll cursor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Documents per page. Always at least 1.
    pub page_size: usize,

    /// How long the backend keeps the cursor alive between page fetches.
    pub keep_alive: Duration,
}

impl ScrollConfig {
    /// Create a scroll configuration with default values.
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the keep-alive window.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Keep-alive rendered as a time-unit string (`"1m"`, `"30s"`, `"250ms"`).
    pub fn keep_alive_param(&self) -> String {
        let millis = self.keep_alive.as_millis();
        if millis > 0 && millis % 60_000 == 0 {
            format!("{}m", millis / 60_000)
        } else if millis > 0 && millis % 1000 == 0 {
            format!("{}s", millis / 1000)
        } else {
            format!("{}ms", millis)
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Migration executor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    /// Source documents between progress log lines. 0 disables progress logging.
    pub progress_interval: u64,

    /// Query selecting the source documents to copy.
    pub query: Value,
}

impl MigrationConfig {
    /// Create a migration configuration with default values.
    pub fn new() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            query: match_all(),
        }
    }

    /// Set the progress logging interval.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the source query.
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scroll_config() {
        let config = ScrollConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.keep_alive, DEFAULT_KEEP_ALIVE);
        assert_eq!(config.keep_alive_param(), "1m");
    }

    #[test]
    fn test_scroll_config_builder() {
        let config = ScrollConfig::new()
            .with_page_size(0)
            .with_keep_alive(Duration::from_secs(30));

        assert_eq!(config.page_size, 1);
        assert_eq!(config.keep_alive_param(), "30s");
    }

    #[test]
    fn test_keep_alive_param_units() {
        let param = |d| ScrollConfig::new().with_keep_alive(d).keep_alive_param();
        assert_eq!(param(Duration::from_secs(300)), "5m");
        assert_eq!(param(Duration::from_secs(90)), "90s");
        assert_eq!(param(Duration::from_millis(250)), "250ms");
        assert_eq!(param(Duration::ZERO), "0ms");
    }

    #[test]
    fn test_default_migration_config() {
        let config = MigrationConfig::default();
        assert_eq!(config.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        assert_eq!(config.query, match_all());
    }
}
