use std::time::Duration;

/// Runtime configuration for porthole
pub struct Config {
    /// Maximum number of log lines to keep in the window buffer
    pub max_lines: usize,
    /// Lines per history page (also the size of the connect replay)
    pub page_size: u64,
    /// Lines per render fragment when a batch is chunked
    pub chunk_size: usize,
    /// Batches larger than this are spread across scheduler steps
    pub chunk_threshold: usize,
    /// Quiet period before a filter edit is applied
    pub filter_debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_lines: 10_000,
            page_size: 500,
            chunk_size: 100,
            chunk_threshold: 1_000,
            filter_debounce: Duration::from_millis(300),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_lines = std::env::var("PORTHOLE_MAX_LINES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_lines);

        let page_size = std::env::var("PORTHOLE_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.page_size);

        Self {
            max_lines,
            page_size,
            ..defaults
        }
    }
}

/// Capacity of the mpsc channels between adapters and the event loop
pub const DEFAULT_CHANNEL_BUFFER: usize = 1024;
