use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ten GiB: the aggregate input size above which loading asks for confirmation.
pub const DEFAULT_OVERSIZE_THRESHOLD: u64 = 10 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Lower bound of the adaptive chunk size.
    pub min_chunk: usize,
    /// Upper bound of the adaptive chunk size.
    pub max_chunk: usize,
    /// How many archive levels may be expanded below a top-level input.
    pub max_nesting: usize,
    /// Extra glob patterns whose matches are dropped like platform artifacts.
    pub ignore_patterns: Vec<String>,
    /// Pause after each finished input, for hosts that want progress to stay
    /// on screen long enough to be read.
    pub milestone_pause: Duration,
    pub oversize_threshold: u64,
    /// Export entries are named `<prefix>_<n>.pdf`.
    pub export_entry_prefix: String,
    /// Export archives are named `<prefix>_<yyyy-mm-dd>.zip`.
    pub export_archive_prefix: String,
    pub export_compression_level: i64,
}
impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            min_chunk: 10,
            max_chunk: 100,
            max_nesting: 8,
            ignore_patterns: Vec::new(),
            milestone_pause: Duration::ZERO,
            oversize_threshold: DEFAULT_OVERSIZE_THRESHOLD,
            export_entry_prefix: "Document".to_string(),
            export_archive_prefix: "PDFs".to_string(),
            export_compression_level: 5,
        }
    }
}
impl BuildOptions {
    /// Entries processed between two yield points: a twentieth of the input,
    /// kept within `[min_chunk, max_chunk]`.
    pub fn chunk_size(&self, total: usize) -> usize {
        (total / 20).clamp(self.min_chunk.max(1), self.max_chunk.max(self.min_chunk).max(1))
    }
}
#[derive(Debug, Default)]
pub struct BuildOptionsBuilder {
    options: BuildOptions,
}
impl BuildOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn chunk_bounds(mut self, min: usize, max: usize) -> Self {
        self.options.min_chunk = min;
        self.options.max_chunk = max;
        self
    }
    pub fn max_nesting(mut self, depth: usize) -> Self {
        self.options.max_nesting = depth;
        self
    }
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore_patterns = patterns;
        self
    }
    pub fn milestone_pause(mut self, pause: Duration) -> Self {
        self.options.milestone_pause = pause;
        self
    }
    pub fn oversize_threshold(mut self, bytes: u64) -> Self {
        self.options.oversize_threshold = bytes;
        self
    }
    pub fn export_entry_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.export_entry_prefix = prefix.into();
        self
    }
    pub fn export_archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.export_archive_prefix = prefix.into();
        self
    }
    pub fn export_compression_level(mut self, level: i64) -> Self {
        self.options.export_compression_level = level;
        self
    }
    pub fn build(self) -> BuildOptions {
        self.options
    }
}
