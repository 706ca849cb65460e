//! Indexer configuration.

use crate::analysis::TokenizerConfig;
use crate::error::{IndexError, IndexResult};

/// Configuration for opening a full-text indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Whether to create the index directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether every write is committed immediately.
    pub auto_commit: bool,

    /// Whether to fsync the log on every commit.
    pub sync_on_commit: bool,

    /// Pending operations that force a commit when `auto_commit` is off.
    pub max_buffered_ops: usize,

    /// Deleted/total document ratio that triggers compaction on commit
    /// (0 = never).
    pub compact_ratio: f64,

    /// Analysis settings for text fields and query terms.
    pub tokenizer: TokenizerConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            auto_commit: true,
            sync_on_commit: true,
            max_buffered_ops: 1000,
            compact_ratio: 0.5,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the index directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether every write commits immediately.
    #[must_use]
    pub const fn auto_commit(mut self, value: bool) -> Self {
        self.auto_commit = value;
        self
    }

    /// Sets whether to sync the log on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the buffered operation limit.
    #[must_use]
    pub const fn max_buffered_ops(mut self, count: usize) -> Self {
        self.max_buffered_ops = count;
        self
    }

    /// Sets the compaction trigger ratio.
    #[must_use]
    pub fn compact_ratio(mut self, ratio: f64) -> Self {
        self.compact_ratio = ratio;
        self
    }

    /// Sets the tokenizer configuration.
    #[must_use]
    pub fn tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] describing the first bad value.
    pub fn validate(&self) -> IndexResult<()> {
        if self.max_buffered_ops == 0 {
            return Err(IndexError::invalid_argument(
                "max_buffered_ops must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.compact_ratio) {
            return Err(IndexError::invalid_argument(format!(
                "compact_ratio must be within 0..=1, got {}",
                self.compact_ratio
            )));
        }
        let tokenizer = &self.tokenizer;
        if tokenizer.min_token_length == 0 || tokenizer.min_token_length > tokenizer.max_token_length
        {
            return Err(IndexError::invalid_argument(format!(
                "token length bounds {}..={} are empty",
                tokenizer.min_token_length, tokenizer.max_token_length
            )));
        }
        Ok(())
    }
}
