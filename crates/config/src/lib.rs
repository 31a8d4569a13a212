//! Shared configuration for the mesh kernel
//!
//! This crate provides the single source of truth for the tunables shared by
//! the topology store and the operator engine (arena chunk size, maximum
//! operator nesting, post-exec validation).

use serde::{Deserialize, Serialize};

/// Default operator arena chunk size in bytes
pub const DEFAULT_ARENA_CHUNK_SIZE: usize = 4096;

/// Default maximum operator nesting depth (flag stack capacity)
pub const DEFAULT_MAX_FLAG_DEPTH: usize = 16;

/// Kernel configuration carried by every mesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Bytes per chunk of an operator's scratch arena
    pub arena_chunk_size: usize,
    /// Deepest allowed operator nesting before exec is refused
    pub max_flag_depth: usize,
    /// Run full topology validation after every operator exec
    pub validate_after_exec: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            arena_chunk_size: DEFAULT_ARENA_CHUNK_SIZE,
            max_flag_depth: DEFAULT_MAX_FLAG_DEPTH,
            validate_after_exec: cfg!(debug_assertions),
        }
    }
}

impl KernelConfig {
    /// Create a config with the given arena chunk size and nesting limit
    pub fn new(arena_chunk_size: usize, max_flag_depth: usize) -> Self {
        Self {
            arena_chunk_size,
            max_flag_depth,
            ..Self::default()
        }
    }

    /// Enable or disable validation after exec
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_after_exec = enabled;
        self
    }

    /// Arena chunk size, never zero
    pub fn chunk_size(&self) -> usize {
        self.arena_chunk_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert_eq!(config.arena_chunk_size, DEFAULT_ARENA_CHUNK_SIZE);
        assert_eq!(config.max_flag_depth, DEFAULT_MAX_FLAG_DEPTH);
        assert_eq!(config.validate_after_exec, cfg!(debug_assertions));
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let config = KernelConfig::new(0, 4);
        assert_eq!(config.chunk_size(), 1);
        assert_eq!(config.max_flag_depth, 4);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: KernelConfig = serde_json::from_str(r#"{"max_flag_depth": 3}"#).unwrap();
        assert_eq!(config.max_flag_depth, 3);
        assert_eq!(config.arena_chunk_size, DEFAULT_ARENA_CHUNK_SIZE);

        let json = serde_json::to_string(&config.clone().with_validation(true)).unwrap();
        let back: KernelConfig = serde_json::from_str(&json).unwrap();
        assert!(back.validate_after_exec);
        assert_eq!(back.max_flag_depth, 3);
    }
}
