//! Storage configuration

use fjall::{CompressionType, PersistMode};
use std::path::PathBuf;

/// Persistent store configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for storage files
    pub data_dir: PathBuf,

    /// Fjall block cache size in bytes
    pub block_cache_size: u64,

    /// Compression type for group partitions
    pub compression: CompressionType,

    /// Persistence mode for writes
    pub persist_mode: PersistMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use tempfile to create a proper temporary directory
        // Using .keep() to persist the directory (won't be auto-deleted)
        let temp_dir = tempfile::tempdir()
            .expect("Failed to create temporary directory")
            .keep();

        Self {
            data_dir: temp_dir,
            block_cache_size: 256 * 1024 * 1024,
            compression: CompressionType::Lz4,
            persist_mode: PersistMode::Buffer,
        }
    }
}

impl StorageConfig {
    /// Config rooted at a caller-owned directory
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: path.into(),
            ..Self::default()
        }
    }

    /// Create config optimized for testing
    pub fn for_testing() -> Self {
        Self {
            block_cache_size: 16 * 1024 * 1024,
            compression: CompressionType::None, // Faster for tests
            persist_mode: PersistMode::Buffer,  // Don't sync to disk in tests
            ..Self::default()
        }
    }
}
