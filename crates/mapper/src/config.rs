//! Mapper configuration via `docmap.toml`
//!
//! Every setting has a default, so an empty file (or no file) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MapperError, MapperResult};

/// Config file name looked up by embedders.
pub const CONFIG_FILE_NAME: &str = "docmap.toml";

/// Mapper configuration loaded from `docmap.toml`.
///
/// # Example
///
/// ```toml
/// # Maximum number of entity types kept in the metadata cache (0 = unbounded)
/// metadata_cache_capacity = 0
/// # How deep cascading reads and writes may recurse
/// max_cascade_depth = 8
/// # Nesting limit for embedded objects
/// max_embedded_depth = 64
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Maximum cached entity types; least recently used are evicted and
    /// rebuilt on next access. `0` disables eviction.
    #[serde(default)]
    pub metadata_cache_capacity: usize,
    /// Recursion limit for cascade persist, cascade read and cascade fetch.
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: usize,
    /// Nesting limit for embedded objects, counted apart from cascades.
    #[serde(default = "default_max_embedded_depth")]
    pub max_embedded_depth: usize,
    /// Start value for AutoIncrement ids that do not declare their own.
    #[serde(default = "default_auto_increment_start")]
    pub default_auto_increment_start: i64,
    /// Log skipped fields at `warn` (true) or `debug` (false).
    #[serde(default = "default_log_field_errors")]
    pub log_field_errors: bool,
}

fn default_max_cascade_depth() -> usize {
    8
}

fn default_max_embedded_depth() -> usize {
    64
}

fn default_auto_increment_start() -> i64 {
    1
}

fn default_log_field_errors() -> bool {
    true
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            metadata_cache_capacity: 0,
            max_cascade_depth: default_max_cascade_depth(),
            max_embedded_depth: default_max_embedded_depth(),
            default_auto_increment_start: default_auto_increment_start(),
            log_field_errors: default_log_field_errors(),
        }
    }
}

impl MapperConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if either depth limit is zero.
    pub fn validate(&self) -> MapperResult<()> {
        if self.max_cascade_depth == 0 {
            return Err(MapperError::Config(
                "max_cascade_depth must be at least 1".to_string(),
            ));
        }
        if self.max_embedded_depth == 0 {
            return Err(MapperError::Config(
                "max_embedded_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docmap mapper configuration
#
# Maximum number of entity types kept in the metadata cache.
# 0 = unbounded. When bounded, the least recently used type is evicted
# and its metadata is rebuilt transparently on next access.
metadata_cache_capacity = 0

# How deep cascading reads, writes and fetches may recurse.
max_cascade_depth = 8

# How deeply embedded objects may nest inside one document.
# Embedded levels do not count against max_cascade_depth.
max_embedded_depth = 64

# Start value for AutoIncrement ids that do not declare their own.
default_auto_increment_start = 1

# Log fields skipped because of access or coercion errors at warn level.
# Set to false to log them at debug level instead.
log_field_errors = true
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> MapperResult<Self> {
        let config: MapperConfig = toml::from_str(content)
            .map_err(|e| MapperError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> MapperResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MapperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            MapperError::Config(msg) => {
                MapperError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> MapperResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                MapperError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> MapperResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MapperError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            MapperError::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
