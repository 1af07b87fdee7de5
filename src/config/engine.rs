//! # Engine Configuration
//!
//! `EngineConfig` carries the runtime sizing of every operator that owns an
//! arena: record lists built by joins, group-by maps, analytic partition
//! state. It is a plain value passed by reference at construction time; the
//! engine keeps no global configuration.
//!
//! ## Configuration Options
//!
//! | Option                 | Default                          |
//! |------------------------|----------------------------------|
//! | record_list_page_size  | `DEFAULT_RECORD_LIST_PAGE_SIZE`  |
//! | map_page_size          | `DEFAULT_MAP_PAGE_SIZE`          |
//! | map_capacity           | `DEFAULT_MAP_CAPACITY`           |
//!
//! ## Usage
//!
//! ```ignore
//! let config = EngineConfig::builder()
//!     .record_list_page_size(4096)
//!     .map_capacity(1024)
//!     .build()?;
//! ```

use eyre::{ensure, Result};

use super::constants::{
    DEFAULT_MAP_CAPACITY, DEFAULT_MAP_PAGE_SIZE, DEFAULT_RECORD_LIST_PAGE_SIZE, MIN_PAGE_SIZE,
};

/// Sizing parameters for arena-backed operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    record_list_page_size: usize,
    map_page_size: usize,
    map_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_list_page_size: DEFAULT_RECORD_LIST_PAGE_SIZE,
            map_page_size: DEFAULT_MAP_PAGE_SIZE,
            map_capacity: DEFAULT_MAP_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    pub fn record_list_page_size(&self) -> usize {
        self.record_list_page_size
    }

    pub fn map_page_size(&self) -> usize {
        self.map_page_size
    }

    pub fn map_capacity(&self) -> usize {
        self.map_capacity
    }
}

/// Builder for [`EngineConfig`]. Unset options fall back to the defaults.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    record_list_page_size: Option<usize>,
    map_page_size: Option<usize>,
    map_capacity: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size for record lists. Also bounds the longest storable string.
    pub fn record_list_page_size(mut self, bytes: usize) -> Self {
        self.record_list_page_size = Some(bytes);
        self
    }

    /// Page size for group-by maps. One map entry must fit in a page.
    pub fn map_page_size(mut self, bytes: usize) -> Self {
        self.map_page_size = Some(bytes);
        self
    }

    pub fn map_capacity(mut self, slots: usize) -> Self {
        self.map_capacity = Some(slots);
        self
    }

    /// Validates the options and produces the configuration.
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            record_list_page_size: self
                .record_list_page_size
                .unwrap_or(defaults.record_list_page_size),
            map_page_size: self.map_page_size.unwrap_or(defaults.map_page_size),
            map_capacity: self.map_capacity.unwrap_or(defaults.map_capacity),
        };

        for (name, size) in [
            ("record_list_page_size", config.record_list_page_size),
            ("map_page_size", config.map_page_size),
        ] {
            ensure!(
                size.is_power_of_two(),
                "{} must be a power of two, got {}",
                name,
                size
            );
            ensure!(
                size >= MIN_PAGE_SIZE,
                "{} must be at least {} bytes, got {}",
                name,
                MIN_PAGE_SIZE,
                size
            );
        }

        Ok(config)
    }
}
