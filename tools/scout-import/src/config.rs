//! Import parameters
//!
//! Loaded from an optional TOML file; command line flags override single
//! fields afterwards. Every field has a default so partial files work.

use scout_common::{Error, IoContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::area_index::{AreaIndexConfig, DEFAULT_MAX_LEVEL, MAX_SUPPORTED_LEVEL};
use crate::wayway::collect::BlockLimits;
use crate::wayway::split::{SplitLimits, DEFAULT_MAX_LENGTH_M, DEFAULT_MAX_NODES};
use crate::wayway::WayWayConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportParameter {
    pub destination: PathBuf,
    pub start_step: u32,
    pub end_step: u32,
    /// Fragments held in memory per merge pass
    pub raw_way_block_size: usize,
    /// Node references held in memory per merge pass
    pub raw_coord_block_size: usize,
    pub max_way_nodes: usize,
    pub max_way_length_km: f64,
    pub coord_data_memory_mapped: bool,
    pub area_index_max_level: u32,
    pub write_address_debug: bool,
}

impl Default for ImportParameter {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            start_step: 1,
            end_step: crate::pipeline::LAST_STEP,
            raw_way_block_size: 500_000,
            raw_coord_block_size: 60_000_000,
            max_way_nodes: DEFAULT_MAX_NODES,
            max_way_length_km: DEFAULT_MAX_LENGTH_M / 1000.0,
            coord_data_memory_mapped: false,
            area_index_max_level: DEFAULT_MAX_LEVEL,
            write_address_debug: true,
        }
    }
}

impl ImportParameter {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).at_path(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.raw_way_block_size == 0 || self.raw_coord_block_size == 0 {
            return Err(Error::Config("block sizes must be positive".into()));
        }
        if self.max_way_nodes < 2 {
            return Err(Error::Config(format!(
                "max_way_nodes must be at least 2, got {}",
                self.max_way_nodes
            )));
        }
        if self.max_way_length_km.is_nan() || self.max_way_length_km <= 0.0 {
            return Err(Error::Config(format!(
                "max_way_length_km must be positive, got {}",
                self.max_way_length_km
            )));
        }
        if self.area_index_max_level > MAX_SUPPORTED_LEVEL {
            return Err(Error::Config(format!(
                "area_index_max_level must be at most {}, got {}",
                MAX_SUPPORTED_LEVEL, self.area_index_max_level
            )));
        }
        if self.start_step > self.end_step {
            return Err(Error::Config(format!(
                "start step {} is after end step {}",
                self.start_step, self.end_step
            )));
        }
        Ok(())
    }

    pub fn wayway(&self) -> WayWayConfig {
        WayWayConfig {
            destination: self.destination.clone(),
            block: BlockLimits {
                max_ways: self.raw_way_block_size,
                max_nodes: self.raw_coord_block_size,
            },
            split: SplitLimits {
                max_nodes: self.max_way_nodes,
                max_length_m: self.max_way_length_km * 1000.0,
            },
            coord_data_memory_mapped: self.coord_data_memory_mapped,
        }
    }

    pub fn area_index(&self) -> AreaIndexConfig {
        AreaIndexConfig {
            destination: self.destination.clone(),
            max_level: self.area_index_max_level,
            write_address_debug: self.write_address_debug,
        }
    }
}
