//! scout-import: way consolidation and area indexing for offline map databases
//!
//! Two steps run over a destination directory prepared by the earlier
//! import stages:
//! 1. `wayway` merges way fragments that continue each other and splits the
//!    result into bounded ways, keeping turn restrictions consistent.
//! 2. `areaindex` places every area in a quad-tree cell, copies the areas
//!    through a filter chain and writes the index depth-first.

pub mod area_index;
pub mod cli;
pub mod config;
pub mod features;
pub mod filters;
pub mod formats;
pub mod geo;
pub mod lock;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod types;
pub mod wayway;

pub use config::ImportParameter;
pub use pipeline::{run_import, ImportReport};
