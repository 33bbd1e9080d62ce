//! Per-area transforms applied while area bodies are copied into areas.dat
//!
//! Filters run in order. A filter returning `false` from `process` drops the
//! area and the remaining filters never see it.

pub mod location;
pub mod node_reduction;
pub mod type_ignore;

use scout_common::Result;
use std::path::PathBuf;

use crate::formats::areas::Area;
use crate::types::TypeConfig;

pub use location::LocationProcessorFilter;
pub use node_reduction::NodeReductionProcessorFilter;
pub use type_ignore::TypeIgnoreProcessorFilter;

pub trait ProcessingFilter: Send {
    fn name(&self) -> &'static str;

    fn before_all(&mut self, _types: &TypeConfig) -> Result<()> {
        Ok(())
    }

    /// Transform `area` in place. `offset` is the area's position in its
    /// source file. Returns whether the area should be kept.
    fn process(&mut self, offset: u64, area: &mut Area, types: &TypeConfig) -> Result<bool>;

    fn after_all(&mut self, _types: &TypeConfig) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ProcessingFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location extraction, node reduction, ignored type removal
    pub fn standard(address_file: Option<PathBuf>) -> Self {
        let mut chain = Self::new();
        chain.push(LocationProcessorFilter::new(address_file));
        chain.push(NodeReductionProcessorFilter::new());
        chain.push(TypeIgnoreProcessorFilter::new());
        chain
    }

    pub fn push<F: ProcessingFilter + 'static>(&mut self, filter: F) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn before_all(&mut self, types: &TypeConfig) -> Result<()> {
        for filter in &mut self.filters {
            filter.before_all(types)?;
        }
        Ok(())
    }

    pub fn process(&mut self, offset: u64, area: &mut Area, types: &TypeConfig) -> Result<bool> {
        for filter in &mut self.filters {
            if !filter.process(offset, area, types)? {
                tracing::debug!(area = area.id, filter = filter.name(), "area dropped");
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn after_all(&mut self, types: &TypeConfig) -> Result<()> {
        for filter in &mut self.filters {
            filter.after_all(types)?;
        }
        Ok(())
    }
}
