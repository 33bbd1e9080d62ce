//! Removal of areas whose type is not meant to be stored

use scout_common::Result;

use super::ProcessingFilter;
use crate::formats::areas::Area;
use crate::types::TypeConfig;

#[derive(Debug, Default)]
pub struct TypeIgnoreProcessorFilter {
    removed: u64,
}

impl TypeIgnoreProcessorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removed(&self) -> u64 {
        self.removed
    }
}

impl ProcessingFilter for TypeIgnoreProcessorFilter {
    fn name(&self) -> &'static str {
        "type-ignore"
    }

    fn process(&mut self, _offset: u64, area: &mut Area, types: &TypeConfig) -> Result<bool> {
        if types.is_ignored(area.type_id) {
            self.removed += 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn after_all(&mut self, _types: &TypeConfig) -> Result<()> {
        tracing::info!(removed = self.removed, "ignored-type areas removed");
        Ok(())
    }
}
