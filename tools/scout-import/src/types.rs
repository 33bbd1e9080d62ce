//! Object type table (`types.json`)
//!
//! Type id 0 is reserved for the ignore type and never appears in the file.

use scout_common::{Error, IoContext, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub type TypeId = u16;

/// Reserved id of the ignore type
pub const IGNORE_TYPE: TypeId = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: String,
    #[serde(default)]
    pub can_be_way: bool,
    #[serde(default)]
    pub can_be_area: bool,
    #[serde(default)]
    pub poi: bool,
    #[serde(default)]
    pub ignore: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TypesFile {
    types: Vec<TypeInfo>,
}

#[derive(Debug, Clone)]
pub struct TypeConfig {
    /// Indexed by type id; `None` for unused ids
    types: Vec<Option<TypeInfo>>,
}

impl TypeConfig {
    pub fn new(types: Vec<TypeInfo>) -> Result<Self> {
        let max_id = types.iter().map(|t| t.id).max().unwrap_or(IGNORE_TYPE);
        let mut slots: Vec<Option<TypeInfo>> = vec![None; max_id as usize + 1];

        for info in types {
            if info.id == IGNORE_TYPE {
                return Err(Error::Config(format!(
                    "type '{}' uses reserved id 0",
                    info.name
                )));
            }
            let slot = &mut slots[info.id as usize];
            if let Some(existing) = slot {
                return Err(Error::Config(format!(
                    "type id {} assigned to both '{}' and '{}'",
                    info.id, existing.name, info.name
                )));
            }
            *slot = Some(info);
        }

        Ok(Self { types: slots })
    }

    /// Load the type table from its JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).at_path(path)?;
        let parsed: TypesFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::new(parsed.types)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).at_path(path)?;
        let out = TypesFile {
            types: self.iter().cloned().collect(),
        };
        serde_json::to_writer_pretty(file, &out)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id as usize).and_then(|t| t.as_ref())
    }

    /// Unknown ids and the reserved id resolve to the ignore type.
    pub fn is_ignored(&self, id: TypeId) -> bool {
        self.get(id).map_or(true, |t| t.ignore)
    }

    pub fn is_poi(&self, id: TypeId) -> bool {
        self.get(id).is_some_and(|t| t.poi)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter().flatten()
    }

    /// Types taking part in the way stage
    pub fn way_types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.iter().filter(|t| t.can_be_way && !t.ignore)
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.get(id).map_or("ignore", |t| t.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn info(id: TypeId, name: &str) -> TypeInfo {
        TypeInfo {
            id,
            name: name.to_string(),
            can_be_way: true,
            can_be_area: false,
            poi: false,
            ignore: false,
        }
    }

    #[test]
    fn test_ignore_semantics() {
        let mut hidden = info(2, "hidden");
        hidden.ignore = true;
        let config = TypeConfig::new(vec![info(1, "highway_primary"), hidden]).unwrap();

        assert!(config.is_ignored(IGNORE_TYPE));
        assert!(!config.is_ignored(1));
        assert!(config.is_ignored(2));
        assert!(config.is_ignored(99));
        assert_eq!(config.way_types().count(), 1);
    }

    #[test]
    fn test_reserved_and_duplicate_ids_rejected() {
        assert!(TypeConfig::new(vec![info(0, "bad")]).is_err());
        assert!(TypeConfig::new(vec![info(3, "a"), info(3, "b")]).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let config = TypeConfig::new(vec![info(1, "a"), info(4, "d")]).unwrap();
        config.write(tmp.path()).unwrap();

        let loaded = TypeConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.name(4), "d");
        assert!(loaded.get(2).is_none());
    }
}
