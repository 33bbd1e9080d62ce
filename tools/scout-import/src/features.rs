//! Tag-derived attribute values attached to ways, areas and rings
//!
//! The buffer is kept canonical (sorted by kind, one value per kind) so two
//! buffers compare equal exactly when their encodings are byte-equal.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FeatureKind {
    Name = 0,
    NameAlt = 1,
    Ref = 2,
    /// Street name of an address
    Location = 3,
    /// House number
    Address = 4,
    PostalCode = 5,
    Layer = 6,
    Width = 7,
    MaxSpeed = 8,
    Access = 9,
    Bridge = 10,
    Tunnel = 11,
}

impl FeatureKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        use FeatureKind::*;
        Some(match value {
            0 => Name,
            1 => NameAlt,
            2 => Ref,
            3 => Location,
            4 => Address,
            5 => PostalCode,
            6 => Layer,
            7 => Width,
            8 => MaxSpeed,
            9 => Access,
            10 => Bridge,
            11 => Tunnel,
            _ => return None,
        })
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeatureValueBuffer {
    values: Vec<(FeatureKind, String)>,
}

impl FeatureValueBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary pairs. Later duplicates of a kind win.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (FeatureKind, S)>,
        S: Into<String>,
    {
        let mut buffer = Self::new();
        for (kind, value) in pairs {
            buffer.set(kind, value);
        }
        buffer
    }

    pub fn set(&mut self, kind: FeatureKind, value: impl Into<String>) {
        let value = value.into();
        match self.values.binary_search_by_key(&kind, |(k, _)| *k) {
            Ok(pos) => self.values[pos].1 = value,
            Err(pos) => self.values.insert(pos, (kind, value)),
        }
    }

    pub fn get(&self, kind: FeatureKind) -> Option<&str> {
        self.values
            .binary_search_by_key(&kind, |(k, _)| *k)
            .ok()
            .map(|pos| self.values[pos].1.as_str())
    }

    pub fn remove(&mut self, kind: FeatureKind) -> Option<String> {
        self.values
            .binary_search_by_key(&kind, |(k, _)| *k)
            .ok()
            .map(|pos| self.values.remove(pos).1)
    }

    pub fn has(&self, kind: FeatureKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}
