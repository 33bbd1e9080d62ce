//! Address and POI extraction
//!
//! Address-like feature values are pulled off every ring and, for rings
//! that describe an address or a POI, written to areaaddress.dat. The
//! extracted values are not stored with the area afterwards.

use scout_common::Result;
use std::path::PathBuf;

use super::ProcessingFilter;
use crate::features::FeatureKind;
use crate::formats::address::AddressRecord;
use crate::formats::areas::{Area, Ring, RingNode, RingRole};
use crate::formats::record::RecordWriter;
use crate::types::TypeConfig;

#[derive(Debug, Default, Clone)]
struct RingAddress {
    name: String,
    postal_code: String,
    location: String,
    address: String,
}

impl RingAddress {
    fn take(ring: &mut Ring) -> Self {
        let mut take = |kind| ring.features.remove(kind).unwrap_or_default();
        Self {
            name: take(FeatureKind::Name),
            postal_code: take(FeatureKind::PostalCode),
            location: take(FeatureKind::Location),
            address: take(FeatureKind::Address),
        }
    }

    fn is_address(&self, ring: &Ring, types: &TypeConfig) -> bool {
        !types.is_ignored(ring.type_id) && !self.location.is_empty() && !self.address.is_empty()
    }

    fn is_poi(&self, ring: &Ring, types: &TypeConfig) -> bool {
        !self.name.is_empty() && types.is_poi(ring.type_id)
    }
}

pub struct LocationProcessorFilter {
    path: Option<PathBuf>,
    writer: Option<RecordWriter<AddressRecord>>,
    addresses: u64,
    pois: u64,
}

impl LocationProcessorFilter {
    /// `None` extracts and strips without writing the side file.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            writer: None,
            addresses: 0,
            pois: 0,
        }
    }

    pub fn addresses(&self) -> u64 {
        self.addresses
    }

    pub fn pois(&self) -> u64 {
        self.pois
    }

    fn record(
        &mut self,
        offset: u64,
        area: &Area,
        ring: &Ring,
        found: &RingAddress,
        nodes: &[RingNode],
    ) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.append(&AddressRecord {
                offset,
                area_id: area.id,
                type_id: ring.type_id,
                name: found.name.clone(),
                postal_code: found.postal_code.clone(),
                location: found.location.clone(),
                address: found.address.clone(),
                nodes: nodes.iter().map(|n| n.coord).collect(),
            })?;
        }
        Ok(())
    }
}

impl ProcessingFilter for LocationProcessorFilter {
    fn name(&self) -> &'static str {
        "location"
    }

    fn before_all(&mut self, _types: &TypeConfig) -> Result<()> {
        if let Some(path) = &self.path {
            self.writer = Some(RecordWriter::create(path)?);
        }
        Ok(())
    }

    fn process(&mut self, offset: u64, area: &mut Area, types: &TypeConfig) -> Result<bool> {
        let found: Vec<RingAddress> = area.rings.iter_mut().map(RingAddress::take).collect();

        for (index, (ring, values)) in area.rings.iter().zip(&found).enumerate() {
            let is_address = values.is_address(ring, types);
            let is_poi = values.is_poi(ring, types);
            if !is_address && !is_poi {
                continue;
            }
            if is_address {
                self.addresses += 1;
            }
            if is_poi {
                self.pois += 1;
            }

            if ring.role == RingRole::Master && ring.nodes.is_empty() {
                for outer in area.rings.iter().filter(|r| r.role == RingRole::Outer) {
                    self.record(offset, area, ring, values, &outer.nodes)?;
                }
            } else {
                self.record(offset, area, ring, values, &ring.nodes)?;
            }
            tracing::trace!(area = area.id, ring = index, "address extracted");
        }

        Ok(true)
    }

    fn after_all(&mut self, _types: &TypeConfig) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            let summary = writer.finish()?;
            tracing::info!(
                path = %summary.path.display(),
                records = summary.count,
                "wrote address debug file"
            );
        }
        tracing::info!(
            addresses = self.addresses,
            pois = self.pois,
            "location extraction finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::record::read_all;
    use crate::types::TypeInfo;
    use tempfile::TempDir;

    fn types() -> TypeConfig {
        let info = |id, name: &str, poi, ignore| TypeInfo {
            id,
            name: name.to_string(),
            can_be_way: false,
            can_be_area: true,
            poi,
            ignore,
        };
        TypeConfig::new(vec![
            info(1, "building", false, false),
            info(2, "amenity_school", true, false),
            info(3, "hidden", true, true),
        ])
        .unwrap()
    }

    fn square() -> Vec<RingNode> {
        vec![
            RingNode::new(0.0, 0.0),
            RingNode::new(0.0, 1.0),
            RingNode::new(1.0, 1.0),
            RingNode::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_address_ring_recorded_and_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("areaaddress.dat");
        let types = types();
        let mut filter = LocationProcessorFilter::new(Some(path.clone()));

        let mut area = Area::simple(10, 1, square());
        area.rings[0].features.set(FeatureKind::Location, "Main Street");
        area.rings[0].features.set(FeatureKind::Address, "12");
        area.rings[0].features.set(FeatureKind::Layer, "1");

        filter.before_all(&types).unwrap();
        assert!(filter.process(64, &mut area, &types).unwrap());
        filter.after_all(&types).unwrap();

        let ring = &area.rings[0];
        assert!(!ring.features.has(FeatureKind::Location));
        assert!(!ring.features.has(FeatureKind::Address));
        assert_eq!(ring.features.get(FeatureKind::Layer), Some("1"));

        let records: Vec<AddressRecord> = read_all(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset, 64);
        assert_eq!(records[0].area_id, 10);
        assert_eq!(records[0].location, "Main Street");
        assert_eq!(records[0].address, "12");
        assert_eq!(records[0].nodes.len(), 4);
        assert_eq!(filter.addresses(), 1);
    }

    #[test]
    fn test_poi_master_recorded_per_outer_ring() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("areaaddress.dat");
        let types = types();
        let mut filter = LocationProcessorFilter::new(Some(path.clone()));

        let mut master = Ring::new(RingRole::Master, 2, Vec::new());
        master.features.set(FeatureKind::Name, "North School");
        let mut area = Area {
            id: 20,
            type_id: 2,
            rings: vec![
                master,
                Ring::new(RingRole::Outer, 2, square()),
                Ring::new(RingRole::Outer, 2, square()[..3].to_vec()),
                Ring::new(RingRole::Inner, 2, square()),
            ],
        };

        filter.before_all(&types).unwrap();
        filter.process(0, &mut area, &types).unwrap();
        filter.after_all(&types).unwrap();

        let records: Vec<AddressRecord> = read_all(&path).unwrap();
        let sizes: Vec<_> = records.iter().map(|r| r.nodes.len()).collect();
        assert_eq!(sizes, vec![4, 3]);
        assert!(records.iter().all(|r| r.name == "North School"));
        assert_eq!(filter.pois(), 1);
        assert!(area.rings[0].features.is_empty());
    }

    #[test]
    fn test_incomplete_or_ignored_not_recorded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("areaaddress.dat");
        let types = types();
        let mut filter = LocationProcessorFilter::new(Some(path.clone()));

        // street without house number
        let mut partial = Area::simple(1, 1, square());
        partial.rings[0].features.set(FeatureKind::Location, "Main Street");
        // name on a type that is not a POI
        let mut named = Area::simple(2, 1, square());
        named.rings[0].features.set(FeatureKind::Name, "Block A");
        // complete address on an ignored type
        let mut hidden = Area::simple(3, 3, square());
        hidden.rings[0].features.set(FeatureKind::Location, "Main Street");
        hidden.rings[0].features.set(FeatureKind::Address, "3");

        filter.before_all(&types).unwrap();
        for area in [&mut partial, &mut named, &mut hidden] {
            assert!(filter.process(0, area, &types).unwrap());
            assert!(area.rings[0].features.is_empty());
        }
        filter.after_all(&types).unwrap();

        let records: Vec<AddressRecord> = read_all(&path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_without_side_file() {
        let types = types();
        let mut filter = LocationProcessorFilter::new(None);
        let mut area = Area::simple(1, 2, square());
        area.rings[0].features.set(FeatureKind::Name, "Library");

        filter.before_all(&types).unwrap();
        assert!(filter.process(0, &mut area, &types).unwrap());
        filter.after_all(&types).unwrap();
        assert_eq!(filter.pois(), 1);
        assert!(area.rings[0].features.is_empty());
    }
}
