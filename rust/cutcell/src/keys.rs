// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage.
//!
//! Every mesh entity gets a type-safe generational key from
//! `slotmap::SlotMap`. Keys are totally ordered by their slot index, so sets
//! and maps keyed on them iterate in creation order, which keeps the facet
//! graph and its cycle search deterministic.

use std::collections::{BTreeMap, BTreeSet};

use slotmap::new_key_type;

use crate::error::{Error, Result};

new_key_type! {
    /// Key for a point (location shared by facets and lines).
    pub struct PointKey;

    /// Key for a side (element face or embedded cutting surface).
    pub struct SideKey;

    /// Key for a facet (polygonal piece of a side inside one element).
    pub struct FacetKey;

    /// Key for a background element.
    pub struct ElementKey;

    /// Key for a volume cell (closed sub-region of a cut element).
    pub struct VolumeCellKey;
}

/// Set of facets ordered by key.
pub type FacetSet = BTreeSet<FacetKey>;

/// Map from a line to the facets bordering it.
pub type LineMap = BTreeMap<Line, FacetSet>;

/// Undirected boundary segment identified by its two endpoint points.
///
/// The endpoints are stored as `(min, max)`, so a line built from `(a, b)`
/// equals the line built from `(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Line {
    begin: PointKey,
    end: PointKey,
}

impl Line {
    /// Builds the canonical line between two distinct points.
    pub fn new(a: PointKey, b: PointKey) -> Result<Self> {
        if a == b {
            return Err(Error::DegenerateLine(a));
        }
        let (begin, end) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { begin, end })
    }

    pub fn begin(&self) -> PointKey {
        self.begin
    }

    pub fn end(&self) -> PointKey {
        self.end
    }

    /// Returns `true` if `point` is one of the endpoints.
    pub fn touches(&self, point: PointKey) -> bool {
        self.begin == point || self.end == point
    }
}

/// A key that can reference any mesh entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Point(PointKey),
    Side(SideKey),
    Facet(FacetKey),
    Element(ElementKey),
    VolumeCell(VolumeCellKey),
}

impl EntityKey {
    /// Returns the entity type of this key.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKey::Point(_) => EntityType::Point,
            EntityKey::Side(_) => EntityType::Side,
            EntityKey::Facet(_) => EntityType::Facet,
            EntityKey::Element(_) => EntityType::Element,
            EntityKey::VolumeCell(_) => EntityType::VolumeCell,
        }
    }
}

/// Discriminant for entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Point = 0,
    Side = 1,
    Facet = 2,
    Element = 3,
    VolumeCell = 4,
}

impl EntityType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Point => "Point",
            EntityType::Side => "Side",
            EntityType::Facet => "Facet",
            EntityType::Element => "Element",
            EntityType::VolumeCell => "VolumeCell",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PointKey> for EntityKey {
    fn from(k: PointKey) -> Self {
        EntityKey::Point(k)
    }
}

impl From<SideKey> for EntityKey {
    fn from(k: SideKey) -> Self {
        EntityKey::Side(k)
    }
}

impl From<FacetKey> for EntityKey {
    fn from(k: FacetKey) -> Self {
        EntityKey::Facet(k)
    }
}

impl From<ElementKey> for EntityKey {
    fn from(k: ElementKey) -> Self {
        EntityKey::Element(k)
    }
}

impl From<VolumeCellKey> for EntityKey {
    fn from(k: VolumeCellKey) -> Self {
        EntityKey::VolumeCell(k)
    }
}
