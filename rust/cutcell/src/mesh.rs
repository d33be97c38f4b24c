// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for cut-mesh entities.
//!
//! The [`Mesh`] is the central owner of all points, sides, facets, elements
//! and volume cells. Entities reference each other only through generational
//! keys, so the facet graph can hold plain keys into the mesh while the mesh
//! keeps ownership. Volume cells are the only entities the cut-cell engine
//! creates; it never deletes them.

use slotmap::SlotMap;

use crate::keys::*;
use crate::shape::ElementShape;

/// Default merge tolerance for points.
pub const DEFAULT_POINT_TOLERANCE: f64 = 1e-12;

/// Data stored for a point.
#[derive(Debug, Clone)]
pub struct PointData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub tolerance: f64,
}

/// Whether a side is a face of a background element or an embedded cutting
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SideKind {
    Element,
    Cut,
}

/// Data stored for a side.
#[derive(Debug, Clone)]
pub struct SideData {
    pub id: i32,
    pub kind: SideKind,
    /// Facets lying on this side, in creation order.
    pub facets: Vec<FacetKey>,
}

/// Data stored for a facet: a planar polygon on a side, possibly with holes.
#[derive(Debug, Clone)]
pub struct FacetData {
    /// Boundary loop. Two points describe a segment facet (2D hosts).
    pub points: Vec<PointKey>,
    /// Nested hole facets lying inside this facet.
    pub holes: Vec<FacetKey>,
    pub side: SideKey,
    /// The facet this one is a hole of.
    pub parent: Option<FacetKey>,
}

/// Data stored for a background element.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub id: i32,
    pub shape: ElementShape,
    pub nodes: Vec<PointKey>,
    /// The element's own geometric sides.
    pub sides: Vec<SideKey>,
    /// Every facet inside the element: pieces of its sides and of cut sides.
    pub facets: FacetSet,
    pub cells: Vec<VolumeCellKey>,
}

/// Data stored for a volume cell.
#[derive(Debug, Clone)]
pub struct VolumeCellData {
    pub element: ElementKey,
    pub facets: FacetSet,
    pub lines: LineMap,
}

/// The arena that owns all cut-mesh entities.
///
/// # Example
///
/// ```
/// use cutcell::Mesh;
///
/// let mut mesh = Mesh::new();
/// mesh.add_point(0.0, 0.0, 0.0);
/// mesh.add_point(1.0, 0.0, 0.0);
///
/// assert_eq!(mesh.point_count(), 2);
/// ```
#[derive(Debug)]
pub struct Mesh {
    pub(crate) points: SlotMap<PointKey, PointData>,
    pub(crate) sides: SlotMap<SideKey, SideData>,
    pub(crate) facets: SlotMap<FacetKey, FacetData>,
    pub(crate) elements: SlotMap<ElementKey, ElementData>,
    pub(crate) volume_cells: SlotMap<VolumeCellKey, VolumeCellData>,
}

impl Mesh {
    /// Creates a new, empty mesh.
    pub fn new() -> Self {
        Self {
            points: SlotMap::with_key(),
            sides: SlotMap::with_key(),
            facets: SlotMap::with_key(),
            elements: SlotMap::with_key(),
            volume_cells: SlotMap::with_key(),
        }
    }

    // --- Point operations ---

    /// Returns the point data for the given key, or `None` if not found.
    pub fn point(&self, key: PointKey) -> Option<&PointData> {
        self.points.get(key)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    // --- Side operations ---

    pub fn side(&self, key: SideKey) -> Option<&SideData> {
        self.sides.get(key)
    }

    pub fn side_count(&self) -> usize {
        self.sides.len()
    }

    // --- Facet operations ---

    pub fn facet(&self, key: FacetKey) -> Option<&FacetData> {
        self.facets.get(key)
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    // --- Element operations ---

    pub fn element(&self, key: ElementKey) -> Option<&ElementData> {
        self.elements.get(key)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Iterates over all element keys in creation order.
    pub fn element_keys(&self) -> impl Iterator<Item = ElementKey> + '_ {
        self.elements.keys()
    }

    // --- Volume cell operations ---

    pub fn volume_cell(&self, key: VolumeCellKey) -> Option<&VolumeCellData> {
        self.volume_cells.get(key)
    }

    pub fn volume_cell_count(&self) -> usize {
        self.volume_cells.len()
    }

    // --- Entity existence checks ---

    /// Returns `true` if the given key references a live entity.
    pub fn contains(&self, key: EntityKey) -> bool {
        match key {
            EntityKey::Point(k) => self.points.contains_key(k),
            EntityKey::Side(k) => self.sides.contains_key(k),
            EntityKey::Facet(k) => self.facets.contains_key(k),
            EntityKey::Element(k) => self.elements.contains_key(k),
            EntityKey::VolumeCell(k) => self.volume_cells.contains_key(k),
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mesh_is_empty() {
        let mesh = Mesh::new();
        assert_eq!(mesh.point_count(), 0);
        assert_eq!(mesh.side_count(), 0);
        assert_eq!(mesh.facet_count(), 0);
        assert_eq!(mesh.element_count(), 0);
        assert_eq!(mesh.volume_cell_count(), 0);
    }

    #[test]
    fn contains_check() {
        let mut mesh = Mesh::default();
        let p = mesh.add_point(0.0, 0.0, 0.0);
        assert!(mesh.contains(EntityKey::Point(p)));

        mesh.points.remove(p);
        assert!(!mesh.contains(p.into()));
    }
}
