// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction methods for mesh entities.
//!
//! Every entity is created through the mesh, which checks referential
//! integrity (all referenced entities must exist) and keeps the side, element
//! and hole back-references in sync.

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mesh::*;
use crate::shape::ElementShape;

impl Mesh {
    /// Adds a point with the default merge tolerance.
    pub fn add_point(&mut self, x: f64, y: f64, z: f64) -> PointKey {
        self.add_point_with_tolerance(x, y, z, DEFAULT_POINT_TOLERANCE)
    }

    /// Adds a point with an explicit merge tolerance.
    pub fn add_point_with_tolerance(&mut self, x: f64, y: f64, z: f64, tolerance: f64) -> PointKey {
        self.points.insert(PointData { x, y, z, tolerance })
    }

    /// Adds an empty side.
    pub fn add_side(&mut self, id: i32, kind: SideKind) -> SideKey {
        self.sides.insert(SideData {
            id,
            kind,
            facets: Vec::new(),
        })
    }

    /// Creates a facet on `side` from an ordered point loop.
    ///
    /// Two points describe a segment facet. Consecutive points (including the
    /// closing pair of a loop) must differ.
    pub fn add_facet(&mut self, side: SideKey, points: &[PointKey]) -> Result<FacetKey> {
        if !self.sides.contains_key(side) {
            return Err(Error::SideNotFound(side));
        }
        if points.len() < 2 {
            return Err(Error::degenerate_facet(None, "fewer than 2 points"));
        }
        for &p in points {
            if !self.points.contains_key(p) {
                return Err(Error::PointNotFound(p));
            }
        }

        let n = points.len();
        let pairs = if n == 2 { 1 } else { n };
        for i in 0..pairs {
            if points[i] == points[(i + 1) % n] {
                return Err(Error::degenerate_facet(None, "repeated consecutive point"));
            }
        }

        let key = self.facets.insert(FacetData {
            points: points.to_vec(),
            holes: Vec::new(),
            side,
            parent: None,
        });
        self.sides[side].facets.push(key);
        Ok(key)
    }

    /// Registers `hole` as a hole nested inside `parent`.
    ///
    /// Both facets must lie on the same side and the hole must not already
    /// belong to another facet.
    pub fn add_hole(&mut self, parent: FacetKey, hole: FacetKey) -> Result<()> {
        let parent_side = self
            .facets
            .get(parent)
            .ok_or(Error::FacetNotFound(parent))?
            .side;
        let hole_data = self.facets.get(hole).ok_or(Error::FacetNotFound(hole))?;

        if parent == hole {
            return Err(Error::InvalidHole {
                parent,
                hole,
                reason: "a facet cannot be its own hole",
            });
        }
        if hole_data.side != parent_side {
            return Err(Error::InvalidHole {
                parent,
                hole,
                reason: "hole lies on a different side",
            });
        }
        if hole_data.parent.is_some() {
            return Err(Error::InvalidHole {
                parent,
                hole,
                reason: "hole already has a parent",
            });
        }

        self.facets[hole].parent = Some(parent);
        self.facets[parent].holes.push(hole);
        Ok(())
    }

    /// Creates an element from its corner nodes and its own sides.
    ///
    /// The facets currently on those sides (and their holes) become the
    /// element's initial facet set.
    pub fn add_element(
        &mut self,
        id: i32,
        shape: ElementShape,
        nodes: &[PointKey],
        sides: &[SideKey],
    ) -> Result<ElementKey> {
        if nodes.len() != shape.node_count() {
            return Err(Error::InvalidElement {
                id,
                reason: format!(
                    "{} expects {} nodes, got {}",
                    shape,
                    shape.node_count(),
                    nodes.len()
                ),
            });
        }
        for &p in nodes {
            if !self.points.contains_key(p) {
                return Err(Error::PointNotFound(p));
            }
        }

        let mut facets = FacetSet::new();
        for &s in sides {
            let side = self.sides.get(s).ok_or(Error::SideNotFound(s))?;
            if side.kind != SideKind::Element {
                return Err(Error::InvalidElement {
                    id,
                    reason: format!("side {} is a cut side", side.id),
                });
            }
            for &f in &side.facets {
                facets.insert(f);
                facets.extend(self.facets[f].holes.iter().copied());
            }
        }

        Ok(self.elements.insert(ElementData {
            id,
            shape,
            nodes: nodes.to_vec(),
            sides: sides.to_vec(),
            facets,
            cells: Vec::new(),
        }))
    }

    /// Adds a facet to the set of facets inside an element.
    pub fn add_element_facet(&mut self, element: ElementKey, facet: FacetKey) -> Result<()> {
        if !self.facets.contains_key(facet) {
            return Err(Error::FacetNotFound(facet));
        }
        let data = self
            .elements
            .get_mut(element)
            .ok_or(Error::ElementNotFound(element))?;
        data.facets.insert(facet);
        Ok(())
    }

    /// Removes a facet and every back-reference to it.
    ///
    /// Holes of the removed facet are detached, not removed.
    pub fn remove_facet(&mut self, facet: FacetKey) -> Result<FacetData> {
        let data = self.facets.remove(facet).ok_or(Error::FacetNotFound(facet))?;

        if let Some(side) = self.sides.get_mut(data.side) {
            side.facets.retain(|&f| f != facet);
        }
        if let Some(parent) = data.parent.and_then(|p| self.facets.get_mut(p)) {
            parent.holes.retain(|&h| h != facet);
        }
        for &h in &data.holes {
            if let Some(hole) = self.facets.get_mut(h) {
                hole.parent = None;
            }
        }
        for element in self.elements.values_mut() {
            element.facets.remove(&facet);
        }
        Ok(data)
    }

    /// Registers a new volume cell for `element`.
    pub fn new_volume_cell(
        &mut self,
        facets: FacetSet,
        lines: LineMap,
        element: ElementKey,
    ) -> Result<VolumeCellKey> {
        if !self.elements.contains_key(element) {
            return Err(Error::ElementNotFound(element));
        }
        if facets.is_empty() {
            return Err(Error::degenerate_facet(None, "volume cell without facets"));
        }
        for &f in &facets {
            if !self.facets.contains_key(f) {
                return Err(Error::FacetNotFound(f));
            }
        }

        let key = self.volume_cells.insert(VolumeCellData {
            element,
            facets,
            lines,
        });
        self.elements[element].cells.push(key);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(mesh: &mut Mesh) -> (SideKey, [PointKey; 3]) {
        let side = mesh.add_side(1, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let c = mesh.add_point(0.0, 1.0, 0.0);
        (side, [a, b, c])
    }

    #[test]
    fn add_facet_registers_on_side() {
        let mut mesh = Mesh::new();
        let (side, pts) = triangle(&mut mesh);
        let f = mesh.add_facet(side, &pts).unwrap();

        assert_eq!(mesh.side(side).unwrap().facets, vec![f]);
        assert_eq!(mesh.facet(f).unwrap().side, side);
        assert_eq!(mesh.facet_count(), 1);
    }

    #[test]
    fn add_facet_rejects_repeated_points() {
        let mut mesh = Mesh::new();
        let (side, [a, b, _]) = triangle(&mut mesh);
        assert!(mesh.add_facet(side, &[a, b, b]).is_err());
        assert!(mesh.add_facet(side, &[a, b, a]).is_err());
        assert!(mesh.add_facet(side, &[a]).is_err());
    }

    #[test]
    fn segment_facet_is_allowed() {
        let mut mesh = Mesh::new();
        let (side, [a, b, _]) = triangle(&mut mesh);
        assert!(mesh.add_facet(side, &[a, b]).is_ok());
    }

    #[test]
    fn add_hole_links_both_ways() {
        let mut mesh = Mesh::new();
        let (side, pts) = triangle(&mut mesh);
        let outer = mesh.add_facet(side, &pts).unwrap();
        let p = mesh.add_point(0.1, 0.1, 0.0);
        let q = mesh.add_point(0.3, 0.1, 0.0);
        let r = mesh.add_point(0.1, 0.3, 0.0);
        let hole = mesh.add_facet(side, &[p, q, r]).unwrap();

        mesh.add_hole(outer, hole).unwrap();
        assert_eq!(mesh.facet(outer).unwrap().holes, vec![hole]);
        assert_eq!(mesh.facet(hole).unwrap().parent, Some(outer));

        // A second parent is rejected.
        assert!(matches!(
            mesh.add_hole(outer, hole),
            Err(Error::InvalidHole { .. })
        ));
    }

    #[test]
    fn add_hole_requires_same_side() {
        let mut mesh = Mesh::new();
        let (side, pts) = triangle(&mut mesh);
        let other = mesh.add_side(2, SideKind::Cut);
        let outer = mesh.add_facet(side, &pts).unwrap();
        let hole = mesh.add_facet(other, &pts).unwrap();
        assert!(mesh.add_hole(outer, hole).is_err());
    }

    #[test]
    fn add_element_checks_node_count() {
        let mut mesh = Mesh::new();
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        assert!(matches!(
            mesh.add_element(7, ElementShape::Hex8, &[a, b], &[]),
            Err(Error::InvalidElement { id: 7, .. })
        ));
        assert!(mesh.add_element(7, ElementShape::Line2, &[a, b], &[]).is_ok());
    }

    #[test]
    fn remove_facet_clears_back_references() {
        let mut mesh = Mesh::new();
        let (_, [a, b, c]) = triangle(&mut mesh);
        let side = mesh.add_side(3, SideKind::Element);
        let f = mesh.add_facet(side, &[a, b, c]).unwrap();
        let d = mesh.add_point(0.0, 0.0, 1.0);
        let e = mesh
            .add_element(1, ElementShape::Tet4, &[a, b, c, d], &[side])
            .unwrap();
        assert!(mesh.element(e).unwrap().facets.contains(&f));

        mesh.remove_facet(f).unwrap();
        assert!(mesh.side(side).unwrap().facets.is_empty());
        assert!(mesh.element(e).unwrap().facets.is_empty());
        assert!(mesh.remove_facet(f).is_err());
    }

    #[test]
    fn new_volume_cell_registers_with_element() {
        let mut mesh = Mesh::new();
        let (_, [a, b, c]) = triangle(&mut mesh);
        let side = mesh.add_side(3, SideKind::Element);
        let f = mesh.add_facet(side, &[a, b, c]).unwrap();
        let d = mesh.add_point(0.0, 0.0, 1.0);
        let e = mesh
            .add_element(1, ElementShape::Tet4, &[a, b, c, d], &[side])
            .unwrap();

        let cell = mesh
            .new_volume_cell([f].into_iter().collect(), LineMap::new(), e)
            .unwrap();
        assert_eq!(mesh.element(e).unwrap().cells, vec![cell]);
        assert_eq!(mesh.volume_cell(cell).unwrap().element, e);
        assert!(mesh.new_volume_cell(FacetSet::new(), LineMap::new(), e).is_err());
    }
}
