// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal methods for navigating the cut mesh.
//!
//! Includes line extraction: every boundary segment of a facet is keyed by
//! its two endpoint identities, which is how facets discover their
//! neighbours in the facet graph.

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mesh::{Mesh, SideKind};

impl Mesh {
    /// Inserts every boundary segment of `facet` into `lines`, associated with
    /// `facet`.
    ///
    /// The outer loops of the facet's direct holes belong to the facet's
    /// boundary too and are inserted with the facet as well. Nested holes are
    /// picked up when their own parent hole is processed.
    pub fn facet_lines(&self, facet: FacetKey, lines: &mut LineMap) -> Result<()> {
        let data = self.facets.get(facet).ok_or(Error::FacetNotFound(facet))?;
        insert_loop(&data.points, facet, lines);
        for &h in &data.holes {
            let hole = self.facets.get(h).ok_or(Error::FacetNotFound(h))?;
            insert_loop(&hole.points, facet, lines);
        }
        Ok(())
    }

    /// Runs [`Mesh::facet_lines`] for every facet in `facets`.
    pub fn collect_lines<'a, I>(&self, facets: I) -> Result<LineMap>
    where
        I: IntoIterator<Item = &'a FacetKey>,
    {
        let mut lines = LineMap::new();
        for &f in facets {
            self.facet_lines(f, &mut lines)?;
        }
        Ok(lines)
    }

    /// Returns the boundary point loop of a facet.
    pub fn facet_points(&self, facet: FacetKey) -> Option<&[PointKey]> {
        self.facets.get(facet).map(|f| f.points.as_slice())
    }

    /// Returns `true` if the facet has nested hole facets.
    pub fn has_holes(&self, facet: FacetKey) -> bool {
        self.facets
            .get(facet)
            .is_some_and(|f| !f.holes.is_empty())
    }

    /// Returns the hole facets of a facet.
    pub fn holes(&self, facet: FacetKey) -> Option<&[FacetKey]> {
        self.facets.get(facet).map(|f| f.holes.as_slice())
    }

    /// Returns the side a facet lies on.
    pub fn facet_side(&self, facet: FacetKey) -> Option<SideKey> {
        self.facets.get(facet).map(|f| f.side)
    }

    /// Returns the facets lying on a side.
    pub fn side_facets(&self, side: SideKey) -> Option<&[FacetKey]> {
        self.sides.get(side).map(|s| s.facets.as_slice())
    }

    /// Returns `true` if the side is a face of a background element.
    pub fn is_element_side(&self, side: SideKey) -> bool {
        self.sides
            .get(side)
            .is_some_and(|s| s.kind == SideKind::Element)
    }

    /// Returns the element's own sides.
    pub fn element_sides(&self, element: ElementKey) -> Option<&[SideKey]> {
        self.elements.get(element).map(|e| e.sides.as_slice())
    }

    /// Returns every facet inside the element.
    pub fn element_facets(&self, element: ElementKey) -> Option<&FacetSet> {
        self.elements.get(element).map(|e| &e.facets)
    }

    /// Returns the volume cells created for the element so far.
    pub fn element_cells(&self, element: ElementKey) -> Option<&[VolumeCellKey]> {
        self.elements.get(element).map(|e| e.cells.as_slice())
    }

    /// Returns the topological dimension of the element.
    pub fn element_dim(&self, element: ElementKey) -> Option<u8> {
        self.elements.get(element).map(|e| e.shape.dim())
    }

    /// Returns the user-facing id of the element, or `-1` for a stale key.
    pub fn element_id(&self, element: ElementKey) -> i32 {
        self.elements.get(element).map_or(-1, |e| e.id)
    }

    /// Returns `true` if `facet` lies on one of the element's own sides.
    ///
    /// Hole facets are attributed to their outermost parent.
    pub fn facet_on_element_side(&self, facet: FacetKey, element: ElementKey) -> bool {
        let Some(element) = self.elements.get(element) else {
            return false;
        };
        let mut current = facet;
        while let Some(parent) = self.facets.get(current).and_then(|f| f.parent) {
            current = parent;
        }
        self.facets
            .get(current)
            .is_some_and(|f| element.sides.contains(&f.side))
    }

    /// Returns the facets of a volume cell.
    pub fn volume_cell_facets(&self, cell: VolumeCellKey) -> Option<&FacetSet> {
        self.volume_cells.get(cell).map(|c| &c.facets)
    }
}

/// Inserts the segments of a point loop. Two points form a single segment.
fn insert_loop(points: &[PointKey], facet: FacetKey, lines: &mut LineMap) {
    let n = points.len();
    if n < 2 {
        return;
    }
    let pairs = if n == 2 { 1 } else { n };
    for i in 0..pairs {
        if let Ok(line) = Line::new(points[i], points[(i + 1) % n]) {
            lines.entry(line).or_default().insert(facet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ElementShape;

    #[test]
    fn shared_edge_is_found_once() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let c = mesh.add_point(0.0, 1.0, 0.0);
        let d = mesh.add_point(1.0, 1.0, 0.0);
        let f1 = mesh.add_facet(side, &[a, b, c]).unwrap();
        // Opposite traversal direction of the shared edge b-c.
        let f2 = mesh.add_facet(side, &[c, b, d]).unwrap();

        let lines = mesh.collect_lines(&[f1, f2]).unwrap();
        assert_eq!(lines.len(), 5);
        let shared = &lines[&Line::new(b, c).unwrap()];
        assert_eq!(shared.len(), 2);
        assert!(shared.contains(&f1) && shared.contains(&f2));
    }

    #[test]
    fn segment_facet_has_one_line() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let f = mesh.add_facet(side, &[a, b]).unwrap();

        let mut lines = LineMap::new();
        mesh.facet_lines(f, &mut lines).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn hole_lines_belong_to_parent() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Element);
        let outer: Vec<_> = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]
            .iter()
            .map(|c| mesh.add_point(c[0], c[1], 0.0))
            .collect();
        let inner: Vec<_> = [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0]]
            .iter()
            .map(|c| mesh.add_point(c[0], c[1], 0.0))
            .collect();
        let parent = mesh.add_facet(side, &outer).unwrap();
        let hole = mesh.add_facet(side, &inner).unwrap();
        mesh.add_hole(parent, hole).unwrap();

        let mut lines = LineMap::new();
        mesh.facet_lines(parent, &mut lines).unwrap();
        assert_eq!(lines.len(), 8);

        mesh.facet_lines(hole, &mut lines).unwrap();
        let hole_line = Line::new(inner[0], inner[1]).unwrap();
        assert_eq!(lines[&hole_line].len(), 2);
    }

    #[test]
    fn facet_on_element_side_follows_parents() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Element);
        let cut = mesh.add_side(2, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let c = mesh.add_point(0.0, 1.0, 0.0);
        let d = mesh.add_point(0.2, 0.2, 0.0);
        let e = mesh.add_point(0.4, 0.2, 0.0);
        let g = mesh.add_point(0.2, 0.4, 0.0);
        let top = mesh.add_point(0.0, 0.0, 1.0);
        let face = mesh.add_facet(side, &[a, b, c]).unwrap();
        let hole = mesh.add_facet(side, &[d, e, g]).unwrap();
        mesh.add_hole(face, hole).unwrap();
        let cut_facet = mesh.add_facet(cut, &[a, b, top]).unwrap();
        let element = mesh
            .add_element(1, ElementShape::Tet4, &[a, b, c, top], &[side])
            .unwrap();

        assert!(mesh.facet_on_element_side(face, element));
        assert!(mesh.facet_on_element_side(hole, element));
        assert!(!mesh.facet_on_element_side(cut_facet, element));
        assert!(mesh.element_facets(element).unwrap().contains(&hole));
        assert_eq!(mesh.element_dim(element), Some(3));
    }
}
