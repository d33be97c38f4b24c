// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builders for background elements and planar cuts through convex elements.
//!
//! Points created here are merged through a [`PointIndex`], so a location
//! reached from two facets yields a single point and the facets share lines
//! by identity.

use rustc_hash::FxHashMap;
use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mesh::{Mesh, SideKind};
use crate::shape::ElementShape;

/// Corners of the unit cube in hex8 node order.
pub const UNIT_CUBE: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Hex8 faces, wound outward.
const HEX8_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// Tet4 faces, wound outward for a positively oriented tetrahedron.
const TET4_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];

/// Grid hash for tolerance-based point lookup.
///
/// Lookups scan the 3x3x3 block of cells around the query, so the tolerance
/// should not exceed `cell_size`.
#[derive(Debug)]
pub struct PointIndex {
    cell_size: f64,
    grid: FxHashMap<(i64, i64, i64), Vec<PointKey>>,
}

impl PointIndex {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            grid: FxHashMap::default(),
        }
    }

    /// Indexes every point of the mesh.
    pub fn from_mesh(mesh: &Mesh, cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for (key, p) in mesh.points.iter() {
            index.insert(key, p.x, p.y, p.z);
        }
        index
    }

    pub fn insert(&mut self, key: PointKey, x: f64, y: f64, z: f64) {
        let cell = self.cell_coords(x, y, z);
        self.grid.entry(cell).or_default().push(key);
    }

    /// Finds a point within `tolerance` of `(x, y, z)`.
    pub fn find_near(&self, mesh: &Mesh, x: f64, y: f64, z: f64, tolerance: f64) -> Option<PointKey> {
        let (cx, cy, cz) = self.cell_coords(x, y, z);
        let tol_sq = tolerance * tolerance;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(keys) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &key in keys {
                        if let Some(p) = mesh.point(key) {
                            let dist_sq = (p.x - x).powi(2) + (p.y - y).powi(2) + (p.z - z).powi(2);
                            if dist_sq <= tol_sq {
                                return Some(key);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    fn cell_coords(&self, x: f64, y: f64, z: f64) -> (i64, i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
            (z / self.cell_size).floor() as i64,
        )
    }
}

impl Mesh {
    /// Returns a point within `tolerance` of `(x, y, z)`, creating it if
    /// there is none.
    pub fn find_or_add_point(
        &mut self,
        index: &mut PointIndex,
        x: f64,
        y: f64,
        z: f64,
        tolerance: f64,
    ) -> PointKey {
        if let Some(existing) = index.find_near(self, x, y, z, tolerance) {
            return existing;
        }
        let key = self.add_point_with_tolerance(x, y, z, tolerance);
        index.insert(key, x, y, z);
        key
    }
}

fn add_nodes(mesh: &mut Mesh, coords: &[[f64; 3]]) -> Vec<PointKey> {
    coords
        .iter()
        .map(|c| mesh.add_point(c[0], c[1], c[2]))
        .collect()
}

/// Adds a hexahedron with one element side per face.
///
/// Side `k` (in [`HEX8_FACES`] order) gets id `10 * id + k`.
pub fn add_hex8(mesh: &mut Mesh, id: i32, coords: &[[f64; 3]; 8]) -> Result<ElementKey> {
    let nodes = add_nodes(mesh, coords);
    let mut sides = Vec::with_capacity(HEX8_FACES.len());
    for (k, face) in HEX8_FACES.iter().enumerate() {
        let side = mesh.add_side(10 * id + k as i32, SideKind::Element);
        let points: Vec<PointKey> = face.iter().map(|&i| nodes[i]).collect();
        mesh.add_facet(side, &points)?;
        sides.push(side);
    }
    mesh.add_element(id, ElementShape::Hex8, &nodes, &sides)
}

/// Adds a tetrahedron with one element side per face.
pub fn add_tet4(mesh: &mut Mesh, id: i32, coords: &[[f64; 3]; 4]) -> Result<ElementKey> {
    let nodes = add_nodes(mesh, coords);
    let mut sides = Vec::with_capacity(TET4_FACES.len());
    for (k, face) in TET4_FACES.iter().enumerate() {
        let side = mesh.add_side(10 * id + k as i32, SideKind::Element);
        let points: Vec<PointKey> = face.iter().map(|&i| nodes[i]).collect();
        mesh.add_facet(side, &points)?;
        sides.push(side);
    }
    mesh.add_element(id, ElementShape::Tet4, &nodes, &sides)
}

/// Adds a quadrilateral whose single side holds one polygon facet.
pub fn add_quad4(mesh: &mut Mesh, id: i32, coords: &[[f64; 3]; 4]) -> Result<ElementKey> {
    let nodes = add_nodes(mesh, coords);
    let side = mesh.add_side(10 * id, SideKind::Element);
    mesh.add_facet(side, &nodes)?;
    mesh.add_element(id, ElementShape::Quad4, &nodes, &[side])
}

/// Adds a line element whose single side holds one segment facet.
pub fn add_line2(mesh: &mut Mesh, id: i32, coords: &[[f64; 3]; 2]) -> Result<ElementKey> {
    let nodes = add_nodes(mesh, coords);
    let side = mesh.add_side(10 * id, SideKind::Element);
    mesh.add_facet(side, &nodes)?;
    mesh.add_element(id, ElementShape::Line2, &nodes, &[side])
}

/// Plane `normal . x = offset`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CutPlane {
    pub normal: [f64; 3],
    pub offset: f64,
}

impl CutPlane {
    /// Creates a plane; the normal is normalized, `offset` scaled with it.
    pub fn new(normal: [f64; 3], offset: f64) -> Self {
        let n = Vector3::from(normal);
        let len = n.norm();
        if len == 0.0 {
            return Self { normal, offset };
        }
        Self {
            normal: [n.x / len, n.y / len, n.z / len],
            offset: offset / len,
        }
    }

    /// Signed distance of `p` from the plane.
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        Vector3::from(self.normal).dot(&p.coords) - self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Front,
    Back,
    On,
}

fn classify(d: f64, tolerance: f64) -> Position {
    if d > tolerance {
        Position::Front
    } else if d < -tolerance {
        Position::Back
    } else {
        Position::On
    }
}

/// Cuts a convex 3D element with planes.
///
/// Each plane that crosses the element interior becomes a cut side holding
/// the plane's section polygon. Afterwards every facet of the element, cut
/// polygons included, is split by every plane it straddles. Returns the cut
/// sides, ids starting at `first_side_id`.
pub fn cut_with_planes(
    mesh: &mut Mesh,
    element: ElementKey,
    planes: &[CutPlane],
    first_side_id: i32,
    tolerance: f64,
) -> Result<Vec<SideKey>> {
    let data = mesh.element(element).ok_or(Error::ElementNotFound(element))?;
    if data.shape.dim() != 3 {
        return Err(Error::UnsupportedDimension(data.shape.dim()));
    }
    let element_id = data.id;
    let mut index = PointIndex::from_mesh(mesh, tolerance.max(1e-12));

    let face_facets: Vec<FacetKey> = data
        .facets
        .iter()
        .copied()
        .filter(|&f| mesh.facet_on_element_side(f, element))
        .collect();
    let edges = mesh.collect_lines(&face_facets)?;

    let mut cuts: Vec<(SideKey, CutPlane)> = Vec::new();
    for (i, plane) in planes.iter().enumerate() {
        for &f in &face_facets {
            let points = mesh.facet_points(f).ok_or(Error::FacetNotFound(f))?;
            let coplanar = points.iter().all(|&p| {
                mesh.point_coords(p)
                    .is_some_and(|c| plane.distance(&c).abs() <= tolerance)
            });
            if coplanar {
                let side = mesh.facet_side(f).ok_or(Error::FacetNotFound(f))?;
                return Err(Error::CoplanarCut(side));
            }
        }

        let polygon = section_polygon(mesh, &mut index, edges.keys(), plane, tolerance)?;
        if polygon.len() < 3 {
            tracing::debug!(element = element_id, plane = i, "plane misses element");
            continue;
        }
        let side = mesh.add_side(first_side_id + i as i32, SideKind::Cut);
        let facet = mesh.add_facet(side, &polygon)?;
        mesh.add_element_facet(element, facet)?;
        cuts.push((side, *plane));
    }

    for &(cut_side, plane) in &cuts {
        let current: Vec<FacetKey> = mesh
            .element_facets(element)
            .ok_or(Error::ElementNotFound(element))?
            .iter()
            .copied()
            .collect();
        for f in current {
            if mesh.facet_side(f) == Some(cut_side) {
                continue;
            }
            split_facet(mesh, &mut index, element, f, &plane, tolerance)?;
        }
    }

    tracing::debug!(
        element = element_id,
        cuts = cuts.len(),
        facets = mesh.element_facets(element).map_or(0, |f| f.len()),
        "cut element with planes"
    );
    Ok(cuts.into_iter().map(|(side, _)| side).collect())
}

/// Intersection point of segment `a`-`b` with the plane.
///
/// The segment is always parametrized from its smaller point key, so every
/// facet sharing the segment computes the same coordinates.
fn edge_intersection(
    mesh: &mut Mesh,
    index: &mut PointIndex,
    a: PointKey,
    b: PointKey,
    plane: &CutPlane,
    tolerance: f64,
) -> Result<PointKey> {
    let (a, b) = if a < b { (a, b) } else { (b, a) };
    let pa = mesh.point_coords(a).ok_or(Error::PointNotFound(a))?;
    let pb = mesh.point_coords(b).ok_or(Error::PointNotFound(b))?;
    let (da, db) = (plane.distance(&pa), plane.distance(&pb));
    let t = da / (da - db);
    let p = pa + (pb - pa) * t;
    Ok(mesh.find_or_add_point(index, p.x, p.y, p.z, tolerance))
}

/// Section of the element edges with a plane, ordered by angle around its
/// centroid.
fn section_polygon<'a>(
    mesh: &mut Mesh,
    index: &mut PointIndex,
    edges: impl Iterator<Item = &'a Line>,
    plane: &CutPlane,
    tolerance: f64,
) -> Result<Vec<PointKey>> {
    let mut points: Vec<PointKey> = Vec::new();
    for line in edges {
        let (a, b) = (line.begin(), line.end());
        let pa = mesh.point_coords(a).ok_or(Error::PointNotFound(a))?;
        let pb = mesh.point_coords(b).ok_or(Error::PointNotFound(b))?;
        let (ca, cb) = (
            classify(plane.distance(&pa), tolerance),
            classify(plane.distance(&pb), tolerance),
        );
        let hit = match (ca, cb) {
            (Position::On, _) => Some(a),
            (_, Position::On) => Some(b),
            (Position::Front, Position::Back) | (Position::Back, Position::Front) => {
                Some(edge_intersection(mesh, index, a, b, plane, tolerance)?)
            }
            _ => None,
        };
        if let Some(p) = hit {
            if !points.contains(&p) {
                points.push(p);
            }
        }
    }
    if points.len() < 3 {
        return Ok(points);
    }

    let coords: Vec<Point3<f64>> = points
        .iter()
        .map(|&p| mesh.point_coords(p).ok_or(Error::PointNotFound(p)))
        .collect::<Result<_>>()?;
    let centroid = coords
        .iter()
        .fold(Vector3::zeros(), |acc, c| acc + c.coords)
        / coords.len() as f64;
    let normal = Vector3::from(plane.normal);
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&helper).normalize();
    let v = normal.cross(&u);

    let mut ordered: Vec<(f64, PointKey)> = coords
        .iter()
        .zip(&points)
        .map(|(c, &p)| {
            let d = c.coords - centroid;
            (d.dot(&v).atan2(d.dot(&u)), p)
        })
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(ordered.into_iter().map(|(_, p)| p).collect())
}

/// Replaces `facet` by its two halves if the plane crosses it.
fn split_facet(
    mesh: &mut Mesh,
    index: &mut PointIndex,
    element: ElementKey,
    facet: FacetKey,
    plane: &CutPlane,
    tolerance: f64,
) -> Result<()> {
    let points = mesh
        .facet_points(facet)
        .ok_or(Error::FacetNotFound(facet))?
        .to_vec();
    if points.len() < 3 {
        return Ok(());
    }
    let positions: Vec<Position> = points
        .iter()
        .map(|&p| {
            mesh.point_coords(p)
                .map(|c| classify(plane.distance(&c), tolerance))
                .ok_or(Error::PointNotFound(p))
        })
        .collect::<Result<_>>()?;
    let straddles = positions.contains(&Position::Front) && positions.contains(&Position::Back);
    if !straddles {
        return Ok(());
    }
    if mesh.has_holes(facet) {
        return Err(Error::degenerate_facet(Some(facet), "cannot split a facet with holes"));
    }

    let mut front = Vec::new();
    let mut back = Vec::new();
    let n = points.len();
    for i in 0..n {
        let j = (i + 1) % n;
        match positions[i] {
            Position::Front => front.push(points[i]),
            Position::Back => back.push(points[i]),
            Position::On => {
                front.push(points[i]);
                back.push(points[i]);
            }
        }
        let crosses = matches!(
            (positions[i], positions[j]),
            (Position::Front, Position::Back) | (Position::Back, Position::Front)
        );
        if crosses {
            let p = edge_intersection(mesh, index, points[i], points[j], plane, tolerance)?;
            front.push(p);
            back.push(p);
        }
    }

    let side = mesh.facet_side(facet).ok_or(Error::FacetNotFound(facet))?;
    mesh.remove_facet(facet)?;
    for half in [front, back] {
        let piece = mesh.add_facet(side, &half)?;
        mesh.add_element_facet(element, piece)?;
    }
    Ok(())
}
