// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries on facets and volume cells.
//!
//! The cut-cell graph itself is purely topological. Geometry is needed in two
//! places: deciding which cycle encloses a floating shell, and reporting cell
//! volumes. Facets are assumed planar.

use std::collections::{BTreeMap, VecDeque};

use nalgebra::{Point3, Vector3};

use crate::keys::*;
use crate::mesh::Mesh;

/// Ray direction used for containment tests, perturbed off the axes.
const RAY_DIRECTION: [f64; 3] = [1.0, 1e-7, 1e-8];

impl Mesh {
    /// Returns the position of a point.
    pub fn point_coords(&self, key: PointKey) -> Option<Point3<f64>> {
        self.points.get(key).map(|p| Point3::new(p.x, p.y, p.z))
    }

    fn loop_coords(&self, points: &[PointKey]) -> Option<Vec<Point3<f64>>> {
        points.iter().map(|&p| self.point_coords(p)).collect()
    }

    /// Computes the unit normal of a facet's outer loop with Newell's method.
    ///
    /// Returns `None` for segment facets and degenerate polygons.
    pub fn facet_normal(&self, key: FacetKey) -> Option<Vector3<f64>> {
        let facet = self.facets.get(key)?;
        if facet.points.len() < 3 {
            return None;
        }
        let normal = newell(&self.loop_coords(&facet.points)?);
        let len = normal.norm();
        if len < 1e-15 {
            return None;
        }
        Some(normal / len)
    }

    /// Computes the area of a facet with its holes subtracted.
    pub fn facet_area(&self, key: FacetKey) -> Option<f64> {
        let facet = self.facets.get(key)?;
        let mut total = newell(&self.loop_coords(&facet.points)?).norm() / 2.0;
        for &h in &facet.holes {
            let hole = self.facets.get(h)?;
            total -= newell(&self.loop_coords(&hole.points)?).norm() / 2.0;
        }
        Some(total.abs())
    }

    /// Average of the outer loop points.
    pub fn facet_centroid(&self, key: FacetKey) -> Option<Point3<f64>> {
        let facet = self.facets.get(key)?;
        if facet.points.is_empty() {
            return None;
        }
        let mut sum = Vector3::zeros();
        for &p in &facet.points {
            sum += self.point_coords(p)?.coords;
        }
        Some(Point3::from(sum / facet.points.len() as f64))
    }

    /// Triangulates a facet, holes respected.
    ///
    /// Uses ear clipping after projecting onto the facet's dominant plane.
    pub fn triangulate_facet(&self, key: FacetKey) -> Option<Vec<[PointKey; 3]>> {
        let facet = self.facets.get(key)?;
        let normal = self.facet_normal(key)?;

        let abs_n = normal.abs();
        let (ax_u, ax_v) = if abs_n.z >= abs_n.x && abs_n.z >= abs_n.y {
            (0, 1)
        } else if abs_n.y >= abs_n.x {
            (0, 2)
        } else {
            (1, 2)
        };

        let mut coords_2d: Vec<f64> = Vec::new();
        let mut all_points: Vec<PointKey> = Vec::new();
        let mut push_loop = |points: &[PointKey]| -> Option<()> {
            for &p in points {
                let c = self.point_coords(p)?;
                coords_2d.push(c[ax_u]);
                coords_2d.push(c[ax_v]);
                all_points.push(p);
            }
            Some(())
        };

        push_loop(&facet.points)?;
        let mut hole_indices = Vec::with_capacity(facet.holes.len());
        let mut offset = facet.points.len();
        for &h in &facet.holes {
            let hole = self.facets.get(h)?;
            hole_indices.push(offset);
            offset += hole.points.len();
            push_loop(&hole.points)?;
        }

        let indices = earcutr::earcut(&coords_2d, &hole_indices, 2).ok()?;
        Some(
            indices
                .chunks_exact(3)
                .map(|t| [all_points[t[0]], all_points[t[1]], all_points[t[2]]])
                .collect(),
        )
    }

    /// Boundary segments of a facet, hole loops wound against the outer loop.
    fn oriented_segments(&self, key: FacetKey) -> Option<Vec<(PointKey, PointKey)>> {
        let facet = self.facets.get(key)?;
        if facet.points.len() < 3 {
            return Some(Vec::new());
        }
        let outer_normal = newell(&self.loop_coords(&facet.points)?);
        let mut segments = loop_segments(&facet.points);
        for &h in &facet.holes {
            let hole = self.facets.get(h)?;
            let mut points = hole.points.clone();
            if newell(&self.loop_coords(&points)?).dot(&outer_normal) > 0.0 {
                points.reverse();
            }
            segments.extend(loop_segments(&points));
        }
        Some(segments)
    }

    /// Volume enclosed by a set of facets.
    ///
    /// Facets are oriented consistently by a breadth-first walk over shared
    /// lines; every connected shell contributes its enclosed volume. The
    /// largest shell is the outer boundary and the others are cavities.
    pub fn facets_volume(&self, facets: &FacetSet) -> Option<f64> {
        let mut by_facet: BTreeMap<FacetKey, Vec<(Line, bool)>> = BTreeMap::new();
        let mut by_line: BTreeMap<Line, Vec<(FacetKey, bool)>> = BTreeMap::new();
        for &f in facets {
            for (a, b) in self.oriented_segments(f)? {
                let Ok(line) = Line::new(a, b) else {
                    continue;
                };
                let forward = line.begin() == a;
                by_facet.entry(f).or_default().push((line, forward));
                by_line.entry(line).or_default().push((f, forward));
            }
        }

        let mut sign: BTreeMap<FacetKey, f64> = BTreeMap::new();
        let mut shells = Vec::new();
        for &start in by_facet.keys() {
            if sign.contains_key(&start) {
                continue;
            }
            sign.insert(start, 1.0);
            let mut queue = VecDeque::from([start]);
            let mut volume = 0.0_f64;

            while let Some(f) = queue.pop_front() {
                let s = *sign.get(&f)?;
                volume += s * self.facet_flux(f)?;
                for &(line, forward) in by_facet.get(&f).into_iter().flatten() {
                    let dir_f = if forward { 1.0 } else { -1.0 };
                    for &(g, g_forward) in by_line.get(&line).into_iter().flatten() {
                        if sign.contains_key(&g) {
                            continue;
                        }
                        let dir_g = if g_forward { 1.0 } else { -1.0 };
                        // Neighbours traverse a shared line in opposite directions.
                        sign.insert(g, -s * dir_f * dir_g);
                        queue.push_back(g);
                    }
                }
            }
            shells.push(volume.abs());
        }

        shells.sort_by(|a, b| b.total_cmp(a));
        let Some((outer, cavities)) = shells.split_first() else {
            return Some(0.0);
        };
        Some(outer - cavities.iter().sum::<f64>())
    }

    /// Signed contribution `(n . p0) * A / 3` of a facet to the enclosed
    /// volume, for the facet's own winding.
    fn facet_flux(&self, key: FacetKey) -> Option<f64> {
        let Some(normal) = self.facet_normal(key) else {
            return Some(0.0);
        };
        let facet = self.facets.get(key)?;
        let p0 = self.point_coords(*facet.points.first()?)?;
        Some(normal.dot(&p0.coords) * self.facet_area(key)? / 3.0)
    }

    /// Volume of a volume cell.
    pub fn volume_cell_volume(&self, cell: VolumeCellKey) -> Option<f64> {
        self.facets_volume(&self.volume_cells.get(cell)?.facets)
    }

    /// Tests whether `point` lies inside the region bounded by `facets`.
    ///
    /// Casts a ray in a slightly perturbed direction and counts crossings of
    /// the facet triangulations: odd is inside.
    pub fn facets_contain_point(&self, facets: &FacetSet, point: &Point3<f64>) -> Option<bool> {
        let dir = Vector3::from(RAY_DIRECTION);
        let mut crossings = 0;
        for &f in facets {
            if self.facets.get(f)?.points.len() < 3 {
                continue;
            }
            for [a, b, c] in self.triangulate_facet(f).unwrap_or_default() {
                let (p0, p1, p2) = (
                    self.point_coords(a)?,
                    self.point_coords(b)?,
                    self.point_coords(c)?,
                );
                if ray_intersects_triangle(point, &dir, &p0, &p1, &p2) {
                    crossings += 1;
                }
            }
        }
        Some(crossings % 2 == 1)
    }

    /// Tests whether `point` lies inside a volume cell.
    pub fn cell_contains_point(&self, cell: VolumeCellKey, point: &Point3<f64>) -> Option<bool> {
        self.facets_contain_point(&self.volume_cells.get(cell)?.facets, point)
    }
}

/// Newell vector of a closed loop: direction is the normal, length twice the
/// area.
fn newell(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    if n < 3 {
        return normal;
    }
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

fn loop_segments(points: &[PointKey]) -> Vec<(PointKey, PointKey)> {
    let n = points.len();
    (0..n).map(|i| (points[i], points[(i + 1) % n])).collect()
}

/// Möller–Trumbore ray-triangle intersection test.
fn ray_intersects_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> bool {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < 1e-12 {
        return false;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    f * edge2.dot(&q) > 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SideKind;
    use approx::assert_relative_eq;

    /// Axis-aligned box facets; `flip` reverses the winding of the first face.
    fn boxed(mesh: &mut Mesh, min: f64, max: f64, flip: bool) -> FacetSet {
        let side = mesh.add_side(1, SideKind::Cut);
        let v: Vec<PointKey> = [
            [min, min, min],
            [max, min, min],
            [max, max, min],
            [min, max, min],
            [min, min, max],
            [max, min, max],
            [max, max, max],
            [min, max, max],
        ]
        .iter()
        .map(|c| mesh.add_point(c[0], c[1], c[2]))
        .collect();

        let mut faces = vec![
            vec![v[0], v[3], v[2], v[1]],
            vec![v[4], v[5], v[6], v[7]],
            vec![v[0], v[1], v[5], v[4]],
            vec![v[1], v[2], v[6], v[5]],
            vec![v[2], v[3], v[7], v[6]],
            vec![v[3], v[0], v[4], v[7]],
        ];
        if flip {
            faces[0].reverse();
        }
        faces
            .iter()
            .map(|f| mesh.add_facet(side, f).unwrap())
            .collect()
    }

    #[test]
    fn facet_normal_xz_plane() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Cut);
        let pts: Vec<_> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]
            .iter()
            .map(|c| mesh.add_point(c[0], c[1], c[2]))
            .collect();
        let f = mesh.add_facet(side, &pts).unwrap();

        let n = mesh.facet_normal(f).unwrap();
        assert_relative_eq!(n.x.abs(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(n.y.abs(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(n.z.abs(), 0.0, epsilon = 1e-10);

        let c = mesh.facet_centroid(f).unwrap();
        assert_relative_eq!(c.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn segment_facet_has_no_normal() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let f = mesh.add_facet(side, &[a, b]).unwrap();
        assert!(mesh.facet_normal(f).is_none());
        assert_relative_eq!(mesh.facet_area(f).unwrap(), 0.0);
    }

    #[test]
    fn facet_area_with_hole() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Element);
        let outer: Vec<_> = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]
            .iter()
            .map(|c| mesh.add_point(c[0], c[1], 0.0))
            .collect();
        let inner: Vec<_> = [[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0]]
            .iter()
            .map(|c| mesh.add_point(c[0], c[1], 0.0))
            .collect();
        let parent = mesh.add_facet(side, &outer).unwrap();
        let hole = mesh.add_facet(side, &inner).unwrap();
        mesh.add_hole(parent, hole).unwrap();

        assert_relative_eq!(mesh.facet_area(parent).unwrap(), 96.0, epsilon = 1e-10);
        assert_eq!(mesh.triangulate_facet(parent).unwrap().len(), 8);
        assert_eq!(mesh.triangulate_facet(hole).unwrap().len(), 2);
    }

    #[test]
    fn box_volume_ignores_winding() {
        let mut mesh = Mesh::new();
        let facets = boxed(&mut mesh, 0.0, 2.0, true);
        assert_relative_eq!(mesh.facets_volume(&facets).unwrap(), 8.0, epsilon = 1e-10);
    }

    #[test]
    fn cavity_is_subtracted() {
        let mut mesh = Mesh::new();
        let mut facets = boxed(&mut mesh, 0.0, 2.0, false);
        facets.extend(boxed(&mut mesh, 0.5, 1.5, false));
        assert_relative_eq!(mesh.facets_volume(&facets).unwrap(), 7.0, epsilon = 1e-10);
    }

    #[test]
    fn ray_cast_containment() {
        let mut mesh = Mesh::new();
        let facets = boxed(&mut mesh, 0.0, 2.0, false);
        assert!(mesh
            .facets_contain_point(&facets, &Point3::new(1.0, 1.0, 1.0))
            .unwrap());
        assert!(!mesh
            .facets_contain_point(&facets, &Point3::new(5.0, 1.0, 1.0))
            .unwrap());
        assert!(!mesh
            .facets_contain_point(&facets, &Point3::new(-1.0, 1.0, 1.0))
            .unwrap());
    }
}
