// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON snapshots of a cut mesh.
//!
//! Slot map keys are replaced by dense indices in creation order. Volume cell
//! line maps are not stored; they are rediscovered from the cell facets on
//! import.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::Key;

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mesh::{Mesh, SideKind};
use crate::shape::ElementShape;

/// Serializable representation of a whole mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub points: Vec<PointSnapshot>,
    pub sides: Vec<SideSnapshot>,
    pub facets: Vec<FacetSnapshot>,
    pub elements: Vec<ElementSnapshot>,
    pub volume_cells: Vec<VolumeCellSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSnapshot {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideSnapshot {
    pub id: i32,
    pub kind: SideKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetSnapshot {
    pub side: usize,
    pub points: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub id: i32,
    pub shape: ElementShape,
    pub nodes: Vec<usize>,
    pub sides: Vec<usize>,
    pub facets: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeCellSnapshot {
    pub element: usize,
    pub facets: Vec<usize>,
}

/// Dense ids for the keys of one slot map.
fn dense_ids<K: Key>(keys: impl Iterator<Item = K>) -> FxHashMap<K, usize> {
    keys.enumerate().map(|(i, k)| (k, i)).collect()
}

fn map_ids<'a, K: Key + 'a>(
    ids: &FxHashMap<K, usize>,
    keys: impl IntoIterator<Item = &'a K>,
) -> Vec<usize> {
    keys.into_iter().filter_map(|k| ids.get(k).copied()).collect()
}

fn lookup<K: Copy>(keys: &[K], index: usize, what: &str) -> Result<K> {
    keys.get(index)
        .copied()
        .ok_or_else(|| Error::Serialization(format!("{what} index {index} out of range")))
}

fn lookup_all<K: Copy>(keys: &[K], indices: &[usize], what: &str) -> Result<Vec<K>> {
    indices.iter().map(|&i| lookup(keys, i, what)).collect()
}

impl Mesh {
    /// Creates a serializable snapshot of the mesh.
    pub fn to_snapshot(&self) -> MeshSnapshot {
        let point_ids = dense_ids(self.points.keys());
        let side_ids = dense_ids(self.sides.keys());
        let facet_ids = dense_ids(self.facets.keys());
        let element_ids = dense_ids(self.elements.keys());

        MeshSnapshot {
            points: self
                .points
                .values()
                .map(|p| PointSnapshot {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    tolerance: p.tolerance,
                })
                .collect(),
            sides: self
                .sides
                .values()
                .map(|s| SideSnapshot {
                    id: s.id,
                    kind: s.kind,
                })
                .collect(),
            facets: self
                .facets
                .values()
                .map(|f| FacetSnapshot {
                    side: side_ids.get(&f.side).copied().unwrap_or_default(),
                    points: map_ids(&point_ids, &f.points),
                    holes: map_ids(&facet_ids, &f.holes),
                })
                .collect(),
            elements: self
                .elements
                .values()
                .map(|e| ElementSnapshot {
                    id: e.id,
                    shape: e.shape,
                    nodes: map_ids(&point_ids, &e.nodes),
                    sides: map_ids(&side_ids, &e.sides),
                    facets: map_ids(&facet_ids, &e.facets),
                })
                .collect(),
            volume_cells: self
                .volume_cells
                .values()
                .map(|c| VolumeCellSnapshot {
                    element: element_ids.get(&c.element).copied().unwrap_or_default(),
                    facets: map_ids(&facet_ids, &c.facets),
                })
                .collect(),
        }
    }

    /// Serializes the mesh to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a mesh from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: MeshSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    /// Rebuilds a mesh from a snapshot, checking every reference.
    pub fn from_snapshot(snap: &MeshSnapshot) -> Result<Self> {
        let mut mesh = Mesh::new();

        let points: Vec<PointKey> = snap
            .points
            .iter()
            .map(|p| mesh.add_point_with_tolerance(p.x, p.y, p.z, p.tolerance))
            .collect();
        let sides: Vec<SideKey> = snap
            .sides
            .iter()
            .map(|s| mesh.add_side(s.id, s.kind))
            .collect();

        let mut facets = Vec::with_capacity(snap.facets.len());
        for fs in &snap.facets {
            let side = lookup(&sides, fs.side, "side")?;
            let loop_points = lookup_all(&points, &fs.points, "point")?;
            facets.push(mesh.add_facet(side, &loop_points)?);
        }
        for (fs, &parent) in snap.facets.iter().zip(&facets) {
            for &h in &fs.holes {
                mesh.add_hole(parent, lookup(&facets, h, "facet")?)?;
            }
        }

        let mut elements = Vec::with_capacity(snap.elements.len());
        for es in &snap.elements {
            let nodes = lookup_all(&points, &es.nodes, "point")?;
            let element_sides = lookup_all(&sides, &es.sides, "side")?;
            let element = mesh.add_element(es.id, es.shape, &nodes, &element_sides)?;
            for f in lookup_all(&facets, &es.facets, "facet")? {
                mesh.add_element_facet(element, f)?;
            }
            elements.push(element);
        }

        for cs in &snap.volume_cells {
            let element = lookup(&elements, cs.element, "element")?;
            let cell_facets: FacetSet = lookup_all(&facets, &cs.facets, "facet")?
                .into_iter()
                .collect();
            let lines = mesh.collect_lines(&cell_facets)?;
            mesh.new_volume_cell(cell_facets, lines, element)?;
        }

        Ok(mesh)
    }
}
