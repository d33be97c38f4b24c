// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cell graphs for 1D and 2D host elements.
//!
//! Lower-dimensional hosts need no cycle search: the pieces of the element's
//! own side already are the cells. Facets on cutting sides only mark the
//! interfaces between them.

use crate::error::{Error, Result};
use crate::facet_graph::{CutCellGraph, GraphKind};
use crate::keys::*;
use crate::mesh::Mesh;

/// Facets of `facets` lying on the element's own sides, in key order.
fn cell_facets(mesh: &Mesh, element: ElementKey, facets: &FacetSet) -> Result<Vec<FacetKey>> {
    if mesh.element(element).is_none() {
        return Err(Error::ElementNotFound(element));
    }
    Ok(facets
        .iter()
        .copied()
        .filter(|&f| mesh.facet_on_element_side(f, element))
        .collect())
}

fn register_cells(
    mesh: &mut Mesh,
    element: ElementKey,
    facets: &[FacetKey],
    cells: &mut Vec<VolumeCellKey>,
) -> Result<()> {
    for &f in facets {
        let set: FacetSet = [f].into_iter().collect();
        let lines = mesh.collect_lines(&set)?;
        cells.push(mesh.new_volume_cell(set, lines, element)?);
    }
    tracing::debug!(
        element = mesh.element_id(element),
        cells = facets.len(),
        "created volume cells"
    );
    Ok(())
}

/// Graph of a 2D host: one cell per polygon on the element's face.
#[derive(Debug)]
pub struct SimpleFacetGraph2D {
    element: ElementKey,
    facets: Vec<FacetKey>,
}

impl SimpleFacetGraph2D {
    pub fn new(mesh: &Mesh, element: ElementKey, facets: &FacetSet) -> Result<Self> {
        let facets = cell_facets(mesh, element, facets)?;
        for &f in &facets {
            let points = mesh.facet_points(f).ok_or(Error::FacetNotFound(f))?;
            if points.len() < 3 {
                return Err(Error::degenerate_facet(
                    Some(f),
                    format!("2D cell needs at least 3 points, got {}", points.len()),
                ));
            }
        }
        Ok(Self { element, facets })
    }
}

impl CutCellGraph for SimpleFacetGraph2D {
    fn kind(&self) -> GraphKind {
        GraphKind::Planar
    }

    fn facets(&self) -> &[FacetKey] {
        &self.facets
    }

    fn create_volume_cells(&mut self, mesh: &mut Mesh, cells: &mut Vec<VolumeCellKey>) -> Result<()> {
        register_cells(mesh, self.element, &self.facets, cells)
    }
}

/// Graph of a 1D host: one cell per segment of the element.
#[derive(Debug)]
pub struct SimpleFacetGraph1D {
    element: ElementKey,
    facets: Vec<FacetKey>,
}

impl SimpleFacetGraph1D {
    pub fn new(mesh: &Mesh, element: ElementKey, facets: &FacetSet) -> Result<Self> {
        let facets = cell_facets(mesh, element, facets)?;
        for &f in &facets {
            let points = mesh.facet_points(f).ok_or(Error::FacetNotFound(f))?;
            if points.len() != 2 {
                return Err(Error::degenerate_facet(
                    Some(f),
                    format!("1D cell needs exactly 2 points, got {}", points.len()),
                ));
            }
        }
        Ok(Self { element, facets })
    }
}

impl CutCellGraph for SimpleFacetGraph1D {
    fn kind(&self) -> GraphKind {
        GraphKind::Line
    }

    fn facets(&self) -> &[FacetKey] {
        &self.facets
    }

    fn create_volume_cells(&mut self, mesh: &mut Mesh, cells: &mut Vec<VolumeCellKey>) -> Result<()> {
        register_cells(mesh, self.element, &self.facets, cells)
    }
}
