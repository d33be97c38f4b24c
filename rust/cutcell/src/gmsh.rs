// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gmsh `.pos` output for failed decompositions.
//!
//! The files use the legacy parsed-post-processing format: one `View` block
//! per file, each primitive written as `TAG(coords){values};`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mesh::Mesh;

/// File name of the element dump written on failure.
pub const FAILED_ELEMENT_FILE: &str = "add_to_volume_cells_facetgraph_failed.pos";

/// Writes the background element as a single primitive tagged with its id.
pub fn write_element<W: Write>(mesh: &Mesh, element: ElementKey, w: &mut W) -> Result<()> {
    let data = mesh.element(element).ok_or(Error::ElementNotFound(element))?;
    let coords = coords_list(mesh, &data.nodes)?;
    let values = vec![data.id.to_string(); data.nodes.len()].join(",");
    writeln!(w, "{}({}){{{}}};", data.shape.gmsh_tag(), coords, values)?;
    Ok(())
}

/// Writes a facet as triangles (polygons) or a line (segments).
pub fn write_facet<W: Write>(mesh: &Mesh, facet: FacetKey, value: usize, w: &mut W) -> Result<()> {
    let points = mesh.facet_points(facet).ok_or(Error::FacetNotFound(facet))?;
    if points.len() < 3 {
        let coords = coords_list(mesh, points)?;
        let values = vec![value.to_string(); points.len()].join(",");
        writeln!(w, "SL({coords}){{{values}}};")?;
        return Ok(());
    }
    let triangles = mesh
        .triangulate_facet(facet)
        .ok_or_else(|| Error::degenerate_facet(Some(facet), "cannot triangulate"))?;
    for triangle in triangles {
        let coords = coords_list(mesh, &triangle)?;
        writeln!(w, "ST({coords}){{{value},{value},{value}}};")?;
    }
    Ok(())
}

/// Writes one view holding every facet group, valued by group index.
pub fn write_facet_groups<W: Write>(mesh: &Mesh, groups: &[FacetSet], w: &mut W) -> Result<()> {
    writeln!(w, "View \"facet groups\" {{")?;
    for (i, group) in groups.iter().enumerate() {
        for &f in group {
            write_facet(mesh, f, i, w)?;
        }
    }
    writeln!(w, "}};")?;
    Ok(())
}

/// Dumps a failed element and its candidate facet groups into `dir`.
///
/// Writes [`FAILED_ELEMENT_FILE`] with the element and all group facets, and
/// one `facet_group_<n>.pos` per group. Returns the written paths.
pub fn dump_failed_element(
    mesh: &Mesh,
    element: ElementKey,
    groups: &[FacetSet],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(groups.len() + 1);

    let path = dir.join(FAILED_ELEMENT_FILE);
    {
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "View \"element {}\" {{", mesh.element_id(element))?;
        write_element(mesh, element, &mut w)?;
        writeln!(w, "}};")?;
        write_facet_groups(mesh, groups, &mut w)?;
        w.flush()?;
    }
    written.push(path);

    for (i, group) in groups.iter().enumerate() {
        let path = dir.join(format!("facet_group_{i}.pos"));
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "View \"facet group {i}\" {{")?;
        for &f in group {
            write_facet(mesh, f, i, &mut w)?;
        }
        writeln!(w, "}};")?;
        w.flush()?;
        written.push(path);
    }

    tracing::info!(
        element = mesh.element_id(element),
        dir = %dir.display(),
        files = written.len(),
        "wrote gmsh dump"
    );
    Ok(written)
}

fn coords_list(mesh: &Mesh, points: &[PointKey]) -> Result<String> {
    let mut parts = Vec::with_capacity(points.len() * 3);
    for &p in points {
        let c = mesh.point_coords(p).ok_or(Error::PointNotFound(p))?;
        parts.push(format!("{},{},{}", c.x, c.y, c.z));
    }
    Ok(parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SideKind;
    use crate::shape::ElementShape;

    #[test]
    fn triangle_facet_is_one_primitive() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let c = mesh.add_point(0.0, 1.0, 0.0);
        let f = mesh.add_facet(side, &[a, b, c]).unwrap();

        let mut out = Vec::new();
        write_facet(&mesh, f, 3, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("ST("));
        assert!(text.trim_end().ends_with("{3,3,3};"));
    }

    #[test]
    fn segment_facet_is_a_line() {
        let mut mesh = Mesh::new();
        let side = mesh.add_side(1, SideKind::Cut);
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(1.0, 0.0, 0.0);
        let f = mesh.add_facet(side, &[a, b]).unwrap();

        let mut out = Vec::new();
        write_facet(&mesh, f, 0, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "SL(0,0,0,1,0,0){0,0};\n");
    }

    #[test]
    fn element_uses_shape_tag() {
        let mut mesh = Mesh::new();
        let a = mesh.add_point(0.0, 0.0, 0.0);
        let b = mesh.add_point(2.0, 0.0, 0.0);
        let e = mesh.add_element(9, ElementShape::Line2, &[a, b], &[]).unwrap();

        let mut out = Vec::new();
        write_element(&mesh, e, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "SL(0,0,0,2,0,0){9,9};\n");
    }
}
