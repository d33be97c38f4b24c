// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cut scenarios: background elements plus the planes cutting them.

use cutcell::builders::{add_hex8, add_line2, add_quad4, add_tet4, cut_with_planes, CutPlane};
use cutcell::{ElementKey, GraphOptions, Mesh, VolumeCellKey};
use serde::{Deserialize, Serialize};

fn default_tolerance() -> f64 {
    1e-9
}

/// A scenario as read from JSON.
///
/// ```json
/// {
///   "planes": [{ "normal": [1, 0, 0], "offset": 0.5 }],
///   "elements": [{ "shape": "hex8", "id": 1, "coords": [[0, 0, 0], ...] }]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Point merge and plane classification tolerance.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Planes applied to every 3D element.
    #[serde(default)]
    pub planes: Vec<CutPlane>,
    pub elements: Vec<ElementSpec>,
}

/// One background element. 3D elements may carry planes of their own.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ElementSpec {
    Hex8 {
        id: i32,
        coords: [[f64; 3]; 8],
        #[serde(default)]
        planes: Vec<CutPlane>,
    },
    Tet4 {
        id: i32,
        coords: [[f64; 3]; 4],
        #[serde(default)]
        planes: Vec<CutPlane>,
    },
    Quad4 {
        id: i32,
        coords: [[f64; 3]; 4],
    },
    Line2 {
        id: i32,
        coords: [[f64; 3]; 2],
    },
}

impl ElementSpec {
    pub fn id(&self) -> i32 {
        match self {
            ElementSpec::Hex8 { id, .. }
            | ElementSpec::Tet4 { id, .. }
            | ElementSpec::Quad4 { id, .. }
            | ElementSpec::Line2 { id, .. } => *id,
        }
    }

    fn own_planes(&self) -> &[CutPlane] {
        match self {
            ElementSpec::Hex8 { planes, .. } | ElementSpec::Tet4 { planes, .. } => planes,
            ElementSpec::Quad4 { .. } | ElementSpec::Line2 { .. } => &[],
        }
    }

    fn add_to(&self, mesh: &mut Mesh) -> cutcell::Result<ElementKey> {
        match self {
            ElementSpec::Hex8 { id, coords, .. } => add_hex8(mesh, *id, coords),
            ElementSpec::Tet4 { id, coords, .. } => add_tet4(mesh, *id, coords),
            ElementSpec::Quad4 { id, coords } => add_quad4(mesh, *id, coords),
            ElementSpec::Line2 { id, coords } => add_line2(mesh, *id, coords),
        }
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub elements: Vec<ElementReport>,
    pub total_cells: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementReport {
    pub id: i32,
    pub shape: String,
    pub cut_sides: usize,
    pub facets: usize,
    pub cells: Vec<CellReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub facets: usize,
    pub lines: usize,
    /// Volume for 3D hosts, area for 2D hosts, length for 1D hosts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<f64>,
}

/// Builds every element of the scenario, cuts it and decomposes it.
///
/// A failing element is recorded in its report entry; the others still run.
pub fn run(scenario: &Scenario, options: &GraphOptions) -> (Mesh, Report) {
    let mut mesh = Mesh::new();
    let mut report = Report::default();

    for (i, spec) in scenario.elements.iter().enumerate() {
        let span = tracing::info_span!("element", id = spec.id());
        let _guard = span.enter();

        let entry = match process(&mut mesh, scenario, spec, i, options) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!(%err, "element failed");
                report.failed += 1;
                ElementReport {
                    id: spec.id(),
                    shape: shape_name(spec).into(),
                    cut_sides: 0,
                    facets: 0,
                    cells: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        };
        report.total_cells += entry.cells.len();
        report.elements.push(entry);
    }

    tracing::info!(
        elements = report.elements.len(),
        cells = report.total_cells,
        failed = report.failed,
        "scenario finished"
    );
    (mesh, report)
}

fn shape_name(spec: &ElementSpec) -> &'static str {
    match spec {
        ElementSpec::Hex8 { .. } => "hex8",
        ElementSpec::Tet4 { .. } => "tet4",
        ElementSpec::Quad4 { .. } => "quad4",
        ElementSpec::Line2 { .. } => "line2",
    }
}

fn process(
    mesh: &mut Mesh,
    scenario: &Scenario,
    spec: &ElementSpec,
    index: usize,
    options: &GraphOptions,
) -> cutcell::Result<ElementReport> {
    let element = spec.add_to(mesh)?;
    let dim = mesh.element_dim(element).unwrap_or_default();

    let mut cut_sides = 0;
    if dim == 3 {
        let planes: Vec<CutPlane> = scenario
            .planes
            .iter()
            .chain(spec.own_planes())
            .map(|p| CutPlane::new(p.normal, p.offset))
            .collect();
        if !planes.is_empty() {
            // Cut side ids stay clear of the element side ids `10 * id + k`.
            let first_side_id = 1000 * (index as i32 + 1);
            let sides =
                cut_with_planes(mesh, element, &planes, first_side_id, scenario.tolerance)?;
            cut_sides = sides.len();
        }
    }

    let facets = mesh.element_facets(element).map_or(0, |f| f.len());
    let cells = mesh.cut_element(element, options)?;
    Ok(ElementReport {
        id: spec.id(),
        shape: shape_name(spec).into(),
        cut_sides,
        facets,
        cells: cells.iter().map(|&c| cell_report(mesh, dim, c)).collect(),
        error: None,
    })
}

fn cell_report(mesh: &Mesh, dim: u8, cell: VolumeCellKey) -> CellReport {
    let data = mesh.volume_cell(cell);
    let measure = match dim {
        3 => mesh.volume_cell_volume(cell),
        2 => data.and_then(|d| d.facets.iter().map(|&f| mesh.facet_area(f)).sum()),
        1 => data.and_then(|d| {
            d.lines
                .keys()
                .map(|line| {
                    let a = mesh.point_coords(line.begin())?;
                    let b = mesh.point_coords(line.end())?;
                    Some((b - a).norm())
                })
                .sum()
        }),
        _ => None,
    };
    CellReport {
        facets: data.map_or(0, |d| d.facets.len()),
        lines: data.map_or(0, |d| d.lines.len()),
        measure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CUBE: &str = r#"[[0,0,0],[1,0,0],[1,1,0],[0,1,0],[0,0,1],[1,0,1],[1,1,1],[0,1,1]]"#;

    fn parse(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn hex_cut_by_global_plane() {
        let scenario = parse(&format!(
            r#"{{"planes":[{{"normal":[2,0,0],"offset":1.0}}],
                "elements":[{{"shape":"hex8","id":3,"coords":{CUBE}}}]}}"#
        ));
        let (mesh, report) = run(&scenario, &GraphOptions::default());
        assert_eq!(report.failed, 0);
        assert_eq!(report.total_cells, 2);
        assert_eq!(mesh.volume_cell_count(), 2);

        let element = &report.elements[0];
        assert_eq!(element.id, 3);
        assert_eq!(element.cut_sides, 1);
        assert_eq!(element.facets, 11);
        for cell in &element.cells {
            assert_eq!(cell.facets, 6);
            assert_relative_eq!(cell.measure.unwrap(), 0.5, epsilon = 1e-10);
        }
    }

    #[test]
    fn lower_dimensional_hosts_are_single_cells() {
        let scenario = parse(
            r#"{"elements":[
                {"shape":"quad4","id":1,"coords":[[0,0,0],[2,0,0],[2,1,0],[0,1,0]]},
                {"shape":"line2","id":2,"coords":[[0,0,0],[0,3,4]]}
            ]}"#,
        );
        let (_, report) = run(&scenario, &GraphOptions::default());
        assert_eq!(report.total_cells, 2);
        assert_relative_eq!(report.elements[0].cells[0].measure.unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(report.elements[1].cells[0].measure.unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn failing_element_does_not_stop_the_run() {
        let scenario = parse(&format!(
            r#"{{"elements":[
                {{"shape":"hex8","id":1,"coords":{CUBE},"planes":[{{"normal":[0,0,1],"offset":0.0}}]}},
                {{"shape":"hex8","id":2,"coords":{CUBE}}}
            ]}}"#
        ));
        let (_, report) = run(&scenario, &GraphOptions::default());
        assert_eq!(report.failed, 1);
        assert!(report.elements[0].error.as_deref().unwrap().contains("coplanar"));
        assert_eq!(report.elements[1].cells.len(), 1);
    }
}
