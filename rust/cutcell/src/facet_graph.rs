// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decomposition of a cut element into volume cells.
//!
//! [`create`] picks a graph implementation from the host element's
//! dimension. For 3D hosts, [`FacetGraph`] runs the full pipeline:
//!
//! 1. discover the lines bordering every facet (holes included) and prune
//!    lines bordered by fewer than two facets until none remain;
//! 2. number facets `0..F` and lines `F..F+L` and connect them in a
//!    [`ColoredGraph`];
//! 3. split the graph into the part reached from the element's own sides
//!    (`used`) and the rest (`free`), and extract one closed cycle per cell;
//! 4. turn every cycle into a volume cell of the mesh.

use std::collections::BTreeMap;
use std::fmt;

use crate::colored_graph::{ColoredGraph, NodeSet};
use crate::config::GraphOptions;
use crate::cycle_list::CycleList;
use crate::error::{Error, Result};
use crate::gmsh;
use crate::keys::*;
use crate::mesh::Mesh;
use crate::simple_graph::{SimpleFacetGraph1D, SimpleFacetGraph2D};

/// Which graph implementation handles an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    /// 1D host: every segment facet is a cell.
    Line,
    /// 2D host: every polygon facet is a cell.
    Planar,
    /// 3D host: full facet graph with cycle search.
    Volumetric,
}

impl GraphKind {
    /// Maps an element dimension to its graph kind.
    pub fn from_dim(dim: u8) -> Result<Self> {
        match dim {
            1 => Ok(GraphKind::Line),
            2 => Ok(GraphKind::Planar),
            3 => Ok(GraphKind::Volumetric),
            other => Err(Error::UnsupportedDimension(other)),
        }
    }
}

/// Common interface of the per-dimension graphs.
pub trait CutCellGraph: fmt::Debug {
    fn kind(&self) -> GraphKind;

    /// Facets taking part in the decomposition.
    fn facets(&self) -> &[FacetKey];

    /// Registers one volume cell per closed region with `mesh` and appends
    /// the new keys to `cells`.
    fn create_volume_cells(&mut self, mesh: &mut Mesh, cells: &mut Vec<VolumeCellKey>) -> Result<()>;
}

/// Builds the graph matching the host element's dimension.
pub fn create(
    mesh: &Mesh,
    element: ElementKey,
    sides: &[SideKey],
    facets: &FacetSet,
    options: &GraphOptions,
) -> Result<Box<dyn CutCellGraph>> {
    let dim = mesh.element_dim(element).ok_or(Error::ElementNotFound(element))?;
    Ok(match GraphKind::from_dim(dim)? {
        GraphKind::Line => Box::new(SimpleFacetGraph1D::new(mesh, element, facets)?),
        GraphKind::Planar => Box::new(SimpleFacetGraph2D::new(mesh, element, facets)?),
        GraphKind::Volumetric => Box::new(FacetGraph::new(mesh, element, sides, facets, options)?),
    })
}

impl Mesh {
    /// Decomposes an element into volume cells using its own sides and
    /// facets.
    pub fn cut_element(
        &mut self,
        element: ElementKey,
        options: &GraphOptions,
    ) -> Result<Vec<VolumeCellKey>> {
        let data = self.element(element).ok_or(Error::ElementNotFound(element))?;
        let sides = data.sides.clone();
        let facets = data.facets.clone();

        let mut graph = create(self, element, &sides, &facets, options)?;
        let mut cells = Vec::new();
        graph.create_volume_cells(self, &mut cells)?;
        Ok(cells)
    }
}

/// What a graph node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeValue {
    Facet(FacetKey),
    Line(Line),
}

/// Facet graph of a 3D cut element.
#[derive(Debug)]
pub struct FacetGraph {
    element: ElementKey,
    element_id: i32,
    dim: u8,
    all_facets: Vec<FacetKey>,
    all_lines: Vec<Line>,
    graph: ColoredGraph,
    cycle_list: CycleList,
    pruned_lines: usize,
    options: GraphOptions,
}

impl FacetGraph {
    /// Builds the graph and extracts its cycles.
    pub fn new(
        mesh: &Mesh,
        element: ElementKey,
        sides: &[SideKey],
        facets: &FacetSet,
        options: &GraphOptions,
    ) -> Result<Self> {
        let element_id = mesh.element_id(element);
        let dim = mesh.element_dim(element).ok_or(Error::ElementNotFound(element))?;

        let mut universe = with_holes(mesh, facets)?;
        let unpruned = universe.clone();
        let (lines, pruned_lines) = prune_lines(mesh, element_id, &mut universe)?;

        let all_facets: Vec<FacetKey> = universe.iter().copied().collect();
        let index: BTreeMap<FacetKey, usize> = all_facets
            .iter()
            .enumerate()
            .map(|(i, &f)| (f, i))
            .collect();

        let split = all_facets.len();
        let mut graph = ColoredGraph::new(split);
        let mut all_lines = Vec::with_capacity(lines.len());
        for (line, bordering) in &lines {
            let node = split + all_lines.len();
            all_lines.push(*line);
            for f in bordering {
                if let Some(&facet_node) = index.get(f) {
                    graph.add(facet_node, node)?;
                }
            }
        }
        if let Err(err) = graph.test_closed() {
            tracing::error!(element = element_id, %err, "facet graph is not closed");
            dump_on_failure(mesh, element, &[unpruned], options);
            return Err(err);
        }

        let used = used_graph(mesh, sides, &universe, &index, &graph)?;
        if used.is_empty() {
            tracing::error!(
                element = element_id,
                pruned = pruned_lines,
                "no element side facet survives line pruning"
            );
            dump_on_failure(mesh, element, &[unpruned], options);
            return Err(Error::CycleSearchFailed {
                element: element_id,
                node: 0,
                reason: "no element side facet survives line pruning".into(),
            });
        }
        let free: NodeSet = graph
            .all_nodes()
            .difference(&used.all_nodes())
            .copied()
            .collect();

        tracing::debug!(
            element = element_id,
            facets = split,
            lines = all_lines.len(),
            used = used.len(),
            free = free.len(),
            "built facet graph"
        );

        let mut cycle_list = CycleList::new(element_id);
        cycle_list.add_points(&graph, &used, &free, options.max_search_steps)?;

        let mut fg = Self {
            element,
            element_id,
            dim,
            all_facets,
            all_lines,
            graph,
            cycle_list,
            pruned_lines,
            options: options.clone(),
        };
        fg.place_floating_shells(mesh)?;
        Ok(fg)
    }

    /// Attaches every floating shell to the smallest cycle enclosing it and
    /// adds the shell as a cycle of its own.
    fn place_floating_shells(&mut self, mesh: &Mesh) -> Result<()> {
        let mut shells: Vec<(f64, ColoredGraph)> = self
            .cycle_list
            .take_floating()
            .into_iter()
            .map(|shell| {
                let volume = mesh.facets_volume(&self.facet_set(&shell)).unwrap_or_else(|| {
                    tracing::warn!(
                        element = self.element_id,
                        facets = shell.facet_count(),
                        "cannot compute floating shell volume"
                    );
                    0.0
                });
                (volume, shell)
            })
            .collect();
        // Outer shells first so nested ones find their innermost container.
        shells.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, shell) in shells {
            let node = shell.facet_nodes().next().unwrap_or_default();
            let sample = self
                .all_facets
                .get(node)
                .and_then(|&f| mesh.facet_points(f))
                .and_then(|points| points.first())
                .and_then(|&p| mesh.point_coords(p));
            let Some(sample) = sample else {
                return Err(self.shell_failure(node, "floating shell has no points"));
            };

            let mut best: Option<(usize, f64)> = None;
            for (i, cycle) in self.cycle_list.iter().enumerate() {
                let facets = self.facet_set(cycle);
                if mesh.facets_contain_point(&facets, &sample) != Some(true) {
                    continue;
                }
                let Some(volume) = mesh.facets_volume(&facets) else {
                    tracing::warn!(
                        element = self.element_id,
                        cycle = i,
                        "cannot compute cycle volume, ranking it last"
                    );
                    best.get_or_insert((i, f64::INFINITY));
                    continue;
                };
                if best.map_or(true, |(_, v)| volume < v) {
                    best = Some((i, volume));
                }
            }
            let Some((index, _)) = best else {
                return Err(self.shell_failure(node, "floating shell lies outside every cell"));
            };
            tracing::debug!(element = self.element_id, cycle = index, "attached floating shell");
            self.cycle_list.attach(index, &shell)?;
            self.cycle_list.push(shell);
        }
        Ok(())
    }

    fn shell_failure(&self, node: usize, reason: &str) -> Error {
        tracing::error!(element = self.element_id, node, reason, "cannot place floating shell");
        Error::CycleSearchFailed {
            element: self.element_id,
            node,
            reason: reason.into(),
        }
    }

    /// Facets of a cycle.
    pub fn facet_set(&self, cycle: &ColoredGraph) -> FacetSet {
        cycle
            .facet_nodes()
            .filter_map(|n| self.all_facets.get(n).copied())
            .collect()
    }

    pub fn graph(&self) -> &ColoredGraph {
        &self.graph
    }

    pub fn cycles(&self) -> &CycleList {
        &self.cycle_list
    }

    pub fn all_lines(&self) -> &[Line] {
        &self.all_lines
    }

    /// Number of lines removed because fewer than two facets bordered them.
    pub fn pruned_lines(&self) -> usize {
        self.pruned_lines
    }

    /// Maps a graph node back to the facet or line it stands for.
    pub fn node_value(&self, node: usize) -> Option<NodeValue> {
        let split = self.graph.split();
        if node < split {
            self.all_facets.get(node).copied().map(NodeValue::Facet)
        } else {
            self.all_lines.get(node - split).copied().map(NodeValue::Line)
        }
    }
}

impl CutCellGraph for FacetGraph {
    fn kind(&self) -> GraphKind {
        GraphKind::Volumetric
    }

    fn facets(&self) -> &[FacetKey] {
        &self.all_facets
    }

    fn create_volume_cells(&mut self, mesh: &mut Mesh, cells: &mut Vec<VolumeCellKey>) -> Result<()> {
        let mut counter = vec![0usize; self.all_facets.len()];
        let mut collected: Vec<FacetSet> = Vec::with_capacity(self.cycle_list.len());
        for cycle in &self.cycle_list {
            for node in cycle.facet_nodes() {
                if let Some(count) = counter.get_mut(node) {
                    *count += 1;
                }
            }
            collected.push(self.facet_set(cycle));
        }
        check_facet_usage(&counter, &self.all_facets, self.element_id)?;

        let required = usize::from(self.dim) + 1;
        if let Some(short) = collected.iter().find(|facets| facets.len() < required) {
            tracing::error!(
                element = self.element_id,
                found = short.len(),
                required,
                "volume cell has too few facets"
            );
            dump_on_failure(mesh, self.element, &collected, &self.options);
            return Err(Error::TooFewFacets {
                element: self.element_id,
                found: short.len(),
                required,
            });
        }

        for facets in collected {
            let lines = mesh.collect_lines(&facets)?;
            let cell = mesh.new_volume_cell(facets, lines, self.element)?;
            cells.push(cell);
        }
        tracing::debug!(element = self.element_id, cells = self.cycle_list.len(), "created volume cells");
        Ok(())
    }
}

/// Writes Gmsh dumps of `groups` when the options ask for them.
fn dump_on_failure(mesh: &Mesh, element: ElementKey, groups: &[FacetSet], options: &GraphOptions) {
    if !options.dump_on_failure {
        return;
    }
    if let Err(err) = gmsh::dump_failed_element(mesh, element, groups, &options.dump_dir) {
        tracing::warn!(element = mesh.element_id(element), %err, "failed to write gmsh dump");
    }
}

/// Fails if any facet is claimed by more than two cells.
pub(crate) fn check_facet_usage(counter: &[usize], facets: &[FacetKey], element: i32) -> Result<()> {
    for (node, &count) in counter.iter().enumerate() {
        if count > 2 {
            let Some(&facet) = facets.get(node) else {
                continue;
            };
            tracing::error!(element, ?facet, count, "facet used by more than two volume cells");
            return Err(Error::FacetOverused {
                element,
                facet,
                count,
            });
        }
    }
    Ok(())
}

/// The given facets plus all their holes, transitively.
fn with_holes(mesh: &Mesh, facets: &FacetSet) -> Result<FacetSet> {
    let mut universe = facets.clone();
    let mut work: Vec<FacetKey> = facets.iter().copied().collect();
    while let Some(f) = work.pop() {
        for &h in mesh.holes(f).ok_or(Error::FacetNotFound(f))? {
            if universe.insert(h) {
                work.push(h);
            }
        }
    }
    Ok(universe)
}

/// Discovers lines and removes lines bordered by fewer than two facets, with
/// their facets, until every line has at least two.
///
/// Returns the surviving line map and the number of pruned lines.
fn prune_lines(mesh: &Mesh, element: i32, universe: &mut FacetSet) -> Result<(LineMap, usize)> {
    let mut pruned = 0;
    loop {
        let lines = mesh.collect_lines(universe.iter())?;
        let dangling: Vec<(&Line, &FacetSet)> =
            lines.iter().filter(|(_, facets)| facets.len() < 2).collect();
        if dangling.is_empty() {
            return Ok((lines, pruned));
        }
        for (line, facets) in dangling {
            tracing::warn!(
                element,
                ?line,
                facets = facets.len(),
                "pruning line bordered by fewer than two facets"
            );
            pruned += 1;
            for f in facets {
                universe.remove(f);
            }
        }
    }
}

/// Subgraph reached from the element's own side facets and their holes.
fn used_graph(
    mesh: &Mesh,
    sides: &[SideKey],
    universe: &FacetSet,
    index: &BTreeMap<FacetKey, usize>,
    graph: &ColoredGraph,
) -> Result<ColoredGraph> {
    let mut used = ColoredGraph::new(graph.split());
    let mut work = Vec::new();
    for &side in sides {
        let facets = mesh.side_facets(side).ok_or(Error::SideNotFound(side))?;
        work.extend(facets.iter().copied().filter(|f| universe.contains(f)));
    }

    let mut seen = FacetSet::new();
    while let Some(f) = work.pop() {
        if !seen.insert(f) {
            continue;
        }
        if let Some(&node) = index.get(&f) {
            if let Some(row) = graph.neighbors(node) {
                used.add_row(node, row)?;
            }
        }
        if let Some(holes) = mesh.holes(f) {
            work.extend(holes.iter().copied().filter(|h| universe.contains(h)));
        }
    }
    Ok(used)
}
