// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction of closed cycles from a colored facet graph.
//!
//! The element boundary (the "used" graph) seeds the list. Internal cut
//! surfaces are then placed one sheet at a time: a sheet is a set of free
//! facets whose open lines are all closed, and it splits exactly one existing
//! cycle into two. Free components that never touch the boundary are closed
//! shells; they are handed back to the caller, which knows the geometry
//! needed to decide which cycle encloses them.
//!
//! Sheet growth is a depth-first search over an explicit stack of choice
//! points. Each choice point keeps a snapshot of the sheet and is restored on
//! backtracking, so the search depth is bounded by the heap, not the call
//! stack.
//!
//! Tie-breaking is fixed and independent of container iteration quirks:
//!
//! 1. seeds are tried in ascending facet node id;
//! 2. an open line is closed by candidates in ascending facet node id, the
//!    lowest open line first;
//! 3. a completed sheet goes to the cycle holding the most boundary facets
//!    that contains all of its attachment lines (ties: list order).

use std::collections::BTreeMap;

use crate::colored_graph::{ColoredGraph, NodeSet};
use crate::error::{Error, Result};

/// A pending choice while growing a sheet.
#[derive(Debug)]
struct Choice {
    sheet: NodeSet,
    candidates: Vec<usize>,
    next: usize,
}

/// Result of committing a sheet: `cycles[index]` is replaced by `first` and
/// `second` is appended.
#[derive(Debug)]
struct CycleSplit {
    index: usize,
    first: ColoredGraph,
    second: ColoredGraph,
}

/// Ordered list of closed cycles, one per candidate volume cell.
#[derive(Debug, Clone, Default)]
pub struct CycleList {
    element: i32,
    cycles: Vec<ColoredGraph>,
    floating: Vec<ColoredGraph>,
    steps: usize,
}

impl CycleList {
    /// Creates an empty list. `element` is only used in diagnostics.
    pub fn new(element: i32) -> Self {
        Self {
            element,
            ..Self::default()
        }
    }

    /// Builds the cycles for `graph`.
    ///
    /// `used` holds the element boundary facets with all their lines, `free`
    /// every node of `graph` not touched by `used`. Floating shells are kept
    /// aside and can be fetched with [`CycleList::take_floating`].
    pub fn add_points(
        &mut self,
        graph: &ColoredGraph,
        used: &ColoredGraph,
        free: &NodeSet,
        max_steps: usize,
    ) -> Result<()> {
        for component in used.components() {
            component.test_cycle()?;
            self.cycles.push(component);
        }

        let free_facets: NodeSet = free.iter().copied().filter(|&n| graph.is_facet(n)).collect();
        let mut unplaced = NodeSet::new();
        for group in graph.induced_by_facets(&free_facets).facet_components(&NodeSet::new()) {
            let touches_boundary = group.iter().any(|&f| {
                graph
                    .neighbors(f)
                    .is_some_and(|row| row.iter().any(|&line| used.contains(line)))
            });
            if touches_boundary {
                unplaced.extend(group);
                continue;
            }

            let shell = graph.induced_by_facets(&group);
            if let Err(err) = shell.test_cycle() {
                let node = group.first().copied().unwrap_or_default();
                return Err(self.failure(node, format!("floating surface is not a closed shell: {err}")));
            }
            tracing::debug!(
                element = self.element,
                facets = group.len(),
                "floating shell inside element"
            );
            self.floating.push(shell);
        }

        let used_facets: NodeSet = used.facet_nodes().collect();
        while let Some(&first) = unplaced.first() {
            let mut placed = None;
            for seed in unplaced.iter().copied() {
                if let Some((sheet, split)) =
                    self.grow_sheet(graph, &used_facets, &unplaced, seed, max_steps)?
                {
                    placed = Some((sheet, split));
                    break;
                }
            }

            let Some((sheet, split)) = placed else {
                return Err(self.failure(first, "no cycle can be split by the remaining cut facets"));
            };
            tracing::debug!(
                element = self.element,
                sheet = sheet.len(),
                cycle = split.index,
                "placed cut sheet"
            );
            for f in &sheet {
                unplaced.remove(f);
            }
            self.cycles[split.index] = split.first;
            self.cycles.push(split.second);
        }
        Ok(())
    }

    /// Grows a sheet from `seed` and tries to commit it.
    ///
    /// Returns `None` when every completion of the sheet has been rejected.
    fn grow_sheet(
        &mut self,
        graph: &ColoredGraph,
        used_facets: &NodeSet,
        unplaced: &NodeSet,
        seed: usize,
        max_steps: usize,
    ) -> Result<Option<(NodeSet, CycleSplit)>> {
        let placed_lines = self.placed_lines();
        let mut stack: Vec<Choice> = Vec::new();
        let mut sheet = NodeSet::from([seed]);

        loop {
            self.steps += 1;
            if self.steps > max_steps {
                return Err(self.failure(seed, format!("search exceeded {max_steps} steps")));
            }

            match open_line(graph, &sheet, &placed_lines) {
                None => {
                    if let Some(split) = self.try_commit(graph, used_facets, &sheet, &placed_lines) {
                        return Ok(Some((sheet, split)));
                    }
                }
                Some(line) => {
                    let candidates: Vec<usize> = graph
                        .neighbors(line)
                        .into_iter()
                        .flatten()
                        .copied()
                        .filter(|f| unplaced.contains(f) && !sheet.contains(f))
                        .filter(|&f| admissible(graph, &sheet, f, &placed_lines))
                        .collect();
                    if let Some(&first) = candidates.first() {
                        stack.push(Choice {
                            sheet: sheet.clone(),
                            candidates,
                            next: 1,
                        });
                        sheet.insert(first);
                        continue;
                    }
                }
            }

            // Backtrack to the most recent choice with an untried candidate.
            loop {
                let Some(choice) = stack.last_mut() else {
                    return Ok(None);
                };
                if choice.next < choice.candidates.len() {
                    sheet = choice.sheet.clone();
                    sheet.insert(choice.candidates[choice.next]);
                    choice.next += 1;
                    break;
                }
                stack.pop();
            }
        }
    }

    /// Finds the cycle a completed sheet splits in two.
    fn try_commit(
        &self,
        graph: &ColoredGraph,
        used_facets: &NodeSet,
        sheet: &NodeSet,
        placed_lines: &NodeSet,
    ) -> Option<CycleSplit> {
        let attachments: NodeSet = sheet_lines(graph, sheet)
            .into_keys()
            .filter(|l| placed_lines.contains(l))
            .collect();
        if attachments.is_empty() {
            return None;
        }

        let mut candidates: Vec<usize> = (0..self.cycles.len())
            .filter(|&i| attachments.iter().all(|&l| self.cycles[i].contains(l)))
            .collect();
        candidates.sort_by_key(|&i| {
            let boundary = self.cycles[i]
                .facet_nodes()
                .filter(|f| used_facets.contains(f))
                .count();
            (std::cmp::Reverse(boundary), i)
        });

        for index in candidates {
            let groups = self.cycles[index].facet_components(&attachments);
            if groups.len() < 2 {
                continue;
            }
            if groups.len() > MAX_SPLIT_GROUPS {
                tracing::warn!(
                    element = self.element,
                    cycle = index,
                    groups = groups.len(),
                    "too many facet groups to partition"
                );
                continue;
            }
            if let Some((first, second)) = partition_groups(graph, &groups, sheet) {
                return Some(CycleSplit {
                    index,
                    first,
                    second,
                });
            }
        }
        None
    }

    fn placed_lines(&self) -> NodeSet {
        self.cycles
            .iter()
            .flat_map(|c| c.line_nodes())
            .collect()
    }

    fn failure(&self, node: usize, reason: impl Into<String>) -> Error {
        let reason = reason.into();
        tracing::error!(element = self.element, node, %reason, "cycle search failed");
        Error::CycleSearchFailed {
            element: self.element,
            node,
            reason,
        }
    }

    /// Merges a closed shell into the cycle at `index`.
    pub fn attach(&mut self, index: usize, shell: &ColoredGraph) -> Result<()> {
        if index >= self.cycles.len() {
            let node = shell.nodes().next().unwrap_or_default();
            return Err(self.failure(node, format!("no cycle {index} to attach shell to")));
        }
        self.cycles[index].merge(shell)
    }

    /// Appends a cycle.
    pub fn push(&mut self, cycle: ColoredGraph) {
        self.cycles.push(cycle);
    }

    /// Removes and returns the floating shells found by `add_points`.
    pub fn take_floating(&mut self) -> Vec<ColoredGraph> {
        std::mem::take(&mut self.floating)
    }

    pub fn cycles(&self) -> &[ColoredGraph] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColoredGraph> {
        self.cycles.iter()
    }

    /// Number of search steps spent so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl<'a> IntoIterator for &'a CycleList {
    type Item = &'a ColoredGraph;
    type IntoIter = std::slice::Iter<'a, ColoredGraph>;

    fn into_iter(self) -> Self::IntoIter {
        self.cycles.iter()
    }
}

/// Upper bound on the facet groups a sheet may cut a cycle into. Partitions
/// are enumerated exhaustively.
const MAX_SPLIT_GROUPS: usize = 12;

/// Distributes the facet groups of a cycle onto two sides of a sheet.
///
/// The first group always lies on the first side; the remaining groups are
/// assigned by the bits of an ascending mask. The first assignment for which
/// both `side ∪ sheet` and `rest ∪ sheet` are cycles wins.
fn partition_groups(
    graph: &ColoredGraph,
    groups: &[NodeSet],
    sheet: &NodeSet,
) -> Option<(ColoredGraph, ColoredGraph)> {
    let others = groups.len() - 1;
    let full = (1usize << others) - 1;
    for mask in 0..full {
        let mut side = sheet.clone();
        let mut rest = sheet.clone();
        for (i, group) in groups.iter().enumerate() {
            let on_side = i == 0 || mask & (1 << (i - 1)) != 0;
            if on_side {
                side.extend(group.iter().copied());
            } else {
                rest.extend(group.iter().copied());
            }
        }
        let first = graph.induced_by_facets(&side);
        let second = graph.induced_by_facets(&rest);
        if first.test_cycle().is_ok() && second.test_cycle().is_ok() {
            return Some((first, second));
        }
    }
    None
}

/// Counts how many sheet facets border each line.
fn sheet_lines(graph: &ColoredGraph, sheet: &NodeSet) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &f in sheet {
        for &line in graph.neighbors(f).into_iter().flatten() {
            *counts.entry(line).or_insert(0) += 1;
        }
    }
    counts
}

/// Lowest unplaced line bordered by exactly one sheet facet.
fn open_line(graph: &ColoredGraph, sheet: &NodeSet, placed_lines: &NodeSet) -> Option<usize> {
    sheet_lines(graph, sheet)
        .into_iter()
        .find(|(line, count)| *count == 1 && !placed_lines.contains(line))
        .map(|(line, _)| line)
}

/// A facet may join the sheet if no attachment line gets a second sheet
/// facet and no internal line a third.
fn admissible(graph: &ColoredGraph, sheet: &NodeSet, facet: usize, placed_lines: &NodeSet) -> bool {
    let counts = sheet_lines(graph, sheet);
    graph.neighbors(facet).into_iter().flatten().all(|line| {
        let count = counts.get(line).copied().unwrap_or(0) + 1;
        let limit = if placed_lines.contains(line) { 1 } else { 2 };
        count <= limit
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a graph from facet rows. Lines are numbered from `split`.
    fn graph_from(split: usize, rows: &[&[usize]]) -> ColoredGraph {
        let mut g = ColoredGraph::new(split);
        for (facet, row) in rows.iter().enumerate() {
            for &line in row.iter() {
                g.add(facet, line).unwrap();
            }
        }
        g
    }

    /// Box split in two by one internal facet.
    ///
    /// Facets: 0..4 are the ring around the cut, 4 and 5 the two caps,
    /// 6 the cut. Lines 7..: ring edges against cap 4 (7..11), ring edges
    /// against cap 5 (11..15), vertical ring edges on side A (15..19) and
    /// side B (19..23); the cut meets the ring at lines 23..27.
    ///
    /// To keep the example small, each ring face is modelled as two halves
    /// (A and B) around the cut line.
    fn split_box() -> (ColoredGraph, ColoredGraph, NodeSet) {
        // Facets 0..4: ring halves on side A, 4..8: ring halves on side B,
        // 8: cap A, 9: cap B, 10: cut facet.
        let split = 11;
        let l = |i: usize| split + i;
        let rows: Vec<Vec<usize>> = vec![
            // ring A_k: cap A edge l(k), vertical A edge l(4 + k), l(4 + (k+1)%4), cut line l(12 + k)
            vec![l(0), l(4), l(5), l(12)],
            vec![l(1), l(5), l(6), l(13)],
            vec![l(2), l(6), l(7), l(14)],
            vec![l(3), l(7), l(4), l(15)],
            // ring B_k: cap B edge l(8 + k), vertical B edge l(16 + k), l(16 + (k+1)%4), cut line l(12 + k)
            vec![l(8), l(16), l(17), l(12)],
            vec![l(9), l(17), l(18), l(13)],
            vec![l(10), l(18), l(19), l(14)],
            vec![l(11), l(19), l(16), l(15)],
            // cap A, cap B
            vec![l(0), l(1), l(2), l(3)],
            vec![l(8), l(9), l(10), l(11)],
            // cut
            vec![l(12), l(13), l(14), l(15)],
        ];
        let row_refs: Vec<&[usize]> = rows.iter().map(|r| r.as_slice()).collect();
        let graph = graph_from(split, &row_refs);

        let boundary: NodeSet = (0..10).collect();
        let used = graph.induced_by_facets(&boundary);
        let free: NodeSet = graph.all_nodes().difference(&used.all_nodes()).copied().collect();
        (graph, used, free)
    }

    #[test]
    fn boundary_only_gives_one_cycle() {
        let (graph, _, _) = split_box();
        let boundary: NodeSet = (0..10).collect();
        let used = graph.induced_by_facets(&boundary);

        let mut list = CycleList::new(1);
        list.add_points(&graph, &used, &NodeSet::new(), 100).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.cycles()[0].facet_count(), 10);
    }

    #[test]
    fn single_cut_splits_box_in_two() {
        let (graph, used, free) = split_box();
        assert_eq!(free, [10].into_iter().collect());

        let mut list = CycleList::new(1);
        list.add_points(&graph, &used, &free, 100).unwrap();
        assert_eq!(list.len(), 2);

        let facets: Vec<NodeSet> = list.iter().map(|c| c.facet_nodes().collect()).collect();
        assert_eq!(facets[0], [0, 1, 2, 3, 8, 10].into_iter().collect());
        assert_eq!(facets[1], [4, 5, 6, 7, 9, 10].into_iter().collect());
        for cycle in &list {
            cycle.test_cycle().unwrap();
        }
    }

    #[test]
    fn every_node_is_covered() {
        let (graph, used, free) = split_box();
        let mut list = CycleList::new(1);
        list.add_points(&graph, &used, &free, 100).unwrap();

        let mut covered = NodeSet::new();
        for cycle in &list {
            covered.extend(cycle.nodes());
        }
        assert_eq!(covered, graph.all_nodes());
    }

    #[test]
    fn open_boundary_is_rejected() {
        let (graph, _, _) = split_box();
        // Drop cap B from the boundary.
        let boundary: NodeSet = (0..9).collect();
        let used = graph.induced_by_facets(&boundary);
        let mut list = CycleList::new(1);
        assert!(matches!(
            list.add_points(&graph, &used, &NodeSet::new(), 100),
            Err(Error::GraphNotClosed { .. })
        ));
    }

    #[test]
    fn step_budget_is_enforced() {
        let (graph, used, free) = split_box();
        let mut list = CycleList::new(5);
        assert!(matches!(
            list.add_points(&graph, &used, &free, 0),
            Err(Error::CycleSearchFailed { element: 5, .. })
        ));
    }

    #[test]
    fn floating_shell_is_set_aside() {
        // Two facets sharing all three lines of a triangle float inside a
        // tetrahedron boundary.
        let split = 6;
        let rows: &[&[usize]] = &[
            &[6, 7, 8],
            &[6, 9, 10],
            &[7, 9, 11],
            &[8, 10, 11],
            &[12, 13, 14],
            &[12, 13, 14],
        ];
        let graph = graph_from(split, rows);
        let used = graph.induced_by_facets(&(0..4).collect());
        let free: NodeSet = graph.all_nodes().difference(&used.all_nodes()).copied().collect();

        let mut list = CycleList::new(1);
        list.add_points(&graph, &used, &free, 100).unwrap();
        assert_eq!(list.len(), 1);

        let floating = list.take_floating();
        assert_eq!(floating.len(), 1);
        assert_eq!(floating[0].facet_count(), 2);

        list.attach(0, &floating[0]).unwrap();
        list.push(floating[0].clone());
        assert_eq!(list.cycles()[0].facet_count(), 6);
        assert_eq!(list.len(), 2);
        assert!(list.take_floating().is_empty());
    }

    #[test]
    fn open_floating_surface_fails() {
        let split = 5;
        let rows: &[&[usize]] = &[
            &[5, 6, 7],
            &[5, 8, 9],
            &[6, 8, 10],
            &[7, 9, 10],
            // Free facet whose lines touch nothing else.
            &[11, 12, 13],
        ];
        let graph = graph_from(split, rows);
        let used = graph.induced_by_facets(&(0..4).collect());
        let free: NodeSet = graph.all_nodes().difference(&used.all_nodes()).copied().collect();

        let mut list = CycleList::new(3);
        assert!(matches!(
            list.add_points(&graph, &used, &free, 100),
            Err(Error::CycleSearchFailed { element: 3, node: 4, .. })
        ));
    }

    #[test]
    fn groups_are_partitioned_across_the_sheet() {
        // Sheet 3 borders lines 4 and 5. Group 0 only reaches line 4, so it
        // needs group 1 on its side to close.
        let split = 4;
        let rows: &[&[usize]] = &[&[4], &[5], &[4, 5], &[4, 5]];
        let graph = graph_from(split, rows);
        let groups: Vec<NodeSet> = (0..3).map(|f| NodeSet::from([f])).collect();
        let sheet = NodeSet::from([3]);

        let (first, second) = partition_groups(&graph, &groups, &sheet).unwrap();
        assert_eq!(first.facet_nodes().collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(second.facet_nodes().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn unbalanced_groups_have_no_partition() {
        let split = 3;
        let rows: &[&[usize]] = &[&[3], &[3, 4], &[3, 4]];
        let graph = graph_from(split, rows);
        let groups: Vec<NodeSet> = vec![NodeSet::from([0]), NodeSet::from([1])];
        assert!(partition_groups(&graph, &groups, &NodeSet::from([2])).is_none());
    }
}
