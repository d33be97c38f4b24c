// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-colored undirected graph over integer nodes.
//!
//! Nodes below `split` are facets, nodes at or above `split` are lines. Edges
//! only ever connect a facet to a line, so the graph is bipartite by
//! construction. Adjacency is stored in ordered sets, which makes every
//! traversal below deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::error::{Error, Result};

/// Ordered set of graph nodes.
pub type NodeSet = BTreeSet<usize>;

/// Bipartite facet/line graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColoredGraph {
    split: usize,
    graph: BTreeMap<usize, NodeSet>,
}

impl ColoredGraph {
    /// Creates an empty graph whose facet nodes are `0..split`.
    pub fn new(split: usize) -> Self {
        Self {
            split,
            graph: BTreeMap::new(),
        }
    }

    /// First line node id.
    pub fn split(&self) -> usize {
        self.split
    }

    /// Returns `true` for facet nodes.
    pub fn is_facet(&self, node: usize) -> bool {
        node < self.split
    }

    /// Adds the undirected edge `a -- b`.
    pub fn add(&mut self, a: usize, b: usize) -> Result<()> {
        if self.is_facet(a) == self.is_facet(b) {
            return Err(Error::SameColorEdge(a, b));
        }
        self.graph.entry(a).or_default().insert(b);
        self.graph.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Adds an edge from `node` to every node of `row`.
    pub fn add_row(&mut self, node: usize, row: &NodeSet) -> Result<()> {
        for &other in row {
            self.add(node, other)?;
        }
        Ok(())
    }

    /// Adds every edge of `other`.
    pub fn merge(&mut self, other: &ColoredGraph) -> Result<()> {
        for (&node, row) in &other.graph {
            self.add_row(node, row)?;
        }
        Ok(())
    }

    /// Removes a node together with all its edges.
    pub fn remove_node(&mut self, node: usize) {
        if let Some(row) = self.graph.remove(&node) {
            for other in row {
                if let Some(other_row) = self.graph.get_mut(&other) {
                    other_row.remove(&node);
                    if other_row.is_empty() {
                        self.graph.remove(&other);
                    }
                }
            }
        }
    }

    pub fn contains(&self, node: usize) -> bool {
        self.graph.contains_key(&node)
    }

    pub fn neighbors(&self, node: usize) -> Option<&NodeSet> {
        self.graph.get(&node)
    }

    pub fn degree(&self, node: usize) -> usize {
        self.graph.get(&node).map_or(0, |row| row.len())
    }

    /// Number of nodes with at least one edge.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Iterates over all nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.graph.keys().copied()
    }

    pub fn all_nodes(&self) -> NodeSet {
        self.graph.keys().copied().collect()
    }

    pub fn facet_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.graph.range(..self.split).map(|(&n, _)| n)
    }

    pub fn line_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.graph.range(self.split..).map(|(&n, _)| n)
    }

    pub fn facet_count(&self) -> usize {
        self.facet_nodes().count()
    }

    /// Subgraph made of the given facets and all lines they border.
    ///
    /// Facets absent from this graph are ignored.
    pub fn induced_by_facets(&self, facets: &NodeSet) -> ColoredGraph {
        let mut sub = ColoredGraph::new(self.split);
        for &f in facets {
            if let Some(row) = self.graph.get(&f) {
                for &line in row {
                    sub.graph.entry(f).or_default().insert(line);
                    sub.graph.entry(line).or_default().insert(f);
                }
            }
        }
        sub
    }

    /// Groups facets that are connected through lines not in `blocked`.
    ///
    /// Groups are returned in order of their smallest facet.
    pub fn facet_components(&self, blocked: &NodeSet) -> Vec<NodeSet> {
        let mut seen = NodeSet::new();
        let mut groups = Vec::new();

        for start in self.facet_nodes() {
            if seen.contains(&start) {
                continue;
            }
            let mut group = NodeSet::new();
            let mut queue = VecDeque::from([start]);
            seen.insert(start);

            while let Some(facet) = queue.pop_front() {
                group.insert(facet);
                let Some(row) = self.graph.get(&facet) else {
                    continue;
                };
                for line in row.iter().filter(|l| !blocked.contains(l)) {
                    if let Some(facets) = self.graph.get(line) {
                        for &next in facets {
                            if seen.insert(next) {
                                queue.push_back(next);
                            }
                        }
                    }
                }
            }
            groups.push(group);
        }
        groups
    }

    /// Splits the graph into its connected components.
    pub fn components(&self) -> Vec<ColoredGraph> {
        self.facet_components(&NodeSet::new())
            .iter()
            .map(|facets| self.induced_by_facets(facets))
            .collect()
    }

    /// Checks structural consistency: every edge is recorded on both ends,
    /// joins two colors, and every line borders at least two facets.
    pub fn test_closed(&self) -> Result<()> {
        for (&node, row) in &self.graph {
            if row.is_empty() {
                return Err(not_closed(node, "isolated node"));
            }
            for &other in row {
                if self.is_facet(node) == self.is_facet(other) {
                    return Err(Error::SameColorEdge(node, other));
                }
                let mutual = self
                    .graph
                    .get(&other)
                    .is_some_and(|other_row| other_row.contains(&node));
                if !mutual {
                    return Err(not_closed(node, format!("half edge to {other}")));
                }
            }
            if !self.is_facet(node) && row.len() < 2 {
                return Err(not_closed(node, "line borders fewer than two facets"));
            }
        }
        Ok(())
    }

    /// Checks that the graph bounds a single closed region: closed, and every
    /// line borders exactly two facets.
    pub fn test_cycle(&self) -> Result<()> {
        self.test_closed()?;
        for line in self.line_nodes() {
            let count = self.degree(line);
            if count != 2 {
                return Err(not_closed(
                    line,
                    format!("line borders {count} facets inside cycle"),
                ));
            }
        }
        Ok(())
    }
}

fn not_closed(node: usize, reason: impl Into<String>) -> Error {
    Error::GraphNotClosed {
        node,
        reason: reason.into(),
    }
}

impl fmt::Display for ColoredGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph split={} nodes={}", self.split, self.graph.len())?;
        for (node, row) in &self.graph {
            let tag = if self.is_facet(*node) { 'f' } else { 'l' };
            write!(f, "  {tag}{node}:")?;
            for other in row {
                write!(f, " {other}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tetrahedron boundary: facets 0..4, lines 4..10.
    fn tetrahedron() -> ColoredGraph {
        let mut g = ColoredGraph::new(4);
        // Each pair of facets shares one line.
        let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        for (i, (a, b)) in pairs.iter().enumerate() {
            g.add(*a, 4 + i).unwrap();
            g.add(*b, 4 + i).unwrap();
        }
        g
    }

    #[test]
    fn add_is_symmetric() {
        let mut g = ColoredGraph::new(2);
        g.add(0, 5).unwrap();
        assert!(g.neighbors(0).unwrap().contains(&5));
        assert!(g.neighbors(5).unwrap().contains(&0));
        assert_eq!(g.facet_nodes().collect::<Vec<_>>(), vec![0]);
        assert_eq!(g.line_nodes().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn same_color_edges_are_rejected() {
        let mut g = ColoredGraph::new(2);
        assert!(matches!(g.add(0, 1), Err(Error::SameColorEdge(0, 1))));
        assert!(matches!(g.add(3, 4), Err(Error::SameColorEdge(3, 4))));
    }

    #[test]
    fn tetrahedron_is_a_cycle() {
        let g = tetrahedron();
        g.test_closed().unwrap();
        g.test_cycle().unwrap();
        assert_eq!(g.components().len(), 1);
        assert_eq!(g.facet_count(), 4);
    }

    #[test]
    fn dangling_line_is_not_closed() {
        let mut g = tetrahedron();
        g.add(0, 20).unwrap();
        assert!(matches!(
            g.test_closed(),
            Err(Error::GraphNotClosed { node: 20, .. })
        ));
    }

    #[test]
    fn half_edge_is_not_closed() {
        let mut g = tetrahedron();
        g.graph.get_mut(&0).unwrap().insert(30);
        g.graph.entry(30).or_default();
        assert!(g.test_closed().is_err());
    }

    #[test]
    fn triple_line_is_closed_but_not_a_cycle() {
        let mut g = ColoredGraph::new(5);
        let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        for (i, (a, b)) in pairs.iter().enumerate() {
            g.add(*a, 5 + i).unwrap();
            g.add(*b, 5 + i).unwrap();
        }
        // Facet 4 hangs on line 5 and closes against facet 0 via line 11.
        g.add(4, 5).unwrap();
        g.add(4, 11).unwrap();
        g.add(0, 11).unwrap();

        g.test_closed().unwrap();
        assert!(matches!(
            g.test_cycle(),
            Err(Error::GraphNotClosed { node: 5, .. })
        ));
    }

    #[test]
    fn facet_components_respect_blocked_lines() {
        let g = tetrahedron();
        // Blocking every line around facet 0 isolates it.
        let blocked: NodeSet = [4, 5, 6].into_iter().collect();
        let groups = g.facet_components(&blocked);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], [0].into_iter().collect());
        assert_eq!(groups[1], [1, 2, 3].into_iter().collect());
    }

    #[test]
    fn induced_subgraph_keeps_full_rows() {
        let g = tetrahedron();
        let sub = g.induced_by_facets(&[0, 1].into_iter().collect());
        assert_eq!(sub.facet_count(), 2);
        // Facets 0 and 1 border 5 distinct lines.
        assert_eq!(sub.line_nodes().count(), 5);
        assert_eq!(sub.degree(4), 2);
        assert!(sub.test_cycle().is_err());
    }

    #[test]
    fn remove_node_drops_edges() {
        let mut g = tetrahedron();
        g.remove_node(0);
        assert!(!g.contains(0));
        assert_eq!(g.degree(4), 1);
        assert!(g.test_closed().is_err());
    }
}
