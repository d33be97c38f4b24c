// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Cutcell
//!
//! Decomposition of cut finite elements into volume cells.
//!
//! A background element intersected by cutting surfaces is described by its
//! facets: planar polygons lying either on the element's own faces or on a
//! cutting side. Facets sharing a boundary segment are linked through a
//! bipartite facet/line graph; every closed cycle of that graph bounds one
//! volume cell.
//!
//! ```
//! use cutcell::builders::{add_hex8, cut_with_planes, CutPlane, UNIT_CUBE};
//! use cutcell::{GraphOptions, Mesh};
//!
//! let mut mesh = Mesh::new();
//! let hex = add_hex8(&mut mesh, 1, &UNIT_CUBE)?;
//! cut_with_planes(&mut mesh, hex, &[CutPlane::new([1.0, 0.0, 0.0], 0.5)], 100, 1e-9)?;
//!
//! let cells = mesh.cut_element(hex, &GraphOptions::default())?;
//! assert_eq!(cells.len(), 2);
//! # Ok::<(), cutcell::Error>(())
//! ```
//!
//! Entities live in a slot-map arena ([`Mesh`]) and refer to each other by
//! generational keys. All sets and maps are ordered by key, which makes the
//! decomposition deterministic for a given construction order.

pub mod builders;
pub mod colored_graph;
pub mod config;
pub mod construction;
pub mod cycle_list;
pub mod error;
pub mod facet_graph;
pub mod geometry;
pub mod gmsh;
pub mod keys;
pub mod mesh;
pub mod serialization;
pub mod shape;
pub mod simple_graph;
pub mod traversal;

pub use colored_graph::{ColoredGraph, NodeSet};
pub use config::GraphOptions;
pub use cycle_list::CycleList;
pub use error::{Error, Result};
pub use facet_graph::{create, CutCellGraph, FacetGraph, GraphKind, NodeValue};
pub use keys::{
    ElementKey, EntityKey, EntityType, FacetKey, FacetSet, Line, LineMap, PointKey, SideKey,
    VolumeCellKey,
};
pub use mesh::{Mesh, SideKind};
pub use shape::ElementShape;
pub use simple_graph::{SimpleFacetGraph1D, SimpleFacetGraph2D};
