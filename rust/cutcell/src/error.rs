// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for cut-cell construction.

use crate::keys::*;

/// Result type alias for cut-cell operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or decomposing a cut element.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Point key not found in the mesh.
    #[error("point not found: {0:?}")]
    PointNotFound(PointKey),

    /// Side key not found in the mesh.
    #[error("side not found: {0:?}")]
    SideNotFound(SideKey),

    /// Facet key not found in the mesh.
    #[error("facet not found: {0:?}")]
    FacetNotFound(FacetKey),

    /// Element key not found in the mesh.
    #[error("element not found: {0:?}")]
    ElementNotFound(ElementKey),

    /// Volume cell key not found in the mesh.
    #[error("volume cell not found: {0:?}")]
    VolumeCellNotFound(VolumeCellKey),

    /// A line needs two distinct endpoints.
    #[error("line endpoints coincide at point {0:?}")]
    DegenerateLine(PointKey),

    /// A facet has too few points or repeats a point.
    #[error("degenerate facet {facet:?}: {reason}")]
    DegenerateFacet {
        facet: Option<FacetKey>,
        reason: String,
    },

    /// A hole must lie on the same side as its parent and have no parent yet.
    #[error("facet {hole:?} cannot be a hole of {parent:?}: {reason}")]
    InvalidHole {
        parent: FacetKey,
        hole: FacetKey,
        reason: &'static str,
    },

    /// An element's node or side list does not match its shape.
    #[error("invalid element {id}: {reason}")]
    InvalidElement { id: i32, reason: String },

    /// Facet-facet or line-line edges are not allowed in a colored graph.
    #[error("edge {0} -- {1} connects two nodes of the same color")]
    SameColorEdge(usize, usize),

    /// The colored graph violates its closedness invariant.
    #[error("graph not closed at node {node}: {reason}")]
    GraphNotClosed { node: usize, reason: String },

    /// No consistent cycle decomposition exists for the graph.
    #[error("cycle search failed for element {element} at graph node {node}: {reason}")]
    CycleSearchFailed {
        element: i32,
        node: usize,
        reason: String,
    },

    /// A facet was claimed by more than two volume cells.
    #[error("facet {facet:?} of element {element} is used by {count} volume cells (at most 2 allowed)")]
    FacetOverused {
        element: i32,
        facet: FacetKey,
        count: usize,
    },

    /// A cycle has too few facets to bound a volume of the element's dimension.
    #[error("volume cell of element {element} has {found} facets, at least {required} required")]
    TooFewFacets {
        element: i32,
        found: usize,
        required: usize,
    },

    /// Cut-cell graphs exist only for 1D, 2D and 3D host elements.
    #[error("unsupported element dimension: {0}")]
    UnsupportedDimension(u8),

    /// A cutting plane coincides with an element face.
    #[error("cutting plane is coplanar with side {0:?}")]
    CoplanarCut(SideKey),

    /// Writing a diagnostic dump failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn degenerate_facet(facet: Option<FacetKey>, reason: impl Into<String>) -> Self {
        Error::DegenerateFacet {
            facet,
            reason: reason.into(),
        }
    }
}
