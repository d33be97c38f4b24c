// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background element shapes.

use serde::{Deserialize, Serialize};

/// Shape of a background element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementShape {
    /// 0D point element.
    Point1,
    /// 2-node line.
    Line2,
    /// 3-node triangle.
    Tri3,
    /// 4-node quadrilateral.
    Quad4,
    /// 4-node tetrahedron.
    Tet4,
    /// 8-node hexahedron.
    Hex8,
    /// 6-node wedge (prism).
    Wedge6,
    /// 5-node pyramid.
    Pyramid5,
}

impl ElementShape {
    /// Returns the topological dimension of the element.
    pub fn dim(self) -> u8 {
        match self {
            ElementShape::Point1 => 0,
            ElementShape::Line2 => 1,
            ElementShape::Tri3 | ElementShape::Quad4 => 2,
            ElementShape::Tet4
            | ElementShape::Hex8
            | ElementShape::Wedge6
            | ElementShape::Pyramid5 => 3,
        }
    }

    /// Number of corner nodes.
    pub fn node_count(self) -> usize {
        match self {
            ElementShape::Point1 => 1,
            ElementShape::Line2 => 2,
            ElementShape::Tri3 => 3,
            ElementShape::Quad4 => 4,
            ElementShape::Tet4 => 4,
            ElementShape::Hex8 => 8,
            ElementShape::Wedge6 => 6,
            ElementShape::Pyramid5 => 5,
        }
    }

    /// Returns the shape name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementShape::Point1 => "point1",
            ElementShape::Line2 => "line2",
            ElementShape::Tri3 => "tri3",
            ElementShape::Quad4 => "quad4",
            ElementShape::Tet4 => "tet4",
            ElementShape::Hex8 => "hex8",
            ElementShape::Wedge6 => "wedge6",
            ElementShape::Pyramid5 => "pyramid5",
        }
    }

    /// Scalar primitive tag used in Gmsh `.pos` views.
    pub fn gmsh_tag(self) -> &'static str {
        match self {
            ElementShape::Point1 => "SP",
            ElementShape::Line2 => "SL",
            ElementShape::Tri3 => "ST",
            ElementShape::Quad4 => "SQ",
            ElementShape::Tet4 => "SS",
            ElementShape::Hex8 => "SH",
            ElementShape::Wedge6 => "SI",
            ElementShape::Pyramid5 => "SY",
        }
    }
}

impl std::fmt::Display for ElementShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions() {
        assert_eq!(ElementShape::Point1.dim(), 0);
        assert_eq!(ElementShape::Line2.dim(), 1);
        assert_eq!(ElementShape::Quad4.dim(), 2);
        assert_eq!(ElementShape::Hex8.dim(), 3);
        assert_eq!(ElementShape::Pyramid5.dim(), 3);
    }

    #[test]
    fn gmsh_tags() {
        assert_eq!(ElementShape::Hex8.gmsh_tag(), "SH");
        assert_eq!(ElementShape::Wedge6.gmsh_tag(), "SI");
        assert_eq!(ElementShape::Hex8.node_count(), 8);
    }
}
