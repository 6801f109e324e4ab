//! Cell and face connectivity reconstruction.
//!
//! This module turns RESQML topology into a VTK-style cell stream ([`CellConnectivity`]):
//! - [`corner`] maps IJK cell corners to indices in a worker's point buffer,
//! - [`cells`] emits one record per IJK cell of the owned K-slab,
//! - [`unstructured`] resolves face-defined cells into optimized or polyhedral cells,
//! - [`faces`] emits polygons for face subsets.
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod cells;
pub mod corner;
pub mod faces;
pub mod unstructured;

pub use cells::{active_cell_mask, build_cells};
pub use corner::{corner_node_index, CornerMapper, CORRESPONDING_RESQML_CORNER_ID};
pub use unstructured::{build_unstructured_cells, UnstructuredTopology};

/// Cell types emitted by the reconstruction, with their VTK identifiers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Blanked placeholder keeping positional cell indices aligned.
    Empty,
    Triangle,
    Quad,
    Polygon,
    Tetrahedron,
    Pyramid,
    Wedge,
    Hexahedron,
    Polyhedron,
}

impl CellType {
    pub fn vtk_id(&self) -> u8 {
        match self {
            CellType::Empty => 0,
            CellType::Triangle => 5,
            CellType::Polygon => 7,
            CellType::Quad => 9,
            CellType::Tetrahedron => 10,
            CellType::Hexahedron => 12,
            CellType::Wedge => 13,
            CellType::Pyramid => 14,
            CellType::Polyhedron => 42,
        }
    }

    /// Polygon type for a face of `node_count` nodes.
    pub fn polygon(node_count: usize) -> CellType {
        match node_count {
            3 => CellType::Triangle,
            4 => CellType::Quad,
            _ => CellType::Polygon,
        }
    }
}

/// Cell stream: types, offsets into a flat connectivity array, and polyhedron face lists.
///
/// Node indices refer to positions in the point buffer the stream was built against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellConnectivity {
    types: Vec<CellType>,
    offsets: Vec<usize>,
    connectivity: Vec<u64>,
    polyhedron_faces: BTreeMap<usize, Vec<Vec<u64>>>,
}

impl CellConnectivity {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(cells: usize, nodes: usize) -> Self {
        let mut offsets = Vec::with_capacity(cells + 1);
        offsets.push(0);
        Self {
            types: Vec::with_capacity(cells),
            offsets,
            connectivity: Vec::with_capacity(nodes),
            polyhedron_faces: BTreeMap::new(),
        }
    }

    pub fn push_empty(&mut self) {
        self.push_cell(CellType::Empty, &[]);
    }

    pub fn push_cell(&mut self, cell_type: CellType, nodes: &[u64]) {
        self.types.push(cell_type);
        self.connectivity.extend_from_slice(nodes);
        self.offsets.push(self.connectivity.len());
    }

    /// Appends a generic polyhedron from its distinct nodes and face node lists.
    pub fn push_polyhedron(&mut self, nodes: &[u64], faces: Vec<Vec<u64>>) {
        self.polyhedron_faces.insert(self.types.len(), faces);
        self.push_cell(CellType::Polyhedron, nodes);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn cell_type(&self, cell: usize) -> CellType {
        self.types[cell]
    }

    pub fn cell_nodes(&self, cell: usize) -> &[u64] {
        &self.connectivity[self.offsets[cell]..self.offsets[cell + 1]]
    }

    pub fn polyhedron_faces(&self, cell: usize) -> Option<&[Vec<u64>]> {
        self.polyhedron_faces.get(&cell).map(Vec::as_slice)
    }

    pub fn types(&self) -> &[CellType] {
        &self.types
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn connectivity(&self) -> &[u64] {
        &self.connectivity
    }

    /// Number of records that are not blanked placeholders.
    pub fn active_count(&self) -> usize {
        self.types.iter().filter(|t| **t != CellType::Empty).count()
    }

    pub fn count_of(&self, cell_type: CellType) -> usize {
        self.types.iter().filter(|t| **t == cell_type).count()
    }

    /// VTK face stream of a polyhedron: face count, then each face's size and nodes.
    pub fn face_stream(&self, cell: usize) -> Option<Vec<u64>> {
        let faces = self.polyhedron_faces.get(&cell)?;
        let mut stream = vec![faces.len() as u64];
        for face in faces {
            stream.push(face.len() as u64);
            stream.extend_from_slice(face);
        }
        Some(stream)
    }
}
