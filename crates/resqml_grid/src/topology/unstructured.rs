//! Cell reconstruction for face-defined unstructured grids.
//!
//! Each cell arrives as a list of faces, each face as a node loop plus a flag telling
//! whether its right-hand normal points out of the cell. Cells whose face signature is that
//! of a tetrahedron, pyramid, wedge or hexahedron are rebuilt as the matching VTK cell,
//! with nodes ordered the way VTK expects:
//! - tetrahedron, pyramid and hexahedron bases wind so that their normal points inside,
//! - the wedge base winds so that its normal points away from the opposite triangle,
//! - every other corner sits across a side edge from its base node.
//!
//! Anything else is kept as a generic polyhedron with outward-wound faces.
use std::collections::BTreeSet;

use tracing::debug;

use crate::accessor::{CellShape, UnstructuredGridAccessor};
use crate::error::{Error, Result};
use crate::events::{emit_warning, EventSink};
use crate::topology::faces::prefix_span;
use crate::topology::{CellConnectivity, CellType};

/// Face-based topology of an unstructured grid, read once.
#[derive(Clone, Debug)]
pub struct UnstructuredTopology {
    shape: CellShape,
    point_count: u64,
    cumulative_face_count_per_cell: Vec<u64>,
    face_indices_of_cells: Vec<u64>,
    cell_face_is_right_handed: Vec<bool>,
    cumulative_node_count_per_face: Vec<u64>,
    node_indices_of_faces: Vec<u64>,
}

/// Outcome of rebuilding one cell.
#[derive(Clone, Debug, PartialEq)]
pub enum ReconstructedCell {
    Optimized(CellType, Vec<u64>),
    Polyhedron {
        nodes: Vec<u64>,
        faces: Vec<Vec<u64>>,
    },
}

impl ReconstructedCell {
    pub fn cell_type(&self) -> CellType {
        match self {
            ReconstructedCell::Optimized(cell_type, _) => *cell_type,
            ReconstructedCell::Polyhedron { .. } => CellType::Polyhedron,
        }
    }

    fn push_into(self, cells: &mut CellConnectivity) {
        match self {
            ReconstructedCell::Optimized(cell_type, nodes) => cells.push_cell(cell_type, &nodes),
            ReconstructedCell::Polyhedron { nodes, faces } => cells.push_polyhedron(&nodes, faces),
        }
    }
}

struct CellFace<'a> {
    nodes: &'a [u64],
    outward: bool,
}

impl CellFace<'_> {
    /// Node loop wound so that its normal points into the cell.
    fn inward(&self) -> Vec<u64> {
        let mut nodes = self.nodes.to_vec();
        if self.outward {
            nodes.reverse();
        }
        nodes
    }

    fn outward(&self) -> Vec<u64> {
        let mut nodes = self.nodes.to_vec();
        if !self.outward {
            nodes.reverse();
        }
        nodes
    }

    fn node_set(&self) -> BTreeSet<u64> {
        self.nodes.iter().copied().collect()
    }
}

impl UnstructuredTopology {
    /// Reads and cross-checks the face arrays of `grid`.
    pub fn read(grid: &dyn UnstructuredGridAccessor) -> Result<Self> {
        let topology = Self {
            shape: grid.cell_shape(),
            point_count: grid.xyz_point_count_of_all_patches(),
            cumulative_face_count_per_cell: grid.cumulative_face_count_per_cell()?,
            face_indices_of_cells: grid.face_indices_of_cells()?,
            cell_face_is_right_handed: grid.cell_face_is_right_handed()?,
            cumulative_node_count_per_face: grid.cumulative_node_count_per_face()?,
            node_indices_of_faces: grid.node_indices_of_faces()?,
        };
        check_cumulative(
            "faces per cell",
            &topology.cumulative_face_count_per_cell,
            grid.cell_count(),
            topology.face_indices_of_cells.len(),
        )?;
        check_cumulative(
            "nodes per face",
            &topology.cumulative_node_count_per_face,
            grid.face_count(),
            topology.node_indices_of_faces.len(),
        )?;
        if topology.cell_face_is_right_handed.len() != topology.face_indices_of_cells.len() {
            return Err(Error::Data(format!(
                "{} face orientation flags for {} cell faces",
                topology.cell_face_is_right_handed.len(),
                topology.face_indices_of_cells.len()
            )));
        }
        Ok(topology)
    }

    pub fn shape(&self) -> CellShape {
        self.shape
    }

    pub fn cell_count(&self) -> u64 {
        self.cumulative_face_count_per_cell.len() as u64
    }

    pub fn face_count(&self) -> u64 {
        self.cumulative_node_count_per_face.len() as u64
    }

    pub fn point_count(&self) -> u64 {
        self.point_count
    }

    /// Node loop of a face, or `None` when the face index is out of range.
    pub fn face_nodes(&self, face: u64) -> Option<&[u64]> {
        let span = prefix_span(&self.cumulative_node_count_per_face, face as usize)?;
        self.node_indices_of_faces.get(span)
    }

    fn cell_faces(&self, cell: u64) -> Result<Vec<CellFace<'_>>> {
        let malformed = |reason: String| Error::MalformedCell { cell, reason };
        let span = prefix_span(&self.cumulative_face_count_per_cell, cell as usize)
            .ok_or_else(|| malformed("cell index out of range".into()))?;
        let mut faces = Vec::with_capacity(span.len());
        for slot in span {
            let face = self.face_indices_of_cells[slot];
            let nodes = self
                .face_nodes(face)
                .ok_or_else(|| malformed(format!("face {face} out of range")))?;
            if nodes.len() < 3 {
                return Err(malformed(format!("face {face} has {} nodes", nodes.len())));
            }
            if let Some(&node) = nodes.iter().find(|&&n| n >= self.point_count) {
                return Err(malformed(format!(
                    "face {face} references node {node} of {}",
                    self.point_count
                )));
            }
            faces.push(CellFace {
                nodes,
                outward: self.cell_face_is_right_handed[slot],
            });
        }
        if faces.len() < 4 {
            return Err(malformed(format!("{} faces cannot close a volume", faces.len())));
        }
        Ok(faces)
    }

    /// Rebuilds one cell as an optimized VTK cell when its faces allow it.
    pub fn reconstruct_cell(&self, cell: u64) -> Result<ReconstructedCell> {
        let faces = self.cell_faces(cell)?;
        let mut distinct = Vec::new();
        let mut seen = BTreeSet::new();
        for face in &faces {
            for &node in face.nodes {
                if seen.insert(node) {
                    distinct.push(node);
                }
            }
        }

        let signature = signature_of(&faces, distinct.len());
        if let Some(declared) = declared_cell_type(self.shape) {
            if signature != Some(declared) {
                return Err(Error::MalformedCell {
                    cell,
                    reason: format!(
                        "declared {:?} but has {} faces over {} nodes",
                        self.shape,
                        faces.len(),
                        distinct.len()
                    ),
                });
            }
        }

        let Some(cell_type) = signature else {
            return Ok(ReconstructedCell::Polyhedron {
                nodes: distinct,
                faces: faces.iter().map(CellFace::outward).collect(),
            });
        };
        (0..faces.len())
            .filter(|&base| is_base_candidate(cell_type, faces[base].nodes.len()))
            .find_map(|base| build_optimized(cell_type, &faces, base))
            .map(|nodes| ReconstructedCell::Optimized(cell_type, nodes))
            .ok_or_else(|| Error::MalformedCell {
                cell,
                reason: format!("faces match a {cell_type:?} but do not close one"),
            })
    }

    /// Rebuilds the given cells, in order.
    pub fn build_cells<I>(&self, cells: I) -> Result<CellConnectivity>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut out = CellConnectivity::new();
        for cell in cells {
            self.reconstruct_cell(cell)?.push_into(&mut out);
        }
        Ok(out)
    }
}

fn check_cumulative(what: &str, cumulative: &[u64], expected_len: u64, flat_len: usize) -> Result<()> {
    if cumulative.len() as u64 != expected_len {
        return Err(Error::Data(format!(
            "{} cumulative {what} entries, expected {expected_len}",
            cumulative.len()
        )));
    }
    if cumulative.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::Data(format!("cumulative {what} decreases")));
    }
    let total = cumulative.last().copied().unwrap_or(0);
    if total != flat_len as u64 {
        return Err(Error::Data(format!(
            "cumulative {what} totals {total}, indices hold {flat_len}"
        )));
    }
    Ok(())
}

fn declared_cell_type(shape: CellShape) -> Option<CellType> {
    match shape {
        CellShape::Tetrahedral => Some(CellType::Tetrahedron),
        CellShape::Pyramidal => Some(CellType::Pyramid),
        CellShape::Prism => Some(CellType::Wedge),
        CellShape::Hexahedral => Some(CellType::Hexahedron),
        CellShape::Polyhedral => None,
    }
}

fn signature_of(faces: &[CellFace<'_>], node_count: usize) -> Option<CellType> {
    let triangles = faces.iter().filter(|f| f.nodes.len() == 3).count();
    let quads = faces.iter().filter(|f| f.nodes.len() == 4).count();
    match (faces.len(), triangles, quads, node_count) {
        (4, 4, 0, 4) => Some(CellType::Tetrahedron),
        (5, 4, 1, 5) => Some(CellType::Pyramid),
        (5, 2, 3, 6) => Some(CellType::Wedge),
        (6, 0, 6, 8) => Some(CellType::Hexahedron),
        _ => None,
    }
}

fn is_base_candidate(cell_type: CellType, face_len: usize) -> bool {
    match cell_type {
        CellType::Tetrahedron | CellType::Wedge => face_len == 3,
        CellType::Pyramid | CellType::Hexahedron => face_len == 4,
        _ => false,
    }
}

/// Node order of an optimized cell built on face `base`, or `None` when the faces
/// around that base do not close the expected shape.
fn build_optimized(cell_type: CellType, faces: &[CellFace<'_>], base: usize) -> Option<Vec<u64>> {
    let mut nodes = match cell_type {
        CellType::Wedge => faces[base].outward(),
        _ => faces[base].inward(),
    };
    let base_set = faces[base].node_set();

    match cell_type {
        CellType::Tetrahedron | CellType::Pyramid => {
            let apex: BTreeSet<u64> = faces
                .iter()
                .flat_map(|f| f.nodes.iter().copied())
                .filter(|n| !base_set.contains(n))
                .collect();
            let apex = single(apex.into_iter())?;
            let sides_meet_apex = faces
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != base)
                .all(|(_, f)| f.nodes.len() == 3 && f.nodes.contains(&apex));
            if !sides_meet_apex {
                return None;
            }
            nodes.push(apex);
        }
        CellType::Wedge | CellType::Hexahedron => {
            let mut top = Vec::with_capacity(nodes.len());
            for &node in &nodes {
                let partners: BTreeSet<u64> = faces
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != base)
                    .flat_map(|(_, f)| neighbours(f.nodes, node))
                    .filter(|n| !base_set.contains(n))
                    .collect();
                top.push(single(partners.into_iter())?);
            }
            let top_set: BTreeSet<u64> = top.iter().copied().collect();
            if top_set.len() != top.len() {
                return None;
            }
            let opposite = faces
                .iter()
                .enumerate()
                .find(|(i, f)| *i != base && f.node_set() == top_set)
                .map(|(_, f)| f.nodes)?;
            let closes_loop = (0..top.len())
                .all(|n| neighbours(opposite, top[n]).contains(&top[(n + 1) % top.len()]));
            if !closes_loop {
                return None;
            }
            nodes.extend(top);
        }
        _ => return None,
    }
    Some(nodes)
}

/// Nodes adjacent to `node` along the edges of one face loop.
fn neighbours(loop_nodes: &[u64], node: u64) -> Vec<u64> {
    let n = loop_nodes.len();
    loop_nodes
        .iter()
        .position(|&x| x == node)
        .map(|at| vec![loop_nodes[(at + n - 1) % n], loop_nodes[(at + 1) % n]])
        .unwrap_or_default()
}

fn single<I: Iterator<Item = u64>>(mut items: I) -> Option<u64> {
    let first = items.next()?;
    items.next().is_none().then_some(first)
}

/// Rebuilds every cell of an unstructured grid.
///
/// Unreadable or inconsistent face arrays are reported and yield no cells; a malformed
/// cell fails the whole reconstruction.
pub fn build_unstructured_cells(
    grid: &dyn UnstructuredGridAccessor,
    sink: &mut dyn EventSink,
) -> Result<(Option<UnstructuredTopology>, CellConnectivity)> {
    let topology = match UnstructuredTopology::read(grid) {
        Ok(topology) => topology,
        Err(e) => {
            emit_warning(sink, grid.uuid(), format!("cannot read cell faces: {e}"));
            return Ok((None, CellConnectivity::new()));
        }
    };
    let cells = topology.build_cells(0..topology.cell_count())?;
    debug!(
        "'{}': {} cells, {} hexahedra, {} polyhedra",
        grid.uuid(),
        cells.len(),
        cells.count_of(CellType::Hexahedron),
        cells.count_of(CellType::Polyhedron)
    );
    Ok((Some(topology), cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::memory::InMemoryUnstructuredGrid;
    use glam::DVec3;

    fn grid(points: usize) -> InMemoryUnstructuredGrid {
        InMemoryUnstructuredGrid::new("u", vec![DVec3::ZERO; points])
    }

    fn rebuild(grid: &InMemoryUnstructuredGrid) -> Result<ReconstructedCell> {
        UnstructuredTopology::read(grid)?.reconstruct_cell(0)
    }

    #[test]
    fn hexahedron_base_is_reversed_when_outward() {
        let mut g = grid(8);
        g.add_hexahedron([0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            rebuild(&g).unwrap(),
            ReconstructedCell::Optimized(CellType::Hexahedron, vec![1, 2, 3, 0, 5, 6, 7, 4])
        );
    }

    #[test]
    fn hexahedron_base_is_kept_when_inward() {
        let mut g = grid(8);
        let faces = [
            [0, 1, 2, 3],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        let ids: Vec<(u64, bool)> = faces.iter().map(|f| (g.add_face(f), false)).collect();
        g.add_cell(&ids);
        assert_eq!(
            rebuild(&g).unwrap(),
            ReconstructedCell::Optimized(CellType::Hexahedron, vec![0, 1, 2, 3, 4, 5, 6, 7])
        );
    }

    #[test]
    fn tetrahedron_apex_follows_base() {
        let mut g = grid(4);
        let ids = [
            (g.add_face(&[0, 2, 1]), true),
            (g.add_face(&[0, 1, 3]), true),
            (g.add_face(&[1, 2, 3]), true),
            (g.add_face(&[2, 0, 3]), true),
        ];
        g.add_cell(&ids);
        assert_eq!(
            rebuild(&g).unwrap(),
            ReconstructedCell::Optimized(CellType::Tetrahedron, vec![1, 2, 0, 3])
        );
    }

    #[test]
    fn pyramid_base_is_the_quad() {
        let mut g = grid(5);
        let ids = [
            (g.add_face(&[0, 1, 4]), true),
            (g.add_face(&[1, 2, 4]), true),
            (g.add_face(&[0, 1, 2, 3]), false),
            (g.add_face(&[2, 3, 4]), true),
            (g.add_face(&[3, 0, 4]), true),
        ];
        g.add_cell(&ids);
        assert_eq!(
            rebuild(&g).unwrap(),
            ReconstructedCell::Optimized(CellType::Pyramid, vec![0, 1, 2, 3, 4])
        );
    }

    #[test]
    fn wedge_base_faces_away_from_top() {
        let mut g = grid(6);
        let ids = [
            (g.add_face(&[0, 1, 2]), false),
            (g.add_face(&[3, 4, 5]), true),
            (g.add_face(&[0, 1, 4, 3]), true),
            (g.add_face(&[1, 2, 5, 4]), true),
            (g.add_face(&[2, 0, 3, 5]), true),
        ];
        g.add_cell(&ids);
        assert_eq!(
            rebuild(&g).unwrap(),
            ReconstructedCell::Optimized(CellType::Wedge, vec![2, 1, 0, 5, 4, 3])
        );
    }

    #[test]
    fn other_cells_become_polyhedra() {
        // Triangular prism capped by a split top: two triangles replace the top face.
        let mut g = grid(7);
        let ids = [
            (g.add_face(&[0, 2, 1]), true),
            (g.add_face(&[0, 1, 4, 3]), true),
            (g.add_face(&[1, 2, 5, 4]), true),
            (g.add_face(&[2, 0, 3, 5]), false),
            (g.add_face(&[3, 4, 6]), true),
            (g.add_face(&[4, 5, 6]), true),
        ];
        g.add_cell(&ids);
        let topology = UnstructuredTopology::read(&g).unwrap();
        let cells = topology.build_cells([0]).unwrap();
        assert_eq!(cells.cell_type(0), CellType::Polyhedron);
        assert_eq!(cells.cell_nodes(0), &[0, 2, 1, 4, 3, 5, 6]);
        let faces = cells.polyhedron_faces(0).unwrap();
        assert_eq!(faces.len(), 6);
        assert_eq!(faces[3], vec![5, 3, 0, 2]);
    }

    #[test]
    fn declared_shape_mismatch_is_malformed() {
        let mut g = grid(4).with_shape(CellShape::Hexahedral);
        let ids = [
            (g.add_face(&[0, 2, 1]), true),
            (g.add_face(&[0, 1, 3]), true),
            (g.add_face(&[1, 2, 3]), true),
            (g.add_face(&[2, 0, 3]), true),
        ];
        g.add_cell(&ids);
        let err = rebuild(&g).unwrap_err();
        assert!(matches!(err, Error::MalformedCell { cell: 0, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn degenerate_faces_are_malformed() {
        let mut g = grid(4);
        let ids = [
            (g.add_face(&[0, 1]), true),
            (g.add_face(&[0, 1, 3]), true),
            (g.add_face(&[1, 2, 3]), true),
            (g.add_face(&[2, 0, 3]), true),
        ];
        g.add_cell(&ids);
        assert!(matches!(rebuild(&g), Err(Error::MalformedCell { .. })));
    }

    #[test]
    fn hexahedron_signature_that_does_not_close_is_malformed() {
        // Six quads over eight nodes, but side faces pair base node 0 with two top nodes.
        let mut g = grid(8);
        let faces = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 7, 4],
        ];
        let ids: Vec<(u64, bool)> = faces.iter().map(|f| (g.add_face(f), true)).collect();
        g.add_cell(&ids);
        assert!(matches!(rebuild(&g), Err(Error::MalformedCell { .. })));
    }

    #[test]
    fn missing_face_fails_the_grid() {
        let mut g = grid(8);
        g.add_hexahedron([0, 1, 2, 3, 4, 5, 6, 7]);
        g.add_cell(&[(0, true), (1, true), (2, true), (42, true)]);
        let mut sink = crate::events::VecSink::new();
        let err = build_unstructured_cells(&g, &mut sink).unwrap_err();
        assert!(matches!(err, Error::MalformedCell { cell: 1, .. }));
    }

    #[test]
    fn whole_grid_mixes_optimized_and_generic_cells() {
        let mut g = grid(12);
        g.add_hexahedron([0, 1, 2, 3, 4, 5, 6, 7]);
        let ids = [
            (g.add_face(&[8, 10, 9]), true),
            (g.add_face(&[8, 9, 11]), true),
            (g.add_face(&[9, 10, 11]), true),
            (g.add_face(&[10, 8, 11]), true),
        ];
        g.add_cell(&ids);
        let mut sink = crate::events::VecSink::new();
        let (topology, cells) = build_unstructured_cells(&g, &mut sink).unwrap();
        assert_eq!(topology.map(|t| t.cell_count()), Some(2));
        assert_eq!(
            cells.types(),
            &[CellType::Hexahedron, CellType::Tetrahedron]
        );
        assert!(sink.is_empty());
    }
}
