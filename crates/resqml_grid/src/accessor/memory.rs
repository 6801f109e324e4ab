//! In-memory accessor implementations.
//!
//! These stand in for the external data access layer in tests, benches and demos. The IJK
//! grid generates a regular lattice on demand: pillar `(i, j)` sits at
//! `(i * dx, j * dy)` and K-interface `n` at `z = n * dz`, split coordinate lines being
//! copies of their pillar shifted by a fault throw along Z.
use std::cell::Cell;

use glam::DVec3;
use mint::Point3;

use crate::accessor::{
    CellShape, ElementKind, IjkGridAccessor, LocalCrs, SubRepresentationAccessor,
    UnstructuredGridAccessor,
};
use crate::error::{Error, Result};
use crate::partition::k_interface_count;

#[derive(Clone, Debug)]
struct SplitCoordinateLine {
    pillar_index: u32,
    columns: Vec<(u32, u32)>,
}

/// Regular IJK grid held in memory.
pub struct InMemoryIjkGrid {
    uuid: String,
    ni: u32,
    nj: u32,
    nk: u32,
    spacing: DVec3,
    fault_throw: f64,
    right_handed: bool,
    k_gaps: Option<Vec<bool>>,
    split_lines: Vec<SplitCoordinateLine>,
    active: Option<Vec<bool>>,
    active_flags_readable: bool,
    crs: Option<LocalCrs>,
    compressed: bool,
    chunked_reads: bool,
    split_loaded: Cell<bool>,
    split_loads: Cell<u32>,
    interface_reads: Cell<u32>,
    whole_reads: Cell<u32>,
}

impl InMemoryIjkGrid {
    /// Creates a unit-spaced grid of `ni * nj * nk` cells with a plain local CRS.
    pub fn regular(uuid: impl Into<String>, ni: u32, nj: u32, nk: u32) -> Self {
        Self {
            uuid: uuid.into(),
            ni,
            nj,
            nk,
            spacing: DVec3::ONE,
            fault_throw: 0.5,
            right_handed: false,
            k_gaps: None,
            split_lines: Vec::new(),
            active: None,
            active_flags_readable: true,
            crs: Some(LocalCrs::default()),
            compressed: false,
            chunked_reads: true,
            split_loaded: Cell::new(false),
            split_loads: Cell::new(0),
            interface_reads: Cell::new(0),
            whole_reads: Cell::new(0),
        }
    }

    pub fn with_spacing(mut self, spacing: DVec3) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_right_handed(mut self, right_handed: bool) -> Self {
        self.right_handed = right_handed;
        self
    }

    /// Sets the gap flags, one per layer except the last.
    pub fn with_k_gaps(mut self, gaps: Vec<bool>) -> Self {
        debug_assert_eq!(gaps.len(), self.nk.saturating_sub(1) as usize);
        self.k_gaps = Some(gaps);
        self
    }

    /// Adds a split coordinate line duplicating `pillar_index` for the given `(i, j)` columns.
    pub fn with_split_line(mut self, pillar_index: u32, columns: &[(u32, u32)]) -> Self {
        self.split_lines.push(SplitCoordinateLine {
            pillar_index,
            columns: columns.to_vec(),
        });
        self
    }

    /// Sets per-cell geometry-defined flags for the whole grid, in K, J, I order.
    pub fn with_active_cells(mut self, flags: Vec<bool>) -> Self {
        debug_assert_eq!(flags.len(), self.cell_count() as usize);
        self.active = Some(flags);
        self
    }

    /// Advertises geometry-defined flags that fail to read.
    pub fn with_unreadable_active_cells(mut self) -> Self {
        self.active = Some(Vec::new());
        self.active_flags_readable = false;
        self
    }

    pub fn with_local_crs(mut self, crs: LocalCrs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn without_crs(mut self) -> Self {
        self.crs = None;
        self
    }

    pub fn with_compressed_geometry(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Makes every per-K-interface read fail, as for data stores without hyperslab support.
    pub fn without_chunked_reads(mut self) -> Self {
        self.chunked_reads = false;
        self
    }

    pub fn cell_count(&self) -> u64 {
        self.ni as u64 * self.nj as u64 * self.nk as u64
    }

    pub fn k_interface_count(&self) -> u32 {
        k_interface_count(self.nk, self.k_gaps.as_deref())
    }

    pub fn split_information_loaded(&self) -> bool {
        self.split_loaded.get()
    }

    pub fn split_load_count(&self) -> u32 {
        self.split_loads.get()
    }

    /// Number of successful per-K-interface reads so far.
    pub fn k_interface_reads(&self) -> u32 {
        self.interface_reads.get()
    }

    /// Number of whole-grid point reads so far.
    pub fn whole_grid_reads(&self) -> u32 {
        self.whole_reads.get()
    }

    fn pillar_count(&self) -> u64 {
        (self.ni as u64 + 1) * (self.nj as u64 + 1)
    }

    /// Local coordinates of line `line` (pillar or split line) on interface `k_interface`.
    pub fn local_point(&self, k_interface: u32, line: u64) -> DVec3 {
        let (pillar, throw) = if line < self.pillar_count() {
            (line, 0.0)
        } else {
            let split = &self.split_lines[(line - self.pillar_count()) as usize];
            (split.pillar_index as u64, self.fault_throw)
        };
        let i = pillar % (self.ni as u64 + 1);
        let j = pillar / (self.ni as u64 + 1);
        DVec3::new(
            i as f64 * self.spacing.x,
            j as f64 * self.spacing.y,
            k_interface as f64 * self.spacing.z + throw,
        )
    }

    fn origin(&self) -> DVec3 {
        match &self.crs {
            Some(crs) => DVec3::new(
                crs.origin_ordinal1,
                crs.origin_ordinal2,
                crs.origin_depth_or_elevation.unwrap_or(0.0),
            ),
            None => DVec3::ZERO,
        }
    }

    fn interface_of(&self, k: u32, top: bool) -> u32 {
        let gaps_below = self
            .k_gaps
            .as_ref()
            .map(|g| g.iter().take(k as usize).filter(|&&gap| gap).count() as u32)
            .unwrap_or(0);
        k + gaps_below + u32::from(top)
    }
}

impl IjkGridAccessor for InMemoryIjkGrid {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn i_cell_count(&self) -> u32 {
        self.ni
    }

    fn j_cell_count(&self) -> u32 {
        self.nj
    }

    fn k_cell_count(&self) -> u32 {
        self.nk
    }

    fn is_right_handed(&self) -> bool {
        self.right_handed
    }

    fn xyz_point_count_of_all_patches(&self) -> u64 {
        self.xyz_point_count_of_k_interface() * self.k_interface_count() as u64
    }

    fn xyz_point_count_of_k_interface(&self) -> u64 {
        self.pillar_count() + self.split_lines.len() as u64
    }

    fn xyz_points_of_k_interface(&self, k_interface: u32) -> Result<Vec<Point3<f64>>> {
        if !self.chunked_reads {
            return Err(Error::Accessor(format!(
                "'{}' does not support per-K-interface reads",
                self.uuid
            )));
        }
        if k_interface >= self.k_interface_count() {
            return Err(Error::Accessor(format!(
                "K-interface {k_interface} out of range"
            )));
        }
        self.interface_reads.set(self.interface_reads.get() + 1);
        Ok((0..self.xyz_point_count_of_k_interface())
            .map(|line| self.local_point(k_interface, line).into())
            .collect())
    }

    fn xyz_points_of_all_patches_in_global_crs(&self) -> Result<Vec<Point3<f64>>> {
        self.whole_reads.set(self.whole_reads.get() + 1);
        let origin = self.origin();
        let per_interface = self.xyz_point_count_of_k_interface();
        Ok((0..self.k_interface_count())
            .flat_map(|k| (0..per_interface).map(move |line| (k, line)))
            .map(|(k, line)| (self.local_point(k, line) + origin).into())
            .collect())
    }

    fn xyz_point_index_from_cell_corner(
        &self,
        i: u32,
        j: u32,
        k: u32,
        corner: u8,
    ) -> Result<u64> {
        if i >= self.ni || j >= self.nj || k >= self.nk || corner > 7 {
            return Err(Error::Accessor(format!(
                "cell corner ({i}, {j}, {k}, {corner}) out of range"
            )));
        }
        if !self.split_lines.is_empty() && !self.split_loaded.get() {
            return Err(Error::Accessor(
                "split information must be loaded first".into(),
            ));
        }
        let di = u32::from(matches!(corner % 4, 1 | 2));
        let dj = u32::from(matches!(corner % 4, 2 | 3));
        let pillar = (j + dj) * (self.ni + 1) + (i + di);
        let line = self
            .split_lines
            .iter()
            .position(|s| s.pillar_index == pillar && s.columns.contains(&(i, j)))
            .map(|s| self.pillar_count() + s as u64)
            .unwrap_or(pillar as u64);
        let interface = self.interface_of(k, corner >= 4);
        Ok(interface as u64 * self.xyz_point_count_of_k_interface() + line)
    }

    fn has_cell_geometry_is_defined_flags(&self) -> bool {
        self.active.is_some()
    }

    fn cell_geometry_is_defined_flags(&self) -> Result<Vec<bool>> {
        match &self.active {
            Some(flags) if self.active_flags_readable => Ok(flags.clone()),
            _ => Err(Error::Accessor(
                "cell geometry is defined flags unavailable".into(),
            )),
        }
    }

    fn k_gaps_count(&self) -> u32 {
        self.k_gaps
            .as_ref()
            .map(|g| g.iter().filter(|&&gap| gap).count() as u32)
            .unwrap_or(0)
    }

    fn k_gaps(&self) -> Result<Vec<bool>> {
        self.k_gaps
            .clone()
            .ok_or_else(|| Error::Accessor("grid has no K gaps".into()))
    }

    fn is_node_geometry_compressed(&self) -> bool {
        self.compressed
    }

    fn load_split_information(&self) -> Result<()> {
        self.split_loaded.set(true);
        self.split_loads.set(self.split_loads.get() + 1);
        Ok(())
    }

    fn unload_split_information(&self) {
        self.split_loaded.set(false);
    }

    fn local_crs(&self, _patch_index: u32) -> Result<Option<LocalCrs>> {
        Ok(self.crs.clone())
    }
}

/// Unstructured grid held in memory, built face by face.
pub struct InMemoryUnstructuredGrid {
    uuid: String,
    points: Vec<DVec3>,
    shape: CellShape,
    cumulative_nodes_per_face: Vec<u64>,
    face_nodes: Vec<u64>,
    cumulative_faces_per_cell: Vec<u64>,
    cell_faces: Vec<u64>,
    cell_face_right_handed: Vec<bool>,
    crs: Option<LocalCrs>,
}

impl InMemoryUnstructuredGrid {
    pub fn new(uuid: impl Into<String>, points: Vec<DVec3>) -> Self {
        Self {
            uuid: uuid.into(),
            points,
            shape: CellShape::Polyhedral,
            cumulative_nodes_per_face: Vec::new(),
            face_nodes: Vec::new(),
            cumulative_faces_per_cell: Vec::new(),
            cell_faces: Vec::new(),
            cell_face_right_handed: Vec::new(),
            crs: Some(LocalCrs::default()),
        }
    }

    pub fn with_shape(mut self, shape: CellShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_local_crs(mut self, crs: LocalCrs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Appends a face and returns its index.
    pub fn add_face(&mut self, nodes: &[u64]) -> u64 {
        self.face_nodes.extend_from_slice(nodes);
        self.cumulative_nodes_per_face
            .push(self.face_nodes.len() as u64);
        self.cumulative_nodes_per_face.len() as u64 - 1
    }

    /// Appends a cell from `(face index, outward normal)` pairs and returns its index.
    pub fn add_cell(&mut self, faces: &[(u64, bool)]) -> u64 {
        for &(face, outward) in faces {
            self.cell_faces.push(face);
            self.cell_face_right_handed.push(outward);
        }
        self.cumulative_faces_per_cell
            .push(self.cell_faces.len() as u64);
        self.cumulative_faces_per_cell.len() as u64 - 1
    }

    /// Appends a hexahedron from corners in VTK order, with outward-wound faces.
    pub fn add_hexahedron(&mut self, c: [u64; 8]) -> u64 {
        let faces = [
            [c[0], c[3], c[2], c[1]],
            [c[4], c[5], c[6], c[7]],
            [c[0], c[1], c[5], c[4]],
            [c[1], c[2], c[6], c[5]],
            [c[2], c[3], c[7], c[6]],
            [c[3], c[0], c[4], c[7]],
        ];
        let ids: Vec<(u64, bool)> = faces.iter().map(|f| (self.add_face(f), true)).collect();
        self.add_cell(&ids)
    }
}

impl UnstructuredGridAccessor for InMemoryUnstructuredGrid {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn cell_count(&self) -> u64 {
        self.cumulative_faces_per_cell.len() as u64
    }

    fn face_count(&self) -> u64 {
        self.cumulative_nodes_per_face.len() as u64
    }

    fn cell_shape(&self) -> CellShape {
        self.shape
    }

    fn xyz_point_count_of_all_patches(&self) -> u64 {
        self.points.len() as u64
    }

    fn xyz_points_of_all_patches_in_global_crs(&self) -> Result<Vec<Point3<f64>>> {
        Ok(self.points.iter().map(|&p| p.into()).collect())
    }

    fn cumulative_face_count_per_cell(&self) -> Result<Vec<u64>> {
        Ok(self.cumulative_faces_per_cell.clone())
    }

    fn face_indices_of_cells(&self) -> Result<Vec<u64>> {
        Ok(self.cell_faces.clone())
    }

    fn cumulative_node_count_per_face(&self) -> Result<Vec<u64>> {
        Ok(self.cumulative_nodes_per_face.clone())
    }

    fn node_indices_of_faces(&self) -> Result<Vec<u64>> {
        Ok(self.face_nodes.clone())
    }

    fn cell_face_is_right_handed(&self) -> Result<Vec<bool>> {
        Ok(self.cell_face_right_handed.clone())
    }

    fn local_crs(&self, _patch_index: u32) -> Result<Option<LocalCrs>> {
        Ok(self.crs.clone())
    }
}

/// Single-patch sub-representation held in memory.
pub struct InMemorySubRepresentation {
    uuid: String,
    supporting: String,
    kind: ElementKind,
    indices: Vec<u64>,
    pairwise: bool,
    patch_count: u32,
}

impl InMemorySubRepresentation {
    pub fn new(
        uuid: impl Into<String>,
        supporting: impl Into<String>,
        kind: ElementKind,
        indices: Vec<u64>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            supporting: supporting.into(),
            kind,
            indices,
            pairwise: false,
            patch_count: 1,
        }
    }

    pub fn cells(uuid: impl Into<String>, supporting: impl Into<String>, indices: Vec<u64>) -> Self {
        Self::new(uuid, supporting, ElementKind::Cells, indices)
    }

    pub fn faces(uuid: impl Into<String>, supporting: impl Into<String>, indices: Vec<u64>) -> Self {
        Self::new(uuid, supporting, ElementKind::Faces, indices)
    }

    pub fn with_pairwise_indices(mut self) -> Self {
        self.pairwise = true;
        self
    }

    pub fn with_patch_count(mut self, patch_count: u32) -> Self {
        self.patch_count = patch_count;
        self
    }
}

impl SubRepresentationAccessor for InMemorySubRepresentation {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn supporting_representation_uuid(&self) -> &str {
        &self.supporting
    }

    fn patch_count(&self) -> u32 {
        self.patch_count
    }

    fn element_kind_of_patch(&self, _patch_index: u32) -> ElementKind {
        self.kind.clone()
    }

    fn element_count_of_patch(&self, _patch_index: u32) -> u64 {
        self.indices.len() as u64
    }

    fn element_indices_of_patch(&self, _patch_index: u32) -> Result<Vec<u64>> {
        Ok(self.indices.clone())
    }

    fn are_element_indices_pairwise(&self, _patch_index: u32) -> bool {
        self.pairwise
    }
}
