//! Bulk loading of mesh cells from a flat cell-array encoding
//!
//! A chunk consists of a vertex array (one `[x, y, z]` row per vertex) and
//! an integer cell stream. Every record in the stream is a cell type code
//! followed by that type's fixed number of vertex indices:
//!
//! ```text
//! [ 5, v0, v1, v2,  10, v0, v1, v2, v3,  12, v0, ..., v7, ... ]
//!   triangle        tetrahedron          hexahedron
//! ```
//!
//! Only shapes lying inside the convex hull of their vertices are accepted,
//! so a cell's bounding box is the box around its referenced vertices.

use std::iter::FusedIterator;

use crate::error::OctreeError;
use crate::foundation::math::vec3_from_row;
use crate::spatial::{BoundingBox, ItemId, OctreeConfig, OctreeNode};

/// Cell shapes accepted in a bulk cell stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellGeometryType {
    /// Linear triangle
    Triangle,
    /// Linear quadrilateral
    Quad,
    /// Linear tetrahedron
    Tetra,
    /// Linear hexahedron
    Hexahedron,
    /// Quadratic triangle (3 corner and 3 midside nodes)
    QuadraticTriangle,
}

/// Type code and vertex count of every supported cell type
const CELL_GEOMETRY_TABLE: [(CellGeometryType, i64, usize); 5] = [
    (CellGeometryType::Triangle, 5, 3),
    (CellGeometryType::Quad, 9, 4),
    (CellGeometryType::Tetra, 10, 4),
    (CellGeometryType::Hexahedron, 12, 8),
    (CellGeometryType::QuadraticTriangle, 22, 6),
];

impl CellGeometryType {
    /// Every supported cell type
    pub const ALL: [CellGeometryType; 5] = [
        CellGeometryType::Triangle,
        CellGeometryType::Quad,
        CellGeometryType::Tetra,
        CellGeometryType::Hexahedron,
        CellGeometryType::QuadraticTriangle,
    ];

    /// Cell type for a stream type code
    pub fn from_code(code: i64) -> Option<Self> {
        CELL_GEOMETRY_TABLE
            .iter()
            .find(|(_, table_code, _)| *table_code == code)
            .map(|(kind, _, _)| *kind)
    }

    fn entry(self) -> (i64, usize) {
        CELL_GEOMETRY_TABLE
            .iter()
            .find(|(kind, _, _)| *kind == self)
            .map_or((0, 0), |(_, code, count)| (*code, *count))
    }

    /// Type code written in the cell stream
    pub fn code(self) -> i64 {
        self.entry().0
    }

    /// Number of vertex indices following the type code
    pub fn vertex_count(self) -> usize {
        self.entry().1
    }

    /// Conventional short name of the shape
    pub fn name(self) -> &'static str {
        match self {
            Self::Triangle => "triangle",
            Self::Quad => "quad",
            Self::Tetra => "tetra",
            Self::Hexahedron => "hexahedron",
            Self::QuadraticTriangle => "triangle6",
        }
    }
}

/// Iterator over the `(id, bbox)` pairs encoded in one chunk
///
/// Ids are assigned consecutively starting from the chunk's id offset. The
/// first malformed record yields an error and ends the iteration.
#[derive(Debug, Clone)]
pub struct CellRecords<'a> {
    vertices: &'a [[f64; 3]],
    cells: &'a [i64],
    cursor: usize,
    next_id: ItemId,
    failed: bool,
}

impl<'a> CellRecords<'a> {
    /// Start reading `cells` from the beginning, numbering cells from `id_offset`
    pub fn new(vertices: &'a [[f64; 3]], cells: &'a [i64], id_offset: ItemId) -> Self {
        Self {
            vertices,
            cells,
            cursor: 0,
            next_id: id_offset,
            failed: false,
        }
    }

    /// Element offset of the next record within the chunk
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Id the next record will receive
    pub fn next_id(&self) -> ItemId {
        self.next_id
    }

    fn read_record(&mut self) -> Result<(ItemId, BoundingBox), OctreeError> {
        let offset = self.cursor;
        let cell_id = self.next_id;
        let code = self.cells[offset];

        let kind = CellGeometryType::from_code(code).ok_or(OctreeError::UnsupportedCellType {
            code,
            cell_id,
            offset,
        })?;

        let count = kind.vertex_count();
        let start = offset + 1;
        let connectivity = self
            .cells
            .get(start..start + count)
            .ok_or(OctreeError::TruncatedCell {
                cell_id,
                offset,
                expected: count,
                available: self.cells.len() - start,
            })?;

        let mut bbox = BoundingBox::empty();
        for &vertex in connectivity {
            let row = usize::try_from(vertex)
                .ok()
                .and_then(|index| self.vertices.get(index))
                .ok_or(OctreeError::VertexOutOfRange {
                    cell_id,
                    vertex,
                    count: self.vertices.len(),
                })?;
            bbox.extend(&vec3_from_row(row));
        }

        self.cursor = start + count;
        self.next_id += 1;
        Ok((cell_id, bbox))
    }
}

impl Iterator for CellRecords<'_> {
    type Item = Result<(ItemId, BoundingBox), OctreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.cells.len() {
            return None;
        }
        let record = self.read_record();
        self.failed = record.is_err();
        Some(record)
    }
}

impl FusedIterator for CellRecords<'_> {}

/// Insert every cell of a chunk into the tree below `root`
///
/// Returns the number of cells inserted. Stops at the first malformed
/// record; cells read before it stay in the tree.
pub fn load_cell_array_chunk(
    root: &mut OctreeNode,
    config: &OctreeConfig,
    vertices: &[[f64; 3]],
    cells: &[i64],
    id_offset: ItemId,
) -> Result<usize, OctreeError> {
    let mut inserted = 0;
    for record in CellRecords::new(vertices, cells, id_offset) {
        let (id, bbox) = record.map_err(|e| {
            log::warn!("Cell array chunk at id {} aborted after {} cells: {}", id_offset, inserted, e);
            e
        })?;
        root.insert(id, bbox, config)?;
        inserted += 1;
    }
    log::debug!("Loaded {} cells starting at id {}", inserted, id_offset);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::foundation::math::Vec3;
    use crate::spatial::Octree;
    use std::collections::HashSet;

    const TRIANGLE: i64 = 5;
    const QUAD: i64 = 9;
    const TETRA: i64 = 10;
    const HEXAHEDRON: i64 = 12;
    const TRIANGLE6: i64 = 22;

    fn bbox(min: [f64; 3], max: [f64; 3]) -> BoundingBox {
        BoundingBox::new(Vec3::from(min), Vec3::from(max))
    }

    fn octree() -> Octree {
        Octree::new(Vec3::zeros(), 100.0, OctreeConfig::default()).unwrap()
    }

    /// Corners of the unit cube shifted by `base`
    fn cube_vertices(base: f64) -> Vec<[f64; 3]> {
        let mut vertices = Vec::new();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    vertices.push([base + f64::from(i), base + f64::from(j), base + f64::from(k)]);
                }
            }
        }
        vertices
    }

    #[test]
    fn test_type_table() {
        let counts: Vec<usize> = CellGeometryType::ALL.iter().map(|t| t.vertex_count()).collect();
        assert_eq!(counts, vec![3, 4, 4, 8, 6]);

        for kind in CellGeometryType::ALL {
            assert_eq!(CellGeometryType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(CellGeometryType::from_code(TRIANGLE), Some(CellGeometryType::Triangle));
        assert_eq!(CellGeometryType::from_code(TRIANGLE6), Some(CellGeometryType::QuadraticTriangle));
        assert_eq!(CellGeometryType::from_code(0), None);
        assert_eq!(CellGeometryType::Hexahedron.name(), "hexahedron");
    }

    #[test]
    fn test_cell_boxes_from_vertices() {
        let vertices = cube_vertices(2.0);
        let cells = [
            TRIANGLE, 0, 1, 2,
            QUAD, 0, 1, 3, 2,
            TETRA, 0, 1, 2, 4,
            HEXAHEDRON, 0, 1, 3, 2, 4, 5, 7, 6,
            TRIANGLE6, 0, 1, 7, 0, 3, 7,
        ];
        let records: Vec<_> = CellRecords::new(&vertices, &cells, 10)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 5);
        let ids: Vec<ItemId> = records.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![10, 11, 12, 13, 14]);
        assert_eq!(records[0].1, bbox([2.0, 2.0, 2.0], [3.0, 3.0, 2.0]));
        assert_eq!(records[1].1, bbox([2.0, 2.0, 2.0], [3.0, 3.0, 2.0]));
        assert_eq!(records[2].1, bbox([2.0, 2.0, 2.0], [3.0, 3.0, 3.0]));
        assert_eq!(records[3].1, bbox([2.0, 2.0, 2.0], [3.0, 3.0, 3.0]));
        // Midside nodes count towards the box
        assert_eq!(records[4].1, bbox([2.0, 2.0, 2.0], [3.0, 3.0, 3.0]));
    }

    #[test]
    fn test_unsupported_type_keeps_earlier_cells() {
        let vertices = cube_vertices(10.0);
        let cells = [TRIANGLE, 0, 1, 2, 99, 0, 1, 2];
        let mut octree = octree();

        let err = octree.insert_cell_array_chunk(&vertices, &cells, 7).unwrap_err();
        assert_eq!(
            err,
            OctreeError::UnsupportedCellType { code: 99, cell_id: 8, offset: 4 }
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);

        let hits = octree.items_in_bbox(&bbox([10.0, 10.0, 10.0], [11.0, 11.0, 11.0]));
        assert_eq!(hits, HashSet::from([7]));
    }

    #[test]
    fn test_chunks_with_id_offsets() {
        let mut vertices = cube_vertices(10.0);
        vertices.extend(cube_vertices(60.0));
        let first = [TETRA, 0, 1, 2, 4, TRIANGLE, 1, 2, 3];
        let second = [HEXAHEDRON, 8, 9, 10, 11, 12, 13, 14, 15];

        let mut octree = octree();
        assert_eq!(octree.insert_cell_array_chunk(&vertices, &first, 0).unwrap(), 2);
        assert_eq!(octree.insert_cell_array_chunk(&vertices, &second, 2).unwrap(), 1);

        let low = octree.items_in_bbox(&bbox([10.5, 10.5, 10.0], [10.6, 10.6, 10.1]));
        assert_eq!(low, HashSet::from([0, 1]));
        let high = octree.items_in_bbox(&bbox([60.5, 60.5, 60.5], [70.0, 70.0, 70.0]));
        assert_eq!(high, HashSet::from([2]));
    }

    #[test]
    fn test_truncated_record() {
        let vertices = cube_vertices(0.0);
        let cells = [TRIANGLE, 0, 1, 2, HEXAHEDRON, 0, 1, 2];
        let mut records = CellRecords::new(&vertices, &cells, 0);

        assert!(records.next().unwrap().is_ok());
        assert_eq!(records.offset(), 4);
        assert_eq!(
            records.next().unwrap(),
            Err(OctreeError::TruncatedCell { cell_id: 1, offset: 4, expected: 8, available: 3 })
        );
        assert!(records.next().is_none());
    }

    #[test]
    fn test_vertex_out_of_range() {
        let vertices = cube_vertices(0.0);
        let mut octree = octree();

        let err = octree
            .insert_cell_array_chunk(&vertices, &[TRIANGLE, 0, 1, 8], 3)
            .unwrap_err();
        assert_eq!(err, OctreeError::VertexOutOfRange { cell_id: 3, vertex: 8, count: 8 });
        assert_eq!(err.kind(), ErrorKind::Index);

        let err = octree
            .insert_cell_array_chunk(&vertices, &[TRIANGLE, 0, -1, 2], 0)
            .unwrap_err();
        assert!(matches!(err, OctreeError::VertexOutOfRange { vertex: -1, .. }));
        assert_eq!(octree.record_count(), 0);
    }

    #[test]
    fn test_empty_chunk() {
        let mut octree = octree();
        assert_eq!(octree.insert_cell_array_chunk(&[], &[], 0).unwrap(), 0);
        assert!(CellRecords::new(&[], &[], 0).next().is_none());
    }

    #[test]
    fn test_bulk_load_divides_and_stays_complete() {
        // 30 x 30 grid of unit triangles in the z = 50 plane
        let n = 30;
        let mut vertices = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push([f64::from(i) * 3.0, f64::from(j) * 3.0, 50.0]);
            }
        }
        let stride = i64::from(n) + 1;
        let mut cells = Vec::new();
        for j in 0..i64::from(n) {
            for i in 0..i64::from(n) {
                let v = j * stride + i;
                cells.extend([TRIANGLE, v, v + 1, v + stride]);
            }
        }

        let mut octree = octree();
        let count = octree.insert_cell_array_chunk(&vertices, &cells, 0).unwrap();
        assert_eq!(count, 900);
        assert!(!octree.root().is_terminal());

        for (id, cell_box) in CellRecords::new(&vertices, &cells, 0).map(Result::unwrap) {
            assert!(octree.items_in_bbox(&cell_box).contains(&id));
        }
    }
}
