//! Mesh fill path: flatten a polygon-with-holes and ear-clip it.
//!
//! Winding convention: the exterior has a positive shoelace area and every
//! hole a negative one (measured on the raw screen coordinates). Rings that
//! disagree are reversed before triangulation; the vertex buffer keeps the
//! normalized order, so indices always refer to what was triangulated.

use std::collections::HashMap;
use std::sync::Arc;

use earcutr::earcut;
use glam::DVec2;

use crate::polygon::error::TriangulationError;
use crate::polygon::types::{PolygonKey, SimplifiedPolygon};

/// Flat triangle mesh for one polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangleMesh {
    /// Interleaved x, y
    pub coords: Vec<f64>,
    /// Three indices per triangle into `coords` (vertex index, not float index)
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex(&self, i: usize) -> DVec2 {
        DVec2::new(self.coords[2 * i], self.coords[2 * i + 1])
    }

    pub fn triangles(&self) -> impl Iterator<Item = [DVec2; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.vertex(t[0] as usize),
                self.vertex(t[1] as usize),
                self.vertex(t[2] as usize),
            ]
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winding {
    /// Positive shoelace area
    Positive,
    Negative,
}

/// Shoelace area; the sign encodes orientation.
pub fn signed_area(ring: &[DVec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut a = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        a += ring[j].x * ring[i].y - ring[i].x * ring[j].y;
        j = i;
    }
    0.5 * a
}

pub fn winding(ring: &[DVec2]) -> Winding {
    if signed_area(ring) >= 0.0 {
        Winding::Positive
    } else {
        Winding::Negative
    }
}

/// Start offset of each hole in the flattened vertex buffer.
///
/// Hole `i` starts after the exterior and holes `0..i`.
pub fn hole_offsets(exterior_len: usize, hole_lens: impl IntoIterator<Item = usize>) -> Vec<usize> {
    hole_lens
        .into_iter()
        .scan(exterior_len, |offset, len| {
            let start = *offset;
            *offset += len;
            Some(start)
        })
        .collect()
}

/// Triangle count an ear-clipper produces for a simple polygon with
/// `vertices` total vertices and `holes` holes.
pub fn expected_triangle_count(vertices: usize, holes: usize) -> usize {
    (vertices + 2 * holes).saturating_sub(2)
}

/// Ring without its closing vertex (if it repeats the first one), oriented
/// to `want`.
fn normalized_ring(ring: &[DVec2], want: Winding) -> Vec<DVec2> {
    let mut out = ring.to_vec();
    while out.len() >= 2 && out[0] == out[out.len() - 1] {
        out.pop();
    }
    if winding(&out) != want {
        out.reverse();
    }
    out
}

/// Triangulate a simplified polygon with its holes.
pub fn triangulate(polygon: &SimplifiedPolygon) -> Result<TriangleMesh, TriangulationError> {
    let exterior = normalized_ring(&polygon.exterior, Winding::Positive);
    if exterior.len() < 3 {
        return Err(TriangulationError::TooFewVertices(exterior.len()));
    }
    let holes: Vec<Vec<DVec2>> = polygon
        .holes
        .iter()
        .map(|h| normalized_ring(h, Winding::Negative))
        .filter(|h| h.len() >= 3)
        .collect();

    let offsets = hole_offsets(exterior.len(), holes.iter().map(Vec::len));
    let coords: Vec<f64> = exterior
        .iter()
        .chain(holes.iter().flatten())
        .flat_map(|p| [p.x, p.y])
        .collect();

    let indices = earcut(&coords, &offsets, 2).map_err(|_| TriangulationError::Earcut)?;
    if indices.is_empty() || indices.len() % 3 != 0 {
        return Err(TriangulationError::InvalidIndexCount(indices.len()));
    }

    let vertex_count = coords.len() / 2;
    let indices = indices
        .into_iter()
        .map(|i| {
            if i < vertex_count {
                u32::try_from(i).map_err(|_| TriangulationError::TooManyVertices(vertex_count))
            } else {
                Err(TriangulationError::IndexOutOfRange(i))
            }
        })
        .collect::<Result<Vec<u32>, _>>()?;

    Ok(TriangleMesh { coords, indices })
}

#[derive(Clone, Debug)]
struct MeshEntry {
    generation: u64,
    /// `None` records a failed triangulation so it is not retried every frame
    mesh: Option<Arc<TriangleMesh>>,
}

/// Lazily built meshes keyed by (source identity, world).
///
/// An entry is rebuilt whenever the simplified geometry it came from has a
/// different generation.
#[derive(Default)]
pub struct MeshCache {
    entries: HashMap<(PolygonKey, i32), MeshEntry>,
}

/// Outcome of a mesh lookup.
pub enum MeshLookup {
    Cached(Option<Arc<TriangleMesh>>),
    Built(Arc<TriangleMesh>),
    Failed(TriangulationError),
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, polygon: &SimplifiedPolygon) -> MeshLookup {
        let slot = (polygon.key, polygon.world);
        if let Some(entry) = self.entries.get(&slot) {
            if entry.generation == polygon.generation {
                return MeshLookup::Cached(entry.mesh.clone());
            }
        }

        let (entry, lookup) = match triangulate(polygon) {
            Ok(mesh) => {
                let mesh = Arc::new(mesh);
                (Some(Arc::clone(&mesh)), MeshLookup::Built(mesh))
            }
            Err(e) => (None, MeshLookup::Failed(e)),
        };
        self.entries.insert(
            slot,
            MeshEntry {
                generation: polygon.generation,
                mesh: entry,
            },
        );
        lookup
    }

    pub fn retain(&mut self, mut keep: impl FnMut(PolygonKey) -> bool) {
        self.entries.retain(|(key, _), _| keep(*key));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
