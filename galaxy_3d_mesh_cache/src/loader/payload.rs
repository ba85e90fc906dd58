/// Decoded mesh payload shapes.
///
/// A loader returns either a list of independent subsets (one geometry each)
/// or a single merged vertex/index buffer sliced into index ranges. The cache
/// branches once on the variant and shares the rest of the submesh building.

use crate::mesh::{BoundingBox, PipelineDomain};
use crate::registry::{GeometryData, MaterialHandle};

/// Decoded mesh
#[derive(Debug, Clone)]
pub enum MeshPayload {
    /// One geometry per submesh
    Subsets(Vec<MeshSubset>),
    /// One shared buffer, submeshes are index ranges into it
    Merged {
        buffer: GeometryData,
        ranges: Vec<SubmeshRange>,
    },
}

impl MeshPayload {
    /// Number of submeshes the payload describes
    pub fn submesh_count(&self) -> usize {
        match self {
            MeshPayload::Subsets(subsets) => subsets.len(),
            MeshPayload::Merged { ranges, .. } => ranges.len(),
        }
    }
}

/// A standalone submesh with its own geometry
#[derive(Debug, Clone)]
pub struct MeshSubset {
    pub geometry: GeometryData,
    /// Material already resolved by the loader (the cache takes its own reference)
    pub material: Option<MaterialHandle>,
    pub shader_override: String,
    pub domain: PipelineDomain,
}

/// An index range inside a merged buffer
#[derive(Debug, Clone)]
pub struct SubmeshRange {
    pub first_index: u32,
    pub index_count: u32,
    pub vertex_offset: i32,
    /// Material name, resolved through the material registry
    pub material: Option<String>,
    pub shader_override: String,
    pub domain: PipelineDomain,
    pub bounds: BoundingBox,
}
