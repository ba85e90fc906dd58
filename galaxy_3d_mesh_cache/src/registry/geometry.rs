/// Geometry registry interface.
///
/// Geometries are GPU vertex/index buffers. They are looked up by a stable name
/// so that two mesh assets reading the same file share one upload.

use std::sync::Arc;
use crate::error::Result;
use crate::mesh::BoundingBox;
use crate::utils::Handle;

/// Tag type for geometry handles
pub enum GeometryTag {}

/// Reference-counted geometry issued by a [`GeometryRegistry`]
pub type GeometryHandle = Handle<GeometryTag>;

/// Index element width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// Size of one index in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Raw vertex/index bytes as produced by the mesh decoder
#[derive(Debug, Clone)]
pub struct GeometryData {
    /// Interleaved vertex data
    pub vertex_data: Arc<[u8]>,
    /// Vertex stride in bytes
    pub vertex_stride: u32,
    /// Index data (little endian)
    pub index_data: Arc<[u8]>,
    /// Width of each index
    pub index_format: IndexFormat,
    /// Local-space bounds of every vertex
    pub bounds: BoundingBox,
}

impl GeometryData {
    /// Number of vertices described by `vertex_data`
    pub fn vertex_count(&self) -> u32 {
        if self.vertex_stride == 0 {
            return 0;
        }
        (self.vertex_data.len() / self.vertex_stride as usize) as u32
    }

    /// Number of indices described by `index_data`
    pub fn index_count(&self) -> u32 {
        (self.index_data.len() / self.index_format.size_bytes()) as u32
    }
}

/// Geometry creation request: data plus the registry name it is published under
#[derive(Debug, Clone)]
pub struct GeometryConfig {
    pub name: String,
    pub data: GeometryData,
}

/// Summary returned by [`GeometryRegistry::get`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryInfo {
    pub vertex_count: u32,
    pub index_count: u32,
    pub bounds: BoundingBox,
}

/// Geometry registry collaborator
pub trait GeometryRegistry: Send {
    /// Take a reference on an existing geometry.
    ///
    /// Returns `Error::ResourceNotLoaded` when no geometry has that name.
    fn acquire_by_name(&mut self, name: &str) -> Result<GeometryHandle>;

    /// Upload a new geometry; the caller owns the initial reference
    fn create(&mut self, config: GeometryConfig) -> Result<GeometryHandle>;

    /// Take one more reference on `handle`
    fn acquire(&mut self, handle: GeometryHandle) -> Result<()>;

    /// Drop one reference on `handle`
    fn release(&mut self, handle: GeometryHandle);

    /// Describe a live geometry
    fn get(&self, handle: GeometryHandle) -> Option<GeometryInfo>;
}
