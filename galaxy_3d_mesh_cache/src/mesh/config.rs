/// Mesh cache configuration and construction descriptor.

use std::sync::{Arc, Mutex};
use crate::loader::ResourceLoader;
use crate::registry::{GeometryRegistry, MaterialRegistry, PipelineRegistry};

/// Tunables fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct MeshCacheConfig {
    /// Capacity of the asset table
    pub max_assets: u32,
    /// Capacity of the instance table
    pub max_instances: u32,
    /// Concurrent loads allowed per batch wave (size of the shared load-arena pool)
    pub load_arena_pool_size: u32,
    /// Pump ticks an asset may stay Pending before it is failed (None = wait forever)
    pub pending_deadline: Option<u32>,
    /// Build an opaque-only index buffer for merged meshes mixing cutout and opaque ranges
    pub build_opaque_index_buffer: bool,
}

impl Default for MeshCacheConfig {
    fn default() -> Self {
        Self {
            max_assets: 1024,
            max_instances: 16384,
            load_arena_pool_size: 8,
            pending_deadline: None,
            build_opaque_index_buffer: true,
        }
    }
}

/// Everything needed to build a [`MeshCache`](super::MeshCache)
pub struct MeshCacheDesc {
    pub config: MeshCacheConfig,
    pub loader: Arc<Mutex<dyn ResourceLoader>>,
    pub geometries: Arc<Mutex<dyn GeometryRegistry>>,
    pub materials: Arc<Mutex<dyn MaterialRegistry>>,
    pub pipelines: Arc<Mutex<dyn PipelineRegistry>>,
}
