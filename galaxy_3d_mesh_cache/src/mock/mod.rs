//! In-memory collaborators for tests and tools (no GPU, no file I/O)

mod fixtures;
mod loader;
mod registries;

use std::sync::{Arc, Mutex};
use crate::error::Result;
use crate::mesh::{MeshCache, MeshCacheConfig, MeshCacheDesc};

pub use fixtures::{box_geometry, merged_payload, subsets_payload, unit_box};
pub use loader::{MockLoadMode, MockLoader};
pub use registries::{MockGeometryRegistry, MockMaterialRegistry, MockPipelineRegistry};

/// The four mock collaborators, shared with the cache built from them
#[derive(Clone, Default)]
pub struct MockBackend {
    pub loader: Arc<Mutex<MockLoader>>,
    pub geometries: Arc<Mutex<MockGeometryRegistry>>,
    pub materials: Arc<Mutex<MockMaterialRegistry>>,
    pub pipelines: Arc<Mutex<MockPipelineRegistry>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache descriptor sharing these collaborators
    pub fn desc(&self, config: MeshCacheConfig) -> MeshCacheDesc {
        MeshCacheDesc {
            config,
            loader: self.loader.clone(),
            geometries: self.geometries.clone(),
            materials: self.materials.clone(),
            pipelines: self.pipelines.clone(),
        }
    }

    /// Build a cache over these collaborators
    pub fn cache(&self, config: MeshCacheConfig) -> Result<MeshCache> {
        MeshCache::new(self.desc(config))
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
