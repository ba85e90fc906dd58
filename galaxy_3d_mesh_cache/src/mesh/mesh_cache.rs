/// MeshCache: shared mesh assets and their placed instances.
///
/// Owns the asset and instance tables plus the dedup key index. Geometry,
/// material and pipeline objects belong to injected registries; the cache
/// only holds reference counts on them.
///
/// All mutation happens on the owning thread. The loader may work on other
/// threads, but its results are only observed through [`MeshCache::pump`].
///
/// The operations are split by concern across sibling files:
/// - `asset_registry.rs`: acquire / release / build / teardown
/// - `resolve.rs`: the resolution pump
/// - `instance.rs`: instances, bounds, pipeline bind state
/// - `batch.rs`: batched instance creation

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::error::Result;
use crate::engine_bail;
use crate::loader::ResourceLoader;
use crate::registry::{GeometryRegistry, MaterialRegistry, PipelineRegistry};
use crate::utils::SlotTable;
use super::asset::{LoadingState, MeshAsset, MeshAssetHandle, PipelineDomain};
use super::config::{MeshCacheConfig, MeshCacheDesc};
use super::instance::MeshInstance;
use super::key_index::{AssetKey, AssetKeyIndex};

pub(crate) const LOG_SOURCE: &str = "galaxy3d::MeshCache";

/// Lock a collaborator, recovering the guard if a previous holder panicked
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of table occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshCacheStats {
    pub assets_pending: u32,
    pub assets_loaded: u32,
    pub assets_failed: u32,
    pub instances: u32,
    pub instances_pending: u32,
    /// Submesh bind states currently held across all instances
    pub bound_states: u32,
}

/// Mesh asset + instance cache
pub struct MeshCache {
    pub(crate) config: MeshCacheConfig,
    pub(crate) loader: Arc<Mutex<dyn ResourceLoader>>,
    pub(crate) geometries: Arc<Mutex<dyn GeometryRegistry>>,
    pub(crate) materials: Arc<Mutex<dyn MaterialRegistry>>,
    pub(crate) pipelines: Arc<Mutex<dyn PipelineRegistry>>,
    pub(crate) assets: SlotTable<MeshAsset>,
    pub(crate) instances: SlotTable<MeshInstance>,
    pub(crate) key_index: AssetKeyIndex,
}

impl MeshCache {
    /// Create a cache from its collaborators and configuration
    ///
    /// Fails with `InitializationFailed` on a zero capacity or pool size.
    pub fn new(desc: MeshCacheDesc) -> Result<Self> {
        let config = desc.config;
        if config.max_assets == 0 {
            engine_bail!(LOG_SOURCE, InitializationFailed, "max_assets must be greater than zero");
        }
        if config.max_instances == 0 {
            engine_bail!(LOG_SOURCE, InitializationFailed, "max_instances must be greater than zero");
        }
        if config.load_arena_pool_size == 0 {
            engine_bail!(LOG_SOURCE, InitializationFailed, "load_arena_pool_size must be greater than zero");
        }
        if config.pending_deadline == Some(0) {
            engine_bail!(LOG_SOURCE, InitializationFailed, "pending_deadline must be at least one tick");
        }

        crate::engine_info!(LOG_SOURCE,
            "Mesh cache created ({} assets, {} instances, {} concurrent loads)",
            config.max_assets, config.max_instances, config.load_arena_pool_size);

        Ok(Self {
            assets: SlotTable::new("asset", config.max_assets),
            instances: SlotTable::new("instance", config.max_instances),
            key_index: AssetKeyIndex::new(),
            loader: desc.loader,
            geometries: desc.geometries,
            materials: desc.materials,
            pipelines: desc.pipelines,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &MeshCacheConfig {
        &self.config
    }

    // ===== ASSET QUERIES =====

    /// Get an asset by handle
    pub fn asset(&self, handle: MeshAssetHandle) -> Result<&MeshAsset> {
        self.assets.get(handle)
    }

    /// Loading state of an asset
    pub fn asset_state(&self, handle: MeshAssetHandle) -> Result<LoadingState> {
        Ok(self.assets.get(handle)?.state)
    }

    /// Reference count of an asset
    pub fn asset_ref_count(&self, handle: MeshAssetHandle) -> Result<u32> {
        Ok(self.assets.get(handle)?.ref_count)
    }

    /// Look up the asset serving a key without acquiring it
    pub fn find_asset(
        &self,
        path: &str,
        domain: PipelineDomain,
        shader_override: &str,
    ) -> Option<MeshAssetHandle> {
        let key = AssetKey::new(path, domain, shader_override);
        self.key_index
            .get(key.as_str())
            .filter(|&handle| self.assets.contains(handle))
    }

    /// Number of live assets (any state)
    pub fn asset_count(&self) -> u32 {
        self.assets.len()
    }

    /// Handles of every live asset
    pub fn live_asset_handles(&self) -> Vec<MeshAssetHandle> {
        self.assets.handles()
    }

    // ===== STATS =====

    /// Count assets per state, instances and bound submesh states
    pub fn stats(&self) -> MeshCacheStats {
        let mut stats = MeshCacheStats::default();
        for (_, asset) in self.assets.iter() {
            match asset.state {
                LoadingState::Pending => stats.assets_pending += 1,
                LoadingState::Loaded => stats.assets_loaded += 1,
                LoadingState::Failed => stats.assets_failed += 1,
                LoadingState::NotLoaded => {}
            }
        }
        for (_, instance) in self.instances.iter() {
            stats.instances += 1;
            if instance.state == LoadingState::Pending {
                stats.instances_pending += 1;
            }
            stats.bound_states += instance.bound_state_count() as u32;
        }
        stats
    }

    // ===== TEARDOWN =====

    /// Destroy every instance and tear down every asset regardless of ref count
    pub fn clear(&mut self) {
        for handle in self.instances.handles() {
            if let Err(err) = self.destroy_instance(handle) {
                crate::engine_warn!(LOG_SOURCE, "Failed to destroy instance {:?} during clear: {}", handle, err);
            }
        }
        for handle in self.assets.handles() {
            self.destroy_asset(handle);
        }
    }
}

impl Drop for MeshCache {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "mesh_cache_tests.rs"]
mod tests;
