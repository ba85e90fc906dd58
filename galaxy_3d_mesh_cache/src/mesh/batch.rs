/// Batched instance creation.
///
/// Requests are processed in waves bounded by the load-arena pool size. Each
/// wave deduplicates its requests by asset key, acquires every distinct asset
/// once, creates the instances, then drops the temporary acquisitions so that
/// the instances are the only owners left.

use glam::Mat4;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::engine_debug;
use super::asset::{MeshAssetHandle, PipelineDomain};
use super::instance::MeshInstanceHandle;
use super::key_index::AssetKey;
use super::mesh_cache::{MeshCache, LOG_SOURCE};

/// One instance request of a batch
#[derive(Debug, Clone)]
pub struct MeshInstanceDesc {
    pub path: String,
    pub domain: PipelineDomain,
    pub shader_override: String,
    pub model: Mat4,
    pub render_id: u32,
    pub visible: bool,
}

impl MeshInstanceDesc {
    /// Visible, opaque, default-shaded instance of `path`
    pub fn new(path: impl Into<String>, model: Mat4) -> Self {
        Self {
            path: path.into(),
            domain: PipelineDomain::Opaque,
            shader_override: String::new(),
            model,
            render_id: 0,
            visible: true,
        }
    }
}

impl MeshCache {
    /// Create one instance per descriptor.
    ///
    /// Failures are reported per element: the output has one entry per input,
    /// in input order, each holding its own handle or error.
    pub fn create_instances_batch(
        &mut self,
        descs: &[MeshInstanceDesc],
    ) -> Vec<Result<MeshInstanceHandle>> {
        let mut results = Vec::with_capacity(descs.len());
        if descs.is_empty() {
            return results;
        }

        let wave_size = (self.config.load_arena_pool_size as usize).clamp(1, descs.len());
        for (wave_index, wave) in descs.chunks(wave_size).enumerate() {
            self.run_wave(wave_index, wave, &mut results);
        }
        results
    }

    fn run_wave(
        &mut self,
        wave_index: usize,
        wave: &[MeshInstanceDesc],
        results: &mut Vec<Result<MeshInstanceHandle>>,
    ) {
        // Dispatch every distinct load before consuming any result
        let mut slots: FxHashMap<AssetKey, usize> = FxHashMap::default();
        let mut acquired: Vec<Result<MeshAssetHandle>> = Vec::new();
        let mut request_slot = Vec::with_capacity(wave.len());
        for desc in wave {
            let key = AssetKey::new(&desc.path, desc.domain, &desc.shader_override);
            let slot = *slots.entry(key).or_insert_with(|| {
                acquired.push(self.acquire_asset(&desc.path, desc.domain, &desc.shader_override));
                acquired.len() - 1
            });
            request_slot.push(slot);
        }

        let mut created = 0usize;
        for (desc, &slot) in wave.iter().zip(&request_slot) {
            let result = match &acquired[slot] {
                Ok(asset) => self.create_instance(*asset, desc.model, desc.render_id, desc.visible),
                Err(err) => Err(err.clone()),
            };
            if result.is_ok() {
                created += 1;
            }
            results.push(result);
        }

        // Instances now own their assets
        for asset in acquired.iter().flatten() {
            if let Err(err) = self.release_asset(*asset) {
                crate::engine_warn!(LOG_SOURCE, "Batch wave {}: release of {:?} failed: {}", wave_index, asset, err);
            }
        }

        engine_debug!(LOG_SOURCE, "Batch wave {}: {} request(s), {} distinct asset(s), {} instance(s) created",
            wave_index, wave.len(), acquired.len(), created);
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
