/// Async resolution pump.
///
/// Drives `Pending` assets to `Loaded` or `Failed` by polling the loader, then
/// fans the new state out to every instance of the asset.

use crate::error::{Error, Result};
use crate::{engine_debug, engine_err, engine_warn};
use crate::loader::{LoadStatus, ResolvedResource, UnloadTarget};
use super::asset::{LoadingState, MeshAssetHandle};
use super::asset_registry::build_submeshes;
use super::mesh_cache::{lock, MeshCache, LOG_SOURCE};

impl MeshCache {
    /// Advance every pending asset by one tick.
    ///
    /// Assets pending for longer than `pending_deadline` ticks are failed
    /// with a timeout. Returns the number of assets that left `Pending`.
    pub fn pump(&mut self) -> usize {
        let pending: Vec<MeshAssetHandle> = self
            .assets
            .iter()
            .filter(|(_, asset)| asset.state == LoadingState::Pending)
            .map(|(handle, _)| handle)
            .collect();

        let mut transitions = 0;
        for handle in pending {
            let Ok(asset) = self.assets.get_mut(handle) else {
                continue;
            };
            asset.pending_ticks += 1;
            let ticks = asset.pending_ticks;
            let path = asset.path.clone();

            // The loader gets its poll on the deadline tick too
            let mut state = self.resolve_pending(handle);
            if let Some(deadline) = self.config.pending_deadline {
                if state == LoadingState::Pending && ticks > deadline {
                    let message = format!(
                        "Mesh '{}' load timed out after {} pump ticks", path, deadline
                    );
                    engine_warn!(LOG_SOURCE, "{}", message);
                    self.fail_asset(handle, Error::ResourceCreationFailed(message));
                    state = LoadingState::Failed;
                }
            }
            if state != LoadingState::Pending {
                transitions += 1;
            }
        }
        transitions
    }

    /// Resolve one asset on demand without advancing its deadline
    pub fn pump_asset(&mut self, handle: MeshAssetHandle) -> Result<LoadingState> {
        self.assets.get(handle)?;
        Ok(self.resolve_pending(handle))
    }

    /// Poll the loader for one asset and apply a terminal result
    fn resolve_pending(&mut self, handle: MeshAssetHandle) -> LoadingState {
        let (token, path) = match self.assets.get(handle) {
            Ok(asset) if asset.state == LoadingState::Pending => match asset.pending {
                Some(token) => (token, asset.path.clone()),
                None => return asset.state,
            },
            Ok(asset) => return asset.state,
            Err(_) => return LoadingState::NotLoaded,
        };

        let status = lock(&self.loader).poll(token);
        if status.is_in_flight() {
            return LoadingState::Pending;
        }

        let resolved = match status {
            LoadStatus::Failed(reason) => Err(engine_err!(LOG_SOURCE, ResourceCreationFailed,
                "Mesh '{}' failed to load: {}", path, reason)),
            _ => match lock(&self.loader).try_get_resolved(token) {
                Some(ResolvedResource::Mesh(payload)) => Ok(payload),
                Some(ResolvedResource::Other(kind)) => Err(engine_err!(LOG_SOURCE, ResourceCreationFailed,
                    "Loader resolved mesh '{}' as a {:?}", path, kind)),
                None => Err(engine_err!(LOG_SOURCE, ResourceCreationFailed,
                    "Loader reported mesh '{}' ready without a payload", path)),
            },
        };

        let built = resolved.and_then(|payload| {
            let mut geometries = lock(&self.geometries);
            let mut materials = lock(&self.materials);
            build_submeshes(
                &path,
                &payload,
                &mut *geometries,
                &mut *materials,
                self.config.build_opaque_index_buffer,
            )
        });

        match built {
            Ok(built) => {
                lock(&self.loader).unload(UnloadTarget::Token(token));
                let Ok(asset) = self.assets.get_mut(handle) else {
                    return LoadingState::NotLoaded;
                };
                asset.set_loaded(built.submeshes, built.opaque_indices);
                engine_debug!(LOG_SOURCE, "Asset {:?} '{}' resolved ({} submeshes)",
                    handle, path, asset.submeshes.len());
                self.propagate_loaded(handle);
                LoadingState::Loaded
            }
            Err(error) => {
                self.fail_asset(handle, error);
                LoadingState::Failed
            }
        }
    }

    /// Release the load token, mark the asset Failed and fail its instances
    fn fail_asset(&mut self, handle: MeshAssetHandle, error: Error) {
        let Ok(asset) = self.assets.get(handle) else {
            return;
        };
        if let Some(token) = asset.pending {
            lock(&self.loader).unload(UnloadTarget::Token(token));
        }
        self.record_failure(handle, error);
        self.propagate_failed(handle);
    }

    /// Give every pending instance of a freshly loaded asset its bind-state
    /// array and world bounds
    fn propagate_loaded(&mut self, asset_handle: MeshAssetHandle) {
        let Ok(asset) = self.assets.get(asset_handle) else {
            return;
        };
        let submesh_count = asset.submeshes.len();
        let local_sphere = asset.local_sphere;

        let mut updated = 0usize;
        for handle in self.instances.handles() {
            let Ok(instance) = self.instances.get_mut(handle) else {
                continue;
            };
            if instance.asset == asset_handle && instance.state == LoadingState::Pending {
                instance.attach_loaded(submesh_count, local_sphere.as_ref());
                updated += 1;
            }
        }
        if updated > 0 {
            engine_debug!(LOG_SOURCE, "Asset {:?} loaded, {} instance(s) updated", asset_handle, updated);
        }
    }

    /// Tear down bind state and bounds of every instance of a failed asset
    fn propagate_failed(&mut self, asset_handle: MeshAssetHandle) {
        let mut pipelines = lock(&self.pipelines);
        for handle in self.instances.handles() {
            let Ok(instance) = self.instances.get_mut(handle) else {
                continue;
            };
            if instance.asset == asset_handle {
                instance.release_bind_states(&mut *pipelines);
                instance.world_sphere = None;
                instance.state = LoadingState::Failed;
            }
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
