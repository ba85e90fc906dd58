//! Mesh instances.
//!
//! An instance is one placement of an asset in the world: a model matrix,
//! a visibility flag and a render id used for picking. It mirrors the loading
//! state of its asset and, once the asset is Loaded, caches one pipeline bind
//! state per submesh.

use glam::Mat4;
use crate::error::Result;
use crate::{engine_bail, engine_debug};
use crate::registry::{BindStateHandle, PipelineHandle, PipelineRegistry};
use crate::utils::Handle;
use super::asset::{LoadingState, MeshAssetHandle};
use super::bounds::BoundingSphere;
use super::mesh_cache::{lock, MeshCache, LOG_SOURCE};

/// Handle to a mesh instance
pub type MeshInstanceHandle = Handle<MeshInstance>;

// ===== SUBMESH STATE =====

/// Cached pipeline binding of one submesh of one instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSubmeshInstanceState {
    pub(crate) pipeline: PipelineHandle,
    pub(crate) bind_state: Option<BindStateHandle>,
    pub(crate) dirty: bool,
}

impl Default for MeshSubmeshInstanceState {
    fn default() -> Self {
        Self {
            pipeline: PipelineHandle::INVALID,
            bind_state: None,
            dirty: true,
        }
    }
}

impl MeshSubmeshInstanceState {
    /// Pipeline the bind state was created for
    pub fn pipeline(&self) -> PipelineHandle {
        self.pipeline
    }

    pub fn bind_state(&self) -> Option<BindStateHandle> {
        self.bind_state
    }

    /// Whether the next refresh must rebuild the bind state
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

// ===== INSTANCE =====

/// One placed occurrence of a mesh asset
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub(crate) handle: MeshInstanceHandle,
    pub(crate) asset: MeshAssetHandle,
    pub(crate) model: Mat4,
    pub(crate) render_id: u32,
    pub(crate) visible: bool,
    pub(crate) state: LoadingState,
    pub(crate) world_sphere: Option<BoundingSphere>,
    pub(crate) submesh_states: Vec<MeshSubmeshInstanceState>,
}

impl MeshInstance {
    pub fn handle(&self) -> MeshInstanceHandle {
        self.handle
    }

    pub fn asset(&self) -> MeshAssetHandle {
        self.asset
    }

    pub fn model(&self) -> &Mat4 {
        &self.model
    }

    /// Id written to the picking buffer
    pub fn render_id(&self) -> u32 {
        self.render_id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Loading state mirrored from the asset
    pub fn state(&self) -> LoadingState {
        self.state
    }

    /// World-space bounding sphere, None until the asset is Loaded
    pub fn world_sphere(&self) -> Option<&BoundingSphere> {
        self.world_sphere.as_ref()
    }

    pub fn submesh_states(&self) -> &[MeshSubmeshInstanceState] {
        &self.submesh_states
    }

    /// Number of submeshes currently holding a bind state
    pub fn bound_state_count(&self) -> usize {
        self.submesh_states.iter().filter(|s| s.bind_state.is_some()).count()
    }

    /// Switch to Loaded: one dirty state per submesh and fresh world bounds
    pub(crate) fn attach_loaded(&mut self, submesh_count: usize, local_sphere: Option<&BoundingSphere>) {
        self.submesh_states = vec![MeshSubmeshInstanceState::default(); submesh_count];
        self.world_sphere = local_sphere.map(|sphere| sphere.transformed(&self.model));
        self.state = LoadingState::Loaded;
    }

    /// Give every bind state back to the pipeline registry and drop the array
    pub(crate) fn release_bind_states(&mut self, pipelines: &mut dyn PipelineRegistry) {
        for state in self.submesh_states.drain(..) {
            if let Some(bind_state) = state.bind_state {
                pipelines.release_instance_state(state.pipeline, bind_state);
            }
        }
    }
}

fn is_finite_matrix(model: &Mat4) -> bool {
    model.to_cols_array().iter().all(|v| v.is_finite())
}

// ===== CACHE OPERATIONS =====

impl MeshCache {
    /// Place an instance of `asset`.
    ///
    /// The asset is pumped once first. A Failed asset rejects the creation with
    /// its recorded error; a Pending asset yields a Pending instance that the
    /// resolution pump completes later.
    pub fn create_instance(
        &mut self,
        asset: MeshAssetHandle,
        model: Mat4,
        render_id: u32,
        visible: bool,
    ) -> Result<MeshInstanceHandle> {
        let state = self.pump_asset(asset)?;
        if state == LoadingState::Failed {
            let error = self.assets.get(asset)?.last_error.clone();
            return Err(error.unwrap_or_else(|| crate::engine_err!(LOG_SOURCE, ResourceCreationFailed,
                "create_instance: asset {:?} failed to load", asset)));
        }
        if !is_finite_matrix(&model) {
            engine_bail!(LOG_SOURCE, InvalidParameter,
                "create_instance: model matrix contains non-finite values");
        }

        let asset_entry = self.assets.get(asset)?;
        let submesh_count = asset_entry.submeshes.len();
        let local_sphere = asset_entry.local_sphere;

        let handle = self.instances.insert_with(|handle| {
            let mut instance = MeshInstance {
                handle,
                asset,
                model,
                render_id,
                visible,
                state,
                world_sphere: None,
                submesh_states: Vec::new(),
            };
            if state == LoadingState::Loaded {
                instance.attach_loaded(submesh_count, local_sphere.as_ref());
            }
            instance
        })?;

        let asset_entry = self.assets.get_mut(asset)?;
        asset_entry.ref_count += 1;
        asset_entry.instance_refs += 1;
        Ok(handle)
    }

    /// Destroy an instance, releasing its bind states and its asset reference.
    ///
    /// Nothing is changed when the instance or its asset is not live.
    pub fn destroy_instance(&mut self, handle: MeshInstanceHandle) -> Result<()> {
        let asset = self.instances.get(handle)?.asset;
        self.assets.get(asset)?;

        let mut instance = self.instances.remove(handle)?;
        instance.release_bind_states(&mut *lock(&self.pipelines));
        self.drop_reference(asset, true);
        Ok(())
    }

    // ===== INSTANCE MUTATION =====

    /// Move an instance; world bounds follow when the asset is Loaded
    pub fn set_instance_transform(&mut self, handle: MeshInstanceHandle, model: Mat4) -> Result<()> {
        if !is_finite_matrix(&model) {
            engine_bail!(LOG_SOURCE, InvalidParameter,
                "set_instance_transform: model matrix contains non-finite values");
        }
        let asset = self.instances.get(handle)?.asset;
        let local_sphere = self.assets.get(asset).ok().and_then(|a| a.local_sphere);

        let instance = self.instances.get_mut(handle)?;
        instance.model = model;
        if instance.state == LoadingState::Loaded {
            instance.world_sphere = local_sphere.map(|sphere| sphere.transformed(&model));
        }
        Ok(())
    }

    pub fn set_instance_visible(&mut self, handle: MeshInstanceHandle, visible: bool) -> Result<()> {
        self.instances.get_mut(handle)?.visible = visible;
        Ok(())
    }

    pub fn set_instance_render_id(&mut self, handle: MeshInstanceHandle, render_id: u32) -> Result<()> {
        self.instances.get_mut(handle)?.render_id = render_id;
        Ok(())
    }

    // ===== PIPELINE BIND STATE =====

    /// Make submesh `submesh_index` of `handle` bound to `desired`.
    ///
    /// Returns `Ok(false)` when the cached state already matches (the cheap
    /// per-frame path), `Ok(true)` when a new bind state was created. The new
    /// state is acquired before the old one is released, so a failed acquire
    /// leaves the previous binding in place.
    pub fn refresh_pipeline(
        &mut self,
        handle: MeshInstanceHandle,
        submesh_index: usize,
        desired: PipelineHandle,
    ) -> Result<bool> {
        if !desired.is_valid() {
            engine_bail!(LOG_SOURCE, InvalidParameter, "refresh_pipeline: invalid pipeline handle");
        }
        let instance = self.instances.get_mut(handle)?;
        if instance.state != LoadingState::Loaded {
            engine_bail!(LOG_SOURCE, ResourceNotLoaded,
                "refresh_pipeline: instance {:?} is {:?}", handle, instance.state);
        }
        let submesh_count = instance.submesh_states.len();
        let Some(state) = instance.submesh_states.get_mut(submesh_index) else {
            engine_bail!(LOG_SOURCE, InvalidParameter,
                "refresh_pipeline: submesh {} out of range ({} submeshes)", submesh_index, submesh_count);
        };

        if state.pipeline == desired && state.bind_state.is_some() && !state.dirty {
            return Ok(false);
        }

        let mut pipelines = lock(&self.pipelines);
        let bind_state = pipelines.acquire_instance_state(desired)?;
        if let Some(old) = state.bind_state.take() {
            pipelines.release_instance_state(state.pipeline, old);
        }
        state.pipeline = desired;
        state.bind_state = Some(bind_state);
        state.dirty = false;
        Ok(true)
    }

    /// Mark every bind state created for `pipeline` dirty; returns how many
    pub fn invalidate_pipeline(&mut self, pipeline: PipelineHandle) -> usize {
        let mut count = 0;
        for handle in self.instances.handles() {
            let Ok(instance) = self.instances.get_mut(handle) else {
                continue;
            };
            for state in instance.submesh_states.iter_mut() {
                if state.pipeline == pipeline && state.bind_state.is_some() {
                    state.dirty = true;
                    count += 1;
                }
            }
        }
        if count > 0 {
            engine_debug!(LOG_SOURCE, "Pipeline {:?} invalidated, {} bind state(s) dirty", pipeline, count);
        }
        count
    }

    // ===== INSTANCE QUERIES =====

    pub fn instance(&self, handle: MeshInstanceHandle) -> Result<&MeshInstance> {
        self.instances.get(handle)
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len()
    }

    /// Handles of every live instance
    pub fn live_instance_handles(&self) -> Vec<MeshInstanceHandle> {
        self.instances.handles()
    }

    /// Dense iteration over live instances
    pub fn instances(&self) -> impl Iterator<Item = &MeshInstance> + '_ {
        self.instances.iter().map(|(_, instance)| instance)
    }

    /// Instances the renderer should draw this frame (visible and Loaded)
    pub fn visible_ready_instances(&self) -> impl Iterator<Item = &MeshInstance> + '_ {
        self.instances()
            .filter(|instance| instance.visible && instance.state == LoadingState::Loaded)
    }

    /// Total bind states held across all instances
    pub fn bound_state_count(&self) -> usize {
        self.instances().map(MeshInstance::bound_state_count).sum()
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
