/// Asset acquisition, deduplication, submesh building and teardown.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use rustc_hash::FxHasher;
use crate::error::{Error, Result};
use crate::{engine_bail, engine_debug, engine_err, engine_warn};
use crate::loader::{
    LoadOutcome, MeshPayload, MeshSubset, ResolvedResource, ResourceKind, SubmeshRange,
    UnloadTarget,
};
use crate::registry::{
    GeometryConfig, GeometryData, GeometryHandle, GeometryRegistry, IndexFormat,
    MaterialHandle, MaterialRegistry,
};
use super::asset::{
    LoadingState, MeshAsset, MeshAssetHandle, MeshAssetSubmesh, OpaqueIndexBuffer,
    PipelineDomain, SubmeshFlags,
};
use super::bounds::BoundingBox;
use super::key_index::AssetKey;
use super::mesh_cache::{lock, MeshCache, LOG_SOURCE};

// ============================================================================
// GEOMETRY NAMING
// ============================================================================

/// Which geometry of a source file a registry name refers to
#[derive(Debug, Clone, Copy, Hash)]
enum GeometryPart {
    /// Standalone subset `n`
    Subset(usize),
    /// The merged vertex/index buffer
    Merged,
    /// Opaque-only index buffer over the merged vertices
    OpaqueIndices,
}

/// Stable registry name for a geometry of `path`.
///
/// Every asset reading the same file resolves to the same names, so their
/// geometries are uploaded once and ref-counted by the registry.
fn geometry_name(path: &str, part: GeometryPart) -> String {
    let mut hasher = FxHasher::default();
    path.hash(&mut hasher);
    part.hash(&mut hasher);
    format!("mesh:{:016x}", hasher.finish())
}

/// Take a reference on the named geometry, creating it on first use
fn acquire_or_create_geometry(
    geometries: &mut dyn GeometryRegistry,
    name: String,
    data: &GeometryData,
) -> Result<GeometryHandle> {
    match geometries.acquire_by_name(&name) {
        Ok(handle) => Ok(handle),
        Err(err) if err.is_not_loaded() => geometries.create(GeometryConfig {
            name,
            data: data.clone(),
        }),
        Err(err) => Err(err),
    }
}

// ============================================================================
// SUBMESH BUILDING
// ============================================================================

/// Submeshes built from a loader payload
pub(crate) struct BuiltSubmeshes {
    pub submeshes: Vec<MeshAssetSubmesh>,
    pub opaque_indices: Option<OpaqueIndexBuffer>,
}

/// Build every submesh of `payload`.
///
/// On failure every reference taken so far is released before the error is
/// returned, so a failed build leaves registry ref counts untouched.
pub(crate) fn build_submeshes(
    path: &str,
    payload: &MeshPayload,
    geometries: &mut dyn GeometryRegistry,
    materials: &mut dyn MaterialRegistry,
    build_opaque: bool,
) -> Result<BuiltSubmeshes> {
    if payload.submesh_count() == 0 {
        engine_bail!(LOG_SOURCE, ResourceCreationFailed,
            "Mesh '{}' resolved to a payload without submeshes", path);
    }

    let mut built = Vec::with_capacity(payload.submesh_count());
    let result = match payload {
        MeshPayload::Subsets(subsets) => {
            build_subsets(path, subsets, geometries, materials, &mut built)
        }
        MeshPayload::Merged { buffer, ranges } => {
            build_merged(path, buffer, ranges, geometries, materials, &mut built)
        }
    };
    if let Err(err) = result {
        release_submeshes(&built, geometries, materials);
        return Err(err);
    }

    let opaque_indices = match payload {
        MeshPayload::Merged { buffer, .. } if build_opaque => {
            build_opaque_index_buffer(path, buffer, &built, geometries)
        }
        _ => None,
    };

    Ok(BuiltSubmeshes { submeshes: built, opaque_indices })
}

/// Add a reference on a loader-provided material
fn adopt_material(
    materials: &mut dyn MaterialRegistry,
    material: Option<MaterialHandle>,
) -> Result<(MaterialHandle, SubmeshFlags)> {
    let Some(material) = material.filter(|m| m.is_valid()) else {
        return Ok((MaterialHandle::INVALID, SubmeshFlags::empty()));
    };
    materials.add_ref(material)?;
    let mut flags = SubmeshFlags::OWNS_MATERIAL;
    if materials.get(material).is_some_and(|info| info.is_alpha_cutout()) {
        flags |= SubmeshFlags::ALPHA_CUTOUT;
    }
    Ok((material, flags))
}

/// Acquire a material by name. A missing name is not fatal: the submesh is
/// built without a material and the renderer falls back to its default.
fn acquire_named_material(
    path: &str,
    materials: &mut dyn MaterialRegistry,
    name: Option<&str>,
) -> Result<(MaterialHandle, SubmeshFlags)> {
    let Some(name) = name else {
        return Ok((MaterialHandle::INVALID, SubmeshFlags::empty()));
    };
    match materials.acquire(name) {
        Ok(material) => {
            let mut flags = SubmeshFlags::OWNS_MATERIAL;
            if materials.get(material).is_some_and(|info| info.is_alpha_cutout()) {
                flags |= SubmeshFlags::ALPHA_CUTOUT;
            }
            Ok((material, flags))
        }
        Err(err) if err.is_not_loaded() => {
            engine_warn!(LOG_SOURCE, "Mesh '{}': material '{}' not found, using default", path, name);
            Ok((MaterialHandle::INVALID, SubmeshFlags::empty()))
        }
        Err(err) => Err(err),
    }
}

fn build_subsets(
    path: &str,
    subsets: &[MeshSubset],
    geometries: &mut dyn GeometryRegistry,
    materials: &mut dyn MaterialRegistry,
    built: &mut Vec<MeshAssetSubmesh>,
) -> Result<()> {
    for (index, subset) in subsets.iter().enumerate() {
        let name = geometry_name(path, GeometryPart::Subset(index));
        let geometry = acquire_or_create_geometry(geometries, name, &subset.geometry)?;

        let (material, material_flags) = match adopt_material(materials, subset.material) {
            Ok(material) => material,
            Err(err) => {
                geometries.release(geometry);
                return Err(err);
            }
        };

        let index_count = geometries
            .get(geometry)
            .map(|info| info.index_count)
            .unwrap_or_else(|| subset.geometry.index_count());

        built.push(MeshAssetSubmesh {
            geometry,
            material,
            flags: SubmeshFlags::OWNS_GEOMETRY | material_flags,
            shader_override: subset.shader_override.clone(),
            domain: subset.domain,
            first_index: 0,
            index_count,
            vertex_offset: 0,
            bounds: subset.geometry.bounds,
        });
    }
    Ok(())
}

fn build_merged(
    path: &str,
    buffer: &GeometryData,
    ranges: &[SubmeshRange],
    geometries: &mut dyn GeometryRegistry,
    materials: &mut dyn MaterialRegistry,
    built: &mut Vec<MeshAssetSubmesh>,
) -> Result<()> {
    let total_indices = buffer.index_count();
    for (index, range) in ranges.iter().enumerate() {
        let end = range.first_index.checked_add(range.index_count);
        if range.index_count == 0 || end.is_none_or(|end| end > total_indices) {
            engine_bail!(LOG_SOURCE, InvalidParameter,
                "Mesh '{}': submesh {} range {}+{} exceeds {} indices",
                path, index, range.first_index, range.index_count, total_indices);
        }
    }

    // The merged buffer is uploaded once; later submeshes add references to it
    let mut shared: Option<GeometryHandle> = None;
    for range in ranges {
        let geometry = match shared {
            Some(geometry) => {
                geometries.acquire(geometry)?;
                geometry
            }
            None => {
                let name = geometry_name(path, GeometryPart::Merged);
                let geometry = acquire_or_create_geometry(geometries, name, buffer)?;
                shared = Some(geometry);
                geometry
            }
        };

        let (material, material_flags) =
            match acquire_named_material(path, materials, range.material.as_deref()) {
                Ok(material) => material,
                Err(err) => {
                    geometries.release(geometry);
                    return Err(err);
                }
            };

        built.push(MeshAssetSubmesh {
            geometry,
            material,
            flags: SubmeshFlags::OWNS_GEOMETRY | material_flags,
            shader_override: range.shader_override.clone(),
            domain: range.domain,
            first_index: range.first_index,
            index_count: range.index_count,
            vertex_offset: range.vertex_offset,
            bounds: range.bounds,
        });
    }
    Ok(())
}

/// Build the opaque-only index buffer of a merged mesh.
///
/// Skipped when the split would not reduce work (no cutout or no opaque
/// range) and, with a warning, when indices are not 32-bit. Creation failure
/// only disables the optimization.
fn build_opaque_index_buffer(
    path: &str,
    buffer: &GeometryData,
    submeshes: &[MeshAssetSubmesh],
    geometries: &mut dyn GeometryRegistry,
) -> Option<OpaqueIndexBuffer> {
    let cutout_count = submeshes.iter().filter(|s| s.is_alpha_cutout()).count();
    if cutout_count == 0 || cutout_count == submeshes.len() {
        return None;
    }
    if buffer.index_format != IndexFormat::U32 {
        engine_warn!(LOG_SOURCE,
            "Mesh '{}': opaque index buffer skipped, index width is {} bytes (expected 4)",
            path, buffer.index_format.size_bytes());
        return None;
    }

    let mut indices: Vec<u32> = Vec::new();
    let mut bounds = BoundingBox::EMPTY;
    for submesh in submeshes.iter().filter(|s| !s.is_alpha_cutout()) {
        let start = submesh.first_index as usize * 4;
        let end = start + submesh.index_count as usize * 4;
        let bytes = buffer.index_data.get(start..end)?;
        indices.extend(
            bytes
                .chunks_exact(4)
                .map(|chunk| bytemuck::pod_read_unaligned::<u32>(chunk))
                .map(|index| index.wrapping_add_signed(submesh.vertex_offset)),
        );
        bounds = bounds.union(&submesh.bounds);
    }

    let data = GeometryData {
        vertex_data: Arc::clone(&buffer.vertex_data),
        vertex_stride: buffer.vertex_stride,
        index_data: Arc::from(bytemuck::cast_slice::<u32, u8>(&indices)),
        index_format: IndexFormat::U32,
        bounds,
    };
    let name = geometry_name(path, GeometryPart::OpaqueIndices);
    match acquire_or_create_geometry(geometries, name, &data) {
        Ok(geometry) => Some(OpaqueIndexBuffer {
            geometry,
            index_count: indices.len() as u32,
        }),
        Err(err) => {
            engine_warn!(LOG_SOURCE, "Mesh '{}': opaque index buffer creation failed: {}", path, err);
            None
        }
    }
}

/// Give back every geometry/material reference held by `submeshes`
pub(crate) fn release_submeshes(
    submeshes: &[MeshAssetSubmesh],
    geometries: &mut dyn GeometryRegistry,
    materials: &mut dyn MaterialRegistry,
) {
    for submesh in submeshes {
        if submesh.flags.contains(SubmeshFlags::OWNS_GEOMETRY) {
            geometries.release(submesh.geometry);
        }
        if submesh.flags.contains(SubmeshFlags::OWNS_MATERIAL) {
            materials.release(submesh.material);
        }
    }
}

// ============================================================================
// ACQUIRE / RELEASE
// ============================================================================

impl MeshCache {
    /// Acquire the asset for `(path, domain, shader_override)`.
    ///
    /// A live asset with the same key is shared: its reference count is
    /// incremented after pumping it once, so the caller sees its current state.
    /// Otherwise a new asset is created and a load is issued; the call never
    /// waits for the load to finish.
    pub fn acquire_asset(
        &mut self,
        path: &str,
        domain: PipelineDomain,
        shader_override: &str,
    ) -> Result<MeshAssetHandle> {
        if path.is_empty() {
            engine_bail!(LOG_SOURCE, InvalidParameter, "acquire_asset: empty mesh path");
        }

        let key = AssetKey::new(path, domain, shader_override);

        // A pending hit may fail right here, which drops it from the index
        if let Some(handle) = self.key_index.get(key.as_str()) {
            self.pump_asset(handle)?;
        }

        if let Some(handle) = self.key_index.get(key.as_str()) {
            let asset = self.assets.get_mut(handle)?;
            asset.ref_count += 1;
            engine_debug!(LOG_SOURCE, "Reusing asset {:?} '{}' (refs: {})",
                handle, path, asset.ref_count);
            return Ok(handle);
        }

        self.create_asset(key, path, domain, shader_override)
    }

    fn create_asset(
        &mut self,
        key: AssetKey,
        path: &str,
        domain: PipelineDomain,
        shader_override: &str,
    ) -> Result<MeshAssetHandle> {
        let key = key.into_string();
        let handle = self
            .assets
            .insert_with(|handle| MeshAsset::new(handle, path, domain, shader_override, key.clone()))
            .map_err(|err| engine_err!(LOG_SOURCE, OutOfCapacity, "Cannot create asset '{}': {}", path, err))?;

        let outcome = lock(&self.loader).load(ResourceKind::Mesh, path);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.discard_slot(handle);
                return Err(engine_err!(LOG_SOURCE, ResourceCreationFailed,
                    "Loader rejected '{}': {}", path, err));
            }
        };

        match outcome {
            LoadOutcome::Pending(token) => {
                let asset = self.assets.get_mut(handle)?;
                asset.state = LoadingState::Pending;
                asset.pending = Some(token);
                asset.ref_count = 1;
                engine_debug!(LOG_SOURCE, "Asset {:?} '{}' pending (token {:?})", handle, path, token);
            }
            LoadOutcome::Resolved(ResolvedResource::Mesh(payload)) => {
                let built = {
                    let mut geometries = lock(&self.geometries);
                    let mut materials = lock(&self.materials);
                    build_submeshes(
                        path,
                        &payload,
                        &mut *geometries,
                        &mut *materials,
                        self.config.build_opaque_index_buffer,
                    )
                };
                lock(&self.loader).unload(UnloadTarget::Payload(ResolvedResource::Mesh(Arc::clone(&payload))));

                let built = match built {
                    Ok(built) => built,
                    Err(err) => {
                        self.discard_slot(handle);
                        return Err(err);
                    }
                };
                let asset = self.assets.get_mut(handle)?;
                asset.set_loaded(built.submeshes, built.opaque_indices);
                asset.ref_count = 1;
                engine_debug!(LOG_SOURCE, "Asset {:?} '{}' loaded synchronously ({} submeshes)",
                    handle, path, asset.submeshes.len());
            }
            LoadOutcome::Resolved(other @ ResolvedResource::Other(kind)) => {
                lock(&self.loader).unload(UnloadTarget::Payload(other));
                self.discard_slot(handle);
                engine_bail!(LOG_SOURCE, ResourceCreationFailed,
                    "Loader returned a {:?} for mesh '{}'", kind, path);
            }
        }

        self.key_index.insert(key, handle);
        Ok(handle)
    }

    /// Drop one acquired reference; the asset is torn down synchronously at zero.
    ///
    /// References owned by live instances cannot be released here, only by
    /// destroying those instances.
    pub fn release_asset(&mut self, handle: MeshAssetHandle) -> Result<()> {
        let asset = self.assets.get(handle)?;
        if asset.ref_count <= asset.instance_refs {
            engine_bail!(LOG_SOURCE, InvalidParameter,
                "release_asset: asset {:?} has no outstanding acquisition ({} refs held by instances)",
                handle, asset.instance_refs);
        }
        self.drop_reference(handle, false);
        Ok(())
    }

    /// Decrement the count (and the instance share when `from_instance`),
    /// destroying the asset at zero
    pub(crate) fn drop_reference(&mut self, handle: MeshAssetHandle, from_instance: bool) {
        let Ok(asset) = self.assets.get_mut(handle) else {
            return;
        };
        if from_instance {
            asset.instance_refs = asset.instance_refs.saturating_sub(1);
        }
        asset.ref_count = asset.ref_count.saturating_sub(1);
        if asset.ref_count == 0 {
            self.destroy_asset(handle);
        }
    }

    /// Tear an asset down: cancel its load, give back every geometry/material
    /// reference, drop its key and free its slot.
    pub(crate) fn destroy_asset(&mut self, handle: MeshAssetHandle) {
        let Ok(asset) = self.assets.remove(handle) else {
            return;
        };

        if let Some(token) = asset.pending {
            lock(&self.loader).unload(UnloadTarget::Token(token));
        }

        {
            let mut geometries = lock(&self.geometries);
            let mut materials = lock(&self.materials);
            release_submeshes(&asset.submeshes, &mut *geometries, &mut *materials);
            if let Some(opaque) = asset.opaque_indices {
                geometries.release(opaque.geometry);
            }
        }

        self.key_index.remove_if(&asset.key, handle);
        engine_debug!(LOG_SOURCE, "Asset {:?} '{}' destroyed", handle, asset.path);
    }

    /// Free a slot whose asset never became visible to callers
    fn discard_slot(&mut self, handle: MeshAssetHandle) {
        if self.assets.remove(handle).is_err() {
            engine_warn!(LOG_SOURCE, "discard_slot: asset {:?} already gone", handle);
        }
    }

    /// Mark an asset Failed and stop serving its key
    pub(crate) fn record_failure(&mut self, handle: MeshAssetHandle, error: Error) {
        let Ok(asset) = self.assets.get_mut(handle) else {
            return;
        };
        asset.state = LoadingState::Failed;
        asset.pending = None;
        asset.last_error = Some(error);
        let key = asset.key.clone();
        self.key_index.remove_if(&key, handle);
    }
}

#[cfg(test)]
#[path = "asset_registry_tests.rs"]
mod tests;
