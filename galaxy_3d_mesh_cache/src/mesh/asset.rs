//! Mesh asset types.
//!
//! A `MeshAsset` is the de-duplicated, shared GPU description of one
//! `(path, domain, shader override)` combination. It owns one
//! `MeshAssetSubmesh` per drawable range and is reference-counted by
//! instances and by explicit acquisitions.
//!
//! ```text
//! MeshAsset "crate.mesh|Opaque|"
//! ├── state: Pending → Loaded | Failed
//! ├── ref_count (instances + acquisitions)
//! ├── instance_refs (share of ref_count held by instances)
//! ├── submeshes
//! │   ├── 0: geometry + material + index range + bounds
//! │   └── 1: ...
//! └── opaque index buffer (merged meshes mixing cutout and opaque)
//! ```

use bitflags::bitflags;
use crate::error::Error;
use crate::loader::LoadToken;
use crate::registry::{GeometryHandle, MaterialHandle};
use crate::utils::Handle;
use super::bounds::{BoundingBox, BoundingSphere};

/// Handle to a mesh asset
pub type MeshAssetHandle = Handle<MeshAsset>;

// ===== ENUMS =====

/// Pipeline family a mesh is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineDomain {
    #[default]
    Opaque,
    Masked,
    Transparent,
    Overlay,
}

impl PipelineDomain {
    /// Stable name used in dedup keys
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineDomain::Opaque => "opaque",
            PipelineDomain::Masked => "masked",
            PipelineDomain::Transparent => "transparent",
            PipelineDomain::Overlay => "overlay",
        }
    }
}

/// Loading state shared by assets and (mirrored) instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    NotLoaded,
    Pending,
    Loaded,
    Failed,
}

bitflags! {
    /// Per-submesh ownership and material traits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SubmeshFlags: u32 {
        /// The submesh holds a geometry reference to give back
        const OWNS_GEOMETRY = 1 << 0;
        /// The submesh holds a material reference to give back
        const OWNS_MATERIAL = 1 << 1;
        /// The material alpha-tests (cutout)
        const ALPHA_CUTOUT  = 1 << 2;
    }
}

// ===== SUBMESH =====

/// One drawable range of an asset
#[derive(Debug, Clone)]
pub struct MeshAssetSubmesh {
    pub(crate) geometry: GeometryHandle,
    pub(crate) material: MaterialHandle,
    pub(crate) flags: SubmeshFlags,
    pub(crate) shader_override: String,
    pub(crate) domain: PipelineDomain,
    pub(crate) first_index: u32,
    pub(crate) index_count: u32,
    pub(crate) vertex_offset: i32,
    pub(crate) bounds: BoundingBox,
}

impl MeshAssetSubmesh {
    /// Geometry holding the vertex/index data
    pub fn geometry(&self) -> GeometryHandle {
        self.geometry
    }

    /// Material, `Handle::INVALID` when the submesh has none
    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn flags(&self) -> SubmeshFlags {
        self.flags
    }

    pub fn shader_override(&self) -> &str {
        &self.shader_override
    }

    pub fn domain(&self) -> PipelineDomain {
        self.domain
    }

    /// First index of the range in the geometry's index buffer
    pub fn first_index(&self) -> u32 {
        self.first_index
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Base vertex added to every index of the range
    pub fn vertex_offset(&self) -> i32 {
        self.vertex_offset
    }

    /// Local-space bounds of the range
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn is_alpha_cutout(&self) -> bool {
        self.flags.contains(SubmeshFlags::ALPHA_CUTOUT)
    }
}

/// Secondary index buffer holding only the opaque ranges of a merged mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpaqueIndexBuffer {
    pub geometry: GeometryHandle,
    pub index_count: u32,
}

// ===== ASSET =====

/// A shared, reference-counted mesh resource
#[derive(Debug)]
pub struct MeshAsset {
    pub(crate) handle: MeshAssetHandle,
    pub(crate) path: String,
    pub(crate) shader_override: String,
    pub(crate) domain: PipelineDomain,
    pub(crate) state: LoadingState,
    pub(crate) last_error: Option<Error>,
    pub(crate) pending: Option<LoadToken>,
    /// Pump ticks spent in Pending (deadline accounting)
    pub(crate) pending_ticks: u32,
    pub(crate) ref_count: u32,
    /// References owned by live instances, never above `ref_count`
    pub(crate) instance_refs: u32,
    pub(crate) submeshes: Vec<MeshAssetSubmesh>,
    pub(crate) local_sphere: Option<BoundingSphere>,
    pub(crate) opaque_indices: Option<OpaqueIndexBuffer>,
    /// Dedup key, used to remove the index entry on teardown
    pub(crate) key: String,
}

impl MeshAsset {
    pub(crate) fn new(
        handle: MeshAssetHandle,
        path: &str,
        domain: PipelineDomain,
        shader_override: &str,
        key: String,
    ) -> Self {
        Self {
            handle,
            path: path.to_string(),
            shader_override: shader_override.to_string(),
            domain,
            state: LoadingState::NotLoaded,
            last_error: None,
            pending: None,
            pending_ticks: 0,
            ref_count: 0,
            instance_refs: 0,
            submeshes: Vec::new(),
            local_sphere: None,
            opaque_indices: None,
            key,
        }
    }

    /// Install built submeshes and derive the local sphere from their union
    pub(crate) fn set_loaded(
        &mut self,
        submeshes: Vec<MeshAssetSubmesh>,
        opaque_indices: Option<OpaqueIndexBuffer>,
    ) {
        let union = submeshes
            .iter()
            .fold(BoundingBox::EMPTY, |acc, submesh| acc.union(&submesh.bounds));
        self.local_sphere = BoundingSphere::from_box(&union);
        self.submeshes = submeshes;
        self.opaque_indices = opaque_indices;
        self.state = LoadingState::Loaded;
        self.last_error = None;
        self.pending = None;
    }

    pub fn handle(&self) -> MeshAssetHandle {
        self.handle
    }

    /// Source path
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn shader_override(&self) -> &str {
        &self.shader_override
    }

    pub fn domain(&self) -> PipelineDomain {
        self.domain
    }

    pub fn state(&self) -> LoadingState {
        self.state
    }

    /// Error recorded when the asset failed
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Outstanding loader token while Pending
    pub fn pending_token(&self) -> Option<LoadToken> {
        self.pending
    }

    /// Live instances plus outstanding acquisitions
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// References held by live instances
    pub fn instance_refs(&self) -> u32 {
        self.instance_refs
    }

    pub fn submeshes(&self) -> &[MeshAssetSubmesh] {
        &self.submeshes
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Local sphere around every submesh, None until Loaded
    pub fn local_sphere(&self) -> Option<&BoundingSphere> {
        self.local_sphere.as_ref()
    }

    /// Opaque-only index buffer, when the split was built
    pub fn opaque_index_buffer(&self) -> Option<&OpaqueIndexBuffer> {
        self.opaque_indices.as_ref()
    }

    /// Dedup key string
    pub fn key(&self) -> &str {
        &self.key
    }
}
