//! Mesh asset and instance cache

mod asset;
mod asset_registry;
mod batch;
mod bounds;
mod config;
mod instance;
mod key_index;
mod mesh_cache;
mod resolve;

pub use asset::{
    LoadingState, MeshAsset, MeshAssetHandle, MeshAssetSubmesh, OpaqueIndexBuffer,
    PipelineDomain, SubmeshFlags,
};
pub use batch::MeshInstanceDesc;
pub use bounds::{max_axis_scale, BoundingBox, BoundingSphere};
pub use config::{MeshCacheConfig, MeshCacheDesc};
pub use instance::{MeshInstance, MeshInstanceHandle, MeshSubmeshInstanceState};
pub use key_index::{AssetKey, AssetKeyIndex};
pub use mesh_cache::{MeshCache, MeshCacheStats};
