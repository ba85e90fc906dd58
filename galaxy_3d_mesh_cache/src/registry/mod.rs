//! Registry collaborator interfaces
//!
//! Geometry, material and pipeline objects are owned by their registries.
//! The mesh cache only ever holds reference counts on them and gives every
//! reference back through the registry that issued it.

mod geometry;
mod material;
mod pipeline;

pub use geometry::{
    GeometryRegistry, GeometryHandle, GeometryTag,
    GeometryConfig, GeometryData, GeometryInfo, IndexFormat,
};
pub use material::{MaterialRegistry, MaterialHandle, MaterialTag, MaterialInfo};
pub use pipeline::{PipelineRegistry, PipelineHandle, PipelineTag, BindStateHandle};
