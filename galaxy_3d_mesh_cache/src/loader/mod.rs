//! Resource loader collaborator interface
//!
//! The loader turns a path into decoded mesh data, possibly on worker threads.
//! The cache never waits on it: `load` either answers synchronously with a
//! payload or hands back a token that the resolution pump polls each frame.

mod payload;

use std::sync::Arc;
use crate::error::Result;

pub use payload::{MeshPayload, MeshSubset, SubmeshRange};

/// Request token issued by the loader for an in-flight load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken(pub u64);

/// Kind of resource requested from (or returned by) the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Mesh,
    Texture,
    Material,
}

/// Progress of an in-flight load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// Waiting for a worker
    Queued,
    /// File I/O or decoding in progress
    CpuPending,
    /// Waiting on another resource (textures, materials)
    DependencyPending,
    /// Upload submitted, waiting for the GPU
    GpuPending,
    /// Payload available through `try_get_resolved`
    Ready,
    /// Terminal failure with a reason
    Failed(String),
}

impl LoadStatus {
    /// Whether the load has not reached a terminal state yet
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            LoadStatus::Queued
                | LoadStatus::CpuPending
                | LoadStatus::DependencyPending
                | LoadStatus::GpuPending
        )
    }
}

/// A resolved loader payload
#[derive(Debug, Clone)]
pub enum ResolvedResource {
    Mesh(Arc<MeshPayload>),
    /// Anything that is not a mesh (wrong type for this cache)
    Other(ResourceKind),
}

/// Result of [`ResourceLoader::load`]
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Load in flight, poll the token
    Pending(LoadToken),
    /// Load completed synchronously
    Resolved(ResolvedResource),
}

/// What to hand back to the loader on unload
#[derive(Debug, Clone)]
pub enum UnloadTarget {
    Token(LoadToken),
    /// A result returned synchronously by `load`, whatever its type
    Payload(ResolvedResource),
}

/// Loader collaborator
pub trait ResourceLoader: Send {
    /// Start loading `path`
    fn load(&mut self, kind: ResourceKind, path: &str) -> Result<LoadOutcome>;

    /// Poll an in-flight load
    fn poll(&mut self, token: LoadToken) -> LoadStatus;

    /// Fetch the payload of a `Ready` token (None if absent)
    fn try_get_resolved(&mut self, token: LoadToken) -> Option<ResolvedResource>;

    /// Release a token (cancelling it if still in flight) or a synchronous payload
    fn unload(&mut self, target: UnloadTarget);
}
