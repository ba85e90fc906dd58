/*!
# Galaxy 3D Mesh Cache

De-duplicated mesh assets and their placed instances for the Galaxy 3D engine.

Assets are shared per `(path, domain, shader override)` and reference-counted;
instances place an asset in the world with their own transform, visibility and
pick id. Loading is asynchronous: a per-frame pump polls the injected loader
and fans completed or failed loads out to every instance.

## Architecture

- **MeshCache**: owns the asset and instance tables and the dedup key index
- **ResourceLoader**: collaborator decoding mesh files, possibly on worker threads
- **GeometryRegistry / MaterialRegistry / PipelineRegistry**: collaborators owning
  GPU objects; the cache only holds reference counts on them
- **SlotTable**: fixed-capacity generational storage behind every handle

Collaborators are injected through [`galaxy3d::mesh::MeshCacheDesc`], so the
cache can be built over the in-memory [`galaxy3d::mock`] implementations
without a renderer.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod utils;
pub mod loader;
pub mod registry;
pub mod mesh;
pub mod mock;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logger)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Handles and generational tables
    pub mod utils {
        pub use crate::utils::*;
    }

    // Loader collaborator
    pub mod loader {
        pub use crate::loader::*;
    }

    // Registry collaborators
    pub mod registry {
        pub use crate::registry::*;
    }

    // Mesh cache
    pub mod mesh {
        pub use crate::mesh::*;
    }

    // In-memory collaborators
    pub mod mock {
        pub use crate::mock::*;
    }
}

// Re-export math library at crate root
pub use glam;
