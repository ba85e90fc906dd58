/// Mock resource loader (no file I/O, scripted completion)

use std::sync::Arc;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use crate::error::Result;
use crate::engine_bail;
use crate::loader::{
    LoadOutcome, LoadStatus, LoadToken, MeshPayload, ResolvedResource, ResourceKind,
    ResourceLoader, UnloadTarget,
};

const LOG_SOURCE: &str = "galaxy3d::MockLoader";

new_key_type! {
    struct LoadKey;
}

/// How the mock answers a load of a registered path
#[derive(Debug, Clone, PartialEq)]
pub enum MockLoadMode {
    /// `load` returns the payload synchronously
    Immediate,
    /// Ready after `polls` polls
    Deferred { polls: u32 },
    /// Fails with `reason` after `after_polls` polls
    Fails { after_polls: u32, reason: String },
    /// Ready on first poll, but resolves to a texture
    WrongType,
    /// `load` synchronously returns a texture
    ImmediateWrongType,
    /// Ready on first poll, but `try_get_resolved` returns nothing
    MissingPayload,
    /// Never leaves DependencyPending
    Stuck,
    /// `load` itself returns an error
    Rejected,
}

struct InFlight {
    path: String,
    mode: MockLoadMode,
    payload: Arc<MeshPayload>,
    polls: u32,
}

/// Scripted loader
#[derive(Default)]
pub struct MockLoader {
    meshes: FxHashMap<String, (Arc<MeshPayload>, MockLoadMode)>,
    in_flight: SlotMap<LoadKey, InFlight>,
    load_calls: FxHashMap<String, u32>,
    unloaded_tokens: Vec<LoadToken>,
    unloaded_payloads: u32,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the payload served for `path`
    pub fn register(&mut self, path: &str, payload: MeshPayload, mode: MockLoadMode) {
        self.meshes.insert(path.to_string(), (Arc::new(payload), mode));
    }

    /// Change how future loads of `path` behave
    pub fn set_mode(&mut self, path: &str, mode: MockLoadMode) {
        if let Some(entry) = self.meshes.get_mut(path) {
            entry.1 = mode;
        }
    }

    /// Number of `load` calls received for `path`
    pub fn load_calls(&self, path: &str) -> u32 {
        self.load_calls.get(path).copied().unwrap_or(0)
    }

    /// Number of `load` calls received for any path
    pub fn total_load_calls(&self) -> u32 {
        self.load_calls.values().sum()
    }

    /// Tokens issued and not yet unloaded
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether `token` is still outstanding
    pub fn is_in_flight(&self, token: LoadToken) -> bool {
        self.in_flight.contains_key(key_of(token))
    }

    /// Paths of outstanding tokens
    pub fn in_flight_paths(&self) -> Vec<String> {
        self.in_flight.values().map(|load| load.path.clone()).collect()
    }

    /// Tokens handed back through `unload`, in order
    pub fn unloaded_tokens(&self) -> &[LoadToken] {
        &self.unloaded_tokens
    }

    /// Synchronous payloads handed back through `unload`
    pub fn unloaded_payload_count(&self) -> u32 {
        self.unloaded_payloads
    }
}

fn token_of(key: LoadKey) -> LoadToken {
    LoadToken(key.data().as_ffi())
}

fn key_of(token: LoadToken) -> LoadKey {
    LoadKey::from(KeyData::from_ffi(token.0))
}

impl ResourceLoader for MockLoader {
    fn load(&mut self, kind: ResourceKind, path: &str) -> Result<LoadOutcome> {
        *self.load_calls.entry(path.to_string()).or_insert(0) += 1;

        if kind != ResourceKind::Mesh {
            engine_bail!(LOG_SOURCE, InvalidParameter, "MockLoader only serves meshes, got {:?}", kind);
        }
        let Some((payload, mode)) = self.meshes.get(path) else {
            engine_bail!(LOG_SOURCE, ResourceNotLoaded, "MockLoader: unknown path '{}'", path);
        };

        match mode {
            MockLoadMode::Immediate => Ok(LoadOutcome::Resolved(ResolvedResource::Mesh(Arc::clone(payload)))),
            MockLoadMode::ImmediateWrongType => {
                Ok(LoadOutcome::Resolved(ResolvedResource::Other(ResourceKind::Texture)))
            }
            MockLoadMode::Rejected => {
                engine_bail!(LOG_SOURCE, ResourceCreationFailed, "MockLoader: '{}' rejected", path)
            }
            _ => {
                let key = self.in_flight.insert(InFlight {
                    path: path.to_string(),
                    mode: mode.clone(),
                    payload: Arc::clone(payload),
                    polls: 0,
                });
                Ok(LoadOutcome::Pending(token_of(key)))
            }
        }
    }

    fn poll(&mut self, token: LoadToken) -> LoadStatus {
        let Some(load) = self.in_flight.get_mut(key_of(token)) else {
            return LoadStatus::Failed(format!("unknown token {:?}", token));
        };
        load.polls += 1;
        match &load.mode {
            MockLoadMode::Deferred { polls } if load.polls >= *polls => LoadStatus::Ready,
            MockLoadMode::Deferred { .. } if load.polls == 1 => LoadStatus::Queued,
            MockLoadMode::Deferred { .. } => LoadStatus::GpuPending,
            MockLoadMode::Fails { after_polls, reason } if load.polls >= *after_polls => {
                LoadStatus::Failed(reason.clone())
            }
            MockLoadMode::Fails { .. } => LoadStatus::CpuPending,
            MockLoadMode::Stuck => LoadStatus::DependencyPending,
            MockLoadMode::WrongType | MockLoadMode::MissingPayload => LoadStatus::Ready,
            MockLoadMode::Immediate | MockLoadMode::ImmediateWrongType | MockLoadMode::Rejected => {
                LoadStatus::Ready
            }
        }
    }

    fn try_get_resolved(&mut self, token: LoadToken) -> Option<ResolvedResource> {
        let load = self.in_flight.get(key_of(token))?;
        match load.mode {
            MockLoadMode::WrongType => Some(ResolvedResource::Other(ResourceKind::Texture)),
            MockLoadMode::MissingPayload => None,
            _ => Some(ResolvedResource::Mesh(Arc::clone(&load.payload))),
        }
    }

    fn unload(&mut self, target: UnloadTarget) {
        match target {
            UnloadTarget::Token(token) => {
                self.in_flight.remove(key_of(token));
                self.unloaded_tokens.push(token);
            }
            UnloadTarget::Payload(_) => self.unloaded_payloads += 1,
        }
    }
}
