/// Dedup key index: `(path, domain, shader override)` -> live asset.

use rustc_hash::FxHashMap;
use super::asset::{MeshAssetHandle, PipelineDomain};

/// Composite key identifying one visual configuration of a mesh file.
///
/// The path is length-prefixed so that separators inside a path can never make
/// two different triples produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(path: &str, domain: PipelineDomain, shader_override: &str) -> Self {
        AssetKey(format!("{}:{}|{}|{}", path.len(), path, domain.as_str(), shader_override))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Maps dedup keys to the asset currently serving them
#[derive(Default)]
pub struct AssetKeyIndex {
    entries: FxHashMap<String, MeshAssetHandle>,
}

impl AssetKeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asset registered for `key`
    pub fn get(&self, key: &str) -> Option<MeshAssetHandle> {
        self.entries.get(key).copied()
    }

    /// Register `handle` under `key`, returning the previous holder
    pub fn insert(&mut self, key: String, handle: MeshAssetHandle) -> Option<MeshAssetHandle> {
        self.entries.insert(key, handle)
    }

    /// Remove `key` only if it still maps to `handle`
    pub fn remove_if(&mut self, key: &str, handle: MeshAssetHandle) -> bool {
        if self.entries.get(key) == Some(&handle) {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "key_index_tests.rs"]
mod tests;
