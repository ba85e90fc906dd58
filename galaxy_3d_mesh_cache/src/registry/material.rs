/// Material registry interface.

use crate::error::Result;
use crate::utils::Handle;

/// Tag type for material handles
pub enum MaterialTag {}

/// Reference-counted material issued by a [`MaterialRegistry`]
pub type MaterialHandle = Handle<MaterialTag>;

/// Summary returned by [`MaterialRegistry::get`]
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInfo {
    /// Texture slot names bound by the material
    pub texture_slots: Vec<String>,
    /// Alpha-test threshold, 0.0 for opaque materials
    pub alpha_cutoff: f32,
}

impl MaterialInfo {
    /// Whether drawing this material needs per-pixel alpha testing
    pub fn is_alpha_cutout(&self) -> bool {
        self.alpha_cutoff > 0.0
    }
}

/// Material registry collaborator
pub trait MaterialRegistry: Send {
    /// Take a reference on a material by name.
    ///
    /// Returns `Error::ResourceNotLoaded` when the name is unknown.
    fn acquire(&mut self, name: &str) -> Result<MaterialHandle>;

    /// Take one more reference on `handle`
    fn add_ref(&mut self, handle: MaterialHandle) -> Result<()>;

    /// Drop one reference on `handle`
    fn release(&mut self, handle: MaterialHandle);

    /// Describe a live material
    fn get(&self, handle: MaterialHandle) -> Option<MaterialInfo>;
}
