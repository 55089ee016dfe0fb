//! Shader object metadata
//!
//! Readers and converters resolve shader object names, hashes and vertex input
//! layouts through the [`ShaderLookup`] trait. [`ShaderRegistry`] is the bundled
//! implementation, loaded from the shader hash and shader input CSV tables.

mod registry;

pub use registry::{ShaderInfo, ShaderRegistry};

use crate::error::{Error, Result};
use crate::formats::common::ShaderObjectId;
use crate::formats::vertex::ShaderInput;

/// Source of shader object metadata.
pub trait ShaderLookup {
    /// Packed id of the shader object registered under `name`.
    fn id_for_name(&self, name: &str) -> Option<ShaderObjectId>;

    /// Name of the shader object with the given 20-bit hash.
    fn name_for_hash(&self, hash: u32) -> Option<&str>;

    /// Vertex input layout of the shader with the given hash.
    fn inputs_for_hash(&self, hash: u32) -> Option<&[ShaderInput]>;

    /// Like [`ShaderLookup::id_for_name`], failing for unknown names.
    fn require_id(&self, name: &str) -> Result<ShaderObjectId> {
        self.id_for_name(name)
            .ok_or_else(|| Error::UnknownShaderName(name.to_string()))
    }

    /// Like [`ShaderLookup::name_for_hash`], failing for unknown hashes.
    fn require_name(&self, hash: u32) -> Result<&str> {
        self.name_for_hash(hash)
            .ok_or(Error::UnknownShaderHash(hash))
    }
}
