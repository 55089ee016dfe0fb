//! MRL (material library) container
//!
//! Texture references, per-material render state and command lists, and the
//! optional per-material animation block. Constant buffer payloads carry no
//! length, so reading needs a [`ShaderLookup`](crate::shader::ShaderLookup).
//!
//! The whole library also round-trips through JSON via serde.

mod reader;
pub mod types;
mod writer;

use std::path::Path;

use crate::error::Result;

pub use reader::{parse_mrl_bytes, read_mrl};
pub use types::{
    AnimEntry, AnimSubEntry, CmdData, CmdType, Material, MaterialAnim, MaterialCmd,
    MaterialHeader, MaterialLibrary, TextureInfo,
};
pub use writer::{serialize_mrl, write_mrl};

/// Serialize a material library as pretty-printed JSON.
pub fn material_to_json(library: &MaterialLibrary) -> Result<String> {
    Ok(serde_json::to_string_pretty(library)?)
}

/// Parse a material library from JSON.
pub fn material_from_json(json: &str) -> Result<MaterialLibrary> {
    Ok(serde_json::from_str(json)?)
}

/// Read a JSON material library from disk.
pub fn read_material_json<P: AsRef<Path>>(path: P) -> Result<MaterialLibrary> {
    let json = std::fs::read_to_string(path)?;
    material_from_json(&json)
}

/// Write a material library to disk as JSON.
pub fn write_material_json<P: AsRef<Path>>(library: &MaterialLibrary, path: P) -> Result<()> {
    std::fs::write(path, material_to_json(library)?)?;
    Ok(())
}
