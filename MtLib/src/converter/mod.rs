//! Model conversion
//!
//! - MOD → [`IntermediateModel`]: decode vertices and faces, restore world space
//! - [`IntermediateModel`] → MOD: optimize primitives, pack vertices, rebuild the skeleton
//! - JSON files carry the intermediate model between tools

mod from_mod;
mod intermediate;
pub mod optimizer;
mod tags;
mod to_mod;
mod types;

pub use intermediate::{
    ImEnvelope, ImGroup, ImJoint, ImPrimitive, ImVertex, IntermediateModel, UvChannel,
    read_intermediate_json, write_intermediate_json,
};
pub use tags::{PrimitiveTags, iter_tags};
pub use types::{ModelPhase, ModelProgress, ModelProgressCallback};

// MOD -> intermediate
pub use from_mod::{
    convert_mod_to_json, convert_mod_to_json_with_progress, model_to_intermediate,
    model_to_intermediate_with_progress,
};

// intermediate -> MOD
pub use to_mod::{
    convert_json_to_mod, convert_json_to_mod_with_progress, intermediate_to_model,
    intermediate_to_model_with_progress,
};

/// Registry holding the exporter's vertex shaders under small fake hashes.
#[cfg(test)]
pub(crate) fn test_registry() -> crate::shader::ShaderRegistry {
    use crate::formats::vertex::VertexFormat;

    let mut registry = crate::shader::ShaderRegistry::new();
    for (i, format) in VertexFormat::ALL.into_iter().enumerate() {
        registry.insert(i as u32 + 1, format.shader_name(), 0x1000 + i as u32);
    }
    registry
}
