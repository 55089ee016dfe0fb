//! MOD (model) container
//!
//! Header, skeleton (joints, local and inverse bind matrices, bone map), groups,
//! material names, primitives with their joint links, raw vertex/index buffers and
//! the optional extension block.

mod reader;
pub mod types;
mod writer;

pub use reader::{parse_mod_bytes, read_mod, read_model};
pub use types::{
    Envelope, ExData, Group, Joint, Model, ModelHeader, Primitive, PrimitiveIndices,
};
pub use writer::{ModelWriter, serialize_mod, write_mod};
