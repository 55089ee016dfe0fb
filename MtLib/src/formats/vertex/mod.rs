//! Vertex component codecs and record layouts
//!
//! - [`codec`]: scalar quantize/dequantize functions
//! - [`VertexFormat`]: the fixed layouts the exporter writes
//! - [`layout`]: generic decoding driven by shader input descriptors

pub mod codec;
mod format;
mod layout;

pub use format::{PackedVertex, VertexFormat};
pub use layout::{
    DecodedAttribute, DecodedVertexBuffer, ShaderInput, VertexComponentType,
    decode_vertex_buffer, group_inputs,
};
