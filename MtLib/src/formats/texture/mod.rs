//! TEX (texture) container
//!
//! Header bitfields, optional cubemap face records and the per-surface mip
//! chains, plus lossless repackaging to and from DDS.

mod batch;
pub mod dds;
mod reader;
pub mod types;
mod writer;

pub use batch::{BatchTextureResult, batch_tex_to_dds, find_tex_files};
pub use dds::{
    DdsToTexOptions, convert_dds_to_tex, convert_tex_to_dds, dds_bytes_to_tex_bytes, dds_to_tex,
    tex_bytes_to_dds_bytes, tex_to_dds,
};
pub use reader::{parse_tex_bytes, read_tex};
pub use types::{Compression, CubeFace, Surface, SurfaceFormat, Texture, TextureHeader};
pub use writer::{serialize_tex, write_tex};
