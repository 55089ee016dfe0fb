#![allow(non_snake_case)]
//! # MtLib
//!
//! A pure-Rust library for working with MT Framework asset formats.
//!
//! ## Supported Formats
//!
//! - **MOD** - Models: skeleton, groups, primitives and packed vertex buffers
//! - **MRL** - Material libraries with shader command lists and animations
//! - **TEX** - Textures, repackaged losslessly to and from DDS
//!
//! ## Quick Start
//!
//! ### Round-tripping a Model
//!
//! ```no_run
//! use mtlib::formats::model::{read_mod, write_mod};
//!
//! let model = read_mod("pl0000.mod")?;
//! println!("{} primitives", model.primitives.len());
//! write_mod(&model, "pl0000_copy.mod")?;
//! # Ok::<(), mtlib::Error>(())
//! ```
//!
//! ### Converting Textures
//!
//! ```no_run
//! use mtlib::formats::texture::{convert_dds_to_tex, convert_tex_to_dds, DdsToTexOptions};
//!
//! convert_tex_to_dds("floor_BM.tex", "floor_BM.dds")?;
//! convert_dds_to_tex("floor_BM.dds", "floor_BM.tex", DdsToTexOptions::default())?;
//! # Ok::<(), mtlib::Error>(())
//! ```
//!
//! ### Editing a Model
//!
//! ```no_run
//! use mtlib::prelude::*;
//!
//! let shaders = ShaderRegistry::load("ShaderHashes.csv", "ShaderInputs.csv")?;
//! let profile = TargetProfile::mvc3_pc();
//!
//! let model = read_mod("pl0000.mod")?;
//! let mut im = model_to_intermediate(&model, &profile, &shaders)?;
//! im.primitives.retain(|p| p.lod_index != 2);
//! let rebuilt = intermediate_to_model(&im, &profile, &shaders)?;
//! write_mod(&rebuilt, "pl0000_edit.mod")?;
//! # Ok::<(), mtlib::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `mtlib` command-line binary

pub mod config;
pub mod converter;
pub mod error;
pub mod formats;
pub mod io;
pub mod shader;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{TargetProfile, ToolConfig};
    pub use crate::error::{Error, Result};
    pub use crate::formats::common::ShaderObjectId;
    pub use crate::io::{ByteReader, ByteWriter};
    pub use crate::shader::{ShaderLookup, ShaderRegistry};

    // Containers
    pub use crate::formats::material::{
        Material, MaterialLibrary, parse_mrl_bytes, read_mrl, serialize_mrl, write_mrl,
    };
    pub use crate::formats::model::{Model, parse_mod_bytes, read_mod, serialize_mod, write_mod};
    pub use crate::formats::texture::{
        DdsToTexOptions, Texture, convert_dds_to_tex, convert_tex_to_dds, parse_tex_bytes,
        read_tex, serialize_tex, write_tex,
    };
    pub use crate::formats::vertex::{PackedVertex, VertexFormat};

    // Model conversion
    pub use crate::converter::{
        ImJoint, ImPrimitive, ImVertex, IntermediateModel, UvChannel, intermediate_to_model,
        model_to_intermediate,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
