//! Binary container formats
//!
//! - [`model`]: MOD models
//! - [`material`]: MRL material libraries
//! - [`texture`]: TEX textures and DDS conversion
//! - [`vertex`]: vertex component codecs and record layouts

pub mod common;
pub mod material;
pub mod model;
pub mod texture;
pub mod vertex;
