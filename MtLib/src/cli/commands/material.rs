//! CLI commands for MRL material libraries

use std::path::Path;

use anyhow::Context;

use super::{ToolContext, output_path};
use crate::formats::material::{read_material_json, read_mrl, write_material_json, write_mrl};

/// Show textures and materials of an MRL file
pub fn info(ctx: &ToolContext, path: &Path) -> anyhow::Result<()> {
    let shaders = ctx.shaders()?;
    let library = read_mrl(path, &shaders, ctx.profile.path_length)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!("MRL Information: {}", path.display());
    println!();
    println!("Textures:  {}", library.textures.len());
    println!("Materials: {}", library.materials.len());
    println!();

    println!("Textures:");
    for (i, texture) in library.textures.iter().enumerate() {
        println!("  [{:3}] {}", i + 1, texture.path);
    }
    println!();

    println!("Materials:");
    for material in &library.materials {
        println!(
            "  {:#010X}  {:>3} cmds  anim: {}",
            material.name_hash,
            material.cmds.len(),
            material
                .anim
                .as_ref()
                .map_or_else(|| "none".to_string(), |a| format!("{} entries", a.entries.len()))
        );
    }

    Ok(())
}

/// Convert an MRL file to JSON
pub fn to_json(ctx: &ToolContext, path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let output = output_path(path, output, "json");
    let shaders = ctx.shaders()?;
    let library = read_mrl(path, &shaders, ctx.profile.path_length)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    write_material_json(&library, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Written to: {}", output.display());
    Ok(())
}

/// Convert JSON back to an MRL file
pub fn from_json(ctx: &ToolContext, path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let output = output_path(path, output, "mrl");
    let library = read_material_json(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    write_mrl(&library, &output, ctx.profile.path_length)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Written to: {}", output.display());
    Ok(())
}
