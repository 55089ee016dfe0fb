//! CLI commands for texture operations

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use super::{ToolContext, output_path};
use crate::cli::progress::{
    LOOKING_GLASS, PICTURE, TRUCK, print_done, print_failures, print_step, simple_bar,
};
use crate::formats::texture::{
    DdsToTexOptions, SurfaceFormat, batch_tex_to_dds, convert_dds_to_tex, convert_tex_to_dds,
    find_tex_files, read_tex,
};

/// Show info about a TEX file
pub fn info(path: &Path) -> anyhow::Result<()> {
    let texture = read_tex(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let format = texture.surface_format();

    println!("TEX Information: {}", path.display());
    println!();
    println!("Dimensions: {}x{}", texture.width(), texture.height());
    println!("Mip levels: {}", texture.mip_count());
    println!("Surfaces:   {}", texture.surfaces.len());
    println!("Cubemap:    {}", if texture.header.is_cubemap() { "yes" } else { "no" });
    match format.compression() {
        Some(compression) => println!("Format:     {format} ({compression:?})"),
        None => println!("Format:     {format} (unknown)"),
    }
    println!("Type:       {:#06X}", texture.header.desc.texture_type());
    println!("Data size:  {} bytes", texture.data_size());

    Ok(())
}

/// Convert TEX to DDS
pub fn to_dds(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let output = output_path(path, output, "dds");
    convert_tex_to_dds(path, &output)
        .with_context(|| format!("Failed to convert {}", path.display()))?;
    println!("Written to: {}", output.display());
    Ok(())
}

/// Convert DDS to TEX
pub fn from_dds(
    ctx: &ToolContext,
    path: &Path,
    output: Option<&Path>,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let output = output_path(path, output, "tex");
    let format = format
        .map(str::parse::<SurfaceFormat>)
        .transpose()
        .context("Invalid --format")?;
    let options = DdsToTexOptions {
        format,
        texture_type: ctx.profile.texture_type,
    };

    convert_dds_to_tex(path, &output, options)
        .with_context(|| format!("Failed to convert {}", path.display()))?;
    println!("Written to: {}", output.display());
    Ok(())
}

/// Batch convert TEX files to DDS
pub fn batch_to_dds(source: &Path, dest: &Path) -> anyhow::Result<()> {
    let started = Instant::now();

    print_step(1, 2, LOOKING_GLASS, &format!("Scanning {}...", source.display()));
    let files = find_tex_files(source);
    if files.is_empty() {
        println!("No TEX files found in: {}", source.display());
        return Ok(());
    }

    print_step(2, 2, TRUCK, &format!("Converting {} textures...", files.len()));
    let pb = simple_bar(files.len() as u64, "Converting");
    let result = batch_tex_to_dds(&files, source, dest, |current, _total, name| {
        pb.set_position(current as u64);
        pb.set_message(name.to_string());
    });
    pb.finish_and_clear();

    println!();
    println!("{PICTURE}Conversion complete:");
    println!("  Success: {}", result.success_count);
    println!("  Failed: {}", result.fail_count);
    print_failures(&result.results);

    print_done(started.elapsed());
    Ok(())
}
