//! CLI commands for MOD models

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use super::{ToolContext, output_path};
use crate::cli::progress::{CUBE, DISK, GEAR, print_done, print_step, simple_bar, update_model_bar};
use crate::converter::{ModelProgress, convert_json_to_mod_with_progress, convert_mod_to_json_with_progress};
use crate::formats::model::{parse_mod_bytes, read_mod, serialize_mod};

/// Show header and table summary of a MOD file
pub fn info(path: &Path) -> anyhow::Result<()> {
    let model = read_mod(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let header = &model.header;

    println!("MOD Information: {}", path.display());
    println!();
    println!("Version:      {}", header.version);
    println!("Joints:       {}", model.joints.len());
    println!("Groups:       {}", model.groups.len());
    println!("Materials:    {}", model.materials.len());
    println!("Primitives:   {}", model.primitives.len());
    println!("Envelopes:    {}", model.envelopes.len());
    println!("Vertices:     {}", header.vertex_count);
    println!("Indices:      {}", header.index_count);
    println!("Polygons:     {}", header.polygon_count);
    println!(
        "Vertex data:  {} bytes (+{} secondary)",
        model.vertex_buffer.len(),
        model.vertex_buffer2.len()
    );
    println!(
        "Bounds:       center {:?} radius {:.3}",
        header.center.to_array(),
        header.radius
    );
    println!("Ex data:      {}", if model.ex_data.is_some() { "yes" } else { "no" });
    println!();

    println!("Materials:");
    for (i, name) in model.materials.iter().enumerate() {
        println!("  [{i:3}] {name}");
    }
    println!();

    println!("Primitives:");
    for (i, prim) in model.primitives.iter().enumerate() {
        let material = model
            .materials
            .get(prim.indices.material_index() as usize)
            .map_or("?", String::as_str);
        println!(
            "  [{i:3}] {:>6} verts {:>6} idx  stride {:2}  lod {:3}  group {:4}  shader {}  {material}",
            prim.vertex_count,
            prim.index_count,
            prim.vertex_stride,
            prim.indices.lod_index(),
            prim.indices.group_id(),
            prim.vertex_shader,
        );
    }

    Ok(())
}

/// Parse and re-serialize a MOD file
pub fn roundtrip(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let model = parse_mod_bytes(&data)?;
    let rebuilt = serialize_mod(&model)?;

    if rebuilt == data {
        println!("Round trip identical ({} bytes)", data.len());
    } else {
        let first = data
            .iter()
            .zip(&rebuilt)
            .position(|(a, b)| a != b)
            .unwrap_or(data.len().min(rebuilt.len()));
        println!(
            "Round trip differs: {} -> {} bytes, first difference at {first:#X}",
            data.len(),
            rebuilt.len()
        );
    }

    if let Some(out) = output {
        std::fs::write(out, &rebuilt).with_context(|| format!("Failed to write {}", out.display()))?;
        println!("Written to: {}", out.display());
    }
    Ok(())
}

/// Decode a MOD file into intermediate model JSON
pub fn dump(ctx: &ToolContext, path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let started = Instant::now();
    let output = output_path(path, output, "json");

    print_step(1, 2, GEAR, "Loading shader tables...");
    let shaders = ctx.shaders()?;

    print_step(2, 2, CUBE, &format!("Decoding {}...", path.display()));
    let pb = simple_bar(0, "Reading");
    convert_mod_to_json_with_progress(path, &output, &ctx.profile, &shaders, &|p: &ModelProgress| {
        update_model_bar(&pb, p);
    })
    .with_context(|| format!("Failed to convert {}", path.display()))?;
    pb.finish_and_clear();

    println!("Written to: {}", output.display());
    print_done(started.elapsed());
    Ok(())
}

/// Build a MOD file from intermediate model JSON
pub fn build(ctx: &ToolContext, path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let started = Instant::now();
    let output = output_path(path, output, "mod");

    print_step(1, 2, GEAR, "Loading shader tables...");
    let shaders = ctx.shaders()?;

    print_step(2, 2, DISK, &format!("Building {}...", output.display()));
    let pb = simple_bar(0, "Reading");
    convert_json_to_mod_with_progress(path, &output, &ctx.profile, &shaders, &|p: &ModelProgress| {
        update_model_bar(&pb, p);
    })
    .with_context(|| format!("Failed to build {}", output.display()))?;
    pb.finish_and_clear();

    let size = std::fs::metadata(&output)?.len();
    println!("Written to: {} ({size} bytes)", output.display());
    print_done(started.elapsed());
    Ok(())
}
