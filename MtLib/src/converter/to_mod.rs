//! Intermediate model to MOD conversion

use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::intermediate::{ImVertex, IntermediateModel, UvChannel, read_intermediate_json};
use super::optimizer::{Bounds, optimize_primitive, pack_influences, tangent_uv_channel};
use super::tags::PrimitiveTags;
use super::types::{ModelPhase, ModelProgress, ModelProgressCallback};
use crate::config::TargetProfile;
use crate::error::{Error, Result};
use crate::formats::model::types::{BONE_MAP_SIZE, NO_JOINT};
use crate::formats::model::{
    Envelope, Group, Joint, Model, ModelHeader, Primitive, PrimitiveIndices, write_mod,
};
use crate::formats::vertex::{PackedVertex, VertexFormat};
use crate::io::ByteWriter;
use crate::shader::ShaderLookup;

/// Convert an intermediate model JSON file to a MOD file.
///
/// # Errors
/// Returns an error if reading, conversion, or writing fails.
pub fn convert_json_to_mod<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    dest: Q,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
) -> Result<()> {
    convert_json_to_mod_with_progress(source, dest, profile, lookup, &|_| {})
}

/// Convert an intermediate model JSON file to a MOD file with progress callback.
///
/// # Errors
/// Returns an error if reading, conversion, or writing fails.
pub fn convert_json_to_mod_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    dest: Q,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
    progress: ModelProgressCallback,
) -> Result<()> {
    let source = source.as_ref();
    let dest = dest.as_ref();
    tracing::info!("Converting {} -> {}", source.display(), dest.display());

    progress(&ModelProgress::with_item(
        ModelPhase::ReadingFile,
        1,
        1,
        source.display().to_string(),
    ));
    let im = read_intermediate_json(source)?;
    let model = intermediate_to_model_with_progress(&im, profile, lookup, progress)?;

    progress(&ModelProgress::with_item(
        ModelPhase::WritingFile,
        1,
        1,
        dest.display().to_string(),
    ));
    write_mod(&model, dest)?;

    progress(&ModelProgress::new(ModelPhase::Complete, 1, 1));
    Ok(())
}

/// Build a binary model from an intermediate model.
///
/// # Errors
/// Fails on invalid joint or envelope references, unknown vertex shaders, and
/// any optimizer error.
pub fn intermediate_to_model(
    im: &IntermediateModel,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
) -> Result<Model> {
    intermediate_to_model_with_progress(im, profile, lookup, &|_| {})
}

/// Build a binary model from an intermediate model with progress callback.
///
/// # Errors
/// See [`intermediate_to_model`].
pub fn intermediate_to_model_with_progress(
    im: &IntermediateModel,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
    progress: ModelProgressCallback,
) -> Result<Model> {
    let joint_count = im.joints.len();
    if joint_count > 255 {
        return Err(Error::TooManyJoints { count: joint_count });
    }
    let world = im.world_matrices()?;

    let mut model = Model::default();
    convert_skeleton(im, &mut model)?;
    model.groups = im
        .groups
        .iter()
        .map(|g| Group {
            id: g.id,
            field04: g.field04,
            field08: g.field08,
            field0c: g.field0c,
            bounding_sphere: g.bounding_sphere,
        })
        .collect();
    model.envelopes = convert_envelopes(im)?;
    model.materials.clone_from(&im.materials);

    // optimize every primitive and pack its vertices
    let total = im.primitives.len();
    let mut packed: Vec<(VertexFormat, Vec<PackedVertex>)> = Vec::with_capacity(total);
    let mut next_vertex_offset = 0usize;
    let mut next_index = 0usize;
    let mut triangle_count = 0usize;

    for (mesh_index, prim) in im.primitives.iter().enumerate() {
        progress(&ModelProgress::with_item(
            ModelPhase::OptimizingPrimitives,
            mesh_index + 1,
            total,
            prim.name.clone(),
        ));

        let optimized = optimize_primitive(prim, im.has_joints(), profile.use_tri_strips)?;
        let format = optimized.format;
        if format.is_skinned() && joint_count == 0 {
            return Err(Error::InvalidData(format!(
                "mesh '{}' needs {format} but the model has no joints",
                prim.name
            )));
        }

        let uv_channel = tangent_uv_channel(&optimized.vertices);
        let vertices = optimized
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| pack_vertex(v, format, uv_channel, &prim.name, i, joint_count))
            .collect::<Result<Vec<_>>>()?;

        let tags = PrimitiveTags::parse(&prim.name);
        let material_index = material_index(&mut model.materials, &prim.material);
        let group_id = tags.group_id.or(prim.group_id).unwrap_or(0);
        let lod_index = tags.lod_index.unwrap_or(prim.lod_index);
        let vertex_count = vertices.len() as u16;

        model.primitives.push(Primitive {
            flags: tags.flags.unwrap_or(prim.flags),
            vertex_count,
            indices: PrimitiveIndices::new(group_id, material_index as u32, u32::from(lod_index)),
            vertex_flags: tags
                .vertex_flags
                .or(prim.vertex_flags)
                .unwrap_or_else(|| profile.vertex_flags(format)),
            vertex_stride: format.size() as u8,
            render_flags: tags.render_flags.unwrap_or(prim.render_flags),
            vertex_start_index: 0,
            vertex_buffer_offset: next_vertex_offset as u32,
            vertex_shader: lookup.require_id(format.shader_name())?,
            index_buffer_offset: next_index as u32,
            index_count: optimized.indices.len() as u32,
            index_start_index: 0,
            bone_id_start: 0,
            envelope_count: 0,
            id: tags.id.or(prim.id).unwrap_or(mesh_index as u16),
            min_vertex_index: 0,
            max_vertex_index: vertex_count,
            field2c: prim.field2c,
        });

        next_vertex_offset += vertices.len() * format.size();
        next_index += optimized.indices.len();
        triangle_count += optimized.triangle_count;
        model.index_buffer.extend_from_slice(&optimized.indices);
        packed.push((format, vertices));
    }

    // bounds are taken before positions move into model space
    let bounds = Bounds::from_points(
        packed
            .iter()
            .flat_map(|(_, vertices)| vertices.iter().map(|v| v.position)),
    )
    .unwrap_or(Bounds {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    });

    if im.has_joints() {
        let model_mtx = normalize_skeleton(&world, &bounds, &mut model);
        let normal_mtx = model_mtx.inverse().transpose();
        for (_, vertices) in &mut packed {
            for v in vertices {
                v.position = model_mtx.transform_point3(v.position);
                v.normal = normal_mtx.transform_vector3(v.normal).normalize_or_zero();
            }
        }
    }

    let vertex_total: usize = packed.iter().map(|(_, v)| v.len()).sum();
    let mut w = ByteWriter::with_capacity(next_vertex_offset);
    for (i, (format, vertices)) in packed.iter().enumerate() {
        progress(&ModelProgress::new(ModelPhase::EncodingVertices, i + 1, total));
        for v in vertices {
            format.encode(v, &mut w);
        }
    }
    model.vertex_buffer = w.into_inner();

    model.header = ModelHeader {
        joint_count: model.joints.len() as u16,
        primitive_count: model.primitives.len() as u16,
        material_count: model.materials.len() as u16,
        vertex_count: vertex_total as u32,
        index_count: model.index_buffer.len() as u32,
        polygon_count: triangle_count as u32,
        vertex_buffer_size: model.vertex_buffer.len() as u32,
        group_count: model.groups.len() as u64,
        center: im.center.unwrap_or_else(|| bounds.center()),
        radius: im.radius.unwrap_or_else(|| bounds.radius()),
        min: im.min.unwrap_or_else(|| bounds.min.extend(0.0)),
        max: im.max.unwrap_or_else(|| bounds.max.extend(0.0)),
        field90: im.field90,
        field94: im.field94,
        field98: im.field98,
        field9c: im.field9c,
        primitive_joint_link_count: model.envelopes.len() as u32,
        ..ModelHeader::default()
    };

    tracing::info!(
        "Built model: {} joints, {} primitives, {} vertices, {} indices",
        model.joints.len(),
        model.primitives.len(),
        vertex_total,
        model.index_buffer.len()
    );
    Ok(model)
}

fn convert_skeleton(im: &IntermediateModel, model: &mut Model) -> Result<()> {
    let count = im.joints.len();
    model.bone_map = vec![-1; BONE_MAP_SIZE];
    for (i, joint) in im.joints.iter().enumerate() {
        // table indices stay below 255, the byte is reinterpreted on read
        model.bone_map[joint.id as usize] = i as u8 as i8;

        let symmetry_index = match joint.symmetry {
            None => NO_JOINT,
            Some(s) if s < count => s as u8,
            Some(s) => {
                return Err(Error::InvalidReference {
                    kind: "symmetry joint",
                    element: i,
                    index: s,
                });
            }
        };
        model.joints.push(Joint {
            id: joint.id,
            parent_index: joint.parent.map_or(NO_JOINT, |p| p as u8),
            symmetry_index,
            field03: joint.field03,
            field04: joint.field04,
            length: joint.length(),
            offset: joint.offset(),
        });
        model.joint_local_mtx.push(joint.local_mtx);
    }
    Ok(())
}

fn convert_envelopes(im: &IntermediateModel) -> Result<Vec<Envelope>> {
    im.envelopes
        .iter()
        .enumerate()
        .map(|(i, e)| {
            if e.joint >= im.joints.len() {
                return Err(Error::InvalidReference {
                    kind: "envelope joint",
                    element: i,
                    index: e.joint,
                });
            }
            Ok(Envelope {
                joint_index: e.joint as u32,
                field04: e.field04,
                field08: e.field08,
                field0c: e.field0c,
                bounding_sphere: e.bounding_sphere,
                min: e.min,
                max: e.max,
                local_mtx: e.local_mtx,
                field80: e.field80,
            })
        })
        .collect()
}

/// Fill the inverse bind matrices and return the matrix that maps world space
/// into the normalized model space.
///
/// The model matrix always comes from the bounds of the output vertices, so
/// every quantized position stays inside the 16-bit range. Inverse binds read
/// from an imported model are not reused.
fn normalize_skeleton(world: &[Mat4], bounds: &Bounds, model: &mut Model) -> Mat4 {
    let model_mtx = bounds.normalization_matrix();
    model.joint_inv_bind_mtx = world.iter().map(|w| (model_mtx * *w).inverse()).collect();
    model_mtx
}

fn pack_vertex(
    v: &ImVertex,
    format: VertexFormat,
    uv_channel: Option<UvChannel>,
    mesh: &str,
    index: usize,
    joint_count: usize,
) -> Result<PackedVertex> {
    let (joints, weights) = pack_influences(v, format, mesh, index)?;
    if format.is_skinned() {
        let slots = &joints[..format.max_weights()];
        if let Some(&bad) = slots.iter().find(|&&j| j as usize >= joint_count) {
            return Err(Error::InvalidReference {
                kind: "joint",
                element: index,
                index: bad as usize,
            });
        }
    }

    Ok(PackedVertex {
        position: v.position,
        normal: v.normal,
        occlusion: 1.0,
        tangent: if format.has_uv() { v.tangent } else { Vec4::ZERO },
        uv: uv_channel.and_then(|c| v.uv(c)).unwrap_or(Vec2::ZERO),
        joints,
        weights,
    })
}

fn material_index(materials: &mut Vec<String>, name: &str) -> usize {
    if let Some(i) = materials.iter().position(|m| m == name) {
        return i;
    }
    materials.push(name.to_string());
    materials.len() - 1
}
