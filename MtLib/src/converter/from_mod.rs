//! MOD to intermediate model conversion

use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::intermediate::{
    ImEnvelope, ImGroup, ImJoint, ImPrimitive, ImVertex, IntermediateModel, UvChannel,
    write_intermediate_json,
};
use super::optimizer::{list_to_triangles, strip_to_triangles};
use super::types::{ModelPhase, ModelProgress, ModelProgressCallback};
use crate::config::TargetProfile;
use crate::error::{Error, Result};
use crate::formats::model::types::NO_JOINT;
use crate::formats::model::{Model, Primitive, read_mod};
use crate::formats::vertex::{VertexFormat, decode_vertex_buffer};
use crate::io::ByteReader;
use crate::shader::ShaderLookup;

/// Convert a MOD file to an intermediate model JSON file.
///
/// # Errors
/// Returns an error if reading, decoding, or writing fails.
pub fn convert_mod_to_json<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    dest: Q,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
) -> Result<()> {
    convert_mod_to_json_with_progress(source, dest, profile, lookup, &|_| {})
}

/// Convert a MOD file to an intermediate model JSON file with progress callback.
///
/// # Errors
/// Returns an error if reading, decoding, or writing fails.
pub fn convert_mod_to_json_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
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
    let model = read_mod(source)?;
    let im = model_to_intermediate_with_progress(&model, profile, lookup, progress)?;

    progress(&ModelProgress::with_item(
        ModelPhase::WritingFile,
        1,
        1,
        dest.display().to_string(),
    ));
    write_intermediate_json(&im, dest)?;

    progress(&ModelProgress::new(ModelPhase::Complete, 1, 1));
    Ok(())
}

/// Decode a binary model into an intermediate model.
///
/// Index buffers are read as strips when the profile uses strips.
///
/// # Errors
/// Fails on vertex shaders with no known layout and on out-of-range indices.
pub fn model_to_intermediate(
    model: &Model,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
) -> Result<IntermediateModel> {
    model_to_intermediate_with_progress(model, profile, lookup, &|_| {})
}

/// Decode a binary model into an intermediate model with progress callback.
///
/// # Errors
/// See [`model_to_intermediate`].
pub fn model_to_intermediate_with_progress(
    model: &Model,
    profile: &TargetProfile,
    lookup: &dyn ShaderLookup,
    progress: ModelProgressCallback,
) -> Result<IntermediateModel> {
    if model.ex_data.is_some() || !model.vertex_buffer2.is_empty() {
        tracing::warn!("Secondary vertex buffer and extension block are not carried over");
    }

    let joints = convert_joints(model)?;
    // maps normalized vertex space back to world space
    let model_mtx = match (model.joint_local_mtx.first(), model.joint_inv_bind_mtx.first()) {
        (Some(local), Some(inv_bind)) => *local * *inv_bind,
        _ => Mat4::IDENTITY,
    };
    let normal_mtx = model_mtx.inverse().transpose();

    let total = model.primitives.len();
    let mut primitives = Vec::with_capacity(total);
    for (i, prim) in model.primitives.iter().enumerate() {
        let name = format!("primitive_{i:03}");
        progress(&ModelProgress::with_item(
            ModelPhase::DecodingPrimitives,
            i + 1,
            total,
            name.clone(),
        ));

        let material = model
            .materials
            .get(prim.indices.material_index() as usize)
            .ok_or(Error::InvalidReference {
                kind: "material",
                element: i,
                index: prim.indices.material_index() as usize,
            })?;

        let (format, mut vertices) = decode_vertices(model, prim, lookup)?;
        if model.has_joints() {
            for v in &mut vertices {
                v.position = model_mtx.transform_point3(v.position);
                v.normal = normal_mtx.transform_vector3(v.normal).normalize_or_zero();
            }
        }

        primitives.push(ImPrimitive {
            name,
            material: material.clone(),
            flags: prim.flags,
            group_id: Some(prim.indices.group_id()),
            lod_index: prim.indices.lod_index() as u8,
            render_flags: prim.render_flags,
            id: Some(prim.id),
            field2c: prim.field2c,
            vertex_format: format,
            vertex_flags: Some(prim.vertex_flags),
            indices: Some(decode_faces(model, prim, i, profile.use_tri_strips)?),
            vertices,
        });
    }

    let groups = model
        .groups
        .iter()
        .map(|g| ImGroup {
            name: format!("group_{}", g.id),
            id: g.id,
            field04: g.field04,
            field08: g.field08,
            field0c: g.field0c,
            bounding_sphere: g.bounding_sphere,
        })
        .collect();

    let envelopes = model
        .envelopes
        .iter()
        .map(|e| ImEnvelope {
            joint: e.joint_index as usize,
            field04: e.field04,
            field08: e.field08,
            field0c: e.field0c,
            bounding_sphere: e.bounding_sphere,
            min: e.min,
            max: e.max,
            local_mtx: e.local_mtx,
            field80: e.field80,
        })
        .collect();

    let header = &model.header;
    tracing::info!(
        "Decoded model: {} joints, {} primitives",
        joints.len(),
        primitives.len()
    );
    Ok(IntermediateModel {
        joints,
        groups,
        materials: model.materials.clone(),
        primitives,
        envelopes,
        center: Some(header.center),
        radius: Some(header.radius),
        min: Some(header.min),
        max: Some(header.max),
        field90: header.field90,
        field94: header.field94,
        field98: header.field98,
        field9c: header.field9c,
    })
}

fn convert_joints(model: &Model) -> Result<Vec<ImJoint>> {
    model
        .joints
        .iter()
        .enumerate()
        .map(|(i, joint)| {
            let local_mtx = *model.joint_local_mtx.get(i).ok_or_else(|| {
                Error::InvalidData(format!("joint {i} has no local matrix"))
            })?;
            let index = |value: u8| (value != NO_JOINT).then_some(value as usize);
            Ok(ImJoint {
                name: format!("jnt_{}", joint.id),
                id: joint.id,
                parent: index(joint.parent_index),
                symmetry: index(joint.symmetry_index),
                field03: joint.field03,
                field04: joint.field04,
                local_mtx,
                inv_bind_mtx: model.joint_inv_bind_mtx.get(i).copied(),
            })
        })
        .collect()
}

/// Decode the vertices of one primitive, through a fixed layout when the shader
/// is one, else through the shader's input table.
fn decode_vertices(
    model: &Model,
    prim: &Primitive,
    lookup: &dyn ShaderLookup,
) -> Result<(Option<VertexFormat>, Vec<ImVertex>)> {
    let data = model.primitive_vertex_data(prim).ok_or(Error::OutOfBounds {
        offset: prim.vertex_data_start(),
        len: prim.vertex_count as usize * prim.vertex_stride as usize,
        size: model.vertex_buffer.len(),
    })?;
    let count = prim.vertex_count as usize;
    let stride = prim.vertex_stride as usize;
    let hash = prim.vertex_shader.hash();
    let shader_name = lookup.name_for_hash(hash);

    let format = shader_name
        .and_then(VertexFormat::from_shader_name)
        .filter(|f| f.size() == stride);
    if let Some(format) = format {
        let mut r = ByteReader::new(data);
        let mut vertices = Vec::with_capacity(count);
        for i in 0..count {
            r.seek(i * stride)?;
            let packed = format.decode(&mut r)?;
            let mut v = ImVertex::new(packed.position, packed.normal);
            if format.has_uv() {
                v.tangent = packed.tangent;
                v.set_uv(UvChannel::Primary, packed.uv);
            }
            match format.max_weights() {
                0 => {}
                1 => v.add_influence(packed.joints[0], 1.0),
                n => {
                    for k in 0..n {
                        if packed.weights[k] > 0.0 {
                            v.add_influence(packed.joints[k], packed.weights[k]);
                        }
                    }
                }
            }
            vertices.push(v);
        }
        return Ok((Some(format), vertices));
    }

    let inputs = match lookup.inputs_for_hash(hash) {
        Some(inputs) if !inputs.is_empty() => inputs,
        _ => {
            let name = shader_name.map_or_else(|| format!("{hash:#07X}"), str::to_string);
            return Err(Error::UnknownVertexFormat(name));
        }
    };
    let decoded = decode_vertex_buffer(inputs, data, count, stride)?;
    let vertices = (0..count)
        .map(|i| {
            let vec3 = |name: &str| {
                decoded
                    .get(i, name)
                    .filter(|c| c.len() >= 3)
                    .map_or(Vec3::ZERO, |c| Vec3::new(c[0], c[1], c[2]))
            };
            let mut v = ImVertex::new(vec3("Position"), vec3("Normal"));
            if let Some(t) = decoded.get(i, "Tangent").filter(|c| c.len() >= 4) {
                v.tangent = Vec4::new(t[0], t[1], t[2], t[3]);
            }
            for channel in UvChannel::ALL {
                if let Some(uv) = decoded.get(i, channel.input_name()).filter(|c| c.len() >= 2) {
                    v.set_uv(channel, Vec2::new(uv[0], uv[1]));
                }
            }

            let joints = decoded.get(i, "Joint").unwrap_or_default();
            let mut weights = decoded.get(i, "Weight").unwrap_or_default().to_vec();
            // last weight is implicit when the layout stores one fewer
            if weights.len() + 1 == joints.len() {
                weights.push((1.0 - weights.iter().sum::<f32>()).max(0.0));
            }
            if joints.len() == 1 && weights.is_empty() {
                weights.push(1.0);
            }
            for (&joint, &weight) in joints.iter().zip(&weights) {
                if weight > 0.0 {
                    v.add_influence(joint as u8, weight);
                }
            }
            v
        })
        .collect();
    Ok((None, vertices))
}

/// Triangle list of one primitive, relative to its first vertex.
fn decode_faces(
    model: &Model,
    prim: &Primitive,
    mesh: usize,
    use_tri_strips: bool,
) -> Result<Vec<u32>> {
    let indices = model.primitive_indices(prim).ok_or(Error::OutOfBounds {
        offset: prim.index_start() * 2,
        len: prim.index_count as usize * 2,
        size: model.index_buffer.len() * 2,
    })?;
    let triangles = if use_tri_strips {
        strip_to_triangles(indices)
    } else {
        list_to_triangles(indices)
    };

    let start = i64::from(prim.vertex_start_index);
    let count = i64::from(prim.vertex_count);
    let mut out = Vec::with_capacity(triangles.len() * 3);
    for index in triangles.into_iter().flatten() {
        let local = i64::from(index) - start;
        if !(0..count).contains(&local) {
            return Err(Error::InvalidReference {
                kind: "vertex",
                element: mesh,
                index: index as usize,
            });
        }
        out.push(local as u32);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::intermediate::ImJoint;
    use crate::converter::test_registry;
    use crate::converter::{intermediate_to_model, optimizer::tangents_finite};
    use crate::shader::ShaderRegistry;

    fn quad(material: &str) -> ImPrimitive {
        let mut prim = ImPrimitive::new("quad", material);
        for &(x, y) in &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)] {
            let mut v = ImVertex::new(Vec3::new(x, y, 1.0), Vec3::Z);
            v.set_uv(UvChannel::Primary, Vec2::new(x / 2.0, y / 2.0));
            prim.vertices.push(v);
        }
        prim.indices = Some(vec![0, 1, 2, 0, 2, 3]);
        prim
    }

    #[test]
    fn test_static_round_trip() {
        let registry = test_registry();
        for profile in [TargetProfile::mvc3_pc(), TargetProfile::aa_pc()] {
            let im = IntermediateModel {
                primitives: vec![quad("floor")],
                ..Default::default()
            };
            let model = intermediate_to_model(&im, &profile, &registry).unwrap();
            let back = model_to_intermediate(&model, &profile, &registry).unwrap();

            let prim = &back.primitives[0];
            assert_eq!(prim.material, "floor");
            assert_eq!(prim.vertex_format, Some(VertexFormat::IANonSkinTB));
            assert_eq!(prim.indices.as_deref(), Some(&[0, 1, 2, 0, 2, 3][..]));
            assert_eq!(prim.vertices[2].position, Vec3::new(2.0, 2.0, 1.0));
            assert!(tangents_finite(&prim.vertices));
            assert_eq!(back.center, Some(Vec3::new(1.0, 1.0, 1.0)));
        }
    }

    #[test]
    fn test_skinned_round_trip_keeps_world_positions() {
        let mut prim = quad("skin");
        for v in &mut prim.vertices {
            v.add_influence(1, 0.75);
            v.add_influence(0, 0.25);
        }
        let im = IntermediateModel {
            joints: vec![
                ImJoint::new("root", 0, None, Mat4::from_translation(Vec3::Y)),
                ImJoint::new("hip", 1, Some(0), Mat4::from_translation(Vec3::Y)),
            ],
            primitives: vec![prim],
            ..Default::default()
        };
        let profile = TargetProfile::mvc3_pc();
        let registry = test_registry();
        let model = intermediate_to_model(&im, &profile, &registry).unwrap();
        let back = model_to_intermediate(&model, &profile, &registry).unwrap();

        assert_eq!(back.joints[1].parent, Some(0));
        assert!(back.joints.iter().all(|j| j.inv_bind_mtx.is_some()));
        let v = &back.primitives[0].vertices[2];
        assert!((v.position - Vec3::new(2.0, 2.0, 1.0)).abs().max_element() < 1e-3);
        assert_eq!(v.joints, vec![1, 0]);
        assert!((v.weights[0] - 0.75).abs() < 1e-3);

        let again = intermediate_to_model(&back, &profile, &registry).unwrap();
        let twice = model_to_intermediate(&again, &profile, &registry).unwrap();
        for (a, b) in back.primitives[0].vertices.iter().zip(&twice.primitives[0].vertices) {
            assert!((a.position - b.position).abs().max_element() < 1e-3);
        }
    }

    #[test]
    fn test_edited_import_is_renormalized() {
        let mut root = ImJoint::new("root", 0, None, Mat4::IDENTITY);
        root.inv_bind_mtx = Some(Mat4::IDENTITY);
        let mut prim = ImPrimitive::new("tri", "skin");
        let corners = [Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 0.0)];
        for p in corners {
            let mut v = ImVertex::new(p, Vec3::Z);
            v.set_uv(UvChannel::Primary, p.truncate() / 10.0);
            v.add_influence(0, 1.0);
            prim.vertices.push(v);
        }
        prim.indices = Some(vec![0, 1, 2]);
        let im = IntermediateModel {
            joints: vec![root],
            primitives: vec![prim],
            ..Default::default()
        };

        let profile = TargetProfile::mvc3_pc();
        let registry = test_registry();
        let model = intermediate_to_model(&im, &profile, &registry).unwrap();
        let back = model_to_intermediate(&model, &profile, &registry).unwrap();
        for (v, expected) in back.primitives[0].vertices.iter().zip(corners) {
            assert!((v.position - expected).abs().max_element() < 1e-2);
        }
    }

    #[test]
    fn test_unknown_vertex_shader() {
        let im = IntermediateModel {
            primitives: vec![quad("floor")],
            ..Default::default()
        };
        let profile = TargetProfile::mvc3_pc();
        let model = intermediate_to_model(&im, &profile, &test_registry()).unwrap();
        assert!(matches!(
            model_to_intermediate(&model, &profile, &ShaderRegistry::new()),
            Err(Error::UnknownVertexFormat(_))
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let im = IntermediateModel {
            primitives: vec![quad("floor")],
            ..Default::default()
        };
        let profile = TargetProfile::mvc3_pc();
        let registry = test_registry();
        let mut model = intermediate_to_model(&im, &profile, &registry).unwrap();
        model.index_buffer[1] = 9;
        assert!(matches!(
            model_to_intermediate(&model, &profile, &registry),
            Err(Error::InvalidReference { kind: "vertex", index: 9, .. })
        ));
    }
}
