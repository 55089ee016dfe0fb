//! MOD file writing
//!
//! [`ModelWriter`] reserves the header, appends each table while recording its
//! offset, and patches the header once everything else is in place.

use std::path::Path;

use glam::Mat4;

use super::types::{
    BONE_MAP_SIZE, Envelope, ExData, Group, HEADER_SIZE, Joint, MATERIAL_NAME_LENGTH, Model,
    ModelHeader, NO_JOINT, Primitive,
};
use crate::error::{Error, Result};
use crate::io::ByteWriter;

/// Write a model to disk
pub fn write_mod<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let bytes = serialize_mod(model)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a model to bytes
pub fn serialize_mod(model: &Model) -> Result<Vec<u8>> {
    validate(model)?;

    let mut writer = ModelWriter::new(&model.header);
    if !model.joints.is_empty() {
        writer.write_joints(
            &model.joints,
            &model.joint_local_mtx,
            &model.joint_inv_bind_mtx,
            &model.bone_map,
        );
    }
    if !model.groups.is_empty() {
        writer.write_groups(&model.groups);
    }
    if !model.materials.is_empty() {
        writer.write_materials(&model.materials);
    }
    if !model.primitives.is_empty() {
        writer.write_primitives(&model.primitives);
        if !model.envelopes.is_empty() {
            writer.write_envelopes(&model.envelopes);
        }
    }
    writer.write_vertex_buffers(&model.vertex_buffer, &model.vertex_buffer2);
    writer.write_index_buffer(&model.index_buffer);
    writer.write_ex_data(model.ex_data.as_ref());
    Ok(writer.finish())
}

/// Check table cross references before anything is written.
fn validate(model: &Model) -> Result<()> {
    if model.joints.len() > 255 {
        return Err(Error::TooManyJoints {
            count: model.joints.len(),
        });
    }
    let joint_count = model.joints.len();
    if model.joint_local_mtx.len() != joint_count || model.joint_inv_bind_mtx.len() != joint_count
    {
        return Err(Error::InvalidData(format!(
            "{joint_count} joints but {} local and {} inverse bind matrices",
            model.joint_local_mtx.len(),
            model.joint_inv_bind_mtx.len()
        )));
    }
    if !model.joints.is_empty() && model.bone_map.len() != BONE_MAP_SIZE {
        return Err(Error::InvalidData(format!(
            "bone map has {} entries, expected {BONE_MAP_SIZE}",
            model.bone_map.len()
        )));
    }

    for (i, joint) in model.joints.iter().enumerate() {
        if joint.parent_index != NO_JOINT && joint.parent_index as usize >= i {
            return Err(Error::InvalidReference {
                kind: "parent joint",
                element: i,
                index: joint.parent_index as usize,
            });
        }
        // left/right pairs point at each other, so symmetry may reference forward
        if joint.symmetry_index != NO_JOINT && joint.symmetry_index as usize >= joint_count {
            return Err(Error::InvalidReference {
                kind: "symmetry joint",
                element: i,
                index: joint.symmetry_index as usize,
            });
        }
    }

    for (i, prim) in model.primitives.iter().enumerate() {
        let material = prim.indices.material_index() as usize;
        if material >= model.materials.len() {
            return Err(Error::InvalidReference {
                kind: "material",
                element: i,
                index: material,
            });
        }
    }

    if let Some(ex) = &model.ex_data {
        if ex.primitive_values.len() != model.primitives.len() {
            return Err(Error::InvalidData(format!(
                "extension block has {} primitive values for {} primitives",
                ex.primitive_values.len(),
                model.primitives.len()
            )));
        }
    }
    Ok(())
}

/// Incremental MOD writer.
pub struct ModelWriter {
    w: ByteWriter,
    hp: usize,
    header: ModelHeader,
}

impl ModelWriter {
    /// Start a file. Fields that cannot be derived from the tables (version, vertex
    /// and polygon counts, bounds, opaque fields) are taken from `source`.
    pub fn new(source: &ModelHeader) -> Self {
        let mut w = ByteWriter::with_capacity(HEADER_SIZE * 4);
        let hp = w.tell();
        w.write_zeros(HEADER_SIZE);
        let header = ModelHeader {
            magic: source.magic,
            version: source.version,
            vertex_count: source.vertex_count,
            polygon_count: source.polygon_count,
            center: source.center,
            radius: source.radius,
            min: source.min,
            max: source.max,
            field90: source.field90,
            field94: source.field94,
            field98: source.field98,
            field9c: source.field9c,
            ..ModelHeader::default()
        };
        Self { w, hp, header }
    }

    fn rel(&self) -> u64 {
        (self.w.tell() - self.hp) as u64
    }

    pub fn write_joints(&mut self, joints: &[Joint], local: &[Mat4], inv_bind: &[Mat4], bone_map: &[i8]) {
        self.header.joint_offset = self.rel();
        self.header.joint_count = joints.len() as u16;
        for joint in joints {
            self.w.write_u8(joint.id);
            self.w.write_u8(joint.parent_index);
            self.w.write_u8(joint.symmetry_index);
            self.w.write_u8(joint.field03);
            self.w.write_f32(joint.field04);
            self.w.write_f32(joint.length);
            self.w.write_vec3(joint.offset);
        }
        for m in local {
            self.w.write_mat4(m);
        }
        for m in inv_bind {
            self.w.write_mat4(m);
        }
        for &b in bone_map {
            self.w.write_i8(b);
        }
    }

    pub fn write_groups(&mut self, groups: &[Group]) {
        self.header.group_offset = self.rel();
        self.header.group_count = groups.len() as u64;
        for g in groups {
            self.w.write_u32(g.id);
            self.w.write_u32(g.field04);
            self.w.write_u32(g.field08);
            self.w.write_u32(g.field0c);
            self.w.write_vec4(g.bounding_sphere);
        }
    }

    pub fn write_materials(&mut self, names: &[String]) {
        self.header.material_offset = self.rel();
        self.header.material_count = names.len() as u16;
        for name in names {
            self.w.write_cstring(name, MATERIAL_NAME_LENGTH);
        }
    }

    pub fn write_primitives(&mut self, prims: &[Primitive]) {
        self.header.primitive_offset = self.rel();
        self.header.primitive_count = prims.len() as u16;
        for p in prims {
            self.w.write_u16(p.flags);
            self.w.write_u16(p.vertex_count);
            self.w.write_u32(p.indices.0);
            self.w.write_u16(p.vertex_flags);
            self.w.write_u8(p.vertex_stride);
            self.w.write_u8(p.render_flags);
            self.w.write_u32(p.vertex_start_index);
            self.w.write_u32(p.vertex_buffer_offset);
            self.w.write_u32(p.vertex_shader.value());
            self.w.write_u32(p.index_buffer_offset);
            self.w.write_u32(p.index_count);
            self.w.write_u32(p.index_start_index);
            self.w.write_u8(p.bone_id_start);
            self.w.write_u8(p.envelope_count);
            self.w.write_u16(p.id);
            self.w.write_u16(p.min_vertex_index);
            self.w.write_u16(p.max_vertex_index);
            self.w.write_u32(p.field2c);
            self.w.write_u64(0);
        }
    }

    /// Must directly follow [`Self::write_primitives`].
    pub fn write_envelopes(&mut self, envelopes: &[Envelope]) {
        self.header.primitive_joint_link_count = envelopes.len() as u32;
        for e in envelopes {
            self.w.write_u32(e.joint_index);
            self.w.write_u32(e.field04);
            self.w.write_u32(e.field08);
            self.w.write_u32(e.field0c);
            self.w.write_vec4(e.bounding_sphere);
            self.w.write_vec4(e.min);
            self.w.write_vec4(e.max);
            self.w.write_mat4(&e.local_mtx);
            self.w.write_vec4(e.field80);
        }
    }

    pub fn write_vertex_buffers(&mut self, primary: &[u8], secondary: &[u8]) {
        self.header.vertex_buffer_offset = self.rel();
        self.w.write_bytes(primary);
        self.header.vertex_buffer_size = primary.len() as u32;
        self.w.write_bytes(secondary);
        self.header.vertex_buffer2_size = secondary.len() as u32;
    }

    pub fn write_index_buffer(&mut self, indices: &[u16]) {
        self.header.index_buffer_offset = self.rel();
        for &i in indices {
            self.w.write_u16(i);
        }
        self.header.index_count = indices.len() as u32;
        self.w.align(4, self.hp);
    }

    /// The block is always present; its flag is 0 when there is no data.
    pub fn write_ex_data(&mut self, ex: Option<&ExData>) {
        self.header.ex_data_offset = self.rel();
        let Some(ex) = ex else {
            self.w.write_u32(0);
            return;
        };
        self.w.write_u32(1);
        self.w.write_u16(ex.count1);
        self.w.write_u16(ex.count2);
        for &v in &ex.primitive_values {
            self.w.write_u32(v);
        }
        self.w.write_u32(ex.vertex_buffer.len() as u32);
        self.w.write_bytes(&ex.vertex_buffer);
        self.w.write_u32(ex.vertex_buffer2.len() as u32);
        self.w.write_bytes(&ex.vertex_buffer2);
    }

    /// Patch the header and return the file bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let end = self.w.tell();
        self.w.seek(self.hp);
        let h = &self.header;
        self.w.write_u32(h.magic);
        self.w.write_u16(h.version);
        self.w.write_u16(h.joint_count);
        self.w.write_u16(h.primitive_count);
        self.w.write_u16(h.material_count);
        self.w.write_u32(h.vertex_count);
        self.w.write_u32(h.index_count);
        self.w.write_u32(h.polygon_count);
        self.w.write_u32(h.vertex_buffer_size);
        self.w.write_u32(h.vertex_buffer2_size);
        self.w.write_u64(h.group_count);
        self.w.write_u64(h.joint_offset);
        self.w.write_u64(h.group_offset);
        self.w.write_u64(h.material_offset);
        self.w.write_u64(h.primitive_offset);
        self.w.write_u64(h.vertex_buffer_offset);
        self.w.write_u64(h.index_buffer_offset);
        self.w.write_u64(h.ex_data_offset);
        self.w.write_vec3(h.center);
        self.w.write_f32(h.radius);
        self.w.write_vec4(h.min);
        self.w.write_vec4(h.max);
        self.w.write_u32(h.field90);
        self.w.write_u32(h.field94);
        self.w.write_u32(h.field98);
        self.w.write_u32(h.field9c);
        self.w.write_u32(h.primitive_joint_link_count);
        self.w.seek(end);
        self.w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::model::parse_mod_bytes;
    use crate::formats::model::types::PrimitiveIndices;

    fn two_joint_model() -> Model {
        let mut model = Model::default();
        model.joints = vec![
            Joint {
                id: 0,
                ..Default::default()
            },
            Joint {
                id: 1,
                parent_index: 0,
                length: 1.0,
                offset: glam::Vec3::Y,
                ..Default::default()
            },
        ];
        model.joint_local_mtx = vec![Mat4::IDENTITY; 2];
        model.joint_inv_bind_mtx = vec![Mat4::IDENTITY; 2];
        model.bone_map[0] = 0;
        model.bone_map[1] = 1;
        model.materials = vec!["mat0".into()];
        model.primitives = vec![Primitive {
            vertex_count: 3,
            indices: PrimitiveIndices::new(0, 0, 0xFF),
            vertex_stride: 20,
            index_count: 3,
            max_vertex_index: 3,
            ..Default::default()
        }];
        model.vertex_buffer = (0..60).collect();
        model.index_buffer = vec![0, 1, 2];
        model.header.vertex_count = 3;
        model.header.polygon_count = 1;
        model
    }

    #[test]
    fn test_header_patched() {
        let bytes = serialize_mod(&two_joint_model()).unwrap();
        let model = parse_mod_bytes(&bytes).unwrap();
        let h = &model.header;
        assert_eq!(h.joint_count, 2);
        assert_eq!(h.group_count, 0);
        assert_eq!(h.group_offset, 0);
        assert_eq!(h.material_count, 1);
        assert_eq!(h.primitive_count, 1);
        assert_eq!(h.joint_offset, HEADER_SIZE as u64);
        assert_eq!(h.vertex_buffer_size, 60);
        assert_eq!(h.index_count, 3);
        assert_ne!(h.ex_data_offset, 0);
        assert_eq!(h.ex_data_offset % 4, 0);
        assert!(model.ex_data.is_none());
    }

    #[test]
    fn test_invalid_parent_rejected() {
        let mut model = two_joint_model();
        model.joints[0].parent_index = 1;
        assert!(matches!(
            serialize_mod(&model),
            Err(Error::InvalidReference { kind: "parent joint", element: 0, index: 1 })
        ));
    }

    #[test]
    fn test_symmetry_reference() {
        let mut model = two_joint_model();
        model.joints[0].symmetry_index = 1;
        model.joints[1].symmetry_index = 0;
        let parsed = parse_mod_bytes(&serialize_mod(&model).unwrap()).unwrap();
        assert_eq!(parsed.joints[0].symmetry_index, 1);

        model.joints[1].symmetry_index = 2;
        assert!(matches!(
            serialize_mod(&model),
            Err(Error::InvalidReference { kind: "symmetry joint", element: 1, index: 2 })
        ));
    }

    #[test]
    fn test_invalid_material_rejected() {
        let mut model = two_joint_model();
        model.primitives[0].indices.set_material_index(4);
        assert!(matches!(
            serialize_mod(&model),
            Err(Error::InvalidReference { kind: "material", .. })
        ));
    }

    #[test]
    fn test_too_many_joints() {
        let mut model = Model::default();
        model.joints = vec![Joint::default(); 256];
        model.joint_local_mtx = vec![Mat4::IDENTITY; 256];
        model.joint_inv_bind_mtx = vec![Mat4::IDENTITY; 256];
        assert!(matches!(serialize_mod(&model), Err(Error::TooManyJoints { count: 256 })));
    }
}
