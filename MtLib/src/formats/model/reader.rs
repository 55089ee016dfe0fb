//! MOD file reading

use std::path::Path;

use super::types::{
    BONE_MAP_SIZE, Envelope, ExData, Group, Joint, MATERIAL_NAME_LENGTH, MOD_MAGIC, MOD_VERSION,
    Model, ModelHeader, Primitive, PrimitiveIndices,
};
use crate::error::{Error, Result};
use crate::formats::common::ShaderObjectId;
use crate::io::ByteReader;

/// Read a MOD file from disk
pub fn read_mod<P: AsRef<Path>>(path: P) -> Result<Model> {
    let data = std::fs::read(path)?;
    parse_mod_bytes(&data)
}

/// Parse MOD data from bytes
pub fn parse_mod_bytes(data: &[u8]) -> Result<Model> {
    let mut r = ByteReader::new(data);
    read_model(&mut r)
}

/// Parse a MOD whose header starts at the reader's position.
pub fn read_model(r: &mut ByteReader<'_>) -> Result<Model> {
    let hp = r.tell();
    let header = read_header(r)?;
    tracing::debug!(
        "MOD header: {} joints, {} groups, {} materials, {} primitives, {} bytes of vertices",
        header.joint_count,
        header.group_count,
        header.material_count,
        header.primitive_count,
        header.vertex_buffer_size
    );

    let mut model = Model {
        header,
        ..Model::default()
    };
    let h = &model.header;

    if h.joint_offset != 0 && h.joint_count != 0 {
        let count = h.joint_count as usize;
        r.seek_offset(hp, h.joint_offset)?;
        for _ in 0..count {
            model.joints.push(read_joint(r)?);
        }
        for _ in 0..count {
            model.joint_local_mtx.push(r.read_mat4()?);
        }
        for _ in 0..count {
            model.joint_inv_bind_mtx.push(r.read_mat4()?);
        }
        model.bone_map = r
            .read_bytes(BONE_MAP_SIZE)?
            .iter()
            .map(|&b| b as i8)
            .collect();
    }

    if h.group_offset != 0 && h.group_count != 0 {
        r.seek_offset(hp, h.group_offset)?;
        for _ in 0..h.group_count {
            model.groups.push(read_group(r)?);
        }
    }

    if h.material_offset != 0 && h.material_count != 0 {
        r.seek_offset(hp, h.material_offset)?;
        for _ in 0..h.material_count {
            model.materials.push(r.read_cstring(MATERIAL_NAME_LENGTH)?);
        }
    }

    if h.primitive_offset != 0 && h.primitive_count != 0 {
        r.seek_offset(hp, h.primitive_offset)?;
        for _ in 0..h.primitive_count {
            model.primitives.push(read_primitive(r)?);
        }
        // envelopes follow the primitive table directly
        for _ in 0..h.primitive_joint_link_count {
            model.envelopes.push(read_envelope(r)?);
        }
    }

    if h.vertex_buffer_offset != 0 && h.vertex_buffer_size != 0 {
        r.seek_offset(hp, h.vertex_buffer_offset)?;
        model.vertex_buffer = r.read_bytes(h.vertex_buffer_size as usize)?.to_vec();
        if h.vertex_buffer2_size != 0 {
            model.vertex_buffer2 = r.read_bytes(h.vertex_buffer2_size as usize)?.to_vec();
        }
    }

    if h.index_buffer_offset != 0 && h.index_count != 0 {
        r.seek_offset(hp, h.index_buffer_offset)?;
        model.index_buffer = (0..h.index_count)
            .map(|_| r.read_u16())
            .collect::<Result<_>>()?;
    }

    if h.ex_data_offset != 0 {
        r.seek_offset(hp, h.ex_data_offset)?;
        model.ex_data = read_ex_data(r, h.primitive_count as usize)?;
    }

    Ok(model)
}

fn read_header(r: &mut ByteReader<'_>) -> Result<ModelHeader> {
    let magic = r.read_u32()?;
    if magic != MOD_MAGIC {
        return Err(Error::InvalidMagic {
            format: "MOD",
            expected: u64::from(MOD_MAGIC),
            found: u64::from(magic),
        });
    }
    let version = r.read_u16()?;
    if version != MOD_VERSION {
        return Err(Error::UnsupportedVersion {
            format: "MOD",
            version: u32::from(version),
        });
    }

    Ok(ModelHeader {
        magic,
        version,
        joint_count: r.read_u16()?,
        primitive_count: r.read_u16()?,
        material_count: r.read_u16()?,
        vertex_count: r.read_u32()?,
        index_count: r.read_u32()?,
        polygon_count: r.read_u32()?,
        vertex_buffer_size: r.read_u32()?,
        vertex_buffer2_size: r.read_u32()?,
        group_count: r.read_u64()?,
        joint_offset: r.read_u64()?,
        group_offset: r.read_u64()?,
        material_offset: r.read_u64()?,
        primitive_offset: r.read_u64()?,
        vertex_buffer_offset: r.read_u64()?,
        index_buffer_offset: r.read_u64()?,
        ex_data_offset: r.read_u64()?,
        center: r.read_vec3()?,
        radius: r.read_f32()?,
        min: r.read_vec4()?,
        max: r.read_vec4()?,
        field90: r.read_u32()?,
        field94: r.read_u32()?,
        field98: r.read_u32()?,
        field9c: r.read_u32()?,
        primitive_joint_link_count: r.read_u32()?,
    })
}

fn read_joint(r: &mut ByteReader<'_>) -> Result<Joint> {
    Ok(Joint {
        id: r.read_u8()?,
        parent_index: r.read_u8()?,
        symmetry_index: r.read_u8()?,
        field03: r.read_u8()?,
        field04: r.read_f32()?,
        length: r.read_f32()?,
        offset: r.read_vec3()?,
    })
}

fn read_group(r: &mut ByteReader<'_>) -> Result<Group> {
    Ok(Group {
        id: r.read_u32()?,
        field04: r.read_u32()?,
        field08: r.read_u32()?,
        field0c: r.read_u32()?,
        bounding_sphere: r.read_vec4()?,
    })
}

fn read_primitive(r: &mut ByteReader<'_>) -> Result<Primitive> {
    let prim = Primitive {
        flags: r.read_u16()?,
        vertex_count: r.read_u16()?,
        indices: PrimitiveIndices(r.read_u32()?),
        vertex_flags: r.read_u16()?,
        vertex_stride: r.read_u8()?,
        render_flags: r.read_u8()?,
        vertex_start_index: r.read_u32()?,
        vertex_buffer_offset: r.read_u32()?,
        vertex_shader: ShaderObjectId(r.read_u32()?),
        index_buffer_offset: r.read_u32()?,
        index_count: r.read_u32()?,
        index_start_index: r.read_u32()?,
        bone_id_start: r.read_u8()?,
        envelope_count: r.read_u8()?,
        id: r.read_u16()?,
        min_vertex_index: r.read_u16()?,
        max_vertex_index: r.read_u16()?,
        field2c: r.read_u32()?,
    };
    // runtime link pointer
    r.read_u64()?;
    Ok(prim)
}

fn read_envelope(r: &mut ByteReader<'_>) -> Result<Envelope> {
    Ok(Envelope {
        joint_index: r.read_u32()?,
        field04: r.read_u32()?,
        field08: r.read_u32()?,
        field0c: r.read_u32()?,
        bounding_sphere: r.read_vec4()?,
        min: r.read_vec4()?,
        max: r.read_vec4()?,
        local_mtx: r.read_mat4()?,
        field80: r.read_vec4()?,
    })
}

fn read_ex_data(r: &mut ByteReader<'_>, primitive_count: usize) -> Result<Option<ExData>> {
    if r.read_u32()? != 1 {
        return Ok(None);
    }
    let count1 = r.read_u16()?;
    let count2 = r.read_u16()?;
    let primitive_values = (0..primitive_count)
        .map(|_| r.read_u32())
        .collect::<Result<_>>()?;
    let size = r.read_u32()? as usize;
    let vertex_buffer = r.read_bytes(size)?.to_vec();
    let size = r.read_u32()? as usize;
    let vertex_buffer2 = r.read_bytes(size)?.to_vec();
    Ok(Some(ExData {
        count1,
        count2,
        primitive_values,
        vertex_buffer,
        vertex_buffer2,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteWriter;

    #[test]
    fn test_bad_magic() {
        let mut w = ByteWriter::new();
        w.write_u32(0x12345678);
        w.write_zeros(0xA0);
        let err = parse_mod_bytes(w.as_slice()).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { format: "MOD", .. }));
    }

    #[test]
    fn test_bad_version() {
        let mut w = ByteWriter::new();
        w.write_u32(MOD_MAGIC);
        w.write_u16(210);
        w.write_zeros(0x9E);
        let err = parse_mod_bytes(w.as_slice()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 210, .. }));
    }

    #[test]
    fn test_truncated_header() {
        let mut w = ByteWriter::new();
        w.write_u32(MOD_MAGIC);
        w.write_u16(MOD_VERSION);
        assert!(matches!(
            parse_mod_bytes(w.as_slice()),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_table_offset_overflow() {
        let model = Model {
            materials: vec!["mat".into()],
            ..Model::default()
        };
        let mut bytes = crate::formats::model::serialize_mod(&model).unwrap();
        // material table offset
        bytes[0x38..0x40].copy_from_slice(&(u64::MAX - 1).to_le_bytes());
        assert!(matches!(
            parse_mod_bytes(&bytes),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
