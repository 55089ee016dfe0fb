//! MRL file reading

use std::path::Path;

use super::types::{
    ANIM_TYPE_ENTRY_SIZES, ANIM_TYPE_HEADER_SIZES, AnimEntry, AnimEntryInfo, AnimSubEntry,
    AnimSubEntryInfo, CMD_SIZE, CmdData, CmdInfo, CmdListInfo, CmdType, MATERIAL_INFO_SIZE,
    MRL_MAGIC, Material, MaterialAnim, MaterialCmd, MaterialHeader, MaterialLibrary, TextureInfo,
    anim_entry_count, constant_buffer_float_count,
};
use crate::error::{Error, Result};
use crate::formats::common::ShaderObjectId;
use crate::io::ByteReader;
use crate::shader::ShaderLookup;

/// Read an MRL file from disk
pub fn read_mrl<P: AsRef<Path>>(
    path: P,
    lookup: &dyn ShaderLookup,
    path_length: usize,
) -> Result<MaterialLibrary> {
    let data = std::fs::read(path)?;
    parse_mrl_bytes(&data, lookup, path_length)
}

/// Parse MRL data from bytes.
///
/// `lookup` resolves constant buffer names, whose float counts are not stored in
/// the file. `path_length` is the fixed size of texture path buffers.
pub fn parse_mrl_bytes(
    data: &[u8],
    lookup: &dyn ShaderLookup,
    path_length: usize,
) -> Result<MaterialLibrary> {
    let mut r = ByteReader::new(data);
    let hp = r.tell();

    let magic = r.read_u64()?;
    if magic != MRL_MAGIC {
        return Err(Error::InvalidMagic {
            format: "MRL",
            expected: MRL_MAGIC,
            found: magic,
        });
    }
    let material_count = r.read_u32()?;
    let texture_count = r.read_u32()?;
    let header = MaterialHeader {
        magic,
        hash: r.read_u32()?,
        field14: r.read_u32()?,
    };
    let texture_offset = r.read_u64()?;
    let material_offset = r.read_u64()?;
    tracing::debug!(
        "MRL header: {} textures at {:#X}, {} materials at {:#X}",
        texture_count,
        texture_offset,
        material_count,
        material_offset
    );

    let mut textures = Vec::new();
    if texture_count != 0 {
        r.seek_offset(hp, texture_offset)?;
        for _ in 0..texture_count {
            textures.push(read_texture_info(&mut r, path_length)?);
        }
    }

    let mut materials = Vec::new();
    if material_count != 0 {
        r.seek_offset(hp, material_offset)?;
        for i in 0..material_count {
            r.push_offset();
            let material = read_material(&mut r, hp, lookup)?;
            tracing::debug!("Material {}: {} commands", i, material.cmds.len());
            r.pop_offset();
            r.skip(MATERIAL_INFO_SIZE)?;
            materials.push(material);
        }
    }

    Ok(MaterialLibrary {
        header,
        textures,
        materials,
    })
}

fn read_texture_info(r: &mut ByteReader<'_>, path_length: usize) -> Result<TextureInfo> {
    Ok(TextureInfo {
        type_hash: r.read_u32()?,
        field04: r.read_u32()?,
        field08: r.read_u32()?,
        field0c: r.read_u32()?,
        field10: r.read_u32()?,
        field14: r.read_u32()?,
        path: r.read_cstring(path_length)?,
    })
}

fn read_material(
    r: &mut ByteReader<'_>,
    hp: usize,
    lookup: &dyn ShaderLookup,
) -> Result<Material> {
    let type_hash = r.read_u32()?;
    let field04 = r.read_u32()?;
    let name_hash = r.read_u32()?;
    let _cmd_buffer_size = r.read_u32()?;
    let blend_state = ShaderObjectId(r.read_u32()?);
    let depth_stencil_state = ShaderObjectId(r.read_u32()?);
    let rasterizer_state = ShaderObjectId(r.read_u32()?);
    let cmd_list_info = CmdListInfo(r.read_u32()?);
    let flags = r.read_u32()?;
    let field24 = r.read_u32()?;
    let field28 = r.read_u32()?;
    let field2c = r.read_u32()?;
    let field30 = r.read_u32()?;
    let anim_data_size = r.read_u32()?;
    let cmd_list_offset = r.read_u64()?;
    let anim_data_offset = r.read_u64()?;

    r.seek_offset(hp, cmd_list_offset)?;
    let list_pos = r.tell();
    let cmds = read_cmds(r, list_pos, cmd_list_info.count() as usize, lookup)?;

    let anim = if anim_data_size > 0 {
        r.seek_offset(hp, anim_data_offset)?;
        let anim_pos = r.tell();
        Some(read_anim(r, anim_pos)?)
    } else {
        None
    };

    Ok(Material {
        type_hash,
        field04,
        name_hash,
        blend_state,
        depth_stencil_state,
        rasterizer_state,
        cmd_list_flags: cmd_list_info.flags(),
        flags,
        field24,
        field28,
        field2c,
        field30,
        cmds,
        anim,
    })
}

fn read_cmds(
    r: &mut ByteReader<'_>,
    list_pos: usize,
    count: usize,
    lookup: &dyn ShaderLookup,
) -> Result<Vec<MaterialCmd>> {
    let mut cmds = Vec::new();
    for i in 0..count {
        r.seek_offset(list_pos, (i * CMD_SIZE) as u64)?;
        let info = CmdInfo(r.read_u32()?);
        let field04 = r.read_u32()?;
        let value = r.read_u64()?;
        let shader_object_id = ShaderObjectId(r.read_u32()?);
        let field14 = r.read_u32()?;

        let data = match CmdType::from_raw(info.cmd_type()) {
            Some(CmdType::SetConstantBuffer) => {
                let name = lookup.require_name(shader_object_id.hash())?;
                let float_count = constant_buffer_float_count(name)
                    .ok_or_else(|| Error::UnknownConstantBuffer(name.to_string()))?;
                r.seek_offset(list_pos, value)?;
                let floats = (0..float_count)
                    .map(|_| r.read_f32())
                    .collect::<Result<Vec<_>>>()?;
                CmdData::ConstantBuffer(floats)
            }
            Some(CmdType::SetFlag) if value <= u64::from(u32::MAX) => {
                CmdData::Flag(ShaderObjectId(value as u32))
            }
            Some(CmdType::SetSamplerState) if value <= u64::from(u32::MAX) => {
                CmdData::SamplerState(ShaderObjectId(value as u32))
            }
            Some(CmdType::SetTexture) if value <= u64::from(u32::MAX) => {
                CmdData::Texture(value as u32)
            }
            _ => CmdData::Raw(value),
        };

        cmds.push(MaterialCmd {
            info,
            field04,
            shader_object_id,
            field14,
            data,
        });
    }
    Ok(cmds)
}

fn read_anim(r: &mut ByteReader<'_>, anim_pos: usize) -> Result<MaterialAnim> {
    r.seek(anim_pos)?;
    let entry_count = r.read_u32()? as usize;
    let field04 = r.read_u32()?;
    if entry_count.saturating_mul(8) > r.remaining() {
        return Err(Error::OutOfBounds {
            offset: r.tell(),
            len: entry_count.saturating_mul(8),
            size: r.len(),
        });
    }

    let offsets = (0..entry_count)
        .map(|_| r.read_u64())
        .collect::<Result<Vec<_>>>()?;

    let mut entries = Vec::with_capacity(entry_count);
    for offset in offsets {
        r.seek_offset(anim_pos, offset)?;
        entries.push(read_anim_entry(r, anim_pos)?);
    }

    Ok(MaterialAnim { field04, entries })
}

fn read_anim_entry(r: &mut ByteReader<'_>, anim_pos: usize) -> Result<AnimEntry> {
    let field00 = r.read_u32()?;
    let info = AnimEntryInfo(r.read_u32()?);
    let list1_offset = r.read_u64()?;
    let hash = r.read_u32()?;
    let field14 = r.read_u32()?;
    let list2_offset = r.read_u64()?;

    r.seek_offset(anim_pos, list1_offset)?;
    let shader_object_ids = (0..info.entry_count())
        .map(|_| r.read_u32().map(ShaderObjectId))
        .collect::<Result<Vec<_>>>()?;

    // sub-entries are stored back to back, each followed by its payload
    r.seek_offset(anim_pos, list2_offset)?;
    let sub_entries = (0..info.entry2_count())
        .map(|_| read_anim_sub_entry(r))
        .collect::<Result<Vec<_>>>()?;

    Ok(AnimEntry {
        field00,
        unknown: info.unknown(),
        hash,
        field14,
        shader_object_ids,
        sub_entries,
    })
}

fn read_anim_sub_entry(r: &mut ByteReader<'_>) -> Result<AnimSubEntry> {
    let shader_object_id = ShaderObjectId(r.read_u32()?);
    let info = AnimSubEntryInfo(r.read_u32()?);
    let field08 = r.read_u32()?;
    let field0c = r.read_u32()?;

    let entry_type = info.entry_type();
    let (Some(&header_size), Some(&entry_size), Some(count)) = (
        ANIM_TYPE_HEADER_SIZES.get(entry_type as usize),
        ANIM_TYPE_ENTRY_SIZES.get(entry_type as usize),
        anim_entry_count(entry_type, info.entry_count()),
    ) else {
        return Err(Error::UnknownAnimEntryType(entry_type));
    };

    let type_header = r.read_bytes(header_size)?.to_vec();
    let entries = (0..count)
        .map(|_| r.read_bytes(entry_size).map(<[u8]>::to_vec))
        .collect::<Result<Vec<_>>>()?;

    Ok(AnimSubEntry {
        shader_object_id,
        info,
        field08,
        field0c,
        type_header,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteWriter;
    use crate::shader::ShaderRegistry;

    #[test]
    fn test_bad_magic() {
        let mut w = ByteWriter::new();
        w.write_u64(0x1234);
        w.write_zeros(0x20);
        let registry = ShaderRegistry::new();
        assert!(matches!(
            parse_mrl_bytes(w.as_slice(), &registry, 64),
            Err(Error::InvalidMagic { format: "MRL", .. })
        ));
    }

    #[test]
    fn test_unknown_constant_buffer_hash() {
        let mut w = ByteWriter::new();
        w.write_u64(MRL_MAGIC);
        w.write_u32(1);
        w.write_u32(0);
        w.write_zeros(8);
        w.write_u64(0x28);
        w.write_u64(0x28);
        // material info
        w.write_zeros(0x1C);
        w.write_u32(1); // one command
        w.write_zeros(0x18);
        w.write_u64(0x70);
        w.write_u64(0);
        // constant buffer command with an unregistered hash
        w.write_u32(1);
        w.write_u32(0);
        w.write_u64(0x20);
        w.write_u32(ShaderObjectId::new(1, 0x777).value());
        w.write_u32(0);

        let registry = ShaderRegistry::new();
        assert!(matches!(
            parse_mrl_bytes(w.as_slice(), &registry, 64),
            Err(Error::UnknownShaderHash(0x777))
        ));
    }

    fn material_header(w: &mut ByteWriter) {
        w.write_u64(MRL_MAGIC);
        w.write_u32(1);
        w.write_u32(0);
        w.write_zeros(8);
        w.write_u64(0x28);
        w.write_u64(0x28);
    }

    #[test]
    fn test_constant_buffer_offset_overflow() {
        let mut w = ByteWriter::new();
        material_header(&mut w);
        w.write_zeros(0x1C);
        w.write_u32(1);
        w.write_zeros(0x18);
        w.write_u64(0x70);
        w.write_u64(0);
        w.write_u32(1);
        w.write_u32(0);
        w.write_u64(u64::MAX);
        w.write_u32(ShaderObjectId::new(1, 0x777).value());
        w.write_u32(0);

        let mut registry = ShaderRegistry::new();
        registry.insert(1, "CBMaterial", 0x777);
        assert!(matches!(
            parse_mrl_bytes(w.as_slice(), &registry, 64),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_anim_entry_offset_overflow() {
        let mut w = ByteWriter::new();
        material_header(&mut w);
        w.write_zeros(0x1C);
        w.write_u32(0);
        w.write_zeros(0x14);
        w.write_u32(0x10); // anim data size
        w.write_u64(0x70);
        w.write_u64(0x70);
        // animation block with one entry at an unreachable offset
        w.write_u32(1);
        w.write_u32(0);
        w.write_u64(u64::MAX - 4);

        let registry = ShaderRegistry::new();
        assert!(matches!(
            parse_mrl_bytes(w.as_slice(), &registry, 64),
            Err(Error::OutOfBounds { .. })
        ));

        // the same block with a huge entry count
        let mut bytes = w.into_inner();
        bytes[0x70..0x74].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            parse_mrl_bytes(&bytes, &registry, 64),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
