//! MRL file writing

use std::path::Path;

use super::types::{
    ANIM_ENTRY_HEADER_SIZE, ANIM_TYPE_ENTRY_SIZES, ANIM_TYPE_HEADER_SIZES, AnimEntry,
    AnimEntryInfo, AnimSubEntry, CMD_SIZE, CmdData, CmdListInfo, HEADER_SIZE, MATERIAL_INFO_SIZE,
    Material, MaterialAnim, MaterialCmd, MaterialLibrary, TextureInfo, anim_entry_count,
};
use crate::error::{Error, Result};
use crate::formats::common::mask;
use crate::io::{ByteWriter, align_up};

/// Write an MRL file to disk
pub fn write_mrl<P: AsRef<Path>>(
    library: &MaterialLibrary,
    path: P,
    path_length: usize,
) -> Result<()> {
    let bytes = serialize_mrl(library, path_length)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a material library to MRL bytes.
///
/// Command list offsets, buffer sizes and animation block offsets are recomputed.
pub fn serialize_mrl(library: &MaterialLibrary, path_length: usize) -> Result<Vec<u8>> {
    validate(library)?;

    let mut w = ByteWriter::new();
    let hp = w.tell();
    w.write_zeros(HEADER_SIZE);

    let texture_offset = w.tell() - hp;
    for texture in &library.textures {
        write_texture_info(&mut w, texture, path_length);
    }

    let material_offset = w.tell() - hp;
    w.write_zeros(MATERIAL_INFO_SIZE * library.materials.len());
    w.align(16, hp);

    let mut layouts = Vec::with_capacity(library.materials.len());
    for material in &library.materials {
        layouts.push(write_cmd_list(&mut w, hp, &material.cmds));
    }

    for (material, layout) in library.materials.iter().zip(layouts.iter_mut()) {
        // an empty block has no data size and would read back as absent
        if let Some(anim) = material.anim.as_ref().filter(|a| !a.entries.is_empty()) {
            let (offset, size) = write_anim(&mut w, anim);
            layout.anim_data_offset = offset - hp;
            layout.anim_data_size = size;
        }
    }

    let end = w.tell();
    w.seek(hp + material_offset);
    for (material, layout) in library.materials.iter().zip(&layouts) {
        write_material_info(&mut w, material, layout);
    }

    w.seek(hp);
    w.write_u64(library.header.magic);
    w.write_u32(library.materials.len() as u32);
    w.write_u32(library.textures.len() as u32);
    w.write_u32(library.header.hash);
    w.write_u32(library.header.field14);
    w.write_u64(texture_offset as u64);
    w.write_u64(material_offset as u64);
    w.seek(end);

    tracing::debug!(
        "Serialized MRL: {} textures, {} materials, {} bytes",
        library.textures.len(),
        library.materials.len(),
        w.len()
    );
    Ok(w.into_inner())
}

fn validate(library: &MaterialLibrary) -> Result<()> {
    for (i, material) in library.materials.iter().enumerate() {
        if material.cmds.len() > mask(12) as usize {
            return Err(Error::InvalidData(format!(
                "material {i}: {} commands exceed the command list limit",
                material.cmds.len()
            )));
        }
        let Some(anim) = &material.anim else {
            continue;
        };
        for entry in &anim.entries {
            if entry.shader_object_ids.len() > mask(14) as usize
                || entry.sub_entries.len() > mask(16) as usize
            {
                return Err(Error::InvalidData(format!(
                    "material {i}: animation entry list too long"
                )));
            }
            for sub in &entry.sub_entries {
                validate_sub_entry(i, sub)?;
            }
        }
    }
    Ok(())
}

fn validate_sub_entry(material: usize, sub: &AnimSubEntry) -> Result<()> {
    let entry_type = sub.info.entry_type();
    let (Some(&header_size), Some(&entry_size), Some(count)) = (
        ANIM_TYPE_HEADER_SIZES.get(entry_type as usize),
        ANIM_TYPE_ENTRY_SIZES.get(entry_type as usize),
        anim_entry_count(entry_type, sub.info.entry_count()),
    ) else {
        return Err(Error::UnknownAnimEntryType(entry_type));
    };

    if sub.type_header.len() != header_size
        || sub.entries.len() != count
        || sub.entries.iter().any(|e| e.len() != entry_size)
    {
        return Err(Error::InvalidData(format!(
            "material {material}: animation sub-entry of type {entry_type} expects a \
             {header_size} byte header and {count} entries of {entry_size} bytes"
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MaterialLayout {
    cmd_list_offset: usize,
    cmd_buffer_size: usize,
    anim_data_offset: usize,
    anim_data_size: usize,
}

fn write_texture_info(w: &mut ByteWriter, texture: &TextureInfo, path_length: usize) {
    w.write_u32(texture.type_hash);
    w.write_u32(texture.field04);
    w.write_u32(texture.field08);
    w.write_u32(texture.field0c);
    w.write_u32(texture.field10);
    w.write_u32(texture.field14);
    w.write_cstring(&texture.path, path_length);
}

/// Write the command records followed by the constant buffer data they point at.
fn write_cmd_list(w: &mut ByteWriter, hp: usize, cmds: &[MaterialCmd]) -> MaterialLayout {
    let cmd_pos = w.tell();
    w.write_zeros(CMD_SIZE * cmds.len());
    w.align(16, hp);

    let mut values = Vec::with_capacity(cmds.len());
    for cmd in cmds {
        let value = match &cmd.data {
            CmdData::ConstantBuffer(floats) => {
                let offset = (w.tell() - cmd_pos) as u64;
                for &f in floats {
                    w.write_f32(f);
                }
                offset
            }
            CmdData::Flag(id) | CmdData::SamplerState(id) => u64::from(id.value()),
            CmdData::Texture(index) => u64::from(*index),
            CmdData::Raw(value) => *value,
        };
        values.push(value);
    }
    w.align(16, hp);
    let end = w.tell();

    w.seek(cmd_pos);
    for (cmd, value) in cmds.iter().zip(values) {
        let mut info = cmd.info;
        if let Some(t) = cmd.data_type() {
            info.set_cmd_type(t as u32);
        }
        w.write_u32(info.0);
        w.write_u32(cmd.field04);
        w.write_u64(value);
        w.write_u32(cmd.shader_object_id.value());
        w.write_u32(cmd.field14);
    }
    w.seek(end);

    MaterialLayout {
        cmd_list_offset: cmd_pos - hp,
        cmd_buffer_size: end - cmd_pos,
        ..MaterialLayout::default()
    }
}

/// Write an animation block. Returns its absolute position and data size.
fn write_anim(w: &mut ByteWriter, anim: &MaterialAnim) -> (usize, usize) {
    let anim_pos = w.tell();
    w.write_u32(anim.entries.len() as u32);
    w.write_u32(anim.field04);

    let mut next_offset_pos = w.tell();
    let mut next_data_pos = align_up(next_offset_pos + 8 * anim.entries.len(), 0, 16);

    for entry in &anim.entries {
        let data_pos = next_data_pos;
        w.seek(data_pos + ANIM_ENTRY_HEADER_SIZE);

        let list1_pos = w.tell();
        for id in &entry.shader_object_ids {
            w.write_u32(id.value());
        }
        let list2_pos = w.tell();
        for sub in &entry.sub_entries {
            write_anim_sub_entry(w, sub);
        }
        next_data_pos = w.tell();

        w.seek(data_pos);
        write_anim_entry_header(w, entry, list1_pos - anim_pos, list2_pos - anim_pos);

        w.seek(next_offset_pos);
        w.write_u64((data_pos - anim_pos) as u64);
        next_offset_pos = w.tell();
    }

    w.seek(next_data_pos);
    (anim_pos, next_data_pos - next_offset_pos)
}

fn write_anim_entry_header(w: &mut ByteWriter, entry: &AnimEntry, list1: usize, list2: usize) {
    let mut info = AnimEntryInfo::default();
    info.set_unknown(entry.unknown);
    info.set_entry_count(entry.shader_object_ids.len() as u32);
    info.set_entry2_count(entry.sub_entries.len() as u32);

    w.write_u32(entry.field00);
    w.write_u32(info.0);
    w.write_u64(list1 as u64);
    w.write_u32(entry.hash);
    w.write_u32(entry.field14);
    w.write_u64(list2 as u64);
}

fn write_anim_sub_entry(w: &mut ByteWriter, sub: &AnimSubEntry) {
    w.write_u32(sub.shader_object_id.value());
    w.write_u32(sub.info.0);
    w.write_u32(sub.field08);
    w.write_u32(sub.field0c);
    w.write_bytes(&sub.type_header);
    for entry in &sub.entries {
        w.write_bytes(entry);
    }
}

fn write_material_info(w: &mut ByteWriter, material: &Material, layout: &MaterialLayout) {
    let mut list_info = CmdListInfo::default();
    list_info.set_count(material.cmds.len() as u32);
    list_info.set_flags(material.cmd_list_flags);

    w.write_u32(material.type_hash);
    w.write_u32(material.field04);
    w.write_u32(material.name_hash);
    w.write_u32(layout.cmd_buffer_size as u32);
    w.write_u32(material.blend_state.value());
    w.write_u32(material.depth_stencil_state.value());
    w.write_u32(material.rasterizer_state.value());
    w.write_u32(list_info.0);
    w.write_u32(material.flags);
    w.write_u32(material.field24);
    w.write_u32(material.field28);
    w.write_u32(material.field2c);
    w.write_u32(material.field30);
    w.write_u32(layout.anim_data_size as u32);
    w.write_u64(layout.cmd_list_offset as u64);
    w.write_u64(layout.anim_data_offset as u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::common::ShaderObjectId;
    use crate::formats::material::types::{AnimSubEntryInfo, MRL_MAGIC, MaterialHeader};
    use crate::formats::material::{parse_mrl_bytes, types::constant_buffer_float_count};
    use crate::shader::ShaderRegistry;

    fn registry() -> ShaderRegistry {
        let mut registry = ShaderRegistry::new();
        registry.insert(3, "CBMaterial", 0x1234);
        registry.insert(4, "CBToon2", 0x2345);
        registry.insert(7, "FVertexDisplacement", 0x3456);
        registry
    }

    fn sub_entry(entry_type: u32, stored: u32) -> AnimSubEntry {
        let mut info = AnimSubEntryInfo::default();
        info.set_entry_type(entry_type);
        info.set_entry_count(stored);
        let count = anim_entry_count(entry_type, stored).unwrap();
        AnimSubEntry {
            shader_object_id: ShaderObjectId::new(7, 0x3456),
            info,
            field08: 1,
            field0c: 2,
            type_header: vec![0xAB; ANIM_TYPE_HEADER_SIZES[entry_type as usize]],
            entries: (0..count)
                .map(|i| vec![i as u8; ANIM_TYPE_ENTRY_SIZES[entry_type as usize]])
                .collect(),
        }
    }

    fn sample_library() -> MaterialLibrary {
        let cb_len = constant_buffer_float_count("CBMaterial").unwrap();
        let cmds = vec![
            MaterialCmd::new(ShaderObjectId::new(1, 0x111), CmdData::Flag(ShaderObjectId::new(2, 0x222))),
            MaterialCmd::new(
                ShaderObjectId::new(3, 0x1234),
                CmdData::ConstantBuffer((0..cb_len).map(|i| i as f32 * 0.5).collect()),
            ),
            MaterialCmd::new(ShaderObjectId::new(5, 0x555), CmdData::SamplerState(ShaderObjectId(9))),
            MaterialCmd::new(ShaderObjectId::new(6, 0x666), CmdData::Texture(1)),
            MaterialCmd::new(ShaderObjectId::new(4, 0x2345), CmdData::ConstantBuffer(vec![1.0; 4])),
        ];

        let anim = MaterialAnim {
            field04: 0x10,
            entries: vec![
                AnimEntry {
                    field00: 1,
                    unknown: 2,
                    hash: 0xDEAD,
                    field14: 3,
                    shader_object_ids: vec![ShaderObjectId::new(7, 0x3456)],
                    sub_entries: vec![sub_entry(0, 2), sub_entry(1, 3)],
                },
                AnimEntry {
                    hash: 0xBEEF,
                    sub_entries: vec![sub_entry(4, 1)],
                    ..AnimEntry::default()
                },
            ],
        };

        MaterialLibrary {
            header: MaterialHeader {
                hash: 0xCAFE,
                ..MaterialHeader::default()
            },
            textures: vec![TextureInfo {
                type_hash: 0x241F5DEB,
                path: "chr\\ryu\\tex\\body_BM".to_string(),
                ..TextureInfo::default()
            }],
            materials: vec![
                Material {
                    type_hash: 0x5FB8A8A0,
                    name_hash: 0x1,
                    cmd_list_flags: 0x40,
                    cmds,
                    anim: Some(anim),
                    ..Material::default()
                },
                Material {
                    name_hash: 0x2,
                    cmds: vec![MaterialCmd::new(
                        ShaderObjectId::new(6, 0x666),
                        CmdData::Texture(1),
                    )],
                    ..Material::default()
                },
            ],
        }
    }

    #[test]
    fn test_roundtrip() {
        let library = sample_library();
        let bytes = serialize_mrl(&library, 64).unwrap();
        let parsed = parse_mrl_bytes(&bytes, &registry(), 64).unwrap();
        assert_eq!(parsed, library);
        assert_eq!(serialize_mrl(&parsed, 64).unwrap(), bytes);
    }

    #[test]
    fn test_layout() {
        let bytes = serialize_mrl(&sample_library(), 64).unwrap();
        let rd = |pos: usize| u64::from_le_bytes(bytes[pos..pos + 8].try_into().unwrap());
        let rd32 = |pos: usize| u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());

        assert_eq!(rd(0), MRL_MAGIC);
        assert_eq!(rd32(8), 2);
        assert_eq!(rd32(12), 1);
        assert_eq!(rd(0x18), HEADER_SIZE as u64);
        let material_offset = HEADER_SIZE + 24 + 64;
        assert_eq!(rd(0x20), material_offset as u64);

        // first command list starts on a 16 byte boundary after the material table
        let cmd_list_offset = rd(material_offset + 0x38) as usize;
        assert_eq!(cmd_list_offset % 16, 0);
        assert!(cmd_list_offset >= material_offset + 2 * MATERIAL_INFO_SIZE);
        assert_eq!(rd32(material_offset + 0x1C) & 0xFFF, 5);
        assert_eq!(rd32(material_offset + 0x1C) >> 12, 0x40);

        // constant buffer data is addressed relative to the command list
        let cb_data = rd(cmd_list_offset + CMD_SIZE + 8) as usize;
        assert_eq!(cb_data % 16, 0);
        assert_eq!(cb_data, align_up(5 * CMD_SIZE, 0, 16));

        // animation block
        assert!(rd32(material_offset + 0x34) > 0);
        let anim_offset = rd(material_offset + 0x40) as usize;
        assert_eq!(rd32(anim_offset), 2);
        assert_eq!(rd(anim_offset + 8), (align_up(anim_offset + 24, 0, 16) - anim_offset) as u64);
    }

    #[test]
    fn test_sub_entry_mismatch() {
        let mut library = sample_library();
        if let Some(anim) = library.materials[0].anim.as_mut() {
            anim.entries[0].sub_entries[0].entries.pop();
        }
        assert!(matches!(
            serialize_mrl(&library, 64),
            Err(Error::InvalidData(_))
        ));
    }
}
