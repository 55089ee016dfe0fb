//! TEX file writing

use std::path::Path;

use super::types::{CUBE_FACE_COUNT, Texture};
use crate::error::{Error, Result};
use crate::formats::common::mask;
use crate::io::ByteWriter;

/// Write a TEX file to disk
pub fn write_tex<P: AsRef<Path>>(texture: &Texture, path: P) -> Result<()> {
    let bytes = serialize_tex(texture)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a texture to TEX bytes.
///
/// Surface and mip counts in the header are taken from the surface list.
pub fn serialize_tex(texture: &Texture) -> Result<Vec<u8>> {
    let mip_count = texture.surfaces.first().map_or(0, |s| s.mips.len());
    if texture.surfaces.iter().any(|s| s.mips.len() != mip_count) {
        return Err(Error::InvalidData(
            "all TEX surfaces must have the same number of mips".to_string(),
        ));
    }
    if mip_count > mask(6) as usize || texture.surfaces.len() > mask(8) as usize {
        return Err(Error::InvalidData(format!(
            "{} surfaces with {mip_count} mips do not fit the TEX header",
            texture.surfaces.len()
        )));
    }
    let expected_faces = if texture.header.is_cubemap() { CUBE_FACE_COUNT } else { 0 };
    if texture.faces.len() != expected_faces {
        return Err(Error::InvalidData(format!(
            "TEX has {} cube face records, expected {expected_faces}",
            texture.faces.len()
        )));
    }

    let mut header = texture.header;
    header.dim.set_mip_count(mip_count as u32);
    header.fmt.set_surface_count(texture.surfaces.len() as u32);

    let mut w = ByteWriter::with_capacity(texture.data_size() + 0x100);
    w.write_u32(header.magic);
    w.write_u32(header.desc.0);
    w.write_u32(header.dim.0);
    w.write_u32(header.fmt.0);

    for face in &texture.faces {
        w.write_f32(face.field00);
        w.write_vec3(face.negative);
        w.write_vec3(face.positive);
        w.write_vec2(face.uv);
    }

    let mut offset_pos = w.tell();
    let mut data_pos = offset_pos + 8 * texture.surfaces.len() * mip_count;
    for mip in texture.surfaces.iter().flat_map(|s| s.mips.iter()) {
        w.seek(offset_pos);
        w.write_u64(data_pos as u64);
        offset_pos = w.tell();

        w.seek(data_pos);
        w.write_bytes(mip);
        data_pos += mip.len();
    }
    w.seek(data_pos);

    Ok(w.into_inner())
}
