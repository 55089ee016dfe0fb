//! TEX file reading

use std::path::Path;

use super::types::{
    CUBE_FACE_COUNT, CubeFace, Surface, TEX_MAGIC, Texture, TextureDesc, TextureDim, TextureFmt,
    TextureHeader,
};
use crate::error::{Error, Result};
use crate::io::ByteReader;

/// Read a TEX file from disk
pub fn read_tex<P: AsRef<Path>>(path: P) -> Result<Texture> {
    let data = std::fs::read(path)?;
    parse_tex_bytes(&data)
}

/// Parse TEX data from bytes.
///
/// Mip sizes are not stored: each mip spans to the next mip offset, the last one
/// to the end of the buffer.
pub fn parse_tex_bytes(data: &[u8]) -> Result<Texture> {
    let mut r = ByteReader::new(data);

    let magic = r.read_u32()?;
    if magic != TEX_MAGIC {
        return Err(Error::InvalidMagic {
            format: "TEX",
            expected: u64::from(TEX_MAGIC),
            found: u64::from(magic),
        });
    }
    let header = TextureHeader {
        magic,
        desc: TextureDesc(r.read_u32()?),
        dim: TextureDim(r.read_u32()?),
        fmt: TextureFmt(r.read_u32()?),
    };

    let mut faces = Vec::new();
    if header.is_cubemap() {
        for _ in 0..CUBE_FACE_COUNT {
            faces.push(CubeFace {
                field00: r.read_f32()?,
                negative: r.read_vec3()?,
                positive: r.read_vec3()?,
                uv: r.read_vec2()?,
            });
        }
    }

    let surface_count = header.fmt.surface_count() as usize;
    let mip_count = header.dim.mip_count() as usize;
    tracing::debug!(
        "TEX header: {}x{}, {} surfaces, {} mips, format {}",
        header.dim.width(),
        header.dim.height(),
        surface_count,
        mip_count,
        header.fmt.surface_format()
    );

    let offsets = (0..surface_count * mip_count)
        .map(|_| r.read_u64().map(|v| v as usize))
        .collect::<Result<Vec<_>>>()?;

    let mut surfaces = Vec::with_capacity(surface_count);
    for s in 0..surface_count {
        let mut surface = Surface::default();
        for m in 0..mip_count {
            let i = s * mip_count + m;
            let start = offsets[i];
            let end = offsets.get(i + 1).copied().unwrap_or(data.len());
            if end < start {
                return Err(Error::InvalidData(format!(
                    "TEX mip {i} ends at {end:#X} before it starts at {start:#X}"
                )));
            }
            r.seek(start)?;
            surface.mips.push(r.read_bytes(end - start)?.to_vec());
        }
        surfaces.push(surface);
    }

    Ok(Texture {
        header,
        faces,
        surfaces,
    })
}
