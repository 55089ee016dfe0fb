//! TEX <-> DDS repackaging
//!
//! Pixel data is copied unchanged in both directions; only the container
//! header is translated.

#![allow(clippy::cast_possible_truncation)]

use std::io::Cursor;
use std::path::Path;

use ddsfile::{Caps, Caps2, D3DFormat, Dds, DxgiFormat, HeaderFlags, NewD3dParams};

use super::types::{
    Compression, DEFAULT_TEXTURE_TYPE, DIMENSIONS_CUBE, MAX_DIMENSION, MAX_MIP_COUNT, Surface,
    SurfaceFormat, Texture, TextureHeader, default_cube_faces,
};
use super::{parse_tex_bytes, serialize_tex};
use crate::error::{Error, Result};

const FOURCC_DXT1: u32 = u32::from_le_bytes(*b"DXT1");
const CUBEMAP_FACE_COUNT: usize = 6;

/// Options for building a TEX from a DDS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdsToTexOptions {
    /// Preferred surface format. Ignored when its compression family does not
    /// match the DDS payload.
    pub format: Option<SurfaceFormat>,
    /// `desc.type` of the new header
    pub texture_type: u32,
}

impl Default for DdsToTexOptions {
    fn default() -> Self {
        Self {
            format: None,
            texture_type: DEFAULT_TEXTURE_TYPE,
        }
    }
}

/// Byte size of a block-compressed image.
pub fn block_compressed_size(width: u32, height: u32, block_size: usize) -> usize {
    let blocks = |v: u32| (v as usize).div_ceil(4).max(1);
    blocks(width) * blocks(height) * block_size
}

/// Row pitch of an uncompressed image.
pub fn row_pitch(width: u32, bits_per_pixel: u32) -> u32 {
    (width * bits_per_pixel).div_ceil(8)
}

// ============================================================================
// TEX -> DDS
// ============================================================================

/// Build a DDS container around the texture's pixel data.
///
/// # Errors
/// Returns [`Error::DdsError`] if the DDS header cannot be created.
pub fn tex_to_dds(texture: &Texture) -> Result<Dds> {
    let width = texture.width();
    let height = texture.height();
    let mip_count = texture.mip_count();
    let has_mips = mip_count > 1;
    let is_cubemap = texture.surfaces.len() > 1;

    let surface_format = texture.surface_format();
    let compression = surface_format.compression().unwrap_or_else(|| {
        tracing::warn!("Unknown surface format {}, exporting as DXT5", surface_format);
        Compression::Dxt5
    });
    let format = match compression {
        Compression::Dxt1 => D3DFormat::DXT1,
        Compression::Dxt5 => D3DFormat::DXT5,
        Compression::Rgba => D3DFormat::A8B8G8R8,
    };

    let mut dds = Dds::new_d3d(NewD3dParams {
        height,
        width,
        depth: None,
        format,
        mipmap_levels: has_mips.then_some(mip_count),
        caps2: None,
    })
    .map_err(|e| Error::DdsError(format!("Failed to create DDS: {e}")))?;

    let header = &mut dds.header;
    header.flags.insert(HeaderFlags::LINEARSIZE);
    header.mip_map_count = Some(mip_count);
    if has_mips {
        header.flags.insert(HeaderFlags::MIPMAPCOUNT);
        header.caps.insert(Caps::MIPMAP);
    }
    if is_cubemap {
        header.caps.insert(Caps::COMPLEX);
        header.caps2.insert(
            Caps2::CUBEMAP
                | Caps2::CUBEMAP_POSITIVEX
                | Caps2::CUBEMAP_NEGATIVEX
                | Caps2::CUBEMAP_POSITIVEY
                | Caps2::CUBEMAP_NEGATIVEY
                | Caps2::CUBEMAP_POSITIVEZ
                | Caps2::CUBEMAP_NEGATIVEZ,
        );
    }
    match compression.block_size() {
        Some(block_size) => {
            header.flags.remove(HeaderFlags::PITCH);
            header.pitch = None;
            header.linear_size = Some(block_compressed_size(width, height, block_size) as u32);
        }
        None => {
            header.linear_size = None;
            header.pitch = Some(row_pitch(width, 32));
        }
    }

    dds.data = texture
        .surfaces
        .iter()
        .flat_map(|s| s.mips.iter())
        .flatten()
        .copied()
        .collect();

    Ok(dds)
}

/// Convert TEX bytes to DDS bytes.
///
/// # Errors
/// Returns an error if the TEX cannot be parsed or the DDS cannot be written.
pub fn tex_bytes_to_dds_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let texture = parse_tex_bytes(data)?;
    let dds = tex_to_dds(&texture)?;
    let mut output = Vec::new();
    dds.write(&mut output)
        .map_err(|e| Error::DdsError(format!("Failed to write DDS: {e}")))?;
    Ok(output)
}

/// Convert a TEX file to a DDS file.
///
/// # Errors
/// Returns an error if reading, conversion or writing fails.
pub fn convert_tex_to_dds<P: AsRef<Path>, Q: AsRef<Path>>(tex_path: P, dds_path: Q) -> Result<()> {
    let data = std::fs::read(tex_path.as_ref())?;
    let output = tex_bytes_to_dds_bytes(&data)?;
    std::fs::write(dds_path.as_ref(), output)?;
    tracing::info!(
        "Converted {} to {}",
        tex_path.as_ref().display(),
        dds_path.as_ref().display()
    );
    Ok(())
}

// ============================================================================
// DDS -> TEX
// ============================================================================

/// Payload layout of a DDS file.
fn classify(dds: &Dds) -> Result<(Compression, u32)> {
    if let Some(header10) = &dds.header10 {
        return match header10.dxgi_format {
            DxgiFormat::BC1_UNorm | DxgiFormat::BC1_UNorm_sRGB => Ok((Compression::Dxt1, 4)),
            DxgiFormat::BC2_UNorm
            | DxgiFormat::BC2_UNorm_sRGB
            | DxgiFormat::BC3_UNorm
            | DxgiFormat::BC3_UNorm_sRGB => Ok((Compression::Dxt5, 8)),
            DxgiFormat::R8G8B8A8_UNorm | DxgiFormat::R8G8B8A8_UNorm_sRGB => {
                Ok((Compression::Rgba, 32))
            }
            other => Err(Error::DdsError(format!("Unsupported DXGI format: {other:?}"))),
        };
    }

    match &dds.header.spf.fourcc {
        Some(fourcc) if fourcc.0 == FOURCC_DXT1 => Ok((Compression::Dxt1, 4)),
        Some(_) => Ok((Compression::Dxt5, 8)),
        None => Ok((Compression::Rgba, dds.header.spf.rgb_bit_count.unwrap_or(32))),
    }
}

/// Build a TEX from a DDS container.
///
/// # Errors
/// Returns [`Error::DdsError`] for unsupported formats, sizes or mip counts the
/// TEX header cannot hold, and truncated pixel data.
pub fn dds_to_tex(dds: &Dds, options: DdsToTexOptions) -> Result<Texture> {
    let width = dds.header.width;
    let height = dds.header.height;
    let mip_count = dds.header.mip_map_count.unwrap_or(1).max(1);
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::DdsError(format!(
            "Texture size {width}x{height} does not fit a TEX header (1..={MAX_DIMENSION})"
        )));
    }
    if mip_count > MAX_MIP_COUNT {
        return Err(Error::DdsError(format!(
            "{mip_count} mip levels do not fit a TEX header (max {MAX_MIP_COUNT})"
        )));
    }
    let is_cubemap = dds.header.caps2.contains(Caps2::CUBEMAP);
    let surface_count = if is_cubemap { CUBEMAP_FACE_COUNT } else { 1 };

    let (compression, bits_per_pixel) = classify(dds)?;
    let fallback = match compression {
        Compression::Dxt1 => SurfaceFormat::BM_OPA,
        Compression::Dxt5 => SurfaceFormat::BM_XLU,
        Compression::Rgba => SurfaceFormat::LIN,
    };
    let format = match options.format {
        Some(f) if f.compression() == Some(compression) => f,
        Some(f) => {
            tracing::warn!(
                "Surface format {} does not match {:?} data, using {}",
                f,
                compression,
                fallback
            );
            fallback
        }
        None => fallback,
    };

    let mut offset = 0;
    let mut surfaces = Vec::with_capacity(surface_count);
    for _ in 0..surface_count {
        let mut surface = Surface::default();
        let (mut w, mut h) = (width, height);
        for _ in 0..mip_count {
            let size = match compression.block_size() {
                Some(block_size) => block_compressed_size(w, h, block_size),
                None => (w as usize * h as usize * bits_per_pixel as usize) / 8,
            };
            let mip = dds.data.get(offset..offset + size).ok_or_else(|| {
                Error::DdsError(format!(
                    "Pixel data truncated: need {} bytes, have {}",
                    offset + size,
                    dds.data.len()
                ))
            })?;
            surface.mips.push(mip.to_vec());
            offset += size;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        surfaces.push(surface);
    }
    if offset < dds.data.len() {
        tracing::debug!("Ignoring {} trailing DDS bytes", dds.data.len() - offset);
    }

    let mut header = TextureHeader::new(width, height, mip_count, format);
    header.desc.set_texture_type(options.texture_type);
    header.fmt.set_field3(1);
    header.fmt.set_field4(0);
    header.fmt.set_surface_count(surface_count as u32);

    let faces = if is_cubemap {
        header.desc.set_dimensions(DIMENSIONS_CUBE);
        default_cube_faces().to_vec()
    } else {
        Vec::new()
    };

    Ok(Texture {
        header,
        faces,
        surfaces,
    })
}

/// Convert DDS bytes to TEX bytes.
///
/// # Errors
/// Returns an error if the DDS cannot be parsed or converted.
pub fn dds_bytes_to_tex_bytes(data: &[u8], options: DdsToTexOptions) -> Result<Vec<u8>> {
    let dds = Dds::read(&mut Cursor::new(data))
        .map_err(|e| Error::DdsError(format!("Failed to parse DDS: {e}")))?;
    let texture = dds_to_tex(&dds, options)?;
    serialize_tex(&texture)
}

/// Convert a DDS file to a TEX file.
///
/// Without an explicit format the surface format is guessed from the file name.
///
/// # Errors
/// Returns an error if reading, conversion or writing fails.
pub fn convert_dds_to_tex<P: AsRef<Path>, Q: AsRef<Path>>(
    dds_path: P,
    tex_path: Q,
    mut options: DdsToTexOptions,
) -> Result<()> {
    let data = std::fs::read(dds_path.as_ref())?;
    if options.format.is_none() {
        let stem = dds_path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        // a DXT1 guess is rejected later for DXT5 payloads, so alpha can be assumed
        options.format = SurfaceFormat::from_texture_name(&stem, true);
    }
    let output = dds_bytes_to_tex_bytes(&data, options)?;
    std::fs::write(tex_path.as_ref(), output)?;
    tracing::info!(
        "Converted {} to {}",
        dds_path.as_ref().display(),
        tex_path.as_ref().display()
    );
    Ok(())
}
