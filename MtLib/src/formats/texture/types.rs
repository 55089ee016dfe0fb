//! TEX container data types and surface formats

use std::fmt;
use std::str::FromStr;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::common::{get_bits, set_bits};

pub const TEX_MAGIC: u32 = 0x0058_4554;

pub const HEADER_SIZE: usize = 0x10;
pub const CUBE_FACE_SIZE: usize = 0x24;
pub const CUBE_FACE_COUNT: usize = 3;

/// `desc.dimensions` of a plain 2D texture.
pub const DIMENSIONS_2D: u32 = 2;
/// `desc.dimensions` of a cubemap.
pub const DIMENSIONS_CUBE: u32 = 6;

pub const DEFAULT_TEXTURE_TYPE: u32 = 0xA09D;

/// Packed `{type: 16, field2: 8, shift: 4, dimensions: 4}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureDesc(pub u32);

impl Default for TextureDesc {
    fn default() -> Self {
        let mut desc = Self(0);
        desc.set_texture_type(DEFAULT_TEXTURE_TYPE);
        desc.set_dimensions(DIMENSIONS_2D);
        desc
    }
}

impl TextureDesc {
    pub fn texture_type(self) -> u32 {
        get_bits(self.0, 0, 16)
    }

    pub fn set_texture_type(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 16, v);
    }

    pub fn field2(self) -> u32 {
        get_bits(self.0, 16, 8)
    }

    pub fn set_field2(&mut self, v: u32) {
        self.0 = set_bits(self.0, 16, 8, v);
    }

    pub fn shift(self) -> u32 {
        get_bits(self.0, 24, 4)
    }

    pub fn set_shift(&mut self, v: u32) {
        self.0 = set_bits(self.0, 24, 4, v);
    }

    pub fn dimensions(self) -> u32 {
        get_bits(self.0, 28, 4)
    }

    pub fn set_dimensions(&mut self, v: u32) {
        self.0 = set_bits(self.0, 28, 4, v);
    }
}

/// Largest width or height a TEX header can store.
pub const MAX_DIMENSION: u32 = (1 << 13) - 1;

/// Largest mip count a TEX header can store.
pub const MAX_MIP_COUNT: u32 = (1 << 6) - 1;

/// Packed `{mip_count: 6, width: 13, height: 13}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureDim(pub u32);

impl TextureDim {
    pub fn new(width: u32, height: u32, mip_count: u32) -> Self {
        let mut dim = Self(0);
        dim.set_width(width);
        dim.set_height(height);
        dim.set_mip_count(mip_count);
        dim
    }

    pub fn mip_count(self) -> u32 {
        get_bits(self.0, 0, 6)
    }

    pub fn set_mip_count(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 6, v);
    }

    pub fn width(self) -> u32 {
        get_bits(self.0, 6, 13)
    }

    pub fn set_width(&mut self, v: u32) {
        self.0 = set_bits(self.0, 6, 13, v);
    }

    pub fn height(self) -> u32 {
        get_bits(self.0, 19, 13)
    }

    pub fn set_height(&mut self, v: u32) {
        self.0 = set_bits(self.0, 19, 13, v);
    }
}

/// Packed `{surface_count: 8, surface_format: 8, field3: 13, field4: 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureFmt(pub u32);

impl Default for TextureFmt {
    fn default() -> Self {
        let mut fmt = Self(0);
        fmt.set_surface_count(1);
        fmt.set_surface_format(SurfaceFormat::BM_XLU);
        fmt.set_field3(1);
        fmt
    }
}

impl TextureFmt {
    pub fn surface_count(self) -> u32 {
        get_bits(self.0, 0, 8)
    }

    pub fn set_surface_count(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 8, v);
    }

    pub fn surface_format(self) -> SurfaceFormat {
        SurfaceFormat(get_bits(self.0, 8, 8))
    }

    pub fn set_surface_format(&mut self, v: SurfaceFormat) {
        self.0 = set_bits(self.0, 8, 8, v.0);
    }

    pub fn field3(self) -> u32 {
        get_bits(self.0, 16, 13)
    }

    pub fn set_field3(&mut self, v: u32) {
        self.0 = set_bits(self.0, 16, 13, v);
    }

    pub fn field4(self) -> u32 {
        get_bits(self.0, 29, 2)
    }

    pub fn set_field4(&mut self, v: u32) {
        self.0 = set_bits(self.0, 29, 2, v);
    }
}

/// Block compression family of a surface format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    Dxt1,
    Dxt5,
    /// Uncompressed 32-bit RGBA
    Rgba,
}

impl Compression {
    /// Bytes per 4x4 block; `None` for uncompressed data.
    pub fn block_size(self) -> Option<usize> {
        match self {
            Self::Dxt1 => Some(8),
            Self::Dxt5 => Some(16),
            Self::Rgba => None,
        }
    }
}

/// Engine surface format id stored in [`TextureFmt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceFormat(pub u32);

impl SurfaceFormat {
    /// Opaque base map
    pub const BM_OPA: Self = Self(19);
    /// Translucent base map
    pub const BM_XLU: Self = Self(23);
    pub const MM_OPA: Self = Self(25);
    /// Normal map
    pub const NM: Self = Self(31);
    /// Linear RGBA, used for ramps
    pub const LIN: Self = Self(39);
    pub const BM_HQ: Self = Self(42);

    const NAMED: [(&'static str, Self); 6] = [
        ("BM_OPA", Self::BM_OPA),
        ("BM_XLU", Self::BM_XLU),
        ("MM_OPA", Self::MM_OPA),
        ("NM", Self::NM),
        ("LIN", Self::LIN),
        ("BM_HQ", Self::BM_HQ),
    ];

    const SPECIAL_NAMES: [(&'static str, Self); 7] = [
        ("DEAmoji00_MM", Self(21)),
        ("yari_MM", Self::LIN),
        ("Wesker_nuno_DM", Self(30)),
        ("DefaultCube_CM", Self(32)),
        ("ZERmoyou02", Self::LIN),
        ("ZERmoyoured02", Self::LIN),
        ("ZERmoyouyellow02", Self::LIN),
    ];

    /// Compression family, `None` for ids this library does not know.
    pub fn compression(self) -> Option<Compression> {
        match self.0 {
            19 | 20 | 25 | 26 | 30 | 41 => Some(Compression::Dxt1),
            21 | 22 | 23 | 24 | 27 | 31 | 32 | 33 | 35 | 36 | 37 | 42 | 43 | 47 => {
                Some(Compression::Dxt5)
            }
            39 => Some(Compression::Rgba),
            _ => None,
        }
    }

    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, f)| *f == self)
            .map(|&(name, _)| name)
    }

    /// Guess the surface format from a texture's file stem.
    ///
    /// `alpha` tells whether the image has meaningful transparency.
    pub fn from_texture_name(name: &str, alpha: bool) -> Option<Self> {
        if let Some(&(_, f)) = Self::SPECIAL_NAMES.iter().find(|(n, _)| *n == name) {
            return Some(f);
        }
        let format = if name.contains("_BM") {
            if name.contains("toon") {
                Self::LIN
            } else if name.contains("_HQ") {
                Self::BM_HQ
            } else if alpha {
                Self::BM_XLU
            } else {
                Self::BM_OPA
            }
        } else if ["_LM", "_CM", "_NUKI"].iter().any(|t| name.contains(t)) {
            Self::BM_OPA
        } else if name.contains("_AM") || name.contains("_MM") {
            Self::MM_OPA
        } else if name.contains("_DM") || name.contains("_NM") {
            Self::NM
        } else if name.contains("_LIN") {
            Self::LIN
        } else {
            return None;
        };
        Some(format)
    }
}

impl fmt::Display for SurfaceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for SurfaceFormat {
    type Err = Error;

    /// Accepts a named format (`BM_OPA`) or a numeric id (`19`).
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(id) = s.parse::<u32>() {
            let format = Self(id);
            return format
                .compression()
                .map(|_| format)
                .ok_or_else(|| Error::InvalidData(format!("unknown surface format id {id}")));
        }
        Self::NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|&(_, f)| f)
            .ok_or_else(|| Error::InvalidData(format!("unknown surface format '{s}'")))
    }
}

/// Cubemap face record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CubeFace {
    pub field00: f32,
    pub negative: Vec3,
    pub positive: Vec3,
    pub uv: Vec2,
}

/// Face records written for cubemaps created from DDS files.
pub fn default_cube_faces() -> [CubeFace; CUBE_FACE_COUNT] {
    [
        CubeFace {
            field00: 0.483_737_9,
            negative: Vec3::new(-0.050_540_46, 0.040_085_21, 0.010_018_53),
            positive: Vec3::new(0.005_333_615, -0.030_391_54, 0.136_442_7),
            uv: Vec2::new(0.010_153_08, 0.025_200_43),
        },
        CubeFace {
            field00: 1.357_952,
            negative: Vec3::new(0.009_200_307, -0.046_203_23, 0.020_678_03),
            positive: Vec3::new(0.010_070_3, -0.092_966_82, 0.250_983_3),
            uv: Vec2::new(0.029_393_49, -0.032_880_69),
        },
        CubeFace {
            field00: 1.029_677,
            negative: Vec3::new(-0.048_630_77, 0.017_933_04, 0.022_425_14),
            positive: Vec3::new(0.009_546_677, -0.029_049_01, 0.221_782),
            uv: Vec2::new(0.032_004_68, -0.067_762_69),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureHeader {
    pub magic: u32,
    pub desc: TextureDesc,
    pub dim: TextureDim,
    pub fmt: TextureFmt,
}

impl Default for TextureHeader {
    fn default() -> Self {
        Self::new(0, 0, 0, SurfaceFormat::BM_XLU)
    }
}

impl TextureHeader {
    pub fn new(width: u32, height: u32, mip_count: u32, format: SurfaceFormat) -> Self {
        let mut fmt = TextureFmt::default();
        fmt.set_surface_format(format);
        Self {
            magic: TEX_MAGIC,
            desc: TextureDesc::default(),
            dim: TextureDim::new(width, height, mip_count),
            fmt,
        }
    }

    pub fn is_cubemap(&self) -> bool {
        self.desc.dimensions() == DIMENSIONS_CUBE
    }
}

/// One image surface (a cube face or the single 2D image) with its mip chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Surface {
    pub mips: Vec<Vec<u8>>,
}

/// A parsed TEX file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Texture {
    pub header: TextureHeader,
    /// Present for cubemaps only
    pub faces: Vec<CubeFace>,
    pub surfaces: Vec<Surface>,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.header.dim.width()
    }

    pub fn height(&self) -> u32 {
        self.header.dim.height()
    }

    pub fn mip_count(&self) -> u32 {
        self.header.dim.mip_count()
    }

    pub fn surface_format(&self) -> SurfaceFormat {
        self.header.fmt.surface_format()
    }

    /// Total size of all pixel data.
    pub fn data_size(&self) -> usize {
        self.surfaces
            .iter()
            .flat_map(|s| s.mips.iter())
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let mut desc = TextureDesc::default();
        assert_eq!(desc.texture_type(), 0xA09D);
        assert_eq!(desc.dimensions(), 2);
        desc.set_field2(0xAB);
        desc.set_shift(0xF);
        desc.set_dimensions(DIMENSIONS_CUBE);
        assert_eq!((desc.field2(), desc.shift(), desc.dimensions()), (0xAB, 0xF, 6));
        assert_eq!(desc.texture_type(), 0xA09D);

        let dim = TextureDim::new(8191, 4096, 63);
        assert_eq!((dim.width(), dim.height(), dim.mip_count()), (8191, 4096, 63));

        let mut fmt = TextureFmt::default();
        assert_eq!(fmt.surface_count(), 1);
        assert_eq!(fmt.field3(), 1);
        fmt.set_field4(3);
        fmt.set_surface_format(SurfaceFormat::NM);
        assert_eq!(fmt.surface_format(), SurfaceFormat::NM);
        assert_eq!(fmt.field4(), 3);
    }

    #[test]
    fn test_compression_families() {
        for id in [19, 20, 25, 26, 30, 41] {
            assert_eq!(SurfaceFormat(id).compression(), Some(Compression::Dxt1));
        }
        for id in [21, 22, 23, 24, 27, 31, 32, 33, 35, 36, 37, 42, 43, 47] {
            assert_eq!(SurfaceFormat(id).compression(), Some(Compression::Dxt5));
        }
        assert_eq!(SurfaceFormat::LIN.compression(), Some(Compression::Rgba));
        assert_eq!(SurfaceFormat(28).compression(), None);
    }

    #[test]
    fn test_name_heuristic() {
        let guess = SurfaceFormat::from_texture_name;
        assert_eq!(guess("Ryu_body_BM", false), Some(SurfaceFormat::BM_OPA));
        assert_eq!(guess("Ryu_body_BM", true), Some(SurfaceFormat::BM_XLU));
        assert_eq!(guess("Ryu_body_BM_HQ", false), Some(SurfaceFormat::BM_HQ));
        assert_eq!(guess("toon_Black_BM", false), Some(SurfaceFormat::LIN));
        assert_eq!(guess("Ryu_hair_NUKI", true), Some(SurfaceFormat::BM_OPA));
        assert_eq!(guess("Ryu_body_MM", false), Some(SurfaceFormat::MM_OPA));
        assert_eq!(guess("Ryu_body_NM", false), Some(SurfaceFormat::NM));
        assert_eq!(guess("ramp_LIN", false), Some(SurfaceFormat::LIN));
        assert_eq!(guess("Wesker_nuno_DM", false), Some(SurfaceFormat(30)));
        assert_eq!(guess("plain", false), None);
    }

    #[test]
    fn test_parse_surface_format() {
        assert_eq!("bm_opa".parse::<SurfaceFormat>().unwrap(), SurfaceFormat::BM_OPA);
        assert_eq!("47".parse::<SurfaceFormat>().unwrap(), SurfaceFormat(47));
        assert!("28".parse::<SurfaceFormat>().is_err());
        assert!("DXT9".parse::<SurfaceFormat>().is_err());
        assert_eq!(SurfaceFormat::NM.to_string(), "NM (31)");
    }
}
