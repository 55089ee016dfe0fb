//! Fixed vertex record layouts written by the model exporter

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::codec::{
    decode_f16, decode_fs8, decode_fs16, encode_f16, encode_fs8, encode_fs16,
};
use crate::error::{Error, Result};
use crate::io::{ByteReader, ByteWriter};

/// One vertex in the exporter's packed representation.
///
/// `joints`/`weights` hold up to four influences; slots past the used count repeat
/// the last joint with weight 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PackedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub occlusion: f32,
    pub tangent: Vec4,
    pub uv: Vec2,
    pub joints: [u8; 4],
    pub weights: [f32; 4],
}

/// Closed set of vertex layouts the exporter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    /// Four influences, compressed position
    IASkinTB4wt,
    /// Two influences, compressed position
    IASkinTB2wt,
    /// One influence, compressed position
    IASkinTB1wt,
    /// Static mesh with tangent and UV
    IANonSkinTB,
    /// Static mesh without UV or tangent
    IANonSkinB,
}

impl VertexFormat {
    pub const ALL: [VertexFormat; 5] = [
        Self::IASkinTB4wt,
        Self::IASkinTB2wt,
        Self::IASkinTB1wt,
        Self::IANonSkinTB,
        Self::IANonSkinB,
    ];

    /// Record size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::IASkinTB4wt => 28,
            Self::IASkinTB2wt | Self::IANonSkinTB => 24,
            Self::IASkinTB1wt => 20,
            Self::IANonSkinB => 16,
        }
    }

    /// Vertex shader name used for the shader object id.
    pub fn shader_name(self) -> &'static str {
        match self {
            Self::IASkinTB4wt => "IASkinTB4wt",
            Self::IASkinTB2wt => "IASkinTB2wt",
            Self::IASkinTB1wt => "IASkinTB1wt",
            Self::IANonSkinTB => "IANonSkinTB",
            Self::IANonSkinB => "IANonSkinB",
        }
    }

    pub fn from_shader_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.shader_name() == name)
    }

    pub fn max_weights(self) -> usize {
        match self {
            Self::IASkinTB4wt => 4,
            Self::IASkinTB2wt => 2,
            Self::IASkinTB1wt => 1,
            Self::IANonSkinTB | Self::IANonSkinB => 0,
        }
    }

    pub fn is_skinned(self) -> bool {
        self.max_weights() > 0
    }

    pub fn has_uv(self) -> bool {
        !matches!(self, Self::IANonSkinB)
    }

    /// Positions are stored as 16-bit fixed point in normalized model space.
    pub fn is_compressed(self) -> bool {
        self.is_skinned()
    }

    /// Smallest layout for a primitive.
    ///
    /// `influences` is the largest number of meaningful weights on any vertex.
    pub fn select(influences: usize, model_has_joints: bool, has_uv: bool) -> Self {
        match influences {
            0 if model_has_joints => Self::IASkinTB1wt,
            0 if has_uv => Self::IANonSkinTB,
            0 => Self::IANonSkinB,
            1 => Self::IASkinTB1wt,
            2 => Self::IASkinTB2wt,
            _ => Self::IASkinTB4wt,
        }
    }

    /// Keep `self` if it can hold `influences`, else upgrade to the smallest layout that can.
    pub fn upgrade_for(self, influences: usize) -> Self {
        if influences <= self.max_weights() {
            return self;
        }
        Self::select(influences, true, true)
    }

    /// Write one record. The cursor advances exactly [`Self::size`] bytes.
    pub fn encode(self, v: &PackedVertex, w: &mut ByteWriter) {
        match self {
            Self::IASkinTB4wt => {
                write_fs16_vec3(w, v.position);
                w.write_i16(encode_fs16(v.weights[0]));
                write_normal_block(w, v);
                w.write_bytes(&v.joints);
                write_uv(w, v.uv);
                w.write_u16(encode_f16(v.weights[1]));
                w.write_u16(encode_f16(v.weights[2]));
            }
            Self::IASkinTB2wt => {
                write_fs16_vec3(w, v.position);
                w.write_i16(encode_fs16(v.weights[0]));
                write_normal_block(w, v);
                write_uv(w, v.uv);
                w.write_u16(encode_f16(f32::from(v.joints[0])));
                w.write_u16(encode_f16(f32::from(v.joints[1])));
            }
            Self::IASkinTB1wt => {
                write_fs16_vec3(w, v.position);
                w.write_u16(u16::from(v.joints[0]));
                write_normal_block(w, v);
                write_uv(w, v.uv);
            }
            Self::IANonSkinTB => {
                w.write_vec3(v.position);
                write_normal_block(w, v);
                write_uv(w, v.uv);
            }
            Self::IANonSkinB => {
                w.write_vec3(v.position);
                for c in v.normal.to_array() {
                    w.write_u8(encode_fs8(c));
                }
                w.write_u8(encode_fs8(v.occlusion));
            }
        }
    }

    /// Read one record. Implicit values (last weight, unused joints) are rebuilt.
    pub fn decode(self, r: &mut ByteReader<'_>) -> Result<PackedVertex> {
        let mut v = PackedVertex::default();
        match self {
            Self::IASkinTB4wt => {
                v.position = read_fs16_vec3(r)?;
                v.weights[0] = decode_fs16(r.read_i16()?);
                read_normal_block(r, &mut v)?;
                let joints = r.read_bytes(4)?;
                v.joints.copy_from_slice(joints);
                v.uv = read_uv(r)?;
                v.weights[1] = decode_f16(r.read_u16()?);
                v.weights[2] = decode_f16(r.read_u16()?);
                v.weights[3] = (1.0 - v.weights[0] - v.weights[1] - v.weights[2]).max(0.0);
            }
            Self::IASkinTB2wt => {
                v.position = read_fs16_vec3(r)?;
                v.weights[0] = decode_fs16(r.read_i16()?);
                read_normal_block(r, &mut v)?;
                v.uv = read_uv(r)?;
                v.joints[0] = decode_f16(r.read_u16()?) as u8;
                v.joints[1] = decode_f16(r.read_u16()?) as u8;
                v.weights[1] = (1.0 - v.weights[0]).max(0.0);
            }
            Self::IASkinTB1wt => {
                v.position = read_fs16_vec3(r)?;
                let joint = r.read_u16()?;
                v.joints[0] = u8::try_from(joint).map_err(|_| {
                    Error::InvalidData(format!("joint index {joint} does not fit the bone map"))
                })?;
                read_normal_block(r, &mut v)?;
                v.uv = read_uv(r)?;
                v.weights[0] = 1.0;
            }
            Self::IANonSkinTB => {
                v.position = r.read_vec3()?;
                read_normal_block(r, &mut v)?;
                v.uv = read_uv(r)?;
            }
            Self::IANonSkinB => {
                v.position = r.read_vec3()?;
                v.normal = Vec3::new(
                    decode_fs8(r.read_u8()?),
                    decode_fs8(r.read_u8()?),
                    decode_fs8(r.read_u8()?),
                );
                v.occlusion = decode_fs8(r.read_u8()?);
            }
        }
        Ok(v)
    }
}

impl std::fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.shader_name())
    }
}

fn write_fs16_vec3(w: &mut ByteWriter, v: Vec3) {
    for c in v.to_array() {
        w.write_i16(encode_fs16(c));
    }
}

fn read_fs16_vec3(r: &mut ByteReader<'_>) -> Result<Vec3> {
    Ok(Vec3::new(
        decode_fs16(r.read_i16()?),
        decode_fs16(r.read_i16()?),
        decode_fs16(r.read_i16()?),
    ))
}

// normal xyz, occlusion, tangent xyzw
fn write_normal_block(w: &mut ByteWriter, v: &PackedVertex) {
    for c in v.normal.to_array() {
        w.write_u8(encode_fs8(c));
    }
    w.write_u8(encode_fs8(v.occlusion));
    for c in v.tangent.to_array() {
        w.write_u8(encode_fs8(c));
    }
}

fn read_normal_block(r: &mut ByteReader<'_>, v: &mut PackedVertex) -> Result<()> {
    let b = r.read_bytes(8)?;
    v.normal = Vec3::new(decode_fs8(b[0]), decode_fs8(b[1]), decode_fs8(b[2]));
    v.occlusion = decode_fs8(b[3]);
    v.tangent = Vec4::new(
        decode_fs8(b[4]),
        decode_fs8(b[5]),
        decode_fs8(b[6]),
        decode_fs8(b[7]),
    );
    Ok(())
}

fn write_uv(w: &mut ByteWriter, uv: Vec2) {
    w.write_u16(encode_f16(uv.x));
    w.write_u16(encode_f16(uv.y));
}

fn read_uv(r: &mut ByteReader<'_>) -> Result<Vec2> {
    Ok(Vec2::new(decode_f16(r.read_u16()?), decode_f16(r.read_u16()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackedVertex {
        PackedVertex {
            position: Vec3::new(0.25, -0.5, 0.75),
            normal: Vec3::new(0.0, 1.0, 0.0),
            occlusion: 1.0,
            tangent: Vec4::new(1.0, 0.0, 0.0, -1.0),
            uv: Vec2::new(0.5, 0.25),
            joints: [3, 1, 2, 2],
            weights: [0.5, 0.25, 0.25, 0.0],
        }
    }

    #[test]
    fn test_record_sizes() {
        for fmt in VertexFormat::ALL {
            let mut w = ByteWriter::new();
            fmt.encode(&sample(), &mut w);
            assert_eq!(w.len(), fmt.size(), "{fmt}");
        }
    }

    #[test]
    fn test_decode_matches_encode() {
        for fmt in VertexFormat::ALL {
            let mut w = ByteWriter::new();
            fmt.encode(&sample(), &mut w);
            let data = w.into_inner();
            let v = fmt.decode(&mut ByteReader::new(&data)).unwrap();
            assert!((v.position - sample().position).abs().max_element() < 1e-3, "{fmt}");
            assert!((v.normal - sample().normal).abs().max_element() < 1e-2, "{fmt}");
            if fmt.has_uv() {
                assert_eq!(v.uv, sample().uv);
                assert!((v.tangent - sample().tangent).abs().max_element() < 1e-2);
            }
            match fmt {
                VertexFormat::IASkinTB4wt => {
                    assert_eq!(v.joints, [3, 1, 2, 2]);
                    assert!((v.weights.iter().sum::<f32>() - 1.0).abs() < 1e-3);
                }
                VertexFormat::IASkinTB2wt => assert_eq!(&v.joints[..2], &[3, 1]),
                VertexFormat::IASkinTB1wt => assert_eq!(v.joints[0], 3),
                _ => {}
            }
        }
    }

    #[test]
    fn test_select_and_upgrade() {
        assert_eq!(VertexFormat::select(4, true, true), VertexFormat::IASkinTB4wt);
        assert_eq!(VertexFormat::select(3, true, true), VertexFormat::IASkinTB4wt);
        assert_eq!(VertexFormat::select(2, true, true), VertexFormat::IASkinTB2wt);
        assert_eq!(VertexFormat::select(1, false, true), VertexFormat::IASkinTB1wt);
        assert_eq!(VertexFormat::select(0, true, false), VertexFormat::IASkinTB1wt);
        assert_eq!(VertexFormat::select(0, false, true), VertexFormat::IANonSkinTB);
        assert_eq!(VertexFormat::select(0, false, false), VertexFormat::IANonSkinB);

        assert_eq!(VertexFormat::IASkinTB1wt.upgrade_for(3), VertexFormat::IASkinTB4wt);
        assert_eq!(VertexFormat::IASkinTB4wt.upgrade_for(2), VertexFormat::IASkinTB4wt);
        assert_eq!(VertexFormat::IANonSkinTB.upgrade_for(0), VertexFormat::IANonSkinTB);
        assert_eq!(VertexFormat::IANonSkinTB.upgrade_for(1), VertexFormat::IASkinTB1wt);
        assert_eq!(
            VertexFormat::from_shader_name("IASkinTB2wt"),
            Some(VertexFormat::IASkinTB2wt)
        );
    }
}
