//! Scalar quantization codecs for vertex components
//!
//! Every encoder saturates at its storage range, so out-of-range input never wraps.

use glam::{Vec3, Vec4};
use half::f16;

// ============================================================================
// Fixed-point scalars
// ============================================================================

/// Signed 16-bit fixed point in `[-1, 1]`.
pub fn decode_fs16(raw: i16) -> f32 {
    f32::from(raw) / 32767.0
}

pub fn encode_fs16(v: f32) -> i16 {
    if v.is_nan() {
        return 0;
    }
    (v * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Unsigned 16-bit fixed point in `[0, 1]`.
pub fn decode_fu16(raw: u16) -> f32 {
    f32::from(raw) / 65535.0
}

pub fn encode_fu16(v: f32) -> u16 {
    if v.is_nan() {
        return 0;
    }
    (v * 65535.0).round().clamp(0.0, 65535.0) as u16
}

/// Biased 8-bit fixed point, `(raw - 127) / 128`.
pub fn decode_fu8(raw: u8) -> f32 {
    (f32::from(raw) - 127.0) / 128.0
}

pub fn encode_fu8(v: f32) -> u8 {
    if v.is_nan() {
        return 127;
    }
    ((v * 128.0).round() + 127.0).clamp(0.0, 255.0) as u8
}

/// Biased 8-bit fixed point used by normals and tangents, `(raw - 127) / 127`.
pub fn decode_fs8(raw: u8) -> f32 {
    (f32::from(raw) - 127.0) / 127.0
}

pub fn encode_fs8(v: f32) -> u8 {
    if v.is_nan() {
        return 127;
    }
    ((v * 127.0).round() + 127.0).clamp(0.0, 255.0) as u8
}

/// Normalized unsigned byte, `raw / 255`.
pub fn decode_fu8n(raw: u8) -> f32 {
    f32::from(raw) / 255.0
}

pub fn encode_fu8n(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// Half floats
// ============================================================================

pub fn decode_f16(raw: u16) -> f32 {
    f16::from_bits(raw).to_f32()
}

pub fn encode_f16(v: f32) -> u16 {
    f16::from_f32(v).to_bits()
}

// ============================================================================
// Packed normals
// ============================================================================

/// `x:10, y:10, z:10, w:2`; xyz decode as `(v - 511) / 512`, w as `v / 3`.
pub fn decode_u32_10_10_10_2(bits: u32) -> Vec4 {
    let x = bits & 0x3FF;
    let y = (bits >> 10) & 0x3FF;
    let z = (bits >> 20) & 0x3FF;
    let w = (bits >> 30) & 0x3;
    let c = |v: u32| (v as f32 - 511.0) / 512.0;
    Vec4::new(c(x), c(y), c(z), w as f32 / 3.0)
}

pub fn encode_u32_10_10_10_2(v: Vec4) -> u32 {
    let c = |f: f32| {
        if f.is_nan() {
            511
        } else {
            ((f * 512.0).round() + 511.0).clamp(0.0, 1023.0) as u32
        }
    };
    let w = if v.w.is_nan() { 0 } else { (v.w * 3.0).round().clamp(0.0, 3.0) as u32 };
    c(v.x) | (c(v.y) << 10) | (c(v.z) << 20) | (w << 30)
}

/// Unsigned `x:11, y:11, z:10`; the alpha channel is implicitly 1.
pub fn decode_u32_11_11_10(bits: u32) -> Vec3 {
    Vec3::new(
        (bits & 0x7FF) as f32 / 2047.0,
        ((bits >> 11) & 0x7FF) as f32 / 2047.0,
        ((bits >> 22) & 0x3FF) as f32 / 1023.0,
    )
}

pub fn encode_u32_11_11_10(v: Vec3) -> u32 {
    let q = |f: f32, max: f32| if f.is_nan() { 0 } else { (f * max).round().clamp(0.0, max) as u32 };
    q(v.x, 2047.0) | (q(v.y, 2047.0) << 11) | (q(v.z, 1023.0) << 22)
}

/// Signed `x:11, y:11, z:10` biased around the field midpoint.
pub fn decode_s32_11_11_10(bits: u32) -> Vec3 {
    Vec3::new(
        ((bits & 0x7FF) as f32 - 1023.0) / 1024.0,
        (((bits >> 11) & 0x7FF) as f32 - 1023.0) / 1024.0,
        (((bits >> 22) & 0x3FF) as f32 - 511.0) / 512.0,
    )
}

pub fn encode_s32_11_11_10(v: Vec3) -> u32 {
    let q = |f: f32, scale: f32, bias: f32, max: f32| {
        if f.is_nan() {
            bias as u32
        } else {
            ((f * scale).round() + bias).clamp(0.0, max) as u32
        }
    };
    q(v.x, 1024.0, 1023.0, 2047.0)
        | (q(v.y, 1024.0, 1023.0, 2047.0) << 11)
        | (q(v.z, 512.0, 511.0, 1023.0) << 22)
}
