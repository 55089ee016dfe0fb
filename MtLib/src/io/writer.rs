//! Growable writer with random-access backpatching

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::{Mat4, Vec2, Vec3, Vec4};
use half::f16;

use super::{CursorState, Endian, align_up};

/// Owned output buffer with an explicit position.
///
/// Writing at the position overwrites existing bytes and extends the buffer as
/// needed. Seeking forward past the end is allowed; the gap is zero-filled by the
/// next write.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    data: Vec<u8>,
    state: CursorState,
}

macro_rules! write_scalar {
    ($name:ident, $ty:ty, $size:expr, $fn:ident) => {
        #[doc = concat!("Write a `", stringify!($ty), "` and advance.")]
        pub fn $name(&mut self, v: $ty) {
            let mut buf = [0u8; $size];
            match self.state.endian {
                Endian::Little => LittleEndian::$fn(&mut buf, v),
                Endian::Big => BigEndian::$fn(&mut buf, v),
            }
            self.put(&buf);
        }
    };
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::with_endian(Endian::Little)
    }

    pub fn with_endian(endian: Endian) -> Self {
        Self {
            data: Vec::new(),
            state: CursorState::new(endian),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            state: CursorState::new(Endian::Little),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn tell(&self) -> usize {
        self.state.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.state.pos = pos;
    }

    pub fn push_offset(&mut self) {
        self.state.push();
    }

    pub fn pop_offset(&mut self) -> Option<usize> {
        self.state.pop()
    }

    /// Pad with zeros until the position is aligned relative to `base`.
    pub fn align(&mut self, alignment: usize, base: usize) {
        let target = align_up(self.state.pos, base, alignment);
        let pad = target - self.state.pos;
        self.write_zeros(pad);
    }

    fn put(&mut self, bytes: &[u8]) {
        let start = self.state.pos;
        let end = start + bytes.len();
        if end > self.data.len() {
            if end > self.data.capacity() {
                self.data.reserve((end - self.data.len()).max(self.data.capacity()));
            }
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
        self.state.pos = end;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    pub fn write_zeros(&mut self, n: usize) {
        let start = self.state.pos;
        let end = start + n;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].fill(0);
        self.state.pos = end;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.put(&[v as u8]);
    }

    write_scalar!(write_u16, u16, 2, write_u16);
    write_scalar!(write_i16, i16, 2, write_i16);
    write_scalar!(write_u32, u32, 4, write_u32);
    write_scalar!(write_i32, i32, 4, write_i32);
    write_scalar!(write_u64, u64, 8, write_u64);
    write_scalar!(write_i64, i64, 8, write_i64);
    write_scalar!(write_f32, f32, 4, write_f32);
    write_scalar!(write_f64, f64, 8, write_f64);

    /// Narrow to an IEEE 754 half and write it.
    pub fn write_f16(&mut self, v: f32) {
        self.write_u16(f16::from_f32(v).to_bits());
    }

    /// Write `s` into a fixed `len`-byte NUL-padded buffer.
    ///
    /// Strings that do not fit are cut so the buffer keeps a terminating NUL.
    pub fn write_cstring(&mut self, s: &str, len: usize) {
        let bytes = s.as_bytes();
        let n = bytes.len().min(len.saturating_sub(1));
        if n < bytes.len() {
            tracing::warn!("String '{s}' truncated to {n} bytes");
        }
        self.put(&bytes[..n]);
        self.write_zeros(len - n);
    }

    pub fn write_vec2(&mut self, v: Vec2) {
        self.write_f32(v.x);
        self.write_f32(v.y);
    }

    pub fn write_vec3(&mut self, v: Vec3) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
    }

    pub fn write_vec4(&mut self, v: Vec4) {
        for c in v.to_array() {
            self.write_f32(c);
        }
    }

    /// Write a 4x4 matrix; each glam column becomes a stored row.
    pub fn write_mat4(&mut self, m: &Mat4) {
        for c in m.to_cols_array() {
            self.write_f32(c);
        }
    }

    /// Overwrite a `u32` at `pos` without moving the cursor.
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        let saved = self.state.pos;
        self.state.pos = pos;
        self.write_u32(v);
        self.state.pos = saved;
    }

    /// Overwrite a `u64` at `pos` without moving the cursor.
    pub fn patch_u64(&mut self, pos: usize, v: u64) {
        let saved = self.state.pos;
        self.state.pos = pos;
        self.write_u64(v);
        self.state.pos = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_past_end_zero_fills() {
        let mut w = ByteWriter::new();
        w.write_u8(1);
        w.seek(4);
        assert_eq!(w.len(), 1);
        w.write_u8(2);
        assert_eq!(w.as_slice(), &[1, 0, 0, 0, 2]);
    }

    #[test]
    fn test_overwrite_in_place() {
        let mut w = ByteWriter::new();
        w.write_u32(0);
        w.write_u32(7);
        w.patch_u32(0, 0xAABBCCDD);
        assert_eq!(w.tell(), 8);
        assert_eq!(&w.as_slice()[..4], &[0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn test_cstring_truncation() {
        let mut w = ByteWriter::new();
        w.write_cstring("abcdefgh", 4);
        assert_eq!(w.as_slice(), b"abc\0");
    }

    #[test]
    fn test_align_relative() {
        let mut w = ByteWriter::new();
        w.write_zeros(3);
        w.write_u8(9);
        w.align(4, 1);
        assert_eq!(w.tell(), 5);
        w.align(4, 1);
        assert_eq!(w.tell(), 5);
        assert_eq!(w.len(), 5);
    }
}
