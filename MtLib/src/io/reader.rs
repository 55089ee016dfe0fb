//! Bounds-checked reader over a borrowed byte slice

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::{Mat4, Vec2, Vec3, Vec4};
use half::f16;

use super::{CursorState, Endian, align_up};
use crate::error::{Error, Result};

/// Reader over a borrowed byte slice with an explicit position.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    state: CursorState,
}

macro_rules! read_scalar {
    ($name:ident, $ty:ty, $size:expr, $fn:ident) => {
        #[doc = concat!("Read a `", stringify!($ty), "` and advance.")]
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.take($size)?;
            Ok(match self.state.endian {
                Endian::Little => LittleEndian::$fn(bytes),
                Endian::Big => BigEndian::$fn(bytes),
            })
        }
    };
}

impl<'a> ByteReader<'a> {
    /// Create a little-endian reader positioned at 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Little)
    }

    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            state: CursorState::new(endian),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn tell(&self) -> usize {
        self.state.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.state.pos)
    }

    pub fn endian(&self) -> Endian {
        self.state.endian
    }

    /// Move to an absolute position. Seeking to exactly the end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::OutOfBounds {
                offset: pos,
                len: 0,
                size: self.data.len(),
            });
        }
        self.state.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.seek(self.state.pos.saturating_add(n))
    }

    /// Seek to `base + offset` where `offset` was read from the file.
    pub fn seek_offset(&mut self, base: usize, offset: u64) -> Result<()> {
        let pos = usize::try_from(offset)
            .ok()
            .and_then(|offset| base.checked_add(offset));
        match pos {
            Some(pos) => self.seek(pos),
            None => Err(Error::OutOfBounds {
                offset: usize::MAX,
                len: 0,
                size: self.data.len(),
            }),
        }
    }

    /// Align the position relative to `base`.
    pub fn align(&mut self, alignment: usize, base: usize) -> Result<()> {
        self.seek(align_up(self.state.pos, base, alignment))
    }

    /// Save the current position on the offset stack.
    pub fn push_offset(&mut self) {
        self.state.push();
    }

    /// Restore the most recently saved position.
    pub fn pop_offset(&mut self) -> Option<usize> {
        self.state.pop()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let start = self.state.pos;
        let end = start.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(Error::OutOfBounds {
                offset: start,
                len: n,
                size: self.data.len(),
            });
        };
        self.state.pos = end;
        Ok(&self.data[start..end])
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Reader over `len` bytes starting at absolute `offset`, with the same byte order.
    pub fn sub_reader(&self, offset: usize, len: usize) -> Result<ByteReader<'a>> {
        let end = offset.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(Error::OutOfBounds {
                offset,
                len,
                size: self.data.len(),
            });
        };
        Ok(ByteReader::with_endian(&self.data[offset..end], self.state.endian))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    read_scalar!(read_u16, u16, 2, read_u16);
    read_scalar!(read_i16, i16, 2, read_i16);
    read_scalar!(read_u32, u32, 4, read_u32);
    read_scalar!(read_i32, i32, 4, read_i32);
    read_scalar!(read_u64, u64, 8, read_u64);
    read_scalar!(read_i64, i64, 8, read_i64);
    read_scalar!(read_f32, f32, 4, read_f32);
    read_scalar!(read_f64, f64, 8, read_f64);

    /// Read an IEEE 754 half and widen it.
    pub fn read_f16(&mut self) -> Result<f32> {
        Ok(f16::from_bits(self.read_u16()?).to_f32())
    }

    /// Read a fixed-size NUL-padded ASCII buffer of `len` bytes.
    pub fn read_cstring(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    pub fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read a 4x4 matrix of 16 floats. Each stored row becomes a glam column.
    pub fn read_mat4(&mut self) -> Result<Mat4> {
        let mut cols = [0f32; 16];
        for v in &mut cols {
            *v = self.read_f32()?;
        }
        Ok(Mat4::from_cols_array(&cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds() {
        let data = [1u8, 2, 3];
        let mut r = ByteReader::new(&data);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { offset: 0, len: 4, size: 3 }));
        assert!(r.seek(4).is_err());
        assert!(r.seek(3).is_ok());
    }

    #[test]
    fn test_push_pop_offset() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let mut r = ByteReader::new(&data);
        r.skip(1).unwrap();
        r.push_offset();
        r.seek(4).unwrap();
        assert_eq!(r.read_u8().unwrap(), 4);
        assert_eq!(r.pop_offset(), Some(1));
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.pop_offset(), None);
    }

    #[test]
    fn test_sub_reader() {
        let data = [0u8, 0, 0x34, 0x12, 9];
        let r = ByteReader::new(&data);
        let mut sub = r.sub_reader(2, 2).unwrap();
        assert_eq!(sub.read_u16().unwrap(), 0x1234);
        assert!(sub.read_u8().is_err());
        assert!(r.sub_reader(4, 2).is_err());
    }

    #[test]
    fn test_seek_offset_overflow() {
        let data = [0u8; 8];
        let mut r = ByteReader::new(&data);
        r.seek_offset(2, 4).unwrap();
        assert_eq!(r.tell(), 6);
        assert!(matches!(
            r.seek_offset(0x10, u64::MAX),
            Err(Error::OutOfBounds { size: 8, .. })
        ));
        assert!(r.skip(usize::MAX).is_err());
        assert_eq!(r.tell(), 6);
    }
}
