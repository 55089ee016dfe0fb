//! Position-tracked binary cursors
//!
//! [`ByteReader`] walks a borrowed byte slice and fails with
//! [`Error::OutOfBounds`](crate::Error::OutOfBounds) when a read runs past the end.
//! [`ByteWriter`] owns a growable buffer; writes never fail and a seek past the end
//! zero-fills the gap once data lands there.
//!
//! Both share [`CursorState`]: the current position, the byte order and a stack of
//! saved offsets for "jump there, read, come back" patterns.

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;

/// Byte order used by a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Position, byte order and saved-offset stack shared by readers and writers.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    pos: usize,
    endian: Endian,
    saved: Vec<usize>,
}

impl CursorState {
    fn new(endian: Endian) -> Self {
        Self {
            pos: 0,
            endian,
            saved: Vec::new(),
        }
    }

    fn push(&mut self) {
        self.saved.push(self.pos);
    }

    fn pop(&mut self) -> Option<usize> {
        let pos = self.saved.pop()?;
        self.pos = pos;
        Some(pos)
    }
}

/// Round `pos` up so that `pos - base` is a multiple of `alignment`.
#[must_use]
pub fn align_up(pos: usize, base: usize, alignment: usize) -> usize {
    if alignment <= 1 || pos < base {
        return pos;
    }
    let rel = pos - base;
    base + rel.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 0, 16), 0);
        assert_eq!(align_up(1, 0, 16), 16);
        assert_eq!(align_up(17, 0, 16), 32);
        assert_eq!(align_up(0x14, 0x10, 4), 0x14);
        assert_eq!(align_up(0x15, 0x10, 4), 0x18);
        assert_eq!(align_up(7, 0, 1), 7);
    }

    #[test]
    fn test_reader_writer_agree() {
        let mut w = ByteWriter::new();
        w.write_u32(0xDEADBEEF);
        w.write_f16(0.5);
        w.write_cstring("abc", 8);
        w.write_i8(-3);
        let data = w.into_inner();

        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
        assert!((r.read_f16().unwrap() - 0.5).abs() < f32::EPSILON);
        assert_eq!(r.read_cstring(8).unwrap(), "abc");
        assert_eq!(r.read_i8().unwrap(), -3);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn test_big_endian() {
        let mut w = ByteWriter::with_endian(Endian::Big);
        w.write_u16(0x1234);
        let data = w.into_inner();
        assert_eq!(data, vec![0x12, 0x34]);
        let mut r = ByteReader::with_endian(&data, Endian::Big);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
    }
}
