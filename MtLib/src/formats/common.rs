//! Shared packed-field helpers and the shader object identifier

use serde::{Deserialize, Serialize};

/// Mask with the low `bits` bits set.
#[must_use]
pub const fn mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

/// Extract `bits` bits starting at `shift`.
#[must_use]
pub const fn get_bits(raw: u32, shift: u32, bits: u32) -> u32 {
    (raw >> shift) & mask(bits)
}

/// Replace `bits` bits starting at `shift` with the low bits of `field`.
#[must_use]
pub const fn set_bits(raw: u32, shift: u32, bits: u32, field: u32) -> u32 {
    let m = mask(bits) << shift;
    (raw & !m) | ((field << shift) & m)
}

/// Packed shader object identifier: `{index: 12, hash: 20}`, low bits first.
///
/// The hash is the low 20 bits of the name's CRC; the index is the object's slot in
/// the engine's shader package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShaderObjectId(pub u32);

impl ShaderObjectId {
    pub const INDEX_BITS: u32 = 12;
    pub const HASH_BITS: u32 = 20;

    #[must_use]
    pub const fn new(index: u32, hash: u32) -> Self {
        let raw = set_bits(0, 0, Self::INDEX_BITS, index);
        Self(set_bits(raw, Self::INDEX_BITS, Self::HASH_BITS, hash))
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        get_bits(self.0, 0, Self::INDEX_BITS)
    }

    #[must_use]
    pub const fn hash(self) -> u32 {
        get_bits(self.0, Self::INDEX_BITS, Self::HASH_BITS)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for ShaderObjectId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ShaderObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#05X}:{:#07X}", self.index(), self.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_object_id_pack() {
        let id = ShaderObjectId::new(5, 0xABCDE);
        assert_eq!(id.index(), 5);
        assert_eq!(id.hash(), 0xABCDE);
        assert_eq!(id.value(), (0xABCDE << 12) | 5);
        assert_eq!(ShaderObjectId::from(id.value()), id);
    }

    #[test]
    fn test_shader_object_id_truncates_fields() {
        let id = ShaderObjectId::new(0x1FFF, 0x1F_FFFF);
        assert_eq!(id.index(), 0xFFF);
        assert_eq!(id.hash(), 0xF_FFFF);
    }

    #[test]
    fn test_bits() {
        let raw = set_bits(0, 4, 16, 0xBEEF);
        assert_eq!(get_bits(raw, 4, 16), 0xBEEF);
        assert_eq!(get_bits(raw, 0, 4), 0);
        let raw = set_bits(raw, 4, 16, 1);
        assert_eq!(raw, 0x10);
        assert_eq!(mask(32), u32::MAX);
    }
}
