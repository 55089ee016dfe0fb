//! MRL container data types
//!
//! All types derive serde so a material library can be mirrored as JSON and read
//! back into an identical binary.

use serde::{Deserialize, Serialize};

use crate::formats::common::{ShaderObjectId, get_bits, set_bits};

pub const MRL_MAGIC: u64 = 0x22004C524D;

pub const HEADER_SIZE: usize = 0x28;
pub const MATERIAL_INFO_SIZE: usize = 0x48;
pub const CMD_SIZE: usize = 0x18;
pub const ANIM_HEADER_SIZE: usize = 0x8;
pub const ANIM_ENTRY_HEADER_SIZE: usize = 0x20;
pub const ANIM_SUB_ENTRY2_HEADER_SIZE: usize = 0x10;

/// Default fixed length of texture path buffers.
pub const DEFAULT_PATH_LENGTH: usize = 64;

/// Per-type byte size of the header that precedes a sub-entry 2 payload.
pub const ANIM_TYPE_HEADER_SIZES: [usize; 8] = [12, 32, 12, 24, 92, 8, 36, 36];
/// Per-type byte size of one sub-entry 2 payload entry.
pub const ANIM_TYPE_ENTRY_SIZES: [usize; 8] = [8, 20, 8, 16, 80, 8, 24, 24];
/// Per-type correction applied to the stored entry count.
pub const ANIM_TYPE_ENTRY_COUNT_MOD: [i64; 8] = [0, -1, 0, -1, -1, 0, -1, -1];

/// Float count of each known constant buffer. Not stored in the file.
pub const CONSTANT_BUFFER_SIZES: [(&str, usize); 5] = [
    ("CBMaterial", 32),
    ("$Globals", 76),
    ("CBDiffuseColorCorect", 4),
    ("CBHalfLambert", 4),
    ("CBToon2", 4),
];

pub fn constant_buffer_float_count(name: &str) -> Option<usize> {
    CONSTANT_BUFFER_SIZES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, count)| count)
}

/// Number of payload entries of a sub-entry 2 with the given type and stored count.
pub fn anim_entry_count(entry_type: u32, stored: u32) -> Option<usize> {
    let m = *ANIM_TYPE_ENTRY_COUNT_MOD.get(entry_type as usize)?;
    Some((i64::from(stored) + m).max(0) as usize)
}

// ============================================================================
// Header and textures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialHeader {
    pub magic: u64,
    pub hash: u32,
    pub field14: u32,
}

impl Default for MaterialHeader {
    fn default() -> Self {
        Self {
            magic: MRL_MAGIC,
            hash: 0,
            field14: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureInfo {
    pub type_hash: u32,
    pub field04: u32,
    pub field08: u32,
    pub field0c: u32,
    pub field10: u32,
    pub field14: u32,
    pub path: String,
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmdType {
    SetFlag = 0,
    SetConstantBuffer = 1,
    SetSamplerState = 2,
    SetTexture = 3,
}

impl CmdType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::SetFlag,
            1 => Self::SetConstantBuffer,
            2 => Self::SetSamplerState,
            3 => Self::SetTexture,
            _ => return None,
        })
    }
}

/// Packed `{type: 4, unknown: 16, shader_object_index: 12}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CmdInfo(pub u32);

impl CmdInfo {
    pub fn cmd_type(self) -> u32 {
        get_bits(self.0, 0, 4)
    }

    pub fn set_cmd_type(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 4, v);
    }

    pub fn unknown(self) -> u32 {
        get_bits(self.0, 4, 16)
    }

    pub fn set_unknown(&mut self, v: u32) {
        self.0 = set_bits(self.0, 4, 16, v);
    }

    pub fn shader_object_index(self) -> u32 {
        get_bits(self.0, 20, 12)
    }

    pub fn set_shader_object_index(&mut self, v: u32) {
        self.0 = set_bits(self.0, 20, 12, v);
    }
}

/// Packed `{count: 12, flags: 20}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CmdListInfo(pub u32);

impl CmdListInfo {
    pub fn count(self) -> u32 {
        get_bits(self.0, 0, 12)
    }

    pub fn set_count(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 12, v);
    }

    pub fn flags(self) -> u32 {
        get_bits(self.0, 12, 20)
    }

    pub fn set_flags(&mut self, v: u32) {
        self.0 = set_bits(self.0, 12, 20, v);
    }
}

/// Payload of a material command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CmdData {
    Flag(ShaderObjectId),
    /// Floats stored after the command list
    ConstantBuffer(Vec<f32>),
    SamplerState(ShaderObjectId),
    /// 1-based index into the texture table
    Texture(u32),
    /// Value of a command whose type is not one of the known four
    Raw(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialCmd {
    pub info: CmdInfo,
    pub field04: u32,
    pub shader_object_id: ShaderObjectId,
    pub field14: u32,
    pub data: CmdData,
}

impl MaterialCmd {
    pub fn new(shader_object_id: ShaderObjectId, data: CmdData) -> Self {
        let mut cmd = Self {
            info: CmdInfo::default(),
            field04: 0,
            shader_object_id,
            field14: 0,
            data,
        };
        cmd.info.set_shader_object_index(shader_object_id.index());
        if let Some(t) = cmd.data_type() {
            cmd.info.set_cmd_type(t as u32);
        }
        cmd
    }

    /// Command type implied by the payload; `None` for raw payloads.
    pub fn data_type(&self) -> Option<CmdType> {
        match self.data {
            CmdData::Flag(_) => Some(CmdType::SetFlag),
            CmdData::ConstantBuffer(_) => Some(CmdType::SetConstantBuffer),
            CmdData::SamplerState(_) => Some(CmdType::SetSamplerState),
            CmdData::Texture(_) => Some(CmdType::SetTexture),
            CmdData::Raw(_) => None,
        }
    }
}

// ============================================================================
// Animation block
// ============================================================================

/// Packed `{unknown: 2, entry2_count: 16, entry_count: 14}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimEntryInfo(pub u32);

impl AnimEntryInfo {
    pub fn unknown(self) -> u32 {
        get_bits(self.0, 0, 2)
    }

    pub fn set_unknown(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 2, v);
    }

    pub fn entry2_count(self) -> u32 {
        get_bits(self.0, 2, 16)
    }

    pub fn set_entry2_count(&mut self, v: u32) {
        self.0 = set_bits(self.0, 2, 16, v);
    }

    pub fn entry_count(self) -> u32 {
        get_bits(self.0, 18, 14)
    }

    pub fn set_entry_count(&mut self, v: u32) {
        self.0 = set_bits(self.0, 18, 14, v);
    }
}

/// Packed `{type: 4, unknown: 4, entry_count: 24}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimSubEntryInfo(pub u32);

impl AnimSubEntryInfo {
    pub fn entry_type(self) -> u32 {
        get_bits(self.0, 0, 4)
    }

    pub fn set_entry_type(&mut self, v: u32) {
        self.0 = set_bits(self.0, 0, 4, v);
    }

    pub fn unknown(self) -> u32 {
        get_bits(self.0, 4, 4)
    }

    pub fn set_unknown(&mut self, v: u32) {
        self.0 = set_bits(self.0, 4, 4, v);
    }

    pub fn entry_count(self) -> u32 {
        get_bits(self.0, 8, 24)
    }

    pub fn set_entry_count(&mut self, v: u32) {
        self.0 = set_bits(self.0, 8, 24, v);
    }
}

/// Typed animation track: a header blob plus fixed-size entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimSubEntry {
    pub shader_object_id: ShaderObjectId,
    /// Type and stored count; the payload length follows from both
    pub info: AnimSubEntryInfo,
    pub field08: u32,
    pub field0c: u32,
    pub type_header: Vec<u8>,
    pub entries: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimEntry {
    pub field00: u32,
    /// The two low bits of the packed info word
    pub unknown: u32,
    pub hash: u32,
    pub field14: u32,
    pub shader_object_ids: Vec<ShaderObjectId>,
    pub sub_entries: Vec<AnimSubEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialAnim {
    pub field04: u32,
    pub entries: Vec<AnimEntry>,
}

// ============================================================================
// Materials
// ============================================================================

/// One material. Command list placement and sizes are recomputed on write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Material {
    pub type_hash: u32,
    pub field04: u32,
    pub name_hash: u32,
    pub blend_state: ShaderObjectId,
    pub depth_stencil_state: ShaderObjectId,
    pub rasterizer_state: ShaderObjectId,
    /// High 20 bits of the command list info word
    pub cmd_list_flags: u32,
    pub flags: u32,
    pub field24: u32,
    pub field28: u32,
    pub field2c: u32,
    pub field30: u32,
    pub cmds: Vec<MaterialCmd>,
    pub anim: Option<MaterialAnim>,
}

/// A parsed MRL file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialLibrary {
    pub header: MaterialHeader,
    pub textures: Vec<TextureInfo>,
    pub materials: Vec<Material>,
}

impl MaterialLibrary {
    /// Texture referenced by a 1-based texture command index.
    pub fn texture(&self, index: u32) -> Option<&TextureInfo> {
        let i = usize::try_from(index).ok()?.checked_sub(1)?;
        self.textures.get(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_info_fields() {
        let mut info = CmdInfo::default();
        info.set_cmd_type(3);
        info.set_unknown(0xBEEF);
        info.set_shader_object_index(0xABC);
        assert_eq!(info.cmd_type(), 3);
        assert_eq!(info.unknown(), 0xBEEF);
        assert_eq!(info.shader_object_index(), 0xABC);
        assert_eq!(info.0, 0xABCBEEF3);
    }

    #[test]
    fn test_anim_info_fields() {
        let mut info = AnimEntryInfo::default();
        info.set_unknown(2);
        info.set_entry2_count(0xFFFF);
        info.set_entry_count(0x3FFF);
        assert_eq!((info.unknown(), info.entry2_count(), info.entry_count()), (2, 0xFFFF, 0x3FFF));

        let mut sub = AnimSubEntryInfo::default();
        sub.set_entry_type(7);
        sub.set_unknown(5);
        sub.set_entry_count(0x123456);
        assert_eq!((sub.entry_type(), sub.unknown(), sub.entry_count()), (7, 5, 0x123456));

        let mut list = CmdListInfo::default();
        list.set_count(12);
        list.set_flags(0xFFFFF);
        assert_eq!((list.count(), list.flags()), (12, 0xFFFFF));
    }

    #[test]
    fn test_entry_count_mod() {
        assert_eq!(anim_entry_count(0, 3), Some(3));
        assert_eq!(anim_entry_count(1, 3), Some(2));
        assert_eq!(anim_entry_count(1, 0), Some(0));
        assert_eq!(anim_entry_count(8, 3), None);
    }

    #[test]
    fn test_constant_buffer_sizes() {
        assert_eq!(constant_buffer_float_count("CBMaterial"), Some(32));
        assert_eq!(constant_buffer_float_count("$Globals"), Some(76));
        assert_eq!(constant_buffer_float_count("CBToon2"), Some(4));
        assert_eq!(constant_buffer_float_count("CBUnknown"), None);
    }
}
