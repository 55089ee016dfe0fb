//! MOD container data types

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::formats::common::{ShaderObjectId, get_bits, set_bits};

pub const MOD_MAGIC: u32 = 0x444F4D;
pub const MOD_VERSION: u16 = 211;

pub const HEADER_SIZE: usize = 0xA4;
pub const JOINT_SIZE: usize = 0x18;
pub const GROUP_SIZE: usize = 0x20;
pub const MATERIAL_NAME_LENGTH: usize = 128;
pub const PRIMITIVE_SIZE: usize = 0x38;
pub const ENVELOPE_SIZE: usize = 0x90;
pub const BONE_MAP_SIZE: usize = 256;

/// Parent/symmetry index meaning "none".
pub const NO_JOINT: u8 = 255;

/// Fixed MOD header. Offsets are relative to the header's own position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHeader {
    pub magic: u32,
    pub version: u16,
    pub joint_count: u16,
    pub primitive_count: u16,
    pub material_count: u16,
    pub vertex_count: u32,
    pub index_count: u32,
    pub polygon_count: u32,
    pub vertex_buffer_size: u32,
    pub vertex_buffer2_size: u32,
    pub group_count: u64,
    pub joint_offset: u64,
    pub group_offset: u64,
    pub material_offset: u64,
    pub primitive_offset: u64,
    pub vertex_buffer_offset: u64,
    pub index_buffer_offset: u64,
    pub ex_data_offset: u64,
    pub center: Vec3,
    pub radius: f32,
    pub min: Vec4,
    pub max: Vec4,
    pub field90: u32,
    pub field94: u32,
    pub field98: u32,
    pub field9c: u32,
    pub primitive_joint_link_count: u32,
}

impl Default for ModelHeader {
    fn default() -> Self {
        Self {
            magic: MOD_MAGIC,
            version: MOD_VERSION,
            joint_count: 0,
            primitive_count: 0,
            material_count: 0,
            vertex_count: 0,
            index_count: 0,
            polygon_count: 0,
            vertex_buffer_size: 0,
            vertex_buffer2_size: 0,
            group_count: 0,
            joint_offset: 0,
            group_offset: 0,
            material_offset: 0,
            primitive_offset: 0,
            vertex_buffer_offset: 0,
            index_buffer_offset: 0,
            ex_data_offset: 0,
            center: Vec3::ZERO,
            radius: 0.0,
            min: Vec4::ZERO,
            max: Vec4::ZERO,
            field90: 1000,
            field94: 3000,
            field98: 1,
            field9c: 0,
            primitive_joint_link_count: 0,
        }
    }
}

/// Skeleton joint record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Logical joint id, key of the bone map
    pub id: u8,
    /// Table index of the parent, [`NO_JOINT`] for roots
    pub parent_index: u8,
    /// Table index of the mirrored joint, [`NO_JOINT`] if none
    pub symmetry_index: u8,
    pub field03: u8,
    pub field04: f32,
    /// Distance to the parent
    pub length: f32,
    /// Translation relative to the parent
    pub offset: Vec3,
}

impl Default for Joint {
    fn default() -> Self {
        Self {
            id: 0,
            parent_index: NO_JOINT,
            symmetry_index: NO_JOINT,
            field03: 0,
            field04: 0.0,
            length: 0.0,
            offset: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    pub id: u32,
    pub field04: u32,
    pub field08: u32,
    pub field0c: u32,
    pub bounding_sphere: Vec4,
}

/// Packed `{group_id: 12, material_index: 12, lod_index: 8}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimitiveIndices(pub u32);

impl PrimitiveIndices {
    pub fn new(group_id: u32, material_index: u32, lod_index: u32) -> Self {
        let mut v = Self(0);
        v.set_group_id(group_id);
        v.set_material_index(material_index);
        v.set_lod_index(lod_index);
        v
    }

    pub fn group_id(self) -> u32 {
        get_bits(self.0, 0, 12)
    }

    pub fn set_group_id(&mut self, id: u32) {
        self.0 = set_bits(self.0, 0, 12, id);
    }

    pub fn material_index(self) -> u32 {
        get_bits(self.0, 12, 12)
    }

    pub fn set_material_index(&mut self, index: u32) {
        self.0 = set_bits(self.0, 12, 12, index);
    }

    pub fn lod_index(self) -> u32 {
        get_bits(self.0, 24, 8)
    }

    pub fn set_lod_index(&mut self, index: u32) {
        self.0 = set_bits(self.0, 24, 8, index);
    }
}

/// Draw call record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Primitive {
    pub flags: u16,
    pub vertex_count: u16,
    pub indices: PrimitiveIndices,
    pub vertex_flags: u16,
    pub vertex_stride: u8,
    pub render_flags: u8,
    pub vertex_start_index: u32,
    /// Byte offset into the vertex buffer
    pub vertex_buffer_offset: u32,
    pub vertex_shader: ShaderObjectId,
    /// Offset into the index buffer, in indices
    pub index_buffer_offset: u32,
    pub index_count: u32,
    pub index_start_index: u32,
    pub bone_id_start: u8,
    pub envelope_count: u8,
    pub id: u16,
    pub min_vertex_index: u16,
    pub max_vertex_index: u16,
    pub field2c: u32,
}

impl Default for Primitive {
    fn default() -> Self {
        Self {
            flags: 0xFFFF,
            vertex_count: 0,
            indices: PrimitiveIndices::default(),
            vertex_flags: 0,
            vertex_stride: 0,
            render_flags: 0,
            vertex_start_index: 0,
            vertex_buffer_offset: 0,
            vertex_shader: ShaderObjectId::default(),
            index_buffer_offset: 0,
            index_count: 0,
            index_start_index: 0,
            bone_id_start: 0,
            envelope_count: 0,
            id: 0,
            min_vertex_index: 0,
            max_vertex_index: 0,
            field2c: 0,
        }
    }
}

impl Primitive {
    /// First byte of this primitive's vertices in the vertex buffer.
    pub fn vertex_data_start(&self) -> usize {
        self.vertex_buffer_offset as usize
            + self.vertex_start_index as usize * self.vertex_stride as usize
    }

    /// First index of this primitive in the shared index buffer.
    pub fn index_start(&self) -> usize {
        self.index_buffer_offset as usize + self.index_start_index as usize
    }
}

/// Primitive-joint link: per-joint bounds used for culling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub joint_index: u32,
    pub field04: u32,
    pub field08: u32,
    pub field0c: u32,
    pub bounding_sphere: Vec4,
    pub min: Vec4,
    pub max: Vec4,
    pub local_mtx: Mat4,
    pub field80: Vec4,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            joint_index: 0,
            field04: 0,
            field08: 0,
            field0c: 0,
            bounding_sphere: Vec4::ZERO,
            min: Vec4::ZERO,
            max: Vec4::ZERO,
            local_mtx: Mat4::IDENTITY,
            field80: Vec4::ZERO,
        }
    }
}

/// Optional trailing block with extra per-primitive values and vertex streams.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExData {
    pub count1: u16,
    pub count2: u16,
    /// One value per primitive
    pub primitive_values: Vec<u32>,
    pub vertex_buffer: Vec<u8>,
    pub vertex_buffer2: Vec<u8>,
}

/// A parsed MOD file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Header as read. On write, counts, sizes and offsets are recomputed.
    pub header: ModelHeader,
    pub joints: Vec<Joint>,
    pub joint_local_mtx: Vec<Mat4>,
    pub joint_inv_bind_mtx: Vec<Mat4>,
    /// Joint id to table index, -1 where unused
    pub bone_map: Vec<i8>,
    pub groups: Vec<Group>,
    pub materials: Vec<String>,
    pub primitives: Vec<Primitive>,
    pub envelopes: Vec<Envelope>,
    pub vertex_buffer: Vec<u8>,
    pub vertex_buffer2: Vec<u8>,
    pub index_buffer: Vec<u16>,
    pub ex_data: Option<ExData>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            header: ModelHeader::default(),
            joints: Vec::new(),
            joint_local_mtx: Vec::new(),
            joint_inv_bind_mtx: Vec::new(),
            bone_map: vec![-1; BONE_MAP_SIZE],
            groups: Vec::new(),
            materials: Vec::new(),
            primitives: Vec::new(),
            envelopes: Vec::new(),
            vertex_buffer: Vec::new(),
            vertex_buffer2: Vec::new(),
            index_buffer: Vec::new(),
            ex_data: None,
        }
    }
}

impl Model {
    /// Raw vertex bytes of a primitive.
    pub fn primitive_vertex_data(&self, prim: &Primitive) -> Option<&[u8]> {
        let start = prim.vertex_data_start();
        let len = prim.vertex_count as usize * prim.vertex_stride as usize;
        self.vertex_buffer.get(start..start + len)
    }

    /// Index slice of a primitive.
    pub fn primitive_indices(&self, prim: &Primitive) -> Option<&[u16]> {
        let start = prim.index_start();
        self.index_buffer.get(start..start + prim.index_count as usize)
    }

    pub fn has_joints(&self) -> bool {
        !self.joints.is_empty()
    }
}
