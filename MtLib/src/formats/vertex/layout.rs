//! Shader-input driven vertex decoding
//!
//! A vertex shader declares an ordered list of inputs `{name, offset, type, count}`.
//! Decoding walks that list for every vertex and widens each component to `f32`,
//! which works for any shader the lookup knows about, not only the fixed layouts
//! in [`super::VertexFormat`].

use serde::{Deserialize, Serialize};

use super::codec;
use crate::error::{Error, Result};
use crate::io::ByteReader;

/// Storage type of one vertex input component, by its numeric type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexComponentType {
    F32,
    F16,
    U16,
    S16,
    Fs16,
    Fu16,
    S8,
    U8,
    Fs8,
    Fu8n,
    /// Unsigned 11/11/10 packed normal
    U11_11_10,
    /// Plain byte, same storage as `U8`
    U8b,
    Rgba8,
}

impl VertexComponentType {
    /// Map a type id from the shader input table.
    pub fn from_id(id: u32) -> Result<Self> {
        Ok(match id {
            1 => Self::F32,
            2 => Self::F16,
            3 => Self::U16,
            4 => Self::S16,
            5 => Self::Fs16,
            6 => Self::Fu16,
            7 => Self::S8,
            8 => Self::U8,
            9 => Self::Fs8,
            10 => Self::Fu8n,
            11 => Self::U11_11_10,
            13 => Self::U8b,
            14 => Self::Rgba8,
            other => return Err(Error::UnknownVertexComponentType(other)),
        })
    }

    pub fn id(self) -> u32 {
        match self {
            Self::F32 => 1,
            Self::F16 => 2,
            Self::U16 => 3,
            Self::S16 => 4,
            Self::Fs16 => 5,
            Self::Fu16 => 6,
            Self::S8 => 7,
            Self::U8 => 8,
            Self::Fs8 => 9,
            Self::Fu8n => 10,
            Self::U11_11_10 => 11,
            Self::U8b => 13,
            Self::Rgba8 => 14,
        }
    }

    /// Stored size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::F32 | Self::U11_11_10 | Self::Rgba8 => 4,
            Self::F16 | Self::U16 | Self::S16 | Self::Fs16 | Self::Fu16 => 2,
            Self::S8 | Self::U8 | Self::Fs8 | Self::Fu8n | Self::U8b => 1,
        }
    }

    /// Number of floats one stored component widens to.
    pub fn width(self) -> usize {
        match self {
            Self::U11_11_10 => 3,
            Self::Rgba8 => 4,
            _ => 1,
        }
    }

    /// Read one component and append its widened values to `out`.
    pub fn decode(self, reader: &mut ByteReader<'_>, out: &mut Vec<f32>) -> Result<()> {
        match self {
            Self::F32 => out.push(reader.read_f32()?),
            Self::F16 => out.push(codec::decode_f16(reader.read_u16()?)),
            Self::U16 => out.push(f32::from(reader.read_u16()?)),
            Self::S16 => out.push(f32::from(reader.read_i16()?)),
            Self::Fs16 => out.push(codec::decode_fs16(reader.read_i16()?)),
            Self::Fu16 => out.push(codec::decode_fu16(reader.read_u16()?)),
            Self::S8 => out.push(f32::from(reader.read_i8()?)),
            Self::U8 | Self::U8b => out.push(f32::from(reader.read_u8()?)),
            Self::Fs8 => out.push(codec::decode_fs8(reader.read_u8()?)),
            Self::Fu8n => out.push(codec::decode_fu8n(reader.read_u8()?)),
            Self::U11_11_10 => {
                out.extend(codec::decode_u32_11_11_10(reader.read_u32()?).to_array());
            }
            Self::Rgba8 => {
                let bits = reader.read_u32()?;
                out.extend((0..4).map(|i| ((bits >> (i * 8)) & 0xFF) as f32));
            }
        }
        Ok(())
    }
}

/// One input of a vertex shader's input layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderInput {
    /// Semantic name (`Position`, `Normal`, `UV_Primary`, ...)
    pub name: String,
    /// Byte offset inside the vertex record
    pub offset: u32,
    pub component_type: VertexComponentType,
    pub component_count: u32,
}

/// One attribute of a decoded vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedAttribute {
    pub name: String,
    /// Offset in floats inside a decoded vertex
    pub offset: usize,
    /// Number of floats
    pub count: usize,
}

/// Vertex buffer widened to `f32`, interleaved per vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedVertexBuffer {
    /// Floats per vertex
    pub stride: usize,
    pub attributes: Vec<DecodedAttribute>,
    pub data: Vec<f32>,
}

impl DecodedVertexBuffer {
    pub fn attribute(&self, name: &str) -> Option<&DecodedAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 { 0 } else { self.data.len() / self.stride }
    }

    /// Values of `name` for vertex `index`.
    pub fn get(&self, index: usize, name: &str) -> Option<&[f32]> {
        let attr = self.attribute(name)?;
        let start = index * self.stride + attr.offset;
        self.data.get(start..start + attr.count)
    }
}

/// Group inputs by semantic name, keeping first-appearance order.
pub fn group_inputs(inputs: &[ShaderInput]) -> Vec<(&str, Vec<&ShaderInput>)> {
    let mut groups: Vec<(&str, Vec<&ShaderInput>)> = Vec::new();
    for input in inputs {
        match groups.iter().position(|g| g.0 == input.name) {
            Some(i) => groups[i].1.push(input),
            None => groups.push((input.name.as_str(), vec![input])),
        }
    }
    groups
}

/// Decode `vertex_count` records of `stride` bytes using a shader's inputs.
///
/// Inputs sharing a name are concatenated into one attribute.
pub fn decode_vertex_buffer(
    inputs: &[ShaderInput],
    data: &[u8],
    vertex_count: usize,
    stride: usize,
) -> Result<DecodedVertexBuffer> {
    let reader = ByteReader::new(data);
    let mut out = DecodedVertexBuffer::default();
    if vertex_count == 0 {
        return Ok(out);
    }

    let groups = group_inputs(inputs);
    let mut values = Vec::new();
    for i in 0..vertex_count {
        let base = i * stride;
        for (name, group) in &groups {
            let start = values.len();
            for input in group {
                let mut r = reader.clone();
                r.seek(base + input.offset as usize)?;
                for _ in 0..input.component_count {
                    input.component_type.decode(&mut r, &mut values)?;
                }
            }
            if i == 0 {
                out.attributes.push(DecodedAttribute {
                    name: (*name).to_string(),
                    offset: start,
                    count: values.len() - start,
                });
            }
        }
        if i == 0 {
            out.stride = values.len();
        }
    }

    out.data = values;
    Ok(out)
}
