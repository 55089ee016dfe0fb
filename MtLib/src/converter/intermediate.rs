//! Editable model representation
//!
//! Host adapters and the MOD importer produce an [`IntermediateModel`]; the
//! exporter turns it back into a binary [`crate::formats::model::Model`]. Joints,
//! envelopes and primitives refer to each other by table index and material by name.

use std::fs;
use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::vertex::VertexFormat;

/// Named UV channel of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UvChannel {
    Primary,
    Secondary,
    Unique,
    Extend,
}

impl UvChannel {
    pub const ALL: [UvChannel; 4] = [Self::Primary, Self::Secondary, Self::Unique, Self::Extend];

    /// Shader input name carrying this channel.
    pub fn input_name(self) -> &'static str {
        match self {
            Self::Primary => "UV_Primary",
            Self::Secondary => "UV_Secondary",
            Self::Unique => "UV_Unique",
            Self::Extend => "UV_Extend",
        }
    }

    pub fn from_input_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.input_name() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One vertex with full-precision attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Tangent direction, handedness in `w`
    #[serde(default)]
    pub tangent: Vec4,
    /// Indexed by [`UvChannel::index`]
    #[serde(default)]
    pub uvs: [Option<Vec2>; 4],
    /// Joint table indices, parallel to `weights`
    #[serde(default)]
    pub joints: Vec<u8>,
    #[serde(default)]
    pub weights: Vec<f32>,
}

impl ImVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            ..Default::default()
        }
    }

    pub fn uv(&self, channel: UvChannel) -> Option<Vec2> {
        self.uvs[channel.index()]
    }

    pub fn set_uv(&mut self, channel: UvChannel, uv: Vec2) {
        self.uvs[channel.index()] = Some(uv);
    }

    /// Add a joint influence.
    pub fn add_influence(&mut self, joint: u8, weight: f32) {
        self.joints.push(joint);
        self.weights.push(weight);
    }

    /// Influences above the 0.001 weight threshold.
    pub fn used_influences(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0.001).count()
    }
}

/// Mesh part drawn with a single material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImPrimitive {
    /// May carry `@TAG(value)` overrides, see [`super::PrimitiveTags`]
    pub name: String,
    pub material: String,
    #[serde(default = "default_flags")]
    pub flags: u16,
    #[serde(default)]
    pub group_id: Option<u32>,
    #[serde(default = "default_lod_index")]
    pub lod_index: u8,
    #[serde(default = "default_render_flags")]
    pub render_flags: u8,
    /// Defaults to the primitive's position in the model
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub field2c: u32,
    /// Requested layout, upgraded if it cannot hold the weights
    #[serde(default)]
    pub vertex_format: Option<VertexFormat>,
    /// Overrides the target profile's flags for the chosen layout
    #[serde(default)]
    pub vertex_flags: Option<u16>,
    pub vertices: Vec<ImVertex>,
    /// Triangle list into `vertices`; `None` means every three vertices form a triangle
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
}

fn default_flags() -> u16 {
    0xFFFF
}

fn default_lod_index() -> u8 {
    0xFF
}

fn default_render_flags() -> u8 {
    67
}

impl ImPrimitive {
    pub fn new(name: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            material: material.into(),
            flags: default_flags(),
            group_id: None,
            lod_index: default_lod_index(),
            render_flags: default_render_flags(),
            id: None,
            field2c: 0,
            vertex_format: None,
            vertex_flags: None,
            vertices: Vec::new(),
            indices: None,
        }
    }

    pub fn has_uvs(&self) -> bool {
        self.vertices.iter().any(|v| v.uvs.iter().any(Option::is_some))
    }

    pub fn is_skinned(&self) -> bool {
        self.vertices.iter().any(|v| !v.weights.is_empty())
    }

    /// Largest number of used influences on any vertex.
    pub fn max_used_influences(&self) -> usize {
        self.vertices
            .iter()
            .map(ImVertex::used_influences)
            .max()
            .unwrap_or(0)
    }

    /// Number of triangles described by the primitive.
    pub fn triangle_count(&self) -> usize {
        self.indices.as_ref().map_or(self.vertices.len(), Vec::len) / 3
    }

    /// Vertices in triangle-list order, resolving the index list.
    pub fn triangle_vertices(&self) -> Result<Vec<ImVertex>> {
        let Some(indices) = &self.indices else {
            if self.vertices.len() % 3 != 0 {
                return Err(Error::InvalidData(format!(
                    "mesh '{}' has {} vertices, not a triangle list",
                    self.name,
                    self.vertices.len()
                )));
            }
            return Ok(self.vertices.clone());
        };

        if indices.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "mesh '{}' has {} indices, not a triangle list",
                self.name,
                indices.len()
            )));
        }
        indices
            .iter()
            .enumerate()
            .map(|(i, &idx)| {
                self.vertices
                    .get(idx as usize)
                    .cloned()
                    .ok_or(Error::InvalidReference {
                        kind: "vertex",
                        element: i,
                        index: idx as usize,
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImJoint {
    pub name: String,
    /// Logical id, key of the bone map
    pub id: u8,
    /// Index of the parent joint, lower than this joint's index
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub symmetry: Option<usize>,
    #[serde(default)]
    pub field03: u8,
    #[serde(default)]
    pub field04: f32,
    /// Transform relative to the parent
    pub local_mtx: Mat4,
    /// Inverse bind matrix read from a binary model; export derives new ones from the vertex bounds
    #[serde(default)]
    pub inv_bind_mtx: Option<Mat4>,
}

impl ImJoint {
    pub fn new(name: impl Into<String>, id: u8, parent: Option<usize>, local_mtx: Mat4) -> Self {
        Self {
            name: name.into(),
            id,
            parent,
            symmetry: None,
            field03: 0,
            field04: 0.0,
            local_mtx,
            inv_bind_mtx: None,
        }
    }

    /// Translation part of the local matrix.
    pub fn offset(&self) -> Vec3 {
        self.local_mtx.w_axis.truncate()
    }

    /// Distance to the parent.
    pub fn length(&self) -> f32 {
        self.offset().length()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImGroup {
    pub name: String,
    pub id: u32,
    #[serde(default)]
    pub field04: u32,
    #[serde(default)]
    pub field08: u32,
    #[serde(default)]
    pub field0c: u32,
    #[serde(default)]
    pub bounding_sphere: Vec4,
}

/// Primitive-joint link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImEnvelope {
    /// Joint table index
    pub joint: usize,
    #[serde(default)]
    pub field04: u32,
    #[serde(default)]
    pub field08: u32,
    #[serde(default)]
    pub field0c: u32,
    pub bounding_sphere: Vec4,
    pub min: Vec4,
    pub max: Vec4,
    pub local_mtx: Mat4,
    pub field80: Vec4,
}

/// Editable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateModel {
    #[serde(default)]
    pub joints: Vec<ImJoint>,
    #[serde(default)]
    pub groups: Vec<ImGroup>,
    /// Material names in table order; primitives with other names append to it
    #[serde(default)]
    pub materials: Vec<String>,
    pub primitives: Vec<ImPrimitive>,
    #[serde(default)]
    pub envelopes: Vec<ImEnvelope>,
    /// Bounds overrides, computed from the vertices when absent
    #[serde(default)]
    pub center: Option<Vec3>,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub min: Option<Vec4>,
    #[serde(default)]
    pub max: Option<Vec4>,
    #[serde(default = "default_field90")]
    pub field90: u32,
    #[serde(default = "default_field94")]
    pub field94: u32,
    #[serde(default = "default_field98")]
    pub field98: u32,
    #[serde(default)]
    pub field9c: u32,
}

fn default_field90() -> u32 {
    1000
}

fn default_field94() -> u32 {
    3000
}

fn default_field98() -> u32 {
    1
}

impl Default for IntermediateModel {
    fn default() -> Self {
        Self {
            joints: Vec::new(),
            groups: Vec::new(),
            materials: Vec::new(),
            primitives: Vec::new(),
            envelopes: Vec::new(),
            center: None,
            radius: None,
            min: None,
            max: None,
            field90: default_field90(),
            field94: default_field94(),
            field98: default_field98(),
            field9c: 0,
        }
    }
}

impl IntermediateModel {
    pub fn has_joints(&self) -> bool {
        !self.joints.is_empty()
    }

    pub fn joint_by_id(&self, id: u8) -> Option<&ImJoint> {
        self.joints.iter().find(|j| j.id == id)
    }

    pub fn group_by_id(&self, id: u32) -> Option<&ImGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// World matrix of every joint, composed through the parent chain.
    pub fn world_matrices(&self) -> Result<Vec<Mat4>> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.joints.len());
        for (i, joint) in self.joints.iter().enumerate() {
            let mtx = match joint.parent {
                None => joint.local_mtx,
                Some(p) if p < i => world[p] * joint.local_mtx,
                Some(p) => {
                    return Err(Error::InvalidReference {
                        kind: "parent joint",
                        element: i,
                        index: p,
                    });
                }
            };
            world.push(mtx);
        }
        Ok(world)
    }

    /// Index of a material name, appending it if new.
    pub fn material_index(&mut self, name: &str) -> usize {
        if let Some(i) = self.materials.iter().position(|m| m == name) {
            return i;
        }
        self.materials.push(name.to_string());
        self.materials.len() - 1
    }
}

/// Read an intermediate model from a JSON file.
///
/// # Errors
/// Returns an error if the file can't be read or isn't a valid model.
pub fn read_intermediate_json<P: AsRef<Path>>(path: P) -> Result<IntermediateModel> {
    let content = fs::read_to_string(path.as_ref())?;
    let model: IntermediateModel = serde_json::from_str(&content)?;
    tracing::debug!(
        "Loaded intermediate model {}: {} joints, {} primitives",
        path.as_ref().display(),
        model.joints.len(),
        model.primitives.len()
    );
    Ok(model)
}

/// Write an intermediate model as pretty-printed JSON.
///
/// # Errors
/// Returns an error if serialization or writing fails.
pub fn write_intermediate_json<P: AsRef<Path>>(model: &IntermediateModel, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    fs::write(path, json)?;
    Ok(())
}
