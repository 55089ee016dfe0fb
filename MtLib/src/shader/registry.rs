//! CSV-backed shader registry

use std::path::Path;

use indexmap::IndexMap;

use super::ShaderLookup;
use crate::error::{Error, Result};
use crate::formats::common::ShaderObjectId;
use crate::formats::vertex::{ShaderInput, VertexComponentType};

/// One registered shader object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    pub index: u32,
    pub name: String,
    pub hash: u32,
    /// Vertex inputs in declaration order; empty for non-vertex shaders
    pub inputs: Vec<ShaderInput>,
}

impl ShaderInfo {
    pub fn id(&self) -> ShaderObjectId {
        ShaderObjectId::new(self.index, self.hash)
    }
}

/// Shader objects keyed by name, with a hash index.
#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    shaders: IndexMap<String, ShaderInfo>,
    by_hash: IndexMap<u32, String>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load both CSV tables from disk.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read or a row is malformed.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(hashes: P, inputs: Q) -> Result<Self> {
        let hashes = std::fs::read_to_string(hashes)?;
        let inputs = std::fs::read_to_string(inputs)?;
        Self::from_csv(&hashes, &inputs)
    }

    /// Build a registry from the `index,name,hash` table and the
    /// `shader,offset,type,name,componentcount` table. Both start with a header line.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for malformed rows and
    /// [`Error::UnknownShaderName`] for inputs of an unregistered shader.
    pub fn from_csv(hashes: &str, inputs: &str) -> Result<Self> {
        let mut registry = Self::new();

        for (line_no, line) in data_lines(hashes) {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() < 3 {
                return Err(bad_row("shader hashes", line_no, line));
            }
            let index = cols[0]
                .parse::<u32>()
                .map_err(|_| bad_row("shader hashes", line_no, line))?;
            let name = cols[1];
            // rows without a name reserve an index only
            let hash = if name.is_empty() {
                0
            } else {
                u32::from_str_radix(cols[2].trim_start_matches("0x"), 16)
                    .map_err(|_| bad_row("shader hashes", line_no, line))?
            };
            registry.insert(index, name, hash);
        }

        for (line_no, line) in data_lines(inputs) {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() < 5 {
                return Err(bad_row("shader inputs", line_no, line));
            }
            let parse = |s: &str| {
                s.parse::<u32>()
                    .map_err(|_| bad_row("shader inputs", line_no, line))
            };
            let input = ShaderInput {
                name: cols[3].to_string(),
                offset: parse(cols[1])?,
                component_type: VertexComponentType::from_id(parse(cols[2])?)?,
                component_count: parse(cols[4])?,
            };
            registry.add_input(cols[0], input)?;
        }

        tracing::debug!("Loaded {} shader objects", registry.len());
        Ok(registry)
    }

    /// Register a shader object, replacing any previous entry of the same name.
    pub fn insert(&mut self, index: u32, name: &str, hash: u32) {
        self.by_hash.insert(hash, name.to_string());
        self.shaders.insert(
            name.to_string(),
            ShaderInfo {
                index,
                name: name.to_string(),
                hash,
                inputs: Vec::new(),
            },
        );
    }

    /// Append a vertex input to a registered shader.
    ///
    /// # Errors
    /// Returns [`Error::UnknownShaderName`] if `shader` is not registered.
    pub fn add_input(&mut self, shader: &str, input: ShaderInput) -> Result<()> {
        let info = self
            .shaders
            .get_mut(shader)
            .ok_or_else(|| Error::UnknownShaderName(shader.to_string()))?;
        info.inputs.push(input);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ShaderInfo> {
        self.shaders.get(name)
    }

    pub fn get_by_hash(&self, hash: u32) -> Option<&ShaderInfo> {
        self.by_hash.get(&hash).and_then(|name| self.shaders.get(name))
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderInfo> {
        self.shaders.values()
    }
}

impl ShaderLookup for ShaderRegistry {
    fn id_for_name(&self, name: &str) -> Option<ShaderObjectId> {
        self.get(name).map(ShaderInfo::id)
    }

    fn name_for_hash(&self, hash: u32) -> Option<&str> {
        self.get_by_hash(hash).map(|info| info.name.as_str())
    }

    fn inputs_for_hash(&self, hash: u32) -> Option<&[ShaderInput]> {
        self.get_by_hash(hash).map(|info| info.inputs.as_slice())
    }
}

/// Non-empty lines after the header, with 1-based line numbers.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| !line.is_empty())
}

fn bad_row(table: &str, line_no: usize, line: &str) -> Error {
    Error::ConfigError(format!("{table} line {line_no}: malformed row '{line}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASHES: &str = "index,name,hash\n\
        0,,\n\
        5,CBMaterial,ABCDE\n\
        9,IASkinTB4wt,0x1A2B3\n";

    const INPUTS: &str = "shader,offset,type,name,componentcount\n\
        IASkinTB4wt,0,5,Position,3\n\
        IASkinTB4wt,6,10,Weight,1\n\
        IASkinTB4wt,8,9,Normal,3\n";

    #[test]
    fn test_from_csv() {
        let registry = ShaderRegistry::from_csv(HASHES, INPUTS).unwrap();
        assert_eq!(registry.len(), 3);

        let id = registry.id_for_name("CBMaterial").unwrap();
        assert_eq!((id.index(), id.hash()), (5, 0xABCDE));
        assert_eq!(registry.name_for_hash(0x1A2B3), Some("IASkinTB4wt"));

        let inputs = registry.inputs_for_hash(0x1A2B3).unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[1].component_type, VertexComponentType::Fu8n);
        assert_eq!(inputs[2].offset, 8);
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = ShaderRegistry::from_csv(HASHES, INPUTS).unwrap();
        assert!(matches!(
            registry.require_name(0x12345),
            Err(Error::UnknownShaderHash(0x12345))
        ));
        assert!(matches!(
            registry.require_id("Missing"),
            Err(Error::UnknownShaderName(_))
        ));
    }

    #[test]
    fn test_input_for_unknown_shader() {
        let inputs = "shader,offset,type,name,componentcount\nMissing,0,1,Position,3\n";
        assert!(matches!(
            ShaderRegistry::from_csv(HASHES, inputs),
            Err(Error::UnknownShaderName(_))
        ));
    }

    #[test]
    fn test_malformed_row() {
        let hashes = "index,name,hash\nnot-a-number,Foo,1\n";
        assert!(matches!(
            ShaderRegistry::from_csv(hashes, ""),
            Err(Error::ConfigError(_))
        ));
    }
}
