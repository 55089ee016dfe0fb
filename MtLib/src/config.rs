//! Target profiles and tool configuration
//!
//! A [`TargetProfile`] holds the per-game constants that change the written
//! bytes: texture path buffer length, triangle strips, primitive vertex flags
//! and the TEX type id. [`ToolConfig`] is the JSON file the CLI reads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::texture::types::DEFAULT_TEXTURE_TYPE;
use crate::formats::vertex::VertexFormat;

/// Per-game output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Fixed length of texture path buffers in MRL files
    pub path_length: usize,
    /// Emit triangle strips instead of lists
    #[serde(default)]
    pub use_tri_strips: bool,
    pub vertex_flags_1wt: u16,
    pub vertex_flags_2wt: u16,
    pub vertex_flags_4wt: u16,
    #[serde(default = "default_non_skin_flags")]
    pub vertex_flags_non_skin: u16,
    #[serde(default = "default_texture_type")]
    pub texture_type: u32,
}

fn default_non_skin_flags() -> u16 {
    0x01
}

fn default_texture_type() -> u32 {
    DEFAULT_TEXTURE_TYPE
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self::mvc3_pc()
    }
}

impl TargetProfile {
    pub const PRESET_NAMES: [&'static str; 2] = ["mvc3-pc", "aa-pc"];

    /// Ultimate Marvel vs. Capcom 3 (PC)
    pub fn mvc3_pc() -> Self {
        Self {
            name: "mvc3-pc".to_string(),
            description: "Ultimate Marvel vs. Capcom 3 (PC)".to_string(),
            path_length: 64,
            use_tri_strips: false,
            vertex_flags_1wt: 0x09,
            vertex_flags_2wt: 0x11,
            vertex_flags_4wt: 0x19,
            vertex_flags_non_skin: 0x01,
            texture_type: 0xA09D,
        }
    }

    /// The Great Ace Attorney Chronicles (PC)
    pub fn aa_pc() -> Self {
        Self {
            name: "aa-pc".to_string(),
            description: "The Great Ace Attorney Chronicles (PC)".to_string(),
            path_length: 128,
            use_tri_strips: true,
            vertex_flags_1wt: 0x11,
            vertex_flags_2wt: 0x21,
            vertex_flags_4wt: 0x41,
            vertex_flags_non_skin: 0x01,
            texture_type: 0x90A3,
        }
    }

    /// Look up a built-in profile by name.
    ///
    /// # Errors
    /// Returns [`Error::UnknownTarget`] for names without a preset.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "mvc3-pc" => Ok(Self::mvc3_pc()),
            "aa-pc" => Ok(Self::aa_pc()),
            _ => Err(Error::UnknownTarget(name.to_string())),
        }
    }

    /// Primitive vertex flags for a vertex format.
    pub fn vertex_flags(&self, format: VertexFormat) -> u16 {
        match format {
            VertexFormat::IASkinTB4wt => self.vertex_flags_4wt,
            VertexFormat::IASkinTB2wt => self.vertex_flags_2wt,
            VertexFormat::IASkinTB1wt => self.vertex_flags_1wt,
            VertexFormat::IANonSkinTB | VertexFormat::IANonSkinB => self.vertex_flags_non_skin,
        }
    }
}

/// CLI configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Name of a built-in profile, used when `profile` is absent
    #[serde(default = "default_target")]
    pub target: String,
    /// Full custom profile, overriding `target`
    #[serde(default)]
    pub profile: Option<TargetProfile>,
    /// `index,name,hash` table
    #[serde(default)]
    pub shader_hashes: Option<PathBuf>,
    /// `shader,offset,type,name,componentcount` table
    #[serde(default)]
    pub shader_inputs: Option<PathBuf>,
}

fn default_target() -> String {
    "mvc3-pc".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            profile: None,
            shader_hashes: None,
            shader_inputs: None,
        }
    }
}

impl ToolConfig {
    /// Load a config from a JSON file.
    ///
    /// Relative shader table paths are resolved against the config file's directory.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;

        if let Some(base) = path.parent() {
            for table in [&mut config.shader_hashes, &mut config.shader_inputs]
                .into_iter()
                .flatten()
            {
                if table.is_relative() {
                    *table = base.join(&*table);
                }
            }
        }
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve the active profile, applying a target name override.
    ///
    /// # Errors
    /// Returns [`Error::UnknownTarget`] if the chosen target has no preset.
    pub fn resolve_profile(&self, target_override: Option<&str>) -> Result<TargetProfile> {
        match (target_override, &self.profile) {
            (Some(name), _) => TargetProfile::preset(name),
            (None, Some(profile)) => Ok(profile.clone()),
            (None, None) => TargetProfile::preset(&self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let mvc3 = TargetProfile::preset("mvc3-pc").unwrap();
        assert_eq!(mvc3.path_length, 64);
        assert!(!mvc3.use_tri_strips);
        assert_eq!(mvc3.vertex_flags(VertexFormat::IASkinTB2wt), 0x11);
        assert_eq!(mvc3.texture_type, 0xA09D);

        let aa = TargetProfile::preset("aa-pc").unwrap();
        assert_eq!(aa.path_length, 128);
        assert!(aa.use_tri_strips);
        assert_eq!(aa.vertex_flags(VertexFormat::IASkinTB4wt), 0x41);
        assert_eq!(aa.vertex_flags(VertexFormat::IANonSkinTB), 0x01);

        assert!(matches!(
            TargetProfile::preset("ps3"),
            Err(Error::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: ToolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.resolve_profile(None).unwrap(), TargetProfile::mvc3_pc());
        assert_eq!(config.resolve_profile(Some("aa-pc")).unwrap().name, "aa-pc");
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtlib.json");
        std::fs::write(
            &path,
            r#"{"target": "aa-pc", "shader_hashes": "res/shaderhashes.csv"}"#,
        )
        .unwrap();

        let config = ToolConfig::load(&path).unwrap();
        assert_eq!(config.target, "aa-pc");
        assert_eq!(
            config.shader_hashes.as_deref(),
            Some(dir.path().join("res/shaderhashes.csv").as_path())
        );
        assert!(config.shader_inputs.is_none());
    }

    #[test]
    fn test_custom_profile() {
        let json = r#"{
            "profile": {
                "name": "custom",
                "path_length": 96,
                "vertex_flags_1wt": 1,
                "vertex_flags_2wt": 2,
                "vertex_flags_4wt": 4
            }
        }"#;
        let config: ToolConfig = serde_json::from_str(json).unwrap();
        let profile = config.resolve_profile(None).unwrap();
        assert_eq!(profile.path_length, 96);
        assert_eq!(profile.texture_type, DEFAULT_TEXTURE_TYPE);
        assert_eq!(profile.vertex_flags_non_skin, 0x01);
    }
}
