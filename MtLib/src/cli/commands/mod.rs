use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use crate::config::{TargetProfile, ToolConfig};
use crate::shader::ShaderRegistry;

pub mod material;
pub mod model;
pub mod texture;

/// Settings shared by every command.
pub struct ToolContext {
    pub config: ToolConfig,
    pub profile: TargetProfile,
}

impl ToolContext {
    /// Load the config file (if any) and resolve the target profile.
    pub fn load(config: Option<&Path>, target: Option<&str>) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => ToolConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ToolConfig::default(),
        };
        let profile = config.resolve_profile(target)?;
        tracing::debug!("Using target profile {}", profile.name);
        Ok(Self { config, profile })
    }

    /// Load the shader tables named by the config.
    pub fn shaders(&self) -> anyhow::Result<ShaderRegistry> {
        let (Some(hashes), Some(inputs)) = (&self.config.shader_hashes, &self.config.shader_inputs)
        else {
            anyhow::bail!(
                "Shader tables are not configured. Set shader_hashes and shader_inputs in the --config file"
            );
        };
        ShaderRegistry::load(hashes, inputs).with_context(|| {
            format!(
                "Failed to load shader tables {} and {}",
                hashes.display(),
                inputs.display()
            )
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// MOD model operations
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },

    /// MRL material library operations
    Material {
        #[command(subcommand)]
        command: MaterialCommands,
    },

    /// TEX texture operations (DDS conversion)
    Texture {
        #[command(subcommand)]
        command: TextureCommands,
    },
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Show header and table summary of a MOD file
    Info {
        /// MOD file
        path: PathBuf,
    },

    /// Parse and re-serialize a MOD file, reporting byte equality
    Roundtrip {
        /// MOD file
        path: PathBuf,

        /// Write the re-serialized file here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a MOD file into intermediate model JSON
    Dump {
        /// MOD file
        path: PathBuf,

        /// Output JSON file (defaults to same name with .json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a MOD file from intermediate model JSON
    Build {
        /// Intermediate model JSON file
        path: PathBuf,

        /// Output MOD file (defaults to same name with .mod extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MaterialCommands {
    /// Show textures and materials of an MRL file
    Info {
        /// MRL file
        path: PathBuf,
    },

    /// Convert an MRL file to JSON
    ToJson {
        /// MRL file
        path: PathBuf,

        /// Output JSON file (defaults to same name with .json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert JSON back to an MRL file
    FromJson {
        /// JSON file
        path: PathBuf,

        /// Output MRL file (defaults to same name with .mrl extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TextureCommands {
    /// Show info about a TEX file
    Info {
        /// TEX file
        path: PathBuf,
    },

    /// Convert TEX to DDS
    ToDds {
        /// TEX file
        path: PathBuf,

        /// Output DDS file (defaults to same name with .dds extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert DDS to TEX
    FromDds {
        /// DDS file
        path: PathBuf,

        /// Output TEX file (defaults to same name with .tex extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Surface format name (BM_OPA, NM, ...) or numeric id; guessed from the file name if omitted
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Convert every TEX file under a directory to DDS in parallel
    BatchToDds {
        /// Input directory
        path: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self, ctx: &ToolContext) -> anyhow::Result<()> {
        match self {
            Commands::Model { command } => command.execute(ctx),
            Commands::Material { command } => command.execute(ctx),
            Commands::Texture { command } => command.execute(ctx),
        }
    }
}

impl ModelCommands {
    pub fn execute(&self, ctx: &ToolContext) -> anyhow::Result<()> {
        match self {
            ModelCommands::Info { path } => model::info(path),
            ModelCommands::Roundtrip { path, output } => model::roundtrip(path, output.as_deref()),
            ModelCommands::Dump { path, output } => model::dump(ctx, path, output.as_deref()),
            ModelCommands::Build { path, output } => model::build(ctx, path, output.as_deref()),
        }
    }
}

impl MaterialCommands {
    pub fn execute(&self, ctx: &ToolContext) -> anyhow::Result<()> {
        match self {
            MaterialCommands::Info { path } => material::info(ctx, path),
            MaterialCommands::ToJson { path, output } => {
                material::to_json(ctx, path, output.as_deref())
            }
            MaterialCommands::FromJson { path, output } => {
                material::from_json(ctx, path, output.as_deref())
            }
        }
    }
}

impl TextureCommands {
    pub fn execute(&self, ctx: &ToolContext) -> anyhow::Result<()> {
        match self {
            TextureCommands::Info { path } => texture::info(path),
            TextureCommands::ToDds { path, output } => texture::to_dds(path, output.as_deref()),
            TextureCommands::FromDds {
                path,
                output,
                format,
            } => texture::from_dds(ctx, path, output.as_deref(), format.as_deref()),
            TextureCommands::BatchToDds { path, output } => texture::batch_to_dds(path, output),
        }
    }
}

/// `output`, or `path` with its extension replaced.
pub(crate) fn output_path(path: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    output.map_or_else(|| path.with_extension(extension), Path::to_path_buf)
}
