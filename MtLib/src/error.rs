//! Error types for `MtLib`

use thiserror::Error;

/// The error type for `MtLib` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Format Errors ====================
    /// The stream does not start with the expected magic number.
    #[error("invalid {format} magic: expected {expected:#X}, found {found:#X}")]
    InvalidMagic {
        /// Short name of the container (MOD, MRL, TEX).
        format: &'static str,
        /// The magic number the format requires.
        expected: u64,
        /// The magic number read from the stream.
        found: u64,
    },

    /// The container version is not one this library reads.
    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion {
        /// Short name of the container.
        format: &'static str,
        /// The version read from the stream.
        version: u32,
    },

    // ==================== Bounds Errors ====================
    /// A read or seek went past the end of the buffer.
    #[error("out of bounds: {len} bytes at offset {offset:#X} exceeds buffer of {size} bytes")]
    OutOfBounds {
        /// Absolute offset of the access.
        offset: usize,
        /// Number of bytes requested.
        len: usize,
        /// Size of the underlying buffer.
        size: usize,
    },

    // ==================== Unknown Identifier Errors ====================
    /// A shader input declares a component type id this library cannot decode.
    #[error("unknown vertex component type id: {0}")]
    UnknownVertexComponentType(u32),

    /// No shader object is registered for the hash.
    #[error("unknown shader object hash: {0:#07X}")]
    UnknownShaderHash(u32),

    /// No shader object is registered under the name.
    #[error("unknown shader object: {0}")]
    UnknownShaderName(String),

    /// The constant buffer has no known float count.
    #[error("unknown constant buffer: {0}")]
    UnknownConstantBuffer(String),

    /// The material animation sub-entry type is outside the known table.
    #[error("unknown material animation entry type: {0}")]
    UnknownAnimEntryType(u32),

    /// The vertex shader of a primitive has no known vertex format.
    #[error("unknown vertex format: {0}")]
    UnknownVertexFormat(String),

    // ==================== Data Invariant Errors ====================
    /// A vertex of a skinned mesh has no joint influence.
    #[error("vertex {vertex} of mesh '{mesh}' is not rigged to any joint")]
    UnriggedVertex {
        /// Name of the mesh.
        mesh: String,
        /// Index of the vertex inside the mesh.
        vertex: usize,
    },

    /// Weight and joint index lists of a vertex have different lengths.
    #[error("vertex {vertex} of mesh '{mesh}' has {weights} weights but {joints} joint indices")]
    WeightJointMismatch {
        /// Name of the mesh.
        mesh: String,
        /// Index of the vertex inside the mesh.
        vertex: usize,
        /// Number of weights.
        weights: usize,
        /// Number of joint indices.
        joints: usize,
    },

    /// The model has more joints than the bone map can address.
    #[error("too many joints: {count} (limit is 255)")]
    TooManyJoints {
        /// Number of joints in the model.
        count: usize,
    },

    /// A table element references an index that does not exist or is not allowed.
    #[error("invalid {kind} reference {index} at element {element}")]
    InvalidReference {
        /// What kind of reference failed (parent joint, material, ...).
        kind: &'static str,
        /// Index of the offending element.
        element: usize,
        /// The referenced index.
        index: usize,
    },

    /// A primitive exceeds the per-primitive vertex or index limit.
    #[error("mesh '{mesh}' has {count} {what}, limit is {limit}")]
    PrimitiveLimit {
        /// Name of the mesh.
        mesh: String,
        /// Either "vertices" or "indices".
        what: &'static str,
        /// Actual count.
        count: usize,
        /// Maximum allowed count.
        limit: usize,
    },

    /// Generic data invariant failure with a description.
    #[error("invalid data: {0}")]
    InvalidData(String),

    // ==================== Texture Errors ====================
    /// DDS container error.
    #[error("DDS error: {0}")]
    DdsError(String),

    // ==================== Config Errors ====================
    /// Configuration or lookup table input could not be parsed.
    #[error("config error: {0}")]
    ConfigError(String),

    /// The requested target profile is not known.
    #[error("unknown target profile: {0}")]
    UnknownTarget(String),

    // ==================== Serialization Errors ====================
    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for `MtLib` operations.
pub type Result<T> = std::result::Result<T, Error>;
