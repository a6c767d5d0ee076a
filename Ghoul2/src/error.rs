//! Error types for `Ghoul2`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `Ghoul2` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A game-relative path could not be resolved to an existing file.
    #[error("file not found: {path} (base path: {base})")]
    FileNotFound {
        /// The requested path.
        path: String,
        /// The base directory it was resolved against.
        base: PathBuf,
    },

    // ==================== Container Errors ====================
    /// The file does not start with the expected identifier.
    #[error("invalid {format} magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// The format being read ("GLA" or "GLM").
        format: &'static str,
        /// The identifier this format requires.
        expected: [u8; 4],
        /// The identifier found in the file.
        found: [u8; 4],
    },

    /// The format version is not the one this codec handles.
    #[error("unsupported {format} version: {version} (expected {expected})")]
    UnsupportedVersion {
        /// The format being read.
        format: &'static str,
        /// The version number found in the file.
        version: i32,
        /// The only supported version.
        expected: i32,
    },

    /// A section lies outside the data or cannot be recovered by seeking.
    #[error("corrupt file: {message}")]
    CorruptFile {
        /// Description of what is inconsistent.
        message: String,
    },

    /// A fixed-size string field cannot hold the given value.
    #[error("{field} is too long: {len} bytes (limit {limit})")]
    StringTooLong {
        /// The field name.
        field: &'static str,
        /// The length of the value in bytes.
        len: usize,
        /// The maximum number of bytes (excluding the NUL terminator).
        limit: usize,
    },

    /// The writer did not land on an offset it computed beforehand.
    #[error("layout mismatch in {section}: at {actual}, expected {expected}")]
    LayoutMismatch {
        /// The section being written.
        section: &'static str,
        /// The precomputed offset.
        expected: u64,
        /// The actual writer position.
        actual: u64,
    },

    // ==================== Skeleton Errors ====================
    /// The bone hierarchy has a cycle or a parent that cannot be resolved.
    #[error("hierarchy error: {message}")]
    Hierarchy {
        /// Description of the hierarchy problem.
        message: String,
    },

    /// A bone name was not found in the skeleton it was looked up in.
    #[error("bone {name} not found in skeleton")]
    BoneNotFound {
        /// The missing bone name.
        name: String,
    },

    /// A model and its skeleton disagree on the number of bones.
    #[error("bone number mismatch: skeleton has {skeleton} bones, model uses {model}")]
    BoneCountMismatch {
        /// Bone count of the skeleton.
        skeleton: usize,
        /// Bone count recorded in the model header.
        model: usize,
    },

    // ==================== Animation Errors ====================
    /// A bone pool index does not fit into the 24-bit frame field.
    #[error("bone pool index {index} does not fit into 24 bits")]
    PoolIndexOverflow {
        /// The offending pool index.
        index: usize,
    },

    /// A frame references a pool entry that does not exist.
    #[error("frame {frame} bone {bone} references pool entry {index}, pool has {pool_len}")]
    InvalidPoolIndex {
        /// The frame number.
        frame: usize,
        /// The bone index within the frame.
        bone: usize,
        /// The referenced pool index.
        index: u32,
        /// Number of entries in the pool.
        pool_len: usize,
    },

    /// A pose frame does not have one transform per bone.
    #[error("frame {frame} has {found} bone poses, skeleton has {expected} bones")]
    FrameBoneCountMismatch {
        /// The frame number.
        frame: usize,
        /// Number of bones in the skeleton.
        expected: usize,
        /// Number of transforms supplied.
        found: usize,
    },

    // ==================== Mesh Errors ====================
    /// A surface needs more bone references than a vertex can address.
    #[error("too many bone references: {count} (limit {limit})")]
    TooManyBoneReferences {
        /// The number of distinct bone references requested.
        count: usize,
        /// The maximum the 5-bit index field allows.
        limit: usize,
    },

    /// A vertex has an unsupported number of weights.
    #[error("vertex has {count} weights (must be 1-4)")]
    TooManyWeights {
        /// The number of weights supplied.
        count: usize,
    },

    /// A source polygon is not a triangle.
    #[error("non-triangle face found in {surface}: {corners} corners")]
    NonTriangleFace {
        /// The surface the face belongs to.
        surface: String,
        /// Number of corners of the offending face.
        corners: usize,
    },

    /// An index-addressed collection has unfilled slots after construction.
    #[error("internal error: {collection} has missing indices {missing:?}")]
    Gap {
        /// The collection that has gaps.
        collection: &'static str,
        /// The unfilled indices.
        missing: Vec<usize>,
    },

    /// Two surfaces share the same name.
    #[error("surfaces {first} and {second} share the name {name}")]
    DuplicateSurfaceName {
        /// The shared name.
        name: String,
        /// Index of the first surface.
        first: usize,
        /// Index of the second surface.
        second: usize,
    },

    /// An index is out of range for the collection it refers to.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    // ==================== Text Format Errors ====================
    /// An animation.cfg line could not be parsed.
    #[error("invalid animation.cfg line {line}: {content}")]
    InvalidAnimationCfg {
        /// 1-based line number.
        line: usize,
        /// The line text.
        content: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `Ghoul2` operations.
pub type Result<T> = std::result::Result<T, Error>;
