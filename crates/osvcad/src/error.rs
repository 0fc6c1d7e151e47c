//! Error types for assembly operations.

use std::path::PathBuf;

use osvcad_kernel::KernelError;
use thiserror::Error;

use crate::assembly::{EdgeId, NodeId};

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, OsvcadError>;

/// Errors that can occur while building, resolving or serializing an assembly.
///
/// Every variant is a hard stop for the affected node or edge. Nothing is
/// retried and no fallback is guessed.
#[derive(Debug, Error)]
pub enum OsvcadError {
    /// A part script is missing a required output or is malformed.
    #[error("Invalid source '{path}': {reason}")]
    InvalidSource {
        /// The script or source file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// An input file does not exist.
    #[error("File not found: '{path}'")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The geometry kernel rejected an interchange file.
    #[error("Import of '{path}' failed: {reason}")]
    ImportFailed {
        /// The rejected file.
        path: PathBuf,
        /// Kernel-supplied reason.
        reason: String,
    },

    /// A part id is absent from a generated library catalog.
    #[error("Part '{part_id}' not found in library '{library}'")]
    UnknownPart {
        /// The library file.
        library: PathBuf,
        /// The requested part id.
        part_id: String,
    },

    /// A catalog part script does not expose a usable shape.
    #[error("Library part '{part_id}' is malformed: {reason}")]
    MalformedPart {
        /// The part id.
        part_id: String,
        /// What is wrong with the generated script.
        reason: String,
    },

    /// A node has more than one inbound placement edge.
    #[error("Ambiguous placement for node {node}: {inbound} inbound edges")]
    AmbiguousPlacement {
        /// The node being resolved.
        node: NodeId,
        /// Number of inbound edges found.
        inbound: usize,
    },

    /// Serialized input could not be decoded.
    #[error("Cannot decode {format}: {reason}")]
    DecodeError {
        /// Format being decoded ("yaml", "json").
        format: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// Serialization to text failed.
    #[error("Cannot encode {format}: {reason}")]
    EncodeError {
        /// Format being encoded.
        format: &'static str,
        /// Encoder message.
        reason: String,
    },

    /// A node could not be (re)constructed from its record.
    #[error("Node '{node}' cannot be constructed: {reason}")]
    NotConstructed {
        /// Name of the node record.
        node: String,
        /// Why construction is impossible.
        reason: String,
    },

    /// The node is not part of the assembly.
    #[error("Node {0} not found in assembly")]
    NodeNotFound(NodeId),

    /// The edge is not part of the assembly.
    #[error("Edge {0} not found in assembly")]
    EdgeNotFound(EdgeId),

    /// Adding the edge would close a cycle.
    #[error("Edge {source_node} -> {target} would create a cycle")]
    CycleDetected {
        /// Edge source.
        source_node: NodeId,
        /// Edge target.
        target: NodeId,
    },

    /// The edge transform contains NaN or infinite entries.
    #[error("Edge {source_node} -> {target} has a non-finite transform")]
    NonFiniteTransform {
        /// Edge source.
        source_node: NodeId,
        /// Edge target.
        target: NodeId,
    },

    /// Geometry kernel failure.
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// I/O error during file operations.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl OsvcadError {
    /// Create an invalid-source error.
    pub fn invalid_source(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
