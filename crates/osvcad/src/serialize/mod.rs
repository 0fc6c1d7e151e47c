//! Interchange formats.
//!
//! Two independent encodings:
//!
//! - [`GraphDescription`]: a YAML node-link document with provenance,
//!   anchors, transforms and metadata. Shapes are not stored; reading it
//!   back rebuilds every node from its source.
//! - [`AssemblySnapshot`]: a JSON copy of everything, shapes included,
//!   that restores the assembly exactly.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::assembly::Assembly;
use crate::error::{OsvcadError, Result};
use crate::source::NodeFactory;

mod graph;
mod snapshot;

pub use graph::{GraphDescription, LinkRecord, NodeRecord};
pub use snapshot::{AssemblySnapshot, SNAPSHOT_FORMAT};

/// Write the graph description of `assembly` as YAML.
pub fn write_yaml<S>(assembly: &Assembly<S>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = assembly.describe().to_yaml()?;
    std::fs::write(path, text).map_err(|e| OsvcadError::io(path, e))?;
    info!(path = %path.display(), nodes = assembly.node_count(), "wrote graph description");
    Ok(())
}

/// Read a YAML graph description and rebuild its nodes through `factory`.
pub fn read_yaml<S, F>(path: impl AsRef<Path>, factory: &F) -> Result<Assembly<S>>
where
    F: NodeFactory<S> + ?Sized,
{
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| OsvcadError::io(path, e))?;
    Assembly::from_graph_description(&GraphDescription::from_yaml(&text)?, factory)
}

/// Write a JSON snapshot of `assembly`.
pub fn write_json<S: Clone + Serialize>(
    assembly: &Assembly<S>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let text = assembly.to_json()?;
    std::fs::write(path, text).map_err(|e| OsvcadError::io(path, e))?;
    info!(path = %path.display(), nodes = assembly.node_count(), "wrote snapshot");
    Ok(())
}

/// Read a JSON snapshot.
pub fn read_json<S: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Assembly<S>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| OsvcadError::io(path, e))?;
    Assembly::from_json(&text)
}
