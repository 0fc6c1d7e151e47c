//! Full object snapshot in JSON: shapes, anchors, provenance and edges.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::graph::{dense_ids, link_records, LinkRecord};
use crate::anchor::check_anchors;
use crate::assembly::{Assembly, NodeId};
use crate::error::{OsvcadError, Result};
use crate::node::GeometryNode;

/// Marker written into every snapshot and checked on decode.
pub const SNAPSHOT_FORMAT: &str = "osvcad-assembly";

/// Serializable copy of an assembly. Edge endpoints index into `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblySnapshot<S> {
    /// Format marker, [`SNAPSHOT_FORMAT`].
    pub format: String,
    /// Assembly name.
    pub name: String,
    /// Nodes in id order.
    pub nodes: Vec<GeometryNode<S>>,
    /// Edges.
    pub edges: Vec<LinkRecord>,
}

impl<S: Clone> AssemblySnapshot<S> {
    /// Copy `assembly` into a snapshot.
    pub fn capture(assembly: &Assembly<S>) -> Self {
        let ids = dense_ids(assembly);
        Self {
            format: SNAPSHOT_FORMAT.to_string(),
            name: assembly.name().to_string(),
            nodes: assembly.nodes().map(|(_, node)| node.clone()).collect(),
            edges: link_records(assembly, &ids),
        }
    }
}

impl<S> AssemblySnapshot<S> {
    /// Rebuild the assembly, validating the marker, anchors and edges.
    pub fn restore(self) -> Result<Assembly<S>> {
        if self.format != SNAPSHOT_FORMAT {
            return Err(decode(format!(
                "unsupported format marker '{}', expected '{SNAPSHOT_FORMAT}'",
                self.format
            )));
        }
        let mut assembly = Assembly::new(self.name);
        let mut ids: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            check_anchors(node.anchors())
                .map_err(|reason| decode(format!("node '{}': {reason}", node.name())))?;
            ids.push(assembly.add_node(node));
        }
        for edge in self.edges {
            let endpoint = |dense: usize| {
                ids.get(dense)
                    .copied()
                    .ok_or_else(|| decode(format!("edge refers to unknown node {dense}")))
            };
            let (source, target) = (endpoint(edge.source)?, endpoint(edge.target)?);
            assembly
                .add_edge(source, target, edge.transform, edge.metadata)
                .map_err(|e| decode(e.to_string()))?;
        }
        Ok(assembly)
    }
}

fn decode(reason: impl Into<String>) -> OsvcadError {
    OsvcadError::DecodeError {
        format: "json",
        reason: reason.into(),
    }
}

impl<S: Clone + Serialize> Assembly<S> {
    /// Pretty JSON snapshot of the whole assembly.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&AssemblySnapshot::capture(self)).map_err(|e| {
            OsvcadError::EncodeError {
                format: "json",
                reason: e.to_string(),
            }
        })
    }
}

impl<S: DeserializeOwned> Assembly<S> {
    /// Decode a JSON snapshot.
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: AssemblySnapshot<S> =
            serde_json::from_str(text).map_err(|e| decode(e.to_string()))?;
        snapshot.restore()
    }
}
