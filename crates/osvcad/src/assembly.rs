//! The assembly DAG.
//!
//! Nodes are [`GeometryNode`]s, edges are [`Placement`]s: a transform that
//! positions the target relative to the source, plus free-form metadata.
//! The graph is kept acyclic at insertion time.

use std::collections::BTreeMap;
use std::fmt;

use osvcad_math::Transform;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OsvcadError, Result};
use crate::node::GeometryNode;

/// Edge metadata: string keys to arbitrary JSON-compatible values.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Handle to a node in an [`Assembly`]. Stays valid until that node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NodeIndex);

impl NodeId {
    /// Raw graph index.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0.index())
    }
}

/// Handle to an edge in an [`Assembly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(EdgeIndex);

impl EdgeId {
    /// Raw graph index.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0.index())
    }
}

/// Edge payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Target pose relative to the source node, already composed by whoever
    /// built the edge.
    pub transform: Transform,
    /// Auxiliary edge attributes.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Borrowed view of one edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    /// Edge handle.
    pub id: EdgeId,
    /// Node the placement is relative to.
    pub source: NodeId,
    /// Node being placed.
    pub target: NodeId,
    /// Transform and metadata.
    pub placement: &'a Placement,
}

/// A directed acyclic graph of parts and placement edges.
#[derive(Debug, Clone)]
pub struct Assembly<S> {
    name: String,
    graph: StableDiGraph<GeometryNode<S>, Placement>,
}

impl<S> Default for Assembly<S> {
    fn default() -> Self {
        Self::new("assembly")
    }
}

impl<S> Assembly<S> {
    /// Empty assembly.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: StableDiGraph::new(),
        }
    }

    /// Assembly name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a fully constructed node.
    pub fn add_node(&mut self, node: GeometryNode<S>) -> NodeId {
        let name = node.name().to_string();
        let id = NodeId(self.graph.add_node(node));
        debug!(node = %id, name = %name, "added node");
        id
    }

    /// Add a placement edge: `target` is positioned by `transform` relative
    /// to `source`.
    ///
    /// Fails with `NodeNotFound` for a missing endpoint, `NonFiniteTransform`
    /// for NaN or infinite matrix entries and `CycleDetected` if `source` is
    /// reachable from `target` (self-loops included).
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        transform: Transform,
        metadata: Metadata,
    ) -> Result<EdgeId> {
        self.require(source)?;
        self.require(target)?;
        if !transform.is_finite() {
            return Err(OsvcadError::NonFiniteTransform {
                source_node: source,
                target,
            });
        }
        if source == target || has_path_connecting(&self.graph, target.0, source.0, None) {
            return Err(OsvcadError::CycleDetected {
                source_node: source,
                target,
            });
        }
        let id = EdgeId(self.graph.add_edge(
            source.0,
            target.0,
            Placement {
                transform,
                metadata,
            },
        ));
        debug!(edge = %id, %source, %target, "added edge");
        Ok(id)
    }

    /// Remove a node and every edge incident to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<GeometryNode<S>> {
        let incident = self.graph.edges_directed(id.0, Direction::Incoming).count()
            + self.graph.edges_directed(id.0, Direction::Outgoing).count();
        let node = self
            .graph
            .remove_node(id.0)
            .ok_or(OsvcadError::NodeNotFound(id))?;
        debug!(node = %id, edges = incident, "removed node");
        Ok(node)
    }

    /// Remove one edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Placement> {
        let placement = self
            .graph
            .remove_edge(id.0)
            .ok_or(OsvcadError::EdgeNotFound(id))?;
        debug!(edge = %id, "removed edge");
        Ok(placement)
    }

    /// Node payload.
    pub fn node(&self, id: NodeId) -> Result<&GeometryNode<S>> {
        self.graph
            .node_weight(id.0)
            .ok_or(OsvcadError::NodeNotFound(id))
    }

    /// Edge view.
    pub fn edge(&self, id: EdgeId) -> Result<EdgeView<'_>> {
        let (source, target) = self
            .graph
            .edge_endpoints(id.0)
            .ok_or(OsvcadError::EdgeNotFound(id))?;
        let placement = self
            .graph
            .edge_weight(id.0)
            .ok_or(OsvcadError::EdgeNotFound(id))?;
        Ok(EdgeView {
            id,
            source: NodeId(source),
            target: NodeId(target),
            placement,
        })
    }

    /// All nodes, in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GeometryNode<S>)> + '_ {
        let mut ids: Vec<NodeIndex> = self.graph.node_indices().collect();
        ids.sort();
        ids.into_iter().map(move |i| (NodeId(i), &self.graph[i]))
    }

    /// All edges, in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        let mut ids: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        ids.sort();
        ids.into_iter().filter_map(move |i| self.edge(EdgeId(i)).ok())
    }

    /// Edges whose target is `id`.
    pub fn in_edges(&self, id: NodeId) -> Result<Vec<EdgeView<'_>>> {
        self.edges_of(id, Direction::Incoming)
    }

    /// Edges whose source is `id`.
    pub fn out_edges(&self, id: NodeId) -> Result<Vec<EdgeView<'_>>> {
        self.edges_of(id, Direction::Outgoing)
    }

    /// Nodes without inbound edges.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes()
            .map(|(id, _)| id)
            .filter(|id| {
                self.graph
                    .edges_directed(id.0, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether `id` refers to a node of this assembly.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.graph.contains_node(id.0)
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.graph.contains_node(id.0) {
            Ok(())
        } else {
            Err(OsvcadError::NodeNotFound(id))
        }
    }

    fn edges_of(&self, id: NodeId, dir: Direction) -> Result<Vec<EdgeView<'_>>> {
        self.require(id)?;
        let mut edges: Vec<EdgeView<'_>> = self
            .graph
            .edges_directed(id.0, dir)
            .map(|e| EdgeView {
                id: EdgeId(e.id()),
                source: NodeId(e.source()),
                target: NodeId(e.target()),
                placement: e.weight(),
            })
            .collect();
        edges.sort_by_key(|e| e.id);
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorMap;
    use osvcad_kernel::{CsgKernel, CsgShape, GeometryKernel};
    use osvcad_math::Vec3;

    fn cube(name: &str) -> GeometryNode<CsgShape> {
        let shape = CsgKernel::new().make_box(1.0, 1.0, 1.0).unwrap();
        GeometryNode::new(name, shape, AnchorMap::new()).unwrap()
    }

    fn chain() -> (Assembly<CsgShape>, [NodeId; 3]) {
        let mut asm = Assembly::new("chain");
        let a = asm.add_node(cube("a"));
        let b = asm.add_node(cube("b"));
        let c = asm.add_node(cube("c"));
        asm.add_edge(a, b, Transform::translation(10.0, 0.0, 0.0), Metadata::new())
            .unwrap();
        asm.add_edge(b, c, Transform::translation(0.0, 5.0, 0.0), Metadata::new())
            .unwrap();
        (asm, [a, b, c])
    }

    #[test]
    fn add_and_query() {
        let (asm, [a, b, c]) = chain();
        assert_eq!(asm.name(), "chain");
        assert_eq!(asm.node_count(), 3);
        assert_eq!(asm.edge_count(), 2);
        assert_eq!(asm.roots(), vec![a]);

        let inbound = asm.in_edges(b).unwrap();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].source, a);
        assert_eq!(
            inbound[0].placement.transform,
            Transform::translation(10.0, 0.0, 0.0)
        );
        let outbound = asm.out_edges(b).unwrap();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].target, c);
        assert_eq!(asm.node(c).unwrap().name(), "c");
    }

    #[test]
    fn rejects_cycles_and_self_loops() {
        let (mut asm, [a, _, c]) = chain();
        let err = asm
            .add_edge(c, a, Transform::identity(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, OsvcadError::CycleDetected { .. }));
        let err = asm
            .add_edge(a, a, Transform::identity(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, OsvcadError::CycleDetected { .. }));
        assert_eq!(asm.edge_count(), 2);

        // a -> c is a shortcut, not a cycle.
        asm.add_edge(a, c, Transform::identity(), Metadata::new())
            .unwrap();
    }

    #[test]
    fn rejects_non_finite_transforms() {
        let (mut asm, [a, _, c]) = chain();
        let mut t = Transform::translation(1.0, 0.0, 0.0);
        t.matrix[(0, 0)] = f64::NAN;
        let err = asm.add_edge(a, c, t, Metadata::new()).unwrap_err();
        assert!(matches!(err, OsvcadError::NonFiniteTransform { .. }));

        let mut t = Transform::identity();
        t.matrix[(2, 3)] = f64::INFINITY;
        assert!(asm.add_edge(a, c, t, Metadata::new()).is_err());
        assert_eq!(asm.edge_count(), 2);
    }

    #[test]
    fn rejects_unknown_endpoints() {
        let (mut asm, [a, b, _]) = chain();
        asm.remove_node(b).unwrap();
        let err = asm
            .add_edge(a, b, Transform::identity(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, OsvcadError::NodeNotFound(id) if id == b));
        assert!(asm.in_edges(b).is_err());
    }

    #[test]
    fn remove_node_removes_exactly_incident_edges() {
        let mut asm = Assembly::new("star");
        let hub = asm.add_node(cube("hub"));
        let left = asm.add_node(cube("left"));
        let right = asm.add_node(cube("right"));
        let far = asm.add_node(cube("far"));
        asm.add_edge(hub, left, Transform::identity(), Metadata::new())
            .unwrap();
        asm.add_edge(hub, right, Transform::identity(), Metadata::new())
            .unwrap();
        let kept = asm
            .add_edge(
                left,
                far,
                Transform::translation_vec(&Vec3::new(1.0, 2.0, 3.0)),
                Metadata::new(),
            )
            .unwrap();

        let removed = asm.remove_node(hub).unwrap();
        assert_eq!(removed.name(), "hub");
        assert_eq!(asm.node_count(), 3);
        assert_eq!(asm.edge_count(), 1);
        let edge = asm.edge(kept).unwrap();
        assert_eq!((edge.source, edge.target), (left, far));
        assert!(asm.in_edges(left).unwrap().is_empty());
        assert!(asm.in_edges(right).unwrap().is_empty());
        // Surviving handles stay valid.
        assert_eq!(asm.node(far).unwrap().name(), "far");
    }

    #[test]
    fn remove_edge_and_metadata() {
        let mut asm = Assembly::new("pair");
        let a = asm.add_node(cube("a"));
        let b = asm.add_node(cube("b"));
        let mut metadata = Metadata::new();
        metadata.insert("joint".to_string(), serde_json::json!("fixed"));
        metadata.insert("torque".to_string(), serde_json::json!(2.5));
        let e = asm
            .add_edge(a, b, Transform::identity(), metadata.clone())
            .unwrap();
        assert_eq!(asm.edge(e).unwrap().placement.metadata, metadata);

        let placement = asm.remove_edge(e).unwrap();
        assert_eq!(placement.metadata["joint"], "fixed");
        assert!(matches!(
            asm.remove_edge(e).unwrap_err(),
            OsvcadError::EdgeNotFound(_)
        ));
        assert_eq!(asm.roots(), vec![a, b]);
    }

    #[test]
    fn display_ids() {
        let (asm, [a, ..]) = chain();
        assert_eq!(a.to_string(), "n0");
        let e = asm.edges().next().unwrap().id;
        assert_eq!(e.to_string(), "e0");
    }
}
