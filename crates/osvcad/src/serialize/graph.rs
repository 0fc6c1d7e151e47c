//! Node-link graph description in YAML.
//!
//! Nodes carry their provenance and anchors but not their shapes; decoding
//! rebuilds each shape from its source through a [`NodeFactory`].

use std::collections::{BTreeMap, HashMap};

use osvcad_math::Transform;
use serde::{Deserialize, Serialize};

use crate::anchor::AnchorMap;
use crate::assembly::{Assembly, Metadata, NodeId};
use crate::error::{OsvcadError, Result};
use crate::node::NodeSource;
use crate::source::NodeFactory;

/// One vertex record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Dense id, unique within the document.
    pub id: usize,
    /// Node name.
    pub name: String,
    /// Provenance.
    pub source: NodeSource,
    /// Anchors.
    #[serde(default)]
    pub anchors: AnchorMap,
}

/// One edge record. `source` and `target` refer to node record ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Source node record id.
    pub source: usize,
    /// Target node record id.
    pub target: usize,
    /// Placement of the target relative to the source.
    pub transform: Transform,
    /// Edge attributes.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A whole assembly as a node-link document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    /// Always `true`.
    pub directed: bool,
    /// Always `false`.
    pub multigraph: bool,
    /// Assembly name.
    pub name: String,
    /// Vertex records.
    pub nodes: Vec<NodeRecord>,
    /// Edge records.
    pub links: Vec<LinkRecord>,
}

impl GraphDescription {
    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| OsvcadError::EncodeError {
            format: "yaml",
            reason: e.to_string(),
        })
    }

    /// Parse YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let desc: Self = serde_yaml::from_str(text).map_err(|e| decode(e.to_string()))?;
        if !desc.directed {
            return Err(decode("graph is not directed"));
        }
        Ok(desc)
    }
}

fn decode(reason: impl Into<String>) -> OsvcadError {
    OsvcadError::DecodeError {
        format: "yaml",
        reason: reason.into(),
    }
}

/// Dense ids for the assembly's nodes, in node order.
pub(crate) fn dense_ids<S>(assembly: &Assembly<S>) -> HashMap<NodeId, usize> {
    assembly
        .nodes()
        .enumerate()
        .map(|(dense, (id, _))| (id, dense))
        .collect()
}

/// Link records for every edge, with endpoints mapped through `ids`.
pub(crate) fn link_records<S>(
    assembly: &Assembly<S>,
    ids: &HashMap<NodeId, usize>,
) -> Vec<LinkRecord> {
    assembly
        .edges()
        .filter_map(|edge| {
            Some(LinkRecord {
                source: *ids.get(&edge.source)?,
                target: *ids.get(&edge.target)?,
                transform: edge.placement.transform.clone(),
                metadata: edge.placement.metadata.clone(),
            })
        })
        .collect()
}

impl<S> Assembly<S> {
    /// Describe the assembly as a node-link document.
    pub fn describe(&self) -> GraphDescription {
        let ids = dense_ids(self);
        let nodes = self
            .nodes()
            .map(|(id, node)| NodeRecord {
                id: ids[&id],
                name: node.name().to_string(),
                source: node.source().clone(),
                anchors: node.anchors().clone(),
            })
            .collect();
        GraphDescription {
            directed: true,
            multigraph: false,
            name: self.name().to_string(),
            nodes,
            links: link_records(self, &ids),
        }
    }

    /// Rebuild an assembly, re-sourcing every node through `factory`.
    ///
    /// Node construction errors propagate unchanged; a node built in code
    /// (`NodeSource::Direct`) cannot be rebuilt. Script and library nodes
    /// derive their anchors from the source, so a record whose anchors differ
    /// from what the source now produces is a decode error rather than being
    /// silently replaced.
    #[tracing::instrument(skip_all, fields(name = %desc.name, nodes = desc.nodes.len()))]
    pub fn from_graph_description<F>(desc: &GraphDescription, factory: &F) -> Result<Self>
    where
        F: NodeFactory<S> + ?Sized,
    {
        let mut assembly = Assembly::new(desc.name.clone());
        let mut ids: BTreeMap<usize, NodeId> = BTreeMap::new();
        for record in &desc.nodes {
            if ids.contains_key(&record.id) {
                return Err(decode(format!("duplicate node id {}", record.id)));
            }
            let node = factory
                .rebuild(&record.name, &record.source, &record.anchors)?
                .with_name(record.name.clone());
            if node.anchors() != &record.anchors {
                return Err(decode(format!(
                    "node '{}': recorded anchors differ from its source",
                    record.name
                )));
            }
            ids.insert(record.id, assembly.add_node(node));
        }
        for link in &desc.links {
            let endpoint = |dense: usize| {
                ids.get(&dense)
                    .copied()
                    .ok_or_else(|| decode(format!("link refers to unknown node {dense}")))
            };
            assembly
                .add_edge(
                    endpoint(link.source)?,
                    endpoint(link.target)?,
                    link.transform.clone(),
                    link.metadata.clone(),
                )
                .map_err(|e| decode(e.to_string()))?;
        }
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Anchor, AnchorKey};
    use crate::node::GeometryNode;
    use osvcad_kernel::{CsgKernel, CsgShape, GeometryKernel};
    use osvcad_math::{Point3, Vec3};
    use std::path::PathBuf;

    /// Rebuilds every node as a unit cube with the recorded anchors.
    struct Cubes;

    impl NodeFactory<CsgShape> for Cubes {
        fn rebuild(
            &self,
            name: &str,
            _source: &NodeSource,
            anchors: &AnchorMap,
        ) -> Result<GeometryNode<CsgShape>> {
            let cube = CsgKernel::new().make_box(1.0, 1.0, 1.0)?;
            GeometryNode::new(name, cube, anchors.clone())
        }
    }

    /// Rebuilds every node as a unit cube without anchors, the way a script
    /// that declares none would.
    struct BareCubes;

    impl NodeFactory<CsgShape> for BareCubes {
        fn rebuild(
            &self,
            name: &str,
            _source: &NodeSource,
            _anchors: &AnchorMap,
        ) -> Result<GeometryNode<CsgShape>> {
            let cube = CsgKernel::new().make_box(1.0, 1.0, 1.0)?;
            GeometryNode::new(name, cube, AnchorMap::new())
        }
    }

    fn sample() -> Assembly<CsgShape> {
        let mut anchors = AnchorMap::new();
        anchors.insert(
            AnchorKey::Index(0),
            Anchor::new(Point3::new(1.0, 2.0, 3.0), Vec3::z(), 10.0, "10 mm hole"),
        );
        let cube = CsgKernel::new().make_box(1.0, 1.0, 1.0).unwrap();
        let mut asm = Assembly::new("sample");
        let a = asm.add_node(GeometryNode::new("a", cube.clone(), anchors).unwrap());
        let b = asm.add_node(GeometryNode::new("b", cube, AnchorMap::new()).unwrap());
        let mut metadata = Metadata::new();
        metadata.insert("fit".to_string(), serde_json::json!("press"));
        asm.add_edge(
            a,
            b,
            Transform::from_translation_rotation(&Vec3::new(10.0, 0.0, 0.0), &Vec3::new(0.0, 0.0, 30.0)),
            metadata,
        )
        .unwrap();
        asm
    }

    #[test]
    fn yaml_round_trip() {
        let desc = sample().describe();
        let yaml = desc.to_yaml().unwrap();
        assert!(yaml.contains("directed: true"));
        let decoded = GraphDescription::from_yaml(&yaml).unwrap();
        assert_eq!(decoded, desc);

        let rebuilt = Assembly::from_graph_description(&decoded, &Cubes).unwrap();
        assert_eq!(rebuilt.describe(), desc);
    }

    #[test]
    fn dense_ids_skip_removed_nodes() {
        let mut asm = sample();
        let first = asm.nodes().next().unwrap().0;
        asm.remove_node(first).unwrap();
        let desc = asm.describe();
        assert_eq!(desc.nodes.len(), 1);
        assert_eq!(desc.nodes[0].id, 0);
        assert!(desc.links.is_empty());
    }

    #[test]
    fn rejects_bad_documents() {
        let mut desc = sample().describe();
        desc.links[0].target = 7;
        let err = Assembly::from_graph_description(&desc, &Cubes).unwrap_err();
        assert!(matches!(err, OsvcadError::DecodeError { .. }));

        assert!(GraphDescription::from_yaml("nodes: [").is_err());
        let undirected = sample()
            .describe()
            .to_yaml()
            .unwrap()
            .replace("directed: true", "directed: false");
        assert!(GraphDescription::from_yaml(&undirected).is_err());
    }

    #[test]
    fn non_finite_link_transform_is_a_decode_error() {
        let mut desc = sample().describe();
        desc.links[0].transform.matrix[(0, 0)] = f64::NAN;
        let yaml = desc.to_yaml().unwrap();
        assert!(yaml.contains(".nan"));
        let desc = GraphDescription::from_yaml(&yaml).unwrap();
        assert!(desc.links[0].transform.matrix[(0, 0)].is_nan());
        let err = Assembly::from_graph_description(&desc, &Cubes).unwrap_err();
        assert!(matches!(err, OsvcadError::DecodeError { format: "yaml", .. }));
    }

    #[test]
    fn recorded_anchors_must_match_the_source() {
        let desc = sample().describe();
        let err = Assembly::from_graph_description(&desc, &BareCubes).unwrap_err();
        assert!(
            matches!(err, OsvcadError::DecodeError { format: "yaml", ref reason } if reason.contains("'a'"))
        );

        // "b" records no anchors, which is what the source yields.
        let mut only_b = desc.clone();
        only_b.nodes.remove(0);
        only_b.links.clear();
        assert!(Assembly::from_graph_description(&only_b, &BareCubes).is_ok());
    }

    #[test]
    fn direct_nodes_need_a_source_to_rebuild() {
        let desc = sample().describe();
        let kernel = CsgKernel::new();
        let err = Assembly::from_graph_description(&desc, &crate::PartSources::new(&kernel))
            .unwrap_err();
        assert!(matches!(err, OsvcadError::NotConstructed { ref node, .. } if node == "a"));
    }

    #[test]
    fn provenance_is_recorded() {
        let desc = GraphDescription {
            directed: true,
            multigraph: false,
            name: "p".to_string(),
            nodes: vec![NodeRecord {
                id: 0,
                name: "bracket".to_string(),
                source: NodeSource::Step {
                    path: PathBuf::from("parts/bracket.step"),
                },
                anchors: AnchorMap::new(),
            }],
            links: vec![],
        };
        let yaml = desc.to_yaml().unwrap();
        assert!(yaml.contains("kind: step"));
        assert_eq!(GraphDescription::from_yaml(&yaml).unwrap(), desc);
    }
}
