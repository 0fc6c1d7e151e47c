//! Assembly files.
//!
//! ```toml
//! name = "plate with pin"
//!
//! [[nodes]]
//! id = "plate"
//! script = "parts/plate_with_holes.toml"
//!
//! [[nodes]]
//! id = "pin"
//! library = "parts/pins.toml"
//! part = "pin_5"
//!
//! [[edges]]
//! source = "plate"
//! target = "pin"
//! translation = [50, 25, 10]
//! rotation = [0, 0, 90]
//! metadata = { fit = "press" }
//! ```
//!
//! Relative paths resolve against the assembly file's directory.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use osvcad::{Anchor, AnchorKey, AnchorMap, Assembly, Metadata, NodeId, PartSources};
use osvcad_kernel::GeometryKernel;
use osvcad_math::{Point3, Transform, Vec3};
use serde::Deserialize;
use tracing::debug;

/// A parsed assembly file.
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblyConfig {
    /// Assembly name; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default)]
    pub step: Option<PathBuf>,
    #[serde(default)]
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub part: Option<String>,
    /// Only meaningful for STEP nodes.
    #[serde(default)]
    pub anchors: BTreeMap<String, AnchorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    pub position: [f64; 3],
    pub direction: [f64; 3],
    #[serde(default)]
    pub dimension: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeConfig {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub translation: [f64; 3],
    /// Euler angles in degrees, applied X then Y then Z.
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub metadata: Metadata,
}

/// Which source a node config names.
#[derive(Debug, PartialEq)]
enum NodeKind<'a> {
    Script(&'a Path),
    Step(&'a Path),
    Library { library: &'a Path, part: &'a str },
}

impl NodeConfig {
    fn kind(&self) -> Result<NodeKind<'_>> {
        match (&self.script, &self.step, &self.library, &self.part) {
            (Some(script), None, None, None) => Ok(NodeKind::Script(script)),
            (None, Some(step), None, None) => Ok(NodeKind::Step(step)),
            (None, None, Some(library), Some(part)) => Ok(NodeKind::Library { library, part }),
            (None, None, Some(_), None) => bail!("node '{}': library needs a part", self.id),
            _ => bail!(
                "node '{}': set exactly one of script, step or library + part",
                self.id
            ),
        }
    }

    fn anchor_map(&self) -> AnchorMap {
        self.anchors
            .iter()
            .map(|(key, a)| {
                (
                    AnchorKey::parse(key),
                    Anchor::new(
                        Point3::from(a.position),
                        Vec3::from(a.direction),
                        a.dimension,
                        a.description.clone(),
                    ),
                )
            })
            .collect()
    }
}

impl EdgeConfig {
    pub fn transform(&self) -> Transform {
        Transform::from_translation_rotation(
            &Vec3::from(self.translation),
            &Vec3::from(self.rotation),
        )
    }
}

impl AssemblyConfig {
    /// Parse assembly file text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid assembly file")
    }

    /// Read and parse an assembly file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Build the assembly. Nodes are named after their config ids.
    pub fn build<K: GeometryKernel>(
        &self,
        base_dir: &Path,
        sources: &PartSources<'_, K>,
        default_name: &str,
    ) -> Result<Assembly<K::Shape>> {
        let name = self.name.as_deref().unwrap_or(default_name);
        let mut assembly = Assembly::new(name);
        let mut ids: HashMap<&str, NodeId> = HashMap::new();

        for node in &self.nodes {
            if ids.contains_key(node.id.as_str()) {
                bail!("node id '{}' appears twice", node.id);
            }
            let built = match node.kind()? {
                NodeKind::Script(path) => sources.script(base_dir.join(path)),
                NodeKind::Step(path) => sources.step(base_dir.join(path), node.anchor_map()),
                NodeKind::Library { library, part } => {
                    sources.library(base_dir.join(library), part)
                }
            }
            .with_context(|| format!("building node '{}'", node.id))?;
            let id = assembly.add_node(built.with_name(node.id.clone()));
            debug!(node = %node.id, %id, "node built");
            ids.insert(node.id.as_str(), id);
        }

        for edge in &self.edges {
            let lookup = |key: &str| {
                ids.get(key)
                    .copied()
                    .ok_or_else(|| anyhow!("edge refers to unknown node '{key}'"))
            };
            assembly
                .add_edge(
                    lookup(&edge.source)?,
                    lookup(&edge.target)?,
                    edge.transform(),
                    edge.metadata.clone(),
                )
                .with_context(|| format!("edge {} -> {}", edge.source, edge.target))?;
        }
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osvcad_kernel::CsgKernel;

    const PIN: &str = r#"
part = "pin"

[[solids]]
name = "pin"
make = { cylinder = { radius = 2.5, height = 20 } }

[anchors.0]
position = [0, 0, 0]
direction = [0, 0, -1]
dimension = 5
description = "pin base"
"#;

    #[test]
    fn node_kinds() {
        let config = AssemblyConfig::parse(
            r#"
[[nodes]]
id = "a"
script = "a.toml"

[[nodes]]
id = "b"
library = "lib.toml"
part = "x"

[[nodes]]
id = "c"
library = "lib.toml"

[[nodes]]
id = "d"
script = "a.toml"
step = "a.step"
"#,
        )
        .unwrap();
        assert_eq!(
            config.nodes[0].kind().unwrap(),
            NodeKind::Script(Path::new("a.toml"))
        );
        assert!(matches!(
            config.nodes[1].kind().unwrap(),
            NodeKind::Library { part: "x", .. }
        ));
        assert!(config.nodes[2].kind().is_err());
        assert!(config.nodes[3].kind().is_err());
    }

    #[test]
    fn edge_defaults_and_metadata() {
        let config = AssemblyConfig::parse(
            r#"
[[edges]]
source = "a"
target = "b"
translation = [10, 0, 0]
metadata = { fit = "press", order = 2 }
"#,
        )
        .unwrap();
        let edge = &config.edges[0];
        assert_eq!(edge.transform(), Transform::translation(10.0, 0.0, 0.0));
        assert_eq!(edge.metadata["fit"], "press");
        assert_eq!(edge.metadata["order"], 2);
    }

    #[test]
    fn builds_assembly_from_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pin.toml"), PIN).unwrap();
        let config = AssemblyConfig::parse(
            r#"
name = "pins"

[[nodes]]
id = "left"
script = "pin.toml"

[[nodes]]
id = "right"
script = "pin.toml"

[[edges]]
source = "left"
target = "right"
translation = [10, 0, 0]
"#,
        )
        .unwrap();
        let kernel = CsgKernel::new();
        let asm = config
            .build(dir.path(), &PartSources::new(&kernel), "fallback")
            .unwrap();
        assert_eq!(asm.name(), "pins");
        let names: Vec<&str> = asm.nodes().map(|(_, n)| n.name()).collect();
        assert_eq!(names, ["left", "right"]);
        assert_eq!(asm.edge_count(), 1);
    }

    #[test]
    fn unknown_edge_endpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pin.toml"), PIN).unwrap();
        let config = AssemblyConfig::parse(
            "[[nodes]]\nid = \"a\"\nscript = \"pin.toml\"\n\n[[edges]]\nsource = \"a\"\ntarget = \"zz\"\n",
        )
        .unwrap();
        let kernel = CsgKernel::new();
        let err = config
            .build(dir.path(), &PartSources::new(&kernel), "x")
            .unwrap_err();
        assert!(format!("{err:#}").contains("unknown node 'zz'"));
    }
}
