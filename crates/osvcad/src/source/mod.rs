//! Capabilities that turn external part definitions into nodes.
//!
//! Each source kind sits behind a narrow interface: a [`ScriptEvaluator`]
//! yields the named outputs of one part script, a [`CatalogGenerator`]
//! materializes a library's scripts on disk. [`PartSources`] bundles the
//! reference implementations with a kernel and dispatches on
//! [`NodeSource`] when an assembly is rebuilt from its graph description.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use osvcad_kernel::GeometryKernel;

use crate::anchor::AnchorMap;
use crate::error::{OsvcadError, Result};
use crate::node::{GeometryNode, NodeSource};

mod expr;
mod library;
mod script;

pub use library::{LibraryFile, LibraryPart, TomlLibrary};
pub use script::{AnchorDef, Make, PartScript, Scalar, SolidDef, TomlScriptEvaluator};

/// Named outputs of an evaluated part script.
///
/// A missing output is `None`; whether that is an error is up to the caller.
#[derive(Debug, Clone)]
pub struct PartOutputs<S> {
    /// The `part` output: the shape exposed by the script.
    pub part: Option<S>,
    /// The `anchors` output.
    pub anchors: Option<AnchorMap>,
}

impl<S> Default for PartOutputs<S> {
    fn default() -> Self {
        Self {
            part: None,
            anchors: None,
        }
    }
}

/// Evaluates one part script in its own scope.
pub trait ScriptEvaluator {
    /// Shape handle produced by the script.
    type Shape;

    /// Evaluate the script at `path` and collect its outputs.
    fn evaluate(&self, path: &Path) -> Result<PartOutputs<Self::Shape>>;
}

/// Index of scripts generated for a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    scripts_dir: PathBuf,
    parts: BTreeMap<String, PathBuf>,
}

impl Catalog {
    /// Build an index from a scripts directory and a part-id to path map.
    pub fn new(scripts_dir: PathBuf, parts: BTreeMap<String, PathBuf>) -> Self {
        Self { scripts_dir, parts }
    }

    /// Directory holding the generated scripts.
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Script generated for `part_id`, if the library defines it.
    pub fn script_for(&self, part_id: &str) -> Option<&Path> {
        self.parts.get(part_id).map(PathBuf::as_path)
    }

    /// Part ids in the catalog.
    pub fn part_ids(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }
}

/// Materializes a library's part scripts on disk.
pub trait CatalogGenerator {
    /// Generate the scripts for `library` and return their index.
    fn generate(&self, library: &Path) -> Result<Catalog>;
}

/// Rebuilds nodes from their provenance.
pub trait NodeFactory<S> {
    /// Construct a node again from the source it was first built from.
    fn rebuild(&self, name: &str, source: &NodeSource, anchors: &AnchorMap)
        -> Result<GeometryNode<S>>;
}

/// The reference source stack: TOML part scripts, TOML libraries and a kernel.
pub struct PartSources<'k, K> {
    kernel: &'k K,
    evaluator: TomlScriptEvaluator<'k, K>,
    library: TomlLibrary,
}

impl<'k, K: GeometryKernel> PartSources<'k, K> {
    /// Source stack backed by `kernel`.
    pub fn new(kernel: &'k K) -> Self {
        Self {
            kernel,
            evaluator: TomlScriptEvaluator::new(kernel),
            library: TomlLibrary,
        }
    }

    /// Node from a part script.
    pub fn script(&self, path: impl AsRef<Path>) -> Result<GeometryNode<K::Shape>> {
        GeometryNode::from_script(path, &self.evaluator)
    }

    /// Node from a STEP file with caller-supplied anchors.
    pub fn step(
        &self,
        path: impl AsRef<Path>,
        anchors: AnchorMap,
    ) -> Result<GeometryNode<K::Shape>> {
        GeometryNode::from_step(path, anchors, self.kernel)
    }

    /// Node from a library part.
    pub fn library(
        &self,
        library: impl AsRef<Path>,
        part_id: &str,
    ) -> Result<GeometryNode<K::Shape>> {
        GeometryNode::from_library(library, part_id, &self.library, &self.evaluator)
    }
}

impl<K: GeometryKernel> NodeFactory<K::Shape> for PartSources<'_, K> {
    fn rebuild(
        &self,
        name: &str,
        source: &NodeSource,
        anchors: &AnchorMap,
    ) -> Result<GeometryNode<K::Shape>> {
        match source {
            NodeSource::Script { path } => self.script(path),
            NodeSource::Step { path } => self.step(path, anchors.clone()),
            NodeSource::Library { library, part_id } => self.library(library, part_id),
            NodeSource::Direct => Err(OsvcadError::NotConstructed {
                node: name.to_string(),
                reason: "node was built in code and has no external source".to_string(),
            }),
        }
    }
}
