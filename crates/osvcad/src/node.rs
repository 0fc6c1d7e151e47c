//! Geometry nodes: a shape handle plus its anchors.
//!
//! A node is built once from an external source and never mutated. How it
//! was obtained is recorded in [`NodeSource`], a closed set of variants that
//! each carry only the data that kind of source needs. The assembly and the
//! placement resolver only ever see the uniform `shape()` / `anchors()`
//! contract.

use std::path::{Path, PathBuf};

use osvcad_kernel::{GeometryKernel, KernelError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anchor::{check_anchors, AnchorMap};
use crate::error::{OsvcadError, Result};
use crate::source::{CatalogGenerator, PartOutputs, ScriptEvaluator};

/// Where a node's shape and anchors came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSource {
    /// Evaluated part script.
    Script {
        /// Script path.
        path: PathBuf,
    },
    /// Imported STEP file; anchors were supplied by the caller.
    Step {
        /// STEP file path.
        path: PathBuf,
    },
    /// Part generated from a library catalog.
    Library {
        /// Library file path.
        library: PathBuf,
        /// Part id within the library.
        part_id: String,
    },
    /// Built in code from an existing shape. Cannot be re-sourced.
    Direct,
}

/// A part in an assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryNode<S> {
    name: String,
    shape: S,
    anchors: AnchorMap,
    source: NodeSource,
}

impl<S> GeometryNode<S> {
    /// Wrap an existing shape. Anchors must be finite.
    pub fn new(name: impl Into<String>, shape: S, anchors: AnchorMap) -> Result<Self> {
        let name = name.into();
        if let Err(reason) = check_anchors(&anchors) {
            return Err(OsvcadError::NotConstructed { node: name, reason });
        }
        Ok(Self {
            name,
            shape,
            anchors,
            source: NodeSource::Direct,
        })
    }

    /// Evaluate a part script and wrap its `part` and `anchors` outputs.
    ///
    /// Fails with `InvalidSource` if either output is missing or malformed.
    /// Nothing is registered anywhere on failure.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_script<E>(path: impl AsRef<Path>, evaluator: &E) -> Result<Self>
    where
        E: ScriptEvaluator<Shape = S> + ?Sized,
    {
        let path = path.as_ref();
        require_file(path)?;
        let outputs = evaluator.evaluate(path)?;
        let (shape, anchors) = take_outputs(outputs)
            .map_err(|reason| OsvcadError::invalid_source(path, reason))?;
        check_anchors(&anchors).map_err(|reason| OsvcadError::invalid_source(path, reason))?;
        debug!(anchors = anchors.len(), "script node constructed");
        Ok(Self {
            name: file_stem(path),
            shape,
            anchors,
            source: NodeSource::Script {
                path: path.to_path_buf(),
            },
        })
    }

    /// Import a STEP file through the kernel. Anchors cannot be derived from
    /// the file and are supplied by the caller (usually empty).
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_step<K>(path: impl AsRef<Path>, anchors: AnchorMap, kernel: &K) -> Result<Self>
    where
        K: GeometryKernel<Shape = S> + ?Sized,
    {
        let path = path.as_ref();
        require_file(path)?;
        check_anchors(&anchors).map_err(|reason| OsvcadError::invalid_source(path, reason))?;
        let shape = kernel.import_step(path).map_err(|err| match err {
            KernelError::Import { reason, .. } => OsvcadError::ImportFailed {
                path: path.to_path_buf(),
                reason,
            },
            other => OsvcadError::ImportFailed {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        Ok(Self {
            name: file_stem(path),
            shape,
            anchors,
            source: NodeSource::Step {
                path: path.to_path_buf(),
            },
        })
    }

    /// Generate a library's scripts, then build the node for `part_id`.
    ///
    /// Fails with `UnknownPart` if the id is absent from the generated
    /// catalog and `MalformedPart` if its script lacks a usable shape.
    #[tracing::instrument(skip_all, fields(library = %library.as_ref().display(), part_id = %part_id))]
    pub fn from_library<C, E>(
        library: impl AsRef<Path>,
        part_id: &str,
        catalog: &C,
        evaluator: &E,
    ) -> Result<Self>
    where
        C: CatalogGenerator + ?Sized,
        E: ScriptEvaluator<Shape = S> + ?Sized,
    {
        let library = library.as_ref();
        require_file(library)?;
        let index = catalog.generate(library)?;
        let script = index
            .script_for(part_id)
            .ok_or_else(|| OsvcadError::UnknownPart {
                library: library.to_path_buf(),
                part_id: part_id.to_string(),
            })?;

        let malformed = |reason: String| OsvcadError::MalformedPart {
            part_id: part_id.to_string(),
            reason,
        };
        let outputs = evaluator.evaluate(script).map_err(|err| match err {
            OsvcadError::InvalidSource { reason, .. } => malformed(reason),
            other => other,
        })?;
        let (shape, anchors) = take_outputs(outputs).map_err(malformed)?;
        check_anchors(&anchors).map_err(malformed)?;

        Ok(Self {
            name: part_id.to_string(),
            shape,
            anchors,
            source: NodeSource::Library {
                library: library.to_path_buf(),
                part_id: part_id.to_string(),
            },
        })
    }

    /// Replace the name, keeping shape, anchors and provenance.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local-frame shape handle.
    pub fn shape(&self) -> &S {
        &self.shape
    }

    /// Anchor mapping (possibly empty).
    pub fn anchors(&self) -> &AnchorMap {
        &self.anchors
    }

    /// Provenance.
    pub fn source(&self) -> &NodeSource {
        &self.source
    }
}

fn take_outputs<S>(outputs: PartOutputs<S>) -> std::result::Result<(S, AnchorMap), String> {
    let shape = outputs
        .part
        .ok_or_else(|| "missing 'part' output".to_string())?;
    let anchors = outputs
        .anchors
        .ok_or_else(|| "missing 'anchors' output".to_string())?;
    Ok((shape, anchors))
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(OsvcadError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("part")
        .to_string()
}
