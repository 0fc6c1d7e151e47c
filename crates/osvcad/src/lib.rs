#![warn(missing_docs)]

//! osvcad: mechanical assemblies as a DAG of placed parts.
//!
//! Parts are [`GeometryNode`]s built from part scripts, STEP files or
//! library catalogs. Edges of an [`Assembly`] carry the transform that
//! places their target relative to their source. [`resolve_placement`]
//! turns a node's local shape into its global one, and the assembly can be
//! written as a YAML graph description or a JSON snapshot.
//!
//! # Example
//!
//! ```rust,no_run
//! use osvcad::{Assembly, Metadata, PartSources};
//! use osvcad_kernel::CsgKernel;
//! use osvcad_math::Transform;
//!
//! let kernel = CsgKernel::new();
//! let sources = PartSources::new(&kernel);
//!
//! let mut asm = Assembly::new("bracket");
//! let plate = asm.add_node(sources.script("parts/plate.toml").unwrap());
//! let pin = asm.add_node(sources.script("parts/pin.toml").unwrap());
//! asm.add_edge(plate, pin, Transform::translation(10.0, 0.0, 0.0), Metadata::new())
//!     .unwrap();
//!
//! let placed = osvcad::resolve_placement(&asm, pin, &kernel).unwrap();
//! osvcad::write_json(&asm, "bracket.json").unwrap();
//! # let _ = placed;
//! ```

pub mod anchor;
pub mod assembly;
pub mod display;
mod error;
pub mod node;
pub mod resolve;
pub mod serialize;
pub mod source;

pub use anchor::{Anchor, AnchorKey, AnchorMap};
pub use assembly::{Assembly, EdgeId, EdgeView, Metadata, NodeId, Placement};
pub use display::{display_assembly, Rgb, Viewer};
pub use error::{OsvcadError, Result};
pub use node::{GeometryNode, NodeSource};
pub use resolve::{resolve_all, resolve_placement};
pub use serialize::{
    read_json, read_yaml, write_json, write_yaml, AssemblySnapshot, GraphDescription,
};
pub use source::{
    Catalog, CatalogGenerator, NodeFactory, PartOutputs, PartSources, ScriptEvaluator,
    TomlLibrary, TomlScriptEvaluator,
};
