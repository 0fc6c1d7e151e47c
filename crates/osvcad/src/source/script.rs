//! TOML part scripts.
//!
//! A part script declares numeric parameters, an ordered list of solids
//! built with kernel primitives and booleans, and two outputs: `part`, the
//! solid exposed as the node's shape, and `anchors`.
//!
//! ```toml
//! part = "drilled"
//!
//! [params]
//! e = 10.0
//! hole_d = 10.0
//!
//! [[solids]]
//! name = "plate"
//! translate = ["-100", "-50", 0]
//! make = { box = { size = [200, 100, "e"] } }
//!
//! [[solids]]
//! name = "hole"
//! translate = [50, -25, 0]
//! make = { cylinder = { radius = "hole_d / 2", height = "e" } }
//!
//! [[solids]]
//! name = "drilled"
//! make = { difference = { base = "plate", tools = ["hole"] } }
//!
//! [anchors.0]
//! position = [50, -25, "e"]
//! direction = [0, 0, 1]
//! dimension = "hole_d"
//! description = "{hole_d} mm hole"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use osvcad_kernel::GeometryKernel;
use osvcad_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::expr;
use super::{PartOutputs, ScriptEvaluator};
use crate::anchor::{Anchor, AnchorKey, AnchorMap};
use crate::error::{OsvcadError, Result};

/// A number or an arithmetic expression over the script's params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Literal value.
    Number(f64),
    /// Expression such as `"-l / 2"`.
    Expr(String),
}

impl Scalar {
    fn value(&self, params: &BTreeMap<String, f64>) -> std::result::Result<f64, String> {
        match self {
            Scalar::Number(v) if v.is_finite() => Ok(*v),
            Scalar::Number(v) => Err(format!("{v} is not finite")),
            Scalar::Expr(text) => expr::evaluate(text, params),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Scalar::Expr(text.to_string())
    }
}

/// How a solid is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Make {
    /// Box with one corner at the origin.
    Box {
        /// Extent along X, Y, Z.
        size: [Scalar; 3],
    },
    /// Cylinder along +Z, base on the origin.
    Cylinder {
        /// Radius.
        radius: Scalar,
        /// Height.
        height: Scalar,
    },
    /// Sphere on the origin.
    Sphere {
        /// Radius.
        radius: Scalar,
    },
    /// Union of previously defined solids.
    Union {
        /// Solid names, at least one.
        operands: Vec<String>,
    },
    /// A solid minus every tool solid.
    Difference {
        /// Solid subtracted from.
        base: String,
        /// Solids subtracted.
        tools: Vec<String>,
    },
    /// STEP import, path relative to the script.
    Step {
        /// STEP file path.
        path: String,
    },
}

/// One named solid in a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidDef {
    /// Name later solids and the `part` output refer to.
    pub name: String,
    /// Optional translation applied after construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<[Scalar; 3]>,
    /// Construction.
    pub make: Make,
}

/// Anchor declaration in a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorDef {
    /// Position in the part frame.
    pub position: [Scalar; 3],
    /// Direction, expected to be a unit vector.
    pub direction: [Scalar; 3],
    /// Characteristic dimension.
    pub dimension: Scalar,
    /// Description; `{param}` placeholders are substituted.
    pub description: String,
}

/// A parsed part script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartScript {
    /// Length unit, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// `part` output: name of the solid exposed as the shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// Numeric parameters in scope for every expression.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    /// Solids, evaluated in order.
    #[serde(default)]
    pub solids: Vec<SolidDef>,
    /// `anchors` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<BTreeMap<String, AnchorDef>>,
}

impl PartScript {
    /// Parse script text.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Render back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| OsvcadError::EncodeError {
            format: "toml",
            reason: e.to_string(),
        })
    }

    /// Evaluate against `kernel`. `base_dir` anchors relative STEP paths.
    pub fn evaluate<K: GeometryKernel>(
        &self,
        kernel: &K,
        base_dir: &Path,
    ) -> std::result::Result<PartOutputs<K::Shape>, String> {
        let params = &self.params;
        let mut solids: HashMap<&str, K::Shape> = HashMap::new();

        for def in &self.solids {
            if solids.contains_key(def.name.as_str()) {
                return Err(format!("solid '{}' defined twice", def.name));
            }
            let shape = self
                .make_solid(kernel, &def.make, &solids, base_dir)
                .map_err(|reason| format!("solid '{}': {reason}", def.name))?;
            let shape = match &def.translate {
                Some(offset) => {
                    let offset = vec3(offset, params)
                        .map_err(|reason| format!("solid '{}': {reason}", def.name))?;
                    kernel
                        .translate(&shape, &offset)
                        .map_err(|e| format!("solid '{}': {e}", def.name))?
                }
                None => shape,
            };
            solids.insert(def.name.as_str(), shape);
        }

        let part = match &self.part {
            Some(name) => Some(
                solids
                    .get(name.as_str())
                    .cloned()
                    .ok_or_else(|| format!("'part' names undefined solid '{name}'"))?,
            ),
            None => None,
        };

        let anchors = match &self.anchors {
            Some(defs) => Some(self.build_anchors(defs)?),
            None => None,
        };

        Ok(PartOutputs { part, anchors })
    }

    fn make_solid<K: GeometryKernel>(
        &self,
        kernel: &K,
        make: &Make,
        solids: &HashMap<&str, K::Shape>,
        base_dir: &Path,
    ) -> std::result::Result<K::Shape, String> {
        let params = &self.params;
        let lookup = |name: &String| {
            solids
                .get(name.as_str())
                .ok_or_else(|| format!("undefined solid '{name}'"))
        };
        let shape = match make {
            Make::Box { size } => {
                let size = vec3(size, params)?;
                kernel.make_box(size.x, size.y, size.z)
            }
            Make::Cylinder { radius, height } => {
                kernel.make_cylinder(radius.value(params)?, height.value(params)?)
            }
            Make::Sphere { radius } => kernel.make_sphere(radius.value(params)?),
            Make::Union { operands } => {
                let (first, rest) = operands
                    .split_first()
                    .ok_or_else(|| "union needs at least one operand".to_string())?;
                let mut acc = lookup(first)?.clone();
                for name in rest {
                    acc = kernel.union(&acc, lookup(name)?).map_err(|e| e.to_string())?;
                }
                Ok(acc)
            }
            Make::Difference { base, tools } => {
                let mut acc = lookup(base)?.clone();
                for name in tools {
                    acc = kernel
                        .subtract(&acc, lookup(name)?)
                        .map_err(|e| e.to_string())?;
                }
                Ok(acc)
            }
            Make::Step { path } => kernel.import_step(&base_dir.join(path)),
        };
        shape.map_err(|e| e.to_string())
    }

    fn build_anchors(
        &self,
        defs: &BTreeMap<String, AnchorDef>,
    ) -> std::result::Result<AnchorMap, String> {
        let params = &self.params;
        let mut anchors = AnchorMap::new();
        for (label, def) in defs {
            let key = AnchorKey::parse(label);
            let anchor = (|| {
                let position = vec3(&def.position, params)?;
                let direction = vec3(&def.direction, params)?;
                Ok::<_, String>(Anchor::new(
                    Point3::from(position),
                    direction,
                    def.dimension.value(params)?,
                    interpolate(&def.description, params)?,
                ))
            })()
            .map_err(|reason| format!("anchor {label}: {reason}"))?;
            if anchors.insert(key, anchor).is_some() {
                return Err(format!("anchor {label} defined twice"));
            }
        }
        Ok(anchors)
    }
}

fn vec3(v: &[Scalar; 3], params: &BTreeMap<String, f64>) -> std::result::Result<Vec3, String> {
    Ok(Vec3::new(
        v[0].value(params)?,
        v[1].value(params)?,
        v[2].value(params)?,
    ))
}

/// Replace `{name}` with the parameter's value.
fn interpolate(text: &str, params: &BTreeMap<String, f64>) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| format!("unclosed '{{' in '{text}'"))?;
        let name = after[..close].trim();
        let value = params
            .get(name)
            .ok_or_else(|| format!("undefined parameter '{name}'"))?;
        out.push_str(&value.to_string());
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Evaluates TOML part scripts against a kernel.
///
/// Every call parses and evaluates from scratch; nothing carries over
/// between scripts.
pub struct TomlScriptEvaluator<'k, K> {
    kernel: &'k K,
}

impl<'k, K> TomlScriptEvaluator<'k, K> {
    /// Evaluator backed by `kernel`.
    pub fn new(kernel: &'k K) -> Self {
        Self { kernel }
    }
}

impl<K: GeometryKernel> ScriptEvaluator for TomlScriptEvaluator<'_, K> {
    type Shape = K::Shape;

    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    fn evaluate(&self, path: &Path) -> Result<PartOutputs<K::Shape>> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                OsvcadError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                OsvcadError::io(path, source)
            }
        })?;
        let script =
            PartScript::parse(&text).map_err(|reason| OsvcadError::invalid_source(path, reason))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let outputs = script
            .evaluate(self.kernel, base_dir)
            .map_err(|reason| OsvcadError::invalid_source(path, reason))?;
        debug!(
            solids = script.solids.len(),
            has_part = outputs.part.is_some(),
            "evaluated part script"
        );
        Ok(outputs)
    }
}
