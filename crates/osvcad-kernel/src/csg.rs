//! Reference kernel: shapes as serializable CSG trees.
//!
//! Each handle records how the solid was built rather than evaluating it.
//! Handles are comparable with `==` and can be stored in assembly snapshots.

use std::path::Path;

use osvcad_math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KernelError, Result};
use crate::step::read_step_summary;
use crate::GeometryKernel;

/// A CSG tree describing a solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CsgShape {
    /// Box with one corner at the origin.
    Cuboid {
        /// Extent along each axis.
        size: Vec3,
    },
    /// Cylinder along +Z with its base centered on the origin.
    Cylinder {
        /// Radius of the cylinder.
        radius: f64,
        /// Height of the cylinder.
        height: f64,
    },
    /// Sphere centered on the origin.
    Sphere {
        /// Radius of the sphere.
        radius: f64,
    },
    /// Boolean union of two solids.
    Union {
        /// Left operand.
        left: Box<CsgShape>,
        /// Right operand.
        right: Box<CsgShape>,
    },
    /// Boolean difference (left minus right).
    Difference {
        /// Base solid.
        left: Box<CsgShape>,
        /// Subtracted solid.
        right: Box<CsgShape>,
    },
    /// A child solid moved by an affine transform.
    Transformed {
        /// Child solid.
        child: Box<CsgShape>,
        /// Transform applied to the child.
        transform: Transform,
    },
    /// Solid imported from a STEP file; geometry is not evaluated.
    StepImport {
        /// Source file path.
        path: String,
        /// Number of solids found in the file.
        solids: usize,
    },
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    fn transformed(&self, t: &Transform) -> Aabb {
        let corners = [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ];
        let first = t.apply_point(&corners[0]);
        corners[1..].iter().fold(
            Aabb {
                min: first,
                max: first,
            },
            |acc, c| {
                let p = t.apply_point(c);
                acc.union(&Aabb { min: p, max: p })
            },
        )
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

impl CsgShape {
    /// Conservative bounding box, or `None` when the tree contains an
    /// unevaluated STEP import.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            CsgShape::Cuboid { size } => Some(Aabb {
                min: Point3::origin(),
                max: Point3::new(size.x, size.y, size.z),
            }),
            CsgShape::Cylinder { radius, height } => Some(Aabb {
                min: Point3::new(-radius, -radius, 0.0),
                max: Point3::new(*radius, *radius, *height),
            }),
            CsgShape::Sphere { radius } => Some(Aabb {
                min: Point3::new(-radius, -radius, -radius),
                max: Point3::new(*radius, *radius, *radius),
            }),
            CsgShape::Union { left, right } => {
                Some(left.bounds()?.union(&right.bounds()?))
            }
            CsgShape::Difference { left, .. } => left.bounds(),
            CsgShape::Transformed { child, transform } => {
                Some(child.bounds()?.transformed(transform))
            }
            CsgShape::StepImport { .. } => None,
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            CsgShape::Union { left, right } | CsgShape::Difference { left, right } => {
                1 + left.node_count() + right.node_count()
            }
            CsgShape::Transformed { child, .. } => 1 + child.node_count(),
            _ => 1,
        }
    }
}

/// Kernel whose shape handle is a [`CsgShape`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CsgKernel;

impl CsgKernel {
    /// New kernel.
    pub fn new() -> Self {
        Self
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(KernelError::InvalidParameter { name, value })
    }
}

impl GeometryKernel for CsgKernel {
    type Shape = CsgShape;

    fn make_box(&self, dx: f64, dy: f64, dz: f64) -> Result<CsgShape> {
        Ok(CsgShape::Cuboid {
            size: Vec3::new(positive("dx", dx)?, positive("dy", dy)?, positive("dz", dz)?),
        })
    }

    fn make_cylinder(&self, radius: f64, height: f64) -> Result<CsgShape> {
        Ok(CsgShape::Cylinder {
            radius: positive("radius", radius)?,
            height: positive("height", height)?,
        })
    }

    fn make_sphere(&self, radius: f64) -> Result<CsgShape> {
        Ok(CsgShape::Sphere {
            radius: positive("radius", radius)?,
        })
    }

    fn union(&self, a: &CsgShape, b: &CsgShape) -> Result<CsgShape> {
        Ok(CsgShape::Union {
            left: Box::new(a.clone()),
            right: Box::new(b.clone()),
        })
    }

    fn subtract(&self, a: &CsgShape, b: &CsgShape) -> Result<CsgShape> {
        Ok(CsgShape::Difference {
            left: Box::new(a.clone()),
            right: Box::new(b.clone()),
        })
    }

    fn transform(&self, shape: &CsgShape, transform: &Transform) -> Result<CsgShape> {
        if !transform.is_finite() {
            return Err(KernelError::NonFiniteTransform);
        }
        if transform.is_identity() {
            return Ok(shape.clone());
        }
        // Nested transforms collapse into one node.
        let shape = match shape {
            CsgShape::Transformed {
                child,
                transform: inner,
            } => CsgShape::Transformed {
                child: child.clone(),
                transform: transform.then(inner),
            },
            other => CsgShape::Transformed {
                child: Box::new(other.clone()),
                transform: transform.clone(),
            },
        };
        Ok(shape)
    }

    fn import_step(&self, path: &Path) -> Result<CsgShape> {
        let summary = read_step_summary(path)?;
        debug!(
            path = %path.display(),
            entities = summary.entities,
            solids = summary.solids,
            "imported STEP file"
        );
        Ok(CsgShape::StepImport {
            path: path.to_string_lossy().into_owned(),
            solids: summary.solids,
        })
    }
}
