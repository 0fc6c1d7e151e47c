#![warn(missing_docs)]

//! Geometry-kernel capability for osvcad.
//!
//! The assembly core never does geometry math itself. It talks to a kernel
//! through [`GeometryKernel`], which hands out opaque shape handles built
//! from primitive parameters, boolean subtraction, transforms and STEP
//! import.
//!
//! [`CsgKernel`] is the reference implementation: its handle is a
//! serializable CSG tree, so shapes can be compared structurally and stored
//! in assembly snapshots.
//!
//! # Example
//!
//! ```
//! use osvcad_kernel::{CsgKernel, GeometryKernel};
//! use osvcad_math::Vec3;
//!
//! let kernel = CsgKernel::new();
//! let plate = kernel.make_box(200.0, 100.0, 10.0).unwrap();
//! let hole = kernel.make_cylinder(5.0, 10.0).unwrap();
//! let hole = kernel.translate(&hole, &Vec3::new(50.0, 25.0, 0.0)).unwrap();
//! let drilled = kernel.subtract(&plate, &hole).unwrap();
//! assert!(drilled.bounds().is_some());
//! ```

use std::fmt::Debug;
use std::path::Path;

use osvcad_math::{Transform, Vec3};

mod csg;
mod error;
pub mod step;

pub use csg::{Aabb, CsgKernel, CsgShape};
pub use error::{KernelError, Result};

/// The operations the assembly core consumes from a geometry kernel.
///
/// Every call is blocking and synchronous. Failures are returned to the
/// caller as-is; nothing is retried.
pub trait GeometryKernel {
    /// Opaque shape handle owned by the kernel.
    type Shape: Clone + Debug;

    /// Axis-aligned box with one corner at the origin.
    fn make_box(&self, dx: f64, dy: f64, dz: f64) -> Result<Self::Shape>;

    /// Cylinder along +Z with its base centered on the origin.
    fn make_cylinder(&self, radius: f64, height: f64) -> Result<Self::Shape>;

    /// Sphere centered on the origin.
    fn make_sphere(&self, radius: f64) -> Result<Self::Shape>;

    /// Boolean union `a + b`.
    fn union(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape>;

    /// Boolean subtraction `a - b`.
    fn subtract(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape>;

    /// Apply a rigid or affine transform, returning a new handle.
    fn transform(&self, shape: &Self::Shape, transform: &Transform) -> Result<Self::Shape>;

    /// Translate by a vector.
    fn translate(&self, shape: &Self::Shape, offset: &Vec3) -> Result<Self::Shape> {
        self.transform(shape, &Transform::translation_vec(offset))
    }

    /// Import a STEP (ISO-10303-21) file.
    fn import_step(&self, path: &Path) -> Result<Self::Shape>;
}
