#![warn(missing_docs)]

//! Math types for osvcad assemblies.
//!
//! Points and vectors are plain nalgebra types. [`Transform`] is the 4x4
//! affine matrix carried by every assembly edge; it composes, applies to
//! anchor positions and directions, and serializes as a row-major array so
//! graph files stay readable.

use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A 4x4 affine transformation matrix.
///
/// Serialized row-major as `{ "matrix": [[..], [..], [..], [..]] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RowMajor", into = "RowMajor")]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

#[derive(Serialize, Deserialize)]
struct RowMajor {
    matrix: [[f64; 4]; 4],
}

impl From<RowMajor> for Transform {
    fn from(rows: RowMajor) -> Self {
        Self {
            matrix: Matrix4::from_fn(|r, c| rows.matrix[r][c]),
        }
    }
}

impl From<Transform> for RowMajor {
    fn from(t: Transform) -> Self {
        Self {
            matrix: std::array::from_fn(|r| std::array::from_fn(|c| t.matrix[(r, c)])),
        }
    }
}

impl Transform {
    fn from_rotation(rotation: Rotation3<f64>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self::translation_vec(&Vec3::new(dx, dy, dz))
    }

    /// Translation by a vector.
    pub fn translation_vec(v: &Vec3) -> Self {
        Self {
            matrix: Matrix4::new_translation(v),
        }
    }

    /// Rigid placement from a translation and Euler angles in degrees.
    ///
    /// The rotation is applied about X, then Y, then Z, and the result is
    /// translated.
    pub fn from_translation_rotation(translation: &Vec3, rotation_deg: &Vec3) -> Self {
        let rotation = Rotation3::from_euler_angles(
            rotation_deg.x.to_radians(),
            rotation_deg.y.to_radians(),
            rotation_deg.z.to_radians(),
        );
        Self::translation_vec(translation).then(&Self::from_rotation(rotation))
    }

    /// `self * other`: `other` is applied first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Map a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// Map a direction; translation does not apply.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.matrix.transform_vector(v)
    }

    /// Translation column.
    pub fn translation_part(&self) -> Vec3 {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Whether this is exactly the identity matrix.
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix4::identity()
    }

    /// Whether no entry is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Whether every component is finite.
pub fn is_finite_triple(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}
