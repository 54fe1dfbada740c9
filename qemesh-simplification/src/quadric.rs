//! Symmetric 4x4 quadric of squared point-to-plane distance

use nalgebra::{Matrix3, Matrix4, Vector3};
use qemesh_core::Point3d;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Relative determinant below which the upper-left block counts as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// A 4x4 symmetric matrix stored as its 10 independent coefficients.
///
/// For a plane `(a, b, c, d)` with unit normal the quadric is the outer
/// product of the plane vector with itself, and `v^T Q v` for the homogeneous
/// point `v = (x, y, z, 1)` is the squared distance to that plane. Sums of
/// quadrics give summed squared distances.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quadric {
    xx: f64,
    xy: f64,
    xz: f64,
    xw: f64,
    yy: f64,
    yz: f64,
    yw: f64,
    zz: f64,
    zw: f64,
    ww: f64,
}

impl Quadric {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Quadric of the plane `ax + by + cz + d = 0`.
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            xx: a * a,
            xy: a * b,
            xz: a * c,
            xw: a * d,
            yy: b * b,
            yz: b * c,
            yw: b * d,
            zz: c * c,
            zw: c * d,
            ww: d * d,
        }
    }

    /// Quadric of the plane with unit `normal` passing through `point`.
    pub fn from_normal_and_point(normal: &Vector3<f64>, point: &Point3d) -> Self {
        let d = -normal.dot(&point.coords);
        Self::from_plane(normal.x, normal.y, normal.z, d)
    }

    /// Evaluate `v^T Q v` at the homogeneous point `(p, 1)`.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        self.xx * x * x
            + 2.0 * self.xy * x * y
            + 2.0 * self.xz * x * z
            + 2.0 * self.xw * x
            + self.yy * y * y
            + 2.0 * self.yz * y * z
            + 2.0 * self.yw * y
            + self.zz * z * z
            + 2.0 * self.zw * z
            + self.ww
    }

    /// The full symmetric matrix.
    #[rustfmt::skip]
    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::new(
            self.xx, self.xy, self.xz, self.xw,
            self.xy, self.yy, self.yz, self.yw,
            self.xz, self.yz, self.zz, self.zw,
            self.xw, self.yw, self.zw, self.ww,
        )
    }

    #[rustfmt::skip]
    fn upper_left(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.xx, self.xy, self.xz,
            self.xy, self.yy, self.yz,
            self.xz, self.yz, self.zz,
        )
    }

    /// Point minimizing the quadratic form, if the upper-left 3x3 block is
    /// well-conditioned.
    ///
    /// Setting the gradient to zero gives `A p = -b` where `A` is the 3x3 block
    /// and `b` the first three entries of the last column.
    pub fn minimizer(&self) -> Option<Point3d> {
        let a = self.upper_left();
        let scale = a.amax();
        if scale == 0.0 || a.determinant().abs() <= SINGULAR_TOLERANCE * scale.powi(3) {
            return None;
        }
        let b = Vector3::new(self.xw, self.yw, self.zw);
        let p = a.lu().solve(&-b)?;
        p.iter().all(|c| c.is_finite()).then(|| Point3d::from(p))
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, rhs: Quadric) -> Quadric {
        self += rhs;
        self
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        self.xx += rhs.xx;
        self.xy += rhs.xy;
        self.xz += rhs.xz;
        self.xw += rhs.xw;
        self.yy += rhs.yy;
        self.yz += rhs.yz;
        self.yw += rhs.yw;
        self.zz += rhs.zz;
        self.zw += rhs.zw;
        self.ww += rhs.ww;
    }
}

impl Sum for Quadric {
    fn sum<I: Iterator<Item = Quadric>>(iter: I) -> Quadric {
        iter.fold(Quadric::zero(), Add::add)
    }
}
