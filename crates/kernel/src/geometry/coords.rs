use nalgebra::{Matrix3, Point3, Vector3};

/// Discriminant of [`CoordSys`], useful in logs and error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordSysKind {
    Cartesian,
    Cylindrical,
}

/// An origin with three basis vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point3<f64>,
    pub bases: [Vector3<f64>; 3],
}

impl Frame {
    pub fn new(origin: Point3<f64>, bases: [Vector3<f64>; 3]) -> Self {
        Self { origin, bases }
    }

    /// World frame with +Y up.
    pub fn world() -> Self {
        Self::new(
            Point3::origin(),
            [Vector3::x(), Vector3::y(), Vector3::z()],
        )
    }

    pub fn basis_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&self.bases)
    }

    pub fn is_right_handed(&self) -> bool {
        self.basis_matrix().determinant() > 0.0
    }

    /// Unit direction at angle `phi` in the plane spanned by the first two bases.
    pub fn radial(&self, phi: f64) -> Vector3<f64> {
        self.bases[0] * phi.cos() + self.bases[1] * phi.sin()
    }

    /// Cartesian point `origin + M * local`.
    pub fn point_at(&self, local: &Vector3<f64>) -> Point3<f64> {
        self.origin + self.basis_matrix() * local
    }

    /// Cylindrical point from a precomputed radial direction.
    pub fn cylinder_point(&self, radius: f64, radial: &Vector3<f64>, height: f64) -> Point3<f64> {
        self.origin + radial * radius + self.bases[2] * height
    }
}

/// Local coordinate system of a shape.
///
/// Cartesian systems map `(x, y, z)` through the basis matrix; cylindrical
/// systems map `(r, phi, h)` to `origin + r (cos phi b0 + sin phi b1) + h b2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordSys {
    Cartesian(Frame),
    Cylindrical(Frame),
}

impl CoordSys {
    pub fn cartesian(origin: Point3<f64>, bases: [Vector3<f64>; 3]) -> Self {
        Self::Cartesian(Frame::new(origin, bases))
    }

    pub fn cylindrical(origin: Point3<f64>, bases: [Vector3<f64>; 3]) -> Self {
        Self::Cylindrical(Frame::new(origin, bases))
    }

    pub fn kind(&self) -> CoordSysKind {
        match self {
            Self::Cartesian(_) => CoordSysKind::Cartesian,
            Self::Cylindrical(_) => CoordSysKind::Cylindrical,
        }
    }

    pub fn frame(&self) -> &Frame {
        match self {
            Self::Cartesian(frame) | Self::Cylindrical(frame) => frame,
        }
    }

    pub fn origin(&self) -> Point3<f64> {
        self.frame().origin
    }

    pub fn bases(&self) -> &[Vector3<f64>; 3] {
        &self.frame().bases
    }

    /// Map local coordinates of this system to world space.
    pub fn local_to_world(&self, local: [f64; 3]) -> Point3<f64> {
        match self {
            Self::Cartesian(frame) => frame.point_at(&Vector3::from(local)),
            Self::Cylindrical(frame) => {
                frame.cylinder_point(local[0], &frame.radial(local[1]), local[2])
            }
        }
    }
}
