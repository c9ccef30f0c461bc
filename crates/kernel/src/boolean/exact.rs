//! Exact rational geometry used by the boolean engine.
//!
//! Every `f64` converts to a rational without loss, so predicates evaluated
//! here never suffer from rounding.

use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::{Point3, Vector3};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

pub type Scalar = BigRational;

pub fn scalar(value: f64) -> Option<Scalar> {
    BigRational::from_float(value)
}

pub fn int(value: i64) -> Scalar {
    BigRational::from_integer(BigInt::from(value))
}

/// Nearest `f64`, computed from a 64-bit integer quotient so that values
/// whose numerator or denominator exceed the `f64` range still convert.
pub fn to_f64(value: &Scalar) -> f64 {
    let (n, d) = (value.numer(), value.denom());
    if n.is_zero() {
        return 0.0;
    }
    let shift = 64 - (n.bits() as i64 - d.bits() as i64);
    let q = if shift >= 0 {
        (n << shift as u64) / d
    } else {
        n / (d << (-shift) as u64)
    };
    let mantissa = q.to_f64().unwrap_or(0.0);
    let half = shift / 2;
    mantissa * pow2(-half) * pow2(-(shift - half))
}

fn pow2(exp: i64) -> f64 {
    2f64.powi(exp.clamp(-1100, 1100) as i32)
}

/// Sign as -1, 0 or 1.
pub fn sign(value: &Scalar) -> i8 {
    if value.is_positive() {
        1
    } else if value.is_negative() {
        -1
    } else {
        0
    }
}

// ─── 3D ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactVec3 {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl ExactVec3 {
    pub fn new(x: Scalar, y: Scalar, z: Scalar) -> Self {
        Self { x, y, z }
    }

    pub fn from_ints(x: i64, y: i64, z: i64) -> Self {
        Self::new(int(x), int(y), int(z))
    }

    /// `None` for non-finite coordinates.
    pub fn from_point(p: &Point3<f64>) -> Option<Self> {
        Some(Self::new(scalar(p.x)?, scalar(p.y)?, scalar(p.z)?))
    }

    pub fn to_point(&self) -> Point3<f64> {
        Point3::new(to_f64(&self.x), to_f64(&self.y), to_f64(&self.z))
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        self.to_point().coords
    }

    pub fn coord(&self, axis: usize) -> &Scalar {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }

    pub fn dot(&self, other: &Self) -> Scalar {
        &self.x * &other.x + &self.y * &other.y + &self.z * &other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            &self.y * &other.z - &self.z * &other.y,
            &self.z * &other.x - &self.x * &other.z,
            &self.x * &other.y - &self.y * &other.x,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero() && self.z.is_zero()
    }
}

impl<'a> Add<&'a ExactVec3> for &'a ExactVec3 {
    type Output = ExactVec3;

    fn add(self, rhs: &'a ExactVec3) -> ExactVec3 {
        ExactVec3::new(&self.x + &rhs.x, &self.y + &rhs.y, &self.z + &rhs.z)
    }
}

impl<'a> Sub<&'a ExactVec3> for &'a ExactVec3 {
    type Output = ExactVec3;

    fn sub(self, rhs: &'a ExactVec3) -> ExactVec3 {
        ExactVec3::new(&self.x - &rhs.x, &self.y - &rhs.y, &self.z - &rhs.z)
    }
}

impl<'a> Mul<&'a Scalar> for &'a ExactVec3 {
    type Output = ExactVec3;

    fn mul(self, rhs: &'a Scalar) -> ExactVec3 {
        ExactVec3::new(&self.x * rhs, &self.y * rhs, &self.z * rhs)
    }
}

impl Neg for &ExactVec3 {
    type Output = ExactVec3;

    fn neg(self) -> ExactVec3 {
        ExactVec3::new(-&self.x, -&self.y, -&self.z)
    }
}

// ─── 2D ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactVec2 {
    pub x: Scalar,
    pub y: Scalar,
}

impl ExactVec2 {
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn from_ints(x: i64, y: i64) -> Self {
        Self::new(int(x), int(y))
    }

    pub fn dot(&self, other: &Self) -> Scalar {
        &self.x * &other.x + &self.y * &other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(&self, other: &Self) -> Scalar {
        &self.x * &other.y - &self.y * &other.x
    }
}

impl<'a> Add<&'a ExactVec2> for &'a ExactVec2 {
    type Output = ExactVec2;

    fn add(self, rhs: &'a ExactVec2) -> ExactVec2 {
        ExactVec2::new(&self.x + &rhs.x, &self.y + &rhs.y)
    }
}

impl<'a> Sub<&'a ExactVec2> for &'a ExactVec2 {
    type Output = ExactVec2;

    fn sub(self, rhs: &'a ExactVec2) -> ExactVec2 {
        ExactVec2::new(&self.x - &rhs.x, &self.y - &rhs.y)
    }
}

impl<'a> Mul<&'a Scalar> for &'a ExactVec2 {
    type Output = ExactVec2;

    fn mul(self, rhs: &'a Scalar) -> ExactVec2 {
        ExactVec2::new(&self.x * rhs, &self.y * rhs)
    }
}

/// Twice the signed area of `abc`; positive when counter-clockwise.
pub fn orient2d(a: &ExactVec2, b: &ExactVec2, c: &ExactVec2) -> Scalar {
    (b - a).cross(&(c - a))
}

/// Positive when `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `abc`.
pub fn incircle(a: &ExactVec2, b: &ExactVec2, c: &ExactVec2, d: &ExactVec2) -> Scalar {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;
    let a2 = ad.dot(&ad);
    let b2 = bd.dot(&bd);
    let c2 = cd.dot(&cd);
    &ad.x * (&bd.y * &c2 - &b2 * &cd.y) - &ad.y * (&bd.x * &c2 - &b2 * &cd.x)
        + &a2 * (&bd.x * &cd.y - &bd.y * &cd.x)
}

// ─── Planes ──────────────────────────────────────────────────────────────────

/// Supporting plane `normal · p + offset = 0` of a triangle, together with the
/// coordinate dropped when projecting onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactPlane {
    pub normal: ExactVec3,
    pub offset: Scalar,
    dropped: usize,
}

impl ExactPlane {
    /// `None` when the three points are collinear.
    pub fn through(a: &ExactVec3, b: &ExactVec3, c: &ExactVec3) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        if normal.is_zero() {
            return None;
        }
        let offset = -normal.dot(a);
        let (nx, ny, nz) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        let dropped = if nx > ny {
            if nx > nz { 0 } else { 2 }
        } else if ny > nz {
            1
        } else {
            2
        };
        Some(Self { normal, offset, dropped })
    }

    /// Signed (unnormalised) distance of `p`.
    pub fn side(&self, p: &ExactVec3) -> Scalar {
        self.normal.dot(p) + &self.offset
    }

    pub fn dropped_axis(&self) -> usize {
        self.dropped
    }

    fn kept_axes(&self) -> (usize, usize) {
        match self.dropped {
            0 => (1, 2),
            1 => (2, 0),
            _ => (0, 1),
        }
    }

    pub fn project(&self, p: &ExactVec3) -> ExactVec2 {
        let (u, v) = self.kept_axes();
        ExactVec2::new(p.coord(u).clone(), p.coord(v).clone())
    }

    /// Lift a projected point back onto the plane.
    pub fn unproject(&self, q: &ExactVec2) -> ExactVec3 {
        let (u, v) = self.kept_axes();
        let n = &self.normal;
        let solved = -(&self.offset + n.coord(u) * &q.x + n.coord(v) * &q.y) / n.coord(self.dropped);
        let mut coords = [Scalar::zero(), Scalar::zero(), Scalar::zero()];
        coords[u] = q.x.clone();
        coords[v] = q.y.clone();
        coords[self.dropped] = solved;
        let [x, y, z] = coords;
        ExactVec3::new(x, y, z)
    }
}
