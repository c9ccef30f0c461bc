use std::f64::consts::TAU;
use std::ops::{Index, IndexMut};

use crate::Tolerance;

/// Axis selector for a shape's local coordinate system.
///
/// For cylindrical systems `X` is the radius, `Y` the angle and `Z` the height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A closed interval `[min, max]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn extent(&self) -> f64 {
        self.max - self.min
    }

    pub fn mid(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Move `min` down by `low` and `max` up by `high`. Negative values shrink.
    pub fn expanded(&self, low: f64, high: f64) -> Self {
        Self::new(self.min - low, self.max + high)
    }

    /// Reduce an angle interval so that `min` lies in `[0, 2π)` and
    /// `max` in `[min, min + 2π]`.
    ///
    /// A span that already covers a whole turn keeps its full width instead of
    /// collapsing to zero when both ends coincide modulo 2π.
    pub fn normalized_angle(&self, tol: &Tolerance) -> Self {
        let lo = self.min.rem_euclid(TAU);
        if tol.is_full_turn(self.extent()) {
            return Self::new(lo, lo + TAU);
        }
        let mut hi = self.max.rem_euclid(TAU);
        if hi < lo {
            hi += TAU;
        }
        Self::new(lo, hi)
    }
}

/// Axis-aligned extent of a shape in its own coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    axes: [Interval; 3],
}

impl Bounds {
    pub const fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { axes: [x, y, z] }
    }

    pub fn from_min_max(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(
            Interval::new(min[0], max[0]),
            Interval::new(min[1], max[1]),
            Interval::new(min[2], max[2]),
        )
    }

    pub fn min(&self) -> [f64; 3] {
        [self.axes[0].min, self.axes[1].min, self.axes[2].min]
    }

    pub fn max(&self) -> [f64; 3] {
        [self.axes[0].max, self.axes[1].max, self.axes[2].max]
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        self[axis].extent()
    }

    pub fn with_axis(&self, axis: Axis, interval: Interval) -> Self {
        let mut out = *self;
        out[axis] = interval;
        out
    }

    /// Apply per-axis `(low, high)` expansions.
    pub fn expanded(&self, deltas: &[(f64, f64); 3]) -> Self {
        let mut out = *self;
        for axis in Axis::ALL {
            let (low, high) = deltas[axis.index()];
            out[axis] = self[axis].expanded(low, high);
        }
        out
    }

    /// Normalise the angular (`Y`) axis, for bounds of a cylindrical shape.
    pub fn with_normalized_angle(&self, tol: &Tolerance) -> Self {
        self.with_axis(Axis::Y, self[Axis::Y].normalized_angle(tol))
    }
}

impl Index<Axis> for Bounds {
    type Output = Interval;

    fn index(&self, axis: Axis) -> &Interval {
        &self.axes[axis.index()]
    }
}

impl IndexMut<Axis> for Bounds {
    fn index_mut(&mut self, axis: Axis) -> &mut Interval {
        &mut self.axes[axis.index()]
    }
}
