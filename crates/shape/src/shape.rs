use std::collections::BTreeMap;

use castle_kernel::geometry::Frame;
use castle_kernel::{
    build_primitive, Axis, BooleanEngine, Bounds, CoordSys, ExactBooleanEngine, ExactMesh,
    Interval, PolygonSoup, Tolerance,
};
use tracing::{debug, instrument, trace};

use crate::error::ShapeError;
use crate::policy::{
    ChildChildOperator, Padding, PaddingType, ParentChildOperator, Size, SizePolicy, Split,
};
use crate::render::{Material, MeshHandle, RenderBackend};
use crate::BuildSettings;

/// Collection name used for the leftover pieces of a [`Shape::repeat`].
pub const PADDING: &str = "Padding";

/// A node of the procedural geometry tree.
///
/// Every node owns a coordinate system and bounds in that system. Children
/// live in named collections; a collection keeps its insertion order and
/// collections are visited in name order.
///
/// Geometry follows a two-phase lifecycle: [`Shape::init`] builds polygon
/// soups on the CPU, [`Shape::render`] uploads them lazily and draws. Any
/// structural change invalidates the node's soup. Uploaded handles are only
/// returned to a backend through [`Shape::release`] or [`Shape::take_handles`];
/// dropping a shape forgets them.
#[derive(Debug)]
pub struct Shape {
    coord_sys: CoordSys,
    bounds: Bounds,
    children: BTreeMap<String, Vec<Shape>>,
    child_child_op: ChildChildOperator,
    parent_child_op: ParentChildOperator,
    soup: Option<PolygonSoup>,
    built: bool,
    handle: Option<MeshHandle>,
    uploaded: bool,
}

impl Shape {
    pub fn new(coord_sys: CoordSys, bounds: Bounds) -> Self {
        Self {
            coord_sys,
            bounds,
            children: BTreeMap::new(),
            child_child_op: ChildChildOperator::default(),
            parent_child_op: ParentChildOperator::default(),
            soup: None,
            built: false,
            handle: None,
            uploaded: false,
        }
    }

    pub fn coord_sys(&self) -> &CoordSys {
        &self.coord_sys
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn child_child_op(&self) -> ChildChildOperator {
        self.child_child_op
    }

    pub fn parent_child_op(&self) -> ParentChildOperator {
        self.parent_child_op
    }

    pub fn set_child_child_op(&mut self, op: ChildChildOperator) {
        self.child_child_op = op;
        self.invalidate();
    }

    pub fn set_parent_child_op(&mut self, op: ParentChildOperator) {
        self.parent_child_op = op;
        self.invalidate();
    }

    /// Children of one collection; empty when the collection does not exist.
    pub fn children(&self, name: &str) -> &[Shape] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable children of one collection. Invalidates this node, since the
    /// caller may restructure what it is built from.
    pub fn children_mut(&mut self, name: &str) -> &mut [Shape] {
        self.invalidate();
        match self.children.get_mut(name) {
            Some(children) => children.as_mut_slice(),
            None => &mut [],
        }
    }

    pub fn collections(&self) -> impl Iterator<Item = (&str, &[Shape])> + '_ {
        self.children
            .iter()
            .map(|(name, children)| (name.as_str(), children.as_slice()))
    }

    pub fn child_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }

    /// Nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.all_children().map(Shape::node_count).sum::<usize>()
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.all_children().map(Shape::leaf_count).sum()
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn soup(&self) -> Option<&PolygonSoup> {
        self.soup.as_ref()
    }

    pub fn handle(&self) -> Option<MeshHandle> {
        self.handle
    }

    /// Whether `init` gives this node a soup of its own.
    pub fn needs_own_geometry(&self) -> bool {
        self.is_leaf()
            || self.parent_child_op != ParentChildOperator::None
            || self.child_child_op == ChildChildOperator::Intersect
    }

    fn all_children(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.children.values().flatten()
    }

    fn push_child(&mut self, name: &str, child: Shape) {
        self.children.entry(name.to_owned()).or_default().push(child);
    }

    fn invalidate(&mut self) {
        self.soup = None;
        self.built = false;
        self.uploaded = false;
    }

    /// Native units per requested unit along `axis`.
    fn native_scale(&self, axis: Axis, policy: SizePolicy) -> Result<f64, ShapeError> {
        let radius = match (&self.coord_sys, axis, policy) {
            (CoordSys::Cylindrical(_), Axis::Y, SizePolicy::AbsoluteInner) => {
                self.bounds[Axis::X].min
            }
            (CoordSys::Cylindrical(_), Axis::Y, SizePolicy::AbsoluteOuter) => {
                self.bounds[Axis::X].max
            }
            _ => return Ok(1.0),
        };
        if radius <= 0.0 {
            return Err(ShapeError::ZeroRadius { policy });
        }
        Ok(1.0 / radius)
    }

    fn sized_child(&self, axis: Axis, min: f64, max: f64) -> Shape {
        Shape::new(
            self.coord_sys,
            self.bounds.with_axis(axis, Interval::new(min, max)),
        )
    }

    /// Partition the extent along `axis` into consecutive parts.
    ///
    /// Absolute parts take their (arc-rescaled) size; relative parts share the
    /// remainder by weight. Hidden parts consume space without a child.
    pub fn subdivide(&mut self, axis: Axis, splits: &[Split]) -> Result<(), ShapeError> {
        if splits.is_empty() {
            return Err(ShapeError::EmptySplit);
        }

        let interval = self.bounds[axis];
        let mut lengths = Vec::with_capacity(splits.len());
        let mut absolute = 0.0;
        let mut relative = 0.0;
        let mut has_relative = false;
        for split in splits {
            if split.size.value < 0.0 {
                return Err(ShapeError::NegativeExtent {
                    axis,
                    required: split.size.value,
                    available: interval.extent(),
                });
            }
            match split.size.policy {
                SizePolicy::Relative => {
                    has_relative = true;
                    relative += split.size.value;
                    lengths.push(None);
                }
                policy => {
                    let length = split.size.value * self.native_scale(axis, policy)?;
                    absolute += length;
                    lengths.push(Some(length));
                }
            }
        }

        let remaining = interval.extent() - absolute;
        if remaining < -Tolerance::default().length {
            return Err(ShapeError::NegativeExtent {
                axis,
                required: absolute,
                available: interval.extent(),
            });
        }
        let rel_scale = if has_relative {
            if relative <= 0.0 {
                return Err(ShapeError::ZeroRelativeWeight { axis });
            }
            remaining.max(0.0) / relative
        } else {
            0.0
        };

        let last = splits.len() - 1;
        let mut cursor = interval.min;
        for (index, (split, length)) in splits.iter().zip(lengths).enumerate() {
            let length = length.unwrap_or(split.size.value * rel_scale);
            // Relative parts absorb rounding so the partition ends on the boundary.
            let end = if index == last && has_relative {
                interval.max
            } else {
                cursor + length
            };
            if split.visible {
                let child = self.sized_child(axis, cursor, end);
                self.push_child(&split.name, child);
            }
            cursor = end;
        }

        self.invalidate();
        debug!(?axis, parts = splits.len(), absolute, relative, "subdivided");
        Ok(())
    }

    /// Tile `axis` with copies of `size` in collection `name` and return the
    /// tile count.
    ///
    /// A relative size is a fraction of the extent. Leftover space goes to
    /// `"Padding"` children placed according to `padding`.
    pub fn repeat(
        &mut self,
        axis: Axis,
        name: &str,
        size: Size,
        padding: Padding,
    ) -> Result<usize, ShapeError> {
        let interval = self.bounds[axis];
        let extent = interval.extent();
        let tile = match size.policy {
            SizePolicy::Relative => size.value * extent,
            policy => size.value * self.native_scale(axis, policy)?,
        };
        if !(tile > 0.0) {
            return Err(ShapeError::NonPositiveTile {
                axis,
                size: size.value,
            });
        }

        let tol = Tolerance::default();
        let count = ((extent + tol.length) / tile).floor().max(0.0) as usize;
        let leftover = (extent - count as f64 * tile).max(0.0);
        let (lead, trail) = match padding.kind {
            PaddingType::Low => (leftover, 0.0),
            PaddingType::High => (0.0, leftover),
            PaddingType::Balance => (0.5 * leftover, 0.5 * leftover),
        };
        let padded = padding.visible && !tol.is_zero_length(leftover);

        if padded && lead > 0.0 {
            let child = self.sized_child(axis, interval.min, interval.min + lead);
            self.push_child(PADDING, child);
        }
        let start = interval.min + lead;
        for i in 0..count {
            let lo = start + i as f64 * tile;
            let child = self.sized_child(axis, lo, (lo + tile).min(interval.max));
            self.push_child(name, child);
        }
        if padded && trail > 0.0 {
            let child = self.sized_child(axis, interval.max - trail, interval.max);
            self.push_child(PADDING, child);
        }

        self.invalidate();
        debug!(?axis, name, count, tile, leftover, "repeated");
        Ok(count)
    }

    /// Grow (or with negative deltas shrink) the bounds per axis.
    pub fn bounds_expand(&mut self, deltas: &[(f64, f64); 3]) {
        self.bounds = self.bounds.expanded(deltas);
        self.invalidate();
    }

    /// Add a Cartesian child spanning the chord slab of this angular sector.
    ///
    /// The child's X axis points radially through the sector's mid angle, Z is
    /// the cylinder axis and the Y half-width is the outer half-chord.
    pub fn wrap_cartesian_over_cylindrical(&mut self, name: &str) -> Result<(), ShapeError> {
        let CoordSys::Cylindrical(frame) = self.coord_sys else {
            return Err(ShapeError::NotCylindrical);
        };

        let phi = self.bounds[Axis::Y].normalized_angle(&Tolerance::default());
        let mid = phi.mid();
        let x_axis = frame.radial(mid);
        let z_axis = frame.bases[2];
        let y_axis = z_axis.cross(&x_axis).normalize();
        let half = (mid - phi.min).sin() * self.bounds[Axis::X].max;

        let child = Shape::new(
            CoordSys::Cartesian(Frame::new(frame.origin, [x_axis, y_axis, z_axis])),
            Bounds::new(
                self.bounds[Axis::X],
                Interval::new(-half, half),
                self.bounds[Axis::Z],
            ),
        );
        self.push_child(name, child);
        self.invalidate();
        Ok(())
    }

    /// Build soups for this subtree, children first.
    ///
    /// An `Intersect` node folds its children's geometry through the exact
    /// boolean engine, the running result being the second operand.
    #[instrument(level = "debug", skip_all, fields(kind = ?self.coord_sys.kind(), children = self.child_count()))]
    pub fn init(&mut self, settings: &BuildSettings) {
        for child in self.children.values_mut().flatten() {
            child.init(settings);
        }

        self.soup = if !self.needs_own_geometry() {
            None
        } else if self.child_child_op == ChildChildOperator::Intersect && !self.is_leaf() {
            Some(self.intersect_children())
        } else {
            Some(build_primitive(
                &self.coord_sys,
                &self.bounds,
                &settings.primitive,
            ))
        };
        self.built = true;
        self.uploaded = false;
    }

    fn intersect_children(&self) -> PolygonSoup {
        let engine = ExactBooleanEngine;
        let mut operands = self
            .all_children()
            .map(|child| ExactMesh::from_soup(&child.combined_soup()));
        let Some(first) = operands.next() else {
            return PolygonSoup::new();
        };
        let result = operands.fold(first, |acc, current| engine.intersect(&current, &acc));
        debug!(triangles = result.len(), "intersected children");
        result.to_soup()
    }

    /// Everything [`Shape::render`] would draw for this subtree, merged.
    pub fn combined_soup(&self) -> PolygonSoup {
        let mut out = self.soup.clone().unwrap_or_default();
        if self.child_child_op != ChildChildOperator::Intersect {
            for child in self.all_children() {
                out.merge(&child.combined_soup());
            }
        }
        out
    }

    /// Draw this subtree. Unbuilt nodes are skipped; built soups are uploaded
    /// on first draw after `init`, reusing the previous handle.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, material: &Material) {
        if self.child_child_op != ChildChildOperator::Intersect {
            for child in self.children.values_mut().flatten() {
                child.render(backend, material);
            }
        }
        if !self.needs_own_geometry() {
            return;
        }
        let Some(soup) = &self.soup else {
            trace!("skipping unbuilt shape");
            return;
        };

        let handle = match self.handle {
            Some(handle) if self.uploaded => handle,
            previous => {
                let handle = backend.upload(soup, previous);
                self.handle = Some(handle);
                self.uploaded = true;
                handle
            }
        };
        backend.set_material(material);
        backend.draw(handle);
    }

    /// Return every uploaded handle of this subtree to `backend`.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        let mut handles = Vec::new();
        self.take_handles(&mut handles);
        for handle in handles {
            backend.release(handle);
        }
    }

    /// Move every uploaded handle of this subtree into `out`.
    pub fn take_handles(&mut self, out: &mut Vec<MeshHandle>) {
        for child in self.children.values_mut().flatten() {
            child.take_handles(out);
        }
        if let Some(handle) = self.handle.take() {
            out.push(handle);
        }
        self.uploaded = false;
    }
}
