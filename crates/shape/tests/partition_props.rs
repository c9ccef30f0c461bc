use approx::assert_relative_eq;
use castle_kernel::{Axis, Bounds, CoordSys, Interval};
use castle_shape::{Padding, PaddingType, Shape, Size, Split, PADDING};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

fn arb_weights() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.1f64..10.0, 1..8)
}

/// Parts as `(absolute, value)` pairs.
fn arb_mixed_parts() -> impl Strategy<Value = Vec<(bool, f64)>> {
    prop::collection::vec((any::<bool>(), 0.1f64..10.0), 0..8)
}

fn arb_padding() -> impl Strategy<Value = PaddingType> {
    prop_oneof![
        Just(PaddingType::Low),
        Just(PaddingType::High),
        Just(PaddingType::Balance),
    ]
}

fn slab(min: f64, max: f64) -> Shape {
    Shape::new(
        CoordSys::cartesian(Point3::origin(), [Vector3::x(), Vector3::y(), Vector3::z()]),
        Bounds::new(
            Interval::new(min, max),
            Interval::new(0.0, 1.0),
            Interval::new(0.0, 1.0),
        ),
    )
}

fn sorted_spans(shape: &Shape) -> Vec<(f64, f64)> {
    let mut spans: Vec<(f64, f64)> = shape
        .collections()
        .flat_map(|(_, children)| children.iter())
        .map(|c| (c.bounds()[Axis::X].min, c.bounds()[Axis::X].max))
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    spans
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn relative_subdivision_tiles_parent(
        min in -50.0f64..50.0,
        extent in 0.5f64..100.0,
        weights in arb_weights(),
    ) {
        let mut shape = slab(min, min + extent);
        let splits: Vec<Split> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| Split::relative(format!("P{i}"), *w))
            .collect();
        shape.subdivide(Axis::X, &splits).unwrap();

        let spans = sorted_spans(&shape);
        prop_assert_eq!(spans.len(), weights.len());
        prop_assert_eq!(spans[0].0, min);
        prop_assert_eq!(spans[spans.len() - 1].1, min + extent);
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[0].1, pair[1].0);
        }

        let total: f64 = weights.iter().sum();
        for (i, w) in weights.iter().enumerate() {
            let child = &shape.children(&format!("P{i}"))[0];
            assert_relative_eq!(
                child.bounds()[Axis::X].extent(),
                extent * w / total,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn mixed_subdivision_tiles_parent(
        min in -50.0f64..50.0,
        extent in 0.5f64..100.0,
        parts in arb_mixed_parts(),
        weight in 0.1f64..10.0,
        slot in 0usize..8,
        fill in 0.1f64..0.9,
    ) {
        let mut parts = parts;
        parts.insert(slot.min(parts.len()), (false, weight));
        let absolute: f64 = parts.iter().filter(|(abs, _)| *abs).map(|(_, v)| v).sum();
        let scale = if absolute > 0.0 { fill * extent / absolute } else { 1.0 };

        let splits: Vec<Split> = parts
            .iter()
            .enumerate()
            .map(|(i, &(abs, v))| {
                if abs {
                    Split::absolute(format!("P{i}"), v * scale)
                } else {
                    Split::relative(format!("P{i}"), v)
                }
            })
            .collect();
        let mut shape = slab(min, min + extent);
        shape.subdivide(Axis::X, &splits).unwrap();

        let spans: Vec<(f64, f64)> = (0..parts.len())
            .map(|i| {
                let b = shape.children(&format!("P{i}"))[0].bounds()[Axis::X];
                (b.min, b.max)
            })
            .collect();
        prop_assert_eq!(spans[0].0, min);
        assert_relative_eq!(spans[spans.len() - 1].1, min + extent, epsilon = 1e-4);
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[0].1, pair[1].0);
        }

        let covered: f64 = spans.iter().map(|(lo, hi)| hi - lo).sum();
        assert_relative_eq!(covered, extent, epsilon = 1e-4);
        for (&(abs, v), &(lo, hi)) in parts.iter().zip(&spans) {
            if abs {
                assert_relative_eq!(hi - lo, v * scale, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn repeat_covers_extent(
        extent in 1.0f64..100.0,
        tile in 0.5f64..20.0,
        kind in arb_padding(),
    ) {
        let mut shape = slab(0.0, extent);
        let count = shape
            .repeat(Axis::X, "Tile", Size::absolute(tile), Padding::new(kind, true))
            .unwrap();

        prop_assert_eq!(shape.children("Tile").len(), count);
        prop_assert!(count as f64 * tile <= extent + 1e-3);
        prop_assert!(shape.children(PADDING).len() <= 2);

        let covered: f64 = sorted_spans(&shape).iter().map(|(lo, hi)| hi - lo).sum();
        assert_relative_eq!(covered, extent, epsilon = 1e-3);

        let leftover = extent - count as f64 * tile;
        prop_assert!(leftover < tile + 1e-9);
    }

    #[test]
    fn bounds_expand_inverts(
        deltas in prop::array::uniform3((-2.0f64..2.0, -2.0f64..2.0)),
    ) {
        let mut shape = slab(-5.0, 5.0);
        let original = *shape.bounds();
        shape.bounds_expand(&deltas);
        shape.bounds_expand(&deltas.map(|(lo, hi)| (-lo, -hi)));
        for axis in Axis::ALL {
            assert_relative_eq!(shape.bounds()[axis].min, original[axis].min, epsilon = 1e-12);
            assert_relative_eq!(shape.bounds()[axis].max, original[axis].max, epsilon = 1e-12);
        }
    }
}
