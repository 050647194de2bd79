//! Property tests for the invariants shared by all decoders

mod common;

use common::assert_fence_post;
use common::builders::{tck, trx};
use proptest::prelude::*;
use surfio::io::layer::icosphere_order;
use surfio::io::reconcile;
use surfio::{read_tractogram, StreamlineBuilder};

fn icosphere_count(order: u32) -> usize {
    4usize.pow(order) * 10 + 2
}

proptest! {
    #[test]
    fn reconcile_is_idempotent(n in 1usize..1_000_000) {
        prop_assert_eq!(reconcile(n, n), n);
    }

    #[test]
    fn reconcile_accepts_whole_frames(n in 1usize..100_000, frames in 1usize..8) {
        prop_assert_eq!(reconcile(n * frames, n), n);
    }

    #[test]
    fn reconcile_accepts_finer_icospheres(mesh in 1u32..6, extra in 1u32..3) {
        let (m, l) = (icosphere_count(mesh), icosphere_count(mesh + extra));
        prop_assert_eq!(icosphere_order(l), Some(mesh + extra));
        prop_assert_eq!(reconcile(l, m), m);
    }

    #[test]
    fn builder_keeps_fence_post(lengths in prop::collection::vec(0usize..6, 0..20)) {
        let mut b = StreamlineBuilder::new();
        for len in &lengths {
            for k in 0..*len {
                b.push_point(k as f32, 0.0, 0.0);
            }
            b.end_streamline().unwrap();
        }
        let t = b.finish().unwrap();
        prop_assert_eq!(t.streamline_count(), lengths.len());
        assert_fence_post(&t);
    }

    #[test]
    fn decoded_streamlines_keep_fence_post(
        lines in prop::collection::vec(
            prop::collection::vec((-100f32..100.0, -100f32..100.0, -100f32..100.0), 1..5),
            1..6,
        )
    ) {
        let pts: Vec<Vec<[f32; 3]>> = lines
            .iter()
            .map(|l| l.iter().map(|&(x, y, z)| [x, y, z]).collect())
            .collect();
        let refs: Vec<&[[f32; 3]]> = pts.iter().map(|l| l.as_slice()).collect();
        for (name, bytes) in [("p.tck", tck(&refs)), ("p.trx", trx(&refs))] {
            let t = read_tractogram(name, &bytes).unwrap();
            prop_assert_eq!(t.streamline_count(), refs.len());
            assert_fence_post(&t);
        }
    }

    #[test]
    fn ply_fans_stay_in_bounds(corners in 3usize..12) {
        let positions: Vec<f32> = (0..corners)
            .flat_map(|k| {
                let a = k as f32 / corners as f32 * std::f32::consts::TAU;
                [a.cos(), a.sin(), 0.0]
            })
            .collect();
        let face: Vec<u32> = (0..corners as u32).collect();
        let bytes = common::builders::ascii_ply(&positions, &[&face]);
        let mesh = surfio::read_mesh("fan.ply", &bytes).unwrap();
        prop_assert_eq!(mesh.triangle_count(), corners - 2);
        common::assert_index_bounds(&mesh);
    }
}
