//! Property-based invariants of the despeckler.
//!
//! Speck positions are drawn on a coarse grid so recorded distances sit
//! well away from the decision thresholds; that keeps the properties
//! deterministic under the small wobble of the boundary distance walk.

mod common;

use common::{is_subset, page};
use despeckle_oxide::{despeckle, BinaryImage, Dpi, Level, NeverCancelled};
use proptest::prelude::*;

fn dpi() -> Dpi {
    Dpi::new(300, 300)
}

fn run(img: &BinaryImage, level: Level) -> BinaryImage {
    despeckle(img, dpi(), level, &NeverCancelled, None).expect("not cancelled")
}

/// A page with one trusted block and dust sprinkled on an 8-pixel grid.
fn speckled_page(width: usize, height: usize, specks: &[(usize, usize)]) -> BinaryImage {
    let mut img = page(width, height);
    img.fill_rect(4, 4, 24, 24);
    for &(gx, gy) in specks {
        img.set((gx * 8).min(width - 1), (gy * 8).min(height - 1), true);
    }
    img
}

proptest! {
    #[test]
    fn white_pages_come_back_unchanged(
        width in 1usize..200,
        height in 1usize..200,
        level in 1.0f64..3.0,
    ) {
        let img = page(width, height);
        let out = run(&img, Level::Custom(level));
        prop_assert_eq!(out, img);
    }

    #[test]
    fn black_pages_come_back_unchanged(
        width in 20usize..200,
        height in 20usize..200,
        level in 1.0f64..3.0,
    ) {
        let mut img = page(width, height);
        img.fill_rect(0, 0, width, height);
        let out = run(&img, Level::Custom(level));
        prop_assert_eq!(out, img);
    }

    #[test]
    fn despeckling_is_idempotent(
        specks in prop::collection::vec((0usize..16, 0usize..16), 0..12),
    ) {
        let img = speckled_page(128, 128, &specks);
        for level in [Level::Cautious, Level::Normal, Level::Aggressive] {
            let once = run(&img, level);
            let twice = run(&once, level);
            prop_assert_eq!(&twice, &once, "level {:?}", level);
        }
    }

    #[test]
    fn more_aggressive_levels_keep_subsets(
        specks in prop::collection::vec((0usize..16, 0usize..16), 0..12),
    ) {
        let img = speckled_page(128, 128, &specks);
        let cautious = run(&img, Level::Cautious);
        let normal = run(&img, Level::Normal);
        let aggressive = run(&img, Level::Aggressive);

        prop_assert!(is_subset(&aggressive, &normal));
        prop_assert!(is_subset(&normal, &cautious));
        prop_assert!(is_subset(&cautious, &img));
    }

    #[test]
    fn the_trusted_block_is_never_touched(
        specks in prop::collection::vec((0usize..16, 0usize..16), 0..12),
        level in 1.0f64..3.0,
    ) {
        let img = speckled_page(128, 128, &specks);
        let out = run(&img, Level::Custom(level));
        prop_assert!(common::rect_intact(&out, 4, 4, 24, 24));
    }

    #[test]
    fn output_foreground_never_grows(
        specks in prop::collection::vec((0usize..16, 0usize..16), 0..12),
        level in 1.0f64..3.0,
    ) {
        let img = speckled_page(128, 128, &specks);
        let out = run(&img, Level::Custom(level));
        prop_assert!(is_subset(&out, &img));
    }
}
