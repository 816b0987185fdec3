//! Weighted Voronoi partitioning of the padded label map.
//!
//! [`voronoi`] assigns every pixel the label of its nearest foreground
//! pixel under the vertically weighted metric and records the offset to
//! that pixel in a distance matrix. It is a sequential two-phase
//! (top-down, then bottom-up) distance transform: each phase sweeps every
//! row in both horizontal directions, propagating candidate offsets from
//! the already-visited neighbor and keeping the smaller squared distance.
//! Two scanning rows of squared distances make the neighbor lookups O(1).
//!
//! The transform is not exact on pathological source layouts, but the
//! error is far below what matters for grouping marks on a page, and the
//! approximation is deterministic.
//!
//! [`voronoi_special`] is the re-run used by the second-chance stage: a
//! pixel whose offset equals [`Distance::SPECIAL`] neither updates nor
//! serves as a propagation source, so frozen regions keep their exact
//! shape while open territory is redistributed among the remaining ones.
//!
//! [`voronoi_distances`] walks the finished partition and records, for
//! every pair of labels meeting along a cell boundary, the minimum
//! squared distance between their actual source pixels. That distance is
//! deliberately isotropic: the weighted metric decides the shape of the
//! cells, but how far apart two marks really are is a plain Euclidean
//! question.

use crate::components::{update_distance, Connections};
use crate::connectivity::ConnectivityMap;
use crate::distance::{Distance, VERTICAL_SCALE_SQ};

/// Adds a signed increment to a squared-distance accumulator with
/// two's-complement wraparound.
#[inline]
fn offset_sqdist(base: u32, delta: i32) -> u32 {
    base.wrapping_add(delta as u32)
}

/// Squared-distance increment for a one-pixel horizontal step away from
/// a source at horizontal offset `dx`: (dx±1)² − dx² = 1 ∓ 2·dx.
#[inline]
fn step_from_left(dx: i16) -> i32 {
    1 - (i32::from(dx) << 1)
}

#[inline]
fn step_from_right(dx: i16) -> i32 {
    1 + (i32::from(dx) << 1)
}

/// Same for a vertical step, under the weighted metric.
#[inline]
fn step_from_above(dy: i16) -> i32 {
    VERTICAL_SCALE_SQ - 2 * VERTICAL_SCALE_SQ * i32::from(dy)
}

#[inline]
fn step_from_below(dy: i16) -> i32 {
    VERTICAL_SCALE_SQ + 2 * VERTICAL_SCALE_SQ * i32::from(dy)
}

/// Seeds the first padding row with a monotone border chain and fills
/// `sqdists` with its squared distances.
fn seed_top_row(dist: &mut [Distance], sqdists: &mut [u32], width: usize) {
    dist[0].reset(0);
    sqdists[0] = dist[0].sqdist();
    for x in 1..width {
        let prev_x = dist[x - 1].x;
        dist[x].x = prev_x - 1;
        dist[x].y = 0;
        sqdists[x] = offset_sqdist(sqdists[x - 1], step_from_left(prev_x));
    }
}

/// Seeds the border columns of the row starting at `row` and mirrors
/// their squared distances into the scanning buffer.
fn seed_row_borders(dist: &mut [Distance], this_sqdist: &mut [u32], row: usize, width: usize) {
    dist[row].reset(0);
    dist[row + width - 1].reset(width as i32 - 1);
    this_sqdist[0] = dist[row].sqdist();
    this_sqdist[width - 1] = dist[row + width - 1].sqdist();
}

/// Builds the Voronoi partition of `cmap`, filling `dist` with the offset
/// of every padded pixel to its nearest foreground pixel and relabeling
/// every background pixel with the label of that pixel.
///
/// `dist` must be empty; it is resized to the padded pixel count.
pub(crate) fn voronoi(cmap: &mut ConnectivityMap, dist: &mut Vec<Distance>) {
    let width = cmap.width() + 2;
    let height = cmap.height() + 2;

    debug_assert!(dist.is_empty());
    dist.resize(width * height, Distance::ZERO);

    let mut prev_sqdist = vec![0u32; width];
    let mut this_sqdist = vec![0u32; width];

    let cmap_data = cmap.padded_data_mut();

    seed_top_row(dist, &mut prev_sqdist, width);

    // Top to bottom phase.
    for y in 1..height {
        let row = y * width;
        seed_row_borders(dist, &mut this_sqdist, row, width);

        // Left to right: foreground pixels stay their own source, others
        // take the nearer of the left and top candidates.
        for x in 1..width - 1 {
            if cmap_data[row + x] != 0 {
                this_sqdist[x] = 0;
                debug_assert_eq!(dist[row + x], Distance::ZERO);
                continue;
            }

            let mut left = dist[row + x - 1];
            let sq_left = offset_sqdist(this_sqdist[x - 1], step_from_left(left.x));
            let mut top = dist[row + x - width];
            let sq_top = offset_sqdist(prev_sqdist[x], step_from_above(top.y));

            if sq_left < sq_top {
                this_sqdist[x] = sq_left;
                left.x -= 1;
                dist[row + x] = left;
                cmap_data[row + x] = cmap_data[row + x - 1];
            } else {
                this_sqdist[x] = sq_top;
                top.y -= 1;
                dist[row + x] = top;
                cmap_data[row + x] = cmap_data[row + x - width];
            }
        }

        // Right to left: the right candidate may still improve.
        for x in (1..width - 1).rev() {
            let mut right = dist[row + x + 1];
            let sq_right = offset_sqdist(this_sqdist[x + 1], step_from_right(right.x));
            if sq_right < this_sqdist[x] {
                this_sqdist[x] = sq_right;
                right.x += 1;
                dist[row + x] = right;
                cmap_data[row + x] = cmap_data[row + x + 1];
            }
        }

        std::mem::swap(&mut prev_sqdist, &mut this_sqdist);
    }

    // Bottom to top phase.
    for y in (1..height - 1).rev() {
        let row = y * width;
        seed_row_borders(dist, &mut this_sqdist, row, width);

        // Right to left: right and bottom candidates.
        for x in (1..width - 1).rev() {
            let mut right = dist[row + x + 1];
            let sq_right = offset_sqdist(this_sqdist[x + 1], step_from_right(right.x));
            let mut bottom = dist[row + x + width];
            let sq_bottom = offset_sqdist(prev_sqdist[x], step_from_below(bottom.y));

            this_sqdist[x] = dist[row + x].sqdist();

            if sq_right < this_sqdist[x] {
                this_sqdist[x] = sq_right;
                right.x += 1;
                dist[row + x] = right;
                debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x + 1] != 0);
                cmap_data[row + x] = cmap_data[row + x + 1];
            }
            if sq_bottom < this_sqdist[x] {
                this_sqdist[x] = sq_bottom;
                bottom.y += 1;
                dist[row + x] = bottom;
                debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x + width] != 0);
                cmap_data[row + x] = cmap_data[row + x + width];
            }
        }

        // Left to right: the left candidate may still improve.
        for x in 1..width - 1 {
            let mut left = dist[row + x - 1];
            let sq_left = offset_sqdist(this_sqdist[x - 1], step_from_left(left.x));
            if sq_left < this_sqdist[x] {
                this_sqdist[x] = sq_left;
                left.x -= 1;
                dist[row + x] = left;
                debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x - 1] != 0);
                cmap_data[row + x] = cmap_data[row + x - 1];
            }
        }

        std::mem::swap(&mut prev_sqdist, &mut this_sqdist);
    }
}

/// Recomputes the partition after the caller reseeded `dist`: pixels
/// holding [`Distance::SPECIAL`] are untouchable and opaque, pixels
/// reseeded to a border chain are up for grabs, and everything else
/// competes as usual.
///
/// Unlike [`voronoi`], foreground pixels are not reseeded here, and both
/// phases sit one row lower than the first pass: the top-down phase skips
/// the bottom padding row, and the bottom-up phase starts below the last
/// real row and ends on the top padding row.
pub(crate) fn voronoi_special(cmap: &mut ConnectivityMap, dist: &mut [Distance]) {
    let width = cmap.width() + 2;
    let height = cmap.height() + 2;

    let mut prev_sqdist = vec![0u32; width];
    let mut this_sqdist = vec![0u32; width];

    let cmap_data = cmap.padded_data_mut();

    seed_top_row(dist, &mut prev_sqdist, width);

    // Top to bottom phase.
    for y in 1..height - 1 {
        let row = y * width;
        seed_row_borders(dist, &mut this_sqdist, row, width);

        // Left to right.
        for x in 1..width - 1 {
            if dist[row + x] == Distance::SPECIAL {
                continue;
            }
            this_sqdist[x] = dist[row + x].sqdist();

            let mut left = dist[row + x - 1];
            if left != Distance::SPECIAL {
                let sq_left = offset_sqdist(this_sqdist[x - 1], step_from_left(left.x));
                if sq_left < this_sqdist[x] {
                    this_sqdist[x] = sq_left;
                    left.x -= 1;
                    dist[row + x] = left;
                    debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x - 1] != 0);
                    cmap_data[row + x] = cmap_data[row + x - 1];
                }
            }
            let mut top = dist[row + x - width];
            if top != Distance::SPECIAL {
                let sq_top = offset_sqdist(prev_sqdist[x], step_from_above(top.y));
                if sq_top < this_sqdist[x] {
                    this_sqdist[x] = sq_top;
                    top.y -= 1;
                    dist[row + x] = top;
                    debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x - width] != 0);
                    cmap_data[row + x] = cmap_data[row + x - width];
                }
            }
        }

        // Right to left.
        for x in (1..width - 1).rev() {
            if dist[row + x] == Distance::SPECIAL {
                continue;
            }
            let mut right = dist[row + x + 1];
            if right != Distance::SPECIAL {
                let sq_right = offset_sqdist(this_sqdist[x + 1], step_from_right(right.x));
                if sq_right < this_sqdist[x] {
                    this_sqdist[x] = sq_right;
                    right.x += 1;
                    dist[row + x] = right;
                    debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x + 1] != 0);
                    cmap_data[row + x] = cmap_data[row + x + 1];
                }
            }
        }

        std::mem::swap(&mut prev_sqdist, &mut this_sqdist);
    }

    // Bottom to top phase, one row below the first phase's reach.
    for y in (0..height - 2).rev() {
        let row = y * width;
        seed_row_borders(dist, &mut this_sqdist, row, width);

        // Right to left: right and bottom candidates.
        for x in (1..width - 1).rev() {
            if dist[row + x] == Distance::SPECIAL {
                continue;
            }
            this_sqdist[x] = dist[row + x].sqdist();

            let mut right = dist[row + x + 1];
            if right != Distance::SPECIAL {
                let sq_right = offset_sqdist(this_sqdist[x + 1], step_from_right(right.x));
                if sq_right < this_sqdist[x] {
                    this_sqdist[x] = sq_right;
                    right.x += 1;
                    dist[row + x] = right;
                    debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x + 1] != 0);
                    cmap_data[row + x] = cmap_data[row + x + 1];
                }
            }
            let mut bottom = dist[row + x + width];
            if bottom != Distance::SPECIAL {
                let sq_bottom = offset_sqdist(prev_sqdist[x], step_from_below(bottom.y));
                if sq_bottom < this_sqdist[x] {
                    this_sqdist[x] = sq_bottom;
                    bottom.y += 1;
                    dist[row + x] = bottom;
                    debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x + width] != 0);
                    cmap_data[row + x] = cmap_data[row + x + width];
                }
            }
        }

        // Left to right.
        for x in 1..width - 1 {
            if dist[row + x] == Distance::SPECIAL {
                continue;
            }
            let mut left = dist[row + x - 1];
            if left != Distance::SPECIAL {
                let sq_left = offset_sqdist(this_sqdist[x - 1], step_from_left(left.x));
                if sq_left < this_sqdist[x] {
                    this_sqdist[x] = sq_left;
                    left.x -= 1;
                    dist[row + x] = left;
                    debug_assert!(cmap_data[row + x] == 0 || cmap_data[row + x - 1] != 0);
                    cmap_data[row + x] = cmap_data[row + x - 1];
                }
            }
        }

        std::mem::swap(&mut prev_sqdist, &mut this_sqdist);
    }
}

/// Records the minimum squared distance between the source pixels of
/// every pair of labels that meet along a cell boundary.
///
/// Both source points are reconstructed from the current pixel's
/// coordinates, and the distance is plain Euclidean; intermediates are
/// 64-bit so the subtraction cannot overflow.
pub(crate) fn voronoi_distances(cmap: &ConnectivityMap, dist: &[Distance], conns: &mut Connections) {
    let width = cmap.width();
    let height = cmap.height();
    let stride = cmap.stride();
    let origin = cmap.origin();
    let data = cmap.padded_data();

    let offsets = [-(stride as isize), -1, 1, stride as isize];

    for y in 0..height {
        let row = origin + y * stride;
        for x in 0..width {
            let offset = row + x;
            let label = data[offset];
            debug_assert_ne!(label, 0);

            let x1 = x as i64 + i64::from(dist[offset].x);
            let y1 = y as i64 + i64::from(dist[offset].y);

            for delta in offsets {
                let nbh_offset = (offset as isize + delta) as usize;
                let nbh_label = data[nbh_offset];
                if nbh_label == 0 || nbh_label == label {
                    // Label 0 appears in the padding rows.
                    continue;
                }

                let x2 = x as i64 + i64::from(dist[nbh_offset].x);
                let y2 = y as i64 + i64::from(dist[nbh_offset].y);
                let dx = x1 - x2;
                let dy = y1 - y2;
                let sqdist = (dx * dx + dy * dy) as u32;

                update_distance(conns, label, nbh_label, sqdist);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_image::BinaryImage;
    use crate::components::Connection;

    fn mapped(img: &BinaryImage) -> (ConnectivityMap, Vec<Distance>) {
        let mut cmap = ConnectivityMap::new(img);
        let mut dist = Vec::new();
        voronoi(&mut cmap, &mut dist);
        (cmap, dist)
    }

    fn label_at(cmap: &ConnectivityMap, x: usize, y: usize) -> u32 {
        cmap.padded_data()[cmap.origin() + y * cmap.stride() + x]
    }

    #[test]
    fn every_pixel_joins_the_nearest_source() {
        let mut img = BinaryImage::new(20, 5);
        img.set(2, 2, true);
        img.set(17, 2, true);
        let (cmap, dist) = mapped(&img);

        let left = label_at(&cmap, 2, 2);
        let right = label_at(&cmap, 17, 2);
        assert_ne!(left, right);
        for y in 0..5 {
            for x in 0..20 {
                let expected = if x <= 9 { left } else { right };
                assert_eq!(label_at(&cmap, x, y), expected, "pixel ({x}, {y})");
            }
        }

        // Foreground pixels keep the zero offset.
        let origin = cmap.origin();
        assert_eq!(dist[origin + 2 * cmap.stride() + 2], Distance::ZERO);
        assert_eq!(dist[origin + 2 * cmap.stride() + 17], Distance::ZERO);
    }

    #[test]
    fn offsets_point_back_at_their_source() {
        let mut img = BinaryImage::new(9, 9);
        img.set(4, 4, true);
        let (cmap, dist) = mapped(&img);

        let origin = cmap.origin();
        let stride = cmap.stride();
        for y in 0..9_i32 {
            for x in 0..9_i32 {
                let d = dist[origin + y as usize * stride + x as usize];
                assert_eq!(x + i32::from(d.x), 4, "pixel ({x}, {y})");
                assert_eq!(y + i32::from(d.y), 4, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn the_weighted_metric_prefers_horizontal_owners() {
        // A source 4 columns away horizontally beats one 3 rows away
        // vertically: 16 < 4·9.
        let mut img = BinaryImage::new(11, 9);
        img.set(1, 4, true);
        img.set(5, 1, true);
        let (cmap, _) = mapped(&img);
        let horizontal_owner = label_at(&cmap, 1, 4);
        assert_eq!(label_at(&cmap, 5, 4), horizontal_owner);
    }

    #[test]
    fn boundary_distances_recover_the_source_gap() {
        // Two single-pixel marks 8 apart on one row: the cells meet in
        // between and the recorded distance reflects the real gap.
        let mut img = BinaryImage::new(16, 3);
        img.set(3, 1, true);
        img.set(11, 1, true);
        let (cmap, dist) = mapped(&img);

        let mut conns = Connections::new();
        voronoi_distances(&cmap, &dist, &mut conns);

        let a = label_at(&cmap, 3, 1);
        let b = label_at(&cmap, 11, 1);
        let recorded = conns[&Connection::new(a, b)];
        assert!(
            (49..=64).contains(&recorded),
            "expected a near-gap distance, got {recorded}"
        );
    }

    #[test]
    fn special_pixels_block_the_second_pass() {
        // Freeze the left source's pixel and open its surroundings; the
        // right region must flood the whole row except the frozen pixel.
        let mut img = BinaryImage::new(16, 3);
        img.set(3, 1, true);
        img.set(11, 1, true);
        let (mut cmap, mut dist) = mapped(&img);

        let origin = cmap.origin();
        let stride = cmap.stride();
        let left = label_at(&cmap, 3, 1);
        let right = label_at(&cmap, 11, 1);

        for y in 0..3_usize {
            for x in 0..16_usize {
                let offset = origin + y * stride + x;
                if label_at(&cmap, x, y) == left {
                    if dist[offset] == Distance::ZERO {
                        dist[offset] = Distance::SPECIAL;
                    } else {
                        dist[offset].reset(x as i32 + 1);
                    }
                }
            }
        }

        voronoi_special(&mut cmap, &mut dist);

        assert_eq!(label_at(&cmap, 0, 1), right);
        assert_eq!(label_at(&cmap, 2, 1), right);
        // The frozen pixel keeps its label and its sentinel offset.
        assert_eq!(label_at(&cmap, 3, 1), left);
        assert_eq!(dist[origin + stride + 3], Distance::SPECIAL);
    }
}
