//! The despeckle pipeline.
//!
//! A run is a fixed sequence of stages over invocation-local buffers:
//! label the connected components, take a census, collapse every
//! big-enough component into one synthetic label, partition the page
//! into weighted Voronoi cells, measure how far apart neighboring cells'
//! marks really are, decide which small marks are anchored to something
//! trustworthy, optionally rerun the partition with blocked regions
//! frozen, and finally erase every mark that cannot be reached from the
//! big set through legal attachments.
//!
//! Collapsing the big components first keeps the survival sweep a
//! single-source traversal instead of an all-pairs problem.

use std::collections::VecDeque;

use crate::binary_image::BinaryImage;
use crate::components::{BoundingBox, Component, Connections, TargetSourceConn};
use crate::connectivity::ConnectivityMap;
use crate::debug::{self, DebugImages};
use crate::distance::Distance;
use crate::settings::Settings;
use crate::status::TaskStatus;
use crate::voronoi::{voronoi, voronoi_distances, voronoi_special};
use crate::DespeckleError;

/// Marks `source` as anchored to a heavy or a light neighbor, or leaves
/// it untouched when `target` is out of reach. An existing big anchor is
/// never downgraded.
fn tag_source_component(
    components: &mut [Component],
    source: u32,
    target: u32,
    sqdist: u32,
    settings: &Settings,
) {
    let target_pixels = components[target as usize].pixels();
    let src = &mut components[source as usize];

    if src.anchored_to_big() {
        return;
    }
    if u64::from(sqdist) > u64::from(src.pixels()) * u64::from(settings.pixels_to_sq_dist) {
        // Too far.
        return;
    }
    if f64::from(target_pixels) >= settings.min_relative_parent_weight * f64::from(src.pixels()) {
        src.set_anchored_to_big();
    } else {
        src.set_anchored_to_small();
    }
}

/// Whether `comp` may be attached to `target`: close enough in proportion
/// to its own size, and the target heavy enough to vouch for it.
/// Attaching preserves `comp` provided `target` is itself preserved.
fn can_be_attached_to(comp: Component, target: Component, sqdist: u32, settings: &Settings) -> bool {
    u64::from(sqdist) <= u64::from(comp.pixels()) * u64::from(settings.pixels_to_sq_dist)
        && f64::from(target.pixels()) >= f64::from(comp.pixels()) * settings.min_relative_parent_weight
}

pub(crate) fn despeckle_impl(
    image: &mut BinaryImage,
    settings: &Settings,
    status: &dyn TaskStatus,
    mut dbg: Option<&mut DebugImages>,
) -> Result<(), DespeckleError> {
    let mut cmap = ConnectivityMap::new(image);
    if cmap.max_label() == 0 {
        // Completely white image.
        return Ok(());
    }
    status.check_cancelled()?;

    let width = image.width();
    let height = image.height();
    let stride = cmap.stride();
    let origin = cmap.origin();

    let mut components = vec![Component::default(); cmap.max_label() as usize + 1];
    let mut bounding_boxes = vec![BoundingBox::default(); cmap.max_label() as usize + 1];

    // Census: pixel count and bounding rectangle per label.
    {
        let data = cmap.padded_data();
        for y in 0..height {
            let row = origin + y * stride;
            for x in 0..width {
                let label = data[row + x] as usize;
                components[label].add_pixel();
                bounding_boxes[label].extend(x as i32, y as i32);
            }
        }
    }
    status.check_cancelled()?;

    // Unify big components into one synthetic label and compact the rest
    // into a dense range.
    let mut remap = vec![0u32; components.len()];
    let mut unified_big = 0u32;
    let mut next_avail = 1u32;
    for label in 1..=cmap.max_label() {
        let bbox = &bounding_boxes[label as usize];
        if bbox.width() < settings.big_object_threshold
            && bbox.height() < settings.big_object_threshold
        {
            components[next_avail as usize] = components[label as usize];
            remap[label as usize] = next_avail;
            next_avail += 1;
        } else {
            if unified_big == 0 {
                unified_big = next_avail;
                next_avail += 1;
                components[unified_big as usize] = components[label as usize];
                // A saturating pixel count, so every size comparison
                // against the unified component passes.
                components[unified_big as usize].set_pixels(width as u64 * height as u64);
            }
            remap[label as usize] = unified_big;
        }
    }
    components.truncate(next_avail as usize);
    drop(bounding_boxes);
    status.check_cancelled()?;

    let max_label = next_avail - 1;

    // Rewrite every pixel through the remapping table.
    {
        let data = cmap.padded_data_mut();
        for y in 0..height {
            let row = origin + y * stride;
            for x in 0..width {
                data[row + x] = remap[data[row + x] as usize];
            }
        }
    }
    drop(remap);
    if let Some(dbg) = dbg.as_deref_mut() {
        dbg.add(debug::visualize_labels(&cmap), "big_components_unified");
    }
    status.check_cancelled()?;

    // Partition the page into weighted Voronoi cells.
    let mut distance_matrix: Vec<Distance> = Vec::new();
    voronoi(&mut cmap, &mut distance_matrix);
    if let Some(dbg) = dbg.as_deref_mut() {
        dbg.add(debug::visualize_labels(&cmap), "voronoi");
    }
    status.check_cancelled()?;

    // Minimum squared distances between neighboring cells' marks.
    let mut conns = Connections::new();
    voronoi_distances(&cmap, &distance_matrix, &mut conns);
    status.check_cancelled()?;

    for (&conn, &sqdist) in &conns {
        tag_source_component(&mut components, conn.lesser, conn.greater, sqdist, settings);
        tag_source_component(&mut components, conn.greater, conn.lesser, sqdist, settings);
    }

    // Keep the unified region from growing in the second pass.
    components[unified_big as usize].set_anchored_to_big();

    // A component anchored only to lighter neighbors may still have a big
    // neighbor whose region is blocked off by theirs; the tags of the
    // highest label decide whether a second pass runs.
    let second_chance = components
        .last()
        .is_some_and(Component::anchored_to_small_but_not_big);

    if second_chance {
        status.check_cancelled()?;

        // Freeze every region that is not in the blocked set: foreground
        // pixels become untouchable, the rest of the region becomes open
        // territory the blocked regions may spread through.
        {
            let data = cmap.padded_data();
            for y in 0..height {
                let row = origin + y * stride;
                for x in 0..width {
                    let label = data[row + x] as usize;
                    debug_assert_ne!(label, 0);

                    if !components[label].anchored_to_small_but_not_big() {
                        let d = &mut distance_matrix[row + x];
                        if *d == Distance::ZERO {
                            *d = Distance::SPECIAL;
                        } else {
                            // x + 1 is this pixel's column in the padded
                            // frame the transform scans.
                            d.reset(x as i32 + 1);
                        }
                    }
                }
            }
        }
        status.check_cancelled()?;

        voronoi_special(&mut cmap, &mut distance_matrix);
        if let Some(dbg) = dbg.as_deref_mut() {
            dbg.add(debug::visualize_labels(&cmap), "voronoi_special");
        }
        status.check_cancelled()?;

        // The reshaped cells meet along new boundaries; fold the extra
        // distances into the same map.
        voronoi_distances(&cmap, &distance_matrix, &mut conns);
    }
    status.check_cancelled()?;

    drop(distance_matrix);

    for comp in &mut components {
        comp.clear_tags();
    }

    // Turn the distance map into directed attachment edges, keeping only
    // the pairs close and comparable enough in both size and distance.
    let mut target_source: Vec<TargetSourceConn> = Vec::with_capacity(conns.len());
    for (conn, sqdist) in conns.drain() {
        let comp1 = components[conn.lesser as usize];
        let comp2 = components[conn.greater as usize];
        if can_be_attached_to(comp1, comp2, sqdist, settings) {
            target_source.push(TargetSourceConn {
                target: conn.greater,
                source: conn.lesser,
            });
        }
        if can_be_attached_to(comp2, comp1, sqdist, settings) {
            target_source.push(TargetSourceConn {
                target: conn.lesser,
                source: conn.greater,
            });
        }
    }
    target_source.sort_unstable();
    status.check_cancelled()?;

    // Index the sorted edges so the slice for a given target is a range
    // lookup; labels without edges point past the end.
    let num_edges = target_source.len();
    let mut target_source_idx: Vec<usize> = Vec::with_capacity(max_label as usize + 1);
    for (i, edge) in target_source.iter().enumerate() {
        debug_assert_ne!(edge.target, 0);
        while target_source_idx.len() <= edge.target as usize {
            target_source_idx.push(i);
        }
    }
    while target_source_idx.len() <= max_label as usize {
        target_source_idx.push(num_edges);
    }

    // Breadth-first sweep from the unified big component: everything
    // reachable through attachment edges survives.
    let mut ok_labels: VecDeque<u32> = VecDeque::new();
    ok_labels.push_back(unified_big);
    while let Some(label) = ok_labels.pop_front() {
        let comp = &mut components[label as usize];
        if comp.anchored_to_big() {
            continue;
        }
        comp.set_anchored_to_big();

        let mut idx = target_source_idx[label as usize];
        while idx < num_edges && target_source[idx].target == label {
            ok_labels.push_back(target_source[idx].source);
            idx += 1;
        }
    }
    status.check_cancelled()?;

    // Erase every pixel whose component did not survive.
    const MSB: u32 = 1 << 31;
    let words_per_line = image.words_per_line();
    let data = cmap.padded_data();
    let words = image.data_mut();
    for y in 0..height {
        let row = origin + y * stride;
        let image_row = y * words_per_line;
        for x in 0..width {
            if !components[data[row + x] as usize].anchored_to_big() {
                words[image_row + (x >> 5)] &= !(MSB >> (x & 31));
            }
        }
    }

    Ok(())
}
