//! Connected-component labeling over binary images.
//!
//! The map stores one 32-bit label per pixel in a buffer carrying a
//! one-pixel border of label 0, so scanning code can look at all four
//! orthogonal neighbors of any real pixel without bounds checks.
//!
//! Labeling is run based: horizontal foreground runs are extracted row by
//! row, runs on adjacent rows that overlap within one pixel of horizontal
//! slack are unioned (which makes diagonal contact merge, i.e.
//! 8-connectivity), and the union-find roots are compacted to the dense
//! label range `1..=max_label` before being painted into the buffer.

use crate::binary_image::BinaryImage;

/// Labels must fit in 30 bits; per-component pixel counts share that cap.
pub(crate) const MAX_LABEL: u32 = (1 << 30) - 1;

/// A per-pixel label map with a one-pixel padding border of label 0.
///
/// The buffer is `(width + 2) × (height + 2)` with row stride `width + 2`;
/// label 0 marks background and padding, real components use
/// `1..=max_label`.
#[derive(Debug, Clone)]
pub struct ConnectivityMap {
    width: usize,
    height: usize,
    data: Vec<u32>,
    max_label: u32,
}

/// A horizontal run of foreground pixels on one scanline.
struct Run {
    y: i32,
    x1: i32,
    /// Inclusive right end.
    x2: i32,
    ccid: u32,
}

impl ConnectivityMap {
    /// Labels the 8-connected foreground components of `image`.
    ///
    /// # Panics
    /// Panics if the component count exceeds the 30-bit label cap.
    #[must_use]
    pub fn new(image: &BinaryImage) -> Self {
        let width = image.width();
        let height = image.height();
        let stride = width + 2;
        let mut data = vec![0u32; stride * (height + 2)];

        let mut runs = extract_runs(image);
        let max_label = label_runs(&mut runs);
        assert!(max_label <= MAX_LABEL, "component label overflow");

        for run in &runs {
            let base = (run.y as usize + 1) * stride + 1;
            for x in run.x1..=run.x2 {
                data[base + x as usize] = run.ccid;
            }
        }

        Self {
            width,
            height,
            data,
            max_label,
        }
    }

    /// Width of the unpadded area in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the unpadded area in pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride of the padded buffer, `width + 2`.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width + 2
    }

    /// Highest label produced by the labeler (0 for a blank image).
    #[inline]
    #[must_use]
    pub fn max_label(&self) -> u32 {
        self.max_label
    }

    /// Offset of the first real pixel within the padded buffer.
    #[inline]
    pub(crate) fn origin(&self) -> usize {
        self.stride() + 1
    }

    /// The padded buffer, starting at the top-left border pixel.
    #[inline]
    pub(crate) fn padded_data(&self) -> &[u32] {
        &self.data
    }

    /// The padded buffer, mutable.
    #[inline]
    pub(crate) fn padded_data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }
}

/// Extracts horizontal foreground runs in row-major order, skipping over
/// all-zero words.
fn extract_runs(image: &BinaryImage) -> Vec<Run> {
    const MSB: u32 = 1 << 31;

    let width = image.width();
    let words_per_line = image.words_per_line();
    let mut runs = Vec::new();

    for y in 0..image.height() {
        let row = &image.data()[y * words_per_line..(y + 1) * words_per_line];
        let mut start: Option<usize> = None;
        let mut x = 0;
        while x < width {
            if start.is_none() && x & 31 == 0 && row[x >> 5] == 0 {
                x += 32;
                continue;
            }
            let fg = row[x >> 5] & (MSB >> (x & 31)) != 0;
            match (fg, start) {
                (true, None) => start = Some(x),
                (false, Some(x1)) => {
                    runs.push(Run {
                        y: y as i32,
                        x1: x1 as i32,
                        x2: x as i32 - 1,
                        ccid: 0,
                    });
                    start = None;
                }
                _ => {}
            }
            x += 1;
        }
        if let Some(x1) = start {
            runs.push(Run {
                y: y as i32,
                x1: x1 as i32,
                x2: width as i32 - 1,
                ccid: 0,
            });
        }
    }
    runs
}

/// Assigns a dense component id to every run via union-find and returns
/// the highest id. Runs must be in row-major order.
fn label_runs(runs: &mut [Run]) -> u32 {
    // parent[id] is the union-find parent; roots satisfy parent[id] == id.
    let mut parent: Vec<u32> = Vec::new();
    // Start of the scan window over the previous row.
    let mut window = 0usize;

    for n in 0..runs.len() {
        let y = runs[n].y;
        // One pixel of slack on both ends makes diagonal contact connect.
        let x1 = runs[n].x1 - 1;
        let x2 = runs[n].x2 + 1;

        while window < runs.len() && runs[window].y + 1 < y {
            window += 1;
        }

        let mut id = u32::MAX;
        let mut q = window;
        while q < n && runs[q].x1 <= x2 {
            if runs[q].y + 1 == y && runs[q].x2 >= x1 {
                let root = find(&mut parent, runs[q].ccid);
                if id == u32::MAX {
                    id = root;
                } else if root != id {
                    let (lo, hi) = if root < id { (root, id) } else { (id, root) };
                    parent[hi as usize] = lo;
                    id = lo;
                }
                // Freshen the overlapping run so later unions resolve fast.
                runs[q].ccid = id;
            }
            q += 1;
        }

        if id == u32::MAX {
            id = parent.len() as u32;
            parent.push(id);
        }
        runs[n].ccid = id;
    }

    // Flatten to roots and compact them to 1..=max in first-seen order.
    let mut dense: Vec<u32> = vec![0; parent.len()];
    let mut next = 0u32;
    for run in runs.iter_mut() {
        let root = find(&mut parent, run.ccid);
        if dense[root as usize] == 0 {
            next += 1;
            dense[root as usize] = next;
        }
        run.ccid = dense[root as usize];
    }
    next
}

/// Finds the root of `id`, compressing the path behind it.
fn find(parent: &mut [u32], id: u32) -> u32 {
    let mut root = id;
    while parent[root as usize] != root {
        root = parent[root as usize];
    }
    let mut walk = id;
    while parent[walk as usize] != root {
        let next = parent[walk as usize];
        parent[walk as usize] = root;
        walk = next;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_art(art: &[&str]) -> BinaryImage {
        let mut img = BinaryImage::new(art[0].len(), art.len());
        for (y, row) in art.iter().enumerate() {
            for (x, c) in row.bytes().enumerate() {
                if c == b'#' {
                    img.set(x, y, true);
                }
            }
        }
        img
    }

    fn label_at(cmap: &ConnectivityMap, x: usize, y: usize) -> u32 {
        cmap.padded_data()[cmap.origin() + y * cmap.stride() + x]
    }

    #[test]
    fn blank_image_has_no_labels() {
        let cmap = ConnectivityMap::new(&BinaryImage::new(16, 16));
        assert_eq!(cmap.max_label(), 0);
        assert!(cmap.padded_data().iter().all(|&l| l == 0));
    }

    #[test]
    fn diagonal_contact_merges() {
        let cmap = ConnectivityMap::new(&from_art(&[
            "#...",
            ".#..",
            "..#.",
        ]));
        assert_eq!(cmap.max_label(), 1);
        assert_eq!(label_at(&cmap, 0, 0), 1);
        assert_eq!(label_at(&cmap, 2, 2), 1);
    }

    #[test]
    fn separated_marks_get_distinct_labels() {
        let cmap = ConnectivityMap::new(&from_art(&[
            "##..#",
            "##...",
            ".....",
            "#..##",
        ]));
        assert_eq!(cmap.max_label(), 4);
        assert_ne!(label_at(&cmap, 0, 0), label_at(&cmap, 4, 0));
        assert_ne!(label_at(&cmap, 0, 3), label_at(&cmap, 3, 3));
        assert_eq!(label_at(&cmap, 0, 0), label_at(&cmap, 1, 1));
    }

    #[test]
    fn u_shape_reunites_into_one_component() {
        // The two arms only meet at the bottom; union-find must merge them.
        let cmap = ConnectivityMap::new(&from_art(&[
            "#.#",
            "#.#",
            "###",
        ]));
        assert_eq!(cmap.max_label(), 1);
        assert_eq!(label_at(&cmap, 0, 0), label_at(&cmap, 2, 0));
    }

    #[test]
    fn border_is_label_zero() {
        let cmap = ConnectivityMap::new(&from_art(&["###", "###"]));
        let stride = cmap.stride();
        let data = cmap.padded_data();
        for x in 0..stride {
            assert_eq!(data[x], 0);
            assert_eq!(data[(cmap.height() + 1) * stride + x], 0);
        }
        for y in 0..cmap.height() + 2 {
            assert_eq!(data[y * stride], 0);
            assert_eq!(data[y * stride + stride - 1], 0);
        }
    }

    #[test]
    fn labels_are_dense_from_one() {
        let cmap = ConnectivityMap::new(&from_art(&[
            "#.#.#.#",
            ".......",
            "#.#.#.#",
        ]));
        assert_eq!(cmap.max_label(), 8);
        let mut seen = vec![false; 9];
        for y in 0..3 {
            for x in 0..7 {
                let l = label_at(&cmap, x, y);
                if l != 0 {
                    seen[l as usize] = true;
                }
            }
        }
        assert!(seen[1..].iter().all(|&s| s));
    }

    #[test]
    fn word_boundary_runs_survive_the_skip() {
        let mut img = BinaryImage::new(70, 1);
        for x in 30..36 {
            img.set(x, 0, true);
        }
        let cmap = ConnectivityMap::new(&img);
        assert_eq!(cmap.max_label(), 1);
        assert_eq!(label_at(&cmap, 30, 0), 1);
        assert_eq!(label_at(&cmap, 35, 0), 1);
        assert_eq!(label_at(&cmap, 36, 0), 0);
    }
}
