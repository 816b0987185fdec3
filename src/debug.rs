//! Debug snapshots of intermediate label maps.
//!
//! When a [`DebugImages`] sink is passed to the despeckler it receives a
//! colorized rendering of the connectivity map after each major stage,
//! keyed by a string tag. The renderings are plain `ImgVec<RGB8>` buffers
//! that callers can encode or display however they like.

use imgref::ImgVec;
use rgb::RGB8;

use crate::connectivity::ConnectivityMap;

/// An append-only collection of tagged debug renderings.
#[derive(Debug, Default)]
pub struct DebugImages {
    snapshots: Vec<(String, ImgVec<RGB8>)>,
}

impl DebugImages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot under `tag`.
    pub fn add(&mut self, image: ImgVec<RGB8>, tag: &str) {
        self.snapshots.push((tag.to_owned(), image));
    }

    /// Snapshots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImgVec<RGB8>)> {
        self.snapshots.iter().map(|(tag, img)| (tag.as_str(), img))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Renders the unpadded area of a label map; background is white, every
/// label gets a saturated color of its own.
pub(crate) fn visualize_labels(cmap: &ConnectivityMap) -> ImgVec<RGB8> {
    let width = cmap.width();
    let height = cmap.height();
    let stride = cmap.stride();
    let origin = cmap.origin();
    let data = cmap.padded_data();

    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let label = data[origin + y * stride + x];
            pixels.push(if label == 0 {
                RGB8::new(255, 255, 255)
            } else {
                label_color(label)
            });
        }
    }
    ImgVec::new(pixels, width, height)
}

/// Maps a label to a display color.
///
/// Hues advance by the golden angle so consecutive labels land far apart
/// on the color wheel.
fn label_color(label: u32) -> RGB8 {
    let hue = (f64::from(label) * 137.508) % 360.0;
    hsv_to_rgb(hue, 0.65, 0.95)
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> RGB8 {
    let c = value * saturation;
    let hh = hue / 60.0;
    let x = c * (1.0 - (hh % 2.0 - 1.0).abs());
    let (r, g, b) = match hh as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    RGB8::new(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
