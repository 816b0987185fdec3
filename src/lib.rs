//! # despeckle-oxide
//!
//! Speckle removal for 1-bit scanned page images.
//!
//! The despeckler decides which marks on a page are noise by size and
//! company rather than by size alone, so the dot of an "i", punctuation
//! and broken letter fragments survive while isolated dust does not:
//!
//! - connected components larger than a DPI-scaled threshold are trusted
//!   unconditionally and collapsed into one synthetic "big" component;
//! - the page is partitioned into Voronoi cells around every component
//!   under a vertically weighted metric (horizontal neighbors group more
//!   readily, matching how text flows);
//! - for each pair of components whose cells touch, the real distance
//!   between their marks is measured along the shared boundary;
//! - a small component survives if a chain of close, comparably sized or
//!   heavier neighbors connects it to the big set; when small regions
//!   wall a component off, the partition is recomputed once with the
//!   walled-off regions given room to reach farther;
//! - everything unreachable from the big set is erased from the image.
//!
//! ## Example
//!
//! ```
//! use despeckle_oxide::{despeckle, BinaryImage, Dpi, Level, NeverCancelled};
//!
//! let mut page = BinaryImage::new(100, 100);
//! page.fill_rect(10, 10, 30, 30); // a letter-sized mark
//! page.set(80, 80, true); // an isolated speck
//!
//! let clean = despeckle(&page, Dpi::new(300, 300), Level::Normal, &NeverCancelled, None)?;
//! assert!(clean.get(20, 20));
//! assert!(!clean.get(80, 80));
//! # Ok::<(), despeckle_oxide::DespeckleError>(())
//! ```
//!
//! Long runs can be cancelled between stages through a [`TaskStatus`]
//! token, and an optional [`DebugImages`] sink receives colorized
//! snapshots of the intermediate label maps.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]

mod binary_image;
mod components;
mod connectivity;
mod debug;
mod distance;
mod engine;
mod settings;
mod status;
mod voronoi;

pub use crate::binary_image::BinaryImage;
pub use crate::connectivity::ConnectivityMap;
pub use crate::debug::DebugImages;
pub use crate::settings::{Dpi, Level};
pub use crate::status::{CancelFlag, NeverCancelled, TaskStatus};

use crate::settings::Settings;

/// Error type for despeckle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DespeckleError {
    /// The status token requested cancellation between stages.
    Cancelled,
}

impl std::fmt::Display for DespeckleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "despeckling was cancelled"),
        }
    }
}

impl std::error::Error for DespeckleError {}

/// Despeckles a copy of `src` and returns it.
///
/// A completely white image is returned as-is. On cancellation the source
/// is untouched and no image is returned.
///
/// # Errors
/// Returns [`DespeckleError::Cancelled`] when `status` reports
/// cancellation at a stage boundary.
pub fn despeckle(
    src: &BinaryImage,
    dpi: Dpi,
    level: Level,
    status: &dyn TaskStatus,
    dbg: Option<&mut DebugImages>,
) -> Result<BinaryImage, DespeckleError> {
    let mut dst = src.clone();
    despeckle_in_place(&mut dst, dpi, level, status, dbg)?;
    Ok(dst)
}

/// Despeckles `image` in place.
///
/// The image itself is only written in the final stage, so a cancelled
/// run leaves it exactly as it was.
///
/// # Errors
/// Returns [`DespeckleError::Cancelled`] when `status` reports
/// cancellation at a stage boundary.
pub fn despeckle_in_place(
    image: &mut BinaryImage,
    dpi: Dpi,
    level: Level,
    status: &dyn TaskStatus,
    dbg: Option<&mut DebugImages>,
) -> Result<(), DespeckleError> {
    let settings = Settings::get(level, dpi);
    engine::despeckle_impl(image, &settings, status, dbg)
}
