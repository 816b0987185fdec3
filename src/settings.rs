//! Strength presets and their DPI-scaled thresholds.

/// Horizontal and vertical resolution of a scanned page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dpi {
    horizontal: i32,
    vertical: i32,
}

impl Dpi {
    #[must_use]
    pub fn new(horizontal: i32, vertical: i32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    #[inline]
    #[must_use]
    pub fn horizontal(self) -> i32 {
        self.horizontal
    }

    #[inline]
    #[must_use]
    pub fn vertical(self) -> i32 {
        self.vertical
    }
}

/// How eagerly to treat small marks as garbage.
///
/// The named presets coincide with `Custom(1.0)`, `Custom(2.0)` and
/// `Custom(3.0)`; the `Custom` form exists for sliders with fractional
/// positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Level {
    Cautious,
    Normal,
    Aggressive,
    Custom(f64),
}

/// Numeric thresholds derived from a [`Level`] and the page DPI.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    /// Multiplied by a component's pixel count, gives the minimum size of
    /// a neighbor the component may be attached to.
    pub min_relative_parent_weight: f64,

    /// Multiplied by a component's pixel count, gives the maximum squared
    /// distance to a neighbor the component may be attached to.
    pub pixels_to_sq_dist: u32,

    /// Minimum width or height guaranteeing a component is never removed.
    pub big_object_threshold: i32,
}

impl Settings {
    pub fn get(level: Level, dpi: Dpi) -> Self {
        let min_dpi = dpi.horizontal().min(dpi.vertical());
        let dpi_factor = f64::from(min_dpi) / 300.0;

        match level {
            Level::Cautious => Self {
                min_relative_parent_weight: 0.125 * dpi_factor,
                pixels_to_sq_dist: 100, // 10.0²
                big_object_threshold: (7.0 * dpi_factor).round() as i32,
            },
            Level::Normal => Self {
                min_relative_parent_weight: 0.175 * dpi_factor,
                pixels_to_sq_dist: 42, // 6.5², truncated
                big_object_threshold: (12.0 * dpi_factor).round() as i32,
            },
            Level::Aggressive => Self {
                min_relative_parent_weight: 0.225 * dpi_factor,
                pixels_to_sq_dist: 12, // 3.5², truncated
                big_object_threshold: (17.0 * dpi_factor).round() as i32,
            },
            Level::Custom(level) => Self {
                min_relative_parent_weight: (0.05 * level + 0.075) * dpi_factor,
                pixels_to_sq_dist: {
                    let side = 0.25 * level * level - 4.25 * level + 14.0;
                    (side * side) as u32
                },
                big_object_threshold: ((5.0 * level + 2.0) * dpi_factor).round() as i32,
            },
        }
    }
}
