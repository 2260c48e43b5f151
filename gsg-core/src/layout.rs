//! Grid layout solver for the multi-stream view.
//!
//! Finds the column/row split that gives every tile the largest 16:9 video
//! area inside the viewport.

const ASPECT_WIDTH: f64 = 16.0;
const ASPECT_HEIGHT: f64 = 9.0;

/// Viewport and per-tile chrome the solver works against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Extra vertical chrome per tile; horizontal chrome is derived at 16:9
    pub decoration_height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64, decoration_height: f64) -> Self {
        Self {
            width,
            height,
            decoration_height,
        }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Per-tile geometry for one stream count and viewport
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutGeometry {
    pub tile_width: f64,
    pub tile_height: f64,
    pub top_padding: f64,
    pub columns: usize,
    pub rows: usize,
}

/// Largest raw (chrome included) 16:9 tile for a `columns x rows` grid.
fn raw_tile(viewport: &Viewport, columns: usize, rows: usize) -> (f64, f64) {
    let width_budget = viewport.width / columns as f64;
    let height_budget = viewport.height / rows as f64;

    let width_bound_height = width_budget * ASPECT_HEIGHT / ASPECT_WIDTH;
    if width_bound_height <= height_budget {
        (width_budget, width_bound_height)
    } else {
        (height_budget * ASPECT_WIDTH / ASPECT_HEIGHT, height_budget)
    }
}

/// Solve the grid for `count` tiles.
///
/// Ties between splits go to the one with fewer columns. Zero tiles or an
/// unusable viewport yield an all-zero geometry.
#[must_use]
pub fn solve(count: usize, viewport: &Viewport) -> LayoutGeometry {
    if count == 0 || !viewport.is_usable() {
        return LayoutGeometry::default();
    }

    let mut best = (0.0_f64, 0.0_f64, 0_usize, 0_usize);
    for columns in 1..=count {
        let rows = count.div_ceil(columns);
        let (width, height) = raw_tile(viewport, columns, rows);
        if width > best.0 {
            best = (width, height, columns, rows);
        }
    }

    let (raw_width, raw_height, columns, rows) = best;
    let decoration = viewport.decoration_height.max(0.0);
    let tile_width = (raw_width - decoration * ASPECT_WIDTH / ASPECT_HEIGHT).max(0.0);
    let tile_height = (raw_height - decoration).max(0.0);
    let top_padding = ((viewport.height - rows as f64 * tile_height) / 2.0).max(0.0);

    LayoutGeometry {
        tile_width,
        tile_height,
        top_padding,
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zero_streams() {
        let geometry = solve(0, &Viewport::new(1600.0, 900.0, 24.0));
        assert_eq!(geometry, LayoutGeometry::default());
        assert_eq!(geometry.rows, 0);
        assert!(approx(geometry.tile_width, 0.0));
        assert!(approx(geometry.tile_height, 0.0));
    }

    #[test]
    fn test_single_stream_fills_viewport() {
        let geometry = solve(1, &Viewport::new(1600.0, 900.0, 0.0));
        assert!(approx(geometry.tile_width, 1600.0));
        assert!(approx(geometry.tile_height, 900.0));
        assert!(approx(geometry.top_padding, 0.0));
        assert_eq!((geometry.columns, geometry.rows), (1, 1));
    }

    #[test]
    fn test_single_stream_height_bound() {
        // wide viewport: height is the binding side
        let geometry = solve(1, &Viewport::new(2000.0, 900.0, 0.0));
        assert!(approx(geometry.tile_width, 1600.0));
        assert!(approx(geometry.tile_height, 900.0));
    }

    #[test]
    fn test_four_streams_two_by_two() {
        let geometry = solve(4, &Viewport::new(1600.0, 900.0, 0.0));
        assert_eq!((geometry.columns, geometry.rows), (2, 2));
        assert!(approx(geometry.tile_width, 800.0));
        assert!(approx(geometry.tile_height, 450.0));
    }

    #[test]
    fn test_tall_viewport_prefers_single_column() {
        let geometry = solve(3, &Viewport::new(900.0, 1600.0, 0.0));
        assert_eq!((geometry.columns, geometry.rows), (1, 3));
        assert!(approx(geometry.tile_width, 900.0));
        assert!(approx(geometry.tile_height, 506.25));
        assert!(approx(geometry.top_padding, (1600.0 - 3.0 * 506.25) / 2.0));
    }

    #[test]
    fn test_ties_keep_fewest_columns() {
        // 2 streams in 1600x900: 2x1 and 1x2 both give 800 wide tiles
        let geometry = solve(2, &Viewport::new(1600.0, 900.0, 0.0));
        assert_eq!((geometry.columns, geometry.rows), (1, 2));
        assert!(approx(geometry.tile_width, 800.0));
    }

    #[test]
    fn test_decoration_is_removed_at_aspect_ratio() {
        let geometry = solve(1, &Viewport::new(1600.0, 900.0, 90.0));
        assert!(approx(geometry.tile_width, 1440.0));
        assert!(approx(geometry.tile_height, 810.0));
        assert!(approx(geometry.tile_width / geometry.tile_height, 16.0 / 9.0));
    }

    #[test]
    fn test_unusable_viewport_is_empty() {
        assert_eq!(solve(3, &Viewport::new(0.0, 900.0, 0.0)), LayoutGeometry::default());
        assert_eq!(solve(3, &Viewport::new(f64::NAN, 900.0, 0.0)), LayoutGeometry::default());
    }
}
