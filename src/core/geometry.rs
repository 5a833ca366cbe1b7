//! Tile/pixel mapping and axis-aligned boxes.
//!
//! Coordinate system (matches the screen convention renderers expect):
//! - origin at the top-left corner of the arena
//! - `x` grows to the right, `y` grows downward
//! - tile `(x, y)` covers pixels `[x * tile, (x + 1) * tile)` horizontally

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tile coordinate (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// In-bounds 4-neighbours in up, right, down, left order.
    pub fn neighbors4(self, w: u32, h: u32) -> impl Iterator<Item = TilePos> {
        let TilePos { x, y } = self;
        let up = (y > 0).then(|| TilePos::new(x, y - 1));
        let right = (x + 1 < w).then(|| TilePos::new(x + 1, y));
        let down = (y + 1 < h).then(|| TilePos::new(x, y + 1));
        let left = (x > 0).then(|| TilePos::new(x - 1, y));
        [up, right, down, left].into_iter().flatten()
    }

    pub fn manhattan(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Axis-aligned box in pixel space, stored as centre plus half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub cx: f32,
    pub cy: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Rect {
    pub fn new(cx: f32, cy: f32, half_w: f32, half_h: f32) -> Self {
        Self {
            cx,
            cy,
            half_w,
            half_h,
        }
    }

    /// Square box of side `size` centred on `(cx, cy)`.
    pub fn square(cx: f32, cy: f32, size: f32) -> Self {
        let half = size * 0.5;
        Self::new(cx, cy, half, half)
    }

    pub fn left(&self) -> f32 {
        self.cx - self.half_w
    }

    pub fn right(&self) -> f32 {
        self.cx + self.half_w
    }

    pub fn top(&self) -> f32 {
        self.cy - self.half_h
    }

    pub fn bottom(&self) -> f32 {
        self.cy + self.half_h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.cx, self.cy)
    }

    /// Overlap with positive area. Boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            cx: self.cx + dx,
            cy: self.cy + dy,
            ..*self
        }
    }

    /// Shift the box so it lies fully inside `[0, width] x [0, height]`.
    ///
    /// Boxes wider than the arena are centred instead.
    pub fn clamped_to(&self, width: f32, height: f32) -> Rect {
        let cx = clamp_axis(self.cx, self.half_w, width);
        let cy = clamp_axis(self.cy, self.half_h, height);
        Rect { cx, cy, ..*self }
    }

    pub fn center_distance(&self, other: &Rect) -> f32 {
        (self.cx - other.cx).hypot(self.cy - other.cy)
    }
}

fn clamp_axis(c: f32, half: f32, extent: f32) -> f32 {
    if 2.0 * half >= extent {
        return extent * 0.5;
    }
    c.clamp(half, extent - half)
}

/// Converts between tile coordinates and pixel rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileMapper {
    tile_size: u32,
}

impl TileMapper {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tile_center(&self, t: TilePos) -> (f32, f32) {
        let s = self.tile_size as f32;
        ((t.x as f32 + 0.5) * s, (t.y as f32 + 0.5) * s)
    }

    /// Full pixel rectangle covered by tile `t`.
    pub fn tile_rect(&self, t: TilePos) -> Rect {
        let (cx, cy) = self.tile_center(t);
        Rect::square(cx, cy, self.tile_size as f32)
    }

    /// Tile containing pixel `(px, py)`. `None` left of / above the arena.
    ///
    /// Points past the right or bottom edge map to tiles outside the grid;
    /// grid lookups treat those as walls.
    pub fn tile_at(&self, px: f32, py: f32) -> Option<TilePos> {
        if !(px >= 0.0 && py >= 0.0) || !px.is_finite() || !py.is_finite() {
            return None;
        }
        let s = self.tile_size as f32;
        let x = (px / s).floor();
        let y = (py / s).floor();
        if x > u32::MAX as f32 || y > u32::MAX as f32 {
            return None;
        }
        Some(TilePos::new(x as u32, y as u32))
    }

    /// Tile containing the centre of `r`.
    pub fn tile_of(&self, r: &Rect) -> Option<TilePos> {
        self.tile_at(r.cx, r.cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_edges_do_not_intersect() {
        let a = Rect::square(20.0, 20.0, 40.0);
        let b = Rect::square(60.0, 20.0, 40.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&b.translated(-0.5, 0.0)));
    }

    #[test]
    fn clamp_pulls_box_back_inside() {
        let r = Rect::square(-3.0, 205.0, 10.0).clamped_to(200.0, 200.0);
        assert_eq!(r.left(), 0.0);
        assert_eq!(r.bottom(), 200.0);

        // Already inside: untouched.
        let inside = Rect::square(50.0, 50.0, 10.0);
        assert_eq!(inside.clamped_to(200.0, 200.0), inside);
    }

    #[test]
    fn tile_mapping_round_trips_through_centres() {
        let m = TileMapper::new(40);
        let t = TilePos::new(3, 2);
        let (cx, cy) = m.tile_center(t);
        assert_eq!((cx, cy), (140.0, 100.0));
        assert_eq!(m.tile_at(cx, cy), Some(t));
        assert_eq!(m.tile_at(119.99, 80.0), Some(TilePos::new(2, 2)));
        assert_eq!(m.tile_at(-0.1, 5.0), None);
    }

    #[test]
    fn neighbors_stay_in_bounds() {
        let corner: Vec<_> = TilePos::new(0, 0).neighbors4(3, 3).collect();
        assert_eq!(corner, vec![TilePos::new(1, 0), TilePos::new(0, 1)]);
        assert_eq!(TilePos::new(1, 1).neighbors4(3, 3).count(), 4);
    }
}
