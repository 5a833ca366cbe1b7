//! Ray-cast distance sensor.
//!
//! Rays leave the agent centre at evenly spaced angles (ray 0 points along +x,
//! angles grow clockwise on screen since `y` points down) and march one pixel at
//! a time until they enter a wall tile.

use core::f32::consts::TAU;

use crate::geometry::TileMapper;
use crate::maze::MazeGrid;

pub const DEFAULT_RAYS: usize = 8;

/// Longest distance any ray can travel: the arena diagonal.
pub fn max_range(width: f32, height: f32) -> f32 {
    width.hypot(height)
}

/// Normalised wall distance along each of `num_rays` rays.
///
/// Every value lies in `[0, 1]`; 1.0 means nothing was hit within `max_range`.
pub fn sense(
    center: (f32, f32),
    grid: &MazeGrid,
    mapper: &TileMapper,
    num_rays: usize,
    max_range: f32,
) -> Vec<f32> {
    let mut out = vec![1.0; num_rays];
    sense_into(center, grid, mapper, max_range, &mut out);
    out
}

/// Same as [`sense`], writing one reading per slot of `out`.
pub fn sense_into(
    center: (f32, f32),
    grid: &MazeGrid,
    mapper: &TileMapper,
    max_range: f32,
    out: &mut [f32],
) {
    let n = out.len().max(1) as f32;
    for (i, slot) in out.iter_mut().enumerate() {
        let angle = i as f32 * TAU / n;
        *slot = cast(center, angle.cos(), angle.sin(), grid, mapper, max_range);
    }
}

fn cast(
    (cx, cy): (f32, f32),
    dx: f32,
    dy: f32,
    grid: &MazeGrid,
    mapper: &TileMapper,
    max_range: f32,
) -> f32 {
    if !(max_range > 0.0) {
        return 1.0;
    }
    let steps = max_range.floor() as u32;
    for s in 1..=steps {
        let d = s as f32;
        let hit = match mapper.tile_at(cx + dx * d, cy + dy * d) {
            Some(t) => grid.is_wall(t),
            None => true,
        };
        if hit {
            return (d / max_range).clamp(0.0, 1.0);
        }
    }
    1.0
}
