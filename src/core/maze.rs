//! Maze generation and the derived, read-only arena geometry.
//!
//! Layout is a binary tile grid. Carvable nodes sit on odd coordinates
//! (`(1 + 2i, 1 + 2j)`), connectors between two nodes sit on the midpoint, and
//! the outer border is always wall.

use rand::Rng;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, Result};
use crate::geometry::{Rect, TileMapper, TilePos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Tile {
    Wall,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MazeGrid {
    w: u32,
    h: u32,
    cells: Vec<Tile>,
}

impl MazeGrid {
    /// Smallest side that still has one carvable node inside the border.
    pub const MIN_SIDE: u32 = 3;

    /// All-wall grid.
    pub fn filled(w: u32, h: u32) -> Self {
        let w = w.max(Self::MIN_SIDE);
        let h = h.max(Self::MIN_SIDE);
        Self {
            w,
            h,
            cells: vec![Tile::Wall; (w as usize) * (h as usize)],
        }
    }

    /// Spanning-tree maze carved by randomized depth-first backtracking.
    pub fn generate<R: Rng + ?Sized>(w: u32, h: u32, rng: &mut R) -> Self {
        let mut grid = Self::filled(w, h);
        carve_maze(&mut grid, rng);
        grid
    }

    /// Parse a layout drawn with `#` for walls and `.` for open tiles.
    ///
    /// Rows must be equally long and the border must be solid wall.
    pub fn from_ascii(rows: &[&str]) -> Result<Self> {
        let h = rows.len() as u32;
        let w = rows.first().map(|r| r.chars().count()).unwrap_or(0) as u32;
        if w < Self::MIN_SIDE || h < Self::MIN_SIDE {
            return Err(EnvError::InvalidLayout("layout must be at least 3x3"));
        }

        let mut cells = Vec::with_capacity((w as usize) * (h as usize));
        for row in rows {
            if row.chars().count() as u32 != w {
                return Err(EnvError::InvalidLayout("rows must have equal length"));
            }
            for c in row.chars() {
                cells.push(match c {
                    '#' => Tile::Wall,
                    '.' => Tile::Open,
                    _ => return Err(EnvError::InvalidLayout("unknown tile character")),
                });
            }
        }

        let grid = Self { w, h, cells };
        let border_open = (0..w)
            .flat_map(|x| [TilePos::new(x, 0), TilePos::new(x, h - 1)])
            .chain((0..h).flat_map(|y| [TilePos::new(0, y), TilePos::new(w - 1, y)]))
            .any(|t| grid.is_open(t));
        if border_open {
            return Err(EnvError::InvalidLayout("outer border must be wall"));
        }
        if grid.open_count() == 0 {
            return Err(EnvError::InvalidLayout("layout has no open tile"));
        }
        Ok(grid)
    }

    pub fn w(&self) -> u32 {
        self.w
    }

    pub fn h(&self) -> u32 {
        self.h
    }

    /// Node every generated maze is carved from.
    pub fn start() -> TilePos {
        TilePos::new(1, 1)
    }

    pub fn in_bounds(&self, t: TilePos) -> bool {
        t.x < self.w && t.y < self.h
    }

    /// Out-of-bounds lookups read as wall.
    pub fn tile(&self, t: TilePos) -> Tile {
        if !self.in_bounds(t) {
            return Tile::Wall;
        }
        self.cells[self.idx(t)]
    }

    pub fn is_open(&self, t: TilePos) -> bool {
        self.tile(t) == Tile::Open
    }

    pub fn is_wall(&self, t: TilePos) -> bool {
        self.tile(t) == Tile::Wall
    }

    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Tile::Open).count()
    }

    pub fn is_border(&self, t: TilePos) -> bool {
        t.x == 0 || t.y == 0 || t.x + 1 == self.w || t.y + 1 == self.h
    }

    pub(crate) fn idx(&self, t: TilePos) -> usize {
        (t.y as usize) * (self.w as usize) + (t.x as usize)
    }

    pub(crate) fn pos(&self, idx: usize) -> TilePos {
        let w = self.w as usize;
        TilePos::new((idx % w) as u32, (idx / w) as u32)
    }

    fn open(&mut self, t: TilePos) {
        let i = self.idx(t);
        self.cells[i] = Tile::Open;
    }

    /// Wall tiles not on the outer border.
    pub fn interior_walls(&self) -> Vec<TilePos> {
        let mut out = Vec::new();
        for y in 1..self.h - 1 {
            for x in 1..self.w - 1 {
                let t = TilePos::new(x, y);
                if self.is_wall(t) {
                    out.push(t);
                }
            }
        }
        out
    }

    /// Reopen `floor((1 - complexity) * interior_walls)` random interior walls.
    ///
    /// Only walls touching an open tile are candidates, so every reopened tile
    /// joins the region it borders and no unreachable island can appear.
    /// Returns the number of tiles reopened.
    pub fn relax<R: Rng + ?Sized>(&mut self, complexity: f32, rng: &mut R) -> usize {
        let total = self.interior_walls().len();
        if total == 0 {
            return 0;
        }

        let keep = if complexity.is_finite() {
            complexity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let n = ((1.0 - keep) * total as f32).floor() as usize;

        let mut queued = vec![false; self.cells.len()];
        let mut frontier: Vec<TilePos> = Vec::new();
        for t in self.floor_tiles() {
            self.queue_walls_around(t, &mut queued, &mut frontier);
        }

        let mut reopened = 0;
        while reopened < n && !frontier.is_empty() {
            let t = frontier.swap_remove(rng.gen_range(0..frontier.len()));
            self.open(t);
            reopened += 1;
            self.queue_walls_around(t, &mut queued, &mut frontier);
        }
        reopened
    }

    /// Push the interior wall neighbours of `t` not already queued.
    fn queue_walls_around(&self, t: TilePos, queued: &mut [bool], frontier: &mut Vec<TilePos>) {
        for next in t.neighbors4(self.w, self.h) {
            let i = self.idx(next);
            if !queued[i] && self.is_wall(next) && !self.is_border(next) {
                queued[i] = true;
                frontier.push(next);
            }
        }
    }

    /// Open tiles in row-major order.
    pub fn floor_tiles(&self) -> Vec<TilePos> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == Tile::Open)
            .map(|(i, _)| self.pos(i))
            .collect()
    }

    /// One pixel rectangle per wall tile.
    pub fn wall_rects(&self, mapper: &TileMapper) -> Vec<Rect> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == Tile::Wall)
            .map(|(i, _)| mapper.tile_rect(self.pos(i)))
            .collect()
    }
}

fn carve_maze<R: Rng + ?Sized>(grid: &mut MazeGrid, rng: &mut R) {
    let w = grid.w();
    let h = grid.h();

    let start = MazeGrid::start();
    grid.open(start);

    let mut stack: Vec<TilePos> = vec![start];

    while let Some(&TilePos { x, y }) = stack.last() {
        // Candidate nodes two tiles away that are still solid.
        let mut neighbors = [start; 4];
        let mut n = 0usize;

        if y >= 3 {
            let t = TilePos::new(x, y - 2);
            if grid.is_wall(t) {
                neighbors[n] = t;
                n += 1;
            }
        }
        if x + 2 <= w - 2 {
            let t = TilePos::new(x + 2, y);
            if grid.is_wall(t) {
                neighbors[n] = t;
                n += 1;
            }
        }
        if y + 2 <= h - 2 {
            let t = TilePos::new(x, y + 2);
            if grid.is_wall(t) {
                neighbors[n] = t;
                n += 1;
            }
        }
        if x >= 3 {
            let t = TilePos::new(x - 2, y);
            if grid.is_wall(t) {
                neighbors[n] = t;
                n += 1;
            }
        }

        if n == 0 {
            stack.pop();
            continue;
        }

        let next = neighbors[rng.gen_range(0..n)];
        let connector = TilePos::new((x + next.x) / 2, (y + next.y) / 2);
        grid.open(connector);
        grid.open(next);
        stack.push(next);
    }
}

/// Maze layout plus everything derived from it once per regeneration.
///
/// Replaced as a whole; never edited while an episode is in flight.
#[derive(Debug, Clone)]
pub struct Arena {
    grid: MazeGrid,
    mapper: TileMapper,
    walls: Vec<Rect>,
    floor: Vec<TilePos>,
    width: f32,
    height: f32,
}

impl Arena {
    pub fn new(grid: MazeGrid, mapper: TileMapper) -> Self {
        let walls = grid.wall_rects(&mapper);
        let floor = grid.floor_tiles();
        let s = mapper.tile_size() as f32;
        let width = grid.w() as f32 * s;
        let height = grid.h() as f32 * s;
        Self {
            grid,
            mapper,
            walls,
            floor,
            width,
            height,
        }
    }

    /// Generate a fresh maze and relax it down to `complexity`.
    pub fn generate<R: Rng + ?Sized>(
        tiles_w: u32,
        tiles_h: u32,
        mapper: TileMapper,
        complexity: f32,
        rng: &mut R,
    ) -> Self {
        let mut grid = MazeGrid::generate(tiles_w, tiles_h, rng);
        let reopened = grid.relax(complexity, rng);
        debug!(
            tiles_w = grid.w(),
            tiles_h = grid.h(),
            complexity,
            reopened,
            open = grid.open_count(),
            "maze generated"
        );
        Self::new(grid, mapper)
    }

    pub fn grid(&self) -> &MazeGrid {
        &self.grid
    }

    pub fn mapper(&self) -> &TileMapper {
        &self.mapper
    }

    pub fn walls(&self) -> &[Rect] {
        &self.walls
    }

    pub fn floor_tiles(&self) -> &[TilePos] {
        &self.floor
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn collides(&self, r: &Rect) -> bool {
        self.walls.iter().any(|w| w.intersects(r))
    }

    /// Tile under the centre of `r`, if it is inside the grid.
    pub fn tile_of(&self, r: &Rect) -> Option<TilePos> {
        self.mapper.tile_of(r).filter(|t| self.grid.in_bounds(*t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::reachable_from;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_open_reachable(grid: &MazeGrid) -> bool {
        let seen = reachable_from(grid, MazeGrid::start());
        grid.floor_tiles().iter().all(|t| seen[grid.idx(*t)])
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = MazeGrid::generate(21, 15, &mut StdRng::seed_from_u64(123));
        let b = MazeGrid::generate(21, 15, &mut StdRng::seed_from_u64(123));
        let c = MazeGrid::generate(21, 15, &mut StdRng::seed_from_u64(124));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn spanning_tree_opens_every_node_and_keeps_border() {
        let grid = MazeGrid::generate(21, 15, &mut StdRng::seed_from_u64(7));
        for y in (1..14).step_by(2) {
            for x in (1..20).step_by(2) {
                assert!(grid.is_open(TilePos::new(x, y)), "node ({x},{y}) not carved");
            }
        }
        for x in 0..21 {
            assert!(grid.is_wall(TilePos::new(x, 0)));
            assert!(grid.is_wall(TilePos::new(x, 14)));
        }
        for y in 0..15 {
            assert!(grid.is_wall(TilePos::new(0, y)));
            assert!(grid.is_wall(TilePos::new(20, y)));
        }

        // A tree over N nodes has N - 1 connectors.
        let nodes = 10 * 7;
        assert_eq!(grid.open_count(), nodes + nodes - 1);
        assert!(all_open_reachable(&grid));
    }

    #[test]
    fn even_sized_grids_still_have_solid_border() {
        let grid = MazeGrid::generate(20, 15, &mut StdRng::seed_from_u64(3));
        for y in 0..15 {
            assert!(grid.is_wall(TilePos::new(19, y)));
        }
        assert!(all_open_reachable(&grid));
    }

    #[test]
    fn relax_reopens_expected_fraction_and_keeps_reachability() {
        let mut rng = StdRng::seed_from_u64(99);
        for complexity in [0.1f32, 0.35, 0.5, 0.9, 1.0] {
            let mut grid = MazeGrid::generate(21, 21, &mut rng);
            let before = grid.interior_walls().len();
            let open_before = grid.open_count();

            let reopened = grid.relax(complexity, &mut rng);
            assert_eq!(reopened, ((1.0 - complexity) * before as f32).floor() as usize);
            assert_eq!(grid.open_count(), open_before + reopened);
            assert!(all_open_reachable(&grid), "complexity {complexity}");
        }
    }

    #[test]
    fn relaxed_mazes_never_leave_islands() {
        // Even sides leave a solid column and row next to the border.
        for (w, h) in [(20u32, 15u32), (21, 15), (8, 6)] {
            for seed in 0..60u64 {
                for complexity in [0.1f32, 0.5, 0.8, 0.9] {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let mut grid = MazeGrid::generate(w, h, &mut rng);
                    let before = grid.interior_walls().len();
                    let reopened = grid.relax(complexity, &mut rng);
                    assert_eq!(
                        reopened,
                        ((1.0 - complexity) * before as f32).floor() as usize,
                        "{w}x{h} seed {seed} complexity {complexity}"
                    );
                    assert!(
                        all_open_reachable(&grid),
                        "{w}x{h} seed {seed} complexity {complexity}"
                    );
                }
            }
        }
    }

    #[test]
    fn relax_skips_when_no_interior_walls() {
        let mut grid = MazeGrid::generate(3, 3, &mut StdRng::seed_from_u64(1));
        assert!(grid.interior_walls().is_empty());
        let snapshot = grid.clone();
        assert_eq!(grid.relax(0.1, &mut StdRng::seed_from_u64(2)), 0);
        assert_eq!(grid, snapshot);
        assert_eq!(grid.floor_tiles(), vec![MazeGrid::start()]);
    }

    #[test]
    fn floor_tiles_never_overlap_walls() {
        let mut rng = StdRng::seed_from_u64(5);
        let mapper = TileMapper::new(40);
        let arena = Arena::generate(20, 15, mapper, 0.4, &mut rng);
        assert!(!arena.floor_tiles().is_empty());
        for t in arena.floor_tiles() {
            let r = mapper.tile_rect(*t);
            assert!(!arena.collides(&r), "floor tile {t:?} overlaps a wall");
        }
    }

    #[test]
    fn ascii_layouts_are_validated() {
        let grid = MazeGrid::from_ascii(&["#####", "#...#", "#.#.#", "#...#", "#####"]).unwrap();
        assert_eq!((grid.w(), grid.h()), (5, 5));
        assert_eq!(grid.open_count(), 8);

        assert_eq!(
            MazeGrid::from_ascii(&["#.###", "#...#", "#####"]),
            Err(EnvError::InvalidLayout("outer border must be wall"))
        );
        assert!(MazeGrid::from_ascii(&["####", "#..", "####"]).is_err());
        assert!(MazeGrid::from_ascii(&["###", "#x#", "###"]).is_err());
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let grid = MazeGrid::generate(5, 5, &mut StdRng::seed_from_u64(0));
        assert_eq!(grid.tile(TilePos::new(5, 1)), Tile::Wall);
        assert_eq!(grid.tile(TilePos::new(1, 99)), Tile::Wall);
    }
}
