//! Breadth-first search over the open tiles of a maze.
//!
//! Edges join 4-connected open tiles and all cost 1, so the first time BFS
//! dequeues a tile its hop count is minimal.

use std::collections::VecDeque;

use crate::geometry::TilePos;
use crate::maze::MazeGrid;

const NO_PARENT: u32 = u32::MAX;

/// Distance reported when no path exists. No real path can be this long.
pub fn unreachable_distance(grid: &MazeGrid) -> u32 {
    grid.w().saturating_mul(grid.h())
}

/// Hop count of the shortest open path from `from` to `to`.
///
/// Returns [`unreachable_distance`] when either endpoint is a wall, out of
/// bounds, or the two tiles are disconnected.
pub fn shortest_distance(grid: &MazeGrid, from: TilePos, to: TilePos) -> u32 {
    if !grid.is_open(from) || !grid.is_open(to) {
        return unreachable_distance(grid);
    }
    if from == to {
        return 0;
    }
    let search = bfs(grid, from, Some(to));
    let d = search.dist[grid.idx(to)];
    if d == NO_PARENT {
        unreachable_distance(grid)
    } else {
        d
    }
}

/// One shortest path, both endpoints included. `None` when unreachable.
pub fn shortest_path(grid: &MazeGrid, from: TilePos, to: TilePos) -> Option<Vec<TilePos>> {
    if !grid.is_open(from) || !grid.is_open(to) {
        return None;
    }
    let search = bfs(grid, from, Some(to));
    let target = grid.idx(to);
    if search.dist[target] == NO_PARENT {
        return None;
    }

    let mut path = Vec::with_capacity(search.dist[target] as usize + 1);
    let mut cur = target as u32;
    while cur != NO_PARENT {
        path.push(grid.pos(cur as usize));
        cur = search.parent[cur as usize];
    }
    path.reverse();
    Some(path)
}

/// Reachability mask (indexed row-major) of every tile reachable from `start`.
pub fn reachable_from(grid: &MazeGrid, start: TilePos) -> Vec<bool> {
    if !grid.is_open(start) {
        return vec![false; (grid.w() as usize) * (grid.h() as usize)];
    }
    bfs(grid, start, None)
        .dist
        .into_iter()
        .map(|d| d != NO_PARENT)
        .collect()
}

/// Hop counts from `start` to every tile; unreachable tiles get
/// [`unreachable_distance`].
pub fn distances_from(grid: &MazeGrid, start: TilePos) -> Vec<u32> {
    let sentinel = unreachable_distance(grid);
    if !grid.is_open(start) {
        return vec![sentinel; (grid.w() as usize) * (grid.h() as usize)];
    }
    bfs(grid, start, None)
        .dist
        .into_iter()
        .map(|d| if d == NO_PARENT { sentinel } else { d })
        .collect()
}

/// Two open tiles far apart along the maze graph (double-sweep BFS).
///
/// Exact for tree mazes (complexity 1.0), a good approximation otherwise.
pub fn farthest_pair(grid: &MazeGrid) -> Option<(TilePos, TilePos)> {
    let seed = *grid.floor_tiles().first()?;
    let a = farthest_from(grid, seed);
    let b = farthest_from(grid, a);
    Some((a, b))
}

fn farthest_from(grid: &MazeGrid, start: TilePos) -> TilePos {
    let dist = bfs(grid, start, None).dist;
    let mut best = (0u32, start);
    for (i, &d) in dist.iter().enumerate() {
        if d != NO_PARENT && d > best.0 {
            best = (d, grid.pos(i));
        }
    }
    best.1
}

struct Search {
    dist: Vec<u32>,
    parent: Vec<u32>,
}

fn bfs(grid: &MazeGrid, from: TilePos, stop_at: Option<TilePos>) -> Search {
    let n = (grid.w() as usize) * (grid.h() as usize);
    let mut dist = vec![NO_PARENT; n];
    let mut parent = vec![NO_PARENT; n];
    let mut queue = VecDeque::new();

    dist[grid.idx(from)] = 0;
    queue.push_back(from);

    while let Some(cur) = queue.pop_front() {
        if stop_at == Some(cur) {
            break;
        }
        let d = dist[grid.idx(cur)];
        for next in cur.neighbors4(grid.w(), grid.h()) {
            let ni = grid.idx(next);
            if dist[ni] != NO_PARENT || !grid.is_open(next) {
                continue;
            }
            dist[ni] = d + 1;
            parent[ni] = grid.idx(cur) as u32;
            queue.push_back(next);
        }
    }

    Search { dist, parent }
}
