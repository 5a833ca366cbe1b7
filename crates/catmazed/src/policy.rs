//! Built-in policies for driving the environment without a learner.

use catmaze::path::shortest_path;
use catmaze::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Policy {
    fn name(&self) -> &'static str;

    /// Pick the next action for the current state of `env`.
    fn act(&mut self, env: &MazeEnv, obs: &Observation) -> Action;
}

/// Uniformly random actions. The usual untrained baseline.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn act(&mut self, _env: &MazeEnv, _obs: &Observation) -> Action {
        Action::ALL[self.rng.gen_range(0..Action::ALL.len())]
    }
}

/// Follows the BFS shortest path tile by tile.
///
/// The agent box is narrower than a corridor, so before stepping into the next
/// tile it first centres itself on the perpendicular axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct OraclePolicy;

impl Policy for OraclePolicy {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn act(&mut self, env: &MazeEnv, obs: &Observation) -> Action {
        let Some(episode) = env.episode() else {
            return toward(obs.target_offset());
        };
        let arena = env.arena();
        let (Some(from), Some(to)) = (episode.agent_tile(arena), episode.target_tile(arena)) else {
            return toward(obs.target_offset());
        };
        let next = match shortest_path(arena.grid(), from, to) {
            Some(path) if path.len() >= 2 => path[1],
            // Same tile or no route: close in directly.
            _ => return toward(obs.target_offset()),
        };

        let (ax, ay) = episode.agent().center();
        let (nx, ny) = arena.mapper().tile_center(next);
        let speed = env.config().move_speed as f32;
        let (dx, dy) = (nx - ax, ny - ay);

        if next.x != from.x {
            if dy.abs() >= speed {
                return vertical(dy);
            }
            horizontal(dx)
        } else {
            if dx.abs() >= speed {
                return horizontal(dx);
            }
            vertical(dy)
        }
    }
}

fn toward([dx, dy]: [f32; 2]) -> Action {
    if dx.abs() >= dy.abs() {
        horizontal(dx)
    } else {
        vertical(dy)
    }
}

fn horizontal(dx: f32) -> Action {
    if dx < 0.0 {
        Action::Left
    } else {
        Action::Right
    }
}

fn vertical(dy: f32) -> Action {
    if dy < 0.0 {
        Action::Up
    } else {
        Action::Down
    }
}
