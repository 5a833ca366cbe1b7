#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, Result};
use crate::lidar::DEFAULT_RAYS;

/// Reward shaping weights.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RewardConfig {
    /// Reward per tile of progress along the BFS distance.
    pub shaping_weight: f32,
    /// Flat cost paid every tick.
    pub step_penalty: f32,
    /// Cost per tile of remaining BFS distance, paid every tick.
    pub distance_penalty: f32,
    /// Extra cost when a move is rejected by a wall.
    pub wall_penalty: f32,
    /// Base reward for catching the target. Replaces the shaped reward.
    pub catch_reward: f32,
    /// Added on catch, scaled by the unused fraction of `max_steps`.
    pub catch_speed_bonus: f32,
    /// One-time cost when the episode is truncated for being stuck.
    pub stuck_penalty: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            shaping_weight: 10.0,
            step_penalty: 0.05,
            distance_penalty: 0.01,
            wall_penalty: 5.0,
            catch_reward: 1000.0,
            catch_speed_bonus: 1000.0,
            stuck_penalty: 100.0,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.shaping_weight,
            self.step_penalty,
            self.distance_penalty,
            self.wall_penalty,
            self.catch_reward,
            self.catch_speed_bonus,
            self.stuck_penalty,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(EnvError::InvalidConfig("reward weights must be finite"));
        }
        if self.catch_speed_bonus < 0.0 {
            return Err(EnvError::InvalidConfig("catch_speed_bonus must be >= 0"));
        }
        Ok(())
    }
}

/// Environment configuration. Passed at construction and fixed afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Pixels per maze tile. Must divide both screen dimensions.
    pub tile_size: u32,
    /// Pixels moved per tick.
    pub move_speed: u32,
    /// Side of the agent's square box.
    pub agent_size: u32,
    /// Side of the target's square box.
    pub target_size: u32,
    /// Step budget: scales the catch bonus and truncates the episode when spent.
    pub max_steps: u32,
    /// Pixel radius the agent must leave to reset the stuck counter.
    pub stuck_radius: f32,
    /// Consecutive non-escaping steps before the episode is truncated.
    pub stuck_step_ceiling: u32,
    pub num_rays: usize,

    /// Starting complexity in `[0.1, 1.0]` (fraction of interior walls kept).
    pub initial_complexity: f32,
    /// Increment applied by `increase_complexity`.
    pub complexity_step: f32,
    /// Regenerate the maze every N unseeded resets. 0 keeps the layout until
    /// complexity changes or a seeded reset.
    pub maze_refresh_episodes: u32,

    pub reward: RewardConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            tile_size: 40,
            move_speed: 4,
            agent_size: 24,
            target_size: 16,
            max_steps: 1000,
            stuck_radius: 40.0,
            stuck_step_ceiling: 150,
            num_rays: DEFAULT_RAYS,
            initial_complexity: 0.5,
            complexity_step: 0.1,
            maze_refresh_episodes: 0,
            reward: RewardConfig::default(),
        }
    }
}

impl EnvConfig {
    pub const MIN_COMPLEXITY: f32 = 0.1;
    pub const MAX_COMPLEXITY: f32 = 1.0;
    /// Smallest maze side (in tiles) with at least two carvable nodes per axis.
    pub const MIN_TILES: u32 = 5;
    /// Keeps `tiles_w * tiles_h` (and the unreachable sentinel) comfortably in range.
    pub const MAX_TILES: u32 = 4096;

    /// Square arena of `tiles x tiles` tiles at the given tile size.
    pub fn with_tiles(tiles_w: u32, tiles_h: u32, tile_size: u32) -> Self {
        Self {
            screen_width: tiles_w.saturating_mul(tile_size),
            screen_height: tiles_h.saturating_mul(tile_size),
            tile_size,
            ..Default::default()
        }
    }

    pub fn with_move_speed(mut self, move_speed: u32) -> Self {
        self.move_speed = move_speed;
        self
    }

    pub fn with_complexity(mut self, complexity: f32) -> Self {
        self.initial_complexity = complexity;
        self
    }

    pub fn with_stuck(mut self, radius: f32, ceiling: u32) -> Self {
        self.stuck_radius = radius;
        self.stuck_step_ceiling = ceiling;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }

    pub fn tiles_w(&self) -> u32 {
        self.screen_width / self.tile_size.max(1)
    }

    pub fn tiles_h(&self) -> u32 {
        self.screen_height / self.tile_size.max(1)
    }

    /// Length of the flat observation vector: target offset plus rays.
    pub fn observation_len(&self) -> usize {
        2 + self.num_rays
    }

    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(EnvError::InvalidConfig("tile_size must be > 0"));
        }
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(EnvError::InvalidConfig("screen dimensions must be > 0"));
        }
        if self.screen_width % self.tile_size != 0 || self.screen_height % self.tile_size != 0 {
            return Err(EnvError::InvalidConfig(
                "tile_size must evenly divide screen_width and screen_height",
            ));
        }
        if self.tiles_w() < Self::MIN_TILES || self.tiles_h() < Self::MIN_TILES {
            return Err(EnvError::InvalidConfig("maze must be at least 5x5 tiles"));
        }
        if self.tiles_w() > Self::MAX_TILES || self.tiles_h() > Self::MAX_TILES {
            return Err(EnvError::InvalidConfig("maze is too large"));
        }
        if self.agent_size == 0 || self.agent_size >= self.tile_size {
            return Err(EnvError::InvalidConfig("agent_size must be in (0, tile_size)"));
        }
        if self.target_size == 0 || self.target_size >= self.tile_size {
            return Err(EnvError::InvalidConfig("target_size must be in (0, tile_size)"));
        }
        // Anything faster could jump over a one-tile wall.
        if self.move_speed == 0 || self.move_speed > self.tile_size {
            return Err(EnvError::InvalidConfig("move_speed must be in [1, tile_size]"));
        }
        if self.max_steps == 0 {
            return Err(EnvError::InvalidConfig("max_steps must be > 0"));
        }
        if !self.stuck_radius.is_finite() || self.stuck_radius < 0.0 {
            return Err(EnvError::InvalidConfig("stuck_radius must be finite and >= 0"));
        }
        if self.stuck_step_ceiling == 0 {
            return Err(EnvError::InvalidConfig("stuck_step_ceiling must be > 0"));
        }
        if self.num_rays == 0 {
            return Err(EnvError::InvalidConfig("num_rays must be > 0"));
        }
        if !(Self::MIN_COMPLEXITY..=Self::MAX_COMPLEXITY).contains(&self.initial_complexity) {
            return Err(EnvError::InvalidConfig("initial_complexity must be in [0.1, 1.0]"));
        }
        if !self.complexity_step.is_finite() || self.complexity_step < 0.0 {
            return Err(EnvError::InvalidConfig("complexity_step must be finite and >= 0"));
        }
        self.reward.validate()
    }
}
