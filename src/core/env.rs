//! Trainer-facing environment.
//!
//! `MazeEnv` owns the maze, the episode and the random source. A trainer
//! drives it with `reset` / `step`; a renderer reads a [`Scene`]; a curriculum
//! raises [`MazeEnv::increase_complexity`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::episode::{Action, Episode, EpisodeStatus, StepEvent};
use crate::error::{EnvError, Result};
use crate::geometry::{Rect, TileMapper, TilePos};
use crate::lidar;
use crate::maze::{Arena, MazeGrid};

/// Flat observation: `[dx, dy, ray_0 .. ray_n]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    values: Vec<f32>,
}

impl Observation {
    /// Target centre minus agent centre, in pixels.
    pub fn target_offset(&self) -> [f32; 2] {
        [self.values[0], self.values[1]]
    }

    /// Normalised ray readings.
    pub fn rays(&self) -> &[f32] {
        &self.values[2..]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Side-channel metadata returned with every observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepInfo {
    pub step: u32,
    /// Current BFS distance in tiles (the unreachable sentinel if disconnected).
    pub distance: u32,
    pub hit_wall: bool,
    pub stuck_steps: u32,
    pub complexity: f32,
    /// `None` right after a reset.
    pub event: Option<StepEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

impl StepResult {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActionSpace {
    pub n: usize,
}

impl ActionSpace {
    pub fn contains(&self, action: i64) -> bool {
        action >= 0 && (action as u64) < self.n as u64
    }
}

/// Per-component bounds of the observation vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl ObservationSpace {
    pub fn shape(&self) -> usize {
        self.low.len()
    }

    pub fn contains(&self, obs: &Observation) -> bool {
        obs.len() == self.shape()
            && obs
                .as_slice()
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| *lo <= *v && *v <= *hi)
    }
}

/// Read-only view handed to a renderer.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub agent: Rect,
    pub target: Rect,
    pub walls: &'a [Rect],
    pub width: f32,
    pub height: f32,
}

/// External display collaborator.
pub trait Renderer {
    fn draw(&mut self, scene: &Scene<'_>);
}

#[derive(Debug, Clone)]
pub struct MazeEnv {
    cfg: EnvConfig,
    rng: StdRng,
    complexity: f32,
    arena: Arena,
    episode: Option<Episode>,
    /// Hand-built layouts survive seeded resets and refresh windows.
    fixed_layout: bool,
    resets_since_regen: u32,
    max_range: f32,
    closed: bool,
}

impl MazeEnv {
    pub fn new(cfg: EnvConfig, seed: u64) -> Result<Self> {
        cfg.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let arena = generate_arena(&cfg, cfg.initial_complexity, &mut rng);
        Ok(Self::assemble(cfg, rng, arena, false))
    }

    /// Environment over a hand-built layout. The grid must match the
    /// configured tile dimensions.
    pub fn with_grid(cfg: EnvConfig, grid: MazeGrid, seed: u64) -> Result<Self> {
        cfg.validate()?;
        if grid.w() != cfg.tiles_w() || grid.h() != cfg.tiles_h() {
            return Err(EnvError::InvalidLayout(
                "grid dimensions must match screen size / tile_size",
            ));
        }
        let rng = StdRng::seed_from_u64(seed);
        let arena = Arena::new(grid, TileMapper::new(cfg.tile_size));
        Ok(Self::assemble(cfg, rng, arena, true))
    }

    fn assemble(cfg: EnvConfig, rng: StdRng, arena: Arena, fixed_layout: bool) -> Self {
        let max_range = lidar::max_range(cfg.screen_width as f32, cfg.screen_height as f32);
        Self {
            complexity: cfg.initial_complexity,
            cfg,
            rng,
            arena,
            episode: None,
            fixed_layout,
            resets_since_regen: 0,
            max_range,
            closed: false,
        }
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace {
            n: Action::ALL.len(),
        }
    }

    pub fn observation_space(&self) -> ObservationSpace {
        let w = self.cfg.screen_width as f32;
        let h = self.cfg.screen_height as f32;
        let mut low = vec![-w, -h];
        let mut high = vec![w, h];
        low.resize(self.cfg.observation_len(), 0.0);
        high.resize(self.cfg.observation_len(), 1.0);
        ObservationSpace { low, high }
    }

    pub fn complexity(&self) -> f32 {
        self.complexity
    }

    pub fn grid(&self) -> &MazeGrid {
        self.arena.grid()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Current episode, if `reset` has been called.
    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start a new episode.
    ///
    /// A seed reseeds the random source and regenerates the maze, so the
    /// episode depends only on `(config, complexity, seed)`. Without a seed the
    /// current layout is kept unless the refresh window has elapsed.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<(Observation, StepInfo)> {
        self.ensure_open()?;

        match seed {
            Some(seed) => {
                self.rng = StdRng::seed_from_u64(seed);
                if !self.fixed_layout {
                    self.regenerate();
                }
            }
            None => {
                let refresh = self.cfg.maze_refresh_episodes;
                if !self.fixed_layout && refresh > 0 && self.resets_since_regen >= refresh {
                    self.regenerate();
                }
            }
        }
        self.resets_since_regen = self.resets_since_regen.saturating_add(1);

        let episode = Episode::spawn(&self.arena, &self.cfg, &mut self.rng)?;
        Ok(self.begin(episode))
    }

    /// Start a new episode with the occupants on explicit tiles.
    pub fn reset_with_tiles(
        &mut self,
        agent: TilePos,
        target: TilePos,
    ) -> Result<(Observation, StepInfo)> {
        self.ensure_open()?;
        let episode = Episode::place(&self.arena, &self.cfg, agent, target)?;
        Ok(self.begin(episode))
    }

    fn begin(&mut self, episode: Episode) -> (Observation, StepInfo) {
        let info = StepInfo {
            step: 0,
            distance: episode.last_distance(),
            hit_wall: false,
            stuck_steps: 0,
            complexity: self.complexity,
            event: None,
        };
        let obs = self.observe_episode(&episode);
        self.episode = Some(episode);
        (obs, info)
    }

    /// Advance one tick with a raw trainer action in `0..=3`.
    pub fn step(&mut self, action: i64) -> Result<StepResult> {
        self.ensure_open()?;
        // Precondition order: no episode beats a bad action.
        if self.episode.is_none() {
            return Err(EnvError::NotReset);
        }
        self.step_action(Action::from_index(action)?)
    }

    pub fn step_action(&mut self, action: Action) -> Result<StepResult> {
        self.ensure_open()?;
        let episode = self.episode.as_mut().ok_or(EnvError::NotReset)?;
        let t = episode.step(&self.arena, &self.cfg, action)?;
        let info = StepInfo {
            step: episode.steps(),
            distance: t.distance,
            hit_wall: t.hit_wall,
            stuck_steps: episode.stuck_steps(),
            complexity: self.complexity,
            event: Some(t.event),
        };
        if t.status.is_done() {
            debug!(
                event = t.event.as_str(),
                steps = info.step,
                reward = t.reward,
                "episode finished"
            );
        }

        let episode = self.episode.as_ref().ok_or(EnvError::NotReset)?;
        Ok(StepResult {
            observation: self.observe_episode(episode),
            reward: t.reward,
            terminated: t.status == EpisodeStatus::Terminated,
            truncated: t.status == EpisodeStatus::Truncated,
            info,
        })
    }

    /// Observation for the current state.
    pub fn observe(&self) -> Result<Observation> {
        let episode = self.episode.as_ref().ok_or(EnvError::NotReset)?;
        Ok(self.observe_episode(episode))
    }

    fn observe_episode(&self, episode: &Episode) -> Observation {
        let mut values = vec![0.0; self.cfg.observation_len()];
        let [dx, dy] = episode.target_offset();
        values[0] = dx;
        values[1] = dy;
        lidar::sense_into(
            episode.agent().center(),
            self.arena.grid(),
            self.arena.mapper(),
            self.max_range,
            &mut values[2..],
        );
        Observation { values }
    }

    /// Borrowed view of everything a renderer needs. `None` before `reset`.
    pub fn scene(&self) -> Option<Scene<'_>> {
        let episode = self.episode.as_ref()?;
        Some(Scene {
            agent: episode.agent(),
            target: episode.target(),
            walls: self.arena.walls(),
            width: self.arena.width(),
            height: self.arena.height(),
        })
    }

    /// Hand the current scene to `renderer`.
    pub fn render(&self, renderer: &mut dyn Renderer) -> Result<()> {
        self.ensure_open()?;
        let scene = self.scene().ok_or(EnvError::NotReset)?;
        renderer.draw(&scene);
        Ok(())
    }

    /// Raise complexity by one increment (capped at 1.0) and regenerate the
    /// maze. The current episode keeps its occupant positions.
    ///
    /// Those positions are not re-validated: the new layout may put a wall
    /// over the agent or target. An agent inside a wall bumps on every move
    /// until the stuck check truncates the episode; call [`MazeEnv::reset`]
    /// to respawn both on open tiles.
    pub fn increase_complexity(&mut self) -> f32 {
        self.complexity = (self.complexity + self.cfg.complexity_step).min(EnvConfig::MAX_COMPLEXITY);
        self.regenerate();
        self.complexity
    }

    fn regenerate(&mut self) {
        self.arena = generate_arena(&self.cfg, self.complexity, &mut self.rng);
        self.resets_since_regen = 0;
        if let Some(episode) = self.episode.as_mut() {
            episode.refresh_distance(&self.arena);
        }
    }

    /// Release the environment. Later calls to `reset`/`step` fail.
    pub fn close(&mut self) {
        self.episode = None;
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(EnvError::Closed)
        } else {
            Ok(())
        }
    }
}

fn generate_arena(cfg: &EnvConfig, complexity: f32, rng: &mut StdRng) -> Arena {
    Arena::generate(
        cfg.tiles_w(),
        cfg.tiles_h(),
        TileMapper::new(cfg.tile_size),
        complexity,
        rng,
    )
}
