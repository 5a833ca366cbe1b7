//! # catmaze
//!
//! A maze-chase environment for reinforcement learning: an agent (the cat)
//! hunts a target (the mouse) through a procedurally generated maze.
//!
//! The crate owns the environment dynamics and the reward signal only. Policy
//! learning, drawing and UI live with the caller.
//!
//! ## Quick Start
//!
//! ```
//! use catmaze::prelude::*;
//!
//! let mut env = MazeEnv::new(EnvConfig::default(), 42).unwrap();
//! let (obs, _info) = env.reset(Some(7)).unwrap();
//! assert_eq!(obs.len(), 10);
//!
//! let step = env.step(Action::Right.index() as i64).unwrap();
//! if step.terminated || step.truncated {
//!     env.reset(None).unwrap();
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialize/deserialize configs, observations and stats
//! - `parallel`: Step [`vec_env::VecMazeEnv`] slots on a rayon thread pool
//!
//! ## Modules
//!
//! - [`maze`]: Maze carving, relaxation and the derived arena geometry
//! - [`path`]: Breadth-first shortest paths over open tiles
//! - [`lidar`]: Ray-cast wall distance sensor
//! - [`episode`]: Episode state machine and reward shaping
//! - [`env`]: Trainer-facing facade
//! - [`curriculum`]: Success-gated complexity escalation

#[path = "core/config.rs"]
pub mod config;

#[path = "core/curriculum.rs"]
pub mod curriculum;

#[path = "core/env.rs"]
pub mod env;

#[path = "core/episode.rs"]
pub mod episode;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/geometry.rs"]
pub mod geometry;

#[path = "core/lidar.rs"]
pub mod lidar;

#[path = "core/maze.rs"]
pub mod maze;

#[path = "core/path.rs"]
pub mod path;

#[path = "core/stats.rs"]
pub mod stats;

#[path = "core/vec_env.rs"]
pub mod vec_env;

/// Prelude module for convenient imports.
///
/// ```
/// use catmaze::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{EnvConfig, RewardConfig};
    pub use crate::curriculum::{Curriculum, CurriculumConfig};
    pub use crate::env::{
        ActionSpace, MazeEnv, Observation, ObservationSpace, Renderer, Scene, StepInfo, StepResult,
    };
    pub use crate::episode::{Action, EpisodeStatus, StepEvent};
    pub use crate::error::EnvError;
    pub use crate::geometry::{Rect, TileMapper, TilePos};
    pub use crate::maze::{Arena, MazeGrid, Tile};
    pub use crate::stats::EpisodeStats;
    pub use crate::vec_env::{VecMazeEnv, VecStep};
}
