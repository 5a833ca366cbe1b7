//! Episode loop, run options and the JSON summary.

use std::path::{Path, PathBuf};

use catmaze::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::policy::{OraclePolicy, Policy, RandomPolicy};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{0}")]
    Usage(String),
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Env(#[from] EnvError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Random,
    Oracle,
}

impl PolicyKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "random" => Some(PolicyKind::Random),
            "oracle" => Some(PolicyKind::Oracle),
            _ => None,
        }
    }

    fn build(self, seed: u64) -> Box<dyn Policy> {
        match self {
            PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
            PolicyKind::Oracle => Box::new(OraclePolicy),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub episodes: u32,
    pub seed: u64,
    pub policy: PolicyKind,
    pub config: Option<PathBuf>,
    pub curriculum: bool,
    pub summary: Option<PathBuf>,
    pub max_steps: Option<u32>,
    pub complexity: Option<f32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            episodes: 100,
            seed: 0,
            policy: PolicyKind::Random,
            config: None,
            curriculum: false,
            summary: None,
            max_steps: None,
            complexity: None,
        }
    }
}

impl RunOptions {
    /// Load the JSON config (if any) and apply the flag overrides.
    pub fn env_config(&self) -> Result<EnvConfig, RunError> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => EnvConfig::default(),
        };
        if let Some(max_steps) = self.max_steps {
            cfg.max_steps = max_steps;
        }
        if let Some(complexity) = self.complexity {
            cfg.initial_complexity = complexity;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn load_config(path: &Path) -> Result<EnvConfig, RunError> {
    let text = std::fs::read_to_string(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| RunError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub policy: PolicyKind,
    pub seed: u64,
    pub episodes: u32,
    pub caught: u32,
    pub success_rate: f32,
    pub mean_reward: f64,
    pub mean_steps: f64,
    pub best_steps: Option<u32>,
    pub final_complexity: f32,
    pub promotions: u32,
}

pub fn run(opts: &RunOptions) -> Result<RunSummary, RunError> {
    let cfg = opts.env_config()?;
    let mut env = MazeEnv::new(cfg, opts.seed)?;
    let mut policy = opts.policy.build(opts.seed);
    let mut curriculum = opts.curriculum.then(Curriculum::default);
    let mut stats = EpisodeStats::new();

    info!(
        policy = policy.name(),
        episodes = opts.episodes,
        complexity = env.complexity(),
        "run started"
    );

    for episode in 0..opts.episodes {
        let seed = (episode == 0).then_some(opts.seed);
        let (mut obs, _) = env.reset(seed)?;
        let mut total = 0.0f32;

        let last = loop {
            let action = policy.act(&env, &obs);
            let r = env.step_action(action)?;
            total += r.reward;
            if r.done() {
                break r;
            }
            obs = r.observation;
        };

        let caught = last.terminated;
        stats.record_episode(caught, total, last.info.step);
        info!(
            episode,
            caught,
            steps = last.info.step,
            reward = total,
            event = last.info.event.map_or("none", StepEvent::as_str),
            "episode finished"
        );

        if let Some(c) = curriculum.as_mut() {
            if let Some(complexity) = c.observe(&mut env, caught) {
                info!(complexity, "complexity raised");
                if occupants_in_walls(&env) {
                    warn!(complexity, "regenerated maze walls over the occupants");
                }
            }
        }
    }

    let summary = RunSummary {
        policy: opts.policy,
        seed: opts.seed,
        episodes: stats.episodes,
        caught: stats.caught,
        success_rate: stats.success_rate(),
        mean_reward: stats.mean_reward(),
        mean_steps: stats.mean_steps(),
        best_steps: stats.best_steps,
        final_complexity: env.complexity(),
        promotions: curriculum.as_ref().map_or(0, Curriculum::promotions),
    };
    debug!(?summary, "run finished");
    env.close();
    Ok(summary)
}

fn occupants_in_walls(env: &MazeEnv) -> bool {
    env.episode().is_some_and(|ep| {
        env.arena().collides(&ep.agent()) || env.arena().collides(&ep.target())
    })
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), RunError> {
    let json = serde_json::to_string_pretty(summary).map_err(|source| RunError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })
}
