//! Success-gated complexity escalation.

use std::collections::VecDeque;

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::env::MazeEnv;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CurriculumConfig {
    /// Episodes considered when judging success.
    pub window: usize,
    /// Catch rate over a full window required to promote.
    pub promote_at: f32,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            window: 20,
            promote_at: 0.8,
        }
    }
}

/// Watches episode outcomes and raises maze complexity once the agent is
/// reliably catching the target.
#[derive(Debug, Clone)]
pub struct Curriculum {
    cfg: CurriculumConfig,
    recent: VecDeque<bool>,
    promotions: u32,
}

impl Curriculum {
    pub fn new(cfg: CurriculumConfig) -> Self {
        let window = cfg.window.max(1);
        Self {
            cfg: CurriculumConfig { window, ..cfg },
            recent: VecDeque::with_capacity(window),
            promotions: 0,
        }
    }

    pub fn promotions(&self) -> u32 {
        self.promotions
    }

    /// Record one outcome. True when the window is full and good enough.
    pub fn record(&mut self, caught: bool) -> bool {
        self.recent.push_back(caught);
        if self.recent.len() > self.cfg.window {
            self.recent.pop_front();
        }
        if self.recent.len() < self.cfg.window {
            return false;
        }
        let rate = self.recent.iter().filter(|&&c| c).count() as f32 / self.cfg.window as f32;
        rate >= self.cfg.promote_at
    }

    /// Record an outcome for `env` and promote it when earned.
    ///
    /// Returns the new complexity on promotion. Environments already at the
    /// ceiling are left alone.
    pub fn observe(&mut self, env: &mut MazeEnv, caught: bool) -> Option<f32> {
        if !self.record(caught) || env.complexity() >= EnvConfig::MAX_COMPLEXITY {
            return None;
        }
        let c = env.increase_complexity();
        self.promotions += 1;
        // Judge the harder maze on fresh evidence only.
        self.recent.clear();
        debug!(complexity = c, promotions = self.promotions, "curriculum promotion");
        Some(c)
    }
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::new(CurriculumConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_a_full_window() {
        let mut c = Curriculum::new(CurriculumConfig {
            window: 4,
            promote_at: 0.75,
        });
        assert!(!c.record(true));
        assert!(!c.record(true));
        assert!(!c.record(false));
        assert!(c.record(true));
        // Sliding: [true, false, true, false] = 0.5.
        assert!(!c.record(false));
    }

    #[test]
    fn promotes_env_and_starts_a_fresh_window() {
        let mut env = MazeEnv::new(EnvConfig::default().with_complexity(0.5), 1).unwrap();
        let mut c = Curriculum::new(CurriculumConfig {
            window: 3,
            promote_at: 1.0,
        });
        assert_eq!(c.observe(&mut env, true), None);
        assert_eq!(c.observe(&mut env, true), None);
        let promoted = c.observe(&mut env, true).unwrap();
        assert!((promoted - 0.6).abs() < 1e-6);
        assert_eq!(c.promotions(), 1);
        assert_eq!(c.observe(&mut env, true), None);
    }

    #[test]
    fn stops_at_the_ceiling() {
        let mut env = MazeEnv::new(EnvConfig::default().with_complexity(1.0), 1).unwrap();
        let mut c = Curriculum::new(CurriculumConfig {
            window: 1,
            promote_at: 0.5,
        });
        assert_eq!(c.observe(&mut env, true), None);
        assert_eq!(c.promotions(), 0);
        assert_eq!(env.complexity(), 1.0);
    }
}
