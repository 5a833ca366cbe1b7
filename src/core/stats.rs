use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const RECENT_CAP: usize = 200;

/// Running tally of finished episodes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpisodeStats {
    pub episodes: u32,
    pub caught: u32,
    pub truncated: u32,
    pub total_reward: f64,
    pub total_steps: u64,
    pub best_steps: Option<u32>,
    /// Outcome of the most recent episodes (true = caught), oldest first.
    pub recent: VecDeque<bool>,
    pub learning_at_episode: Option<u32>,
    pub learned_at_episode: Option<u32>,
    pub mastered_at_episode: Option<u32>,
}

impl EpisodeStats {
    pub fn new() -> Self {
        Self {
            episodes: 0,
            caught: 0,
            truncated: 0,
            total_reward: 0.0,
            total_steps: 0,
            best_steps: None,
            recent: VecDeque::with_capacity(RECENT_CAP),
            learning_at_episode: None,
            learned_at_episode: None,
            mastered_at_episode: None,
        }
    }

    pub fn record_episode(&mut self, caught: bool, reward: f32, steps: u32) {
        self.episodes += 1;
        if caught {
            self.caught += 1;
            self.best_steps = Some(self.best_steps.map_or(steps, |b| b.min(steps)));
        } else {
            self.truncated += 1;
        }
        self.total_reward += reward as f64;
        self.total_steps += steps as u64;

        self.recent.push_back(caught);
        if self.recent.len() > RECENT_CAP {
            self.recent.pop_front();
        }
        self.update_milestones();
    }

    fn update_milestones(&mut self) {
        // Too few episodes say nothing about mastery.
        if self.episodes < 20 {
            return;
        }
        let r = self.last_n_rate(100);
        if self.learning_at_episode.is_none() && r >= 0.70 {
            self.learning_at_episode = Some(self.episodes);
        }
        if self.learned_at_episode.is_none() && r >= 0.85 {
            self.learned_at_episode = Some(self.episodes);
        }
        if self.mastered_at_episode.is_none() && r >= 0.95 {
            self.mastered_at_episode = Some(self.episodes);
        }
    }

    pub fn success_rate(&self) -> f32 {
        if self.episodes == 0 {
            0.0
        } else {
            self.caught as f32 / self.episodes as f32
        }
    }

    /// Catch rate over the last `n` episodes (fewer if not enough recorded).
    pub fn last_n_rate(&self, n: usize) -> f32 {
        let n = n.min(self.recent.len());
        if n == 0 {
            return 0.0;
        }
        let caught = self.recent.iter().rev().take(n).filter(|&&c| c).count();
        caught as f32 / n as f32
    }

    pub fn mean_reward(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.total_reward / self.episodes as f64
        }
    }

    pub fn mean_steps(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.total_steps as f64 / self.episodes as f64
        }
    }
}

impl Default for EpisodeStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_and_rates() {
        let mut s = EpisodeStats::new();
        s.record_episode(true, 1500.0, 40);
        s.record_episode(false, -120.0, 150);
        s.record_episode(true, 1800.0, 25);
        assert_eq!(s.episodes, 3);
        assert_eq!(s.caught, 2);
        assert_eq!(s.truncated, 1);
        assert_eq!(s.best_steps, Some(25));
        assert!((s.success_rate() - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(s.last_n_rate(2), 0.5);
        assert!((s.mean_steps() - 215.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn milestones_wait_for_enough_episodes() {
        let mut s = EpisodeStats::new();
        for _ in 0..19 {
            s.record_episode(true, 1000.0, 10);
        }
        assert_eq!(s.learning_at_episode, None);
        s.record_episode(true, 1000.0, 10);
        assert_eq!(s.learning_at_episode, Some(20));
        assert_eq!(s.mastered_at_episode, Some(20));
    }

    #[test]
    fn recent_window_is_bounded() {
        let mut s = EpisodeStats::new();
        for i in 0..(RECENT_CAP + 50) {
            s.record_episode(i % 2 == 0, 0.0, 1);
        }
        assert_eq!(s.recent.len(), RECENT_CAP);
    }
}
