//! A batch of independent environments stepped together.
//!
//! Each slot owns its own `MazeEnv` (nothing is shared between slots). Finished
//! episodes are reset automatically; the observation that ended the episode is
//! kept in `final_observations` so a trainer can still bootstrap from it.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::EnvConfig;
use crate::env::{MazeEnv, Observation, StepInfo};
use crate::episode::Action;
use crate::error::{EnvError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct VecStep {
    pub observations: Vec<Observation>,
    pub rewards: Vec<f32>,
    pub terminated: Vec<bool>,
    pub truncated: Vec<bool>,
    pub infos: Vec<StepInfo>,
    /// Last observation of each episode that ended on this step.
    pub final_observations: Vec<Option<Observation>>,
}

struct SlotStep {
    observation: Observation,
    reward: f32,
    terminated: bool,
    truncated: bool,
    info: StepInfo,
    final_observation: Option<Observation>,
}

#[derive(Debug, Clone)]
pub struct VecMazeEnv {
    envs: Vec<MazeEnv>,
}

impl VecMazeEnv {
    /// `n` environments; slot `i` is seeded with `seed + i`.
    pub fn new(cfg: EnvConfig, n: usize, seed: u64) -> Result<Self> {
        if n == 0 {
            return Err(EnvError::InvalidConfig("need at least one environment"));
        }
        let envs = (0..n)
            .map(|i| MazeEnv::new(cfg, seed.wrapping_add(i as u64)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { envs })
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn envs(&self) -> &[MazeEnv] {
        &self.envs
    }

    pub fn envs_mut(&mut self) -> &mut [MazeEnv] {
        &mut self.envs
    }

    /// Reset every slot. With a seed, slot `i` is reset with `seed + i`.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<Vec<Observation>> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| {
                let s = seed.map(|s| s.wrapping_add(i as u64));
                env.reset(s).map(|(obs, _)| obs)
            })
            .collect()
    }

    /// Step slot `i` with `actions[i]`.
    ///
    /// The whole batch is checked before any slot moves: on error no
    /// environment has been stepped.
    pub fn step(&mut self, actions: &[i64]) -> Result<VecStep> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::ActionCountMismatch {
                expected: self.envs.len(),
                actual: actions.len(),
            });
        }
        for env in &self.envs {
            ready(env)?;
        }
        let actions = actions
            .iter()
            .map(|&a| Action::from_index(a))
            .collect::<Result<Vec<_>>>()?;

        #[cfg(feature = "parallel")]
        let slots: Vec<SlotStep> = self
            .envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, &a)| step_slot(env, a))
            .collect::<Result<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let slots: Vec<SlotStep> = self
            .envs
            .iter_mut()
            .zip(actions.iter())
            .map(|(env, &a)| step_slot(env, a))
            .collect::<Result<Vec<_>>>()?;

        let n = slots.len();
        let mut out = VecStep {
            observations: Vec::with_capacity(n),
            rewards: Vec::with_capacity(n),
            terminated: Vec::with_capacity(n),
            truncated: Vec::with_capacity(n),
            infos: Vec::with_capacity(n),
            final_observations: Vec::with_capacity(n),
        };
        for s in slots {
            out.observations.push(s.observation);
            out.rewards.push(s.reward);
            out.terminated.push(s.terminated);
            out.truncated.push(s.truncated);
            out.infos.push(s.info);
            out.final_observations.push(s.final_observation);
        }
        Ok(out)
    }

    /// Raise complexity in every slot. Returns the new (shared) complexity.
    pub fn increase_complexity(&mut self) -> f32 {
        let mut c = 0.0;
        for env in &mut self.envs {
            c = env.increase_complexity();
        }
        c
    }

    pub fn close(&mut self) {
        for env in &mut self.envs {
            env.close();
        }
    }
}

fn ready(env: &MazeEnv) -> Result<()> {
    if env.is_closed() {
        return Err(EnvError::Closed);
    }
    match env.episode() {
        None => Err(EnvError::NotReset),
        Some(ep) if ep.status().is_done() => Err(EnvError::EpisodeOver),
        Some(_) => Ok(()),
    }
}

fn step_slot(env: &mut MazeEnv, action: Action) -> Result<SlotStep> {
    let r = env.step_action(action)?;
    if !r.done() {
        return Ok(SlotStep {
            observation: r.observation,
            reward: r.reward,
            terminated: r.terminated,
            truncated: r.truncated,
            info: r.info,
            final_observation: None,
        });
    }
    let (fresh, _) = env.reset(None)?;
    Ok(SlotStep {
        observation: fresh,
        reward: r.reward,
        terminated: r.terminated,
        truncated: r.truncated,
        info: r.info,
        final_observation: Some(r.observation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_action_count() {
        let mut v = VecMazeEnv::new(EnvConfig::default(), 3, 0).unwrap();
        v.reset(Some(1)).unwrap();
        assert_eq!(
            v.step(&[0, 1]).unwrap_err(),
            EnvError::ActionCountMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert!(VecMazeEnv::new(EnvConfig::default(), 0, 0).is_err());
    }

    #[test]
    fn rejected_batches_leave_every_slot_untouched() {
        let mut v = VecMazeEnv::new(EnvConfig::default(), 3, 0).unwrap();
        assert_eq!(v.step(&[0, 1, 2]).unwrap_err(), EnvError::NotReset);

        v.reset(Some(1)).unwrap();
        let before: Vec<_> = v.envs().iter().map(|e| e.episode().unwrap().agent()).collect();

        assert_eq!(v.step(&[0, 3, 7]).unwrap_err(), EnvError::InvalidAction(7));
        assert_eq!(v.step(&[-1, 0, 0]).unwrap_err(), EnvError::InvalidAction(-1));
        for (env, agent) in v.envs().iter().zip(&before) {
            assert_eq!(env.episode().unwrap().steps(), 0);
            assert_eq!(env.episode().unwrap().agent(), *agent);
        }

        v.envs_mut()[2].close();
        assert_eq!(v.step(&[0, 1, 2]).unwrap_err(), EnvError::Closed);
        assert_eq!(v.envs()[0].episode().unwrap().steps(), 0);
    }

    #[test]
    fn slots_match_standalone_envs() {
        let cfg = EnvConfig::default();
        let mut v = VecMazeEnv::new(cfg, 2, 40).unwrap();
        let mut solo = MazeEnv::new(cfg, 41).unwrap();

        let obs = v.reset(Some(100)).unwrap();
        let (solo_obs, _) = solo.reset(Some(101)).unwrap();
        assert_eq!(obs[1], solo_obs);

        for i in 0..20i64 {
            let step = v.step(&[i % 4, (i + 1) % 4]).unwrap();
            let r = solo.step((i + 1) % 4).unwrap();
            assert_eq!(step.rewards[1], r.reward);
            if r.done() {
                break;
            }
            assert_eq!(step.observations[1], r.observation);
        }
    }

    #[test]
    fn finished_slots_reset_and_keep_the_final_observation() {
        // Tiny step budget so every slot truncates on the second step.
        let cfg = EnvConfig::default().with_max_steps(2);
        let mut v = VecMazeEnv::new(cfg, 4, 9).unwrap();
        v.reset(None).unwrap();

        let first = v.step(&[0, 1, 2, 3]).unwrap();
        assert!(first.final_observations.iter().all(Option::is_none));

        let second = v.step(&[0, 1, 2, 3]).unwrap();
        for i in 0..4 {
            assert!(second.terminated[i] || second.truncated[i]);
            assert!(second.final_observations[i].is_some());
        }
        for env in v.envs() {
            assert_eq!(env.episode().unwrap().steps(), 0);
        }
    }
}
