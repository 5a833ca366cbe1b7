//! Per-episode state: occupant boxes, counters and the tick transition.

use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{EnvConfig, RewardConfig};
use crate::error::{EnvError, Result};
use crate::geometry::{Rect, TilePos};
use crate::maze::Arena;
use crate::path::{shortest_distance, unreachable_distance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpisodeStatus {
    Running,
    /// The agent caught the target.
    Terminated,
    /// Stuck for too long, or the step budget ran out.
    Truncated,
}

impl EpisodeStatus {
    pub fn is_done(self) -> bool {
        self != EpisodeStatus::Running
    }
}

/// Discrete movement actions. Indices follow the trainer-facing contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Fails on anything outside `0..=3`; invalid actions are never clamped.
    pub fn from_index(i: i64) -> Result<Self> {
        match i {
            0 => Ok(Action::Up),
            1 => Ok(Action::Down),
            2 => Ok(Action::Left),
            3 => Ok(Action::Right),
            _ => Err(EnvError::InvalidAction(i)),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_action_str(action: &str) -> Option<Self> {
        match action {
            "up" => Some(Action::Up),
            "down" => Some(Action::Down),
            "left" => Some(Action::Left),
            "right" => Some(Action::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
        }
    }

    /// Pixel displacement for one tick.
    pub fn delta(self, speed: f32) -> (f32, f32) {
        match self {
            Action::Up => (0.0, -speed),
            Action::Down => (0.0, speed),
            Action::Left => (-speed, 0.0),
            Action::Right => (speed, 0.0),
        }
    }
}

impl TryFrom<i64> for Action {
    type Error = EnvError;

    fn try_from(i: i64) -> Result<Self> {
        Action::from_index(i)
    }
}

/// What happened on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StepEvent {
    Moved,
    Bump,
    Caught,
    Stuck,
    TimeLimit,
}

impl StepEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            StepEvent::Moved => "moved",
            StepEvent::Bump => "bump",
            StepEvent::Caught => "caught",
            StepEvent::Stuck => "stuck",
            StepEvent::TimeLimit => "time_limit",
        }
    }
}

/// Outcome of one [`Episode::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub reward: f32,
    pub hit_wall: bool,
    /// BFS distance after the move.
    pub distance: u32,
    pub event: StepEvent,
    pub status: EpisodeStatus,
}

#[derive(Debug, Clone)]
pub struct Episode {
    agent: Rect,
    target: Rect,
    status: EpisodeStatus,
    steps: u32,
    stuck_steps: u32,
    stuck_anchor: (f32, f32),
    last_distance: u32,
}

impl Episode {
    /// Place the agent on a random floor tile and the target on a random floor
    /// tile whose box does not touch the agent's.
    pub fn spawn<R: Rng + ?Sized>(arena: &Arena, cfg: &EnvConfig, rng: &mut R) -> Result<Self> {
        let agent_tile = *arena
            .floor_tiles()
            .choose(rng)
            .ok_or(EnvError::InvalidPlacement("maze has no open tile"))?;
        let agent = occupant(arena, agent_tile, cfg.agent_size);

        let free: Vec<TilePos> = arena
            .floor_tiles()
            .iter()
            .copied()
            .filter(|t| !occupant(arena, *t, cfg.target_size).intersects(&agent))
            .collect();
        let target_tile = *free
            .choose(rng)
            .ok_or(EnvError::InvalidPlacement("no open tile left for the target"))?;

        Ok(Self::start(arena, agent, occupant(arena, target_tile, cfg.target_size)))
    }

    /// Place both occupants on explicit tiles.
    pub fn place(
        arena: &Arena,
        cfg: &EnvConfig,
        agent_tile: TilePos,
        target_tile: TilePos,
    ) -> Result<Self> {
        let grid = arena.grid();
        if !grid.is_open(agent_tile) {
            return Err(EnvError::InvalidPlacement("agent tile is not open"));
        }
        if !grid.is_open(target_tile) {
            return Err(EnvError::InvalidPlacement("target tile is not open"));
        }
        let agent = occupant(arena, agent_tile, cfg.agent_size);
        let target = occupant(arena, target_tile, cfg.target_size);
        if agent.intersects(&target) {
            return Err(EnvError::InvalidPlacement("agent and target overlap"));
        }
        Ok(Self::start(arena, agent, target))
    }

    fn start(arena: &Arena, agent: Rect, target: Rect) -> Self {
        let mut ep = Self {
            agent,
            target,
            status: EpisodeStatus::Running,
            steps: 0,
            stuck_steps: 0,
            stuck_anchor: agent.center(),
            last_distance: 0,
        };
        ep.refresh_distance(arena);
        ep
    }

    pub fn agent(&self) -> Rect {
        self.agent
    }

    pub fn target(&self) -> Rect {
        self.target
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn stuck_steps(&self) -> u32 {
        self.stuck_steps
    }

    /// BFS distance as of the last reset/step.
    pub fn last_distance(&self) -> u32 {
        self.last_distance
    }

    pub fn agent_tile(&self, arena: &Arena) -> Option<TilePos> {
        arena.tile_of(&self.agent)
    }

    pub fn target_tile(&self, arena: &Arena) -> Option<TilePos> {
        arena.tile_of(&self.target)
    }

    /// Target centre minus agent centre, in pixels.
    pub fn target_offset(&self) -> [f32; 2] {
        [self.target.cx - self.agent.cx, self.target.cy - self.agent.cy]
    }

    /// Recompute the cached BFS distance against `arena` (after a regeneration).
    pub fn refresh_distance(&mut self, arena: &Arena) {
        self.last_distance = self.distance(arena);
    }

    fn distance(&self, arena: &Arena) -> u32 {
        match (self.agent_tile(arena), self.target_tile(arena)) {
            (Some(a), Some(t)) => shortest_distance(arena.grid(), a, t),
            _ => unreachable_distance(arena.grid()),
        }
    }

    /// Advance one tick. A finished episode is left untouched and reports
    /// [`EnvError::EpisodeOver`].
    pub fn step(&mut self, arena: &Arena, cfg: &EnvConfig, action: Action) -> Result<Transition> {
        if self.status.is_done() {
            return Err(EnvError::EpisodeOver);
        }

        let before = self.agent;
        let (dx, dy) = action.delta(cfg.move_speed as f32);
        let moved = before.translated(dx, dy);

        // A blocked move is rejected outright rather than slid along the wall.
        let hit_wall = arena.collides(&moved);
        let next = if hit_wall { before } else { moved };
        self.agent = next.clamped_to(arena.width(), arena.height());
        self.steps = self.steps.saturating_add(1);

        let distance = self.distance(arena);
        let mut reward = shaped_reward(self.last_distance, distance, hit_wall, &cfg.reward);
        self.last_distance = distance;

        let event;
        if self.agent.intersects(&self.target) {
            self.status = EpisodeStatus::Terminated;
            reward = catch_reward(self.steps, cfg.max_steps, &cfg.reward);
            event = StepEvent::Caught;
        } else {
            self.track_stuck(cfg.stuck_radius);
            if self.stuck_steps >= cfg.stuck_step_ceiling {
                self.status = EpisodeStatus::Truncated;
                reward -= cfg.reward.stuck_penalty;
                event = StepEvent::Stuck;
            } else if self.steps >= cfg.max_steps {
                self.status = EpisodeStatus::Truncated;
                event = StepEvent::TimeLimit;
            } else if hit_wall {
                event = StepEvent::Bump;
            } else {
                event = StepEvent::Moved;
            }
        }

        Ok(Transition {
            reward,
            hit_wall,
            distance,
            event,
            status: self.status,
        })
    }

    fn track_stuck(&mut self, radius: f32) {
        let (ax, ay) = self.stuck_anchor;
        let moved = (self.agent.cx - ax).hypot(self.agent.cy - ay);
        if moved > radius {
            self.stuck_anchor = self.agent.center();
            self.stuck_steps = 0;
        } else {
            self.stuck_steps = self.stuck_steps.saturating_add(1);
        }
    }
}

fn occupant(arena: &Arena, t: TilePos, size: u32) -> Rect {
    let (cx, cy) = arena.mapper().tile_center(t);
    Rect::square(cx, cy, size as f32)
}

/// Non-terminal reward: progress along the maze graph minus the running costs.
pub fn shaped_reward(prev: u32, cur: u32, hit_wall: bool, w: &RewardConfig) -> f32 {
    let progress = prev as f32 - cur as f32;
    let mut r = progress * w.shaping_weight - w.step_penalty - w.distance_penalty * cur as f32;
    if hit_wall {
        r -= w.wall_penalty;
    }
    r
}

/// Terminal reward for catching the target after `steps` ticks.
pub fn catch_reward(steps: u32, max_steps: u32, w: &RewardConfig) -> f32 {
    let max_steps = max_steps.max(1);
    let remaining = max_steps.saturating_sub(steps) as f32 / max_steps as f32;
    w.catch_reward + w.catch_speed_bonus * remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TileMapper;
    use crate::maze::MazeGrid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arena(rows: &[&str]) -> Arena {
        Arena::new(MazeGrid::from_ascii(rows).unwrap(), TileMapper::new(40))
    }

    fn cfg_for(a: &Arena) -> EnvConfig {
        EnvConfig::with_tiles(a.grid().w(), a.grid().h(), 40)
    }

    #[test]
    fn actions_map_to_indices() {
        for (i, a) in Action::ALL.iter().enumerate() {
            assert_eq!(Action::from_index(i as i64), Ok(*a));
            assert_eq!(a.index(), i);
            assert_eq!(Action::from_action_str(a.as_str()), Some(*a));
        }
        assert_eq!(Action::try_from(4), Err(EnvError::InvalidAction(4)));
        assert_eq!(Action::try_from(-1), Err(EnvError::InvalidAction(-1)));
    }

    #[test]
    fn spawn_never_overlaps() {
        let a = Arena::generate(9, 7, TileMapper::new(40), 0.5, &mut StdRng::seed_from_u64(1));
        let cfg = cfg_for(&a);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let ep = Episode::spawn(&a, &cfg, &mut rng).unwrap();
            assert!(!ep.agent().intersects(&ep.target()));
            assert!(!a.collides(&ep.agent()));
            assert!(!a.collides(&ep.target()));
            assert_eq!(ep.steps(), 0);
            assert_eq!(ep.stuck_steps(), 0);
            let at = ep.agent_tile(&a).unwrap();
            let tt = ep.target_tile(&a).unwrap();
            assert_eq!(ep.last_distance(), shortest_distance(a.grid(), at, tt));
        }
    }

    #[test]
    fn spawn_needs_two_tiles() {
        let a = arena(&["###", "#.#", "###"]);
        let cfg = cfg_for(&a);
        assert_eq!(
            Episode::spawn(&a, &cfg, &mut StdRng::seed_from_u64(0)).unwrap_err(),
            EnvError::InvalidPlacement("no open tile left for the target")
        );
    }

    #[test]
    fn wall_hits_leave_the_agent_in_place() {
        let a = arena(&["#####", "#...#", "#####"]);
        let cfg = cfg_for(&a);
        let mut ep = Episode::place(&a, &cfg, TilePos::new(1, 1), TilePos::new(3, 1)).unwrap();

        // 8px of slack above the agent: two free moves, then the wall.
        for _ in 0..2 {
            let t = ep.step(&a, &cfg, Action::Up).unwrap();
            assert!(!t.hit_wall);
        }
        let before = ep.agent();
        let t = ep.step(&a, &cfg, Action::Up).unwrap();
        assert!(t.hit_wall);
        assert_eq!(t.event, StepEvent::Bump);
        assert_eq!(ep.agent(), before);
    }

    #[test]
    fn reward_terms_stack() {
        let w = RewardConfig::default();
        // One tile of progress at distance 3.
        let r = shaped_reward(4, 3, false, &w);
        assert!((r - (10.0 - 0.05 - 0.03)).abs() < 1e-5);
        // No progress into a wall at distance 3.
        let r = shaped_reward(3, 3, true, &w);
        assert!((r - (-0.05 - 0.03 - 5.0)).abs() < 1e-5);
    }

    #[test]
    fn faster_catches_pay_more() {
        let w = RewardConfig::default();
        assert_eq!(catch_reward(0, 1000, &w), 2000.0);
        assert!(catch_reward(10, 1000, &w) > catch_reward(500, 1000, &w));
        assert_eq!(catch_reward(1000, 1000, &w), 1000.0);
        assert_eq!(catch_reward(5000, 1000, &w), 1000.0);
    }

    #[test]
    fn boxed_in_agent_truncates_at_the_ceiling() {
        // Two sealed pockets: the agent can never reach the target.
        let a = arena(&["#####", "#.#.#", "#####"]);
        let cfg = cfg_for(&a).with_stuck(40.0, 25);
        let mut ep = Episode::place(&a, &cfg, TilePos::new(1, 1), TilePos::new(3, 1)).unwrap();
        assert_eq!(ep.last_distance(), unreachable_distance(a.grid()));

        let mut last = None;
        for i in 1..=25 {
            let action = Action::ALL[i % 4];
            let t = ep.step(&a, &cfg, action).unwrap();
            if i < 25 {
                assert_eq!(t.status, EpisodeStatus::Running, "truncated early at step {i}");
            }
            last = Some(t);
        }
        let t = last.unwrap();
        assert_eq!(t.status, EpisodeStatus::Truncated);
        assert_eq!(t.event, StepEvent::Stuck);
        assert!(t.reward <= -cfg.reward.stuck_penalty);
        assert_eq!(ep.stuck_steps(), 25);
    }

    #[test]
    fn leaving_the_radius_resets_the_stuck_counter() {
        let a = arena(&["#########", "#.......#", "#########"]);
        let cfg = cfg_for(&a).with_stuck(10.0, 50);
        let mut ep = Episode::place(&a, &cfg, TilePos::new(1, 1), TilePos::new(7, 1)).unwrap();

        // 4px per tick: still inside the 10px radius after two moves.
        ep.step(&a, &cfg, Action::Right).unwrap();
        ep.step(&a, &cfg, Action::Right).unwrap();
        assert_eq!(ep.stuck_steps(), 2);
        // Third move puts the agent 12px from the anchor.
        ep.step(&a, &cfg, Action::Right).unwrap();
        assert_eq!(ep.stuck_steps(), 0);
    }

    #[test]
    fn finished_episodes_refuse_to_step() {
        let a = arena(&["#####", "#...#", "#####"]);
        let cfg = cfg_for(&a).with_move_speed(40);
        let mut ep = Episode::place(&a, &cfg, TilePos::new(1, 1), TilePos::new(2, 1)).unwrap();
        let t = ep.step(&a, &cfg, Action::Right).unwrap();
        assert_eq!(t.status, EpisodeStatus::Terminated);

        let agent = ep.agent();
        assert_eq!(ep.step(&a, &cfg, Action::Left), Err(EnvError::EpisodeOver));
        assert_eq!(ep.status(), EpisodeStatus::Terminated);
        assert_eq!(ep.steps(), 1);
        assert_eq!(ep.agent(), agent);
    }

    #[test]
    fn step_budget_truncates_without_penalty() {
        let a = arena(&["#########", "#.......#", "#########"]);
        let cfg = cfg_for(&a).with_max_steps(3);
        let mut ep = Episode::place(&a, &cfg, TilePos::new(1, 1), TilePos::new(7, 1)).unwrap();
        ep.step(&a, &cfg, Action::Right).unwrap();
        ep.step(&a, &cfg, Action::Right).unwrap();
        let t = ep.step(&a, &cfg, Action::Right).unwrap();
        assert_eq!(t.event, StepEvent::TimeLimit);
        assert_eq!(t.status, EpisodeStatus::Truncated);
        assert!(t.reward > -1.0);
    }
}
