//! Checkpointed difficulty evaluation.
//!
//! Performance (catches or matches) accumulates in a window. At each
//! checkpoint the window is compared against the current level's thresholds:
//! level-down is tested first, then level-up, and at most one step is taken.
//! The window resets after every evaluation whether or not the level moved.
//! The session-end checkpoint judges only the tail since the last periodic
//! one, against thresholds scaled to its length.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::profile::{LevelProfile, ProfileTable};
use crate::store::SkillLevel;

/// When checkpoints happen. Both triggers may be active at once.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointPolicy {
    /// Evaluate every `every` seconds of elapsed session time.
    #[serde(default)]
    pub every:          Option<f32>,
    /// Evaluate once more when the session ends normally.
    #[serde(default)]
    pub at_session_end: bool,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        CheckpointPolicy { every: None, at_session_end: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind { Up, Down }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub from: u32,
    pub to:   u32,
}

#[derive(Clone, Debug)]
pub struct DifficultyController {
    table:             ProfileTable,
    policy:            CheckpointPolicy,
    level:             u32,
    tasks_completed:   u32,
    window:            u32,
    last_checkpoint:   f32,
    session_completed: bool,
}

impl DifficultyController {
    /// Start from a stored skill level. Out-of-range levels are clamped.
    pub fn new(table: ProfileTable, skill: SkillLevel) -> Self {
        let level = table.clamp(skill.level);
        if level != skill.level {
            warn!("level {} outside 1..={}, using {}", skill.level, table.max_level(), level);
        }
        DifficultyController {
            table,
            policy:            CheckpointPolicy::default(),
            level,
            tasks_completed:   skill.tasks_completed,
            window:            0,
            last_checkpoint:   0.0,
            session_completed: false,
        }
    }

    /// Set the checkpoint policy.
    pub fn checkpoints(mut self, policy: CheckpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add `n` catches/matches to the current window.
    pub fn record(&mut self, n: u32) {
        self.window = self.window.saturating_add(n);
    }

    /// True when a periodic checkpoint has come due at `elapsed` seconds.
    pub fn checkpoint_due(&self, elapsed: f32) -> bool {
        match self.policy.every {
            Some(every) if every > 0.0 => elapsed - self.last_checkpoint >= every,
            _ => false,
        }
    }

    /// Compare the window against the current thresholds, move at most one
    /// level, and reset the window.
    pub fn evaluate(&mut self, elapsed: f32) -> Option<Transition> {
        self.judge(elapsed, 1.0)
    }

    /// The session-end checkpoint. With periodic checkpoints active, the
    /// tail since the last one is usually shorter than a full period, so the
    /// thresholds shrink in proportion; an empty tail is not judged at all.
    pub fn evaluate_at_end(&mut self, elapsed: f32) -> Option<Transition> {
        let scale = match self.policy.every {
            Some(every) if every > 0.0 => {
                let tail = elapsed - self.last_checkpoint;
                if tail <= 0.0 {
                    return None;
                }
                (tail / every).min(1.0)
            }
            _ => 1.0,
        };
        self.judge(elapsed, scale)
    }

    fn judge(&mut self, elapsed: f32, scale: f32) -> Option<Transition> {
        let tally = self.window;
        let from  = self.level;
        let p     = self.table.get(from);
        let down  = p.down_threshold as f32 * scale;
        let up    = p.up_threshold as f32 * scale;
        let to = if (tally as f32) < down && from > 1 {
            Some((TransitionKind::Down, from - 1))
        } else if tally as f32 >= up && from < self.table.max_level() {
            Some((TransitionKind::Up, from + 1))
        } else {
            None
        };

        self.window = 0;
        self.last_checkpoint = elapsed;

        let (kind, to) = to?;
        self.level = to;
        info!("checkpoint at {:.1}s: {} in window, level {} -> {}", elapsed, tally, from, to);
        Some(Transition { kind, from, to })
    }

    /// Count the session as completed. Only the first call per session counts.
    pub fn complete_session(&mut self) -> bool {
        if self.session_completed {
            return false;
        }
        self.session_completed = true;
        self.tasks_completed += 1;
        true
    }

    /// Start a fresh round: clears the window and checkpoint clock.
    pub fn reset_window(&mut self) {
        self.window = 0;
        self.last_checkpoint = 0.0;
    }

    pub fn profile(&self) -> &LevelProfile {
        self.table.get(self.level)
    }

    pub fn level(&self) -> u32 { self.level }

    pub fn max_level(&self) -> u32 { self.table.max_level() }

    pub fn window_tally(&self) -> u32 { self.window }

    pub fn policy(&self) -> CheckpointPolicy { self.policy }

    pub fn skill(&self) -> SkillLevel {
        SkillLevel { level: self.level, tasks_completed: self.tasks_completed, last_score: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(up: u32, down: u32) -> LevelProfile {
        LevelProfile {
            entity_count:     5,
            speed_range:      (60.0, 90.0),
            spawn_interval:   0.0,
            size_jitter:      0.0,
            session_duration: 60.0,
            up_threshold:     up,
            down_threshold:   down,
            objective:        None,
        }
    }

    fn ladder() -> ProfileTable {
        ProfileTable::new(vec![level(10, 0), level(20, 5), level(30, 10)]).unwrap()
    }

    fn at(level: u32, tasks: u32) -> DifficultyController {
        DifficultyController::new(ladder(), SkillLevel { level, tasks_completed: tasks, last_score: None })
    }

    #[test]
    fn enough_catches_move_up_one_level() {
        let mut c = at(2, 3);
        c.record(22);
        let t = c.evaluate(60.0).unwrap();
        assert_eq!(t, Transition { kind: TransitionKind::Up, from: 2, to: 3 });
        assert_eq!(c.level(), 3);
        assert!(c.complete_session());
        assert_eq!(c.skill().tasks_completed, 4);
    }

    #[test]
    fn poor_window_moves_down() {
        let mut c = at(2, 0);
        c.record(4);
        assert_eq!(c.evaluate(30.0).map(|t| t.kind), Some(TransitionKind::Down));
        assert_eq!(c.level(), 1);
    }

    #[test]
    fn down_is_tested_before_up() {
        // A level whose thresholds overlap: both conditions hold.
        let table = ProfileTable::new(vec![level(1, 0), level(2, 8), level(3, 0)]).unwrap();
        let mut c = DifficultyController::new(table, SkillLevel::default());
        c.record(5);
        let t = c.evaluate(10.0).unwrap();
        assert_eq!(t.kind, TransitionKind::Down);
        assert_eq!(c.level(), 1);
    }

    #[test]
    fn level_stays_within_bounds() {
        let mut top = at(3, 0);
        top.record(1000);
        assert!(top.evaluate(1.0).is_none());
        assert_eq!(top.level(), 3);

        let mut bottom = at(1, 0);
        assert!(bottom.evaluate(1.0).is_none());
        assert_eq!(bottom.level(), 1);

        assert_eq!(at(9, 0).level(), 3);
        assert_eq!(at(0, 0).level(), 1);
    }

    #[test]
    fn window_resets_after_every_evaluation() {
        let mut c = at(2, 0);
        c.record(12);
        assert!(c.evaluate(10.0).is_none());
        assert_eq!(c.window_tally(), 0);
        c.record(12);
        assert!(c.evaluate(20.0).is_none(), "windows do not carry over");
    }

    #[test]
    fn periodic_checkpoints() {
        let c = at(2, 0).checkpoints(CheckpointPolicy { every: Some(15.0), at_session_end: false });
        assert!(!c.checkpoint_due(14.9));
        assert!(c.checkpoint_due(15.0));
        let mut c = c;
        c.record(6);
        c.evaluate(15.0);
        assert!(!c.checkpoint_due(29.0));
        assert!(c.checkpoint_due(30.0));

        assert!(!at(2, 0).checkpoint_due(1e6), "default policy has no periodic checkpoints");
    }

    #[test]
    fn end_checkpoint_right_after_a_periodic_one_is_skipped() {
        let mut c = at(2, 0).checkpoints(CheckpointPolicy { every: Some(15.0), at_session_end: true });
        c.record(12);
        assert!(c.evaluate(15.0).is_none());
        assert!(c.evaluate_at_end(15.0).is_none(), "an empty window is not a poor one");
        assert_eq!(c.level(), 2);
    }

    #[test]
    fn end_checkpoint_scales_thresholds_to_the_tail() {
        let policy = CheckpointPolicy { every: Some(40.0), at_session_end: true };

        let mut strong = at(2, 0).checkpoints(policy);
        strong.record(10);
        assert!(strong.evaluate(40.0).is_none());
        strong.record(11);
        // Half a period: the up threshold of 20 becomes 10.
        assert_eq!(strong.evaluate_at_end(60.0).map(|t| t.kind), Some(TransitionKind::Up));

        let mut steady = at(2, 0).checkpoints(policy);
        steady.record(10);
        steady.evaluate(40.0);
        steady.record(3);
        assert!(steady.evaluate_at_end(60.0).is_none());

        let mut weak = at(2, 0).checkpoints(policy);
        weak.record(10);
        weak.evaluate(40.0);
        weak.record(2);
        assert_eq!(weak.evaluate_at_end(60.0).map(|t| t.kind), Some(TransitionKind::Down));
    }

    #[test]
    fn end_checkpoint_alone_uses_full_thresholds() {
        let mut c = at(2, 0);
        c.record(12);
        assert!(c.evaluate_at_end(30.0).is_none());
        assert_eq!(c.level(), 2);
    }

    #[test]
    fn session_completes_once() {
        let mut c = at(2, 7);
        assert!(c.complete_session());
        assert!(!c.complete_session());
        assert_eq!(c.skill().tasks_completed, 8);
    }
}
