//! Per-session counters.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionStats {
    /// Always within `[0, max_score]`.
    pub score:           u32,
    pub max_score:       u32,
    /// Seconds since the current round started.
    pub elapsed:         f32,
    pub catches:         u32,
    pub matches:         u32,
    pub last_checkpoint: f32,
    /// Rounds started after the first (level-change restarts).
    pub round:           u32,
}

impl SessionStats {
    pub fn new(max_score: u32) -> Self {
        SessionStats {
            score:           0,
            max_score,
            elapsed:         0.0,
            catches:         0,
            matches:         0,
            last_checkpoint: 0.0,
            round:           0,
        }
    }

    pub fn reward(&mut self, points: u32) {
        self.score = self.score.saturating_add(points).min(self.max_score);
    }

    pub fn penalize(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
    }

    pub fn fill_score(&mut self) {
        self.score = self.max_score;
    }

    /// Clear everything but the round counter, and count a new round.
    pub fn restart_round(&mut self) {
        let round = self.round + 1;
        *self = SessionStats { round, ..SessionStats::new(self.max_score) };
    }
}
