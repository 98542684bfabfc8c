//! Point-and-dwell picking for odd-one-out boards.
//!
//! ```text
//!          cursor on a box                 dwell reached
//!   Idle ─────────────────▶ Hovering ─────────────────────▶ Spent
//!    ▲                         │                              │
//!    └──── cursor leaves ──────┴──────── cursor leaves ───────┘
//! ```
//!
//! Resting the cursor on a box for `dwell_threshold` seconds picks it. The
//! odd box scores; any other box is a strike, and `max_strikes` strikes in a
//! row reset the board. A picked box has to be left before it counts again.

use serde::{Deserialize, Serialize};
use tracing::debug;

use entity_field::{EntityField, Role, Vec2};
use hand_gesture::GestureState;

use crate::stats::SessionStats;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRules {
    /// Kind index of the odd box; every other kind is a decoy.
    pub odd_kind:        usize,
    /// Points per correct pick.
    pub reward:          u32,
    /// Seconds the cursor must rest on a box to pick it.
    pub dwell_threshold: f32,
    /// Wrong picks that reset the board.
    pub max_strikes:     u32,
}

impl Default for PickRules {
    fn default() -> Self {
        PickRules { odd_kind: 0, reward: 25, dwell_threshold: 0.5, max_strikes: 3 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PickRound {
    #[default]
    Idle,
    Hovering { target: u64, held_for: f32 },
    Spent    { target: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PickEvent {
    None,
    Hovering { target: u64 },
    Picked   { target: u64 },
    Strike   { target: u64, strikes: u32 },
    /// The last strike ran out the allowance.
    BoardReset,
}

#[derive(Clone, Debug, Default)]
pub struct BoardPicker {
    rules:   PickRules,
    round:   PickRound,
    strikes: u32,
}

impl BoardPicker {
    pub fn new(rules: PickRules) -> Self {
        BoardPicker { rules, round: PickRound::Idle, strikes: 0 }
    }

    pub fn round(&self) -> PickRound { self.round }

    pub fn strikes(&self) -> u32 { self.strikes }

    pub fn rules(&self) -> &PickRules { &self.rules }

    /// Forget the hover and the strikes, for a fresh board.
    pub fn reset(&mut self) {
        self.round = PickRound::Idle;
        self.strikes = 0;
    }

    /// Advance by one tick. `cursor` is in field coordinates.
    pub fn step(
        &mut self,
        gesture: &GestureState,
        cursor:  Vec2,
        field:   &EntityField,
        dt:      f32,
        stats:   &mut SessionStats,
    ) -> PickEvent {
        let over = if gesture.hand_present {
            field.entity_at(cursor, Role::Free).map(|e| (e.id, e.kind))
        } else {
            None
        };
        let Some((id, kind)) = over else {
            self.round = PickRound::Idle;
            return PickEvent::None;
        };

        match self.round {
            PickRound::Spent { target } if target == id => PickEvent::None,

            PickRound::Hovering { target, held_for } if target == id => {
                let held_for = held_for + dt;
                if held_for < self.rules.dwell_threshold {
                    self.round = PickRound::Hovering { target, held_for };
                    return PickEvent::Hovering { target };
                }
                self.round = PickRound::Spent { target };
                if kind == self.rules.odd_kind {
                    stats.reward(self.rules.reward);
                    stats.matches += 1;
                    debug!("odd box #{} found, score now {}", target, stats.score);
                    return PickEvent::Picked { target };
                }
                self.strikes += 1;
                debug!("strike {} of {} on #{}", self.strikes, self.rules.max_strikes, target);
                if self.strikes >= self.rules.max_strikes {
                    self.strikes = 0;
                    return PickEvent::BoardReset;
                }
                PickEvent::Strike { target, strikes: self.strikes }
            }

            _ => {
                self.round = PickRound::Hovering { target: id, held_for: 0.0 };
                PickEvent::Hovering { target: id }
            }
        }
    }
}
