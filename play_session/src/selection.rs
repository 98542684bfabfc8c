//! Drag-to-match selection for board games.
//!
//! ```text
//!            confirmed grab on a source
//!   Idle ───────────────────────────────▶ Selected
//!    ▲  ▲                                  │  ▲
//!    │  │ release                 hover a  │  │ leave the target
//!    │  └──────────────────────── target   ▼  │
//!    │         mismatch / match ◀──── Confirming (dwell timer)
//! ```
//!
//! Labels are compared as soon as a target is hovered: a mismatch costs the
//! penalty right away and drops the selection. A matching target has to be
//! held for `confirm_threshold` seconds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use entity_field::{EntityField, Role, Vec2};
use hand_gesture::GestureState;

use crate::stats::SessionStats;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRules {
    /// Points per correct match.
    pub reward:            u32,
    /// Points lost per wrong drop.
    pub penalty:           u32,
    /// Seconds a matching target must be hovered.
    pub confirm_threshold: f32,
}

impl Default for MatchRules {
    fn default() -> Self {
        MatchRules { reward: 17, penalty: 5, confirm_threshold: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SelectionRound {
    #[default]
    Idle,
    Selected   { source: u64 },
    Confirming { source: u64, target: u64, held_for: f32 },
}

/// What happened on one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SelectionEvent {
    None,
    Selected   { source: u64 },
    Hovering   { source: u64, target: u64 },
    LeftTarget { source: u64 },
    Released,
    Matched    { source: u64, target: u64 },
    Mismatched { source: u64, target: u64 },
}

#[derive(Clone, Debug, Default)]
pub struct SelectionStateMachine {
    rules: MatchRules,
    round: SelectionRound,
}

impl SelectionStateMachine {
    pub fn new(rules: MatchRules) -> Self {
        SelectionStateMachine { rules, round: SelectionRound::Idle }
    }

    pub fn round(&self) -> SelectionRound { self.round }

    pub fn rules(&self) -> &MatchRules { &self.rules }

    /// Drop any selection.
    pub fn reset(&mut self) {
        self.round = SelectionRound::Idle;
    }

    /// Advance by one tick. `cursor` is in field coordinates.
    pub fn step(
        &mut self,
        gesture: &GestureState,
        cursor:  Vec2,
        field:   &mut EntityField,
        dt:      f32,
        stats:   &mut SessionStats,
    ) -> SelectionEvent {
        match self.round {
            SelectionRound::Idle => {
                if !gesture.grab_confirmed { return SelectionEvent::None; }
                match field.entity_at(cursor, Role::Source) {
                    Some(src) => {
                        let source = src.id;
                        debug!("selected {} #{}", src.label, source);
                        self.round = SelectionRound::Selected { source };
                        SelectionEvent::Selected { source }
                    }
                    None => SelectionEvent::None,
                }
            }

            SelectionRound::Selected { source } => {
                if !gesture.grabbing {
                    self.round = SelectionRound::Idle;
                    return SelectionEvent::Released;
                }
                let Some(target) = field.entity_at(cursor, Role::Target).map(|t| t.id) else {
                    return SelectionEvent::None;
                };
                if !same_label(field, source, target) {
                    stats.penalize(self.rules.penalty);
                    debug!("mismatch #{} on #{}, score now {}", source, target, stats.score);
                    self.round = SelectionRound::Idle;
                    return SelectionEvent::Mismatched { source, target };
                }
                self.round = SelectionRound::Confirming { source, target, held_for: 0.0 };
                SelectionEvent::Hovering { source, target }
            }

            SelectionRound::Confirming { source, target, held_for } => {
                if !gesture.grabbing {
                    self.round = SelectionRound::Idle;
                    return SelectionEvent::Released;
                }
                let over = field.entity_at(cursor, Role::Target).map(|t| t.id) == Some(target);
                if !over {
                    self.round = SelectionRound::Selected { source };
                    return SelectionEvent::LeftTarget { source };
                }
                let held_for = held_for + dt;
                if held_for < self.rules.confirm_threshold {
                    self.round = SelectionRound::Confirming { source, target, held_for };
                    return SelectionEvent::Hovering { source, target };
                }
                field.mark_matched(source);
                field.mark_matched(target);
                stats.reward(self.rules.reward);
                stats.matches += 1;
                debug!("matched #{} with #{}, score now {}", source, target, stats.score);
                self.round = SelectionRound::Idle;
                SelectionEvent::Matched { source, target }
            }
        }
    }
}

fn same_label(field: &EntityField, a: u64, b: u64) -> bool {
    match (field.entity(a), field.entity(b)) {
        (Some(a), Some(b)) => a.label == b.label,
        _ => false,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
