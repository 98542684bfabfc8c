//! Read-only view of a session for presenters.
//!
//! A snapshot is everything a renderer or a test needs to draw or inspect one
//! tick: it never borrows from the session.

use serde::Serialize;

use entity_field::{Rect, Role};
use skill_ladder::Transition;

use crate::config::{GameKind, Mode};
use crate::pick::PickRound;
use crate::selection::SelectionRound;
use crate::session::SessionPhase;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id:      u64,
    pub kind:    usize,
    pub label:   String,
    pub role:    Role,
    pub rect:    Rect,
    pub matched: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorView {
    pub rect:          Rect,
    pub hand_present:  bool,
    pub pinching:      bool,
    pub grabbing:      bool,
    /// Fraction of the hold threshold reached by the current grab.
    pub grab_progress: f32,
    pub moving_up:     bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BannerView {
    pub text:  String,
    pub alpha: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    pub game:            GameKind,
    pub mode:            Mode,
    pub track:           String,
    pub level:           u32,
    pub max_level:       u32,
    pub tasks_completed: u32,
    pub score:           u32,
    pub max_score:       u32,
    pub elapsed:         f32,
    pub remaining:       f32,
    pub catches:         u32,
    pub matches:         u32,
    pub objective:       Option<u32>,
    pub round:           u32,
    /// Field rectangle the entity and cursor rects are expressed in.
    pub bounds:          Rect,
    pub entities:        Vec<EntityView>,
    pub cursor:          CursorView,
    pub selection:       SelectionRound,
    pub pick:            PickRound,
    /// Wrong picks on the current board.
    pub strikes:         u32,
    pub banner:          Option<BannerView>,
    pub last_transition: Option<Transition>,
    pub phase:           SessionPhase,
    pub warnings:        Vec<String>,
}

impl RenderSnapshot {
    /// Entity currently held by the selection, if any.
    pub fn selected(&self) -> Option<&EntityView> {
        let id = match self.selection {
            SelectionRound::Idle => return None,
            SelectionRound::Selected { source } | SelectionRound::Confirming { source, .. } => source,
        };
        self.entities.iter().find(|e| e.id == id)
    }

    /// Dwell progress in `[0, 1]` on `id` while it is being pointed at.
    pub fn dwell_on(&self, id: u64) -> Option<f32> {
        let Mode::Pick(rules) = self.mode else { return None };
        match self.pick {
            PickRound::Hovering { target, held_for } if target == id => {
                let need = rules.dwell_threshold;
                Some(if need > 0.0 { (held_for / need).min(1.0) } else { 1.0 })
            }
            _ => None,
        }
    }
}
