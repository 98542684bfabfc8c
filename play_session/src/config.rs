//! Session configuration and JSON overrides.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use entity_field::{KindSpec, Rect, Size};
use hand_gesture::{GestureConfig, GestureState, GrabRule};
use skill_ladder::{CheckpointPolicy, ProfileTable};

use crate::pick::PickRules;
use crate::selection::MatchRules;

// ════════════════════════════════════════════════════════════════════════════
// Game kinds and interaction modes
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Pinch rising balloons.
    Balloon,
    /// Close the hand on falling leaves.
    Leaf,
    /// Scoop swimming fish with an upward fist.
    Fish,
    /// Drag each animal onto its shadow.
    Shadow,
    /// Point at the one box that differs from the rest.
    Odd,
}

impl GameKind {
    pub const ALL: [GameKind; 5] =
        [GameKind::Balloon, GameKind::Leaf, GameKind::Fish, GameKind::Shadow, GameKind::Odd];

    pub fn title(self) -> &'static str {
        match self {
            GameKind::Balloon => "Balloon Pop",
            GameKind::Leaf    => "Leaf Catching",
            GameKind::Fish    => "Fish Catching",
            GameKind::Shadow  => "Jungle Shadow Matcher",
            GameKind::Odd     => "Spot the Odd One",
        }
    }
}

/// Gesture condition under which the cursor catches what it touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchRule {
    /// Raw pinch, no hold.
    Pinching,
    /// Raw grab, no hold.
    Grabbing,
    /// Grab held past the hold threshold.
    GrabConfirmed,
    /// Grab while the hand travels upward.
    GrabMovingUp,
}

impl CatchRule {
    pub fn satisfied(self, g: &GestureState) -> bool {
        match self {
            CatchRule::Pinching      => g.pinching,
            CatchRule::Grabbing      => g.grabbing,
            CatchRule::GrabConfirmed => g.grab_confirmed,
            CatchRule::GrabMovingUp  => g.grabbing && g.moving_up(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Mode {
    /// Moving entities caught directly by the cursor.
    Catch { rule: CatchRule, points: u32 },
    /// Static board played through the selection state machine.
    Match(MatchRules),
    /// Static board of look-alike boxes; dwell on the odd one.
    Pick(PickRules),
}

// ════════════════════════════════════════════════════════════════════════════
// SessionConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub game:                        GameKind,
    /// Player-profile track this game reads and writes.
    pub track:                       String,
    pub gesture:                     GestureConfig,
    pub ladder:                      ProfileTable,
    pub checkpoints:                 CheckpointPolicy,
    pub mode:                        Mode,
    pub kinds:                       Vec<KindSpec>,
    /// Field rectangle, px. Normalized cursor positions map onto it.
    pub bounds:                      Rect,
    /// Catch area around the cursor.
    pub cursor_size:                 Size,
    pub max_score:                   u32,
    pub seed:                        u64,
    /// A level change starts a fresh round (stats, board) in the same session.
    pub restart_round_on_transition: bool,
    /// Rounds after which the session ends.
    pub max_rounds:                  Option<u32>,
    /// Meeting the objective sets the score to `max_score`.
    pub fill_score_on_objective:     bool,
    /// Seconds a level banner stays up.
    pub banner_seconds:              f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        crate::games::preset(GameKind::Balloon)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Overrides (--config file)
// ════════════════════════════════════════════════════════════════════════════

/// Partial config read from JSON; every present field replaces the preset's.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionOverrides {
    pub track:                       Option<String>,
    pub gesture:                     Option<GestureOverrides>,
    pub ladder:                      Option<ProfileTable>,
    pub checkpoints:                 Option<CheckpointPolicy>,
    pub mode:                        Option<Mode>,
    pub kinds:                       Option<Vec<KindSpec>>,
    pub bounds:                      Option<Rect>,
    pub cursor_size:                 Option<Size>,
    pub max_score:                   Option<u32>,
    pub seed:                        Option<u64>,
    pub restart_round_on_transition: Option<bool>,
    pub max_rounds:                  Option<u32>,
    pub fill_score_on_objective:     Option<bool>,
    pub banner_seconds:              Option<f32>,
}

impl SessionOverrides {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid session config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn apply(self, cfg: &mut SessionConfig) {
        if let Some(v) = self.track       { cfg.track = v; }
        if let Some(v) = self.gesture     { v.apply(&mut cfg.gesture); }
        if let Some(v) = self.ladder      { cfg.ladder = v; }
        if let Some(v) = self.checkpoints { cfg.checkpoints = v; }
        if let Some(v) = self.mode        { cfg.mode = v; }
        if let Some(v) = self.kinds       { cfg.kinds = v; }
        if let Some(v) = self.bounds      { cfg.bounds = v; }
        if let Some(v) = self.cursor_size { cfg.cursor_size = v; }
        if let Some(v) = self.max_score   { cfg.max_score = v; }
        if let Some(v) = self.seed        { cfg.seed = v; }
        if let Some(v) = self.restart_round_on_transition { cfg.restart_round_on_transition = v; }
        if let Some(v) = self.max_rounds  { cfg.max_rounds = Some(v); }
        if let Some(v) = self.fill_score_on_objective { cfg.fill_score_on_objective = v; }
        if let Some(v) = self.banner_seconds { cfg.banner_seconds = v; }
    }
}

/// Gesture thresholds to change; the rest keep the preset's values.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GestureOverrides {
    pub pinch_landmarks:    Option<(usize, usize)>,
    pub pinch_threshold:    Option<f32>,
    pub grab_rule:          Option<GrabRule>,
    pub cursor_landmark:    Option<usize>,
    pub hold_threshold:     Option<f32>,
    pub movement_threshold: Option<f32>,
    pub stop_moving_after:  Option<f32>,
    pub stale_frame_budget: Option<f32>,
    pub min_confidence:     Option<f32>,
}

impl GestureOverrides {
    pub fn apply(self, g: &mut GestureConfig) {
        if let Some(v) = self.pinch_landmarks    { g.pinch_landmarks = v; }
        if let Some(v) = self.pinch_threshold    { g.pinch_threshold = v; }
        if let Some(v) = self.grab_rule          { g.grab_rule = v; }
        if let Some(v) = self.cursor_landmark    { g.cursor_landmark = v; }
        if let Some(v) = self.hold_threshold     { g.hold_threshold = v; }
        if let Some(v) = self.movement_threshold { g.movement_threshold = v; }
        if let Some(v) = self.stop_moving_after  { g.stop_moving_after = v; }
        if let Some(v) = self.stale_frame_budget { g.stale_frame_budget = v; }
        if let Some(v) = self.min_confidence     { g.min_confidence = v; }
    }
}
