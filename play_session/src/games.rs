//! Built-in game presets.
//!
//! Speeds in the level tables are px/s at a 1280×720 field; the frame-based
//! speeds the games were tuned with run at 60 fps.

use entity_field::{Direction, KindSpec, Motion, Rect, Role, Size};
use hand_gesture::frame::{INDEX_TIP, MIDDLE_MCP, WRIST};
use hand_gesture::{GestureConfig, GrabRule};
use skill_ladder::{CheckpointPolicy, LevelProfile, ProfileTable};

use crate::config::{CatchRule, GameKind, Mode, SessionConfig};
use crate::pick::PickRules;
use crate::selection::MatchRules;

pub const FIELD: Rect = Rect { x: 0.0, y: 0.0, w: 1280.0, h: 720.0 };

/// Animals on the shadow-matching board, in board order.
pub const ANIMALS: [&str; 6] = ["elephant", "lion", "monkey", "giraffe", "rabbit", "bird"];

const FPS: f32 = 60.0;

fn per_frame(lo: f32, hi: f32) -> (f32, f32) {
    (lo * FPS, hi * FPS)
}

pub fn preset(game: GameKind) -> SessionConfig {
    match game {
        GameKind::Balloon => balloon(),
        GameKind::Leaf    => leaf(),
        GameKind::Fish    => fish(),
        GameKind::Shadow  => shadow(),
        GameKind::Odd     => odd_one_out(),
    }
}

fn base(game: GameKind, track: &str) -> SessionConfig {
    SessionConfig {
        game,
        track:                       track.to_string(),
        gesture:                     GestureConfig::default(),
        ladder:                      ProfileTable::single(level(3, (60.0, 120.0), 0.5, 60.0, 20, 5, None)),
        checkpoints:                 CheckpointPolicy::default(),
        mode:                        Mode::Catch { rule: CatchRule::Pinching, points: 1 },
        kinds:                       Vec::new(),
        bounds:                      FIELD,
        cursor_size:                 Size::new(100.0, 100.0),
        max_score:                   100,
        seed:                        0,
        restart_round_on_transition: false,
        max_rounds:                  None,
        fill_score_on_objective:     false,
        banner_seconds:              2.0,
    }
}

fn level(
    count:    usize,
    speed:    (f32, f32),
    interval: f32,
    duration: f32,
    up:       u32,
    down:     u32,
    objective: Option<u32>,
) -> LevelProfile {
    LevelProfile {
        entity_count:     count,
        speed_range:      speed,
        spawn_interval:   interval,
        size_jitter:      0.0,
        session_duration: duration,
        up_threshold:     up,
        down_threshold:   down,
        objective,
    }
}

// ── Balloon Pop ───────────────────────────────────────────────────────────

fn balloon() -> SessionConfig {
    let mut cfg = base(GameKind::Balloon, "balloon");
    cfg.gesture = GestureConfig {
        pinch_threshold: 0.08,
        cursor_landmark: INDEX_TIP,
        ..GestureConfig::default()
    };
    cfg.ladder = ProfileTable::single(level(1, per_frame(2.0, 5.0), 1.0, 100.0, 15, 0, None))
        .then(level(2, per_frame(3.0, 7.0), 0.8, 100.0, 25, 8, None))
        .then(level(3, per_frame(4.0, 8.0), 0.6, 100.0, 40, 12, None));
    cfg.mode = Mode::Catch { rule: CatchRule::Pinching, points: 1 };
    cfg.kinds = vec![
        KindSpec::new("red", Role::Free, Motion::Rise, Size::new(90.0, 120.0)),
        KindSpec::new("blue", Role::Free, Motion::Rise, Size::new(90.0, 120.0)),
        KindSpec::new("yellow", Role::Free, Motion::Rise, Size::new(90.0, 120.0)),
    ];
    cfg.cursor_size = Size::new(40.0, 40.0);
    cfg
}

// ── Leaf Catching ─────────────────────────────────────────────────────────

fn leaf() -> SessionConfig {
    let mut cfg = base(GameKind::Leaf, "motor");
    cfg.gesture = GestureConfig {
        pinch_threshold: 0.05,
        grab_rule:       GrabRule::Pinch,
        ..GestureConfig::default()
    };
    cfg.ladder = ProfileTable::single(level(10, per_frame(1.0, 3.0), 0.75, 120.0, 20, 5, None))
        .then(level(8,  per_frame(2.0, 4.0), 0.55, 120.0, 20, 5, None))
        .then(level(6,  per_frame(3.0, 5.0), 0.35, 120.0, 20, 5, None));
    cfg.checkpoints = CheckpointPolicy { every: Some(80.0), at_session_end: true };
    cfg.mode = Mode::Catch { rule: CatchRule::Grabbing, points: 1 };
    let drift = |primary| Motion::JitterDrift { primary: Box::new(primary), jitter: 40.0 };
    cfg.kinds = vec![
        KindSpec::new("maple", Role::Free, drift(Motion::Fall), Size::new(50.0, 50.0)),
        KindSpec::new("oak", Role::Free, drift(Motion::Fall), Size::new(50.0, 50.0)),
    ];
    cfg
}

// ── Fish Catching ─────────────────────────────────────────────────────────

fn fish() -> SessionConfig {
    let mut cfg = base(GameKind::Fish, "fish");
    cfg.gesture = GestureConfig {
        grab_rule:          GrabRule::Fist,
        movement_threshold: 0.02,
        cursor_landmark:    MIDDLE_MCP,
        ..GestureConfig::default()
    };
    let school = |count, speed, interval| LevelProfile {
        size_jitter: 0.3,
        ..level(count, speed, interval, 60.0, 60, 30, None)
    };
    cfg.ladder = ProfileTable::single(school(15, per_frame(3.0, 5.0), 0.4))
        .then(school(10, per_frame(1.0, 3.0), 0.6))
        .then(school(5, per_frame(1.0, 2.0), 0.8));
    cfg.checkpoints = CheckpointPolicy { every: Some(40.0), at_session_end: true };
    cfg.mode = Mode::Catch { rule: CatchRule::GrabMovingUp, points: 1 };
    let lane = (0.5, 1.0);
    let swimmer = |label: &str, direction| {
        let mut k = KindSpec::new(label, Role::Free, Motion::Lateral { direction, lane }, Size::new(50.0, 50.0));
        k.hitbox_scale = 1.0 / 1.4;
        k
    };
    cfg.kinds = vec![swimmer("clownfish", Direction::Right), swimmer("bluefish", Direction::Left)];
    cfg.cursor_size = Size::new(150.0, 150.0);
    cfg
}

// ── Jungle Shadow Matcher ─────────────────────────────────────────────────

fn shadow() -> SessionConfig {
    let mut cfg = base(GameKind::Shadow, "cognitive");
    cfg.gesture = GestureConfig {
        grab_rule:       GrabRule::Fist,
        cursor_landmark: WRIST,
        hold_threshold:  1.0,
        ..GestureConfig::default()
    };
    cfg.ladder = ProfileTable::single(level(2, (0.0, 0.0), 0.0, 40.0, 2, 0, Some(2)))
        .then(level(4, (0.0, 0.0), 0.0, 60.0, 4, 2, Some(4)))
        .then(level(6, (0.0, 0.0), 0.0, 80.0, 6, 4, Some(6)));
    cfg.checkpoints = CheckpointPolicy { every: None, at_session_end: true };
    cfg.mode = Mode::Match(MatchRules::default());
    cfg.kinds = ANIMALS
        .iter()
        .flat_map(|a| {
            [
                KindSpec::new(a, Role::Source, Motion::Static, Size::new(120.0, 120.0)),
                KindSpec::new(a, Role::Target, Motion::Static, Size::new(120.0, 120.0)),
            ]
        })
        .collect();
    cfg.cursor_size = Size::new(60.0, 60.0);
    cfg.restart_round_on_transition = true;
    cfg.max_rounds = Some(2);
    cfg.fill_score_on_objective = true;
    cfg
}

// ── Spot the Odd One ──────────────────────────────────────────────────────

/// Box kinds on the odd-one-out board; the first is the odd one.
pub const ODD_BOXES: [&str; 2] = ["odd", "same"];

fn odd_one_out() -> SessionConfig {
    let mut cfg = base(GameKind::Odd, "cognitive");
    cfg.gesture = GestureConfig {
        cursor_landmark: INDEX_TIP,
        ..GestureConfig::default()
    };
    // One find per board climbs a level; a board left unsolved drops one.
    cfg.ladder = ProfileTable::single(level(4, (0.0, 0.0), 0.0, 60.0, 1, 1, Some(1)))
        .then(level(6, (0.0, 0.0), 0.0, 120.0, 1, 1, Some(1)))
        .then(level(9, (0.0, 0.0), 0.0, 180.0, 1, 1, Some(1)));
    cfg.checkpoints = CheckpointPolicy { every: None, at_session_end: true };
    cfg.mode = Mode::Pick(PickRules { odd_kind: 0, ..PickRules::default() });
    cfg.kinds = ODD_BOXES
        .iter()
        .map(|label| KindSpec::new(label, Role::Free, Motion::Static, Size::new(160.0, 160.0)))
        .collect();
    cfg.cursor_size = Size::new(30.0, 30.0);
    cfg.restart_round_on_transition = true;
    cfg.max_rounds = Some(3);
    cfg.fill_score_on_objective = true;
    cfg
}
