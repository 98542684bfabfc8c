//! Debounced gesture classification.
//!
//! [`GestureClassifier::classify`] is a pure function of its config, the
//! current [`HandFrame`], the previous [`GestureState`] and the current time.
//! All history it needs (previous cursor, timestamp, dwell timers) lives in
//! the previous state, so nothing is buffered.
//!
//! Raw per-frame booleans are noisy.  A pinch or grab only counts as
//! *confirmed* once it has been held across consecutive observed frames for
//! at least `hold_threshold` seconds; a release resets the dwell to zero.
//! A tick without a hand is a gap, not a release: flags are held and timers
//! paused until the gap outlasts `stale_frame_budget`, after which the state
//! decays to neutral.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frame::{Hand, HandFrame, FINGER_JOINTS, INDEX_TIP, THUMB_TIP, WRIST};

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

/// How a "grab" is recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabRule {
    /// Pinch distance below threshold counts as a grab (closed hand).
    Pinch,
    /// All four non-thumb fingers folded (closed fist).
    Fist,
}

/// Per-game threshold data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GestureConfig {
    /// Landmarks whose distance defines a pinch.
    pub pinch_landmarks:    (usize, usize),
    /// Normalized distance below which the pinch landmarks touch.
    pub pinch_threshold:    f32,
    pub grab_rule:          GrabRule,
    /// Landmark that drives the on-screen cursor.
    pub cursor_landmark:    usize,
    /// Seconds a pinch/grab must be held before it is confirmed.
    pub hold_threshold:     f32,
    /// Minimum per-frame normalized delta that counts as movement.
    pub movement_threshold: f32,
    /// Seconds of sub-threshold motion before the hand counts as stopped.
    pub stop_moving_after:  f32,
    /// Seconds without a hand before the state decays to neutral.
    pub stale_frame_budget: f32,
    /// Mean landmark confidence below which a hand is ignored.
    pub min_confidence:     f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            pinch_landmarks:    (THUMB_TIP, INDEX_TIP),
            pinch_threshold:    0.05,
            grab_rule:          GrabRule::Pinch,
            cursor_landmark:    WRIST,
            hold_threshold:     1.0,
            movement_threshold: 0.01,
            stop_moving_after:  0.5,
            stale_frame_budget: 0.5,
            min_confidence:     0.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureState
// ════════════════════════════════════════════════════════════════════════════

/// Smoothed vertical motion direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Up,
    Down,
    #[default]
    Level,
}

/// Debounced, timer-qualified interpretation of the hand.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GestureState {
    /// A hand is tracked (or was, within the stale-frame budget).
    pub hand_present:        bool,
    pub pinching:            bool,
    pub grabbing:            bool,
    /// No finger folded.
    pub open:                bool,
    pub pinch_confirmed:     bool,
    pub grab_confirmed:      bool,
    /// Rising edge of `grab_confirmed` on this tick.
    pub grab_just_confirmed: bool,
    /// Normalized cursor position.
    pub cursor:              (f32, f32),
    pub is_moving:           bool,
    pub vertical:            Vertical,
    pub is_still_for:        f32,
    pub pinch_held_for:      f32,
    pub grab_held_for:       f32,
    /// Seconds since the last tick that saw a hand.
    pub stale_for:           f32,
    /// Time of the tick that produced this state.
    pub timestamp:           Option<f32>,
}

impl Default for GestureState {
    fn default() -> Self {
        GestureState {
            hand_present:        false,
            pinching:            false,
            grabbing:            false,
            open:                false,
            pinch_confirmed:     false,
            grab_confirmed:      false,
            grab_just_confirmed: false,
            cursor:              (0.5, 0.5),
            is_moving:           false,
            vertical:            Vertical::Level,
            is_still_for:        0.0,
            pinch_held_for:      0.0,
            grab_held_for:       0.0,
            stale_for:           0.0,
            timestamp:           None,
        }
    }
}

impl GestureState {
    /// Hand is travelling upward (screen y decreasing) right now.
    pub fn moving_up(&self) -> bool {
        self.vertical == Vertical::Up && self.is_moving
    }

    /// Grab dwell progress `0.0..=1.0`, for cursor feedback.
    pub fn grab_progress(&self, hold_threshold: f32) -> f32 {
        if !self.grabbing { return 0.0; }
        if hold_threshold <= 0.0 { return 1.0; }
        (self.grab_held_for / hold_threshold).min(1.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct GestureClassifier {
    pub config: GestureConfig,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        GestureClassifier { config }
    }

    /// Derive the next state from `frame`, the previous state and `now`
    /// (seconds on the caller's clock).
    pub fn classify(&self, frame: &HandFrame, prev: &GestureState, now: f32) -> GestureState {
        let dt = prev.timestamp.map_or(0.0, |t| (now - t).max(0.0));
        match frame.primary_hand(self.config.min_confidence) {
            Some(hand) => self.observe(hand, prev, now, dt),
            None       => self.hold(prev, now, dt),
        }
    }

    fn observe(&self, hand: &Hand, prev: &GestureState, now: f32, dt: f32) -> GestureState {
        let cfg = &self.config;

        let (a, b)   = cfg.pinch_landmarks;
        let pinching = hand.distance(a, b) < cfg.pinch_threshold;
        let folded   = hand.folded_fingers();
        let grabbing = match cfg.grab_rule {
            GrabRule::Pinch => pinching,
            GrabRule::Fist  => folded == FINGER_JOINTS.len(),
        };

        let pinch_held_for = dwell(pinching, prev.pinching, prev.pinch_held_for, dt);
        let grab_held_for  = dwell(grabbing, prev.grabbing, prev.grab_held_for, dt);
        let pinch_confirmed = pinching && pinch_held_for >= cfg.hold_threshold;
        let grab_confirmed  = grabbing && grab_held_for >= cfg.hold_threshold;
        let grab_just_confirmed = grab_confirmed && !prev.grab_confirmed;
        if grab_just_confirmed {
            debug!("grab confirmed after {:.2}s", grab_held_for);
        }

        let p = hand.point(cfg.cursor_landmark);
        let cursor = (p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0));

        let th = cfg.movement_threshold;
        let (is_moving, is_still_for, vertical) = if prev.hand_present {
            let dx = cursor.0 - prev.cursor.0;
            let dy = cursor.1 - prev.cursor.1;
            if dx.abs() > th || dy.abs() > th {
                let vertical = if dy < -th {
                    Vertical::Up
                } else if dy > th {
                    Vertical::Down
                } else {
                    prev.vertical
                };
                (true, 0.0, vertical)
            } else {
                let still  = prev.is_still_for + dt;
                let moving = prev.is_moving && still <= cfg.stop_moving_after;
                (moving, still, if moving { prev.vertical } else { Vertical::Level })
            }
        } else {
            (false, 0.0, Vertical::Level)
        };

        GestureState {
            hand_present: true,
            pinching,
            grabbing,
            open: folded == 0,
            pinch_confirmed,
            grab_confirmed,
            grab_just_confirmed,
            cursor,
            is_moving,
            vertical,
            is_still_for,
            pinch_held_for,
            grab_held_for,
            stale_for: 0.0,
            timestamp: Some(now),
        }
    }

    /// No usable hand this tick.
    fn hold(&self, prev: &GestureState, now: f32, dt: f32) -> GestureState {
        let stale_for = prev.stale_for + dt;
        if !prev.hand_present || stale_for > self.config.stale_frame_budget {
            if prev.hand_present {
                debug!("hand lost for {:.2}s, decaying to neutral", stale_for);
            }
            return GestureState {
                cursor:    prev.cursor,
                stale_for,
                timestamp: Some(now),
                ..GestureState::default()
            };
        }
        GestureState {
            grab_just_confirmed: false,
            stale_for,
            timestamp: Some(now),
            ..*prev
        }
    }
}

/// Continuous-dwell timer: grows while the flag stays up, zero otherwise.
fn dwell(now_on: bool, was_on: bool, held_for: f32, dt: f32) -> f32 {
    if now_on && was_on { held_for + dt } else { 0.0 }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Landmark, LANDMARK_COUNT};

    /// Hand at wrist position (x, y) with the pinch tips `gap` apart.
    fn hand(x: f32, y: f32, gap: f32, fist: bool) -> HandFrame {
        let mut points = vec![Landmark::new(x, y); LANDMARK_COUNT];
        for &(tip, pip) in FINGER_JOINTS.iter() {
            points[pip] = Landmark::new(x, y - 0.09);
            points[tip] = Landmark::new(x, if fist { y - 0.04 } else { y - 0.13 });
        }
        points[THUMB_TIP] = Landmark::new(points[INDEX_TIP].x + gap, points[INDEX_TIP].y);
        HandFrame::single(Hand::new(points))
    }

    fn run(c: &GestureClassifier, frames: &[(f32, HandFrame)]) -> GestureState {
        frames.iter().fold(GestureState::default(), |s, (t, f)| c.classify(f, &s, *t))
    }

    #[test]
    fn pinch_not_confirmed_before_hold_threshold() {
        let c = GestureClassifier::default();
        let s = run(&c, &[(0.0, hand(0.5, 0.5, 0.03, false)), (0.2, hand(0.5, 0.5, 0.03, false))]);
        assert!(s.pinching);
        assert!(!s.pinch_confirmed);
        assert!((s.pinch_held_for - 0.2).abs() < 1e-5);
    }

    #[test]
    fn pinch_confirms_after_hold() {
        let c = GestureClassifier::default();
        let frames: Vec<_> = (0..=12).map(|i| (i as f32 * 0.1, hand(0.5, 0.5, 0.03, false))).collect();
        let s = run(&c, &frames);
        assert!(s.pinch_confirmed);
        assert!(s.grab_confirmed, "default grab rule follows the pinch");
    }

    #[test]
    fn release_resets_dwell() {
        let c = GestureClassifier::default();
        let s = run(&c, &[
            (0.0, hand(0.5, 0.5, 0.03, false)),
            (0.6, hand(0.5, 0.5, 0.03, false)),
            (0.7, hand(0.5, 0.5, 0.20, false)),
            (0.8, hand(0.5, 0.5, 0.03, false)),
            (1.5, hand(0.5, 0.5, 0.03, false)),
        ]);
        assert!(!s.pinch_confirmed);
        assert!((s.pinch_held_for - 0.7).abs() < 1e-5);
    }

    #[test]
    fn fist_rule_needs_all_four_fingers() {
        let c = GestureClassifier::new(GestureConfig { grab_rule: GrabRule::Fist, ..GestureConfig::default() });
        let s = c.classify(&hand(0.5, 0.5, 0.3, true), &GestureState::default(), 0.0);
        assert!(s.grabbing);
        assert!(!s.open);

        let mut open = hand(0.5, 0.5, 0.3, true);
        open.hands[0].landmarks[INDEX_TIP].y = 0.2;
        let s = c.classify(&open, &GestureState::default(), 0.0);
        assert!(!s.grabbing);

        let s = c.classify(&hand(0.5, 0.5, 0.3, false), &GestureState::default(), 0.0);
        assert!(s.open);
    }

    #[test]
    fn grab_just_confirmed_is_an_edge() {
        let c = GestureClassifier::new(GestureConfig {
            grab_rule: GrabRule::Fist, hold_threshold: 0.5, ..GestureConfig::default()
        });
        let mut s = GestureState::default();
        let mut edges = 0;
        for i in 0..20 {
            s = c.classify(&hand(0.5, 0.5, 0.3, true), &s, i as f32 * 0.1);
            if s.grab_just_confirmed { edges += 1; }
        }
        assert_eq!(edges, 1);
        assert!(s.grab_confirmed);
    }

    #[test]
    fn gap_holds_flags_without_advancing_timers() {
        let c = GestureClassifier::default();
        let s = run(&c, &[(0.0, hand(0.5, 0.5, 0.03, false)), (0.3, hand(0.5, 0.5, 0.03, false))]);
        let gap = c.classify(&HandFrame::empty(), &s, 0.6);
        assert!(gap.pinching);
        assert!(gap.hand_present);
        assert!((gap.pinch_held_for - 0.3).abs() < 1e-5);

        // Reacquired: only the tick after the gap counts.
        let back = c.classify(&hand(0.5, 0.5, 0.03, false), &gap, 0.7);
        assert!((back.pinch_held_for - 0.4).abs() < 1e-5);
    }

    #[test]
    fn long_gap_decays_to_neutral() {
        let c = GestureClassifier::default();
        let s = run(&c, &[(0.0, hand(0.3, 0.6, 0.03, false)), (0.1, hand(0.3, 0.6, 0.03, false))]);
        let s1 = c.classify(&HandFrame::empty(), &s, 0.4);
        let s2 = c.classify(&HandFrame::empty(), &s1, 0.8);
        assert!(!s2.pinching);
        assert!(!s2.hand_present);
        assert_eq!(s2.pinch_held_for, 0.0);
        assert_eq!(s2.cursor, s.cursor);
    }

    #[test]
    fn upward_motion_needs_threshold() {
        let c = GestureClassifier::default();
        let s0 = c.classify(&hand(0.5, 0.50, 0.3, false), &GestureState::default(), 0.0);
        let jitter = c.classify(&hand(0.5, 0.495, 0.3, false), &s0, 0.016);
        assert_eq!(jitter.vertical, Vertical::Level);
        assert!(!jitter.moving_up());

        let up = c.classify(&hand(0.5, 0.47, 0.3, false), &jitter, 0.033);
        assert!(up.moving_up());

        // Small downward jitter does not flip the direction.
        let wobble = c.classify(&hand(0.5, 0.475, 0.3, false), &up, 0.05);
        assert_eq!(wobble.vertical, Vertical::Up);

        let down = c.classify(&hand(0.5, 0.52, 0.3, false), &wobble, 0.066);
        assert_eq!(down.vertical, Vertical::Down);
    }

    #[test]
    fn stillness_accumulates_then_stops_motion() {
        let c = GestureClassifier::default();
        let mut s = c.classify(&hand(0.2, 0.5, 0.3, false), &GestureState::default(), 0.0);
        s = c.classify(&hand(0.3, 0.5, 0.3, false), &s, 0.1);
        assert!(s.is_moving);
        for i in 2..10 {
            s = c.classify(&hand(0.3, 0.5, 0.3, false), &s, i as f32 * 0.1);
        }
        assert!(!s.is_moving);
        assert!((s.is_still_for - 0.8).abs() < 1e-4);
    }

    #[test]
    fn grab_progress_reports_dwell_fraction() {
        let s = GestureState { grabbing: true, grab_held_for: 0.25, ..GestureState::default() };
        assert!((s.grab_progress(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(GestureState::default().grab_progress(0.5), 0.0);
    }

    #[test]
    fn config_reads_camel_case_and_rejects_other_keys() {
        let c: GestureConfig = serde_json::from_str(r#"{"pinchThreshold": 0.08, "grabRule": "fist"}"#).unwrap();
        assert_eq!(c.pinch_threshold, 0.08);
        assert_eq!(c.grab_rule, GrabRule::Fist);
        assert_eq!(c.hold_threshold, GestureConfig::default().hold_threshold);
        assert!(serde_json::from_str::<GestureConfig>(r#"{"pinch_threshold": 0.08}"#).is_err());
    }
}
