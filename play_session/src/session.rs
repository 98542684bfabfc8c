//! One play session: the per-tick loop that ties gestures, the entity field,
//! scoring, the difficulty ladder and persistence together.
//!
//! Every tick runs in a fixed order:
//!
//! 1. classify the hand frame (a missing frame is a gap, not a release)
//! 2. advance the field
//! 3. resolve catches or the selection round at the cursor
//! 4. recycle entities that left the field
//! 5. advance the clock and banner
//! 6. evaluate a due checkpoint, applying any level change immediately
//! 7. check the end conditions
//!
//! Catch resolution runs before recycling, so an entity that is both caught
//! and exiting on the same tick counts as caught.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use entity_field::{EntityField, FieldError, Rect, Role, SpawnProfile, Vec2};
use hand_gesture::{GestureClassifier, GestureState, HandFrame};
use skill_ladder::{DifficultyController, LevelProfile, ProfileStore, Transition};

use crate::banner::Banner;
use crate::config::{Mode, SessionConfig};
use crate::pick::{BoardPicker, PickEvent};
use crate::selection::{SelectionEvent, SelectionStateMachine};
use crate::snapshot::{BannerView, CursorView, EntityView, RenderSnapshot};
use crate::stats::SessionStats;

// ════════════════════════════════════════════════════════════════════════════
// Types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Field(#[from] FieldError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TimeElapsed,
    ObjectiveMet,
    RoundLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Termination {
    /// Ran to an end condition: counts as a completed task.
    Normal { reason: EndReason },
    /// Quit or lost its input early: progress is not counted.
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum SessionPhase {
    Running,
    Finished { termination: Termination },
}

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub gesture:    GestureState,
    pub caught:     u32,
    pub selection:  SelectionEvent,
    pub pick:       PickEvent,
    pub transition: Option<Transition>,
    pub finished:   Option<Termination>,
}

impl TickReport {
    fn quiet(gesture: GestureState) -> Self {
        TickReport {
            gesture,
            caught:     0,
            selection:  SelectionEvent::None,
            pick:       PickEvent::None,
            transition: None,
            finished:   None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

pub struct Session {
    config:          SessionConfig,
    store:           Box<dyn ProfileStore>,
    classifier:      GestureClassifier,
    gesture:         GestureState,
    controller:      DifficultyController,
    field:           EntityField,
    selection:       SelectionStateMachine,
    picker:          BoardPicker,
    stats:           SessionStats,
    /// Seconds since the session started, across rounds.
    clock:           f32,
    phase:           SessionPhase,
    banner:          Option<Banner>,
    last_transition: Option<Transition>,
    last_score:      Option<u32>,
    /// The last save failed; retry on the way out.
    unsaved:         bool,
    warnings:        Vec<String>,
    rng:             ChaCha8Rng,
}

impl Session {
    /// Load the player's level for the configured track and lay out the field.
    pub fn start(config: SessionConfig, store: Box<dyn ProfileStore>) -> Result<Self, SessionError> {
        let skill = store.load_track(&config.track, config.ladder.max_level());
        let last_score = skill.last_score;
        let controller = DifficultyController::new(config.ladder.clone(), skill)
            .checkpoints(config.checkpoints);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let field = build_field(&config, controller.profile(), &mut rng)?;

        info!(
            "{:?} session on track {:?}: level {}/{}, {} entities",
            config.game, config.track, controller.level(), controller.max_level(), field.live_count(),
        );

        let selection = match config.mode {
            Mode::Match(rules) => SelectionStateMachine::new(rules),
            _ => SelectionStateMachine::default(),
        };
        let picker = match config.mode {
            Mode::Pick(rules) => BoardPicker::new(rules),
            _ => BoardPicker::default(),
        };
        Ok(Session {
            classifier: GestureClassifier::new(config.gesture.clone()),
            gesture: GestureState::default(),
            stats: SessionStats::new(config.max_score),
            controller,
            field,
            selection,
            picker,
            clock: 0.0,
            phase: SessionPhase::Running,
            banner: None,
            last_transition: None,
            last_score,
            unsaved: false,
            warnings: Vec::new(),
            rng,
            config,
            store,
        })
    }

    // ── per-tick loop ─────────────────────────────────────────────────────

    /// Advance the session by `dt` seconds. `None` means no frame arrived.
    /// Once the session has finished this is a no-op.
    pub fn tick(&mut self, frame: Option<&HandFrame>, dt: f32) -> TickReport {
        let mut report = TickReport::quiet(self.gesture);
        if self.is_finished() {
            return report;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += dt;

        let empty = HandFrame::empty();
        self.gesture = self.classifier.classify(frame.unwrap_or(&empty), &self.gesture, self.clock);
        report.gesture = self.gesture;

        self.field.advance(dt);

        let cursor = self.cursor_point();
        match self.config.mode {
            Mode::Catch { rule, points } => {
                if self.gesture.hand_present && rule.satisfied(&self.gesture) {
                    let area = Rect::centered(cursor, self.config.cursor_size);
                    let n = self.field.try_catch(&area, |e| e.role == Role::Free) as u32;
                    if n > 0 {
                        self.stats.catches += n;
                        self.stats.reward(n * points);
                        self.controller.record(n);
                        report.caught = n;
                        debug!("caught {} (total {})", n, self.stats.catches);
                    }
                }
            }
            Mode::Match(_) => {
                let event = self.selection.step(&self.gesture, cursor, &mut self.field, dt, &mut self.stats);
                if let SelectionEvent::Matched { .. } = event {
                    self.controller.record(1);
                }
                report.selection = event;
            }
            Mode::Pick(_) => {
                let event = self.picker.step(&self.gesture, cursor, &self.field, dt, &mut self.stats);
                match event {
                    PickEvent::Picked { .. } => {
                        self.controller.record(1);
                        self.reset_board();
                    }
                    PickEvent::BoardReset => {
                        info!("strikes used up, new board");
                        self.reset_board();
                    }
                    _ => {}
                }
                report.pick = event;
            }
        }

        self.field.recycle_exited();

        self.stats.elapsed += dt;
        if self.banner.as_mut().map_or(false, |b| b.tick(dt)) {
            self.banner = None;
        }

        if self.controller.checkpoint_due(self.stats.elapsed) {
            self.stats.last_checkpoint = self.stats.elapsed;
            if let Some(t) = self.controller.evaluate(self.stats.elapsed) {
                report.transition = Some(t);
                self.announce(t);
                if !self.config.restart_round_on_transition {
                    self.reset_board();
                } else if self.can_restart() {
                    self.start_round();
                } else {
                    self.finish(Termination::Normal { reason: EndReason::RoundLimit });
                    report.finished = Some(Termination::Normal { reason: EndReason::RoundLimit });
                    return report;
                }
            }
        }

        if let Some(reason) = self.round_over() {
            report.finished = self.end_round(reason, &mut report);
        }
        report
    }

    /// End the session early. Tasks are not counted and the score is not
    /// recorded; a level change whose save failed is retried.
    pub fn abort(&mut self) -> Termination {
        if let SessionPhase::Finished { termination } = self.phase {
            return termination;
        }
        self.finish(Termination::Aborted);
        Termination::Aborted
    }

    // ── round and level bookkeeping ───────────────────────────────────────

    fn cursor_point(&self) -> Vec2 {
        let (nx, ny) = self.gesture.cursor;
        self.field.bounds().denormalize(nx, ny)
    }

    fn round_over(&self) -> Option<EndReason> {
        let p = self.controller.profile();
        let progress = match self.config.mode {
            Mode::Catch { .. } => self.stats.catches,
            Mode::Match(_) | Mode::Pick(_) => self.stats.matches,
        };
        if p.objective.map_or(false, |goal| progress >= goal) {
            Some(EndReason::ObjectiveMet)
        } else if self.stats.elapsed >= p.session_duration {
            Some(EndReason::TimeElapsed)
        } else {
            None
        }
    }

    /// Returns the termination, or `None` when a level change started a new
    /// round instead.
    fn end_round(&mut self, reason: EndReason, report: &mut TickReport) -> Option<Termination> {
        if reason == EndReason::ObjectiveMet && self.config.fill_score_on_objective {
            self.stats.fill_score();
        }
        if self.controller.policy().at_session_end {
            if let Some(t) = self.controller.evaluate_at_end(self.stats.elapsed) {
                report.transition = Some(t);
                self.announce(t);
                if self.can_restart() {
                    self.start_round();
                    return None;
                }
            }
        }
        let termination = Termination::Normal { reason };
        self.finish(termination);
        Some(termination)
    }

    fn can_restart(&self) -> bool {
        self.config.restart_round_on_transition
            && self.config.max_rounds.map_or(true, |max| self.stats.round + 1 < max)
    }

    fn start_round(&mut self) {
        self.stats.restart_round();
        self.controller.reset_window();
        self.reset_board();
        info!("round {} at level {}", self.stats.round + 1, self.controller.level());
    }

    /// Rebuild the field for the current level.
    fn reset_board(&mut self) {
        self.selection.reset();
        self.picker.reset();
        let p = self.controller.profile().clone();
        let laid = match self.config.mode {
            Mode::Catch { .. } => {
                self.field.reconfigure(spawn_profile(&p), p.entity_count);
                Ok(())
            }
            Mode::Match(_) => {
                self.field.reconfigure(spawn_profile(&p), 0);
                lay_out_board(&mut self.field, p.entity_count, &mut self.rng)
            }
            Mode::Pick(rules) => {
                self.field.reconfigure(spawn_profile(&p), 0);
                lay_out_odd_board(&mut self.field, p.entity_count, rules.odd_kind, &mut self.rng)
            }
        };
        if let Err(e) = laid {
            warn!("board layout failed: {}", e);
            self.warnings.push(format!("board layout failed: {}", e));
        }
    }

    /// Record a level change and persist it right away.
    fn announce(&mut self, t: Transition) {
        self.last_transition = Some(t);
        self.banner = Some(Banner::level_change(&t, self.config.banner_seconds));
        self.persist();
    }

    fn finish(&mut self, termination: Termination) {
        match termination {
            Termination::Normal { .. } => {
                self.controller.complete_session();
                self.last_score = Some(self.stats.score);
                self.persist();
            }
            Termination::Aborted if self.unsaved => self.persist(),
            Termination::Aborted => {}
        }
        self.phase = SessionPhase::Finished { termination };
        info!(
            "session finished ({:?}): score {}/{}, level {}",
            termination, self.stats.score, self.stats.max_score, self.controller.level(),
        );
    }

    /// Save errors never stop play: they become warnings.
    fn persist(&mut self) {
        let mut skill = self.controller.skill();
        skill.last_score = self.last_score;
        match self.store.save_track(&self.config.track, skill) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!("progress not saved: {}", e);
                self.unsaved = true;
                self.warnings.push(format!("progress not saved: {}", e));
            }
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Finished { .. })
    }

    pub fn phase(&self) -> SessionPhase { self.phase }

    pub fn config(&self) -> &SessionConfig { &self.config }

    pub fn gesture(&self) -> &GestureState { &self.gesture }

    pub fn stats(&self) -> &SessionStats { &self.stats }

    pub fn field(&self) -> &EntityField { &self.field }

    pub fn controller(&self) -> &DifficultyController { &self.controller }

    pub fn last_transition(&self) -> Option<Transition> { self.last_transition }

    pub fn warnings(&self) -> &[String] { &self.warnings }

    pub fn snapshot(&self) -> RenderSnapshot {
        let g = &self.gesture;
        let profile = self.controller.profile();
        let entities = self
            .field
            .entities()
            .iter()
            .map(|e| EntityView {
                id:      e.id,
                kind:    e.kind,
                label:   e.label.clone(),
                role:    e.role,
                rect:    e.rect(),
                matched: e.matched,
            })
            .collect();
        RenderSnapshot {
            game:            self.config.game,
            mode:            self.config.mode,
            track:           self.config.track.clone(),
            level:           self.controller.level(),
            max_level:       self.controller.max_level(),
            tasks_completed: self.controller.skill().tasks_completed,
            score:           self.stats.score,
            max_score:       self.stats.max_score,
            elapsed:         self.stats.elapsed,
            remaining:       (profile.session_duration - self.stats.elapsed).max(0.0),
            catches:         self.stats.catches,
            matches:         self.stats.matches,
            objective:       profile.objective,
            round:           self.stats.round,
            bounds:          self.field.bounds(),
            entities,
            cursor: CursorView {
                rect:          Rect::centered(self.cursor_point(), self.config.cursor_size),
                hand_present:  g.hand_present,
                pinching:      g.pinching,
                grabbing:      g.grabbing,
                grab_progress: g.grab_progress(self.config.gesture.hold_threshold),
                moving_up:     g.moving_up(),
            },
            selection:       self.selection.round(),
            pick:            self.picker.round(),
            strikes:         self.picker.strikes(),
            banner:          self.banner.as_ref().map(|b| BannerView { text: b.text(), alpha: b.alpha() }),
            last_transition: self.last_transition,
            phase:           self.phase,
            warnings:        self.warnings.clone(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Field construction
// ════════════════════════════════════════════════════════════════════════════

fn spawn_profile(p: &LevelProfile) -> SpawnProfile {
    SpawnProfile {
        speed_range:    p.speed_range,
        size_jitter:    p.size_jitter,
        spawn_interval: p.spawn_interval,
    }
}

fn build_field(config: &SessionConfig, p: &LevelProfile, rng: &mut ChaCha8Rng) -> Result<EntityField, FieldError> {
    let seed: u64 = rng.gen();
    match config.mode {
        Mode::Catch { .. } => {
            EntityField::new(config.bounds, config.kinds.clone(), spawn_profile(p), p.entity_count, seed)
        }
        Mode::Match(_) => {
            let mut field = EntityField::new(config.bounds, config.kinds.clone(), spawn_profile(p), 0, seed)?;
            lay_out_board(&mut field, p.entity_count, rng)?;
            Ok(field)
        }
        Mode::Pick(rules) => {
            let mut field = EntityField::new(config.bounds, config.kinds.clone(), spawn_profile(p), 0, seed)?;
            lay_out_odd_board(&mut field, p.entity_count, rules.odd_kind, rng)?;
            Ok(field)
        }
    }
}

/// Place `pairs` source/target pairs: sources on the left half, targets on
/// the right, each side shuffled independently.
fn lay_out_board(field: &mut EntityField, pairs: usize, rng: &mut ChaCha8Rng) -> Result<(), FieldError> {
    let kinds = field.kinds();
    let index_of = |label: &str, role: Role| kinds.iter().position(|k| k.label == label && k.role == role);
    let chosen: Vec<(usize, usize)> = kinds
        .iter()
        .filter(|k| k.role == Role::Source)
        .filter_map(|k| Some((index_of(&k.label, Role::Source)?, index_of(&k.label, Role::Target)?)))
        .take(pairs)
        .collect();
    if chosen.len() < pairs {
        warn!("board wants {} pairs, kinds define {}", pairs, chosen.len());
    }

    let b = field.bounds();
    let mut left  = grid(&b, chosen.len(), 0.08, 0.42);
    let mut right = grid(&b, chosen.len(), 0.58, 0.92);
    left.shuffle(rng);
    right.shuffle(rng);

    for (i, &(src, dst)) in chosen.iter().enumerate() {
        for (kind, center) in [(src, left[i]), (dst, right[i])] {
            let size = field.kinds()[kind].size;
            field.place(kind, center - Vec2::new(size.w / 2.0, size.h / 2.0))?;
        }
    }
    debug!("board laid out with {} pairs", chosen.len());
    Ok(())
}

/// Place `count` boxes: one of kind `odd_kind` at a random cell, the rest of
/// the first other kind. Up to six boxes sit in one row; more form a square
/// grid.
fn lay_out_odd_board(
    field:    &mut EntityField,
    count:    usize,
    odd_kind: usize,
    rng:      &mut ChaCha8Rng,
) -> Result<(), FieldError> {
    if count == 0 {
        return Ok(());
    }
    let kinds = field.kinds();
    if odd_kind >= kinds.len() {
        return Err(FieldError::UnknownKind(odd_kind));
    }
    let Some(decoy) = (0..kinds.len()).find(|&k| k != odd_kind) else {
        warn!("odd-one-out board needs a second kind");
        return Ok(());
    };
    let size = kinds[decoy].size;

    let cols = if count <= 6 { count } else { (count as f32).sqrt().ceil() as usize };
    let rows = (count + cols - 1) / cols;
    let gap = 0.2 * size.w.max(size.h);
    let b = field.bounds();
    let x0 = b.x + (b.w - cols as f32 * (size.w + gap) + gap) / 2.0;
    let y0 = b.y + (b.h - rows as f32 * (size.h + gap) + gap) / 2.0;

    let odd = rng.gen_range(0..count);
    for i in 0..count {
        let (r, c) = (i / cols, i % cols);
        let at = Vec2::new(x0 + c as f32 * (size.w + gap), y0 + r as f32 * (size.h + gap));
        field.place(if i == odd { odd_kind } else { decoy }, at)?;
    }
    debug!("odd-one-out board of {} laid out, odd at cell {}", count, odd);
    Ok(())
}

/// Cell centers of an `n`-cell grid between the fractions `x0..x1` of `b`'s width.
fn grid(b: &Rect, n: usize, x0: f32, x1: f32) -> Vec<Vec2> {
    if n == 0 {
        return Vec::new();
    }
    let cols = if n <= 3 { 1 } else { 2 };
    let rows = (n + cols - 1) / cols;
    let cell_w = (x1 - x0) * b.w / cols as f32;
    let cell_h = 0.8 * b.h / rows as f32;
    (0..n)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            Vec2::new(
                b.x + x0 * b.w + (c as f32 + 0.5) * cell_w,
                b.y + 0.1 * b.h + (r as f32 + 0.5) * cell_h,
            )
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatchRule, GameKind};
    use crate::selection::MatchRules;
    use entity_field::{KindSpec, Motion, Size};
    use hand_gesture::{synthetic_hand, GestureConfig, GrabRule};
    use skill_ladder::{
        CheckpointPolicy, MemoryProfileStore, PlayerProfile, ProfileTable, SkillLevel, TransitionKind,
    };

    const DT: f32 = 1.0 / 60.0;

    fn rising(up: u32, down: u32, objective: Option<u32>) -> LevelProfile {
        LevelProfile {
            entity_count:     1,
            speed_range:      (600.0, 600.0),
            spawn_interval:   0.0,
            size_jitter:      0.0,
            session_duration: 60.0,
            up_threshold:     up,
            down_threshold:   down,
            objective,
        }
    }

    fn catch_config(objective: Option<u32>) -> SessionConfig {
        SessionConfig {
            game:                        GameKind::Balloon,
            track:                       "motor".to_string(),
            gesture:                     GestureConfig::default(),
            ladder:                      ProfileTable::single(rising(10, 0, objective))
                                             .then(rising(20, 5, objective))
                                             .then(rising(30, 10, objective)),
            checkpoints:                 CheckpointPolicy { every: None, at_session_end: true },
            mode:                        Mode::Catch { rule: CatchRule::Pinching, points: 1 },
            kinds:                       vec![KindSpec::new("red", Role::Free, Motion::Rise, Size::new(40.0, 40.0))],
            bounds:                      Rect::new(0.0, 0.0, 800.0, 600.0),
            cursor_size:                 Size::new(800.0, 600.0),
            max_score:                   100,
            seed:                        7,
            restart_round_on_transition: false,
            max_rounds:                  None,
            fill_score_on_objective:     false,
            banner_seconds:              2.0,
        }
    }

    fn store_at(level: u32, tasks: u32) -> MemoryProfileStore {
        let store = MemoryProfileStore::new();
        store.save_track("motor", SkillLevel { level, tasks_completed: tasks, last_score: None }).unwrap();
        store
    }

    fn saved(store: &MemoryProfileStore) -> SkillLevel {
        let doc = store.document().unwrap();
        PlayerProfile::from_json(&doc).unwrap().track("motor").unwrap()
    }

    fn pinch() -> HandFrame {
        HandFrame::single(synthetic_hand(0.5, 0.5, false, true))
    }

    fn open_hand() -> HandFrame {
        HandFrame::single(synthetic_hand(0.5, 0.5, false, false))
    }

    fn run_until_finished(s: &mut Session, frame: &HandFrame) -> u32 {
        let mut ticks = 0;
        while !s.is_finished() && ticks < 100_000 {
            s.tick(Some(frame), DT);
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn strong_session_levels_up_and_counts_a_task() {
        let store = store_at(2, 3);
        let mut s = Session::start(catch_config(Some(22)), Box::new(store.clone())).unwrap();
        assert_eq!(s.controller().level(), 2);

        run_until_finished(&mut s, &pinch());

        assert_eq!(s.phase(), SessionPhase::Finished {
            termination: Termination::Normal { reason: EndReason::ObjectiveMet },
        });
        assert_eq!(s.stats().catches, 22);
        assert_eq!(s.last_transition(), Some(Transition { kind: TransitionKind::Up, from: 2, to: 3 }));
        let skill = saved(&store);
        assert_eq!(skill.level, 3);
        assert_eq!(skill.tasks_completed, 4);
        assert_eq!(skill.last_score, Some(22));
    }

    #[test]
    fn idle_session_times_out_and_levels_down() {
        let store = store_at(2, 0);
        let mut cfg = catch_config(None);
        cfg.ladder = ProfileTable::single(LevelProfile { session_duration: 2.0, ..rising(10, 0, None) })
            .then(LevelProfile { session_duration: 2.0, ..rising(20, 5, None) });
        let mut s = Session::start(cfg, Box::new(store.clone())).unwrap();

        run_until_finished(&mut s, &open_hand());

        assert_eq!(s.phase(), SessionPhase::Finished {
            termination: Termination::Normal { reason: EndReason::TimeElapsed },
        });
        assert_eq!(s.stats().catches, 0);
        assert_eq!(saved(&store), SkillLevel { level: 1, tasks_completed: 1, last_score: Some(0) });
    }

    #[test]
    fn abort_keeps_task_count_and_score() {
        let store = store_at(2, 3);
        let mut s = Session::start(catch_config(None), Box::new(store.clone())).unwrap();
        for _ in 0..30 { s.tick(Some(&pinch()), DT); }
        assert!(s.stats().catches > 0);

        assert_eq!(s.abort(), Termination::Aborted);
        assert_eq!(saved(&store), SkillLevel { level: 2, tasks_completed: 3, last_score: None });
        // Aborting twice, or ticking afterwards, changes nothing.
        assert_eq!(s.abort(), Termination::Aborted);
        let before = s.snapshot();
        s.tick(Some(&pinch()), DT);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn periodic_checkpoint_reconfigures_mid_session() {
        let store = store_at(1, 0);
        let mut cfg = catch_config(None);
        cfg.checkpoints = CheckpointPolicy { every: Some(1.0), at_session_end: false };
        cfg.ladder = ProfileTable::single(rising(5, 0, None))
            .then(LevelProfile { entity_count: 3, ..rising(1000, 0, None) });
        let mut s = Session::start(cfg, Box::new(store.clone())).unwrap();

        let mut transition = None;
        for _ in 0..(3.0 / DT) as usize {
            let r = s.tick(Some(&pinch()), DT);
            if r.transition.is_some() { transition = r.transition; break; }
        }
        assert_eq!(transition, Some(Transition { kind: TransitionKind::Up, from: 1, to: 2 }));
        assert!(!s.is_finished());
        assert_eq!(s.field().target_count(), 3);
        assert_eq!(s.field().live_count(), 3);
        assert!(s.snapshot().banner.is_some());
        // Persisted at once, before the session ends.
        assert_eq!(saved(&store).level, 2);
        assert_eq!(saved(&store).tasks_completed, 0);
    }

    #[test]
    fn end_checkpoint_on_a_periodic_boundary_does_not_judge_an_empty_window() {
        let store = store_at(2, 0);
        let mut cfg = catch_config(None);
        cfg.checkpoints = CheckpointPolicy { every: Some(1.0), at_session_end: true };
        let steady = LevelProfile { session_duration: 2.0, ..rising(1000, 2, None) };
        cfg.ladder = ProfileTable::single(steady.clone()).then(steady.clone()).then(steady);
        let mut s = Session::start(cfg, Box::new(store.clone())).unwrap();

        let mut transitions = Vec::new();
        while !s.is_finished() {
            if let Some(t) = s.tick(Some(&pinch()), 0.125).transition {
                transitions.push(t);
            }
        }

        assert_eq!(s.stats().catches, 16);
        assert!(transitions.is_empty(), "{:?}", transitions);
        assert_eq!(saved(&store), SkillLevel { level: 2, tasks_completed: 1, last_score: Some(16) });
    }

    #[test]
    fn failed_saves_warn_and_are_retried_on_abort() {
        let store = store_at(1, 0);
        let mut cfg = catch_config(None);
        cfg.checkpoints = CheckpointPolicy { every: Some(1.0), at_session_end: false };
        let mut s = Session::start(cfg, Box::new(store.clone())).unwrap();

        store.fail_writes(true);
        let mut moved = false;
        for _ in 0..(3.0 / DT) as usize {
            if s.tick(Some(&pinch()), DT).transition.is_some() { moved = true; break; }
        }
        assert!(moved);
        assert!(!s.is_finished());
        assert_eq!(s.warnings().len(), 1);
        assert_eq!(saved(&store).level, 1);

        store.fail_writes(false);
        s.abort();
        assert_eq!(saved(&store), SkillLevel { level: 2, tasks_completed: 0, last_score: None });
    }

    #[test]
    fn missing_frames_do_not_release_a_pinch() {
        let mut s = Session::start(catch_config(None), Box::new(MemoryProfileStore::new())).unwrap();
        s.tick(Some(&pinch()), DT);
        let r = s.tick(None, DT);
        assert!(r.gesture.pinching);
        assert!(r.gesture.hand_present);
    }

    #[test]
    fn unknown_track_starts_at_default_level() {
        let s = Session::start(catch_config(None), Box::new(MemoryProfileStore::new())).unwrap();
        assert_eq!(s.controller().level(), skill_ladder::DEFAULT_LEVEL);
    }

    // ── matching board ────────────────────────────────────────────────────

    fn board_config(max_rounds: Option<u32>) -> SessionConfig {
        let lvl = |pairs: usize| LevelProfile {
            entity_count:     pairs,
            speed_range:      (0.0, 0.0),
            spawn_interval:   0.0,
            size_jitter:      0.0,
            session_duration: 30.0,
            up_threshold:     pairs as u32,
            down_threshold:   0,
            objective:        Some(pairs as u32),
        };
        let size = Size::new(100.0, 100.0);
        SessionConfig {
            game:        GameKind::Shadow,
            track:       "motor".to_string(),
            gesture:     GestureConfig { grab_rule: GrabRule::Fist, hold_threshold: 0.2, ..GestureConfig::default() },
            ladder:      ProfileTable::single(lvl(1)).then(lvl(2)),
            checkpoints: CheckpointPolicy { every: None, at_session_end: true },
            mode:        Mode::Match(MatchRules { confirm_threshold: 0.2, ..MatchRules::default() }),
            kinds: vec![
                KindSpec::new("lion", Role::Source, Motion::Static, size),
                KindSpec::new("lion", Role::Target, Motion::Static, size),
                KindSpec::new("bird", Role::Source, Motion::Static, size),
                KindSpec::new("bird", Role::Target, Motion::Static, size),
            ],
            bounds:                      Rect::new(0.0, 0.0, 800.0, 600.0),
            cursor_size:                 Size::new(40.0, 40.0),
            max_score:                   100,
            seed:                        3,
            restart_round_on_transition: true,
            max_rounds,
            fill_score_on_objective:     true,
            banner_seconds:              2.0,
        }
    }

    fn fist_at(p: Vec2) -> HandFrame {
        HandFrame::single(synthetic_hand(p.x / 800.0, p.y / 600.0, true, false))
    }

    /// Drag `label`'s source onto its target with a held fist.
    fn drag(s: &mut Session, label: &str) {
        let center = |role| {
            s.field().entities().iter()
                .find(|e| e.label == label && e.role == role)
                .map(|e| e.rect().center())
                .unwrap()
        };
        let (from, to) = (center(Role::Source), center(Role::Target));
        for _ in 0..30 { s.tick(Some(&fist_at(from)), DT); }
        for _ in 0..30 { s.tick(Some(&fist_at(to)), DT); }
    }

    #[test]
    fn board_places_every_pair_on_its_side() {
        let s = Session::start(board_config(None), Box::new(store_at(2, 0))).unwrap();
        let entities = s.field().entities();
        assert_eq!(entities.len(), 4);
        for e in entities {
            let cx = e.rect().center().x;
            match e.role {
                Role::Source => assert!(cx < 400.0),
                Role::Target => assert!(cx > 400.0),
                Role::Free   => panic!("no free entities on a board"),
            }
        }
    }

    #[test]
    fn completed_board_fills_score_and_stops_at_round_limit() {
        let store = store_at(1, 0);
        let mut s = Session::start(board_config(Some(1)), Box::new(store.clone())).unwrap();
        drag(&mut s, "lion");

        assert_eq!(s.stats().matches, 1);
        assert_eq!(s.stats().score, 100);
        assert_eq!(s.phase(), SessionPhase::Finished {
            termination: Termination::Normal { reason: EndReason::ObjectiveMet },
        });
        assert_eq!(saved(&store), SkillLevel { level: 2, tasks_completed: 1, last_score: Some(100) });
    }

    #[test]
    fn level_change_starts_a_fresh_round() {
        let mut s = Session::start(board_config(Some(2)), Box::new(store_at(1, 0))).unwrap();
        drag(&mut s, "lion");

        assert!(!s.is_finished());
        assert_eq!(s.stats().round, 1);
        assert_eq!(s.stats().matches, 0);
        assert_eq!(s.stats().score, 0);
        assert_eq!(s.controller().level(), 2);
        assert_eq!(s.field().entities().len(), 4);
        assert!(s.field().entities().iter().all(|e| !e.matched));
    }

    // ── odd-one-out board ─────────────────────────────────────────────────

    fn odd_config() -> SessionConfig {
        let mut cfg = crate::games::preset(GameKind::Odd);
        cfg.track = "motor".to_string();
        cfg.gesture.cursor_landmark = hand_gesture::frame::WRIST;
        cfg
    }

    fn point_at(p: Vec2) -> HandFrame {
        HandFrame::single(synthetic_hand(p.x / 1280.0, p.y / 720.0, false, false))
    }

    fn box_center(s: &Session, odd: bool) -> Vec2 {
        s.field().entities().iter()
            .find(|e| (e.kind == 0) == odd)
            .map(|e| e.rect().center())
            .unwrap()
    }

    /// Point at a box until the dwell resolves; returns the pick event.
    fn dwell_on(s: &mut Session, at: Vec2) -> PickEvent {
        for _ in 0..120 {
            let r = s.tick(Some(&point_at(at)), DT);
            if !matches!(r.pick, PickEvent::None | PickEvent::Hovering { .. }) {
                return r.pick;
            }
        }
        PickEvent::None
    }

    #[test]
    fn odd_board_finds_climb_the_ladder() {
        let store = store_at(1, 0);
        let mut s = Session::start(odd_config(), Box::new(store.clone())).unwrap();
        assert_eq!(s.field().entities().len(), 4);
        assert_eq!(s.field().entities().iter().filter(|e| e.kind == 0).count(), 1);

        let at = box_center(&s, true);
        assert!(matches!(dwell_on(&mut s, at), PickEvent::Picked { .. }));
        assert_eq!(s.controller().level(), 2);
        assert_eq!(s.stats().round, 1);
        assert_eq!(s.field().entities().len(), 6);

        let at = box_center(&s, true);
        assert!(matches!(dwell_on(&mut s, at), PickEvent::Picked { .. }));
        assert_eq!(s.controller().level(), 3);
        assert_eq!(s.field().entities().len(), 9);

        let at = box_center(&s, true);
        assert!(matches!(dwell_on(&mut s, at), PickEvent::Picked { .. }));
        assert_eq!(s.phase(), SessionPhase::Finished {
            termination: Termination::Normal { reason: EndReason::ObjectiveMet },
        });
        assert_eq!(saved(&store), SkillLevel { level: 3, tasks_completed: 1, last_score: Some(100) });
    }

    #[test]
    fn odd_board_strikes_reset_the_board() {
        let mut s = Session::start(odd_config(), Box::new(store_at(2, 0))).unwrap();
        let first: Vec<u64> = s.field().entities().iter().map(|e| e.id).collect();
        let decoy = box_center(&s, false);
        let away = Vec2::new(5.0, 5.0);

        for n in 1..=2 {
            assert!(matches!(dwell_on(&mut s, decoy), PickEvent::Strike { strikes, .. } if strikes == n));
            assert_eq!(s.snapshot().strikes, n);
            s.tick(Some(&point_at(away)), DT);
        }
        assert_eq!(dwell_on(&mut s, decoy), PickEvent::BoardReset);

        let snap = s.snapshot();
        assert_eq!(snap.strikes, 0);
        assert_eq!(snap.score, 0);
        assert_eq!(snap.level, 2);
        assert!(!s.is_finished());
        assert_eq!(s.field().entities().len(), 6);
        assert!(s.field().entities().iter().all(|e| !first.contains(&e.id)));
    }
}
