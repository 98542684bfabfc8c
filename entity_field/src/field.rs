//! The entity field: a fixed-size population of interaction entities that
//! move per their kind's [`Motion`], get recycled when they leave, and can be
//! caught by a cursor region.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::geometry::{Rect, Size, Vec2};
use crate::motion::{uniform, Motion, MotionPolicy};

// ════════════════════════════════════════════════════════════════════════════
// Kinds, profiles, entities
// ════════════════════════════════════════════════════════════════════════════

/// Part an entity plays in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Catchable target in catch games.
    Free,
    /// Draggable card in matching games.
    Source,
    /// Drop slot in matching games.
    Target,
}

/// Static description of one entity kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KindSpec {
    pub label:        String,
    pub role:         Role,
    pub motion:       Motion,
    pub size:         Size,
    /// Hitbox as a fraction of the sprite size.
    #[serde(default = "unit_scale")]
    pub hitbox_scale: f32,
}

fn unit_scale() -> f32 { 1.0 }

impl KindSpec {
    pub fn new(label: &str, role: Role, motion: Motion, size: Size) -> Self {
        KindSpec { label: label.to_string(), role, motion, size, hitbox_scale: 1.0 }
    }
}

/// Spawn parameters that vary with the difficulty level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnProfile {
    /// Entity speed, px/s, drawn uniformly per spawn.
    pub speed_range:    (f32, f32),
    /// Relative size variation: sizes drawn from `base * (1 ± size_jitter)`.
    pub size_jitter:    f32,
    /// Seconds of travel between successive initial entries.
    pub spawn_interval: f32,
}

impl Default for SpawnProfile {
    fn default() -> Self {
        SpawnProfile { speed_range: (60.0, 120.0), size_jitter: 0.0, spawn_interval: 0.0 }
    }
}

/// Largest usable `size_jitter`; at 1 or more a spawn can have no area.
pub const MAX_SIZE_JITTER: f32 = 0.9;

impl SpawnProfile {
    fn clamped(mut self) -> Self {
        let j = self.size_jitter;
        self.size_jitter = if j > 0.0 { j.min(MAX_SIZE_JITTER) } else { 0.0 };
        if j != self.size_jitter {
            warn!("size jitter {} clamped to {}", j, self.size_jitter);
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InteractionEntity {
    pub id:       u64,
    /// Index into the field's kind table.
    pub kind:     usize,
    pub label:    String,
    pub role:     Role,
    pub position: Vec2,
    pub size:     Size,
    pub velocity: Vec2,
    pub matched:  bool,
    /// Left the field this tick; awaiting recycle.
    pub exited:   bool,
}

impl InteractionEntity {
    pub fn rect(&self) -> Rect {
        Rect::at(self.position, self.size)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("entity field has no kinds to spawn")]
    NoKinds,

    #[error("unknown entity kind {0}")]
    UnknownKind(usize),
}

// ════════════════════════════════════════════════════════════════════════════
// EntityField
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct EntityField {
    bounds:       Rect,
    kinds:        Vec<KindSpec>,
    profile:      SpawnProfile,
    target_count: usize,
    entities:     Vec<InteractionEntity>,
    rng:          ChaCha8Rng,
    next_id:      u64,
}

impl EntityField {
    /// Build a field and spawn `target_count` entities, kinds round-robin.
    pub fn new(
        bounds:       Rect,
        kinds:        Vec<KindSpec>,
        profile:      SpawnProfile,
        target_count: usize,
        seed:         u64,
    ) -> Result<Self, FieldError> {
        if kinds.is_empty() {
            return Err(FieldError::NoKinds);
        }
        let mut field = EntityField {
            bounds,
            kinds,
            profile: profile.clamped(),
            target_count,
            entities: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 0,
        };
        field.populate();
        Ok(field)
    }

    /// Spawn the initial population. Entry `i` starts `i * spawn_interval`
    /// seconds of travel behind its spawn edge.
    fn populate(&mut self) {
        self.entities.clear();
        for i in 0..self.target_count {
            let kind = i % self.kinds.len();
            let mut e = self.spawn_entity(kind);
            let lag = i as f32 * self.profile.spawn_interval;
            e.position = e.position - e.velocity * lag;
            self.entities.push(e);
        }
        debug!("field populated with {} entities", self.entities.len());
    }

    fn spawn_entity(&mut self, kind: usize) -> InteractionEntity {
        let spec   = &self.kinds[kind];
        let j      = self.profile.size_jitter;
        let scale  = 1.0 + uniform(&mut self.rng, -j, j);
        let size   = spec.size.scaled(scale);
        let (lo, hi) = self.profile.speed_range;
        let speed  = uniform(&mut self.rng, lo, hi);
        let (position, velocity) = spec.motion.spawn(&self.bounds, size, speed, &mut self.rng);
        let id = self.next_id;
        self.next_id += 1;
        InteractionEntity {
            id,
            kind,
            label: spec.label.clone(),
            role: spec.role,
            position,
            size,
            velocity,
            matched: false,
            exited: false,
        }
    }

    // ── per-tick operations ───────────────────────────────────────────────

    /// Move every entity by its kind's policy and flag the ones that left.
    pub fn advance(&mut self, dt: f32) {
        for e in self.entities.iter_mut() {
            if e.exited { continue; }
            let motion = &self.kinds[e.kind].motion;
            if motion.is_static() { continue; }
            e.position = motion.advance(e.position, e.velocity, dt, &mut self.rng);
            if motion.has_exited(e.position, e.size, &self.bounds) {
                e.exited = true;
            }
        }
    }

    /// Re-spawn every exited entity at its entry edge. Returns how many.
    pub fn recycle_exited(&mut self) -> usize {
        let mut n = 0;
        for i in 0..self.entities.len() {
            if self.entities[i].exited {
                let kind = self.entities[i].kind;
                self.entities[i] = self.spawn_entity(kind);
                n += 1;
            }
        }
        if n > 0 { trace!("recycled {} exited entities", n); }
        n
    }

    /// `advance` then `recycle_exited`.
    pub fn step(&mut self, dt: f32) -> usize {
        self.advance(dt);
        self.recycle_exited()
    }

    /// Catch every moving, unmatched entity whose hitbox meets `cursor` and
    /// for which `accept` holds. Each is replaced by a fresh entity of the
    /// same kind. Returns the catch count.
    pub fn try_catch(&mut self, cursor: &Rect, accept: impl Fn(&InteractionEntity) -> bool) -> usize {
        let mut caught = 0;
        for i in 0..self.entities.len() {
            let hit = {
                let e = &self.entities[i];
                !e.matched
                    && !self.kinds[e.kind].motion.is_static()
                    && self.hitbox(e).intersects(cursor)
                    && accept(e)
            };
            if hit {
                let kind = self.entities[i].kind;
                debug!("caught {} #{}", self.entities[i].label, self.entities[i].id);
                self.entities[i] = self.spawn_entity(kind);
                caught += 1;
            }
        }
        caught
    }

    // ── boards and rounds ─────────────────────────────────────────────────

    /// Add a static entity of `kind` with its top-left at `position`.
    pub fn place(&mut self, kind: usize, position: Vec2) -> Result<u64, FieldError> {
        let spec = self.kinds.get(kind).ok_or(FieldError::UnknownKind(kind))?;
        let entity = InteractionEntity {
            id:       self.next_id,
            kind,
            label:    spec.label.clone(),
            role:     spec.role,
            position,
            size:     spec.size,
            velocity: Vec2::ZERO,
            matched:  false,
            exited:   false,
        };
        self.next_id += 1;
        self.entities.push(entity);
        Ok(self.next_id - 1)
    }

    /// Reset the round for a new profile: every entity re-spawned.
    pub fn reconfigure(&mut self, profile: SpawnProfile, target_count: usize) {
        self.profile = profile.clamped();
        self.target_count = target_count;
        self.populate();
    }

    pub fn mark_matched(&mut self, id: u64) -> bool {
        match self.entities.iter_mut().find(|e| e.id == id) {
            Some(e) => { e.matched = true; true }
            None    => false,
        }
    }

    // ── queries ───────────────────────────────────────────────────────────

    /// Hitbox of `e`, scaled about its centre per its kind.
    pub fn hitbox(&self, e: &InteractionEntity) -> Rect {
        let scale = self.kinds.get(e.kind).map_or(1.0, |k| k.hitbox_scale);
        e.rect().scaled(scale)
    }

    /// Entities currently in play (not awaiting recycle).
    pub fn live_count(&self) -> usize {
        self.entities.iter().filter(|e| !e.exited).count()
    }

    pub fn entities(&self) -> &[InteractionEntity] { &self.entities }

    pub fn entity(&self, id: u64) -> Option<&InteractionEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Topmost unmatched entity of `role` whose hitbox contains `point`.
    pub fn entity_at(&self, point: Vec2, role: Role) -> Option<&InteractionEntity> {
        self.entities.iter().rev()
            .find(|e| e.role == role && !e.matched && self.hitbox(e).contains(point))
    }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn kinds(&self) -> &[KindSpec] { &self.kinds }

    pub fn profile(&self) -> &SpawnProfile { &self.profile }

    pub fn target_count(&self) -> usize { self.target_count }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
