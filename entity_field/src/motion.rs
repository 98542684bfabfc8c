//! Motion policies: how an entity of a given kind enters, moves through and
//! leaves the field.
//!
//! Each policy answers three questions: where a fresh entity spawns (and with
//! what velocity), where it is after `dt`, and whether it has left the field.
//! [`Motion`] is the serializable form used in game configs; it dispatches to
//! the concrete policies.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Size, Vec2};

// ════════════════════════════════════════════════════════════════════════════
// MotionPolicy trait
// ════════════════════════════════════════════════════════════════════════════

pub trait MotionPolicy {
    /// Top-left position and velocity for a fresh entity of `size` moving at
    /// `speed` px/s.
    fn spawn(&self, bounds: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2);

    /// Position after `dt` seconds.
    fn advance(&self, position: Vec2, velocity: Vec2, dt: f32, rng: &mut ChaCha8Rng) -> Vec2;

    /// True once the entity is entirely past its leading edge.
    fn has_exited(&self, position: Vec2, size: Size, bounds: &Rect) -> bool;

    /// Static entities are neither advanced nor catchable.
    fn is_static(&self) -> bool { false }
}

impl<P: MotionPolicy + ?Sized> MotionPolicy for &P {
    fn spawn(&self, b: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        (**self).spawn(b, size, speed, rng)
    }

    fn advance(&self, p: Vec2, v: Vec2, dt: f32, rng: &mut ChaCha8Rng) -> Vec2 {
        (**self).advance(p, v, dt, rng)
    }

    fn has_exited(&self, p: Vec2, size: Size, b: &Rect) -> bool {
        (**self).has_exited(p, size, b)
    }

    fn is_static(&self) -> bool { (**self).is_static() }
}

/// Uniform draw that tolerates empty or inverted ranges.
pub(crate) fn uniform(rng: &mut ChaCha8Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

fn linear(position: Vec2, velocity: Vec2, dt: f32) -> Vec2 {
    position + velocity * dt
}

// ════════════════════════════════════════════════════════════════════════════
// Concrete policies
// ════════════════════════════════════════════════════════════════════════════

/// Constant downward travel; spawns in a band just above the top edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fall;

impl MotionPolicy for Fall {
    fn spawn(&self, b: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        let x = uniform(rng, b.left(), b.right() - size.w);
        let y = b.top() - size.h - uniform(rng, 0.0, size.h);
        (Vec2::new(x, y), Vec2::new(0.0, speed))
    }

    fn advance(&self, p: Vec2, v: Vec2, dt: f32, _: &mut ChaCha8Rng) -> Vec2 { linear(p, v, dt) }

    fn has_exited(&self, p: Vec2, _: Size, b: &Rect) -> bool {
        p.y > b.bottom()
    }
}

/// Constant upward travel; spawns in the band `[bottom, bottom + size.h]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rise;

impl MotionPolicy for Rise {
    fn spawn(&self, b: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        let x = uniform(rng, b.left(), b.right() - size.w);
        let y = b.bottom() + uniform(rng, 0.0, size.h);
        (Vec2::new(x, y), Vec2::new(0.0, -speed))
    }

    fn advance(&self, p: Vec2, v: Vec2, dt: f32, _: &mut ChaCha8Rng) -> Vec2 { linear(p, v, dt) }

    fn has_exited(&self, p: Vec2, size: Size, b: &Rect) -> bool {
        p.y + size.h < b.top()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction { Left, Right }

/// Constant horizontal travel across a vertical lane; leaves past the leading
/// edge and re-enters at the trailing edge.
#[derive(Clone, Copy, Debug)]
pub struct Lateral {
    pub direction: Direction,
    /// Lane as fractions of the field height, `(top, bottom)`.
    pub lane:      (f32, f32),
}

impl MotionPolicy for Lateral {
    fn spawn(&self, b: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        let lane_top    = b.top() + self.lane.0 * b.h;
        let lane_bottom = b.top() + self.lane.1 * b.h - size.h;
        let y = uniform(rng, lane_top, lane_bottom);
        match self.direction {
            Direction::Right => (Vec2::new(b.left() - size.w, y), Vec2::new(speed, 0.0)),
            Direction::Left  => (Vec2::new(b.right(), y), Vec2::new(-speed, 0.0)),
        }
    }

    fn advance(&self, p: Vec2, v: Vec2, dt: f32, _: &mut ChaCha8Rng) -> Vec2 { linear(p, v, dt) }

    fn has_exited(&self, p: Vec2, size: Size, b: &Rect) -> bool {
        match self.direction {
            Direction::Right => p.x > b.right(),
            Direction::Left  => p.x + size.w < b.left(),
        }
    }
}

/// A primary policy plus a fresh uniform per-axis wobble every step.
#[derive(Clone, Debug)]
pub struct JitterDrift<P> {
    pub primary: P,
    /// Wobble amplitude, px/s on each axis.
    pub jitter:  f32,
}

impl<P: MotionPolicy> MotionPolicy for JitterDrift<P> {
    fn spawn(&self, b: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        self.primary.spawn(b, size, speed, rng)
    }

    fn advance(&self, p: Vec2, v: Vec2, dt: f32, rng: &mut ChaCha8Rng) -> Vec2 {
        let base = self.primary.advance(p, v, dt, rng);
        let wobble = Vec2::new(
            uniform(rng, -self.jitter, self.jitter),
            uniform(rng, -self.jitter, self.jitter),
        );
        base + wobble * dt
    }

    fn has_exited(&self, p: Vec2, size: Size, b: &Rect) -> bool {
        self.primary.has_exited(p, size, b)
    }
}

/// Never moves, never exits. Used for matching boards.
#[derive(Clone, Copy, Debug, Default)]
pub struct Static;

impl MotionPolicy for Static {
    fn spawn(&self, b: &Rect, size: Size, _: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        let x = uniform(rng, b.left(), b.right() - size.w);
        let y = uniform(rng, b.top(), b.bottom() - size.h);
        (Vec2::new(x, y), Vec2::ZERO)
    }

    fn advance(&self, p: Vec2, _: Vec2, _: f32, _: &mut ChaCha8Rng) -> Vec2 { p }

    fn has_exited(&self, _: Vec2, _: Size, _: &Rect) -> bool { false }

    fn is_static(&self) -> bool { true }
}

// ════════════════════════════════════════════════════════════════════════════
// Motion: serializable policy selector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Motion {
    Fall,
    Rise,
    Lateral {
        direction: Direction,
        #[serde(default = "full_lane")]
        lane:      (f32, f32),
    },
    JitterDrift {
        primary: Box<Motion>,
        jitter:  f32,
    },
    Static,
}

fn full_lane() -> (f32, f32) { (0.0, 1.0) }

impl Motion {
    fn with<R>(&self, f: impl FnOnce(&dyn MotionPolicy) -> R) -> R {
        match self {
            Motion::Fall   => f(&Fall),
            Motion::Rise   => f(&Rise),
            Motion::Static => f(&Static),
            Motion::Lateral { direction, lane } => f(&Lateral { direction: *direction, lane: *lane }),
            Motion::JitterDrift { primary, jitter } => {
                f(&JitterDrift { primary: primary.as_ref(), jitter: *jitter })
            }
        }
    }
}

impl MotionPolicy for Motion {
    fn spawn(&self, b: &Rect, size: Size, speed: f32, rng: &mut ChaCha8Rng) -> (Vec2, Vec2) {
        self.with(|m| m.spawn(b, size, speed, rng))
    }

    fn advance(&self, p: Vec2, v: Vec2, dt: f32, rng: &mut ChaCha8Rng) -> Vec2 {
        self.with(|m| m.advance(p, v, dt, rng))
    }

    fn has_exited(&self, p: Vec2, size: Size, b: &Rect) -> bool {
        self.with(|m| m.has_exited(p, size, b))
    }

    fn is_static(&self) -> bool {
        self.with(|m| m.is_static())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
