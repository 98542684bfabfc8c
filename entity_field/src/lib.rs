//! # entity_field
//!
//! A bounded 2-D field of moving interaction entities.
//!
//! * [`geometry`] — `Vec2`, `Size`, `Rect`
//! * [`motion`]   — per-kind motion policies (fall, rise, lateral, drift, static)
//! * [`field`]    — spawning, advancing, recycling and catching
//!
//! Every random draw goes through one seeded `ChaCha8Rng`, so a field built
//! from the same seed and driven with the same `dt` sequence replays exactly.

pub mod field;
pub mod geometry;
pub mod motion;

pub use field::{EntityField, FieldError, InteractionEntity, KindSpec, Role, SpawnProfile, MAX_SIZE_JITTER};
pub use geometry::{Rect, Size, Vec2};
pub use motion::{Direction, Fall, JitterDrift, Lateral, Motion, MotionPolicy, Rise, Static};
