//! # play_session
//!
//! Hand-gesture practice games built on three engine crates:
//!
//! * `hand_gesture` turns landmark frames into debounced gestures
//! * `entity_field` spawns, moves, catches and recycles entities
//! * `skill_ladder` adapts difficulty and persists per-track progress
//!
//! This crate ties them into sessions:
//!
//! * [`config`]     — `SessionConfig`, catch rules, JSON overrides
//! * [`games`]      — built-in presets (balloon, leaf, fish, shadow, odd one out)
//! * [`session`]    — the fixed-order tick loop and end-of-session bookkeeping
//! * [`selection`]  — drag-to-match state machine for board games
//! * [`pick`]       — point-and-dwell picking for odd-one-out boards
//! * [`stats`]      — score and counters
//! * [`banner`]     — level-change overlay timing
//! * [`snapshot`]   — read-only view handed to presenters
//! * [`replay`]     — headless playback of recorded landmark streams
//! * [`visualizer`] — minifb renderer and pointer simulation
//! * [`app`]        — the windowed play loop

pub mod app;
pub mod banner;
pub mod config;
pub mod games;
pub mod pick;
pub mod replay;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod visualizer;

pub use config::{CatchRule, GameKind, Mode, SessionConfig, SessionOverrides};
pub use session::{EndReason, Session, SessionError, SessionPhase, Termination, TickReport};
pub use snapshot::RenderSnapshot;
