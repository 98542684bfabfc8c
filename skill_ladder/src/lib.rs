//! # skill_ladder
//!
//! Per-track difficulty progression.
//!
//! * [`profile`]    — `LevelProfile` and the `ProfileTable` ladder
//! * [`controller`] — checkpoint evaluation, level transitions, task counting
//! * [`store`]      — the persistent `PlayerProfile` and its stores
//!
//! ## Quick start
//!
//! ```rust
//! use skill_ladder::{DifficultyController, LevelProfile, MemoryProfileStore, ProfileStore, ProfileTable};
//!
//! let level = LevelProfile {
//!     entity_count: 5, speed_range: (60.0, 90.0), spawn_interval: 0.5, size_jitter: 0.0,
//!     session_duration: 60.0, up_threshold: 20, down_threshold: 5, objective: None,
//! };
//! let table = ProfileTable::new(vec![level.clone(), level.clone(), level]).unwrap();
//! let store = MemoryProfileStore::new();
//!
//! let mut ctl = DifficultyController::new(table, store.load_track("motor", 3));
//! ctl.record(22);
//! assert!(ctl.evaluate(60.0).is_some());
//! assert_eq!(ctl.level(), 3);
//! ```

pub mod controller;
pub mod profile;
pub mod store;

pub use controller::{CheckpointPolicy, DifficultyController, Transition, TransitionKind};
pub use profile::{LadderError, LevelProfile, ProfileTable};
pub use store::{JsonProfileStore, MemoryProfileStore, PlayerProfile, ProfileError, ProfileStore, SkillLevel, DEFAULT_LEVEL};
