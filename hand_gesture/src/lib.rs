//! # hand_gesture
//!
//! Hand-landmark frames in, debounced gesture state out.
//!
//! ## Modules
//!
//! * [`frame`]      — landmark model, relay packet decoding
//! * [`classifier`] — pinch/grab/motion classification with hold timers
//! * [`cell`]       — latest-frame handoff between capture and game loop
//! * [`source`]     — threaded frame sources (landmark relay, pointer simulator)
//!
//! ## Quick start
//!
//! ```rust
//! use hand_gesture::{GestureClassifier, GestureState, HandFrame};
//!
//! let classifier = GestureClassifier::default();
//! let state = classifier.classify(&HandFrame::empty(), &GestureState::default(), 0.0);
//! assert!(!state.hand_present);
//! ```

pub mod cell;
pub mod classifier;
pub mod frame;
pub mod source;

pub use cell::FrameCell;
pub use classifier::{GestureClassifier, GestureConfig, GestureState, GrabRule, Vertical};
pub use frame::{parse_packet, FrameError, Hand, HandFrame, Handedness, Landmark, Packet};
pub use source::{spawn_hand_source, synthetic_hand, HandSource, RelaySource, SimHandSource, SimInput};
