//! Hand-landmark frames as delivered by the capture collaborator.
//!
//! One [`HandFrame`] per tick: zero or more hands, each an ordered set of 21
//! landmark points normalized to `[0, 1]` screen space (MediaPipe ordering).

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices (MediaPipe hand model)
// ════════════════════════════════════════════════════════════════════════════

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

/// Number of landmarks in a complete hand.
pub const LANDMARK_COUNT: usize = 21;

/// (tip, pip) pairs for the four non-thumb fingers, used by the fold vote.
pub const FINGER_JOINTS: [(usize, usize); 4] = [
    (INDEX_TIP,  INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP,   RING_PIP),
    (PINKY_TIP,  PINKY_PIP),
];

// ════════════════════════════════════════════════════════════════════════════
// Landmark / Hand / HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// A single landmark point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Per-point detection confidence, when the extractor reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0, confidence: None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness { Left, Right }

/// One detected hand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub landmarks:  Vec<Landmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<Handedness>,
}

impl Hand {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Hand { landmarks, handedness: None }
    }

    /// True when all 21 landmarks are present.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }

    /// Landmark by index. Callers must only ask complete hands.
    pub fn point(&self, index: usize) -> Landmark {
        self.landmarks.get(index).copied().unwrap_or_default()
    }

    /// 2-D Euclidean distance between two landmarks (image plane only).
    pub fn distance(&self, a: usize, b: usize) -> f32 {
        let pa = self.point(a);
        let pb = self.point(b);
        let dx = pa.x - pb.x;
        let dy = pa.y - pb.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Number of non-thumb fingers whose tip sits below its middle joint.
    ///
    /// Image y grows downward, so "tip below PIP" means `tip.y > pip.y`.
    pub fn folded_fingers(&self) -> usize {
        FINGER_JOINTS.iter()
            .filter(|&&(tip, pip)| self.point(tip).y > self.point(pip).y)
            .count()
    }

    /// Mean landmark confidence, or `None` if the extractor reported none.
    pub fn mean_confidence(&self) -> Option<f32> {
        let scores: Vec<f32> = self.landmarks.iter().filter_map(|l| l.confidence).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f32>() / scores.len() as f32)
        }
    }
}

/// One tick's snapshot of detected hands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    #[serde(default)]
    pub hands: Vec<Hand>,
}

impl HandFrame {
    /// A frame in which no hand was detected.
    pub fn empty() -> Self {
        HandFrame { hands: Vec::new() }
    }

    pub fn single(hand: Hand) -> Self {
        HandFrame { hands: vec![hand] }
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    /// The hand the games track: the first complete hand passing the
    /// confidence gate. Hands without confidence scores always pass.
    pub fn primary_hand(&self, min_confidence: f32) -> Option<&Hand> {
        self.hands.iter().find(|h| {
            h.is_complete()
                && h.mean_confidence().map_or(true, |c| c >= min_confidence)
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark packets
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed landmark packet: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hand {index} has {found} landmarks, expected 21")]
    IncompleteHand { index: usize, found: usize },
}

/// A decoded landmark packet.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Frame(HandFrame),
    /// Out-of-band command from the extractor (e.g. `"STOP"`).
    Command(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPacket {
    Command { command: String },
    Frame(HandFrame),
}

/// Decode one packet as emitted by the landmark relay:
/// `{"hands":[{"hand_index":0,"landmarks":[{"x":..,"y":..,"z":..}, ..]}]}`
/// or `{"command":"STOP"}`.
pub fn parse_packet(text: &str) -> Result<Packet, FrameError> {
    match serde_json::from_str::<RawPacket>(text)? {
        RawPacket::Command { command } => Ok(Packet::Command(command)),
        RawPacket::Frame(frame) => {
            for (index, hand) in frame.hands.iter().enumerate() {
                if !hand.is_complete() {
                    return Err(FrameError::IncompleteHand { index, found: hand.landmarks.len() });
                }
            }
            Ok(Packet::Frame(frame))
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
