//! Hand-frame sources: anything that publishes [`HandFrame`]s into a
//! [`FrameCell`] from its own thread.
//!
//! Consumers never know whether frames came from a landmark relay or from the
//! mouse simulator.

use std::io::BufRead;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cell::FrameCell;
use crate::frame::{
    parse_packet, Hand, HandFrame, Landmark, Packet, FINGER_JOINTS, INDEX_TIP, LANDMARK_COUNT,
    THUMB_CMC, THUMB_IP, THUMB_MCP, THUMB_TIP, WRIST,
};

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`HandFrame`]s into a cell.
pub trait HandSource: Send + 'static {
    fn run(self: Box<Self>, cell: FrameCell);
}

/// Spawn a hand source on its own thread and return the consuming cell.
pub fn spawn_hand_source<S: HandSource>(source: S) -> FrameCell {
    let cell = FrameCell::new();
    let producer = cell.clone();
    thread::spawn(move || Box::new(source).run(producer));
    cell
}

// ════════════════════════════════════════════════════════════════════════════
// RelaySource: JSON lines from a landmark extractor
// ════════════════════════════════════════════════════════════════════════════

/// Reads one landmark packet per line and publishes each frame.
/// Stops on end of input or a `STOP` command. Malformed lines are skipped.
pub struct RelaySource<R> {
    pub reader: R,
}

impl<R: BufRead + Send + 'static> HandSource for RelaySource<R> {
    fn run(self: Box<Self>, cell: FrameCell) {
        for line in self.reader.lines() {
            let line = match line {
                Ok(l)  => l,
                Err(e) => { warn!("landmark relay read failed: {}", e); return; }
            };
            if line.trim().is_empty() { continue; }
            match parse_packet(&line) {
                Ok(Packet::Frame(frame)) => cell.publish(frame),
                Ok(Packet::Command(cmd)) if cmd.eq_ignore_ascii_case("stop") => {
                    info!("landmark relay sent STOP");
                    return;
                }
                Ok(Packet::Command(cmd)) => debug!("ignoring relay command {:?}", cmd),
                Err(e) => warn!("skipping landmark packet: {}", e),
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: pointer simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer moved; normalized window coordinates.
    PointerMoved { x: f32, y: f32 },
    /// Closed-fist button pressed or released.
    Grab(bool),
    /// Thumb-to-index pinch button pressed or released.
    Pinch(bool),
    /// Pointer left the window: the hand is out of view.
    HandLost,
    Quit,
}

/// Interval at which the simulator republishes the current pose.
pub const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Translates [`SimInput`] into synthesized 21-point hands.
///
/// The current pose is republished every [`SIM_FRAME_INTERVAL`] even when no
/// input arrives, like a camera would, so hold timers keep running while a
/// button stays down.
pub struct SimHandSource {
    pub rx: Receiver<SimInput>,
}

impl HandSource for SimHandSource {
    fn run(self: Box<Self>, cell: FrameCell) {
        let mut pose = SimPose { x: 0.5, y: 0.5, fist: false, pinch: false, present: false };
        loop {
            match self.rx.recv_timeout(SIM_FRAME_INTERVAL) {
                Ok(SimInput::PointerMoved { x, y }) => {
                    pose.x = x.clamp(0.0, 1.0);
                    pose.y = y.clamp(0.0, 1.0);
                    pose.present = true;
                }
                Ok(SimInput::Grab(down))  => { pose.fist = down; pose.present = true; }
                Ok(SimInput::Pinch(down)) => { pose.pinch = down; pose.present = true; }
                Ok(SimInput::HandLost)    => pose.present = false,
                Ok(SimInput::Quit) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
            cell.publish(pose.frame());
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SimPose {
    x:       f32,
    y:       f32,
    fist:    bool,
    pinch:   bool,
    present: bool,
}

impl SimPose {
    fn frame(&self) -> HandFrame {
        if self.present {
            HandFrame::single(synthetic_hand(self.x, self.y, self.fist, self.pinch))
        } else {
            HandFrame::empty()
        }
    }
}

/// Build an upright hand with its wrist at (x, y).
///
/// `fist` folds every finger tip below its middle joint and tucks the thumb
/// against the index tip; `pinch` brings the thumb tip onto the index tip
/// with the other fingers open.
pub fn synthetic_hand(x: f32, y: f32, fist: bool, pinch: bool) -> Hand {
    let mut points = vec![Landmark::new(x, y); LANDMARK_COUNT];
    points[WRIST]     = Landmark::new(x, y);
    points[THUMB_CMC] = Landmark::new(x - 0.03, y - 0.02);
    points[THUMB_MCP] = Landmark::new(x - 0.05, y - 0.04);
    points[THUMB_IP]  = Landmark::new(x - 0.07, y - 0.05);
    points[THUMB_TIP] = Landmark::new(x - 0.09, y - 0.06);

    for (i, &(tip, pip)) in FINGER_JOINTS.iter().enumerate() {
        let fx  = x - 0.03 + 0.02 * i as f32;
        let mcp = pip - 1;
        let dip = tip - 1;
        points[mcp] = Landmark::new(fx, y - 0.06);
        points[pip] = Landmark::new(fx, y - 0.09);
        if fist {
            points[dip] = Landmark::new(fx, y - 0.06);
            points[tip] = Landmark::new(fx, y - 0.04);
        } else {
            points[dip] = Landmark::new(fx, y - 0.11);
            points[tip] = Landmark::new(fx, y - 0.13);
        }
    }

    if pinch || fist {
        let index = points[INDEX_TIP];
        points[THUMB_TIP] = Landmark::new(index.x - 0.01, index.y);
    }
    Hand::new(points)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    fn wait_for(cell: &FrameCell, pred: impl Fn(&HandFrame) -> bool) -> bool {
        for _ in 0..200 {
            if let Some(f) = cell.take() {
                if pred(&f) { return true; }
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn synthetic_poses() {
        let open = synthetic_hand(0.5, 0.5, false, false);
        assert_eq!(open.folded_fingers(), 0);
        assert!(open.distance(THUMB_TIP, INDEX_TIP) > 0.05);

        let fist = synthetic_hand(0.5, 0.5, true, false);
        assert_eq!(fist.folded_fingers(), 4);
        assert!(fist.distance(THUMB_TIP, INDEX_TIP) < 0.05);

        let pinch = synthetic_hand(0.5, 0.5, false, true);
        assert!(pinch.distance(THUMB_TIP, INDEX_TIP) < 0.05);
        assert_eq!(pinch.folded_fingers(), 0);
        assert_eq!(pinch.point(WRIST), Landmark::new(0.5, 0.5));
    }

    #[test]
    fn sim_source_publishes_poses() {
        let (tx, rx) = mpsc::channel();
        let cell = spawn_hand_source(SimHandSource { rx });
        tx.send(SimInput::PointerMoved { x: 0.25, y: 0.75 }).unwrap();
        tx.send(SimInput::Grab(true)).unwrap();
        assert!(wait_for(&cell, |f| {
            f.hands.first().map_or(false, |h| h.folded_fingers() == 4 && h.point(WRIST).x == 0.25)
        }));

        tx.send(SimInput::HandLost).unwrap();
        assert!(wait_for(&cell, |f| f.is_empty()));
        tx.send(SimInput::Quit).unwrap();
    }

    #[test]
    fn relay_source_stops_on_command() {
        let hand = serde_json::to_string(&HandFrame::single(synthetic_hand(0.4, 0.4, false, false))).unwrap();
        let input = format!("{}\nnot json\n{{\"command\":\"STOP\"}}\n{}\n", hand, hand);
        let cell = FrameCell::new();
        Box::new(RelaySource { reader: Cursor::new(input) }).run(cell.clone());
        // Only the frame before STOP was published.
        assert_eq!(cell.stats(), (1, 0));
        assert!(cell.take().is_some());
    }
}
