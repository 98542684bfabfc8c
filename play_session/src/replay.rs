//! Headless playback of a recorded landmark stream.
//!
//! One line per tick at a fixed rate: a landmark packet, or an empty line for
//! a tick on which the capture delivered nothing. `{"command":"STOP"}` ends
//! the session early; so does running out of input before an end condition.

use std::io::BufRead;

use anyhow::Context;
use tracing::{debug, info, warn};

use hand_gesture::{parse_packet, Packet};

use crate::session::Session;
use crate::snapshot::RenderSnapshot;

/// Seconds per recorded line.
pub const REPLAY_DT: f32 = 1.0 / 60.0;

/// Feed `reader` into `session` until it finishes. Returns the final snapshot.
pub fn replay<R: BufRead>(session: &mut Session, reader: R) -> anyhow::Result<RenderSnapshot> {
    let mut ticks = 0u64;
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading replay line {}", n + 1))?;
        let line = line.trim();
        let frame = if line.is_empty() {
            None
        } else {
            match parse_packet(line) {
                Ok(Packet::Frame(frame)) => Some(frame),
                Ok(Packet::Command(cmd)) if cmd.eq_ignore_ascii_case("stop") => {
                    info!("replay stopped at line {}", n + 1);
                    session.abort();
                    break;
                }
                Ok(Packet::Command(cmd)) => {
                    debug!("ignoring command {:?} on line {}", cmd, n + 1);
                    None
                }
                Err(e) => {
                    warn!("line {}: {}", n + 1, e);
                    None
                }
            }
        };
        session.tick(frame.as_ref(), REPLAY_DT);
        ticks += 1;
        if session.is_finished() {
            break;
        }
    }
    if !session.is_finished() {
        warn!("replay input ended after {} ticks with the session still running", ticks);
        session.abort();
    }
    Ok(session.snapshot())
}
