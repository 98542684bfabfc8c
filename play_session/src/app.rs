//! Interactive play loop.
//!
//! The hand source runs on its own thread and publishes into a
//! latest-frame-wins cell; this loop takes whatever is newest each frame,
//! ticks the session with the measured frame time and renders a snapshot.

use std::io::{self, BufReader};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, info};

use hand_gesture::{spawn_hand_source, FrameCell, RelaySource, SimHandSource};
use skill_ladder::ProfileStore;

use crate::config::SessionConfig;
use crate::session::Session;
use crate::snapshot::RenderSnapshot;
use crate::visualizer::Visualizer;

/// Longest frame time fed to the session; a stall is not a jump in time.
const MAX_DT: f32 = 0.1;

/// How long the result screen stays up after the session ends.
const RESULT_LINGER: Duration = Duration::from_secs(3);

/// Where hand frames come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// Pointer simulation in the play window.
    Pointer,
    /// Landmark packets, one JSON object per line on stdin.
    Relay,
}

/// Run one windowed session to completion or until the player quits.
pub fn run(config: SessionConfig, store: Box<dyn ProfileStore>, input: Input) -> anyhow::Result<RenderSnapshot> {
    let (sim_tx, sim_rx) = mpsc::channel();
    let cell: FrameCell = match input {
        Input::Pointer => spawn_hand_source(SimHandSource { rx: sim_rx }),
        Input::Relay => {
            drop(sim_rx);
            spawn_hand_source(RelaySource { reader: BufReader::new(io::stdin()) })
        }
    };

    let mut viz = Visualizer::new(config.game.title(), sim_tx).map_err(|e| anyhow!(e))?;
    let mut session = Session::start(config, store)?;

    let mut last = Instant::now();
    let mut ended_at: Option<Instant> = None;
    loop {
        if !viz.poll_input() {
            if !session.is_finished() {
                info!("player quit");
                session.abort();
            }
            break;
        }

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32().min(MAX_DT);
        last = now;

        let frame = cell.take();
        session.tick(frame.as_ref(), dt);
        viz.render(&session.snapshot());

        if session.is_finished() {
            let since = *ended_at.get_or_insert(now);
            if now.duration_since(since) >= RESULT_LINGER {
                break;
            }
        }
    }

    let (published, overwritten) = cell.stats();
    debug!("{} frames published, {} overwritten before use", published, overwritten);
    Ok(session.snapshot())
}
