//! play_session — interactive entry point.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use play_session::app::{self, Input};
use play_session::games::preset;
use play_session::replay::replay;
use play_session::{GameKind, Session, SessionConfig, SessionOverrides};
use skill_ladder::{JsonProfileStore, MemoryProfileStore, ProfileStore};

#[derive(Parser, Debug)]
#[command(name = "play_session", about = "Hand-gesture practice games with adaptive difficulty")]
struct Cli {
    /// Game to play; asks interactively when omitted
    #[arg(long, value_enum)]
    game: Option<GameKind>,

    /// Profile track to read and write (default: the game's own)
    #[arg(long)]
    track: Option<String>,

    /// Player profile JSON file
    #[arg(long, default_value = "player_data.json")]
    profile: PathBuf,

    /// JSON file of session config overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for spawns and board layout
    #[arg(long)]
    seed: Option<u64>,

    /// Play a recorded landmark stream headlessly ("-" for stdin)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Read live landmark packets from stdin instead of the pointer
    #[arg(long)]
    relay: bool,

    /// Keep progress in memory only
    #[arg(long)]
    no_save: bool,

    /// Skip the menu: balloon game with defaults
    #[arg(long)]
    quick: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "play_session=info,skill_ladder=info".into()),
        )
        .init();

    let game = match cli.game {
        Some(g) => g,
        None if cli.quick || cli.replay.is_some() => GameKind::Balloon,
        None => pick_game(),
    };

    let mut config = preset(game);
    if let Some(path) = &cli.config {
        SessionOverrides::load(path)?.apply(&mut config);
    }
    if let Some(track) = cli.track.clone() {
        config.track = track;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let store: Box<dyn ProfileStore> = if cli.no_save {
        Box::new(MemoryProfileStore::new())
    } else {
        Box::new(JsonProfileStore::new(cli.profile.clone()))
    };

    if let Some(path) = &cli.replay {
        return run_replay(config, store, path);
    }

    println!();
    println!("  {}: opening play window…", game.title());
    println!();
    let input = if cli.relay { Input::Relay } else { Input::Pointer };
    let snap = app::run(config, store, input)?;
    println!("  Level {}/{}  Score {}/{}", snap.level, snap.max_level, snap.score, snap.max_score);
    for w in &snap.warnings {
        println!("  ⚠  {}", w);
    }
    Ok(())
}

fn run_replay(config: SessionConfig, store: Box<dyn ProfileStore>, path: &Path) -> anyhow::Result<()> {
    info!("replaying {}", path.display());
    let mut session = Session::start(config, store)?;
    let snap = if path.as_os_str() == "-" {
        replay(&mut session, io::stdin().lock())?
    } else {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        replay(&mut session, BufReader::new(file))?
    };
    println!("{}", serde_json::to_string_pretty(&snap)?);
    Ok(())
}

fn pick_game() -> GameKind {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Hand Gesture Practice — adaptive mini-games         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Mode: pointer simulation  (left button = fist, right = pinch)");
    println!();
    for (i, g) in GameKind::ALL.iter().enumerate() {
        println!("    {}. {}", i + 1, g.title());
    }
    match read_line("  Choice (1–5, default 1): ").trim() {
        "2" => GameKind::Leaf,
        "3" => GameKind::Fish,
        "4" => GameKind::Shadow,
        "5" => GameKind::Odd,
        _   => GameKind::Balloon,
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
