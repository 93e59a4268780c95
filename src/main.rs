//! Goban-Sync: keeps a physical Go board and its game record in sync.
//!
//! ## Usage
//!
//! - `goban-sync` - Show a reconciliation demo
//! - `goban-sync serve` - Run the JSON line protocol on stdin/stdout
//! - `goban-sync demo` - Run the demo explicitly
//!
//! Pass `--config <file>` to override board size, komi, seats and
//! scoring defaults from a JSON file.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use goban_sync::board::{self, BoardState, Color, Coord, Stone};
use goban_sync::config::GameConfig;
use goban_sync::reconcile::Reconciler;
use goban_sync::record::GameRecord;
use goban_sync::session::Session;

/// Goban-Sync: physical board digitization core
#[derive(Parser)]
#[command(name = "goban-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON line protocol session on stdin/stdout
    Serve,
    /// Run a scripted reconciliation demo
    Demo,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => GameConfig::default(),
    };

    match cli.command {
        Some(Commands::Serve) => {
            let mut session = Session::new(config);
            session.run()?;
        }
        Some(Commands::Demo) | None => {
            run_demo(config)?;
        }
    }
    Ok(())
}

/// Walk through a short game the way the sensor would report it,
/// including the cleanup dance after a capture.
fn run_demo(config: GameConfig) -> anyhow::Result<()> {
    println!("Goban-Sync: board reconciliation demo\n");

    let size = config.board_size;
    let mut record = GameRecord::new(config);
    let mut reconciler = Reconciler::new(config.players);
    let mut observed = BoardState::new();

    println!("=== Alternating play ===");
    let mut color = Color::Black;
    for vertex in ["C4", "D4", "E4", "G7", "D3", "G6"] {
        observed.insert(stone(color, vertex, size)?);
        step(&mut reconciler, &mut record, &observed);
        color = color.other();
    }
    println!("{}\n", board::render(&record.board_state(), size));

    println!("=== Capture cleanup ===");
    // Black D5 captures White D4 in the record, but the dead stone is
    // still sitting on the physical board.
    observed.insert(stone(Color::Black, "D5", size)?);
    step(&mut reconciler, &mut record, &observed);

    // The player lifts the captured stone and the boards agree again.
    observed.remove(&stone(Color::White, "D4", size)?);
    step(&mut reconciler, &mut record, &observed);
    println!("{}", board::render(&record.board_state(), size));
    println!("prisoners: {:?}\n", record.prisoners());

    println!("=== Random continuation ===");
    fastrand::seed(0x60ba);
    for _ in 0..6 {
        let vertex = random_empty_vertex(&record.board_state(), size);
        observed.insert(stone(record.current_player(), &vertex, size)?);
        step(&mut reconciler, &mut record, &observed);
        // Mirror captures in the simulated snapshot, clearing any
        // mismatch the way a player lifting dead stones would
        observed = record.board_state();
        if reconciler.invalid() {
            step(&mut reconciler, &mut record, &observed);
        }
    }
    println!("{}", board::render(&record.board_state(), size));

    Ok(())
}

fn step(reconciler: &mut Reconciler, record: &mut GameRecord, observed: &BoardState) {
    match reconciler.reconcile(record, observed) {
        Ok(outcome) => println!("ok: {outcome:?}"),
        Err(error) => println!("!! {error}"),
    }
}

fn stone(color: Color, vertex: &str, size: usize) -> anyhow::Result<Stone> {
    Ok(Stone {
        color,
        coord: Coord::from_text(vertex, size)?,
    })
}

fn random_empty_vertex(state: &BoardState, size: usize) -> String {
    loop {
        let coord = Coord {
            col: fastrand::usize(..size) as u8,
            row: fastrand::usize(..size) as u8,
        };
        let occupied = state.iter().any(|s| s.coord == coord);
        if !occupied {
            return coord.text();
        }
    }
}
