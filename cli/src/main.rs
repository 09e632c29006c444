use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use minelogic_core::*;
use serde::Serialize;
use web_time::Instant;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// Board position to solve
    board: PathBuf,

    /// Cell to open when nothing is revealed yet, as `x,y`
    #[arg(short, long, value_parser = parse_coords)]
    start: Option<Coord2>,

    /// Give up after this many turns
    #[arg(long, default_value_t = 100_000)]
    max_turns: usize,

    /// Skip subset deduction, only use single-cell rules
    #[arg(long)]
    basic: bool,

    /// Print the result and every move as JSON
    #[arg(long)]
    trace: bool,
}

#[derive(Serialize, Debug)]
struct Report {
    phase: GamePhase,
    turns: usize,
    revealed: CellCount,
    flagged: CellCount,
    elapsed_ms: f64,
    moves: Vec<Action>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose.log_level_filter());

    let text = std::fs::read_to_string(&args.board)
        .with_context(|| format!("could not read {}", args.board.display()))?;
    let mut engine: PlayEngine = text
        .parse()
        .with_context(|| format!("invalid board in {}", args.board.display()))?;
    log::debug!("loaded a {:?} board with {} mines", engine.size(), engine.total_mines());

    let rules = if args.basic {
        RuleSet::Basic
    } else {
        RuleSet::Full
    };
    let mut solver = Solver::new(SolverConfig { rules });
    let started = Instant::now();

    if engine.phase() == GamePhase::Initialized {
        solver.step(&mut engine)?;
        let start = match args.start {
            Some(start) => start,
            None => default_opening(&engine).context("board has no safe cell to open")?,
        };
        log::info!("opening at {start:?}");
        engine
            .reveal(start)
            .with_context(|| format!("could not open {start:?}"))?;
    } else if args.start.is_some() {
        log::warn!("position is already started, ignoring --start");
    }

    let turns = solver.run(&mut engine, args.max_turns)?;
    let report = Report {
        phase: engine.phase(),
        turns: turns.len(),
        revealed: engine.revealed_count(),
        flagged: engine.flagged_count(),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.,
        moves: turns.iter().filter_map(|turn| turn.action()).collect(),
    };

    match turns.last() {
        Some(Turn::Finished(GamePhase::Lost)) => {
            log::warn!("hit a mine at {:?}, the position's flags are wrong", engine.triggered_mine())
        }
        Some(Turn::Idle) => log::info!("no certain move left"),
        Some(turn) if turn.can_continue() => log::warn!("stopped after {} turns", args.max_turns),
        _ => {}
    }

    if args.trace {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("phase:    {:?}", report.phase);
        println!("turns:    {}", report.turns);
        println!("revealed: {}", report.revealed);
        println!("flagged:  {}", report.flagged);
        println!("elapsed:  {:.3}ms", report.elapsed_ms);
    }

    Ok(())
}

fn init_logging(filter: log::LevelFilter) {
    use tracing_subscriber::filter::LevelFilter;

    let level = match filter {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_coords(text: &str) -> Result<Coord2, String> {
    let (x, y) = text.split_once(',').ok_or("expected `x,y`")?;
    let parse = |part: &str| {
        part.trim()
            .parse::<Coord>()
            .map_err(|err| format!("{part:?}: {err}"))
    };
    Ok((parse(x)?, parse(y)?))
}

/// First hidden cell without adjacent mines in row order, else the first hidden safe cell.
fn default_opening(engine: &PlayEngine) -> Option<Coord2> {
    let (size_x, size_y) = engine.size();
    let candidates = move || {
        (0..size_y)
            .flat_map(move |y| (0..size_x).map(move |x| (x, y)))
            .filter(move |&pos| engine.cell_at(pos) == EngineCell::Hidden && !engine.has_mine_at(pos))
    };

    candidates()
        .find(|&pos| {
            NeighborIter::new(pos, engine.size()).all(|neighbor| !engine.has_mine_at(neighbor))
        })
        .or_else(|| candidates().next())
}
