//! Tictac-Zero command line.
//!
//! ## Usage
//!
//! - `tictac-zero` - Show a demo
//! - `tictac-zero demo` - Search the empty board and a forced win
//! - `tictac-zero analyze --moves 0,3,1,4` - Search a position and print the
//!   per-move statistics and move distribution

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fastrand::Rng;
use tracing::info;

use tictac_zero::board::TicTacToe;
use tictac_zero::config::EngineConfig;
use tictac_zero::constants::{DEFAULT_SEED, MAX_SIM_DEPTH, N_SIMS, PUCT_C, UCB1_C};
use tictac_zero::game::{GameState, Player};
use tictac_zero::mcts::{MctsEngine, MoveDistribution, RootStat};
use tictac_zero::oracle::UniformOracle;

/// Tictac-Zero: Monte Carlo Tree Search for tic-tac-toe
#[derive(Parser)]
#[command(name = "tictac-zero")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a short demo of the engine
    Demo,
    /// Search a position and report the statistics
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Moves played so far, as square indices (e.g. 0,3,1,4)
    #[arg(long, value_delimiter = ',')]
    moves: Vec<usize>,

    /// Board size
    #[arg(long, default_value_t = 3)]
    size: usize,

    /// Number of simulations
    #[arg(long, default_value_t = N_SIMS, conflicts_with = "millis")]
    sims: u32,

    /// Search for this many milliseconds instead of a fixed simulation count
    #[arg(long)]
    millis: Option<u64>,

    /// Temperature for the printed move distribution and the sampled move
    #[arg(long, default_value_t = 1.0)]
    temperature: f64,

    /// Exploration constant (defaults to 1.4 for rollouts, 1.25 when guided)
    #[arg(long)]
    exploration: Option<f64>,

    /// Maximum plies per simulation
    #[arg(long, default_value_t = MAX_SIM_DEPTH)]
    max_depth: usize,

    /// Seed for the engine's random source
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Use PUCT with a uniform-prior oracle instead of random rollouts
    #[arg(long)]
    guided: bool,
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Some(Commands::Analyze(args)) => analyze(&args),
        Some(Commands::Demo) | None => run_demo(),
    }
}

fn run_demo() -> Result<()> {
    println!("Tictac-Zero: Monte Carlo Tree Search\n");

    println!("=== Empty board, rollouts ===");
    let board = TicTacToe::new(3);
    let mut engine = MctsEngine::new(EngineConfig::default())?;
    let best = engine.select_move(&board)?;
    let stats = engine.last_stats();
    println!("{board}");
    println!(
        "Best move: {} ({} simulations, {:?})",
        fmt_move(best),
        stats.simulations,
        stats.elapsed
    );

    println!("\n=== Forced win, guided ===");
    let board = TicTacToe::from_moves(&[0, 3, 1, 4])?;
    let mut engine = MctsEngine::with_oracle(EngineConfig::for_guided(), UniformOracle::new())?;
    let best = engine.select_move(&board)?;
    println!("{board}");
    println!("Best move: {}", fmt_move(best));
    print_root_stats(&engine.root_stats(&board));
    Ok(())
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    if args.size < 3 {
        bail!("board size must be at least 3, got {}", args.size);
    }
    let mut board = TicTacToe::new(args.size);
    for &sq in &args.moves {
        board
            .try_play(sq)
            .with_context(|| format!("cannot play square {sq}"))?;
    }

    let default_c = if args.guided { PUCT_C } else { UCB1_C };
    let mut config = EngineConfig::default()
        .with_simulations(args.sims)
        .with_exploration(args.exploration.unwrap_or(default_c))
        .with_max_depth(args.max_depth)
        .with_seed(args.seed);
    if let Some(ms) = args.millis {
        config = config.with_time_limit(Duration::from_millis(ms));
    }

    let mut engine = if args.guided {
        MctsEngine::with_oracle(config, UniformOracle::new())?
    } else {
        MctsEngine::new(config)?
    };
    info!(guided = engine.is_guided(), moves = ?args.moves, "analyzing position");

    println!("{board}");
    if board.legal_actions().is_empty() {
        println!("Game over: {:?}", board.winner());
        return Ok(());
    }

    let dist = engine.move_distribution(&board, args.temperature)?;
    let stats = engine.last_stats();
    print_root_stats(&engine.root_stats(&board));
    println!();
    print_visit_grid(&board, &engine.root_stats(&board));
    println!();
    print_distribution(&dist, args.temperature);
    let mut rng = Rng::with_seed(args.seed);
    println!(
        "\nBest move: {}  sampled move: {}",
        fmt_move(engine.best_action(&board).or(dist.most_likely())),
        fmt_move(dist.sample(&mut rng))
    );
    println!(
        "Simulations: {}  elapsed: {:?}  deepest expansion: {}  truncated: {}",
        stats.simulations, stats.elapsed, stats.max_depth, stats.truncated
    );
    Ok(())
}

fn fmt_move(mv: Option<usize>) -> String {
    mv.map_or_else(|| "none".to_string(), |sq| sq.to_string())
}

fn print_root_stats(stats: &[RootStat<usize>]) {
    println!("{:>6} {:>7} {:>8} {:>7} {:>6}", "move", "N", "W", "Q", "P");
    for s in stats {
        let q = s.mean_value.map_or_else(|| "-".to_string(), |q| format!("{q:.3}"));
        let p = s.prior.map_or_else(|| "-".to_string(), |p| format!("{p:.3}"));
        println!(
            "{:>6} {:>7} {:>8.1} {:>7} {:>6}",
            s.action, s.visits, s.total_value, q, p
        );
    }
}

/// Root visit counts laid out on the board; occupied squares show the stone.
fn print_visit_grid(board: &TicTacToe, stats: &[RootStat<usize>]) {
    let n = board.size();
    let width = stats
        .iter()
        .map(|s| s.visits.to_string().len())
        .max()
        .unwrap_or(1);
    for row in 0..n {
        let cells: Vec<String> = (0..n)
            .map(|col| {
                let sq = row * n + col;
                let text = match board.get(sq) {
                    Some(Player::First) => "X".to_string(),
                    Some(Player::Second) => "O".to_string(),
                    None => stats
                        .iter()
                        .find(|s| s.action == sq)
                        .map_or_else(|| "0".to_string(), |s| s.visits.to_string()),
                };
                format!("{text:>width$}")
            })
            .collect();
        println!("| {} |", cells.join(" | "));
    }
}

fn print_distribution(dist: &MoveDistribution<usize>, temperature: f64) {
    println!("Move distribution (temperature {temperature}):");
    for &(sq, p) in dist.entries() {
        println!("{sq:>6} {p:.4}");
    }
}
