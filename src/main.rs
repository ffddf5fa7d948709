use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::HumanDuration;
use log::{info, Level};

use std::path::PathBuf;

use flip_connect4::archive::BoardArchive;
use flip_connect4::outcome_log::{self, OutcomeLog};
use flip_connect4::*;

mod terminal;

#[derive(Parser)]
#[command(name = "flip_connect4")]
#[command(version, about = "Enumerate every terminal state of flip connect 4", long_about = None)]
struct Cli {
    /// Board width in columns
    #[arg(long, default_value_t = 3, global = true)]
    width: usize,

    /// Board height in rows
    #[arg(long, default_value_t = 3, global = true)]
    height: usize,

    /// Run length needed to win
    #[arg(long = "win", default_value_t = 3, global = true)]
    win_amount: usize,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk every legal game from the empty board and record how each one ends
    Enumerate(EnumerateArgs),

    /// Replay an action line such as "0 1 -1 2" and draw the board
    Replay {
        /// Space separated 0-based columns, -1 for a flip
        #[arg(allow_hyphen_values = true)]
        actions: String,
    },

    /// Replay and summarise every outcome in a binary outcome log
    Inspect {
        /// Log written by `enumerate --log`
        log: PathBuf,
    },
}

#[derive(Args)]
struct EnumerateArgs {
    /// Write one text file per terminal board below this directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write every outcome to a binary log
    #[arg(long)]
    log: Option<PathBuf>,

    /// Search the initial branches on all cores
    #[arg(long)]
    parallel: bool,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,

    /// Draw the last terminal board reported
    #[arg(long)]
    show_last: bool,
}

/// Keeps only the most recent outcome
struct LastOutcome(Option<Outcome>);

impl OutcomeSink for LastOutcome {
    fn report_win(&mut self, winner: Player, board: Board) -> flip_connect4::Result<()> {
        self.0 = Some(Outcome::win(winner, board));
        Ok(())
    }

    fn report_draw(&mut self, board: Board) -> flip_connect4::Result<()> {
        self.0 = Some(Outcome::draw(board));
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    simple_logger::init_with_level(level)?;

    let config = GameConfig::new(cli.width, cli.height, cli.win_amount)?;

    match cli.command {
        Commands::Enumerate(args) => run_enumerate(config, args),
        Commands::Replay { actions } => run_replay(config, &actions),
        Commands::Inspect { log } => run_inspect(log),
    }
}

fn run_enumerate(config: GameConfig, args: EnumerateArgs) -> Result<()> {
    info!(
        "Enumerating a {}x{} board, {} in a row to win",
        config.width, config.height, config.win_amount
    );

    let archive = match &args.output {
        Some(root) => Some(
            BoardArchive::create(root)
                .with_context(|| format!("failed to prepare {}", root.display()))?,
        ),
        None => None,
    };
    let log = match &args.log {
        Some(path) => Some(
            OutcomeLog::create(path, &config)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => None,
    };
    let last = if args.show_last {
        Some(LastOutcome(None))
    } else {
        None
    };

    let mut sink = (Tally::new(), (archive, (log, last)));
    let report = if args.parallel {
        enumerate_parallel(config, &mut sink, !args.quiet)?
    } else {
        enumerate(config, &mut sink, !args.quiet)?
    };
    let (tally, (archive, (log, last))) = sink;

    if let Some(log) = log {
        println!("Wrote {} outcomes to the outcome log", log.records());
        log.finish()?;
    }
    if let Some(archive) = archive {
        println!(
            "Wrote {} boards below {}",
            archive.written(),
            archive.root().display()
        );
    }
    if let Some(LastOutcome(Some(outcome))) = last {
        terminal::display(&outcome.board)?;
        println!("{}", outcome.classification);
    }

    println!("{}", tally);
    println!(
        "Enumeration completed in {}, {} positions visited",
        HumanDuration(report.elapsed),
        report.nodes
    );
    Ok(())
}

fn run_replay(config: GameConfig, actions: &str) -> Result<()> {
    let actions = Action::parse_line(actions)?;
    let (board, winner) = Board::replay(config, &actions)?;

    terminal::display(&board)?;
    match winner {
        Some(player) => println!("{} won in {} actions", player, actions.len()),
        None if board.is_exhausted() => println!("Draw in {} actions", actions.len()),
        None => {
            let mover = if actions.len() % 2 == 0 {
                Player::One
            } else {
                Player::Two
            };
            let flip = if board.can_flip() { ", flip available" } else { "" };
            println!("Game in progress, {} to move{}", mover, flip);
        }
    }
    Ok(())
}

fn run_inspect(path: PathBuf) -> Result<()> {
    let (config, outcomes) = outcome_log::load(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    println!(
        "{}x{} board, {} in a row to win",
        config.width, config.height, config.win_amount
    );

    let mut tally = Tally::new();
    {
        let mut unique = UniqueOutcomes::new(&mut tally);
        for logged in outcomes.iter() {
            unique.report(logged.replay(config)?)?;
        }
    }
    println!("{}", tally);
    Ok(())
}
