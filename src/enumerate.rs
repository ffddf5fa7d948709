//! Enumeration of every game from the empty board, sequentially or fanned out
//! over the first ply

use indicatif::*;
use log::{info, log_enabled, warn, Level};
use rayon::prelude::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::*;
use std::sync::Arc;
use std::thread;
use std::time::*;

use crate::board::{Board, Player};
use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::search::{successors, Ply, SearchDriver};
use crate::sink::{Outcome, OutcomeSink, UniqueOutcomes};

/// Outcomes a parallel enumeration may hold in flight before its workers block
pub const CHANNEL_BOUND: usize = 4096;

/// Totals of a finished enumeration
#[derive(Copy, Clone, Debug)]
pub struct EnumerationReport {
    /// Terminal outcomes reported
    pub outcomes: usize,
    /// Positions visited, the empty board included
    pub nodes: usize,
    pub elapsed: Duration,
}

fn branch_progress(branches: usize, show_progress: bool) -> ProgressBar {
    let progress = if show_progress {
        ProgressBar::new(branches as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Enumerating initial branches: {bar:40.cyan/blue} {pos}/{len} {msg} [{elapsed}]")
            .progress_chars("█▓▒░  "),
    );
    progress
}

// a visible bar owns stderr, so log lines go through it
fn log_branch(progress: &ProgressBar, line: String) {
    if progress.is_hidden() {
        info!("{}", line);
    } else if log_enabled!(Level::Info) {
        progress.println(line);
    }
}

/// Reports every terminal outcome of the game described by `config` to `sink`,
/// in depth-first visiting order
pub fn enumerate<S: OutcomeSink>(
    config: GameConfig,
    sink: &mut S,
    show_progress: bool,
) -> Result<EnumerationReport> {
    let start = Instant::now();
    let root = Board::new(config);

    // the empty board always has a free column, so the root is never a draw
    let plies = successors(&root, Player::One).collect::<Result<Vec<_>>>()?;
    let progress = branch_progress(plies.len(), show_progress);

    let mut driver = SearchDriver::new(sink);
    for (branch, ply) in plies.into_iter().enumerate() {
        driver.follow(ply)?;
        log_branch(
            &progress,
            format!(
                "Completed initial branch {}, {} outcomes so far",
                branch,
                driver.outcome_count()
            ),
        );
        progress.inc(1);
        progress.set_message(&format!("({} outcomes)", driver.outcome_count()));
    }
    progress.finish();

    Ok(EnumerationReport {
        outcomes: driver.outcome_count(),
        nodes: driver.node_count() + 1,
        elapsed: start.elapsed(),
    })
}

enum Message {
    Outcome(Outcome),
    // positions visited by a finished branch
    Finish(usize),
    Failed(Error),
}

/// Forwards outcomes from a worker to the collecting thread
struct ChannelSink(SyncSender<Message>);

impl OutcomeSink for ChannelSink {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        self.0
            .send(Message::Outcome(Outcome::win(winner, board)))
            .map_err(|_| Error::Cancelled)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        self.0
            .send(Message::Outcome(Outcome::draw(board)))
            .map_err(|_| Error::Cancelled)
    }
}

// keep the error that caused a cancellation over the cancellations it caused
fn record_failure(failure: &mut Option<Error>, err: Error) {
    match failure {
        None | Some(Error::Cancelled) => *failure = Some(err),
        Some(_) => {}
    }
}

/// Like [`enumerate`], but every branch after the first ply is searched on its
/// own rayon worker with its own board.
///
/// Outcomes are funnelled through a channel to the calling thread, which owns
/// `sink` and checks that no action history is reported twice across branches.
/// The order of reports between branches is not defined. The first error
/// cancels all remaining workers and is returned.
///
/// At most [`CHANNEL_BOUND`] outcomes wait for the calling thread at any time,
/// so a slow sink throttles the workers instead of queueing the whole tree.
pub fn enumerate_parallel<S: OutcomeSink>(
    config: GameConfig,
    sink: &mut S,
    show_progress: bool,
) -> Result<EnumerationReport> {
    enumerate_parallel_bounded(config, sink, show_progress, CHANNEL_BOUND)
}

pub(crate) fn enumerate_parallel_bounded<S: OutcomeSink>(
    config: GameConfig,
    sink: &mut S,
    show_progress: bool,
    bound: usize,
) -> Result<EnumerationReport> {
    let start = Instant::now();
    let mut next_time = start;
    let root = Board::new(config);
    let mut sink = UniqueOutcomes::new(sink);

    let mut branches = Vec::new();
    for ply in successors(&root, Player::One) {
        match ply? {
            Ply::Terminal(outcome) => sink.report(outcome)?,
            Ply::Continue(board, mover) => branches.push((board, mover)),
        }
    }

    let progress = branch_progress(branches.len(), show_progress);
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = sync_channel(bound);

    let workers = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            branches
                .into_par_iter()
                .for_each_with(tx, |tx, (board, mover)| {
                    let mut driver =
                        SearchDriver::new(ChannelSink(tx.clone())).with_cancel_flag(cancel.clone());
                    let message = match driver.search(&board, mover) {
                        Ok(()) => Message::Finish(driver.node_count()),
                        Err(err) => {
                            cancel.store(true, Ordering::Relaxed);
                            Message::Failed(err)
                        }
                    };
                    // the collector outlives every worker
                    let _ = tx.send(message);
                });
        })
    };

    let mut nodes = 1;
    let mut finished = 0;
    let mut failure = None;
    // the channel closes once every worker is done, and draining it until then
    // keeps workers blocked on a full channel moving after a failure
    for message in rx {
        match message {
            Message::Outcome(outcome) => {
                if failure.is_none() {
                    if let Err(err) = sink.report(outcome) {
                        cancel.store(true, Ordering::Relaxed);
                        record_failure(&mut failure, err);
                    }
                }
            }
            Message::Finish(branch_nodes) => {
                nodes += branch_nodes;
                finished += 1;
                log_branch(
                    &progress,
                    format!(
                        "Completed initial branch {} of {}, {} outcomes so far",
                        finished,
                        progress.length(),
                        sink.len()
                    ),
                );
                progress.inc(1);
            }
            Message::Failed(err) => record_failure(&mut failure, err),
        }
        if Instant::now() > next_time {
            progress.set_message(&format!("({} outcomes)", sink.len()));
            next_time += Duration::from_millis(100);
        }
    }
    progress.finish();
    if let Err(panic) = workers.join() {
        std::panic::resume_unwind(panic);
    }

    if let Some(err) = failure {
        warn!("Enumeration aborted after {} outcomes: {}", sink.len(), err);
        return Err(err);
    }

    Ok(EnumerationReport {
        outcomes: sink.len(),
        nodes,
        elapsed: start.elapsed(),
    })
}
