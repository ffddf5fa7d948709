//! Exhaustive depth-first enumeration of every terminal outcome

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::board::{Board, Player};
use crate::error::{Error, Result};
use crate::sink::{OutcomeSink, Outcome, UniqueOutcomes};

/// The result of applying one legal ply to a board
#[derive(Clone, Debug)]
pub enum Ply {
    /// The ply ended the game
    Terminal(Outcome),
    /// The game continues from this board with the given player to move
    Continue(Board, Player),
}

/// Iterator over the legal plies from a position, in visiting order:
/// placements from the leftmost column to the rightmost, then the flip.
///
/// Every yielded board is an independent copy of the parent.
pub struct Successors<'a> {
    board: &'a Board,
    mover: Player,
    column: usize,
    flip_tried: bool,
}

pub fn successors(board: &Board, mover: Player) -> Successors<'_> {
    Successors {
        board,
        mover,
        column: 0,
        flip_tried: false,
    }
}

impl<'a> Iterator for Successors<'a> {
    type Item = Result<Ply>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.column < self.board.width() {
            let column = self.column;
            self.column += 1;
            if !self.board.can_place(column) {
                continue;
            }

            let mut next = self.board.clone();
            return Some(match next.place(self.mover, column) {
                Ok(true) => Ok(Ply::Terminal(Outcome::win(self.mover, next))),
                Ok(false) => Ok(Ply::Continue(next, self.mover.other())),
                Err(err) => Err(err),
            });
        }

        if !self.flip_tried {
            self.flip_tried = true;
            if self.board.can_flip() {
                let mut next = self.board.clone();
                // a flip hands the turn over like any other ply
                return Some(match next.flip() {
                    Ok(Some(winner)) => Ok(Ply::Terminal(Outcome::win(winner, next))),
                    Ok(None) => Ok(Ply::Continue(next, self.mover.other())),
                    Err(err) => Err(err),
                });
            }
        }
        None
    }
}

/// Walks every legal move sequence from a position and reports each terminal board
///
/// # Notes
/// The walk is a plain depth-first traversal without pruning: every leaf of the
/// game tree is reported exactly once, in visiting order. Reports pass through a
/// [`UniqueOutcomes`] layer, so a repeated action history aborts the search with
/// [`Error::StructuralViolation`].
pub struct SearchDriver<S> {
    sink: UniqueOutcomes<S>,

    /// The number of positions visited so far (for diagnostics only)
    node_count: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: OutcomeSink> SearchDriver<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: UniqueOutcomes::new(sink),
            node_count: 0,
            cancel: None,
        }
    }

    /// Makes the search fail with [`Error::Cancelled`] once `flag` is raised
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of terminal outcomes reported so far
    pub fn outcome_count(&self) -> usize {
        self.sink.len()
    }

    pub fn sink(&self) -> &S {
        self.sink.inner()
    }

    pub fn into_sink(self) -> S {
        self.sink.into_inner()
    }

    /// Enumerates every game continuing from `board` with `mover` to play
    pub fn search(&mut self, board: &Board, mover: Player) -> Result<()> {
        self.explore(board, mover)
    }

    /// Reports a terminal ply, or enumerates every game continuing from it
    pub fn follow(&mut self, ply: Ply) -> Result<()> {
        match ply {
            Ply::Terminal(outcome) => self.sink.report(outcome),
            Ply::Continue(next, mover) => self.explore(&next, mover),
        }
    }

    fn explore(&mut self, board: &Board, mover: Player) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
        }
        self.node_count += 1;

        // no placement and no flip left
        if board.is_exhausted() {
            return self.sink.report_draw(board.clone());
        }

        for ply in successors(board, mover) {
            self.follow(ply?)?;
        }
        Ok(())
    }
}
