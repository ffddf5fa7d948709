//! Consumers of the terminal outcomes produced by the search

use log::debug;

use std::collections::HashSet;
use std::fmt;

use crate::board::{Action, Board, Player};
use crate::error::{Error, Result};

/// How a terminal board ended
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Classification {
    Win(Player),
    Draw,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Win(player) => write!(f, "{} won", player),
            Classification::Draw => f.write_str("Draw"),
        }
    }
}

/// A terminal board together with its classification
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub classification: Classification,
    pub board: Board,
}

impl Outcome {
    pub fn win(winner: Player, board: Board) -> Self {
        Self {
            classification: Classification::Win(winner),
            board,
        }
    }

    pub fn draw(board: Board) -> Self {
        Self {
            classification: Classification::Draw,
            board,
        }
    }
}

/// Receives every terminal board reached by the search
pub trait OutcomeSink {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()>;

    fn report_draw(&mut self, board: Board) -> Result<()>;

    fn report(&mut self, outcome: Outcome) -> Result<()> {
        match outcome.classification {
            Classification::Win(winner) => self.report_win(winner, outcome.board),
            Classification::Draw => self.report_draw(outcome.board),
        }
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for &mut S {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        (**self).report_win(winner, board)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        (**self).report_draw(board)
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for Box<S> {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        (**self).report_win(winner, board)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        (**self).report_draw(board)
    }
}

/// A disabled sink ignores everything
impl<S: OutcomeSink> OutcomeSink for Option<S> {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        match self {
            Some(sink) => sink.report_win(winner, board),
            None => Ok(()),
        }
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        match self {
            Some(sink) => sink.report_draw(board),
            None => Ok(()),
        }
    }
}

/// Both sinks receive every outcome, the first one a copy
impl<A: OutcomeSink, B: OutcomeSink> OutcomeSink for (A, B) {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        self.0.report_win(winner, board.clone())?;
        self.1.report_win(winner, board)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        self.0.report_draw(board.clone())?;
        self.1.report_draw(board)
    }
}

impl OutcomeSink for Vec<Outcome> {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        self.push(Outcome::win(winner, board));
        Ok(())
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        self.push(Outcome::draw(board));
        Ok(())
    }
}

/// Rejects a second report of any action history before it reaches the inner sink.
///
/// Every terminal report must be a distinct leaf of the game tree, so a repeated
/// history means the enumeration itself is broken and the run has to stop.
pub struct UniqueOutcomes<S> {
    inner: S,
    seen: HashSet<Vec<Action>>,
}

impl<S: OutcomeSink> UniqueOutcomes<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
        }
    }

    /// Number of distinct histories reported so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn admit(&mut self, board: &Board) -> Result<()> {
        if self.seen.insert(board.actions().to_vec()) {
            Ok(())
        } else {
            Err(Error::StructuralViolation {
                actions: board.action_line(),
            })
        }
    }
}

impl<S: OutcomeSink> OutcomeSink for UniqueOutcomes<S> {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        self.admit(&board)?;
        self.inner.report_win(winner, board)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        self.admit(&board)?;
        self.inner.report_draw(board)
    }
}

/// Counts outcomes by class and tracks the shortest and longest games
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    pub player_one_wins: usize,
    pub player_two_wins: usize,
    pub draws: usize,
    pub shortest: Option<usize>,
    pub longest: Option<usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.player_one_wins + self.player_two_wins + self.draws
    }

    fn record_length(&mut self, plies: usize) {
        self.shortest = Some(self.shortest.map_or(plies, |s| s.min(plies)));
        self.longest = Some(self.longest.map_or(plies, |l| l.max(plies)));
    }
}

impl OutcomeSink for Tally {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        let plies = board.actions().len();
        debug!("{} won in {} actions", winner, plies);
        match winner {
            Player::One => self.player_one_wins += 1,
            Player::Two => self.player_two_wins += 1,
        }
        self.record_length(plies);
        Ok(())
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        let plies = board.actions().len();
        debug!("Draw in {} actions", plies);
        self.draws += 1;
        self.record_length(plies);
        Ok(())
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} terminal states: {} player 1 wins, {} player 2 wins, {} draws",
            self.total(),
            self.player_one_wins,
            self.player_two_wins,
            self.draws
        )?;
        if let (Some(shortest), Some(longest)) = (self.shortest, self.longest) {
            write!(f, " (games of {} to {} actions)", shortest, longest)?;
        }
        Ok(())
    }
}
