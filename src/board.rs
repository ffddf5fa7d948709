//! The rules engine: placements, win detection and the gravity-inverting flip

use std::fmt;
use std::str::FromStr;

use crate::config::GameConfig;
use crate::error::{Error, Result};

/// The token a flip is recorded as in the textual action line
pub const FLIP_TOKEN: i32 = -1;

// horizontal, vertical and both diagonals, each scanned in both directions
const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// The player who moves after this one
    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Cell::from(*self), f)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Cell {
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The owner of the piece in this cell, if any
    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::PlayerOne => Some(Player::One),
            Cell::PlayerTwo => Some(Player::Two),
        }
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::One => Cell::PlayerOne,
            Player::Two => Cell::PlayerTwo,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cell::Empty => "Empty",
            Cell::PlayerOne => "One",
            Cell::PlayerTwo => "Two",
        };
        f.write_str(name)
    }
}

/// A single ply: a placement into a 0-based column, or a flip
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Action {
    Place(usize),
    Flip,
}

impl Action {
    /// The integer token used in the textual representation, `-1` for a flip
    pub fn token(&self) -> i32 {
        match self {
            Action::Place(column) => *column as i32,
            Action::Flip => FLIP_TOKEN,
        }
    }

    /// Parses a whitespace separated action line such as `0 1 -1 2`
    pub fn parse_line(line: &str) -> Result<Vec<Action>> {
        line.split_whitespace().map(str::parse::<Action>).collect()
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.parse::<i32>() {
            Ok(FLIP_TOKEN) => Ok(Action::Flip),
            Ok(column) if column >= 0 => Ok(Action::Place(column as usize)),
            _ => Err(Error::ParseAction {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// A flip connect 4 board of arbitrary size
///
/// # Notes
/// Besides ordinary placements a player may flip the board, which rebuilds every
/// column upside down under gravity. A flip is only legal after at least one
/// placement since the previous flip, so the first move of a game is never a flip
/// and two flips never follow each other.
///
/// The recorded [`Action`] history is the identity of a position: two boards
/// reached through different histories are different leaves of the game tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Board {
    width: usize,
    height: usize,
    win_amount: usize,
    cells: Vec<Cell>, // cells are stored left-to-right, bottom-to-top
    heights: Vec<usize>,
    can_flip: bool,
    actions: Vec<Action>,
}

impl Board {
    /// Creates an empty board
    pub fn new(config: GameConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            win_amount: config.win_amount,
            cells: vec![Cell::Empty; config.width * config.height],
            heights: vec![0; config.width],
            can_flip: false,
            actions: Vec::new(),
        }
    }

    pub fn with_dimensions(width: usize, height: usize, win_amount: usize) -> Result<Self> {
        Ok(Self::new(GameConfig::new(width, height, win_amount)?))
    }

    /// Replays an action history from an empty board.
    ///
    /// Players alternate one ply at a time starting with [`Player::One`], whether
    /// the ply was a placement or a flip. Returns the board and the winner of the
    /// final ply, if it won. Actions after a winning ply are rejected.
    pub fn replay(config: GameConfig, actions: &[Action]) -> Result<(Self, Option<Player>)> {
        let mut board = Self::new(config);
        let mut mover = Player::One;
        let mut winner = None;

        for (ply, action) in actions.iter().enumerate() {
            if winner.is_some() {
                return Err(Error::GameOver { ply });
            }
            winner = match *action {
                Action::Place(column) => {
                    if board.place(mover, column)? {
                        Some(mover)
                    } else {
                        None
                    }
                }
                Action::Flip => board.flip()?,
            };
            mover = mover.other();
        }
        Ok((board, winner))
    }

    pub fn config(&self) -> GameConfig {
        GameConfig {
            width: self.width,
            height: self.height,
            win_amount: self.win_amount,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn win_amount(&self) -> usize {
        self.win_amount
    }

    pub fn can_flip(&self) -> bool {
        self.can_flip
    }

    /// Every ply played so far, oldest first
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The action history as space separated tokens
    pub fn action_line(&self) -> String {
        let tokens: Vec<String> = self.actions.iter().map(ToString::to_string).collect();
        tokens.join(" ")
    }

    /// The cell at a 0-based column and row, row 0 being the bottom.
    ///
    /// Panics if the coordinates lie outside the board.
    pub fn cell(&self, column: usize, row: usize) -> Cell {
        assert!(column < self.width && row < self.height);
        self.cells[self.index(column, row)]
    }

    /// Number of pieces stacked in a column, 0 for a column outside the board
    pub fn column_height(&self, column: usize) -> usize {
        self.heights.get(column).copied().unwrap_or(0)
    }

    pub fn can_place(&self, column: usize) -> bool {
        self.heights
            .get(column)
            .map_or(false, |&filled| filled < self.height)
    }

    /// True when no placement and no flip is possible, i.e. the game is drawn
    pub fn is_exhausted(&self) -> bool {
        !self.can_flip && (0..self.width).all(|column| !self.can_place(column))
    }

    /// Drops a piece for `player` into `column`.
    ///
    /// Returns whether the placed piece completes a run of at least the win amount.
    pub fn place(&mut self, player: Player, column: usize) -> Result<bool> {
        if column >= self.width {
            return Err(Error::InvalidMove {
                column,
                reason: "column out of range",
            });
        }
        if !self.can_place(column) {
            return Err(Error::InvalidMove {
                column,
                reason: "column full",
            });
        }
        // any placement re-enables flipping
        self.can_flip = true;
        self.actions.push(Action::Place(column));
        Ok(self.drop_piece(player, column) >= self.win_amount)
    }

    /// Flips the board, returning the winner if the rebuilt board has one.
    ///
    /// Every column is re-stacked from its top piece downwards, so the old top
    /// piece becomes the new bottom piece. Each re-inserted piece is scored like
    /// a placement against the partially rebuilt board, and each player keeps
    /// their longest run. Among players reaching the win amount, the one with the
    /// strictly longest run wins; a tie for the longest run means no winner, even
    /// if both players passed the win amount.
    pub fn flip(&mut self) -> Result<Option<Player>> {
        if !self.can_flip {
            return Err(Error::InvalidFlip);
        }
        self.can_flip = false;
        self.actions.push(Action::Flip);

        let old_cells = std::mem::replace(
            &mut self.cells,
            vec![Cell::Empty; self.width * self.height],
        );
        let old_heights = std::mem::replace(&mut self.heights, vec![0; self.width]);

        let mut best_runs = [0usize; 2];
        for column in 0..self.width {
            for row in (0..old_heights[column]).rev() {
                let player = old_cells[self.index(column, row)]
                    .player()
                    .ok_or(Error::CorruptBoard { column, row })?;
                let run = self.drop_piece(player, column);
                let best = &mut best_runs[player.index()];
                *best = (*best).max(run);
            }
        }
        Ok(self.flip_winner(best_runs))
    }

    fn flip_winner(&self, best_runs: [usize; 2]) -> Option<Player> {
        let mut best = 0;
        let mut leaders = 0;
        let mut winner = None;
        for &player in [Player::One, Player::Two].iter() {
            let run = best_runs[player.index()];
            if run < self.win_amount {
                continue;
            }
            if run > best {
                best = run;
                leaders = 1;
                winner = Some(player);
            } else if run == best {
                leaders += 1;
            }
        }
        // no tie-break on the number of runs
        if leaders == 1 {
            winner
        } else {
            None
        }
    }

    /// Stacks a piece without touching the history, returning its longest run
    fn drop_piece(&mut self, player: Player, column: usize) -> usize {
        let row = self.heights[column];
        let index = self.index(column, row);
        self.cells[index] = Cell::from(player);
        self.heights[column] += 1;
        self.run_length(Cell::from(player), column, row)
    }

    /// Longest line of `cell` through (column, row) over all four axes
    fn run_length(&self, cell: Cell, column: usize, row: usize) -> usize {
        AXES.iter()
            .map(|&(dx, dy)| {
                1 + self.walk(cell, column, row, dx, dy) + self.walk(cell, column, row, -dx, -dy)
            })
            .fold(1, usize::max)
    }

    fn walk(&self, cell: Cell, column: usize, row: usize, dx: isize, dy: isize) -> usize {
        let mut count = 0;
        let mut x = column as isize + dx;
        let mut y = row as isize + dy;
        while x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.cells[self.index(x as usize, y as usize)] == cell
        {
            count += 1;
            x += dx;
            y += dy;
        }
        count
    }

    fn index(&self, column: usize, row: usize) -> usize {
        column + self.width * row
    }
}

/// The action line followed by the grid from the top row down
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.action_line())?;
        for row in (0..self.height).rev() {
            let cells: Vec<String> = (0..self.width)
                .map(|column| self.cells[self.index(column, row)].to_string())
                .collect();
            writeln!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}
