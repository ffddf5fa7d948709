//! Compact binary log of terminal outcomes
//!
//! All integers are big-endian. The header holds the game parameters as three
//! `u16`s (width, height, win amount). Each record that follows is a `u8`
//! classification (0 draw, 1 player one, 2 player two), a `u16` action count and
//! one `i16` per action, `-1` being a flip.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use std::convert::TryFrom;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::board::{Action, Board, Player, FLIP_TOKEN};
use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::sink::{Classification, Outcome, OutcomeSink};

const DRAW: u8 = 0;
const PLAYER_ONE: u8 = 1;
const PLAYER_TWO: u8 = 2;

fn to_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::CorruptLog {
        reason: format!("{} {} does not fit in 16 bits", what, value),
    })
}

/// Appends outcomes to a binary log
pub struct OutcomeLog<W: Write> {
    writer: W,
    records: usize,
}

impl OutcomeLog<BufWriter<File>> {
    /// Creates (or truncates) a log file and writes its header
    pub fn create<P: AsRef<Path>>(path: P, config: &GameConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::new(BufWriter::new(file), config)
    }
}

impl<W: Write> OutcomeLog<W> {
    pub fn new(mut writer: W, config: &GameConfig) -> Result<Self> {
        writer.write_u16::<BigEndian>(to_u16(config.width, "width")?)?;
        writer.write_u16::<BigEndian>(to_u16(config.height, "height")?)?;
        writer.write_u16::<BigEndian>(to_u16(config.win_amount, "win amount")?)?;
        Ok(Self { writer, records: 0 })
    }

    /// Number of outcomes written so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flushes the log and hands back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_record(&mut self, class: u8, board: &Board) -> Result<()> {
        self.writer.write_u8(class)?;
        self.writer
            .write_u16::<BigEndian>(to_u16(board.actions().len(), "action count")?)?;
        for action in board.actions() {
            let token = i16::try_from(action.token()).map_err(|_| Error::CorruptLog {
                reason: format!("action {} does not fit in 16 bits", action),
            })?;
            self.writer.write_i16::<BigEndian>(token)?;
        }
        self.records += 1;
        Ok(())
    }
}

impl<W: Write> OutcomeSink for OutcomeLog<W> {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        let class = match winner {
            Player::One => PLAYER_ONE,
            Player::Two => PLAYER_TWO,
        };
        self.write_record(class, &board)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        self.write_record(DRAW, &board)
    }
}

/// One record read back from a log
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoggedOutcome {
    pub classification: Classification,
    pub actions: Vec<Action>,
}

impl LoggedOutcome {
    /// Rebuilds the terminal board and checks that it ends the way the log says
    pub fn replay(&self, config: GameConfig) -> Result<Outcome> {
        let (board, winner) = Board::replay(config, &self.actions)?;
        let classification = match winner {
            Some(player) => Classification::Win(player),
            None if board.is_exhausted() => Classification::Draw,
            None => {
                return Err(Error::CorruptLog {
                    reason: format!("game [{}] is not over", board.action_line()),
                })
            }
        };
        if classification != self.classification {
            return Err(Error::CorruptLog {
                reason: format!(
                    "game [{}] logged as '{}' but replays as '{}'",
                    board.action_line(),
                    self.classification,
                    classification
                ),
            });
        }
        Ok(Outcome {
            classification,
            board,
        })
    }
}

/// Reads a whole log from a file
pub fn load<P: AsRef<Path>>(path: P) -> Result<(GameConfig, Vec<LoggedOutcome>)> {
    read_log(BufReader::new(File::open(path)?))
}

pub fn read_log<R: Read>(mut reader: R) -> Result<(GameConfig, Vec<LoggedOutcome>)> {
    let width = reader.read_u16::<BigEndian>()? as usize;
    let height = reader.read_u16::<BigEndian>()? as usize;
    let win_amount = reader.read_u16::<BigEndian>()? as usize;
    let config = GameConfig::new(width, height, win_amount)?;

    let mut outcomes = Vec::new();
    loop {
        // a clean end of file can only happen between records
        let class = match reader.read_u8() {
            Ok(class) => class,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        };
        let classification = match class {
            DRAW => Classification::Draw,
            PLAYER_ONE => Classification::Win(Player::One),
            PLAYER_TWO => Classification::Win(Player::Two),
            other => {
                return Err(Error::CorruptLog {
                    reason: format!("unknown classification {}", other),
                })
            }
        };

        let count = reader.read_u16::<BigEndian>()?;
        let mut actions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let action = match reader.read_i16::<BigEndian>()? as i32 {
                FLIP_TOKEN => Action::Flip,
                column if column >= 0 => Action::Place(column as usize),
                other => {
                    return Err(Error::CorruptLog {
                        reason: format!("invalid action token {}", other),
                    })
                }
            };
            actions.push(action);
        }
        outcomes.push(LoggedOutcome {
            classification,
            actions,
        });
    }
    Ok((config, outcomes))
}
