//! An exhaustive enumerator for 'Flip Connect 4'
//!
//! Flip connect 4 is connect 4 on a board of any size with any winning run
//! length, where a player may spend their turn flipping the board upside down
//! instead of placing a piece. This crate walks every legal game to its end and
//! reports each terminal board as a win for either player or a draw.
//!
//! # Basic Usage
//!
//! ```
//! use flip_connect4::{enumerate, GameConfig, Tally};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let config = GameConfig::new(2, 2, 2)?;
//! let mut tally = Tally::new();
//! let report = enumerate(config, &mut tally, false)?;
//!
//! assert_eq!(report.outcomes, tally.total());
//! assert!(tally.player_one_wins > 0);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::GameConfig;

pub mod board;
pub use board::{Action, Board, Cell, Player};

pub mod sink;
pub use sink::{Classification, Outcome, OutcomeSink, Tally, UniqueOutcomes};

pub mod search;
pub use search::SearchDriver;

pub mod enumerate;
pub use enumerate::{enumerate, enumerate_parallel, EnumerationReport};

pub mod archive;

pub mod outcome_log;

mod test;

// branches are searched on independent copies across threads
assert_impl_all!(Board: Clone, Send, Sync);
assert_impl_all!(Error: Send);
const_assert!(board::FLIP_TOKEN < 0);
