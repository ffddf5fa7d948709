use crate::error::{Error, Result};

/// The fixed parameters of a game: board size and the run length needed to win
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    pub win_amount: usize,
}

impl GameConfig {
    /// Creates a config, rejecting zero-sized parameters.
    ///
    /// The win amount is not checked against the dimensions, a win amount
    /// larger than both simply makes wins impossible.
    pub fn new(width: usize, height: usize, win_amount: usize) -> Result<Self> {
        if width == 0 || height == 0 || win_amount == 0 {
            return Err(Error::InvalidDimensions {
                width,
                height,
                win_amount,
            });
        }
        Ok(Self {
            width,
            height,
            win_amount,
        })
    }

    /// Upper bound on the number of plies in any game: every cell filled once,
    /// each placement followed by at most one flip
    pub fn max_depth(&self) -> usize {
        2 * self.width * self.height
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 3,
            height: 3,
            win_amount: 3,
        }
    }
}
