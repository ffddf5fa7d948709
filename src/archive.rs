//! Text archive of terminal boards, one file per outcome

use std::fs;
use std::path::{Path, PathBuf};

use crate::board::{Board, Player};
use crate::error::Result;
use crate::sink::{Classification, OutcomeSink};

pub const DRAWS_DIR: &str = "Draws";
pub const P1_WINS_DIR: &str = "P1_Wins";
pub const P2_WINS_DIR: &str = "P2_Wins";

/// Writes every reported board as text into a directory per classification.
///
/// Files are named `{width}_{height}_{actions}_{sequence}.txt` and hold the
/// board's textual representation: the action line followed by the grid.
pub struct BoardArchive {
    root: PathBuf,
    written: usize,
}

impl BoardArchive {
    /// Creates the archive below `root`, wiping result directories left by a previous run
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [DRAWS_DIR, P1_WINS_DIR, P2_WINS_DIR].iter() {
            let path = root.join(dir);
            if path.exists() {
                fs::remove_dir_all(&path)?;
            }
            fs::create_dir_all(&path)?;
        }
        Ok(Self { root, written: 0 })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of boards written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn directory(&self, classification: Classification) -> PathBuf {
        let dir = match classification {
            Classification::Win(Player::One) => P1_WINS_DIR,
            Classification::Win(Player::Two) => P2_WINS_DIR,
            Classification::Draw => DRAWS_DIR,
        };
        self.root.join(dir)
    }

    fn write(&mut self, classification: Classification, board: &Board) -> Result<()> {
        let name = format!(
            "{}_{}_{}_{}.txt",
            board.width(),
            board.height(),
            board.actions().len(),
            self.written
        );
        fs::write(self.directory(classification).join(name), board.to_string())?;
        self.written += 1;
        Ok(())
    }
}

impl OutcomeSink for BoardArchive {
    fn report_win(&mut self, winner: Player, board: Board) -> Result<()> {
        self.write(Classification::Win(winner), &board)
    }

    fn report_draw(&mut self, board: Board) -> Result<()> {
        self.write(Classification::Draw, &board)
    }
}
