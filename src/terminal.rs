use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use flip_connect4::{Board, Cell};

/// Draws the action line, the column numbers and the grid with coloured pieces
pub fn display(board: &Board) -> Result<()> {
    let mut stdout = stdout();

    stdout.queue(PrintStyledContent(style(format!(
        "actions: {}\n",
        board.action_line()
    ))))?;

    let cols: String = (0..board.width()).map(|x| (x % 10).to_string()).collect();
    stdout.queue(PrintStyledContent(style(cols + "\n")))?;

    for row in (0..board.height()).rev() {
        for column in 0..board.width() {
            stdout.queue(PrintStyledContent(
                style("O")
                    .attribute(Attribute::Bold)
                    .on(Color::DarkBlue)
                    .with(match board.cell(column, row) {
                        Cell::PlayerOne => Color::Red,
                        Cell::PlayerTwo => Color::Yellow,
                        Cell::Empty => Color::DarkBlue,
                    }),
            ))?;
        }
        stdout.queue(PrintStyledContent(style("\n")))?;
    }
    stdout.flush()?;
    Ok(())
}
