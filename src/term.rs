//! Terminal-backed [`Screen`] implementation.
//!
//! The engine draws into a cell grid; `show` copies the grid into the
//! ratatui frame buffer, which handles diffing and terminal writes.

use ratatui::layout::Position;
use ratatui::style::Style;
use ratatui::DefaultTerminal;

use crate::screen::{CellGrid, Screen};

pub struct TermScreen {
    terminal: DefaultTerminal,
    grid: CellGrid,
}

impl TermScreen {
    /// Enter the alternate screen and raw mode.
    pub fn new() -> anyhow::Result<Self> {
        let terminal = ratatui::init();
        let size = terminal.size()?;
        Ok(TermScreen {
            terminal,
            grid: CellGrid::new(size.width as usize, size.height as usize),
        })
    }

    /// Leave the alternate screen; safe to call on any exit path.
    pub fn restore() {
        ratatui::restore();
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.grid.resize(width, height);
    }
}

impl Screen for TermScreen {
    fn size(&self) -> (usize, usize) {
        self.grid.size()
    }

    fn set_content(&mut self, x: usize, y: usize, main: char, combc: &[char], style: Style) {
        self.grid.set_content(x, y, main, combc, style);
    }

    fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style) {
        self.grid.get_content(x, y)
    }

    fn show_cursor(&mut self, x: usize, y: usize) {
        self.grid.show_cursor(x, y);
    }

    fn hide_cursor(&mut self) {
        self.grid.hide_cursor();
    }

    fn show(&mut self) {
        let grid = &self.grid;
        let (width, height) = grid.size();
        let result = self.terminal.draw(|frame| {
            let buf = frame.buffer_mut();
            let area = buf.area;
            for y in 0..height.min(area.height as usize) {
                for x in 0..width.min(area.width as usize) {
                    let Some(cell) = grid.cell(x, y) else { continue };
                    // Pads after wide cells are left to the terminal.
                    if cell.main == '\0' {
                        continue;
                    }
                    let mut symbol = String::new();
                    symbol.push(cell.main);
                    for &c in &cell.combc {
                        symbol.push(c);
                    }
                    if let Some(target) = buf.cell_mut(Position::new(x as u16, y as u16)) {
                        target.set_symbol(&symbol);
                        target.set_style(cell.style);
                    }
                }
            }
            if let Some((cx, cy)) = grid.cursor() {
                frame.set_cursor_position(Position::new(cx as u16, cy as u16));
            }
        });
        if let Err(e) = result {
            tracing::error!("terminal draw failed: {}", e);
        }
    }

    fn clear(&mut self) {
        self.grid.clear();
        if let Err(e) = self.terminal.clear() {
            tracing::error!("terminal clear failed: {}", e);
        }
    }
}
