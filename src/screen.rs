//! The cell-addressable screen contract.
//!
//! The engine draws through this trait only; the binary adapts it onto a
//! real terminal, and tests use the in-memory [`CellGrid`] directly.

use ratatui::style::Style;

pub trait Screen {
    /// `(width, height)` in cells.
    fn size(&self) -> (usize, usize);

    /// Write one cell. Out-of-bounds writes are ignored.
    fn set_content(&mut self, x: usize, y: usize, main: char, combc: &[char], style: Style);

    /// Read one cell back, for row-wide style overlays.
    fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style);

    fn show_cursor(&mut self, x: usize, y: usize);

    fn hide_cursor(&mut self);

    /// Present the frame.
    fn show(&mut self);

    /// Blank every cell.
    fn clear(&mut self);
}

/// One stored cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub main: char,
    pub combc: Vec<char>,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            main: ' ',
            combc: Vec::new(),
            style: Style::default(),
        }
    }
}

/// In-memory cell grid: the backing store for the terminal adapter and the
/// screen double used in tests.
#[derive(Debug, Clone)]
pub struct CellGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    cursor: Option<(usize, usize)>,
}

impl CellGrid {
    pub fn new(width: usize, height: usize) -> Self {
        CellGrid {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            cursor: None,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![Cell::default(); width * height];
        self.cursor = None;
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y * self.width + x)
    }

    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    /// The visible text of a row, pads skipped, right side trimmed.
    pub fn row_text(&self, y: usize) -> String {
        let mut s = String::new();
        for x in 0..self.width {
            if let Some(cell) = self.cell(x, y) {
                if cell.main == '\0' {
                    continue;
                }
                s.push(cell.main);
                for &c in &cell.combc {
                    s.push(c);
                }
            }
        }
        s.trim_end().to_string()
    }
}

impl Screen for CellGrid {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn set_content(&mut self, x: usize, y: usize, main: char, combc: &[char], style: Style) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.cells[y * self.width + x] = Cell {
            main,
            combc: combc.to_vec(),
            style,
        };
    }

    fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style) {
        match self.cell(x, y) {
            Some(cell) => (cell.main, cell.combc.clone(), cell.style),
            None => (' ', Vec::new(), Style::default()),
        }
    }

    fn show_cursor(&mut self, x: usize, y: usize) {
        self.cursor = Some((x, y));
    }

    fn hide_cursor(&mut self) {
        self.cursor = None;
    }

    fn show(&mut self) {}

    fn clear(&mut self) {
        self.cells = vec![Cell::default(); self.width * self.height];
    }
}
