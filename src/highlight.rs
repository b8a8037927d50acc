//! Cell-level style overlays.
//!
//! Applied to a line's cells in a fixed order, later layers winning:
//! base body style, plain-mode stripping, column shading, multi-color
//! words, search matches. Row-level overlays (alternate rows, marks,
//! section lines) are applied at emission time in `draw`.

use ratatui::style::Style;

use crate::content::{Contents, LineC};
use crate::pager::Pager;
use crate::search::all_index;
use crate::theme::apply_style;

/// Patch a style over a cell range.
pub(crate) fn range_style(lc: &mut Contents, start: usize, end: usize, style: Style) {
    let end = end.min(lc.len());
    for cell in &mut lc[start.min(end)..end] {
        cell.style = apply_style(cell.style, style);
    }
}

impl Pager {
    /// Apply every cell-level overlay to one line.
    pub(crate) fn style_content(&self, line: &mut LineC) {
        let doc = self.doc();
        if doc.general.plain_mode {
            plain_style(&mut line.lc);
        }
        if doc.general.column_mode {
            self.column_highlight(line);
        }
        self.multi_color_highlight(line);
        self.search_highlight(line);
    }

    fn column_highlight(&self, line: &mut LineC) {
        if self.doc().general.column_width {
            self.column_width_highlight(line);
        } else {
            self.column_delimiter_highlight(line);
        }
    }

    /// Shade delimiter-separated fields; the field under the column cursor
    /// gets the cursor style on top.
    fn column_delimiter_highlight(&self, line: &mut LineC) {
        let doc = self.doc();
        let delimiter = doc.general.column_delimiter.clone();
        let indexes = all_index(&line.str, &delimiter, &doc.column_delimiter_reg);
        if indexes.is_empty() {
            return;
        }

        let mut indexes = indexes;
        let mut l_start = 0usize;
        if indexes[0].0 == 0 {
            if indexes.len() == 1 {
                return;
            }
            l_start = indexes[0].1;
            indexes.remove(0);
        }

        let num_c = self.theme.column_rainbow.len().max(1);
        let mut i_start: isize = 0;
        let mut i_end: isize = 0;
        for c in 0..=indexes.len() {
            if c == 0 && l_start == 0 {
                i_start = 0;
                i_end = indexes[0].1 as isize - delimiter.len() as isize;
                if i_end < 0 {
                    i_end = 0;
                }
            } else if c < indexes.len() {
                i_start = i_end + 1;
                i_end = indexes[c].0 as isize;
            } else {
                i_start = i_end + 1;
                i_end = line.str.len() as isize;
            }
            if i_start < 0 || i_end < 0 {
                return;
            }
            let start = line.pos.x(i_start as usize);
            let end = line.pos.x(i_end as usize);
            if doc.general.column_rainbow && !self.theme.column_rainbow.is_empty() {
                range_style(&mut line.lc, start, end, self.theme.column_rainbow[c % num_c]);
            }
            if c as isize == doc.column_cursor {
                range_style(&mut line.lc, start, end, self.theme.column_highlight);
            }
        }
    }

    /// Shade fields split at guessed width positions, extended so a value
    /// overflowing its column boundary stays in one piece.
    fn column_width_highlight(&self, line: &mut LineC) {
        let doc = self.doc();
        let indexes = &doc.column_widths;
        if indexes.is_empty() {
            return;
        }

        let num_c = self.theme.column_rainbow.len().max(1);
        let mut i_start: usize = 0;
        let mut i_end: usize = 0;
        for c in 0..=indexes.len() {
            if c == 0 {
                i_start = 0;
                i_end = find_bounds(&line.lc, indexes[0].saturating_sub(1), indexes, c);
            } else if c < indexes.len() {
                i_start = i_end + 1;
                i_end = find_bounds(&line.lc, indexes[c], indexes, c);
            } else {
                i_start = i_end + 1;
                i_end = line.str.len();
            }
            i_end = i_end.min(line.lc.len());

            if doc.general.column_rainbow && !self.theme.column_rainbow.is_empty() {
                range_style(&mut line.lc, i_start, i_end, self.theme.column_rainbow[c % num_c]);
            }
            if c as isize == doc.column_cursor {
                range_style(&mut line.lc, i_start, i_end, self.theme.column_highlight);
            }
        }
    }

    /// Highlight every configured word list regex; the first-listed regex
    /// wins ties, so they are applied in reverse.
    fn multi_color_highlight(&self, line: &mut LineC) {
        let doc = self.doc();
        if self.theme.multi_color_highlight.is_empty() {
            return;
        }
        let num_c = self.theme.multi_color_highlight.len();
        for (i, re) in doc.multi_color_regexps.iter().enumerate().rev() {
            let style = self.theme.multi_color_highlight[i % num_c];
            for m in re.find_iter(&line.str) {
                let start = line.pos.x(m.start());
                let end = line.pos.x(m.end());
                range_style(&mut line.lc, start, end, style);
            }
        }
    }

    /// Highlight matches of the active searcher.
    fn search_highlight(&self, line: &mut LineC) {
        let Some(searcher) = &self.searcher else {
            return;
        };
        if searcher.pattern().is_empty() {
            return;
        }
        for (start, end) in searcher.find_all(&line.str) {
            let start = line.pos.x(start);
            let end = line.pos.x(end);
            range_style(&mut line.lc, start, end, self.theme.search_highlight);
        }
    }
}

/// Reset every cell to the default style.
pub(crate) fn plain_style(lc: &mut Contents) {
    for cell in lc.iter_mut() {
        cell.style = Style::default();
    }
}

/// Extend a width-column boundary so a field that overflows it is kept
/// intact: walk to the nearest space edge forward and backward and pick
/// the side that stays within the neighboring positions.
pub(crate) fn find_bounds(lc: &Contents, p: usize, pos: &[usize], n: usize) -> usize {
    if lc.len() <= p {
        return p;
    }
    if lc[p].main == ' ' {
        return p;
    }

    let mut f = p;
    while f < lc.len() && lc[f].main != ' ' {
        f += 1;
    }
    let mut b = p;
    while b > 0 && lc[b].main != ' ' {
        b -= 1;
    }

    if b == pos[n] {
        return f;
    }
    if n < pos.len() - 1 {
        if f == pos[n + 1] {
            return b;
        }
        if b == pos[n] {
            return f;
        }
        if b > pos[n] && b < pos[n + 1] {
            return b;
        }
    }
    f
}
