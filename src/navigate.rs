//! Navigation primitives.
//!
//! Every movement updates `(top_ln, top_lx)` or `(x, column_cursor)` on
//! the current document and clamps through `limit_move_down`, which stops
//! the origin at the last viewable position. Wrap mode walks the
//! `left_most_x` segment lists so a long line is stepped one display row
//! at a time.

use regex::Regex;

use crate::draw::STATUS_LINE;
use crate::error::{Error, Result};
use crate::layout::SECTION_TIMEOUT;
use crate::pager::{Pager, MIN_START_X};
use crate::search::{all_index, CancelToken};

/// Gap kept between a column and the viewport edge when jumping to it.
const COLUMN_EDGE: isize = 2;

/// Index of the first entry at or past `x`; -1 for an empty list.
pub(crate) fn num_of_slice(list: &[isize], x: isize) -> isize {
    for (n, &v) in list.iter().enumerate() {
        if v >= x {
            return n as isize;
        }
    }
    list.len() as isize - 1
}

/// Index of the last entry at or below `x`.
pub(crate) fn num_of_reverse_slice(list: &[isize], x: isize) -> isize {
    for n in (0..list.len()).rev() {
        if list[n] <= x {
            return n as isize;
        }
    }
    0
}

/// Column start offsets (byte positions) derived from delimiter hits.
fn widths_delimiter(s: &str, delimiter: &str, re: &Option<Regex>) -> Vec<usize> {
    let indexes = all_index(s, delimiter, re);
    if indexes.is_empty() {
        return Vec::new();
    }
    let mut widths = Vec::with_capacity(indexes.len() + 1);
    widths.push(0);
    for (_, end) in &indexes {
        widths.push(end + 1);
    }
    widths
}

/// Snap a column cursor back into the visible x range.
fn cursor_from_position(widths: &[isize], cursor: isize, start: isize, end: isize) -> isize {
    let len = widths.len() as isize;
    if len > cursor + 1 && widths[cursor as usize] < start && widths[(cursor + 1) as usize] < end {
        for (n, &wx) in widths.iter().enumerate() {
            if wx >= start {
                return n as isize;
            }
        }
        return len - 1;
    }
    if cursor > 1 && cursor < len && widths[cursor as usize] > end && widths[(cursor - 1) as usize] > start {
        for n in (0..widths.len()).rev() {
            if widths[n] < end {
                return n as isize;
            }
        }
    }
    cursor
}

impl Pager {
    // --- vertical movement ---------------------------------------------

    pub fn move_top(&mut self) {
        self.doc_mut().move_top();
    }

    pub fn move_bottom(&mut self) {
        let end = self.doc().buf_end_num() as isize;
        let start = self.doc().buf_start_num() as isize;
        let (tx, tn) = self.bottom_line_num(end);
        let (tx, tn) = if tn < start { (0, start) } else { (tx, tn) };
        let doc = self.doc_mut();
        doc.top_lx = tx;
        doc.top_ln = tn;
    }

    pub fn move_up(&mut self) {
        self.move_up_n(1);
    }

    pub fn move_down(&mut self) {
        self.move_down_n(1);
    }

    pub fn move_up_n(&mut self, n: isize) {
        let start = self.doc().buf_start_num() as isize;
        {
            let doc = self.doc();
            if doc.top_ln <= start && doc.top_lx == 0 {
                return;
            }
        }

        if !self.doc().general.wrap_mode {
            let doc = self.doc_mut();
            doc.top_ln = (doc.top_ln - n).max(start);
            doc.top_lx = 0;
            return;
        }

        // Within the same line: step back one wrap segment.
        if self.doc().top_lx > 0 {
            let num = self.doc().top_ln + self.doc().first_line();
            let list = self.left_most_x(num);
            let top_lx = self.doc().top_lx;
            for (i, &x) in list.iter().enumerate() {
                if x >= top_lx {
                    self.doc_mut().top_lx = if i == 0 { 0 } else { list[i - 1] };
                    return;
                }
            }
        }

        // Previous line, landing on its last wrap segment.
        self.doc_mut().top_ln -= n;
        if self.doc().top_ln < start {
            let doc = self.doc_mut();
            doc.top_ln = start;
            doc.top_lx = 0;
            return;
        }
        let num = self.doc().top_ln + self.doc().first_line();
        let list = self.left_most_x(num);
        self.doc_mut().top_lx = list.last().copied().unwrap_or(0);
    }

    pub fn move_down_n(&mut self, n: isize) {
        let num = self.doc().top_ln;
        if !self.doc().general.wrap_mode {
            self.limit_move_down(0, num + n);
            return;
        }

        // Within the same line: step forward one wrap segment.
        let list = self.left_most_x(num + self.doc().first_line());
        let top_lx = self.doc().top_lx;
        for &x in &list {
            if x > top_lx {
                self.limit_move_down(x, num);
                return;
            }
        }

        // Next line.
        self.doc_mut().top_lx = 0;
        self.limit_move_down(0, num + n);
    }

    pub fn move_pg_up(&mut self) {
        let rows = self.status_pos() as isize - self.doc().header_len;
        self.move_num_up(rows);
        if self.doc().top_ln < self.doc().buf_start_num() as isize {
            self.doc_mut().move_top();
        }
    }

    pub fn move_pg_dn(&mut self) {
        let y = self.doc().bottom_ln - self.doc().first_line();
        let x = self.doc().bottom_lx;
        self.limit_move_down(x, y);
    }

    pub fn move_hf_up(&mut self) {
        let rows = (self.status_pos() as isize - self.doc().header_len) / 2;
        self.move_num_up(rows);
        if self.doc().top_ln < self.doc().buf_start_num() as isize {
            self.doc_mut().move_top();
        }
    }

    pub fn move_hf_dn(&mut self) {
        let rows = (self.status_pos() as isize - self.doc().header_len) / 2;
        self.move_num_down(rows);
    }

    /// Jump to a 1-based line number.
    pub fn goto_line(&mut self, n: isize) {
        let start = self.doc().buf_start_num() as isize;
        let l_n = (n - 1).max(start);
        self.doc_mut().move_line(l_n);
        self.doc_mut().show_goto = true;
    }

    /// Anchor a found line below the header, honoring the jump target.
    pub fn go_search_line(&mut self, l_n: isize) {
        let first = self.doc().first_line();
        let jump = self.doc().general.jump_target;
        let start = self.doc().buf_start_num() as isize;
        let target = (l_n - first - jump).max(start);
        self.doc_mut().move_line(target);
        self.doc_mut().show_goto = true;
    }

    /// Follow mode: jump to the bottom when the buffer has grown.
    pub fn tail(&mut self) {
        let end = self.doc().buf_end_num();
        if self.doc().latest_num != end {
            self.move_bottom();
            self.doc_mut().latest_num = end;
        }
    }

    fn move_num_up(&mut self, move_y: isize) {
        if !self.doc().general.wrap_mode {
            self.doc_mut().top_ln -= move_y;
            return;
        }
        let first = self.doc().first_line();
        let num = self.doc().top_ln + first;
        let top_lx = self.doc().top_lx;
        let (l_x, num) = self.find_num_up(top_lx, num, move_y);
        let doc = self.doc_mut();
        doc.top_lx = l_x;
        doc.top_ln = num - first;
    }

    fn move_num_down(&mut self, move_y: isize) {
        let first = self.doc().first_line();
        if !self.doc().general.wrap_mode {
            let top = self.doc().top_ln;
            self.limit_move_down(0, top + move_y);
            return;
        }

        let mut num = self.doc().top_ln + first;
        let mut x = self.doc().top_lx;
        let mut list = self.left_most_x(num);
        let mut n = num_of_reverse_slice(&list, x);
        let end = self.doc().buf_end_num() as isize;

        for _ in 0..move_y {
            if n >= list.len() as isize {
                num += 1;
                if num > end {
                    break;
                }
                list = self.left_most_x(num);
                n = 0;
            }
            x = 0;
            if n >= 0 && (n as usize) < list.len() {
                x = list[n as usize];
            }
            n += 1;
        }
        self.limit_move_down(x, num - first);
    }

    /// Move the origin up by display rows (used to re-anchor under the
    /// pinned section header).
    pub(crate) fn move_y_up(&mut self, move_y: isize) {
        let first = self.doc().first_line();
        let start = self.doc().buf_start_num() as isize;
        let num = self.doc().top_ln + first;
        let top_lx = self.doc().top_lx;
        let (l_x, num) = self.find_num_up(top_lx, num, move_y);
        let doc = self.doc_mut();
        doc.top_lx = l_x;
        doc.top_ln = (num - first).max(start);
    }

    /// Clamp a requested origin so the view cannot scroll past the last
    /// viewable position. When the content is shorter than the view, the
    /// origin may still walk up to the last line's final wrap segment.
    pub(crate) fn limit_move_down(&mut self, x: isize, y: isize) {
        let end = self.doc().buf_end_num() as isize;
        let start = self.doc().buf_start_num() as isize;
        let skip = self.doc().general.skip_lines;

        if y + self.scr.v_height as isize >= end - skip {
            let (mut tx, mut tn) = self.bottom_line_num(end);
            if tn < start {
                tn = (end - 1).max(start);
                tx = if self.doc().general.wrap_mode {
                    let first = self.doc().first_line();
                    self.left_most_x(tn + first).last().copied().unwrap_or(0)
                } else {
                    0
                };
            }
            if y > tn || (y == tn && x > tx) {
                let doc = self.doc_mut();
                if doc.top_ln < tn || (doc.top_ln == tn && doc.top_lx < tx) {
                    doc.top_ln = tn;
                    doc.top_lx = tx;
                }
                return;
            }
        }
        let doc = self.doc_mut();
        doc.top_ln = y.max(start);
        doc.top_lx = x;
    }

    /// The origin that puts `l_n` on the last body row.
    pub(crate) fn bottom_line_num(&mut self, l_n: isize) -> (isize, isize) {
        let header_len = self.doc().header_len;
        if l_n < header_len {
            return (0, 0);
        }
        let height = (self.scr.v_height as isize - header_len) - (STATUS_LINE as isize + 1);
        let first = self.doc().first_line();
        if !self.doc().general.wrap_mode {
            return (0, l_n - (height + first));
        }
        let (l_x, l_n) = self.find_num_up(0, l_n, height);
        (l_x, l_n - first)
    }

    /// Walk `up_y` display rows up from `(l_x, l_n)`.
    pub(crate) fn find_num_up(&mut self, l_x: isize, l_n: isize, up_y: isize) -> (isize, isize) {
        let mut list = self.left_most_x(l_n);
        let mut n = num_of_slice(&list, l_x);
        let mut l_x = l_x;
        let mut l_n = l_n;
        let mut y = up_y;
        while y > 0 {
            if n <= 0 {
                l_n -= 1;
                list = self.left_most_x(l_n);
                n = list.len() as isize;
            }
            if n > 0 {
                l_x = list[(n - 1) as usize];
            } else {
                l_x = 0;
            }
            n -= 1;
            y -= 1;
        }
        (l_x, l_n)
    }

    /// Wrap segment index of `(l_x, l_y)` on its line.
    pub(crate) fn num_of_wrap(&mut self, l_x: isize, l_y: isize) -> usize {
        let list = self.left_most_x(l_y);
        if list.is_empty() {
            return 0;
        }
        num_of_slice(&list, l_x).max(0) as usize
    }

    // --- sections -------------------------------------------------------

    /// Move to the next section; degrades to page-down without one.
    pub fn next_section(&mut self) {
        if self.doc().general.section_delimiter.is_empty() {
            self.move_pg_dn();
            return;
        }
        let first = self.doc().first_line();
        let start_pos = self.doc().general.section_start_position;
        let num = self.doc().top_ln + first + (1 - start_pos);
        let cancel = CancelToken::with_timeout(SECTION_TIMEOUT);
        match self.doc_mut().next_section(&cancel, num) {
            Ok(n) => {
                let target = (n - first) + start_pos;
                self.doc_mut().move_line(target);
                self.doc_mut().show_goto = true;
            }
            Err(_) => {
                // Last section or no section at all.
                self.set_message("no next section");
                self.move_pg_dn();
            }
        }
    }

    /// Move to the previous section; degrades to page-up without one.
    pub fn prev_section(&mut self) {
        if self.doc().general.section_delimiter.is_empty() {
            self.move_pg_up();
            return;
        }
        let first = self.doc().first_line();
        let start_pos = self.doc().general.section_start_position;
        let num = self.doc().top_ln + first - (1 + start_pos);
        let cancel = CancelToken::with_timeout(SECTION_TIMEOUT);
        match self.doc_mut().prev_section(&cancel, num + 1) {
            Ok(n) => {
                let start = self.doc().buf_start_num() as isize;
                let target = ((n - first) + start_pos).max(start);
                self.doc_mut().move_line(target);
                self.doc_mut().show_goto = true;
            }
            Err(_) => {
                self.doc_mut().move_top();
            }
        }
    }

    /// Move to the last section of the buffer.
    pub fn last_section(&mut self) {
        let first = self.doc().first_line();
        let start_pos = self.doc().general.section_start_position;
        // Skip a trailing delimiter row on the very last line.
        let num = self.doc().buf_end_num() as isize - 2;
        let cancel = CancelToken::with_timeout(SECTION_TIMEOUT);
        match self.doc_mut().prev_section(&cancel, num + 1) {
            Ok(n) => {
                let target = (n - first) + start_pos;
                self.doc_mut().move_line(target);
                self.doc_mut().show_goto = true;
            }
            Err(e) => {
                tracing::warn!("last section: {}", e);
            }
        }
    }

    // --- marks ----------------------------------------------------------

    pub fn toggle_mark(&mut self) {
        let l_n = self.doc().top_ln;
        if self.doc_mut().toggle_mark(l_n) {
            self.set_message(format!("mark {}", l_n));
        } else {
            self.set_message(format!("unmark {}", l_n));
        }
    }

    pub fn move_next_mark(&mut self) {
        match self.doc_mut().next_mark() {
            Some(l_n) => {
                self.doc_mut().move_line(l_n);
                self.doc_mut().show_goto = true;
            }
            None => self.set_message("no mark"),
        }
    }

    pub fn move_prev_mark(&mut self) {
        match self.doc_mut().prev_mark() {
            Some(l_n) => {
                self.doc_mut().move_line(l_n);
                self.doc_mut().show_goto = true;
            }
            None => self.set_message("no mark"),
        }
    }

    // --- horizontal movement -------------------------------------------

    pub fn move_left(&mut self) {
        self.move_left_n(1);
    }

    pub fn move_right(&mut self) {
        self.move_right_n(1);
    }

    pub fn move_left_n(&mut self, n: isize) {
        if !self.doc().general.column_mode {
            if self.doc().general.wrap_mode {
                return;
            }
            let doc = self.doc_mut();
            doc.x = (doc.x - n).max(MIN_START_X);
            return;
        }

        if self.doc().column_cursor <= 0 {
            return;
        }
        let cursor = self.doc().column_cursor - n;
        let (x, result) = self.column_x(cursor);
        match result {
            Ok(()) => {
                let doc = self.doc_mut();
                doc.x = x;
                doc.column_cursor = cursor;
            }
            Err(e) => self.debug_message(e.to_string()),
        }
    }

    pub fn move_right_n(&mut self, n: isize) {
        if !self.doc().general.column_mode {
            if self.doc().general.wrap_mode {
                return;
            }
            let end = self.end_right();
            let doc = self.doc_mut();
            doc.x = (doc.x + n).min(end.max(0));
            return;
        }

        let cursor = self.doc().column_cursor + n;
        let (x, result) = self.column_x(cursor);
        match result {
            Ok(()) => {
                let doc = self.doc_mut();
                doc.x = x;
                doc.column_cursor = cursor;
            }
            Err(e) => {
                // Scroll toward the column even when it is not reachable in
                // one step.
                self.debug_message(e.to_string());
                self.doc_mut().x = x;
            }
        }
    }

    pub fn move_hf_left(&mut self) {
        if self.doc().general.wrap_mode {
            return;
        }
        let move_size = self.scr.v_width as isize / 2;
        let doc = self.doc_mut();
        if doc.x > 0 && doc.x - move_size < 0 {
            doc.x = 0;
        } else {
            doc.x = (doc.x - move_size).max(MIN_START_X);
        }
    }

    pub fn move_hf_right(&mut self) {
        if self.doc().general.wrap_mode {
            return;
        }
        let move_size = self.scr.v_width as isize / 2;
        let doc = self.doc_mut();
        if doc.x < 0 {
            doc.x = 0;
        } else {
            doc.x += move_size;
        }
    }

    pub fn move_begin_left(&mut self) {
        if self.doc().general.wrap_mode {
            return;
        }
        self.doc_mut().x = 0;
    }

    /// Scroll so the longest visible line's end is on screen.
    pub fn move_end_right(&mut self) {
        if self.doc().general.wrap_mode {
            return;
        }
        let end = self.end_right();
        self.doc_mut().x = end.max(MIN_START_X);
    }

    fn end_right(&mut self) -> isize {
        let numbers = self.scr.numbers.clone();
        let mut x = 0isize;
        for row in numbers {
            let line = self.doc_mut().line_c(row.number);
            if !line.valid {
                continue;
            }
            x = x.max(line.lc.len() as isize - 1);
        }
        x - (self.scr.v_width as isize - self.scr.start_x as isize - 1)
    }

    // --- column cursor --------------------------------------------------

    /// The x position that brings the column under `cursor` on screen.
    fn column_x(&mut self, cursor: isize) -> (isize, Result<()>) {
        if self.doc().general.column_width {
            self.column_width_x(cursor)
        } else {
            self.column_delimiter_x(cursor)
        }
    }

    fn column_width_x(&mut self, cursor: isize) -> (isize, Result<()>) {
        if cursor <= 0 {
            return (0, Ok(()));
        }
        let widths = &self.doc().column_widths;
        if widths.len() as isize >= cursor {
            (widths[(cursor - 1) as usize] as isize, Ok(()))
        } else {
            (0, Err(Error::NoDelimiter))
        }
    }

    /// Scan the visible lines for one with enough columns and compute the
    /// x that shows the requested field, with a small edge gap.
    fn column_delimiter_x(&mut self, cursor: isize) -> (isize, Result<()>) {
        if cursor <= 0 {
            return (0, Ok(()));
        }
        let v_width = self.scr.v_width as isize;
        let first = self.doc().first_line();
        let top_ln = self.doc().top_ln;
        let m_x = self.doc().x;
        let delimiter = self.doc().general.column_delimiter.clone();
        let delimiter_reg = self.doc().column_delimiter_reg.clone();

        let mut max_cursor = 0isize;
        for i in 0..(first + 10) {
            let line = self.doc_mut().line_c(top_ln + first + i);
            if !line.valid {
                continue;
            }
            let indexes = widths_delimiter(&line.str, &delimiter, &delimiter_reg);
            max_cursor = max_cursor.max(indexes.len() as isize);
            if (indexes.len() as isize) < cursor {
                continue;
            }

            if indexes.len() as isize == cursor {
                // Just past the right-most column.
                let end = line.pos.x(line.str.len()) as isize;
                if end - m_x < v_width {
                    return (m_x, Ok(()));
                }
                if m_x + v_width < end - v_width {
                    return (m_x + v_width, Err(Error::NoColumn));
                }
                return (end - v_width + COLUMN_EDGE, Err(Error::NoColumn));
            }

            let (start, end) = if cursor + 1 > indexes.len() as isize - 1 {
                (
                    line.pos.x(indexes[indexes.len() - 1]) as isize,
                    line.pos.x(line.str.len()) as isize,
                )
            } else {
                (
                    line.pos.x(indexes[cursor as usize]) as isize,
                    line.pos.x(indexes[(cursor + 1) as usize]) as isize,
                )
            };

            if start < m_x {
                return (start - COLUMN_EDGE, Ok(()));
            }
            if end > m_x {
                if end - m_x < v_width {
                    return (m_x, Ok(()));
                }
                if end - start < v_width {
                    if (end - v_width) - m_x > v_width {
                        return (m_x + v_width, Err(Error::OverScreen));
                    }
                    return (end - v_width, Ok(()));
                }
                if end == start {
                    return (m_x, Err(Error::NoColumn));
                }
            }
            return (start - COLUMN_EDGE, Ok(()));
        }

        if max_cursor > 0 {
            return (m_x, Err(Error::NoColumn));
        }
        (0, Err(Error::NoDelimiter))
    }

    /// Keep the column cursor on a visible field after scrolling.
    pub(crate) fn cursor_correction(&mut self, cursor: isize) -> isize {
        if self.doc().general.wrap_mode {
            return cursor;
        }
        let v_width = self.scr.v_width as isize;
        let m_x = self.doc().x;

        if self.doc().general.column_width {
            let widths: Vec<isize> = self.doc().column_widths.iter().map(|&w| w as isize).collect();
            return cursor_from_position(&widths, cursor, m_x, m_x + v_width);
        }

        let first = self.doc().first_line();
        let top_ln = self.doc().top_ln;
        let delimiter = self.doc().general.column_delimiter.clone();
        let delimiter_reg = self.doc().column_delimiter_reg.clone();
        for i in 0..(first + 10) {
            let line = self.doc_mut().line_c(top_ln + first + i);
            if !line.valid {
                continue;
            }
            let widths: Vec<isize> = widths_delimiter(&line.str, &delimiter, &delimiter_reg)
                .iter()
                .map(|&w| w as isize)
                .collect();
            if widths.len() as isize <= cursor {
                continue;
            }
            return cursor_from_position(&widths, cursor, m_x, m_x + v_width);
        }
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::Document;
    use crate::screen::CellGrid;
    use std::time::{Duration, Instant};

    fn wait_eof(doc: &Document) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !doc.buf_eof() {
            assert!(Instant::now() < deadline, "reader did not reach EOF");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn pager_over(text: &str) -> Pager {
        let doc = Document::from_read(
            Box::new(std::io::Cursor::new(text.as_bytes().to_vec())),
            "test",
            &Config::default(),
            None,
        );
        wait_eof(&doc);
        Pager::new(doc)
    }

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("line-{}\n", i + 1)).collect()
    }

    #[test]
    fn test_num_of_slice() {
        assert_eq!(num_of_slice(&[0, 50, 100], 0), 0);
        assert_eq!(num_of_slice(&[0, 50, 100], 50), 1);
        assert_eq!(num_of_slice(&[0, 50, 100], 51), 2);
        assert_eq!(num_of_slice(&[0, 50, 100], 500), 2);
        assert_eq!(num_of_slice(&[], 0), -1);
    }

    #[test]
    fn test_num_of_reverse_slice() {
        assert_eq!(num_of_reverse_slice(&[0, 50, 100], 100), 2);
        assert_eq!(num_of_reverse_slice(&[0, 50, 100], 99), 1);
        assert_eq!(num_of_reverse_slice(&[0, 50, 100], 0), 0);
    }

    #[test]
    fn test_page_down_advances_by_body_height() {
        let mut pager = pager_over(&numbered(100));
        let mut screen = CellGrid::new(80, 24);
        pager.draw(&mut screen);
        assert_eq!(pager.doc().top_ln, 0);

        pager.move_pg_dn();
        // 24 rows, no header, one status row.
        assert_eq!(pager.doc().top_ln, 23);
        assert_eq!(pager.doc_mut().line(23).unwrap(), b"line-24");
    }

    #[test]
    fn test_wrap_mode_steps_segments() {
        let text = format!("{}\nshort\n", "a".repeat(200));
        let mut pager = pager_over(&text);
        let mut screen = CellGrid::new(50, 10);
        pager.draw(&mut screen);

        assert_eq!(pager.left_most_x(0), vec![0, 50, 100, 150]);

        pager.move_down_n(1);
        assert_eq!(pager.doc().top_ln, 0);
        assert_eq!(pager.doc().top_lx, 50);

        pager.move_down_n(1);
        pager.move_down_n(1);
        pager.move_down_n(1);
        assert_eq!(pager.doc().top_ln, 1);
        assert_eq!(pager.doc().top_lx, 0);

        // Past the last line: the origin stays put.
        pager.move_down_n(1);
        assert_eq!(pager.doc().top_ln, 1);
        assert_eq!(pager.doc().top_lx, 0);
    }

    #[test]
    fn test_wrap_mode_up_reverses_segments() {
        let text = format!("{}\nshort\n", "a".repeat(200));
        let mut pager = pager_over(&text);
        let mut screen = CellGrid::new(50, 10);
        pager.draw(&mut screen);

        pager.move_down_n(1);
        pager.move_down_n(1);
        assert_eq!(pager.doc().top_lx, 100);

        pager.move_up_n(1);
        assert_eq!(pager.doc().top_lx, 50);
        pager.move_up_n(1);
        assert_eq!(pager.doc().top_lx, 0);
        pager.move_up_n(1);
        assert_eq!(pager.doc().top_ln, 0);
        assert_eq!(pager.doc().top_lx, 0);
    }

    #[test]
    fn test_move_bottom_then_top() {
        let mut pager = pager_over(&numbered(100));
        let mut screen = CellGrid::new(80, 24);
        pager.draw(&mut screen);

        pager.move_bottom();
        let bottom_top = pager.doc().top_ln;
        assert!(bottom_top > 0);
        // The buffer end stays within one screen of the origin.
        assert!(bottom_top + 24 >= 100, "bottom origin {} too high", bottom_top);

        pager.move_top();
        assert_eq!(pager.doc().top_ln, 0);
    }

    #[test]
    fn test_down_clamps_at_bottom() {
        let mut pager = pager_over(&numbered(30));
        let mut screen = CellGrid::new(80, 24);
        pager.draw(&mut screen);

        for _ in 0..100 {
            pager.move_down_n(1);
        }
        pager.draw(&mut screen);
        let top = pager.doc().top_ln;
        assert!(top < 30, "origin must stay inside the buffer");
        // More downs do not move it further.
        pager.move_down_n(1);
        assert_eq!(pager.doc().top_ln, top);
    }

    #[test]
    fn test_horizontal_scroll_no_wrap() {
        let text = format!("{}\n", "x".repeat(300));
        let mut pager = pager_over(&text);
        pager.doc_mut().set_wrap_mode(false);
        let mut screen = CellGrid::new(40, 10);
        pager.draw(&mut screen);

        pager.move_right_n(10);
        assert_eq!(pager.doc().x, 10);
        pager.move_left_n(4);
        assert_eq!(pager.doc().x, 6);
        pager.move_left_n(100);
        assert_eq!(pager.doc().x, MIN_START_X);
        pager.move_begin_left();
        assert_eq!(pager.doc().x, 0);
    }

    #[test]
    fn test_horizontal_ignored_in_wrap_mode() {
        let mut pager = pager_over(&numbered(5));
        let mut screen = CellGrid::new(40, 10);
        pager.draw(&mut screen);
        pager.move_right_n(5);
        assert_eq!(pager.doc().x, 0);
    }

    #[test]
    fn test_column_cursor_moves_by_delimiter() {
        let mut pager = pager_over("aa,bb,cc,dd\naa,bb,cc,dd\n");
        {
            let doc = pager.doc_mut();
            doc.set_wrap_mode(false);
            doc.general.column_mode = true;
            doc.set_delimiter(",");
        }
        let mut screen = CellGrid::new(40, 10);
        pager.draw(&mut screen);

        pager.move_right_n(1);
        assert_eq!(pager.doc().column_cursor, 1);
        pager.move_right_n(1);
        assert_eq!(pager.doc().column_cursor, 2);
        pager.move_left_n(1);
        assert_eq!(pager.doc().column_cursor, 1);
        // The narrow table fits, so no scrolling happened.
        assert_eq!(pager.doc().x, 0);
    }

    #[test]
    fn test_column_cursor_no_columns() {
        let mut pager = pager_over("plain text with no delimiter\n");
        {
            let doc = pager.doc_mut();
            doc.set_wrap_mode(false);
            doc.general.column_mode = true;
            doc.set_delimiter(",");
        }
        let mut screen = CellGrid::new(40, 10);
        pager.draw(&mut screen);

        pager.move_right_n(1);
        // No delimiter: the cursor stays at 0 and x is untouched.
        assert_eq!(pager.doc().column_cursor, 0);
        assert_eq!(pager.doc().x, 0);
    }

    #[test]
    fn test_sections_next_prev() {
        let text = "===CH1\na\nb\n===CH2\nc\nd\n===CH3\ne\n";
        let mut pager = pager_over(text);
        pager.doc_mut().set_section_delimiter("^===");
        let mut screen = CellGrid::new(40, 6);
        pager.draw(&mut screen);

        pager.next_section();
        assert_eq!(pager.doc().top_ln, 3);
        pager.next_section();
        assert_eq!(pager.doc().top_ln, 6);
        pager.prev_section();
        assert_eq!(pager.doc().top_ln, 3);
        pager.last_section();
        assert_eq!(pager.doc().top_ln, 6);
    }

    #[test]
    fn test_next_section_without_delimiter_pages() {
        let mut pager = pager_over(&numbered(100));
        let mut screen = CellGrid::new(80, 24);
        pager.draw(&mut screen);
        pager.next_section();
        assert_eq!(pager.doc().top_ln, 23, "degrades to page down");
    }

    #[test]
    fn test_goto_line() {
        let mut pager = pager_over(&numbered(100));
        let mut screen = CellGrid::new(80, 24);
        pager.draw(&mut screen);
        pager.goto_line(42);
        assert_eq!(pager.doc().top_ln, 41);
        assert_eq!(pager.doc().top_lx, 0);
    }

    #[test]
    fn test_mark_jumping() {
        let mut pager = pager_over(&numbered(50));
        let mut screen = CellGrid::new(80, 24);
        pager.draw(&mut screen);

        pager.goto_line(10);
        pager.toggle_mark();
        pager.goto_line(30);
        pager.toggle_mark();
        pager.move_top();

        pager.move_next_mark();
        let first_jump = pager.doc().top_ln;
        pager.move_next_mark();
        let second_jump = pager.doc().top_ln;
        assert_ne!(first_jump, second_jump);
        assert!([9, 29].contains(&first_jump));
        assert!([9, 29].contains(&second_jump));
    }

    #[test]
    fn test_cursor_from_position_snaps_left() {
        // Columns start at 0, 20, 40, 60; view shows [0, 30).
        let widths = vec![0, 20, 40, 60];
        assert_eq!(cursor_from_position(&widths, 1, 0, 30), 1);
        // A cursor far right of the view snaps to the last visible column.
        assert_eq!(cursor_from_position(&widths, 3, 0, 30), 1);
    }
}
