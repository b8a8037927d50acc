//! Cell emission: header, pinned section header, body, and status line.
//!
//! The draw order matters: the body is painted first, then the section
//! header overwrites the rows directly under the frozen header, then the
//! status line. Row overlays (alternate shading, marks, section lines,
//! jump target) are patched over already-emitted cells.

use ratatui::style::Style;

use crate::content::{str_to_contents, Contents};
use crate::pager::{LineNumber, Pager, MIN_START_X};
use crate::screen::Screen;
use crate::theme::apply_style;

/// Rows reserved for the status bar.
pub(crate) const STATUS_LINE: usize = 1;

impl Pager {
    /// Paint one frame.
    pub fn draw(&mut self, screen: &mut dyn Screen) {
        let (w, h) = screen.size();
        self.scr.v_width = w;
        self.scr.v_height = h;
        if h == 0 {
            self.doc_mut().top_ln = 0;
            screen.show();
            return;
        }
        self.scr.numbers = vec![LineNumber::default(); h];
        self.scr.section_header_left = 0;
        self.prepare_draw();
        if self.doc().general.column_mode {
            let cursor = self.doc().column_cursor;
            let corrected = self.cursor_correction(cursor);
            self.doc_mut().column_cursor = corrected;
        }

        let l_n = self.draw_header(screen);
        let l_x = if self.doc().general.wrap_mode {
            self.doc().top_lx
        } else {
            0
        };
        let l_n = self.doc().top_ln + l_n;

        let (l_x, l_n) = self.draw_body(screen, l_x, l_n);
        self.draw_section_header(screen);

        {
            let doc = self.doc_mut();
            doc.bottom_ln = l_n.max(0);
            doc.bottom_lx = l_x;
            doc.latest_num = doc.buf_end_num();
        }

        self.draw_status(screen);
        screen.show();
    }

    /// Draw the frozen header rows. Returns the first body line number.
    fn draw_header(&mut self, screen: &mut dyn Screen) -> isize {
        let first = self.doc().first_line();
        let mut l_n = self.doc().general.skip_lines;
        let mut l_x = 0;
        let mut wrap_num = 0;
        let mut y = 0usize;
        while l_n < first {
            if y > self.scr.v_height {
                break;
            }
            let line = self.line_for(l_n);
            if y < self.scr.numbers.len() {
                self.scr.numbers[y] = LineNumber::new(l_n, wrap_num);
            }
            let (next_lx, next_ln) = self.draw_line(screen, y, l_x, l_n, &line.lc);
            if self.doc().general.line_num_mode {
                self.blank_line_number(screen, y);
            }
            self.y_style(screen, y, self.theme.header);

            wrap_num += 1;
            if next_lx == 0 {
                wrap_num = 0;
            }
            l_x = next_lx;
            l_n = next_ln;
            y += 1;
        }
        self.doc_mut().header_len = y as isize;
        l_n
    }

    /// Draw the body rows between the header and the status line.
    fn draw_body(
        &mut self,
        screen: &mut dyn Screen,
        mut l_x: isize,
        mut l_n: isize,
    ) -> (isize, isize) {
        let mut wrap_num = self.num_of_wrap(l_x, l_n);
        let header_len = self.doc().header_len.max(0) as usize;
        for y in header_len..self.scr.v_height.saturating_sub(STATUS_LINE) {
            let line = self.line_for(l_n);
            if y < self.scr.numbers.len() {
                self.scr.numbers[y] = LineNumber::new(l_n, wrap_num);
            }
            let (next_lx, next_ln) = self.draw_line(screen, y, l_x, l_n, &line.lc);
            self.draw_line_number(screen, l_n, y, line.valid);
            if line.valid {
                self.coordinates_style(screen, l_n, y, &line.str);
            }

            wrap_num += 1;
            if next_lx == 0 {
                wrap_num = 0;
            }
            l_x = next_lx;
            l_n = next_ln;
        }
        (l_x, l_n)
    }

    /// Overwrite the rows under the frozen header with the pinned section
    /// header.
    fn draw_section_header(&mut self, screen: &mut dyn Screen) {
        {
            let doc = self.doc();
            if !doc.general.section_header || doc.general.section_delimiter.is_empty() {
                return;
            }
        }
        let s_ln = self.scr.section_header_ln;
        if s_ln < 0 {
            return;
        }
        let num = self.doc().general.section_header_num;
        let header_len = self.doc().header_len.max(0) as usize;

        let mut sx = 0;
        let mut sn = s_ln;
        let mut wrap_num = 0;
        let mut y = header_len;
        while sn < s_ln + num {
            if y >= self.scr.v_height.saturating_sub(STATUS_LINE) {
                break;
            }
            let line = self.line_for(sn);
            if y < self.scr.numbers.len() {
                self.scr.numbers[y] = LineNumber::new(sn, wrap_num);
            }
            self.draw_line_number(screen, sn, y, line.valid);
            let (next_lx, next_ln) = self.draw_line(screen, y, sx, sn, &line.lc);
            self.y_style(screen, y, self.theme.section_line);
            let width = self.scr.v_width.min(self.doc().general.mark_style_width);
            self.mark_style(screen, sn, y, width);

            wrap_num += 1;
            if next_lx == 0 {
                wrap_num = 0;
            }
            sx = next_lx;
            sn = next_ln;
            y += 1;
        }
    }

    /// Draw one display row and return the next drawing position.
    fn draw_line(
        &self,
        screen: &mut dyn Screen,
        y: usize,
        l_x: isize,
        l_n: isize,
        lc: &Contents,
    ) -> (isize, isize) {
        if self.doc().general.wrap_mode {
            self.draw_wrap_line(screen, y, l_x, l_n, lc)
        } else {
            self.draw_no_wrap_line(screen, y, self.doc().x, l_n, lc)
        }
    }

    fn draw_wrap_line(
        &self,
        screen: &mut dyn Screen,
        y: usize,
        l_x: isize,
        l_n: isize,
        lc: &Contents,
    ) -> (isize, isize) {
        if l_x < 0 {
            tracing::warn!("illegal wrap offset {}", l_x);
            return (0, 0);
        }
        let l_x = l_x as usize;
        let start_x = self.scr.start_x;
        let mut x = 0usize;
        loop {
            if l_x + x >= lc.len() {
                self.clear_eol(screen, start_x + x, y);
                return (0, l_n + 1);
            }
            let content = &lc[l_x + x];
            if x + start_x + content.width as usize > self.scr.v_width {
                // Right edge; a wide cell that does not fit waits for the
                // next row.
                self.clear_eol(screen, start_x + x, y);
                return ((l_x + x) as isize, l_n);
            }
            screen.set_content(start_x + x, y, content.main, &content.combc, content.style);
            x += 1;
        }
    }

    fn draw_no_wrap_line(
        &self,
        screen: &mut dyn Screen,
        y: usize,
        start_x: isize,
        l_n: isize,
        lc: &Contents,
    ) -> (isize, isize) {
        let start_x = start_x.max(MIN_START_X);
        let margin = self.scr.start_x;
        let mut x = 0usize;
        while margin + x < self.scr.v_width {
            let idx = start_x + x as isize;
            if idx >= lc.len() as isize {
                self.clear_eol(screen, margin + x, y);
                break;
            }
            if idx >= 0 {
                let content = &lc[idx as usize];
                screen.set_content(margin + x, y, content.main, &content.combc, content.style);
            } else {
                screen.set_content(margin + x, y, ' ', &[], Style::default());
            }
            x += 1;
        }
        (start_x, l_n + 1)
    }

    /// Row overlays for a valid body row.
    fn coordinates_style(&mut self, screen: &mut dyn Screen, l_n: isize, y: usize, str: &str) {
        self.alternate_rows_style(screen, l_n, y);
        self.section_line_highlight(screen, y, str);
        let width = self.scr.v_width.min(self.doc().general.mark_style_width);
        self.mark_style(screen, l_n, y, width);
        let jump = self.doc().general.jump_target;
        if jump != 0 && self.doc().header_len + jump == y as isize {
            self.y_style(screen, y, self.theme.jump_target_line);
        }
    }

    fn alternate_rows_style(&self, screen: &mut dyn Screen, l_n: isize, y: usize) {
        if self.doc().general.alternate_rows && l_n % 2 == 1 {
            self.y_style(screen, y, self.theme.alternate);
        }
    }

    /// Style delimiter rows, and the `section_header_num - 1` rows after
    /// them through a countdown.
    fn section_line_highlight(&mut self, screen: &mut dyn Screen, y: usize, str: &str) {
        if self.doc().general.section_delimiter.is_empty() {
            return;
        }
        let matched = match &self.doc().section_delimiter_reg {
            Some(re) => re.is_match(str),
            None => {
                tracing::warn!(
                    "section delimiter not compiled: {}",
                    self.doc().general.section_delimiter
                );
                return;
            }
        };
        self.scr.section_header_left -= 1;
        if self.scr.section_header_left > 0 {
            self.y_style(screen, y, self.theme.section_line);
        }
        if matched {
            self.y_style(screen, y, self.theme.section_line);
            self.scr.section_header_left = self.doc().general.section_header_num;
        }
    }

    /// Paint the leftmost columns of marked lines.
    fn mark_style(&self, screen: &mut dyn Screen, l_n: isize, y: usize, width: usize) {
        if self.doc().marked.contains(&l_n) {
            for x in 0..width {
                let (main, combc, style) = screen.get_content(x, y);
                screen.set_content(x, y, main, &combc, apply_style(style, self.theme.mark_line));
            }
        }
    }

    /// Patch a style across one physical row.
    fn y_style(&self, screen: &mut dyn Screen, y: usize, style: Style) {
        for x in 0..self.scr.v_width {
            let (main, combc, base) = screen.get_content(x, y);
            screen.set_content(x, y, main, &combc, apply_style(base, style));
        }
    }

    fn draw_line_number(&self, screen: &mut dyn Screen, l_n: isize, y: usize, valid: bool) {
        let m = self.doc();
        if !m.general.line_num_mode {
            return;
        }
        if !valid {
            self.blank_line_number(screen, y);
            return;
        }
        if self.scr.start_x == 0 {
            return;
        }

        let mut number = l_n;
        if let Some(map) = &m.line_map {
            if l_n >= 0 {
                if let Some(n) = map.load_forward(l_n as usize) {
                    number = n as isize;
                }
            }
        }
        // Numbering starts at 1 past the skip and header lines.
        number = number - m.first_line() + 1;

        let width = self.scr.start_x.saturating_sub(1);
        let text = format!("{:>width$}", number, width = width);
        let numc = str_to_contents(&text, m.general.tab_width as isize);
        for (i, c) in numc.iter().enumerate() {
            screen.set_content(
                i,
                y,
                c.main,
                &c.combc,
                apply_style(Style::default(), self.theme.line_number),
            );
        }
    }

    fn blank_line_number(&self, screen: &mut dyn Screen, y: usize) {
        if self.scr.start_x == 0 {
            return;
        }
        for x in 0..self.scr.start_x.saturating_sub(1) {
            screen.set_content(x, y, ' ', &[], Style::default());
        }
    }

    // --- status line ----------------------------------------------------

    fn draw_status(&mut self, screen: &mut dyn Screen) {
        let status_pos = self.status_pos();
        self.clear_y(screen, status_pos);
        let (left, cursor_pos) = self.left_status();
        self.set_content_cells(screen, 0, status_pos, &left);

        let right = self.right_status();
        let x = self.scr.v_width.saturating_sub(right.chars().count());
        self.set_content_string(screen, x, status_pos, &right);
        screen.show_cursor(cursor_pos, status_pos);
    }

    fn left_status(&self) -> (Contents, usize) {
        if let Some(input) = &self.input {
            let text = format!("{}{}", input.prompt, input.value);
            let lc = str_to_contents(&text, -1);
            return (lc, input.prompt.chars().count() + input.cursor);
        }

        let mut left = String::new();
        if self.show_doc_num {
            left.push('[');
            left.push_str(&self.current.to_string());
            left.push(']');
        }
        left.push_str(self.status_display());
        if !self.doc().caption.is_empty() {
            left.push_str(&self.doc().caption);
        } else {
            left.push_str(&self.doc().file_name);
        }
        left.push(':');
        left.push_str(&self.message);
        let lc = str_to_contents(&left, -1);
        let cursor = lc.len();
        (lc, cursor)
    }

    /// Position indicator: `(top/end)`, `...` while still loading, and
    /// `(?/end...)` while a reload is filling the follow store.
    pub(crate) fn right_status(&self) -> String {
        let doc = self.doc();
        let next = if doc.buf_eof() { "" } else { "..." };
        if doc.tmp_follow() {
            format!("(?/{}{})", doc.buf_end_num(), next)
        } else {
            format!("({}/{}{})", doc.top_ln, doc.buf_end_num(), next)
        }
    }

    fn set_content_string(&self, screen: &mut dyn Screen, vx: usize, vy: usize, text: &str) {
        let lc = str_to_contents(text, -1);
        self.set_content_cells(screen, vx, vy, &lc);
    }

    fn set_content_cells(&self, screen: &mut dyn Screen, vx: usize, vy: usize, lc: &Contents) {
        for (x, content) in lc.iter().enumerate() {
            screen.set_content(vx + x, vy, content.main, &content.combc, content.style);
        }
    }

    fn clear_eol(&self, screen: &mut dyn Screen, x: usize, y: usize) {
        for x in x..self.scr.v_width {
            screen.set_content(x, y, ' ', &[], Style::default());
        }
    }

    fn clear_y(&self, screen: &mut dyn Screen, y: usize) {
        self.clear_eol(screen, 0, y);
    }
}
