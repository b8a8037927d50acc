//! Viewport planning.
//!
//! Before each frame the pager gathers and styles the lines the frame can
//! touch: the frozen header, the enclosing section header, and the body
//! range. The drawer then only walks rows; every `LineC` it needs is
//! already in `scr.contents`.

use std::time::Duration;

use crate::content::LineC;
use crate::error::{Error, Result};
use crate::highlight::range_style;
use crate::search::CancelToken;
use crate::pager::Pager;

/// Hard budget for the per-frame section header search.
pub(crate) const SECTION_TIMEOUT: Duration = Duration::from_millis(1000);

impl Pager {
    /// Gather and style every line this frame can show, resolve the pinned
    /// section header, and re-anchor a pending goto target.
    pub(crate) fn prepare_draw(&mut self) {
        self.scr.start_x = if self.doc().general.line_num_mode {
            num_digits(self.doc().buf_end_num()) + 1
        } else {
            0
        };

        self.scr.contents.clear();

        // Frozen header lines.
        let skip = self.doc().general.skip_lines;
        let first = self.doc().first_line();
        self.set_contents(skip, first);

        // Enclosing section header.
        match self.search_section_header() {
            Ok(s_ln) => {
                self.scr.section_header_ln = s_ln;
                let num = self.doc().general.section_header_num;
                self.set_contents(s_ln, s_ln + num);
            }
            Err(_) => self.scr.section_header_ln = -1,
        }

        let s_ln = self.scr.section_header_ln;
        let num = self.doc().general.section_header_num;
        let mut section_rows = 0;
        if s_ln >= 0 {
            if self.doc().general.wrap_mode {
                for i in s_ln..s_ln + num {
                    section_rows += self.left_most_x(i).len() as isize;
                }
            } else {
                section_rows = num;
            }
        }
        self.doc_mut().section_header_len = section_rows;

        // A goto target that landed under the pinned section header is
        // re-anchored above it once.
        if self.doc().show_goto && s_ln >= 0 && self.doc().general.jump_target == 0 {
            if self.doc().top_ln >= s_ln + num {
                self.move_y_up(section_rows);
            }
        }
        self.doc_mut().show_goto = false;

        // Body range, with margin for wrap variance.
        let top = self.doc().top_ln;
        let end = top + self.scr.v_height as isize + first + 1;
        self.set_contents(top, end);

        // Section-relative coordinates for the gathered lines.
        if s_ln >= 0 {
            for (l_n, line) in self.scr.contents.iter_mut() {
                if line.valid && *l_n >= s_ln {
                    line.section = 1;
                    line.section_nm = (*l_n - s_ln) as i32;
                }
            }
        }
    }

    /// Parse, base-style, and overlay the lines in `[start, end)`.
    fn set_contents(&mut self, start: isize, end: isize) {
        let current = self.current;
        for l_n in start..end {
            if self.scr.contents.contains_key(&l_n) {
                continue;
            }
            let mut line = self.docs[current].line_c(l_n);
            if line.valid {
                let len = line.lc.len();
                range_style(&mut line.lc, 0, len, self.theme.body);
                self.style_content(&mut line);
            }
            self.scr.contents.insert(l_n, line);
        }
    }

    /// Find the section header enclosing the view top. A timed-out search
    /// disables the delimiter for the session so one pathological file
    /// cannot tax every frame.
    fn search_section_header(&mut self) -> Result<isize> {
        {
            let doc = self.doc();
            if !doc.general.section_header || doc.general.section_delimiter.is_empty() {
                return Err(Error::NoDelimiter);
            }
        }
        let l_n = self.doc().top_ln + 1;
        let cancel = CancelToken::with_timeout(SECTION_TIMEOUT);
        match self.doc_mut().prev_section(&cancel, l_n) {
            Ok(s_ln) => {
                if self.doc().general.header > s_ln {
                    return Err(Error::NoMoreSection);
                }
                Ok(s_ln)
            }
            Err(Error::Cancel) => {
                self.set_message("section header search timed out");
                self.doc_mut().set_section_delimiter("");
                Err(Error::NoMoreSection)
            }
            Err(_) => Err(Error::NoMoreSection),
        }
    }

    /// Wrap-segment start offsets for a line at the current body width.
    pub(crate) fn left_most_x(&mut self, l_n: isize) -> Vec<isize> {
        let width = self.scr.v_width.saturating_sub(self.scr.start_x);
        let current = self.current;
        self.docs[current].left_most_x(width, l_n)
    }

    /// A styled line gathered for this frame; the EOF row when absent.
    pub(crate) fn line_for(&self, l_n: isize) -> LineC {
        self.scr
            .contents
            .get(&l_n)
            .cloned()
            .unwrap_or_else(LineC::eof)
    }
}

fn num_digits(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}
