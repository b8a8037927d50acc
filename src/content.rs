//! The cell model: one logical line expanded into display cells.
//!
//! A `Content` is one screen cell. `Contents` is indexed by screen column,
//! so a double-width character contributes two entries: the cell itself and
//! a zero-width pad. This keeps wrap boundaries, horizontal scrolling, and
//! style ranges simple column arithmetic.

use ratatui::style::{Color, Modifier, Style};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::ansi::{scan_sequence, Sequence};

/// Marker drawn on the synthetic row past the end of the buffer.
pub const EOF_MARK: char = '~';

/// One display cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    /// Primary rune of the cell. `'\0'` marks the pad after a wide cell.
    pub main: char,
    /// Combining runes attached to the primary one.
    pub combc: Vec<char>,
    pub style: Style,
    /// Display width: 0 (pad), 1, or 2.
    pub width: u8,
}

impl Content {
    fn new(main: char, combc: Vec<char>, style: Style, width: u8) -> Self {
        Content {
            main,
            combc,
            style,
            width,
        }
    }

    fn pad(style: Style) -> Self {
        Content::new('\0', Vec::new(), style, 0)
    }

    /// True for the zero-width filler after a double-width cell.
    pub fn is_pad(&self) -> bool {
        self.width == 0 && self.main == '\0'
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::new(' ', Vec::new(), Style::default(), 1)
    }
}

/// A logical line as a sequence of cells, indexed by screen column.
pub type Contents = Vec<Content>;

/// Byte offset in the display string to cell column, monotone in both
/// directions. Built by [`contents_to_str`] and used to translate regex
/// match offsets into style ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidthPos(Vec<usize>);

impl WidthPos {
    /// Column of the cell containing display-string byte `i`. Offsets past
    /// the end map to one past the last column.
    pub fn x(&self, i: usize) -> usize {
        match self.0.get(i) {
            Some(&col) => col,
            None => self.0.last().copied().unwrap_or(0),
        }
    }
}

/// One line packaged for drawing: cells, display string, and the byte to
/// column map. `valid == false` is the fabricated past-EOF row.
#[derive(Debug, Clone, Default)]
pub struct LineC {
    pub lc: Contents,
    pub str: String,
    pub pos: WidthPos,
    pub valid: bool,
    /// Section count at this line, when section scanning is active.
    pub section: i32,
    /// Line offset within its section.
    pub section_nm: i32,
}

impl LineC {
    /// The synthetic row rendered past the end of the buffer.
    pub fn eof() -> Self {
        LineC {
            lc: vec![Content::new(
                EOF_MARK,
                Vec::new(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
                1,
            )],
            str: EOF_MARK.to_string(),
            pos: WidthPos(vec![0, 1]),
            valid: false,
            section: 0,
            section_nm: 0,
        }
    }
}

/// Expand one raw line into cells: tab expansion to the next `tab_width`
/// boundary, SGR folding into styles, carriage returns dropped, combining
/// marks attached to the preceding cell.
pub fn parse_string(s: &str, tab_width: usize) -> Contents {
    let mut lc: Contents = Vec::with_capacity(s.len());
    let mut style = Style::default();

    let mut rest = s;
    while !rest.is_empty() {
        if rest.starts_with('\x1b') {
            match scan_sequence(rest, style) {
                Sequence::Sgr(n, next) => {
                    style = next;
                    rest = &rest[n..];
                }
                Sequence::Other(n) => rest = &rest[n..],
                Sequence::Truncated => break,
            }
            continue;
        }

        let run_end = rest.find('\x1b').unwrap_or(rest.len());
        let (run, tail) = rest.split_at(run_end);
        parse_run(&mut lc, run, style, tab_width);
        rest = tail;
    }
    lc
}

/// Expand a run of text with a fixed style.
fn parse_run(lc: &mut Contents, run: &str, style: Style, tab_width: usize) {
    for g in run.graphemes(true) {
        match g {
            "\t" => {
                if tab_width == 0 {
                    continue;
                }
                let n = tab_width - (lc.len() % tab_width);
                for _ in 0..n {
                    lc.push(Content::new(' ', Vec::new(), style, 1));
                }
            }
            "\r" => {}
            _ => {
                let width = UnicodeWidthStr::width(g).min(2);
                let mut chars = g.chars();
                let main = chars.next().unwrap_or(char::REPLACEMENT_CHARACTER);
                let combc: Vec<char> = chars.collect();

                if width == 0 {
                    // Stray combining mark: attach to the previous cell.
                    if let Some(prev) = lc.iter_mut().rev().find(|c| !c.is_pad()) {
                        prev.combc.push(main);
                        prev.combc.extend(combc);
                    }
                    continue;
                }

                lc.push(Content::new(main, combc, style, width as u8));
                if width == 2 {
                    lc.push(Content::pad(style));
                }
            }
        }
    }
}

/// Rebuild the display string (no SGR) from cells, with the byte-to-column
/// map used to translate match offsets back into cell ranges.
pub fn contents_to_str(lc: &Contents) -> (String, WidthPos) {
    let mut s = String::new();
    let mut map = Vec::new();
    for (col, c) in lc.iter().enumerate() {
        if c.is_pad() {
            continue;
        }
        let start = s.len();
        s.push(c.main);
        for &cc in &c.combc {
            s.push(cc);
        }
        for _ in start..s.len() {
            map.push(col);
        }
    }
    map.push(lc.len());
    (s, WidthPos(map))
}

/// Convenience for status-line text: parse without tab expansion concerns.
pub fn str_to_contents(s: &str, tab_width: isize) -> Contents {
    let tw = if tab_width < 0 { 0 } else { tab_width as usize };
    parse_string(s, tw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ascii() {
        let lc = parse_string("abc", 8);
        assert_eq!(lc.len(), 3);
        assert_eq!(lc[0].main, 'a');
        assert_eq!(lc[2].main, 'c');
        assert!(lc.iter().all(|c| c.width == 1));
    }

    #[test]
    fn test_tab_expansion() {
        let lc = parse_string("a\tb", 8);
        // 'a' + 7 spaces to the next tab stop + 'b'
        assert_eq!(lc.len(), 9);
        assert_eq!(lc[8].main, 'b');
        for c in &lc[1..8] {
            assert_eq!(c.main, ' ');
        }

        let lc = parse_string("\tb", 4);
        assert_eq!(lc.len(), 5);
        assert_eq!(lc[4].main, 'b');
    }

    #[test]
    fn test_carriage_return_dropped() {
        let lc = parse_string("ab\r", 8);
        assert_eq!(lc.len(), 2);
    }

    #[test]
    fn test_wide_char_pads() {
        let lc = parse_string("あx", 8);
        assert_eq!(lc.len(), 3);
        assert_eq!(lc[0].main, 'あ');
        assert_eq!(lc[0].width, 2);
        assert!(lc[1].is_pad());
        assert_eq!(lc[2].main, 'x');
    }

    #[test]
    fn test_combining_mark_attaches() {
        // e + U+0301 combining acute is one grapheme, one cell.
        let lc = parse_string("e\u{301}x", 8);
        assert_eq!(lc.len(), 2);
        assert_eq!(lc[0].main, 'e');
        assert_eq!(lc[0].combc, vec!['\u{301}']);
        assert_eq!(lc[1].main, 'x');
    }

    #[test]
    fn test_sgr_styles_cells() {
        let lc = parse_string("a\x1b[31mb\x1b[0mc", 8);
        assert_eq!(lc.len(), 3);
        assert_eq!(lc[0].style, Style::default());
        assert_eq!(lc[1].style.fg, Some(Color::Red));
        assert_eq!(lc[2].style, Style::default());
    }

    #[test]
    fn test_non_sgr_sequences_dropped() {
        let lc = parse_string("a\x1b[2Kb", 8);
        assert_eq!(lc.len(), 2);
        assert_eq!(lc[1].main, 'b');
    }

    #[test]
    fn test_round_trip() {
        let (s, pos) = contents_to_str(&parse_string("a\x1b[31mbc", 8));
        assert_eq!(s, "abc");
        assert_eq!(pos.x(0), 0);
        assert_eq!(pos.x(1), 1);
        assert_eq!(pos.x(3), 3);
    }

    #[test]
    fn test_round_trip_tabs_expand() {
        let (s, _) = contents_to_str(&parse_string("a\tb", 8));
        assert_eq!(s, "a       b");
    }

    #[test]
    fn test_width_pos_wide_chars() {
        let lc = parse_string("あい", 8);
        let (s, pos) = contents_to_str(&lc);
        assert_eq!(s, "あい");
        // 'あ' is 3 bytes; 'い' starts at byte 3, column 2 (after the pad).
        assert_eq!(pos.x(0), 0);
        assert_eq!(pos.x(3), 2);
        assert_eq!(pos.x(6), 4);
    }

    #[test]
    fn test_width_pos_monotone() {
        let lc = parse_string("aあbい c", 4);
        let (s, pos) = contents_to_str(&lc);
        let mut last = 0;
        for i in 0..=s.len() {
            let x = pos.x(i);
            assert!(x >= last, "pos.x must be monotone at byte {}", i);
            last = x;
        }
    }

    #[test]
    fn test_eof_line() {
        let line = LineC::eof();
        assert!(!line.valid);
        assert_eq!(line.str, "~");
        assert_eq!(line.lc.len(), 1);
    }
}
