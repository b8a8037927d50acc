//! SGR escape sequence decoding.
//!
//! The pager keeps color output from tools like `ls --color` or `grep
//! --color` intact: CSI `...m` sequences are folded into the current cell
//! style instead of producing cells. All other escape sequences are
//! consumed and dropped.

use ratatui::style::{Color, Modifier, Style};

/// Outcome of scanning one escape sequence.
pub(crate) enum Sequence {
    /// A complete SGR sequence; `usize` is the number of bytes consumed
    /// (including the ESC) and the style is the updated one.
    Sgr(usize, Style),
    /// A complete non-SGR sequence of the given byte length. Skipped.
    Other(usize),
    /// The input ends in the middle of a sequence; drop the rest of the line.
    Truncated,
}

/// Scan an escape sequence starting at `s[0] == ESC`.
pub(crate) fn scan_sequence(s: &str, current: Style) -> Sequence {
    let bytes = s.as_bytes();
    match bytes.get(1) {
        // CSI: ESC [ params final
        Some(b'[') => {
            for (i, &b) in bytes.iter().enumerate().skip(2) {
                if (0x40..=0x7e).contains(&b) {
                    if b == b'm' {
                        let style = apply_sgr(current, &s[2..i]);
                        return Sequence::Sgr(i + 1, style);
                    }
                    return Sequence::Other(i + 1);
                }
            }
            Sequence::Truncated
        }
        // OSC: ESC ] ... (BEL | ESC \)
        Some(b']') => {
            let mut i = 2;
            while i < bytes.len() {
                match bytes[i] {
                    0x07 => return Sequence::Other(i + 1),
                    0x1b if bytes.get(i + 1) == Some(&b'\\') => {
                        return Sequence::Other(i + 2);
                    }
                    _ => i += 1,
                }
            }
            Sequence::Truncated
        }
        // Two-byte escapes (ESC c, ESC =, ...)
        Some(_) => {
            let n = s[1..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
            Sequence::Other(1 + n)
        }
        None => Sequence::Truncated,
    }
}

/// Fold one SGR parameter string (the text between `ESC [` and `m`) into a
/// style. An empty parameter list is a reset.
pub(crate) fn apply_sgr(current: Style, params: &str) -> Style {
    if params.is_empty() {
        return Style::default();
    }

    let mut style = current;
    let codes: Vec<u16> = params
        .split([';', ':'])
        .map(|p| p.parse::<u16>().unwrap_or(0))
        .collect();

    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            0 => style = Style::default(),
            1 => style = style.add_modifier(Modifier::BOLD),
            2 => style = style.add_modifier(Modifier::DIM),
            3 => style = style.add_modifier(Modifier::ITALIC),
            4 => style = style.add_modifier(Modifier::UNDERLINED),
            5 | 6 => style = style.add_modifier(Modifier::SLOW_BLINK),
            7 => style = style.add_modifier(Modifier::REVERSED),
            8 => style = style.add_modifier(Modifier::HIDDEN),
            9 => style = style.add_modifier(Modifier::CROSSED_OUT),
            21 | 22 => {
                style = style.remove_modifier(Modifier::BOLD);
                style = style.remove_modifier(Modifier::DIM);
            }
            23 => style = style.remove_modifier(Modifier::ITALIC),
            24 => style = style.remove_modifier(Modifier::UNDERLINED),
            25 => style = style.remove_modifier(Modifier::SLOW_BLINK),
            27 => style = style.remove_modifier(Modifier::REVERSED),
            28 => style = style.remove_modifier(Modifier::HIDDEN),
            29 => style = style.remove_modifier(Modifier::CROSSED_OUT),
            30..=37 => style = style.fg(ansi16(codes[i] - 30)),
            38 => {
                let (color, used) = extended_color(&codes[i + 1..]);
                if let Some(c) = color {
                    style = style.fg(c);
                }
                i += used;
            }
            39 => style = style.fg(Color::Reset),
            40..=47 => style = style.bg(ansi16(codes[i] - 40)),
            48 => {
                let (color, used) = extended_color(&codes[i + 1..]);
                if let Some(c) = color {
                    style = style.bg(c);
                }
                i += used;
            }
            49 => style = style.bg(Color::Reset),
            90..=97 => style = style.fg(ansi16(codes[i] - 90 + 8)),
            100..=107 => style = style.bg(ansi16(codes[i] - 100 + 8)),
            _ => {}
        }
        i += 1;
    }
    style
}

/// 256-color (`5;n`) and truecolor (`2;r;g;b`) sub-parameters.
/// Returns the color and the number of codes consumed.
fn extended_color(codes: &[u16]) -> (Option<Color>, usize) {
    match codes.first() {
        Some(5) => match codes.get(1) {
            Some(&n) if n < 256 => (Some(Color::Indexed(n as u8)), 2),
            _ => (None, codes.len()),
        },
        Some(2) => {
            if codes.len() >= 4 {
                let (r, g, b) = (codes[1], codes[2], codes[3]);
                if r < 256 && g < 256 && b < 256 {
                    return (Some(Color::Rgb(r as u8, g as u8, b as u8)), 4);
                }
            }
            (None, codes.len())
        }
        _ => (None, codes.len()),
    }
}

fn ansi16(n: u16) -> Color {
    match n {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        7 => Color::Gray,
        8 => Color::DarkGray,
        9 => Color::LightRed,
        10 => Color::LightGreen,
        11 => Color::LightYellow,
        12 => Color::LightBlue,
        13 => Color::LightMagenta,
        14 => Color::LightCyan,
        _ => Color::White,
    }
}
