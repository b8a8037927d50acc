//! The pager: the open documents plus the per-frame screen state.
//!
//! Layout, drawing, and navigation are implemented on `Pager` across
//! `layout`, `draw`, `highlight`, and `navigate`; this module holds the
//! shared state they operate on.

use std::collections::HashMap;
use std::sync::Arc;

use crate::content::LineC;
use crate::document::Document;
use crate::search::Searcher;
use crate::theme::Theme;

/// Leftmost the body can be scrolled to, letting a few columns hang off
/// the left edge before the clamp.
pub(crate) const MIN_START_X: isize = -10;

/// Logical coordinates of one display row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineNumber {
    /// Logical line number.
    pub number: isize,
    /// Wrap segment within the line, 0 for the first.
    pub wrap: usize,
}

impl LineNumber {
    pub(crate) fn new(number: isize, wrap: usize) -> Self {
        LineNumber { number, wrap }
    }
}

/// Per-frame screen state.
#[derive(Debug, Default)]
pub(crate) struct Scr {
    pub v_width: usize,
    pub v_height: usize,
    /// Left margin consumed by the line-number gutter.
    pub start_x: usize,
    /// Styled lines gathered for this frame, by logical line number.
    pub contents: HashMap<isize, LineC>,
    /// Row to logical coordinates, indexed by y.
    pub numbers: Vec<LineNumber>,
    /// Line number of the pinned section header, -1 when absent.
    pub section_header_ln: isize,
    /// Countdown of section-line styling below a matched delimiter row.
    pub section_header_left: isize,
}

/// A one-line editor shown in place of the status line.
#[derive(Debug, Clone)]
pub struct InputLine {
    pub prompt: String,
    pub value: String,
    pub cursor: usize,
}

pub struct Pager {
    pub docs: Vec<Document>,
    pub current: usize,
    pub theme: Theme,
    pub(crate) scr: Scr,
    /// The active searcher; drives the search highlight overlay.
    pub(crate) searcher: Option<Arc<dyn Searcher>>,
    /// Transient status message.
    pub message: String,
    /// Active input prompt, drawn over the status line.
    pub input: Option<InputLine>,
    /// Prefix the status line with the document index.
    pub show_doc_num: bool,
}

impl Pager {
    pub fn new(doc: Document) -> Self {
        Pager {
            docs: vec![doc],
            current: 0,
            theme: Theme::default(),
            scr: Scr {
                section_header_ln: -1,
                ..Scr::default()
            },
            searcher: None,
            message: String::new(),
            input: None,
            show_doc_num: false,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.docs[self.current]
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.docs[self.current]
    }

    /// Add a document and switch to it.
    pub fn add_document(&mut self, doc: Document) {
        self.docs.push(doc);
        self.current = self.docs.len() - 1;
    }

    /// Close the current document and fall back to the previous one.
    /// The last document stays open.
    pub fn close_current(&mut self) -> bool {
        if self.docs.len() <= 1 {
            return false;
        }
        let mut doc = self.docs.remove(self.current);
        doc.close();
        if self.current >= self.docs.len() {
            self.current = self.docs.len() - 1;
        }
        true
    }

    pub fn next_document(&mut self) {
        if !self.docs.is_empty() {
            self.current = (self.current + 1) % self.docs.len();
        }
    }

    pub fn prev_document(&mut self) {
        if !self.docs.is_empty() {
            self.current = self.current.checked_sub(1).unwrap_or(self.docs.len() - 1);
        }
    }

    pub fn set_searcher(&mut self, searcher: Option<Arc<dyn Searcher>>) {
        self.searcher = searcher;
    }

    pub fn searcher(&self) -> Option<Arc<dyn Searcher>> {
        self.searcher.clone()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        tracing::info!("{}", self.message);
    }

    /// Diagnostics that do not deserve the status line.
    pub fn debug_message(&mut self, message: impl Into<String>) {
        tracing::debug!("{}", message.into());
    }

    /// Row of the status line.
    pub(crate) fn status_pos(&self) -> usize {
        self.scr.v_height.saturating_sub(1)
    }

    /// Display strings of the valid lines gathered for the last frame,
    /// used as the sample for column width guessing.
    pub fn screen_lines(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.scr
            .numbers
            .iter()
            .filter(|n| seen.insert(n.number))
            .filter_map(|n| self.scr.contents.get(&n.number))
            .filter(|line| line.valid)
            .map(|line| line.str.clone())
            .collect()
    }

    /// Mode label shown ahead of the file name.
    pub(crate) fn status_display(&self) -> &'static str {
        if self.doc().follow_mode() {
            "(Follow Mode)"
        } else {
            ""
        }
    }
}
