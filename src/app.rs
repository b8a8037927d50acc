//! The interactive event loop.
//!
//! The loop stays synchronous: each tick it drains key events, reader
//! events, and search results, then repaints if anything changed. Long
//! operations (search, reload, filters) run on their own threads and land
//! back here through channels.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use crate::pager::{InputLine, Pager};
use crate::reader::{ReaderEvent, ReaderEventKind};
use crate::search::{back_search_line, new_searcher, search_line, CancelToken};
use crate::term::TermScreen;

/// Frame budget for the idle poll.
const EVENT_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    BackSearch,
    Filter,
    Goto,
}

impl PromptKind {
    fn prompt_str(self) -> &'static str {
        match self {
            PromptKind::Search => "/",
            PromptKind::BackSearch => "?",
            PromptKind::Filter => "&",
            PromptKind::Goto => ":",
        }
    }
}

struct Prompt {
    kind: PromptKind,
    value: String,
}

/// An in-flight search, cancellable when a new one starts.
struct SearchJob {
    cancel: Arc<CancelToken>,
    rx: Receiver<Result<usize>>,
}

pub struct App {
    pager: Pager,
    screen: TermScreen,
    config: Config,
    events_tx: Sender<ReaderEvent>,
    events_rx: Receiver<ReaderEvent>,
    prompt: Option<Prompt>,
    search_job: Option<SearchJob>,
    /// Tail every open document, not just the current one.
    follow_all: bool,
    quit: bool,
}

impl App {
    pub fn new(
        doc: Document,
        log_doc: Document,
        config: Config,
        events_tx: Sender<ReaderEvent>,
        events_rx: Receiver<ReaderEvent>,
    ) -> anyhow::Result<App> {
        let screen = TermScreen::new()?;
        let mut pager = Pager::new(doc);
        pager.docs.push(log_doc);
        let follow = config.general.follow_mode;
        pager.doc_mut().set_follow_mode(follow);
        Ok(App {
            pager,
            screen,
            config,
            events_tx,
            events_rx,
            prompt: None,
            search_job: None,
            follow_all: false,
            quit: false,
        })
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut dirty = true;
        while !self.quit {
            if event::poll(EVENT_TICK)? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        self.handle_key(key);
                        dirty = true;
                    }
                    Event::Resize(w, h) => {
                        self.screen.resize(w as usize, h as usize);
                        dirty = true;
                    }
                    _ => {}
                }
            }

            while let Ok(ev) = self.events_rx.try_recv() {
                self.handle_reader_event(ev);
                dirty = true;
            }
            if self.poll_search() {
                dirty = true;
            }

            if self.follow_all || self.pager.doc().follow_mode() {
                self.pager.tail();
            }
            if self.pager.doc().take_changed() {
                dirty = true;
            }

            if dirty {
                self.sync_input();
                self.pager.draw(&mut self.screen);
                dirty = false;
            }
        }
        Ok(())
    }

    fn handle_reader_event(&mut self, ev: ReaderEvent) {
        let Some(idx) = self.pager.docs.iter().position(|d| d.doc_id == ev.doc_id) else {
            return;
        };
        match ev.kind {
            ReaderEventKind::Reloaded => {
                let doc = &mut self.pager.docs[idx];
                doc.clear_cache();
                doc.move_top();
                self.pager.set_message("reloaded");
            }
            ReaderEventKind::ReadError(e) => {
                self.pager.set_message(format!("read error: {}", e));
            }
            ReaderEventKind::EofReached | ReaderEventKind::ChunkLoaded(_) => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::NONE) => {
                if !self.pager.close_current() {
                    self.quit = true;
                }
            }
            (KeyCode::Char('Q'), _) => self.quit = true,
            (KeyCode::Esc, _) => {
                self.pager.message.clear();
                if let Some(job) = self.search_job.take() {
                    job.cancel.cancel();
                }
            }

            (KeyCode::Char('j'), KeyModifiers::NONE)
            | (KeyCode::Down, _)
            | (KeyCode::Enter, _) => self.pager.move_down(),
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => self.pager.move_up(),
            (KeyCode::Char(' '), _) | (KeyCode::PageDown, _) | (KeyCode::Char('f'), KeyModifiers::NONE) => {
                self.pager.move_pg_dn()
            }
            (KeyCode::Char('b'), KeyModifiers::NONE) | (KeyCode::PageUp, _) => {
                self.pager.move_pg_up()
            }
            (KeyCode::Char('d'), KeyModifiers::NONE) => self.pager.move_hf_dn(),
            (KeyCode::Char('u'), KeyModifiers::NONE) => self.pager.move_hf_up(),
            (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => self.pager.move_top(),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => self.pager.move_bottom(),

            (KeyCode::Char('h'), KeyModifiers::NONE) | (KeyCode::Left, KeyModifiers::NONE) => {
                self.pager.move_left()
            }
            (KeyCode::Char('l'), KeyModifiers::NONE) | (KeyCode::Right, KeyModifiers::NONE) => {
                self.pager.move_right()
            }
            (KeyCode::Char('H'), _) | (KeyCode::Left, KeyModifiers::SHIFT) => {
                self.pager.move_hf_left()
            }
            (KeyCode::Char('L'), _) | (KeyCode::Right, KeyModifiers::SHIFT) => {
                self.pager.move_hf_right()
            }
            (KeyCode::Char('0'), KeyModifiers::NONE) => self.pager.move_begin_left(),
            (KeyCode::Char('$'), _) => self.pager.move_end_right(),

            (KeyCode::Char(']'), _) => self.pager.next_section(),
            (KeyCode::Char('['), _) => self.pager.prev_section(),

            (KeyCode::Char('m'), KeyModifiers::NONE) => self.pager.toggle_mark(),
            (KeyCode::Char('>'), _) => self.pager.move_next_mark(),
            (KeyCode::Char('<'), _) => self.pager.move_prev_mark(),

            (KeyCode::Char('w'), KeyModifiers::NONE) => {
                let wrap = !self.pager.doc().general.wrap_mode;
                self.pager.doc_mut().set_wrap_mode(wrap);
                self.pager
                    .set_message(if wrap { "wrap mode" } else { "no wrap" });
            }
            (KeyCode::Char('p'), KeyModifiers::NONE) => {
                let plain = !self.pager.doc().general.plain_mode;
                self.pager.doc_mut().set_plain_mode(plain);
            }
            (KeyCode::Char('a'), KeyModifiers::NONE) => {
                let doc = self.pager.doc_mut();
                doc.general.alternate_rows = !doc.general.alternate_rows;
            }
            (KeyCode::Char('#'), _) => {
                let doc = self.pager.doc_mut();
                doc.general.line_num_mode = !doc.general.line_num_mode;
            }
            (KeyCode::Char('c'), KeyModifiers::NONE) => {
                let doc = self.pager.doc_mut();
                doc.general.column_mode = !doc.general.column_mode;
                doc.general.column_width = false;
            }
            (KeyCode::Char('C'), _) => {
                let on = !self.pager.doc().general.column_width;
                if on {
                    let samples = self.pager.screen_lines();
                    self.pager.doc_mut().set_column_widths_from(&samples);
                }
                let doc = self.pager.doc_mut();
                doc.general.column_width = on;
                doc.general.column_mode = on;
            }
            (KeyCode::Char('r'), KeyModifiers::NONE) => {
                let doc = self.pager.doc_mut();
                doc.general.column_rainbow = !doc.general.column_rainbow;
            }

            (KeyCode::Char('F'), KeyModifiers::NONE) | (KeyCode::Char('F'), KeyModifiers::SHIFT) => {
                let follow = !self.pager.doc().follow_mode();
                self.pager.doc_mut().set_follow_mode(follow);
                self.pager
                    .set_message(if follow { "follow mode" } else { "follow off" });
            }
            (KeyCode::Char('f'), KeyModifiers::CONTROL) => {
                self.follow_all = !self.follow_all;
                for doc in &mut self.pager.docs {
                    doc.set_follow_mode(self.follow_all);
                }
                self.pager.set_message(if self.follow_all {
                    "follow all"
                } else {
                    "follow all off"
                });
            }
            (KeyCode::Char('R'), _) => {
                self.pager.doc_mut().reload();
            }

            (KeyCode::Char('n'), KeyModifiers::NONE) => self.repeat_search(false),
            (KeyCode::Char('N'), _) => self.repeat_search(true),
            (KeyCode::Char('/'), _) => self.open_prompt(PromptKind::Search),
            (KeyCode::Char('?'), _) => self.open_prompt(PromptKind::BackSearch),
            (KeyCode::Char('&'), _) => self.open_prompt(PromptKind::Filter),
            (KeyCode::Char(':'), _) => self.open_prompt(PromptKind::Goto),

            (KeyCode::Char('n'), KeyModifiers::CONTROL) => self.pager.next_document(),
            (KeyCode::Char('p'), KeyModifiers::CONTROL) => self.pager.prev_document(),
            _ => {}
        }
    }

    fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt {
            kind,
            value: String::new(),
        });
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.value.pop();
                }
            }
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.confirm_prompt(prompt);
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.value.push(c);
                }
            }
            _ => {}
        }
    }

    fn confirm_prompt(&mut self, prompt: Prompt) {
        match prompt.kind {
            PromptKind::Search => self.start_search(&prompt.value, false),
            PromptKind::BackSearch => self.start_search(&prompt.value, true),
            PromptKind::Filter => self.start_filter(&prompt.value),
            PromptKind::Goto => match prompt.value.trim().parse::<isize>() {
                Ok(n) => self.pager.goto_line(n),
                Err(_) => self.pager.set_message("invalid line number"),
            },
        }
    }

    /// Mirror the prompt into the status line input.
    fn sync_input(&mut self) {
        self.pager.input = self.prompt.as_ref().map(|p| InputLine {
            prompt: p.kind.prompt_str().to_string(),
            value: p.value.clone(),
            cursor: p.value.chars().count(),
        });
    }

    fn start_search(&mut self, pattern: &str, backward: bool) {
        let searcher = new_searcher(
            pattern,
            self.config.regex_search,
            self.config.case_sensitive,
            self.config.smart_case,
        );
        self.pager.set_searcher(searcher.clone());
        let Some(searcher) = searcher else {
            return;
        };
        self.pager.set_message(format!("search:{}", pattern));
        self.spawn_search(searcher, backward);
    }

    fn repeat_search(&mut self, backward: bool) {
        let Some(searcher) = self.pager.searcher() else {
            self.pager.set_message("no previous search");
            return;
        };
        self.spawn_search(searcher, backward);
    }

    fn spawn_search(&mut self, searcher: Arc<dyn crate::search::Searcher>, backward: bool) {
        if let Some(job) = self.search_job.take() {
            job.cancel.cancel();
        }
        let doc = self.pager.doc();
        let top = (doc.top_ln + doc.first_line()).max(0);
        let start = if backward {
            (top - 1).max(0) as usize
        } else {
            top as usize + 1
        };
        let src = doc.line_source();
        let cancel = Arc::new(CancelToken::new());
        let (tx, rx) = mpsc::channel();
        let job_cancel = cancel.clone();
        std::thread::Builder::new()
            .name("peruse-search".to_string())
            .spawn(move || {
                let result = if backward {
                    back_search_line(&job_cancel, &src, searcher.as_ref(), start)
                } else {
                    search_line(&job_cancel, &src, searcher.as_ref(), start)
                };
                let _ = tx.send(result);
            })
            .ok();
        self.search_job = Some(SearchJob { cancel, rx });
    }

    /// Collect a finished search, if any. Returns true when state changed.
    fn poll_search(&mut self) -> bool {
        let Some(job) = &self.search_job else {
            return false;
        };
        match job.rx.try_recv() {
            Ok(Ok(n)) => {
                self.search_job = None;
                self.pager.go_search_line(n as isize);
                true
            }
            Ok(Err(e)) => {
                self.search_job = None;
                self.pager.set_message(e.to_string());
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.search_job = None;
                false
            }
        }
    }

    fn start_filter(&mut self, pattern: &str) {
        // A leading `!` inverts the filter.
        let (pattern, non_match) = match pattern.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };
        let Some(searcher) = new_searcher(
            pattern,
            self.config.regex_search,
            self.config.case_sensitive,
            self.config.smart_case,
        ) else {
            return;
        };
        self.pager.set_searcher(Some(searcher.clone()));
        let config = self.config.clone();
        let events = Some(self.events_tx.clone());
        let child = self.pager.doc_mut().filter(searcher, non_match, &config, events);
        self.pager.add_document(child);
        self.pager.set_message(format!("filter:{}", pattern));
    }
}
