//! Per-input state: the document facade.
//!
//! A `Document` owns the store pair, the line cache, the reader handle, and
//! every display option for one input. Ownership is split the same way the
//! threads are: the reader thread appends to the store, the UI thread owns
//! the cache, options, and viewport fields, and search threads get a
//! detached [`LineSource`] view.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use regex::Regex;

use crate::config::{Config, General};
use crate::content::{contents_to_str, parse_string, Contents, LineC};
use crate::error::{Error, Result};
use crate::line_cache::{LineCache, DEFAULT_CACHE_CAPACITY};
use crate::line_map::LineMap;
use crate::reader::{
    spawn_reader, ControlRequest, ReaderConfig, ReaderEvent, ReaderHandle, Source,
};
use crate::search::{
    self, back_search_line, search_line, CancelToken, LineSource, NonMatchSearcher, Searcher,
};
use crate::store::{chunk_line_num, Store, Stores, DEFAULT_MEMORY_LIMIT};

static NEXT_DOC_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Normal,
    Help,
    Log,
    Filter,
}

pub struct Document {
    pub doc_id: u64,
    pub doc_type: DocumentType,
    /// Name shown on the status line.
    pub file_name: String,
    /// Overrides the file name on the status line when non-empty.
    pub caption: String,

    pub(crate) stores: Arc<Stores>,
    cache: LineCache,
    reader: Option<ReaderHandle>,
    /// View-to-origin numbering for filter documents.
    pub(crate) line_map: Option<Arc<LineMap>>,
    filter_cancel: Option<Arc<CancelToken>>,

    pub general: General,
    pub memory_limit: usize,

    pub(crate) column_delimiter_reg: Option<Regex>,
    pub(crate) section_delimiter_reg: Option<Regex>,
    pub(crate) multi_color_regexps: Vec<Regex>,

    /// Marked line numbers, in mark order.
    pub marked: Vec<isize>,
    pub(crate) marked_point: usize,
    /// Guessed or configured column start positions.
    pub column_widths: Vec<usize>,

    follow: Arc<AtomicBool>,
    seekable: bool,
    reopenable: bool,
    closed: bool,

    /// Chunk the UI last touched; kept resident while in view.
    current_chunk: usize,

    // Viewport origin and horizontal state, owned by the UI thread.
    pub top_ln: isize,
    pub top_lx: isize,
    pub x: isize,
    pub column_cursor: isize,
    /// Rows the header consumed in the last draw.
    pub(crate) header_len: isize,
    /// Rows the pinned section header consumed in the last draw.
    pub(crate) section_header_len: isize,
    pub bottom_ln: isize,
    pub(crate) bottom_lx: isize,
    /// `end_num` at the last follow jump, to detect growth.
    pub(crate) latest_num: usize,
    pub(crate) last_search_ln: isize,
    /// One-shot flag: the next draw re-anchors a goto target that landed
    /// under the pinned section header.
    pub(crate) show_goto: bool,
}

impl Document {
    fn new(general: General, memory_limit: usize) -> Self {
        let store = Arc::new(Store::new(memory_limit));
        Document {
            doc_id: NEXT_DOC_ID.fetch_add(1, Ordering::Relaxed),
            doc_type: DocumentType::Normal,
            file_name: String::new(),
            caption: String::new(),
            stores: Arc::new(Stores::new(store)),
            cache: LineCache::new(DEFAULT_CACHE_CAPACITY),
            reader: None,
            line_map: None,
            filter_cancel: None,
            general,
            memory_limit,
            column_delimiter_reg: None,
            section_delimiter_reg: None,
            multi_color_regexps: Vec::new(),
            marked: Vec::new(),
            marked_point: 0,
            column_widths: Vec::new(),
            follow: Arc::new(AtomicBool::new(false)),
            seekable: false,
            reopenable: false,
            closed: false,
            current_chunk: 0,
            top_ln: 0,
            top_lx: 0,
            x: 0,
            column_cursor: 0,
            header_len: 0,
            section_header_len: 0,
            bottom_ln: 0,
            bottom_lx: 0,
            latest_num: 0,
            last_search_ln: -1,
            show_goto: false,
        }
    }

    /// Open a file-backed document and start its reader.
    pub fn open(path: &Path, config: &Config, events: Option<Sender<ReaderEvent>>) -> Result<Document> {
        let meta = std::fs::metadata(path).map_err(|_| Error::NotFound)?;
        if meta.is_dir() {
            return Err(Error::IsDirectory);
        }

        let memory_limit = config.memory_limit.unwrap_or(DEFAULT_MEMORY_LIMIT);
        let mut doc = Document::new(config.general.clone(), memory_limit);
        doc.file_name = path.display().to_string();

        let mut file = File::open(path).map_err(|_| Error::NotFound)?;
        // Probe seekability; pipes and some special files refuse.
        doc.seekable = matches!(file.seek(SeekFrom::Start(1)), Ok(1));
        if doc.seekable {
            file.seek(SeekFrom::Start(0))?;
        }
        doc.reopenable = doc.seekable && !is_named_pipe(&meta);

        let source = Source::File {
            path: path.to_path_buf(),
            reader: std::io::BufReader::new(file),
        };
        doc.start_reader(source, events);
        doc.regexp_compile();
        Ok(doc)
    }

    /// A document reading standard input.
    pub fn from_stdin(config: &Config, events: Option<Sender<ReaderEvent>>) -> Document {
        let mut doc = Document::from_read(Box::new(std::io::stdin()), "(STDIN)", config, events);
        doc.regexp_compile();
        doc
    }

    /// A document over an arbitrary byte stream (pipes, filters, logs).
    pub fn from_read(
        read: Box<dyn Read + Send>,
        name: &str,
        config: &Config,
        events: Option<Sender<ReaderEvent>>,
    ) -> Document {
        let memory_limit = config.memory_limit.unwrap_or(DEFAULT_MEMORY_LIMIT);
        let mut doc = Document::new(config.general.clone(), memory_limit);
        doc.file_name = name.to_string();
        doc.seekable = false;
        doc.reopenable = false;
        let source = Source::Stream {
            reader: std::io::BufReader::new(read),
        };
        doc.start_reader(source, events);
        doc.regexp_compile();
        doc
    }

    fn start_reader(&mut self, source: Source, events: Option<Sender<ReaderEvent>>) {
        self.stores.main().set_evictable(self.seekable);
        let handle = spawn_reader(
            source,
            self.stores.clone(),
            self.follow.clone(),
            ReaderConfig {
                memory_limit: self.memory_limit,
                seekable: self.seekable,
                reopenable: self.reopenable,
                doc_id: self.doc_id,
            },
            events,
        );
        handle.request(ControlRequest::Load);
        self.reader = Some(handle);
    }

    /// One line's bytes, trailing newline stripped. Touching a new chunk
    /// pins it and requests a re-load if it was evicted.
    pub fn line(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Closed);
        }
        if self.stores.tmp_follow() {
            let fs = self.stores.read_side();
            let (ci, li) = chunk_line_num(n);
            return fs.get_chunk_line(ci, li);
        }

        let store = self.stores.main();
        if n >= store.end_num() {
            return Err(Error::OutOfRange);
        }
        let (ci, li) = chunk_line_num(n);
        if store.last_chunk_num() < ci {
            return Err(Error::OutOfRange);
        }
        if self.current_chunk != ci {
            self.current_chunk = ci;
            self.request_load(ci);
        }
        store.get_chunk_line(ci, li)
    }

    /// Keep a chunk resident while the view sits on it.
    fn request_load(&self, chunk_num: usize) {
        let store = self.stores.main();
        store.mark_chunk_used(chunk_num);
        if !store.is_chunk_resident(chunk_num) {
            if let Some(reader) = &self.reader {
                reader.request(ControlRequest::LoadChunk(chunk_num));
            }
        }
    }

    pub fn line_str(&mut self, n: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.line(n)?).into_owned())
    }

    /// Like [`Document::line_str`] but absorbing errors into an empty line.
    pub fn line_string(&mut self, n: usize) -> String {
        self.line_str(n).unwrap_or_default()
    }

    /// The chunk index the UI touched last.
    pub fn current_chunk(&self) -> usize {
        self.current_chunk
    }

    pub(crate) fn contents(&mut self, l_n: isize) -> Result<Contents> {
        if l_n < 0 || l_n >= self.buf_end_num() as isize {
            return Err(Error::OutOfRange);
        }
        let tab_width = self.general.tab_width;
        let str = self.line_str(l_n as usize)?;
        Ok(parse_string(&str, tab_width))
    }

    /// One line packaged for drawing. Past-EOF indexes yield the invalid
    /// EOF row, which is never cached.
    pub fn line_c(&mut self, l_n: isize) -> LineC {
        if l_n >= 0 {
            if let Some(line) = self.cache.get(l_n as usize) {
                return line;
            }
        }
        let org = match self.contents(l_n) {
            Ok(lc) => lc,
            Err(_) => return LineC::eof(),
        };
        let (str, pos) = contents_to_str(&org);
        let line = LineC {
            lc: org,
            str,
            pos,
            valid: false,
            section: 0,
            section_nm: 0,
        };
        self.cache.put(l_n as usize, line.clone());
        let mut out = line;
        out.valid = true;
        out
    }

    /// Wrap-segment start offsets for a line at the given body width.
    /// Empty when the line does not exist.
    pub(crate) fn left_most_x(&mut self, width: usize, l_n: isize) -> Vec<isize> {
        if width == 0 {
            return vec![0];
        }
        let line = self.line_c(l_n);
        if !line.valid {
            return Vec::new();
        }
        let lc = line.lc;
        let mut list = Vec::with_capacity(lc.len() / width + 1);
        list.push(0);
        let mut n = width;
        while n < lc.len() {
            // Never split a double-width cell across rows.
            if lc[n - 1].width == 2 {
                n -= 1;
            }
            list.push(n as isize);
            n += width;
        }
        list
    }

    pub fn buf_start_num(&self) -> usize {
        self.stores.read_side().start_num()
    }

    pub fn buf_end_num(&self) -> usize {
        self.stores.read_side().end_num()
    }

    /// The primary store's line count, regardless of a reload in flight.
    pub fn store_end_num(&self) -> usize {
        self.stores.main().end_num()
    }

    pub fn buf_eof(&self) -> bool {
        self.stores.read_side().eof()
    }

    pub(crate) fn tmp_follow(&self) -> bool {
        self.stores.tmp_follow()
    }

    /// Consume the redraw hint set by the reader.
    pub fn take_changed(&self) -> bool {
        self.stores.read_side().take_changed()
    }

    /// First body line: everything above is skip plus frozen header.
    pub fn first_line(&self) -> isize {
        self.general.skip_lines + self.general.header
    }

    /// Byte-faithful export of the line range `[start, end]`.
    pub fn export<W: Write>(&mut self, w: &mut W, start: usize, end: usize) -> Result<()> {
        let end_num = self.buf_end_num();
        if end_num == 0 {
            return Ok(());
        }
        let end = end.min(end_num - 1);
        let (start_chunk, start_cn) = chunk_line_num(start);
        let (end_chunk, end_cn) = chunk_line_num(end);
        let store = self.stores.main();

        let mut scn = start_cn;
        for chunk_num in start_chunk..=end_chunk {
            let ecn = if chunk_num == end_chunk {
                end_cn + 1
            } else {
                crate::store::CHUNK_SIZE
            };
            store.export(w, chunk_num, scn, ecn)?;
            scn = 0;
        }
        Ok(())
    }

    /// Purge parsed lines; the next draw re-parses from the store.
    pub fn clear_cache(&mut self) {
        self.cache.purge();
    }

    // --- option setters -------------------------------------------------

    /// Recompile every derived regex after a bulk option change.
    pub fn regexp_compile(&mut self) {
        self.column_delimiter_reg = cond_regexp_compile(&self.general.column_delimiter);
        let delimiter = self.general.section_delimiter.clone();
        self.set_section_delimiter(&delimiter);
        if !self.general.multi_color_words.is_empty() {
            let words = self.general.multi_color_words.clone();
            self.set_multi_color_words(&words);
        }
    }

    pub fn set_delimiter(&mut self, delimiter: &str) {
        self.general.column_delimiter = delimiter.to_string();
        self.column_delimiter_reg = cond_regexp_compile(delimiter);
    }

    pub fn set_section_delimiter(&mut self, delimiter: &str) {
        self.general.section_delimiter = delimiter.to_string();
        self.section_delimiter_reg = if delimiter.is_empty() {
            None
        } else {
            match Regex::new(delimiter) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("invalid section delimiter {:?}: {}", delimiter, e);
                    None
                }
            }
        };
    }

    pub fn set_multi_color_words(&mut self, words: &[String]) {
        self.general.multi_color_words = words.to_vec();
        self.multi_color_regexps = words
            .iter()
            .filter_map(|w| match Regex::new(w) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("invalid multi-color word {:?}: {}", w, e);
                    None
                }
            })
            .collect();
        self.clear_cache();
    }

    pub fn set_tab_width(&mut self, width: usize) {
        if self.general.tab_width != width {
            self.general.tab_width = width;
            self.clear_cache();
        }
    }

    pub fn set_plain_mode(&mut self, on: bool) {
        if self.general.plain_mode != on {
            self.general.plain_mode = on;
            self.clear_cache();
        }
    }

    pub fn set_wrap_mode(&mut self, on: bool) {
        self.general.wrap_mode = on;
        self.x = 0;
        self.top_lx = 0;
        self.column_cursor = 0;
    }

    /// Guess column start positions from on-screen sample lines.
    pub fn set_column_widths_from(&mut self, samples: &[String]) {
        let header = (self.general.header - 1).max(0) as usize;
        for h in (0..=header).rev() {
            let widths = crate::guess_width::positions(samples, h, 2);
            if !widths.is_empty() {
                self.column_widths = widths;
                return;
            }
        }
    }

    // --- marks ----------------------------------------------------------

    /// Toggle a mark on a line; returns true if the line is now marked.
    pub fn toggle_mark(&mut self, l_n: isize) -> bool {
        if let Some(i) = self.marked.iter().position(|&m| m == l_n) {
            self.marked.remove(i);
            false
        } else {
            self.marked.push(l_n);
            true
        }
    }

    /// Next mark in mark order, dropping marks below the buffer start.
    pub fn next_mark(&mut self) -> Option<isize> {
        self.prune_marks();
        if self.marked.is_empty() {
            return None;
        }
        self.marked_point = (self.marked_point + 1) % self.marked.len();
        self.marked.get(self.marked_point).copied()
    }

    pub fn prev_mark(&mut self) -> Option<isize> {
        self.prune_marks();
        if self.marked.is_empty() {
            return None;
        }
        self.marked_point = self
            .marked_point
            .checked_sub(1)
            .unwrap_or(self.marked.len() - 1);
        self.marked.get(self.marked_point).copied()
    }

    fn prune_marks(&mut self) {
        let start = self.buf_start_num() as isize;
        self.marked.retain(|&m| m >= start);
        if self.marked_point >= self.marked.len() {
            self.marked_point = 0;
        }
    }

    // --- follow / reload / close ---------------------------------------

    pub fn follow_mode(&self) -> bool {
        self.follow.load(Ordering::Relaxed)
    }

    pub fn set_follow_mode(&mut self, on: bool) {
        self.general.follow_mode = on;
        self.follow.store(on, Ordering::Relaxed);
        if on {
            if let Some(reader) = &self.reader {
                reader.request(ControlRequest::Follow);
            }
        }
    }

    /// Request an in-place reload. No-op for non-reopenable sources.
    pub fn reload(&mut self) {
        if !self.reopenable {
            tracing::debug!("{}: not reopenable, reload skipped", self.file_name);
            return;
        }
        if let Some(reader) = &self.reader {
            reader.request(ControlRequest::Reload);
        }
    }

    pub fn seekable(&self) -> bool {
        self.seekable
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the reader and any filter writer. Buffered content stays
    /// readable through other handles but this document refuses new work.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stores.main().cancel_read();
        if let Some(cancel) = &self.filter_cancel {
            cancel.cancel();
        }
        if let Some(reader) = self.reader.take() {
            reader.request(ControlRequest::Close);
        }
    }

    // --- search ---------------------------------------------------------

    /// A detached view for search and filter threads.
    pub(crate) fn line_source(&self) -> LineSource {
        LineSource {
            stores: self.stores.clone(),
            ctl: self.reader.as_ref().map(|r| r.control_sender()),
            line_map: self.line_map.clone(),
        }
    }

    /// Forward search from `start`, prefetching chunks around it.
    pub fn search(
        &mut self,
        cancel: &CancelToken,
        searcher: &dyn Searcher,
        start: usize,
    ) -> Result<usize> {
        if let Some(reader) = &self.reader {
            reader.request(ControlRequest::Search(start));
        }
        let n = search_line(cancel, &self.line_source(), searcher, start)?;
        self.last_search_ln = n as isize;
        Ok(n)
    }

    pub fn back_search(
        &mut self,
        cancel: &CancelToken,
        searcher: &dyn Searcher,
        start: usize,
    ) -> Result<usize> {
        let n = back_search_line(cancel, &self.line_source(), searcher, start)?;
        self.last_search_ln = n as isize;
        Ok(n)
    }

    /// Line number of the section header enclosing `l_n`.
    pub(crate) fn prev_section(&mut self, cancel: &CancelToken, l_n: isize) -> Result<isize> {
        let searcher = self.section_searcher()?;
        let start = (l_n - 1).max(0) as usize;
        let n = back_search_line(cancel, &self.line_source(), searcher.as_ref(), start)?;
        Ok(n as isize)
    }

    pub(crate) fn next_section(&mut self, cancel: &CancelToken, l_n: isize) -> Result<isize> {
        let searcher = self.section_searcher()?;
        let n = search_line(
            cancel,
            &self.line_source(),
            searcher.as_ref(),
            l_n.max(0) as usize,
        )?;
        Ok(n as isize)
    }

    fn section_searcher(&self) -> Result<Arc<dyn Searcher>> {
        if self.general.section_delimiter.is_empty() || self.section_delimiter_reg.is_none() {
            return Err(Error::NoDelimiter);
        }
        search::new_searcher(&self.general.section_delimiter, true, true, false)
            .ok_or(Error::NoDelimiter)
    }

    // --- filter ---------------------------------------------------------

    /// Spawn a derived document whose lines are the matches (or, with
    /// `non_match`, the non-matches) of the searcher against this one.
    pub fn filter(
        &mut self,
        searcher: Arc<dyn Searcher>,
        non_match: bool,
        config: &Config,
        events: Option<Sender<ReaderEvent>>,
    ) -> Document {
        let (pipe_reader, pipe_writer) = search::pipe();
        let name = format!("filter:{}:{}", self.file_name, searcher.pattern());
        let mut child = Document::from_read(Box::new(pipe_reader), &name, config, events);
        child.doc_type = DocumentType::Filter;
        child.caption = format!("{}:{}", self.file_name, searcher.pattern());
        child.general = self.general.clone();
        child.general.follow_mode = false;
        child.regexp_compile();

        let map = Arc::new(LineMap::new());
        child.line_map = Some(map.clone());

        // The frozen header is copied verbatim so the child lines up.
        let skip = self.general.skip_lines.max(0) as usize;
        let header_end = (self.general.skip_lines + self.general.header).max(0) as usize;
        let mut writer = pipe_writer.clone();
        for ln in skip..header_end {
            let Ok(mut line) = self.line(ln) else { break };
            map.store(ln, ln);
            line.push(b'\n');
            if writer.write_all(&line).is_err() {
                break;
            }
        }

        let cancel = Arc::new(CancelToken::new());
        child.filter_cancel = Some(cancel.clone());
        let src = self.line_source();
        let predicate: Arc<dyn Searcher> = if non_match {
            Arc::new(NonMatchSearcher::new(searcher))
        } else {
            searcher
        };
        let start = self.first_line().max(0) as usize;
        std::thread::Builder::new()
            .name("peruse-filter".to_string())
            .spawn(move || search::search_writer(cancel, src, predicate, pipe_writer, map, start))
            .ok();
        child
    }

    pub fn is_filter(&self) -> bool {
        self.doc_type == DocumentType::Filter
    }

    // --- navigation primitives owned by the document --------------------

    /// Move the viewport origin to a line, clearing the wrap offset.
    pub fn move_line(&mut self, l_n: isize) -> isize {
        let l_n = l_n.min(self.buf_end_num() as isize);
        self.top_ln = l_n;
        self.top_lx = 0;
        l_n
    }

    pub fn move_top(&mut self) {
        let start = self.buf_start_num() as isize;
        self.move_line(start);
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.close();
    }
}

/// Compile a column delimiter written as `/pattern/` into a regex; plain
/// delimiters stay string matches.
fn cond_regexp_compile(delimiter: &str) -> Option<Regex> {
    let bytes = delimiter.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'/' || bytes[bytes.len() - 1] != b'/' {
        return None;
    }
    match Regex::new(&delimiter[1..delimiter.len() - 1]) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("invalid column delimiter {:?}: {}", delimiter, e);
            None
        }
    }
}

#[cfg(unix)]
fn is_named_pipe(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_fifo()
}

#[cfg(not(unix))]
fn is_named_pipe(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::time::{Duration, Instant};
    use tempfile::NamedTempFile;

    pub(crate) fn write_lines(n: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..n {
            writeln!(file, "line-{}", i + 1).unwrap();
        }
        file.flush().unwrap();
        file
    }

    pub(crate) fn wait_eof(doc: &Document) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !doc.buf_eof() {
            assert!(Instant::now() < deadline, "reader did not reach EOF");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_open_and_read() {
        let file = write_lines(100);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        assert_eq!(doc.buf_end_num(), 100);
        assert_eq!(doc.line(23).unwrap(), b"line-24");
        assert_eq!(doc.line_str(0).unwrap(), "line-1");
        assert!(doc.seekable());
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            Document::open(Path::new("/no/such/file"), &Config::default(), None),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_open_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Document::open(dir.path(), &Config::default(), None),
            Err(Error::IsDirectory)
        ));
    }

    #[test]
    fn test_line_out_of_range() {
        let file = write_lines(3);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        assert!(matches!(doc.line(3), Err(Error::OutOfRange)));
    }

    #[test]
    fn test_line_c_eof_row() {
        let file = write_lines(2);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        let line = doc.line_c(5);
        assert!(!line.valid);
        assert_eq!(line.str, "~");
        // The EOF row is fabricated each time, never cached.
        let again = doc.line_c(5);
        assert!(!again.valid);
    }

    #[test]
    fn test_line_c_cache_copy_independence() {
        let file = write_lines(2);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        let mut first = doc.line_c(0);
        first.lc[0].style = ratatui::style::Style::default().fg(ratatui::style::Color::Red);
        let second = doc.line_c(0);
        assert_eq!(second.lc[0].style, ratatui::style::Style::default());
    }

    #[test]
    fn test_left_most_x() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", "a".repeat(200)).unwrap();
        writeln!(file, "short").unwrap();
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        assert_eq!(doc.left_most_x(50, 0), vec![0, 50, 100, 150]);
        assert_eq!(doc.left_most_x(50, 1), vec![0]);
        assert!(doc.left_most_x(50, 5).is_empty());
    }

    #[test]
    fn test_left_most_x_wide_cells() {
        let mut file = NamedTempFile::new().unwrap();
        // Ten double-width chars: 20 columns; width 5 lands mid-cell.
        writeln!(file, "{}", "あ".repeat(10)).unwrap();
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        let list = doc.left_most_x(5, 0);
        // Every wrap start must sit on a cell boundary (even column here).
        for x in &list {
            assert_eq!(x % 2, 0, "wrap start {} splits a wide cell", x);
        }
    }

    #[test]
    fn test_export_range() {
        let file = write_lines(5);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        let mut out = Vec::new();
        doc.export(&mut out, 1, 3).unwrap();
        assert_eq!(out, b"line-2\nline-3\nline-4\n");
    }

    #[test]
    fn test_set_delimiter_idempotent() {
        let file = write_lines(1);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        doc.set_delimiter(",");
        let first = doc.column_delimiter_reg.is_some();
        doc.set_delimiter(",");
        assert_eq!(doc.column_delimiter_reg.is_some(), first);
        assert_eq!(doc.general.column_delimiter, ",");

        doc.set_delimiter("/\\s+/");
        assert!(doc.column_delimiter_reg.is_some());
    }

    #[test]
    fn test_clear_cache_keeps_results_equal() {
        let file = write_lines(3);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        let before = doc.line_c(1);
        doc.clear_cache();
        let after = doc.line_c(1);
        assert_eq!(before.str, after.str);
        assert_eq!(before.lc, after.lc);
    }

    #[test]
    fn test_marks() {
        let file = write_lines(10);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        assert!(doc.toggle_mark(3));
        assert!(doc.toggle_mark(7));
        assert!(!doc.toggle_mark(3), "second toggle clears");
        assert_eq!(doc.marked, vec![7]);
        assert_eq!(doc.next_mark(), Some(7));
    }

    #[test]
    fn test_closed_document_refuses_reads() {
        let file = write_lines(3);
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);
        doc.close();
        assert!(matches!(doc.line(0), Err(Error::Closed)));
    }

    #[test]
    fn test_search_across_chunk_boundary() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..16_000 {
            if i == 15_003 {
                writeln!(file, "needle").unwrap();
            } else {
                writeln!(file, "line-{}", i).unwrap();
            }
        }
        file.flush().unwrap();
        let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
        wait_eof(&doc);

        let searcher = search::new_searcher("needle", false, true, false).unwrap();
        let cancel = CancelToken::new();
        let n = doc.search(&cancel, searcher.as_ref(), 0).unwrap();
        assert_eq!(n, 15_003);

        assert_eq!(doc.line(n).unwrap(), b"needle");
        assert_eq!(doc.current_chunk(), 1);
        assert!(doc.stores.main().is_chunk_resident(0), "chunk 0 stays resident");
    }

    #[test]
    fn test_follow_append() {
        let file = write_lines(0);
        let config = Config::default();
        let mut doc = Document::open(file.path(), &config, None).unwrap();
        doc.set_follow_mode(true);

        let mut handle = std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .unwrap();
        writeln!(handle, "A").unwrap();
        writeln!(handle, "B").unwrap();
        handle.flush().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while doc.buf_end_num() < 2 {
            assert!(Instant::now() < deadline, "follow did not pick up appends");
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(doc.line(1).unwrap(), b"B");
    }

    #[test]
    fn test_filter_non_match() {
        let mut file = NamedTempFile::new().unwrap();
        for l in ["a", "b", "c", "a", "c"] {
            writeln!(file, "{}", l).unwrap();
        }
        let config = Config::default();
        let mut doc = Document::open(file.path(), &config, None).unwrap();
        wait_eof(&doc);

        let searcher = search::new_searcher("a", false, true, false).unwrap();
        let mut filtered = doc.filter(searcher, true, &config, None);

        let deadline = Instant::now() + Duration::from_secs(5);
        while filtered.buf_end_num() < 3 {
            assert!(Instant::now() < deadline, "filter did not produce lines");
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(filtered.is_filter());
        assert_eq!(filtered.line_str(0).unwrap(), "b");
        assert_eq!(filtered.line_str(1).unwrap(), "c");
        assert_eq!(filtered.line_str(2).unwrap(), "c");

        let map = filtered.line_map.as_ref().unwrap();
        assert_eq!(map.load_forward(0), Some(1));
        assert_eq!(map.load_forward(1), Some(2));
        assert_eq!(map.load_forward(2), Some(4));
    }

    #[test]
    fn test_reload_swaps_store() {
        let file = write_lines(3);
        let (tx, rx) = std::sync::mpsc::channel();
        let mut doc = Document::open(file.path(), &Config::default(), Some(tx)).unwrap();
        wait_eof(&doc);
        assert_eq!(doc.buf_end_num(), 3);

        // Rewrite the file with more lines and reload in place.
        std::fs::write(file.path(), "x\ny\nz\nw\nv\n").unwrap();
        doc.reload();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            assert!(Instant::now() < deadline, "no reload event");
            if let Ok(ev) = rx.recv_timeout(Duration::from_millis(100)) {
                if matches!(ev.kind, crate::reader::ReaderEventKind::Reloaded) {
                    break;
                }
            }
        }
        doc.clear_cache();
        assert_eq!(doc.buf_end_num(), 5);
        assert_eq!(doc.line_str(0).unwrap(), "x");
    }
}
