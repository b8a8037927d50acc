//! Line-wise search over the store.
//!
//! Searchers match on the raw line string; highlight ranges are byte
//! offsets translated into cell columns by the styler through `WidthPos`.
//! Searches walk line numbers directly against the store, so they run on
//! their own threads without touching UI state, and they keep up with a
//! still-streaming source: at the buffered end they wait for more data
//! unless EOF is already set.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::error::{Error, Result};
use crate::line_map::LineMap;
use crate::reader::ControlRequest;
use crate::store::{chunk_line_num, Stores};

/// Wait between polls while searching a source that is still loading.
const SEARCH_TICK: Duration = Duration::from_millis(10);

/// Retries for a line whose chunk is being re-materialized.
const CHUNK_LOAD_RETRIES: usize = 100;

/// A compiled search predicate.
pub trait Searcher: Send + Sync {
    fn matches(&self, line: &str) -> bool;
    /// Byte ranges of every match, for highlighting.
    fn find_all(&self, line: &str) -> Vec<(usize, usize)>;
    /// The original pattern, for the status line.
    fn pattern(&self) -> &str;
}

struct SensitiveSearcher {
    word: String,
}

impl Searcher for SensitiveSearcher {
    fn matches(&self, line: &str) -> bool {
        line.contains(&self.word)
    }

    fn find_all(&self, line: &str) -> Vec<(usize, usize)> {
        line.match_indices(&self.word)
            .map(|(i, m)| (i, i + m.len()))
            .collect()
    }

    fn pattern(&self) -> &str {
        &self.word
    }
}

struct InsensitiveSearcher {
    word: String,
    lowered: String,
}

impl Searcher for InsensitiveSearcher {
    fn matches(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.lowered)
    }

    fn find_all(&self, line: &str) -> Vec<(usize, usize)> {
        // Lowercasing can change byte lengths for some scripts; offsets into
        // the lowered string are close enough for ASCII-dominated logs and
        // clamped by the width map downstream.
        line.to_lowercase()
            .match_indices(&self.lowered)
            .map(|(i, m)| (i, i + m.len()))
            .collect()
    }

    fn pattern(&self) -> &str {
        &self.word
    }
}

struct RegexpSearcher {
    re: Regex,
    pattern: String,
}

impl Searcher for RegexpSearcher {
    fn matches(&self, line: &str) -> bool {
        self.re.is_match(line)
    }

    fn find_all(&self, line: &str) -> Vec<(usize, usize)> {
        self.re.find_iter(line).map(|m| (m.start(), m.end())).collect()
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Inverts a searcher; used by non-match filtering. Never highlights.
pub struct NonMatchSearcher {
    inner: Arc<dyn Searcher>,
}

impl NonMatchSearcher {
    pub fn new(inner: Arc<dyn Searcher>) -> Self {
        NonMatchSearcher { inner }
    }
}

impl Searcher for NonMatchSearcher {
    fn matches(&self, line: &str) -> bool {
        !self.inner.matches(line)
    }

    fn find_all(&self, _line: &str) -> Vec<(usize, usize)> {
        Vec::new()
    }

    fn pattern(&self) -> &str {
        self.inner.pattern()
    }
}

/// Build a searcher for a pattern. Returns `None` for an empty pattern.
/// With `smart_case`, the search is case-insensitive unless the pattern
/// contains an upper-case character.
pub fn new_searcher(
    pattern: &str,
    use_regex: bool,
    case_sensitive: bool,
    smart_case: bool,
) -> Option<Arc<dyn Searcher>> {
    if pattern.is_empty() {
        return None;
    }
    let sensitive = if smart_case {
        case_sensitive || pattern.chars().any(|c| c.is_uppercase())
    } else {
        case_sensitive
    };

    if use_regex {
        let source = if sensitive {
            pattern.to_string()
        } else {
            format!("(?i){}", pattern)
        };
        match Regex::new(&source) {
            Ok(re) => Some(Arc::new(RegexpSearcher {
                re,
                pattern: pattern.to_string(),
            })),
            Err(e) => {
                tracing::warn!("invalid search pattern {:?}: {}", pattern, e);
                None
            }
        }
    } else if sensitive {
        Some(Arc::new(SensitiveSearcher {
            word: pattern.to_string(),
        }))
    } else {
        Some(Arc::new(InsensitiveSearcher {
            word: pattern.to_string(),
            lowered: pattern.to_lowercase(),
        }))
    }
}

/// Cooperative cancellation with an optional deadline.
#[derive(Debug)]
pub struct CancelToken {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            cancelled: AtomicBool::new(false),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            cancelled: AtomicBool::new(false),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(Error::Cancel);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::Cancel);
            }
        }
        Ok(())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

/// A thread-safe view of a document's lines for search and filter threads:
/// the store pair, the reader control channel for chunk loads, and the
/// parent's line map for origin-number composition.
#[derive(Clone)]
pub(crate) struct LineSource {
    pub stores: Arc<Stores>,
    pub ctl: Option<std::sync::mpsc::Sender<ControlRequest>>,
    pub line_map: Option<Arc<LineMap>>,
}

impl LineSource {
    pub fn start_num(&self) -> usize {
        self.stores.read_side().start_num()
    }

    pub fn end_num(&self) -> usize {
        self.stores.read_side().end_num()
    }

    pub fn eof(&self) -> bool {
        self.stores.read_side().eof()
    }

    /// One line's bytes, requesting a chunk re-load and retrying briefly
    /// when the chunk was evicted.
    pub fn line(&self, n: usize) -> Result<Vec<u8>> {
        let store = self.stores.read_side();
        if n >= store.end_num() {
            return Err(Error::OutOfRange);
        }
        let (ci, li) = chunk_line_num(n);
        for attempt in 0..CHUNK_LOAD_RETRIES {
            match store.get_chunk_line(ci, li) {
                Ok(line) => return Ok(line),
                Err(Error::OutOfRange) if !store.is_chunk_resident(ci) => {
                    let Some(ctl) = &self.ctl else {
                        return Err(Error::OutOfRange);
                    };
                    if attempt == 0 {
                        let _ = ctl.send(ControlRequest::LoadChunk(ci));
                    }
                    std::thread::sleep(SEARCH_TICK);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::OutOfRange)
    }

    pub fn line_str(&self, n: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.line(n)?).into_owned())
    }

    /// Origin line number for `n`, composed through the parent's map.
    pub fn origin_num(&self, n: usize) -> usize {
        match &self.line_map {
            Some(map) => map.load_forward(n).unwrap_or(n),
            None => n,
        }
    }
}

/// Forward search from `start`. Waits for data while the source is still
/// loading; `NoMatch` only after the buffered end with EOF set.
pub(crate) fn search_line(
    cancel: &CancelToken,
    src: &LineSource,
    searcher: &dyn Searcher,
    start: usize,
) -> Result<usize> {
    let mut n = start.max(src.start_num());
    loop {
        cancel.check()?;
        if n >= src.end_num() {
            if src.eof() {
                return Err(Error::NoMatch);
            }
            std::thread::sleep(SEARCH_TICK);
            continue;
        }
        if let Ok(line) = src.line_str(n) {
            if searcher.matches(&line) {
                return Ok(n);
            }
        }
        n += 1;
    }
}

/// Backward search from `start` down to the buffer start.
pub(crate) fn back_search_line(
    cancel: &CancelToken,
    src: &LineSource,
    searcher: &dyn Searcher,
    start: usize,
) -> Result<usize> {
    let end = src.end_num();
    if end == 0 {
        return Err(Error::NoMatch);
    }
    let mut n = start.min(end - 1) as isize;
    let bottom = src.start_num() as isize;
    while n >= bottom {
        cancel.check()?;
        if let Ok(line) = src.line_str(n as usize) {
            if searcher.matches(&line) {
                return Ok(n as usize);
            }
        }
        n -= 1;
    }
    Err(Error::NoMatch)
}

/// All delimiter occurrences in a line: regex matches when a `/re/`
/// delimiter was compiled, plain substring positions otherwise.
pub(crate) fn all_index(s: &str, delimiter: &str, re: &Option<Regex>) -> Vec<(usize, usize)> {
    if let Some(re) = re {
        return re.find_iter(s).map(|m| (m.start(), m.end())).collect();
    }
    if delimiter.is_empty() {
        return Vec::new();
    }
    s.match_indices(delimiter)
        .map(|(i, m)| (i, i + m.len()))
        .collect()
}

/// An in-process byte pipe: the filter thread writes matching lines, the
/// derived document's reader consumes them like any other stream. Closing
/// the writer ends the stream.
pub(crate) fn pipe() -> (PipeReader, PipeWriter) {
    let (tx, rx) = std::sync::mpsc::sync_channel(128);
    (
        PipeReader {
            rx,
            buf: Vec::new(),
            pos: 0,
        },
        PipeWriter { tx },
    )
}

pub(crate) struct PipeReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.pos >= self.buf.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                // Writer dropped: EOF.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.buf.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[derive(Clone)]
pub(crate) struct PipeWriter {
    tx: SyncSender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self.tx.send(data.to_vec()) {
            Ok(()) => Ok(data.len()),
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "pipe closed",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl PipeWriter {
    /// Non-blocking best-effort write used by the log sink, where dropping
    /// a line beats stalling the tracing subscriber.
    pub fn try_write(&self, data: &[u8]) -> bool {
        match self.tx.try_send(data.to_vec()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Walk the source and copy every line the searcher accepts into the
/// filter pipe, recording the view-to-origin mapping as it goes. Runs on
/// its own thread; ends when the source is exhausted or the filter is
/// cancelled.
pub(crate) fn search_writer(
    cancel: Arc<CancelToken>,
    src: LineSource,
    searcher: Arc<dyn Searcher>,
    mut writer: PipeWriter,
    map: Arc<LineMap>,
    start: usize,
) {
    let mut origin = start;
    let mut render = start;
    loop {
        let found = match search_line(&cancel, &src, searcher.as_ref(), origin) {
            Ok(n) => n,
            Err(_) => break,
        };
        let Ok(mut line) = src.line(found) else {
            break;
        };
        map.store(render, src.origin_num(found));
        line.push(b'\n');
        if writer.write_all(&line).is_err() {
            break;
        }
        render += 1;
        origin = found + 1;
    }
    tracing::debug!("filter writer done: {} lines", render.saturating_sub(start));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn source_from(lines: &[&str], eof: bool) -> LineSource {
        let store = Store::new(crate::store::DEFAULT_MEMORY_LIMIT);
        for l in lines {
            store.append_line(format!("{}\n", l).as_bytes());
        }
        store.set_eof(eof);
        LineSource {
            stores: Arc::new(Stores::new(Arc::new(store))),
            ctl: None,
            line_map: None,
        }
    }

    #[test]
    fn test_sensitive_searcher() {
        let s = new_searcher("Err", false, true, false).unwrap();
        assert!(s.matches("an Error here"));
        assert!(!s.matches("an error here"));
        assert_eq!(s.find_all("Err and Err"), vec![(0, 3), (8, 11)]);
    }

    #[test]
    fn test_smart_case() {
        // Lower-case pattern searches insensitively.
        let s = new_searcher("err", false, false, true).unwrap();
        assert!(s.matches("ERROR"));
        // An upper-case letter makes it sensitive.
        let s = new_searcher("Err", false, false, true).unwrap();
        assert!(!s.matches("error"));
        assert!(s.matches("Error"));
    }

    #[test]
    fn test_regex_searcher() {
        let s = new_searcher("^a+b", true, true, false).unwrap();
        assert!(s.matches("aaab"));
        assert!(!s.matches("xaab"));
        assert_eq!(s.find_all("aab"), vec![(0, 3)]);
    }

    #[test]
    fn test_invalid_regex_is_none() {
        assert!(new_searcher("([", true, true, false).is_none());
        assert!(new_searcher("", false, true, false).is_none());
    }

    #[test]
    fn test_non_match_searcher() {
        let inner = new_searcher("a", false, true, false).unwrap();
        let s = NonMatchSearcher::new(inner);
        assert!(!s.matches("cat"));
        assert!(s.matches("dog"));
        assert!(s.find_all("dog").is_empty());
    }

    #[test]
    fn test_search_line_forward() {
        let src = source_from(&["alpha", "beta", "gamma"], true);
        let s = new_searcher("gamma", false, true, false).unwrap();
        let cancel = CancelToken::new();
        assert_eq!(search_line(&cancel, &src, s.as_ref(), 0).unwrap(), 2);
    }

    #[test]
    fn test_search_line_no_match_after_eof() {
        let src = source_from(&["alpha", "beta"], true);
        let s = new_searcher("zeta", false, true, false).unwrap();
        let cancel = CancelToken::new();
        assert!(matches!(
            search_line(&cancel, &src, s.as_ref(), 0),
            Err(Error::NoMatch)
        ));
    }

    #[test]
    fn test_search_waits_for_streaming_data() {
        let src = source_from(&["alpha"], false);
        let stores = src.stores.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            let store = stores.main();
            store.append_line(b"needle\n");
            store.set_eof(true);
        });
        let s = new_searcher("needle", false, true, false).unwrap();
        let cancel = CancelToken::new();
        assert_eq!(search_line(&cancel, &src, s.as_ref(), 0).unwrap(), 1);
        writer.join().unwrap();
    }

    #[test]
    fn test_back_search_line() {
        let src = source_from(&["x", "hit", "y", "hit", "z"], true);
        let s = new_searcher("hit", false, true, false).unwrap();
        let cancel = CancelToken::new();
        assert_eq!(back_search_line(&cancel, &src, s.as_ref(), 4).unwrap(), 3);
        assert_eq!(back_search_line(&cancel, &src, s.as_ref(), 2).unwrap(), 1);
        assert!(matches!(
            back_search_line(&cancel, &src, s.as_ref(), 0),
            Err(Error::NoMatch)
        ));
    }

    #[test]
    fn test_cancel_token_deadline() {
        let cancel = CancelToken::with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(matches!(cancel.check(), Err(Error::Cancel)));
    }

    #[test]
    fn test_cancelled_search_returns_cancel() {
        let src = source_from(&["a", "b"], true);
        let s = new_searcher("zeta", false, true, false).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            search_line(&cancel, &src, s.as_ref(), 0),
            Err(Error::Cancel)
        ));
    }

    #[test]
    fn test_all_index_plain_and_regex() {
        assert_eq!(all_index("a,b,c", ",", &None), vec![(1, 2), (3, 4)]);
        let re = Some(Regex::new(r"\s+").unwrap());
        assert_eq!(all_index("a  b c", "", &re), vec![(1, 3), (4, 5)]);
        assert!(all_index("abc", "", &None).is_empty());
    }

    #[test]
    fn test_pipe_round_trip() {
        let (mut r, mut w) = pipe();
        w.write_all(b"one\ntwo\n").unwrap();
        drop(w);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"one\ntwo\n");
    }

    #[test]
    fn test_search_writer_records_mapping() {
        let src = source_from(&["a", "b", "c", "a", "c"], true);
        let searcher = new_searcher("a", false, true, false).unwrap();
        let non_match: Arc<dyn Searcher> = Arc::new(NonMatchSearcher::new(searcher));
        let (mut reader, writer) = pipe();
        let map = Arc::new(LineMap::new());
        let cancel = Arc::new(CancelToken::new());

        let map2 = map.clone();
        let handle = std::thread::spawn(move || {
            search_writer(cancel, src, non_match, writer, map2, 0);
        });
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        handle.join().unwrap();

        assert_eq!(out, b"b\nc\nc\n");
        assert_eq!(map.load_forward(0), Some(1));
        assert_eq!(map.load_forward(1), Some(2));
        assert_eq!(map.load_forward(2), Some(4));
    }
}
