//! Chunked line store.
//!
//! Lines are kept as raw bytes (including the trailing newline) in
//! fixed-size chunks so a line index maps to a chunk with plain division.
//! The reader thread appends; the UI and search threads read. Chunk data is
//! behind a reader-writer lock held only for the duration of a line copy;
//! the counters are atomics so `end_num` can be polled lock-free.
//!
//! Memory is bounded by an LRU over resident chunks. Chunk 0 is pinned so
//! the header stays cheap, and the chunk currently being appended to is
//! never evicted. Sources that cannot seek cannot re-materialize a chunk,
//! so nothing is evicted for them.

use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use lru::LruCache;

use crate::error::{Error, Result};

/// Number of lines per chunk.
pub const CHUNK_SIZE: usize = 10_000;

/// Default maximum number of resident chunks.
pub const DEFAULT_MEMORY_LIMIT: usize = 100;

/// Chunk index and intra-chunk offset for a line number.
pub fn chunk_line_num(n: usize) -> (usize, usize) {
    (n / CHUNK_SIZE, n % CHUNK_SIZE)
}

/// A fixed-size block of consecutive lines.
#[derive(Debug)]
pub(crate) struct Chunk {
    /// Raw line bytes, trailing newline included.
    lines: Vec<Vec<u8>>,
    /// Byte offset of the first line in the source, for re-reading after
    /// eviction.
    start: u64,
}

impl Chunk {
    fn new(start: u64) -> Self {
        Chunk {
            lines: Vec::new(),
            start,
        }
    }
}

/// Appendable, line-addressable buffer over one input.
pub struct Store {
    chunks: RwLock<Vec<Chunk>>,
    /// Residency set; evicting an entry drops that chunk's lines.
    loaded: Mutex<LruCache<usize, ()>>,
    /// Whether evicted chunks can be re-read (seekable source).
    evictable: AtomicBool,

    start_num: AtomicUsize,
    end_num: AtomicUsize,
    /// Total bytes appended.
    size: AtomicU64,
    /// Byte offset of the first buffered line in the source.
    offset: AtomicU64,

    eof: AtomicBool,
    changed: AtomicBool,
    read_cancel: AtomicBool,
    no_newline_eof: AtomicBool,
}

impl Store {
    pub fn new(memory_limit: usize) -> Self {
        let cap = NonZeroUsize::new(memory_limit.max(2)).expect("nonzero capacity");
        Store {
            chunks: RwLock::new(Vec::new()),
            loaded: Mutex::new(LruCache::new(cap)),
            evictable: AtomicBool::new(false),
            start_num: AtomicUsize::new(0),
            end_num: AtomicUsize::new(0),
            size: AtomicU64::new(0),
            offset: AtomicU64::new(0),
            eof: AtomicBool::new(false),
            changed: AtomicBool::new(false),
            read_cancel: AtomicBool::new(false),
            no_newline_eof: AtomicBool::new(false),
        }
    }

    /// Install one line at index `end_num`, rolling over to a new chunk
    /// when the previous one is full.
    pub fn append_line(&self, line: &[u8]) {
        let rolled = {
            let mut chunks = self.chunks.write().unwrap();
            if chunks.is_empty() {
                chunks.push(Chunk::new(0));
            }
            let rolled = if chunks.last().map(|c| c.lines.len()) == Some(CHUNK_SIZE) {
                let start = self.size.load(Ordering::Relaxed);
                chunks.push(Chunk::new(start));
                Some(chunks.len() - 2)
            } else {
                None
            };
            chunks.last_mut().unwrap().lines.push(line.to_vec());
            rolled
        };
        self.size.fetch_add(line.len() as u64, Ordering::Relaxed);
        if let Some(full) = rolled {
            self.mark_chunk_used(full);
        }
        // Release pairs with the Acquire in end_num(): an observer that
        // sees the new count also sees the line bytes.
        self.end_num.fetch_add(1, Ordering::Release);
    }

    /// One line, trailing newline stripped. `OutOfRange` when the chunk is
    /// absent, evicted, or the offset is past its current length. Never
    /// triggers a load.
    pub fn get_chunk_line(&self, chunk_num: usize, cn: usize) -> Result<Vec<u8>> {
        let chunks = self.chunks.read().unwrap();
        let chunk = chunks.get(chunk_num).ok_or(Error::OutOfRange)?;
        let line = chunk.lines.get(cn).ok_or(Error::OutOfRange)?;
        let line = match line.last() {
            Some(b'\n') => &line[..line.len() - 1],
            _ => &line[..],
        };
        Ok(line.to_vec())
    }

    /// Touch a chunk in the residency set, evicting the least-recently used
    /// resident if the set is over capacity. Chunk 0 never participates.
    pub fn mark_chunk_used(&self, chunk_num: usize) {
        if chunk_num == 0 || !self.evictable.load(Ordering::Relaxed) {
            return;
        }
        let evicted = {
            let mut loaded = self.loaded.lock().unwrap();
            loaded.push(chunk_num, ())
        };
        if let Some((old, ())) = evicted {
            if old != chunk_num {
                self.evict_chunk(old);
            }
        }
    }

    /// Drop a chunk's line data. The slot stays so index math holds. The
    /// first and the last (append target) chunks are kept.
    pub fn evict_chunk(&self, chunk_num: usize) {
        let mut chunks = self.chunks.write().unwrap();
        if chunk_num == 0 || chunk_num + 1 >= chunks.len() {
            return;
        }
        tracing::debug!("evicting chunk {}", chunk_num);
        chunks[chunk_num].lines = Vec::new();
    }

    /// Replace an evicted chunk's lines after a re-read.
    pub(crate) fn restore_chunk(&self, chunk_num: usize, lines: Vec<Vec<u8>>) {
        {
            let mut chunks = self.chunks.write().unwrap();
            match chunks.get_mut(chunk_num) {
                Some(chunk) if chunk.lines.is_empty() => chunk.lines = lines,
                _ => return,
            }
        }
        self.mark_chunk_used(chunk_num);
    }

    /// Whether the chunk currently holds line data.
    pub fn is_chunk_resident(&self, chunk_num: usize) -> bool {
        let chunks = self.chunks.read().unwrap();
        chunks
            .get(chunk_num)
            .map(|c| !c.lines.is_empty())
            .unwrap_or(false)
    }

    /// Source byte offset recorded for the chunk.
    pub(crate) fn chunk_start(&self, chunk_num: usize) -> Option<u64> {
        let chunks = self.chunks.read().unwrap();
        chunks.get(chunk_num).map(|c| c.start)
    }

    pub fn last_chunk_num(&self) -> usize {
        let chunks = self.chunks.read().unwrap();
        chunks.len().saturating_sub(1)
    }

    /// Byte-faithful emission of a chunk's line range.
    pub fn export<W: Write>(&self, w: &mut W, chunk_num: usize, start: usize, end: usize) -> Result<()> {
        let chunks = self.chunks.read().unwrap();
        let chunk = chunks.get(chunk_num).ok_or(Error::OutOfRange)?;
        let end = end.min(chunk.lines.len());
        for line in &chunk.lines[start.min(end)..end] {
            w.write_all(line)?;
        }
        Ok(())
    }

    pub fn set_evictable(&self, yes: bool) {
        self.evictable.store(yes, Ordering::Relaxed);
    }

    pub fn start_num(&self) -> usize {
        self.start_num.load(Ordering::Acquire)
    }

    pub fn end_num(&self) -> usize {
        self.end_num.load(Ordering::Acquire)
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }

    pub(crate) fn set_offset(&self, n: u64) {
        self.offset.store(n, Ordering::Relaxed);
    }

    pub fn eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    pub fn set_eof(&self, yes: bool) {
        self.eof.store(yes, Ordering::Release);
    }

    /// Redraw hint; readers consume it with [`Store::take_changed`].
    pub fn set_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    pub fn read_cancel(&self) -> bool {
        self.read_cancel.load(Ordering::Relaxed)
    }

    pub fn cancel_read(&self) {
        self.read_cancel.store(true, Ordering::Relaxed);
    }

    pub fn no_newline_eof(&self) -> bool {
        self.no_newline_eof.load(Ordering::Relaxed)
    }

    pub(crate) fn set_no_newline_eof(&self, yes: bool) {
        self.no_newline_eof.store(yes, Ordering::Relaxed);
    }
}

/// The store pair a document reads through. During an in-place reload the
/// reader fills `follow` while the display keeps reading `main`; the
/// `tmp_follow` flag routes new lookups to the growing store until the
/// swap commits.
pub(crate) struct Stores {
    main: RwLock<Arc<Store>>,
    follow: RwLock<Option<Arc<Store>>>,
    tmp_follow: AtomicBool,
}

impl Stores {
    pub fn new(store: Arc<Store>) -> Self {
        Stores {
            main: RwLock::new(store),
            follow: RwLock::new(None),
            tmp_follow: AtomicBool::new(false),
        }
    }

    /// The primary store.
    pub fn main(&self) -> Arc<Store> {
        self.main.read().unwrap().clone()
    }

    /// The store that answers line lookups right now.
    pub fn read_side(&self) -> Arc<Store> {
        if self.tmp_follow.load(Ordering::Acquire) {
            if let Some(fs) = self.follow.read().unwrap().as_ref() {
                return fs.clone();
            }
        }
        self.main()
    }

    pub fn tmp_follow(&self) -> bool {
        self.tmp_follow.load(Ordering::Acquire)
    }

    pub fn begin_follow(&self, fs: Arc<Store>) {
        *self.follow.write().unwrap() = Some(fs);
        self.tmp_follow.store(true, Ordering::Release);
    }

    /// Promote the follow store to primary. Returns false if no follow
    /// store was active.
    pub fn commit_follow(&self) -> bool {
        let Some(fs) = self.follow.write().unwrap().take() else {
            return false;
        };
        *self.main.write().unwrap() = fs;
        self.tmp_follow.store(false, Ordering::Release);
        true
    }

    pub fn abort_follow(&self) {
        self.tmp_follow.store(false, Ordering::Release);
        *self.follow.write().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_store(lines: usize) -> Store {
        let store = Store::new(DEFAULT_MEMORY_LIMIT);
        for i in 0..lines {
            store.append_line(format!("line-{}\n", i + 1).as_bytes());
        }
        store
    }

    #[test]
    fn test_chunk_line_num() {
        assert_eq!(chunk_line_num(0), (0, 0));
        assert_eq!(chunk_line_num(CHUNK_SIZE - 1), (0, CHUNK_SIZE - 1));
        assert_eq!(chunk_line_num(CHUNK_SIZE), (1, 0));
        assert_eq!(chunk_line_num(15_003), (1, 5_003));
    }

    #[test]
    fn test_append_and_get() {
        let store = filled_store(3);
        assert_eq!(store.end_num(), 3);
        assert_eq!(store.get_chunk_line(0, 0).unwrap(), b"line-1");
        assert_eq!(store.get_chunk_line(0, 2).unwrap(), b"line-3");
    }

    #[test]
    fn test_get_out_of_range() {
        let store = filled_store(1);
        assert!(matches!(
            store.get_chunk_line(0, 5),
            Err(Error::OutOfRange)
        ));
        assert!(matches!(
            store.get_chunk_line(3, 0),
            Err(Error::OutOfRange)
        ));
    }

    #[test]
    fn test_rollover_addressing() {
        let store = filled_store(CHUNK_SIZE + 2);
        assert_eq!(store.last_chunk_num(), 1);
        assert_eq!(
            store.get_chunk_line(1, 0).unwrap(),
            format!("line-{}", CHUNK_SIZE + 1).as_bytes()
        );
        assert_eq!(
            store.get_chunk_line(0, CHUNK_SIZE - 1).unwrap(),
            format!("line-{}", CHUNK_SIZE).as_bytes()
        );
    }

    #[test]
    fn test_no_trailing_newline() {
        let store = Store::new(DEFAULT_MEMORY_LIMIT);
        store.append_line(b"tail");
        store.set_no_newline_eof(true);
        assert_eq!(store.get_chunk_line(0, 0).unwrap(), b"tail");
        assert!(store.no_newline_eof());
    }

    #[test]
    fn test_eviction_keeps_first_and_last() {
        let store = Store::new(2);
        store.set_evictable(true);
        for i in 0..(CHUNK_SIZE * 5) {
            store.append_line(format!("{}\n", i).as_bytes());
        }
        // Filled chunks 1, 2, 3 entered a residency set of two; the
        // least-recently filled one was dropped.
        assert!(!store.is_chunk_resident(1));
        assert!(store.is_chunk_resident(2));
        assert!(store.is_chunk_resident(3));
        // Chunk 0 is pinned regardless of LRU pressure.
        assert!(store.is_chunk_resident(0));
        // The append target is always resident.
        assert!(store.is_chunk_resident(store.last_chunk_num()));
    }

    #[test]
    fn test_non_seekable_never_evicts() {
        let store = Store::new(2);
        for i in 0..(CHUNK_SIZE * 5) {
            store.append_line(format!("{}\n", i).as_bytes());
        }
        for ci in 0..=store.last_chunk_num() {
            assert!(store.is_chunk_resident(ci), "chunk {} missing", ci);
        }
    }

    #[test]
    fn test_restore_chunk() {
        let store = Store::new(2);
        store.set_evictable(true);
        for i in 0..(CHUNK_SIZE * 5) {
            store.append_line(format!("{}\n", i).as_bytes());
        }
        let evicted = (1..store.last_chunk_num())
            .find(|&ci| !store.is_chunk_resident(ci))
            .expect("some chunk should be evicted");
        assert!(matches!(
            store.get_chunk_line(evicted, 0),
            Err(Error::OutOfRange)
        ));

        let lines: Vec<Vec<u8>> = (0..CHUNK_SIZE).map(|i| format!("r{}\n", i).into_bytes()).collect();
        store.restore_chunk(evicted, lines);
        assert_eq!(store.get_chunk_line(evicted, 0).unwrap(), b"r0");
    }

    #[test]
    fn test_export_bytes_faithful() {
        let store = filled_store(3);
        let mut out = Vec::new();
        store.export(&mut out, 0, 0, 3).unwrap();
        assert_eq!(out, b"line-1\nline-2\nline-3\n");
    }

    #[test]
    fn test_store_swap() {
        let stores = Stores::new(Arc::new(filled_store(2)));
        assert_eq!(stores.read_side().end_num(), 2);

        let fs = Arc::new(filled_store(5));
        stores.begin_follow(fs);
        assert!(stores.tmp_follow());
        assert_eq!(stores.read_side().end_num(), 5);
        // The primary is still the old store until the swap commits.
        assert_eq!(stores.main().end_num(), 2);

        assert!(stores.commit_follow());
        assert!(!stores.tmp_follow());
        assert_eq!(stores.main().end_num(), 5);
    }
}
