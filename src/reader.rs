//! The reader engine.
//!
//! Each document owns one reader thread. The thread owns the byte source
//! and never exposes it; the UI talks to it through a typed control
//! channel. New lines are published by appending to the store and bumping
//! its atomic line count, so the UI and search threads observe progress
//! without any channel round-trips. Events that require a UI action
//! (reload finished, read error) go over an event channel drained once per
//! frame.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::store::{Store, Stores, CHUNK_SIZE};

/// How long the reader sleeps between polls while tailing a quiet source.
const FOLLOW_TICK: Duration = Duration::from_millis(100);

/// Requests accepted by the reader thread.
#[derive(Debug)]
pub(crate) enum ControlRequest {
    /// Start (or resume) reading the source into the store.
    Load,
    /// Re-open the source into a fresh store and swap it in.
    Reload,
    /// Resume reading after EOF (follow mode kick).
    Follow,
    /// Re-materialize an evicted chunk.
    LoadChunk(usize),
    /// Prefetch chunks around a line hint for an upcoming search.
    Search(usize),
    /// Shut the reader down.
    Close,
}

/// Notifications from reader threads, tagged with the owning document.
#[derive(Debug)]
pub struct ReaderEvent {
    pub doc_id: u64,
    pub kind: ReaderEventKind,
}

#[derive(Debug)]
pub enum ReaderEventKind {
    /// The source reached EOF.
    EofReached,
    /// An in-place reload finished; the line cache must be purged.
    Reloaded,
    /// A chunk was re-read after eviction.
    ChunkLoaded(usize),
    /// A read failed; shown once on the status line.
    ReadError(String),
}

/// The byte source a reader owns.
pub(crate) enum Source {
    File {
        path: PathBuf,
        reader: BufReader<File>,
    },
    Stream {
        reader: BufReader<Box<dyn Read + Send>>,
    },
}

impl Source {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> std::io::Result<usize> {
        match self {
            Source::File { reader, .. } => reader.read_until(b'\n', buf),
            Source::Stream { reader } => reader.read_until(b'\n', buf),
        }
    }
}

/// Handle kept by the document; dropping it shuts the reader down.
pub(crate) struct ReaderHandle {
    ctl: Sender<ControlRequest>,
    _join: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn request(&self, req: ControlRequest) {
        // A dead reader is fine: the buffered content stays readable.
        let _ = self.ctl.send(req);
    }

    pub fn control_sender(&self) -> Sender<ControlRequest> {
        self.ctl.clone()
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        let _ = self.ctl.send(ControlRequest::Close);
    }
}

pub(crate) struct ReaderConfig {
    pub memory_limit: usize,
    pub seekable: bool,
    pub reopenable: bool,
    pub doc_id: u64,
}

/// Spawn the reader thread for a source and return its control handle.
pub(crate) fn spawn_reader(
    source: Source,
    stores: Arc<Stores>,
    follow: Arc<AtomicBool>,
    config: ReaderConfig,
    events: Option<Sender<ReaderEvent>>,
) -> ReaderHandle {
    let (ctl_tx, ctl_rx) = std::sync::mpsc::channel();
    let reader = Reader {
        source,
        stores,
        follow,
        config,
        events,
        ctl_rx,
        eof_reported: false,
        error_reported: false,
    };
    let join = std::thread::Builder::new()
        .name("peruse-reader".to_string())
        .spawn(move || reader.run())
        .ok();
    ReaderHandle {
        ctl: ctl_tx,
        _join: join,
    }
}

struct Reader {
    source: Source,
    stores: Arc<Stores>,
    follow: Arc<AtomicBool>,
    config: ReaderConfig,
    events: Option<Sender<ReaderEvent>>,
    ctl_rx: Receiver<ControlRequest>,
    eof_reported: bool,
    error_reported: bool,
}

impl Reader {
    fn run(mut self) {
        let mut pending: Option<ControlRequest> = None;
        loop {
            let req = match pending.take() {
                Some(req) => req,
                None => match self.ctl_rx.recv() {
                    Ok(req) => req,
                    Err(_) => break,
                },
            };
            tracing::trace!("reader request: {:?}", req);
            match req {
                ControlRequest::Load | ControlRequest::Follow => {
                    let store = self.stores.main();
                    pending = self.load(&store);
                }
                ControlRequest::Reload => {
                    pending = self.reload();
                }
                ControlRequest::LoadChunk(ci) => self.load_chunk(ci),
                ControlRequest::Search(hint) => self.prefetch(hint),
                ControlRequest::Close => break,
            }
        }
        tracing::debug!("reader finished");
    }

    /// Read the source into `store` until EOF. In follow mode the handle
    /// stays open and the read is retried on a short tick. Returns a
    /// request that arrived while idle, for the control loop to run next.
    fn load(&mut self, store: &Arc<Store>) -> Option<ControlRequest> {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        loop {
            if store.read_cancel() {
                return None;
            }
            buf.clear();
            match self.source.read_line(&mut buf) {
                Ok(0) => {
                    store.set_eof(true);
                    if !self.eof_reported {
                        self.eof_reported = true;
                        self.send(ReaderEventKind::EofReached);
                    }
                    match self.idle() {
                        Idle::Request(req) => return Some(req),
                        Idle::Retry => continue,
                        Idle::Shutdown => return None,
                    }
                }
                Ok(_) => {
                    if store.eof() {
                        store.set_eof(false);
                        self.eof_reported = false;
                    }
                    if !buf.ends_with(b"\n") {
                        store.set_no_newline_eof(true);
                    }
                    store.append_line(&buf);
                    store.set_changed();
                }
                Err(e) => {
                    tracing::error!("read error: {}", e);
                    if !self.error_reported {
                        self.error_reported = true;
                        self.send(ReaderEventKind::ReadError(e.to_string()));
                    }
                    store.set_eof(true);
                    match self.idle() {
                        Idle::Request(req) => return Some(req),
                        Idle::Retry => continue,
                        Idle::Shutdown => return None,
                    }
                }
            }
        }
    }

    /// Wait at EOF: poll the control channel, and in follow mode retry the
    /// read on a tick so appended data is picked up.
    fn idle(&mut self) -> Idle {
        loop {
            match self.ctl_rx.recv_timeout(FOLLOW_TICK) {
                Ok(req) => return Idle::Request(req),
                Err(RecvTimeoutError::Timeout) => {
                    if self.follow.load(Ordering::Relaxed) {
                        return Idle::Retry;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Idle::Shutdown,
            }
        }
    }

    /// Open a fresh handle into a follow store, then swap it in as the
    /// primary. While the new store fills, `tmp_follow` routes lookups to
    /// it so the status line can show progress.
    fn reload(&mut self) -> Option<ControlRequest> {
        if !self.config.reopenable || !self.config.seekable {
            tracing::warn!("reload requested for a non-reopenable source");
            return None;
        }
        let Source::File { path, .. } = &self.source else {
            return None;
        };
        let path = path.clone();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                self.send(ReaderEventKind::ReadError(e.to_string()));
                return None;
            }
        };

        let fs = Arc::new(Store::new(self.config.memory_limit));
        fs.set_evictable(true);
        self.stores.begin_follow(fs.clone());

        let mut reader = BufReader::new(file);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        loop {
            if self.stores.main().read_cancel() {
                self.stores.abort_follow();
                return None;
            }
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if !buf.ends_with(b"\n") {
                        fs.set_no_newline_eof(true);
                    }
                    fs.append_line(&buf);
                    fs.set_changed();
                }
                Err(e) => {
                    tracing::error!("reload read error: {}", e);
                    self.stores.abort_follow();
                    self.send(ReaderEventKind::ReadError(e.to_string()));
                    return None;
                }
            }
        }
        fs.set_eof(true);
        self.stores.commit_follow();
        self.source = Source::File { path, reader };
        self.eof_reported = false;
        self.error_reported = false;
        self.send(ReaderEventKind::Reloaded);
        // Keep tailing from the fresh handle.
        Some(ControlRequest::Follow)
    }

    /// Re-read an evicted chunk from its recorded byte offset.
    fn load_chunk(&mut self, chunk_num: usize) {
        if !self.config.seekable {
            return;
        }
        let store = self.stores.main();
        if store.is_chunk_resident(chunk_num) {
            store.mark_chunk_used(chunk_num);
            return;
        }
        let Some(start) = store.chunk_start(chunk_num) else {
            return;
        };
        let Source::File { reader, .. } = &mut self.source else {
            return;
        };

        let saved = match reader.stream_position() {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!("chunk load: position failed: {}", e);
                return;
            }
        };
        if let Err(e) = reader.seek(SeekFrom::Start(start)) {
            tracing::warn!("chunk load: seek failed: {}", e);
            return;
        }

        let mut lines = Vec::with_capacity(CHUNK_SIZE);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        for _ in 0..CHUNK_SIZE {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => lines.push(buf.clone()),
                Err(e) => {
                    tracing::warn!("chunk load: read failed: {}", e);
                    break;
                }
            }
        }
        let _ = reader.seek(SeekFrom::Start(saved));

        store.restore_chunk(chunk_num, lines);
        self.send(ReaderEventKind::ChunkLoaded(chunk_num));
    }

    /// Warm the chunks around a search hint.
    fn prefetch(&mut self, hint: usize) {
        let (ci, _) = crate::store::chunk_line_num(hint);
        self.load_chunk(ci);
        self.load_chunk(ci + 1);
    }

    fn send(&self, kind: ReaderEventKind) {
        if let Some(events) = &self.events {
            let _ = events.send(ReaderEvent {
                doc_id: self.config.doc_id,
                kind,
            });
        }
    }
}

enum Idle {
    Request(ControlRequest),
    Retry,
    Shutdown,
}
