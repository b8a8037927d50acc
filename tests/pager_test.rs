//! End-to-end scenarios over the public API: a real file, a real reader
//! thread, and an in-memory screen.

use std::io::Write;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use peruse::config::Config;
use peruse::{new_searcher, CancelToken, CellGrid, Document, Pager};

fn write_lines(n: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..n {
        writeln!(file, "line-{}", i + 1).unwrap();
    }
    file.flush().unwrap();
    file
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn open(file: &NamedTempFile) -> Document {
    let doc = Document::open(file.path(), &Config::default(), None).unwrap();
    wait_until("EOF", || doc.buf_eof());
    doc
}

#[test]
fn paging_no_wrap_80x24() {
    let file = write_lines(100);
    let mut pager = Pager::new(open(&file));
    let mut screen = CellGrid::new(80, 24);
    pager.draw(&mut screen);

    assert_eq!(pager.doc().top_ln, 0);
    assert_eq!(screen.row_text(0), "line-1");

    pager.move_pg_dn();
    assert_eq!(pager.doc().top_ln, 23);
    assert_eq!(pager.doc_mut().line(23).unwrap(), b"line-24");

    pager.draw(&mut screen);
    assert_eq!(screen.row_text(0), "line-24");
}

#[test]
fn status_line_shows_position() {
    let file = write_lines(100);
    let mut pager = Pager::new(open(&file));
    let mut screen = CellGrid::new(80, 24);
    pager.draw(&mut screen);

    let status = screen.row_text(23);
    assert!(status.contains("(0/100)"), "status was: {}", status);
    assert!(status.contains(':'), "status was: {}", status);
}

#[test]
fn wrap_mode_segment_stepping() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", "a".repeat(200)).unwrap();
    writeln!(file, "short").unwrap();
    file.flush().unwrap();

    let mut pager = Pager::new(open(&file));
    let mut screen = CellGrid::new(50, 10);
    pager.draw(&mut screen);

    // Four wrap segments, then the short line.
    assert_eq!(screen.row_text(0).len(), 50);
    assert_eq!(screen.row_text(3).len(), 50);
    assert_eq!(screen.row_text(4), "short");

    pager.move_down_n(1);
    assert_eq!(pager.doc().top_ln, 0);
    assert_eq!(pager.doc().top_lx, 50);

    pager.move_down_n(1);
    pager.move_down_n(1);
    pager.move_down_n(1);
    assert_eq!(pager.doc().top_ln, 1);
    assert_eq!(pager.doc().top_lx, 0);

    pager.draw(&mut screen);
    assert_eq!(screen.row_text(0), "short");
}

#[test]
fn follow_mode_tails_appends() {
    let file = NamedTempFile::new().unwrap();
    let mut doc = Document::open(file.path(), &Config::default(), None).unwrap();
    doc.set_follow_mode(true);
    let mut pager = Pager::new(doc);
    let mut screen = CellGrid::new(40, 10);
    pager.draw(&mut screen);

    let mut handle = std::fs::OpenOptions::new()
        .append(true)
        .open(file.path())
        .unwrap();
    writeln!(handle, "A").unwrap();
    writeln!(handle, "B").unwrap();
    handle.flush().unwrap();

    wait_until("appends", || pager.doc().buf_end_num() >= 2);
    assert_eq!(pager.doc_mut().line(1).unwrap(), b"B");

    pager.tail();
    pager.draw(&mut screen);
    assert_eq!(screen.row_text(0), "A");
    assert_eq!(screen.row_text(1), "B");
}

#[test]
fn search_finds_line_in_second_chunk() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..16_000 {
        if i == 15_003 {
            writeln!(file, "needle").unwrap();
        } else {
            writeln!(file, "hay-{}", i).unwrap();
        }
    }
    file.flush().unwrap();

    let mut doc = open(&file);
    let searcher = new_searcher("needle", false, true, false).unwrap();
    let cancel = CancelToken::new();
    let n = doc.search(&cancel, searcher.as_ref(), 0).unwrap();
    assert_eq!(n, 15_003);
    assert_eq!(doc.line(n).unwrap(), b"needle");
    assert_eq!(doc.current_chunk(), 1);
}

#[test]
fn filter_non_match_with_gutter_remap() {
    let mut file = NamedTempFile::new().unwrap();
    for l in ["a", "b", "c", "a", "c"] {
        writeln!(file, "{}", l).unwrap();
    }
    file.flush().unwrap();

    let config = Config::default();
    let mut doc = open(&file);
    let searcher = new_searcher("a", false, true, false).unwrap();
    let mut filtered = doc.filter(searcher, true, &config, None);
    wait_until("filter output", || filtered.buf_end_num() >= 3);

    assert_eq!(filtered.line_str(0).unwrap(), "b");
    assert_eq!(filtered.line_str(1).unwrap(), "c");
    assert_eq!(filtered.line_str(2).unwrap(), "c");

    // The gutter shows origin numbers through the line map.
    filtered.general.line_num_mode = true;
    let mut pager = Pager::new(filtered);
    let mut screen = CellGrid::new(40, 6);
    pager.draw(&mut screen);
    assert_eq!(screen.row_text(0), "2 b");
    assert_eq!(screen.row_text(1), "3 c");
    assert_eq!(screen.row_text(2), "5 c");
}

#[test]
fn section_header_pinned_above_body() {
    let mut file = NamedTempFile::new().unwrap();
    for l in ["===CH1", "a", "b", "===CH2", "c", "d"] {
        writeln!(file, "{}", l).unwrap();
    }
    file.flush().unwrap();

    let mut doc = open(&file);
    doc.set_section_delimiter("^===");
    doc.general.section_header = true;
    doc.general.section_header_num = 1;
    doc.move_line(4);

    let mut pager = Pager::new(doc);
    let mut screen = CellGrid::new(40, 6);
    pager.draw(&mut screen);

    // The enclosing section header is drawn over the first body row.
    assert_eq!(screen.row_text(0), "===CH2");
    assert_eq!(screen.row_text(1), "d");
}

#[test]
fn section_search_timeout_cancels() {
    let file = write_lines(1000);
    let mut doc = open(&file);
    doc.set_section_delimiter("^nosuchsection");

    let cancel = CancelToken::with_timeout(Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(1));
    let searcher = new_searcher("^nosuchsection", true, true, false).unwrap();
    let err = doc.back_search(&cancel, searcher.as_ref(), 999).unwrap_err();
    assert!(matches!(err, peruse::Error::Cancel));
}

#[test]
fn export_round_trips_bytes() {
    let file = write_lines(10);
    let mut doc = open(&file);
    let mut out = Vec::new();
    doc.export(&mut out, 0, 9).unwrap();
    let expected: String = (0..10).map(|i| format!("line-{}\n", i + 1)).collect();
    assert_eq!(out, expected.as_bytes());
}
