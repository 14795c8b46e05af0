use super::*;

fn make_terminal(cols: u16, rows: u16) -> Terminal {
    Terminal::new(cols, rows).expect("spawn terminal")
}

#[test]
fn fresh_terminal_is_dirty_until_first_snapshot() {
    let mut term = make_terminal(80, 24);
    assert!(term.is_dirty());
    let snap = term.try_snapshot().expect("first snapshot");
    assert_eq!(snap.view.cols, 80);
    assert_eq!(snap.view.rows, 24);
    assert!(!term.is_dirty());
}

#[test]
fn try_snapshot_returns_none_when_not_dirty() {
    let mut term = make_terminal(80, 24);
    term.try_snapshot().expect("first snapshot");
    assert!(term.try_snapshot().is_none());
}

#[test]
fn writing_ascii_marks_rows_damaged() {
    let mut term = make_terminal(80, 24);
    term.try_snapshot();
    term.bench_write_to_term(b"hello\r\n");
    let snap = term.bench_force_snapshot().expect("snapshot after write");
    assert!(snap.view.is_row_damaged(0));
    assert_eq!(snap.view.cell(0, 0).character, 'h');
}

#[test]
fn resize_rejects_zero_dimensions() {
    let mut term = make_terminal(80, 24);
    let err = term.resize(0, 24).unwrap_err();
    match err {
        TerminalError::InvalidDimensions { cols, rows } => {
            assert_eq!(cols, 0);
            assert_eq!(rows, 24);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn resize_clamps_to_maximum_dimensions() {
    let mut term = make_terminal(80, 24);
    term.resize(5000, 5000).expect("resize");
    term.try_snapshot();
    term.bench_write_to_term(b"x");
    let snap = term.bench_force_snapshot().expect("snapshot");
    assert!(snap.view.cols <= 1000);
    assert!(snap.view.rows <= 500);
}

#[test]
fn write_after_drop_like_close_returns_write_closed() {
    let mut term = make_terminal(80, 24);
    // Simulate the child having exited without actually tearing down the PTY.
    term.exited = Some(0);
    let err = term.write(b"echo hi\n").unwrap_err();
    assert!(matches!(err, TerminalError::WriteClosed));
}

#[test]
fn search_set_with_invalid_pattern_is_an_error() {
    let mut term = make_terminal(80, 24);
    let err = term.search_set("(unterminated").unwrap_err();
    assert!(matches!(err, TerminalError::InvalidPattern(_)));
}

#[test]
fn search_finds_written_text() {
    let mut term = make_terminal(80, 24);
    term.bench_write_to_term(b"needle in a haystack\r\n");
    term.search_set("needle").expect("compile pattern");
    assert!(!term.search.matches.is_empty());
}

#[test]
fn selection_round_trips_through_snapshot() {
    let mut term = make_terminal(80, 24);
    term.bench_write_to_term(b"select me\r\n");
    term.try_snapshot();
    term.start_selection(vterm_core::SelectionKind::Linear, 0, 0, false);
    term.update_selection(0, 9, true);
    let snap = term.bench_force_snapshot().expect("snapshot with selection");
    assert!(snap.selection.is_some());
    term.clear_selection();
    let snap = term.bench_force_snapshot().expect("snapshot after clear");
    assert!(snap.selection.is_none());
}

#[test]
fn resize_emits_damaged_for_every_row_of_the_new_view() {
    let mut term = make_terminal(80, 24);
    term.resize(40, 24).expect("resize");
    let events = term.drain_events();
    let damaged: Vec<u64> = events
        .into_iter()
        .filter_map(|e| match e {
            TerminalEvent::Damaged { line } => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(damaged.len(), 24);
}

#[test]
fn hyperlink_ranges_are_detected_in_damaged_rows() {
    let mut term = make_terminal(80, 24);
    // Force the 200ms URL-detection throttle open for the test.
    term.last_url_detect = std::time::Instant::now() - std::time::Duration::from_secs(1);
    term.bench_write_to_term(b"visit https://example.com/page now\r\n");
    let snap = term.bench_force_snapshot().expect("snapshot");
    assert!(!term.hyperlink_ranges()[0].is_empty());
    let (start, end) = term.hyperlink_ranges()[0][0];
    assert!(end > start);
    let _ = snap;
}
