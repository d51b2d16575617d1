// Design rule checks on small hand-built boards
use pcb_connect::board::{
    Element, Layer, LayerStack, Line, ObjectFlags, ObjectKind, ObjectRef, Pin, Point, UndoLog, Via,
};
use pcb_connect::drc::{DesignRules, ViolationKind, ViolationLog};
use pcb_connect::{find_connections, run_drc, Board, FlagUndoLog};
use std::collections::BTreeSet;

/// Rules that flag nothing unless a test raises them
fn lenient() -> DesignRules {
    DesignRules { bloat: 0, shrink: 0, min_wid: 0, min_slk: 0, min_drill: 0, min_ring: 0 }
}

fn line(y: i64, x1: i64, x2: i64, thickness: i64) -> Line {
    Line::new(Point::new(x1, y), Point::new(x2, y), thickness, 0)
}

fn check(board: &mut Board) -> (i32, ViolationLog) {
    let mut log = ViolationLog::new();
    let mut undo = FlagUndoLog::new();
    let count = run_drc(board, &mut log, &mut undo);
    (count, log)
}

/// Object ID sets of every violation with `title`
fn implicated(log: &ViolationLog, title: &str) -> BTreeSet<Vec<u64>> {
    log.titled(title)
        .map(|v| {
            let mut ids: Vec<u64> = v.objects.iter().map(|&(id, _)| id).collect();
            ids.sort_unstable();
            ids
        })
        .collect()
}

/// One element with a 100 000 nm pin at each x on the axis. Returns the
/// board and each pin's object ID, in pin order.
fn pin_row(name: &str, xs: &[i64], rules: DesignRules) -> (Board, Vec<u64>) {
    let mut board = Board::new(name, LayerStack::two_layer()).with_rules(rules);
    let mut element = Element::new("J1", Point::new(0, 0));
    for (n, &x) in xs.iter().enumerate() {
        element = element.with_pin(Pin::new((n + 1).to_string(), Point::new(x, 0), 100_000, 0, 40_000));
    }
    board.add_element(element);
    let ids = (0..xs.len())
        .map(|index| board.pin_ref(0, index).and_then(|pin| board.object_id(pin)).unwrap())
        .collect();
    (board, ids)
}

/// Three parallel pairs of lines, far from each other, with edge gaps of
/// 1 000, 5 000 and 20 000 nm
fn spaced_pairs(rules: DesignRules) -> Board {
    let mut board = Board::new("pairs", LayerStack::two_layer()).with_rules(rules);
    for (pair, gap) in [1_000, 5_000, 20_000].into_iter().enumerate() {
        let y = pair as i64 * 5_000_000;
        board.add_line(0, line(y, 0, 1_000_000, 100_000)).unwrap();
        board.add_line(0, line(y + 100_000 + gap, 0, 1_000_000, 100_000)).unwrap();
    }
    board
}

/// Two collinear pairs whose round ends overlap by 10 000 and 50 000 nm
fn butted_pairs(rules: DesignRules) -> Board {
    let mut board = Board::new("butted", LayerStack::two_layer()).with_rules(rules);
    for (pair, gap) in [90_000, 50_000].into_iter().enumerate() {
        let y = pair as i64 * 5_000_000;
        board.add_line(0, line(y, 0, 1_000_000, 100_000)).unwrap();
        board.add_line(0, line(y, 1_000_000 + gap, 2_000_000, 100_000)).unwrap();
    }
    board
}

#[test]
fn test_parallel_lines_too_close() {
    let rules = DesignRules { bloat: 127_000, ..lenient() };
    let mut board = Board::new("scenario a", LayerStack::two_layer()).with_rules(rules);
    board.add_line(0, line(0, 0, 1_000_000, 254_000)).unwrap();
    board.add_line(0, line(254_100, 0, 1_000_000, 254_000)).unwrap();

    let (count, log) = check(&mut board);

    assert_eq!(count, 1);
    let violations: Vec<_> = log.counted().collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].title, "Copper areas too close");
    assert_eq!(violations[0].kind, ViolationKind::TooClose);
    assert_eq!(violations[0].required, 127_000);
    assert_eq!(violations[0].measured, None);
    assert_eq!(violations[0].object_count(), 2);
}

#[test]
fn test_thin_line() {
    let rules = DesignRules { min_wid: 6_000, ..lenient() };
    let mut board = Board::new("scenario b", LayerStack::two_layer()).with_rules(rules);
    board.add_line(0, line(0, 0, 1_000_000, 5_000)).unwrap();

    let (count, log) = check(&mut board);

    assert_eq!(count, 1);
    let violations: Vec<_> = log.counted().collect();
    assert_eq!(violations[0].title, "Line width is too thin");
    assert_eq!(violations[0].measured, Some(5_000));
    assert_eq!(violations[0].required, 6_000);
}

#[test]
fn test_via_ring_too_small() {
    let rules = DesignRules { min_ring: 1_000, ..lenient() };
    let mut board = Board::new("scenario c", LayerStack::two_layer()).with_rules(rules);
    board.add_via(Via::new(Point::new(0, 0), 2_000, 0, 1_000)).unwrap();

    let (count, log) = check(&mut board);

    assert_eq!(count, 1);
    let rings: Vec<_> = log.titled("Via annular ring too small").collect();
    assert_eq!(rings.len(), 1);
    assert_eq!(rings[0].measured, Some(500));
    assert_eq!(rings[0].required, 1_000);
}

#[test]
fn test_empty_board_reports_only_notice() {
    let mut board = Board::new("scenario d", LayerStack::two_layer());

    let (count, log) = check(&mut board);

    assert_eq!(count, 0);
    assert_eq!(log.violations().len(), 1);
    assert!(log.violations()[0].is_notice());
}

#[test]
fn test_violation_names_the_pin_not_its_element() {
    let rules = DesignRules { bloat: 10_000, ..lenient() };
    let mut board = Board::new("identity", LayerStack::two_layer()).with_rules(rules);
    let element = board.add_element(
        Element::new("J1", Point::new(0, 0)).with_pin(Pin::new("1", Point::new(0, 0), 100_000, 0, 40_000)),
    );
    let trace = board.add_line(0, line(60_000, -500_000, 500_000, 10_000)).unwrap();
    let pin = board.pin_ref(0, 0).unwrap();
    let pin_id = board.object_id(pin).unwrap();
    let element_id = board.object_id(element).unwrap();
    let trace_id = board.object_id(trace).unwrap();

    let (count, log) = check(&mut board);

    assert_eq!(count, 1);
    let violation = log.titled("Copper areas too close").next().expect("No clearance violation");
    assert_eq!(violation.objects, vec![(pin_id, ObjectKind::Pin), (trace_id, ObjectKind::Line)]);
    assert!(violation.objects.iter().all(|&(id, _)| id != element_id));
}

#[test]
fn test_repeated_runs_report_identically() {
    let rules = DesignRules { bloat: 10_000, min_wid: 50_000, min_ring: 1_000, ..lenient() };
    let mut board = spaced_pairs(rules);
    board.add_line(1, line(0, 0, 1_000_000, 20_000)).unwrap();
    board.add_via(Via::new(Point::new(0, 9_000_000), 2_000, 0, 1_000)).unwrap();

    let (first_count, first) = check(&mut board);
    let (second_count, second) = check(&mut board);

    assert_eq!(first_count, 4);
    assert_eq!(first_count, second_count);
    assert_eq!(first.violations(), second.violations());
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_bloat_violations_grow_with_bloat() {
    let title = "Copper areas too close";
    let mut previous: BTreeSet<Vec<u64>> = BTreeSet::new();
    for (bloat, expected) in [(500, 0), (2_000, 1), (10_000, 2), (50_000, 3)] {
        let mut board = spaced_pairs(DesignRules { bloat, ..lenient() });
        let (count, log) = check(&mut board);
        let current = implicated(&log, title);

        assert_eq!(count, expected, "bloat {}", bloat);
        assert_eq!(current.len(), expected as usize);
        assert!(previous.is_subset(&current), "bloat {} lost a violation", bloat);
        previous = current;
    }
}

#[test]
fn test_shrink_violations_grow_with_shrink() {
    let title = "Potential for broken trace";
    let mut previous: BTreeSet<Vec<u64>> = BTreeSet::new();
    for (shrink, expected) in [(5_000, 0), (20_000, 1), (60_000, 2)] {
        let mut board = butted_pairs(DesignRules { shrink, ..lenient() });
        let (count, log) = check(&mut board);
        let current = implicated(&log, title);

        assert_eq!(count, expected, "shrink {}", shrink);
        assert_eq!(current.len(), expected as usize);
        assert!(log.titled(title).all(|v| v.required == shrink && v.kind == ViolationKind::BrokenTrace));
        assert!(previous.is_subset(&current), "shrink {} lost a violation", shrink);
        previous = current;
    }
}

#[test]
fn test_abort_returns_negative_count_and_keeps_highlight() {
    let mut board = spaced_pairs(DesignRules { bloat: 50_000, ..lenient() });
    let mut log = ViolationLog::abort_after(2);
    let mut undo = FlagUndoLog::new();

    let count = run_drc(&mut board, &mut log, &mut undo);

    assert_eq!(count, -2);
    assert_eq!(log.counted().count(), 2);
    let second = log.counted().nth(1).unwrap();
    let highlighted: Vec<u64> = board
        .objects_with_flag(ObjectFlags::SELECTED)
        .into_iter()
        .filter_map(|object| board.object_id(object))
        .collect();
    let mut reported: Vec<u64> = second.objects.iter().map(|&(id, _)| id).collect();
    reported.sort_unstable();
    assert_eq!(highlighted, reported);
    assert!(board.objects_with_flag(ObjectFlags::DRC).is_empty());
    assert!(board.objects_with_flag(ObjectFlags::FOUND).is_empty());
}

#[test]
fn test_undo_restores_flags_from_before_the_run() {
    let rules = DesignRules { bloat: 10_000, min_wid: 50_000, ..lenient() };
    let mut board = spaced_pairs(rules);
    let thin = board.add_line(1, line(0, 0, 1_000_000, 20_000)).unwrap();
    let mut undo = FlagUndoLog::new();
    find_connections(&mut board, ObjectRef::Line { layer: 0, index: 0 }, false, false, &mut undo).unwrap();
    board.set_flags(thin, ObjectFlags::SELECTED);
    let before = board.flag_snapshot();

    let mut log = ViolationLog::new();
    let count = run_drc(&mut board, &mut log, &mut undo);
    assert_eq!(count, 3);
    let scratch = ObjectFlags::FOUND | ObjectFlags::SELECTED | ObjectFlags::DRC;
    assert!(board.flag_snapshot().iter().all(|(_, flags)| !flags.intersects(scratch)));

    undo.undo_last(&mut board);
    assert_eq!(board.flag_snapshot(), before);
}

#[test]
fn test_no_drc_layer_is_skipped() {
    let layers = vec![Layer::copper("top", 0).without_drc(), Layer::copper("bottom", 1)];
    let stack = LayerStack::new(layers, vec!["top".into(), "bottom".into()], 0, 1).unwrap();
    let rules = DesignRules { min_wid: 50_000, ..lenient() };
    let mut board = Board::new("no drc", stack).with_rules(rules);
    board.add_line(0, line(0, 0, 1_000_000, 20_000)).unwrap();
    let checked = board.add_line(1, line(0, 0, 1_000_000, 20_000)).unwrap();
    let checked_id = board.object_id(checked).unwrap();

    let (count, log) = check(&mut board);

    assert_eq!(count, 1);
    let violation = log.counted().next().unwrap();
    assert_eq!(violation.objects, vec![(checked_id, ObjectKind::Line)]);
}

#[test]
fn test_silk_checks_follow_copper_checks() {
    let rules = DesignRules { min_wid: 50_000, min_slk: 30_000, ..lenient() };
    let mut board = Board::new("silk", LayerStack::two_layer()).with_rules(rules);
    board.add_element(
        Element::new("U1", Point::new(0, 0))
            .with_silk_line(Point::new(0, 0), Point::new(100_000, 0), 10_000)
            .with_silk_line(Point::new(0, 0), Point::new(0, 100_000), 40_000),
    );
    board.add_line(2, line(0, 0, 1_000_000, 10_000)).unwrap();
    board.add_line(0, line(3_000_000, 0, 1_000_000, 20_000)).unwrap();

    let (count, log) = check(&mut board);

    assert_eq!(count, 3);
    let titles: Vec<&str> = log.counted().map(|v| v.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Line width is too thin", "Silk line is too thin", "Element U1 has 1 silk lines which are too thin"]
    );
    assert_eq!(log.counted().last().unwrap().measured, Some(1));
}

#[test]
fn test_chain_of_nets_reports_each_neighbour_pair_once() {
    // 5 000 nm gaps between neighbours, 110 000 nm between the outer pins
    let (mut board, ids) = pin_row("chain", &[0, 105_000, 210_000], DesignRules { bloat: 10_000, ..lenient() });

    let (count, log) = check(&mut board);

    assert_eq!(count, 2);
    let pairs: Vec<_> = log.titled("Copper areas too close").map(|v| v.objects.clone()).collect();
    assert_eq!(
        pairs,
        vec![
            vec![(ids[0], ObjectKind::Pin), (ids[1], ObjectKind::Pin)],
            vec![(ids[1], ObjectKind::Pin), (ids[2], ObjectKind::Pin)],
        ]
    );
}

#[test]
fn test_seed_with_two_close_nets_reports_both_from_the_seed() {
    // the first pin sits between the other two, which are far apart
    let (mut board, ids) = pin_row("branch", &[0, -105_000, 105_000], DesignRules { bloat: 10_000, ..lenient() });

    let (count, log) = check(&mut board);

    assert_eq!(count, 2);
    let violations: Vec<_> = log.titled("Copper areas too close").collect();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v.objects[0] == (ids[0], ObjectKind::Pin)));
    let others: BTreeSet<u64> = violations.iter().map(|v| v.objects[1].0).collect();
    assert_eq!(others, BTreeSet::from([ids[1], ids[2]]));
}

#[test]
fn test_abort_on_the_notice_is_ignored() {
    let mut board = spaced_pairs(DesignRules { bloat: 2_000, ..lenient() });
    let mut log = ViolationLog::abort_after(0);
    let mut undo = FlagUndoLog::new();

    let count = run_drc(&mut board, &mut log, &mut undo);

    // the run goes on past the notice and stops at the first real violation
    assert_eq!(count, -1);
    assert!(log.violations()[0].is_notice());
    assert_eq!(log.counted().count(), 1);
}
