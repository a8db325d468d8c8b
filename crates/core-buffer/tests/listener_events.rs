//! Change-listener fan-out: spans, ordering, and registration lifetime.

use std::cell::RefCell;
use std::rc::Rc;

use core_buffer::{Buffer, BufferFlags, ChangeListener, Coord};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Insert { begin: Coord, end: Coord },
    Erase { begin: Coord, end: Coord },
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl ChangeListener for Recorder {
    fn on_insert(&self, _buffer: &Buffer, begin: Coord, end: Coord) {
        self.events.borrow_mut().push(Event::Insert { begin, end });
    }

    fn on_erase(&self, _buffer: &Buffer, begin: Coord, end: Coord) {
        self.events.borrow_mut().push(Event::Erase { begin, end });
    }
}

fn buffer(lines: &[&str]) -> Buffer {
    Buffer::new(
        "*test*",
        BufferFlags::empty(),
        lines.iter().map(|s| s.to_string()).collect(),
    )
}

fn attach(buffer: &Buffer) -> (Rc<Recorder>, Rc<dyn ChangeListener>) {
    let recorder = Rc::new(Recorder::default());
    let listener: Rc<dyn ChangeListener> = recorder.clone();
    buffer.add_listener(&listener);
    (recorder, listener)
}

#[test]
fn insert_reports_the_inserted_span() {
    let b = buffer(&["hello world\n"]);
    let (recorder, listener) = attach(&b);
    let mut b = b;
    b.insert(Coord::new(0, 5), "\nthere");

    assert_eq!(
        recorder.take(),
        vec![Event::Insert {
            begin: Coord::new(0, 5),
            end: Coord::new(1, 5),
        }]
    );
    // the span is addressable in the post-insert text
    assert_eq!(b.string(Coord::new(0, 5), Coord::new(1, 5)), "\nthere");
    b.remove_listener(&listener);
}

#[test]
fn insert_at_end_reports_the_appended_lines() {
    let b = buffer(&["ab\n"]);
    let (recorder, listener) = attach(&b);
    let mut b = b;
    b.insert(b.end_coord(), "cd");

    assert_eq!(
        recorder.take(),
        vec![Event::Insert {
            begin: Coord::new(1, 0),
            end: Coord::new(1, 3),
        }]
    );
    b.remove_listener(&listener);
}

#[test]
fn erase_reports_the_removed_range() {
    let b = buffer(&["abc\n", "def\n"]);
    let (recorder, listener) = attach(&b);
    let mut b = b;
    b.erase(Coord::new(0, 1), Coord::new(1, 2));

    assert_eq!(
        recorder.take(),
        vec![Event::Erase {
            begin: Coord::new(0, 1),
            end: Coord::new(1, 2),
        }]
    );
    b.remove_listener(&listener);
}

#[test]
fn undo_delivers_the_inverse_sequence() {
    let mut b = buffer(&["abcdef\n"]);
    b.insert(Coord::new(0, 0), "XY");
    b.erase(Coord::new(0, 6), Coord::new(0, 8));
    b.commit_undo_group();

    let (recorder, listener) = attach(&b);
    assert!(b.undo());
    let events = recorder.take();
    // the committed group is [insert XY, erase ef]; its undo replays the
    // inverses in reverse order: re-insert first, remove XY second
    assert_eq!(
        events,
        vec![
            Event::Insert {
                begin: Coord::new(0, 6),
                end: Coord::new(0, 8),
            },
            Event::Erase {
                begin: Coord::new(0, 0),
                end: Coord::new(0, 2),
            },
        ]
    );

    assert!(b.redo());
    let events = recorder.take();
    assert_eq!(
        events,
        vec![
            Event::Insert {
                begin: Coord::new(0, 0),
                end: Coord::new(0, 2),
            },
            Event::Erase {
                begin: Coord::new(0, 6),
                end: Coord::new(0, 8),
            },
        ]
    );
    b.remove_listener(&listener);
}

#[test]
fn deregistered_listener_stops_receiving() {
    let b = buffer(&["ab\n"]);
    let (recorder, listener) = attach(&b);
    let mut b = b;
    b.insert(Coord::new(0, 0), "x");
    assert_eq!(recorder.take().len(), 1);

    b.remove_listener(&listener);
    b.insert(Coord::new(0, 0), "y");
    assert!(recorder.take().is_empty());
    assert_eq!(b.listener_count(), 0);
}

#[test]
fn dropped_listener_is_pruned() {
    let b = buffer(&["ab\n"]);
    let (recorder, listener) = attach(&b);
    assert_eq!(b.listener_count(), 1);

    drop(listener);
    drop(recorder);
    assert_eq!(b.listener_count(), 0);

    let mut b = b;
    b.insert(Coord::new(0, 0), "x"); // fan-out over an empty set
    assert_eq!(b.text(), "xab\n");
}

#[test]
fn multiple_listeners_observe_the_same_edit() {
    let b = buffer(&["ab\n"]);
    let (first, first_handle) = attach(&b);
    let (second, second_handle) = attach(&b);
    assert_eq!(b.listener_count(), 2);

    let mut b = b;
    b.erase(Coord::new(0, 0), Coord::new(0, 1));
    assert_eq!(first.take(), second.take());

    b.remove_listener(&first_handle);
    b.remove_listener(&second_handle);
}
