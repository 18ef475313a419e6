use super::*;
use crate::{CancellationToken, ForwardCursor, IndexedCancellationToken, SliceCursor};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::collections::LinkedList;
use std::panic::{self, AssertUnwindSafe};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Boom(usize);

impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boom at {}", self.0)
    }
}

impl std::error::Error for Boom {}

/// Callback that fails at `fail_at` and logs every success.
fn failing_at(
    fail_at: usize,
    log: &RefCell<Vec<String>>,
) -> impl FnMut(usize) -> Result<(), Boom> + '_ {
    move |i| {
        if i == fail_at {
            return Err(Boom(i));
        }
        log.borrow_mut().push(format!("f{i}"));
        Ok(())
    }
}

// === loop_with_cleanup ===

#[test]
fn success_runs_no_cleanup() {
    let cleaned = Cell::new(0);
    let mut visited = Vec::new();
    let result = loop_with_cleanup(
        0_usize,
        5,
        |i| {
            visited.push(i);
            Ok::<(), Boom>(())
        },
        |_| cleaned.set(cleaned.get() + 1),
    );
    assert_eq!(result, Ok(5));
    assert_eq!(visited, vec![0, 1, 2, 3, 4]);
    assert_eq!(cleaned.get(), 0);
}

#[test]
fn failure_rolls_back_prefix_in_order() {
    let log = RefCell::new(Vec::new());
    let result = loop_with_cleanup(0_usize, 10, failing_at(4, &log), |i| {
        log.borrow_mut().push(format!("c{i}"));
    });

    assert_eq!(
        result,
        Err(RolledBack {
            rolled_back: 4,
            error: Boom(4),
        })
    );
    assert_eq!(
        log.into_inner(),
        vec!["f0", "f1", "f2", "f3", "c0", "c1", "c2", "c3"]
    );
}

#[test]
fn failure_on_first_element_cleans_nothing() {
    let log = RefCell::new(Vec::new());
    let result = loop_with_cleanup(0_usize, 10, failing_at(0, &log), |i| {
        log.borrow_mut().push(format!("c{i}"));
    });
    assert_eq!(result.map_err(|e| e.rolled_back()), Err(0));
    assert!(log.into_inner().is_empty());
}

#[test]
fn rollback_is_local_to_the_sub_range() {
    let log = RefCell::new(Vec::new());
    let result = loop_with_cleanup(20_usize, 30, failing_at(22, &log), |i| {
        log.borrow_mut().push(format!("c{i}"));
    });
    assert_eq!(result.map_err(RolledBack::into_error), Err(Boom(22)));
    assert_eq!(log.into_inner(), vec!["f20", "f21", "c20", "c21"]);
}

#[test]
fn forward_cursor_rollback() {
    let list: LinkedList<u8> = (1..=6).collect();
    let cleaned = RefCell::new(Vec::new());
    let result = loop_with_cleanup(
        ForwardCursor::new(list.iter()),
        ForwardCursor::end(list.iter()),
        |c| if *c.get() == 5 { Err("five") } else { Ok(()) },
        |c| cleaned.borrow_mut().push(*c.get()),
    );
    assert_eq!(result.map_err(|e| e.rolled_back()), Err(4));
    assert_eq!(cleaned.into_inner(), vec![1, 2, 3, 4]);
}

// === loop_with_cleanup_n ===

#[test]
fn count_form_returns_advanced_position() {
    let result = loop_with_cleanup_n(7_usize, 3, |_| Ok::<(), Boom>(()), |_| {});
    assert_eq!(result, Ok(10));
}

#[test]
fn count_form_rolls_back_exactly_m() {
    let log = RefCell::new(Vec::new());
    let result = loop_with_cleanup_n(0_usize, 8, failing_at(6, &log), |i| {
        log.borrow_mut().push(format!("c{i}"));
    });
    assert_eq!(result.map_err(|e| e.rolled_back()), Err(6));
    let cleanups = log.into_inner().iter().filter(|l| l.starts_with('c')).count();
    assert_eq!(cleanups, 6);
}

#[test]
fn count_form_zero_is_a_no_op() {
    let result = loop_with_cleanup_n(3_usize, 0, |_| Err(Boom(0)), |_| {});
    assert_eq!(result, Ok(3));
}

// === destination forms ===

#[test]
fn into_form_rolls_back_destination_positions() {
    let src = [1, 2, 3, 4, 5];
    let mut out = vec![0; 5];
    let cells = Cell::from_mut(out.as_mut_slice()).as_slice_of_cells();

    let result = loop_with_cleanup_into(
        SliceCursor::new(&src),
        SliceCursor::end(&src),
        SliceCursor::new(cells),
        |s, d| {
            if *s.get() == 4 {
                return Err(Boom(3));
            }
            d.get().set(*s.get() * 10);
            Ok(())
        },
        |d| d.get().set(-1),
    );
    let rolled_back = result.err().map(|e| e.rolled_back());

    assert_eq!(rolled_back, Some(3));
    assert_eq!(out, vec![-1, -1, -1, 0, 0]);
}

#[test]
fn into_form_success_returns_destination_end() {
    let src = [1, 2, 3];
    let mut out = vec![0; 4];
    let cells = Cell::from_mut(out.as_mut_slice()).as_slice_of_cells();

    let dest = loop_with_cleanup_n_into(
        SliceCursor::new(&src),
        3,
        SliceCursor::new(cells),
        |s, d| {
            d.get().set(*s.get() + 1);
            Ok::<(), Boom>(())
        },
        |d| d.get().set(0),
    )
    .map(|d| d.pos());

    assert_eq!(dest, Ok(3));
    assert_eq!(out, vec![2, 3, 4, 0]);
}

// === token forms ===

#[test]
fn failure_cancels_token_before_cleanup() {
    let token = CancellationToken::new();
    let cancelled_during_cleanup = Cell::new(true);
    let log = RefCell::new(Vec::new());

    let result = loop_with_cleanup_n_with_token(0_usize, 10, &token, failing_at(5, &log), |_| {
        cancelled_during_cleanup.set(cancelled_during_cleanup.get() && token.was_cancelled());
    });

    assert_eq!(result.map_err(|e| e.rolled_back()), Err(5));
    assert!(token.was_cancelled());
    assert!(cancelled_during_cleanup.get());
}

#[test]
fn failure_cancels_indexed_token_with_zero_limit() {
    let token = IndexedCancellationToken::new(0);
    let log = RefCell::new(Vec::new());
    let result = loop_with_cleanup_n_with_token(0_usize, 4, &token, failing_at(2, &log), |_| {});
    assert_eq!(result.map_err(|e| e.rolled_back()), Err(2));
    assert!(token.was_cancelled());
}

#[test]
fn precancelled_token_processes_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let calls = Cell::new(0);
    let result = loop_with_cleanup_n_with_token(
        0_usize,
        10,
        &token,
        |_| {
            calls.set(calls.get() + 1);
            Ok::<(), Boom>(())
        },
        |_| calls.set(calls.get() + 100),
    );
    assert_eq!(result, Ok(0));
    assert_eq!(calls.get(), 0);
}

#[test]
fn sibling_cancellation_is_not_a_failure() {
    let token = CancellationToken::new();
    let cleaned = Cell::new(0);
    let src = [1, 2, 3, 4, 5, 6];
    let mut out = vec![0; 6];
    let cells = Cell::from_mut(out.as_mut_slice()).as_slice_of_cells();

    let result = loop_with_cleanup_n_into_with_token(
        SliceCursor::new(&src),
        6,
        SliceCursor::new(cells),
        &token,
        |s, d| {
            d.get().set(*s.get());
            if *s.get() == 2 {
                // Another worker failed.
                token.cancel();
            }
            Ok::<(), Boom>(())
        },
        |_| cleaned.set(cleaned.get() + 1),
    )
    .map(|d| d.pos());

    assert_eq!(result, Ok(2));
    assert_eq!(cleaned.get(), 0);
    assert_eq!(out, vec![1, 2, 0, 0, 0, 0]);
}

// === panics ===

#[test]
fn panic_rolls_back_and_cancels() {
    let token = CancellationToken::new();
    let cleaned = RefCell::new(Vec::new());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        loop_with_cleanup_n_with_token(
            0_usize,
            10,
            &token,
            |i| {
                assert!(i != 3, "callback exploded");
                Ok::<(), Boom>(())
            },
            |i| cleaned.borrow_mut().push(i),
        )
    }));

    assert!(outcome.is_err());
    assert!(token.was_cancelled());
    assert_eq!(cleaned.into_inner(), vec![0, 1, 2]);
}

#[test]
fn panic_without_token_still_rolls_back() {
    let cleaned = RefCell::new(Vec::new());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        loop_with_cleanup(
            10_usize,
            20,
            |i| {
                assert!(i < 12, "callback exploded");
                Ok::<(), Boom>(())
            },
            |i| cleaned.borrow_mut().push(i),
        )
    }));
    assert!(outcome.is_err());
    assert_eq!(cleaned.into_inner(), vec![10, 11]);
}

// === RolledBack ===

#[test]
fn rolled_back_display_and_source() {
    let err = RolledBack {
        rolled_back: 2,
        error: Boom(7),
    };
    assert_eq!(
        err.to_string(),
        "sub-range failed after 2 element(s); partial work rolled back: boom at 7"
    );
    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source, Some("boom at 7".to_string()));
    assert_eq!(err.error(), &Boom(7));
}

mod proptest_rollback {
    use super::super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;

    proptest! {
        #[test]
        fn cleanup_runs_exactly_m_times(
            (count, fail_at) in (1usize..300).prop_flat_map(|n| (Just(n), 0..n))
        ) {
            let calls = RefCell::new(0usize);
            let cleaned = RefCell::new(Vec::new());
            let result = loop_with_cleanup_n(
                0usize,
                count,
                |i| {
                    *calls.borrow_mut() += 1;
                    if i == fail_at { Err(i) } else { Ok(()) }
                },
                |i| cleaned.borrow_mut().push(i),
            );

            prop_assert_eq!(result.map_err(|e| e.rolled_back()), Err(fail_at));
            prop_assert_eq!(calls.into_inner(), fail_at + 1);
            prop_assert_eq!(cleaned.into_inner(), (0..fail_at).collect::<Vec<_>>());
        }
    }
}
