use proptest::prelude::*;

use super::HistoryStack;

#[test]
fn push_evicts_oldest_at_capacity() {
    let mut history = HistoryStack::new(2);
    assert_eq!(history.push("A"), None);
    assert_eq!(history.push("B"), None);
    assert_eq!(history.push("C"), Some("A"));
    assert_eq!(history.undo_entries().copied().collect::<Vec<_>>(), vec!["B", "C"]);
}

#[test]
fn keeps_only_newest_entries() {
    let mut history = HistoryStack::new(20);
    for value in 0..25 {
        history.push(value);
    }
    assert_eq!(history.undo_len(), 20);
    assert_eq!(
        history.undo_entries().copied().collect::<Vec<_>>(),
        (5..25).collect::<Vec<_>>()
    );
}

#[test]
fn undo_on_empty_is_none() {
    let mut history = HistoryStack::<u32>::default();
    assert_eq!(history.max_size(), 20);
    assert_eq!(history.undo(7), None);
    assert_eq!(history.redo(7), None);
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn undo_then_redo_restores_current() {
    let mut history = HistoryStack::new(5);
    history.push("original");
    let current = "modified";
    let restored = history.undo(current).expect("undo");
    assert_eq!(restored, "original");
    assert!(history.can_redo());
    let again = history.redo(restored).expect("redo");
    assert_eq!(again, "modified");
    assert_eq!(history.undo_entries().copied().collect::<Vec<_>>(), vec!["original"]);
    assert!(!history.can_redo());
}

#[test]
fn push_clears_redo() {
    let mut history = HistoryStack::new(5);
    history.push(1);
    history.push(2);
    let current = history.undo(3).expect("undo");
    assert_eq!(current, 2);
    assert!(history.can_redo());
    history.push(current);
    assert!(!history.can_redo());
}

#[test]
fn zero_capacity_is_raised() {
    let mut history = HistoryStack::new(0);
    history.push(1);
    history.push(2);
    assert_eq!(history.undo_len(), 1);
}

#[derive(Debug, Clone)]
enum Action {
    Push,
    Undo,
    Redo,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Push), Just(Action::Undo), Just(Action::Redo)]
}

proptest! {
    #[test]
    fn stays_bounded_and_push_clears_redo(
        max_size in 1usize..8,
        actions in prop::collection::vec(action(), 0..64),
    ) {
        let mut history = HistoryStack::new(max_size);
        let mut current = 0u32;
        let mut next = 1u32;
        for action in actions {
            match action {
                Action::Push => {
                    history.push(current);
                    current = next;
                    next += 1;
                    prop_assert!(!history.can_redo());
                }
                Action::Undo => {
                    let before = current;
                    if let Some(previous) = history.undo(current) {
                        current = previous;
                        let replayed = history.redo(current).expect("redo after undo");
                        prop_assert_eq!(replayed, before);
                        current = history.undo(replayed).expect("undo again");
                    }
                }
                Action::Redo => {
                    if let Some(following) = history.redo(current) {
                        current = following;
                    }
                }
            }
            prop_assert!(history.undo_len() <= max_size);
            prop_assert!(history.undo_len() + history.redo_len() <= max_size);
        }
    }
}
