use std::sync::Arc;

use ai_core::{BbKey, BbValue, Blackboard, BlackboardError, Effects};
use proptest::prelude::*;

const HEALTH: BbKey<u32> = BbKey::new("health");
const NAME: BbKey<String> = BbKey::new("name");
const SIGNED: BbKey<i32> = BbKey::new("health");
const SHARED: BbKey<Arc<Vec<u32>>> = BbKey::new("shared");

#[test]
fn blackboard_set_get_remove_roundtrip() {
    let mut bb = Blackboard::new();
    assert!(!bb.contains(HEALTH));

    bb.set(HEALTH, 123);
    bb.set(NAME, "hello".to_string());

    assert_eq!(bb.get(HEALTH).copied(), Some(123));
    assert_eq!(bb.get(NAME).map(|s| s.as_str()), Some("hello"));
    assert!(bb.contains_key("name"));

    assert_eq!(bb.remove(HEALTH), Some(123));
    assert_eq!(bb.get(HEALTH), None);
    assert_eq!(bb.keys().collect::<Vec<_>>(), vec!["name"]);
}

#[test]
#[should_panic(expected = "blackboard type mismatch")]
fn blackboard_type_mismatch_panics() {
    let mut bb = Blackboard::new();
    bb.set(HEALTH, 1u32);
    let _ = bb.get(SIGNED);
}

#[test]
fn try_get_reports_type_mismatch() {
    let mut bb = Blackboard::new();
    bb.set(HEALTH, 1u32);

    let err = bb.try_get(SIGNED).unwrap_err();
    assert!(matches!(err, BlackboardError::TypeMismatch { ref key, .. } if key == "health"));
    assert_eq!(bb.try_get(NAME), Ok(None));
}

#[test]
fn snapshot_is_independent_of_the_original() {
    let mut live = Blackboard::new();
    live.set(HEALTH, 10);

    let mut snapshot = live.snapshot();
    snapshot.set(HEALTH, 0);
    snapshot.set(NAME, "ghost".to_string());

    assert_eq!(live.get(HEALTH).copied(), Some(10));
    assert!(!live.contains(NAME));
    assert_eq!(snapshot.get(HEALTH).copied(), Some(0));
}

#[test]
fn snapshot_is_shallow_for_shared_handles() {
    let shared = Arc::new(vec![1, 2, 3]);
    let mut live = Blackboard::new();
    live.set(SHARED, Arc::clone(&shared));

    let snapshot = live.snapshot();
    let a = live.get(SHARED).unwrap();
    let b = snapshot.get(SHARED).unwrap();
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(Arc::strong_count(&shared), 3);
}

#[test]
fn apply_overwrites_with_captured_effects() {
    let mut bb = Blackboard::new();
    bb.set(HEALTH, 5);

    let mut effects = Effects::new().with(HEALTH, 7);
    effects.insert_value("target", BbValue::new(42u64));
    bb.apply(&effects);

    assert_eq!(bb.get(HEALTH).copied(), Some(7));
    assert_eq!(
        bb.value("target").and_then(|v| v.downcast_ref::<u64>()).copied(),
        Some(42)
    );
    assert_eq!(effects.len(), 2);
}

#[test]
fn get_mut_edits_in_place() {
    let mut bb = Blackboard::new();
    bb.set(NAME, "a".to_string());
    bb.get_mut(NAME).unwrap().push('b');
    assert_eq!(bb.get(NAME).map(String::as_str), Some("ab"));
}

proptest! {
    #[test]
    fn writes_to_a_snapshot_never_leak(
        initial in proptest::collection::btree_map("[a-z]{1,4}", any::<u32>(), 0..8),
        writes in proptest::collection::vec(("[a-z]{1,4}", any::<u32>()), 0..8),
    ) {
        let mut live = Blackboard::new();
        for (k, v) in &initial {
            live.set_value(k.clone(), BbValue::new(*v));
        }

        let mut snapshot = live.snapshot();
        for (k, v) in &writes {
            snapshot.set_value(k.clone(), BbValue::new(*v));
        }

        prop_assert_eq!(live.len(), initial.len());
        for (k, v) in &initial {
            let stored = live.value(k).and_then(|value| value.downcast_ref::<u32>()).copied();
            prop_assert_eq!(stored, Some(*v));
        }
    }
}
