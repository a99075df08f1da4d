//! Integration tests for the last-writer-wins register map.

use std::cell::RefCell;
use std::rc::Rc;

use crdt_replica::{Crdt, Operation, OperationId, PropertyChange, ReplicatedRegisterMap};
use serde_json::{Value, json};

fn write(counter: u64, replica: &str, entity: &str, property: &str, value: Value) -> Operation<Value> {
    Operation::SetProperty {
        id: OperationId::new(counter, replica),
        entity_id: entity.to_string(),
        property_name: property.to_string(),
        value,
    }
}

fn state(map: &ReplicatedRegisterMap<Value>) -> Vec<(String, String, Value, OperationId)> {
    map.entries()
        .map(|(entity, property, entry)| {
            (
                entity.to_string(),
                property.to_string(),
                entry.value.clone(),
                entry.winner_id.clone(),
            )
        })
        .collect()
}

#[test]
fn test_concurrent_color_writes_converge_to_highest_id() {
    let lower = write(4, "A", "shape-1", "color", json!("red"));
    let higher = write(7, "B", "shape-1", "color", json!("blue"));

    let mut a = ReplicatedRegisterMap::new("A");
    let mut b = ReplicatedRegisterMap::new("B");
    a.apply_operations([lower.clone()]);
    b.apply_operations([higher.clone()]);

    a.apply_operations([higher]);
    b.apply_operations([lower]);

    assert_eq!(a.get("shape-1", "color"), Some(&json!("blue")));
    assert_eq!(b.get("shape-1", "color"), Some(&json!("blue")));
    assert_eq!(
        a.entry("shape-1", "color").unwrap().winner_id,
        OperationId::new(7, "B")
    );
}

#[test]
fn test_merge_replays_peer_log() {
    let mut a = ReplicatedRegisterMap::new("A");
    let mut b = ReplicatedRegisterMap::new("B");

    a.set("note", "exists", json!(true));
    a.set("note", "position", json!({ "x": 1, "y": 2 }));
    b.set("note", "position", json!({ "x": 5, "y": 5 }));
    b.set("note", "size", json!(12));

    a.merge(&b);
    b.merge(&a);

    assert_eq!(state(&a), state(&b));
    // 2@B beats 2@A
    assert_eq!(a.get("note", "position"), Some(&json!({ "x": 5, "y": 5 })));
    assert_eq!(a.get("note", "exists"), Some(&json!(true)));
    assert_eq!(a.get("note", "size"), Some(&json!(12)));
}

#[test]
fn test_merge_is_commutative_associative_and_idempotent() {
    let build = |name: &str, writes: &[(&str, &str, Value)]| {
        let mut map = ReplicatedRegisterMap::new(name);
        for (entity, property, value) in writes {
            map.set(*entity, *property, value.clone());
        }
        map
    };
    let r1 = || build("A", &[("x", "color", json!("red")), ("y", "exists", json!(true))]);
    let r2 = || build("B", &[("x", "color", json!("green"))]);
    let r3 = || {
        build(
            "C",
            &[
                ("y", "exists", json!(false)),
                ("x", "color", json!("blue")),
                ("x", "size", json!(3)),
            ],
        )
    };

    // merge(merge(R1, R2), R3)
    let mut left = r1();
    left.merge(&r2());
    left.merge(&r3());

    // merge(R1, merge(R2, R3))
    let mut inner = r2();
    inner.merge(&r3());
    let mut right = r1();
    right.merge(&inner);

    let mut reversed = r3();
    reversed.merge(&r1());
    reversed.merge(&r2());

    assert_eq!(state(&left), state(&right));
    assert_eq!(state(&left), state(&reversed));
    assert_eq!(left.get("x", "color"), Some(&json!("blue")));

    let before = state(&left);
    left.merge(&r2());
    left.merge(&r3());
    assert_eq!(state(&left), before);
}

#[test]
fn test_listener_sees_existence_flip() {
    let log: Rc<RefCell<Vec<PropertyChange<Value>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);

    let mut renderer = ReplicatedRegisterMap::new("viewer");
    renderer.subscribe(move |changes: &[PropertyChange<Value>]| {
        sink.borrow_mut().extend_from_slice(changes);
    });

    let mut editor = ReplicatedRegisterMap::new("editor");
    editor.set("circle", "exists", json!(true));
    renderer.merge(&editor);

    editor.set("circle", "exists", json!(false));
    renderer.merge(&editor);

    let seen: Vec<Value> = log.borrow().iter().map(|c| c.value.clone()).collect();
    assert_eq!(seen, vec![json!(true), json!(false)]);
    assert!(log.borrow().iter().all(|c| c.entity_id == "circle"));
}

#[test]
fn test_operation_log_round_trips_through_json() {
    let mut a = ReplicatedRegisterMap::new("A");
    a.set("s", "color", json!("red"));
    a.set("s", "position", json!([3, 4]));

    let wire = serde_json::to_string(a.operations()).unwrap();
    let ops: Vec<Operation<Value>> = serde_json::from_str(&wire).unwrap();

    let mut b = ReplicatedRegisterMap::new("B");
    let changes = b.apply_operations(ops);
    assert_eq!(changes.len(), 2);
    assert_eq!(state(&a), state(&b));
}
