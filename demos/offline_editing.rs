//! Simple standalone example of offline editing and merging.
//!
//! Alice and Bob edit the same document while disconnected, delete and
//! restore text concurrently, then exchange operation logs.
//!
//! Run with: cargo run --example offline_editing

use crdt_replica::{Crdt, ReplicatedOrderedTree, TreeError};

fn main() -> Result<(), TreeError> {
    println!("=== Offline Editing Example ===\n");

    let mut alice = ReplicatedOrderedTree::new("alice");
    let mut bob = ReplicatedOrderedTree::new("bob");

    // Alice types the shared starting text and Bob receives it
    for (i, ch) in "Hello".chars().enumerate() {
        alice.insert_at(i, ch, "char")?;
    }
    bob.merge(&alice);
    println!("Shared start:   '{}'", bob.text());

    // Offline: Alice appends, Bob prepends and deletes the 'H'
    for (i, ch) in " world".chars().enumerate() {
        alice.insert_at(5 + i, ch, "char")?;
    }
    for (i, ch) in "Oh, ".chars().enumerate() {
        bob.insert_at(i, ch, "char")?;
    }
    if let Some(h) = bob.find_visible(&'H') {
        bob.delete(&h)?;
        bob.insert_after(&h, 'h', "char")?;
    }

    println!("\n--- Before Synchronization ---");
    println!("  Alice sees: '{}'", alice.text());
    println!("  Bob sees:   '{}'", bob.text());

    // Exchange logs; Bob's side reports where each remote change lands
    println!("\n--- Synchronizing Changes ---");
    bob.merge_with(&alice, |op, anchor| {
        let anchor = anchor.map(ToString::to_string).unwrap_or_else(|| "front".into());
        println!("  bob applied {} {} after {}", op.kind_name(), op.id(), anchor);
    });
    alice.merge(&bob);

    println!("\n--- After Synchronization ---");
    println!("  Alice sees: '{}'", alice.text());
    println!("  Bob sees:   '{}'", bob.text());
    assert_eq!(alice.text(), bob.text());
    assert_eq!(alice.text(), "Oh, hello world");

    println!("\n✅ Both replicas converged");
    Ok(())
}
