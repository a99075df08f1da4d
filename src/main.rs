//! Offline replication demo.
//!
//! Simulates a handful of replicas that edit a shared document, a shared
//! board and a shared counter while disconnected, then synchronize by
//! exchanging their operation logs as JSON.
//!
//! Configuration comes from the environment:
//!
//! - `RUST_LOG` sets the log filter (default `info`)
//! - `DEMO_REPLICAS` lists replica names, comma separated (default
//!   `alice,bob,carol`)

use anyhow::{Context, Result, ensure};
use serde_json::{Value, json};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crdt_replica::{
    Crdt, Operation, OperationId, PNCounter, PropertyChange, ReplicatedOrderedTree,
    ReplicatedRegisterMap,
};

const DEFAULT_REPLICAS: &str = "alice,bob,carol";

struct Replica {
    name: String,
    document: ReplicatedOrderedTree<char>,
    board: ReplicatedRegisterMap<Value>,
    likes: PNCounter,
}

impl Replica {
    fn new(name: &str) -> Self {
        let mut board = ReplicatedRegisterMap::new(name);
        let owner = name.to_string();
        board.subscribe(move |changes: &[PropertyChange<Value>]| {
            for change in changes {
                debug!(
                    "[{}] {}.{} = {}",
                    owner, change.entity_id, change.property_name, change.value
                );
            }
        });

        Replica {
            name: name.to_string(),
            document: ReplicatedOrderedTree::new(name),
            board,
            likes: PNCounter::new(),
        }
    }

    /// Local edits made while offline.
    fn edit_offline(&mut self, ordinal: usize) -> Result<()> {
        let mut anchor = OperationId::ROOT;
        for ch in format!("{} ", self.name).chars() {
            anchor = self.document.insert_after(&anchor, ch, "char")?.id().clone();
        }

        self.board.set_pending("note", "exists", json!(true));
        self.board.set_pending("note", "color", json!(self.name));
        self.board
            .set_pending("note", "position", json!({ "x": ordinal * 10, "y": 0 }));
        self.board.apply_pending();

        for _ in 0..=ordinal {
            self.likes.increment(&self.name);
        }
        if ordinal % 2 == 1 {
            self.likes.decrement(&self.name);
        }

        info!(
            "[{}] offline: document={:?} likes={}",
            self.name,
            self.document.text(),
            self.likes.value()
        );
        Ok(())
    }

    fn export(&self) -> Result<(String, String)> {
        let document = serde_json::to_string(self.document.operations())
            .context("serializing document log")?;
        let board =
            serde_json::to_string(self.board.operations()).context("serializing board log")?;
        Ok((document, board))
    }

    fn import(&mut self, from: &str, document: &str, board: &str) -> Result<()> {
        let document_ops: Vec<Operation<char>> =
            serde_json::from_str(document).context("parsing document log")?;
        let board_ops: Vec<Operation<Value>> =
            serde_json::from_str(board).context("parsing board log")?;

        let name = &self.name;
        let applied = self.document.execute_operations(document_ops, |op, anchor| {
            let anchor = anchor.map(ToString::to_string).unwrap_or_else(|| "front".into());
            debug!("[{}] applied {} {} after {}", name, op.kind_name(), op.id(), anchor);
        });
        let changes = self.board.apply_operations(board_ops);

        info!(
            "[{}] merged from {}: {} document ops, {} board changes",
            self.name,
            from,
            applied,
            changes.len()
        );
        Ok(())
    }
}

fn replica_names() -> Vec<String> {
    std::env::var("DEMO_REPLICAS")
        .unwrap_or_else(|_| DEFAULT_REPLICAS.to_string())
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let names = replica_names();
    ensure!(names.len() >= 2, "DEMO_REPLICAS needs at least two replica names");
    info!("Starting offline replication demo with replicas {:?}", names);

    let mut replicas: Vec<Replica> = names.iter().map(|name| Replica::new(name)).collect();
    for (ordinal, replica) in replicas.iter_mut().enumerate() {
        replica.edit_offline(ordinal)?;
    }

    // Every replica ships its full log to every other replica.
    let exports = replicas
        .iter()
        .map(|replica| Ok((replica.name.clone(), replica.export()?)))
        .collect::<Result<Vec<_>>>()?;
    let counters: Vec<PNCounter> = replicas.iter().map(|r| r.likes.clone()).collect();

    for replica in &mut replicas {
        for ((from, (document, board)), likes) in exports.iter().zip(&counters) {
            if *from != replica.name {
                replica.import(from, document, board)?;
                replica.likes.merge(likes);
            }
        }
    }

    for replica in &replicas {
        info!(
            "[{}] document={:?} note.color={} likes={}",
            replica.name,
            replica.document.text(),
            replica
                .board
                .get("note", "color")
                .map(ToString::to_string)
                .unwrap_or_default(),
            replica.likes.value()
        );
        replica.document.dump_nodes();
    }

    let first = &replicas[0];
    let converged = replicas.iter().all(|replica| {
        replica.document.flatten() == first.document.flatten()
            && replica.document.text() == first.document.text()
            && replica.board.get("note", "color") == first.board.get("note", "color")
            && replica.likes == first.likes
    });
    ensure!(converged, "replicas diverged after exchanging logs");

    info!("All {} replicas converged", replicas.len());
    Ok(())
}
