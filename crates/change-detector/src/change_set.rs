//! Turning raw diff operations into a field-level change set.
//!
//! Only edits to fields that already held a value count as changes:
//! bookkeeping subtrees are ignored and pure insertions are dropped.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::diff::{self, Operation, OperationKind};
use crate::pointer;

/// Top-level fields maintained by the cluster itself (resource versions,
/// timestamps, managed fields, computed status).
pub const BOOKKEEPING_ROOTS: [&str; 2] = ["metadata", "status"];

/// Old and new value of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Pointer path to field change, ordered by path.
pub type ChangeSet = BTreeMap<String, FieldChange>;

pub fn is_bookkeeping(path: &str) -> bool {
    pointer::first_segment(path)
        .is_some_and(|segment| BOOKKEEPING_ROOTS.contains(&segment.as_ref()))
}

/// Drop every operation under a bookkeeping root.
pub fn filter_bookkeeping(ops: Vec<Operation>) -> Vec<Operation> {
    ops.into_iter().filter(|op| !is_bookkeeping(&op.path)).collect()
}

/// Resolve old and new values for replacements and shifted insertions.
///
/// Entries whose old value is null or absent are skipped: the field did not
/// exist before, so this is an insertion rather than a change.
pub fn resolve(ops: &[Operation], prior: &Value, incoming: &Value) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for op in ops {
        let tracked = match op.kind {
            OperationKind::Replace => true,
            OperationKind::Add => op.previous.is_some(),
            OperationKind::Remove => false,
        };
        if !tracked {
            continue;
        }
        let old = match prior.pointer(&op.path) {
            None | Some(Value::Null) => continue,
            Some(old) => old.clone(),
        };
        let new = incoming.pointer(&op.path).cloned().unwrap_or(Value::Null);
        changes.insert(op.path.clone(), FieldChange { old, new });
    }
    changes
}

/// Field-level changes between two snapshots, `None` when nothing relevant
/// changed.
pub fn compute(prior: &Value, incoming: &Value) -> Option<ChangeSet> {
    let relevant = filter_bookkeeping(diff::diff(prior, incoming));
    if relevant.is_empty() {
        return None;
    }
    let changes = resolve(&relevant, prior, incoming);
    if changes.is_empty() { None } else { Some(changes) }
}
