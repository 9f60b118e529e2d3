//! Structural diff between two JSON documents.
//!
//! Produces the add/remove/replace operations that turn a prior document into
//! an incoming one. Paths are JSON pointers: `remove` paths address the prior
//! document, `add` and `replace` paths address the incoming document.
//!
//! Arrays of equal length are compared position by position. When the length
//! changes, elements are aligned on equality (longest common subsequence) so a
//! single insertion or removal does not show up as a cascade of replacements.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::pointer;

/// Alignment tables larger than this fall back to positional comparison.
const MAX_ALIGNMENT_CELLS: usize = 250_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Replace,
}

/// One structural edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub path: String,
    /// Value previously at `path`. Set for `replace`, and for `add` when the
    /// insertion shifted an existing array element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Value>,
}

impl Operation {
    fn add(path: String, previous: Option<Value>) -> Self {
        Self { kind: OperationKind::Add, path, previous }
    }

    fn remove(path: String) -> Self {
        Self { kind: OperationKind::Remove, path, previous: None }
    }

    fn replace(path: String, previous: &Value) -> Self {
        Self { kind: OperationKind::Replace, path, previous: Some(previous.clone()) }
    }
}

/// Operations turning `prior` into `incoming`; empty when they are equal.
pub fn diff(prior: &Value, incoming: &Value) -> Vec<Operation> {
    let mut ops = Vec::new();
    diff_values("", prior, incoming, &mut ops);
    ops
}

fn diff_values(path: &str, prior: &Value, incoming: &Value, ops: &mut Vec<Operation>) {
    if prior == incoming {
        return;
    }
    match (prior, incoming) {
        (Value::Object(prior), Value::Object(incoming)) => diff_objects(path, prior, incoming, ops),
        (Value::Array(prior), Value::Array(incoming)) => diff_arrays(path, prior, incoming, ops),
        _ => ops.push(Operation::replace(path.to_string(), prior)),
    }
}

fn diff_objects(
    path: &str,
    prior: &Map<String, Value>,
    incoming: &Map<String, Value>,
    ops: &mut Vec<Operation>,
) {
    for (key, prior_value) in prior {
        let child = pointer::child(path, key);
        match incoming.get(key) {
            Some(incoming_value) => diff_values(&child, prior_value, incoming_value, ops),
            None => ops.push(Operation::remove(child)),
        }
    }
    for key in incoming.keys() {
        if !prior.contains_key(key) {
            ops.push(Operation::add(pointer::child(path, key), None));
        }
    }
}

fn diff_arrays(path: &str, prior: &[Value], incoming: &[Value], ops: &mut Vec<Operation>) {
    if prior.len() == incoming.len() {
        diff_positional(path, prior, incoming, ops);
        return;
    }
    match align(prior, incoming) {
        Some(pairs) => diff_aligned(path, prior, incoming, &pairs, ops),
        None => diff_positional(path, prior, incoming, ops),
    }
}

fn diff_positional(path: &str, prior: &[Value], incoming: &[Value], ops: &mut Vec<Operation>) {
    let common = prior.len().min(incoming.len());
    for i in 0..common {
        diff_values(&pointer::index(path, i), &prior[i], &incoming[i], ops);
    }
    for i in (common..prior.len()).rev() {
        ops.push(Operation::remove(pointer::index(path, i)));
    }
    for i in common..incoming.len() {
        ops.push(Operation::add(pointer::index(path, i), None));
    }
}

/// Emit operations for the gaps between aligned pairs.
///
/// Inside a gap, an index present on both sides is compared in place; other
/// prior elements are removed and other incoming elements added.
fn diff_aligned(
    path: &str,
    prior: &[Value],
    incoming: &[Value],
    pairs: &[(usize, usize)],
    ops: &mut Vec<Operation>,
) {
    let mut removed = Vec::new();
    let mut nested = Vec::new();
    let mut added = Vec::new();

    let (mut i, mut j) = (0, 0);
    let sentinel = (prior.len(), incoming.len());
    for &(pi, pj) in pairs.iter().chain(std::iter::once(&sentinel)) {
        let prior_gap = i..pi;
        let incoming_gap = j..pj;
        for p in prior_gap.clone() {
            if incoming_gap.contains(&p) {
                diff_values(&pointer::index(path, p), &prior[p], &incoming[p], &mut nested);
            } else {
                removed.push(p);
            }
        }
        for q in incoming_gap {
            if !prior_gap.contains(&q) {
                added.push(q);
            }
        }
        i = pi + 1;
        j = pj + 1;
    }

    for p in removed.into_iter().rev() {
        ops.push(Operation::remove(pointer::index(path, p)));
    }
    ops.append(&mut nested);
    for q in added {
        // The prior element at this index was shifted, not overwritten.
        ops.push(Operation::add(pointer::index(path, q), prior.get(q).cloned()));
    }
}

/// Index pairs of a longest common subsequence of equal elements, in
/// ascending order. `None` when the table would be too large.
fn align(prior: &[Value], incoming: &[Value]) -> Option<Vec<(usize, usize)>> {
    let prefix = prior
        .iter()
        .zip(incoming)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = prior[prefix..]
        .iter()
        .rev()
        .zip(incoming[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &prior[prefix..prior.len() - suffix];
    let b = &incoming[prefix..incoming.len() - suffix];
    let (n, m) = (a.len(), b.len());
    if (n + 1).saturating_mul(m + 1) > MAX_ALIGNMENT_CELLS {
        return None;
    }

    // lengths[x][y] = LCS length of a[x..] and b[y..]
    let width = m + 1;
    let mut lengths = vec![0u32; (n + 1) * width];
    for x in (0..n).rev() {
        for y in (0..m).rev() {
            lengths[x * width + y] = if a[x] == b[y] {
                lengths[(x + 1) * width + y + 1] + 1
            } else {
                lengths[(x + 1) * width + y].max(lengths[x * width + y + 1])
            };
        }
    }

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|k| (k, k)).collect();
    let (mut x, mut y) = (0, 0);
    while x < n && y < m {
        if a[x] == b[y] {
            pairs.push((prefix + x, prefix + y));
            x += 1;
            y += 1;
        } else if lengths[(x + 1) * width + y] >= lengths[x * width + y + 1] {
            x += 1;
        } else {
            y += 1;
        }
    }
    for k in 0..suffix {
        pairs.push((prior.len() - suffix + k, incoming.len() - suffix + k));
    }
    Some(pairs)
}
