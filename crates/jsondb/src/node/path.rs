//! Dotted-path / `$N` addressing and navigation (spec §3 "Addressing", §4.B
//! "Navigation algorithm").

use super::json_io::ensure_materialized;
use super::{NodeId, NodeKind, Tree};

/// The outcome of resolving a path: either a full node, or an index into a
/// `ValueArray`'s scalar payload (which has no node identity of its own).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Node(NodeId),
    /// `(array, 0-based index)` into a `ValueArray`'s items.
    ValueArrayElement(NodeId, usize),
}

/// Splits a dotted path into segments. An empty path yields no segments
/// (spec §8 "Path address idempotence": `get_node(p).get_node("") ≡
/// get_node(p)`).
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Parses a `$N` positional segment into its 1-based index. Returns `None`
/// for plain object-key segments.
pub fn parse_index_segment(segment: &str) -> Option<usize> {
    let rest = segment.strip_prefix('$')?;
    let n: usize = rest.parse().ok()?;
    if n == 0 {
        None
    } else {
        Some(n)
    }
}

/// Resolves `path` starting at `from`, per spec §4.B. Materializes any lazy
/// node encountered along the way. Returns `None` on any missing segment
/// (spec §7 "Range/arg error": out-of-range `$N` is absent, not an error).
pub fn resolve(tree: &mut Tree, from: NodeId, path: &str) -> Option<Resolved> {
    let keys = split_path(path);
    if keys.is_empty() {
        return Some(Resolved::Node(from));
    }
    if tree.options.recursive_mode {
        resolve_recursive(tree, from, &keys, 0)
    } else {
        resolve_loop(tree, from, &keys, 0)
    }
}

fn resolve_loop(tree: &mut Tree, start: NodeId, keys: &[&str], start_index: usize) -> Option<Resolved> {
    let mut curr = start;
    let mut index = start_index;
    loop {
        if index >= keys.len() {
            return Some(Resolved::Node(curr));
        }
        let _ = ensure_materialized(tree, curr);
        let kind = tree.kind(curr).ok()?;
        match kind {
            NodeKind::Scalar(_) => return None,
            NodeKind::Object(_) => {
                let (_, child) = tree.object_find(curr, keys[index])?;
                if index + 1 == keys.len() {
                    return Some(Resolved::Node(child));
                }
                curr = child;
                index += 1;
            }
            NodeKind::ValueArray(data) => {
                let n = parse_index_segment(keys[index])?;
                if n > data.items.len() {
                    return None;
                }
                // A ValueArray is always terminal: its elements are scalars.
                return Some(Resolved::ValueArrayElement(curr, n - 1));
            }
            NodeKind::ObjectArray(children) => {
                let n = parse_index_segment(keys[index])?;
                if n > children.len() {
                    return None;
                }
                let element = children[n - 1];
                if index + 1 == keys.len() {
                    return Some(Resolved::Node(element));
                }
                curr = element;
                index += 1;
            }
            NodeKind::LazyObject(_) | NodeKind::LazyArray(_) => {
                // ensure_materialized above should have replaced this; if it
                // failed (malformed raw text) treat the path as missing.
                return None;
            }
        }
    }
}

fn resolve_recursive(tree: &mut Tree, curr: NodeId, keys: &[&str], index: usize) -> Option<Resolved> {
    if index >= keys.len() {
        return Some(Resolved::Node(curr));
    }
    let _ = ensure_materialized(tree, curr);
    if let Some(n) = parse_index_segment(keys[index]) {
        match tree.kind(curr).ok()? {
            NodeKind::ValueArray(data) => {
                if n > data.items.len() {
                    return None;
                }
                return Some(Resolved::ValueArrayElement(curr, n - 1));
            }
            NodeKind::ObjectArray(children) => {
                if n > children.len() {
                    return None;
                }
                let element = children[n - 1];
                return resolve_recursive(tree, element, keys, index + 1);
            }
            _ => return None,
        }
    }
    if tree.key(curr) == Some(keys[index]) {
        return resolve_recursive(tree, curr, keys, index + 1);
    }
    let found = find_descendant_by_key(tree, curr, keys[index])?;
    resolve_recursive(tree, found, keys, index + 1)
}

/// Depth-first search of `curr`'s children (not `curr` itself) for a node
/// whose key equals `target`.
fn find_descendant_by_key(tree: &mut Tree, curr: NodeId, target: &str) -> Option<NodeId> {
    let _ = ensure_materialized(tree, curr);
    let children: Vec<NodeId> = match tree.kind(curr).ok()? {
        NodeKind::Object(c) | NodeKind::ObjectArray(c) => c.clone(),
        _ => Vec::new(),
    };
    for child in &children {
        if tree.key(*child) == Some(target) {
            return Some(*child);
        }
    }
    for child in &children {
        if let Some(found) = find_descendant_by_key(tree, *child, target) {
            return Some(found);
        }
    }
    None
}
