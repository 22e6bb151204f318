//! Composite-key secondary indexes over a [`crate::table::Table`] (spec
//! §4.D).
//!
//! New module; no direct teacher analog (the crate this project is built
//! from has no on-heap ordered index), composing [`crate::bptree`] the same
//! way the teacher composes its `shape` submodules around a shared `Shape`
//! representation.

use crate::bptree::{BPlusTree, DEFAULT_ORDER};
use crate::error::{Error, Result};
use crate::node::json_io::to_json as node_to_json;
use crate::node::{NodeId, Tree};
use std::cmp::Ordering;

/// Ordinal string comparator: the manager's default when the caller
/// supplies none (spec §4.D "Comparator defaulting").
fn ordinal_cmp(a: &String, b: &String) -> Ordering {
    a.cmp(b)
}

/// The manager's synthesized prefix comparator (spec §4.D): `Equal` iff
/// `stored` begins with `probe`, otherwise ordinal order.
fn default_prefix_cmp(stored: &String, probe: &String) -> Ordering {
    if stored.starts_with(probe.as_str()) {
        Ordering::Equal
    } else {
        stored.cmp(probe)
    }
}

/// A user-suppliable key comparator, owned by the [`IndexManager`] it
/// configures (spec §4.D: "Users may supply `cmp`... and `left_cmp`").
pub type Cmp = Box<dyn Fn(&String, &String) -> Ordering>;

/// Builds the composite key for `fields` read off `doc` (spec §4.D
/// "Composite key"). `doc` must be an `Object` (a table record). Each field
/// path is read with `get_node` + `to_json`-style textual rendering; missing
/// fields contribute the empty string, matching a comma-join over absent
/// values rather than failing the whole key (table inserts are expected to
/// supply every indexed field, but a partial record should not panic the
/// index on a well-formed document containing other data).
pub fn composite_key(tree: &mut Tree, doc: NodeId, fields: &[String]) -> Result<String> {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        let text = match crate::node::path::resolve(tree, doc, field) {
            Some(crate::node::path::Resolved::Node(id)) => scalar_text(tree, id)?,
            Some(crate::node::path::Resolved::ValueArrayElement(array, idx)) => {
                match tree.kind(array)? {
                    crate::node::NodeKind::ValueArray(data) => {
                        data.items[idx].encode_text(&tree.options.null_sentinel)
                    }
                    _ => String::new(),
                }
            }
            None => String::new(),
        };
        parts.push(text);
    }
    Ok(parts.join(","))
}

fn scalar_text(tree: &Tree, id: NodeId) -> Result<String> {
    match tree.kind(id)? {
        crate::node::NodeKind::Scalar(s) => Ok(s.encode_text(&tree.options.null_sentinel)),
        _ => node_to_json(tree, id),
    }
}

enum Storage {
    Unique(BPlusTree<String, String>),
    Multi(BPlusTree<String, Vec<String>>),
}

/// A single named secondary index: composite key -> record id(s).
pub struct IndexManager {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
    storage: Storage,
    cmp: Cmp,
    left_cmp: Cmp,
}

/// The outcome of `find` on an index (spec §4.D: unique returns a single
/// id, multi returns a list).
pub enum FindResult {
    One(Option<String>),
    Many(Vec<String>),
}

impl IndexManager {
    /// Builds a manager with the default ordinal comparator and synthesized
    /// prefix comparator (spec §4.D "Comparator defaulting").
    pub fn new(name: impl Into<String>, unique: bool, fields: Vec<String>) -> Self {
        Self::with_comparators(name, unique, fields, None, None)
    }

    /// Builds a manager with caller-supplied `cmp`/`left_cmp`, falling back
    /// to the ordinal/prefix defaults for whichever is `None` (spec §4.D
    /// "Users may supply `cmp` (for range) and `left_cmp` (for prefix). If
    /// none is supplied... the manager synthesizes a prefix comparator").
    pub fn with_comparators(
        name: impl Into<String>,
        unique: bool,
        fields: Vec<String>,
        cmp: Option<Cmp>,
        left_cmp: Option<Cmp>,
    ) -> Self {
        let storage = if unique {
            Storage::Unique(BPlusTree::new(DEFAULT_ORDER))
        } else {
            Storage::Multi(BPlusTree::new(DEFAULT_ORDER))
        };
        IndexManager {
            name: name.into(),
            unique,
            fields,
            storage,
            cmp: cmp.unwrap_or_else(|| Box::new(ordinal_cmp)),
            left_cmp: left_cmp.unwrap_or_else(|| Box::new(default_prefix_cmp)),
        }
    }

    pub(crate) fn key_for(&self, tree: &mut Tree, doc: NodeId) -> Result<String> {
        composite_key(tree, doc, &self.fields)
    }

    /// Inserts `doc`'s id under its composite key. Unique: latest wins
    /// (spec §4.D "On duplicate insert, the existing entry is overwritten").
    /// Multi: appends.
    pub fn insert(&mut self, tree: &mut Tree, doc: NodeId, id: &str) -> Result<()> {
        let key = self.key_for(tree, doc)?;
        if key.is_empty() {
            return Err(Error::NullKey);
        }
        self.insert_key(key, id)
    }

    fn insert_key(&mut self, key: String, id: &str) -> Result<()> {
        let cmp = &*self.cmp;
        match &mut self.storage {
            Storage::Unique(t) => {
                t.insert(key, id.to_string(), cmp)?;
            }
            Storage::Multi(t) => match t.find(&key, cmp) {
                Some(_) => {
                    // Re-fetch mutably by removing then reinserting the
                    // extended list (BPlusTree exposes no in-place get_mut).
                    let mut existing = t.remove(&key, cmp)?.unwrap_or_default();
                    existing.push(id.to_string());
                    t.insert(key, existing, cmp)?;
                }
                None => {
                    t.insert(key, vec![id.to_string()], cmp)?;
                }
            },
        }
        Ok(())
    }

    /// Removes `id` under `doc`'s current composite key (spec §4.D "Multi
    /// index... remove drops the ID and deletes the list if empty").
    pub fn remove(&mut self, tree: &mut Tree, doc: NodeId, id: &str) -> Result<()> {
        let key = self.key_for(tree, doc)?;
        self.remove_by_key(&key, id)
    }

    fn remove_by_key(&mut self, key: &str, id: &str) -> Result<()> {
        let cmp = &*self.cmp;
        match &mut self.storage {
            Storage::Unique(t) => {
                t.remove(&key.to_string(), cmp)?;
            }
            Storage::Multi(t) => {
                if let Some(mut existing) = t.remove(&key.to_string(), cmp)? {
                    existing.retain(|existing_id| existing_id != id);
                    if !existing.is_empty() {
                        t.insert(key.to_string(), existing, cmp)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// `update(old, new)` (spec §4.D): no-op when the composite key is
    /// unchanged, else remove the old entry and insert the new one. Reads
    /// both composite keys from live document nodes (used by `Table::update`,
    /// which has an old and a new document simultaneously).
    pub fn update(&mut self, tree: &mut Tree, old_doc: NodeId, new_doc: NodeId, id: &str) -> Result<()> {
        let old_key = self.key_for(tree, old_doc)?;
        let new_key = self.key_for(tree, new_doc)?;
        self.update_by_keys(&old_key, &new_key, id)
    }

    /// Same as [`Self::update`] but takes already-rendered composite keys
    /// (used by `Table::set`/`add`, which mutate a single node in place and
    /// so must snapshot the key text before and after the edit rather than
    /// diffing two separate document nodes).
    pub fn update_by_keys(&mut self, old_key: &str, new_key: &str, id: &str) -> Result<()> {
        if old_key == new_key {
            return Ok(());
        }
        self.remove_by_key(old_key, id)?;
        if new_key.is_empty() {
            return Err(Error::NullKey);
        }
        self.insert_key(new_key.to_string(), id)
    }

    pub fn find(&self, key: &str) -> FindResult {
        let cmp = &*self.cmp;
        match &self.storage {
            Storage::Unique(t) => FindResult::One(t.find(&key.to_string(), cmp).cloned()),
            Storage::Multi(t) => {
                FindResult::Many(t.find(&key.to_string(), cmp).cloned().unwrap_or_default())
            }
        }
    }

    /// Prefix lookup (spec §4.D/§9 "Composite prefix"): a pure string-prefix
    /// probe over the joined fields, so e.g. `["张三"]` matches every stored
    /// key beginning with `"张三"` regardless of what follows (spec §8
    /// scenario 6).
    pub fn left_find(&self, args: &[String]) -> Vec<String> {
        let probe = args.join(",");
        let left_cmp = &*self.left_cmp;
        match &self.storage {
            Storage::Unique(t) => t.left_find(&probe, left_cmp).into_iter().collect(),
            Storage::Multi(t) => t.left_find(&probe, left_cmp).into_iter().flatten().collect(),
        }
    }

    /// Range lookup (spec §4.D/§6 `range_find(index, lo, hi[, cmp])`): uses
    /// `cmp_override` when given, else the manager's own comparator.
    pub fn range_find(&self, lo: &str, hi: &str, cmp_override: Option<&dyn Fn(&String, &String) -> Ordering>) -> Vec<String> {
        let lo = lo.to_string();
        let hi = hi.to_string();
        let cmp = cmp_override.unwrap_or(&*self.cmp);
        match &self.storage {
            Storage::Unique(t) => t.range_find(&lo, &hi, cmp),
            Storage::Multi(t) => t.range_find(&lo, &hi, cmp).into_iter().flatten().collect(),
        }
    }

    /// Empties the index in place (spec §4.D `clear()`), keeping its name,
    /// fields, and comparators.
    pub fn clear(&mut self) {
        self.storage = if self.unique {
            Storage::Unique(BPlusTree::new(DEFAULT_ORDER))
        } else {
            Storage::Multi(BPlusTree::new(DEFAULT_ORDER))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::json_io::parse_into;
    use crate::options::Options;

    fn insert_doc(tree: &mut Tree, json: &str) -> NodeId {
        parse_into(tree, json, None, None).unwrap()
    }

    #[test]
    fn unique_index_latest_wins_on_duplicate() {
        let mut tree = Tree::new(Options::default());
        let mut idx = IndexManager::new("age", true, vec!["age".to_string()]);
        let a = insert_doc(&mut tree, r#"{"age":10}"#);
        let b = insert_doc(&mut tree, r#"{"age":10}"#);
        idx.insert(&mut tree, a, "id-a").unwrap();
        idx.insert(&mut tree, b, "id-b").unwrap();
        match idx.find("10") {
            FindResult::One(Some(id)) => assert_eq!(id, "id-b"),
            _ => panic!("expected single id"),
        }
    }

    #[test]
    fn multi_index_accumulates_and_drains() {
        let mut tree = Tree::new(Options::default());
        let mut idx = IndexManager::new("age", false, vec!["age".to_string()]);
        let a = insert_doc(&mut tree, r#"{"age":10}"#);
        let b = insert_doc(&mut tree, r#"{"age":10}"#);
        idx.insert(&mut tree, a, "id-a").unwrap();
        idx.insert(&mut tree, b, "id-b").unwrap();
        match idx.find("10") {
            FindResult::Many(ids) => assert_eq!(ids.len(), 2),
            _ => panic!(),
        }
        idx.remove(&mut tree, a, "id-a").unwrap();
        match idx.find("10") {
            FindResult::Many(ids) => assert_eq!(ids, vec!["id-b".to_string()]),
            _ => panic!(),
        }
    }

    #[test]
    fn composite_prefix_matches_substring_prefix() {
        let mut tree = Tree::new(Options::default());
        let mut idx = IndexManager::new(
            "name_sex",
            false,
            vec!["name".to_string(), "sex".to_string()],
        );
        let a = insert_doc(&mut tree, r#"{"name":"张三1","sex":"male"}"#);
        let b = insert_doc(&mut tree, r#"{"name":"张三2","sex":"female"}"#);
        idx.insert(&mut tree, a, "id-a").unwrap();
        idx.insert(&mut tree, b, "id-b").unwrap();

        let mut both = idx.left_find(&["张三".to_string()]);
        both.sort();
        assert_eq!(both, vec!["id-a".to_string(), "id-b".to_string()]);

        let only_a = idx.left_find(&["张三1".to_string()]);
        assert_eq!(only_a, vec!["id-a".to_string()]);
    }

    fn numeric_cmp(a: &String, b: &String) -> Ordering {
        a.parse::<i64>().unwrap_or(0).cmp(&b.parse::<i64>().unwrap_or(0))
    }

    #[test]
    fn custom_range_comparator_orders_numerically_not_lexically() {
        let mut tree = Tree::new(Options::default());
        let mut idx = IndexManager::with_comparators(
            "age",
            false,
            vec!["age".to_string()],
            Some(Box::new(numeric_cmp)),
            None,
        );
        for age in [5, 10, 100] {
            let doc = insert_doc(&mut tree, &format!(r#"{{"age":{age}}}"#));
            idx.insert(&mut tree, doc, &format!("id-{age}")).unwrap();
        }
        let mut found = idx.range_find("5", "10", None);
        found.sort();
        assert_eq!(found, vec!["id-10".to_string(), "id-5".to_string()]);
    }
}
