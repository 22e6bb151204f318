//! The record container (spec §4.E): a document root holding one named
//! array of records, a main-table id index, and zero or more secondary
//! indexes.
//!
//! New module; no direct teacher analog (`crates/doc` models a single
//! document, not a collection of them), composing [`crate::node`] and
//! [`crate::index`] the way the teacher composes its `shape`/`combine`
//! submodules around a shared `Node` representation.

use crate::error::{Error, Result};
use crate::index::{Cmp, IndexManager};
use crate::node::cast::ToScalar;
use crate::node::json_io;
use crate::node::{NodeId, NodeKind, Tree};
use crate::options::Options;
use crate::snapshot;
use fxhash::FxHashMap;
use std::cmp::Ordering;
use std::path::Path;
use uuid::Uuid;

/// Which shape `table_node` has settled into, decided by the first insert
/// (spec §4.E: `ObjectArray` for `insert(json)`, `ValueArray` for
/// `insert(scalar)` — a table never mixes the two).
#[derive(Clone, Copy, PartialEq, Eq)]
enum TableShape {
    Object,
    Value,
}

/// A named collection of records over a shared [`Tree`] (spec §4.E).
pub struct Table {
    tree: Tree,
    name: String,
    root: NodeId,
    table_node: Option<NodeId>,
    shape: Option<TableShape>,
    main_table: FxHashMap<String, NodeId>,
    indexes: FxHashMap<String, IndexManager>,
}

impl Table {
    /// `create(name)` (spec §4.E): initializes `root`; defers `table_node`
    /// creation to the first insert.
    pub fn create(name: impl Into<String>) -> Table {
        Table::create_with_options(name, Options::default())
    }

    pub fn create_with_options(name: impl Into<String>, options: Options) -> Table {
        let mut tree = Tree::new(options);
        let root = tree.new_object(None, None);
        Table {
            tree,
            name: name.into(),
            root,
            table_node: None,
            shape: None,
            main_table: FxHashMap::default(),
            indexes: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// `table_node` (spec §4.E): the `ObjectArray`/`ValueArray` child of
    /// `root` named by the table's name, once it exists.
    pub fn table(&self) -> Option<NodeId> {
        self.table_node
    }

    fn object_array(&mut self) -> Result<NodeId> {
        match self.shape {
            Some(TableShape::Object) => Ok(self.table_node.expect("shape set implies table_node set")),
            Some(TableShape::Value) => Err(Error::ShapeMismatch {
                expected: "object_array",
                actual: "value_array",
            }),
            None => {
                let id = self.tree.new_object_array(Some(self.name.clone()), Some(self.root));
                self.tree.object_put_child(self.root, self.name.clone(), id)?;
                self.table_node = Some(id);
                self.shape = Some(TableShape::Object);
                Ok(id)
            }
        }
    }

    fn value_array(&mut self) -> Result<NodeId> {
        match self.shape {
            Some(TableShape::Value) => Ok(self.table_node.expect("shape set implies table_node set")),
            Some(TableShape::Object) => Err(Error::ShapeMismatch {
                expected: "value_array",
                actual: "object_array",
            }),
            None => {
                let id = self.tree.new_value_array(Some(self.name.clone()), Some(self.root));
                self.tree.object_put_child(self.root, self.name.clone(), id)?;
                self.table_node = Some(id);
                self.shape = Some(TableShape::Value);
                Ok(id)
            }
        }
    }

    /// `add_index(name, unique, fields…)` (spec §4.E). Requires the table
    /// already be (or become) `ObjectArray`-shaped. Per §9's resolved Open
    /// Question ("Index back-population"), scans `main_table` and populates
    /// the new index before returning, rather than leaving it empty.
    pub fn add_index(&mut self, name: impl Into<String>, unique: bool, fields: Vec<String>) -> Result<()> {
        self.add_index_with(name, unique, fields, None, None)
    }

    /// Same as [`Self::add_index`] but with caller-supplied `cmp`/`left_cmp`
    /// (spec §4.D/§4.E `add_index(name, unique, [cmp, left_cmp,] fields…)`),
    /// e.g. a numeric comparator for fields that should range-query by value
    /// rather than ordinal string order (spec §8 scenario 4).
    pub fn add_index_with(
        &mut self,
        name: impl Into<String>,
        unique: bool,
        fields: Vec<String>,
        cmp: Option<Cmp>,
        left_cmp: Option<Cmp>,
    ) -> Result<()> {
        let name = name.into();
        self.object_array()?;
        let mut index = IndexManager::with_comparators(name.clone(), unique, fields, cmp, left_cmp);
        for (id, node) in self.main_table.iter() {
            index.insert(&mut self.tree, *node, id)?;
        }
        self.indexes.insert(name, index);
        Ok(())
    }

    /// `insert(json)` (spec §4.E): parses a JSON object, appends it to
    /// `table_node`, generates a UUID, adds the `"_id"` child, registers it
    /// in `main_table`, and notifies every index. Returns the inserted node.
    pub fn insert(&mut self, json: &str) -> Result<NodeId> {
        let array = self.object_array()?;
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(Error::Unsupported("Table::insert(json) requires a JSON object"));
        }
        let node = json_io::build_node(&mut self.tree, &value, None, Some(array))?;
        let id = Uuid::new_v4().to_string();
        let id_node = self
            .tree
            .new_scalar(Some("_id".to_string()), Some(node), crate::value::Scalar::String(id.clone()));
        self.tree.object_put_child(node, "_id".to_string(), id_node)?;
        self.tree.object_array_push(array, node)?;
        self.main_table.insert(id.clone(), node);
        for index in self.indexes.values_mut() {
            index.insert(&mut self.tree, node, &id)?;
        }
        Ok(node)
    }

    /// `insert(scalar)` (spec §4.E): `ValueArray` mode — no id, no indexes.
    pub fn insert_scalar<T: ToScalar>(&mut self, value: T) -> Result<()> {
        let array = self.value_array()?;
        self.tree.value_array_push(array, value.to_scalar())
    }

    /// `get(id)` (spec §4.E): O(1) main-table lookup.
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.main_table.get(id).copied()
    }

    /// `get(index)` (spec §4.E): `table_node.get<Node>("$N")`, 1-based.
    pub fn get_at(&mut self, n: usize) -> Option<NodeId> {
        let array = self.table_node?;
        self.tree.get_node(array, &format!("${n}"))
    }

    /// `update(id, json)` (spec §4.E): replaces the target record's
    /// contents in place, preserving `_id`, and propagates the change to
    /// every index via `IndexManager::update`.
    pub fn update(&mut self, id: &str, json: &str) -> Result<()> {
        let old_node = self
            .get(id)
            .ok_or_else(|| Error::UnknownIndex(id.to_string()))?;
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(Error::Unsupported("Table::update(json) requires a JSON object"));
        }
        let array = self
            .table_node
            .ok_or(Error::Unsupported("update: table has no records"))?;
        let idx = match self.tree.kind(array)? {
            NodeKind::ObjectArray(children) => children
                .iter()
                .position(|c| *c == old_node)
                .ok_or(Error::Unsupported("stale node handle"))?,
            _ => return Err(Error::ShapeMismatch { expected: "object_array", actual: "other" }),
        };
        let new_node = json_io::build_node(&mut self.tree, &value, None, Some(array))?;
        let id_node = self
            .tree
            .new_scalar(Some("_id".to_string()), Some(new_node), crate::value::Scalar::String(id.to_string()));
        self.tree.object_put_child(new_node, "_id".to_string(), id_node)?;

        for index in self.indexes.values_mut() {
            index.update(&mut self.tree, old_node, new_node, id)?;
        }
        self.tree.object_array_set(array, idx + 1, new_node)?;
        self.main_table.insert(id.to_string(), new_node);
        Ok(())
    }

    /// `set<T>(id, path, value)` (spec §4.E): snapshots each index's
    /// composite key before the edit, applies `Tree::set`, then propagates
    /// the (possibly unchanged) new key to every index.
    pub fn set<T: ToScalar>(&mut self, id: &str, path: &str, value: T) -> Result<()> {
        let node = self
            .get(id)
            .ok_or_else(|| Error::UnknownIndex(id.to_string()))?;
        let old_keys = self.snapshot_index_keys(node)?;
        self.tree.set(node, path, value)?;
        self.reindex(node, id, old_keys)
    }

    /// `add<T>(id, path, key, value)` (spec §4.E): same clone-then-apply
    /// index-maintenance pattern as [`Self::set`], over `Tree::add_field`.
    pub fn add_field<T: ToScalar>(&mut self, id: &str, path: &str, key: &str, value: T) -> Result<NodeId> {
        let node = self
            .get(id)
            .ok_or_else(|| Error::UnknownIndex(id.to_string()))?;
        let old_keys = self.snapshot_index_keys(node)?;
        let target = self
            .tree
            .get_node(node, path)
            .ok_or(Error::Unsupported("add_field: path does not resolve"))?;
        let result = self.tree.add_field(target, key, value)?;
        self.reindex(node, id, old_keys)?;
        Ok(result)
    }

    /// `add_json(id, path, json)` (spec §4.E) on an `ObjectArray` path
    /// reached from the record.
    pub fn add_json(&mut self, id: &str, path: &str, json: &str) -> Result<NodeId> {
        let node = self
            .get(id)
            .ok_or_else(|| Error::UnknownIndex(id.to_string()))?;
        let old_keys = self.snapshot_index_keys(node)?;
        let target = self
            .tree
            .get_node(node, path)
            .ok_or(Error::Unsupported("add_json: path does not resolve"))?;
        let result = self.tree.add_json(target, json)?;
        self.reindex(node, id, old_keys)?;
        Ok(result)
    }

    fn snapshot_index_keys(&mut self, node: NodeId) -> Result<Vec<(String, String)>> {
        let mut out = Vec::with_capacity(self.indexes.len());
        for (name, index) in self.indexes.iter() {
            out.push((name.clone(), index.key_for(&mut self.tree, node)?));
        }
        Ok(out)
    }

    fn reindex(&mut self, node: NodeId, id: &str, old_keys: Vec<(String, String)>) -> Result<()> {
        for (name, old_key) in old_keys {
            if let Some(index) = self.indexes.get_mut(&name) {
                let new_key = index.key_for(&mut self.tree, node)?;
                index.update_by_keys(&old_key, &new_key, id)?;
            }
        }
        Ok(())
    }

    /// `delete(id)` (spec §4.E): detaches the record from `table_node` and
    /// notifies every index to remove it.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let node = self
            .main_table
            .remove(id)
            .ok_or_else(|| Error::UnknownIndex(id.to_string()))?;
        let array = self
            .table_node
            .ok_or(Error::Unsupported("delete: table has no records"))?;
        for index in self.indexes.values_mut() {
            index.remove(&mut self.tree, node, id)?;
        }
        let idx = match self.tree.kind(array)? {
            NodeKind::ObjectArray(children) => children.iter().position(|c| *c == node),
            _ => None,
        };
        if let Some(idx) = idx {
            self.tree.array_remove(array, idx + 1)?;
        }
        Ok(())
    }

    /// `find(index_name, args)` (spec §4.E): dispatches to the named index;
    /// errors if absent.
    pub fn find(&self, index_name: &str, key: &str) -> Result<Vec<NodeId>> {
        let index = self
            .indexes
            .get(index_name)
            .ok_or_else(|| Error::UnknownIndex(index_name.to_string()))?;
        Ok(match index.find(key) {
            crate::index::FindResult::One(Some(id)) => self.get(&id).into_iter().collect(),
            crate::index::FindResult::One(None) => Vec::new(),
            crate::index::FindResult::Many(ids) => ids.iter().filter_map(|id| self.get(id)).collect(),
        })
    }

    pub fn left_find(&self, index_name: &str, args: &[String]) -> Result<Vec<NodeId>> {
        let index = self
            .indexes
            .get(index_name)
            .ok_or_else(|| Error::UnknownIndex(index_name.to_string()))?;
        Ok(index.left_find(args).iter().filter_map(|id| self.get(id)).collect())
    }

    pub fn range_find(&self, index_name: &str, lo: &str, hi: &str) -> Result<Vec<NodeId>> {
        self.range_find_with(index_name, lo, hi, None)
    }

    /// Same as [`Self::range_find`] but with a per-call comparator override
    /// (spec §4.E/§6 `range_find(index, lo, hi[, cmp])`), falling back to the
    /// index's own comparator when `cmp` is `None`.
    pub fn range_find_with(
        &self,
        index_name: &str,
        lo: &str,
        hi: &str,
        cmp: Option<&dyn Fn(&String, &String) -> Ordering>,
    ) -> Result<Vec<NodeId>> {
        let index = self
            .indexes
            .get(index_name)
            .ok_or_else(|| Error::UnknownIndex(index_name.to_string()))?;
        Ok(index.range_find(lo, hi, cmp).iter().filter_map(|id| self.get(id)).collect())
    }

    /// Predicate iteration (spec §4.E "yields stored nodes in array order"):
    /// every record node, in the order `table_node` holds them.
    pub fn records(&self) -> Result<Vec<NodeId>> {
        let array = match self.table_node {
            Some(a) => a,
            None => return Ok(Vec::new()),
        };
        match self.tree.kind(array)? {
            NodeKind::ObjectArray(children) => Ok(children.clone()),
            other => Err(Error::ShapeMismatch {
                expected: "object_array",
                actual: other.type_name(),
            }),
        }
    }

    /// Filters [`Self::records`] through `predicate`, preserving array order
    /// (spec §8 scenario 3).
    pub fn filter(&mut self, predicate: impl Fn(&mut Tree, NodeId) -> bool) -> Result<Vec<NodeId>> {
        let records = self.records()?;
        Ok(records
            .into_iter()
            .filter(|&node| predicate(&mut self.tree, node))
            .collect())
    }

    /// `serialize(path, compress)` (spec §6/§4.F): writes the whole document
    /// tree rooted at `root`. Indexes are not persisted — `add_index` must be
    /// called again after [`Self::load`], which also re-populates them from
    /// the restored records (spec §9 "Index back-population").
    pub fn serialize(&self, path: impl AsRef<Path>, compress: bool) -> Result<()> {
        snapshot::serialize_to_path(&self.tree, self.root, path.as_ref(), compress)
    }

    /// `load(path, compress)` (spec §6/§4.F). `name` must match the table
    /// name used when the snapshot was written, so `table_node` can be
    /// reconnected via `root.get_node(name)`; `main_table` is then rebuilt by
    /// scanning the restored records' `"_id"` fields.
    pub fn load(name: impl Into<String>, path: impl AsRef<Path>, compress: bool) -> Result<Table> {
        let name = name.into();
        let (tree, root) = snapshot::load_from_path(path.as_ref(), compress, Options::default())?;
        let mut table = Table {
            tree,
            name: name.clone(),
            root,
            table_node: None,
            shape: None,
            main_table: FxHashMap::default(),
            indexes: FxHashMap::default(),
        };

        if let Some(array) = table.tree.get_node(root, &name) {
            match table.tree.kind(array)? {
                NodeKind::ObjectArray(children) => {
                    let children = children.clone();
                    table.shape = Some(TableShape::Object);
                    table.table_node = Some(array);
                    for child in children {
                        let id: String = table.tree.get(child, "_id");
                        if !id.is_empty() {
                            table.main_table.insert(id, child);
                        }
                    }
                }
                NodeKind::ValueArray(_) => {
                    table.shape = Some(TableShape::Value);
                    table.table_node = Some(array);
                }
                _ => {}
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_assigns_id_and_is_retrievable_by_path() {
        let mut t = Table::create("students");
        let node = t.insert(r#"{"name":"张三","age":1}"#).unwrap();
        let id: String = t.tree_mut().get(node, "_id");
        assert!(!id.is_empty());
        assert_eq!(t.get(&id), Some(node));

        let table = t.table().unwrap();
        assert_eq!(t.tree_mut().get::<String>(table, "$1.name"), "张三");
        assert_eq!(t.tree_mut().get::<i64>(table, "$1.age"), 1);
    }

    #[test]
    fn update_via_path_is_visible_through_table_node() {
        let mut t = Table::create("students");
        t.insert(r#"{"name":"张三","age":1}"#).unwrap();
        let table = t.table().unwrap();
        let n = t.tree_mut().get_node(table, "$1").unwrap();
        t.tree_mut().set(n, "name", "李四").unwrap();
        assert_eq!(t.tree_mut().get::<String>(table, "$1.name"), "李四");
    }

    #[test]
    fn predicate_filters_preserve_insertion_order() {
        let mut t = Table::create("people");
        t.insert(r#"{"age":10}"#).unwrap();
        t.insert(r#"{"age":15}"#).unwrap();
        t.insert(r#"{"age":20}"#).unwrap();
        let matches = t.filter(|tree, node| tree.get::<i64>(node, "age") >= 15).unwrap();
        let ages: Vec<i64> = matches
            .into_iter()
            .map(|node| t.tree_mut().get::<i64>(node, "age"))
            .collect();
        assert_eq!(ages, vec![15, 20]);
    }

    #[test]
    fn multi_index_range_find_returns_ascending_window() {
        let mut t = Table::create("people");
        t.add_index("age", false, vec!["age".to_string()]).unwrap();
        for age in [10, 12, 15, 20, 25] {
            t.insert(&format!(r#"{{"age":{age}}}"#)).unwrap();
        }
        let found = t.range_find("age", "12", "20").unwrap();
        let mut ages: Vec<i64> = found
            .into_iter()
            .map(|node| t.tree_mut().get::<i64>(node, "age"))
            .collect();
        ages.sort();
        assert_eq!(ages, vec![12, 15, 20]);
    }

    #[test]
    fn range_find_with_numeric_comparator_crosses_digit_widths() {
        fn numeric_cmp(a: &String, b: &String) -> Ordering {
            a.parse::<i64>().unwrap_or(0).cmp(&b.parse::<i64>().unwrap_or(0))
        }
        let mut t = Table::create("people");
        t.add_index_with("age", false, vec!["age".to_string()], Some(Box::new(numeric_cmp)), None)
            .unwrap();
        for age in [5, 10, 100] {
            t.insert(&format!(r#"{{"age":{age}}}"#)).unwrap();
        }
        let found = t.range_find("age", "5", "10").unwrap();
        let mut ages: Vec<i64> = found
            .into_iter()
            .map(|node| t.tree_mut().get::<i64>(node, "age"))
            .collect();
        ages.sort();
        assert_eq!(ages, vec![5, 10]);
    }

    #[test]
    fn composite_prefix_returns_both_then_one() {
        let mut t = Table::create("people");
        t.add_index(
            "name_sex",
            false,
            vec!["name".to_string(), "sex".to_string()],
        )
        .unwrap();
        t.insert(r#"{"name":"张三1","sex":"male"}"#).unwrap();
        t.insert(r#"{"name":"张三2","sex":"female"}"#).unwrap();

        let both = t.left_find("name_sex", &["张三".to_string()]).unwrap();
        assert_eq!(both.len(), 2);

        let only_one = t.left_find("name_sex", &["张三1".to_string()]).unwrap();
        assert_eq!(only_one.len(), 1);
    }

    #[test]
    fn set_keeps_unique_index_consistent() {
        let mut t = Table::create("people");
        t.add_index("age", true, vec!["age".to_string()]).unwrap();
        let node = t.insert(r#"{"age":10}"#).unwrap();
        let id: String = t.tree_mut().get(node, "_id");
        t.set(&id, "age", 99).unwrap();
        assert!(t.find("age", "10").unwrap().is_empty());
        assert_eq!(t.find("age", "99").unwrap(), vec![node]);
    }

    #[test]
    fn delete_removes_from_main_table_and_indexes() {
        let mut t = Table::create("people");
        t.add_index("age", false, vec!["age".to_string()]).unwrap();
        let node = t.insert(r#"{"age":10}"#).unwrap();
        let id: String = t.tree_mut().get(node, "_id");
        t.delete(&id).unwrap();
        assert_eq!(t.get(&id), None);
        assert!(t.find("age", "10").unwrap().is_empty());
        assert_eq!(t.records().unwrap().len(), 0);
    }

    #[test]
    fn add_index_backfills_existing_records() {
        let mut t = Table::create("people");
        t.insert(r#"{"age":10}"#).unwrap();
        t.insert(r#"{"age":20}"#).unwrap();
        t.add_index("age", false, vec!["age".to_string()]).unwrap();
        assert_eq!(t.find("age", "10").unwrap().len(), 1);
        assert_eq!(t.find("age", "20").unwrap().len(), 1);
    }

    #[test]
    fn serialize_then_load_preserves_ids_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.db");

        let mut t = Table::create("students");
        let node = t.insert(r#"{"name":"张三","age":1}"#).unwrap();
        let id: String = t.tree_mut().get(node, "_id");
        t.serialize(&path, true).unwrap();

        let mut loaded = Table::load("students", &path, true).unwrap();
        assert_eq!(loaded.get(&id), Some(loaded.get(&id).unwrap()));
        let restored_node = loaded.get(&id).unwrap();
        assert_eq!(loaded.tree_mut().get::<String>(restored_node, "_id"), id);
        assert_eq!(loaded.tree_mut().get::<String>(restored_node, "name"), "张三");
        assert_eq!(loaded.tree_mut().get::<i64>(restored_node, "age"), 1);
    }

    #[test]
    fn value_array_mode_rejects_json_insert() {
        let mut t = Table::create("tags");
        t.insert_scalar("a").unwrap();
        assert!(t.insert(r#"{"x":1}"#).is_err());
    }
}
