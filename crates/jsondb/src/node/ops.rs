//! High-level node operations (spec §4.B "Operations" contract): `get`,
//! `get_node`, `set`, `add`, `add_json`, `append`, `remove`, `clone`. Thin
//! wrappers over [`super::path`] (addressing), [`super::cast`] (conversion),
//! and [`super::json_io`] (parsing/rendering) — this is the module a caller
//! actually reaches for; the others are its plumbing.

use super::cast::{self, FromScalar, ToScalar};
use super::json_io;
use super::path::{self, Resolved};
use super::{NodeId, NodeKind, Tree};
use crate::error::{Error, Result};

impl Tree {
    /// `get<T>(path)` (spec §4.B). Returns `T::default()` on any missing
    /// segment, a non-scalar target, or a failed cross-type conversion —
    /// never an error (spec §7 "Cast failure": "default on failure").
    pub fn get<T: FromScalar>(&mut self, from: NodeId, path: &str) -> T {
        match path::resolve(self, from, path) {
            Some(Resolved::Node(id)) => match self.kind(id) {
                Ok(NodeKind::Scalar(s)) => T::from_scalar(s),
                _ => T::default(),
            },
            Some(Resolved::ValueArrayElement(array, idx)) => match self.kind(array) {
                Ok(NodeKind::ValueArray(data)) => T::from_scalar(&data.items[idx]),
                _ => T::default(),
            },
            None => T::default(),
        }
    }

    /// `get_node(path)` (spec §4.B). `ValueArray` elements have no node
    /// identity of their own (spec §1's `get` contract distinguishes scalar
    /// reads from node reads for exactly this reason), so a resolved
    /// positional scalar yields `None` here.
    pub fn get_node(&mut self, from: NodeId, path: &str) -> Option<NodeId> {
        match path::resolve(self, from, path)? {
            Resolved::Node(id) => Some(id),
            Resolved::ValueArrayElement(_, _) => None,
        }
    }

    /// `set<T>(path, value)` for a `Scalar` or `ValueArray` `$N` target
    /// (spec §4.B). Overwriting a `Scalar` preserves its original tag,
    /// coercing `value` through the same conversion table `get<T>` uses.
    /// Replacing an `Object` subtree from a JSON string is a different
    /// operation (spec: "if Object and value is a JSON string, reparse
    /// subtree and replace in parent") — see [`Self::set_json`].
    pub fn set<T: ToScalar>(&mut self, from: NodeId, path: &str, value: T) -> Result<()> {
        let resolved = path::resolve(self, from, path)
            .ok_or(Error::Unsupported("set: path does not resolve to an existing node"))?;
        match resolved {
            Resolved::ValueArrayElement(array, idx) => self.value_array_set(array, idx + 1, value.to_scalar()),
            Resolved::Node(id) => match self.kind(id)? {
                NodeKind::Scalar(existing) => {
                    let tag = existing.tag();
                    let coerced = cast::coerce(&value.to_scalar(), tag);
                    self.replace_in_place(id, NodeKind::Scalar(coerced))
                }
                other => Err(Error::ShapeMismatch {
                    expected: "scalar",
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// `set<T>(path, value)` where `value` is a JSON string reparsed into a
    /// replacement subtree (spec §4.B). Valid when the resolved target is an
    /// `Object` (replaced via its parent `Object`'s child slot) or an
    /// `ObjectArray` element addressed by `$N` (replaced via
    /// `object_array_set`).
    pub fn set_json(&mut self, from: NodeId, path: &str, json: &str) -> Result<()> {
        let resolved = path::resolve(self, from, path)
            .ok_or(Error::Unsupported("set_json: path does not resolve to an existing node"))?;
        let target = match resolved {
            Resolved::Node(id) => id,
            Resolved::ValueArrayElement(..) => {
                return Err(Error::Unsupported("set_json cannot target a ValueArray element"))
            }
        };
        let parent = self
            .parent(target)
            .ok_or(Error::Unsupported("set_json cannot replace the document root"))?;
        match self.kind(parent)?.type_name() {
            "object" => {
                let key = self.key(target).unwrap().to_string();
                let replacement = json_io::parse_into(self, json, Some(key.clone()), Some(parent))?;
                self.object_put_child(parent, key, replacement)
            }
            "object_array" => {
                let idx = match self.kind(parent)? {
                    NodeKind::ObjectArray(children) => children
                        .iter()
                        .position(|c| *c == target)
                        .ok_or(Error::Unsupported("stale node handle"))?,
                    _ => unreachable!(),
                };
                let replacement = json_io::parse_into(self, json, None, Some(parent))?;
                self.object_array_set(parent, idx + 1, replacement)
            }
            other => Err(Error::ShapeMismatch {
                expected: "object or object_array parent",
                actual: other,
            }),
        }
    }

    /// `add<T>(value)` (spec §4.B): append to a `ValueArray`, establishing
    /// its element type on first add.
    pub fn add_value<T: ToScalar>(&mut self, array: NodeId, value: T) -> Result<()> {
        self.value_array_push(array, value.to_scalar())
    }

    /// `add<T>(key, value)` (spec §4.B): create (or replace) a `Scalar`
    /// child of an `Object`.
    pub fn add_field<T: ToScalar>(&mut self, object: NodeId, key: &str, value: T) -> Result<NodeId> {
        match self.kind(object)? {
            NodeKind::Object(_) => {
                let child = self.new_scalar(Some(key.to_string()), Some(object), value.to_scalar());
                self.object_put_child(object, key.to_string(), child)?;
                Ok(child)
            }
            other => Err(Error::ShapeMismatch {
                expected: "object",
                actual: other.type_name(),
            }),
        }
    }

    /// `add_json(json)` (spec §4.B): valid only on an `ObjectArray`
    /// expecting an object member.
    pub fn add_json(&mut self, array: NodeId, json: &str) -> Result<NodeId> {
        match self.kind(array)? {
            NodeKind::ObjectArray(_) => {
                let value: serde_json::Value = serde_json::from_str(json)?;
                if !value.is_object() {
                    return Err(Error::Unsupported(
                        "add_json(json) on an ObjectArray requires a JSON object",
                    ));
                }
                let node = json_io::build_node(self, &value, None, Some(array))?;
                self.object_array_push(array, node)?;
                Ok(node)
            }
            other => Err(Error::ShapeMismatch {
                expected: "object_array",
                actual: other.type_name(),
            }),
        }
    }

    /// `add_json(key, json)` (spec §4.B): on an `Object`, dispatches to
    /// `ParseNode`/`ParseArrayNode` depending on what `json` parses to.
    pub fn add_json_field(&mut self, object: NodeId, key: &str, json: &str) -> Result<NodeId> {
        match self.kind(object)? {
            NodeKind::Object(_) => {
                let node = json_io::parse_into(self, json, Some(key.to_string()), Some(object))?;
                self.object_put_child(object, key.to_string(), node)?;
                Ok(node)
            }
            other => Err(Error::ShapeMismatch {
                expected: "object",
                actual: other.type_name(),
            }),
        }
    }

    /// `append(path, value)` (spec §4.B): navigate to `path`, then `add`.
    pub fn append_value<T: ToScalar>(&mut self, from: NodeId, path: &str, value: T) -> Result<()> {
        let target = self
            .get_node(from, path)
            .ok_or(Error::Unsupported("append: path does not resolve"))?;
        self.add_value(target, value)
    }

    /// `append(path, key, value)` (spec §4.B).
    pub fn append_field<T: ToScalar>(&mut self, from: NodeId, path: &str, key: &str, value: T) -> Result<NodeId> {
        let target = self
            .get_node(from, path)
            .ok_or(Error::Unsupported("append: path does not resolve"))?;
        self.add_field(target, key, value)
    }

    /// `append_json(path, json)` (spec §4.B).
    pub fn append_json(&mut self, from: NodeId, path: &str, json: &str) -> Result<NodeId> {
        let target = self
            .get_node(from, path)
            .ok_or(Error::Unsupported("append: path does not resolve"))?;
        self.add_json(target, json)
    }

    /// `remove(path)` (spec §4.B): splices an array element when the
    /// terminal segment is `$N`, otherwise unlinks the named child.
    pub fn remove(&mut self, from: NodeId, path: &str) -> Result<()> {
        let keys = path::split_path(path);
        let (init, last) = match keys.split_last() {
            Some((last, init)) => (init, *last),
            None => return Err(Error::Unsupported("remove: path must name a child")),
        };
        let parent_path = init.join(".");
        let parent_id = match path::resolve(self, from, &parent_path) {
            Some(Resolved::Node(id)) => id,
            _ => return Ok(()), // missing parent segment: nothing to remove
        };
        if let Some(n) = path::parse_index_segment(last) {
            match self.array_remove(parent_id, n) {
                Ok(()) => Ok(()),
                Err(Error::Unsupported(_)) => Ok(()), // out-of-range $N is a no-op, spec §7
                Err(e) => Err(e),
            }
        } else {
            self.object_remove_child(parent_id, last).map(|_| ())
        }
    }

    /// `clone()` (spec §3 Lifecycle): deep copy except `Lazy*` nodes, which
    /// are shallow-copied (the stored raw text is reused, not reparsed).
    /// The clone's parent is `None` regardless of `id`'s own parent (spec §9:
    /// "Cloning must not clone the parent link").
    pub fn clone_node(&mut self, id: NodeId) -> NodeId {
        self.clone_node_with_parent(id, None)
    }

    fn clone_node_with_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let key = self.key(id).map(|s| s.to_string());
        enum Snapshot {
            Scalar(crate::value::Scalar),
            LazyObject(Box<serde_json::value::RawValue>),
            LazyArray(Box<serde_json::value::RawValue>),
            ValueArray(super::ValueArrayData),
            Object(Vec<NodeId>),
            ObjectArray(Vec<NodeId>),
        }
        let snapshot = match self.kind(id).expect("clone of a valid node") {
            NodeKind::Scalar(v) => Snapshot::Scalar(v.clone()),
            NodeKind::LazyObject(r) => Snapshot::LazyObject(r.clone()),
            NodeKind::LazyArray(r) => Snapshot::LazyArray(r.clone()),
            NodeKind::ValueArray(d) => Snapshot::ValueArray(d.clone()),
            NodeKind::Object(c) => Snapshot::Object(c.clone()),
            NodeKind::ObjectArray(c) => Snapshot::ObjectArray(c.clone()),
        };
        match snapshot {
            Snapshot::Scalar(v) => self.new_scalar(key, parent, v),
            Snapshot::LazyObject(r) => self.new_lazy_object(key, parent, r),
            Snapshot::LazyArray(r) => self.new_lazy_array(key, parent, r),
            Snapshot::ValueArray(data) => {
                let new_id = self.new_value_array(key, parent);
                self.replace_in_place(new_id, NodeKind::ValueArray(data))
                    .expect("freshly allocated node");
                new_id
            }
            Snapshot::Object(children) => {
                let new_id = self.new_object(key, parent);
                let new_children: Vec<NodeId> = children
                    .into_iter()
                    .map(|c| self.clone_node_with_parent(c, Some(new_id)))
                    .collect();
                self.replace_in_place(new_id, NodeKind::Object(new_children))
                    .expect("freshly allocated node");
                new_id
            }
            Snapshot::ObjectArray(children) => {
                let new_id = self.new_object_array(key, parent);
                let new_children: Vec<NodeId> = children
                    .into_iter()
                    .map(|c| self.clone_node_with_parent(c, Some(new_id)))
                    .collect();
                self.replace_in_place(new_id, NodeKind::ObjectArray(new_children))
                    .expect("freshly allocated node");
                new_id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::value::Scalar;

    fn build() -> (Tree, NodeId) {
        let mut tree = Tree::new(Options::default());
        let root = json_io::parse_into(
            &mut tree,
            r#"{"name":"张三","age":1,"tags":["a","b"]}"#,
            None,
            None,
        )
        .unwrap();
        (tree, root)
    }

    #[test]
    fn get_scalar_by_path() {
        let (mut tree, root) = build();
        assert_eq!(tree.get::<String>(root, "name"), "张三");
        assert_eq!(tree.get::<i64>(root, "age"), 1);
    }

    #[test]
    fn get_missing_path_returns_default() {
        let (mut tree, root) = build();
        assert_eq!(tree.get::<i64>(root, "missing"), 0);
    }

    #[test]
    fn set_scalar_preserves_tag() {
        let (mut tree, root) = build();
        tree.set(root, "age", "2").unwrap();
        assert_eq!(tree.get::<i64>(root, "age"), 2);
    }

    #[test]
    fn set_via_path_then_read_back() {
        let (mut tree, root) = build();
        tree.set(root, "name", "李四").unwrap();
        assert_eq!(tree.get::<String>(root, "name"), "李四");
    }

    #[test]
    fn add_field_then_remove() {
        let (mut tree, root) = build();
        tree.add_field(root, "city", "shanghai").unwrap();
        assert_eq!(tree.get::<String>(root, "city"), "shanghai");
        tree.remove(root, "city").unwrap();
        assert_eq!(tree.get::<String>(root, "city"), "");
    }

    #[test]
    fn value_array_append_and_positional_get() {
        let (mut tree, root) = build();
        let tags = tree.get_node(root, "tags").unwrap();
        tree.add_value(tags, "c").unwrap();
        assert_eq!(tree.get::<String>(root, "tags.$3"), "c");
    }

    #[test]
    fn clone_is_deep_and_independent() {
        let (mut tree, root) = build();
        let clone_id = tree.clone_node(root);
        tree.set(root, "age", 99).unwrap();
        assert_eq!(tree.get::<i64>(root, "age"), 99);
        assert_eq!(tree.get::<i64>(clone_id, "age"), 1);
        assert!(tree.parent(clone_id).is_none());
    }

    #[test]
    fn object_array_element_replaced_by_json() {
        let mut tree = Tree::new(Options::default());
        let root = json_io::parse_into(&mut tree, r#"{"students":[{"age":1}]}"#, None, None).unwrap();
        tree.set_json(root, "students.$1", r#"{"age":2}"#).unwrap();
        assert_eq!(tree.get::<i64>(root, "students.$1.age"), 2);
    }

    #[test]
    fn scalar_default_for_bool_tag() {
        // Covers the Scalar::decode/coerce default-on-failure contract,
        // exercised here through the ops-level `get`.
        let mut tree = Tree::new(Options::default());
        let root = tree.new_object(None, None);
        let flag = tree.new_scalar(Some("ok".to_string()), Some(root), Scalar::Bool(true));
        tree.object_put_child(root, "ok".to_string(), flag).unwrap();
        assert_eq!(tree.get::<i64>(root, "ok"), 1);
    }
}
