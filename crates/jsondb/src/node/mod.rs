//! The document node model (spec §3, §4.B).
//!
//! A [`Tree`] is an arena of [`NodeEntry`] slots addressed by [`NodeId`]
//! (index plus generation, the same discipline the teacher's bump allocator
//! uses to keep handles cheap to copy — generalized here to a reusable slot
//! list because, unlike a bump arena, this tree must support structural
//! removal across a table's whole lifetime). Parent references are plain
//! `NodeId` back-edges (spec §9: "relation + lookup, not ownership"); they
//! are never followed to free anything and are dropped, not cloned, by
//! [`Tree::clone_subtree`].

pub mod cast;
pub mod json_io;
pub mod ops;
pub mod path;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::value::{Scalar, Tag};
use serde_json::value::RawValue;

/// A stable handle to a node inside a [`Tree`]. Carries a generation counter
/// so a handle outlived by a `remove` is detected rather than silently
/// aliasing a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}g{}", self.index, self.generation)
    }
}

/// The kind-dependent payload of a node (spec §3).
#[derive(Debug)]
pub enum NodeKind {
    Scalar(Scalar),
    Object(Vec<NodeId>),
    ValueArray(ValueArrayData),
    ObjectArray(Vec<NodeId>),
    LazyObject(Box<RawValue>),
    LazyArray(Box<RawValue>),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Scalar(_) => "scalar",
            NodeKind::Object(_) => "object",
            NodeKind::ValueArray(_) => "value_array",
            NodeKind::ObjectArray(_) => "object_array",
            NodeKind::LazyObject(_) => "lazy_object",
            NodeKind::LazyArray(_) => "lazy_array",
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, NodeKind::LazyObject(_) | NodeKind::LazyArray(_))
    }
}

/// Payload of a `ValueArray`: a homogeneous run of scalars (spec §3
/// invariant 3). `element_tag` is fixed by the first insertion.
#[derive(Debug, Clone, Default)]
pub struct ValueArrayData {
    pub element_tag: Option<Tag>,
    pub items: Vec<Scalar>,
}

impl ValueArrayData {
    pub fn push(&mut self, value: Scalar) -> Result<()> {
        let tag = value.tag();
        match self.element_tag {
            None => self.element_tag = Some(tag),
            Some(existing) if existing == tag => {}
            Some(existing) => {
                return Err(Error::HeterogeneousArray {
                    existing: tag_name(existing),
                    attempted: tag_name(tag),
                })
            }
        }
        self.items.push(value);
        Ok(())
    }
}

fn tag_name(tag: Tag) -> &'static str {
    match tag {
        Tag::Null => "null",
        Tag::Object => "object",
        Tag::String => "string",
        Tag::Int32 => "int32",
        Tag::Int64 => "int64",
        Tag::Float64 => "float64",
        Tag::Bool => "bool",
        Tag::ObjectArray => "object_array",
        Tag::ValueArray => "value_array",
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    key: Option<String>,
    parent: Option<NodeId>,
    kind: NodeKind,
}

struct Slot {
    generation: u32,
    entry: Option<NodeEntry>,
}

/// The arena owning every node reachable from a document root.
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pub options: Options,
    /// When set, materializing a `Lazy*` node keeps its own container
    /// children lazy rather than fully expanding them (spec §3/§4.B).
    pub enable_lazy: bool,
}

impl Tree {
    pub fn new(options: Options) -> Tree {
        Tree {
            slots: Vec::new(),
            free: Vec::new(),
            options,
            enable_lazy: false,
        }
    }

    fn alloc(&mut self, entry: NodeEntry) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn slot(&self, id: NodeId) -> Option<&NodeEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
    }

    /// Frees `id` and, recursively, every descendant it owns. Does not
    /// touch the parent's child list — callers detach first.
    fn free_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.slot(id) {
            Some(entry) => match &entry.kind {
                NodeKind::Object(c) | NodeKind::ObjectArray(c) => c.clone(),
                _ => Vec::new(),
            },
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind> {
        self.slot(id)
            .map(|e| &e.kind)
            .ok_or(Error::Unsupported("stale or unknown node handle"))
    }

    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.slot(id).and_then(|e| e.key.as_deref())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|e| e.parent)
    }

    fn set_key(&mut self, id: NodeId, key: Option<String>) {
        if let Some(e) = self.slot_mut(id) {
            e.key = key;
        }
    }

    // --- construction -----------------------------------------------------

    pub fn new_scalar(&mut self, key: Option<String>, parent: Option<NodeId>, v: Scalar) -> NodeId {
        self.alloc(NodeEntry {
            key,
            parent,
            kind: NodeKind::Scalar(v),
        })
    }

    pub fn new_object(&mut self, key: Option<String>, parent: Option<NodeId>) -> NodeId {
        self.alloc(NodeEntry {
            key,
            parent,
            kind: NodeKind::Object(Vec::new()),
        })
    }

    pub fn new_value_array(&mut self, key: Option<String>, parent: Option<NodeId>) -> NodeId {
        self.alloc(NodeEntry {
            key,
            parent,
            kind: NodeKind::ValueArray(ValueArrayData::default()),
        })
    }

    pub fn new_object_array(&mut self, key: Option<String>, parent: Option<NodeId>) -> NodeId {
        self.alloc(NodeEntry {
            key,
            parent,
            kind: NodeKind::ObjectArray(Vec::new()),
        })
    }

    pub fn new_lazy_object(
        &mut self,
        key: Option<String>,
        parent: Option<NodeId>,
        raw: Box<RawValue>,
    ) -> NodeId {
        self.alloc(NodeEntry {
            key,
            parent,
            kind: NodeKind::LazyObject(raw),
        })
    }

    pub fn new_lazy_array(
        &mut self,
        key: Option<String>,
        parent: Option<NodeId>,
        raw: Box<RawValue>,
    ) -> NodeId {
        self.alloc(NodeEntry {
            key,
            parent,
            kind: NodeKind::LazyArray(raw),
        })
    }

    // --- object child management -------------------------------------------

    /// Finds the child of `object` with the given `key`, honoring the
    /// sort/binary-search options (spec §4.B "Child lookup").
    pub fn object_find(&self, object: NodeId, key: &str) -> Option<(usize, NodeId)> {
        let children = match self.kind(object).ok()? {
            NodeKind::Object(c) => c,
            _ => return None,
        };
        if self.options.uses_binary_search() {
            children
                .binary_search_by(|id| self.key(*id).unwrap_or("").cmp(key))
                .ok()
                .map(|i| (i, children[i]))
        } else {
            children
                .iter()
                .position(|id| self.key(*id) == Some(key))
                .map(|i| (i, children[i]))
        }
    }

    /// Inserts or replaces `key` on `object` with an already-built node,
    /// preserving sorted order when `options.sort` is set (spec §3
    /// invariant 2). Returns the id of the new child; frees the replaced
    /// subtree, if any.
    pub fn object_put_child(&mut self, object: NodeId, key: String, child: NodeId) -> Result<()> {
        self.set_key(child, Some(key.clone()));
        if let Some(e) = self.slot_mut(child) {
            e.parent = Some(object);
        }
        let existing = self.object_find(object, &key);
        let children = match self.slot_mut(object).map(|e| &mut e.kind) {
            Some(NodeKind::Object(c)) => c,
            _ => {
                return Err(Error::ShapeMismatch {
                    expected: "object",
                    actual: "other",
                })
            }
        };
        match existing {
            Some((idx, old_id)) => {
                children[idx] = child;
                self.free_subtree(old_id);
            }
            None => {
                if self.options.sort {
                    let pos = children
                        .iter()
                        .position(|id| self.key(*id).unwrap_or("") > key.as_str())
                        .unwrap_or(children.len());
                    children.insert(pos, child);
                } else {
                    children.push(child);
                }
            }
        }
        Ok(())
    }

    /// Detaches (and frees) the child of `object` named `key`.
    pub fn object_remove_child(&mut self, object: NodeId, key: &str) -> Result<bool> {
        let found = self.object_find(object, key);
        let (idx, child) = match found {
            Some(v) => v,
            None => return Ok(false),
        };
        if let Some(NodeKind::Object(children)) = self.slot_mut(object).map(|e| &mut e.kind) {
            children.remove(idx);
        }
        self.free_subtree(child);
        Ok(true)
    }

    // --- array element management -------------------------------------------

    pub fn array_len(&self, array: NodeId) -> Result<usize> {
        match self.kind(array)? {
            NodeKind::ObjectArray(c) => Ok(c.len()),
            NodeKind::ValueArray(v) => Ok(v.items.len()),
            other => Err(Error::ShapeMismatch {
                expected: "array",
                actual: other.type_name(),
            }),
        }
    }

    /// Appends an already-constructed object/lazy-object node to an
    /// `ObjectArray`.
    pub fn object_array_push(&mut self, array: NodeId, child: NodeId) -> Result<usize> {
        if let Some(e) = self.slot_mut(child) {
            e.parent = Some(array);
            e.key = None;
        }
        match self.slot_mut(array).map(|e| &mut e.kind) {
            Some(NodeKind::ObjectArray(c)) => {
                c.push(child);
                Ok(c.len() - 1)
            }
            _ => Err(Error::ShapeMismatch {
                expected: "object_array",
                actual: "other",
            }),
        }
    }

    /// Replaces the element at 1-based index `n` of an `ObjectArray`.
    pub fn object_array_set(&mut self, array: NodeId, n: usize, child: NodeId) -> Result<()> {
        if let Some(e) = self.slot_mut(child) {
            e.parent = Some(array);
            e.key = None;
        }
        let old = match self.slot_mut(array).map(|e| &mut e.kind) {
            Some(NodeKind::ObjectArray(c)) if n >= 1 && n <= c.len() => {
                let old = c[n - 1];
                c[n - 1] = child;
                old
            }
            _ => {
                return Err(Error::ShapeMismatch {
                    expected: "object_array",
                    actual: "other",
                })
            }
        };
        self.free_subtree(old);
        Ok(())
    }

    /// Removes the element at 1-based index `n` of an `ObjectArray` or
    /// `ValueArray`.
    pub fn array_remove(&mut self, array: NodeId, n: usize) -> Result<()> {
        match self.slot_mut(array).map(|e| &mut e.kind) {
            Some(NodeKind::ObjectArray(c)) if n >= 1 && n <= c.len() => {
                let old = c.remove(n - 1);
                self.free_subtree(old);
                Ok(())
            }
            Some(NodeKind::ValueArray(v)) if n >= 1 && n <= v.items.len() => {
                v.items.remove(n - 1);
                Ok(())
            }
            _ => Err(Error::Unsupported("index out of range or not an array")),
        }
    }

    pub fn value_array_set(&mut self, array: NodeId, n: usize, value: Scalar) -> Result<()> {
        match self.slot_mut(array).map(|e| &mut e.kind) {
            Some(NodeKind::ValueArray(v)) if n >= 1 && n <= v.items.len() => {
                v.items[n - 1] = value;
                Ok(())
            }
            _ => Err(Error::Unsupported("index out of range or not a value array")),
        }
    }

    pub fn value_array_push(&mut self, array: NodeId, value: Scalar) -> Result<()> {
        match self.slot_mut(array).map(|e| &mut e.kind) {
            Some(NodeKind::ValueArray(v)) => v.push(value),
            _ => Err(Error::ShapeMismatch {
                expected: "value_array",
                actual: "other",
            }),
        }
    }

    /// Replaces the entire node at `id` in its parent's payload, at the same
    /// position, per spec §3 invariant 4 ("every LazyX that is accessed is
    /// replaced ... in O(1) (pointer replace)"). The old id is freed (but not
    /// its children, which the new node's materialization reuses by value).
    pub fn replace_in_place(&mut self, old: NodeId, new_kind: NodeKind) -> Result<()> {
        let entry = self
            .slots
            .get_mut(old.index as usize)
            .filter(|s| s.generation == old.generation)
            .and_then(|s| s.entry.as_mut())
            .ok_or(Error::Unsupported("stale or unknown node handle"))?;
        entry.kind = new_kind;
        Ok(())
    }

    // --- cloning -------------------------------------------------------------

    /// Deep-clones `id` into `dest` (a different tree, or the same one),
    /// with `parent` as the clone's new parent back-edge. Lazy nodes are
    /// shallow-copied (spec §3 Lifecycle: "shallow for Lazy").
    pub fn clone_subtree(&mut self, src: &Tree, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let entry = src.slot(id).expect("clone of stale node id");
        match &entry.kind {
            NodeKind::Scalar(v) => self.new_scalar(entry.key.clone(), parent, v.clone()),
            NodeKind::LazyObject(raw) => {
                self.new_lazy_object(entry.key.clone(), parent, raw.clone())
            }
            NodeKind::LazyArray(raw) => self.new_lazy_array(entry.key.clone(), parent, raw.clone()),
            NodeKind::ValueArray(v) => {
                let new_id = self.new_value_array(entry.key.clone(), parent);
                if let Some(NodeKind::ValueArray(dest)) =
                    self.slot_mut(new_id).map(|e| &mut e.kind)
                {
                    *dest = v.clone();
                }
                new_id
            }
            NodeKind::Object(children) => {
                let new_id = self.new_object(entry.key.clone(), parent);
                let children = children.clone();
                let mut new_children = Vec::with_capacity(children.len());
                for child in children {
                    new_children.push(self.clone_subtree(src, child, Some(new_id)));
                }
                if let Some(NodeKind::Object(dest)) = self.slot_mut(new_id).map(|e| &mut e.kind) {
                    *dest = new_children;
                }
                new_id
            }
            NodeKind::ObjectArray(children) => {
                let new_id = self.new_object_array(entry.key.clone(), parent);
                let children = children.clone();
                let mut new_children = Vec::with_capacity(children.len());
                for child in children {
                    new_children.push(self.clone_subtree(src, child, Some(new_id)));
                }
                if let Some(NodeKind::ObjectArray(dest)) =
                    self.slot_mut(new_id).map(|e| &mut e.kind)
                {
                    *dest = new_children;
                }
                new_id
            }
        }
    }
}
