//! JSON parsing into the node arena, canonical JSON rendering, and lazy
//! materialization (spec §3 "Lifecycle"/"Lazy materialization", §4.B
//! `to_json`/`add_json`/`ParseNode`/`ParseArrayNode`).

use super::{NodeId, NodeKind, Tree, ValueArrayData};
use crate::error::{Error, Result};
use crate::value::Scalar;
use serde_json::value::RawValue;
use serde_json::Value as Json;

/// Converts a `serde_json::Number` into the narrowest scalar kind that holds
/// it without loss (spec §3 "ValueArray... homogeneous... of a single
/// element type chosen at first insertion" — applied here to pick a natural
/// numeric representation on parse).
fn number_to_scalar(n: &serde_json::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
            Scalar::Int32(i as i32)
        } else {
            Scalar::Int64(i)
        }
    } else {
        Scalar::Float64(n.as_f64().unwrap_or_default())
    }
}

/// Builds a full node subtree from `value`, eagerly in full or leaving
/// containers as `Lazy*` one level at a time, depending on `tree.enable_lazy`.
pub fn build_node(tree: &mut Tree, value: &Json, key: Option<String>, parent: Option<NodeId>) -> Result<NodeId> {
    match value {
        Json::Null => Ok(tree.new_scalar(key, parent, Scalar::Null)),
        Json::Bool(b) => Ok(tree.new_scalar(key, parent, Scalar::Bool(*b))),
        Json::Number(n) => Ok(tree.new_scalar(key, parent, number_to_scalar(n))),
        Json::String(s) => Ok(tree.new_scalar(key, parent, Scalar::String(s.clone()))),
        Json::Array(items) => build_array(tree, items, key, parent),
        Json::Object(map) => build_object(tree, map, key, parent),
    }
}

fn to_raw(value: &Json) -> Box<RawValue> {
    RawValue::from_string(value.to_string()).expect("serde_json::Value always re-serializes")
}

/// Builds an `Object` node's children one level deep: scalar members are
/// materialized immediately, object/array members become `Lazy*` children
/// when `tree.enable_lazy` is set (spec §3/§4.B "children may themselves be
/// lazy if enable_lazy requested").
fn build_object(
    tree: &mut Tree,
    map: &serde_json::Map<String, Json>,
    key: Option<String>,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    let object_id = tree.new_object(key, parent);
    for (member_key, member_value) in map {
        let child = build_member(tree, member_value, object_id)?;
        tree.object_put_child(object_id, member_key.clone(), child)?;
    }
    Ok(object_id)
}

fn build_member(tree: &mut Tree, value: &Json, parent: NodeId) -> Result<NodeId> {
    match value {
        Json::Object(_) if tree.enable_lazy => {
            Ok(tree.new_lazy_object(None, Some(parent), to_raw(value)))
        }
        Json::Array(_) if tree.enable_lazy => {
            Ok(tree.new_lazy_array(None, Some(parent), to_raw(value)))
        }
        other => build_node(tree, other, None, Some(parent)),
    }
}

/// Decides `ValueArray` vs `ObjectArray` from the JSON array's elements
/// (spec §3: `ValueArray` is homogeneous primitives, `ObjectArray` holds
/// `Object`/`LazyObject` elements).
fn build_array(tree: &mut Tree, items: &[Json], key: Option<String>, parent: Option<NodeId>) -> Result<NodeId> {
    let all_objects = !items.is_empty() && items.iter().all(|v| v.is_object());
    if all_objects {
        let array_id = tree.new_object_array(key, parent);
        for item in items {
            let element = match item {
                Json::Object(_) if tree.enable_lazy => {
                    tree.new_lazy_object(None, Some(array_id), to_raw(item))
                }
                Json::Object(map) => build_object(tree, map, None, Some(array_id))?,
                _ => unreachable!("all_objects checked above"),
            };
            tree.object_array_push(array_id, element)?;
        }
        Ok(array_id)
    } else {
        let array_id = tree.new_value_array(key, parent);
        for item in items {
            let scalar = match item {
                Json::Null => Scalar::Null,
                Json::Bool(b) => Scalar::Bool(*b),
                Json::Number(n) => number_to_scalar(n),
                Json::String(s) => Scalar::String(s.clone()),
                Json::Array(_) | Json::Object(_) => {
                    return Err(Error::Unsupported(
                        "ValueArray elements must be primitive; mixing in nested objects or arrays is not supported",
                    ))
                }
            };
            tree.value_array_push(array_id, scalar)?;
        }
        Ok(array_id)
    }
}

/// Parses `text` and builds a node rooted at `key`/`parent` from it (spec
/// §4.B `add_json`/`ParseNode`/`ParseArrayNode`).
pub fn parse_into(tree: &mut Tree, text: &str, key: Option<String>, parent: Option<NodeId>) -> Result<NodeId> {
    let value: Json = serde_json::from_str(text)?;
    build_node(tree, &value, key, parent)
}

/// Materializes `id` in place if it is a `Lazy*` node (spec §3 invariant 4).
/// No-op (and not an error) for any other kind.
pub fn ensure_materialized(tree: &mut Tree, id: NodeId) -> Result<()> {
    let raw = match tree.kind(id)? {
        NodeKind::LazyObject(raw) => raw.get().to_string(),
        NodeKind::LazyArray(raw) => raw.get().to_string(),
        _ => return Ok(()),
    };
    tracing::trace!(node = %id, "materializing lazy node");
    let value: Json = serde_json::from_str(&raw)?;
    let new_kind = match value {
        Json::Object(ref map) => {
            let mut children = Vec::with_capacity(map.len());
            for (k, v) in map {
                let child = build_member(tree, v, id)?;
                tree.set_key(child, Some(k.clone()));
                children.push(child);
            }
            if tree.options.sort {
                children.sort_by(|a, b| tree.key(*a).unwrap_or("").cmp(tree.key(*b).unwrap_or("")));
            }
            NodeKind::Object(children)
        }
        Json::Array(ref items) => {
            let all_objects = !items.is_empty() && items.iter().all(|v| v.is_object());
            if all_objects {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    let child = build_member(tree, item, id)?;
                    children.push(child);
                }
                NodeKind::ObjectArray(children)
            } else {
                let mut data = ValueArrayData::default();
                for item in items {
                    let scalar = match item {
                        Json::Null => Scalar::Null,
                        Json::Bool(b) => Scalar::Bool(*b),
                        Json::Number(n) => number_to_scalar(n),
                        Json::String(s) => Scalar::String(s.clone()),
                        Json::Array(_) | Json::Object(_) => {
                            return Err(Error::Unsupported("ValueArray elements must be primitive"))
                        }
                    };
                    data.push(scalar)?;
                }
                NodeKind::ValueArray(data)
            }
        }
        other => NodeKind::Scalar(match other {
            Json::Null => Scalar::Null,
            Json::Bool(b) => Scalar::Bool(b),
            Json::Number(n) => number_to_scalar(&n),
            Json::String(s) => Scalar::String(s),
            _ => unreachable!(),
        }),
    };
    tree.replace_in_place(id, new_kind)
}

/// Canonical JSON rendering (spec §4.B `to_json`). Lazy nodes emit their
/// stored text verbatim (already whitespace-free, since it was captured via
/// a compact re-serialization at parse time).
pub fn to_json(tree: &Tree, id: NodeId) -> Result<String> {
    let mut out = String::new();
    write_json(tree, id, &mut out)?;
    Ok(out)
}

fn write_json(tree: &Tree, id: NodeId, out: &mut String) -> Result<()> {
    match tree.kind(id)? {
        NodeKind::Scalar(s) => out.push_str(&scalar_json(s)),
        NodeKind::Object(children) => {
            out.push('{');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(tree.key(*child).unwrap_or(""))?);
                out.push(':');
                write_json(tree, *child, out)?;
            }
            out.push('}');
        }
        NodeKind::ObjectArray(children) => {
            out.push('[');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json(tree, *child, out)?;
            }
            out.push(']');
        }
        NodeKind::ValueArray(data) => {
            out.push('[');
            for (i, item) in data.items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&scalar_json(item));
            }
            out.push(']');
        }
        NodeKind::LazyObject(raw) | NodeKind::LazyArray(raw) => out.push_str(raw.get()),
    }
    Ok(())
}

fn scalar_json(scalar: &Scalar) -> String {
    let value = match scalar {
        Scalar::Null => Json::Null,
        Scalar::Bool(b) => Json::Bool(*b),
        Scalar::Int32(n) => Json::Number((*n).into()),
        Scalar::Int64(n) => Json::Number((*n).into()),
        Scalar::Float64(n) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Scalar::String(s) => Json::String(s.clone()),
    };
    value.to_string()
}
