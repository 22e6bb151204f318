//! Predicate combinators (spec §6 "Predicate helpers", §4.E "Predicate
//! iteration"). Each helper returns a closure of the shape consumed by
//! [`crate::table::Table::filter`]: `Fn(&mut Tree, NodeId) -> bool`, reading
//! the candidate node only through `Tree::get`/`Tree::get_node` — these never
//! reach into index or table-level state.

use crate::node::cast::FromScalar;
use crate::node::{NodeId, NodeKind, Tree};
use regex::Regex;

/// `eq(path, value)`: true when the field at `path` casts equal to `value`.
pub fn eq<T>(path: impl Into<String>, value: T) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialEq + Clone,
{
    let path = path.into();
    move |tree, node| tree.get::<T>(node, &path) == value
}

/// `ne(path, value)`.
pub fn ne<T>(path: impl Into<String>, value: T) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialEq + Clone,
{
    let path = path.into();
    move |tree, node| tree.get::<T>(node, &path) != value
}

/// `lt(path, value)`.
pub fn lt<T>(path: impl Into<String>, value: T) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialOrd + Clone,
{
    let path = path.into();
    move |tree, node| tree.get::<T>(node, &path) < value
}

/// `le(path, value)`.
pub fn le<T>(path: impl Into<String>, value: T) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialOrd + Clone,
{
    let path = path.into();
    move |tree, node| tree.get::<T>(node, &path) <= value
}

/// `gt(path, value)`.
pub fn gt<T>(path: impl Into<String>, value: T) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialOrd + Clone,
{
    let path = path.into();
    move |tree, node| tree.get::<T>(node, &path) > value
}

/// `ge(path, value)` (spec §8 scenario 3: `ge("age", 15)`).
pub fn ge<T>(path: impl Into<String>, value: T) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialOrd + Clone,
{
    let path = path.into();
    move |tree, node| tree.get::<T>(node, &path) >= value
}

/// `like(path, pattern)`: regex match over the field's text rendering.
/// A malformed pattern never matches (never panics the predicate).
pub fn like(path: impl Into<String>, pattern: &str) -> impl Fn(&mut Tree, NodeId) -> bool {
    let path = path.into();
    let compiled = Regex::new(pattern).ok();
    move |tree, node| match &compiled {
        Some(re) => re.is_match(&tree.get::<String>(node, &path)),
        None => false,
    }
}

/// `in_(path, values)`: true when the field's value is one of `values`.
pub fn in_<T>(path: impl Into<String>, values: Vec<T>) -> impl Fn(&mut Tree, NodeId) -> bool
where
    T: FromScalar + PartialEq + Clone,
{
    let path = path.into();
    move |tree, node| values.contains(&tree.get::<T>(node, &path))
}

/// `null(path)`: true when the resolved target is a `Scalar::Null`, or the
/// path fails to resolve at all.
pub fn is_null(path: impl Into<String>) -> impl Fn(&mut Tree, NodeId) -> bool {
    let path = path.into();
    move |tree, node| match tree.get_node(node, &path) {
        Some(id) => matches!(tree.kind(id), Ok(NodeKind::Scalar(crate::value::Scalar::Null))),
        None => true,
    }
}

/// `not_null(path)`.
pub fn not_null(path: impl Into<String>) -> impl Fn(&mut Tree, NodeId) -> bool {
    let inner = is_null(path);
    move |tree, node| !inner(tree, node)
}

/// `len(path)`: the element count of a `ValueArray`/`ObjectArray` at `path`,
/// or 0 when the path does not resolve to an array.
pub fn len(path: impl Into<String>) -> impl Fn(&mut Tree, NodeId) -> usize {
    let path = path.into();
    move |tree, node| match tree.get_node(node, &path) {
        Some(id) => tree.array_len(id).unwrap_or(0),
        None => 0,
    }
}

/// `and(predicates…)`: short-circuiting conjunction.
pub fn and_<F>(predicates: Vec<F>) -> impl Fn(&mut Tree, NodeId) -> bool
where
    F: Fn(&mut Tree, NodeId) -> bool,
{
    move |tree, node| predicates.iter().all(|p| p(tree, node))
}

/// `or(predicates…)`: short-circuiting disjunction.
pub fn or_<F>(predicates: Vec<F>) -> impl Fn(&mut Tree, NodeId) -> bool
where
    F: Fn(&mut Tree, NodeId) -> bool,
{
    move |tree, node| predicates.iter().any(|p| p(tree, node))
}
