//! Dotted-path / `$N` addressing over the node arena (spec §3 "Addressing",
//! §4.B "Navigation algorithm", §8 invariant 5 "Path address idempotence").

use jsondb::node::json_io;
use jsondb::{Options, Tree};

fn build(json: &str) -> (Tree, jsondb::NodeId) {
    let mut tree = Tree::new(Options::default());
    let root = json_io::parse_into(&mut tree, json, None, None).unwrap();
    (tree, root)
}

#[test]
fn nested_dotted_path_reads_scalar() {
    let (mut tree, root) = build(r#"{"a":{"b":{"c":42}}}"#);
    assert_eq!(tree.get::<i64>(root, "a.b.c"), 42);
}

#[test]
fn positional_segment_reads_object_array_element() {
    let (mut tree, root) = build(r#"{"students":[{"name":"a"},{"name":"b"}]}"#);
    assert_eq!(tree.get::<String>(root, "students.$1.name"), "a");
    assert_eq!(tree.get::<String>(root, "students.$2.name"), "b");
}

#[test]
fn out_of_range_positional_segment_is_absent_not_error() {
    let (mut tree, root) = build(r#"{"tags":["x","y"]}"#);
    assert_eq!(tree.get::<String>(root, "tags.$99"), "");
    assert_eq!(tree.get_node(root, "tags.$99"), None);
}

#[test]
fn path_idempotence_on_empty_sub_path() {
    let (mut tree, root) = build(r#"{"a":{"b":1}}"#);
    let direct = tree.get_node(root, "a").unwrap();
    let via_empty_subpath = tree.get_node(direct, "").unwrap();
    assert_eq!(direct, via_empty_subpath);
}

#[test]
fn recursive_mode_finds_descendant_by_bare_key() {
    let mut tree = Tree::new(Options {
        recursive_mode: true,
        ..Options::default()
    });
    let root = json_io::parse_into(&mut tree, r#"{"a":{"b":{"target":7}}}"#, None, None).unwrap();
    assert_eq!(tree.get::<i64>(root, "target"), 7);
}

#[test]
fn missing_segment_returns_type_default() {
    let (mut tree, root) = build(r#"{"a":1}"#);
    assert_eq!(tree.get::<i64>(root, "missing.deeper"), 0);
    assert_eq!(tree.get::<String>(root, "missing.deeper"), "");
}
