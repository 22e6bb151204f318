//! Line-oriented snapshot codec (spec §4.F): one node per line, depth-first
//! pre-order, LF-terminated, fields separated by `0x1F` (the Unit Separator
//! — DESIGN.md's resolution of §9's "Snapshot separator" Open Question: it
//! cannot appear in valid JSON text, so no escaping pass is required).
//!
//! Grounded on the teacher's serialization-policy module split
//! (`crates/doc/src/ser.rs` separates wire shape from traversal policy); the
//! wire format itself is spec-defined, not inherited.

use crate::error::{Error, Result};
use crate::node::{NodeId, NodeKind, Tree, ValueArrayData};
use crate::options::Options;
use crate::value::{Scalar, Tag};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::value::RawValue;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Unit Separator: the field delimiter (spec §9, resolved).
const SEP: char = '\u{1f}';

fn kind_int(kind: &NodeKind) -> u8 {
    match kind {
        NodeKind::Scalar(_) => 0,
        NodeKind::Object(_) => 1,
        NodeKind::ValueArray(_) => 2,
        NodeKind::ObjectArray(_) => 3,
        NodeKind::LazyObject(_) => 4,
        NodeKind::LazyArray(_) => 5,
    }
}

fn corrupt(line_no: usize, reason: impl Into<String>) -> Error {
    Error::CorruptSnapshot {
        line_no,
        reason: reason.into(),
    }
}

/// Writes `root` and everything reachable from it, depth-first pre-order
/// (spec §4.F "Writer").
pub fn write_tree(tree: &Tree, root: NodeId, out: &mut dyn Write) -> Result<()> {
    write_node(tree, root, 0, out)
}

fn write_node(tree: &Tree, id: NodeId, depth: usize, out: &mut dyn Write) -> Result<()> {
    let kind = tree.kind(id)?;
    let key = tree.key(id).unwrap_or("NULL");
    write!(out, "{depth}{SEP}{}{SEP}{key}", kind_int(kind))?;
    match kind {
        NodeKind::Scalar(s) => {
            s.check_encodable(SEP)?;
            write!(
                out,
                "{SEP}{}{SEP}{}",
                s.tag().as_char(),
                s.encode_text(&tree.options.null_sentinel)
            )?;
            writeln!(out)?;
        }
        NodeKind::Object(children) | NodeKind::ObjectArray(children) => {
            writeln!(out)?;
            for child in children.iter() {
                write_node(tree, *child, depth + 1, out)?;
            }
        }
        NodeKind::ValueArray(data) => {
            let tag_char = data.element_tag.unwrap_or(Tag::Null).as_char();
            write!(out, "{SEP}{tag_char}")?;
            for item in &data.items {
                item.check_encodable(SEP)?;
                write!(out, "{SEP}{}", item.encode_text(&tree.options.null_sentinel))?;
            }
            writeln!(out)?;
        }
        NodeKind::LazyObject(raw) | NodeKind::LazyArray(raw) => {
            if raw.get().contains(SEP) || raw.get().contains('\n') {
                return Err(Error::Unsupported(
                    "lazy node text contains the reserved separator or a newline",
                ));
            }
            write!(out, "{SEP}2{SEP}{}", raw.get())?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Reads a snapshot written by [`write_tree`] into a fresh [`Tree`], per
/// spec §4.F "Reader". `options.sort` is forced off for the duration of the
/// load (so file order is preserved verbatim) and restored on the returned
/// tree afterward.
pub fn read_tree(input: &mut dyn Read, mut options: Options) -> Result<(Tree, NodeId)> {
    let restore_sort = options.sort;
    options.sort = false;
    let mut tree = Tree::new(options);
    let mut stack: Vec<(usize, NodeId)> = Vec::new();
    let mut root: Option<NodeId> = None;

    for (line_no, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(SEP).collect();
        if fields.len() < 3 {
            return Err(corrupt(line_no, "line has fewer than 3 fields"));
        }
        let depth: usize = fields[0]
            .parse()
            .map_err(|_| corrupt(line_no, "unparseable depth"))?;
        let kind: u8 = fields[1]
            .parse()
            .map_err(|_| corrupt(line_no, "unparseable kind"))?;
        let key = if fields[2] == "NULL" {
            None
        } else {
            Some(fields[2].to_string())
        };

        while let Some(&(open_depth, _)) = stack.last() {
            if open_depth >= depth {
                stack.pop();
            } else {
                break;
            }
        }
        let parent = stack.last().map(|&(_, id)| id);

        let node_id = match kind {
            0 => {
                let tag_char = fields
                    .get(3)
                    .and_then(|s| s.chars().next())
                    .ok_or_else(|| corrupt(line_no, "scalar line missing tag"))?;
                let tag = Tag::from_char(tag_char).ok_or_else(|| corrupt(line_no, "unknown scalar tag"))?;
                let text = fields.get(4).copied().unwrap_or("");
                let scalar = Scalar::decode(tag, text, &tree.options.null_sentinel)?;
                tree.new_scalar(key.clone(), parent, scalar)
            }
            1 => tree.new_object(key.clone(), parent),
            3 => tree.new_object_array(key.clone(), parent),
            2 => {
                let tag_char = fields
                    .get(3)
                    .and_then(|s| s.chars().next())
                    .ok_or_else(|| corrupt(line_no, "value_array line missing tag"))?;
                let tag = Tag::from_char(tag_char).ok_or_else(|| corrupt(line_no, "unknown value_array tag"))?;
                let mut data = ValueArrayData::default();
                for text in &fields[4..] {
                    let scalar = Scalar::decode(tag, text, &tree.options.null_sentinel)?;
                    data.push(scalar)?;
                }
                let id = tree.new_value_array(key.clone(), parent);
                tree.replace_in_place(id, NodeKind::ValueArray(data))?;
                id
            }
            4 | 5 => {
                let raw_text = fields
                    .get(4)
                    .ok_or_else(|| corrupt(line_no, "lazy line missing payload"))?;
                let raw = RawValue::from_string(raw_text.to_string())
                    .map_err(|_| corrupt(line_no, "lazy payload is not valid JSON"))?;
                if kind == 4 {
                    tree.new_lazy_object(key.clone(), parent, raw)
                } else {
                    tree.new_lazy_array(key.clone(), parent, raw)
                }
            }
            other => return Err(corrupt(line_no, format!("unknown kind int {other}"))),
        };

        match parent {
            None => root = Some(node_id),
            Some(p) => match tree.kind(p)? {
                NodeKind::Object(_) => {
                    tree.object_put_child(p, key.unwrap_or_default(), node_id)?;
                }
                NodeKind::ObjectArray(_) => {
                    tree.object_array_push(p, node_id)?;
                }
                _ => return Err(corrupt(line_no, "parent on stack is not a container")),
            },
        }

        if matches!(kind, 1 | 3) {
            stack.push((depth, node_id));
        }
    }

    tree.options.sort = restore_sort;
    let root = root.ok_or_else(|| corrupt(0, "empty snapshot"))?;
    Ok((tree, root))
}

/// `serialize(path, compress)` (spec §6): opens `path`, optionally wraps it
/// in GZIP (fastest level, per §6 "optionally wrapped in GZIP (fastest
/// compression on write)"), and writes `root`'s subtree. No atomic rename —
/// a write aborted partway leaves a corrupt file (spec §5, documented, not
/// mitigated).
pub fn serialize_to_path(tree: &Tree, root: NodeId, path: &Path, compress: bool) -> Result<()> {
    let file = File::create(path)?;
    if compress {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::fast());
        write_tree(tree, root, &mut encoder)?;
        encoder.finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_tree(tree, root, &mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// `load(path, compress)` (spec §6).
pub fn load_from_path(path: &Path, compress: bool, options: Options) -> Result<(Tree, NodeId)> {
    let file = File::open(path)?;
    if compress {
        let mut decoder = GzDecoder::new(file);
        read_tree(&mut decoder, options)
    } else {
        let mut reader = BufReader::new(file);
        read_tree(&mut reader, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::json_io;
    use pretty_assertions::assert_eq;

    fn roundtrip(json: &str, compress: bool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.db");

        let mut tree = Tree::new(Options::default());
        let root = json_io::parse_into(&mut tree, json, None, None).unwrap();
        serialize_to_path(&tree, root, &path, compress).unwrap();

        let (loaded, loaded_root) = load_from_path(&path, compress, Options::default()).unwrap();
        let original: serde_json::Value = serde_json::from_str(&json_io::to_json(&tree, root).unwrap()).unwrap();
        let restored: serde_json::Value =
            serde_json::from_str(&json_io::to_json(&loaded, loaded_root).unwrap()).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn plain_roundtrip_preserves_structure() {
        roundtrip(r#"{"name":"张三","age":1,"tags":["a","b"],"active":true}"#, false);
    }

    #[test]
    fn gzip_roundtrip_preserves_structure() {
        roundtrip(r#"{"name":"张三","age":1,"tags":["a","b"],"active":true}"#, true);
    }

    #[test]
    fn object_array_roundtrips() {
        roundtrip(r#"{"students":[{"name":"a","age":1},{"name":"b","age":2}]}"#, false);
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        std::fs::write(&path, b"").unwrap();
        assert!(load_from_path(&path, false, Options::default()).is_err());
    }

    #[test]
    fn malformed_line_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.db");
        std::fs::write(&path, b"not-a-valid-line\n").unwrap();
        assert!(load_from_path(&path, false, Options::default()).is_err());
    }
}
