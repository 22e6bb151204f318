//! An in-memory document store: a tagged node-tree document model, dotted
//! path / `$N` addressing, an order-M B+ tree, composite-key secondary
//! indexes, a record container (`Table`), and a line-oriented snapshot
//! codec.

pub mod error;
pub mod index;
pub mod node;
pub mod options;
pub mod predicate;
pub mod snapshot;
pub mod table;
pub mod value;

mod bptree;

pub use error::{Error, Result};
pub use node::{NodeId, NodeKind, Tree};
pub use options::Options;
pub use table::Table;
pub use value::{Scalar, Tag};

// The B+ tree is an internal building block of `index`; callers reach
// ordered range scans through `Table`/`IndexManager`, not the tree directly.
pub use bptree::{BPlusTree, Comparator, DEFAULT_ORDER};
