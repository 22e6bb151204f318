//! Runtime options threaded through node and table operations (spec §5, §9).
//!
//! The source implementation kept these as thread-local state; per §9's
//! "Thread-local options" redesign note we instead pass an explicit context
//! object, so concurrent callers on separate threads can hold distinct
//! configuration without any ambient global state.

/// Per-caller configuration controlling object ordering, navigation mode,
/// and the snapshot/value-codec separator and null sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Keep `Object` children sorted in ascending key order (spec §3 invariant 2).
    pub sort: bool,
    /// Use binary search for child lookup when `sort` is also set (spec §4.B).
    pub binary_search: bool,
    /// Navigate recursively (depth-first, any descendant) instead of
    /// strictly one child per path segment (spec §3 "Addressing").
    pub recursive_mode: bool,
    /// Field separator used by the value codec (spec §4.A). Reserved: must
    /// not occur, unescaped, inside a string payload.
    pub comma: char,
    /// Literal used in place of an absent value or key (spec §4.A).
    pub null_sentinel: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sort: true,
            binary_search: true,
            recursive_mode: false,
            comma: ',',
            null_sentinel: "__null__".to_string(),
        }
    }
}

impl Options {
    /// Child lookup uses binary search only when both `sort` and
    /// `binary_search` are enabled (spec §4.B "Child lookup").
    pub fn uses_binary_search(&self) -> bool {
        self.sort && self.binary_search
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = Options::default();
        assert!(opts.sort);
        assert!(opts.binary_search);
        assert!(!opts.recursive_mode);
        assert_eq!(opts.comma, ',');
        assert_eq!(opts.null_sentinel, "__null__");
        assert!(opts.uses_binary_search());
    }

    #[test]
    fn binary_search_requires_sort() {
        let mut opts = Options::default();
        opts.sort = false;
        assert!(!opts.uses_binary_search());
    }
}
