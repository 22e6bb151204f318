//! Point/prefix/range scan plumbing over the linked leaf chain (spec §4.C
//! `find`, `left_find`, `range_find`).

use super::{BPlusTree, Comparator};
use std::cmp::Ordering;

impl<K: Clone, V: Clone> BPlusTree<K, V> {
    /// `left_find` (spec §4.C): walk to the first leaf whose routing
    /// contains the prefix, then scan linked leaves while `left_cmp` yields
    /// `Equal` (the glossary's "prefix comparator": equal iff the stored key
    /// begins with the probe).
    pub fn left_find(&self, probe: &K, left_cmp: Comparator<K>) -> Vec<V> {
        let mut link = self.find_leaf_leftmost(probe, left_cmp);
        let mut out = Vec::new();
        let mut started = false;
        loop {
            let (keys, values) = self.leaf_entries(link);
            for (k, v) in keys.iter().zip(values.iter()) {
                match left_cmp(k, probe) {
                    Ordering::Equal => {
                        started = true;
                        out.push(v.clone());
                    }
                    _ if started => return out,
                    _ => {}
                }
            }
            match self.leaf_next(link) {
                Some(next) => link = next,
                None => return out,
            }
        }
    }

    /// `range_find` (spec §4.C, standardized per §9): route to the leaf
    /// containing `lo`, then scan forward while `cmp(key, hi) != Greater`,
    /// collecting entries with `cmp(key, lo) != Less` — inclusive `[lo, hi]`.
    pub fn range_find(&self, lo: &K, hi: &K, cmp: Comparator<K>) -> Vec<V> {
        let mut link = self.find_leaf_link(lo, cmp);
        let mut out = Vec::new();
        loop {
            let (keys, values) = self.leaf_entries(link);
            for (k, v) in keys.iter().zip(values.iter()) {
                if cmp(k, lo) == Ordering::Less {
                    continue;
                }
                if cmp(k, hi) == Ordering::Greater {
                    return out;
                }
                out.push(v.clone());
            }
            match self.leaf_next(link) {
                Some(next) => link = next,
                None => return out,
            }
        }
    }

    /// Adapter for the source's alternate range shape (spec §9 "Range
    /// comparator API"): a single comparator returning `Less` while still
    /// before the range, `Equal` while inside it, and `Greater` once past
    /// the end. Routes using `within` itself as the ordering against a
    /// synthetic zero point, scanning from the head of the chain since the
    /// legacy shape carries no separate lower-bound key to route on.
    pub fn range_find_legacy(&self, within: &dyn Fn(&K) -> Ordering) -> Vec<V> {
        let mut link = self.head_leaf();
        let mut out = Vec::new();
        loop {
            let (keys, values) = self.leaf_entries(link);
            for (k, v) in keys.iter().zip(values.iter()) {
                match within(k) {
                    Ordering::Less => continue,
                    Ordering::Equal => out.push(v.clone()),
                    Ordering::Greater => return out,
                }
            }
            match self.leaf_next(link) {
                Some(next) => link = next,
                None => return out,
            }
        }
    }

    /// All entries in ascending key order (used by snapshot-free debugging
    /// and by `Table` predicate iteration fallbacks).
    pub fn iter_all(&self) -> Vec<(K, V)> {
        let mut link = self.head_leaf();
        let mut out = Vec::new();
        loop {
            let (keys, values) = self.leaf_entries(link);
            out.extend(keys.iter().cloned().zip(values.iter().cloned()));
            match self.leaf_next(link) {
                Some(next) => link = next,
                None => return out,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::BPlusTree;
    use std::cmp::Ordering;

    fn str_cmp(a: &String, b: &String) -> Ordering {
        a.cmp(b)
    }

    fn prefix_cmp(stored: &String, probe: &String) -> Ordering {
        if stored.starts_with(probe.as_str()) {
            Ordering::Equal
        } else {
            stored.cmp(probe)
        }
    }

    #[test]
    fn left_find_matches_prefix_only() {
        let mut tree: BPlusTree<String, i64> = BPlusTree::new(4);
        for (i, k) in ["张三1", "张三2", "张三丰", "李四"].iter().enumerate() {
            tree.insert(k.to_string(), i as i64, &str_cmp).unwrap();
        }
        let mut found = tree.left_find(&"张三".to_string(), &prefix_cmp);
        found.sort();
        assert_eq!(found, vec![0, 1]);

        let exact = tree.left_find(&"张三1".to_string(), &prefix_cmp);
        assert_eq!(exact, vec![0]);
    }

    fn int_cmp(a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn range_find_is_inclusive() {
        let mut tree: BPlusTree<i64, i64> = BPlusTree::new(4);
        for age in [10, 12, 15, 20, 25] {
            tree.insert(age, age, &int_cmp).unwrap();
        }
        let mut found = tree.range_find(&12, &20, &int_cmp);
        found.sort();
        assert_eq!(found, vec![12, 15, 20]);
    }

    #[test]
    fn range_find_respects_splits() {
        let mut tree: BPlusTree<i64, i64> = BPlusTree::new(4);
        for i in 0..500 {
            tree.insert(i, i, &int_cmp).unwrap();
        }
        let found = tree.range_find(&100, &110, &int_cmp);
        assert_eq!(found, (100..=110).collect::<Vec<_>>());
    }
}
