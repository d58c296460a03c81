// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diff-tuple computation shared by every file analyzer: partitions two
//! snapshots' keys into common, added, and removed, covering every key in
//! either snapshot exactly once.

use std::collections::HashMap;
use std::hash::Hash;

/// `(common, added, removed)` over two `(path → value)` snapshot maps.
/// `common` is `before.keys ∩ after.keys`; `added` is `after.keys \ common`;
/// `removed` is `before.keys \ common`. If either side is missing entirely,
/// the diff is the empty tuple (both maps treated as empty).
pub fn diff_keys<K: Eq + Hash + Clone, V>(
    before: Option<&HashMap<K, V>>,
    after: Option<&HashMap<K, V>>,
) -> (Vec<K>, Vec<K>, Vec<K>) {
    let empty = HashMap::new();
    let before = before.unwrap_or(&empty);
    let after = after.unwrap_or(&empty);

    let common: Vec<K> = before.keys().filter(|k| after.contains_key(*k)).cloned().collect();
    let added: Vec<K> = after.keys().filter(|k| !before.contains_key(*k)).cloned().collect();
    let removed: Vec<K> = before.keys().filter(|k| !after.contains_key(*k)).cloned().collect();
    (common, added, removed)
}
