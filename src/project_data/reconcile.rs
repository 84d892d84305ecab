use std::collections::BTreeSet;

/// Junction rows to drop and to insert so a record's tools become exactly the
/// requested set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToolSetDiff {
    pub to_delete: Vec<i64>,
    pub to_add: Vec<i64>,
}

impl ToolSetDiff {
    pub fn between(current: &[i64], requested: &[i64]) -> Self {
        let current: BTreeSet<i64> = current.iter().copied().collect();
        let requested: BTreeSet<i64> = requested.iter().copied().collect();
        Self {
            to_delete: current.difference(&requested).copied().collect(),
            to_add: requested.difference(&current).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_add.is_empty()
    }
}

/// Sorted, duplicate-free copy of a requested tool list.
pub fn normalize(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}
