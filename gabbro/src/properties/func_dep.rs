//! Functional dependencies over registered columns.
//!
//! Used to reduce an aggregate's grouping column array to a minimal one: a grouping
//! column determined by the remaining grouping columns contributes nothing to group
//! identity and can be dropped from distribution keys.

use std::fmt;

use fixedbitset::FixedBitSet;
use itertools::Itertools;

use crate::column::{ColId, ColRefArray};

/// One dependency: the `from` columns determine the `to` columns.
#[derive(Debug, PartialEq, Clone)]
pub struct FunctionalDependency {
    from: FixedBitSet,
    to: FixedBitSet,
}

impl fmt::Display for FunctionalDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from.ones().collect_vec();
        let to = self.to.ones().collect_vec();
        f.write_fmt(format_args!("{from:?} --> {to:?}"))
    }
}

/// Set of strict functional dependencies for one query, sized to the column registry.
#[derive(Debug, PartialEq, Clone)]
pub struct FunctionalDependencySet {
    column_cnt: usize,
    deps: Vec<FunctionalDependency>,
}

impl FunctionalDependencySet {
    pub fn new(column_cnt: usize) -> Self {
        Self {
            column_cnt,
            deps: Vec::new(),
        }
    }

    pub fn add_dependency(&mut self, from: &[ColId], to: &[ColId]) {
        let mut from_bits = FixedBitSet::with_capacity(self.column_cnt);
        for col in from {
            from_bits.set(col.0 as usize, true);
        }
        let mut to_bits = FixedBitSet::with_capacity(self.column_cnt);
        for col in to {
            to_bits.set(col.0 as usize, true);
        }
        self.deps.push(FunctionalDependency {
            from: from_bits,
            to: to_bits,
        });
    }

    /// Closure of `set` under the dependencies, computed to a fix point.
    fn closure(&self, set: &FixedBitSet) -> FixedBitSet {
        let mut closure = set.clone();
        loop {
            let before = closure.count_ones(..);
            for dep in &self.deps {
                if dep.from.is_subset(&closure) {
                    closure.union_with(&dep.to);
                }
            }
            if closure.count_ones(..) == before {
                return closure;
            }
        }
    }

    /// Reduce a grouping column array to a minimal one.
    ///
    /// Guarantees: the result is an order-preserving subset of `grouping`, and it is
    /// non-empty whenever `grouping` is non-empty, even when the dependencies would
    /// determine every column (a degenerate all-constant group still needs one key).
    pub fn minimize(&self, grouping: &[ColId]) -> ColRefArray {
        let mut kept: Vec<bool> = vec![true; grouping.len()];
        for i in 0..grouping.len() {
            let mut rest = FixedBitSet::with_capacity(self.column_cnt);
            for (j, col) in grouping.iter().enumerate() {
                if j != i && kept[j] {
                    rest.set(col.0 as usize, true);
                }
            }
            if self.closure(&rest).contains(grouping[i].0 as usize) {
                kept[i] = false;
            }
        }

        let minimal: ColRefArray = grouping
            .iter()
            .zip(kept.iter())
            .filter(|(_, keep)| **keep)
            .map(|(col, _)| *col)
            .collect();
        if minimal.is_empty() && !grouping.is_empty() {
            return grouping.iter().take(1).copied().collect();
        }
        minimal
    }
}
