use log::debug;

use crate::column::{ColId, ColRefArray, ColRefSet, ColumnRegistry};
use crate::properties::PhysicalProp;

/// How rows of a relation are spread across compute segments.
///
/// Specs are compared for *compatibility*, not equality: a derived spec satisfies a
/// required one if every row placement consistent with the derived spec is also
/// consistent with the required one.
#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub enum DistributionSpec {
    /// Requirement-only wildcard: the parent accepts any placement.
    Any,
    /// The data set is not partitioned and lives on a single segment.
    Singleton,
    /// The data set has several partitions, but the partitioning doesn't follow any
    /// rule.
    #[default]
    Random,
    /// Rows are co-located by a hash of a column array.
    Hashed(HashedDistribution),
    /// A full copy of the data set lives on every segment.
    Replicated,
    /// Compatible with any requirement, e.g. constant-only output.
    Universal,
}

/// Hash co-location by an ordered column array.
#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub struct HashedDistribution {
    cols: ColRefArray,
    /// Exact positional column match required; a general (non strict) spec also
    /// satisfies requirements over a superset of its columns, since hashing by fewer
    /// columns still co-locates rows that agree on more.
    strict: bool,
}

impl HashedDistribution {
    pub fn general(cols: ColRefArray) -> Self {
        assert!(!cols.is_empty(), "hashed distribution over no columns");
        Self {
            cols,
            strict: false,
        }
    }

    pub fn strict(cols: ColRefArray) -> Self {
        assert!(!cols.is_empty(), "hashed distribution over no columns");
        Self { cols, strict: true }
    }

    pub fn cols(&self) -> &[ColId] {
        &self.cols
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn satisfies_hashed(&self, required: &HashedDistribution) -> bool {
        if self.strict {
            // Identical positional column list and hash function.
            return self.cols == required.cols;
        }
        let required_set: ColRefSet = required.cols().into();
        self.cols.iter().all(|c| required_set.contains(*c))
    }
}

impl DistributionSpec {
    /// Hashed distribution over the given columns, general flavor.
    pub fn hashed(cols: ColRefArray) -> Self {
        DistributionSpec::Hashed(HashedDistribution::general(cols))
    }

    /// Compute a maximal hashed distribution over the given columns: the largest
    /// order-preserving subset that is hash distributable. When no such subset exists
    /// the deterministic fallback is always [`DistributionSpec::Singleton`], never
    /// random or replicated, since those would let duplicate partial results through.
    pub fn maximal_hashed(registry: &ColumnRegistry, cols: &[ColId]) -> Self {
        let hashable: ColRefArray = cols
            .iter()
            .copied()
            .filter(|c| registry.is_distributable(*c))
            .collect();
        if hashable.is_empty() {
            debug!(
                "no hashed distribution can be formed over {} columns, \
                 falling back to singleton",
                cols.len()
            );
            DistributionSpec::Singleton
        } else {
            DistributionSpec::hashed(hashable)
        }
    }

    pub fn is_singleton_or_replicated(&self) -> bool {
        matches!(
            self,
            DistributionSpec::Singleton | DistributionSpec::Replicated
        )
    }
}

impl PhysicalProp for DistributionSpec {
    fn satisfies(&self, required: &Self) -> bool {
        use DistributionSpec::*;
        match (self, required) {
            // Universal output is compatible with every requirement; nothing else
            // satisfies a universal requirement.
            (Universal, _) => true,
            (_, Universal) => false,
            (_, Any) => true,
            (Hashed(derived), Hashed(required)) => derived.satisfies_hashed(required),
            (Singleton, Singleton) => true,
            (Replicated, Replicated) => true,
            (Random, Random) => true,
            // A requirement for some multi-segment spread is met by any
            // concrete placement.
            (Singleton | Replicated | Hashed(_), Random) => true,
            _ => false,
        }
    }
}
