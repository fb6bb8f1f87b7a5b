//! Column identifiers and the per-query column registry.
//!
//! Columns are referenced by small integer ids into a single registry owned by the
//! optimization context. Arrays ([`ColRefArray`]) preserve order because grouping
//! column order affects hashing and enforcement decisions; sets ([`ColRefSet`]) do not.

use std::collections::BTreeSet;
use std::fmt;

use derive_more::{Display, From, Into};
use smallvec::SmallVec;

use crate::error::{GabbroError, OptResult};

/// Identifier of a single output column produced somewhere in the plan tree.
///
/// Identity is by reference: two ids are the same column iff they are equal.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into,
)]
pub struct ColId(pub u32);

/// Ordered sequence of column references.
pub type ColRefArray = SmallVec<[ColId; 4]>;

/// Unordered set of column references.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColRefSet(BTreeSet<ColId>);

impl ColRefSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, col: ColId) -> bool {
        self.0.insert(col)
    }

    pub fn contains(&self, col: ColId) -> bool {
        self.0.contains(&col)
    }

    pub fn union_with(&mut self, other: &ColRefSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn intersect(&self, other: &ColRefSet) -> ColRefSet {
        ColRefSet(self.0.intersection(&other.0).copied().collect())
    }

    pub fn is_subset_of(&self, other: &ColRefSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = ColId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ColId> for ColRefSet {
    fn from_iter<T: IntoIterator<Item = ColId>>(iter: T) -> Self {
        ColRefSet(iter.into_iter().collect())
    }
}

impl Extend<ColId> for ColRefSet {
    fn extend<T: IntoIterator<Item = ColId>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl From<&[ColId]> for ColRefSet {
    fn from(cols: &[ColId]) -> Self {
        cols.iter().copied().collect()
    }
}

impl fmt::Display for ColRefSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, col) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{col}")?;
        }
        write!(f, "}}")
    }
}

/// Descriptor of one registered column.
#[derive(Clone, Debug)]
pub struct ColumnDesc {
    name: String,
    /// Whether the column type supports a deterministic cross segment hash.
    distributable: bool,
}

impl ColumnDesc {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_distributable(&self) -> bool {
        self.distributable
    }
}

/// Per-query table of column descriptors.
///
/// Owned by the optimization context; all [`ColId`]s in a query index into the same
/// registry and die with it.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDesc>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: Into<String>>(&mut self, name: S, distributable: bool) -> ColId {
        let id = ColId(self.columns.len() as u32);
        self.columns.push(ColumnDesc {
            name: name.into(),
            distributable,
        });
        id
    }

    pub fn get(&self, col: ColId) -> OptResult<&ColumnDesc> {
        self.columns
            .get(col.0 as usize)
            .ok_or(GabbroError::UnknownColumn(col))
    }

    /// Unknown columns are treated as non distributable so that a stale id can never
    /// produce a hashed distribution.
    pub fn is_distributable(&self, col: ColId) -> bool {
        self.columns
            .get(col.0 as usize)
            .map_or(false, ColumnDesc::is_distributable)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
