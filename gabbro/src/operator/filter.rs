use std::fmt::Formatter;

use crate::column::ColRefSet;
use crate::operator::{DisplayFields, ExprHandle, PhysicalOperatorTrait};

/// Physical selection. Purely pass-through for every physical property; its only
/// contribution to the contract is the columns its predicate consumes.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PhysicalFilter {
    predicate_cols: ColRefSet,
}

impl PhysicalFilter {
    pub fn new(predicate_cols: ColRefSet) -> Self {
        Self { predicate_cols }
    }

    pub fn predicate_cols(&self) -> &ColRefSet {
        &self.predicate_cols
    }
}

impl PhysicalOperatorTrait for PhysicalFilter {
    fn required_columns(
        &self,
        handle: &ExprHandle,
        required: &ColRefSet,
        child_index: usize,
    ) -> ColRefSet {
        assert_eq!(child_index, 0, "filter has a single input");
        let mut cols = self.predicate_cols.clone();
        cols.union_with(&required.intersect(&handle.child(child_index).output_cols));
        cols
    }
}

impl DisplayFields for PhysicalFilter {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, " {{ predicate_cols: {} }}", self.predicate_cols)
    }
}
