//! The physical operator contract.
//!
//! Physical operators form a closed set of variants behind a single capability trait.
//! The trait answers the three question families the search engine asks while
//! enumerating plan alternatives: required child properties (top-down), derived own
//! properties (bottom-up), and enforcement decisions. Everything here is a pure
//! function of its inputs; the framework holds no hidden state and never mutates the
//! memo snapshot handed to it.

mod agg;
pub use agg::*;
mod filter;
pub use filter::*;
mod motion;
pub use motion::*;
mod spool;
pub use spool::*;

use std::fmt::{Debug, Display, Formatter};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::AsRefStr;

use crate::column::{ColRefSet, ColumnRegistry};
use crate::properties::{
    DistributionSpec, EnforcementType, PartFilterMap, PartIndexMap,
    PartitionPropagationSpec, PhysicalProp, RewindabilitySpec,
};

/// Physical relational operator.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EnumAsInner, AsRefStr)]
#[enum_dispatch]
pub enum PhysicalOperator {
    Agg(PhysicalAgg),
    Motion(PhysicalMotion),
    Spool(PhysicalSpool),
    Filter(PhysicalFilter),
}

impl Display for PhysicalOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}

/// Derived physical properties of an already optimized child, as recorded in the memo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildProps {
    pub output_cols: ColRefSet,
    pub distribution: DistributionSpec,
    pub rewindability: RewindabilitySpec,
    pub part_index_map: PartIndexMap,
    pub part_filter_map: PartFilterMap,
}

/// Read-only snapshot of the memo state a property function may consult: the
/// operator's own output columns, its children's derived properties, and the column
/// registry of the enclosing optimization context.
///
/// Ownership of everything behind the handle stays with the caller.
pub struct ExprHandle<'a> {
    columns: &'a ColumnRegistry,
    output_cols: &'a ColRefSet,
    children: &'a [ChildProps],
}

impl<'a> ExprHandle<'a> {
    pub fn new(
        columns: &'a ColumnRegistry,
        output_cols: &'a ColRefSet,
        children: &'a [ChildProps],
    ) -> Self {
        Self {
            columns,
            output_cols,
            children,
        }
    }

    pub fn columns(&self) -> &ColumnRegistry {
        self.columns
    }

    pub fn output_cols(&self) -> &ColRefSet {
        self.output_cols
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, child_index: usize) -> &ChildProps {
        assert!(
            child_index < self.children.len(),
            "child index {child_index} out of bounds for {} children",
            self.children.len()
        );
        &self.children[child_index]
    }

    /// The outer (first) child, the pass-through source for single input operators.
    pub fn outer_child(&self) -> &ChildProps {
        self.child(0)
    }
}

/// Capability set implemented by every physical operator variant.
///
/// Defaults implement the single input pass-through behavior: requirements flow down
/// unchanged (restricted to producible columns) and the outer child's derived
/// properties flow up unchanged. Operators that change a property (aggregation,
/// motion, spool) override the corresponding methods.
#[enum_dispatch(PhysicalOperator)]
pub trait PhysicalOperatorTrait: Debug + PartialEq {
    /// Columns the n-th child must produce: what this operator consumes itself plus
    /// the parent's pass-through requirement, restricted to that child's output.
    fn required_columns(
        &self,
        handle: &ExprHandle,
        required: &ColRefSet,
        child_index: usize,
    ) -> ColRefSet {
        required.intersect(&handle.child(child_index).output_cols)
    }

    /// Number of alternative distribution requirement sets this operator exposes.
    /// The search engine probes `opt_request` in `0..distribution_request_count()`.
    fn distribution_request_count(&self) -> usize {
        1
    }

    fn required_distribution(
        &self,
        _handle: &ExprHandle,
        required: &DistributionSpec,
        _child_index: usize,
        _opt_request: usize,
    ) -> DistributionSpec {
        required.clone()
    }

    fn required_rewindability(
        &self,
        _handle: &ExprHandle,
        required: &RewindabilitySpec,
        _child_index: usize,
    ) -> RewindabilitySpec {
        *required
    }

    fn required_partition_propagation(
        &self,
        _handle: &ExprHandle,
        required: &PartitionPropagationSpec,
        _child_index: usize,
    ) -> PartitionPropagationSpec {
        required.clone()
    }

    fn derive_distribution(&self, handle: &ExprHandle) -> DistributionSpec {
        handle.outer_child().distribution.clone()
    }

    fn derive_rewindability(&self, handle: &ExprHandle) -> RewindabilitySpec {
        handle.outer_child().rewindability
    }

    fn derive_partition_index_map(&self, handle: &ExprHandle) -> PartIndexMap {
        handle.outer_child().part_index_map.clone()
    }

    fn derive_partition_filter_map(&self, handle: &ExprHandle) -> PartFilterMap {
        handle.outer_child().part_filter_map.clone()
    }

    fn distribution_enforcement(
        &self,
        handle: &ExprHandle,
        required: &DistributionSpec,
    ) -> EnforcementType {
        if self.derive_distribution(handle).satisfies(required) {
            EnforcementType::Prohibited
        } else {
            EnforcementType::Optional
        }
    }

    fn rewindability_enforcement(
        &self,
        handle: &ExprHandle,
        required: &RewindabilitySpec,
    ) -> EnforcementType {
        if self.derive_rewindability(handle).satisfies(required) {
            EnforcementType::Prohibited
        } else {
            EnforcementType::Optional
        }
    }

    /// Sanity check that the operator's own output covers what was required of it.
    /// Ill-formed alternatives are rejected before costing.
    fn provides_required_columns(
        &self,
        handle: &ExprHandle,
        required: &ColRefSet,
        _opt_request: usize,
    ) -> bool {
        required.is_subset_of(handle.output_cols())
    }

    /// Operators sensitive to input order disable commutativity based transforms.
    fn input_order_sensitive(&self) -> bool {
        false
    }

    /// Whether costing may reuse the child's statistics unchanged.
    fn passes_through_stats(&self) -> bool {
        true
    }
}

#[enum_dispatch(PhysicalOperator)]
pub trait DisplayFields {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result;
}
