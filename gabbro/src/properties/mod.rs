//! Properties of physical plan alternatives.
//!
//! A *required* property is what a parent demands of a child's output; a *derived*
//! property is what an operator's output actually has, computed from its children.
//! Every spec type is an immutable value with equality, a hash consistent with
//! equality, and a satisfaction predicate the search engine uses to skip enforcement.

mod distribution;
pub use distribution::*;
mod order;
pub use order::*;
mod rewindability;
pub use rewindability::*;
mod partition;
pub use partition::*;
mod func_dep;
pub use func_dep::*;

use std::fmt::Debug;
use std::hash::Hash;

pub trait PhysicalProp: Debug + Hash {
    /// Tests whether this (derived) property satisfies a required one.
    fn satisfies(&self, required: &Self) -> bool;
}

/// Answer to "must an enforcer be inserted above this operator for property P?".
///
/// Consulted by the enforcer insertion logic when a requirement is not naturally met.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EnforcementType {
    /// Never insert an enforcer. Either the operator already satisfies the property,
    /// or the plan alternative is invalid and must be discarded.
    Prohibited,
    /// Always insert an enforcer if the property isn't already met.
    Required,
    /// The search engine may either trust the operator or add an enforcer, producing
    /// two plan alternatives.
    Optional,
}

/// Bundle of all physical properties, required or derived.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PhysicalPropertySet {
    pub distribution: DistributionSpec,
    pub order: OrderSpec,
    pub rewindability: RewindabilitySpec,
    pub partition_propagation: PartitionPropagationSpec,
}

impl PhysicalPropertySet {
    /// The empty requirement: any distribution, any order, no rewind, no propagation.
    pub fn any() -> Self {
        Self {
            distribution: DistributionSpec::Any,
            order: OrderSpec::default(),
            rewindability: RewindabilitySpec::Any,
            partition_propagation: PartitionPropagationSpec::default(),
        }
    }

    pub fn with_distribution(distribution: DistributionSpec) -> Self {
        Self {
            distribution,
            ..Self::any()
        }
    }
}

impl PhysicalProp for PhysicalPropertySet {
    fn satisfies(&self, required: &Self) -> bool {
        self.distribution.satisfies(&required.distribution)
            && self.order.satisfies(&required.order)
            && self.rewindability.satisfies(&required.rewindability)
            && self
                .partition_propagation
                .satisfies(&required.partition_propagation)
    }
}
