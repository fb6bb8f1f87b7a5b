use std::fmt::Formatter;

use crate::operator::{DisplayFields, ExprHandle, PhysicalOperatorTrait};
use crate::properties::{DistributionSpec, EnforcementType, RewindabilitySpec};

/// Distribution enforcer: redistributes its child's rows to a target placement.
///
/// Synthesized by the enforcer insertion logic when a child's derived distribution
/// does not satisfy a parent's requirement and the operator in between reported
/// [`EnforcementType::Required`] or [`EnforcementType::Optional`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PhysicalMotion {
    target: DistributionSpec,
}

impl PhysicalMotion {
    pub fn new(target: DistributionSpec) -> Self {
        assert!(
            !matches!(
                target,
                DistributionSpec::Any | DistributionSpec::Universal
            ),
            "a motion must deliver a concrete placement"
        );
        Self { target }
    }

    pub fn gather() -> Self {
        Self::new(DistributionSpec::Singleton)
    }

    pub fn broadcast() -> Self {
        Self::new(DistributionSpec::Replicated)
    }

    pub fn target(&self) -> &DistributionSpec {
        &self.target
    }
}

impl PhysicalOperatorTrait for PhysicalMotion {
    /// The child may be placed anyhow; the motion moves whatever arrives.
    fn required_distribution(
        &self,
        _handle: &ExprHandle,
        _required: &DistributionSpec,
        child_index: usize,
        _opt_request: usize,
    ) -> DistributionSpec {
        assert_eq!(child_index, 0, "motion has a single input");
        DistributionSpec::Any
    }

    fn derive_distribution(&self, _handle: &ExprHandle) -> DistributionSpec {
        self.target.clone()
    }

    /// A streaming exchange cannot be re-read without re-executing its child.
    fn derive_rewindability(&self, _handle: &ExprHandle) -> RewindabilitySpec {
        RewindabilitySpec::NonRewindable
    }

    /// Never stack motions: if this one doesn't deliver the requirement, the
    /// alternative is invalid and a different target must be generated instead.
    fn distribution_enforcement(
        &self,
        _handle: &ExprHandle,
        _required: &DistributionSpec,
    ) -> EnforcementType {
        EnforcementType::Prohibited
    }
}

impl DisplayFields for PhysicalMotion {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, " {{ target: {:?} }}", self.target)
    }
}
