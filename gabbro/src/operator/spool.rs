use std::fmt::Formatter;

use crate::operator::{DisplayFields, ExprHandle, PhysicalOperatorTrait};
use crate::properties::{EnforcementType, RewindabilitySpec};

/// Rewindability enforcer: materializes its child so the output can be re-read
/// without re-executing the subtree.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PhysicalSpool {
    /// Eager spools drain the child fully before producing; lazy spools fill as
    /// consumed. Costing cares, property derivation does not.
    eager: bool,
}

impl PhysicalSpool {
    pub fn eager() -> Self {
        Self { eager: true }
    }

    pub fn lazy() -> Self {
        Self { eager: false }
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }
}

impl PhysicalOperatorTrait for PhysicalSpool {
    /// The child needn't be rewindable; that is the point of the spool.
    fn required_rewindability(
        &self,
        _handle: &ExprHandle,
        _required: &RewindabilitySpec,
        child_index: usize,
    ) -> RewindabilitySpec {
        assert_eq!(child_index, 0, "spool has a single input");
        RewindabilitySpec::Any
    }

    fn derive_rewindability(&self, _handle: &ExprHandle) -> RewindabilitySpec {
        RewindabilitySpec::Rewindable
    }

    fn rewindability_enforcement(
        &self,
        _handle: &ExprHandle,
        _required: &RewindabilitySpec,
    ) -> EnforcementType {
        // The spool is itself the enforcer.
        EnforcementType::Prohibited
    }
}

impl DisplayFields for PhysicalSpool {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, " {{ eager: {} }}", self.eager)
    }
}
