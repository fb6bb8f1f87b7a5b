use crate::properties::PhysicalProp;

/// Whether a subtree's output can be re-read from the beginning without re-executing
/// its children, needed by operators like nested loop re-scans.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RewindabilitySpec {
    /// Don't care; as a derived value, unknown.
    Any,
    Rewindable,
    #[default]
    NonRewindable,
}

impl PhysicalProp for RewindabilitySpec {
    fn satisfies(&self, required: &Self) -> bool {
        match required {
            // Only a rewind requirement constrains the child.
            RewindabilitySpec::Rewindable => {
                matches!(self, RewindabilitySpec::Rewindable)
            }
            RewindabilitySpec::Any | RewindabilitySpec::NonRewindable => true,
        }
    }
}
