//! Integration hooks for the memo based search engine.
//!
//! The memo deduplicates plan alternatives by structural identity: two group
//! expressions are the same iff their operators match on every attribute that affects
//! plan correctness or cost, and their input groups coincide. Grouping column *order*
//! is part of identity (it changes downstream hashed distribution keys), as is the
//! per-aggregate enforcement flag (it changes required and derived distribution
//! answers). Two such operators may be semantically interchangeable yet are still kept
//! apart for cost exploration.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use derive_more::{Display, From, Into};

use crate::error::{GabbroError, OptResult};
use crate::operator::{PhysicalAgg, PhysicalMotion, PhysicalOperator};

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into,
)]
pub struct GroupId(pub u32);

/// Identifier of one expression within a group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupExprId {
    pub group_id: GroupId,
    pub expr_index: u32,
}

/// Structural identity of a physical alternative: the operator plus its input groups.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperatorSignature {
    pub operator: PhysicalOperator,
    pub inputs: Vec<GroupId>,
}

/// Hash of every attribute affecting plan correctness or cost, order-sensitive over
/// column arrays. Stable within one optimization process.
pub fn hash_value(operator: &PhysicalOperator) -> u64 {
    let mut hasher = DefaultHasher::new();
    operator.hash(&mut hasher);
    hasher.finish()
}

/// Interning table used to collapse structurally equal physical alternatives.
///
/// The search engine owns group bookkeeping; this table only answers "was this exact
/// alternative seen before, and under which id".
#[derive(Default)]
pub struct SignatureTable {
    exprs: HashMap<OperatorSignature, GroupExprId>,
    next_group: u32,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a signature into the given target group, or into a fresh group when
    /// `target_group` is `None`. Returns the expression id and whether it was newly
    /// inserted; an existing structurally equal expression is returned unchanged.
    pub fn intern(
        &mut self,
        signature: OperatorSignature,
        target_group: Option<GroupId>,
    ) -> (GroupExprId, bool) {
        if let Some(existing) = self.exprs.get(&signature) {
            return (*existing, false);
        }
        let group_id = target_group.unwrap_or_else(|| {
            let id = GroupId(self.next_group);
            self.next_group += 1;
            id
        });
        let expr_index = self
            .exprs
            .values()
            .filter(|id| id.group_id == group_id)
            .count() as u32;
        let id = GroupExprId {
            group_id,
            expr_index,
        };
        self.exprs.insert(signature, id);
        (id, true)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// Checked conversion of a generic operator handle to an aggregate.
///
/// A mismatching tag is an optimizer internal invariant violation; callers must not
/// continue past the error.
pub fn expect_agg(operator: &PhysicalOperator) -> OptResult<&PhysicalAgg> {
    operator.as_agg().ok_or_else(|| {
        GabbroError::InvariantViolation(format!(
            "expected Agg operator, got {}",
            operator.as_ref()
        ))
    })
}

/// Checked conversion of a generic operator handle to a motion.
pub fn expect_motion(operator: &PhysicalOperator) -> OptResult<&PhysicalMotion> {
    operator.as_motion().ok_or_else(|| {
        GabbroError::InvariantViolation(format!(
            "expected Motion operator, got {}",
            operator.as_ref()
        ))
    })
}
