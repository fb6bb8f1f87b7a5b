//! Dynamic partition elimination propagation.
//!
//! A partitioned scan can skip partitions when a sibling subtree (typically the other
//! side of a join) resolves which partition keys actually occur. The specs here track,
//! per scanned base relation, whether that information must flow into a partitioned
//! scan beneath the current operator, and which partition selector expressions carry it.

use std::collections::BTreeMap;

use derive_more::{Display, From, Into};

use crate::properties::PhysicalProp;

/// Identifier of a partitioned base relation scan in the plan.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into,
)]
pub struct ScanId(pub u32);

/// Opaque handle of a partition selector expression owned by the plan.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into,
)]
pub struct PartSelectorId(pub u32);

/// Per-relation propagation requirement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartPropagationReq {
    /// Must selector information reach the scan, or is it merely available.
    pub required: bool,
    pub selectors: Vec<PartSelectorId>,
}

/// Requirement flags and selector lists keyed by scanned relation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartitionPropagationSpec {
    entries: BTreeMap<ScanId, PartPropagationReq>,
}

impl PartitionPropagationSpec {
    pub fn require(&mut self, scan: ScanId, selectors: Vec<PartSelectorId>) {
        self.entries.insert(
            scan,
            PartPropagationReq {
                required: true,
                selectors,
            },
        );
    }

    pub fn get(&self, scan: ScanId) -> Option<&PartPropagationReq> {
        self.entries.get(&scan)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PhysicalProp for PartitionPropagationSpec {
    /// Every required entry must be present with a covering selector list.
    fn satisfies(&self, required: &Self) -> bool {
        required
            .entries
            .iter()
            .filter(|(_, req)| req.required)
            .all(|(scan, req)| match self.entries.get(scan) {
                Some(derived) => {
                    derived.required
                        && req.selectors.iter().all(|s| derived.selectors.contains(s))
                }
                None => false,
            })
    }
}

/// Derived map from partitioned scans to the selector expressions resolved for them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartIndexMap {
    entries: BTreeMap<ScanId, Vec<PartSelectorId>>,
}

impl PartIndexMap {
    pub fn insert(&mut self, scan: ScanId, selectors: Vec<PartSelectorId>) {
        self.entries.insert(scan, selectors);
    }

    pub fn get(&self, scan: ScanId) -> Option<&[PartSelectorId]> {
        self.entries.get(&scan).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derived map recording which scans already consumed a partition filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartFilterMap {
    entries: BTreeMap<ScanId, bool>,
}

impl PartFilterMap {
    pub fn mark_filtered(&mut self, scan: ScanId) {
        self.entries.insert(scan, true);
    }

    pub fn is_filtered(&self, scan: ScanId) -> bool {
        self.entries.get(&scan).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
