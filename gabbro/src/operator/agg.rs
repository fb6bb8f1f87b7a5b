use std::fmt::Formatter;

use itertools::Itertools;
use log::trace;

use crate::column::{ColId, ColRefArray, ColRefSet};
use crate::operator::{DisplayFields, ExprHandle, PhysicalOperatorTrait};
use crate::properties::{
    DistributionSpec, EnforcementType, PartitionPropagationSpec, PhysicalProp,
    RewindabilitySpec,
};

/// Position of an aggregate in a multi-phase aggregation pipeline.
///
/// Splitting one logical aggregate into local/intermediate/global stages reduces the
/// amount of pre-aggregated data shuffled between segments.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum AggStage {
    /// Runs independently per segment on whatever rows are already there.
    Local,
    /// Redistribution tier of a three stage pipeline, typically introduced to move
    /// distinct qualified aggregate arguments.
    Intermediate,
    /// Produces the final answer; each group must appear exactly once.
    Global,
}

/// Physical grouped aggregation.
///
/// The most involved implementation of the operator contract: its required and derived
/// distributions depend on the aggregation stage, on functional dependency reduced
/// grouping columns, and on whether the operator was produced by splitting a distinct
/// qualified aggregate (DQA).
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PhysicalAgg {
    /// Full grouping column array; order matters for hashed distribution keys.
    grouping_cols: ColRefArray,
    /// Minimal grouping columns after functional dependency reduction.
    minimal_grouping_cols: ColRefArray,
    stage: AggStage,
    /// Columns referenced by aggregate argument expressions.
    agg_arg_cols: ColRefSet,
    /// DQA argument columns; non-empty only for intermediate stage operators.
    dqa_arg_cols: ColRefArray,
    /// Whether this operator was generated by DQA splitting.
    from_split_dqa: bool,
    /// Whether this operator is part of a multi stage pipeline.
    multi_stage: bool,
    /// Whether the same logical group may legitimately appear once per segment
    /// rather than once globally.
    generates_duplicates: bool,
    /// Set by the transformation rule that created this instance. A global and a
    /// local aggregate built with identical grouping columns and co-located
    /// distributions form a redundant motion-free duplication, which is an invalid
    /// shape; the rule clears this flag to prohibit enforcement between them. Rules
    /// that reduce grouping columns between stages keep it set, since co-located
    /// distributions are then legitimate.
    should_enforce_distribution: bool,
}

impl PhysicalAgg {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grouping_cols: ColRefArray,
        minimal_grouping_cols: ColRefArray,
        stage: AggStage,
        agg_arg_cols: ColRefSet,
        dqa_arg_cols: ColRefArray,
        from_split_dqa: bool,
        multi_stage: bool,
        generates_duplicates: bool,
        should_enforce_distribution: bool,
    ) -> Self {
        let grouping_set: ColRefSet = grouping_cols.as_slice().into();
        assert!(
            minimal_grouping_cols
                .iter()
                .all(|c| grouping_set.contains(*c)),
            "minimal grouping columns must be a subset of the grouping columns"
        );
        assert!(
            grouping_cols.is_empty() || !minimal_grouping_cols.is_empty(),
            "minimal grouping columns empty for a non-empty grouping array"
        );
        assert!(
            dqa_arg_cols.is_empty() || stage == AggStage::Intermediate,
            "DQA argument columns are only carried by intermediate aggregates"
        );
        assert!(
            stage != AggStage::Global || !generates_duplicates,
            "a global aggregate must merge each group exactly once"
        );

        Self {
            grouping_cols,
            minimal_grouping_cols,
            stage,
            agg_arg_cols,
            dqa_arg_cols,
            from_split_dqa,
            multi_stage,
            generates_duplicates,
            should_enforce_distribution,
        }
    }

    /// Single stage aggregate, the shape produced by plain implementation rules.
    pub fn global(
        grouping_cols: ColRefArray,
        minimal_grouping_cols: ColRefArray,
        agg_arg_cols: ColRefSet,
    ) -> Self {
        Self::new(
            grouping_cols,
            minimal_grouping_cols,
            AggStage::Global,
            agg_arg_cols,
            ColRefArray::new(),
            false,
            false,
            false,
            true,
        )
    }

    pub fn grouping_cols(&self) -> &[ColId] {
        &self.grouping_cols
    }

    pub fn minimal_grouping_cols(&self) -> &[ColId] {
        &self.minimal_grouping_cols
    }

    pub fn stage(&self) -> AggStage {
        self.stage
    }

    pub fn is_global(&self) -> bool {
        self.stage == AggStage::Global
    }

    pub fn dqa_arg_cols(&self) -> &[ColId] {
        &self.dqa_arg_cols
    }

    pub fn is_from_split_dqa(&self) -> bool {
        self.from_split_dqa
    }

    pub fn is_multi_stage(&self) -> bool {
        self.multi_stage
    }

    /// True precisely when the same logical group can legitimately appear once per
    /// segment rather than once globally.
    pub fn generates_duplicates(&self) -> bool {
        self.generates_duplicates
    }

    pub fn should_enforce_distribution(&self) -> bool {
        self.should_enforce_distribution
    }

    fn is_scalar_dqa(&self) -> bool {
        self.from_split_dqa && self.grouping_cols.is_empty()
    }

    /// Part of a two stage split of a scalar DQA (local + global, no
    /// redistribution tier).
    pub fn is_two_stage_scalar_dqa(&self) -> bool {
        self.is_scalar_dqa() && self.stage != AggStage::Intermediate
    }

    /// Part of a three stage split of a scalar DQA. Only the intermediate tier
    /// classifies as such; see DESIGN.md for the per-operator reading.
    pub fn is_three_stage_scalar_dqa(&self) -> bool {
        self.is_scalar_dqa() && self.stage == AggStage::Intermediate
    }

    /// The disallowed duplicate-stage shape: a local and a global aggregate over
    /// identical grouping columns with enforcement disabled on both. A motion free
    /// pair like this collapses to a single aggregate; keeping both is invalid, not
    /// merely costly, so cost comparison alone cannot rule it out.
    pub fn forms_redundant_pair_with(&self, global: &PhysicalAgg) -> bool {
        self.stage == AggStage::Local
            && global.stage == AggStage::Global
            && !self.should_enforce_distribution
            && !global.should_enforce_distribution
            && self.grouping_cols == global.grouping_cols
    }

    /// Requirement for the single child of a local aggregate: none beyond what is
    /// already fixed downstream. Local aggregation runs independently per segment.
    fn required_local(&self, required: &DistributionSpec) -> DistributionSpec {
        if required.is_singleton_or_replicated() {
            required.clone()
        } else {
            DistributionSpec::Any
        }
    }

    /// Requirement for the single child of an intermediate aggregate: hashed on the
    /// DQA argument columns when the tier exists to redistribute them, otherwise on
    /// this tier's grouping columns; singleton when no non-trivial key can be formed.
    fn required_intermediate(&self, handle: &ExprHandle) -> DistributionSpec {
        let key: &[ColId] = if self.dqa_arg_cols.is_empty() {
            &self.grouping_cols
        } else {
            &self.dqa_arg_cols
        };
        DistributionSpec::maximal_hashed(handle.columns(), key)
    }

    /// Requirement for the single child of a global aggregate: a distribution under
    /// which each group reaches exactly one segment. Request 0 asks for the maximal
    /// hashed distribution over the minimal grouping columns; request 1 (and the
    /// fallback when no hashed key exists) is singleton.
    fn required_global(
        &self,
        handle: &ExprHandle,
        opt_request: usize,
    ) -> DistributionSpec {
        if opt_request > 0 {
            return DistributionSpec::Singleton;
        }
        DistributionSpec::maximal_hashed(handle.columns(), &self.minimal_grouping_cols)
    }
}

impl PhysicalOperatorTrait for PhysicalAgg {
    fn required_columns(
        &self,
        handle: &ExprHandle,
        required: &ColRefSet,
        child_index: usize,
    ) -> ColRefSet {
        assert_eq!(child_index, 0, "aggregate has a single relational input");
        let mut cols: ColRefSet = self.grouping_cols.as_slice().into();
        cols.union_with(&self.agg_arg_cols);
        if self.stage == AggStage::Intermediate {
            cols.extend(self.dqa_arg_cols.iter().copied());
        }
        cols.union_with(&required.intersect(&handle.child(child_index).output_cols));
        cols
    }

    fn distribution_request_count(&self) -> usize {
        // A global aggregate explores both the co-located and the gather strategy.
        if self.is_global() {
            2
        } else {
            1
        }
    }

    fn required_distribution(
        &self,
        handle: &ExprHandle,
        required: &DistributionSpec,
        child_index: usize,
        opt_request: usize,
    ) -> DistributionSpec {
        assert_eq!(child_index, 0, "aggregate has a single relational input");
        match self.stage {
            AggStage::Local => self.required_local(required),
            AggStage::Intermediate => self.required_intermediate(handle),
            AggStage::Global => self.required_global(handle, opt_request),
        }
    }

    fn required_rewindability(
        &self,
        _handle: &ExprHandle,
        required: &RewindabilitySpec,
        child_index: usize,
    ) -> RewindabilitySpec {
        assert_eq!(child_index, 0, "aggregate has a single relational input");
        *required
    }

    fn required_partition_propagation(
        &self,
        _handle: &ExprHandle,
        required: &PartitionPropagationSpec,
        child_index: usize,
    ) -> PartitionPropagationSpec {
        assert_eq!(child_index, 0, "aggregate has a single relational input");
        required.clone()
    }

    /// Grouping does not move rows, so the child's distribution flows up, except
    /// that a hash key no longer visible in the aggregate's output cannot be
    /// promised to the parent.
    fn derive_distribution(&self, handle: &ExprHandle) -> DistributionSpec {
        match &handle.outer_child().distribution {
            DistributionSpec::Hashed(hashed)
                if !hashed
                    .cols()
                    .iter()
                    .all(|c| handle.output_cols().contains(*c)) =>
            {
                DistributionSpec::Random
            }
            other => other.clone(),
        }
    }

    fn derive_rewindability(&self, handle: &ExprHandle) -> RewindabilitySpec {
        handle.outer_child().rewindability
    }

    fn distribution_enforcement(
        &self,
        handle: &ExprHandle,
        required: &DistributionSpec,
    ) -> EnforcementType {
        let derived = self.derive_distribution(handle);
        if derived.satisfies(required) {
            trace!("agg derived {derived:?} satisfies {required:?}, no motion");
            return EnforcementType::Prohibited;
        }
        if !self.should_enforce_distribution {
            // Redundant duplicate-stage shape; a motion here would only hide it.
            return EnforcementType::Prohibited;
        }
        if self.generates_duplicates {
            // The engine can still build a correct plan either way; letting the
            // requirement flow further down may be cheaper.
            EnforcementType::Optional
        } else {
            // Without a motion, duplicate partial groups would reach the output
            // unmerged.
            EnforcementType::Required
        }
    }

    fn input_order_sensitive(&self) -> bool {
        true
    }

    fn passes_through_stats(&self) -> bool {
        false
    }
}

impl DisplayFields for PhysicalAgg {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            " {{ stage: {:?}, grouping: [{}]",
            self.stage,
            self.grouping_cols.iter().format(", ")
        )?;
        if self.from_split_dqa {
            write!(f, ", dqa: [{}]", self.dqa_arg_cols.iter().format(", "))?;
        }
        if self.multi_stage {
            write!(f, ", multi_stage")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use smallvec::{smallvec, SmallVec};

    use super::*;
    use crate::column::ColumnRegistry;
    use crate::operator::ChildProps;

    struct Fixture {
        registry: ColumnRegistry,
        a: ColId,
        b: ColId,
        c: ColId,
        /// Not hash distributable.
        d: ColId,
    }

    fn fixture() -> Fixture {
        let mut registry = ColumnRegistry::new();
        let a = registry.register("a", true);
        let b = registry.register("b", true);
        let c = registry.register("c", true);
        let d = registry.register("d", false);
        Fixture {
            registry,
            a,
            b,
            c,
            d,
        }
    }

    fn local_agg(grouping: ColRefArray, should_enforce: bool) -> PhysicalAgg {
        let minimal = grouping.clone();
        PhysicalAgg::new(
            grouping,
            minimal,
            AggStage::Local,
            ColRefSet::new(),
            SmallVec::new(),
            false,
            true,
            true,
            should_enforce,
        )
    }

    fn global_agg(
        grouping: ColRefArray,
        minimal: ColRefArray,
        should_enforce: bool,
    ) -> PhysicalAgg {
        PhysicalAgg::new(
            grouping,
            minimal,
            AggStage::Global,
            ColRefSet::new(),
            SmallVec::new(),
            false,
            true,
            false,
            should_enforce,
        )
    }

    #[test]
    fn test_global_requires_hashed_on_minimal_grouping() {
        // Grouping {a, b} with b functionally dependent on a: minimal is {a}.
        let f = fixture();
        let agg = global_agg(smallvec![f.a, f.b], smallvec![f.a], true);
        let children = [ChildProps::default()];
        let output: ColRefSet = [f.a, f.b].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
            DistributionSpec::hashed(smallvec![f.a]),
        );
        // The alternative request gathers everything to one segment.
        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 1),
            DistributionSpec::Singleton,
        );
        assert_eq!(agg.distribution_request_count(), 2);
    }

    #[test]
    fn test_global_falls_back_to_singleton_never_random() {
        let f = fixture();
        // Only non distributable grouping columns.
        let agg = global_agg(smallvec![f.d], smallvec![f.d], true);
        let children = [ChildProps::default()];
        let output: ColRefSet = [f.d].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
            DistributionSpec::Singleton,
        );
    }

    #[test]
    fn test_scalar_intermediate_requires_singleton() {
        let f = fixture();
        let agg = PhysicalAgg::new(
            SmallVec::new(),
            SmallVec::new(),
            AggStage::Intermediate,
            ColRefSet::new(),
            SmallVec::new(),
            true,
            true,
            true,
            true,
        );
        let children = [ChildProps::default()];
        let output = ColRefSet::new();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
            DistributionSpec::Singleton,
        );
    }

    #[test]
    fn test_intermediate_hashes_on_dqa_args_when_present() {
        let f = fixture();
        let agg = PhysicalAgg::new(
            smallvec![f.a],
            smallvec![f.a],
            AggStage::Intermediate,
            ColRefSet::new(),
            smallvec![f.c],
            true,
            true,
            true,
            true,
        );
        let children = [ChildProps::default()];
        let output: ColRefSet = [f.a, f.c].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
            DistributionSpec::hashed(smallvec![f.c]),
        );
    }

    #[test]
    fn test_local_passes_fixed_requirement_through() {
        let f = fixture();
        let agg = local_agg(smallvec![f.a], true);
        let children = [ChildProps::default()];
        let output: ColRefSet = [f.a].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
            DistributionSpec::Any,
        );
        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Singleton, 0, 0),
            DistributionSpec::Singleton,
        );
        assert_eq!(
            agg.required_distribution(
                &handle,
                &DistributionSpec::hashed(smallvec![f.b]),
                0,
                0
            ),
            DistributionSpec::Any,
        );
    }

    #[test]
    fn test_required_columns_union() {
        let f = fixture();
        let agg = PhysicalAgg::new(
            smallvec![f.a],
            smallvec![f.a],
            AggStage::Intermediate,
            [f.b].as_slice().into(),
            smallvec![f.c],
            true,
            true,
            true,
            true,
        );
        let children = [ChildProps {
            output_cols: [f.a, f.b, f.c, f.d].as_slice().into(),
            ..ChildProps::default()
        }];
        let output: ColRefSet = [f.a, f.c].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        // Parent wants d pass-through plus a column the child cannot produce.
        let required: ColRefSet = [f.d, ColId(42)].as_slice().into();
        let cols = agg.required_columns(&handle, &required, 0);
        assert_eq!(cols, [f.a, f.b, f.c, f.d].as_slice().into());
    }

    #[test]
    fn test_enforcement_monotonicity() {
        // A satisfied requirement must never produce Required.
        let f = fixture();
        let agg = global_agg(smallvec![f.a], smallvec![f.a], true);
        let children = [ChildProps {
            output_cols: [f.a].as_slice().into(),
            distribution: DistributionSpec::hashed(smallvec![f.a]),
            ..ChildProps::default()
        }];
        let output: ColRefSet = [f.a].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        let required = DistributionSpec::hashed(smallvec![f.a]);
        assert!(agg.derive_distribution(&handle).satisfies(&required));
        assert_eq!(
            agg.distribution_enforcement(&handle, &required),
            EnforcementType::Prohibited,
        );
    }

    #[test]
    fn test_global_unsatisfied_requirement_is_enforced() {
        let f = fixture();
        let agg = global_agg(smallvec![f.a], smallvec![f.a], true);
        let children = [ChildProps {
            output_cols: [f.a].as_slice().into(),
            distribution: DistributionSpec::Random,
            ..ChildProps::default()
        }];
        let output: ColRefSet = [f.a].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert!(!agg.generates_duplicates());
        assert_eq!(
            agg.distribution_enforcement(&handle, &DistributionSpec::Singleton),
            EnforcementType::Required,
        );
    }

    #[test]
    fn test_local_unsatisfied_requirement_is_optional() {
        let f = fixture();
        let agg = local_agg(smallvec![f.a], true);
        let children = [ChildProps {
            output_cols: [f.a].as_slice().into(),
            distribution: DistributionSpec::Random,
            ..ChildProps::default()
        }];
        let output: ColRefSet = [f.a].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.distribution_enforcement(&handle, &DistributionSpec::Singleton),
            EnforcementType::Optional,
        );
    }

    #[test]
    fn test_redundant_pair_prohibits_motion() {
        // Local and global with identical grouping, enforcement disabled on both,
        // deriving the same hashed distribution: no motion may be inserted.
        let f = fixture();
        let local = local_agg(smallvec![f.a], false);
        let global = global_agg(smallvec![f.a], smallvec![f.a], false);
        assert!(local.forms_redundant_pair_with(&global));

        let children = [ChildProps {
            output_cols: [f.a].as_slice().into(),
            distribution: DistributionSpec::hashed(smallvec![f.a]),
            ..ChildProps::default()
        }];
        let output: ColRefSet = [f.a].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            local.derive_distribution(&handle),
            global.derive_distribution(&handle)
        );
        assert_eq!(
            local.distribution_enforcement(&handle, &DistributionSpec::Singleton),
            EnforcementType::Prohibited,
        );
    }

    #[test]
    fn test_reduced_grouping_pair_is_not_redundant() {
        // Multi stage optimization with column reduction: the local aggregate was
        // built with different grouping columns, so co-location is legitimate.
        let f = fixture();
        let local = local_agg(smallvec![f.a, f.b], true);
        let global = global_agg(smallvec![f.a], smallvec![f.a], true);
        assert!(!local.forms_redundant_pair_with(&global));
    }

    #[test]
    fn test_derived_hash_key_must_stay_visible() {
        let f = fixture();
        let agg = global_agg(smallvec![f.a], smallvec![f.a], true);
        let children = [ChildProps {
            output_cols: [f.a, f.b].as_slice().into(),
            distribution: DistributionSpec::hashed(smallvec![f.b]),
            ..ChildProps::default()
        }];
        // b is aggregated away; the hash on b can no longer be promised.
        let output: ColRefSet = [f.a].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(agg.derive_distribution(&handle), DistributionSpec::Random);
    }

    #[test]
    fn test_derivation_is_pure() {
        let f = fixture();
        let agg = global_agg(smallvec![f.a, f.b], smallvec![f.a], true);
        let children = [ChildProps {
            output_cols: [f.a, f.b].as_slice().into(),
            distribution: DistributionSpec::hashed(smallvec![f.a]),
            rewindability: RewindabilitySpec::Rewindable,
            ..ChildProps::default()
        }];
        let output: ColRefSet = [f.a, f.b].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert_eq!(
            agg.derive_distribution(&handle),
            agg.derive_distribution(&handle)
        );
        assert_eq!(
            agg.derive_rewindability(&handle),
            agg.derive_rewindability(&handle)
        );
        assert_eq!(
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
            agg.required_distribution(&handle, &DistributionSpec::Any, 0, 0),
        );
    }

    #[test]
    fn test_scalar_dqa_classification() {
        let two_stage = PhysicalAgg::new(
            SmallVec::new(),
            SmallVec::new(),
            AggStage::Local,
            ColRefSet::new(),
            SmallVec::new(),
            true,
            true,
            true,
            true,
        );
        assert!(two_stage.is_two_stage_scalar_dqa());
        assert!(!two_stage.is_three_stage_scalar_dqa());

        let three_stage = PhysicalAgg::new(
            SmallVec::new(),
            SmallVec::new(),
            AggStage::Intermediate,
            ColRefSet::new(),
            smallvec![ColId(3)],
            true,
            true,
            true,
            true,
        );
        assert!(three_stage.is_three_stage_scalar_dqa());
        assert!(!three_stage.is_two_stage_scalar_dqa());

        // Not from a DQA split: neither classification applies.
        let plain = PhysicalAgg::global(SmallVec::new(), SmallVec::new(), ColRefSet::new());
        assert!(!plain.is_two_stage_scalar_dqa());
        assert!(!plain.is_three_stage_scalar_dqa());
    }

    #[test]
    fn test_provides_required_columns() {
        let f = fixture();
        let agg = global_agg(smallvec![f.a], smallvec![f.a], true);
        let children = [ChildProps::default()];
        let output: ColRefSet = [f.a, f.c].as_slice().into();
        let handle = ExprHandle::new(&f.registry, &output, &children);

        assert!(agg.provides_required_columns(
            &handle,
            &[f.a].as_slice().into(),
            0
        ));
        assert!(!agg.provides_required_columns(
            &handle,
            &[f.a, f.b].as_slice().into(),
            0
        ));
    }

    #[test]
    fn test_input_order_sensitivity() {
        let agg =
            PhysicalAgg::global(SmallVec::new(), SmallVec::new(), ColRefSet::new());
        assert!(agg.input_order_sensitive());
        assert!(!agg.passes_through_stats());
    }

    #[test]
    #[should_panic(expected = "minimal grouping columns")]
    fn test_minimal_must_be_subset() {
        let f = fixture();
        global_agg(smallvec![f.a], smallvec![f.b], true);
    }

    #[test]
    #[should_panic(expected = "non-empty grouping array")]
    fn test_minimal_must_be_nonempty() {
        let f = fixture();
        global_agg(smallvec![f.a], SmallVec::new(), true);
    }
}
