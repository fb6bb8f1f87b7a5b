//! ## Background
//!
//! A cost based optimizer for a distributed engine cannot pick a plan on cost alone: the
//! plan must also be *correct* with respect to how rows are spread across compute
//! segments, whether a subtree can be rewound, and how dynamic partition elimination
//! information flows between siblings. Top-down search frameworks in the Cascades/Orca
//! tradition solve this with required and derived physical properties. The search engine
//! asks each candidate physical operator three families of questions:
//!
//! 1. "For child `n`, given what my parent requires of me, what do you require?"
//!    (required property computation, top-down)
//! 2. "Given your children's actual properties, what do you provide?"
//!    (derived property computation, bottom-up)
//! 3. "If the requirement isn't met, may an enforcer (motion, spool) be inserted
//!    above you?" (enforcement decision)
//!
//! This crate implements that contract as a closed set of physical operator variants
//! behind a single capability trait, with grouped aggregation as the most involved
//! implementation: it must reason about local/intermediate/global aggregation stages,
//! duplicate group values across segments, and distinct qualified aggregates.
//!
//! The search engine itself (memo, branch-and-bound, costing) is a consumer of this
//! crate, not part of it. All property functions here are pure: same inputs, same
//! answer, no hidden state.
//!
//! ## Design
//!
//! * [`column`] Integer column identifiers and the per-query column registry.
//! * [`properties`] Required/derived property value types and satisfaction rules.
//! * [`operator`] The physical operator contract and its implementations.
//! * [`memo`] Structural identity hooks and checked downcasts for the search engine.
//! * [`context`] Per-optimization ownership of the column registry.
//!
//! ## Reference
//!
//! 1. Graefe, G., 1995. The cascades framework for query optimization. IEEE Data Eng.
//! Bull., 18(3), pp.19-29.
//! 2. Soliman, M.A., Antova, L., Raghavan, V., El-Helw, A., Gu, Z., Shen, E., Caragea,
//! G.C., Garcia-Alvarado, C., Rahman, F., Petropoulos, M. and Waas, F., 2014, June.
//! Orca: a modular query optimizer architecture for big data. In Proceedings of the
//! 2014 ACM SIGMOD international conference on Management of data (pp. 337-348).

pub mod column;
pub mod context;
pub mod error;
pub mod memo;
pub mod operator;
pub mod properties;
