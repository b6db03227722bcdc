//! Filename classification.
//!
//! Two pure building blocks shared by every other stage: the grammar
//! classifier turning a filename into a [`ParsedFrame`](crate::frame::ParsedFrame),
//! and the predicate deciding whether a filename is a science candidate at all.

pub mod grammar;
pub mod predicate;

pub use grammar::{
    classify, classify_with_spans, matching_grammars, ClassificationError, Classified, DateStyle,
    GrammarId, GrammarSpec, GRAMMARS,
};
pub use predicate::{
    exclusion_reason, exclusion_reason_with, is_science_candidate, ExclusionReason, ExclusionStats,
};
