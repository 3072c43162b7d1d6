//! Redaction plans and the engine that applies them.
//!
//! A [`RedactionPlan`] pairs each sensitive value with the marker that
//! replaces it. The [`RedactionEngine`] applies a plan to the header
//! region of a page and reports what it did.

pub mod engine;
pub mod plan;

pub use engine::RedactionEngine;
pub use plan::{
    segments, MarkerStyle, PlanEntry, RedactionPlan, RedactionReport, FIXED_MARKER,
};
