//! Layout module orchestrator.
//!
//! Panels consume [`LayoutPattern`]s through `GridPanel::apply_layout`; the
//! fill algorithm itself lives in `pattern`.

pub mod pattern;

pub use pattern::{LayoutPattern, Placement};
