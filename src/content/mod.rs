//! Content module orchestrator.
//!
//! Panels treat content as opaque data; this module only defines the payload
//! shape and its fluent constructors.

mod core;

pub use core::{CellContent, ContentFlag, EMPTY_MATERIAL};
