//! Render module orchestrator: the display seam plus the bundled displays.

mod core;

pub use core::{
    AnsiDisplay, AnsiDisplaySettings, DisplayRecord, PanelDisplay, RecordingDisplay,
    RenderRequest, SharedDisplay, SlotChange,
};
