//! Registry module orchestrator.
//!
//! `GridPanel` owns cell contents, handler maps, takeable flags and viewers;
//! callers import it and the handler aliases from here.

mod core;

pub use core::{
    ClickHandler, CloseCause, CloseHandler, DefaultCloseHandler, GridPanel, PanelId, SharedPanel,
    click_handler, close_handler, default_close_handler, lock_panel,
};
