//! Chest-style grid panels for interactive menus.
//!
//! A [`GridPanel`] is a 9-column grid of one to six rows. Each slot holds
//! optional [`CellContent`], an optional click handler and a takeable flag.
//! Panels are created through a [`PanelFactory`], which registers one
//! [`EventRouter`] per panel on the host's [`EventBus`]. The router filters
//! raw host events down to the panel's own viewers and dispatches clicks and
//! close/quit/death notifications to the registered handlers.
//!
//! ```
//! use std::sync::Arc;
//!
//! use grid_panel::{
//!     Actor, CellContent, ClickSurface, EventBus, HostEvent, LayoutPattern, PanelFactory,
//!     RecordingDisplay, lock_panel,
//! };
//!
//! let mut bus = EventBus::new();
//! let factory = PanelFactory::new("shop", Arc::new(RecordingDisplay::new()));
//! let panel = factory.create_titled(&mut bus, 3, "Shop").unwrap();
//!
//! let border = LayoutPattern::of_lines(["#########", "#       #", "#########"])
//!     .with_content('#', CellContent::of("black_stained_glass_pane"));
//!
//! let id = {
//!     let mut panel = lock_panel(&panel).unwrap();
//!     panel.apply_layout(&border).unwrap();
//!     panel.show(Actor::player("alex")).unwrap();
//!     panel.id()
//! };
//!
//! let mut click = HostEvent::click(
//!     Actor::player("alex"),
//!     ClickSurface::Panel(id),
//!     0,
//!     Some(CellContent::of("black_stained_glass_pane")),
//! );
//! bus.dispatch(&mut click).unwrap();
//! assert!(matches!(&click, HostEvent::Click(event) if event.is_cancelled()));
//! ```

pub mod content;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod width;

pub use content::{CellContent, ContentFlag};
pub use error::{PanelError, Result};
pub use geometry::{COLUMNS, MAX_ROWS, PanelSize};
pub use layout::{LayoutPattern, Placement};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, RouterMetrics};
pub use registry::{
    ClickHandler, CloseCause, CloseHandler, DefaultCloseHandler, GridPanel, PanelId, SharedPanel,
    click_handler, close_handler, default_close_handler, lock_panel,
};
pub use render::{
    AnsiDisplay, AnsiDisplaySettings, DisplayRecord, PanelDisplay, RecordingDisplay,
    RenderRequest, SharedDisplay, SlotChange,
};
pub use runtime::audit::{
    BufferedPanelAudit, NullPanelAudit, PanelAudit, PanelAuditEvent, PanelAuditEventBuilder,
    PanelAuditStage,
};
pub use runtime::diagnostics::EventLoggerListener;
pub use runtime::factory::PanelFactory;
pub use runtime::router::EventRouter;
pub use runtime::{
    Actor, ActorId, ActorKind, ClickEvent, ClickSurface, DispatchFailure, EventBus, EventFlow,
    HostEvent, ListenerId, PanelListener, RuntimeConfig,
};
pub use width::{display_width, fit_to_width};
