use std::sync::{Arc, Mutex};

use crate::Result;
use crate::geometry::PanelSize;
use crate::logging::{LogLevel, TARGET_PANEL, emit, json_kv};
use crate::registry::{GridPanel, SharedPanel};
use crate::render::SharedDisplay;

use super::{EventBus, RuntimeConfig};
use super::audit::{PanelAuditEventBuilder, PanelAuditStage};
use super::router::EventRouter;

/// Priority routers are registered with on the bus.
pub const ROUTER_PRIORITY: i32 = 0;

/// Builds panels on behalf of one host component and wires a router for each
/// one into the event bus under that component's name.
///
/// Every panel needs its own router; unregistering the owner from the bus
/// (`EventBus::unregister_owner`) detaches all of them at once.
pub struct PanelFactory {
    owner: String,
    display: SharedDisplay,
    config: RuntimeConfig,
}

impl PanelFactory {
    pub fn new(owner: impl Into<String>, display: SharedDisplay) -> Self {
        Self {
            owner: owner.into(),
            display,
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create a panel with `rows` rows and the configured default title.
    pub fn create(&self, bus: &mut EventBus, rows: i64) -> Result<SharedPanel> {
        let title = self.config.default_title.clone();
        self.create_titled(bus, rows, title)
    }

    /// Create a titled panel. Fails with `InvalidRows` before anything is
    /// built or registered when `rows` is not in `1..=6`.
    pub fn create_titled(
        &self,
        bus: &mut EventBus,
        rows: i64,
        title: impl Into<String>,
    ) -> Result<SharedPanel> {
        let size = PanelSize::new(rows)?;
        let panel = GridPanel::new(size, title, Arc::clone(&self.display), self.config.clone());
        let id = panel.id();
        let panel: SharedPanel = Arc::new(Mutex::new(panel));

        let router = EventRouter::new(Arc::clone(&panel), self.config.clone())?;
        bus.register(self.owner.clone(), router, ROUTER_PRIORITY);

        emit(
            self.config.logger.as_ref(),
            LogLevel::Info,
            TARGET_PANEL,
            "panel_created",
            [
                json_kv("panel", id.get()),
                json_kv("owner", self.owner.as_str()),
                json_kv("rows", size.rows()),
            ],
        );
        if let Some(audit) = self.config.audit.as_ref() {
            audit.record(
                PanelAuditEventBuilder::new(id, PanelAuditStage::PanelCreated)
                    .detail("owner", self.owner.as_str())
                    .detail("rows", size.rows())
                    .finish(),
            );
        }

        Ok(panel)
    }
}
