//! Routes host events into one panel's handlers.
//!
//! Clicks reach handlers only when they come from a player who is viewing the
//! panel, land on the panel's own grid and hit a slot that holds content.
//! Closes of any cause reach handlers only for current viewers, and remove the
//! viewer before any handler runs so each close fires once.
//!
//! Handlers are cloned out of the panel lock and called after it is released,
//! so they are free to lock and mutate the panel themselves.

use serde_json::Value;

use crate::Result;
use crate::logging::{LogLevel, TARGET_ROUTER, emit, json_kv};
use crate::metrics::RouterMetrics;
use crate::registry::{CloseCause, PanelId, SharedPanel, lock_panel};

use super::audit::{PanelAuditEventBuilder, PanelAuditStage};
use super::{ClickEvent, ClickSurface, EventFlow, HostEvent, PanelListener, RuntimeConfig};

/// Why a click never reached the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IgnoreReason {
    NotAPlayer,
    EmptySlot,
    ForeignSurface,
    NotViewing,
}

impl IgnoreReason {
    fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::NotAPlayer => "not_a_player",
            IgnoreReason::EmptySlot => "empty_slot",
            IgnoreReason::ForeignSurface => "foreign_surface",
            IgnoreReason::NotViewing => "not_viewing",
        }
    }
}

pub struct EventRouter {
    panel: SharedPanel,
    panel_id: PanelId,
    config: RuntimeConfig,
}

impl EventRouter {
    pub fn new(panel: SharedPanel, config: RuntimeConfig) -> Result<Self> {
        let panel_id = lock_panel(&panel)?.id();
        Ok(Self {
            panel,
            panel_id,
            config,
        })
    }

    pub fn panel_id(&self) -> PanelId {
        self.panel_id
    }

    pub fn route(&self, event: &mut HostEvent) -> Result<()> {
        if let HostEvent::Click(click) = event {
            return self.route_click(click);
        }
        self.route_close(event)
    }

    pub fn route_click(&self, click: &mut ClickEvent) -> Result<()> {
        if !click.actor.is_player() {
            return self.ignore(click, IgnoreReason::NotAPlayer);
        }
        if !click.has_content() {
            return self.ignore(click, IgnoreReason::EmptySlot);
        }
        if click.surface != ClickSurface::Panel(self.panel_id) {
            return self.ignore(click, IgnoreReason::ForeignSurface);
        }

        let (default_handler, slot_handler) = {
            let panel = lock_panel(&self.panel)?;
            if !panel.is_viewer(&click.actor) {
                drop(panel);
                return self.ignore(click, IgnoreReason::NotViewing);
            }
            if !panel.is_stealable(click.slot) {
                click.set_cancelled(true);
            }
            (panel.default_click_handler(), panel.click_handler(click.slot))
        };

        let cancelled = click.is_cancelled();
        self.config.with_metrics(|metrics| metrics.record_click(cancelled));
        self.log(
            LogLevel::Debug,
            "click_routed",
            [
                json_kv("actor", click.actor.id.as_str()),
                json_kv("slot", click.slot),
                json_kv("cancelled", cancelled),
            ],
        );
        self.audit(
            PanelAuditEventBuilder::new(self.panel_id, PanelAuditStage::ClickRouted)
                .detail("actor", click.actor.id.as_str())
                .detail("slot", click.slot),
        );
        if cancelled {
            self.audit(
                PanelAuditEventBuilder::new(self.panel_id, PanelAuditStage::ClickCancelled)
                    .detail("slot", click.slot),
            );
        }

        if let Some(handler) = default_handler {
            handler(click)?;
        }
        if let Some(handler) = slot_handler {
            handler(click)?;
        }
        Ok(())
    }

    pub fn route_close(&self, event: &HostEvent) -> Result<()> {
        let Some((cause, actor)) = event.close_subject() else {
            return Ok(());
        };
        if !actor.is_player() {
            return Ok(());
        }

        let (handler, default_handler) = {
            let mut panel = lock_panel(&self.panel)?;
            if !panel.remove_viewer(actor) {
                return Ok(());
            }
            (panel.close_handler(cause), panel.default_close_handler())
        };

        self.config.with_metrics(|metrics| metrics.record_close(cause));
        self.log(
            LogLevel::Debug,
            "viewer_closed",
            [
                json_kv("actor", actor.id.as_str()),
                json_kv("cause", cause.as_str()),
                json_kv("handled", handler.is_some()),
            ],
        );
        self.audit(
            PanelAuditEventBuilder::new(self.panel_id, PanelAuditStage::ViewerClosed)
                .detail("actor", actor.id.as_str())
                .detail("cause", cause.as_str()),
        );

        if let Some(handler) = handler {
            handler(event, actor)?;
        }
        if let Some(handler) = default_handler {
            handler(event)?;
        }
        Ok(())
    }

    fn ignore(&self, click: &ClickEvent, reason: IgnoreReason) -> Result<()> {
        self.config.with_metrics(RouterMetrics::record_ignored_click);
        self.log(
            LogLevel::Trace,
            "click_ignored",
            [
                json_kv("actor", click.actor.id.as_str()),
                json_kv("slot", click.slot),
                json_kv("reason", reason.as_str()),
            ],
        );
        Ok(())
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let panel = json_kv("panel", self.panel_id.get());
        emit(
            self.config.logger.as_ref(),
            level,
            TARGET_ROUTER,
            message,
            std::iter::once(panel).chain(fields),
        );
    }

    fn audit(&self, builder: PanelAuditEventBuilder) {
        if let Some(audit) = self.config.audit.as_ref() {
            audit.record(builder.finish());
        }
    }
}

impl PanelListener for EventRouter {
    fn name(&self) -> &str {
        TARGET_ROUTER
    }

    fn on_event(&mut self, event: &mut HostEvent) -> Result<EventFlow> {
        self.route(event)?;
        Ok(EventFlow::Continue)
    }
}
