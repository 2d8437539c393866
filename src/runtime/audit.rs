//! Panel lifecycle audit hooks.
//!
//! Records capture a stage identifier plus structured details so hosts can
//! buffer or inspect what happened to a panel without hooking the router
//! internals.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

use crate::registry::PanelId;

/// Distinct checkpoints in a panel's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAuditStage {
    /// The factory built a panel and registered its router.
    PanelCreated,
    /// A panel was rendered to an actor.
    ViewerShown,
    /// A click passed every filter and reached the handlers.
    ClickRouted,
    /// A routed click was cancelled because its slot is unstealable.
    ClickCancelled,
    /// A viewer left the panel (any close cause).
    ViewerClosed,
    /// `reset` cleared contents and handlers.
    PanelReset,
}

#[derive(Debug, Clone)]
pub struct PanelAuditEvent {
    pub timestamp: SystemTime,
    pub panel: PanelId,
    pub stage: PanelAuditStage,
    pub details: Vec<(String, Value)>,
}

impl PanelAuditEvent {
    fn new(panel: PanelId, stage: PanelAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            panel,
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct PanelAuditEventBuilder {
    event: PanelAuditEvent,
}

impl PanelAuditEventBuilder {
    pub fn new(panel: PanelId, stage: PanelAuditStage) -> Self {
        Self {
            event: PanelAuditEvent::new(panel, stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> PanelAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait PanelAudit: Send + Sync {
    fn record(&self, event: PanelAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullPanelAudit;

impl PanelAudit for NullPanelAudit {
    fn record(&self, _event: PanelAuditEvent) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct BufferedPanelAudit {
    events: Mutex<Vec<PanelAuditEvent>>,
}

impl BufferedPanelAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PanelAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<PanelAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }
}

impl PanelAudit for BufferedPanelAudit {
    fn record(&self, event: PanelAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_details_in_order() {
        let event = PanelAuditEventBuilder::new(PanelId::from_raw(3), PanelAuditStage::ClickRouted)
            .detail("slot", 4)
            .detail("actor", "alex")
            .finish();
        assert_eq!(event.panel, PanelId::from_raw(3));
        assert_eq!(event.detail("slot"), Some(&json!(4)));
        assert_eq!(event.details[1].0, "actor");
    }

    #[test]
    fn buffered_audit_keeps_stage_order() {
        let audit = BufferedPanelAudit::new();
        let panel = PanelId::from_raw(1);
        audit.record(PanelAuditEventBuilder::new(panel, PanelAuditStage::PanelCreated).finish());
        audit.record(PanelAuditEventBuilder::new(panel, PanelAuditStage::ViewerShown).finish());
        assert_eq!(
            audit.stages(),
            vec![PanelAuditStage::PanelCreated, PanelAuditStage::ViewerShown]
        );
    }
}
