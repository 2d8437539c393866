use serde_json::json;

use crate::Result;
use crate::logging::{LogLevel, Logger, TARGET_EVENTS, event_with_fields, json_kv};

use super::{EventFlow, HostEvent, PanelListener};

/// Logs every host event that passes through the bus. Register it with a
/// high priority so it sees events before any router can fail on them.
pub struct EventLoggerListener {
    logger: Logger,
    level: LogLevel,
    log_clicks: bool,
    log_closes: bool,
    log_quits: bool,
    log_deaths: bool,
}

impl EventLoggerListener {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Debug,
            log_clicks: false,
            log_closes: true,
            log_quits: true,
            log_deaths: true,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn log_clicks(mut self, enabled: bool) -> Self {
        self.log_clicks = enabled;
        self
    }

    pub fn log_closes(mut self, enabled: bool) -> Self {
        self.log_closes = enabled;
        self
    }

    pub fn log_quits(mut self, enabled: bool) -> Self {
        self.log_quits = enabled;
        self
    }

    pub fn log_deaths(mut self, enabled: bool) -> Self {
        self.log_deaths = enabled;
        self
    }

    fn emit(&self, message: &str, fields: impl IntoIterator<Item = (String, serde_json::Value)>) {
        let event = event_with_fields(self.level, TARGET_EVENTS, message, fields);
        let _ = self.logger.log_event(event);
    }
}

impl PanelListener for EventLoggerListener {
    fn name(&self) -> &str {
        "diagnostics.event_logger"
    }

    fn on_event(&mut self, event: &mut HostEvent) -> Result<EventFlow> {
        match event {
            HostEvent::Click(click) if self.log_clicks => {
                self.emit(
                    "event.click",
                    [
                        json_kv("actor", click.actor.id.as_str()),
                        json_kv("surface", json!(format!("{:?}", click.surface))),
                        json_kv("slot", click.slot),
                        json_kv("has_content", click.has_content()),
                    ],
                );
            }
            HostEvent::Close { actor } if self.log_closes => {
                self.emit("event.close", [json_kv("actor", actor.id.as_str())]);
            }
            HostEvent::Quit { actor } if self.log_quits => {
                self.emit("event.quit", [json_kv("actor", actor.id.as_str())]);
            }
            HostEvent::Death { victim, killer } if self.log_deaths => {
                self.emit(
                    "event.death",
                    [
                        json_kv("victim", victim.id.as_str()),
                        json_kv("killer", json!(killer.as_ref().map(|k| k.id.as_str()))),
                    ],
                );
            }
            _ => {}
        }

        Ok(EventFlow::Continue)
    }
}
