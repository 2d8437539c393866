use crate::logging::{LogEvent, LogFields, LogLevel};
use crate::registry::CloseCause;
use serde_json::json;
use std::time::Duration;

/// Counters describing what the routers did with incoming host events.
#[derive(Debug, Default, Clone)]
pub struct RouterMetrics {
    events: u64,
    clicks_routed: u64,
    clicks_ignored: u64,
    clicks_cancelled: u64,
    closes_close: u64,
    closes_quit: u64,
    closes_death: u64,
    handler_failures: u64,
}

impl RouterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self) {
        self.events = self.events.saturating_add(1);
    }

    pub fn record_click(&mut self, cancelled: bool) {
        self.clicks_routed = self.clicks_routed.saturating_add(1);
        if cancelled {
            self.clicks_cancelled = self.clicks_cancelled.saturating_add(1);
        }
    }

    pub fn record_ignored_click(&mut self) {
        self.clicks_ignored = self.clicks_ignored.saturating_add(1);
    }

    pub fn record_close(&mut self, cause: CloseCause) {
        let counter = match cause {
            CloseCause::Close => &mut self.closes_close,
            CloseCause::Quit => &mut self.closes_quit,
            CloseCause::Death => &mut self.closes_death,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn record_handler_failure(&mut self) {
        self.handler_failures = self.handler_failures.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            events: self.events,
            clicks_routed: self.clicks_routed,
            clicks_ignored: self.clicks_ignored,
            clicks_cancelled: self.clicks_cancelled,
            closes_close: self.closes_close,
            closes_quit: self.closes_quit,
            closes_death: self.closes_death,
            handler_failures: self.handler_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events: u64,
    pub clicks_routed: u64,
    pub clicks_ignored: u64,
    pub clicks_cancelled: u64,
    pub closes_close: u64,
    pub closes_quit: u64,
    pub closes_death: u64,
    pub handler_failures: u64,
}

impl MetricSnapshot {
    pub fn closes(&self) -> u64 {
        self.closes_close + self.closes_quit + self.closes_death
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "router_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("events".to_string(), json!(self.events));
        map.insert("clicks_routed".to_string(), json!(self.clicks_routed));
        map.insert("clicks_ignored".to_string(), json!(self.clicks_ignored));
        map.insert("clicks_cancelled".to_string(), json!(self.clicks_cancelled));
        map.insert("closes_close".to_string(), json!(self.closes_close));
        map.insert("closes_quit".to_string(), json!(self.closes_quit));
        map.insert("closes_death".to_string(), json!(self.closes_death));
        map.insert("handler_failures".to_string(), json!(self.handler_failures));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_causes_are_counted_separately() {
        let mut metrics = RouterMetrics::new();
        metrics.record_close(CloseCause::Quit);
        metrics.record_close(CloseCause::Quit);
        metrics.record_close(CloseCause::Death);
        let snapshot = metrics.snapshot(Duration::from_millis(5));
        assert_eq!(snapshot.closes_quit, 2);
        assert_eq!(snapshot.closes_death, 1);
        assert_eq!(snapshot.closes_close, 0);
        assert_eq!(snapshot.closes(), 3);
    }

    #[test]
    fn cancelled_clicks_count_as_routed() {
        let mut metrics = RouterMetrics::new();
        metrics.record_click(true);
        metrics.record_click(false);
        metrics.record_ignored_click();
        let snapshot = metrics.snapshot(Duration::ZERO);
        assert_eq!(snapshot.clicks_routed, 2);
        assert_eq!(snapshot.clicks_cancelled, 1);
        assert_eq!(snapshot.clicks_ignored, 1);
    }

    #[test]
    fn snapshot_log_event_carries_counters() {
        let mut metrics = RouterMetrics::new();
        metrics.record_event();
        let event = metrics
            .snapshot(Duration::from_secs(1))
            .to_log_event("grid_panel::metrics");
        assert_eq!(event.message, "router_metrics");
        assert_eq!(event.field("events"), Some(&json!(1)));
        assert_eq!(event.field("uptime_ms"), Some(&json!(1000)));
    }
}
