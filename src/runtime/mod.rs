use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::Result;
use crate::error::PanelError;
use crate::logging::{LogLevel, Logger, TARGET_BUS, TARGET_METRICS, emit, json_kv};
use crate::metrics::RouterMetrics;

pub mod audit;
pub mod diagnostics;
pub mod events;
pub mod factory;
pub mod router;

pub use audit::PanelAudit;
pub use events::{Actor, ActorId, ActorKind, ClickEvent, ClickSurface, HostEvent};

/// Configuration shared by the bus, the factory and every panel/router it
/// creates.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Routing counters; `None` disables metrics.
    pub metrics: Option<Arc<Mutex<RouterMetrics>>>,
    /// Optional lifecycle audit sink.
    pub audit: Option<Arc<dyn PanelAudit>>,
    /// Title used by `PanelFactory::create` when none is given.
    pub default_title: String,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            audit: None,
            default_title: String::new(),
            metrics_target: TARGET_METRICS.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(RouterMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<RouterMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    pub(crate) fn with_metrics(&self, record: impl FnOnce(&mut RouterMetrics)) {
        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("logger", &self.logger.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("audit", &self.audit.is_some())
            .field("default_title", &self.default_title)
            .field("metrics_target", &self.metrics_target)
            .finish()
    }
}

/// Control the propagation of an event across listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Consumed,
}

/// Anything that wants to observe host events.
pub trait PanelListener: Send {
    fn name(&self) -> &str {
        "panel_listener"
    }

    fn on_event(&mut self, event: &mut HostEvent) -> Result<EventFlow>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    owner: String,
    priority: i32,
    listener: Box<dyn PanelListener>,
}

/// An event that failed inside [`EventBus::dispatch_all`].
#[derive(Debug)]
pub struct DispatchFailure {
    /// Position of the event in the submitted batch.
    pub position: usize,
    pub event: HostEvent,
    pub error: PanelError,
}

/// The host side event source. Listeners are registered per owning host
/// component and receive every event in descending priority order; equal
/// priorities keep registration order.
pub struct EventBus {
    listeners: Vec<ListenerEntry>,
    next_id: u64,
    config: RuntimeConfig,
    started_at: Instant,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
            config,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    pub fn register<L>(&mut self, owner: impl Into<String>, listener: L, priority: i32) -> ListenerId
    where
        L: PanelListener + 'static,
    {
        self.register_boxed(owner, Box::new(listener), priority)
    }

    pub fn register_boxed(
        &mut self,
        owner: impl Into<String>,
        listener: Box<dyn PanelListener>,
        priority: i32,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let owner = owner.into();
        emit(
            self.config.logger.as_ref(),
            LogLevel::Debug,
            TARGET_BUS,
            "listener_registered",
            [
                json_kv("owner", owner.as_str()),
                json_kv("listener", listener.name()),
                json_kv("priority", priority),
            ],
        );
        let position = self
            .listeners
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(
            position,
            ListenerEntry {
                id,
                owner,
                priority,
                listener,
            },
        );
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    /// Drop every listener registered by `owner`, e.g. when the owning host
    /// component shuts down. Returns how many were removed.
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.owner != owner);
        let removed = before - self.listeners.len();
        emit(
            self.config.logger.as_ref(),
            LogLevel::Info,
            TARGET_BUS,
            "owner_unregistered",
            [json_kv("owner", owner), json_kv("removed", removed)],
        );
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver one event to every listener.
    ///
    /// A failing listener does not keep later listeners from seeing the
    /// event; the first failure is returned once delivery is complete.
    pub fn dispatch(&mut self, event: &mut HostEvent) -> Result<()> {
        self.config.with_metrics(RouterMetrics::record_event);
        let mut first_error = None;
        let mut consumed = false;

        for entry in self.listeners.iter_mut() {
            match entry.listener.on_event(event) {
                Ok(EventFlow::Continue) => {}
                Ok(EventFlow::Consumed) => {
                    consumed = true;
                    break;
                }
                Err(err) => {
                    emit(
                        self.config.logger.as_ref(),
                        LogLevel::Error,
                        TARGET_BUS,
                        "listener_failed",
                        [
                            json_kv("listener", entry.listener.name()),
                            json_kv("owner", entry.owner.as_str()),
                            json_kv("event", event.describe()),
                            json_kv("error", err.to_string()),
                        ],
                    );
                    self.config.with_metrics(RouterMetrics::record_handler_failure);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        emit(
            self.config.logger.as_ref(),
            LogLevel::Trace,
            TARGET_BUS,
            "event_dispatched",
            [
                json_kv("event", event.describe()),
                json_kv("actor", event.actor().id.as_str()),
                json_kv("consumed", consumed),
            ],
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Deliver a batch of events, acting as the host's error boundary: a
    /// failing event is logged and reported, and delivery moves on to the
    /// next one.
    pub fn dispatch_all<I>(&mut self, events: I) -> Vec<DispatchFailure>
    where
        I: IntoIterator<Item = HostEvent>,
    {
        let mut failures = Vec::new();
        for (position, mut event) in events.into_iter().enumerate() {
            if let Err(error) = self.dispatch(&mut event) {
                failures.push(DispatchFailure {
                    position,
                    event,
                    error,
                });
            }
        }
        failures
    }

    /// Log a metrics snapshot through the configured logger, if both exist.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let snapshot = guard.snapshot(self.started_at.elapsed());
                let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
            }
        }
    }
}
