//! Observability plane (§4.H): a level-filtered structured event logger and
//! a counter/gauge/timing metrics collector. Both are capability traits
//! injected into the pipeline's configuration (§4.F, §6) — this crate ships
//! a `tracing`-based default sink plus no-op and test-recording
//! implementations, but never assumes a particular transport.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Structured context attached to a log event, analogous to the spec's
/// `Record<string, unknown>`. `BTreeMap` keeps iteration order stable for
/// deterministic test assertions.
pub type Context = BTreeMap<String, Value>;

/// Build a `Context` from `(&str, impl Into<Value>)` pairs.
#[macro_export]
macro_rules! ctx {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::Context::new();
        $(map.insert($key.to_string(), ::serde_json::json!($value));)*
        map
    }};
}

/// Log levels with priority ordering, lowest-to-highest (§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured event logger (§4.H). Level filtering is applied at the
/// facade — an event below the configured level is dropped before it ever
/// reaches a concrete sink.
pub trait EventLogger: Send + Sync {
    /// The minimum level this logger emits. Events below it are no-ops.
    fn level(&self) -> LogLevel;

    /// Emit a single structured event. Implementors should not filter here;
    /// filtering is handled by the `debug`/`info`/`warn`/`error` helpers.
    fn emit(&self, level: LogLevel, message: &str, context: &Context);

    fn debug(&self, message: &str, context: &Context) {
        if self.level() <= LogLevel::Debug {
            self.emit(LogLevel::Debug, message, context);
        }
    }

    fn info(&self, message: &str, context: &Context) {
        if self.level() <= LogLevel::Info {
            self.emit(LogLevel::Info, message, context);
        }
    }

    fn warn(&self, message: &str, context: &Context) {
        if self.level() <= LogLevel::Warn {
            self.emit(LogLevel::Warn, message, context);
        }
    }

    fn error(&self, message: &str, context: &Context) {
        if self.level() <= LogLevel::Error {
            self.emit(LogLevel::Error, message, context);
        }
    }
}

/// Counter/gauge/timing metrics collector (§4.H). `increment` defaults its
/// value to `1` per the spec's `increment(name, value=1, tags?)` signature.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, value: i64, tags: &Context);
    fn gauge(&self, name: &str, value: f64, tags: &Context);
    fn timing(&self, name: &str, millis: u64, tags: &Context);

    fn increment_by_one(&self, name: &str, tags: &Context) {
        self.increment(name, 1, tags);
    }
}

/// Default `tracing`-backed logger. Each level maps to the matching
/// `tracing` macro so the host application's subscriber controls the final
/// transport, matching the spec's "sinks are injected" stance.
pub struct TracingEventLogger {
    level: LogLevel,
}

impl TracingEventLogger {
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl EventLogger for TracingEventLogger {
    fn level(&self) -> LogLevel {
        self.level
    }

    fn emit(&self, level: LogLevel, message: &str, context: &Context) {
        let fields = serde_json::to_string(context).unwrap_or_default();
        match level {
            LogLevel::Debug => tracing::debug!(context = %fields, "{message}"),
            LogLevel::Info => tracing::info!(context = %fields, "{message}"),
            LogLevel::Warn => tracing::warn!(context = %fields, "{message}"),
            LogLevel::Error => tracing::error!(context = %fields, "{message}"),
        }
    }
}

/// Default `tracing`-backed metrics sink, emitted as structured `info!`
/// events a collector layer can scrape. Gated by `metricsEnabled` (§4.F) via
/// `NullMetricsSink` rather than an internal flag, per the capability-
/// substitution idiom used throughout the workspace.
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn increment(&self, name: &str, value: i64, tags: &Context) {
        let tags = serde_json::to_string(tags).unwrap_or_default();
        tracing::info!(metric = "counter", name, value, tags = %tags, "metric");
    }

    fn gauge(&self, name: &str, value: f64, tags: &Context) {
        let tags = serde_json::to_string(tags).unwrap_or_default();
        tracing::info!(metric = "gauge", name, value, tags = %tags, "metric");
    }

    fn timing(&self, name: &str, millis: u64, tags: &Context) {
        let tags = serde_json::to_string(tags).unwrap_or_default();
        tracing::info!(metric = "timing", name, millis, tags = %tags, "metric");
    }
}

/// No-op logger, used when a caller disables logging entirely.
pub struct NullEventLogger;

impl EventLogger for NullEventLogger {
    fn level(&self) -> LogLevel {
        LogLevel::Error
    }

    fn emit(&self, _level: LogLevel, _message: &str, _context: &Context) {}

    fn debug(&self, _message: &str, _context: &Context) {}
    fn info(&self, _message: &str, _context: &Context) {}
    fn warn(&self, _message: &str, _context: &Context) {}
    fn error(&self, _message: &str, _context: &Context) {}
}

/// No-op metrics sink, used when `metricsEnabled = false` (§4.F).
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn increment(&self, _name: &str, _value: i64, _tags: &Context) {}
    fn gauge(&self, _name: &str, _value: f64, _tags: &Context) {}
    fn timing(&self, _name: &str, _millis: u64, _tags: &Context) {}
}

/// One recorded log event, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub level: LogLevel,
    pub message: String,
    pub context: Context,
}

/// One recorded metric emission, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedMetric {
    Increment { name: String, value: i64, tags: Context },
    Gauge { name: String, value: f64, tags: Context },
    Timing { name: String, millis: u64, tags: Context },
}

/// In-memory recording logger, for scenario tests (§8 S1-S5) that assert on
/// exact event names/fields without standing up a `tracing` subscriber.
#[derive(Clone, Default)]
pub struct RecordingEventLogger {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    level: LogLevel,
}

impl RecordingEventLogger {
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            events: Arc::default(),
            level,
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn find(&self, message: &str) -> Option<RecordedEvent> {
        self.events()
            .into_iter()
            .find(|e| e.message == message)
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl EventLogger for RecordingEventLogger {
    fn level(&self) -> LogLevel {
        self.level
    }

    fn emit(&self, level: LogLevel, message: &str, context: &Context) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                level,
                message: message.to_string(),
                context: context.clone(),
            });
        }
    }
}

/// In-memory recording metrics sink, for scenario tests.
#[derive(Clone, Default)]
pub struct RecordingMetricsSink {
    metrics: Arc<Mutex<Vec<RecordedMetric>>>,
}

impl RecordingMetricsSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn metrics(&self) -> Vec<RecordedMetric> {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Sum of all `increment` calls matching `name` exactly (ignores tags).
    #[must_use]
    pub fn total_increments(&self, name: &str) -> i64 {
        self.metrics()
            .into_iter()
            .filter_map(|m| match m {
                RecordedMetric::Increment { name: n, value, .. } if n == name => Some(value),
                _ => None,
            })
            .sum()
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn increment(&self, name: &str, value: i64, tags: &Context) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.push(RecordedMetric::Increment {
                name: name.to_string(),
                value,
                tags: tags.clone(),
            });
        }
    }

    fn gauge(&self, name: &str, value: f64, tags: &Context) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.push(RecordedMetric::Gauge {
                name: name.to_string(),
                value,
                tags: tags.clone(),
            });
        }
    }

    fn timing(&self, name: &str, millis: u64, tags: &Context) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.push(RecordedMetric::Timing {
                name: name.to_string(),
                millis,
                tags: tags.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filtering_drops_events_below_configured_level() {
        let logger = RecordingEventLogger::new(LogLevel::Warn);
        logger.debug("should be dropped", &Context::new());
        logger.info("also dropped", &Context::new());
        logger.warn("kept", &Context::new());
        let events = logger.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "kept");
    }

    #[test]
    fn null_logger_never_records() {
        let logger = NullEventLogger;
        logger.error("ignored", &Context::new());
        // No panic, no observable state; nothing further to assert.
    }

    #[test]
    fn recording_metrics_sums_increments() {
        let metrics = RecordingMetricsSink::new();
        metrics.increment("batches_total", 1, &Context::new());
        metrics.increment("batches_total", 2, &Context::new());
        assert_eq!(metrics.total_increments("batches_total"), 3);
    }

    #[test]
    fn ctx_macro_builds_expected_map() {
        let c = ctx!("batch_size" => 3, "resume_preserved" => true);
        assert_eq!(c.get("batch_size").unwrap(), &Value::from(3));
        assert_eq!(c.get("resume_preserved").unwrap(), &Value::from(true));
    }
}
