//! Diagnostics payloads and the recent-log buffer attached to them.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::aggregate::ExitCondition;

/// Lines matching this pattern are too chatty to keep.
const EXCLUDED_LINES: &str = r"(Player|Opponent|TagChangeActions)\.";

/// Payload sent when a prediction contradicts the observed combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsRecord {
    /// Turn the combat happened on
    pub turn: u32,
    /// Observed result label that contradicted the prediction
    pub result: String,
    /// Workers the run used
    pub thread_count: usize,
    /// Completed trials
    pub iterations: u64,
    /// Why the run stopped
    pub exit_condition: ExitCondition,
    /// Aggregated result as JSON
    pub output: String,
    /// Snapshot as JSON
    pub input: String,
    /// Recent log lines, newline separated
    pub log: String,
}

/// Receiver of diagnostics records, typically an error-reporting service.
pub trait DiagnosticsSink: Send + Sync {
    /// Queues one record.
    fn report(&self, record: DiagnosticsRecord);
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl DiagnosticsSink for NullDiagnostics {
    fn report(&self, _record: DiagnosticsRecord) {}
}

/// Bounded buffer of the most recent log lines.
///
/// Clones share the same buffer, so one handle can be installed as a
/// [`RecentLogLayer`] while another is read by the orchestrator.
#[derive(Debug, Clone)]
pub struct RecentLog {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl RecentLog {
    /// Creates a buffer keeping at most `capacity` lines.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Appends a line, evicting the oldest when full.
    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Buffered lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }

    /// Buffered lines joined by newlines.
    #[must_use]
    pub fn excerpt(&self) -> String {
        self.lines().join("\n")
    }

    /// Number of buffered lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A subscriber layer feeding this buffer.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the exclusion pattern fails to compile.
    pub fn layer(&self) -> Result<RecentLogLayer, regex::Error> {
        Ok(RecentLogLayer {
            log: self.clone(),
            exclude: Regex::new(EXCLUDED_LINES)?,
        })
    }
}

/// `tracing_subscriber` layer that formats events into a [`RecentLog`].
///
/// # Example
///
/// ```
/// use brawl_core::invoker::RecentLog;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let log = RecentLog::new(10);
/// let subscriber = tracing_subscriber::registry().with(log.layer().unwrap());
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::info!(turn = 3, "State is now combat");
///     tracing::debug!("Player.Update skipped");
/// });
/// assert_eq!(log.lines(), vec!["INFO State is now combat turn=3".to_string()]);
/// ```
#[derive(Debug)]
pub struct RecentLogLayer {
    log: RecentLog,
    exclude: Regex,
}

impl<S: Subscriber> Layer<S> for RecentLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        if self.exclude.is_match(&visitor.message) {
            return;
        }
        let mut line = format!("{} {}", event.metadata().level(), visitor.message);
        line.push_str(&visitor.fields);
        self.log.push(line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}
