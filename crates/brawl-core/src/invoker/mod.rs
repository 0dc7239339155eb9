//! Invocation orchestrator.
//!
//! The boundary between the game-tracking host and the engine. The host asks
//! the [`Orchestrator`] for the [`Invocation`] of a (match, turn) and drives it
//! through the combat phase:
//!
//! ```text
//! Idle ──start_combat──▶ Combat ───────────────────┐
//!   │                                              ├──start_shopping──▶ Shopping
//!   └──start_combat (secrets)──▶ CombatWithoutSimulation
//! ```
//!
//! Runs happen on a background thread; their reports arrive over a channel
//! wrapped in a [`SimulationHandle`] and are pushed to the host's
//! [`ResultSink`] while the invocation holds display rights. A run superseded
//! by a re-run, or whose invocation was retired, is discarded.

mod diagnostics;
mod store;
mod validation;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::aggregate::{AggregatedResult, ExitCondition};
use crate::card::CardTable;
use crate::config::SimulationConfig;
use crate::error::ErrorState;
use crate::simulation::{RunParameters, SimulationRunner};
use crate::snapshot::{BoardSnapshot, RawCard, RawCombatState, SnapshotBuilder};

pub use diagnostics::{DiagnosticsRecord, DiagnosticsSink, NullDiagnostics, RecentLog, RecentLogLayer};
pub use store::{SimulationKey, SimulationStore};
pub use validation::{
    HeroObservation, LethalResult, ObservedCombat, SkipReason, Validation, ValidationReport,
    Validator,
};

// =============================================================================
// Host-facing types
// =============================================================================

/// Phase of one invocation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Nothing has happened yet
    #[default]
    Idle,
    /// Combat started and the simulation ran or is running
    Combat,
    /// Combat started but the run waits for information revealed during it
    CombatWithoutSimulation,
    /// Combat is over
    Shopping,
}

/// Receiver of everything the host displays.
///
/// Only the invocation holding display rights calls it.
pub trait ResultSink: Send + Sync {
    /// The invocation changed state.
    fn state_changed(&self, _key: &SimulationKey, _state: InvocationState) {}

    /// A run started; previous rates are stale.
    fn running(&self, _key: &SimulationKey) {}

    /// The error overlay changed; [`ErrorState::None`] clears it.
    fn error(&self, _key: &SimulationKey, _error: ErrorState) {}

    /// A run completed with rates worth showing.
    fn result(&self, _key: &SimulationKey, _result: &AggregatedResult) {}
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultSink for NullSink {}

/// What a background run delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Invocation the run belongs to
    pub key: SimulationKey,
    /// Aggregated result
    pub result: AggregatedResult,
    /// Error overlay derived from the exit condition
    pub error: ErrorState,
    /// Validation, for runs deferred until after combat
    pub validation: Option<Validation>,
}

/// Pending report of a background run.
///
/// The report never arrives when the run was superseded or its invocation
/// retired; waiting then returns `None`.
#[derive(Debug)]
pub struct SimulationHandle {
    receiver: Receiver<SimulationReport>,
}

impl SimulationHandle {
    /// Blocks until the run reports or is discarded.
    #[must_use]
    pub fn wait(self) -> Option<SimulationReport> {
        self.receiver.recv().ok()
    }

    /// Blocks for at most `timeout`.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SimulationReport> {
        match self.receiver.recv_timeout(timeout) {
            Ok(report) => Some(report),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// The report, if it already arrived.
    #[must_use]
    pub fn try_report(&self) -> Option<SimulationReport> {
        self.receiver.try_recv().ok()
    }

    /// The underlying channel, for use in `select!`.
    #[must_use]
    pub fn receiver(&self) -> &Receiver<SimulationReport> {
        &self.receiver
    }
}

/// What leaving combat did.
#[derive(Debug)]
pub enum ShoppingOutcome {
    /// The invocation was already shopping
    AlreadyShopping,
    /// The committed prediction was validated
    Validated(Validation),
    /// The deferred run started; its report carries the validation
    Deferred(SimulationHandle),
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Clone)]
struct Shared {
    config: SimulationConfig,
    table: CardTable,
    results: Arc<dyn ResultSink>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    recent_log: RecentLog,
}

/// Owns the invocation store and the collaborators every invocation shares.
///
/// # Example
///
/// ```
/// use brawl_core::card::CardTable;
/// use brawl_core::config::SimulationConfig;
/// use brawl_core::invoker::Orchestrator;
///
/// let orchestrator = Orchestrator::new(SimulationConfig::default(), CardTable::standard());
/// let first = orchestrator.instance("match-1", 3, true).unwrap();
/// let again = orchestrator.instance("match-1", 3, false).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
/// assert!(orchestrator.instance("match-1", 4, false).is_none());
/// ```
pub struct Orchestrator {
    shared: Arc<Shared>,
    store: Mutex<SimulationStore>,
}

impl Orchestrator {
    /// Creates an orchestrator with null sinks.
    #[must_use]
    pub fn new(config: SimulationConfig, table: CardTable) -> Self {
        let recent_log = RecentLog::new(config.log_lines_kept);
        Self {
            shared: Arc::new(Shared {
                config,
                table,
                results: Arc::new(NullSink),
                diagnostics: Arc::new(NullDiagnostics),
                recent_log,
            }),
            store: Mutex::new(SimulationStore::new()),
        }
    }

    /// Sets the result sink for invocations created afterwards.
    #[must_use]
    pub fn with_result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        Arc::make_mut(&mut self.shared).results = sink;
        self
    }

    /// Sets the diagnostics sink for invocations created afterwards.
    #[must_use]
    pub fn with_diagnostics_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Arc::make_mut(&mut self.shared).diagnostics = sink;
        self
    }

    /// Uses `log` as the source of diagnostics log excerpts.
    #[must_use]
    pub fn with_recent_log(mut self, log: RecentLog) -> Self {
        Arc::make_mut(&mut self.shared).recent_log = log;
        self
    }

    /// The invocation for a match and turn.
    ///
    /// A new match id clears every stored invocation first. Returns `None`
    /// when none exists and `create` is false.
    pub fn instance(&self, match_id: &str, turn: u32, create: bool) -> Option<Arc<Invocation>> {
        let key = SimulationKey::new(match_id, turn);
        let shared = &self.shared;
        self.store()
            .get_or_create(&key, create.then(|| || Invocation::new(key.clone(), Arc::clone(shared))))
    }

    /// Number of stored invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// True when no invocation is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }

    /// Card table snapshots are built with.
    #[must_use]
    pub fn table(&self) -> &CardTable {
        &self.shared.table
    }

    /// Buffer diagnostics excerpts are taken from.
    #[must_use]
    pub fn recent_log(&self) -> &RecentLog {
        &self.shared.recent_log
    }

    fn store(&self) -> MutexGuard<'_, SimulationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.shared.config)
            .field("store", &*self.store())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Invocation
// =============================================================================

#[derive(Default)]
struct Inner {
    state: InvocationState,
    error: ErrorState,
    snapshot: Option<Arc<BoardSnapshot>>,
    output: Option<AggregatedResult>,
    generation: u64,
    reruns: u32,
}

/// Simulation state of one combat.
pub struct Invocation {
    key: SimulationKey,
    shared: Arc<Shared>,
    displayed: AtomicBool,
    inner: Mutex<Inner>,
}

impl Invocation {
    fn new(key: SimulationKey, shared: Arc<Shared>) -> Self {
        debug!(key = %key, "Creating invocation");
        Self {
            key,
            shared,
            displayed: AtomicBool::new(true),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Identity of this invocation.
    #[must_use]
    pub fn key(&self) -> &SimulationKey {
        &self.key
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> InvocationState {
        self.lock().state
    }

    /// Current error overlay.
    #[must_use]
    pub fn error_state(&self) -> ErrorState {
        self.lock().error
    }

    /// Result of the latest completed run.
    #[must_use]
    pub fn output(&self) -> Option<AggregatedResult> {
        self.lock().output.clone()
    }

    /// Snapshot the next run uses.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<BoardSnapshot>> {
        self.lock().snapshot.clone()
    }

    /// Re-runs requested by hand reveals during this combat.
    #[must_use]
    pub fn reruns(&self) -> u32 {
        self.lock().reruns
    }

    /// False once a newer invocation took over the display.
    #[must_use]
    pub fn is_displayed(&self) -> bool {
        self.displayed.load(Ordering::Acquire)
    }

    /// Enters combat with the board state the log reported.
    ///
    /// Returns a handle to the started run, or `None` when already in combat,
    /// when the state cannot be simulated (see [`Invocation::error_state`]),
    /// or when the run is deferred because the opponent has secrets.
    pub fn start_combat(self: &Arc<Self>, raw: &RawCombatState) -> Option<SimulationHandle> {
        let mut inner = self.lock();
        if inner.state == InvocationState::Combat {
            debug!("Already in combat state. Exiting");
            return None;
        }
        info!(key = %self.key, "State is now combat");
        inner.state = InvocationState::Combat;
        inner.output = None;
        inner.reruns = 0;

        let snapshot = match SnapshotBuilder::new(&self.shared.table).build(raw) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                warn!(error = %err, "Cannot simulate combat");
                let error = ErrorState::from(&err);
                inner.error = error;
                inner.snapshot = None;
                drop(inner);
                self.notify(|sink| {
                    sink.state_changed(&self.key, InvocationState::Combat);
                    sink.error(&self.key, error);
                });
                return None;
            }
        };
        inner.error = ErrorState::None;
        inner.snapshot = Some(Arc::clone(&snapshot));

        if snapshot.opponent_has_secrets() {
            debug!("Opponent has secrets. Simulating after combat");
            inner.state = InvocationState::CombatWithoutSimulation;
            drop(inner);
            self.notify(|sink| sink.state_changed(&self.key, InvocationState::CombatWithoutSimulation));
            return None;
        }

        inner.generation += 1;
        let generation = inner.generation;
        drop(inner);
        self.notify(|sink| sink.state_changed(&self.key, InvocationState::Combat));
        Some(self.spawn_run(snapshot, generation, None))
    }

    /// Replaces the opponent's secrets with the ones combat revealed.
    pub fn reveal_opponent_secrets(&self, ids: &[String]) {
        let mut inner = self.lock();
        let secrets = SnapshotBuilder::new(&self.shared.table).build_secrets(ids);
        let next = inner
            .snapshot
            .as_ref()
            .map(|snapshot| Arc::new(snapshot.with_opponent_secrets(secrets)));
        if next.is_some() {
            debug!(count = ids.len(), "Set revealed opponent secrets");
            inner.snapshot = next;
        }
    }

    /// Updates the opponent's hand after `revealed_card_id` was revealed.
    ///
    /// Only cards marked relevant in hand trigger a re-run, at most
    /// `max_reruns` times per combat. Deferred runs pick the new hand up when
    /// they start.
    pub fn update_opponent_hand(
        self: &Arc<Self>,
        hand: &[RawCard],
        revealed_card_id: &str,
    ) -> Option<SimulationHandle> {
        let table = &self.shared.table;
        if !table.card(revealed_card_id).is_some_and(|c| c.relevant_in_hand) {
            trace!(card_id = %revealed_card_id, "Hand reveal is not relevant");
            return None;
        }

        let mut inner = self.lock();
        // Hands revealed while shopping belong to the next combat's snapshot.
        if !matches!(
            inner.state,
            InvocationState::Combat | InvocationState::CombatWithoutSimulation
        ) {
            return None;
        }
        let snapshot = inner.snapshot.as_ref()?;
        let hand = SnapshotBuilder::new(table).build_hand(hand);
        let snapshot = Arc::new(snapshot.with_opponent_hand(hand));
        inner.snapshot = Some(Arc::clone(&snapshot));

        inner.reruns += 1;
        if inner.reruns > self.shared.config.max_reruns {
            debug!(
                reruns = inner.reruns - 1,
                "Opponent hand changed, but the simulation already re-ran"
            );
            return None;
        }
        if inner.state == InvocationState::CombatWithoutSimulation {
            return None;
        }
        debug!(rerun = inner.reruns, "Opponent hand changed, re-running simulation");
        inner.error = ErrorState::None;
        inner.generation += 1;
        let generation = inner.generation;
        drop(inner);
        self.notify(|sink| sink.error(&self.key, ErrorState::None));
        Some(self.spawn_run(snapshot, generation, None))
    }

    /// Leaves combat, validating the prediction against `observed`.
    ///
    /// A deferred run starts now and validates once it completes.
    pub fn start_shopping(self: &Arc<Self>, observed: ObservedCombat) -> ShoppingOutcome {
        let mut inner = self.lock();
        let previous = inner.state;
        if previous == InvocationState::Shopping {
            debug!("Already in shopping state. Exiting");
            return ShoppingOutcome::AlreadyShopping;
        }
        info!(key = %self.key, "State is now shopping");
        inner.state = InvocationState::Shopping;

        if previous == InvocationState::CombatWithoutSimulation {
            if let Some(snapshot) = inner.snapshot.clone() {
                inner.generation += 1;
                let generation = inner.generation;
                drop(inner);
                self.notify(|sink| sink.state_changed(&self.key, InvocationState::Shopping));
                return ShoppingOutcome::Deferred(self.spawn_run(snapshot, generation, Some(observed)));
            }
        }
        drop(inner);
        self.notify(|sink| sink.state_changed(&self.key, InvocationState::Shopping));
        ShoppingOutcome::Validated(self.validate(&observed))
    }

    /// Validates the committed prediction and reports mismatches.
    #[must_use]
    pub fn validate(&self, observed: &ObservedCombat) -> Validation {
        let (snapshot, output) = {
            let inner = self.lock();
            (inner.snapshot.clone(), inner.output.clone())
        };
        let Some(snapshot) = snapshot else {
            debug!("No snapshot to validate. Exiting");
            return Validation::Skipped {
                reason: SkipReason::NoOutput,
            };
        };
        let validation = Validator::new(&self.shared.config, &self.shared.table).validate(
            &snapshot,
            output.as_ref(),
            observed,
        );
        if let (Validation::Checked(report), Some(output)) = (&validation, &output) {
            self.report(&snapshot, output, report);
        }
        validation
    }

    pub(crate) fn retire(&self) {
        self.displayed.store(false, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, f: impl FnOnce(&dyn ResultSink)) {
        if self.is_displayed() {
            f(self.shared.results.as_ref());
        }
    }

    fn spawn_run(
        self: &Arc<Self>,
        snapshot: Arc<BoardSnapshot>,
        generation: u64,
        observed: Option<ObservedCombat>,
    ) -> SimulationHandle {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let invocation = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("brawl-run-{}", self.key))
            .spawn(move || {
                if let Some(report) = invocation.run(&snapshot, generation, observed) {
                    if sender.send(report).is_err() {
                        trace!("Report receiver dropped");
                    }
                }
            });
        if let Err(err) = spawned {
            error!(error = %err, "Failed to start simulation thread");
            self.lock().error = ErrorState::FailedToLoad;
            self.notify(|sink| sink.error(&self.key, ErrorState::FailedToLoad));
        }
        SimulationHandle { receiver }
    }

    fn run(
        &self,
        snapshot: &BoardSnapshot,
        generation: u64,
        observed: Option<ObservedCombat>,
    ) -> Option<SimulationReport> {
        debug!(key = %self.key, "Running simulation...");
        self.notify(|sink| sink.running(&self.key));
        let config = &self.shared.config;
        let params = RunParameters::from_config(config, snapshot);
        let result = SimulationRunner::from_config(config).run(snapshot, &params);
        let error = ErrorState::from(result.exit_condition);

        {
            let mut inner = self.lock();
            if inner.generation != generation || !self.is_displayed() {
                debug!(key = %self.key, "Discarding result of a superseded run");
                return None;
            }
            inner.error = error;
            inner.output = (!matches!(
                result.exit_condition,
                ExitCondition::UnsupportedInteraction | ExitCondition::InternalError
            ))
            .then(|| result.clone());
        }

        debug!(
            elapsed_ms = result.elapsed_ms,
            exit = result.exit_condition.label(),
            iterations = result.total(),
            win_rate = result.win_rate(),
            tie_rate = result.tie_rate(),
            loss_rate = result.loss_rate(),
            my_death_rate = result.my_death_rate(),
            their_death_rate = result.their_death_rate(),
            "Simulation output"
        );
        if error.is_none() {
            self.notify(|sink| sink.result(&self.key, &result));
        } else {
            debug!(error = ?error, "Displaying error state");
            self.notify(|sink| sink.error(&self.key, error));
        }

        let validation = observed.map(|observed| self.validate(&observed));
        Some(SimulationReport {
            key: self.key.clone(),
            result,
            error,
            validation,
        })
    }

    fn report(&self, snapshot: &BoardSnapshot, output: &AggregatedResult, report: &ValidationReport) {
        let config = &self.shared.config;
        let mut rng = rand::thread_rng();
        if config.diagnostics_enabled {
            if report.combat_mismatch && sampled(&mut rng, config.diagnostics_sampling) {
                self.send_diagnostics(snapshot, output, report.result.label());
            }
            if report.lethal_mismatch && sampled(&mut rng, config.diagnostics_sampling) {
                self.send_diagnostics(snapshot, output, report.lethal.label());
            }
        }

        if sampled(&mut rng, config.metric_sampling) {
            info!(
                target: "brawl::metrics",
                turn = snapshot.turn(),
                result = report.result.label(),
                terminal_case = report.is_mismatch(),
                exit_condition = output.exit_condition.label(),
                thread_count = output.worker_count,
                iterations = output.total(),
                win_rate = output.win_rate() * 100.0,
                tie_rate = output.tie_rate() * 100.0,
                loss_rate = output.loss_rate() * 100.0,
                "Simulation complete"
            );
        }
    }

    fn send_diagnostics(&self, snapshot: &BoardSnapshot, output: &AggregatedResult, result: &str) {
        debug!(result, "Queueing diagnostics record");
        let serialize = |value: Result<String, serde_json::Error>| {
            value.unwrap_or_else(|err| format!("<unserializable: {err}>"))
        };
        self.shared.diagnostics.report(DiagnosticsRecord {
            turn: snapshot.turn(),
            result: result.to_string(),
            thread_count: output.worker_count,
            iterations: output.total(),
            exit_condition: output.exit_condition,
            output: serialize(serde_json::to_string(output)),
            input: serialize(serde_json::to_string(snapshot)),
            log: self.shared.recent_log.excerpt(),
        });
    }
}

/// Draws against `rate`; 0 never passes and 1 always does.
fn sampled(rng: &mut impl Rng, rate: f64) -> bool {
    rate >= 1.0 || (rate > 0.0 && rng.gen::<f64>() < rate)
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Invocation")
            .field("key", &self.key)
            .field("state", &inner.state)
            .field("error", &inner.error)
            .field("generation", &inner.generation)
            .field("displayed", &self.is_displayed())
            .finish_non_exhaustive()
    }
}
