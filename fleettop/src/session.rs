//! Dashboard session: owns the monitor, environment, poller and the single
//! in-flight request, and drives them from one event loop.
//!
//! Requests run as spawned tasks on the (current-thread) runtime; the session
//! itself is only touched from the loop, which calls [`Session::pump`] to
//! apply finished requests and fire due ticks. At most one request is in
//! flight at any time, so manual refreshes and scheduled polls never overlap.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};

use crate::environment::EnvironmentContext;
use crate::monitor::Monitor;
use crate::poller::{Dashboard, Poller};
use crate::source::{FetchError, MetricsSource};
use crate::types::{EnvironmentConfig, FleetSnapshot, DEFAULT_REFRESH_SECS};

enum Pending {
    Config(JoinHandle<Result<EnvironmentConfig, FetchError>>),
    Metrics(JoinHandle<Result<FleetSnapshot, FetchError>>),
}

enum Outcome {
    Config(Result<EnvironmentConfig, FetchError>),
    Metrics(Result<FleetSnapshot, FetchError>),
}

impl Pending {
    async fn join(self) -> Outcome {
        match self {
            Pending::Config(h) => Outcome::Config(flatten(h.await)),
            Pending::Metrics(h) => Outcome::Metrics(flatten(h.await)),
        }
    }

    fn try_join(&mut self) -> Option<Outcome> {
        match self {
            Pending::Config(h) => FutureExt::now_or_never(h).map(|r| Outcome::Config(flatten(r))),
            Pending::Metrics(h) => FutureExt::now_or_never(h).map(|r| Outcome::Metrics(flatten(r))),
        }
    }
}

fn flatten<T>(r: Result<Result<T, FetchError>, JoinError>) -> Result<T, FetchError> {
    r.map_err(FetchError::from)?
}

pub struct Session<S> {
    source: Arc<S>,
    monitor: Monitor,
    environment: EnvironmentContext,
    poller: Poller,
    interval_input: String,
    interval_override: Option<u64>,
    pending: Option<Pending>,
    // scope changed while a request was in flight
    reload_pending: bool,
    last_snapshot: Option<FleetSnapshot>,
    polls_started: u64,
}

impl<S: MetricsSource> Session<S> {
    pub fn new(source: Arc<S>, environment: EnvironmentContext) -> Self {
        Self {
            source,
            monitor: Monitor::new(),
            environment,
            poller: Poller::new(),
            interval_input: DEFAULT_REFRESH_SECS.to_string(),
            interval_override: None,
            pending: None,
            reload_pending: false,
            last_snapshot: None,
            polls_started: 0,
        }
    }

    /// Pins the interval field, ignoring the interval advertised by config.
    pub fn with_interval_override(mut self, secs: Option<u64>) -> Self {
        self.interval_override = secs;
        if let Some(s) = secs {
            self.interval_input = s.to_string();
        }
        self
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn environment(&self) -> &EnvironmentContext {
        &self.environment
    }

    pub fn dashboard(&self) -> &Dashboard {
        self.poller.dashboard()
    }

    pub fn interval_input(&self) -> &str {
        &self.interval_input
    }

    pub fn interval_input_mut(&mut self) -> &mut String {
        &mut self.interval_input
    }

    pub fn last_snapshot(&self) -> Option<&FleetSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn polls_started(&self) -> u64 {
        self.polls_started
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Fetches config for the current scope, then polls once.
    pub fn load_config_and_metrics(&mut self) -> bool {
        if self.pending.is_some() {
            tracing::debug!("config load skipped: request in flight");
            return false;
        }
        let scope = self.environment.scope().map(str::to_owned);
        tracing::debug!(scope = scope.as_deref().unwrap_or("default"), "loading config");
        let source = Arc::clone(&self.source);
        self.pending = Some(Pending::Config(tokio::spawn(async move {
            source.fetch_config(scope).await
        })));
        true
    }

    /// Manual refresh; ignored while polling or while a request is in flight.
    pub fn refresh(&mut self) -> bool {
        if !self.monitor.allows_manual_refresh() || self.pending.is_some() {
            return false;
        }
        self.begin_poll();
        true
    }

    pub fn start_monitoring(&mut self, now: Instant) -> Option<u64> {
        let secs = self.monitor.start(&self.interval_input, now)?;
        self.interval_input = secs.to_string();
        self.poller.set_status(format!("Monitoring every {secs}s"), false);
        self.pump(now);
        Some(secs)
    }

    pub fn stop_monitoring(&mut self) -> bool {
        let was_polling = self.monitor.stop();
        self.poller.set_status("", false);
        was_polling
    }

    pub fn toggle_monitoring(&mut self, now: Instant) {
        if self.monitor.is_polling() {
            self.stop_monitoring();
        } else {
            self.start_monitoring(now);
        }
    }

    /// Changes the scope. While polling only the badge changes right away; the
    /// next scheduled poll picks the new scope up. When idle but busy, the
    /// reload runs as soon as the in-flight request has been applied.
    pub fn select_environment(&mut self, name: Option<String>) {
        self.environment.select(name);
        tracing::info!(
            environment = self.environment.scope().unwrap_or("default"),
            polling = self.monitor.is_polling(),
            "environment selected"
        );
        if self.monitor.is_polling() {
            return;
        }
        if !self.load_config_and_metrics() {
            self.reload_pending = true;
        }
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_pending
    }

    pub fn cycle_environment(&mut self, step: isize) {
        if let Some(name) = self.environment.next(step) {
            self.select_environment(Some(name));
        }
    }

    /// Non-blocking: applies a finished request, then fires a due tick.
    /// Returns true when dashboard state may have changed.
    pub fn pump(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(outcome) = self.pending.as_mut().and_then(Pending::try_join) {
            self.pending = None;
            self.complete(outcome, now);
            changed = true;
        }
        if self.pending.is_none() && self.monitor.take_due(now) {
            self.begin_poll();
            changed = true;
        }
        changed
    }

    /// Waits for the in-flight request (if any) and applies it. Does not fire
    /// scheduled ticks.
    pub async fn settle(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let outcome = pending.join().await;
        self.complete(outcome, Instant::now());
        true
    }

    fn begin_poll(&mut self) {
        self.poller.begin();
        self.polls_started += 1;
        let scope = self.environment.scope().map(str::to_owned);
        tracing::debug!(scope = scope.as_deref().unwrap_or("default"), poll = self.polls_started, "polling metrics");
        let source = Arc::clone(&self.source);
        self.pending = Some(Pending::Metrics(tokio::spawn(async move {
            source.fetch_metrics(scope).await
        })));
    }

    fn complete(&mut self, outcome: Outcome, now: Instant) {
        match outcome {
            Outcome::Config(Ok(cfg)) => {
                // a newer pick must survive the first list population
                let picked = self
                    .reload_pending
                    .then(|| self.environment.scope().map(str::to_owned))
                    .flatten();
                let advertised = self.environment.apply_config(&cfg);
                self.interval_input = self.interval_override.unwrap_or(advertised).to_string();
                if let Some(name) = picked {
                    self.environment.select(Some(name));
                }
                if !self.reload_pending {
                    self.begin_poll();
                }
            }
            Outcome::Config(Err(e)) => {
                tracing::warn!(error = %e, "config load failed");
            }
            Outcome::Metrics(result) => {
                if let Some(snapshot) = self.poller.finish(result) {
                    self.last_snapshot = Some(snapshot);
                }
                self.monitor.on_poll_complete(now);
            }
        }

        if self.reload_pending && self.pending.is_none() {
            self.reload_pending = false;
            if self.monitor.is_polling() {
                tracing::debug!("deferred reload dropped: the next tick uses the new scope");
            } else {
                tracing::debug!(scope = self.environment.scope().unwrap_or("default"), "running deferred reload");
                self.load_config_and_metrics();
            }
        }
    }
}
