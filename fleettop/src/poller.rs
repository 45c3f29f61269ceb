//! The fetch-and-render cycle: turns one fetch outcome into dashboard state.

use crate::card::{render_db_node, render_server, Card};
use crate::source::{FetchError, MetricsSource};
use crate::types::FleetSnapshot;

pub const STATUS_FETCHING: &str = "Fetching…";
pub const STATUS_REQUEST_FAILED: &str = "Request failed";
pub const NO_DB_NODES: &str = "No DB nodes discovered from app config.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

/// What the database section currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DbArea {
    #[default]
    Cleared,
    Cards(Vec<Card>),
    Placeholder(String),
}

/// Everything the presentation layer draws, rebuilt from each poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// True until the first poll resolves either way.
    pub loading: bool,
    pub servers: Vec<Card>,
    pub db_area: DbArea,
    pub status: Status,
    pub last_updated: Option<String>,
    /// Environment the last successful payload was collected for.
    pub snapshot_environment: Option<String>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            loading: true,
            servers: Vec::new(),
            db_area: DbArea::Cleared,
            status: Status::default(),
            last_updated: None,
            snapshot_environment: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Poller {
    dashboard: Dashboard,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.dashboard.status = Status {
            text: text.into(),
            is_error,
        };
    }

    /// One full cycle against `source`. Returns the payload, or `None` when
    /// the request failed.
    pub async fn poll<S: MetricsSource>(
        &mut self,
        source: &S,
        scope: Option<String>,
    ) -> Option<FleetSnapshot> {
        self.begin();
        let result = source.fetch_metrics(scope).await;
        self.finish(result)
    }

    /// Marks a request as in flight.
    pub fn begin(&mut self) {
        self.set_status(STATUS_FETCHING, false);
    }

    /// Applies a fetch outcome. A failed request replaces the server list with
    /// one error card and leaves the DB section as it was; no retry is
    /// scheduled from here.
    pub fn finish(&mut self, result: Result<FleetSnapshot, FetchError>) -> Option<FleetSnapshot> {
        self.dashboard.loading = false;
        match result {
            Err(e) => {
                tracing::warn!(error = %e, "metrics request failed");
                self.dashboard.servers = vec![Card::error_only(&format!("Request failed: {e}"))];
                self.set_status(STATUS_REQUEST_FAILED, true);
                None
            }
            Ok(snapshot) => {
                self.apply(&snapshot);
                self.dashboard.last_updated = Some(local_time_now());
                self.set_status("", false);
                Some(snapshot)
            }
        }
    }

    fn apply(&mut self, snapshot: &FleetSnapshot) {
        if let Some(err) = snapshot.payload_error() {
            tracing::warn!(error = err, "collector reported an error");
            self.dashboard.servers = vec![Card::error_only(err)];
            self.dashboard.db_area = DbArea::Cleared;
            return;
        }

        self.dashboard.servers = snapshot.servers.iter().map(render_server).collect();
        self.dashboard.db_area = if snapshot.db_nodes.is_empty() {
            DbArea::Placeholder(NO_DB_NODES.into())
        } else {
            DbArea::Cards(snapshot.db_nodes.iter().map(render_db_node).collect())
        };
        self.dashboard.snapshot_environment = snapshot.environment.clone();
        tracing::info!(
            servers = snapshot.servers.len(),
            db_nodes = snapshot.db_nodes.len(),
            environment = snapshot.environment.as_deref().unwrap_or("default"),
            "metrics rendered"
        );
    }
}

fn local_time_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
