//! Monitoring state machine and environment switching, driven through a
//! `Session` against a scripted source.
mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{config, db_node, full_server, snapshot, ScriptedSource};
use fleettop::environment::EnvironmentContext;
use fleettop::monitor::MonitorState;
use fleettop::poller::{DbArea, STATUS_REQUEST_FAILED};
use fleettop::session::Session;
use fleettop::source::FetchError;
use serde_json::json;
use tokio::sync::Notify;

fn session(src: &Arc<ScriptedSource>) -> Session<ScriptedSource> {
    Session::new(Arc::clone(src), EnvironmentContext::new(None))
}

/// Initial load: config, then the metrics poll it chains into.
async fn initial_load(s: &mut Session<ScriptedSource>) {
    assert!(s.load_config_and_metrics());
    assert!(s.settle().await);
    assert!(s.settle().await);
}

fn healthy_fleet() -> serde_json::Value {
    json!({"servers": [full_server("app1")], "db_nodes": [db_node("db1")]})
}

#[tokio::test]
async fn config_then_metrics() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Ok(config(Some("prod"), &["prod", "stage"], Some(30.0))));
    src.push_metrics(Ok(snapshot(healthy_fleet())));
    let mut s = session(&src);

    initial_load(&mut s).await;
    assert_eq!(src.config_calls(), 1);
    assert_eq!(src.metrics_calls(), 1);
    assert_eq!(src.metrics_scopes(), [Some("prod".to_string())]);
    assert_eq!(s.environment().badge(), Some("prod"));
    assert_eq!(s.environment().available(), ["prod", "stage"]);
    assert_eq!(s.interval_input(), "30");
    assert!(!s.dashboard().loading);
    assert!(s.last_snapshot().is_some());
    assert!(!s.is_busy());
}

#[tokio::test]
async fn interval_override_beats_advertised_interval() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Ok(config(None, &[], Some(30.0))));
    let mut s = session(&src).with_interval_override(Some(15));
    assert_eq!(s.interval_input(), "15");
    initial_load(&mut s).await;
    assert_eq!(s.interval_input(), "15");
}

#[tokio::test]
async fn payload_error_clears_db_and_keeps_status_clear() {
    let src = Arc::new(ScriptedSource::new());
    src.push_metrics(Ok(snapshot(healthy_fleet())));
    src.push_metrics(Ok(snapshot(json!({"error": "db unreachable"}))));
    let mut s = session(&src);
    initial_load(&mut s).await;
    assert!(matches!(s.dashboard().db_area, DbArea::Cards(_)));

    assert!(s.refresh());
    s.settle().await;
    let d = s.dashboard();
    assert_eq!(d.servers.len(), 1);
    assert_eq!(d.servers[0].error.as_deref(), Some("db unreachable"));
    assert_eq!(d.db_area, DbArea::Cleared);
    assert_eq!(d.status.text, "");
    assert!(d.last_updated.is_some());
}

#[tokio::test]
async fn unparseable_interval_falls_back_to_default() {
    let src = Arc::new(ScriptedSource::new());
    let mut s = session(&src);
    *s.interval_input_mut() = "abc".into();
    assert_eq!(s.start_monitoring(Instant::now()), Some(60));
    assert_eq!(s.interval_input(), "60");
    assert_eq!(s.monitor().interval(), Some(Duration::from_secs(60)));
    s.stop_monitoring();

    *s.interval_input_mut() = "5".into();
    s.settle().await;
    assert_eq!(s.start_monitoring(Instant::now()), Some(10));
    assert_eq!(s.interval_input(), "10");
}

#[tokio::test]
async fn stop_before_first_poll_resolves_schedules_nothing() {
    let src = Arc::new(ScriptedSource::new());
    let mut s = session(&src);

    let t0 = Instant::now();
    s.start_monitoring(t0);
    assert!(s.is_busy(), "start fires the first poll immediately");
    assert!(s.stop_monitoring());

    s.settle().await;
    assert_eq!(s.monitor().state(), MonitorState::Idle);
    assert!(s.monitor().next_tick().is_none());
    s.pump(Instant::now() + Duration::from_secs(3600));
    assert!(!s.is_busy());
    assert_eq!(s.polls_started(), 1);
    assert_eq!(src.metrics_calls(), 1);
}

#[tokio::test]
async fn cadence_runs_from_poll_completion() {
    let src = Arc::new(ScriptedSource::new());
    let mut s = session(&src);
    *s.interval_input_mut() = "20".into();

    s.start_monitoring(Instant::now());
    s.settle().await;
    let next = s.monitor().next_tick().expect("re-armed after completion");

    s.pump(next - Duration::from_millis(1));
    assert_eq!(s.polls_started(), 1);
    s.pump(next);
    assert_eq!(s.polls_started(), 2);
    assert!(s.is_busy());
    s.settle().await;
    assert!(s.monitor().next_tick().is_some());
}

#[tokio::test]
async fn transport_failure_keeps_db_area_and_polling() {
    let src = Arc::new(ScriptedSource::new());
    src.push_metrics(Ok(snapshot(healthy_fleet())));
    src.push_metrics(Err(FetchError::Transport("connection refused".into())));
    let mut s = session(&src);
    initial_load(&mut s).await;

    s.start_monitoring(Instant::now());
    s.settle().await;
    let d = s.dashboard();
    assert_eq!(d.servers.len(), 1);
    assert_eq!(
        d.servers[0].error.as_deref(),
        Some("Request failed: connection refused")
    );
    assert!(matches!(d.db_area, DbArea::Cards(ref c) if c.len() == 1));
    assert_eq!(d.status.text, STATUS_REQUEST_FAILED);
    assert!(d.status.is_error);
    assert!(s.monitor().is_polling());
    assert!(s.monitor().next_tick().is_some());
}

#[tokio::test]
async fn manual_refresh_only_when_idle_and_not_busy() {
    let src = Arc::new(ScriptedSource::new());
    let mut s = session(&src);
    initial_load(&mut s).await;

    assert!(s.refresh());
    assert!(!s.refresh(), "a request is already in flight");
    s.settle().await;
    assert_eq!(src.metrics_calls(), 2);

    s.start_monitoring(Instant::now());
    s.settle().await;
    assert!(!s.refresh());
    assert_eq!(src.metrics_calls(), 3);
}

#[tokio::test]
async fn start_is_noop_while_polling_and_stop_is_idempotent() {
    let src = Arc::new(ScriptedSource::new());
    let mut s = session(&src);
    *s.interval_input_mut() = "30".into();
    assert_eq!(s.start_monitoring(Instant::now()), Some(30));
    s.settle().await;

    *s.interval_input_mut() = "90".into();
    assert_eq!(s.start_monitoring(Instant::now()), None);
    assert_eq!(s.monitor().interval(), Some(Duration::from_secs(30)));
    assert_eq!(s.polls_started(), 1);

    assert!(s.stop_monitoring());
    assert!(!s.stop_monitoring());
    assert!(s.monitor().allows_manual_refresh());
}

#[tokio::test]
async fn environment_change_while_polling_waits_for_next_tick() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Ok(config(Some("a"), &["a", "b"], None)));
    let mut s = session(&src);
    initial_load(&mut s).await;
    s.start_monitoring(Instant::now());
    s.settle().await;
    assert_eq!(s.polls_started(), 2);

    s.select_environment(Some("b".into()));
    assert_eq!(s.environment().badge(), Some("b"));
    assert!(!s.is_busy());
    assert_eq!(src.config_calls(), 1);
    assert_eq!(s.polls_started(), 2);

    let next = s.monitor().next_tick().unwrap();
    s.pump(next);
    s.settle().await;
    assert_eq!(src.metrics_scopes().last(), Some(&Some("b".to_string())));
    assert_eq!(src.config_calls(), 1);
}

#[tokio::test]
async fn environment_change_while_idle_reloads_then_polls() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Ok(config(Some("a"), &["a", "b"], None)));
    src.push_config(Ok(config(Some("b"), &["b", "c"], Some(45.0))));
    let mut s = session(&src);
    initial_load(&mut s).await;

    s.cycle_environment(1);
    assert!(s.is_busy());
    s.settle().await;
    assert_eq!(src.config_calls(), 2);
    s.settle().await;
    assert_eq!(src.metrics_scopes().last(), Some(&Some("b".to_string())));
    assert_eq!(s.environment().badge(), Some("b"));
    // list populated once, never rebuilt
    assert_eq!(s.environment().available(), ["a", "b"]);
    assert_eq!(s.interval_input(), "45");
}

#[tokio::test]
async fn failed_config_load_issues_no_poll() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Err(FetchError::Transport("refused".into())));
    let mut s = session(&src);

    assert!(s.load_config_and_metrics());
    s.settle().await;
    assert!(!s.is_busy());
    assert_eq!(src.metrics_calls(), 0);
    assert_eq!(s.polls_started(), 0);
    assert!(s.dashboard().loading);
}

#[tokio::test]
async fn pump_never_blocks_on_a_slow_request() {
    let gate = Arc::new(Notify::new());
    let src = Arc::new(ScriptedSource::gated(Arc::clone(&gate)));
    let mut s = session(&src);

    assert!(s.load_config_and_metrics());
    s.settle().await;
    assert!(s.is_busy());
    for _ in 0..5 {
        tokio::task::yield_now().await;
        s.pump(Instant::now());
        assert!(s.is_busy());
    }
    assert!(!s.load_config_and_metrics());

    gate.notify_one();
    s.settle().await;
    assert!(!s.is_busy());
    assert!(!s.dashboard().loading);
}

#[tokio::test]
async fn environment_change_during_in_flight_refresh_reloads_afterwards() {
    let gate = Arc::new(Notify::new());
    let src = Arc::new(ScriptedSource::gated(Arc::clone(&gate)));
    src.push_config(Ok(config(Some("a"), &["a", "b"], None)));
    src.push_config(Ok(config(Some("b"), &["a", "b"], None)));
    let mut s = session(&src);

    assert!(s.load_config_and_metrics());
    s.settle().await;
    gate.notify_one();
    s.settle().await;
    assert!(!s.is_busy());

    assert!(s.refresh());
    s.select_environment(Some("b".into()));
    assert!(s.reload_pending());
    assert_eq!(s.environment().scope(), Some("b"));
    assert_eq!(src.config_calls(), 1, "nothing starts while the refresh runs");

    // refresh for "a" lands, then the deferred reload for "b" begins
    gate.notify_one();
    s.settle().await;
    assert!(!s.reload_pending());
    assert!(s.is_busy());

    s.settle().await;
    assert_eq!(src.config_calls(), 2);
    gate.notify_one();
    s.settle().await;
    assert!(!s.is_busy());
    assert_eq!(
        src.metrics_scopes(),
        [Some("a".to_string()), Some("a".to_string()), Some("b".to_string())]
    );
    assert_eq!(s.environment().badge(), Some("b"));
}

#[tokio::test]
async fn environment_pick_during_first_config_load_wins() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Ok(config(Some("a"), &["a", "b"], None)));
    src.push_config(Ok(config(Some("b"), &["a", "b"], None)));
    let mut s = session(&src);

    assert!(s.load_config_and_metrics());
    s.select_environment(Some("b".into()));
    assert!(s.reload_pending());

    // first config populates the list but must not poll the stale scope
    s.settle().await;
    assert_eq!(s.environment().scope(), Some("b"));
    assert_eq!(s.environment().available(), ["a", "b"]);
    assert_eq!(s.polls_started(), 0);
    assert!(s.is_busy());

    s.settle().await;
    assert_eq!(src.config_calls(), 2);
    s.settle().await;
    assert_eq!(src.metrics_scopes(), [Some("b".to_string())]);
    assert!(!s.is_busy());
}

#[tokio::test]
async fn start_during_config_load_counts_chained_poll_as_first() {
    let src = Arc::new(ScriptedSource::new());
    src.push_config(Ok(config(Some("a"), &["a"], None)));
    let mut s = session(&src);

    assert!(s.load_config_and_metrics());
    let t0 = Instant::now();
    assert_eq!(s.start_monitoring(t0), Some(60));
    assert_eq!(s.polls_started(), 0, "no poll overlaps the config load");

    s.settle().await;
    assert_eq!(s.polls_started(), 1);
    s.settle().await;

    let next = s.monitor().next_tick().expect("armed from completion");
    assert!(next >= t0 + Duration::from_secs(60));
    s.pump(Instant::now());
    assert_eq!(s.polls_started(), 1);
    assert!(!s.is_busy());
    assert_eq!(src.metrics_calls(), 1);
}
