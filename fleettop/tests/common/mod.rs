//! Shared fixtures for the integration tests: a scripted `MetricsSource` and
//! payload builders.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fleettop::source::{FetchError, MetricsSource};
use fleettop::types::{EnvironmentConfig, FleetSnapshot};
use serde_json::{json, Value};
use tokio::sync::Notify;

/// Replays queued responses in order. An empty queue answers with a default
/// config / empty fleet. With a gate set, every metrics request waits for one
/// `notify_one()` before resolving.
#[derive(Default)]
pub struct ScriptedSource {
    configs: Mutex<VecDeque<Result<EnvironmentConfig, FetchError>>>,
    metrics: Mutex<VecDeque<Result<FleetSnapshot, FetchError>>>,
    config_calls: AtomicUsize,
    metrics_calls: AtomicUsize,
    metrics_scopes: Mutex<Vec<Option<String>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_config(&self, r: Result<EnvironmentConfig, FetchError>) -> &Self {
        self.configs.lock().unwrap().push_back(r);
        self
    }

    pub fn push_metrics(&self, r: Result<FleetSnapshot, FetchError>) -> &Self {
        self.metrics.lock().unwrap().push_back(r);
        self
    }

    pub fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }

    pub fn metrics_calls(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }

    pub fn metrics_scopes(&self) -> Vec<Option<String>> {
        self.metrics_scopes.lock().unwrap().clone()
    }
}

impl MetricsSource for ScriptedSource {
    fn fetch_config(
        &self,
        _scope: Option<String>,
    ) -> impl Future<Output = Result<EnvironmentConfig, FetchError>> + Send {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        let r = self
            .configs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(EnvironmentConfig::default()));
        async move { r }
    }

    fn fetch_metrics(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<FleetSnapshot, FetchError>> + Send {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        self.metrics_scopes.lock().unwrap().push(scope);
        let r = self
            .metrics
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FleetSnapshot::default()));
        let gate = self.gate.clone();
        async move {
            if let Some(g) = gate {
                g.notified().await;
            }
            r
        }
    }
}

pub fn snapshot(v: Value) -> FleetSnapshot {
    serde_json::from_value(v).expect("snapshot json")
}

pub fn config(env: Option<&str>, envs: &[&str], interval: Option<f64>) -> EnvironmentConfig {
    EnvironmentConfig {
        refresh_interval_seconds: interval,
        environment: env.map(String::from),
        environments: envs.iter().map(|e| e.to_string()).collect(),
    }
}

/// A healthy app server with every field populated.
pub fn full_server(host: &str) -> Value {
    json!({
        "host": host,
        "load_avg_1_5_15": [0.52, 0.61, 0.7],
        "memory": {
            "utilization_percent": 62.5,
            "swap_total_mb": 4096,
            "swap_utilization_percent": 3.2
        },
        "cpu_percent": 41.0,
        "incoming_connections": 57,
        "db_connection_count": 12,
        "db_host": "db1.internal",
        "db_port": 5432,
        "connections_by_pid": {"4242": {"incoming": 57, "db": 12, "pid": 4242}},
        "processes": [{"pid": 4242, "comm": "java", "cpu_percent": 35.5, "rss_kb": 3145728}],
        "heap_max_mb": 4096,
        "jvm_by_pid": {"4242": {"heap_used_mb": 2048, "non_heap_mb": 512}},
        "app_type": "jira",
        "app_version": "9.12.1"
    })
}

pub fn db_node(host: &str) -> Value {
    json!({
        "host": host,
        "port": 5432,
        "db_type": "PostgreSQL",
        "load_avg_1_5_15": [1.0, 0.9, 0.8],
        "memory": {"utilization_percent": 70.0, "swap_total_mb": 0},
        "cpu_percent": 22.0,
        "incoming_connections": 33
    })
}
