//! In-process fleet used by `--demo`: two environments, a failing node, a
//! Confluence node and an environment whose DB nodes were not discovered.

use std::future::{ready, Future};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::source::{FetchError, MetricsSource};
use crate::types::{EnvironmentConfig, FleetSnapshot};

pub const DEMO_ENVIRONMENTS: [&str; 2] = ["jira-prod", "confluence-stage"];

#[derive(Debug, Default)]
pub struct DemoSource;

impl DemoSource {
    pub fn new() -> Self {
        Self
    }

    fn resolve(scope: Option<&str>) -> &'static str {
        scope
            .and_then(|s| DEMO_ENVIRONMENTS.iter().copied().find(|e| *e == s))
            .unwrap_or(DEMO_ENVIRONMENTS[0])
    }
}

impl MetricsSource for DemoSource {
    fn fetch_config(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<EnvironmentConfig, FetchError>> + Send {
        let env = Self::resolve(scope.as_deref());
        ready(Ok(EnvironmentConfig {
            refresh_interval_seconds: Some(30.0),
            environment: Some(env.to_string()),
            environments: DEMO_ENVIRONMENTS.iter().map(|e| e.to_string()).collect(),
        }))
    }

    fn fetch_metrics(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<FleetSnapshot, FetchError>> + Send {
        let env = Self::resolve(scope.as_deref());
        let payload = match env {
            "confluence-stage" => confluence_stage(wobble()),
            _ => jira_prod(wobble()),
        };
        ready(serde_json::from_value(payload).map_err(|e| FetchError::Decode(e.to_string())))
    }
}

// 0.0..1.0, changes every few seconds so polls visibly move
fn wobble() -> f64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    ((secs / 3) % 17) as f64 / 17.0
}

fn jira_prod(w: f64) -> Value {
    json!({
        "environment": "jira-prod",
        "refresh_interval_seconds": 30,
        "servers": [
            {
                "host": "jira-app-01.example.net",
                "app_type": "jira",
                "app_version": "9.12.4",
                "db_host": "jira-db-01.example.net",
                "db_port": 5432,
                "heap_max_mb": 8192,
                "incoming_connections": 41 + (w * 20.0) as u64,
                "db_connection_count": 18,
                "connections_by_pid": {
                    "4242": { "incoming": 41, "db": 18, "pid": 4242 }
                },
                "load_avg_1_5_15": [1.2 + w, 1.05, 0.98],
                "memory": {
                    "total_mb": 32000, "used_mb": 24100, "available_mb": 7900,
                    "utilization_percent": 75.3 + w * 15.0,
                    "swap_total_mb": 4096, "swap_used_mb": 120, "swap_free_mb": 3976,
                    "swap_utilization_percent": 2.9
                },
                "cpu_percent": 37.5 + w * 50.0,
                "processes": [
                    { "pid": 4242, "comm": "java", "cpu_percent": 31.2 + w * 40.0, "rss_kb": 9437184 }
                ],
                "jvm_by_pid": {
                    "4242": { "heap_used_mb": 4096.0 + w * 3000.0, "heap_capacity_mb": 8192.0, "non_heap_mb": 612.4 }
                }
            },
            {
                "host": "jira-app-02.example.net",
                "app_type": "jira",
                "jira_version": "9.12.4",
                "db_host": "jira-db-01.example.net",
                "db_port": "5432",
                "heap_max_mb": 8192,
                "incoming_connections": 12,
                "connections_by_pid": {},
                "load_avg_1_5_15": [0.4, 0.5, 0.61],
                "memory": {
                    "utilization_percent": 58.0,
                    "swap_total_mb": 0,
                    "swap_utilization_percent": 0.0
                },
                "cpu_percent": 9.0,
                "processes": [
                    { "pid": 311, "comm": "bash", "cpu_percent": 0.0, "rss_kb": 3120 },
                    { "pid": 5150, "comm": "java", "cpu_percent": 7.5, "rss_kb": 8126464 }
                ],
                "jvm_by_pid": {
                    "5150": { "heap_used_mb": 2200.0, "non_heap_mb": 580.0 }
                }
            },
            {
                "host": "jira-app-03.example.net",
                "error": "ssh: connect to host jira-app-03.example.net port 22: Connection timed out",
                "incoming_connections": 0,
                "db_connection_count": 0,
                "connections_by_pid": {},
                "load_avg_1_5_15": [0, 0, 0],
                "memory": {},
                "cpu_percent": 0.0,
                "processes": []
            }
        ],
        "db_nodes": [
            {
                "host": "jira-db-01.example.net",
                "port": 5432,
                "db_type": "PostgreSQL 14.11",
                "load_avg_1_5_15": [2.1, 1.9, 1.7],
                "memory": {
                    "utilization_percent": 88.2 + w * 5.0,
                    "swap_total_mb": 8192,
                    "swap_utilization_percent": 81.5
                },
                "cpu_percent": 64.0 + w * 30.0,
                "incoming_connections": 38
            }
        ]
    })
}

fn confluence_stage(w: f64) -> Value {
    json!({
        "environment": "confluence-stage",
        "refresh_interval_seconds": 30,
        "servers": [
            {
                "host": "conf-stage-01.example.net",
                "app_type": "Confluence",
                "app_version": "8.5.9",
                "heap_max_mb": 4096,
                "incoming_connections": 3,
                "db_connection_count": 4,
                "connections_by_pid": { "2710": 7 },
                "load_avg_1_5_15": [0.2 + w, 0.15, 0.1],
                "memory": {
                    "utilization_percent": 41.7,
                    "swap_total_mb": 2048
                },
                "cpu_percent": 4.0 + w * 10.0,
                "processes": [
                    { "pid": 2710, "comm": "java", "cpu_percent": 3.1, "rss_kb": 3355443 }
                ],
                "jvm_by_pid": {
                    "2710": { "heap_used_mb": 1500.0 + w * 900.0 }
                }
            }
        ],
        "db_nodes": []
    })
}
