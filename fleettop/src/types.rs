//! Types that mirror the dashboard service's JSON schema.
//!
//! The collector omits or nulls fields freely, so every optional field
//! decodes leniently and the renderer applies the documented defaults.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// Interval used when the service does not advertise one.
pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// `GET /api/config`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct EnvironmentConfig {
    pub refresh_interval_seconds: Option<f64>,
    pub environment: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environments: Vec<String>,
}

impl EnvironmentConfig {
    /// Advertised refresh interval in whole seconds; zero, negative or missing
    /// values fall back to the default.
    pub fn refresh_interval_secs(&self) -> u64 {
        match self.refresh_interval_seconds {
            Some(v) if v.is_finite() && v >= 1.0 => v as u64,
            _ => DEFAULT_REFRESH_SECS,
        }
    }
}

/// `GET /api/metrics`: either a payload-level error or the fleet lists.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct FleetSnapshot {
    pub error: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: Vec<ServerRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub db_nodes: Vec<DbNodeRecord>,
    // echoed by the collector
    pub environment: Option<String>,
    pub refresh_interval_seconds: Option<f64>,
}

impl FleetSnapshot {
    pub fn payload_error(&self) -> Option<&str> {
        non_empty(self.error.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct MemoryRecord {
    pub total_mb: Option<f64>,
    pub used_mb: Option<f64>,
    pub available_mb: Option<f64>,
    pub utilization_percent: Option<f64>,
    pub swap_total_mb: Option<f64>,
    pub swap_used_mb: Option<f64>,
    pub swap_free_mb: Option<f64>,
    pub swap_utilization_percent: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    pub pid: Option<u32>,
    pub comm: Option<String>,
    pub cpu_percent: Option<f64>,
    pub rss_kb: Option<f64>,
}

impl ProcessRecord {
    pub fn pid_key(&self) -> Option<String> {
        self.pid.map(|p| p.to_string())
    }
}

/// Output of `jstat -gc` for one JVM, in MB.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct JvmRecord {
    pub heap_used_mb: Option<f64>,
    pub heap_capacity_mb: Option<f64>,
    pub non_heap_mb: Option<f64>,
}

/// Per-pid connection tally. Older collectors send a bare count, newer ones
/// split incoming (app port) and DB connections.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PidConnections {
    Count(u64),
    Split {
        #[serde(default)]
        incoming: u64,
        #[serde(default)]
        db: u64,
    },
    Other(serde_json::Value),
}

impl PidConnections {
    pub fn total(&self) -> u64 {
        match self {
            PidConnections::Count(n) => *n,
            PidConnections::Split { incoming, db } => incoming + db,
            PidConnections::Other(_) => 0,
        }
    }
}

/// A pid-keyed JSON object decoded into a sequence that keeps the order the
/// keys appeared in, so "first discovered pid" never depends on map iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedPids<V>(Vec<(String, V)>);

impl<V> Default for OrderedPids<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> From<Vec<(String, V)>> for OrderedPids<V> {
    fn from(entries: Vec<(String, V)>) -> Self {
        Self(entries)
    }
}

impl<V> OrderedPids<V> {
    pub fn first(&self) -> Option<(&str, &V)> {
        self.0.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, pid: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == pid).map(|(_, v)| v)
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.get(pid).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedPids<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PidMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for PidMapVisitor<V> {
            type Value = OrderedPids<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object keyed by pid")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedPids::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, V)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((pid, value)) = map.next_entry::<String, V>()? {
                    // a repeated key keeps its first position
                    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == pid) {
                        slot.1 = value;
                    } else {
                        entries.push((pid, value));
                    }
                }
                Ok(OrderedPids(entries))
            }
        }

        deserializer.deserialize_any(PidMapVisitor(PhantomData))
    }
}

/// One application node (Jira or Confluence).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ServerRecord {
    pub host: Option<String>,
    pub error: Option<String>,
    pub load_avg_1_5_15: Option<Vec<f64>>,
    pub memory: Option<MemoryRecord>,
    pub cpu_percent: Option<f64>,
    pub incoming_connections: Option<u64>,
    pub db_connection_count: Option<u64>,
    pub db_host: Option<String>,
    #[serde(default, deserialize_with = "lenient_port")]
    pub db_port: Option<u16>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connections_by_pid: OrderedPids<PidConnections>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processes: Vec<ProcessRecord>,
    pub heap_max_mb: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jvm_by_pid: OrderedPids<JvmRecord>,
    pub app_type: Option<String>,
    pub app_version: Option<String>,
    pub jira_version: Option<String>,
}

impl ServerRecord {
    pub fn error(&self) -> Option<&str> {
        non_empty(self.error.as_deref())
    }

    pub fn load_triple(&self) -> [f64; 3] {
        load_triple(self.load_avg_1_5_15.as_deref())
    }

    pub fn db_host(&self) -> Option<&str> {
        non_empty(self.db_host.as_deref())
    }

    /// `app_version`, falling back to the legacy `jira_version`.
    pub fn version(&self) -> Option<&str> {
        non_empty(self.app_version.as_deref()).or_else(|| non_empty(self.jira_version.as_deref()))
    }

    pub fn product_name(&self) -> &'static str {
        match self.app_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("confluence") => "Confluence",
            _ => "Jira",
        }
    }

    /// Configured max heap, only when it is a usable divisor.
    pub fn heap_max(&self) -> Option<f64> {
        self.heap_max_mb.filter(|m| m.is_finite() && *m > 0.0)
    }
}

/// One database host discovered from the app nodes' DB config.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct DbNodeRecord {
    pub host: Option<String>,
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: Option<u16>,
    pub error: Option<String>,
    pub load_avg_1_5_15: Option<Vec<f64>>,
    pub memory: Option<MemoryRecord>,
    pub cpu_percent: Option<f64>,
    pub incoming_connections: Option<u64>,
    pub db_type: Option<String>,
}

impl DbNodeRecord {
    pub fn error(&self) -> Option<&str> {
        non_empty(self.error.as_deref())
    }

    pub fn load_triple(&self) -> [f64; 3] {
        load_triple(self.load_avg_1_5_15.as_deref())
    }

    /// Detected engine; the collector reports "—" when it never ran detection.
    pub fn db_type(&self) -> Option<&str> {
        non_empty(self.db_type.as_deref()).filter(|t| *t != crate::format::ABSENT)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn load_triple(v: Option<&[f64]>) -> [f64; 3] {
    let v = v.unwrap_or_default();
    let at = |i: usize| v.get(i).copied().unwrap_or(0.0);
    [at(0), at(1), at(2)]
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Ports show up as numbers or numeric strings depending on the config parser.
fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Num(u64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<PortRepr>::deserialize(deserializer)? {
        Some(PortRepr::Num(n)) => u16::try_from(n).ok(),
        Some(PortRepr::Text(s)) => s.trim().parse().ok(),
        Some(PortRepr::Other(_)) | None => None,
    })
}
