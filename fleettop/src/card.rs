//! Maps server and DB node records into card descriptions.
//!
//! A card is plain data (title, optional error banner, ordered metric list);
//! drawing it is left to the presentation layer. Rendering never fails on
//! missing telemetry: every optional field has a default or a sentinel.

use crate::format::{
    escape_for_display, format_count, format_fixed_percent, format_load, format_percent,
    warn_flag, ABSENT, NOT_APPLICABLE,
};
use crate::types::{DbNodeRecord, JvmRecord, MemoryRecord, ProcessRecord, ServerRecord};

pub const CPU_WARN_PCT: f64 = 80.0;
pub const MEM_WARN_PCT: f64 = 85.0;
pub const SWAP_WARN_PCT: f64 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
    pub warn: bool,
    pub detail: Option<String>,
}

impl Metric {
    fn plain(label: &'static str, value: String) -> Self {
        Self {
            label,
            value,
            warn: false,
            detail: None,
        }
    }

    fn warn_if(mut self, warn: bool) -> Self {
        self.warn = warn;
        self
    }

    fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Card {
    pub title: String,
    /// When set, the card shows only the title and this banner.
    pub error: Option<String>,
    pub metrics: Vec<Metric>,
    /// `DB: host:port` line under a server's metrics.
    pub db_line: Option<String>,
}

impl Card {
    /// A title-less card carrying only an error banner, used in place of a
    /// whole server list.
    pub fn error_only(message: &str) -> Self {
        Self {
            error: Some(escape_for_display(Some(message))),
            ..Self::default()
        }
    }

    pub fn metric(&self, label: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.label == label)
    }
}

/// The process chosen to represent a server's application.
#[derive(Debug, Clone, PartialEq)]
pub struct MainProcess<'a> {
    pub pid: String,
    pub process: Option<&'a ProcessRecord>,
    pub jvm: Option<&'a JvmRecord>,
}

/// Picks the main process, in priority order: the first pid seen with
/// connections, the first listed process with JVM stats, the first listed
/// process.
pub fn select_main_process(s: &ServerRecord) -> Option<MainProcess<'_>> {
    if let Some((pid, _)) = s.connections_by_pid.first() {
        return Some(MainProcess {
            pid: pid.to_string(),
            process: s
                .processes
                .iter()
                .find(|p| p.pid_key().as_deref() == Some(pid)),
            jvm: s.jvm_by_pid.get(pid),
        });
    }

    for p in &s.processes {
        let Some(pid) = p.pid_key() else { continue };
        if let Some(jvm) = s.jvm_by_pid.get(&pid) {
            return Some(MainProcess {
                pid,
                process: Some(p),
                jvm: Some(jvm),
            });
        }
    }

    let first = s.processes.first()?;
    let pid = first.pid_key()?;
    Some(MainProcess {
        jvm: s.jvm_by_pid.get(&pid),
        pid,
        process: Some(first),
    })
}

/// `java (4242) — Jira 9.12.1`
pub fn process_label(s: &ServerRecord, main: Option<&MainProcess<'_>>) -> String {
    let Some((main, process)) = main.and_then(|m| m.process.map(|p| (m, p))) else {
        return ABSENT.into();
    };
    let comm = process
        .comm
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or("process");
    let mut label = escape_for_display(Some(&format!("{comm} ({})", main.pid)));
    if let Some(version) = s.version() {
        label.push_str(&format!(
            " — {} {}",
            s.product_name(),
            escape_for_display(Some(version))
        ));
    }
    label
}

/// JVM memory ratios, each as a percentage of the configured max heap.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapDetail {
    pub heap_used: String,
    pub heap_available: String,
    pub non_heap: String,
    pub rss_of_heap: String,
}

impl HeapDetail {
    pub fn used_text(&self) -> String {
        format!(
            "heap: {}, non-heap: {}, RSS/heap: {}",
            self.heap_used, self.non_heap, self.rss_of_heap
        )
    }

    pub fn available_text(&self) -> String {
        format!("heap avail: {}", self.heap_available)
    }
}

/// Needs the main process itself, not just its pid, plus a usable max heap.
pub fn heap_detail(s: &ServerRecord, main: &MainProcess<'_>) -> Option<HeapDetail> {
    let heap_max = s.heap_max()?;
    let process = main.process?;
    let jvm = main.jvm?;
    let of_heap = |mb: Option<f64>| format_fixed_percent(mb.map(|v| 100.0 * v / heap_max), 1);
    let rss_mb = process.rss_kb.map(|kb| kb / 1024.0);
    Some(HeapDetail {
        heap_used: of_heap(jvm.heap_used_mb),
        heap_available: of_heap(jvm.heap_used_mb.map(|used| (heap_max - used).max(0.0))),
        non_heap: of_heap(jvm.non_heap_mb),
        rss_of_heap: of_heap(rss_mb),
    })
}

pub fn render_server(s: &ServerRecord) -> Card {
    let title = escape_for_display(s.host.as_deref());
    if let Some(err) = s.error() {
        return Card {
            title,
            error: Some(escape_for_display(Some(err))),
            ..Card::default()
        };
    }

    let main = select_main_process(s);
    let process_cpu = main
        .as_ref()
        .and_then(|m| m.process)
        .and_then(|p| p.cpu_percent)
        .map(|cpu| format!("process: {cpu:.1}%"));
    let heap = main.as_ref().and_then(|m| heap_detail(s, m));

    let cpu = s.cpu_percent.unwrap_or(0.0);
    let mem = s.memory.as_ref();
    let mem_used = mem.and_then(|m| m.utilization_percent);
    let (swap_value, swap_warn) = swap_display(mem);

    let metrics = vec![
        Metric::plain("Process", process_label(s, main.as_ref())).with_detail(process_cpu),
        Metric::plain("Load avg (1/5/15)", format_load(s.load_triple())),
        Metric::plain("System CPU %", format_percent(Some(cpu), 1))
            .warn_if(warn_flag(Some(cpu), CPU_WARN_PCT)),
        Metric::plain("Memory used", format_percent(mem_used, 1))
            .warn_if(warn_flag(mem_used, MEM_WARN_PCT))
            .with_detail(heap.as_ref().map(HeapDetail::used_text)),
        Metric::plain("Memory available", memory_available(mem_used))
            .with_detail(heap.as_ref().map(HeapDetail::available_text)),
        Metric::plain("Swap used", swap_value).warn_if(swap_warn),
        Metric::plain("Incoming (app port)", format_count(s.incoming_connections)),
        Metric::plain("DB connections", format_count(s.db_connection_count)),
    ];

    let db_line = s.db_host().map(|host| {
        let port = s.db_port.map(|p| format!(":{p}")).unwrap_or_default();
        format!("DB: {}{port}", escape_for_display(Some(host)))
    });

    Card {
        title,
        error: None,
        metrics,
        db_line,
    }
}

pub fn render_db_node(d: &DbNodeRecord) -> Card {
    let port = d.port.map(|p| format!(":{p}")).unwrap_or_default();
    let title = format!("{}{port}", escape_for_display(d.host.as_deref()));
    if let Some(err) = d.error() {
        return Card {
            title,
            error: Some(escape_for_display(Some(err))),
            ..Card::default()
        };
    }

    let cpu = d.cpu_percent.unwrap_or(0.0);
    let mem = d.memory.as_ref();
    let mem_used = mem.and_then(|m| m.utilization_percent);
    let (swap_value, swap_warn) = swap_display(mem);

    let metrics = vec![
        Metric::plain(
            "DB type",
            d.db_type()
                .map(|t| escape_for_display(Some(t)))
                .unwrap_or_else(|| ABSENT.into()),
        ),
        Metric::plain("Load avg (1/5/15)", format_load(d.load_triple())),
        Metric::plain("System CPU %", format_percent(Some(cpu), 1))
            .warn_if(warn_flag(Some(cpu), CPU_WARN_PCT)),
        Metric::plain("Memory used", format_percent(mem_used, 1))
            .warn_if(warn_flag(mem_used, MEM_WARN_PCT)),
        Metric::plain("Memory available", memory_available(mem_used)),
        Metric::plain("Swap used", swap_value).warn_if(swap_warn),
        Metric::plain("Connections", format_count(d.incoming_connections)),
    ];

    Card {
        title,
        error: None,
        metrics,
        db_line: None,
    }
}

fn memory_available(used: Option<f64>) -> String {
    format_fixed_percent(used.map(|u| 100.0 - u), 1)
}

/// A host with `swap_total_mb == 0` has no swap at all; an unknown total
/// means the reading is missing, whatever the utilization says. The warn
/// flag follows the reported utilization either way.
pub fn swap_display(mem: Option<&MemoryRecord>) -> (String, bool) {
    let total = mem.and_then(|m| m.swap_total_mb);
    let pct = mem.and_then(|m| m.swap_utilization_percent);
    let value = match total {
        Some(t) if t == 0.0 => NOT_APPLICABLE.into(),
        Some(t) if t > 0.0 && pct.is_some() => format_percent(pct, 1),
        _ => ABSENT.into(),
    };
    (value, warn_flag(pct, SWAP_WARN_PCT))
}
