//! Display helpers: percentages, load triples, warn thresholds, terminal-safe text.

/// Shown when a value is missing, as opposed to a real zero.
pub const ABSENT: &str = "—";
/// Shown when a value does not apply (e.g. swap on a host without swap).
pub const NOT_APPLICABLE: &str = "N/A";

/// `1.00 / 0.50 / 0.25`
pub fn format_load(load: [f64; 3]) -> String {
    format!("{:.2} / {:.2} / {:.2}", load[0], load[1], load[2])
}

/// Rounds to `precision` decimals and prints the shortest form, so `0` stays
/// `0%` and `83.333` becomes `83.3%`. Missing values print the absence sentinel.
pub fn format_percent(value: Option<f64>, precision: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{}%", round_to(v, precision)),
        None => ABSENT.into(),
    }
}

/// Like [`format_percent`] but always prints exactly `precision` decimals.
pub fn format_fixed_percent(value: Option<f64>, precision: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.*}%", precision, v),
        None => ABSENT.into(),
    }
}

/// True iff the value is present and strictly above the threshold.
pub fn warn_flag(value: Option<f64>, threshold: f64) -> bool {
    matches!(value, Some(v) if v > threshold)
}

/// Counts default to zero when the collector omitted them.
pub fn format_count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_string()
}

/// Neutralizes characters that would be interpreted by the terminal (escape
/// sequences, cursor movement) before remote text reaches a widget.
pub fn escape_for_display(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    text.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '\u{FFFD}',
            c => c,
        })
        .collect()
}

fn round_to(v: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(precision.min(12) as i32);
    let r = (v * scale).round() / scale;
    // avoid printing "-0"
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
