//! Text formatting shared by the output visitors.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};

/// Layout for timestamps in CSV rows.
pub const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

/// Format a duration the way the store tooling prints it.
///
/// Sub-second values use the largest unit that keeps an integer part
/// (`"850ns"`, `"12.5µs"`, `"1.5ms"`); longer values are split into
/// hours, minutes and fractional seconds (`"2.5s"`, `"1m30s"`, `"1h0m0s"`).
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", fixed_point(nanos, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", fixed_point(nanos, 6));
    }

    let total_secs = nanos / 1_000_000_000;
    let frac = nanos % 1_000_000_000;
    let hours = total_secs / 3600;
    let mins = (total_secs / 60) % 60;
    let secs = total_secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || mins > 0 {
        out.push_str(&format!("{}m", mins));
    }
    out.push_str(&fixed_point(secs * 1_000_000_000 + frac, 9));
    out.push('s');
    out
}

/// `value / 10^scale` with trailing fractional zeros dropped.
fn fixed_point(value: u128, scale: u32) -> String {
    let unit = 10u128.pow(scale);
    let int = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return int.to_string();
    }
    let digits = format!("{:0width$}", frac, width = scale as usize);
    format!("{}.{}", int, digits.trim_end_matches('0'))
}

/// Render a UTC instant in the local timezone using [`DATE_TIME`].
pub fn format_local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(DATE_TIME).to_string()
}

/// Printable form of a binary-safe key name.
///
/// Valid UTF-8 is kept as is; every byte of an invalid sequence becomes
/// `\xNN`, the way `redis-cli` shows it.
pub fn format_key(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.push_str(chunk.valid());
        for byte in chunk.invalid() {
            out.push_str(&format!("\\x{:02x}", byte));
        }
    }
    out
}
