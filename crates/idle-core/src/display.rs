//! Human-readable number and duration formatting for status output.

/// Format a quantity with K/M/B/T suffixes at three significant figures.
pub fn format_number(number: f64) -> String {
    const PREFIXES: [(i32, &str); 5] = [(0, ""), (3, "K"), (6, "M"), (9, "B"), (12, "T")];

    if number == 0.0 {
        return "0".to_string();
    }
    if number < 1.0 {
        return format!("{number:.2}");
    }

    let exponent = ((number.abs().log10() / 3.0).floor() * 3.0) as i32;
    let value = number / 10f64.powi(exponent);
    let value_str = format!("{value:.2}");
    let value_str = value_str.trim_end_matches('0').trim_end_matches('.');

    match PREFIXES.iter().find(|(e, _)| *e == exponent) {
        Some((_, prefix)) if !prefix.is_empty() => format!("{value_str}{prefix}"),
        Some(_) => value_str.to_string(),
        None => format!("{value_str}e{exponent}"),
    }
}

/// Format elapsed seconds as `"<h>h <m>m <s>s"`, omitting zero parts.
pub fn format_duration(time_in_seconds: f64) -> String {
    let seconds = time_in_seconds as u64;
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}
