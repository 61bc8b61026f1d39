// src/format.rs
// Small display helpers for the terminal tables.

/// Human-friendly duration: "850ms", "3.2s", "42s", "2m 5s".
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 10.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 60.0 {
        format!("{:.0}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        let remaining = seconds - minutes * 60.0;
        format!("{}m {:.0}s", minutes as u64, remaining)
    }
}

/// Cuts long domains down to `max_len` characters plus "...".
pub fn truncate_domain(domain: &str, max_len: usize) -> String {
    match domain.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &domain[..idx]),
        None => domain.to_string(),
    }
}
