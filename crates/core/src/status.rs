use crate::backend::{DatabaseBackend, QueryStats};

const SIZE_SUFFIXES: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Row-count part of the status line.
pub fn rows_status(rows: Option<usize>) -> String {
    match rows {
        Some(n) if n > 0 => format!("{} row{} in set", n, if n == 1 { "" } else { "s" }),
        _ => "Query OK".to_string(),
    }
}

/// Full status line: row count followed by whatever the backend reports.
pub fn format_status(
    rows: Option<usize>,
    stats: Option<&QueryStats>,
    backend: &dyn DatabaseBackend,
) -> String {
    let mut status = rows_status(rows);
    if let Some(stats) = stats {
        status.push_str(&backend.format_statistics(stats));
    }
    status
}

/// Binary-unit size with trailing zeros trimmed, e.g. `1.5 KB`.
pub fn humanize_size(num_bytes: u64) -> String {
    let mut value = num_bytes as f64;
    let mut idx = 0;
    while value >= 1024.0 && idx < SIZE_SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_SUFFIXES[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_status_pluralises() {
        assert_eq!(rows_status(Some(1)), "1 row in set");
        assert_eq!(rows_status(Some(42)), "42 rows in set");
    }

    #[test]
    fn rows_status_query_ok_for_empty() {
        assert_eq!(rows_status(Some(0)), "Query OK");
        assert_eq!(rows_status(None), "Query OK");
    }

    #[test]
    fn humanize_size_units() {
        assert_eq!(humanize_size(0), "0 B");
        assert_eq!(humanize_size(1023), "1023 B");
        assert_eq!(humanize_size(1024), "1 KB");
        assert_eq!(humanize_size(1536), "1.5 KB");
        assert_eq!(humanize_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(humanize_size(1_073_741_824), "1 GB");
    }

    #[test]
    fn humanize_size_caps_at_terabytes() {
        let pb = 1024u64.pow(5);
        assert_eq!(humanize_size(pb), "1024 TB");
    }
}
