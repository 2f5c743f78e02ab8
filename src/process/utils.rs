/// Drop one leading and one trailing `"`, each end on its own.
/// Whitespace is left alone.
pub fn clean_str(raw: &str) -> String {
    let s = raw.strip_prefix('"').unwrap_or(raw);
    s.strip_suffix('"').unwrap_or(s).to_string()
}

/// A record that came from a blank or whitespace-only line.
pub fn is_blank_record(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty()) && record.len() <= 1
}
