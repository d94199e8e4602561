use chrono::Datelike;
use compact_str::CompactString;

/// Splits a comma-separated label list into normalized labels.
///
/// Each token loses its leading whitespace and is lower-cased. Empty tokens
/// are dropped.
///
/// # Arguments
///
/// * `value` - The raw label list, e.g. `"Machine Learning, AI"`
pub fn split_labels(value: &str) -> impl Iterator<Item = CompactString> + '_ {
    value
        .split(',')
        .map(str::trim_start)
        .filter(|token| !token.is_empty())
        .map(|token| CompactString::from(token.to_lowercase()))
}

/// Shortens a label to at most `budget` characters, appending an ellipsis
/// when anything was cut.
pub fn truncate_label(label: &str, budget: usize) -> String {
    match label.char_indices().nth(budget) {
        Some((cut, _)) => format!("{}...", &label[..cut]),
        None => label.to_string(),
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around a precomputed mean.
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// The current calendar year in local time.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
