use num_format::{Locale, ToFormattedString};

/// Thousands-separated number with a fixed number of decimals,
/// e.g. `1234.5` with 2 decimals becomes `1,234.50`.
pub fn format_number(val: f64, decimals: usize) -> String {
    if !val.is_finite() {
        return val.to_string();
    }
    let fixed = format!("{:.*}", decimals, val.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };
    // u128 covers anything a count could reach; beyond that keep the digits as-is
    let whole = match whole.parse::<u128>() {
        Ok(n) => n.to_formatted_string(&Locale::en),
        Err(_) => whole.to_string(),
    };
    let sign = if val < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{sign}{whole}.{f}"),
        None => format!("{sign}{whole}"),
    }
}

pub fn format_optional(val: Option<f64>, decimals: usize) -> String {
    val.map(|v| format_number(v, decimals)).unwrap_or_default()
}
