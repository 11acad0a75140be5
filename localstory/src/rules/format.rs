//! Display formatting for infographic values.

/// Formats a dollar amount as en-US currency with no fraction digits.
///
/// `75000.0` becomes `"$75,000"`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}", sign, grouped)
}

/// Formats a median home value, collapsing large values into millions.
pub fn format_home_value(value: f64) -> String {
    if value >= 2_000_000.0 {
        "≥ $2 million".to_string()
    } else if value >= 1_000_000.0 {
        format!("${:.2} million", value / 1_000_000.0)
    } else {
        format_currency(value)
    }
}

/// Formats an index value rounded to an integer, halves away from zero.
pub fn format_index(value: f64) -> String {
    format!("{:.0}", value.round())
}
