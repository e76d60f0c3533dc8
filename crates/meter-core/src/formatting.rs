/// Format a number with comma thousands separators and a fixed number of
/// decimal places.
///
/// # Examples
///
/// ```
/// use meter_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // "-0.00" reads badly in a metrics panel.
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format an energy amount in volt-ampere hours with two decimals.
///
/// # Examples
///
/// ```
/// use meter_core::formatting::format_energy;
///
/// assert_eq!(format_energy(1234.567), "1,234.57 VAh");
/// assert_eq!(format_energy(0.0), "0.00 VAh");
/// ```
pub fn format_energy(amount: f64) -> String {
    format!("{} VAh", format_number(amount, 2))
}

/// `(part / whole) * 100` rounded to `decimal_places`; `0.0` when `whole` is
/// zero.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let factor = 10_f64.powi(decimal_places as i32);
    (part / whole * 100.0 * factor).round() / factor
}

/// Insert a comma every three digits from the right.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
