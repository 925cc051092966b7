//! Format strings for cell values.
//!
//! Supports the named formats `Standard`, `Currency`, `Percent`, `Fixed` and
//! `General Number`, and custom numeric patterns built from `0`, `#`, `,`,
//! `.` and `%` with an optional `;`-separated negative section.

use crate::calc::Value;

fn named(format: &str) -> Option<&'static str> {
    match format.to_ascii_lowercase().as_str() {
        "standard" => Some("#,##0.00"),
        "currency" => Some("$#,##0.00;($#,##0.00)"),
        "percent" => Some("0.00%"),
        "fixed" => Some("0.00"),
        "general number" | "general" => Some(""),
        _ => None,
    }
}

/// Render `value` with an optional format string.
pub fn format_value(value: &Value, format: Option<&str>) -> String {
    match value {
        Value::Null => String::new(),
        Value::Error(err) => format!("#ERR: {err}"),
        Value::Number(n) => format_number(*n, format.unwrap_or("")),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Member(m) => m.to_string(),
        other => other.type_name().to_string(),
    }
}

/// Render a number with a named format or a custom pattern.
pub fn format_number(n: f64, format: &str) -> String {
    let pattern = named(format).unwrap_or(format);
    if pattern.is_empty() || !n.is_finite() {
        return general(n);
    }

    let mut sections = pattern.splitn(2, ';');
    let positive = sections.next().unwrap_or_default();
    match sections.next() {
        Some(negative) if n < 0.0 && !negative.is_empty() => apply(-n, negative),
        _ if n < 0.0 => {
            let body = apply(-n, positive);
            if body.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
                format!("-{body}")
            } else {
                body
            }
        }
        _ => apply(n, positive),
    }
}

fn general(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        ryu::Buffer::new().format(n).to_string()
    }
}

/// Parsed numeric part of a pattern section.
struct Pattern<'a> {
    prefix: &'a str,
    suffix: &'a str,
    grouping: bool,
    min_integer: usize,
    min_fraction: usize,
    max_fraction: usize,
    percent: bool,
}

impl<'a> Pattern<'a> {
    fn parse(section: &'a str) -> Self {
        let is_digit = |c: char| matches!(c, '0' | '#' | '.');
        let start = section.find(is_digit).unwrap_or(section.len());
        let end = section[start..]
            .find(|c: char| !matches!(c, '0' | '#' | '.' | ','))
            .map_or(section.len(), |i| start + i);
        let numeric = &section[start..end];
        let (integer, fraction) = numeric.split_once('.').unwrap_or((numeric, ""));
        Self {
            prefix: &section[..start],
            suffix: &section[end..],
            grouping: integer.contains(','),
            min_integer: integer.matches('0').count(),
            min_fraction: fraction.matches('0').count(),
            max_fraction: fraction.matches(['0', '#']).count(),
            percent: section.contains('%'),
        }
    }
}

fn apply(n: f64, section: &str) -> String {
    let pattern = Pattern::parse(section);
    let n = if pattern.percent { n * 100.0 } else { n };

    let rounded = format!("{:.*}", pattern.max_fraction, n);
    let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = {
        let trimmed = fraction.trim_end_matches('0');
        let keep = trimmed.len().max(pattern.min_fraction);
        &fraction[..keep.min(fraction.len())]
    };

    let integer = integer.trim_start_matches('0');
    let mut digits = "0".repeat(pattern.min_integer.saturating_sub(integer.len()));
    digits.push_str(integer);
    if pattern.grouping {
        digits = group_thousands(&digits);
    }

    let mut out = String::from(pattern.prefix);
    out.push_str(&digits);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out.push_str(pattern.suffix);
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
