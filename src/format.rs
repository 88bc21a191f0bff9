// src/format.rs
// Display formatting for dates, prices, money and percentages. Never fails: missing input renders as "-"

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

pub const PLACEHOLDER: &str = "-";

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Regional (zh-TW) short date: `2024/1/15`.
pub fn format_date(date: Option<&str>) -> String {
    let raw = match date.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return PLACEHOLDER.to_string(),
    };

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(|dt| dt.date())
                .ok()
        });

    match parsed {
        Some(d) => format!("{}/{}/{}", d.year(), d.month(), d.day()),
        None => raw.to_string(),
    }
}

pub fn format_price(price: Option<f64>) -> String {
    match finite(price) {
        Some(p) => format!("{:.2}", p),
        None => PLACEHOLDER.to_string(),
    }
}

/// Rounded to a whole amount with thousands separators: `-1,234,568`.
pub fn format_money(amount: Option<f64>) -> String {
    match finite(amount) {
        Some(a) => group_thousands(a.round()),
        None => PLACEHOLDER.to_string(),
    }
}

/// Fraction to percent with two decimals: `0.125` → `12.50%`.
pub fn format_percentage(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{:.2}", v),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_count(value: Option<f64>) -> String {
    format_money(value)
}

fn group_thousands(whole: f64) -> String {
    let negative = whole < 0.0;
    let digits = format!("{:.0}", whole.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative && grouped != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
