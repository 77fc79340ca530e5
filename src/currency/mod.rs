//! Currency codes, exchange-rate book, and locale-aware money formatting.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TOLERANCE_DAYS: i64 = 5;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CurrencyError {
    #[error("FX rate {from} -> {to} not found on {date} (no prior rate within {tolerance} days)")]
    RateNotFound {
        from: String,
        to: String,
        date: NaiveDate,
        tolerance: i64,
    },
    #[error("FX rate must be a positive number, got {0}")]
    InvalidRate(f64),
}

/// A quoted rate: one unit of `from` is worth `rate` units of `to`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub date: NaiveDate,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FxRate {
    pub fn new(from: impl Into<CurrencyCode>, to: impl Into<CurrencyCode>, date: NaiveDate, rate: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            date,
            rate,
            source: None,
        }
    }
}

/// Result of a rate lookup, including the date actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct FxLookup {
    pub rate: f64,
    pub date: NaiveDate,
    pub source: String,
}

/// Dated exchange rates with nearest-prior lookup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FxBook {
    #[serde(default)]
    rates: Vec<FxRate>,
    #[serde(default = "FxBook::default_tolerance")]
    pub tolerance_days: i64,
}

impl FxBook {
    pub fn new() -> Self {
        Self {
            rates: Vec::new(),
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
        }
    }

    fn default_tolerance() -> i64 {
        DEFAULT_TOLERANCE_DAYS
    }

    /// Inserts a rate, replacing any quote for the same pair and date.
    pub fn add_rate(&mut self, rate: FxRate) -> Result<(), CurrencyError> {
        if !rate.rate.is_finite() || rate.rate <= 0.0 {
            return Err(CurrencyError::InvalidRate(rate.rate));
        }
        self.rates
            .retain(|r| !(r.from == rate.from && r.to == rate.to && r.date == rate.date));
        self.rates.push(rate);
        self.rates.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(())
    }

    /// Removes quotes for the pair (either direction) on `date`. Returns how many were removed.
    pub fn remove_rate(&mut self, from: &str, to: &str, date: NaiveDate) -> usize {
        let before = self.rates.len();
        self.rates.retain(|r| {
            let same_pair = (r.from.as_str().eq_ignore_ascii_case(from)
                && r.to.as_str().eq_ignore_ascii_case(to))
                || (r.from.as_str().eq_ignore_ascii_case(to)
                    && r.to.as_str().eq_ignore_ascii_case(from));
            !(same_pair && r.date == date)
        });
        before - self.rates.len()
    }

    pub fn all_rates(&self) -> &[FxRate] {
        &self.rates
    }

    /// Finds the rate converting `from` into `to` on `date`.
    ///
    /// Falls back to the nearest prior quote within `tolerance_days`, and to the
    /// inverse pair when only the opposite direction is quoted.
    pub fn lookup_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<FxLookup, CurrencyError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(FxLookup {
                rate: 1.0,
                date,
                source: "parity".into(),
            });
        }
        if let Some(found) = self.nearest(from, to, date) {
            return Ok(found);
        }
        if let Some(inverse) = self.nearest(to, from, date) {
            return Ok(FxLookup {
                rate: 1.0 / inverse.rate,
                date: inverse.date,
                source: inverse.source,
            });
        }
        Err(CurrencyError::RateNotFound {
            from: from.to_uppercase(),
            to: to.to_uppercase(),
            date,
            tolerance: self.tolerance_days,
        })
    }

    fn nearest(&self, from: &str, to: &str, date: NaiveDate) -> Option<FxLookup> {
        self.rates
            .iter()
            .filter(|r| {
                r.from.as_str().eq_ignore_ascii_case(from) && r.to.as_str().eq_ignore_ascii_case(to)
            })
            .filter(|r| r.date <= date && (date - r.date).num_days() <= self.tolerance_days.max(0))
            .max_by_key(|r| r.date)
            .map(|r| FxLookup {
                rate: r.rate,
                date: r.date,
                source: r.source.clone().unwrap_or_else(|| {
                    if r.date == date {
                        "manual".into()
                    } else {
                        "nearest_prior".into()
                    }
                }),
            })
    }
}

/// Locale-aware formatting preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_format: DateFormatStyle,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            date_format: DateFormatStyle::Short,
        }
    }
}

impl LocaleConfig {
    /// Builds formatting preferences from a BCP-47 tag, defaulting to en-US rules.
    pub fn for_tag(tag: &str) -> Self {
        let lower = tag.to_ascii_lowercase();
        let (decimal_separator, grouping_separator) =
            if lower.starts_with("de") || lower.starts_with("pt") || lower.starts_with("es") {
                (',', '.')
            } else if lower.starts_with("fr") {
                (',', ' ')
            } else {
                ('.', ',')
            };
        Self {
            language_tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
            date_format: DateFormatStyle::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NegativeStyle {
    Sign,
    Parentheses,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurrencyDisplay {
    Symbol,
    Code,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateFormatStyle {
    Short,
    Medium,
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let body = format!("{:.*}", precision as usize, value.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac)) => (int_part.to_string(), Some(frac.to_string())),
        None => (body, None),
    };
    let mut out = group_digits(&int_part, locale.grouping_separator);
    if let Some(frac) = frac_part {
        out.push(locale.decimal_separator);
        out.push_str(&frac);
    }
    if value < 0.0 && out.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.insert(0, '-');
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

pub fn format_currency_value(
    amount: f64,
    code: &CurrencyCode,
    locale: &LocaleConfig,
    display: CurrencyDisplay,
    negative: NegativeStyle,
) -> String {
    let precision = minor_units_for(code.as_str());
    let body = format_number(locale, amount.abs(), precision);
    let negative_amount = amount < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0');
    let prefixed = match display {
        CurrencyDisplay::Symbol => format!("{}{}", symbol_for(code.as_str()), body),
        CurrencyDisplay::Code => format!("{} {}", code.as_str(), body),
    };
    if !negative_amount {
        return prefixed;
    }
    match negative {
        NegativeStyle::Sign => format!("-{}", prefixed),
        NegativeStyle::Parentheses => format!("({})", prefixed),
    }
}

pub fn format_date(locale: &LocaleConfig, date: NaiveDate) -> String {
    match locale.date_format {
        DateFormatStyle::Short => date.format("%Y-%m-%d").to_string(),
        DateFormatStyle::Medium => format!(
            "{:02} {} {}",
            date.day(),
            month_label(date.month()),
            date.year()
        ),
    }
}

fn month_label(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn lookup_uses_nearest_prior_within_tolerance() {
        let mut book = FxBook::new();
        book.add_rate(FxRate::new("EUR", "USD", date(2024, 3, 1), 1.10))
            .unwrap();
        let found = book.lookup_rate("EUR", "USD", date(2024, 3, 4)).unwrap();
        assert_eq!(found.rate, 1.10);
        assert_eq!(found.date, date(2024, 3, 1));
        assert_eq!(found.source, "nearest_prior");

        let err = book
            .lookup_rate("EUR", "USD", date(2024, 3, 20))
            .unwrap_err();
        assert!(matches!(err, CurrencyError::RateNotFound { .. }));
    }

    #[test]
    fn lookup_inverts_opposite_pair() {
        let mut book = FxBook::new();
        book.add_rate(FxRate::new("USD", "EUR", date(2024, 3, 1), 0.5))
            .unwrap();
        let found = book.lookup_rate("EUR", "USD", date(2024, 3, 1)).unwrap();
        assert!((found.rate - 2.0).abs() < 1e-9);
    }

    #[test]
    fn add_rate_replaces_same_day_quote_and_rejects_non_positive() {
        let mut book = FxBook::new();
        book.add_rate(FxRate::new("EUR", "USD", date(2024, 3, 1), 1.1))
            .unwrap();
        book.add_rate(FxRate::new("EUR", "USD", date(2024, 3, 1), 1.2))
            .unwrap();
        assert_eq!(book.all_rates().len(), 1);
        assert_eq!(
            book.add_rate(FxRate::new("EUR", "USD", date(2024, 3, 2), 0.0)),
            Err(CurrencyError::InvalidRate(0.0))
        );
        assert_eq!(book.remove_rate("usd", "eur", date(2024, 3, 1)), 1);
    }

    #[test]
    fn formats_grouped_amounts() {
        let locale = LocaleConfig::default();
        let usd = CurrencyCode::new("usd");
        assert_eq!(
            format_currency_value(
                -1234.5,
                &usd,
                &locale,
                CurrencyDisplay::Symbol,
                NegativeStyle::Sign
            ),
            "-$1,234.50"
        );
        assert_eq!(
            format_currency_value(
                -0.001,
                &usd,
                &locale,
                CurrencyDisplay::Code,
                NegativeStyle::Parentheses
            ),
            "USD 0.00"
        );
        let german = LocaleConfig::for_tag("de-DE");
        assert_eq!(format_number(&german, 1234567.891, 2), "1.234.567,89");
    }
}
