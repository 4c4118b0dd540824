//! Value-level parsers shared by the resolvers: permissive timestamps and
//! locale-formatted numbers.
//!
//! Every parser returns `None` on failure; callers drop the row rather than
//! aborting the run.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Canonical text form of a parsed timestamp, used as a join key.
pub(crate) const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a timestamp in any of the layouts the upstream feeds are known to
/// use. Slash and dash dates are read day-first. Offsets (RFC 3339) are
/// dropped, keeping the wall-clock time. Date-only values land at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// What a lone `-` cell in the wide production table means.
///
/// The upstream spreadsheet writes `-` both for "nothing was produced" and for
/// "no figure reported", and nothing in the data tells the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashPolicy {
    /// Read the dash as a literal `0` and include it in the monthly sum.
    #[default]
    Zero,
    /// Treat the dash as a missing value and drop the cell.
    Missing,
}

/// Outcome of normalizing one production cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Value(f64),
    /// A lone dash read as zero under [`DashPolicy::Zero`].
    DashAsZero,
    Unparsable,
}

impl Quantity {
    pub fn value(self) -> Option<f64> {
        match self {
            Quantity::Value(value) => Some(value),
            Quantity::DashAsZero => Some(0.0),
            Quantity::Unparsable => None,
        }
    }
}

/// Normalizes a locale-formatted quantity such as `1.234,5`.
///
/// Thousands separators (`.`, spaces, non-breaking spaces) are stripped and
/// the decimal comma becomes a decimal point.
///
/// ```
/// use agroview::{parse_quantity, DashPolicy, Quantity};
///
/// assert_eq!(parse_quantity("1.234,5", DashPolicy::Zero), Quantity::Value(1234.5));
/// assert_eq!(parse_quantity("-", DashPolicy::Zero), Quantity::DashAsZero);
/// assert_eq!(parse_quantity("-", DashPolicy::Missing), Quantity::Unparsable);
/// ```
pub fn parse_quantity(raw: &str, dash_policy: DashPolicy) -> Quantity {
    let trimmed = raw.trim();
    if trimmed == "-" {
        return match dash_policy {
            DashPolicy::Zero => Quantity::DashAsZero,
            DashPolicy::Missing => Quantity::Unparsable,
        };
    }
    let normalized: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '.' | ' ' | '\u{a0}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Quantity::Value(value),
        _ => Quantity::Unparsable,
    }
}

/// Parses a measurement or price written with either decimal separator.
///
/// A value containing a comma is read as locale-formatted (`1.234,5`);
/// otherwise the dot is the decimal point (`1234.5`).
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let value = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".").parse::<f64>()
    } else {
        trimmed.parse::<f64>()
    };
    value.ok().filter(|v| v.is_finite())
}
