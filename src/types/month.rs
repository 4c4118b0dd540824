//! The calendar-month identifier every aggregate in the view is keyed on.

use chrono::{Datelike, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Spanish month abbreviations used in the wide production headers.
///
/// `sept` precedes `sep` so the four-letter spelling is consumed whole.
const MONTH_ABBREVIATIONS: [(&str, u32); 14] = [
    ("ene", 1),
    ("feb", 2),
    ("mar", 3),
    ("abr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("sept", 9),
    ("sep", 9),
    ("set", 9),
    ("oct", 10),
    ("nov", 11),
    ("dic", 12),
];

/// A calendar month (year + month number), with no day or time component.
///
/// Its canonical textual form is `YYYY-MM`, which is also how it is serialized
/// and how it is stored in the `month` column of every monthly frame. Because
/// the year is zero-padded to four digits, the textual form sorts the same way
/// as the value itself.
///
/// # Examples
///
/// ```
/// use agroview::Month;
///
/// let month = Month::new(3, 2024);
/// assert_eq!(month.to_string(), "2024-03");
/// assert_eq!("2024-03".parse::<Month>().unwrap(), month);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
    pub fn new(month: u32, year: i32) -> Self {
        Self(year, month)
    }

    /// Truncates a timestamp to the month it falls in.
    pub fn from_datetime(datetime: &NaiveDateTime) -> Self {
        Self(datetime.year(), datetime.month())
    }

    /// Parses a production column header such as `ene07` or `sept12`.
    ///
    /// The leading abbreviation maps through the Spanish month table and the
    /// remainder must be exactly two ASCII digits, which are read as a year in
    /// the 2000s. Anything else yields `None`.
    ///
    /// ```
    /// use agroview::Month;
    ///
    /// assert_eq!(Month::from_label("ene07"), Some(Month::new(1, 2007)));
    /// assert_eq!(Month::from_label("dic19"), Some(Month::new(12, 2019)));
    /// assert_eq!(Month::from_label("unidad"), None);
    /// ```
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        MONTH_ABBREVIATIONS.iter().find_map(|(abbreviation, month)| {
            let year_digits = label.strip_prefix(abbreviation)?;
            if year_digits.len() != 2 || !year_digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let year: i32 = format!("20{year_digits}").parse().ok()?;
            Some(Self(year, *month))
        })
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// Error returned when a string is not in `YYYY-MM` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a calendar month in YYYY-MM form")]
pub struct ParseMonthError(pub String);

impl FromStr for Month {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Self(year, month))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
