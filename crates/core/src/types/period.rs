//! Month/year periods and quick-period presets.
//!
//! A [`PeriodFilter`] is what the dashboard and reports filter on: an optional
//! month and an optional year, each independently active. A [`QuickPeriod`]
//! is a named shorthand that expands to one.

use core::fmt;
use core::str::FromStr;

use chrono::{Datelike, NaiveDate};

/// French month names, January first.
pub const MONTH_NAMES_FR: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

/// Oldest year offered in period pickers.
pub const FIRST_YEAR: i32 = 2020;

/// Errors that can occur when building a period.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// Month outside 1-12 or not numeric.
    #[error("invalid month: {0}")]
    InvalidMonth(String),
    /// Year not a four-digit number.
    #[error("invalid year: {0}")]
    InvalidYear(String),
    /// Unknown quick-period name.
    #[error("unknown period preset: {0} (expected current, last, quarter or year)")]
    UnknownPreset(String),
}

/// A calendar month, 1 to 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(u8);

impl Month {
    /// Create a month from its number.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidMonth`] outside 1-12.
    pub fn new(number: u32) -> Result<Self, PeriodError> {
        u8::try_from(number)
            .ok()
            .filter(|n| (1..=12).contains(n))
            .map(Self)
            .ok_or_else(|| PeriodError::InvalidMonth(number.to_string()))
    }

    /// The month a date falls in.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        // month() is always 1-12
        Self(u8::try_from(date.month()).unwrap_or(1))
    }

    /// Month number, 1 to 12.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0 as u32
    }

    /// Zero-padded two-digit form (`"03"`), as sent to the backend.
    #[must_use]
    pub fn padded(self) -> String {
        format!("{:02}", self.0)
    }

    /// French month name.
    #[must_use]
    pub fn name_fr(self) -> &'static str {
        MONTH_NAMES_FR
            .get(usize::from(self.0) - 1)
            .copied()
            .unwrap_or_default()
    }

    /// All twelve months in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=12).map(Self)
    }

    /// The previous month, and whether the year rolls back.
    #[must_use]
    pub const fn previous(self) -> (Self, bool) {
        if self.0 == 1 {
            (Self(12), true)
        } else {
            (Self(self.0 - 1), false)
        }
    }

    /// Zero-based quarter index (0 for January-March).
    #[must_use]
    pub const fn quarter(self) -> u8 {
        (self.0 - 1) / 3
    }
}

impl FromStr for Month {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map_err(|_| PeriodError::InvalidMonth(s.to_owned()))
            .and_then(Self::new)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A four-digit calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(i32);

impl Year {
    /// Create a year.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidYear`] outside 1000-9999.
    pub fn new(year: i32) -> Result<Self, PeriodError> {
        if (1000..=9999).contains(&year) {
            Ok(Self(year))
        } else {
            Err(PeriodError::InvalidYear(year.to_string()))
        }
    }

    /// The year a date falls in.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self(date.year())
    }

    /// The numeric year.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl FromStr for Year {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i32>()
            .map_err(|_| PeriodError::InvalidYear(s.to_owned()))
            .and_then(Self::new)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An optional month and an optional year.
///
/// A filter with neither set is inactive and matches everything. Once either
/// part is set, rows without a usable date never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PeriodFilter {
    /// Selected month, if any.
    pub month: Option<Month>,
    /// Selected year, if any.
    pub year: Option<Year>,
}

impl PeriodFilter {
    /// A filter with no selection.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            month: None,
            year: None,
        }
    }

    /// Build a filter from picker values: two-digit month and four-digit year
    /// strings, empty meaning "not selected".
    ///
    /// # Errors
    ///
    /// Returns a [`PeriodError`] if a non-empty value does not parse.
    pub fn from_selection(month: &str, year: &str) -> Result<Self, PeriodError> {
        let month = match month.trim() {
            "" => None,
            m => Some(m.parse()?),
        };
        let year = match year.trim() {
            "" => None,
            y => Some(y.parse()?),
        };
        Ok(Self { month, year })
    }

    /// Month and year of a given date.
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        Self {
            month: Some(Month::of(date)),
            year: Some(Year::of(date)),
        }
    }

    /// Whether a month or a year is selected.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.month.is_some() || self.year.is_some()
    }

    /// Whether a row dated `date` passes the filter.
    #[must_use]
    pub fn matches(&self, date: Option<NaiveDate>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.month.is_none_or(|m| m == Month::of(date))
            && self.year.is_none_or(|y| y == Year::of(date))
    }

    /// Label for KPI cards: `Mars 2024`, `Mars`, `2024` or `ce mois`.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.month, self.year) {
            (Some(m), Some(y)) => format!("{} {y}", m.name_fr()),
            (Some(m), None) => m.name_fr().to_owned(),
            (None, Some(y)) => y.to_string(),
            (None, None) => "ce mois".to_owned(),
        }
    }

    /// Query parameters for backend filtering, month first.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(month) = self.month {
            pairs.push(("month", month.padded()));
        }
        if let Some(year) = self.year {
            pairs.push(("year", year.to_string()));
        }
        pairs
    }
}

/// Named period shorthand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickPeriod {
    /// The month containing today.
    Current,
    /// The month before the current one.
    Last,
    /// The quarter containing today.
    Quarter,
    /// The year containing today.
    Year,
}

impl QuickPeriod {
    /// Expand to a concrete dashboard filter as of `today`.
    ///
    /// `Quarter` selects the current month: the dashboard filter has no way
    /// to express a three-month span, so the preset keeps the month it was
    /// picked in. Use [`QuickPeriod::contains`] for real quarter boundaries.
    #[must_use]
    pub fn resolve(self, today: NaiveDate) -> PeriodFilter {
        match self {
            Self::Current | Self::Quarter => PeriodFilter::month_of(today),
            Self::Last => {
                let (month, rolled_back) = Month::of(today).previous();
                let year = if rolled_back {
                    today.year() - 1
                } else {
                    today.year()
                };
                PeriodFilter {
                    month: Some(month),
                    year: Some(Year(year)),
                }
            }
            Self::Year => PeriodFilter {
                month: None,
                year: Some(Year::of(today)),
            },
        }
    }

    /// Whether `date` falls in this period relative to `today`, using real
    /// calendar quarters.
    #[must_use]
    pub fn contains(self, today: NaiveDate, date: NaiveDate) -> bool {
        match self {
            Self::Current | Self::Last | Self::Year => self.resolve(today).matches(Some(date)),
            Self::Quarter => {
                date.year() == today.year()
                    && Month::of(date).quarter() == Month::of(today).quarter()
            }
        }
    }

    /// French label shown on filter chips.
    #[must_use]
    pub const fn label_fr(self) -> &'static str {
        match self {
            Self::Current => "Mois en cours",
            Self::Last => "Mois dernier",
            Self::Quarter => "Trimestre",
            Self::Year => "Année",
        }
    }
}

impl FromStr for QuickPeriod {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "current" => Ok(Self::Current),
            "last" => Ok(Self::Last),
            "quarter" => Ok(Self::Quarter),
            "year" => Ok(Self::Year),
            other => Err(PeriodError::UnknownPreset(other.to_owned())),
        }
    }
}

impl fmt::Display for QuickPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Current => "current",
            Self::Last => "last",
            Self::Quarter => "quarter",
            Self::Year => "year",
        })
    }
}

/// Years offered in pickers: five years ahead down to 2020.
#[must_use]
pub fn year_choices(today: NaiveDate) -> Vec<i32> {
    (FIRST_YEAR..=today.year() + 5).rev().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_parse() {
        assert_eq!("03".parse::<Month>().unwrap().number(), 3);
        assert!("13".parse::<Month>().is_err());
        assert!("0".parse::<Month>().is_err());
        assert!("mars".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_names() {
        assert_eq!(Month::new(1).unwrap().name_fr(), "Janvier");
        assert_eq!(Month::new(8).unwrap().name_fr(), "Août");
        assert_eq!(Month::all().count(), 12);
    }

    #[test]
    fn test_filter_matches_month_and_year() {
        let filter = PeriodFilter::from_selection("03", "2024").unwrap();
        assert!(filter.matches(Some(ymd(2024, 3, 5))));
        assert!(!filter.matches(Some(ymd(2024, 4, 1))));
        assert!(!filter.matches(Some(ymd(2023, 3, 5))));
    }

    #[test]
    fn test_filter_partial_selection() {
        let month_only = PeriodFilter::from_selection("03", "").unwrap();
        assert!(month_only.matches(Some(ymd(2019, 3, 1))));
        let year_only = PeriodFilter::from_selection("", "2024").unwrap();
        assert!(year_only.matches(Some(ymd(2024, 12, 31))));
        assert!(!year_only.matches(Some(ymd(2025, 1, 1))));
    }

    #[test]
    fn test_active_filter_excludes_undated_rows() {
        let filter = PeriodFilter::from_selection("", "2024").unwrap();
        assert!(!filter.matches(None));
        assert!(PeriodFilter::none().matches(None));
    }

    #[test]
    fn test_label() {
        assert_eq!(PeriodFilter::from_selection("03", "2024").unwrap().label(), "Mars 2024");
        assert_eq!(PeriodFilter::from_selection("03", "").unwrap().label(), "Mars");
        assert_eq!(PeriodFilter::from_selection("", "2024").unwrap().label(), "2024");
        assert_eq!(PeriodFilter::none().label(), "ce mois");
    }

    #[test]
    fn test_query_pairs() {
        let filter = PeriodFilter::from_selection("3", "2024").unwrap();
        assert_eq!(
            filter.query_pairs(),
            vec![("month", "03".to_owned()), ("year", "2024".to_owned())]
        );
        assert!(PeriodFilter::none().query_pairs().is_empty());
    }

    #[test]
    fn test_last_rolls_back_over_january() {
        let filter = QuickPeriod::Last.resolve(ymd(2024, 1, 15));
        assert_eq!(filter.month, Some(Month::new(12).unwrap()));
        assert_eq!(filter.year, Some(Year::new(2023).unwrap()));
    }

    #[test]
    fn test_quarter_preset_keeps_current_month() {
        let today = ymd(2024, 5, 20);
        assert_eq!(QuickPeriod::Quarter.resolve(today), QuickPeriod::Current.resolve(today));
    }

    #[test]
    fn test_year_preset_clears_month() {
        let filter = QuickPeriod::Year.resolve(ymd(2024, 5, 20));
        assert_eq!(filter.month, None);
        assert_eq!(filter.year, Some(Year::new(2024).unwrap()));
    }

    #[test]
    fn test_contains_uses_calendar_quarters() {
        let today = ymd(2024, 5, 20);
        assert!(QuickPeriod::Quarter.contains(today, ymd(2024, 4, 1)));
        assert!(QuickPeriod::Quarter.contains(today, ymd(2024, 6, 30)));
        assert!(!QuickPeriod::Quarter.contains(today, ymd(2024, 3, 31)));
        assert!(!QuickPeriod::Quarter.contains(today, ymd(2023, 5, 1)));
        assert!(QuickPeriod::Last.contains(today, ymd(2024, 4, 10)));
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("last".parse::<QuickPeriod>().unwrap(), QuickPeriod::Last);
        assert!("week".parse::<QuickPeriod>().is_err());
    }

    #[test]
    fn test_year_choices() {
        let years = year_choices(ymd(2024, 6, 1));
        assert_eq!(years.first(), Some(&2029));
        assert_eq!(years.last(), Some(&2020));
        assert_eq!(years.len(), 10);
    }
}
