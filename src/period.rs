//! Report periods: rolling windows, fixed calendar ranges, and the
//! distinguished year-to-date period.

use chrono::{Datelike, Duration, NaiveDate};

/// Literal token used in period labels and filenames for year-to-date runs.
pub const YEAR_TO_DATE_TOKEN: &str = "YTD";

/// A date range over which metrics are computed.
///
/// Periods are immutable once constructed.  The `year_to_date` flag marks the
/// distinguished period with canonical bounds (January 1st of the end date's
/// year through the end date); every other period is an ordinary range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportPeriod {
    start: NaiveDate,
    end: NaiveDate,
    label: String,
    year_to_date: bool,
}

impl ReportPeriod {
    /// Creates a fixed calendar range with an explicit display label.
    pub fn calendar(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
            year_to_date: false,
        }
    }

    /// Creates a rolling window covering the `days` days ending at `end`.
    pub fn rolling_days(end: NaiveDate, days: i64) -> Self {
        let start = end - Duration::days(days.max(1) - 1);
        Self {
            start,
            end,
            label: format!("Last {} Days", days.max(1)),
            year_to_date: false,
        }
    }

    /// Creates the year-to-date period as of the given date.
    ///
    /// Bounds are canonical: January 1st of `as_of`'s year through `as_of`.
    pub fn year_to_date(as_of: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1)
            .unwrap_or(as_of);
        Self {
            start,
            end: as_of,
            label: YEAR_TO_DATE_TOKEN.to_owned(),
            year_to_date: true,
        }
    }

    /// Returns the inclusive start date.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the inclusive end date.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns the display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this is the distinguished year-to-date period.
    pub fn is_year_to_date(&self) -> bool {
        self.year_to_date
    }

    /// Returns the label used when deriving filenames: the quarter designator
    /// of the end date's month, or the literal year-to-date token.
    pub fn file_label(&self) -> String {
        if self.year_to_date {
            YEAR_TO_DATE_TOKEN.to_owned()
        } else {
            format!("Q{}", (self.end.month() - 1) / 3 + 1)
        }
    }
}
