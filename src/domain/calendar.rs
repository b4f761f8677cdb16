//! Month arithmetic for calendar navigation and grid layout.
//!
//! Months are 0-based (January = 0) everywhere in the calendar, matching the
//! `m` query parameter and the `month` columns in storage.

use serde::Serialize;
use time::{Date, Month};

use super::{error::DomainError, language::Language};

/// Earliest year a calendar grid can be laid out for.
pub const MIN_YEAR: i32 = -9999;
/// Latest year a calendar grid can be laid out for.
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> Result<Self, DomainError> {
        if month > 11 {
            return Err(DomainError::validation(format!(
                "month index {month} is outside 0..=11"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn previous(self) -> Self {
        if self.month == 0 {
            Self {
                year: self.year - 1,
                month: 11,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 11 {
            Self {
                year: self.year + 1,
                month: 0,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn month_label(self, language: Language) -> &'static str {
        language.month_name(self.month)
    }

    /// Storage representation of the month column.
    pub fn month_i32(self) -> i32 {
        i32::from(self.month)
    }

    fn calendar_month(self) -> Result<Month, DomainError> {
        Month::try_from(self.month + 1).map_err(|_| DomainError::DateOutOfRange {
            year: self.year,
            month: self.month,
        })
    }

    pub fn first_day(self) -> Result<Date, DomainError> {
        Date::from_calendar_date(self.year, self.calendar_month()?, 1).map_err(|_| {
            DomainError::DateOutOfRange {
                year: self.year,
                month: self.month,
            }
        })
    }

    pub fn days_in_month(self) -> Result<u8, DomainError> {
        let month = self.calendar_month()?;
        self.first_day()?;
        Ok(month.length(self.year))
    }

    /// Weeks of the month, Sunday first. Leading and trailing cells outside the
    /// month are `None`.
    pub fn weeks(self) -> Result<Vec<[Option<u8>; 7]>, DomainError> {
        let offset = usize::from(self.first_day()?.weekday().number_days_from_sunday());
        let days = usize::from(self.days_in_month()?);

        let cells = (offset + days).div_ceil(7) * 7;
        let mut weeks = Vec::with_capacity(cells / 7);
        let mut week = [None; 7];
        for index in 0..cells {
            let day = index
                .checked_sub(offset)
                .filter(|day| *day < days)
                .and_then(|day| u8::try_from(day + 1).ok());
            week[index % 7] = day;
            if index % 7 == 6 {
                weeks.push(week);
                week = [None; 7];
            }
        }
        Ok(weeks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    #[test]
    fn rejects_month_outside_range() {
        assert!(YearMonth::new(2024, 12).is_err());
        assert!(YearMonth::new(2024, 11).is_ok());
    }

    #[test]
    fn next_and_previous_roll_the_year() {
        assert_eq!(ym(2024, 11).next(), ym(2025, 0));
        assert_eq!(ym(2025, 0).previous(), ym(2024, 11));
        assert_eq!(ym(2024, 5).next(), ym(2024, 6));
        assert_eq!(ym(2024, 5).previous(), ym(2024, 4));
    }

    #[test]
    fn navigation_round_trips_for_every_month() {
        for year in [1999, 2024, 2025] {
            for month in 0..12 {
                let current = ym(year, month);
                assert_eq!(current.next().previous(), current);
                assert_eq!(current.previous().next(), current);
            }
        }
    }

    #[test]
    fn month_label_follows_language() {
        assert_eq!(ym(2024, 0).month_label(Language::En), "January");
        assert_eq!(ym(2024, 0).month_label(Language::Pt), "Janeiro");
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(ym(2024, 1).days_in_month().expect("days"), 29);
        assert_eq!(ym(2023, 1).days_in_month().expect("days"), 28);
        assert_eq!(ym(2024, 11).days_in_month().expect("days"), 31);
    }

    #[test]
    fn weeks_place_days_under_their_weekday() {
        // 1 September 2024 was a Sunday; 30 days.
        let weeks = ym(2024, 8).weeks().expect("grid");
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][0], Some(1));
        assert_eq!(weeks[4][1], Some(30));
        assert_eq!(weeks[4][2], None);

        // 1 February 2024 was a Thursday; leap year.
        let weeks = ym(2024, 1).weeks().expect("grid");
        assert_eq!(weeks[0][3], None);
        assert_eq!(weeks[0][4], Some(1));
        assert_eq!(weeks.last().and_then(|week| week[4]), Some(29));
    }

    #[test]
    fn grid_fails_outside_supported_years() {
        assert!(ym(MAX_YEAR + 1, 0).weeks().is_err());
    }
}
