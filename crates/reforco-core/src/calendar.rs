//! Calendar month arithmetic for the lessons calendar.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::cache::generate_cache_key;
use crate::models::Lesson;

/// Cache prefix for a month of lessons.
pub const CALENDAR_CACHE_PREFIX: &str = "calendario_aulas";

const MONTH_NAMES: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    year: i32,
    /// 1-based
    month: u32,
}

impl CalendarMonth {
    /// `None` unless `month` is 1..=12 and the year is representable.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::containing(chrono::Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of this month and first day of the next (exclusive bound).
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day(), self.next().first_day())
    }

    pub fn days_in_month(&self) -> u32 {
        let (first, next) = self.date_range();
        (next - first).num_days() as u32
    }

    /// Weekday of the 1st, Sunday = 0.
    pub fn first_weekday(&self) -> u32 {
        self.first_day().weekday().num_days_from_sunday()
    }

    pub fn name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// Key under which this month's lessons are cached, e.g.
    /// `calendario_aulas_ano:2024_mes:3`.
    pub fn cache_key(&self) -> String {
        generate_cache_key(
            CALENDAR_CACHE_PREFIX,
            [("ano", self.year.to_string()), ("mes", self.month.to_string())],
        )
    }

    /// Lessons of this month grouped by day of month. Lessons without a
    /// parseable date, or dated in another month, are skipped.
    pub fn group_by_day<'a>(&self, lessons: &'a [Lesson]) -> BTreeMap<u32, Vec<&'a Lesson>> {
        let mut days: BTreeMap<u32, Vec<&Lesson>> = BTreeMap::new();
        for lesson in lessons {
            if let Some(date) = lesson.date() {
                if Self::containing(date) == *self {
                    days.entry(date.day()).or_default().push(lesson);
                }
            }
        }
        days
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.year)
    }
}

impl FromStr for CalendarMonth {
    type Err = String;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in {:?}", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in {:?}", s))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in {:?}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn month(year: i32, month: u32) -> CalendarMonth {
        CalendarMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_new_validates_month() {
        assert!(CalendarMonth::new(2024, 0).is_none());
        assert!(CalendarMonth::new(2024, 13).is_none());
        assert!(CalendarMonth::new(2024, 12).is_some());
    }

    #[test]
    fn test_next_and_prev_wrap_year() {
        assert_eq!(month(2024, 12).next(), month(2025, 1));
        assert_eq!(month(2024, 1).prev(), month(2023, 12));
        assert_eq!(month(2024, 6).next().prev(), month(2024, 6));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(month(2024, 2).days_in_month(), 29);
        assert_eq!(month(2023, 2).days_in_month(), 28);
        assert_eq!(month(2024, 4).days_in_month(), 30);
        assert_eq!(month(2024, 12).days_in_month(), 31);
    }

    #[test]
    fn test_first_weekday() {
        // 1 March 2024 was a Friday
        assert_eq!(month(2024, 3).first_weekday(), 5);
        // 1 September 2024 was a Sunday
        assert_eq!(month(2024, 9).first_weekday(), 0);
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(month(2024, 3).cache_key(), "calendario_aulas_ano:2024_mes:3");
    }

    #[test]
    fn test_parse_and_display() {
        let parsed: CalendarMonth = "2024-03".parse().unwrap();
        assert_eq!(parsed, month(2024, 3));
        assert_eq!(parsed.to_string(), "Março 2024");
        assert!("2024".parse::<CalendarMonth>().is_err());
        assert!("2024-13".parse::<CalendarMonth>().is_err());
    }

    #[test]
    fn test_group_by_day_skips_other_months() {
        let lessons: Vec<Lesson> = serde_json::from_value(json!([
            {"id": 1, "data": "2024-03-04"},
            {"id": 2, "data": "2024-03-04"},
            {"id": 3, "data": "2024-03-20"},
            {"id": 4, "data": "2024-04-01"},
            {"id": 5}
        ]))
        .unwrap();

        let days = month(2024, 3).group_by_day(&lessons);

        assert_eq!(days.len(), 2);
        assert_eq!(days[&4].len(), 2);
        assert_eq!(days[&20][0].id, 3);
    }
}
