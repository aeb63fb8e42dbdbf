//! Month-grid helpers for the admin calendar.

use chrono::{Datelike, NaiveDate};

pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

pub const DAY_NAMES: [&str; 7] = ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"];

/// Visual load tier for a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayLoad {
    Empty,
    Low,
    Medium,
    High,
}

impl DayLoad {
    pub fn for_count(count: i64) -> Self {
        if count == 0 {
            DayLoad::Empty
        } else if count <= 5 {
            DayLoad::Low
        } else if count <= 10 {
            DayLoad::Medium
        } else {
            DayLoad::High
        }
    }

    pub fn cell_class(self) -> &'static str {
        match self {
            DayLoad::Empty => "day day-empty",
            DayLoad::Low => "day day-low",
            DayLoad::Medium => "day day-medium",
            DayLoad::High => "day day-high",
        }
    }
}

/// First and last calendar day of the month, inclusive.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = next_month(year, month);
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    Some((first, last))
}

/// Cells for a Sunday-first month grid: `None` for the leading blanks
/// before day 1, then `Some(day)` for each day of the month.
pub fn month_grid(year: i32, month: u32) -> Vec<Option<u32>> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };

    let offset = first.weekday().num_days_from_sunday() as usize;
    let mut cells = vec![None; offset];
    cells.extend((1..=last.day()).map(Some));
    cells
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// `YYYY-MM-DD` for a day of the displayed month, the same format the
/// appointments table stores.
pub fn format_day(year: i32, month: u32, day: u32) -> String {
    format!("{year:04}-{month:02}-{day:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_tier_boundaries() {
        assert_eq!(DayLoad::for_count(0), DayLoad::Empty);
        assert_eq!(DayLoad::for_count(1), DayLoad::Low);
        assert_eq!(DayLoad::for_count(5), DayLoad::Low);
        assert_eq!(DayLoad::for_count(6), DayLoad::Medium);
        assert_eq!(DayLoad::for_count(10), DayLoad::Medium);
        assert_eq!(DayLoad::for_count(11), DayLoad::High);
    }

    #[test]
    fn grid_has_leading_blanks_for_the_first_weekday() {
        // 2026-08-01 is a Saturday: six blanks before day 1.
        let cells = month_grid(2026, 8);
        assert_eq!(cells.len(), 6 + 31);
        assert!(cells[..6].iter().all(Option::is_none));
        assert_eq!(cells[6], Some(1));
        assert_eq!(cells.last(), Some(&Some(31)));

        // 2026-02-01 is a Sunday: no blanks at all.
        let february = month_grid(2026, 2);
        assert_eq!(february.len(), 28);
        assert_eq!(february[0], Some(1));
    }

    #[test]
    fn bounds_cover_the_whole_month() {
        let (first, last) = month_bounds(2024, 2).unwrap();
        assert_eq!(first.to_string(), "2024-02-01");
        assert_eq!(last.to_string(), "2024-02-29");

        let (first, last) = month_bounds(2026, 12).unwrap();
        assert_eq!(first.to_string(), "2026-12-01");
        assert_eq!(last.to_string(), "2026-12-31");
    }

    #[test]
    fn month_navigation_wraps_at_year_boundaries() {
        assert_eq!(prev_month(2026, 1), (2025, 12));
        assert_eq!(next_month(2026, 12), (2027, 1));
        assert_eq!(prev_month(2026, 8), (2026, 7));
        assert_eq!(next_month(2026, 8), (2026, 9));
    }

    #[test]
    fn day_formatting_pads_to_iso_dates() {
        assert_eq!(format_day(2026, 8, 7), "2026-08-07");
        assert_eq!(format_day(2026, 12, 31), "2026-12-31");
    }
}
