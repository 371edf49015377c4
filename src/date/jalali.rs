//! Gregorian → Jalali (solar Hijri) date conversion.
//!
//! Uses the 33-year-cycle arithmetic with the table of cycle "breaks"
//! (Borkowski), which matches the astronomical calendar for Jalali years
//! -61 through 3177.

use chrono::{Datelike, NaiveDate};

use super::persian::{Month, Weekday};
use super::DateError;

/// Jalali years at which the leap-year cycle shifts.
const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

/// A civil date in the Jalali calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JalaliDate {
    pub year: i32,
    pub month: Month,
    /// Day of month, 1-based.
    pub day: u32,
    pub weekday: Weekday,
}

/// Leap position and start of a Jalali year.
struct YearInfo {
    /// Years since the last leap year (0 means this year is leap).
    leap: i32,
    /// Gregorian year in which this Jalali year begins.
    gy: i32,
    /// Day of March on which 1 Farvardin falls.
    march: u32,
}

impl JalaliDate {
    /// Convert a proleptic Gregorian date.
    ///
    /// # Errors
    ///
    /// [`DateError::OutOfRange`] outside the years the breaks table covers.
    pub fn from_gregorian(date: NaiveDate) -> Result<Self, DateError> {
        let mut jy = date.year() - 621;
        let info = year_info(jy)?;
        let farvardin_1 = NaiveDate::from_ymd_opt(info.gy, 3, info.march)
            .ok_or(DateError::OutOfRange(jy))?;

        let mut k = (date - farvardin_1).num_days();
        if k >= 0 {
            if k <= 185 {
                return Self::build(jy, 1 + k / 31, k % 31 + 1, date);
            }
            k -= 186;
        } else {
            // Still in the previous Jalali year, whose last month is Esfand.
            jy -= 1;
            k += 179;
            if info.leap == 1 {
                k += 1;
            }
        }
        Self::build(jy, 7 + k / 30, k % 30 + 1, date)
    }

    fn build(year: i32, month: i64, day: i64, gregorian: NaiveDate) -> Result<Self, DateError> {
        let month = u32::try_from(month)
            .ok()
            .and_then(Month::from_number)
            .ok_or(DateError::OutOfRange(year))?;
        let day = u32::try_from(day).map_err(|_| DateError::OutOfRange(year))?;

        Ok(Self {
            year,
            month,
            day,
            weekday: Weekday::from(gregorian.weekday()),
        })
    }
}

fn year_info(jy: i32) -> Result<YearInfo, DateError> {
    let first = BREAKS[0];
    let last = BREAKS[BREAKS.len() - 1];
    if jy < first || jy >= last {
        return Err(DateError::OutOfRange(jy));
    }

    let gy = jy + 621;
    let mut leap_j = -14;
    let mut jp = first;
    let mut jump = 0;

    for &jm in &BREAKS[1..] {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + jump % 33 / 4;
        jp = jm;
    }

    let mut n = jy - jp;
    leap_j += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }

    let leap_g = gy / 4 - (gy / 100 + 1) * 3 / 4 - 150;
    let march = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }

    let march = u32::try_from(march).map_err(|_| DateError::OutOfRange(jy))?;
    Ok(YearInfo { leap, gy, march })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_leap_year(jy: i32) -> Result<bool, DateError> {
        Ok(year_info(jy)?.leap == 0)
    }

    fn jalali(y: i32, m: u32, d: u32) -> JalaliDate {
        JalaliDate::from_gregorian(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    fn ymd(date: JalaliDate) -> (i32, u32, u32) {
        (date.year, date.month.number(), date.day)
    }

    #[test]
    fn nowruz_dates() {
        assert_eq!(ymd(jalali(2023, 3, 21)), (1402, 1, 1));
        assert_eq!(ymd(jalali(2024, 3, 20)), (1403, 1, 1));
        assert_eq!(ymd(jalali(2025, 3, 21)), (1404, 1, 1));
        assert_eq!(ymd(jalali(2021, 3, 21)), (1400, 1, 1));
    }

    #[test]
    fn last_day_of_common_and_leap_years() {
        // 1402 is a common year, 1403 and 1399 are leap years.
        assert_eq!(ymd(jalali(2024, 3, 19)), (1402, 12, 29));
        assert_eq!(ymd(jalali(2025, 3, 20)), (1403, 12, 30));
        assert_eq!(ymd(jalali(2021, 3, 20)), (1399, 12, 30));
    }

    #[test]
    fn second_half_of_year() {
        // Shahrivar has 31 days, Mehr starts the 30-day months.
        assert_eq!(ymd(jalali(2024, 9, 21)), (1403, 6, 31));
        assert_eq!(ymd(jalali(2024, 9, 22)), (1403, 7, 1));
        assert_eq!(ymd(jalali(2024, 1, 1)), (1402, 10, 11));
        assert_eq!(ymd(jalali(2025, 2, 19)), (1403, 12, 1));
    }

    #[test]
    fn weekday_follows_gregorian_date() {
        assert_eq!(jalali(2024, 3, 20).weekday, Weekday::Wednesday);
        assert_eq!(jalali(2024, 1, 1).weekday, Weekday::Monday);
        assert_eq!(jalali(2025, 3, 21).weekday, Weekday::Friday);
    }

    #[test]
    fn leap_years() {
        assert!(is_leap_year(1399).unwrap());
        assert!(is_leap_year(1403).unwrap());
        assert!(!is_leap_year(1402).unwrap());
        assert!(!is_leap_year(1404).unwrap());
    }

    #[test]
    fn out_of_table_is_an_error() {
        let far = NaiveDate::from_ymd_opt(4000, 1, 1).unwrap();
        assert!(matches!(
            JalaliDate::from_gregorian(far),
            Err(DateError::OutOfRange(_))
        ));
    }
}
