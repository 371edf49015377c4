//! Persian names and numerals for rendering Jalali dates.

/// Days of the week, in the Iranian week order (Saturday first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Saturday,
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub fn persian_name(self) -> &'static str {
        match self {
            Self::Saturday => "شنبه",
            Self::Sunday => "یک\u{200c}شنبه",
            Self::Monday => "دوشنبه",
            Self::Tuesday => "سه\u{200c}شنبه",
            Self::Wednesday => "چهارشنبه",
            Self::Thursday => "پنج\u{200c}شنبه",
            Self::Friday => "جمعه",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
        }
    }
}

/// Months of the Jalali calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Month {
    Farvardin,
    Ordibehesht,
    Khordad,
    Tir,
    Mordad,
    Shahrivar,
    Mehr,
    Aban,
    Azar,
    Dey,
    Bahman,
    Esfand,
}

impl Month {
    const ALL: [Month; 12] = [
        Self::Farvardin,
        Self::Ordibehesht,
        Self::Khordad,
        Self::Tir,
        Self::Mordad,
        Self::Shahrivar,
        Self::Mehr,
        Self::Aban,
        Self::Azar,
        Self::Dey,
        Self::Bahman,
        Self::Esfand,
    ];

    /// Month from its 1-based number.
    pub fn from_number(n: u32) -> Option<Self> {
        let idx = usize::try_from(n.checked_sub(1)?).ok()?;
        Self::ALL.get(idx).copied()
    }

    /// 1-based month number.
    #[cfg(test)]
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn persian_name(self) -> &'static str {
        match self {
            Self::Farvardin => "فروردین",
            Self::Ordibehesht => "اردیبهشت",
            Self::Khordad => "خرداد",
            Self::Tir => "تیر",
            Self::Mordad => "مرداد",
            Self::Shahrivar => "شهریور",
            Self::Mehr => "مهر",
            Self::Aban => "آبان",
            Self::Azar => "آذر",
            Self::Dey => "دی",
            Self::Bahman => "بهمن",
            Self::Esfand => "اسفند",
        }
    }
}

/// Replace ASCII digits with Persian digits (۰–۹); everything else is kept.
pub fn to_persian_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_u32('۰' as u32 + d).unwrap_or(c),
            None => c,
        })
        .collect()
}
