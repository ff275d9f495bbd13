//! Calendar transition rules

use chrono::Weekday as ChronoWeekday;

/// Which occurrence of the weekday within the month.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Week {
    Last,
    First,
    Second,
    Third,
    Fourth,
}

impl Week {
    /// Weeks to add after the first matching weekday (Last handled apart).
    #[inline]
    pub(crate) fn offset_weeks(self) -> u32 {
        match self {
            Week::First | Week::Last => 0,
            Week::Second => 1,
            Week::Third => 2,
            Week::Fourth => 3,
        }
    }
}

/// Day of week.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayOfWeek {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl DayOfWeek {
    #[inline]
    pub(crate) fn to_chrono(self) -> ChronoWeekday {
        match self {
            DayOfWeek::Sun => ChronoWeekday::Sun,
            DayOfWeek::Mon => ChronoWeekday::Mon,
            DayOfWeek::Tue => ChronoWeekday::Tue,
            DayOfWeek::Wed => ChronoWeekday::Wed,
            DayOfWeek::Thu => ChronoWeekday::Thu,
            DayOfWeek::Fri => ChronoWeekday::Fri,
            DayOfWeek::Sat => ChronoWeekday::Sat,
        }
    }
}

/// Month of year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    #[inline]
    pub(crate) fn number(self) -> u32 {
        self as u32 + 1
    }
}

/// When a standard or daylight regime begins, and what UTC offset it carries.
///
/// Immutable once constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRule {
    /// Short regime name, e.g. "CET".
    pub abbrev: &'static str,
    pub week: Week,
    pub day_of_week: DayOfWeek,
    pub month: Month,
    /// Hour of day the regime begins, 0-23.
    pub hour: u32,
    /// Offset from UTC in minutes while this regime is in effect.
    pub offset_minutes: i32,
}
