//! Rule resolution and UTC-to-local conversion

use chrono::{Datelike, NaiveDate};

use crate::rule::{DayOfWeek, Month, TransitionRule, Week};

/// Resolve the instant (Unix seconds, UTC) at which `rule` takes effect in
/// `year`.
///
/// For `Week::Last` the walk starts at the last day of the month and steps
/// backward one day at a time until the weekday matches. Otherwise it starts
/// at day 1, steps forward to the first matching weekday, then adds seven
/// days per week index. The day walk is deliberate: it is immune to the
/// off-by-one traps of closed-form weekday arithmetic.
pub fn resolve_transition(rule: &TransitionRule, year: i32) -> i64 {
    let target = rule.day_of_week.to_chrono();

    let date = if rule.week == Week::Last {
        // Day 0 of the following month, normalized to the last day of
        // rule.month.
        let next_month = match rule.month {
            Month::Dec => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            m => NaiveDate::from_ymd_opt(year, m.number() + 1, 1),
        };
        let mut date = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MIN);
        while date.weekday() != target {
            date = date.pred_opt().unwrap_or(NaiveDate::MIN);
        }
        date
    } else {
        let mut date = NaiveDate::from_ymd_opt(year, rule.month.number(), 1)
            .unwrap_or(NaiveDate::MIN);
        while date.weekday() != target {
            date = date.succ_opt().unwrap_or(NaiveDate::MAX);
        }
        date + chrono::Days::new(7 * rule.week.offset_weeks() as u64)
    };

    date.and_hms_opt(rule.hour.min(23), 0, 0)
        .unwrap_or_default()
        .and_utc()
        .timestamp()
}

/// One region's pair of transition rules. Immutable for the process lifetime.
#[derive(Clone, Copy, Debug)]
pub struct Timezone {
    standard: TransitionRule,
    daylight: TransitionRule,
}

impl Timezone {
    pub fn new(standard: TransitionRule, daylight: TransitionRule) -> Self {
        Timezone { standard, daylight }
    }

    /// Europe/Paris: CEST from the last Sunday of March 02:00 UTC, CET from
    /// the last Sunday of October 03:00 UTC.
    pub fn paris() -> Self {
        Timezone::new(
            TransitionRule {
                abbrev: "CET",
                week: Week::Last,
                day_of_week: DayOfWeek::Sun,
                month: Month::Oct,
                hour: 3,
                offset_minutes: 60,
            },
            TransitionRule {
                abbrev: "CEST",
                week: Week::Last,
                day_of_week: DayOfWeek::Sun,
                month: Month::Mar,
                hour: 2,
                offset_minutes: 120,
            },
        )
    }

    /// The rule in effect at `utc_secs`: whichever of this year's transitions
    /// was entered most recently, falling back to the previous year's
    /// later transition when neither has happened yet.
    pub fn active_rule(&self, utc_secs: i64) -> &TransitionRule {
        let Some(dt) = chrono::DateTime::from_timestamp(utc_secs, 0) else {
            // Out of chrono's range; standard time is the safe answer.
            return &self.standard;
        };
        let year = dt.year();

        let std_at = resolve_transition(&self.standard, year);
        let dst_at = resolve_transition(&self.daylight, year);

        if std_at < utc_secs && dst_at < utc_secs {
            return self.later_entered(std_at, dst_at);
        }
        if std_at < utc_secs {
            return &self.standard;
        }
        if dst_at < utc_secs {
            return &self.daylight;
        }

        // Before both transitions: the regime carried over from the end of
        // the previous year.
        let std_at = resolve_transition(&self.standard, year - 1);
        let dst_at = resolve_transition(&self.daylight, year - 1);
        self.later_entered(std_at, dst_at)
    }

    fn later_entered(&self, std_at: i64, dst_at: i64) -> &TransitionRule {
        if std_at < dst_at {
            &self.daylight
        } else {
            &self.standard
        }
    }

    /// UTC offset in minutes at the given instant.
    pub fn local_offset_minutes(&self, utc_secs: i64) -> i32 {
        self.active_rule(utc_secs).offset_minutes
    }

    /// Convert a UTC instant to the local wall-clock instant.
    pub fn to_local(&self, utc_secs: i64) -> i64 {
        utc_secs + self.local_offset_minutes(utc_secs) as i64 * 60
    }

    /// Regime abbreviation at the given instant, e.g. "CET" or "CEST".
    pub fn abbrev_at(&self, utc_secs: i64) -> &'static str {
        self.active_rule(utc_secs).abbrev
    }
}
