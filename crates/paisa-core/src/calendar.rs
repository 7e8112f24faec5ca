//! Calendar-day arithmetic in one configured timezone
//!
//! Every "today" / "this month" decision goes through [`Calendar`] so the
//! dedupe window, alert freshness and monthly summaries agree on where a
//! day starts regardless of the host's local zone.

use chrono::{DateTime, Datelike, Days, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calendar {
    tz: Tz,
}

impl Calendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of an instant
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.date_of(a) == self.date_of(b)
    }

    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.midnight(self.date_of(instant))
    }

    /// Half-open `[start, end)` of the local day containing `instant`
    pub fn day_bounds(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.date_of(instant);
        let next = date.succ_opt().unwrap_or(date);
        (self.midnight(date), self.midnight(next))
    }

    pub fn start_of_month(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.midnight(first_of_month(self.date_of(instant)))
    }

    /// Half-open `[start, end)` of the local month containing `instant`
    pub fn month_bounds(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let first = first_of_month(self.date_of(instant));
        let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
        (self.midnight(first), self.midnight(next))
    }

    /// Local midnight of a calendar date
    pub fn start_of_date(&self, date: NaiveDate) -> DateTime<Utc> {
        self.midnight(date)
    }

    pub fn start_of_previous_month(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let first = first_of_month(self.date_of(instant));
        let last_of_previous = first - Days::new(1);
        self.midnight(first_of_month(last_of_previous))
    }

    /// "MMMM yyyy", e.g. "March 2025"
    pub fn month_label(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%B %Y").to_string()
    }

    fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            // Midnight skipped by a DST jump: the day starts an hour later
            LocalResult::None => {
                let shifted = naive + chrono::Duration::hours(1);
                self.tz
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| naive.and_utc())
            }
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}
