use chrono::{Datelike, NaiveDate};
use rand::Rng;

/// Number of days in `month` (1-based) of `year`, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Picks a calendar date in `[min, today]`.
///
/// Year, month and day are drawn one after another, each uniformly within the bounds left
/// open by the previous draw. Dates in the boundary years are therefore over-represented
/// compared to a flat draw over the whole range; this skew is kept on purpose.
///
/// A `today` earlier than `min` collapses the range to `min`.
pub fn random_date<R: Rng>(rng: &mut R, min: NaiveDate, today: NaiveDate) -> NaiveDate {
    let today = today.max(min);

    let year = rng.gen_range(min.year()..=today.year());

    let month_lo = if year == min.year() { min.month() } else { 1 };
    let month_hi = if year == today.year() { today.month() } else { 12 };
    let month = rng.gen_range(month_lo..=month_hi);

    let day_lo = if year == min.year() && month == min.month() {
        min.day()
    } else {
        1
    };
    let day_hi = if year == today.year() && month == today.month() {
        today.day()
    } else {
        days_in_month(year, month)
    };
    let day = rng.gen_range(day_lo..=day_hi);

    // Every bound above is a real day of (year, month), so this cannot fail.
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(min)
}

#[derive(Debug, Clone, Copy)]
pub struct RandomDateGenerator {
    pub min_date: NaiveDate,
}

impl RandomDateGenerator {
    pub fn new(min_date: NaiveDate) -> Self {
        Self { min_date }
    }

    pub fn generate(&self, today: NaiveDate) -> NaiveDate {
        random_date(&mut rand::thread_rng(), self.min_date, today)
    }

    pub fn generate_with<R: Rng>(&self, rng: &mut R, today: NaiveDate) -> NaiveDate {
        random_date(rng, self.min_date, today)
    }

    /// Accepts an operator-supplied date only if it lies within `[min_date, today]`.
    pub fn validate(&self, date: NaiveDate, today: NaiveDate) -> anyhow::Result<NaiveDate> {
        anyhow::ensure!(
            date >= self.min_date,
            "date {date} is before the first archive date {}",
            self.min_date
        );
        anyhow::ensure!(date <= today, "date {date} is in the future (today is {today})");
        Ok(date)
    }
}
