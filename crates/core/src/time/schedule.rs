use crate::config::Settings;
use crate::domain::comic::ScheduledTick;
use chrono::{NaiveTime, Timelike};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Time from `now` until the next multiple of `period` counted from midnight.
///
/// Always strictly positive: at an exact boundary the following one is returned.
pub fn delay_until_next_boundary(now: NaiveTime, period: Duration) -> Duration {
    let period_ms = period.as_millis().max(1);
    let now_ms = u128::from(now.num_seconds_from_midnight()) * 1000
        + u128::from(now.nanosecond().min(999_999_999) / 1_000_000);
    let next_ms = (now_ms / period_ms + 1) * period_ms;
    Duration::from_millis(u64::try_from(next_ms - now_ms).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    pub first_delay: Duration,
    pub period: Duration,
}

impl Scheduler {
    pub fn immediate(period: Duration) -> Self {
        Self {
            first_delay: Duration::ZERO,
            period,
        }
    }

    pub fn aligned(now: NaiveTime, period: Duration) -> Self {
        Self {
            first_delay: delay_until_next_boundary(now, period),
            period,
        }
    }

    pub fn from_settings(settings: &Settings, now: NaiveTime) -> Self {
        if settings.align_ticks {
            Self::aligned(now, settings.tick_period())
        } else {
            Self::immediate(settings.tick_period())
        }
    }

    /// Emits ticks until the receiving side is dropped.
    ///
    /// Sending never waits on pipeline work; the receiver is expected to spawn per tick.
    pub async fn run(self, tx: mpsc::Sender<ScheduledTick>) {
        let start = Instant::now() + self.first_delay;
        let mut interval = tokio::time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            first_delay_secs = self.first_delay.as_secs(),
            period_secs = self.period.as_secs(),
            "scheduler started"
        );

        loop {
            interval.tick().await;
            let tick = ScheduledTick::now();
            tracing::debug!(fired_at = %tick.fired_at, "tick");
            if tx.send(tick).await.is_err() {
                tracing::info!("tick receiver dropped; scheduler stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn aligns_to_next_even_hour() {
        assert_eq!(delay_until_next_boundary(hm(10, 15), TWO_HOURS), Duration::from_secs(105 * 60));
        assert_eq!(delay_until_next_boundary(hm(11, 15), TWO_HOURS), Duration::from_secs(45 * 60));
        assert_eq!(delay_until_next_boundary(hm(23, 30), TWO_HOURS), Duration::from_secs(30 * 60));
    }

    #[test]
    fn exact_boundary_waits_a_full_period() {
        assert_eq!(delay_until_next_boundary(hm(10, 0), TWO_HOURS), TWO_HOURS);
        assert_eq!(delay_until_next_boundary(hm(0, 0), TWO_HOURS), TWO_HOURS);
    }

    #[test]
    fn counts_sub_minute_precision() {
        let now = NaiveTime::from_hms_milli_opt(11, 59, 59, 500).unwrap();
        assert_eq!(delay_until_next_boundary(now, TWO_HOURS), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_scheduler_fires_at_startup() {
        let (tx, mut rx) = mpsc::channel(4);
        let started = Instant::now();
        tokio::spawn(Scheduler::immediate(TWO_HOURS).run(tx));

        rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exactly_one_tick_per_period_after_startup() {
        let (tx, mut rx) = mpsc::channel(4);
        let scheduler = Scheduler {
            first_delay: Duration::from_secs(45 * 60),
            period: TWO_HOURS,
        };
        let started = Instant::now();
        tokio::spawn(scheduler.run(tx));

        rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(45 * 60));

        for _ in 0..3 {
            let window_start = Instant::now();
            let early = tokio::time::timeout(TWO_HOURS - Duration::from_secs(1), rx.recv()).await;
            assert!(early.is_err(), "tick fired before the period elapsed");

            rx.recv().await.unwrap();
            assert_eq!(window_start.elapsed(), TWO_HOURS);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = tokio::spawn(Scheduler::immediate(TWO_HOURS).run(tx));
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
