pub mod tasks;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, TimeZone};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::error::Result;

pub use tasks::{ImageCleanupJob, PublishScheduledJob, SessionCleanupJob};

/// A recurring background pass. `run` does one complete pass and is what
/// tests call directly.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Schedule {
    Every(Duration),
    /// Once a day at this local time of day.
    DailyAt(NaiveTime),
}

/// Spawns jobs on their own tasks and stops them when shutdown is signalled.
pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Schedules `job`. With `run_at_start` the first pass happens immediately.
    pub fn spawn(&mut self, job: Arc<dyn Job>, schedule: Schedule, run_at_start: bool) {
        let shutdown = self.shutdown_tx.subscribe();
        tracing::info!("Scheduling job {} ({:?})", job.name(), schedule);

        let handle = match schedule {
            Schedule::Every(period) => tokio::spawn(run_every(job, period, run_at_start, shutdown)),
            Schedule::DailyAt(time) => tokio::spawn(run_daily(job, time, run_at_start, shutdown)),
        };
        self.handles.push(handle);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        tracing::info!("Background jobs stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_pass(job: &dyn Job) {
    if let Err(e) = job.run().await {
        tracing::error!("Job {} failed: {}", job.name(), e);
    }
}

async fn run_every(
    job: Arc<dyn Job>,
    period: Duration,
    run_at_start: bool,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The first tick completes immediately
    if !run_at_start {
        ticker.tick().await;
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => run_pass(job.as_ref()).await,
        }
    }
}

async fn run_daily(
    job: Arc<dyn Job>,
    time: NaiveTime,
    run_at_start: bool,
    mut shutdown: watch::Receiver<bool>,
) {
    if run_at_start {
        run_pass(job.as_ref()).await;
    }

    loop {
        let wait = delay_until(time, Local::now());
        tracing::debug!("Job {} next runs in {}s", job.name(), wait.as_secs());

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(wait) => run_pass(job.as_ref()).await,
        }
    }
}

/// Time from `now` until the next occurrence of `time` on the local clock.
pub fn delay_until<Tz: TimeZone>(time: NaiveTime, now: DateTime<Tz>) -> Duration {
    let tz = now.timezone();
    let today = now.date_naive().and_time(time);

    let next = tz
        .from_local_datetime(&today)
        .earliest()
        .filter(|candidate| *candidate > now)
        .or_else(|| {
            let tomorrow = today + chrono::Duration::days(1);
            tz.from_local_datetime(&tomorrow).earliest()
        });

    match next {
        Some(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
        // The wall-clock time does not exist tomorrow either; try again in a day
        None => Duration::from_secs(24 * 60 * 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_delay_until_later_today() {
        let two_am = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        assert_eq!(delay_until(two_am, at(1, 30)), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_delay_until_rolls_to_tomorrow() {
        let two_am = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        assert_eq!(delay_until(two_am, at(2, 0)), Duration::from_secs(24 * 60 * 60));
        assert_eq!(delay_until(two_am, at(3, 0)), Duration::from_secs(23 * 60 * 60));
    }

    struct CountingJob(AtomicUsize);

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_job_runs_until_shutdown() {
        let job = Arc::new(CountingJob(AtomicUsize::new(0)));
        let mut scheduler = Scheduler::new();
        scheduler.spawn(job.clone(), Schedule::Every(Duration::from_secs(60)), true);

        tokio::time::sleep(Duration::from_secs(150)).await;
        scheduler.shutdown().await;

        // Immediately, then at 60s and 120s
        assert_eq!(job.0.load(Ordering::SeqCst), 3);
    }
}
