//! Periodic background jobs.
//!
//! Each registered [`Job`] gets its own task that runs it once per period
//! until the scheduler is told to stop. A failing run is logged and counted;
//! it never stops the job.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How often a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Seconds(u64),
    Minutes(u64),
}

impl JobFrequency {
    pub fn duration(&self) -> Duration {
        match *self {
            JobFrequency::Seconds(secs) => Duration::from_secs(secs),
            JobFrequency::Minutes(mins) => Duration::from_secs(mins * 60),
        }
    }
}

#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Label for logs and the run counter.
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    async fn execute(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Failure => "failure",
        }
    }
}

/// Execute `job` once, logging and counting the outcome.
pub async fn run_once(job: &dyn Job) -> RunOutcome {
    let name = job.name();
    let started = Instant::now();

    let outcome = match job.execute().await {
        Ok(()) => {
            debug!(job = name, elapsed_ms = started.elapsed().as_millis(), "Job completed");
            RunOutcome::Success
        }
        Err(e) => {
            error!(job = name, elapsed_ms = started.elapsed().as_millis(), error = %e, "Job failed");
            RunOutcome::Failure
        }
    };

    metrics::counter!("background_job_runs_total", "job" => name, "outcome" => outcome.as_str())
        .increment(1);
    outcome
}

/// Runs `job` every period until `stop` flips to true. The first run happens
/// one period after start.
async fn job_loop(job: Arc<dyn Job>, mut stop: watch::Receiver<bool>) {
    let period = job.frequency().duration();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    // A slow run delays the next one instead of triggering a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(job = job.name(), period_secs = period.as_secs(), "Job scheduled");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(job.as_ref()).await;
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!(job = job.name(), "Job stopped");
                    return;
                }
            }
        }
    }
}

pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            stop_tx,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name()).collect()
    }

    /// Spawn one task per registered job.
    pub fn start(&mut self) {
        info!(jobs = ?self.job_names(), "Starting background jobs");
        for job in &self.jobs {
            let handle = tokio::spawn(job_loop(Arc::clone(job), self.stop_tx.subscribe()));
            self.handles.push(handle);
        }
    }

    /// Signal every job to stop. Returns without waiting.
    pub fn shutdown(&self) {
        info!("Stopping background jobs");
        self.stop_tx.send_replace(true);
    }

    /// Wait for job tasks to finish, giving up after `timeout`.
    ///
    /// A run already in progress is allowed to finish.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Background job task panicked");
                }
            }
        };

        if tokio::time::timeout(timeout, all).await.is_err() {
            warn!(timeout_secs = timeout.as_secs(), "Background jobs did not stop in time");
        } else {
            info!("Background jobs stopped");
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingJob {
        fn new(fail: bool) -> (Self, Arc<AtomicUsize>) {
            let runs = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    runs: runs.clone(),
                    fail,
                },
                runs,
            )
        }
    }

    #[async_trait::async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn frequency(&self) -> JobFrequency {
            JobFrequency::Seconds(1)
        }

        async fn execute(&self) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("boom".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_frequency_duration() {
        assert_eq!(JobFrequency::Seconds(10).duration(), Duration::from_secs(10));
        assert_eq!(JobFrequency::Minutes(15).duration(), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_run_once_reports_outcome() {
        let (ok, ok_runs) = CountingJob::new(false);
        let (failing, failing_runs) = CountingJob::new(true);

        assert_eq!(run_once(&ok).await, RunOutcome::Success);
        assert_eq!(run_once(&failing).await, RunOutcome::Failure);
        assert_eq!(ok_runs.load(Ordering::SeqCst), 1);
        assert_eq!(failing_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register() {
        let mut scheduler = JobScheduler::default();
        assert!(scheduler.job_names().is_empty());
        scheduler.register(CountingJob::new(false).0);
        assert_eq!(scheduler.job_names(), vec!["counting"]);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_run() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = CountingJob::new(false);
        scheduler.register(job);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_job_keeps_running() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = CountingJob::new(true);
        scheduler.register(job);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }
}
