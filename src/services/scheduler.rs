use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::state::SharedState;

pub const SYNC_GAMES_JOB: &str = "sync-steam-games";
pub const SYNC_PRICES_JOB: &str = "sync-game-prices";

pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn run_sync_games(state: &SharedState) {
    let start = Instant::now();
    info!(
        event = "job_started",
        job_name = SYNC_GAMES_JOB,
        "Starting scheduled Steam library sync"
    );

    match state.sync.sync_all().await {
        Ok(result) => info!(
            event = "job_finished",
            job_name = SYNC_GAMES_JOB,
            succeeded = result.succeeded,
            failed = result.failed,
            total_games_synced = result.total_games_synced,
            duration_ms = elapsed_ms(start),
            "Scheduled Steam library sync finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = SYNC_GAMES_JOB,
            error = %e,
            duration_ms = elapsed_ms(start),
            "Scheduled Steam library sync failed"
        ),
    }
}

async fn run_sync_prices(state: &SharedState) {
    let start = Instant::now();
    info!(
        event = "job_started",
        job_name = SYNC_PRICES_JOB,
        "Starting scheduled price backfill"
    );

    match state.prices.backfill_missing_prices().await {
        Ok(result) => info!(
            event = "job_finished",
            job_name = SYNC_PRICES_JOB,
            succeeded = result.succeeded,
            failed = result.failed,
            total = result.total,
            duration_ms = elapsed_ms(start),
            "Scheduled price backfill finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = SYNC_PRICES_JOB,
            error = %e,
            duration_ms = elapsed_ms(start),
            "Scheduled price backfill failed"
        ),
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(state: Arc<SharedState>, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Blocks until [`Scheduler::stop`] is called. Must only be started once
    /// bootstrap has finished.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let state_for_games = Arc::clone(&self.state);
        let running_for_games = Arc::clone(&self.running);
        let games_job = Job::new_async(self.config.sync_games_cron.as_str(), move |_uuid, _lock| {
            let state = Arc::clone(&state_for_games);
            let running = Arc::clone(&running_for_games);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_sync_games(&state).await;
            })
        })?;

        let state_for_prices = Arc::clone(&self.state);
        let running_for_prices = Arc::clone(&self.running);
        let prices_job =
            Job::new_async(self.config.sync_prices_cron.as_str(), move |_uuid, _lock| {
                let state = Arc::clone(&state_for_prices);
                let running = Arc::clone(&running_for_prices);
                Box::pin(async move {
                    if !*running.read().await {
                        return;
                    }
                    run_sync_prices(&state).await;
                })
            })?;

        sched.add(games_job).await?;
        sched.add(prices_job).await?;
        sched.start().await?;

        info!(
            job_name = SYNC_GAMES_JOB,
            cron = %self.config.sync_games_cron,
            "Job scheduled"
        );
        info!(
            job_name = SYNC_PRICES_JOB,
            cron = %self.config.sync_prices_cron,
            "Job scheduled"
        );

        if self.config.run_on_startup {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                run_sync_games(&state).await;
                run_sync_prices(&state).await;
            });
        }

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }
}
