use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::db::{PurgeReport, Store};

/// Deletes rows that expired more than `retention_days` ago.
pub async fn purge_expired(store: &Store, retention_days: i64) -> Result<PurgeReport> {
    let cutoff = Utc::now() - ChronoDuration::days(retention_days.max(0));
    let report = store.purge_expired(cutoff).await?;

    info!(
        blacklisted_tokens = report.blacklisted_tokens,
        one_time_tokens = report.one_time_tokens,
        sessions = report.sessions,
        login_attempts = report.login_attempts,
        "Maintenance purge finished"
    );

    Ok(report)
}

pub struct Scheduler {
    store: Store,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Store, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let running = Arc::clone(&self.running);
        let retention_days = self.config.retention_days;

        let job = Job::new_async(self.config.purge_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = purge_expired(&store, retention_days).await {
                    error!("Scheduled purge failed: {}", e);
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", self.config.purge_cron);

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
        *self.running.write().await = false;
        info!("Scheduler stopped");
    }
}
