use crate::config::Config;
use crate::db::Store;
use crate::scheduler;

pub async fn cmd_purge(config: &Config, retention_days: Option<i64>) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let retention_days = retention_days.unwrap_or(config.scheduler.retention_days);

    let report = scheduler::purge_expired(&store, retention_days).await?;

    println!("Purged {} rows:", report.total());
    println!("  Blacklisted tokens: {}", report.blacklisted_tokens);
    println!("  One-time tokens:    {}", report.one_time_tokens);
    println!("  Sessions:           {}", report.sessions);
    println!("  Login attempts:     {}", report.login_attempts);

    Ok(())
}
