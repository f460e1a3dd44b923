use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_sync_all(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let result = state.sync.sync_all().await?;

    println!();
    println!("{:-<70}", "");
    println!("Steam library sync complete");
    println!("  Succeeded:    {}", result.succeeded);
    println!("  Failed:       {}", result.failed);
    println!("  Games synced: {}", result.total_games_synced);

    for failure in &result.errors {
        println!(
            "  ! account {} ({}): {}",
            failure.account_id, failure.steam_id, failure.error
        );
    }

    Ok(())
}

pub async fn cmd_sync_prices(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let result = state.prices.backfill_missing_prices().await?;

    println!();
    println!("{:-<70}", "");
    println!("Price backfill complete");
    println!("  Selected:  {}", result.total);
    println!("  Priced:    {}", result.succeeded);
    println!("  Unpriced:  {}", result.failed);

    if let Some(error) = &result.error {
        println!("  Steam request failed: {error}");
    }

    Ok(())
}
