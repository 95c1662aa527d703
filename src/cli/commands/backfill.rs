use crate::config::Config;
use crate::services::ResolveError;
use crate::state::SharedState;

pub async fn cmd_backfill_show(config: Config, show_id: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    println!("Backfilling artwork for show {show_id}...");

    let report = match state.pipeline.backfill_show(show_id).await {
        Ok(report) => report,
        Err(ResolveError::NotFound(_)) => {
            println!("Show not found: {show_id}");
            return Ok(());
        }
    };

    match report.secondary_id {
        Some(id) => println!("TVMaze show:       {id}"),
        None => {
            println!("No TVMaze match found; nothing to backfill.");
            return Ok(());
        }
    }
    println!("Episodes checked:  {}", report.episodes_checked);
    println!("Artwork found:     {}", report.artwork_found);

    Ok(())
}
