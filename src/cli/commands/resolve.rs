use crate::config::Config;
use crate::services::{RefreshMode, ResolveError};
use crate::state::SharedState;

pub async fn cmd_resolve(
    config: Config,
    reference: &str,
    mode: RefreshMode,
) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    if mode.shows_loading_indicator() {
        println!("Resolving {reference}...");
    }

    let resolved = match state.orchestrator.run(reference, mode).await {
        Ok(resolved) => resolved,
        Err(ResolveError::NotFound(_)) => {
            println!("Episode not found: {reference}");
            return Ok(());
        }
    };

    let episode = &resolved.episode;
    let show = &resolved.show;

    println!("Episode");
    println!("{:-<60}", "");
    println!("Show:        {}", show.title);
    println!("Episode:     {} - {}", episode.label(), episode.title);
    println!("ID:          {}", episode.id);
    if let Some(rating) = episode.rating {
        println!("Rating:      {rating:.1}");
    }
    println!(
        "Artwork:     {}",
        episode.artwork_url.as_deref().unwrap_or("(none)")
    );
    println!();
    println!("Cross references");
    println!("  Trakt:     {}", show.trakt_id);
    println!("  TVMaze:    {}", display_opt(show.tvmaze_id));
    println!("  IMDb:      {}", show.imdb_id.as_deref().unwrap_or("-"));
    println!("  TVDB:      {}", display_opt(show.tvdb_id));

    Ok(())
}

fn display_opt(value: Option<i32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
