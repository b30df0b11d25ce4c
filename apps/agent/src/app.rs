//! Agent main loop: enumerate once, then fold tracker snapshots every tick.

use anyhow::Context;
use ubitrack_games::StaticCatalog;
use ubitrack_session::{Config, Session, StatusChange};
use ubitrack_status::Probes;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let catalog = match &config.catalog_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            StaticCatalog::from_json(&json)?
        }
        None => StaticCatalog::default(),
    };

    let mut session = Session::new(&config, Probes::system());
    if !session.client().is_installed() {
        tracing::warn!("launcher not found, waiting for it to be installed");
    }

    // -- Initial enumeration --
    let owned = session.get_owned_games(&catalog).await;
    tracing::info!(count = owned.len(), "owned games");
    for game in session.get_local_games() {
        tracing::info!(game = %game, status = %game.status, "local game");
    }

    session.start_tracking(config.poll_interval());

    // -- Main loop --
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut tick_count: u64 = 0;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
            _ = ticker.tick() => {
                tick_count += 1;

                let refresh = session.refresh_statuses();
                log_changes(&refresh.changes);
                if !refresh.new_games.is_empty() {
                    for game in session.add_new_games(&catalog, refresh.new_games).await {
                        tracing::info!(game = %game, "new owned game");
                    }
                }

                if tick_count % config.launcher_refresh_ticks == 0 {
                    session.refresh_launcher();
                }
                if tick_count % config.ownership_check_ticks == 0 {
                    log_changes(&session.sync_tracked_games());
                    session.reparse_if_ownership_changed();
                }
            }
        }
    }

    session.stop_tracking();
    Ok(())
}

fn log_changes(changes: &[StatusChange]) {
    for change in changes {
        tracing::info!(
            game_id = %change.game_id,
            name = %change.name,
            status = %change.status,
            "status changed"
        );
    }
}
