// Operator CLI: run ingestion jobs once, or print the current picks.

use anyhow::Result;
use clap::{Parser, Subcommand};

use game_night::engine::config::{load_config, AppConfig};
use game_night::engine::filters::{apply_filters, FilterContext, FilterState, Tab};
use game_night::engine::registers::{ExclusionRegister, ShortlistRegister};
use game_night::engine::score::recommendation_score;
use game_night::engine::sort::{effective_stack, sort_games};
use game_night::engine::view::{default_selection, DashboardView};
use game_night::jobs;
use game_night::jobs::discover::{DiscoverRequest, DiscoverResponse};
use game_night::store::Db;
use game_night::util::env as env_util;
use game_night::util::kv::KvStore;

#[derive(Parser)]
#[command(name = "gn", about = "game-night sync jobs and picks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover new titles and enrich them until the worklist drains
    Discover,
    /// Sync every player's library and ownership edges
    Libraries,
    /// Refresh best third-party prices for a rotation slice
    Prices,
    /// Re-derive trending scores from the ranked most-played list
    Trending,
    /// Refresh live concurrent-player counts for a rotation slice
    PlayerCounts,
    /// Print tonight's picks for the selected players
    Picks {
        /// Tab to render (all, trending, new, shortlisted, excluded)
        #[arg(long, default_value = "all")]
        tab: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Substring filter on the game name
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    game_night::tracing::init_tracing("info,sqlx=warn")?;
    env_util::init_env();

    let db = Db::connect(&env_util::db_url()?).await?;
    let cli = Cli::parse();

    match cli.command {
        Command::Discover => run_discover(&db).await?,
        Command::Libraries => {
            let summary = jobs::libraries::run(&db).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Prices => {
            let summary = jobs::prices::run(&db).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Trending => {
            let summary = jobs::trending::run(&db).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::PlayerCounts => {
            let summary = jobs::player_counts::run(&db).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Picks { tab, limit, search } => run_picks(&db, &tab, limit, search).await?,
    }

    Ok(())
}

/// Drive the continuation protocol until the remainder is empty.
async fn run_discover(db: &Db) -> Result<()> {
    let mut response = jobs::discover::run(db, DiscoverRequest::default()).await?;
    let mut total_added = 0usize;
    loop {
        let pending = match response {
            DiscoverResponse::Discovered {
                total_discovered,
                pending_app_ids,
                ..
            } => {
                println!("discovered {total_discovered} titles, {} new", pending_app_ids.len());
                pending_app_ids
            }
            DiscoverResponse::Processing {
                results,
                pending_app_ids,
                added,
                ..
            } => {
                for outcome in &results {
                    match &outcome.reason {
                        Some(reason) => println!("  skip {} ({reason})", outcome.name),
                        None => println!("  add  {}", outcome.name),
                    }
                }
                total_added += added;
                pending_app_ids
            }
        };
        if pending.is_empty() {
            break;
        }
        response = jobs::discover::run(
            db,
            DiscoverRequest {
                pending_app_ids: pending,
            },
        )
        .await?;
    }
    println!("done, {total_added} added");
    Ok(())
}

async fn run_picks(db: &Db, tab: &str, limit: usize, search: Option<String>) -> Result<()> {
    let tab: Tab = serde_json::from_value(serde_json::Value::String(tab.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown tab {tab}"))?;

    let kv = KvStore::from_env()?;
    let config: AppConfig = load_config(&kv);
    let shortlist = ShortlistRegister::load(kv.clone());
    let excluded = ExclusionRegister::load(kv);

    let view = DashboardView::new(db.clone());
    view.refresh().await?;
    let snapshot = view.snapshot();

    let selected = default_selection(&snapshot.players);
    let games = view.enriched(&selected);

    let mut filters = FilterState::for_tab(tab, &config.resolve(tab));
    filters.selected_players = selected.clone();
    if let Some(q) = search {
        filters.search_query = q;
    }

    let shortlisted = shortlist.ids();
    let excluded_ids = excluded.ids();
    let ctx = FilterContext {
        tab,
        shortlisted: &shortlisted,
        excluded: &excluded_ids,
        now: chrono::Utc::now(),
    };
    let outcome = apply_filters(&games, &filters, &ctx);
    let mut visible = outcome.games;
    let keys = effective_stack(&filters.sort_keys, tab);
    sort_games(&mut visible, &keys, selected.len());

    if let Some(sync) = &snapshot.latest_sync {
        println!(
            "last sync: {} {} at {}",
            sync.sync_type, sync.status, sync.started_at
        );
    }
    for g in visible.iter().take(limit) {
        println!(
            "{:>3}  {}  ({}/{} own)",
            recommendation_score(g, selected.len()),
            g.game.name,
            g.owner_count,
            selected.len(),
        );
    }
    Ok(())
}
