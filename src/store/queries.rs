use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

use super::models::{Game, GameUpsert, Player, PlayerGame, SyncLog};
use super::Db;

/// The store caps a single select; full-table reads paginate past it so the
/// client always sees the complete logical result set.
const PAGE_SIZE: i64 = 1000;

/// Lightweight worklist row for rotation jobs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkItem {
    pub id: i64,
    pub steam_app_id: i64,
    pub name: String,
}

impl Db {
    pub async fn fetch_players(&self) -> Result<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT * FROM players ORDER BY is_primary DESC, name",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch players")?;
        Ok(players)
    }

    pub async fn update_player_avatar(&self, player_id: i64, avatar_url: &str) -> Result<()> {
        sqlx::query(
            "UPDATE players SET avatar_url = $1, last_synced_at = now() WHERE id = $2",
        )
        .bind(avatar_url)
        .bind(player_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn fetch_all_games(&self) -> Result<Vec<Game>> {
        let mut all = Vec::new();
        let mut offset: i64 = 0;
        loop {
            let page = sqlx::query_as::<_, Game>(
                "SELECT * FROM games ORDER BY name LIMIT $1 OFFSET $2",
            )
            .bind(PAGE_SIZE)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch games page")?;
            let n = page.len() as i64;
            all.extend(page);
            if n < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        Ok(all)
    }

    #[instrument(skip(self))]
    pub async fn fetch_all_player_games(&self) -> Result<Vec<PlayerGame>> {
        let mut all = Vec::new();
        let mut offset: i64 = 0;
        loop {
            let page = sqlx::query_as::<_, PlayerGame>(
                "SELECT * FROM player_games ORDER BY id LIMIT $1 OFFSET $2",
            )
            .bind(PAGE_SIZE)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch player_games page")?;
            let n = page.len() as i64;
            all.extend(page);
            if n < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        Ok(all)
    }

    pub async fn existing_app_ids(&self) -> Result<HashSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT steam_app_id FROM games")
            .fetch_all(&self.pool)
            .await
            .context("failed to read known app ids")?;
        Ok(ids.into_iter().collect())
    }

    /// steam_app_id -> internal game id, for joining ownership edges.
    pub async fn app_id_index(&self) -> Result<HashMap<i64, i64>> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT steam_app_id, id FROM games")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Insert-or-replace a game keyed by its storefront app id. All columns
    /// the enrichment path fetches are written; columns owned by the narrow
    /// sync jobs (best price, trending, player counts) are left alone.
    #[instrument(skip(self, game), fields(app_id = game.steam_app_id))]
    pub async fn upsert_game(&self, game: &GameUpsert) -> Result<()> {
        sqlx::query(
            "INSERT INTO games (
                steam_app_id, name, header_image_url, description,
                is_multiplayer, max_players, supports_linux, protondb_rating,
                steam_review_score, steam_review_desc, steam_review_count,
                steam_price_cents, is_free, is_on_sale, sale_percent,
                release_date, is_coming_soon, steam_tags, categories,
                last_updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,now())
            ON CONFLICT (steam_app_id) DO UPDATE SET
                name = EXCLUDED.name,
                header_image_url = EXCLUDED.header_image_url,
                description = EXCLUDED.description,
                is_multiplayer = EXCLUDED.is_multiplayer,
                max_players = EXCLUDED.max_players,
                supports_linux = EXCLUDED.supports_linux,
                protondb_rating = EXCLUDED.protondb_rating,
                steam_review_score = EXCLUDED.steam_review_score,
                steam_review_desc = EXCLUDED.steam_review_desc,
                steam_review_count = EXCLUDED.steam_review_count,
                steam_price_cents = EXCLUDED.steam_price_cents,
                is_free = EXCLUDED.is_free,
                is_on_sale = EXCLUDED.is_on_sale,
                sale_percent = EXCLUDED.sale_percent,
                release_date = EXCLUDED.release_date,
                is_coming_soon = EXCLUDED.is_coming_soon,
                steam_tags = EXCLUDED.steam_tags,
                categories = EXCLUDED.categories,
                last_updated_at = now()",
        )
        .bind(game.steam_app_id)
        .bind(&game.name)
        .bind(&game.header_image_url)
        .bind(&game.description)
        .bind(game.is_multiplayer)
        .bind(game.max_players)
        .bind(game.supports_linux)
        .bind(&game.protondb_rating)
        .bind(game.steam_review_score)
        .bind(&game.steam_review_desc)
        .bind(game.steam_review_count)
        .bind(game.steam_price_cents)
        .bind(game.is_free)
        .bind(game.is_on_sale)
        .bind(game.sale_percent)
        .bind(game.release_date)
        .bind(game.is_coming_soon)
        .bind(&game.steam_tags)
        .bind(&game.categories)
        .execute(&self.pool)
        .await
        .with_context(|| format!("upsert failed for app {}", game.steam_app_id))?;
        Ok(())
    }

    /// One ownership edge per (player, game); replayed syncs overwrite
    /// playtime in place.
    pub async fn upsert_player_game(
        &self,
        player_id: i64,
        game_id: i64,
        playtime_hours: f64,
        last_played_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO player_games (player_id, game_id, playtime_hours, last_played_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (player_id, game_id) DO UPDATE SET
                playtime_hours = EXCLUDED.playtime_hours,
                last_played_at = EXCLUDED.last_played_at",
        )
        .bind(player_id)
        .bind(game_id)
        .bind(playtime_hours)
        .bind(last_played_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Price-sync rotation: stalest first, Linux-capable paid games only.
    pub async fn price_sync_worklist(&self, limit: i64) -> Result<Vec<WorkItem>> {
        let items = sqlx::query_as::<_, WorkItem>(
            "SELECT id, steam_app_id, name FROM games
             WHERE supports_linux AND NOT servers_deprecated AND NOT is_free
             ORDER BY last_updated_at ASC NULLS FIRST
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to read price worklist")?;
        Ok(items)
    }

    pub async fn set_best_price(
        &self,
        game_id: i64,
        cents: i64,
        store: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE games SET best_price_cents = $1, best_price_store = $2,
                 best_price_url = $3, last_updated_at = now()
             WHERE id = $4",
        )
        .bind(cents)
        .bind(store)
        .bind(url)
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn reset_trending_scores(&self) -> Result<u64> {
        let res = sqlx::query(
            "UPDATE games SET trending_score = NULL WHERE trending_score IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Returns true when a row was updated (the app id was known).
    pub async fn set_trending_score(&self, steam_app_id: i64, score: i32) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE games SET trending_score = $1 WHERE steam_app_id = $2",
        )
        .bind(score)
        .bind(steam_app_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_trending_score_by_id(&self, game_id: i64, score: i32) -> Result<()> {
        sqlx::query("UPDATE games SET trending_score = $1 WHERE id = $2")
            .bind(score)
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Niche-but-active titles missing from the ranked trending list.
    pub async fn active_untrending_games(&self, min_players: i32, limit: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM games
             WHERE trending_score IS NULL AND current_players > $1
             ORDER BY current_players DESC
             LIMIT $2",
        )
        .bind(min_players)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Player-count rotation: stalest check first so every game is
    /// eventually revisited.
    pub async fn player_count_worklist(&self, limit: i64) -> Result<Vec<WorkItem>> {
        let items = sqlx::query_as::<_, WorkItem>(
            "SELECT id, steam_app_id, name FROM games
             ORDER BY player_count_updated_at ASC NULLS FIRST
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to read player-count worklist")?;
        Ok(items)
    }

    pub async fn set_current_players(&self, game_id: i64, count: i32) -> Result<()> {
        sqlx::query(
            "UPDATE games SET current_players = $1, player_count_updated_at = now()
             WHERE id = $2",
        )
        .bind(count)
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Gateway miss: stamp the check so the rotation advances, keep the
    /// last known count.
    pub async fn touch_player_count_checked(&self, game_id: i64) -> Result<()> {
        sqlx::query("UPDATE games SET player_count_updated_at = now() WHERE id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn open_sync_log(&self, sync_type: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sync_log (sync_type, status) VALUES ($1, 'running') RETURNING id",
        )
        .bind(sync_type)
        .fetch_one(&self.pool)
        .await
        .context("failed to open sync_log row")?;
        Ok(id)
    }

    pub async fn close_sync_log(
        &self,
        log_id: i64,
        status: &str,
        error: Option<&str>,
        games_updated: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE sync_log SET status = $1, error = $2, games_updated = $3,
                 finished_at = now()
             WHERE id = $4",
        )
        .bind(status)
        .bind(error)
        .bind(games_updated)
        .bind(log_id)
        .execute(&self.pool)
        .await
        .context("failed to close sync_log row")?;
        Ok(())
    }

    pub async fn latest_sync(&self) -> Result<Option<SyncLog>> {
        let log = sqlx::query_as::<_, SyncLog>(
            "SELECT * FROM sync_log ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }
}
