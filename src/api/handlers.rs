// HTTP request handlers for the job-trigger endpoints.

use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use std::time::SystemTime;

use crate::api::models::*;
use crate::jobs;
use crate::jobs::discover::DiscoverRequest;
use crate::store::Db;

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> Result<HttpResponse> {
    let db_status = match sqlx::query_scalar::<_, bool>("SELECT true")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let uptime = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: uptime,
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Discovery: phase 1 with an empty body, phase 2 when the body carries the
/// previous invocation's pending worklist.
pub async fn discover(
    db: web::Data<Db>,
    payload: Option<web::Json<DiscoverRequest>>,
) -> Result<HttpResponse> {
    let request = payload.map(|p| p.into_inner()).unwrap_or_default();
    tracing::info!(pending = request.pending_app_ids.len(), "discovery triggered");

    match jobs::discover::run(&db, request).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(HttpResponse::InternalServerError()
            .json(ApiResponse::<()>::error(e.to_string()))),
    }
}

/// A job summary already carries its own success flag and partial counters;
/// failures surface as 500 with those counters intact.
fn summary_response<T: Serialize>(success: bool, summary: T) -> HttpResponse {
    if success {
        HttpResponse::Ok().json(summary)
    } else {
        HttpResponse::InternalServerError().json(summary)
    }
}

pub async fn sync_libraries(db: web::Data<Db>) -> Result<HttpResponse> {
    tracing::info!("library sync triggered");
    let summary = jobs::libraries::run(&db).await;
    Ok(summary_response(summary.success, summary))
}

pub async fn sync_prices(db: web::Data<Db>) -> Result<HttpResponse> {
    tracing::info!("price sync triggered");
    let summary = jobs::prices::run(&db).await;
    Ok(summary_response(summary.success, summary))
}

pub async fn sync_trending(db: web::Data<Db>) -> Result<HttpResponse> {
    tracing::info!("trending sync triggered");
    let summary = jobs::trending::run(&db).await;
    Ok(summary_response(summary.success, summary))
}

pub async fn sync_player_counts(db: web::Data<Db>) -> Result<HttpResponse> {
    tracing::info!("player-count sync triggered");
    let summary = jobs::player_counts::run(&db).await;
    Ok(summary_response(summary.success, summary))
}

/// Most recent sync-log row, for the dashboard header.
pub async fn latest_sync(db: web::Data<Db>) -> Result<HttpResponse> {
    match db.latest_sync().await {
        Ok(log) => Ok(HttpResponse::Ok().json(ApiResponse::success(log))),
        Err(e) => Ok(HttpResponse::InternalServerError()
            .json(ApiResponse::<()>::error(e.to_string()))),
    }
}
