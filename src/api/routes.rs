// API route configuration

use actix_web::web;

use crate::api::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no auth required)
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // API v1 routes (authenticated when a secret is configured)
        .service(
            web::scope("/api/v1")
                .route("/jobs/discover", web::post().to(handlers::discover))
                .route("/jobs/libraries", web::post().to(handlers::sync_libraries))
                .route("/jobs/prices", web::post().to(handlers::sync_prices))
                .route("/jobs/trending", web::post().to(handlers::sync_trending))
                .route(
                    "/jobs/player-counts",
                    web::post().to(handlers::sync_player_counts),
                )
                .route("/sync/latest", web::get().to(handlers::latest_sync)),
        );
}
