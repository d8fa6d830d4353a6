// HTTP API server binary: hosts the job-trigger endpoints.

use anyhow::Result;
use game_night::api::ApiServer;
use game_night::store::Db;
use game_night::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    game_night::tracing::init_tracing("info,sqlx=warn")?;

    env_util::init_env();

    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url()?;
    let db = Db::connect(&database_url).await?;

    server.run(db).await?;

    Ok(())
}
