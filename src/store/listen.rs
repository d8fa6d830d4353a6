//! Change-notification bridge. The schema installs statement-level triggers
//! that `pg_notify` the table name on the `table_changed` channel; this
//! module turns that into an mpsc stream the dashboard refresh loop drains.

use anyhow::Result;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use super::Db;

pub const CHANGE_CHANNEL: &str = "table_changed";

/// Spawns a background listener and returns the receiving end. Each message
/// is the name of a table whose rows changed; consumers re-fetch rather than
/// patching in place. Dropping the receiver shuts the listener down.
pub async fn subscribe_changes(db: &Db) -> Result<mpsc::UnboundedReceiver<String>> {
    let mut listener = PgListener::connect_with(&db.pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => {
                    if tx.send(notification.payload().to_string()).is_err() {
                        tracing::info!("change-feed consumer dropped, stopping listener");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "change-feed listener error, stopping");
                    break;
                }
            }
        }
    });

    Ok(rx)
}
