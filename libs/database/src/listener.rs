use anyhow::Error;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::{error, info, trace};

/// Forwards `NOTIFY` payloads published on a Postgres channel to every subscriber.
///
/// Payloads are expected to be JSON and are deserialized into `T` before being broadcast.
/// A payload that fails to deserialize is logged and dropped.
pub struct PostgresDBListener<T: Clone> {
  channel: String,
  notify: broadcast::Sender<T>,
}

impl<T> PostgresDBListener<T>
where
  T: Clone + DeserializeOwned + Send + 'static,
{
  pub async fn new(pg_pool: &PgPool, channel: &str) -> Result<Self, Error> {
    let mut listener = PgListener::connect_with(pg_pool).await?;
    listener.listen(channel).await?;
    info!("listening on postgres channel: {}", channel);

    let (tx, _) = broadcast::channel(1000);
    let notify = tx.clone();
    let channel_name = channel.to_string();
    tokio::spawn(async move {
      loop {
        match listener.recv().await {
          Ok(notification) => {
            trace!(
              "[{}] received notification: {}",
              channel_name,
              notification.payload()
            );
            match serde_json::from_str::<T>(notification.payload()) {
              Ok(change) => {
                let _ = tx.send(change);
              },
              Err(err) => {
                error!(
                  "[{}] failed to deserialize change: {:?}, payload: {}",
                  channel_name,
                  err,
                  notification.payload()
                );
              },
            }
          },
          Err(err) => {
            error!("[{}] stop listening: {}", channel_name, err);
            break;
          },
        }
      }
    });

    Ok(Self {
      channel: channel.to_string(),
      notify,
    })
  }

  pub fn channel(&self) -> &str {
    &self.channel
  }

  pub fn subscribe(&self) -> broadcast::Receiver<T> {
    self.notify.subscribe()
  }
}
