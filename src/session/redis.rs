use async_trait::async_trait;
use std::time::Duration;
use tracing::error;

use super::{SessionData, SessionKey, SessionStore};
use crate::errors::ServiceError;

const KEY_PREFIX: &str = "storefront:session:";

/// Redis-backed sessions stored as JSON strings with a sliding TTL
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    ttl: Duration,
}

impl RedisSessionStore {
    pub fn new(redis_url: &str, ttl: Duration) -> Result<Self, ServiceError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, ttl })
    }

    fn redis_key(key: &SessionKey) -> String {
        format!("{}{}", KEY_PREFIX, key.as_str())
    }

    async fn connection(&self) -> Result<redis::aio::Connection, ServiceError> {
        self.client.get_async_connection().await.map_err(|e| {
            error!("Session store connection failed: {}", e);
            ServiceError::SessionError(e.to_string())
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<SessionData, ServiceError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::redis_key(key))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SessionData::default()),
        }
    }

    async fn save(&self, key: &SessionKey, data: &SessionData) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(data)?;
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(raw)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), ServiceError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(Self::redis_key(key))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
