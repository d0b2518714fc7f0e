//! Per-visitor session state: the cart and the pending-order marker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::cart::SessionCart;

pub mod in_memory;
pub mod redis;

pub use self::in_memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;

/// Opaque session identifier carried in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn generate() -> Self {
        SessionKey(Uuid::new_v4().simple().to_string())
    }

    /// Accepts a client-supplied key only if it looks like one we issued
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = (16..=64).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_alphanumeric());
        valid.then(|| SessionKey(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order waiting for payment, set at checkout and cleared on payment success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub cart: SessionCart,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<PendingOrder>,
}

/// Session persistence. Concurrent writers for the same key race; the last
/// write wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns an empty session when the key is unknown
    async fn load(&self, key: &SessionKey) -> Result<SessionData, ServiceError>;
    async fn save(&self, key: &SessionKey, data: &SessionData) -> Result<(), ServiceError>;
    async fn clear(&self, key: &SessionKey) -> Result<(), ServiceError>;
}
