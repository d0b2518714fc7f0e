use async_trait::async_trait;
use dashmap::DashMap;

use super::{SessionData, SessionKey, SessionStore};
use crate::errors::ServiceError;

/// Process-local session store. Sessions do not expire and are lost on
/// restart; intended for development and tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<SessionData, ServiceError> {
        match self.sessions.get(key.as_str()) {
            Some(raw) => Ok(serde_json::from_str(raw.value())?),
            None => Ok(SessionData::default()),
        }
    }

    async fn save(&self, key: &SessionKey, data: &SessionData) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(data)?;
        self.sessions.insert(key.as_str().to_string(), raw);
        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), ServiceError> {
        self.sessions.remove(key.as_str());
        Ok(())
    }
}
