// src/services/mod.rs
// Backend seams used by the dispatcher, plus their HTTP implementations

pub mod gateway;
pub mod home_assistant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BackendError;
use crate::session::Session;

pub use gateway::GatewayClient;
pub use home_assistant::{EntityState, HomeAssistantClient};

/// Direct device control (Home Assistant).
///
/// Implementations hold no per-call state and are shared by every connection.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Invoke `domain.service` on an entity. Success means the call was
    /// accepted, not that the device changed.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        extra: &Map<String, Value>,
    ) -> Result<(), BackendError>;

    async fn get_state(&self, entity_id: &str) -> Result<EntityState, BackendError>;

    /// Every entity. There is no server-side filter; callers filter.
    async fn get_states(&self) -> Result<Vec<EntityState>, BackendError>;
}

/// Free-form conversation (the gateway).
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn ask(&self, session: &Session, text: &str) -> Result<String, BackendError>;
}
