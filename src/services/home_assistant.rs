//! Home Assistant REST client
//!
//! Covers the three calls voice commands need:
//! - `POST /api/services/{domain}/{service}`
//! - `GET /api/states/{entity_id}`
//! - `GET /api/states`
//!
//! Every call is a single request bounded by the client's timeout, with no
//! retry.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::DeviceBackend;
use crate::error::BackendError;
use crate::utils::truncate_for_log;

const SERVICE: &str = "Home Assistant";

/// One entity as returned by the states endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    /// Friendly name, or the entity id when none is set.
    pub fn friendly_name(&self) -> &str {
        self.attributes
            .get("friendly_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.entity_id.as_str())
    }

    /// The domain part of the entity id (`light` in `light.kitchen`).
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }
}

pub struct HomeAssistantClient {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl HomeAssistantClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Home Assistant error {}: {}", status, truncate_for_log(&body, 200));
            return Err(BackendError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout, e))
    }
}

#[async_trait]
impl DeviceBackend for HomeAssistantClient {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        extra: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);

        let mut body = Map::new();
        if !entity_id.is_empty() {
            body.insert("entity_id".into(), Value::String(entity_id.to_string()));
        }
        body.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!("Calling {}.{} on {}", domain, service, entity_id);
        self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn get_state(&self, entity_id: &str) -> Result<EntityState, BackendError> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        debug!("Fetching state of {}", entity_id);
        self.get_json(&url).await
    }

    async fn get_states(&self) -> Result<Vec<EntityState>, BackendError> {
        let url = format!("{}/api/states", self.base_url);
        let states: Vec<EntityState> = self.get_json(&url).await?;
        debug!("Fetched {} entity states", states.len());
        Ok(states)
    }
}
