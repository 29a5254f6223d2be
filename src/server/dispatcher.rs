// src/server/dispatcher.rs
// Turns one final transcript into one reply text
//
// Shared by every connection. Holds the session and the two backends, none of
// which carry per-call state. Backend failures never escape: they become a
// spoken apology so the caller always gets a reply.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::BackendError;
use crate::intent::{DeviceCommand, Domain, Intent, classify, entity_id};
use crate::protocol::ReplyKind;
use crate::services::{ConversationBackend, DeviceBackend, EntityState, GatewayClient, HomeAssistantClient};
use crate::session::Session;
use crate::utils::{join_spoken, truncate_for_log, with_timeout};

pub const NOT_HEARD: &str = "Sorry, I didn't catch that.";
pub const GATEWAY_APOLOGY: &str = "Sorry, I couldn't reach the assistant right now.";

/// At most this many entities are read out in a listing.
pub const MAX_LISTED: usize = 20;

/// Extra time on top of a client's own timeout before the call is abandoned.
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

pub struct Dispatcher {
    session: Session,
    devices: Option<Arc<dyn DeviceBackend>>,
    conversation: Arc<dyn ConversationBackend>,
    reply_kind: ReplyKind,
    device_deadline: Duration,
    conversation_deadline: Duration,
}

impl Dispatcher {
    pub fn new(session: Session, conversation: Arc<dyn ConversationBackend>) -> Self {
        Self {
            session,
            devices: None,
            conversation,
            reply_kind: ReplyKind::default(),
            device_deadline: Duration::from_secs(10) + DEADLINE_GRACE,
            conversation_deadline: Duration::from_secs(60) + DEADLINE_GRACE,
        }
    }

    /// Build the dispatcher and its HTTP clients from validated configuration.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let session = Session::new(config.session_id.clone(), config.agent_id.clone());
        let gateway = GatewayClient::new(&config.gateway_url, &config.gateway_token, config.gateway_timeout())?;

        let mut dispatcher = Self::new(session, Arc::new(gateway))
            .with_reply_kind(config.reply_event)
            .with_deadlines(
                config.ha_timeout() + DEADLINE_GRACE,
                config.gateway_timeout() + DEADLINE_GRACE,
            );

        if let Some(ha) = config.home_assistant() {
            let client = HomeAssistantClient::new(&ha.url, &ha.token, config.ha_timeout())?;
            info!("HA client initialized for direct device control");
            dispatcher = dispatcher.with_devices(Arc::new(client));
        }

        Ok(dispatcher)
    }

    pub fn with_devices(mut self, devices: Arc<dyn DeviceBackend>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn with_reply_kind(mut self, reply_kind: ReplyKind) -> Self {
        self.reply_kind = reply_kind;
        self
    }

    pub fn with_deadlines(mut self, device: Duration, conversation: Duration) -> Self {
        self.device_deadline = device;
        self.conversation_deadline = conversation;
        self
    }

    pub fn reply_kind(&self) -> ReplyKind {
        self.reply_kind
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn has_device_control(&self) -> bool {
        self.devices.is_some()
    }

    /// Produce the spoken reply for a final transcript. Always returns text.
    pub async fn respond(&self, text: &str) -> String {
        if text.trim().is_empty() {
            debug!("Empty transcript");
            return NOT_HEARD.to_string();
        }

        match classify(text) {
            Intent::DeviceControl(command) => match &self.devices {
                Some(devices) => self.control(devices.as_ref(), &command).await,
                None => {
                    debug!("No Home Assistant configured, sending '{}' to the gateway", command.service());
                    self.converse(text).await
                }
            },
            Intent::Conversation { text } => self.converse(&text).await,
        }
    }

    async fn control(&self, devices: &dyn DeviceBackend, command: &DeviceCommand) -> String {
        let outcome = with_timeout(
            self.device_deadline,
            run_device_command(devices, command),
            "Home Assistant",
        )
        .await;

        match outcome {
            Ok(reply) => {
                info!("Direct HA response: {}", truncate_for_log(&reply, 200));
                reply
            }
            Err(e) => {
                warn!("Device command '{}' failed: {}", command.describe(), e);
                format!("Sorry, I couldn't {}.", command.describe())
            }
        }
    }

    async fn converse(&self, text: &str) -> String {
        let outcome = with_timeout(
            self.conversation_deadline,
            self.conversation.ask(&self.session, text),
            "gateway",
        )
        .await;

        match outcome {
            Ok(reply) => {
                info!("Gateway response: {}", truncate_for_log(&reply, 200));
                reply
            }
            Err(e) => {
                warn!("Gateway request failed: {}", e);
                GATEWAY_APOLOGY.to_string()
            }
        }
    }
}

async fn run_device_command(
    devices: &dyn DeviceBackend,
    command: &DeviceCommand,
) -> Result<String, BackendError> {
    match command {
        DeviceCommand::Turn {
            domain,
            on,
            target,
            extra,
        } => {
            let entity = entity_id(*domain, target);
            devices
                .call_service(domain.as_str(), command.service(), &entity, extra)
                .await?;

            let mut reply = format!("Done, I turned {} the {}", if *on { "on" } else { "off" }, target);
            if let Some(level) = extra.get("brightness_pct") {
                reply.push_str(&format!(" at {} percent", level));
            }
            reply.push('.');
            Ok(reply)
        }
        DeviceCommand::State { domain, target } => {
            let state = devices.get_state(&entity_id(*domain, target)).await?;
            Ok(format!("{} is {}.", state.friendly_name(), spoken(&state.state)))
        }
        DeviceCommand::ListStates { domain, filter } => {
            let states = devices.get_states().await?;
            Ok(describe_states(&states, *domain, filter.as_deref()))
        }
    }
}

/// Read out entities, narrowed to one domain (or every device domain) and
/// optionally to one state. Filtering happens here; the API has no filter.
pub fn describe_states(states: &[EntityState], domain: Option<Domain>, filter: Option<&str>) -> String {
    let matching: Vec<&EntityState> = states
        .iter()
        .filter(|s| match domain {
            Some(domain) => s.domain() == domain.as_str(),
            None => Domain::ALL.iter().any(|d| s.domain() == d.as_str()),
        })
        .filter(|s| filter.is_none_or(|f| s.state == f))
        .collect();

    if matching.is_empty() {
        return match filter {
            Some(f) => format!("Nothing is {} right now.", f),
            None => "I couldn't find any devices.".to_string(),
        };
    }

    let listed = &matching[..matching.len().min(MAX_LISTED)];
    let mut reply = match filter {
        Some(f) => {
            let names: Vec<String> = listed.iter().map(|s| s.friendly_name().to_string()).collect();
            let verb = if matching.len() == 1 { "is" } else { "are" };
            format!("{} {} {}.", join_spoken(&names), verb, f)
        }
        None => {
            let entries: Vec<String> = listed
                .iter()
                .map(|s| format!("{} is {}", s.friendly_name(), spoken(&s.state)))
                .collect();
            format!("{}.", join_spoken(&entries))
        }
    };

    if matching.len() > MAX_LISTED {
        reply.push_str(&format!(" And {} more.", matching.len() - MAX_LISTED));
    }
    reply
}

fn spoken(state: &str) -> String {
    state.replace('_', " ")
}
