// src/config/mod.rs
// Process configuration: command line flags with environment fallbacks

use std::time::Duration;

use clap::Parser;
use tracing::info;
use url::Url;

use crate::error::ConfigError;
use crate::protocol::ReplyKind;

#[derive(Debug, Clone, Parser)]
#[command(name = "wyoming-bridge")]
#[command(about = "Wyoming server routing voice commands to Home Assistant or an OpenClaw gateway", long_about = None)]
pub struct BridgeConfig {
    /// Host to bind to
    #[arg(long, env = "BRIDGE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "BRIDGE_PORT", default_value_t = 10400)]
    pub port: u16,

    /// OpenClaw gateway URL
    #[arg(long, env = "GATEWAY_URL", default_value = "http://127.0.0.1:18789")]
    pub gateway_url: String,

    /// OpenClaw gateway auth token
    #[arg(long = "token", env = "GATEWAY_TOKEN", hide_env_values = true)]
    pub gateway_token: String,

    /// OpenClaw agent ID
    #[arg(long, env = "AGENT_ID", default_value = "main")]
    pub agent_id: String,

    /// Home Assistant URL (optional, enables direct device control)
    #[arg(long, env = "HA_URL")]
    pub ha_url: Option<String>,

    /// Home Assistant long-lived access token
    #[arg(long, env = "HA_TOKEN", hide_env_values = true)]
    pub ha_token: Option<String>,

    /// Session ID for context persistence on the gateway
    #[arg(long, env = "SESSION_ID")]
    pub session_id: Option<String>,

    /// Event type used for spoken replies
    #[arg(long, env = "REPLY_EVENT", value_enum, default_value_t = ReplyKind::Handled)]
    pub reply_event: ReplyKind,

    /// Home Assistant request timeout in seconds
    #[arg(long = "ha-timeout", env = "HA_TIMEOUT_SECS", default_value_t = 10)]
    pub ha_timeout_secs: u64,

    /// Gateway request timeout in seconds
    #[arg(long = "gateway-timeout", env = "GATEWAY_TIMEOUT_SECS", default_value_t = 60)]
    pub gateway_timeout_secs: u64,

    /// Enable debug logging
    #[arg(long, env = "BRIDGE_DEBUG", default_value_t = false)]
    pub debug: bool,
}

/// Home Assistant connection settings, present only when both URL and token are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeAssistantSettings {
    pub url: String,
    pub token: String,
}

impl BridgeConfig {
    /// Validate values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("gateway", &self.gateway_url)?;

        if self.gateway_token.trim().is_empty() {
            return Err(ConfigError::Empty("gateway token"));
        }
        if self.agent_id.trim().is_empty() {
            return Err(ConfigError::Empty("agent id"));
        }

        match (non_blank(&self.ha_url), non_blank(&self.ha_token)) {
            (Some(url), Some(_)) => check_url("Home Assistant", url)?,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    given: "Home Assistant URL",
                    missing: "a Home Assistant token",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    given: "Home Assistant token",
                    missing: "a Home Assistant URL",
                });
            }
            (None, None) => {}
        }

        if self.ha_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("Home Assistant timeout"));
        }
        if self.gateway_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("gateway timeout"));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        // Bare IPv6 hosts need brackets
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn home_assistant(&self) -> Option<HomeAssistantSettings> {
        match (non_blank(&self.ha_url), non_blank(&self.ha_token)) {
            (Some(url), Some(token)) => Some(HomeAssistantSettings {
                url: url.to_string(),
                token: token.to_string(),
            }),
            _ => None,
        }
    }

    pub fn ha_timeout(&self) -> Duration {
        Duration::from_secs(self.ha_timeout_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Log the effective configuration, without secrets.
    pub fn log_summary(&self) {
        info!("Starting Wyoming bridge on {}", self.bind_address());
        info!("Gateway URL: {}", self.gateway_url);
        info!("Agent ID: {}", self.agent_id);
        info!(
            "HA URL: {}",
            non_blank(&self.ha_url).unwrap_or("not configured")
        );
        info!(
            "Session ID: {}",
            non_blank(&self.session_id).unwrap_or("none")
        );
        info!("Reply event: {}", self.reply_event.event_type());
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
