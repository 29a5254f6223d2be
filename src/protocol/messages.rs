// src/protocol/messages.rs
// Typed views over the Wyoming event kinds the bridge speaks

use serde_json::json;

use super::event::Event;

pub const DESCRIBE: &str = "describe";
pub const INFO: &str = "info";
pub const TRANSCRIBE: &str = "transcribe";
pub const TRANSCRIPT: &str = "transcript";
pub const TRANSCRIPT_START: &str = "transcript-start";
pub const TRANSCRIPT_CHUNK: &str = "transcript-chunk";
pub const TRANSCRIPT_STOP: &str = "transcript-stop";
pub const HANDLED: &str = "handled";
pub const SYNTHESIZE: &str = "synthesize";
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

/// Languages advertised in the `info` reply.
pub const LANGUAGES: &[&str] = &["en", "ru", "de", "fr", "es", "it", "pt", "nl", "pl", "uk"];

/// Inbound events, as the connection state machine sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Describe,
    /// Final transcript text.
    Transcript { text: String, language: Option<String> },
    /// Streaming partial text, only logged.
    TranscriptChunk { text: String },
    Ping { text: Option<String> },
    /// Anything else: transcribe requests, transcript start/stop, audio.
    Ignored(String),
}

impl Inbound {
    pub fn from_event(event: &Event) -> Self {
        match event.kind.as_str() {
            DESCRIBE => Inbound::Describe,
            TRANSCRIPT => Inbound::Transcript {
                text: event.str_field("text").unwrap_or_default().to_string(),
                language: event.str_field("language").map(str::to_string),
            },
            TRANSCRIPT_CHUNK => Inbound::TranscriptChunk {
                text: event.str_field("text").unwrap_or_default().to_string(),
            },
            PING => Inbound::Ping {
                text: event.str_field("text").map(str::to_string),
            },
            other => Inbound::Ignored(other.to_string()),
        }
    }
}

/// Which event kind carries a spoken reply back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReplyKind {
    /// `handled`, the reply a Wyoming handle service sends.
    #[default]
    Handled,
    /// `synthesize`, a text-to-speech directive.
    Synthesize,
}

impl ReplyKind {
    pub fn event_type(self) -> &'static str {
        match self {
            ReplyKind::Handled => HANDLED,
            ReplyKind::Synthesize => SYNTHESIZE,
        }
    }
}

pub fn reply(kind: ReplyKind, text: &str) -> Event {
    Event::with_data(kind.event_type(), json!({ "text": text }))
}

pub fn pong(text: Option<&str>) -> Event {
    match text {
        Some(text) => Event::with_data(PONG, json!({ "text": text })),
        None => Event::new(PONG),
    }
}

/// The `info` answer to `describe`: one handle program with one model.
pub fn info() -> Event {
    let attribution = json!({
        "name": "OpenClaw",
        "url": "https://github.com/openclaw/openclaw",
    });
    let version = env!("CARGO_PKG_VERSION");

    Event::with_data(
        INFO,
        json!({
            "handle": [{
                "name": "openclaw",
                "description": "OpenClaw AI Assistant + Home Assistant Control",
                "attribution": attribution,
                "installed": true,
                "version": version,
                "models": [{
                    "name": "openclaw",
                    "description": "OpenClaw multilingual assistant",
                    "attribution": attribution,
                    "installed": true,
                    "version": version,
                    "languages": LANGUAGES,
                }],
            }],
        }),
    )
}
