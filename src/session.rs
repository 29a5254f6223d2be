// src/session.rs

/// Conversation identity shared by every connection.
///
/// The gateway keeps the conversation history; the bridge only attaches the
/// same correlation key to every request so turns thread together. The key is
/// fixed at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_id: Option<String>,
    agent_id: String,
    key: String,
}

impl Session {
    pub fn new(session_id: Option<String>, agent_id: impl Into<String>) -> Self {
        let session_id = session_id.filter(|id| !id.trim().is_empty());
        let key = match &session_id {
            Some(id) => format!("voice-{}", id),
            None => "voice-default".to_string(),
        };

        Self {
            session_id,
            agent_id: agent_id.into(),
            key,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Value of the session correlation header.
    pub fn correlation_key(&self) -> &str {
        &self.key
    }

    /// Gateway model name selecting the agent persona.
    pub fn model(&self) -> String {
        format!("openclaw:{}", self.agent_id)
    }
}
