// src/intent/mod.rs
// Utterance classification: device control vs. free-form conversation
//
// Rules are tried in declaration order and the first one that produces a
// command wins. Anything no rule claims is a conversation.

pub mod domain;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

pub use domain::{Domain, entity_id};

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    DeviceControl(DeviceCommand),
    Conversation { text: String },
}

/// A command Home Assistant can answer directly.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// `turn_on` / `turn_off` on the entity named by `target`.
    Turn {
        domain: Domain,
        on: bool,
        target: String,
        extra: Map<String, Value>,
    },
    /// Read one entity's state.
    State { domain: Domain, target: String },
    /// Read every entity, optionally narrowed to one domain and one state.
    ListStates {
        domain: Option<Domain>,
        filter: Option<String>,
    },
}

impl DeviceCommand {
    /// The Home Assistant service (or read operation) this command maps to.
    pub fn service(&self) -> &'static str {
        match self {
            DeviceCommand::Turn { on: true, .. } => "turn_on",
            DeviceCommand::Turn { on: false, .. } => "turn_off",
            DeviceCommand::State { .. } => "get_state",
            DeviceCommand::ListStates { .. } => "get_states",
        }
    }

    pub fn domain(&self) -> Option<Domain> {
        match self {
            DeviceCommand::Turn { domain, .. } | DeviceCommand::State { domain, .. } => Some(*domain),
            DeviceCommand::ListStates { domain, .. } => *domain,
        }
    }

    /// The device or area phrase as spoken.
    pub fn target(&self) -> Option<&str> {
        match self {
            DeviceCommand::Turn { target, .. } | DeviceCommand::State { target, .. } => Some(target),
            DeviceCommand::ListStates { .. } => None,
        }
    }

    /// Entity id derived from the spoken target.
    pub fn entity_id(&self) -> Option<String> {
        match self {
            DeviceCommand::Turn { domain, target, .. } | DeviceCommand::State { domain, target } => {
                Some(entity_id(*domain, target))
            }
            DeviceCommand::ListStates { .. } => None,
        }
    }

    /// Short phrase naming the attempted action, used in replies.
    pub fn describe(&self) -> String {
        match self {
            DeviceCommand::Turn { on, target, .. } => {
                format!("turn {} the {}", if *on { "on" } else { "off" }, target)
            }
            DeviceCommand::State { target, .. } => format!("check the {}", target),
            DeviceCommand::ListStates { .. } => "list your devices".to_string(),
        }
    }
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures<'_>) -> Option<DeviceCommand>,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, build: fn(&Captures<'_>) -> Option<DeviceCommand>) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("valid regex"),
            build,
        }
    }

    fn apply(&self, text: &str) -> Option<DeviceCommand> {
        self.pattern.captures(text).and_then(|caps| (self.build)(&caps))
    }
}

const LEVEL: &str = r"(?:\s+(?:to|at)\s+(\d{1,3})\s*(?:%|percent))?";

static RE_POLITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:please|hey|ok|okay|can you|could you|would you)[,\s]+)+").expect("valid regex")
});

// More specific rules first: order is the tie-break.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "turn-prefix",
            &format!(r"^(?:turn|switch)\s+(on|off)\s+(?:the\s+)?(.+?){}$", LEVEL),
            |caps| turn(&caps[1], &caps[2], caps.get(3).map(|m| m.as_str())),
        ),
        Rule::new(
            "turn-suffix",
            &format!(r"^(?:turn|switch)\s+(?:the\s+)?(.+?)\s+(on|off){}$", LEVEL),
            |caps| turn(&caps[2], &caps[1], caps.get(3).map(|m| m.as_str())),
        ),
        Rule::new(
            "list-which",
            r"^(?:what|which)\s+(devices|things|entities|lights|switches|plugs|fans|covers|blinds)\s+are\s+(on|off|open|closed)$",
            |caps| list(Some(&caps[1]), Some(&caps[2])),
        ),
        Rule::new(
            "list-anything",
            r"^(?:what's|what\s+is|is\s+anything)\s+(on|off|open)$",
            |caps| list(None, Some(&caps[1])),
        ),
        Rule::new(
            "list-all",
            r"^(?:list|show)(?:\s+me)?(?:\s+all)?(?:\s+the)?(?:\s+my)?\s+(devices|entities|states|lights|switches|fans|covers)$",
            |caps| list(Some(&caps[1]), None),
        ),
        Rule::new(
            "state-of",
            r"^what(?:'s|\s+is)\s+the\s+(?:state|status)\s+of\s+(?:the\s+)?(.+)$",
            |caps| state(&caps[1]),
        ),
        Rule::new(
            "state-is",
            r"^is\s+(?:the\s+)?(.+?)\s+(?:on|off|open|closed)$",
            |caps| state(&caps[1]),
        ),
    ]
});

fn turn(direction: &str, target: &str, level: Option<&str>) -> Option<DeviceCommand> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    let on = direction == "on";
    let domain = Domain::resolve(target)?;

    let mut extra = Map::new();
    if on && domain == Domain::Light {
        if let Some(level) = level.and_then(|l| l.parse::<u64>().ok()) {
            extra.insert("brightness_pct".into(), Value::from(level.min(100)));
        }
    }

    Some(DeviceCommand::Turn {
        domain,
        on,
        target: target.to_string(),
        extra,
    })
}

fn state(target: &str) -> Option<DeviceCommand> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    Some(DeviceCommand::State {
        domain: Domain::resolve(target)?,
        target: target.to_string(),
    })
}

fn list(noun: Option<&str>, filter: Option<&str>) -> Option<DeviceCommand> {
    Some(DeviceCommand::ListStates {
        domain: noun.and_then(Domain::from_noun),
        filter: filter.map(str::to_string),
    })
}

/// Lower-case, trim, drop trailing punctuation and polite openers.
fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('\u{2019}', "'");
    let trimmed = lowered.trim_end_matches(['.', '!', '?', ' ']);
    let stripped = RE_POLITE.replace(trimmed, "");
    let stripped = stripped.trim();
    let stripped = stripped.strip_suffix(" please").unwrap_or(stripped);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify an utterance. Never fails: unmatched text is a conversation.
pub fn classify(text: &str) -> Intent {
    let normalized = normalize(text);

    for rule in RULES.iter() {
        if let Some(command) = rule.apply(&normalized) {
            tracing::debug!("Intent rule '{}' matched: {}", rule.name, command.service());
            return Intent::DeviceControl(command);
        }
    }

    Intent::Conversation {
        text: text.to_string(),
    }
}
