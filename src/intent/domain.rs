// src/intent/domain.rs
// Home Assistant domain guessing and entity id derivation

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ENTITY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_]+\.[a-z0-9_]+$").expect("valid regex"));
static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Home Assistant domains the classifier can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Domain {
    #[default]
    Light,
    Switch,
    Fan,
    Cover,
}

impl Domain {
    /// Every domain the bridge controls.
    pub const ALL: [Domain; 4] = [Domain::Light, Domain::Switch, Domain::Fan, Domain::Cover];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Light => "light",
            Domain::Switch => "switch",
            Domain::Fan => "fan",
            Domain::Cover => "cover",
        }
    }

    /// Guess the domain from a spoken device or area phrase.
    ///
    /// Words are checked from the end of the phrase, so the head noun wins
    /// ("ceiling fan light" is a light). Unknown phrases default to `light`.
    /// This never consults the real device registry.
    pub fn infer(phrase: &str) -> Self {
        if phrase.contains("garage door") {
            return Domain::Cover;
        }
        phrase
            .split_whitespace()
            .rev()
            .find_map(keyword)
            .unwrap_or_default()
    }

    /// Domain of an explicit entity id such as `switch.porch`. `None` for
    /// anything that is not an id, or an id outside [`Domain::ALL`].
    pub fn from_entity_id(phrase: &str) -> Option<Self> {
        if !RE_ENTITY_ID.is_match(phrase) {
            return None;
        }
        let (prefix, _) = phrase.split_once('.')?;
        Domain::ALL.into_iter().find(|d| d.as_str() == prefix)
    }

    /// Domain for a command target, or `None` when the target cannot name a
    /// controllable entity.
    ///
    /// Explicit ids carry their own domain; spoken phrases are guessed with
    /// [`Domain::infer`]. A phrase with no words left after cleaning (a bare
    /// "the") resolves to nothing.
    pub fn resolve(target: &str) -> Option<Self> {
        if RE_ENTITY_ID.is_match(target) {
            return Domain::from_entity_id(target);
        }
        if spoken_words(target).is_empty() {
            return None;
        }
        Some(Domain::infer(target))
    }

    /// Domain named by a plural noun such as "lights" in "which lights are on".
    /// Generic nouns ("devices", "things") span every domain.
    pub fn from_noun(noun: &str) -> Option<Self> {
        match noun {
            "devices" | "things" | "entities" | "states" => None,
            other => keyword(other),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn keyword(word: &str) -> Option<Domain> {
    let domain = match word {
        "light" | "lights" | "lamp" | "lamps" => Domain::Light,
        "switch" | "switches" | "plug" | "plugs" | "outlet" | "outlets" => Domain::Switch,
        "fan" | "fans" => Domain::Fan,
        "blind" | "blinds" | "shade" | "shades" | "curtain" | "curtains" | "cover" | "covers" => {
            Domain::Cover
        }
        _ => return None,
    };
    Some(domain)
}

/// Turn a spoken phrase into a Home Assistant entity id.
///
/// "living room light" becomes `light.living_room`; a phrase that already is
/// an entity id is kept. "all the lights" and "everything" address every
/// entity of the domain (`all`).
pub fn entity_id(domain: Domain, phrase: &str) -> String {
    let phrase = phrase.trim();
    if RE_ENTITY_ID.is_match(phrase) {
        return phrase.to_string();
    }

    let mut words = spoken_words(phrase);

    let names_domain = |w: &str| keyword(w) == Some(domain) && w.starts_with(domain.as_str());
    let addresses_all = words.first().is_some_and(|w| w == "all") && words[1..].iter().all(|w| names_domain(w));
    if addresses_all || words == ["everything"] {
        return "all".to_string();
    }

    if words.len() > 1 && words.last().is_some_and(|w| names_domain(w)) {
        words.pop();
    }

    format!("{}.{}", domain, words.join("_"))
}

/// Words of a phrase with punctuation and articles removed.
fn spoken_words(phrase: &str) -> Vec<String> {
    RE_NON_WORD
        .replace_all(phrase, "")
        .split_whitespace()
        .filter(|w| *w != "the")
        .map(str::to_string)
        .collect()
}
