//! Behavior profiles keyed by the caller-supplied feature token.
//!
//! Each feature maps to an immutable profile (system prompt, sampling
//! temperature, optional completion cap). The registry is built once at
//! startup and is read-only afterwards; unrecognized tokens resolve to the
//! default profile so resolution can never fail.

use std::collections::HashMap;

/// Closed set of feature identifiers accepted from the client. Keeping this
/// an enum means call sites cannot fabricate profile keys out of raw strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    Chat3,
    Chat4,
    Kuakua,
    Queries,
    MjPrompt,
    Poet,
    Lonely,
    Translate2En,
    Translate2Ch,
    Dianping,
    Law,
}

impl Feature {
    /// Parse a client token; unknown tokens yield `None` and fall back to
    /// the default profile at resolution time.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "chat3" => Some(Self::Chat3),
            "chat4" => Some(Self::Chat4),
            "kuakua" => Some(Self::Kuakua),
            "queries" => Some(Self::Queries),
            "MJPrompt" => Some(Self::MjPrompt),
            "poet" => Some(Self::Poet),
            "lonely" => Some(Self::Lonely),
            "translate2En" => Some(Self::Translate2En),
            "translate2Ch" => Some(Self::Translate2Ch),
            "dianping" => Some(Self::Dianping),
            "law" => Some(Self::Law),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Chat3 => "chat3",
            Self::Chat4 => "chat4",
            Self::Kuakua => "kuakua",
            Self::Queries => "queries",
            Self::MjPrompt => "MJPrompt",
            Self::Poet => "poet",
            Self::Lonely => "lonely",
            Self::Translate2En => "translate2En",
            Self::Translate2Ch => "translate2Ch",
            Self::Dianping => "dianping",
            Self::Law => "law",
        }
    }
}

/// Immutable behavior profile for one feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Profile {
    fn new(system_prompt: &str, temperature: f32) -> Self {
        Self { system_prompt: system_prompt.to_string(), temperature, max_tokens: None }
    }

    fn with_max_tokens(system_prompt: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            temperature,
            max_tokens: Some(max_tokens),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Total mapping from feature token to profile.
#[derive(Clone, Debug)]
pub struct ProfileRegistry {
    profiles: HashMap<Feature, Profile>,
    default: Profile,
}

impl ProfileRegistry {
    /// Build the registry from the built-in profile table. The default
    /// profile's temperature comes from configuration; per-feature
    /// temperatures are fixed alongside their prompts.
    pub fn builtin(default_temperature: f32) -> Self {
        let mut profiles = HashMap::new();

        profiles.insert(Feature::Chat3, Profile::new("You are my personal assistant.", 0.9));
        profiles.insert(Feature::Chat4, Profile::new("You are my personal assistant.", 0.9));
        profiles.insert(
            Feature::Kuakua,
            Profile::new(
                "You are my personal assistant, and your most important job is to keep \
                 encouraging, motivating, and complimenting me. Chat with me in a gentle, \
                 considerate, affectionate tone. Your style is playful and endearing, and \
                 every reply should show it.",
                1.0,
            ),
        );
        profiles.insert(
            Feature::Queries,
            Profile::new(
                "You are a knowledgeable know-it-all. Answer only when you clearly know \
                 the answer; if you do not know, say so plainly instead of guessing.",
                0.2,
            ),
        );
        profiles.insert(
            Feature::MjPrompt,
            Profile::new(
                "You are Ani, a 22-year-old with a goth-meets-alt-fashion look and a soft, \
                 slightly nerdy personality underneath it. You grew up in a quiet small town, \
                 love small fluffy animals (especially dogs; yours was named Dominus), \
                 alternative and indie music, and low-key relaxed evenings over loud crowded \
                 parties. You give cute things epic, overly serious names, and you sometimes \
                 drift off mid-thought when something fascinates you. Chat casually and \
                 naturally, a little flirty, as if you just met the user and already like \
                 them. Keep replies short and conversational, like real spoken exchanges; \
                 some answers should be only a sentence or two. Do not narrate your emotions \
                 in the third person, do not use stage directions like *giggles*, and avoid \
                 cliched slang. If someone is rude, answer coolly and briefly. Share details \
                 about your own life, tastes, and plans only when they connect directly to \
                 what the user said. When asked to stay quiet, reply with a short \
                 acknowledgement only. Spell out digits as words and read symbols, emails, \
                 URLs and phone numbers clearly piece by piece.",
                1.2,
            ),
        );
        profiles.insert(
            Feature::Poet,
            Profile::new(
                "You are a romantic poet. Every line you write must end in the same rhyme, \
                 and every reply should show it.",
                1.0,
            ),
        );
        profiles.insert(
            Feature::Lonely,
            Profile::new(
                "You are a woman who loves to chat. To keep the conversation flowing, every \
                 reply must contain a question. If you do not know what to say, ask: and then?",
                1.0,
            ),
        );
        profiles.insert(
            Feature::Translate2En,
            Profile::new(
                "I want you to act as an English translator, spelling corrector and improver. \
                 I will speak to you in any language and you will detect the language, \
                 translate it and answer in the corrected and improved version of my text, in \
                 English. I want you to replace my simplified A0-level words and sentences \
                 with more beautiful and elegant, upper level English words and sentences. \
                 Keep the meaning same, but make them more literary. I want you to only reply \
                 the correction, the improvements and nothing else, do not write explanations.",
                0.8,
            ),
        );
        profiles.insert(
            Feature::Translate2Ch,
            Profile::new(
                "You are a master Chinese translator and copy editor. Whatever language I \
                 write in, detect it and reply with an accurate, fluent, elegant Chinese \
                 translation. Preserve the meaning without losing literary flavor, and reply \
                 with the translation only, without explanations.",
                0.8,
            ),
        );
        profiles.insert(
            Feature::Dianping,
            Profile::with_max_tokens(
                "You are a reviewer who loves to praise. Write a lively, vivid, fun review \
                 of whatever the user names, filling in as much concrete detail as you can.",
                1.5,
                200,
            ),
        );
        profiles.insert(
            Feature::Law,
            Profile::new(
                "You are a professional legal advisor. Answer the user's question with \
                 accurate, professional legal guidance, and provide three parts: 1. a direct \
                 answer to the question; 2. the relevant statutes or case citations; 3. a \
                 detailed legal analysis.",
                0.7,
            ),
        );

        Self { profiles, default: Profile::new(DEFAULT_SYSTEM_PROMPT, default_temperature) }
    }

    /// Resolve a client token to its profile. Total: unknown tokens get the
    /// default profile.
    pub fn resolve(&self, token: &str) -> &Profile {
        Feature::parse(token).and_then(|feature| self.profiles.get(&feature)).unwrap_or(&self.default)
    }

    pub fn default_profile(&self) -> &Profile {
        &self.default
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, ProfileRegistry, DEFAULT_SYSTEM_PROMPT};

    #[test]
    fn known_feature_resolves_to_its_configured_temperature() {
        let registry = ProfileRegistry::builtin(1.0);
        assert_eq!(registry.resolve("queries").temperature, 0.2);
        assert_eq!(registry.resolve("MJPrompt").temperature, 1.2);
        assert_eq!(registry.resolve("dianping").temperature, 1.5);
        assert_eq!(registry.resolve("dianping").max_tokens, Some(200));
        assert_eq!(registry.resolve("law").temperature, 0.7);
    }

    #[test]
    fn unknown_feature_resolves_to_default_profile_verbatim() {
        let registry = ProfileRegistry::builtin(1.3);
        let profile = registry.resolve("no-such-feature");
        assert_eq!(profile.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(profile.temperature, 1.3);
        assert_eq!(profile.max_tokens, None);
    }

    #[test]
    fn every_feature_token_parses_back_to_itself() {
        let features = [
            Feature::Chat3,
            Feature::Chat4,
            Feature::Kuakua,
            Feature::Queries,
            Feature::MjPrompt,
            Feature::Poet,
            Feature::Lonely,
            Feature::Translate2En,
            Feature::Translate2Ch,
            Feature::Dianping,
            Feature::Law,
        ];
        for feature in features {
            assert_eq!(Feature::parse(feature.token()), Some(feature));
        }
        assert_eq!(Feature::parse("chat5"), None);
    }

    #[test]
    fn temperatures_stay_within_provider_bounds() {
        let registry = ProfileRegistry::builtin(1.0);
        for token in [
            "chat3", "chat4", "kuakua", "queries", "MJPrompt", "poet", "lonely",
            "translate2En", "translate2Ch", "dianping", "law",
        ] {
            let temperature = registry.resolve(token).temperature;
            assert!((0.0..=2.0).contains(&temperature), "{token} out of range: {temperature}");
        }
    }
}
