use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static TAG_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Credentials
    pub openai_api_key: String,
    pub database_url: String,

    // Generation worker
    pub gen_count: usize,
    pub gen_window_minutes: f64,
    pub gen_rate_per_minute: Option<f64>,
    pub gen_languages: HashMap<String, f64>,
    pub gen_personas: HashMap<String, f64>,
    pub gen_tags: Vec<String>,

    // Classification poller
    pub watch_interval_secs: u64,
    pub watch_batch_limit: i64,
    pub watch_threshold: u8,
    pub watch_include_synthetic: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self::load(required_env("OPENAI_API_KEY"))
    }

    /// Load a minimal config for store-only commands (no OpenAI key needed).
    pub fn store_from_env() -> Self {
        Self::load(String::new())
    }

    fn load(openai_api_key: String) -> Self {
        Self {
            openai_api_key,
            database_url: required_env("DATABASE_URL"),
            gen_count: env::var("PULSE_GEN_COUNT")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("PULSE_GEN_COUNT must be a number"),
            gen_window_minutes: env::var("PULSE_GEN_WINDOW_MINUTES")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("PULSE_GEN_WINDOW_MINUTES must be a number"),
            gen_rate_per_minute: env::var("PULSE_GEN_RATE_PER_MINUTE")
                .ok()
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|rate| *rate > 0.0),
            gen_languages: weights_from_env("PULSE_GEN_LANGS", default_language_weights),
            gen_personas: weights_from_env("PULSE_GEN_PERSONAS", default_persona_weights),
            gen_tags: env::var("PULSE_GEN_TAGS")
                .ok()
                .map(|raw| parse_tags(&raw))
                .filter(|tags| !tags.is_empty())
                .unwrap_or_else(default_hashtags),
            watch_interval_secs: env::var("PULSE_WATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("PULSE_WATCH_INTERVAL_SECS must be a number"),
            watch_batch_limit: env::var("PULSE_WATCH_BATCH_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("PULSE_WATCH_BATCH_LIMIT must be a number"),
            watch_threshold: env::var("PULSE_WATCH_THRESHOLD")
                .unwrap_or_else(|_| "80".to_string())
                .parse()
                .expect("PULSE_WATCH_THRESHOLD must be a number"),
            watch_include_synthetic: env::var("PULSE_WATCH_INCLUDE_SYNTHETIC")
                .map(|raw| matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn weights_from_env(key: &str, defaults: fn() -> HashMap<String, f64>) -> HashMap<String, f64> {
    env::var(key)
        .ok()
        .map(|raw| parse_weights(&raw))
        .filter(|weights| !weights.is_empty())
        .unwrap_or_else(defaults)
}

/// Default language mix for synthetic posts.
pub fn default_language_weights() -> HashMap<String, f64> {
    HashMap::from([("en".to_string(), 0.9), ("es".to_string(), 0.1)])
}

/// Default persona mix. Style descriptors live with the persona registry;
/// only the sampling weights are configuration.
pub fn default_persona_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("college student".to_string(), 0.2),
        ("commuter".to_string(), 0.1),
        ("street vendor".to_string(), 0.1),
        ("neighborhood rep".to_string(), 0.15),
        ("reporter tone".to_string(), 0.05),
        ("chronically online".to_string(), 0.4),
    ])
}

/// Default hashtag pool for synthetic posts.
pub fn default_hashtags() -> Vec<String> {
    vec!["#breaking".to_string(), "#alert".to_string()]
}

/// Parse a weight map from either a JSON object (`{"en":0.9,"es":0.1}`) or
/// delimited pairs (`en=0.9,es:0.1`). Unparsable tokens are logged and
/// skipped. An empty result signals the caller to fall back to defaults.
pub fn parse_weights(raw: &str) -> HashMap<String, f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return HashMap::new();
    }
    if trimmed.starts_with('{') {
        return match serde_json::from_str::<HashMap<String, serde_json::Value>>(trimmed) {
            Ok(map) => map
                .into_iter()
                .filter_map(|(key, value)| match value.as_f64() {
                    Some(weight) => Some((key, weight)),
                    None => {
                        warn!(key = %key, "Ignoring non-numeric weight in JSON weight map");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON weight map");
                HashMap::new()
            }
        };
    }

    let mut weights = HashMap::new();
    for token in trimmed.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let Some((key, value)) = token.split_once('=').or_else(|| token.split_once(':')) else {
            warn!(token = %token, "Ignoring weight token without a separator");
            continue;
        };
        match value.trim().parse::<f64>() {
            Ok(weight) => {
                weights.insert(key.trim().to_string(), weight);
            }
            Err(_) => warn!(token = %token, "Ignoring weight token with a non-numeric value"),
        }
    }
    weights
}

/// Parse a hashtag pool from either a JSON array (`["#breaking","#alert"]`)
/// or comma/whitespace separated tokens.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(tags) => return tags.into_iter().filter(|tag| !tag.is_empty()).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON tag list, splitting on delimiters instead");
            }
        }
    }
    TAG_SEPARATOR_RE
        .split(trimmed.trim_matches(|c| c == '[' || c == ']'))
        .map(|tag| tag.trim_matches(|c: char| c == '"' || c == '\''))
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}
