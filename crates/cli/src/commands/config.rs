use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use teller_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'a str,
    value: String,
    env_keys: &'a [&'a str],
}

/// Effective configuration, one line per field, with where each value came from.
pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(explicit_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key_path: "llm.enabled",
            value: config.llm.enabled.to_string(),
            env_keys: &["TELLER_LLM_ENABLED"],
        },
        Field {
            key_path: "llm.provider",
            value: config.llm.provider.as_str().to_string(),
            env_keys: &["TELLER_LLM_PROVIDER"],
        },
        Field {
            key_path: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["TELLER_LLM_MODEL"],
        },
        Field {
            key_path: "llm.base_url",
            value: config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| format!("<unset> ({})", config.llm.provider.default_base_url())),
            env_keys: &["TELLER_LLM_BASE_URL"],
        },
        Field {
            key_path: "llm.api_key",
            value: config
                .llm
                .api_key
                .as_ref()
                .map(|key| redact_secret(key.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["TELLER_LLM_API_KEY"],
        },
        Field {
            key_path: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["TELLER_LLM_TIMEOUT_SECS"],
        },
        Field {
            key_path: "dialogue.history_days",
            value: config.dialogue.history_days.to_string(),
            env_keys: &["TELLER_DIALOGUE_HISTORY_DAYS"],
        },
        Field {
            key_path: "dialogue.max_transactions_shown",
            value: config.dialogue.max_transactions_shown.to_string(),
            env_keys: &["TELLER_DIALOGUE_MAX_TRANSACTIONS"],
        },
        Field {
            key_path: "dialogue.min_confidence",
            value: config
                .dialogue
                .min_confidence
                .map(|threshold| threshold.to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["TELLER_DIALOGUE_MIN_CONFIDENCE"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["TELLER_LOGGING_LEVEL", "TELLER_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            env_keys: &["TELLER_LOGGING_FORMAT", "TELLER_LOG_FORMAT"],
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("teller.toml"), PathBuf::from("config/teller.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
