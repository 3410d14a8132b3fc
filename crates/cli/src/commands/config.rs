use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderdesk_core::config::{AppConfig, LoadOptions};
use serde_json::{json, Map, Value as JsonValue};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run(options: LoadOptions) -> CommandResult {
    let explicit_path = options.config_path.clone();
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = explicit_path.filter(|path| path.exists()).or_else(detect_config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, overridden: bool, env_keys: &[&str]| {
        if overridden {
            return "override".to_string();
        }
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut fields = Map::new();
    fields.insert(
        "api.base_url".to_string(),
        render_field(
            &config.api.base_url,
            source("api.base_url", overrides.api_url.is_some(), &["ORDERDESK_API_URL"]),
        ),
    );
    fields.insert(
        "api.timeout_secs".to_string(),
        render_field(
            &config.api.timeout_secs.to_string(),
            source(
                "api.timeout_secs",
                overrides.api_timeout_secs.is_some(),
                &["ORDERDESK_API_TIMEOUT_SECS"],
            ),
        ),
    );
    fields.insert(
        "logging.level".to_string(),
        render_field(
            &config.logging.level,
            source(
                "logging.level",
                overrides.log_level.is_some(),
                &["ORDERDESK_LOGGING_LEVEL", "ORDERDESK_LOG_LEVEL"],
            ),
        ),
    );
    fields.insert(
        "logging.format".to_string(),
        render_field(
            &format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source(
                "logging.format",
                overrides.log_format.is_some(),
                &["ORDERDESK_LOGGING_FORMAT", "ORDERDESK_LOG_FORMAT"],
            ),
        ),
    );

    CommandResult::success_with(
        "config",
        "effective config (source precedence: override > env > file > default)",
        Some(JsonValue::Object(fields)),
        Vec::new(),
    )
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("orderdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/orderdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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

fn render_field(value: &str, source: String) -> JsonValue {
    json!({ "value": value, "source": source })
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn dotted_paths_resolve_into_tables() {
        let doc: toml::Value = "[api]\nbase_url = \"/api\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "api.base_url"));
        assert!(!contains_path(&doc, "api.timeout_secs"));
        assert!(!contains_path(&doc, "logging.level"));
    }
}
