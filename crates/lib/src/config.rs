//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.copydesk/config.json`) and environment.

use crate::llm::DEFAULT_MAX_TOKENS;
use crate::templates::TemplateId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Hosted backend (generate-copy function and REST tables).
    #[serde(default)]
    pub backend: BackendConfig,

    /// Chat defaults.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Client directory lookup.
    #[serde(default)]
    pub clients: ClientsConfig,

    /// Local HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Where the hosted backend lives and how to call it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`. Overridden by COPYDESK_BASE_URL env.
    pub base_url: Option<String>,

    /// Public anon key. Overridden by COPYDESK_ANON_KEY env.
    pub anon_key: Option<String>,

    /// Token budget per generation (default 2000).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds. Unset waits for the backend indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            anon_key: None,
            max_tokens: default_max_tokens(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Template for new sessions when none is requested (default "linkedin").
    #[serde(default, deserialize_with = "lenient_template")]
    pub default_template: TemplateId,
}

/// Unknown template names fall back to the first template instead of failing the load.
fn lenient_template<'de, D>(deserializer: D) -> std::result::Result<TemplateId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(TemplateId::resolve(&name))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsConfig {
    /// Owner whose clients are listed when no user is given on the command line.
    pub user_id: Option<String>,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Trimmed, non-empty value of an env var.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the backend URL: env COPYDESK_BASE_URL overrides config.
pub fn resolve_base_url(config: &Config) -> Option<String> {
    env_value("COPYDESK_BASE_URL").or_else(|| non_empty(config.backend.base_url.as_ref()))
}

/// Resolve the anon key: env COPYDESK_ANON_KEY overrides config.
pub fn resolve_anon_key(config: &Config) -> Option<String> {
    env_value("COPYDESK_ANON_KEY").or_else(|| non_empty(config.backend.anon_key.as_ref()))
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("COPYDESK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".copydesk").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or COPYDESK_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and write `{}` to the config file if it does not exist.
/// Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }
    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.gateway.port, 15152);
        assert_eq!(c.gateway.bind, "127.0.0.1");
        assert_eq!(c.backend.max_tokens, 2000);
        assert_eq!(c.backend.timeout_secs, None);
        assert_eq!(c.chat.default_template, TemplateId::Linkedin);
    }

    #[test]
    fn loopback_detection() {
        assert!(is_loopback_bind(" 127.0.0.1 "));
        assert!(is_loopback_bind("localhost"));
        assert!(!is_loopback_bind("0.0.0.0"));
    }

    #[test]
    fn parses_camel_case_file() {
        let c: Config = serde_json::from_str(
            r#"{
                "backend": { "baseUrl": "https://proj.example.co", "maxTokens": 800, "timeoutSecs": 60 },
                "chat": { "defaultTemplate": "post-webinar" }
            }"#,
        )
        .unwrap();
        assert_eq!(c.backend.base_url.as_deref(), Some("https://proj.example.co"));
        assert_eq!(c.backend.max_tokens, 800);
        assert_eq!(c.backend.timeout_secs, Some(60));
        assert_eq!(c.chat.default_template, TemplateId::PostWebinar);
        assert_eq!(c.gateway.port, 15152);
    }

    #[test]
    fn unknown_default_template_falls_back() {
        let c: Config =
            serde_json::from_str(r#"{ "chat": { "defaultTemplate": "newsletter" } }"#).unwrap();
        assert_eq!(c.chat.default_template, TemplateId::Linkedin);

        let path = std::env::temp_dir()
            .join(format!("copydesk-tpl-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        init_config_dir(&path).unwrap();
        std::fs::write(&path, r#"{"chat":{"defaultTemplate":"Ads"}}"#).unwrap();
        let (c, _) = load_config(Some(path.clone())).unwrap();
        assert_eq!(c.chat.default_template, TemplateId::Ads);
        std::fs::write(&path, r#"{"chat":{"defaultTemplate":"newsletter"}}"#).unwrap();
        let (c, _) = load_config(Some(path.clone())).unwrap();
        assert_eq!(c.chat.default_template, TemplateId::Linkedin);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn blank_config_values_are_ignored() {
        let mut c = Config::default();
        c.backend.anon_key = Some("   ".to_string());
        if std::env::var("COPYDESK_ANON_KEY").is_err() {
            assert_eq!(resolve_anon_key(&c), None);
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir()
            .join(format!("copydesk-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (c, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(c.gateway.port, 15152);
    }

    #[test]
    fn init_writes_empty_object_once() {
        let dir = std::env::temp_dir().join(format!("copydesk-init-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        init_config_dir(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        std::fs::write(&path, r#"{"gateway":{"port":9000}}"#).unwrap();
        init_config_dir(&path).unwrap();
        let (c, _) = load_config(Some(path)).unwrap();
        assert_eq!(c.gateway.port, 9000);
        let _ = std::fs::remove_dir_all(dir);
    }
}
