// src/config.rs

//! Settings resolution.
//!
//! Four layers, lowest precedence first: built-in defaults, the user file
//! `~/.scorton/config.json`, the project file `./.scorton/config.json` and
//! `SCORTON_*` environment variables. Each layer overwrites the keys it sets
//! (shallow merge). A missing, malformed or non-object file counts as an
//! empty layer, and a value that cannot be read as the key's type leaves the
//! lower layer's value in place.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::error::{Result, ScortonError};

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_FAST_BACKEND_PORT: u16 = 3001;
pub const DEFAULT_FAST_BACKEND_TIMEOUT_MS: u64 = 30_000;

const CONFIG_DIR: &str = ".scorton";
const CONFIG_FILE: &str = "config.json";

/// Keys accepted in the config files and by `config --set`.
pub const KNOWN_KEYS: &[&str] = &[
    "apiEndpoint",
    "authToken",
    "useFastBackend",
    "fastBackendPort",
    "fastBackendTimeoutMs",
    "fallbackEnabled",
    "complianceMode",
    "template",
    "legacyInterpreter",
];

/// Environment variable to config key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("SCORTON_API_URL", "apiEndpoint"),
    ("SCORTON_TOKEN", "authToken"),
    ("SCORTON_USE_FAST_BACKEND", "useFastBackend"),
    ("SCORTON_FAST_BACKEND_PORT", "fastBackendPort"),
    ("SCORTON_FAST_BACKEND_TIMEOUT", "fastBackendTimeoutMs"),
    ("SCORTON_FALLBACK_ENABLED", "fallbackEnabled"),
    ("SCORTON_COMPLIANCE_MODE", "complianceMode"),
    ("SCORTON_PYTHON", "legacyInterpreter"),
];

/// Which frameworks `compliance` assesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, clap::ValueEnum)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ComplianceMode {
    Dora,
    Nis2,
    Both,
}

/// Resolved configuration for one invocation. Never mutated after `resolve`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_endpoint: String,
    pub auth_token: Option<String>,
    pub use_fast_backend: bool,
    /// Reported by `config` only; the native engine runs in-process.
    pub fast_backend_port: u16,
    pub fast_backend_timeout_ms: u64,
    pub fallback_enabled: bool,
    pub compliance_mode: ComplianceMode,
    pub template: Option<String>,
    pub legacy_interpreter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            auth_token: None,
            use_fast_backend: true,
            fast_backend_port: DEFAULT_FAST_BACKEND_PORT,
            fast_backend_timeout_ms: DEFAULT_FAST_BACKEND_TIMEOUT_MS,
            fallback_enabled: true,
            compliance_mode: ComplianceMode::Both,
            template: None,
            legacy_interpreter: None,
        }
    }
}

impl Settings {
    /// Applies the per-invocation `--api` / `--token` flags.
    pub fn with_overrides(mut self, api: Option<String>, token: Option<String>) -> Self {
        if let Some(api) = api {
            self.api_endpoint = api;
        }
        if let Some(token) = token {
            self.auth_token = Some(token);
        }
        self
    }

    fn apply(&mut self, layer: &Map<String, Value>) {
        for (key, value) in layer {
            match key.as_str() {
                "apiEndpoint" => {
                    if let Some(s) = as_string(value) {
                        self.api_endpoint = s;
                    }
                }
                "authToken" => self.auth_token = as_string(value).filter(|s| !s.is_empty()),
                "useFastBackend" => {
                    if let Some(b) = as_bool(value) {
                        self.use_fast_backend = b;
                    }
                }
                "fastBackendPort" => {
                    if let Some(port) = as_u64(value).and_then(|n| u16::try_from(n).ok()) {
                        self.fast_backend_port = port;
                    }
                }
                "fastBackendTimeoutMs" => {
                    if let Some(ms) = as_u64(value) {
                        self.fast_backend_timeout_ms = ms;
                    }
                }
                "fallbackEnabled" => {
                    if let Some(b) = as_bool(value) {
                        self.fallback_enabled = b;
                    }
                }
                "complianceMode" => {
                    if let Some(mode) = as_string(value).and_then(|s| s.parse().ok()) {
                        self.compliance_mode = mode;
                    }
                }
                "template" => self.template = as_string(value),
                "legacyInterpreter" => self.legacy_interpreter = as_string(value).filter(|s| !s.is_empty()),
                other => debug!(key = other, "Ignoring unknown config key."),
            }
        }
    }
}

/// `key: value` lines. The token is shown as `***` and left out when unset.
impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "apiEndpoint: {}", self.api_endpoint)?;
        if self.auth_token.is_some() {
            writeln!(f, "authToken: ***")?;
        }
        writeln!(f, "useFastBackend: {}", self.use_fast_backend)?;
        writeln!(f, "fastBackendPort: {}", self.fast_backend_port)?;
        writeln!(f, "fastBackendTimeoutMs: {}", self.fast_backend_timeout_ms)?;
        writeln!(f, "fallbackEnabled: {}", self.fallback_enabled)?;
        write!(f, "complianceMode: {}", self.compliance_mode)?;
        if let Some(template) = &self.template {
            write!(f, "\ntemplate: {}", template)?;
        }
        if let Some(interpreter) = &self.legacy_interpreter {
            write!(f, "\nlegacyInterpreter: {}", interpreter)?;
        }
        Ok(())
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().and_then(|n| match n {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Where the layers come from. Tests build this by hand; the binary uses
/// [`ConfigSources::from_process`].
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub home_file: Option<PathBuf>,
    pub project_file: PathBuf,
    pub env: HashMap<String, String>,
}

impl ConfigSources {
    /// Home directory, current directory and the `SCORTON_*` environment.
    pub fn from_process() -> Self {
        let home_file = BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE));
        let env = std::env::vars().filter(|(key, _)| key.starts_with("SCORTON_")).collect();
        Self::rooted_at(Path::new("."), home_file, env)
    }

    /// Sources whose project file lives under `project_root`.
    pub fn rooted_at(project_root: &Path, home_file: Option<PathBuf>, env: HashMap<String, String>) -> Self {
        Self {
            home_file,
            project_file: project_root.join(CONFIG_DIR).join(CONFIG_FILE),
            env,
        }
    }

    pub fn resolve(&self) -> Settings {
        let mut settings = Settings::default();
        if let Some(home) = &self.home_file {
            settings.apply(&read_layer(home));
        }
        settings.apply(&read_layer(&self.project_file));
        settings.apply(&env_layer(&self.env));
        debug!(
            api = %settings.api_endpoint,
            native = settings.use_fast_backend,
            fallback = settings.fallback_enabled,
            "Resolved settings."
        );
        settings
    }

    /// Shallow-merges `partial` into the project file, creating it (and its
    /// directory) when absent.
    pub fn persist_project_override(&self, partial: Map<String, Value>) -> Result<()> {
        let mut current = read_layer(&self.project_file);
        current.extend(partial);

        if let Some(dir) = self.project_file.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ScortonError::io("create", dir, e))?;
        }
        let text = serde_json::to_string_pretty(&Value::Object(current))
            .map_err(|source| ScortonError::Serialize { what: "project config", source })?;
        std::fs::write(&self.project_file, text)
            .map_err(|e| ScortonError::io("write", &self.project_file, e))?;

        info!(path = %self.project_file.display(), "Project config updated.");
        Ok(())
    }
}

/// Reads one file layer. Anything but a JSON object is an empty layer.
fn read_layer(path: &Path) -> Map<String, Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return Map::new(),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            debug!(path = %path.display(), "Config file is not a JSON object, ignoring.");
            Map::new()
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Malformed config file, ignoring.");
            Map::new()
        }
    }
}

fn env_layer(env: &HashMap<String, String>) -> Map<String, Value> {
    ENV_KEYS
        .iter()
        .filter_map(|(var, key)| env.get(*var).map(|v| (key.to_string(), Value::String(v.clone()))))
        .collect()
}

/// Parses a `config --set` argument. The value is read as a JSON scalar when
/// it is one (`true`, `3001`, `"x"`) and kept as a plain string otherwise.
pub fn parse_assignment(input: &str) -> Result<(String, Value)> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| ScortonError::MalformedAssignment(input.to_string()))?;
    let key = key.trim();
    if !KNOWN_KEYS.contains(&key) {
        return Err(ScortonError::UnknownConfigKey(key.to_string()));
    }
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    };
    Ok((key.to_string(), value))
}
