// src/providers/legacy.rs

//! The legacy Python CLI, run as `<python> -m scorton <command> ...`.
//!
//! One attempt per call. Exit status zero means success and stdout is the
//! payload; anything else is a failure carrying the tail of stderr. The
//! legacy CLI has no compliance command, so compliance fails without
//! starting a process.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::core::models::{Operation, Provenance, ProviderOutcome};
use crate::providers::{interpreter, Backend};

const LEGACY_MODULE: &str = "scorton";
/// Characters of stderr kept in a failure reason.
const STDERR_TAIL: usize = 400;

#[derive(Debug)]
pub struct LegacyCli {
    enabled: bool,
    api_endpoint: String,
    auth_token: Option<String>,
    explicit_interpreter: Option<String>,
    interpreter: OnceCell<Result<String, String>>,
}

impl LegacyCli {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.fallback_enabled,
            api_endpoint: settings.api_endpoint.clone(),
            auth_token: settings.auth_token.clone(),
            explicit_interpreter: settings.legacy_interpreter.clone(),
            interpreter: OnceCell::new(),
        }
    }

    /// Interpreter discovery runs on first use only.
    async fn interpreter(&self) -> &Result<String, String> {
        self.interpreter
            .get_or_init(|| interpreter::discover(self.explicit_interpreter.as_deref()))
            .await
    }

    pub(crate) fn arguments(&self, op: &Operation) -> Result<Vec<String>, String> {
        let mut args: Vec<String> = vec!["-m".into(), LEGACY_MODULE.into()];
        match op {
            Operation::Scan { tool, target } => {
                args.extend(["scan".to_string(), tool.to_string(), target.clone()]);
            }
            Operation::Score { target } => args.extend(["score".to_string(), target.clone()]),
            Operation::Audit { target } => args.extend(["audit".to_string(), target.clone()]),
            Operation::Compliance { .. } => return Err("compliance not supported by legacy backend".to_string()),
        }
        args.extend(["--api".to_string(), self.api_endpoint.clone()]);
        if let Some(token) = &self.auth_token {
            args.extend(["--token".to_string(), token.clone()]);
        }
        Ok(args)
    }
}

impl Backend for LegacyCli {
    fn provenance(&self) -> Provenance {
        Provenance::Legacy
    }

    async fn call(&self, op: &Operation) -> ProviderOutcome {
        if !self.enabled {
            return ProviderOutcome::Err("fallback disabled".to_string());
        }
        let args = match self.arguments(op) {
            Ok(args) => args,
            Err(reason) => return ProviderOutcome::Err(reason),
        };
        let python = match self.interpreter().await {
            Ok(python) => python,
            Err(reason) => return ProviderOutcome::Err(reason.clone()),
        };

        debug!(interpreter = %python, operation = op.name(), target = op.target(), "Running legacy CLI.");
        let output = Command::new(python)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                ProviderOutcome::Ok(json_body(&stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = match output.status.code() {
                    Some(code) => format!("exit code {}: {}", code, tail(stderr.trim(), STDERR_TAIL)),
                    None => format!("terminated by signal: {}", tail(stderr.trim(), STDERR_TAIL)),
                };
                warn!(operation = op.name(), %reason, "Legacy CLI failed.");
                ProviderOutcome::Err(reason)
            }
            Err(e) => ProviderOutcome::Err(format!("failed to start {}: {}", python, e)),
        }
    }
}

/// The legacy CLI logs to stdout ahead of its JSON. The payload starts at
/// the first line opening an object or array; without one the whole text is
/// kept so the validator reports it.
fn json_body(stdout: &str) -> &str {
    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        if matches!(line.trim_start().chars().next(), Some('{' | '[')) {
            return &stdout[offset..];
        }
        offset += line.len();
    }
    stdout
}

/// The last `max` characters of `text`.
fn tail(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let start = text.char_indices().nth(count - max).map(|(i, _)| i).unwrap_or(0);
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Framework, Tool};

    fn settings() -> Settings {
        Settings::default().with_overrides(Some("http://api".into()), Some("t0k".into()))
    }

    #[test]
    fn scan_arguments_follow_the_legacy_cli() {
        let legacy = LegacyCli::from_settings(&settings());
        let args = legacy.arguments(&Operation::Scan { tool: Tool::DnsEnum, target: "example.com".into() }).unwrap();
        assert_eq!(
            args,
            vec!["-m", "scorton", "scan", "dns_enum", "example.com", "--api", "http://api", "--token", "t0k"]
        );
    }

    #[test]
    fn token_is_omitted_when_unset() {
        let legacy = LegacyCli::from_settings(&Settings::default());
        let args = legacy.arguments(&Operation::Score { target: "x.io".into() }).unwrap();
        assert_eq!(&args[2..4], ["score", "x.io"]);
        assert!(!args.contains(&"--token".to_string()));
    }

    #[tokio::test]
    async fn compliance_fails_without_starting_a_process() {
        let mut settings = Settings::default();
        settings.legacy_interpreter = Some("/nonexistent/python".into());
        let legacy = LegacyCli::from_settings(&settings);
        let outcome = legacy.call(&Operation::Compliance { framework: Framework::Nis2, target: "x.io".into() }).await;
        assert_eq!(outcome, ProviderOutcome::Err("compliance not supported by legacy backend".into()));
        assert!(legacy.interpreter.get().is_none());
    }

    #[test]
    fn log_lines_before_the_payload_are_skipped() {
        let stdout = "2024-05-01 10:00:00,123 - __main__ - INFO - Making API call to http://api/scan\n{\"status\": \"ok\"}\n";
        assert_eq!(json_body(stdout), "{\"status\": \"ok\"}\n");
        assert_eq!(json_body("  [1, 2]"), "  [1, 2]");
        assert_eq!(json_body("no json here\n"), "no json here\n");
    }

    #[test]
    fn stderr_tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
        assert_eq!(tail("ééé", 2), "éé");
    }

    #[tokio::test]
    async fn disabled_fallback_fails_immediately() {
        let mut settings = Settings::default();
        settings.fallback_enabled = false;
        let legacy = LegacyCli::from_settings(&settings);
        let outcome = legacy.call(&Operation::Score { target: "example.com".into() }).await;
        assert_eq!(outcome, ProviderOutcome::Err("fallback disabled".into()));
    }

    /// Writes an executable stand-in for Python: it passes the interpreter
    /// checks and runs `body` for every other invocation.
    #[cfg(unix)]
    fn fake_python(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("python");
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n  --version) echo 'Python 3.11.4'; exit 0 ;;\n  -c) exit 0 ;;\nesac\n{}\n",
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Another test thread forking while the file was open for writing
        // makes exec fail with ETXTBSY for a moment.
        for _ in 0..50 {
            match std::process::Command::new(&path).arg("--version").output() {
                Err(e) if e.raw_os_error() == Some(26) => std::thread::sleep(std::time::Duration::from_millis(20)),
                _ => break,
            }
        }
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    fn legacy_with(interpreter: String) -> LegacyCli {
        let mut settings = settings();
        settings.legacy_interpreter = Some(interpreter);
        LegacyCli::from_settings(&settings)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_yields_the_json_after_log_lines() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(
            dir.path(),
            "echo '2024-05-01 10:00:00,123 - __main__ - INFO - Making API call to http://api/scan'\n\
             printf '{\"status\": \"ok\", \"command\": \"%s\", \"tool\": \"%s\"}\\n' \"$3\" \"$4\"",
        );
        let legacy = legacy_with(python.clone());

        let outcome = legacy.call(&Operation::Scan { tool: Tool::PortScan, target: "example.com".into() }).await;
        let ProviderOutcome::Ok(raw) = outcome else {
            panic!("expected a payload, got {outcome:?}");
        };
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["command"], "scan");
        assert_eq!(value["tool"], "port_scan");
        assert_eq!(legacy.interpreter.get(), Some(&Ok(python)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "echo 'starting' ; echo 'ConnectionError: api unreachable' >&2 ; exit 3");
        let legacy = legacy_with(python);

        let outcome = legacy.call(&Operation::Score { target: "example.com".into() }).await;
        assert_eq!(outcome, ProviderOutcome::Err("exit code 3: ConnectionError: api unreachable".into()));
    }
}
