// src/providers/interpreter.rs

//! Discovery of a Python interpreter able to run the legacy CLI.

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Oldest interpreter the legacy CLI runs on.
const MIN_VERSION: (u32, u32) = (3, 8);
const DEFAULT_CANDIDATES: &[&str] = &["python3", "python"];

/// Returns the first candidate that reports a supported version and can
/// import `requests`. `explicit` is tried before the defaults.
pub async fn discover(explicit: Option<&str>) -> Result<String, String> {
    let candidates = explicit.into_iter().chain(DEFAULT_CANDIDATES.iter().copied());

    let mut rejected = Vec::new();
    for candidate in candidates {
        match probe(candidate).await {
            Ok(()) => {
                info!(interpreter = candidate, "Legacy interpreter found.");
                return Ok(candidate.to_string());
            }
            Err(reason) => {
                debug!(interpreter = candidate, %reason, "Interpreter rejected.");
                rejected.push(format!("{} ({})", candidate, reason));
            }
        }
    }

    warn!("No compatible legacy interpreter found.");
    Err(format!(
        "no compatible Python interpreter (>= {}.{} with 'requests') found: {}",
        MIN_VERSION.0,
        MIN_VERSION.1,
        rejected.join(", ")
    ))
}

async fn probe(candidate: &str) -> Result<(), String> {
    let output = Command::new(candidate)
        .arg("--version")
        .output()
        .await
        .map_err(|e| format!("not runnable: {}", e))?;

    // Python 2 prints its version on stderr.
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let version = parse_python_version(&text).ok_or_else(|| "unrecognized version output".to_string())?;
    if version < MIN_VERSION {
        return Err(format!("version {}.{} is too old", version.0, version.1));
    }

    let status = Command::new(candidate)
        .args(["-c", "import requests"])
        .output()
        .await
        .map_err(|e| format!("not runnable: {}", e))?
        .status;
    if !status.success() {
        return Err("'requests' is not installed".to_string());
    }
    Ok(())
}

/// Parses `Python 3.11.4` into `(3, 11)`.
pub(crate) fn parse_python_version(text: &str) -> Option<(u32, u32)> {
    let rest = text.trim().strip_prefix("Python ")?;
    let mut parts = rest.split(|c: char| c == '.' || c.is_whitespace());
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_parsed() {
        assert_eq!(parse_python_version("Python 3.11.4\n"), Some((3, 11)));
        assert_eq!(parse_python_version("Python 3.13.0rc1"), Some((3, 13)));
        assert_eq!(parse_python_version("Python 2.7.18"), Some((2, 7)));
        assert_eq!(parse_python_version("bash: python: not found"), None);
    }

    #[test]
    fn minimum_version_comparison() {
        assert!((3, 7) < MIN_VERSION);
        assert!((3, 10) >= MIN_VERSION);
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported() {
        let reason = probe("scorton-no-such-interpreter").await.unwrap_err();
        assert!(reason.starts_with("not runnable"));
    }
}
