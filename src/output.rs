// src/output.rs

//! Artifact writer.
//!
//! Every file is named `{kind}-{slug}-{timestamp}.{ext}` with a UTC
//! millisecond timestamp. Two writes of the same kind and label inside one
//! millisecond produce the same name and the second replaces the first.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, ScortonError};

pub const OUTPUT_DIR: &str = "scorton-results";

#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `./scorton-results`.
    pub fn in_working_dir() -> Self {
        Self::new(OUTPUT_DIR)
    }

    pub fn write_record<T: Serialize>(&self, kind: &str, label: &str, record: &T) -> Result<PathBuf> {
        let text = serde_json::to_string_pretty(record)
            .map_err(|source| ScortonError::Serialize { what: "record", source })?;
        self.write(kind, label, "json", &text)
    }

    pub fn write_text(&self, kind: &str, label: &str, content: &str) -> Result<PathBuf> {
        self.write(kind, label, "md", content)
    }

    fn write(&self, kind: &str, label: &str, ext: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ScortonError::io("create", &self.dir, e))?;
        let name = format!("{}-{}-{}.{}", kind, slugify(label), timestamp(), ext);
        let path = self.dir.join(name);
        std::fs::write(&path, content).map_err(|e| ScortonError::io("write", &path, e))?;
        info!(path = %path.display(), "Artifact written.");
        Ok(path)
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string()
}

/// Lowercase ASCII alphanumerics joined by single hyphens. An input with no
/// alphanumerics becomes `target`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() { "target".to_string() } else { slug }
}
