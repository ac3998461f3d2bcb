// src/lib.rs

//! # scorton
//!
//! Security scanning, scoring and compliance reporting with two backends:
//! an in-process native engine and the legacy Python CLI as a fallback.
//!
//! The [`orchestrator`] tries the native engine first and falls back to the
//! legacy CLI when it fails, normalizes whatever came back into one record
//! shape and writes it through the [`output`] sink. [`config`] resolves the
//! settings every command runs with.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod providers;
pub mod report;
pub mod validate;
