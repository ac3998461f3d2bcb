// src/core/mod.rs

// The native engine: every scan, score and compliance assessment the fast
// backend can answer without leaving the process.

/// Data structures shared by the scanners, the engine and the records
/// written to disk, such as `ScanReport`, `ScanResult` and `Tool`.
pub mod models;

/// Houses the scanning logic for each probe family
/// (e.g., DNS, SSL, HTTP headers, ports).
pub mod scanner;

/// Repository of known issues and best practices, keyed by the finding
/// codes the scanners emit.
pub mod knowledge_base;

/// Cyber score computed from an audit report.
pub mod scoring;

pub mod compliance;
