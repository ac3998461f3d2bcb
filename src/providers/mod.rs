// src/providers/mod.rs

// Backends the orchestrator can dispatch an `Operation` to.
pub mod interpreter;
pub mod legacy;
pub mod native;

use crate::core::models::{Operation, Provenance, ProviderOutcome};

pub use legacy::LegacyCli;
pub use native::NativeEngine;

/// A backend that answers an `Operation` with raw payload text.
///
/// Implementations never write artifacts and never retry; failures are
/// returned as `ProviderOutcome::Err` with a human-readable reason.
#[allow(async_fn_in_trait)]
pub trait Backend {
    fn provenance(&self) -> Provenance;

    async fn call(&self, op: &Operation) -> ProviderOutcome;
}
