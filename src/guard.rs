//! Development-time usage guard.
//!
//! Records which trace ids have passed through context resolution and, in
//! debug builds, refuses provider dispatch for any trace id that has not.
//! This catches code paths that reach a provider without going through the
//! orchestrator. Release builds skip the assertion entirely; the marking
//! set is append-only and never consulted in production traffic.
//!
//! The guard is an injected value shared via `Arc`, not a process global,
//! so tests can run isolated instances side by side.
use std::collections::HashSet;
use std::sync::Mutex;

use crate::context::pack::ContextPack;
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct UsageGuard {
    seen: Mutex<HashSet<String>>,
}

impl UsageGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `pack` went through context resolution.
    pub fn mark_usage(&self, pack: &ContextPack) {
        let mut seen = self.seen.lock().expect("guard mutex");
        seen.insert(pack.trace_id.clone());
    }

    /// Debug-build assertion fired from the provider adapter immediately
    /// before a network call. No-op in release builds.
    pub fn assert_used(&self, trace_id: &str) -> AppResult<()> {
        if !cfg!(debug_assertions) {
            return Ok(());
        }
        let seen = self.seen.lock().expect("guard mutex");
        if seen.contains(trace_id) {
            Ok(())
        } else {
            Err(AppError::GuardViolation(format!(
                "provider invoked for trace id '{}' without prior context resolution",
                trace_id
            )))
        }
    }
}
