//! Purpose: Route internal diagnostics to a client-registered callback.
//! Exports: `DebugRouter`, `DebugMessage`, `DebugCallback`.
//! Role: Per-context, best-effort message channel; mirrors every event into `tracing`.
//! Invariants: Defaults to no callback and every filter disabled.
//! Invariants: `log` never fails and never surfaces callback problems to its caller.

use std::panic::{self, AssertUnwindSafe};

use crate::core::flags::{DebugSeverity, DebugSource, DebugType};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DebugMessage<'a> {
    pub source: DebugSource,
    pub kind: DebugType,
    pub id: u32,
    pub severity: DebugSeverity,
    pub text: &'a str,
}

pub type DebugCallback = Box<dyn FnMut(&DebugMessage<'_>) + Send>;

#[derive(Default)]
pub struct DebugRouter {
    callback: Option<DebugCallback>,
    sources: DebugSource,
    kinds: DebugType,
    severities: DebugSeverity,
}

impl DebugRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the callback; `None` disables routing.
    pub fn set_callback(&mut self, callback: Option<DebugCallback>) {
        self.callback = callback;
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn set_filter(
        &mut self,
        sources: DebugSource,
        kinds: DebugType,
        severities: DebugSeverity,
        enabled: bool,
    ) {
        if enabled {
            self.sources |= sources;
            self.kinds |= kinds;
            self.severities |= severities;
        } else {
            self.sources &= !sources;
            self.kinds &= !kinds;
            self.severities &= !severities;
        }
    }

    pub fn accepts(&self, source: DebugSource, kind: DebugType, severity: DebugSeverity) -> bool {
        self.sources.intersects(source)
            && self.kinds.intersects(kind)
            && self.severities.intersects(severity)
    }

    pub fn log(
        &mut self,
        source: DebugSource,
        kind: DebugType,
        id: u32,
        severity: DebugSeverity,
        text: &str,
    ) {
        trace_event(source, kind, id, severity, text);
        if !self.accepts(source, kind, severity) {
            return;
        }
        let Some(callback) = self.callback.as_mut() else {
            return;
        };
        let message = DebugMessage {
            source,
            kind,
            id,
            severity,
            text,
        };
        if panic::catch_unwind(AssertUnwindSafe(|| callback(&message))).is_err() {
            tracing::warn!(?source, id, "debug callback panicked; message dropped");
        }
    }
}

impl std::fmt::Debug for DebugRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugRouter")
            .field("callback", &self.callback.is_some())
            .field("sources", &self.sources)
            .field("kinds", &self.kinds)
            .field("severities", &self.severities)
            .finish()
    }
}

fn trace_event(source: DebugSource, kind: DebugType, id: u32, severity: DebugSeverity, text: &str) {
    if severity.contains(DebugSeverity::HIGH) {
        tracing::warn!(?source, ?kind, id, "{text}");
    } else if severity.intersects(DebugSeverity::MEDIUM | DebugSeverity::LOW) {
        tracing::info!(?source, ?kind, id, "{text}");
    } else {
        tracing::debug!(?source, ?kind, id, "{text}");
    }
}
