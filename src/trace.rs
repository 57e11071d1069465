//! Bounded in-memory trace of page activity.
//!
//! Lines are recorded only while tracing is enabled. Each recorded line is
//! also emitted as a `tracing` debug event.

use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct TraceLog {
    enabled: bool,
    events: bool,
    timers: bool,
    logs: Vec<String>,
    limit: usize,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            logs: Vec::new(),
            limit: 10_000,
        }
    }
}

impl TraceLog {
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_events(&mut self, enabled: bool) {
        self.events = enabled;
    }

    pub(crate) fn set_timers(&mut self, enabled: bool) {
        self.timers = enabled;
    }

    pub(crate) fn set_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config(
                "trace log limit requires at least 1 entry".into(),
            ));
        }
        self.limit = max_entries;
        if self.logs.len() > self.limit {
            let excess = self.logs.len() - self.limit;
            self.logs.drain(..excess);
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs)
    }

    pub(crate) fn event(&mut self, line: String) {
        if self.enabled && self.events {
            self.push(line);
        }
    }

    pub(crate) fn timer(&mut self, line: String) {
        if self.enabled && self.timers {
            self.push(line);
        }
    }

    fn push(&mut self, line: String) {
        debug!(target: "reelchoice_widgets::trace", "{line}");
        if self.logs.len() >= self.limit {
            self.logs.remove(0);
        }
        self.logs.push(line);
    }
}
