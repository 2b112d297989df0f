//! Scope-based start / complete logging
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` with `elapsed_ms` on `complete()`
//! - `{name}_FAILED` on `fail()`
//! - `{name}_INCOMPLETE` when dropped without either

use std::cell::Cell;
use std::time::{Duration, Instant};

use super::logger::Logger;

pub struct ObservationScope<'a> {
    name: &'a str,
    timer: Timer,
    finished: Cell<bool>,
    fields: Vec<(&'a str, String)>,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Creates a scope whose fields are repeated on every line it logs
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::trace(&format!("{}_BEGIN", name), fields);
        Self {
            name,
            timer: Timer::new(),
            finished: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        }
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(self, extra: &[(&str, &str)]) {
        self.finished.set(true);
        let elapsed = self.timer.elapsed_ms();
        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    pub fn fail(self, code: &str, reason: &str) {
        self.finished.set(true);
        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.push(("code", code));
        fields.push(("reason", reason));
        Logger::warn(&format!("{}_FAILED", self.name), &fields);
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.finished.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// Elapsed-time measurement for log fields
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }

    pub fn elapsed_us(&self) -> String {
        self.start.elapsed().as_micros().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
