//! Shared helpers for the integration tests.
//!
//! Components record what happens to them in an [EventLog], which is
//! registered as a pre-built instance. Tests keep a clone of the log, so
//! they can inspect it even when the build fails.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ordo_di::{ClassMapper, DependencyInfo, DynError};

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of the first event equal to `event`
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|known| known == event)
    }

    /// True if `first` was recorded and happened before `second`
    pub fn before(&self, first: &str, second: &str) -> bool {
        match (self.position(first), self.position(second)) {
            (Some(first), Some(second)) => first < second,
            _ => false,
        }
    }
}

/// Dependency every logging component declares in its constructor
pub fn log_dependency() -> DependencyInfo {
    DependencyInfo::of::<EventLog>()
}

/// Fetches the log and records the construction of `name`
pub fn construct(mapper: &ClassMapper<'_>, name: &str) -> Result<Arc<EventLog>, DynError> {
    let log = mapper.get::<EventLog>()?;
    log.push(format!("construct {name}"));
    Ok(log)
}
