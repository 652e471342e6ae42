//! Change tracking for passes.
//!
//! Passes record one [`Event`] per change into a local [`EventLog`]; the scheduler merges the
//! per-method logs after each round.

use std::fmt;

use strum::{Display, EnumIter};

use crate::ir::OperatorId;

/// What a pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum EventKind {
    /// An operator without observable effect was removed
    OperatorRemoved,
    /// Uses of a copy destination were replaced by its source
    CopyPropagated,
}

/// A single recorded change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// Name of the affected method
    pub method: Option<String>,
    /// The affected operator
    pub operator: Option<OperatorId>,
    /// Free-form detail
    pub message: String,
}

impl Event {
    /// Sets the affected method.
    pub fn method(&mut self, name: &str) -> &mut Self {
        self.method = Some(name.to_string());
        self
    }

    /// Sets the affected method and operator.
    pub fn at(&mut self, method: &str, operator: OperatorId) -> &mut Self {
        self.operator = Some(operator);
        self.method(method)
    }

    /// Sets the detail message.
    pub fn message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(method) = &self.method {
            write!(f, " {method}")?;
        }
        if let Some(op) = self.operator {
            write!(f, "#{op}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// An ordered list of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns it for further detail.
    pub fn record(&mut self, kind: EventKind) -> &mut Event {
        let index = self.events.len();
        self.events.push(Event {
            kind,
            method: None,
            operator: None,
            message: String::new(),
        });
        &mut self.events[index]
    }

    /// Moves every event of `other` to the end of this log.
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns the number of events of one kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Iterates over the events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_merge() {
        let mut log = EventLog::new();
        log.record(EventKind::OperatorRemoved)
            .at("m", OperatorId::new(3))
            .message("dead");

        let mut other = EventLog::new();
        other.record(EventKind::CopyPropagated).method("n");
        log.merge(other);

        assert_eq!(log.len(), 2);
        assert_eq!(log.count(EventKind::CopyPropagated), 1);
        let first = log.iter().next().map(ToString::to_string);
        assert_eq!(first.as_deref(), Some("[OperatorRemoved] m#3: dead"));
    }
}
